use thiserror::Error;

use crate::models::category::NotificationCategory;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Failed to deserialize {category} message: {source}")]
    Deserialization {
        category: NotificationCategory,
        #[source]
        source: serde_json::Error,
    },

    #[error("Downstream handler failed for {category} message: {source}")]
    Downstream {
        category: NotificationCategory,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to acknowledge {category} message: {source}")]
    Acknowledgment {
        category: NotificationCategory,
        #[source]
        source: anyhow::Error,
    },
}

impl DispatchError {
    pub fn category(&self) -> NotificationCategory {
        match self {
            DispatchError::Deserialization { category, .. }
            | DispatchError::Downstream { category, .. }
            | DispatchError::Acknowledgment { category, .. } => *category,
        }
    }

    /// Whether redelivering the same message could ever succeed.
    pub fn is_redeliverable(&self) -> bool {
        !matches!(self, DispatchError::Deserialization { .. })
    }
}
