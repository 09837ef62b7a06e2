use std::fmt::{Display, Formatter, Result};

use serde::{Deserialize, Serialize};

use crate::models::role::Role;

/// The notification categories this listener consumes, one queue each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationCategory {
    ProductResale,
    QuestionRegister,
    NewOrder,
    Newcomer,
    DeliveryStart,
    Settlement,
}

impl NotificationCategory {
    pub const ALL: [NotificationCategory; 6] = [
        NotificationCategory::ProductResale,
        NotificationCategory::QuestionRegister,
        NotificationCategory::NewOrder,
        NotificationCategory::Newcomer,
        NotificationCategory::DeliveryStart,
        NotificationCategory::Settlement,
    ];

    /// Fixed recipient role stamped onto every envelope of this category.
    pub fn role(&self) -> Role {
        match self {
            NotificationCategory::ProductResale => Role::Customer,
            NotificationCategory::QuestionRegister => Role::Manager,
            NotificationCategory::NewOrder => Role::Manager,
            NotificationCategory::Newcomer => Role::Admin,
            NotificationCategory::DeliveryStart => Role::Customer,
            NotificationCategory::Settlement => Role::Manager,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            NotificationCategory::ProductResale => "product-resale",
            NotificationCategory::QuestionRegister => "question-register",
            NotificationCategory::NewOrder => "new-order",
            NotificationCategory::Newcomer => "newcomer",
            NotificationCategory::DeliveryStart => "delivery-start",
            NotificationCategory::Settlement => "settlement",
        }
    }
}

impl Display for NotificationCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{}", self.as_str())
    }
}
