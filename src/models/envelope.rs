use serde::{Deserialize, Deserializer, Serialize, de::IgnoredAny, de::DeserializeOwned};
use serde_json::{Map, Value as JsonValue};

use crate::models::role::Role;

/// Generic queue message: routing metadata plus a category-specific payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    pub publish_information: PublishInformation,
    pub payload: T,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishInformation {
    /// Assigned by the listener; whatever the producer sent is discarded.
    #[serde(
        default,
        deserialize_with = "discard_role",
        skip_serializing_if = "Option::is_none"
    )]
    pub role: Option<Role>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<JsonValue>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_kind: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

fn discard_role<'de, D>(deserializer: D) -> Result<Option<Role>, D::Error>
where
    D: Deserializer<'de>,
{
    IgnoredAny::deserialize(deserializer)?;
    Ok(None)
}

impl<T: DeserializeOwned> Envelope<T> {
    pub fn from_json(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }
}

impl<T> Envelope<T> {
    pub fn stamp_role(&mut self, role: Role) {
        self.publish_information.role = Some(role);
    }

    pub fn role(&self) -> Option<Role> {
        self.publish_information.role
    }
}
