use std::future::Future;

use anyhow::{Error, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::{
    config::Config,
    error::DispatchError,
    models::{
        category::NotificationCategory,
        envelope::Envelope,
        payload::{
            DeliveryNotification, NewOrderNotification, NewcomerNotification, QuestionRegister,
            ResaleNotificationList, SettlementNotification,
        },
    },
};

/// Downstream consumer of stamped envelopes, one method per category.
#[async_trait]
pub trait NotificationHandler: Send + Sync {
    async fn publish_resale_notification(
        &self,
        envelope: Envelope<ResaleNotificationList>,
    ) -> Result<(), Error>;

    async fn publish_question_register_notification(
        &self,
        envelope: Envelope<QuestionRegister>,
    ) -> Result<(), Error>;

    async fn publish_new_order_notification(
        &self,
        envelope: Envelope<NewOrderNotification>,
    ) -> Result<(), Error>;

    async fn publish_newcomer_notification(
        &self,
        envelope: Envelope<NewcomerNotification>,
    ) -> Result<(), Error>;

    async fn publish_delivery_start_notification(
        &self,
        envelope: Envelope<DeliveryNotification>,
    ) -> Result<(), Error>;

    async fn publish_settlement_notification(
        &self,
        envelope: Envelope<SettlementNotification>,
    ) -> Result<(), Error>;
}

/// Transport-supplied capability to acknowledge one message. Consumed on use.
#[async_trait]
pub trait Acknowledgment: Send {
    async fn acknowledge(self) -> Result<(), Error>;
}

/// A deserialized, role-stamped message ready for its downstream method.
#[derive(Debug, Clone)]
pub enum Notification {
    ProductResale(Envelope<ResaleNotificationList>),
    QuestionRegister(Envelope<QuestionRegister>),
    NewOrder(Envelope<NewOrderNotification>),
    Newcomer(Envelope<NewcomerNotification>),
    DeliveryStart(Envelope<DeliveryNotification>),
    Settlement(Envelope<SettlementNotification>),
}

impl Notification {
    /// Parses `body` with the payload shape bound to `category` and
    /// overwrites the role with the category's fixed role.
    pub fn decode(category: NotificationCategory, body: &str) -> Result<Self, serde_json::Error> {
        Ok(match category {
            NotificationCategory::ProductResale => {
                Notification::ProductResale(decode_stamped(category, body)?)
            }
            NotificationCategory::QuestionRegister => {
                Notification::QuestionRegister(decode_stamped(category, body)?)
            }
            NotificationCategory::NewOrder => Notification::NewOrder(decode_stamped(category, body)?),
            NotificationCategory::Newcomer => Notification::Newcomer(decode_stamped(category, body)?),
            NotificationCategory::DeliveryStart => {
                Notification::DeliveryStart(decode_stamped(category, body)?)
            }
            NotificationCategory::Settlement => {
                Notification::Settlement(decode_stamped(category, body)?)
            }
        })
    }

    pub fn category(&self) -> NotificationCategory {
        match self {
            Notification::ProductResale(_) => NotificationCategory::ProductResale,
            Notification::QuestionRegister(_) => NotificationCategory::QuestionRegister,
            Notification::NewOrder(_) => NotificationCategory::NewOrder,
            Notification::Newcomer(_) => NotificationCategory::Newcomer,
            Notification::DeliveryStart(_) => NotificationCategory::DeliveryStart,
            Notification::Settlement(_) => NotificationCategory::Settlement,
        }
    }

    pub async fn forward<H>(self, handler: &H) -> Result<(), Error>
    where
        H: NotificationHandler + ?Sized,
    {
        match self {
            Notification::ProductResale(envelope) => {
                handler.publish_resale_notification(envelope).await
            }
            Notification::QuestionRegister(envelope) => {
                handler.publish_question_register_notification(envelope).await
            }
            Notification::NewOrder(envelope) => {
                handler.publish_new_order_notification(envelope).await
            }
            Notification::Newcomer(envelope) => {
                handler.publish_newcomer_notification(envelope).await
            }
            Notification::DeliveryStart(envelope) => {
                handler.publish_delivery_start_notification(envelope).await
            }
            Notification::Settlement(envelope) => {
                handler.publish_settlement_notification(envelope).await
            }
        }
    }
}

fn decode_stamped<T: DeserializeOwned>(
    category: NotificationCategory,
    body: &str,
) -> Result<Envelope<T>, serde_json::Error> {
    let mut envelope = Envelope::<T>::from_json(body)?;
    envelope.stamp_role(category.role());
    Ok(envelope)
}

/// Binds one configured queue to the category it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueBinding {
    pub category: NotificationCategory,
    pub queue_name: String,
}

impl QueueBinding {
    pub fn from_config(config: &Config) -> Vec<Self> {
        NotificationCategory::ALL
            .into_iter()
            .map(|category| Self {
                category,
                queue_name: config.queue_name(category).to_string(),
            })
            .collect()
    }

    pub async fn dispatch<H, A>(&self, body: &str, handler: &H, ack: A) -> Result<(), DispatchError>
    where
        H: NotificationHandler + ?Sized,
        A: Acknowledgment,
    {
        dispatch(self.category, body, handler, ack).await
    }
}

/// Runs one message through deserialize, stamp and forward, acknowledging
/// only if all of it succeeded.
pub async fn dispatch<H, A>(
    category: NotificationCategory,
    body: &str,
    handler: &H,
    ack: A,
) -> Result<(), DispatchError>
where
    H: NotificationHandler + ?Sized,
    A: Acknowledgment,
{
    acknowledge_on_success(category, ack, async {
        let notification = Notification::decode(category, body)
            .map_err(|source| DispatchError::Deserialization { category, source })?;

        debug!(
            category = %category,
            role = %category.role(),
            "Envelope deserialized and role assigned"
        );

        notification
            .forward(handler)
            .await
            .map_err(|source| DispatchError::Downstream { category, source })
    })
    .await?;

    info!(category = %category, "Notification dispatched and acknowledged");

    Ok(())
}

/// Awaits `processing` and acknowledges exactly once if it returned `Ok`.
/// On error the acknowledgment is dropped unused.
pub async fn acknowledge_on_success<A, F>(
    category: NotificationCategory,
    ack: A,
    processing: F,
) -> Result<(), DispatchError>
where
    A: Acknowledgment,
    F: Future<Output = Result<(), DispatchError>>,
{
    processing.await?;

    ack.acknowledge()
        .await
        .map_err(|source| DispatchError::Acknowledgment { category, source })
}
