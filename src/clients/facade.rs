use std::time::Duration;

use anyhow::{Error, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    config::Config,
    dispatcher::NotificationHandler,
    models::{
        category::NotificationCategory,
        envelope::Envelope,
        payload::{
            DeliveryNotification, NewOrderNotification, NewcomerNotification, QuestionRegister,
            ResaleNotificationList, SettlementNotification,
        },
    },
};

/// Forwards stamped envelopes to the notification facade over HTTP.
#[derive(Clone)]
pub struct FacadeClient {
    http_client: Client,
    base_url: String,
}

impl FacadeClient {
    pub fn new(config: &Config) -> Result<Self, Error> {
        Self::with_base_url(
            &config.facade_service_url,
            Duration::from_secs(config.facade_timeout_seconds),
        )
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, Error> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow!("Failed to create HTTP client: {}", e))?;

        let base_url = base_url.trim_end_matches('/').to_string();

        info!(base_url = %base_url, "Notification facade client initialized");

        Ok(Self {
            http_client,
            base_url,
        })
    }

    pub fn endpoint(&self, category: NotificationCategory) -> String {
        format!("{}/api/v1/notifications/{}", self.base_url, category)
    }

    /// Returns the facade's health status code; transport failures are errors.
    pub async fn health_check(&self) -> Result<reqwest::StatusCode, Error> {
        let response = self
            .http_client
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .map_err(|e| anyhow!("Facade health request failed: {}", e))?;

        Ok(response.status())
    }

    async fn post<T: Serialize + Sync>(
        &self,
        category: NotificationCategory,
        envelope: &Envelope<T>,
    ) -> Result<(), Error> {
        let url = self.endpoint(category);

        debug!(category = %category, url = %url, "Forwarding notification to facade");

        let response = self
            .http_client
            .post(&url)
            .json(envelope)
            .send()
            .await
            .map_err(|e| anyhow!("Facade request failed: {}", e))?;

        let status = response.status();

        if status.is_success() {
            Ok(())
        } else {
            let error_text = response.text().await.unwrap_or_default();
            Err(anyhow!(
                "Facade returned status {} for {}: {}",
                status,
                category,
                error_text
            ))
        }
    }
}

#[async_trait]
impl NotificationHandler for FacadeClient {
    async fn publish_resale_notification(
        &self,
        envelope: Envelope<ResaleNotificationList>,
    ) -> Result<(), Error> {
        self.post(NotificationCategory::ProductResale, &envelope).await
    }

    async fn publish_question_register_notification(
        &self,
        envelope: Envelope<QuestionRegister>,
    ) -> Result<(), Error> {
        self.post(NotificationCategory::QuestionRegister, &envelope).await
    }

    async fn publish_new_order_notification(
        &self,
        envelope: Envelope<NewOrderNotification>,
    ) -> Result<(), Error> {
        self.post(NotificationCategory::NewOrder, &envelope).await
    }

    async fn publish_newcomer_notification(
        &self,
        envelope: Envelope<NewcomerNotification>,
    ) -> Result<(), Error> {
        self.post(NotificationCategory::Newcomer, &envelope).await
    }

    async fn publish_delivery_start_notification(
        &self,
        envelope: Envelope<DeliveryNotification>,
    ) -> Result<(), Error> {
        self.post(NotificationCategory::DeliveryStart, &envelope).await
    }

    async fn publish_settlement_notification(
        &self,
        envelope: Envelope<SettlementNotification>,
    ) -> Result<(), Error> {
        self.post(NotificationCategory::Settlement, &envelope).await
    }
}
