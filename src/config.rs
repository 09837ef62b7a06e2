use std::collections::HashSet;

use anyhow::{Error, Result, anyhow};
use dotenvy::dotenv;
use serde::Deserialize;

use crate::models::category::NotificationCategory;

#[derive(Clone, Deserialize, Debug)]
pub struct Config {
    pub rabbitmq_url: String,
    pub prefetch_count: u16,
    pub dead_letter_exchange: String,
    pub dead_letter_queue_name: String,

    pub product_resale_queue_name: String,
    pub question_register_queue_name: String,
    pub new_order_queue_name: String,
    pub newcomer_queue_name: String,
    pub delivery_start_queue_name: String,
    pub settlement_queue_name: String,

    pub facade_service_url: String,
    #[serde(default = "default_facade_timeout_seconds")]
    pub facade_timeout_seconds: u64,

    pub worker_concurrency: usize,

    pub server_port: u16,

    #[serde(default)]
    pub log_format: LogFormat,
}

#[derive(Clone, Copy, Deserialize, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

fn default_facade_timeout_seconds() -> u64 {
    10
}

impl Config {
    pub fn load() -> Result<Self, Error> {
        dotenv().ok();

        let config = envy::from_env::<Self>()
            .map_err(|e| anyhow!("Invalid or missing environmental variable: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        let mut seen = HashSet::new();

        for category in NotificationCategory::ALL {
            let name = self.queue_name(category);
            if name.trim().is_empty() {
                return Err(anyhow!("Queue name for {} must not be empty", category));
            }
            if !seen.insert(name) {
                return Err(anyhow!("Queue name '{}' is bound to more than one category", name));
            }
        }

        if self.dead_letter_exchange.trim().is_empty() {
            return Err(anyhow!("DEAD_LETTER_EXCHANGE must not be empty"));
        }

        if self.dead_letter_queue_name.trim().is_empty() {
            return Err(anyhow!("DEAD_LETTER_QUEUE_NAME must not be empty"));
        }

        if seen.contains(self.dead_letter_queue_name.as_str()) {
            return Err(anyhow!(
                "Dead letter queue '{}' is also bound to a category",
                self.dead_letter_queue_name
            ));
        }

        if self.worker_concurrency == 0 {
            return Err(anyhow!("WORKER_CONCURRENCY must be at least 1"));
        }

        Ok(())
    }

    pub fn queue_name(&self, category: NotificationCategory) -> &str {
        match category {
            NotificationCategory::ProductResale => &self.product_resale_queue_name,
            NotificationCategory::QuestionRegister => &self.question_register_queue_name,
            NotificationCategory::NewOrder => &self.new_order_queue_name,
            NotificationCategory::Newcomer => &self.newcomer_queue_name,
            NotificationCategory::DeliveryStart => &self.delivery_start_queue_name,
            NotificationCategory::Settlement => &self.settlement_queue_name,
        }
    }
}
