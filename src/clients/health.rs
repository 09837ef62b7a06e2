use std::{collections::HashMap, time::Instant};

use chrono::Utc;
use tracing::{debug, warn};

use crate::{
    clients::{facade::FacadeClient, rbmq::RabbitMqClient},
    config::Config,
    models::health::{HealthCheckResponse, ServiceHealth, overall_status},
};

pub struct HealthChecker {
    config: Config,
    facade_client: FacadeClient,
}

impl HealthChecker {
    pub fn new(config: Config, facade_client: FacadeClient) -> Self {
        Self {
            config,
            facade_client,
        }
    }

    pub async fn check_all(&self) -> HealthCheckResponse {
        let mut checks = HashMap::new();

        let rabbitmq_health = self.check_rabbitmq().await;
        checks.insert("message_broker".to_string(), rabbitmq_health);

        let facade_health = self.check_facade().await;
        checks.insert("notification_facade".to_string(), facade_health);

        HealthCheckResponse {
            status: overall_status(&checks),
            timestamp: Utc::now(),
            checks,
        }
    }

    async fn check_rabbitmq(&self) -> ServiceHealth {
        let start = Instant::now();

        match RabbitMqClient::connect(&self.config).await {
            Ok(_) => {
                let elapsed = start.elapsed().as_millis() as u64;
                debug!(response_time_ms = elapsed, "RabbitMQ health check passed");
                ServiceHealth::healthy(elapsed)
            }
            Err(e) => {
                warn!(error = %e, "RabbitMQ connection failed");
                ServiceHealth::unhealthy(format!("Connection failed: {}", e))
            }
        }
    }

    async fn check_facade(&self) -> ServiceHealth {
        let start = Instant::now();

        match self.facade_client.health_check().await {
            Ok(status) if status.is_success() => {
                let elapsed = start.elapsed().as_millis() as u64;
                debug!(response_time_ms = elapsed, "Facade health check passed");
                ServiceHealth::healthy(elapsed)
            }
            Ok(status) => {
                let elapsed = start.elapsed().as_millis() as u64;
                warn!(status = %status, "Facade reported a non-success health status");
                ServiceHealth::degraded(elapsed, format!("Facade returned status {}", status))
            }
            Err(e) => {
                warn!(error = %e, "Facade health check failed");
                ServiceHealth::unhealthy(format!("Unreachable: {}", e))
            }
        }
    }
}
