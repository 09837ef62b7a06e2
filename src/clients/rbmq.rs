use anyhow::{Error, Result, anyhow};
use async_trait::async_trait;
use lapin::{
    Channel, Connection, ConnectionProperties, Consumer, ExchangeKind,
    options::{
        BasicAckOptions, BasicConsumeOptions, BasicQosOptions, BasicRejectOptions,
        ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
    },
    types::{AMQPValue, FieldTable},
};
use tracing::{debug, info};

use crate::{
    config::Config, dispatcher::Acknowledgment, listener::DeliveryTransport,
    models::category::NotificationCategory,
};

pub struct RabbitMqClient {
    _connection: Connection,
    channel: Channel,
}

impl RabbitMqClient {
    pub async fn connect(config: &Config) -> Result<Self, Error> {
        info!("Connecting to RabbitMQ");

        let connection = Connection::connect(&config.rabbitmq_url, ConnectionProperties::default())
            .await
            .map_err(|e| anyhow!("Failed to connect to RabbitMQ: {}", e))?;

        let channel = connection
            .create_channel()
            .await
            .map_err(|e| anyhow!("RabbitMQ channel creation failed: {}", e))?;

        channel
            .basic_qos(config.prefetch_count, BasicQosOptions::default())
            .await
            .map_err(|e| anyhow!("Failed to set up QoS: {}", e))?;

        debug!(prefetch_count = config.prefetch_count, "Prefetch count set");

        declare_dead_letter_queue(&channel, config).await?;

        for category in NotificationCategory::ALL {
            let queue_name = config.queue_name(category);

            channel
                .queue_declare(
                    queue_name,
                    QueueDeclareOptions {
                        durable: true,
                        ..Default::default()
                    },
                    queue_arguments(config),
                )
                .await
                .map_err(|e| anyhow!("Failed to declare queue '{}': {}", queue_name, e))?;

            debug!(queue = queue_name, category = %category, "Queue declared");
        }

        info!("RabbitMQ connection established");

        Ok(Self {
            _connection: connection,
            channel,
        })
    }

    /// Manual-ack consumer: the broker never removes a delivery on its own.
    pub async fn create_consumer(
        &self,
        queue_name: &str,
        consumer_tag: &str,
    ) -> Result<Consumer, Error> {
        let consumer = self
            .channel
            .basic_consume(
                queue_name,
                consumer_tag,
                BasicConsumeOptions {
                    no_ack: false,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| anyhow!("Failed to create consumer for '{}': {}", queue_name, e))?;

        info!(queue = queue_name, consumer_tag, "Consumer created for queue");

        Ok(consumer)
    }

    pub async fn acknowledge(&self, delivery_tag: u64) -> Result<(), Error> {
        acknowledge_on(&self.channel, delivery_tag).await
    }

    /// Without requeue the broker routes the message to the dead letter
    /// exchange every queue here is declared with.
    pub async fn reject(&self, delivery_tag: u64, requeue: bool) -> Result<(), Error> {
        self.channel
            .basic_reject(delivery_tag, BasicRejectOptions { requeue })
            .await
            .map_err(|e| anyhow!("Failed to reject message: {}", e))?;

        Ok(())
    }

    pub fn delivery_acknowledgment(&self, delivery_tag: u64) -> DeliveryAcknowledgment {
        DeliveryAcknowledgment {
            channel: self.channel.clone(),
            delivery_tag,
        }
    }
}

#[async_trait]
impl DeliveryTransport for RabbitMqClient {
    type Ack = DeliveryAcknowledgment;

    fn acknowledgment(&self, delivery_tag: u64) -> Self::Ack {
        self.delivery_acknowledgment(delivery_tag)
    }

    async fn reject(&self, delivery_tag: u64, requeue: bool) -> Result<(), Error> {
        RabbitMqClient::reject(self, delivery_tag, requeue).await
    }
}

async fn declare_dead_letter_queue(channel: &Channel, config: &Config) -> Result<(), Error> {
    channel
        .exchange_declare(
            &config.dead_letter_exchange,
            ExchangeKind::Fanout,
            ExchangeDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await
        .map_err(|e| {
            anyhow!(
                "Failed to declare dead letter exchange '{}': {}",
                config.dead_letter_exchange,
                e
            )
        })?;

    channel
        .queue_declare(
            &config.dead_letter_queue_name,
            QueueDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await
        .map_err(|e| {
            anyhow!(
                "Failed to declare dead letter queue '{}': {}",
                config.dead_letter_queue_name,
                e
            )
        })?;

    channel
        .queue_bind(
            &config.dead_letter_queue_name,
            &config.dead_letter_exchange,
            "",
            QueueBindOptions::default(),
            FieldTable::default(),
        )
        .await
        .map_err(|e| anyhow!("Failed to bind dead letter queue: {}", e))?;

    debug!(
        exchange = %config.dead_letter_exchange,
        queue = %config.dead_letter_queue_name,
        "Dead letter queue declared"
    );

    Ok(())
}

fn queue_arguments(config: &Config) -> FieldTable {
    let mut arguments = FieldTable::default();

    arguments.insert(
        "x-dead-letter-exchange".into(),
        AMQPValue::LongString(config.dead_letter_exchange.as_str().into()),
    );

    arguments
}

async fn acknowledge_on(channel: &Channel, delivery_tag: u64) -> Result<(), Error> {
    channel
        .basic_ack(delivery_tag, BasicAckOptions::default())
        .await
        .map_err(|e| anyhow!("Failed to acknowledge message: {}", e))?;

    Ok(())
}

/// Acknowledges a single delivery on the channel it arrived on.
pub struct DeliveryAcknowledgment {
    channel: Channel,
    delivery_tag: u64,
}

#[async_trait]
impl Acknowledgment for DeliveryAcknowledgment {
    async fn acknowledge(self) -> Result<(), Error> {
        acknowledge_on(&self.channel, self.delivery_tag).await
    }
}
