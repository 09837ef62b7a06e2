use std::{fmt::Display, sync::Arc};

use anyhow::{Error, Result, anyhow};
use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use lapin::message::Delivery;
use serde::de::Error as _;
use tokio::{sync::watch, task::JoinSet};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    clients::rbmq::RabbitMqClient,
    dispatcher::{Acknowledgment, NotificationHandler, QueueBinding},
    error::DispatchError,
    models::category::NotificationCategory,
    utils::shutdown_signal,
};

/// Broker operations a listener needs to settle one delivery.
#[async_trait]
pub trait DeliveryTransport: Send + Sync {
    type Ack: Acknowledgment;

    fn acknowledgment(&self, delivery_tag: u64) -> Self::Ack;

    async fn reject(&self, delivery_tag: u64, requeue: bool) -> Result<(), Error>;
}

/// The parts of a broker delivery the listener looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub delivery_tag: u64,
    pub redelivered: bool,
    pub data: Vec<u8>,
}

impl From<Delivery> for IncomingMessage {
    fn from(delivery: Delivery) -> Self {
        Self {
            delivery_tag: delivery.delivery_tag,
            redelivered: delivery.redelivered,
            data: delivery.data,
        }
    }
}

/// What the transport does with a delivery once dispatch has finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// The dispatcher acknowledged it.
    Acknowledged,
    /// Hand it back to the broker for redelivery.
    Requeue,
    /// Reject without requeue; the broker moves it to the dead letter queue.
    DeadLetter,
    /// Acknowledging failed after the handler ran; the broker redelivers
    /// once the channel closes.
    Unsettled,
}

impl Settlement {
    pub fn for_result(result: &Result<(), DispatchError>) -> Self {
        match result {
            Ok(()) => Settlement::Acknowledged,
            Err(DispatchError::Acknowledgment { .. }) => Settlement::Unsettled,
            Err(e) if e.is_redeliverable() => Settlement::Requeue,
            Err(_) => Settlement::DeadLetter,
        }
    }
}

/// Message bodies are JSON text; anything that is not UTF-8 is malformed.
pub fn decode_body(category: NotificationCategory, data: &[u8]) -> Result<&str, DispatchError> {
    std::str::from_utf8(data).map_err(|e| DispatchError::Deserialization {
        category,
        source: serde_json::Error::custom(format!("message body is not UTF-8: {}", e)),
    })
}

/// Starts one listener per binding and runs until a listener fails or a
/// shutdown signal arrives. In-flight deliveries finish before it returns.
pub async fn run_listeners<H>(
    client: Arc<RabbitMqClient>,
    bindings: Vec<QueueBinding>,
    handler: Arc<H>,
    concurrency: usize,
) -> Result<(), Error>
where
    H: NotificationHandler + 'static,
{
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut listeners = JoinSet::new();

    for binding in bindings {
        listeners.spawn(run_listener(
            Arc::clone(&client),
            binding,
            Arc::clone(&handler),
            concurrency,
            shutdown_rx.clone(),
        ));
    }

    let first = tokio::select! {
        joined = listeners.join_next() => joined,
        _ = shutdown_signal() => {
            info!("Shutdown signal received, draining in-flight deliveries");
            None
        }
    };

    let _ = shutdown_tx.send(true);

    let mut outcome = match first {
        Some(Ok(result)) => result,
        Some(Err(e)) => Err(anyhow!("Listener task panicked: {}", e)),
        None => Ok(()),
    };

    while let Some(joined) = listeners.join_next().await {
        let result = joined
            .map_err(|e| anyhow!("Listener task panicked: {}", e))
            .and_then(|result| result);

        if let Err(e) = result {
            error!(error = %e, "Listener stopped with an error");
            if outcome.is_ok() {
                outcome = Err(e);
            }
        }
    }

    outcome
}

pub async fn run_listener<H>(
    client: Arc<RabbitMqClient>,
    binding: QueueBinding,
    handler: Arc<H>,
    concurrency: usize,
    shutdown: watch::Receiver<bool>,
) -> Result<(), Error>
where
    H: NotificationHandler + ?Sized,
{
    let consumer_tag = format!("notification_listener_{}_{}", binding.category, Uuid::new_v4());
    let consumer = client
        .create_consumer(&binding.queue_name, &consumer_tag)
        .await?;

    info!(
        queue = %binding.queue_name,
        category = %binding.category,
        role = %binding.category.role(),
        concurrency,
        "Listening for notifications"
    );

    let stopping = shutdown.clone();

    consume_messages(
        consumer.map(|delivery| delivery.map(IncomingMessage::from)),
        client.as_ref(),
        &binding,
        handler.as_ref(),
        concurrency,
        shutdown,
    )
    .await;

    if *stopping.borrow() {
        info!(queue = %binding.queue_name, "Listener stopped");
        Ok(())
    } else {
        Err(anyhow!("Consumer for queue '{}' stopped", binding.queue_name))
    }
}

/// Handles messages concurrently until the stream ends or `shutdown` turns
/// true. No new message is taken after shutdown; those already started run
/// to completion.
pub async fn consume_messages<S, E, T, H>(
    messages: S,
    transport: &T,
    binding: &QueueBinding,
    handler: &H,
    concurrency: usize,
    mut shutdown: watch::Receiver<bool>,
) where
    S: Stream<Item = Result<IncomingMessage, E>>,
    E: Display,
    T: DeliveryTransport + ?Sized,
    H: NotificationHandler + ?Sized,
{
    let stopped = async move {
        let sender_dropped = shutdown.wait_for(|stop| *stop).await.is_err();
        if sender_dropped {
            std::future::pending::<()>().await;
        }
    };

    messages
        .take_until(stopped)
        .for_each_concurrent(concurrency, |message| async move {
            match message {
                Ok(message) => {
                    handle_message(transport, binding, handler, message).await;
                }
                Err(e) => {
                    error!(queue = %binding.queue_name, error = %e, "Failed to receive delivery")
                }
            }
        })
        .await;
}

/// Dispatches one message and settles it with the transport.
pub async fn handle_message<T, H>(
    transport: &T,
    binding: &QueueBinding,
    handler: &H,
    message: IncomingMessage,
) -> Settlement
where
    T: DeliveryTransport + ?Sized,
    H: NotificationHandler + ?Sized,
{
    let delivery_tag = message.delivery_tag;
    let ack = transport.acknowledgment(delivery_tag);

    let result = match decode_body(binding.category, &message.data) {
        Ok(body) => binding.dispatch(body, handler, ack).await,
        Err(e) => Err(e),
    };

    let settlement = Settlement::for_result(&result);

    match (&result, settlement) {
        (Ok(()), _) => {
            debug!(queue = %binding.queue_name, delivery_tag, "Delivery settled");
        }
        (Err(e), Settlement::Unsettled) => {
            error!(
                queue = %binding.queue_name,
                delivery_tag,
                error = %e,
                "Notification forwarded but acknowledgment failed"
            );
        }
        (Err(e), settlement) => {
            let requeue = settlement == Settlement::Requeue;

            warn!(
                queue = %binding.queue_name,
                category = %e.category(),
                delivery_tag,
                redelivered = message.redelivered,
                requeue,
                error = %e,
                "Message left unacknowledged"
            );

            if let Err(reject_err) = transport.reject(delivery_tag, requeue).await {
                error!(
                    queue = %binding.queue_name,
                    delivery_tag,
                    error = %reject_err,
                    "Failed to hand message back to the broker"
                );
            }
        }
    }

    settlement
}
