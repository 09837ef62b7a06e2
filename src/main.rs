use std::sync::Arc;

use anyhow::{Error, Result};
use notification_listener::{
    api::run_api_server, clients::facade::FacadeClient, clients::rbmq::RabbitMqClient,
    config::Config, dispatcher::QueueBinding, listener::run_listeners, utils::init_tracing,
};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config = Config::load()?;
    init_tracing(config.log_format);

    let facade_client = FacadeClient::new(&config)?;
    let rabbitmq = Arc::new(RabbitMqClient::connect(&config).await?);

    let api_config = config.clone();
    let api_facade = facade_client.clone();
    tokio::spawn(async move {
        if let Err(e) = run_api_server(api_config, api_facade).await {
            error!(error = %e, "Health check server stopped");
        }
    });

    let bindings = QueueBinding::from_config(&config);
    info!(queues = bindings.len(), "Notification listener starting");

    run_listeners(
        rabbitmq,
        bindings,
        Arc::new(facade_client),
        config.worker_concurrency,
    )
    .await?;

    info!("Notification listener stopped");

    Ok(())
}
