use crate::app_config::AppConfig;
use crate::domain::{BrokerEvent, RegistryEvent};
use crate::flow_trigger::WebhookFlowTrigger;
use crate::homey::HomeyRegistry;
use crate::sync::{DevicePublisher, SyncController, TopicLedger};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task;
use tracing::{error, info, warn};

mod app_config;
mod domain;
mod flow_trigger;
mod homey;
mod mqtt;
mod sse;
mod sync;
#[cfg(test)]
mod testing;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

    info!("🪵 Starting {} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    let config = Arc::new(AppConfig::load()?);
    info!("✅  Loaded configuration");

    let homey_client = homey::new_client(&config)?;
    let registry = Arc::new(HomeyRegistry::new(homey_client.clone(), config.homey().url()));

    let (broker, event_loop) = mqtt::new_client(&config);
    let (broker_tx, broker_rx) = mpsc::channel::<BrokerEvent>(config.core().event_buffer_size());
    let mqtt_client = broker.client().clone();
    let mut subscriptions = config.mqtt().subscriptions().to_vec();
    if config.triggers().webhook_url().is_some() {
        subscriptions.extend(config.triggers().subscriptions().iter().cloned());
    }
    let reconnect_delay = config.mqtt().reconnect_delay();
    task::spawn(async move {
        mqtt::listen(event_loop, mqtt_client, subscriptions, reconnect_delay, broker_tx).await;
    });
    info!("✅  Initialized MQTT listener for {}:{}", config.mqtt().host(), config.mqtt().port());

    let (registry_tx, registry_rx) = mpsc::channel::<RegistryEvent>(config.core().event_buffer_size());
    let listen_config = config.clone();
    task::spawn(async move {
        if let Err(e) = homey::listen(registry_tx, homey_client, &listen_config).await {
            error!("❌ Homey event stream stopped: {}", e);
        }
    });
    info!("✅  Initialized Homey event listener");

    let publisher = DevicePublisher::new(TopicLedger::new(Arc::new(broker)), config.bridge().publisher_options());
    let mut controller = SyncController::new(registry, publisher);
    if let Some(webhook_url) = config.triggers().webhook_url() {
        let flow_trigger = Arc::new(WebhookFlowTrigger::new(reqwest::Client::new(), webhook_url.to_string()));
        controller = controller.with_flow_trigger(flow_trigger, config.triggers().specific_topics().to_vec());
        info!("✅  Forwarding flow triggers to {}", webhook_url);
    }

    info!("🔥 {} is up and running", env!("CARGO_PKG_NAME"));

    tokio::select! {
        _ = controller.run(registry_rx, broker_rx) => warn!("🔴 Synchronization stopped"),
        _ = tokio::signal::ctrl_c() => info!("🛑 Received Ctrl-C, shutting down"),
    }

    Ok(())
}
