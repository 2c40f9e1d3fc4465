use crate::app_config::AppConfig;
use crate::domain::{Device, RegistryEvent};
use crate::homey::domain::{CapabilityChanged, DeviceGet};
use crate::sse::{self, ServerSentEvent};
use reqwest::Client;
use std::error::Error;
use tokio::sync::mpsc::{self, Sender};
use tracing::{debug, instrument, warn};

/// Follows the Homey device event stream and forwards it as registry events.
#[instrument(skip_all)]
pub async fn listen(tx: Sender<RegistryEvent>, client: Client, config: &AppConfig) -> Result<(), Box<dyn Error + Send + Sync>> {
    let sse_config = sse::Config {
        url: format!("{}/api/manager/devices/eventstream", config.homey().url()),
        retry_ms: config.homey().retry_ms(),
        retry_max_delay: config.homey().retry_max_delay(),
        stale_connection_timeout: config.homey().stale_connection_timeout(),
    };

    let (sse_tx, mut sse_rx) = mpsc::channel::<ServerSentEvent>(config.core().event_buffer_size());
    let forward = tokio::spawn(async move {
        while let Some(event) = sse_rx.recv().await {
            match to_registry_event(&event) {
                Ok(Some(registry_event)) => {
                    if tx.send(registry_event).await.is_err() {
                        return;
                    }
                }
                Ok(None) => debug!("Skipping event {:?}", event.event),
                Err(e) => warn!("⚠️ Could not read event {:?}: {}", event.event, e),
            }
        }
    });

    let result = sse::listen(sse_tx, &client, &sse_config).await;
    forward.abort();
    result
}

fn to_registry_event(event: &ServerSentEvent) -> Result<Option<RegistryEvent>, serde_json::Error> {
    let device = || event.data_as::<DeviceGet>().map(|data| data.map(Device::from));

    let registry_event = match event.event.as_deref() {
        Some("device.create") => device()?.map(RegistryEvent::DeviceCreated),
        Some("device.update") => device()?.map(RegistryEvent::DeviceUpdated),
        Some("device.delete") => device()?.map(RegistryEvent::DeviceDeleted),
        Some("device.capability") => event.data_as::<CapabilityChanged>()?.map(|changed| RegistryEvent::CapabilityChanged {
            device_id: changed.device_id,
            capability_id: changed.capability_id,
            value: changed.value,
        }),
        _ => None,
    };

    Ok(registry_event)
}
