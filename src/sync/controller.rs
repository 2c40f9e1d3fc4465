use crate::domain::{BrokerEvent, Device, DeviceRegistry, RegistryEvent};
use crate::flow_trigger::{FlowTrigger, TopicPublished, cards_for};
use crate::sync::command::{is_command_topic, parse_commands};
use crate::sync::publisher::{DevicePublisher, HOMEY_PREFIX, HOMIE_PREFIX};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::Receiver;
use tracing::{debug, info, instrument, trace, warn};

/// Keeps the broker's retained topics in line with the device registry and turns inbound
/// command publishes into capability writes.
#[derive(Debug)]
pub struct SyncController {
    registry: Arc<dyn DeviceRegistry>,
    publisher: DevicePublisher,
    flow_trigger: Option<Arc<dyn FlowTrigger>>,
    specific_topics: Vec<String>,
    // Last observed state of every published device
    devices: HashMap<String, Device>,
}

impl SyncController {
    pub fn new(registry: Arc<dyn DeviceRegistry>, publisher: DevicePublisher) -> Self {
        SyncController {
            registry,
            publisher,
            flow_trigger: None,
            specific_topics: Vec::new(),
            devices: HashMap::new(),
        }
    }

    pub fn with_flow_trigger(mut self, flow_trigger: Arc<dyn FlowTrigger>, specific_topics: Vec<String>) -> Self {
        self.flow_trigger = Some(flow_trigger);
        self.specific_topics = specific_topics;
        self
    }

    #[cfg(test)]
    pub fn publisher(&self) -> &DevicePublisher {
        &self.publisher
    }

    #[cfg(test)]
    pub fn is_published(&self, device_id: &str) -> bool {
        self.devices.contains_key(device_id)
    }

    /// Publishes the registry snapshot, then processes both event feeds until they are closed.
    #[instrument(skip_all)]
    pub async fn run(mut self, mut registry_rx: Receiver<RegistryEvent>, mut broker_rx: Receiver<BrokerEvent>) {
        self.publish_snapshot().await;

        let mut registry_open = true;
        let mut broker_open = true;
        while registry_open || broker_open {
            tokio::select! {
                event = registry_rx.recv(), if registry_open => match event {
                    Some(event) => self.handle_registry_event(event).await,
                    None => registry_open = false,
                },
                event = broker_rx.recv(), if broker_open => match event {
                    Some(event) => self.handle_broker_event(event).await,
                    None => broker_open = false,
                },
            }
        }

        info!(retained_topics = self.publisher.ledger().len(), "🛑 Event feeds closed, stopping synchronization");
    }

    #[instrument(skip_all)]
    pub async fn publish_snapshot(&mut self) {
        info!("Retrieving devices...");
        match self.registry.list_devices().await {
            Ok(devices) => {
                info!("Retrieving devices... OK, {} found", devices.len());
                for device in devices {
                    self.init_device(device).await;
                }
            }
            Err(e) => warn!("⚠️ Could not retrieve devices: {}", e),
        }
    }

    pub async fn handle_registry_event(&mut self, event: RegistryEvent) {
        debug!("🔵 Received registry event: {:?}", event);
        match event {
            RegistryEvent::DeviceCreated(device) => {
                info!(device_id = device.id, "Device '{}' created", device.name);
                self.init_device(device).await;
            }
            RegistryEvent::DeviceUpdated(device) => {
                info!(device_id = device.id, "Device '{}' updated", device.name);
                if let Err(e) = self.publisher.publish_device(&device).await {
                    warn!(device_id = device.id, "⚠️ Could not publish device '{}': {}", device.name, e);
                }
                self.devices.insert(device.id.clone(), device);
            }
            RegistryEvent::DeviceDeleted(device) => {
                info!(device_id = device.id, "Device '{}' deleted", device.name);
                self.devices.remove(&device.id);
                self.publisher.unpublish_device(&device).await;
            }
            RegistryEvent::CapabilityChanged {
                device_id,
                capability_id,
                value,
            } => self.capability_changed(&device_id, &capability_id, value).await,
        }
    }

    async fn init_device(&mut self, device: Device) {
        for (capability_id, capability) in &device.capabilities {
            if let Err(e) = self.publisher.publish_capability(&device, capability_id, capability, &capability.value).await {
                #[rustfmt::skip]
                warn!(device_id = device.id, capability_id, "⚠️ Could not publish capability '{}': {}", capability.id, e);
            }
        }

        if let Err(e) = self.publisher.publish_device(&device).await {
            warn!(device_id = device.id, "⚠️ Could not publish device '{}': {}", device.name, e);
        }

        info!(device_id = device.id, "🟢 Published device '{}' with {} capabilities", device.name, device.capabilities.len());
        self.devices.insert(device.id.clone(), device);
    }

    async fn capability_changed(&mut self, device_id: &str, capability_id: &str, value: Value) {
        let Some(device) = self.devices.get_mut(device_id) else {
            #[rustfmt::skip]
            debug!(device_id, capability_id, "Ignoring capability change for unpublished device '{}'", device_id);
            return;
        };

        let Some(capability) = device.capabilities.get_mut(capability_id) else {
            #[rustfmt::skip]
            warn!(device_id, capability_id, "⚠️ Unknown capability '{}' for device '{}'", capability_id, device.name);
            return;
        };

        capability.value = value;
        let capability = capability.clone();
        let device = device.clone();

        match self.publisher.publish_capability(&device, capability_id, &capability, &capability.value).await {
            Ok(()) => debug!(device_id, capability_id, "🟢 Published '{}' = {} for device '{}'", capability_id, capability.value, device.name),
            Err(e) => warn!(device_id, capability_id, "⚠️ Could not publish capability '{}': {}", capability_id, e),
        }
    }

    #[instrument(skip_all)]
    pub async fn handle_broker_event(&mut self, event: BrokerEvent) {
        let BrokerEvent::PublishReceived { topic, payload, client_id } = event;
        debug!(topic, client_id = ?client_id, "🔸 Received publish");

        if payload.is_empty() {
            // Retractions, including the echo of the bridge's own, are neither commands nor triggers
            return;
        }

        self.fire_triggers(&topic, &payload).await;

        for command in parse_commands(&topic, &payload) {
            let command = match command {
                Ok(command) => command,
                Err(e) => {
                    warn!(topic, "⚠️ Error parsing published packet: {}", e);
                    continue;
                }
            };

            info!(
                device_id = command.device_id,
                capability_id = command.capability_id,
                shape = ?command.shape,
                "➡️ Setting capability '{}' to {}",
                command.capability_id,
                command.value
            );
            if let Err(e) = self.registry.set_capability_value(&command.device_id, &command.capability_id, command.value).await {
                #[rustfmt::skip]
                warn!(device_id = command.device_id, capability_id = command.capability_id, "⚠️ Could not set capability value: {}", e);
            }
        }
    }

    async fn fire_triggers(&self, topic: &str, payload: &[u8]) {
        let Some(flow_trigger) = &self.flow_trigger else {
            return;
        };

        if is_bridge_state_topic(topic) {
            trace!(topic, "Not triggering flows for the bridge's own state topic");
            return;
        }

        let tokens = TopicPublished::new(topic, payload);
        for card in cards_for(&tokens, &self.specific_topics) {
            if let Err(e) = flow_trigger.trigger(card, &tokens).await {
                warn!(topic, "⚠️ Error triggering flow '{}': {}", card, e);
            }
        }
    }
}

/// Topics the bridge itself publishes device state on. Only the command topics inside the two
/// namespaces come from other clients.
fn is_bridge_state_topic(topic: &str) -> bool {
    let in_namespace = [HOMEY_PREFIX, HOMIE_PREFIX]
        .iter()
        .any(|prefix| topic.strip_prefix(prefix).is_some_and(|rest| rest.starts_with('/')));

    in_namespace && !is_command_topic(topic)
}
