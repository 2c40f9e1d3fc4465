use crate::domain::device::Device;
use serde_json::Value;

/// Lifecycle notifications coming from the device registry.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryEvent {
    DeviceCreated(Device),
    DeviceUpdated(Device),
    DeviceDeleted(Device),
    CapabilityChanged {
        device_id: String,
        capability_id: String,
        value: Value,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum BrokerEvent {
    PublishReceived {
        topic: String,
        payload: Vec<u8>,
        client_id: Option<String>,
    },
}
