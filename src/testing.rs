use crate::domain::{Broker, BrokerError, Capability, CapabilityType, Device, DeviceRegistry, RegistryError};
use crate::flow_trigger::{FlowTrigger, FlowTriggerError, TopicPublished, TriggerCard};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

pub const LAMP_ID: &str = "11111111-1111-1111-1111-111111111111";

pub fn lamp() -> Device {
    Device {
        id: LAMP_ID.to_string(),
        name: "Lamp".to_string(),
        available: true,
        capabilities: BTreeMap::from([(
            "onoff".to_string(),
            Capability {
                id: "onoff".to_string(),
                title: "On/Off".to_string(),
                r#type: CapabilityType::Boolean,
                units: None,
                getable: true,
                setable: true,
                value: Value::Bool(true),
            },
        )]),
    }
}

#[derive(Debug, Default)]
struct BrokerState {
    published: Vec<(String, String)>,
    retained: BTreeMap<String, String>,
    fail: bool,
    refused: BTreeSet<String>,
}

/// Broker that keeps retained state in memory the way a real broker would.
#[derive(Debug, Default)]
pub struct RecordingBroker {
    state: Mutex<BrokerState>,
}

impl RecordingBroker {
    pub fn fail_publishes(&self, fail: bool) {
        self.state.lock().unwrap().fail = fail;
    }

    pub fn refuse_topic(&self, topic: &str) {
        self.state.lock().unwrap().refused.insert(topic.to_string());
    }

    pub fn published(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().published.clone()
    }

    pub fn retained(&self, topic: &str) -> Option<String> {
        self.state.lock().unwrap().retained.get(topic).cloned()
    }

    pub fn retained_topics(&self) -> Vec<String> {
        self.state.lock().unwrap().retained.keys().cloned().collect()
    }
}

#[async_trait]
impl Broker for RecordingBroker {
    async fn publish_retained(&self, topic: &str, payload: String) -> Result<(), BrokerError> {
        let mut state = self.state.lock().unwrap();
        if state.fail || state.refused.contains(topic) {
            return Err(BrokerError::PublishRefused {
                topic: topic.to_string(),
                reason: "broker unavailable".to_string(),
            });
        }

        state.published.push((topic.to_string(), payload.clone()));
        if payload.is_empty() {
            state.retained.remove(topic);
        } else {
            state.retained.insert(topic.to_string(), payload);
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct FakeRegistry {
    devices: Vec<Device>,
    writes: Mutex<Vec<(String, String, Value)>>,
}

impl FakeRegistry {
    pub fn with_devices(devices: Vec<Device>) -> Self {
        FakeRegistry {
            devices,
            writes: Mutex::new(Vec::new()),
        }
    }

    pub fn writes(&self) -> Vec<(String, String, Value)> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeviceRegistry for FakeRegistry {
    async fn list_devices(&self) -> Result<Vec<Device>, RegistryError> {
        Ok(self.devices.clone())
    }

    async fn set_capability_value(&self, device_id: &str, capability_id: &str, value: Value) -> Result<(), RegistryError> {
        let known = self
            .devices
            .iter()
            .any(|device| device.id == device_id && device.capability(capability_id).is_some());

        if !known {
            return Err(RegistryError::Rejected {
                status: 404,
                body: format!("Not Found: {device_id}/{capability_id}"),
            });
        }

        self.writes.lock().unwrap().push((device_id.to_string(), capability_id.to_string(), value));
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct RecordingFlowTrigger {
    fired: Mutex<Vec<(TriggerCard, TopicPublished)>>,
}

impl RecordingFlowTrigger {
    pub fn fired(&self) -> Vec<(TriggerCard, TopicPublished)> {
        self.fired.lock().unwrap().clone()
    }
}

#[async_trait]
impl FlowTrigger for RecordingFlowTrigger {
    async fn trigger(&self, card: TriggerCard, tokens: &TopicPublished) -> Result<(), FlowTriggerError> {
        self.fired.lock().unwrap().push((card, tokens.clone()));
        Ok(())
    }
}
