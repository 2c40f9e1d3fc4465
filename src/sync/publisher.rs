use crate::domain::{BrokerError, Capability, Device};
use crate::sync::datatype::homie_datatype;
use crate::sync::ledger::TopicLedger;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

pub const HOMEY_PREFIX: &str = "homey/devices";
pub const HOMIE_PREFIX: &str = "homie/5";
const HOMIE_VERSION: &str = "3.0";

#[derive(Debug, Clone, Copy, Default)]
pub struct PublisherOptions {
    /// Also retract the `homie/5/<id>/` subtree when a device is removed.
    pub retract_homie_on_delete: bool,
    /// Publish the capability's own `setable` flag as `$settable` instead of always `true`.
    pub settable_from_capability: bool,
}

/// Writes devices and their capabilities into the `homey/devices` and `homie/5` namespaces.
#[derive(Debug)]
pub struct DevicePublisher {
    ledger: TopicLedger,
    options: PublisherOptions,
}

impl DevicePublisher {
    pub fn new(ledger: TopicLedger, options: PublisherOptions) -> Self {
        DevicePublisher { ledger, options }
    }

    pub fn ledger(&self) -> &TopicLedger {
        &self.ledger
    }

    #[instrument(skip_all, fields(device_id = device.id))]
    pub async fn publish_device(&mut self, device: &Device) -> Result<(), BrokerError> {
        let homey = format!("{}/{}", HOMEY_PREFIX, device.id);
        let homie = format!("{}/{}", HOMIE_PREFIX, device.id);
        let state = if device.available { "ready" } else { "disconnected" };

        let result = self
            .publish_all(vec![
                (format!("{homey}/id"), json(&device.id)),
                (format!("{homey}/name"), json(&device.name)),
                (format!("{homie}/$homie"), HOMIE_VERSION.to_string()),
                (format!("{homie}/$name"), device.name.clone()),
                (format!("{homie}/$state"), state.to_string()),
            ])
            .await;

        debug!("📤 Published device '{}'", device.name);
        result
    }

    #[instrument(skip_all, fields(device_id = device.id, capability_id = capability_id))]
    pub async fn publish_capability(&mut self, device: &Device, capability_id: &str, capability: &Capability, value: &Value) -> Result<(), BrokerError> {
        let homey = format!("{}/{}/capabilities/{}", HOMEY_PREFIX, device.id, capability_id);
        let homie = format!("{}/{}/main/{}", HOMIE_PREFIX, device.id, capability_id);

        // Only the bare capability topic is cleared, its sub-topics are overwritten below
        let retracted = self.ledger.retract(&homey).await;
        if let Err(e) = &retracted {
            warn!(topic = homey, "⚠️ Could not retract topic: {}", e);
        }

        let datatype = homie_datatype(&capability.r#type).map(|d| d.as_str()).unwrap_or_default();
        let settable = !self.options.settable_from_capability || capability.setable;

        let published = self
            .publish_all(vec![
                (format!("{homey}/value"), json(value)),
                (format!("{homey}/name"), json(&capability.title)),
                (format!("{homey}/type"), json(&capability.r#type)),
                (format!("{homey}/units"), json(&capability.units)),
                (format!("{homey}/getable"), json(&capability.getable)),
                (format!("{homey}/setable"), json(&capability.setable)),
                (homie.clone(), plain(value)),
                (format!("{homie}/$name"), capability.title.clone()),
                (format!("{homie}/$unit"), capability.units.clone().unwrap_or_default()),
                (format!("{homie}/$datatype"), datatype.to_string()),
                (format!("{homie}/$settable"), settable.to_string()),
            ])
            .await;

        debug!("📤 Published capability '{}' of device '{}'", capability_id, device.name);
        retracted.and(published)
    }

    /// Publishes every topic even if some are refused, and returns the first refusal.
    async fn publish_all(&mut self, topics: Vec<(String, String)>) -> Result<(), BrokerError> {
        let mut result = Ok(());
        for (topic, payload) in topics {
            if let Err(e) = self.ledger.publish(topic.clone(), payload).await {
                warn!(topic, "⚠️ Could not publish topic: {}", e);
                result = result.and(Err(e));
            }
        }

        result
    }

    /// Retracts the device's `homey/devices` subtree and returns the number of retracted topics.
    /// The `homie/5` subtree stays retained unless `retract_homie_on_delete` is set.
    #[instrument(skip_all, fields(device_id = device.id))]
    pub async fn unpublish_device(&mut self, device: &Device) -> usize {
        let mut retracted = self.ledger.retract_prefix(&format!("{}/{}/", HOMEY_PREFIX, device.id)).await;
        if self.options.retract_homie_on_delete {
            retracted += self.ledger.retract_prefix(&format!("{}/{}/", HOMIE_PREFIX, device.id)).await;
        }

        debug!("📤 Retracted {} topic(s) of device '{}'", retracted, device.name);
        retracted
    }
}

fn json<T: Serialize + ?Sized>(value: &T) -> String {
    // Serializing plain strings, booleans, options and JSON values cannot fail
    serde_json::to_string(value).unwrap_or_default()
}

/// Homie payloads carry the bare value: strings unquoted, everything else as its JSON text.
fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
