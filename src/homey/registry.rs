use crate::domain::{Device, DeviceRegistry, RegistryError};
use crate::homey::domain::{CapabilityValuePut, DeviceGet};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, info, instrument};

/// Device registry backed by the Homey Web API.
#[derive(Debug)]
pub struct HomeyRegistry {
    client: Client,
    url: String,
}

impl HomeyRegistry {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        HomeyRegistry { client, url: url.into() }
    }
}

#[async_trait]
impl DeviceRegistry for HomeyRegistry {
    #[instrument(skip(self))]
    async fn list_devices(&self) -> Result<Vec<Device>, RegistryError> {
        info!("Retrieving Homey devices...");

        let response = self
            .client
            .get(format!("{}/api/manager/devices/device/", self.url))
            .send()
            .await?
            .error_for_status()?;

        let devices = response.json::<HashMap<String, DeviceGet>>().await?;
        info!("Retrieving Homey devices... OK, {} found", devices.len());

        let mut devices = devices.into_values().map(Device::from).collect::<Vec<_>>();
        devices.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(devices)
    }

    #[instrument(skip(self, value))]
    async fn set_capability_value(&self, device_id: &str, capability_id: &str, value: Value) -> Result<(), RegistryError> {
        let response = self
            .client
            .put(format!("{}/api/manager/devices/device/{}/capability/{}", self.url, device_id, capability_id))
            .json(&CapabilityValuePut { value: &value })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(RegistryError::Rejected { status, body });
        }

        debug!("Set capability '{}' of device '{}' to {}", capability_id, device_id, value);
        Ok(())
    }
}
