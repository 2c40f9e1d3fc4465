use crate::domain::{Capability, CapabilityType, Device};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
pub struct DeviceGet {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub available: bool,
    #[serde(rename = "capabilitiesObj", default)]
    pub capabilities_obj: Option<HashMap<String, CapabilityGet>>,
}

#[derive(Debug, Deserialize)]
pub struct CapabilityGet {
    pub id: String,
    pub title: String,
    pub r#type: String,
    #[serde(default)]
    pub units: Option<String>,
    #[serde(default)]
    pub getable: bool,
    #[serde(default)]
    pub setable: bool,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityChanged {
    pub device_id: String,
    pub capability_id: String,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, serde::Serialize)]
pub struct CapabilityValuePut<'a> {
    pub value: &'a Value,
}

impl From<DeviceGet> for Device {
    fn from(device_get: DeviceGet) -> Self {
        Device {
            id: device_get.id,
            name: device_get.name,
            available: device_get.available,
            capabilities: device_get
                .capabilities_obj
                .unwrap_or_default()
                .into_iter()
                .map(|(capability_id, capability_get)| (capability_id, capability_get.into()))
                .collect(),
        }
    }
}

impl From<CapabilityGet> for Capability {
    fn from(capability_get: CapabilityGet) -> Self {
        Capability {
            id: capability_get.id,
            title: capability_get.title,
            r#type: CapabilityType::from(capability_get.r#type.as_str()),
            units: capability_get.units,
            getable: capability_get.getable,
            setable: capability_get.setable,
            value: capability_get.value,
        }
    }
}
