use crate::domain::device::Device;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt::Debug;
use thiserror::Error;

#[async_trait]
pub trait DeviceRegistry: Debug + Send + Sync {
    async fn list_devices(&self) -> Result<Vec<Device>, RegistryError>;

    async fn set_capability_value(&self, device_id: &str, capability_id: &str, value: Value) -> Result<(), RegistryError>;
}

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("request error: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("registry rejected the request with status {status}: {body}")]
    Rejected { status: u16, body: String },
}
