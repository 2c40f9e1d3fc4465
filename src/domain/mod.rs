pub mod broker;
pub mod device;
pub mod events;
pub mod registry;

pub use broker::{Broker, BrokerError};
pub use device::{Capability, CapabilityType, Device};
pub use events::{BrokerEvent, RegistryEvent};
pub use registry::{DeviceRegistry, RegistryError};
