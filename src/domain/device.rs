use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(PartialEq, Debug, Clone)]
pub struct Device {
    pub id: String,
    pub name: String,
    pub available: bool,
    pub capabilities: BTreeMap<String, Capability>,
}

impl Device {
    #[cfg(test)]
    pub fn capability(&self, capability_id: &str) -> Option<&Capability> {
        self.capabilities.get(capability_id)
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct Capability {
    pub id: String,
    pub title: String,
    pub r#type: CapabilityType,
    pub units: Option<String>,
    pub getable: bool,
    pub setable: bool,
    pub value: Value,
}

/// Native value domain of a capability as exposed by the registry.
#[derive(PartialEq, Eq, Debug, Clone)]
pub enum CapabilityType {
    Number,
    String,
    Boolean,
    Enum,
    Other(String),
}

impl CapabilityType {
    pub fn as_str(&self) -> &str {
        match self {
            CapabilityType::Number => "number",
            CapabilityType::String => "string",
            CapabilityType::Boolean => "boolean",
            CapabilityType::Enum => "enum",
            CapabilityType::Other(other) => other,
        }
    }
}

impl From<&str> for CapabilityType {
    fn from(value: &str) -> Self {
        match value {
            "number" => CapabilityType::Number,
            "string" => CapabilityType::String,
            "boolean" => CapabilityType::Boolean,
            "enum" => CapabilityType::Enum,
            other => CapabilityType::Other(other.to_string()),
        }
    }
}

impl Serialize for CapabilityType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}
