use crate::domain::CapabilityType;

/// Datatype vocabulary of the Homie convention that native capability types map onto.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum HomieDatatype {
    Integer,
    String,
    Boolean,
    Enum,
}

impl HomieDatatype {
    pub fn as_str(&self) -> &'static str {
        match self {
            HomieDatatype::Integer => "integer",
            HomieDatatype::String => "string",
            HomieDatatype::Boolean => "boolean",
            HomieDatatype::Enum => "enum",
        }
    }
}

pub fn homie_datatype(capability_type: &CapabilityType) -> Option<HomieDatatype> {
    match capability_type {
        CapabilityType::Number => Some(HomieDatatype::Integer),
        CapabilityType::String => Some(HomieDatatype::String),
        CapabilityType::Boolean => Some(HomieDatatype::Boolean),
        CapabilityType::Enum => Some(HomieDatatype::Enum),
        CapabilityType::Other(_) => None,
    }
}
