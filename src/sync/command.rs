use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use thiserror::Error;

const UUID: &str = "[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}";
const CAPABILITY_ID: &str = "[A-Za-z0-9._-]+";

static HOMEY_COMMAND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!("^homey/devices/(?<device_id>{UUID})/capabilities/(?<capability_id>{CAPABILITY_ID})$")).unwrap());

static HOMIE_COMMAND: LazyLock<Regex> = LazyLock::new(|| Regex::new(&format!("^homie/5/(?<device_id>{UUID})/main/(?<capability_id>{CAPABILITY_ID})/set$")).unwrap());

/// Topic grammar a capability write can arrive on.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum CommandShape {
    Homey,
    Homie,
}

impl CommandShape {
    pub const ALL: [CommandShape; 2] = [CommandShape::Homey, CommandShape::Homie];

    fn regex(&self) -> &'static Regex {
        match self {
            CommandShape::Homey => &HOMEY_COMMAND,
            CommandShape::Homie => &HOMIE_COMMAND,
        }
    }

    /// Returns `None` if the topic does not have this shape, otherwise the decoded command.
    pub fn parse(&self, topic: &str, payload: &[u8]) -> Option<Result<CapabilityCommand, CommandError>> {
        let captures = self.regex().captures(topic)?;
        let device_id = captures["device_id"].to_string();
        let capability_id = captures["capability_id"].to_string();

        let result = serde_json::from_slice::<Value>(payload)
            .map(|value| CapabilityCommand {
                shape: *self,
                device_id,
                capability_id,
                value,
            })
            .map_err(|source| CommandError::MalformedPayload {
                topic: topic.to_string(),
                source,
            });

        Some(result)
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct CapabilityCommand {
    pub shape: CommandShape,
    pub device_id: String,
    pub capability_id: String,
    pub value: Value,
}

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("malformed payload on '{topic}': {source}")]
    MalformedPayload { topic: String, source: serde_json::Error },
}

/// Whether any command shape accepts `topic`, regardless of payload.
pub fn is_command_topic(topic: &str) -> bool {
    CommandShape::ALL.iter().any(|shape| shape.regex().is_match(topic))
}

/// Checks the topic against every command shape independently.
pub fn parse_commands(topic: &str, payload: &[u8]) -> Vec<Result<CapabilityCommand, CommandError>> {
    CommandShape::ALL.iter().filter_map(|shape| shape.parse(topic, payload)).collect()
}
