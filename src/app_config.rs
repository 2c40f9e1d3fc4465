use crate::sync::PublisherOptions;
use config::{Config, ConfigError};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    core: Core,
    mqtt: Mqtt,
    homey: Homey,
    #[serde(default)]
    bridge: Bridge,
    #[serde(default)]
    triggers: Triggers,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(config::File::with_name("config").required(true))
            .add_source(config::File::with_name("config_local").required(false))
            .add_source(config::Environment::default().separator("__"))
            .build()?
            .try_deserialize()
    }

    pub fn core(&self) -> &Core {
        &self.core
    }

    pub fn mqtt(&self) -> &Mqtt {
        &self.mqtt
    }

    pub fn homey(&self) -> &Homey {
        &self.homey
    }

    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    pub fn triggers(&self) -> &Triggers {
        &self.triggers
    }
}

#[derive(Debug, Deserialize)]
pub struct Core {
    event_buffer_size: usize,
}

impl Core {
    pub fn event_buffer_size(&self) -> usize {
        self.event_buffer_size
    }
}

#[derive(Debug, Deserialize)]
pub struct Mqtt {
    host: String,
    port: u16,
    client_id: String,
    username: Option<String>,
    password: Option<String>,
    keep_alive_secs: u64,
    reconnect_delay_ms: u64,
    #[serde(default = "default_subscriptions")]
    subscriptions: Vec<String>,
}

fn default_subscriptions() -> Vec<String> {
    vec!["homey/devices/+/capabilities/+".to_string(), "homie/5/+/main/+/set".to_string()]
}

impl Mqtt {
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some((username.as_str(), password.as_str())),
            (Some(username), None) => Some((username.as_str(), "")),
            _ => None,
        }
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn subscriptions(&self) -> &[String] {
        &self.subscriptions
    }
}

#[derive(Debug, Deserialize)]
pub struct Homey {
    url: String,
    token: String,
    retry_ms: u64,
    retry_max_delay_ms: u64,
    stale_connection_timeout_ms: u64,
}

impl Homey {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn retry_ms(&self) -> u64 {
        self.retry_ms
    }

    pub fn retry_max_delay(&self) -> Duration {
        Duration::from_millis(self.retry_max_delay_ms)
    }

    pub fn stale_connection_timeout(&self) -> Duration {
        Duration::from_millis(self.stale_connection_timeout_ms)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Bridge {
    #[serde(default)]
    retract_homie_on_delete: bool,
    #[serde(default)]
    settable_from_capability: bool,
}

impl Bridge {
    pub fn publisher_options(&self) -> PublisherOptions {
        PublisherOptions {
            retract_homie_on_delete: self.retract_homie_on_delete,
            settable_from_capability: self.settable_from_capability,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Triggers {
    webhook_url: Option<String>,
    #[serde(default)]
    subscriptions: Vec<String>,
    #[serde(default)]
    specific_topics: Vec<String>,
}

impl Triggers {
    pub fn webhook_url(&self) -> Option<&str> {
        self.webhook_url.as_deref()
    }

    /// Extra topic filters subscribed to for flow triggers only.
    pub fn subscriptions(&self) -> &[String] {
        &self.subscriptions
    }

    pub fn specific_topics(&self) -> &[String] {
        &self.specific_topics
    }
}

#[cfg(test)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

#[cfg(test)]
impl AppConfigBuilder {
    pub fn new() -> Self {
        AppConfigBuilder {
            config: AppConfig {
                core: Core { event_buffer_size: 1 },
                mqtt: Mqtt {
                    host: "localhost".to_string(),
                    port: 1883,
                    client_id: "homey-mqtt-bridge".to_string(),
                    username: None,
                    password: None,
                    keep_alive_secs: 30,
                    reconnect_delay_ms: 100,
                    subscriptions: default_subscriptions(),
                },
                homey: Homey {
                    url: "https://homey.url".to_string(),
                    token: "token".to_string(),
                    retry_ms: 100,
                    retry_max_delay_ms: 200,
                    stale_connection_timeout_ms: 30_000,
                },
                bridge: Bridge::default(),
                triggers: Triggers::default(),
            },
        }
    }

    pub fn homey_url(mut self, url: String) -> Self {
        self.config.homey.url = url;
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}
