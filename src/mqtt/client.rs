use crate::app_config::AppConfig;
use crate::domain::{Broker, BrokerError};
use async_trait::async_trait;
use rumqttc::{AsyncClient, EventLoop, MqttOptions, QoS};

const REQUEST_CAPACITY: usize = 64;

pub fn new_client(config: &AppConfig) -> (MqttBroker, EventLoop) {
    let mqtt = config.mqtt();
    let mut options = MqttOptions::new(mqtt.client_id(), mqtt.host(), mqtt.port());
    options.set_keep_alive(mqtt.keep_alive());
    if let Some((username, password)) = mqtt.credentials() {
        options.set_credentials(username, password);
    }

    let (client, event_loop) = AsyncClient::new(options, REQUEST_CAPACITY);
    (MqttBroker { client }, event_loop)
}

#[derive(Debug, Clone)]
pub struct MqttBroker {
    client: AsyncClient,
}

impl MqttBroker {
    pub fn client(&self) -> &AsyncClient {
        &self.client
    }
}

#[async_trait]
impl Broker for MqttBroker {
    async fn publish_retained(&self, topic: &str, payload: String) -> Result<(), BrokerError> {
        self.client
            .publish(topic, QoS::AtLeastOnce, true, payload)
            .await
            .map_err(|e| BrokerError::PublishRefused {
                topic: topic.to_string(),
                reason: e.to_string(),
            })
    }
}
