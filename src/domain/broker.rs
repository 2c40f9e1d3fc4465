use async_trait::async_trait;
use std::fmt::Debug;
use thiserror::Error;

/// Outbound side of the MQTT broker. Every publish is retained and delivered at least once.
#[async_trait]
pub trait Broker: Debug + Send + Sync {
    async fn publish_retained(&self, topic: &str, payload: String) -> Result<(), BrokerError>;

    /// Clears the retained message of `topic` for new subscribers.
    async fn retract(&self, topic: &str) -> Result<(), BrokerError> {
        self.publish_retained(topic, String::new()).await
    }
}

#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("broker refused publish to '{topic}': {reason}")]
    PublishRefused { topic: String, reason: String },
}
