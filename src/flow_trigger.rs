use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::fmt::{Debug, Display, Formatter};
use thiserror::Error;
use tracing::{debug, instrument};

/// Trigger cards an inbound publish can fire in the automation engine.
#[derive(PartialEq, Eq, Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TriggerCard {
    AnyTopicPublished,
    SpecificTopicPublished,
}

impl Display for TriggerCard {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TriggerCard::AnyTopicPublished => write!(f, "any-topic-published"),
            TriggerCard::SpecificTopicPublished => write!(f, "specific-topic-published"),
        }
    }
}

#[derive(PartialEq, Debug, Clone, Serialize)]
pub struct TopicPublished {
    pub topic: String,
    pub value: String,
}

impl TopicPublished {
    pub fn new(topic: &str, payload: &[u8]) -> Self {
        TopicPublished {
            topic: topic.to_string(),
            value: String::from_utf8_lossy(payload).into_owned(),
        }
    }
}

#[async_trait]
pub trait FlowTrigger: Debug + Send + Sync {
    async fn trigger(&self, card: TriggerCard, tokens: &TopicPublished) -> Result<(), FlowTriggerError>;
}

#[derive(Error, Debug)]
pub enum FlowTriggerError {
    #[error("request error: {0}")]
    RequestError(#[from] reqwest::Error),
}

/// Cards to fire for `tokens`: always the catch-all card, plus the specific card once for every
/// registered topic equal to the published one.
pub fn cards_for(tokens: &TopicPublished, specific_topics: &[String]) -> Vec<TriggerCard> {
    let specific = specific_topics.iter().filter(|topic| **topic == tokens.topic).map(|_| TriggerCard::SpecificTopicPublished);

    std::iter::once(TriggerCard::AnyTopicPublished).chain(specific).collect()
}

#[derive(Serialize)]
struct WebhookRequest<'a> {
    card: TriggerCard,
    #[serde(flatten)]
    tokens: &'a TopicPublished,
}

/// Forwards trigger cards as JSON to an automation engine's webhook.
#[derive(Debug)]
pub struct WebhookFlowTrigger {
    client: Client,
    url: String,
}

impl WebhookFlowTrigger {
    pub fn new(client: Client, url: String) -> Self {
        WebhookFlowTrigger { client, url }
    }
}

#[async_trait]
impl FlowTrigger for WebhookFlowTrigger {
    #[instrument(skip(self, tokens), fields(topic = tokens.topic))]
    async fn trigger(&self, card: TriggerCard, tokens: &TopicPublished) -> Result<(), FlowTriggerError> {
        self.client
            .post(&self.url)
            .json(&WebhookRequest { card, tokens })
            .send()
            .await?
            .error_for_status()?;

        debug!("🔔 Fired trigger '{}'", card);
        Ok(())
    }
}
