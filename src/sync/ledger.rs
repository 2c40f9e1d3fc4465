use crate::domain::{Broker, BrokerError};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{trace, warn};

/// Record of every topic the bridge currently has retained on the broker.
///
/// A topic is recorded only once the broker accepted its publish and forgotten only once the
/// broker accepted its retraction, so the recorded set never claims more than was delivered and a
/// failed retraction stays around to be retried by the next [`TopicLedger::retract_prefix`].
#[derive(Debug)]
pub struct TopicLedger {
    broker: Arc<dyn Broker>,
    topics: BTreeSet<String>,
}

impl TopicLedger {
    pub fn new(broker: Arc<dyn Broker>) -> Self {
        TopicLedger {
            broker,
            topics: BTreeSet::new(),
        }
    }

    pub async fn publish(&mut self, topic: String, payload: impl Into<String>) -> Result<(), BrokerError> {
        let payload = payload.into();
        trace!(topic, payload, "Publishing retained topic");

        self.broker.publish_retained(&topic, payload).await?;
        self.topics.insert(topic);
        Ok(())
    }

    pub async fn retract(&mut self, topic: &str) -> Result<(), BrokerError> {
        trace!(topic, "Retracting retained topic");

        self.broker.retract(topic).await?;
        self.topics.remove(topic);
        Ok(())
    }

    /// Retracts every recorded topic starting with `prefix` and returns how many were retracted.
    /// A failing retraction is logged and does not stop the remaining ones.
    pub async fn retract_prefix(&mut self, prefix: &str) -> usize {
        let topics = self
            .topics
            .range(prefix.to_string()..)
            .take_while(|topic| topic.starts_with(prefix))
            .cloned()
            .collect::<Vec<_>>();

        let mut retracted = 0;
        for topic in topics {
            match self.retract(&topic).await {
                Ok(()) => retracted += 1,
                Err(e) => warn!(topic, "⚠️ Could not retract topic: {}", e),
            }
        }

        retracted
    }

    #[cfg(test)]
    pub fn contains(&self, topic: &str) -> bool {
        self.topics.contains(topic)
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    #[cfg(test)]
    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.topics.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingBroker;
    use pretty_assertions::assert_eq;
    use test_log::test;

    fn ledger() -> (Arc<RecordingBroker>, TopicLedger) {
        let broker = Arc::new(RecordingBroker::default());
        let ledger = TopicLedger::new(broker.clone());
        (broker, ledger)
    }

    #[test(tokio::test)]
    async fn publish_records_the_topic_and_retains_the_payload() -> Result<(), BrokerError> {
        let (broker, mut ledger) = ledger();

        ledger.publish("a/b".to_string(), "1").await?;

        assert!(ledger.contains("a/b"));
        assert_eq!(broker.retained("a/b"), Some("1".to_string()));
        Ok(())
    }

    #[test(tokio::test)]
    async fn publishing_the_same_topic_twice_overwrites_it() -> Result<(), BrokerError> {
        let (broker, mut ledger) = ledger();

        ledger.publish("a/b".to_string(), "1").await?;
        ledger.publish("a/b".to_string(), "2").await?;

        assert_eq!(ledger.len(), 1);
        assert_eq!(broker.retained("a/b"), Some("2".to_string()));
        Ok(())
    }

    #[test(tokio::test)]
    async fn retract_forgets_the_topic_and_publishes_an_empty_payload() -> Result<(), BrokerError> {
        let (broker, mut ledger) = ledger();
        ledger.publish("a/b".to_string(), "1").await?;

        ledger.retract("a/b").await?;

        assert!(!ledger.contains("a/b"));
        assert_eq!(broker.retained("a/b"), None);
        assert_eq!(broker.published().last(), Some(&("a/b".to_string(), String::new())));
        Ok(())
    }

    #[test(tokio::test)]
    async fn retract_prefix_only_touches_matching_topics() -> Result<(), BrokerError> {
        let (broker, mut ledger) = ledger();
        ledger.publish("homey/devices/a/id".to_string(), "\"a\"").await?;
        ledger.publish("homey/devices/a/name".to_string(), "\"A\"").await?;
        ledger.publish("homey/devices/ab/id".to_string(), "\"ab\"").await?;
        ledger.publish("homie/5/a/$name".to_string(), "A").await?;

        let retracted = ledger.retract_prefix("homey/devices/a/").await;

        assert_eq!(retracted, 2);
        assert_eq!(ledger.topics().collect::<Vec<_>>(), vec!["homey/devices/ab/id", "homie/5/a/$name"]);
        assert_eq!(broker.retained("homey/devices/a/id"), None);
        assert_eq!(broker.retained("homey/devices/ab/id"), Some("\"ab\"".to_string()));
        Ok(())
    }

    #[test(tokio::test)]
    async fn failed_publish_is_not_recorded() {
        let (broker, mut ledger) = ledger();
        broker.fail_publishes(true);

        let result = ledger.publish("a/b".to_string(), "1").await;

        assert!(result.is_err());
        assert!(!ledger.contains("a/b"));
    }

    #[test(tokio::test)]
    async fn failed_retraction_keeps_the_topic_for_a_later_attempt() -> Result<(), BrokerError> {
        let (broker, mut ledger) = ledger();
        ledger.publish("a/b".to_string(), "1").await?;
        broker.fail_publishes(true);

        assert_eq!(ledger.retract_prefix("a/").await, 0);
        assert!(ledger.contains("a/b"));

        broker.fail_publishes(false);
        assert_eq!(ledger.retract_prefix("a/").await, 1);
        assert!(!ledger.contains("a/b"));
        Ok(())
    }
}
