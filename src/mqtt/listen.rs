use crate::domain::BrokerEvent;
use rumqttc::{AsyncClient, Event, EventLoop, Packet, QoS};
use std::ops::ControlFlow;
use std::time::Duration;
use tokio::sync::mpsc::Sender;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, instrument, trace, warn};

/// Drives the MQTT connection and forwards every inbound non-empty publish to `tx`. Publishes
/// arriving while `tx` is full are dropped.
///
/// The subscriptions are renewed on every (re)connect. Returns once the receiving side of `tx`
/// is gone.
#[instrument(skip_all)]
pub async fn listen(mut event_loop: EventLoop, client: AsyncClient, subscriptions: Vec<String>, reconnect_delay: Duration, tx: Sender<BrokerEvent>) {
    info!("Connecting to MQTT broker...");
    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                info!("Connecting to MQTT broker... OK");
                subscribe(&client, &subscriptions);
            }
            Ok(event) => {
                let Some(broker_event) = to_broker_event(event) else {
                    continue;
                };

                if forward(&tx, broker_event).is_break() {
                    warn!("🔴 Broker event receiver closed, stopping MQTT listener");
                    return;
                }
            }
            Err(e) => {
                warn!("⚠️ MQTT connection error: {}. Reconnecting in {}ms...", e, reconnect_delay.as_millis());
                tokio::time::sleep(reconnect_delay).await;
            }
        }
    }
}

fn subscribe(client: &AsyncClient, subscriptions: &[String]) {
    for filter in subscriptions {
        // The event loop is the one draining the request queue, so it must not be awaited here
        match client.try_subscribe(filter, QoS::AtLeastOnce) {
            Ok(()) => debug!(filter, "Subscribed to '{}'", filter),
            Err(e) => warn!(filter, "⚠️ Could not subscribe to '{}': {}", filter, e),
        }
    }
}

/// Hands the event to the controller without waiting. The event loop also drains the outgoing
/// request queue, so blocking here would stall every pending publish of the bridge.
fn forward(tx: &Sender<BrokerEvent>, event: BrokerEvent) -> ControlFlow<()> {
    match tx.try_send(event) {
        Ok(()) => ControlFlow::Continue(()),
        Err(TrySendError::Full(BrokerEvent::PublishReceived { topic, .. })) => {
            warn!(topic, "⚠️ Broker event buffer full, dropping publish on '{}'", topic);
            ControlFlow::Continue(())
        }
        Err(TrySendError::Closed(_)) => ControlFlow::Break(()),
    }
}

fn to_broker_event(event: Event) -> Option<BrokerEvent> {
    match event {
        // Retractions, including the echo of the bridge's own, carry nothing to act on
        Event::Incoming(Packet::Publish(publish)) if publish.payload.is_empty() => {
            trace!(topic = publish.topic, "Ignoring retraction");
            None
        }
        Event::Incoming(Packet::Publish(publish)) => Some(BrokerEvent::PublishReceived {
            topic: publish.topic,
            payload: publish.payload.to_vec(),
            // MQTT 3.1.1 does not tell who published a message
            client_id: None,
        }),
        other => {
            trace!("Ignoring MQTT event {:?}", other);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rumqttc::{Outgoing, Publish};
    use tokio::sync::mpsc;

    #[test]
    fn incoming_publish_becomes_a_broker_event() {
        let publish = Publish::new("homie/5/a/main/onoff/set", QoS::AtLeastOnce, "true");

        let event = to_broker_event(Event::Incoming(Packet::Publish(publish)));

        assert_eq!(
            event,
            Some(BrokerEvent::PublishReceived {
                topic: "homie/5/a/main/onoff/set".to_string(),
                payload: b"true".to_vec(),
                client_id: None,
            })
        );
    }

    #[test]
    fn other_events_are_ignored() {
        assert_eq!(to_broker_event(Event::Incoming(Packet::PingResp)), None);
        assert_eq!(to_broker_event(Event::Outgoing(Outgoing::PingReq)), None);
    }

    #[test]
    fn retraction_echoes_are_not_forwarded() {
        let publish = Publish::new("homey/devices/a/capabilities/onoff", QoS::AtLeastOnce, "");

        assert_eq!(to_broker_event(Event::Incoming(Packet::Publish(publish))), None);
    }

    fn publish(topic: &str) -> BrokerEvent {
        BrokerEvent::PublishReceived {
            topic: topic.to_string(),
            payload: b"1".to_vec(),
            client_id: None,
        }
    }

    #[tokio::test]
    async fn a_full_buffer_drops_the_publish_instead_of_blocking() {
        let (tx, mut rx) = mpsc::channel(1);
        assert_eq!(forward(&tx, publish("a")), ControlFlow::Continue(()));

        // The controller is busy publishing and not reading, forwarding must return immediately
        let result = tokio::time::timeout(Duration::from_secs(1), async { forward(&tx, publish("b")) }).await;

        assert_eq!(result.ok(), Some(ControlFlow::Continue(())));
        assert_eq!(rx.recv().await, Some(publish("a")));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn a_closed_receiver_stops_forwarding() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        assert_eq!(forward(&tx, publish("a")), ControlFlow::Break(()));
    }
}
