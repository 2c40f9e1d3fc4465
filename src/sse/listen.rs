use crate::sse::server_sent_event::{EventBuffer, ServerSentEvent};
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use std::error::Error;
use std::time::Duration;
use tokio::sync::mpsc::Sender;
use tokio::time::timeout;
use tokio_retry::Retry;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, error, info, instrument, warn};

type StreamError = Box<dyn Error + Send + Sync>;

#[derive(Debug, Clone)]
pub struct Config {
    pub url: String,
    pub retry_ms: u64,
    pub retry_max_delay: Duration,
    pub stale_connection_timeout: Duration,
}

/// Streams events from `config.url` into `tx`, reconnecting with exponential backoff whenever
/// the stream fails, ends or goes stale. Returns once `tx` is closed.
#[instrument(skip_all, fields(url = config.url))]
pub async fn listen(tx: Sender<ServerSentEvent>, client: &Client, config: &Config) -> Result<(), StreamError> {
    let strategy = ExponentialBackoff::from_millis(config.retry_ms)
        .factor(2)
        .max_delay(config.retry_max_delay)
        .map(jitter);

    info!("Connecting to SSE stream {}...", config.url);
    Retry::spawn(strategy, || async {
        let result = connect_sse_stream(tx.clone(), client, config).await;
        if tx.is_closed() {
            info!("🔴 SSE event receiver closed, stopping");
            return Ok(());
        }

        match result {
            Ok(_) => {
                info!("✅ SSE stream ended gracefully. Restarting...");
                Err("Stream ended") // Triggers retry
            }
            Err(e) => {
                warn!("⚠️ SSE error: {}. Retrying...", e);
                Err("SSE failed") // Triggers retry
            }
        }
    })
    .await?;

    Ok(())
}

async fn connect_sse_stream(tx: Sender<ServerSentEvent>, client: &Client, config: &Config) -> Result<(), StreamError> {
    let response = client
        .get(&config.url)
        .header("Accept", "text/event-stream")
        .send()
        .await?
        .error_for_status()?;

    if response.status() == StatusCode::OK {
        info!(status = %response.status(), "Connecting to SSE stream {}... OK", config.url);
    }

    let mut stream = response.bytes_stream();
    let mut buffer = EventBuffer::default();
    loop {
        let event = timeout(config.stale_connection_timeout, stream.next()).await;
        match event {
            Ok(Some(Ok(chunk))) => {
                let text = String::from_utf8_lossy(&chunk);
                for event in buffer.push(&text) {
                    debug!("🔸 Received event: {:?}", event);
                    tx.send(event).await?;
                }
            }
            Ok(Some(Err(e))) => {
                error!("❌ SSE stream error: {}", e);
                return Err(Box::new(e));
            }
            Ok(None) => {
                warn!("🔴 SSE stream ended");
                return Err("Stream closed".into());
            }
            Err(_) => {
                warn!("⏳ No data for {} seconds. Reconnecting...", config.stale_connection_timeout.as_secs());
                return Err("Timeout".into());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_log::test;
    use tokio::sync::mpsc;

    fn config(url: String) -> Config {
        Config {
            url,
            retry_ms: 10,
            retry_max_delay: Duration::from_millis(20),
            stale_connection_timeout: Duration::from_secs(5),
        }
    }

    #[test(tokio::test)]
    async fn forwards_every_complete_event() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/events")
            .match_header("accept", "text/event-stream")
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body("event: one\ndata: 1\n\nevent: two\ndata: 2\n\nevent: incomplete")
            .create_async()
            .await;

        let (tx, mut rx) = mpsc::channel(8);
        let result = connect_sse_stream(tx, &Client::new(), &config(format!("{}/events", server.url()))).await;

        assert_eq!(result.unwrap_err().to_string(), "Stream closed");
        assert_eq!(rx.recv().await.and_then(|e| e.event), Some("one".to_string()));
        assert_eq!(rx.recv().await.and_then(|e| e.data), Some("2".to_string()));
        assert!(rx.recv().await.is_none());
    }

    #[test(tokio::test)]
    async fn fails_on_an_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server.mock("GET", "/events").with_status(503).create_async().await;

        let (tx, _rx) = mpsc::channel(8);
        let result = connect_sse_stream(tx, &Client::new(), &config(format!("{}/events", server.url()))).await;

        assert!(result.is_err());
    }

    #[test(tokio::test)]
    async fn listen_stops_once_the_receiver_is_gone() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/events")
            .with_status(200)
            .with_body("event: one\ndata: 1\n\n")
            .create_async()
            .await;

        let (tx, rx) = mpsc::channel(8);
        drop(rx);

        let result = listen(tx, &Client::new(), &config(format!("{}/events", server.url()))).await;

        assert!(result.is_ok());
    }
}
