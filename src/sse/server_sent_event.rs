use serde::de::DeserializeOwned;

#[derive(Debug, PartialEq, Default, Clone)]
pub struct ServerSentEvent {
    pub id: Option<String>,
    pub event: Option<String>,
    pub retry: Option<usize>,
    pub comment: Option<String>,
    pub data: Option<String>,
}

impl ServerSentEvent {
    /// Parses a single event block. Repeated `data:` lines are joined with a newline.
    pub fn from_str(s: &str) -> ServerSentEvent {
        let mut event = ServerSentEvent::default();

        for line in s.lines() {
            if let Some(id) = line.strip_prefix("id:") {
                event.id = Some(id.trim().to_string());
            } else if let Some(name) = line.strip_prefix("event:") {
                event.event = Some(name.trim().to_string());
            } else if let Some(retry) = line.strip_prefix("retry:") {
                event.retry = retry.trim().parse::<usize>().ok();
            } else if let Some(comment) = line.strip_prefix(':') {
                event.comment = Some(comment.trim().to_string());
            } else if let Some(data) = line.strip_prefix("data:") {
                let data = data.trim();
                event.data = Some(match event.data.take() {
                    Some(previous) => format!("{previous}\n{data}"),
                    None => data.to_string(),
                });
            }
        }

        event
    }

    pub fn data_as<T: DeserializeOwned>(&self) -> Result<Option<T>, serde_json::Error> {
        self.data.as_deref().map(serde_json::from_str).transpose()
    }
}

/// Collects stream chunks and yields the events that are complete. Events end at a blank line
/// and may be split over any number of chunks.
#[derive(Debug, Default)]
pub struct EventBuffer {
    buffer: String,
}

impl EventBuffer {
    pub fn push(&mut self, chunk: &str) -> Vec<ServerSentEvent> {
        self.buffer.push_str(&chunk.replace("\r\n", "\n"));

        let mut events = Vec::new();
        while let Some(end) = self.buffer.find("\n\n") {
            let block = self.buffer[..end].to_string();
            self.buffer.drain(..end + 2);

            if !block.trim().is_empty() {
                events.push(ServerSentEvent::from_str(&block));
            }
        }

        events
    }
}
