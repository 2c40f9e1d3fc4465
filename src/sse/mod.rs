mod listen;
mod server_sent_event;

pub use listen::{Config, listen};
pub use server_sent_event::ServerSentEvent;
