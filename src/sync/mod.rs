mod command;
mod controller;
mod datatype;
mod ledger;
mod publisher;

pub use controller::SyncController;
pub use ledger::TopicLedger;
pub use publisher::{DevicePublisher, PublisherOptions};
