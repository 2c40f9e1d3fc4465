mod client;
mod domain;
mod listen;
mod registry;

pub use client::new_client;
pub use listen::listen;
pub use registry::HomeyRegistry;
