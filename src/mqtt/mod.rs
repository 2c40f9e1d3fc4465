mod client;
mod listen;

pub use client::new_client;
pub use listen::listen;
