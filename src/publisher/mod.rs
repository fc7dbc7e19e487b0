pub mod client;
pub mod publisher;

pub use client::KafkaConnector;
pub use publisher::Publisher;
