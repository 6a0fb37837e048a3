//! Change bus: the only boundary between the domain and the message broker.
//!
//! Changes are encoded with the `users.v1.SubscriptionResponse` protobuf
//! message and routed on `users.<KIND>.<user id>` topics.

pub mod broker;
pub mod client;
pub mod codec;
pub mod memory;
pub mod nats;
pub mod topic;

pub use broker::{Broker, BrokerError, BrokerSubscription};
pub use client::BusClient;
pub use memory::MemoryBroker;
pub use nats::NatsBroker;
