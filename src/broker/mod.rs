//! The `broker` module holds the topic store: a mapping from topic name to
//! the ordered messages published to it.

pub mod engine;
pub mod message;
pub mod topic;

pub use engine::Broker;

#[cfg(test)]
mod tests;
