//! Request adapter between the HTTP surface and the relay engine.
//!
//! Inbound workflow payloads are validated against the service configuration
//! here and turned into upstream request descriptors; the `web` layer never
//! builds upstream calls itself.

pub mod workflow;

pub use relay::Error;
