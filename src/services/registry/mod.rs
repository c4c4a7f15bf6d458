//! Registry service module
//!
//! This module contains the service registry implementation split into logical components:
//! - `types`: `Registry` trait, operations and endpoint aliases
//! - `error`: registry error taxonomy
//! - `service`: registry logic on top of a `KeyValueClient`
//! - `retry`: bounded-retry decorator
//! - `metrics`: injected observers for retry and outcome events

pub mod error;
pub mod metrics;
pub mod retry;
pub mod service;
pub mod types;

// Re-export public types for easier access
pub use error::RegistryError;
pub use metrics::{CounterObserver, NoopObserver, PrometheusObserver, RegistryObserver};
pub use retry::{RetryConfig, RetryPolicy, RetryingRegistry};
pub use service::ServiceRegistry;
pub use types::{Endpoint, Operation, Outcome, Registry, RegistryOp};
