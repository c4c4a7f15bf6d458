pub mod grpc_impl;
pub mod http;
pub mod registry;

pub use grpc_impl::DnsService;
pub use registry::{Operation, Registry, RegistryError, RetryingRegistry, ServiceRegistry};
