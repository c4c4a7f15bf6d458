pub mod discovery {
    tonic::include_proto!("discovery");
}
pub mod config;
pub mod server;
pub mod services;
pub mod storage;
pub mod telemetry;
