use grpc_discovery::config::Config;
use grpc_discovery::{server, telemetry};

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: jemallocator::Jemalloc = jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let (config, source) = Config::load()?;
    telemetry::init_tracing(&config.logging.filter)?;
    source.log();

    tracing::info!(
        storage_type = %config.storage.storage_type,
        "Starting discovery server..."
    );
    server::start(config).await?;
    Ok(())
}
