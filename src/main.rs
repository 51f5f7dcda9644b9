use discovery_bridge::config::{Config, ConfigSource};
use discovery_bridge::server;
use tracing_subscriber::EnvFilter;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: jemallocator::Jemalloc = jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let (config, source) = Config::load()?;

    // RUST_LOG 优先于配置文件中的日志级别
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &source {
        ConfigSource::File(path) => {
            tracing::info!(path = %path.display(), "Loaded configuration file");
        }
        ConfigSource::Defaults { missing } => {
            tracing::warn!(path = %missing.display(), "Config file not found, using defaults");
        }
    }

    tracing::info!(backend = ?config.backend, "Starting discovery bridge...");
    server::start(config).await?;
    Ok(())
}
