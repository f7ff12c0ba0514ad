use anyhow::Result;
use clap::Parser;
use coachref::bootstrap::Launcher;
use coachref::logger::{self, LogConfig};
use coachref::AppConfig;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cfg = AppConfig::parse();
    logger::init(LogConfig::with_format(cfg.log_format));

    info!(
        version = coachref::VERSION,
        store = %cfg.store_type,
        bind = %cfg.bind_addr,
        "Starting coachref"
    );

    Launcher::with_config(cfg).launch().await
}
