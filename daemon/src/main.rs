use anyhow::{Context, Result};
use cpu_shield::{
    config::Config,
    session::{forward_interrupts, Collaborators, InterruptFuture, MonitoringSession, SessionEnd},
};
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    info!("cpu-shield starting...");

    // Load configuration
    let config_path = Config::config_path();
    let config = if config_path.exists() {
        Config::load(&config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}, using defaults", e);
            Config::default()
        })
    } else {
        info!("No config file found at {:?}, using defaults", config_path);
        Config::default()
    };
    config.validate().context("refusing to start with invalid configuration")?;

    // Interrupts are only acted on between ticks
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        let ctrl_c = || -> InterruptFuture { Box::pin(tokio::signal::ctrl_c()) };
        match forward_interrupts(ctrl_c, shutdown_tx).await {
            Ok(()) => {
                warn!("Second interrupt, exiting immediately");
                std::process::exit(130);
            }
            Err(e) => error!("Failed to listen for interrupt: {}", e),
        }
    });

    let session = MonitoringSession::new(&config, Collaborators::host(&config), shutdown_rx);
    match session.run().await.context("alert log is unwritable, stopping")? {
        SessionEnd::Hibernated { after } => info!("Session ended in protective hibernation ({:?})", after),
        SessionEnd::Stopped => info!("Session stopped"),
    }
    Ok(())
}
