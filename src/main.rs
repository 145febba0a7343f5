use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use varken::{
    config::{Config, defaults::DEFAULT_CONFIG_FILE},
    scheduler::Scheduler,
    sinks::{InfluxSink, PrometheusExporter, SinkSet},
};

#[derive(Parser)]
#[command(name = "varken")]
#[command(version)]
#[command(about = "Polls Sonarr, Radarr, Overseerr and Tautulli and exports their state as metrics")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: String,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("varken={}", cli.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting varken v{}", env!("CARGO_PKG_VERSION"));

    if !Path::new(&cli.config).exists() {
        warn!(
            "Configuration file {} not found, using defaults and environment",
            cli.config
        );
    }
    let config = Config::load_from_file(&cli.config)?;
    info!("Configuration loaded from: {}", cli.config);

    let shutdown = CancellationToken::new();

    let push = match &config.influxdb {
        Some(influx) => Some(InfluxSink::connect(influx).await),
        None => {
            info!("No influxdb section configured, push sink disabled");
            None
        }
    };
    let pull = match &config.prometheus {
        Some(prometheus) => Some(PrometheusExporter::start(prometheus, shutdown.clone()).await),
        None => {
            info!("No prometheus section configured, pull sink disabled");
            None
        }
    };
    let sinks = Arc::new(SinkSet::new(push, pull));

    let scheduler = Scheduler::from_config(&config, sinks)?;
    if scheduler.jobs().is_empty() {
        warn!("No pollers are enabled; nothing will be collected");
    }
    let handles = scheduler.spawn(shutdown.clone());

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");
    shutdown.cancel();

    for handle in handles {
        if let Err(e) = handle.await {
            warn!("Collector task ended abnormally: {}", e);
        }
    }

    info!("varken stopped");
    Ok(())
}
