//! `profile-log`: operator CLI for profile event logs.

mod commands;
mod config;

use anyhow::{Context, Result};
use clap::Parser;
use event_store::{InMemoryEventStore, PostgresEventStore};
use profile::ProfileService;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::commands::Command;
use crate::config::{Backend, Config, GlobalArgs, LogFormat};

#[derive(Parser)]
#[command(name = "profile-log")]
#[command(about = "Inspect and maintain event-sourced profile logs", long_about = None)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let pretty = (format == LogFormat::Pretty)
        .then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));
    let json = (format == LogFormat::Json)
        .then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(pretty)
        .with(json)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_args(cli.global);

    // 1. Initialize tracing
    init_tracing(config.log_format);

    // 2. Install Prometheus metrics recorder
    let metrics_handle = if config.metrics {
        let handle = metrics_exporter_prometheus::PrometheusBuilder::new()
            .install_recorder()
            .context("failed to install Prometheus recorder")?;
        Some(handle)
    } else {
        None
    };

    tracing::debug!(
        snapshot_threshold = config.engine.snapshot.threshold(),
        max_append_attempts = config.engine.retry.max_attempts(),
        "engine configuration"
    );

    // 3. Open the event store and run the command
    match config.backend {
        Backend::Postgres { url } => {
            let store = PostgresEventStore::connect(&url)
                .await
                .context("failed to connect to PostgreSQL")?;
            if let Command::Migrate = cli.command {
                store.run_migrations().await?;
                tracing::info!("migrations applied");
            } else {
                let service = ProfileService::with_config(store, config.engine);
                commands::execute(cli.command, &service, config.actor).await?;
            }
        }
        Backend::InMemory => {
            tracing::warn!("DATABASE_URL not set, using a throwaway in-memory store");
            let service = ProfileService::with_config(InMemoryEventStore::new(), config.engine);
            commands::execute(cli.command, &service, config.actor).await?;
        }
    }

    if let Some(handle) = metrics_handle {
        print!("{}", handle.render());
    }

    Ok(())
}
