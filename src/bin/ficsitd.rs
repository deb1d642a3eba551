//! ficsitd - Satisfactory server watcher
//!
//! Polls a dedicated server and announces pioneers joining and leaving in a
//! Discord channel.
//!
//! # Usage
//!
//! ```bash
//! # Run the monitor and health endpoint until SIGINT/SIGTERM
//! ficsitd start
//!
//! # Print the current occupancy once
//! ficsitd query
//!
//! # Layer a TOML file under the environment
//! ficsitd --config ficsit.toml start
//! ```

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ficsit_core::MessageTemplate;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use ficsitd::config::ConfigLoader;
use ficsitd::{
    BotCommand, DiscordNotifier, HealthServer, HealthState, HttpStateFetcher, LifecycleCoordinator,
    StateFetcher,
};

/// Satisfactory server watcher with Discord announcements
#[derive(Parser, Debug)]
#[command(name = "ficsitd", version, about)]
struct Args {
    /// TOML configuration file; environment variables take precedence
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the monitor and the health endpoint
    Start,
    /// Query the server once and print the number of pioneers
    Query {
        /// Print the full server state as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    match args.command.unwrap_or(Command::Start) {
        Command::Start => run_monitor(args.config.as_deref()),
        Command::Query { json } => run_query(args.config.as_deref(), json),
    }
}

fn init_tracing() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("ficsitd=info".parse()?)
                .add_directive("ficsit_core=info".parse()?)
                .add_directive("ficsit_api=info".parse()?),
        )
        .init();
    Ok(())
}

#[tokio::main]
async fn run_monitor(config_path: Option<&Path>) -> Result<()> {
    init_tracing()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        pid = process::id(),
        "ficsitd starting"
    );

    let loader = ConfigLoader::from_process(config_path)?;
    let config = loader.monitor().context("Invalid configuration")?;
    info!(
        endpoint = %config.server.endpoint(),
        interval_secs = config.poll.interval.as_secs(),
        baseline_on_restart = ?config.poll.baseline_on_restart,
        "Configuration loaded"
    );

    let fetcher: Arc<dyn StateFetcher> = Arc::new(HttpStateFetcher::new(&config.server)?);
    let notifier = DiscordNotifier::new(&config.discord, config.server.request_timeout)?;
    let bot = notifier
        .verify()
        .await
        .context("Discord credential check failed")?;
    info!(bot = %bot.username, id = %bot.id, "Discord credentials accepted");

    let template = MessageTemplate::new(&config.server.world_name);
    let cancel_token = CancellationToken::new();

    let health = HealthServer::bind(config.health_addr).await?;
    let health_state = HealthState {
        fetcher: Arc::clone(&fetcher),
        template: template.clone(),
    };
    let health_handle = tokio::spawn(health.run(health_state, cancel_token.clone()));

    let coordinator = LifecycleCoordinator::with_cancel_token(
        fetcher,
        Arc::new(notifier),
        template,
        &config.poll,
        cancel_token,
    );
    coordinator.start()?;

    wait_for_shutdown_signal().await?;
    info!("Shutdown signal received");

    coordinator.shutdown().await;

    match health_handle.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "Health endpoint error"),
        Err(e) => error!(error = %e, "Health endpoint task failed"),
    }

    info!("ficsitd stopped");
    Ok(())
}

#[tokio::main]
async fn run_query(config_path: Option<&Path>, json: bool) -> Result<()> {
    init_tracing()?;

    let loader = ConfigLoader::from_process(config_path)?;
    let server = loader.server().context("Invalid configuration")?;
    let fetcher = HttpStateFetcher::new(&server)?;

    if json {
        let snapshot = fetcher.fetch().await?;
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        let template = MessageTemplate::new(&server.world_name);
        let reply = BotCommand::Pioneers.respond(&fetcher, &template).await?;
        println!("{reply}");
    }

    Ok(())
}

async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C");
    }

    Ok(())
}
