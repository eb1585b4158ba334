use std::fs::OpenOptions;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use postdeck::app::AppContext;
use postdeck::cli::{commands, Cli, Commands};
use postdeck::config::{Config, LogConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(workers) = cli.workers {
        config.source.workers = workers;
    }

    init_logging(&config.log)?;

    let result = run(cli.command, config).await;
    if let Err(e) = &result {
        tracing::error!("Fatal: {:#}", e);
    }
    result
}

async fn run(command: Option<Commands>, config: Config) -> anyhow::Result<()> {
    let ctx = Arc::new(AppContext::new(config)?);

    match command.unwrap_or(Commands::Tui { latest: false }) {
        Commands::Tui { latest } => {
            postdeck::tui::run(ctx, latest).await?;
        }
        Commands::Serve { port, host, latest } => {
            let host = host.unwrap_or_else(|| ctx.config.server.host.clone());
            let port = port.unwrap_or(ctx.config.server.port);
            postdeck::remote::serve(ctx.clone(), &host, port, latest).await?;
        }
        Commands::List => {
            commands::list_posts(&ctx).await?;
        }
    }

    Ok(())
}

/// Sends tracing output to the log file; the terminal belongs to the UI.
fn init_logging(log: &LogConfig) -> anyhow::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log.file)
        .with_context(|| format!("Failed to open log file {}", log.file.display()))?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&log.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .with(filter)
        .init();

    Ok(())
}
