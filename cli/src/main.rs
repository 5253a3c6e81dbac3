mod commands;
mod hibernate;
mod interrupt;
mod render;

use anyhow::Result;
use clap::{Parser, Subcommand};
use modelpull_core::{CatalogError, Config};

#[derive(Parser)]
#[command(name = "modelpull")]
#[command(author, version, about = "Pick models from the Ollama library and pull them in one batch", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Download a fresh model list instead of asking about the cached one
    #[arg(long)]
    refresh: bool,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// View or set configuration
    Config {
        /// Config key (e.g., "fetch.backoff_secs", "session.columns")
        key: Option<String>,

        /// Value to set (if omitted, shows current value)
        value: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins over the verbosity flag.
    let default_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        if e.downcast_ref::<CatalogError>().is_some() {
            eprintln!("{}", render::error(&format!("Failed to fetch model list: {:#}", e)));
            std::process::exit(1);
        }

        eprintln!("{}", render::error(&format!("Error: {:#}", e)));
        render::wait_for_enter("Press Enter to exit...");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Some(Commands::Config { key, value }) => {
            commands::config::execute(key.as_deref(), value.as_deref()).await?;
        }
        None => {
            let config = Config::load()?;
            commands::session::execute(&config, cli.refresh).await?;
        }
    }

    Ok(())
}
