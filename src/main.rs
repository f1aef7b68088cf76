use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use proofpop::config::AppConfig;
use proofpop::engine::Engine;
use proofpop::store::{EventTaxonomy, NotificationStore, RestStore};
use proofpop::timefmt::Locale;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "proofpop", version, about = "Social-proof toast notification engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the engine against the configured backend
    Run(RunArgs),
    /// Load and validate the configuration, then exit
    Check(CheckArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "PROOFPOP_CONFIG")]
    config: Option<PathBuf>,

    /// Use the Indonesian display strings
    #[arg(long)]
    indonesian: bool,
}

#[derive(Args)]
struct CheckArgs {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "PROOFPOP_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run(args) => run(args).await,
        Commands::Check(args) => check(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<AppConfig> {
    let config = AppConfig::load(path.map(PathBuf::as_path))
        .context("failed to load configuration")?
        .with_env_overrides();
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn check(args: CheckArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.as_ref())?;
    println!(
        "Configuration OK: table '{}', max {} toasts",
        config.widget.table_name, config.widget.max_toasts
    );
    Ok(())
}

async fn run(args: RunArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.as_ref())?;
    if let Err(e) = proofpop::logging::init(&config.logging) {
        eprintln!("Warning: {e}");
    }

    if config.backend.url.is_empty() {
        bail!("no backend URL configured (set [backend].url or PROOFPOP_BACKEND_URL)");
    }

    let locale = if args.indonesian {
        Locale::indonesian()
    } else {
        Locale::default()
    };

    let store = Arc::new(RestStore::new(
        &config.backend,
        &config.widget.table_name,
        EventTaxonomy::from_config(&config.widget),
    )) as Arc<dyn NotificationStore>;

    let engine = Engine::start(store, config.widget, locale)
        .context("failed to start notification engine")?;
    let mut events = engine.events();

    tracing::info!(url = %config.backend.url, "Engine running, press Ctrl-C to stop");
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(event) => {
                    let line = serde_json::to_string(&event).unwrap_or_else(|_| format!("{event:?}"));
                    println!("{line}");
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Surface event consumer lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    engine.shutdown().await;
    Ok(())
}
