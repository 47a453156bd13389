// Kisum Key Information summary generator
// Main entry point for the kisum binary

use clap::Parser;
use kisum_engine::cli::{Cli, Command};
use kisum_engine::config::Config;
use kisum_engine::handlers::{handle_doctor, handle_plan, handle_summarize, OutputFormat};
use kisum_engine::telemetry::init_telemetry_with_level;
use sdk::errors::{EngineError, ErrorExt};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        if let Some(engine_error) = e.chain().find_map(|c| c.downcast_ref::<EngineError>()) {
            eprintln!("Hint: {}", engine_error.user_hint());
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Load configuration (or use custom path if provided)
    let config = if let Some(config_path) = &cli.config {
        Config::load_from_path(config_path)?
    } else {
        Config::load_or_create()?
    };

    // --log wins over the config file; RUST_LOG wins over both
    init_telemetry_with_level(cli.log.as_deref().unwrap_or(&config.core.log_level));

    let version = env!("CARGO_PKG_VERSION");
    let commit = env!("GIT_COMMIT_HASH");
    let timestamp = env!("BUILD_TIMESTAMP");

    tracing::info!("Kisum v{} ({} - {})", version, commit, timestamp);

    // Determine output format
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    match cli.command {
        Command::Summarize { file, output, plan } => {
            handle_summarize(&file, output.as_deref(), plan.as_deref(), &config, format).await
        }
        Command::Plan { plan } => handle_plan(plan.as_deref(), &config, format).await,
        Command::Doctor => handle_doctor(&config, format).await,
    }
}
