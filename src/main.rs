use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use navsync::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for navsync::AppCommand {
    fn from(cmd: Commands) -> navsync::AppCommand {
        match cmd {
            Commands::Sync => navsync::AppCommand::Sync,
            Commands::Watch => navsync::AppCommand::Watch,
            Commands::Check => navsync::AppCommand::Check,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Fetch NAVs for the configured assets once and show the result
    Sync,
    /// Run the hourly scheduler until interrupted
    Watch,
    /// Verify the external quote sources are reachable
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => setup(),
        Some(cmd) => navsync::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}

fn setup() -> anyhow::Result<()> {
    use anyhow::Context;

    let path = navsync::core::config::AppConfig::default_config_path()?;

    if path.exists() {
        anyhow::bail!("Configuration file already exists at {}", path.display());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let default_config = r#"---
assets:
  - code: "VT"
    name: "Example Global ETF"

providers:
  quote_api:
    base_url: "https://www.alphavantage.co"
    # api_key: "your-key"
  fund_page:
    base_url: "https://www.fundrich.com.tw/2022OfficialWeb"
"#;

    std::fs::write(&path, default_config)
        .with_context(|| format!("Failed to write config file to {}", path.display()))?;

    tracing::info!("Created default configuration at {}", path.display());
    Ok(())
}
