use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tandem::config::get_config_path;
use tandem::{Config, ExchangeCoordinator, SessionStore, TandemServer};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tandem")]
#[command(about = "Two-party WebRTC signaling relay", long_about = None)]
struct Cli {
    /// Config file (defaults to ~/.tandem/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the signaling server
    Start {
        /// Override server.bind_address from the config
        #[arg(long)]
        addr: Option<String>,
    },
    /// Print the effective config
    Config,
}

fn init_logging(level: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new(format!("tandem={}", level)),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(get_config_path);
    let mut config = Config::load_from(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    match cli.command {
        Commands::Start { addr } => {
            init_logging(&config.logging.level)?;

            // CLI address wins over the config file
            if let Some(addr) = addr {
                config.server.bind_address = addr;
            }

            let coordinator = Arc::new(ExchangeCoordinator::new(Arc::new(SessionStore::new())));
            let server = TandemServer::from_config(coordinator, &config);

            println!("Starting tandem on {}", server.addr());
            println!("Config: {}", config_path.display());
            println!("Meeting: http://{}{}", server.addr(), config.server.meeting_path);

            server.run().await?;
        }
        Commands::Config => {
            println!("# {}", config_path.display());
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
