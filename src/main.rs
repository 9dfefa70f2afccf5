use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use eur_pricing::core::log::init_logging;
use eur_pricing::core::pricing::CostRequest;

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

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Price token usage in EUR
    Quote {
        /// Number of tokens used
        #[arg(short, long)]
        tokens: u64,
        /// Provider price in USD per 1M tokens
        #[arg(short, long)]
        rate_usd: f64,
        /// Provider label, e.g. openai
        #[arg(long)]
        provider: Option<String>,
        /// Model label, e.g. gpt-4o
        #[arg(long)]
        model: Option<String>,
        /// Use this EUR per USD rate instead of fetching one
        #[arg(long)]
        exchange_rate: Option<f64>,
        /// Print the transaction record as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the current USD to EUR exchange rate
    Rate,
    /// Convert between credits and EUR
    Credits {
        amount: f64,
        /// Treat the amount as EUR and convert to credits
        #[arg(long)]
        from_eur: bool,
    },
    /// Show a credit balance in EUR and USD
    Balance { credits: f64 },
    /// Show pricing configuration and cache state
    Config,
}

impl From<Commands> for eur_pricing::AppCommand {
    fn from(cmd: Commands) -> eur_pricing::AppCommand {
        match cmd {
            Commands::Quote {
                tokens,
                rate_usd,
                provider,
                model,
                exchange_rate,
                json,
            } => eur_pricing::AppCommand::Quote {
                request: CostRequest {
                    tokens,
                    rate_usd,
                    provider,
                    model,
                },
                exchange_rate,
                json,
            },
            Commands::Rate => eur_pricing::AppCommand::Rate,
            Commands::Credits { amount, from_eur } => {
                eur_pricing::AppCommand::Credits { amount, from_eur }
            }
            Commands::Balance { credits } => eur_pricing::AppCommand::Balance { credits },
            Commands::Config => eur_pricing::AppCommand::Config,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => eur_pricing::cli::setup::setup().map(|path| {
            println!("Created default configuration at {}", path.display());
        }),
        Some(cmd) => eur_pricing::run_command(cmd.into(), cli.config_path.as_deref()).await,
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
