mod commands;
mod config;

use clap::{Parser, Subcommand};
use numguess_core::{LotteryController, LotteryError};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "numguess")]
#[command(about = "Number guessing lottery - pick 1-99, match the contract to win the jackpot")]
#[command(version)]
struct Cli {
    /// Config file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Wallet provider JSON-RPC URL (defaults to $NUMGUESS_RPC_URL)
    #[arg(long, global = true)]
    rpc_url: Option<String>,

    /// Lottery contract address
    #[arg(long, global = true)]
    contract: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect the wallet and show account and jackpot
    Connect,
    /// Show the current jackpot
    Jackpot,
    /// Show contract state: play cost, owner, last jackpot, recent players
    Info {
        /// Maximum number of recent players to list
        #[arg(short, long, default_value = "10")]
        players: usize,
    },
    /// Play one round with a number between 1 and 99
    Play {
        /// Your guess
        number: u64,
        /// Do not animate the drawn number while waiting
        #[arg(long)]
        no_animation: bool,
    },
    /// List past Played and Jackpot events
    History {
        /// First block to scan
        #[arg(short, long, default_value = "0")]
        from_block: u64,
    },
    /// Stream Played and Jackpot events until Ctrl-C
    Watch,
    /// Withdraw the contract balance (owner only)
    Withdraw {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "numguess={},numguess_core={}",
            log_level, log_level
        )))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let overrides = config::Overrides {
        rpc_url: cli.rpc_url,
        contract: cli.contract,
        no_animation: matches!(
            cli.command,
            Commands::Play {
                no_animation: true,
                ..
            }
        ),
    };
    let lottery_config = config::load(cli.config.as_deref(), overrides)?;
    tracing::debug!(
        "Contract {} via {}",
        lottery_config.contract_address,
        lottery_config.rpc_url.as_deref().unwrap_or("<no provider>")
    );

    if let Commands::Config = cli.command {
        println!("{}", serde_json::to_string_pretty(&lottery_config)?);
        return Ok(());
    }

    let controller = LotteryController::from_config(lottery_config)?;

    // Execute command
    let result = match cli.command {
        Commands::Connect => commands::connect(&controller).await,
        Commands::Jackpot => commands::jackpot(&controller).await,
        Commands::Info { players } => commands::info(&controller, players).await,
        Commands::Play { number, .. } => commands::play(&controller, number).await,
        Commands::History { from_block } => commands::history(&controller, from_block).await,
        Commands::Watch => commands::watch(&controller).await,
        Commands::Withdraw { yes } => commands::withdraw(&controller, yes).await,
        Commands::Config => Ok(()),
    };

    if let Err(e) = result {
        match e.downcast_ref::<LotteryError>() {
            Some(LotteryError::ProviderNotFound) => {
                eprintln!("Error: Wallet provider is not installed");
                eprintln!("Pass --rpc-url or set NUMGUESS_RPC_URL");
            }
            Some(LotteryError::InvalidNumber(number)) => {
                eprintln!("Error: {} is not between 1 and 99", number);
            }
            Some(LotteryError::TransactionReverted { tx_hash }) => {
                eprintln!("Error: Transaction reverted");
                eprintln!("Hash: {}", tx_hash);
            }
            _ => {
                eprintln!("Error: {}", e);
            }
        }
        std::process::exit(1);
    }

    Ok(())
}
