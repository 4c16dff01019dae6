//! Starkd CLI
//!
//! Runs the ERC-20 client and the fungible-token balance read from the
//! command line. Settings come from a JSON config file, flags and the
//! environment (a `.env` file is honored).

use anyhow::{bail, Context};
use clap::{ArgAction, Args, Parser, Subcommand};
use starkd::calldata::{selector, to_hex};
use starkd::prelude::*;
use starkd::session::read_balance_from;
use starkd::RateLimitConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "starkd", version, about = "StarkNet token calls from the command line")]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = "starkd.json")]
    config: PathBuf,

    /// Network to use, overriding the config file
    #[arg(long, global = true, env = "STARKD_NETWORK")]
    network: Option<Network>,

    /// JSON-RPC endpoint, overriding the network preset
    #[arg(long, global = true, env = "STARKD_RPC_URL")]
    rpc_url: Option<String>,

    /// Cap on requests per second sent to the node and gateway
    #[arg(long, global = true, env = "STARKD_RPS")]
    rps: Option<u32>,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the selector of an entry point
    Selector {
        /// Entry point name
        name: String,
    },
    /// Read the fungible-token balance of an address
    Balance {
        #[arg(long)]
        address: String,
    },
    /// Read how much `spender` may move on behalf of `owner`
    Allowance {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        spender: String,
    },
    /// Transfer tokens from the configured account
    Transfer {
        #[arg(long)]
        recipient: String,
        /// Amount in tokens, e.g. 5 or 0.25
        #[arg(long)]
        amount: String,
        #[command(flatten)]
        account: AccountArgs,
    },
}

#[derive(Debug, Args)]
struct AccountArgs {
    /// Private key of the signing account
    #[arg(long, env = "STARKD_ACCOUNT_KEY", hide_env_values = true)]
    account_key: String,

    /// Address of the account contract
    #[arg(long, env = "STARKD_ACCOUNT_ADDRESS")]
    account_address: String,
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn require(contract: ContractRef, what: &str) -> anyhow::Result<ContractRef> {
    if contract.is_unset() {
        bail!("no {what} contract configured");
    }
    Ok(contract)
}

fn load_config(cli: &Cli) -> anyhow::Result<StarkdConfig> {
    let mut config = StarkdConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(network) = cli.network {
        config.network = network;
    }
    if let Some(url) = &cli.rpc_url {
        config.rpc_url = Some(url.clone());
    }
    if let Some(rps) = cli.rps {
        config.rate_limit = Some(RateLimitConfig::per_second(rps));
    }
    Ok(config)
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    let network = config.network_config();
    tracing::debug!(
        network = %network.network,
        rpc = network.primary_rpc(),
        throttled = network.rate_limit.is_some(),
        "Loaded configuration"
    );

    match cli.command {
        Command::Selector { name } => {
            println!("{}", to_hex(&selector(&name)?));
        }
        Command::Balance { address } => {
            let token = require(config.contracts.fungible_token, "fungible token")?;
            let provider = JsonRpcProvider::new(&network.provider_config())?;
            println!("{}", read_balance_from(&provider, token, &address).await?);
        }
        Command::Allowance { owner, spender } => {
            let token = require(config.erc20_contract, "ERC-20")?;
            let client =
                Erc20Client::read_only(&network, token)?.with_error_mode(config.error_mode);
            match client.allowance_settled(&owner, &spender).await? {
                Some(allowance) => println!("{allowance}"),
                None => eprintln!("allowance unavailable"),
            }
        }
        Command::Transfer {
            recipient,
            amount,
            account,
        } => {
            let token = require(config.erc20_contract, "ERC-20")?;
            let client = Erc20Client::new(
                &account.account_key,
                &network,
                &account.account_address,
                token,
            )?
            .with_error_mode(config.error_mode);
            match client.transfer_settled(&recipient, &amount).await? {
                Some(hash) => println!("{hash}"),
                None => eprintln!("transfer not submitted"),
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    run(cli).await
}
