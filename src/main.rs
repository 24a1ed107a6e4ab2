//! Vault Yield Agent — Entry Point
//!
//! Runs one caller-facing operation per invocation and exits.
//!
//! Wiring sequence:
//! 1. Load config.toml + validate, resolve typed settings
//! 2. Init tracing (JSON structured logging on stderr)
//! 3. Load the wallet key from env (PRIVATE_KEY, `.env` honoured)
//! 4. Connect the RPC provider (chain ID checked)
//! 5. Create the x402 payment-gated API client
//! 6. Build the DeploymentOrchestrator and run the subcommand

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;

use alloy::primitives::U256;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing::info;

use vault_yield_agent::adapters::api::client::PaymentGatedClient;
use vault_yield_agent::adapters::chain::{EvmProvider, LocalWallet};
use vault_yield_agent::config::{self, AgentSettings};
use vault_yield_agent::domain::amount::to_decimal;
use vault_yield_agent::domain::vault::{ApyInterval, Position};
use vault_yield_agent::usecases::DeploymentOrchestrator;

#[derive(Parser)]
#[command(name = "vault-agent")]
#[command(about = "Deploy idle assets into yield vaults", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Gas balance, idle balance and active position count
    State,
    /// Idle balance of the configured asset
    Idle,
    /// Current vault positions
    Positions {
        /// Re-read until at least one position is visible
        #[arg(long)]
        retry: bool,
    },
    /// Deposit a percentage of the idle balance into the best vault
    Deploy {
        /// Percentage of idle balance, in (0, 100]
        percentage: Decimal,
    },
    /// Redeem a percentage of one position by nickname
    Redeem {
        /// Position nickname as shown by `positions`
        nickname: String,
        /// Percentage to redeem, in (0, 100]
        #[arg(default_value = "100")]
        percentage: Decimal,
    },
    /// Fully redeem every position
    RedeemAll,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── 1. Load configuration ───────────────────────────────
    let app_config = config::loader::load_config(&cli.config)
        .context("Failed to load configuration")?;
    let settings = AgentSettings::from_config(&app_config)
        .context("Invalid configuration")?;

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    tracing_subscriber::EnvFilter::new(&app_config.agent.log_level)
                }),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    info!(
        name = %settings.agent_name,
        version = env!("CARGO_PKG_VERSION"),
        network = %settings.network,
        asset = %settings.asset_symbol,
        "Starting vault yield agent"
    );

    // ── 3. Wallet key from env ──────────────────────────────
    dotenvy::dotenv().ok();
    let wallet = Arc::new(LocalWallet::from_env().context("Failed to load wallet key")?);

    // ── 4. RPC provider ─────────────────────────────────────
    let provider = Arc::new(
        EvmProvider::connect(&settings.rpc_url, settings.chain_id, settings.rpc_timeout)
            .await
            .context("Failed to connect to RPC")?,
    );

    // ── 5. x402 API client ──────────────────────────────────
    let api = Arc::new(
        PaymentGatedClient::new(Arc::clone(&wallet), settings.payment_client())
            .context("Failed to create API client")?,
    );

    // ── 6. Orchestrator ─────────────────────────────────────
    let decimals = settings.display_decimals;
    let symbol = settings.asset_symbol.clone();
    let interval = settings.selection.interval;
    let agent = DeploymentOrchestrator::new(api, provider, wallet, settings);

    match cli.command {
        Commands::State => {
            let state = agent.show_state().await?;
            println!("Wallet:           {}", state.address);
            println!("Gas balance:      {} ETH", native(state.gas_balance));
            println!("Idle balance:     {} {symbol}", state.idle.amount.round_dp(decimals));
            println!("Active positions: {}", state.active_positions);
        }
        Commands::Idle => {
            let idle = agent.show_idle_assets().await?;
            println!(
                "Idle {}: {} (${:.2})",
                idle.symbol,
                idle.amount.round_dp(decimals),
                idle.balance_usd
            );
        }
        Commands::Positions { retry } => {
            let positions = agent.show_positions(retry).await?;
            print_positions(&positions, decimals, &symbol, interval);
        }
        Commands::Deploy { percentage } => {
            let report = agent.deploy_capital(percentage).await?;
            println!(
                "Deployed {} {symbol} into {} ({})",
                report.amount.round_dp(decimals),
                report.vault.name,
                report.vault.address
            );
            println!("Reason: {}", report.rationale);
            for hash in &report.tx_hashes {
                println!("  tx {hash}");
            }
            if let Some(error) = &report.refresh.error {
                println!("Deposit confirmed, but reading positions afterwards failed: {error}");
            } else if report.refresh.satisfied {
                print_positions(&report.refresh.positions, decimals, &symbol, interval);
            } else {
                println!(
                    "Position not yet visible upstream after {} read(s); check again with `positions --retry`",
                    report.refresh.attempts
                );
            }
        }
        Commands::Redeem { nickname, percentage } => {
            let report = agent.redeem(&nickname, percentage).await?;
            let amount = to_decimal(report.amount_minor, report.position.decimals).unwrap_or_default();
            println!(
                "Redeemed {} {symbol} from {}{}",
                amount.round_dp(decimals),
                report.position.vault_name,
                if report.full { " (full exit)" } else { "" }
            );
            for hash in &report.tx_hashes {
                println!("  tx {hash}");
            }
            if !report.rejected_actions.is_empty() {
                println!("Skipped follow-up actions: {}", report.rejected_actions.join(", "));
            }
            if let Some(error) = &report.positions_error {
                println!("Redemption confirmed, but reading positions afterwards failed: {error}");
            }
        }
        Commands::RedeemAll => {
            let report = agent.redeem_all().await?;
            for outcome in &report.outcomes {
                match &outcome.result {
                    Ok(r) => println!("{:<10}  redeemed ({} tx)", outcome.nickname, r.tx_hashes.len()),
                    Err(e) => println!("{:<10}  FAILED: {e}", outcome.nickname),
                }
            }
            println!("{} of {} positions redeemed", report.succeeded(), report.outcomes.len());
            if let Some(error) = &report.positions_error {
                println!("Reading positions afterwards failed: {error}");
            }
        }
    }

    Ok(())
}

fn print_positions(positions: &[Position], decimals: u32, symbol: &str, interval: ApyInterval) {
    if positions.is_empty() {
        println!("No active positions");
        return;
    }
    for p in positions {
        let apy = p
            .apy
            .get(interval)
            .map_or_else(|| "n/a".to_string(), |a| format!("{:.2}%", a * 100.0));
        println!(
            "{:<10}  {:>14} {symbol}  APY({interval}) {apy:>7}  {}",
            p.nickname,
            p.balance.round_dp(decimals).to_string(),
            p.vault_name
        );
    }
}

/// Wei rendered in whole native units.
fn native(wei: U256) -> String {
    u128::try_from(wei)
        .ok()
        .and_then(|w| to_decimal(w, 18))
        .map_or_else(|| format!("{wei} wei"), |d| d.round_dp(6).to_string())
}
