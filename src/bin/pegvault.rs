//! pegvault CLI
//!
//! Drives the protocol state machine against a file-backed ledger. Every
//! state-changing invocation is one block: it opens the next height, executes
//! the operation, persists the ledger and prints the block's events.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use console::style;

use pegvault::cli::{
    format_amount, parse_amount, parse_amount_list, parse_identity, CliConfig, OutputFormat,
    OutputFormatter,
};
use pegvault::core::ledger::Ledger;
use pegvault::prelude::*;
use pegvault::storage::FileStore;
use pegvault::utils::constants::DEFAULT_SCALE;
use pegvault::utils::crypto::KeyPair;

/// pegvault - overcollateralized synthetic dollar engine
#[derive(Parser)]
#[command(name = "pegvault")]
#[command(version = pegvault::VERSION)]
#[command(about = "Operate a pegvault ledger from the command line", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file
    #[arg(short, long, env = "PEGVAULT_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory (overrides the configuration file)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Log filter, e.g. `info` or `pegvault=debug`
    #[arg(long)]
    log_level: Option<String>,

    /// Identity submitting the operation (hex public key)
    #[arg(long, env = "PEGVAULT_CALLER")]
    caller: Option<String>,

    /// Block height to execute at (default: current height + 1)
    #[arg(long)]
    height: Option<u64>,

    /// Output format: text or json
    #[arg(long, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bind governance, collateral ratio, fee rate and decimals
    Init {
        /// Governance identity (hex public key)
        #[arg(long)]
        governance: String,
        /// Collateral ratio as a decimal, e.g. 1.5
        #[arg(long)]
        ratio: String,
        /// Fee rate as a decimal, e.g. 0.005
        #[arg(long)]
        fee_rate: String,
        /// Fixed-point scale as a raw integer
        #[arg(long, default_value_t = DEFAULT_SCALE)]
        decimals: u64,
    },

    /// Bind the governance identity on an uninitialised ledger
    SetDao {
        /// Governance identity (hex public key)
        identity: String,
    },

    /// Replace the collateral ratio (governance)
    SetRatio {
        /// New ratio as a decimal
        ratio: String,
    },

    /// Publish a collateral price (governance)
    SetPrice {
        /// Price as a decimal
        price: String,
    },

    /// Publish the average of up to 20 prices (governance)
    SetPriceAggregated {
        /// Comma separated prices
        prices: String,
    },

    /// Mint stable against collateral
    Mint {
        /// Gross stable amount
        amount: String,
        /// Collateral offered
        collateral: String,
    },

    /// Burn stable for collateral
    Burn {
        /// Stable amount
        amount: String,
    },

    /// Transfer stable
    Transfer {
        /// Recipient (hex public key)
        to: String,
        /// Amount debited from the caller
        amount: String,
    },

    /// Move collected fees into treasury and emergency reserves
    DistributeFees,

    /// Add stability pool liquidity
    Provide {
        /// Collateral amount
        #[arg(long, default_value = "0")]
        collateral: String,
        /// Stable amount
        #[arg(long, default_value = "0")]
        stable: String,
    },

    /// Withdraw stability pool liquidity
    Withdraw {
        /// Collateral amount
        #[arg(long, default_value = "0")]
        collateral: String,
        /// Stable amount
        #[arg(long, default_value = "0")]
        stable: String,
    },

    /// Run a stabilization pass
    Stabilize,

    /// Re-evaluate and commit the lock state
    CheckPeg,

    /// Show ledger aggregates
    Status,

    /// Show the balances of one identity
    Balance {
        /// Identity (hex public key)
        identity: String,
    },

    /// Key management
    #[command(subcommand)]
    Keys(KeysCommands),
}

#[derive(Subcommand)]
enum KeysCommands {
    /// Generate a new key pair
    Generate,
    /// Derive the public key of a private key
    Show {
        /// Private key (hex)
        private_key: String,
    },
}

// ═══════════════════════════════════════════════════════════════════════════════
// MAIN
// ═══════════════════════════════════════════════════════════════════════════════

fn main() {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {:#}", style("Error:").red().bold(), e);
            std::process::exit(2);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let out = OutputFormatter::new(cli.format);
    if let Err(e) = run_command(&cli, &config, &out) {
        out.error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<CliConfig> {
    let path = cli.config.clone().unwrap_or_else(CliConfig::default_path);
    let mut config = CliConfig::load_or_default(&path)
        .with_context(|| format!("loading {}", path.display()))?;
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    config.validate()?;
    Ok(config)
}

fn run_command(cli: &Cli, config: &CliConfig, out: &OutputFormatter) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Keys(cmd) => cmd_keys(cmd, out),
        Commands::Status => cmd_status(&open_machine(config)?, out),
        Commands::Balance { identity } => {
            cmd_balance(&open_machine(config)?, &parse_identity(identity)?, out)
        }
        command => {
            let mut machine = open_machine(config)?;
            let op = build_operation(cli, command, machine.ledger())?;
            execute_block(&mut machine, cli.height, op, out)
        }
    }
}

fn open_machine(config: &CliConfig) -> anyhow::Result<ProtocolStateMachine<FileStore>> {
    let store = FileStore::new(&config.data_dir)
        .with_context(|| format!("opening store in {}", config.data_dir.display()))?;
    let params = config.engine_params()?;
    Ok(ProtocolStateMachine::with_params(store, params)?)
}

// ═══════════════════════════════════════════════════════════════════════════════
// OPERATIONS
// ═══════════════════════════════════════════════════════════════════════════════

fn ledger_scale(ledger: &Ledger) -> Amount {
    ledger
        .scale()
        .cloned()
        .unwrap_or_else(|_| Amount::from_u64(DEFAULT_SCALE))
}

fn build_operation(cli: &Cli, command: &Commands, ledger: &Ledger) -> anyhow::Result<ProtocolOperation> {
    let caller = match &cli.caller {
        Some(hex) => parse_identity(hex)?,
        None => anyhow::bail!("--caller (or PEGVAULT_CALLER) is required for this command"),
    };
    let scale = ledger_scale(ledger);
    let amount = |s: &String| parse_amount(s, &scale);

    let op = match command {
        Commands::Init {
            governance,
            ratio,
            fee_rate,
            decimals,
        } => {
            let decimals = Amount::from_u64(*decimals);
            ProtocolOperation::Init(InitOp {
                caller,
                governance: parse_identity(governance)?,
                collateral_ratio: parse_amount(ratio, &decimals)?,
                fee_rate: parse_amount(fee_rate, &decimals)?,
                decimals,
            })
        }
        Commands::SetDao { identity } => ProtocolOperation::SetDao(SetDaoOp {
            caller,
            governance: parse_identity(identity)?,
        }),
        Commands::SetRatio { ratio } => {
            ProtocolOperation::UpdateCollateralRatio(UpdateCollateralRatioOp {
                caller,
                ratio: amount(ratio)?,
            })
        }
        Commands::SetPrice { price } => {
            ProtocolOperation::UpdateCollateralPrice(UpdateCollateralPriceOp {
                caller,
                price: amount(price)?,
            })
        }
        Commands::SetPriceAggregated { prices } => {
            ProtocolOperation::UpdateCollateralPriceAggregated(UpdateCollateralPriceAggregatedOp {
                caller,
                prices: parse_amount_list(prices, &scale)?,
            })
        }
        Commands::Mint { amount: a, collateral } => ProtocolOperation::Mint(MintOp {
            caller,
            stable_amount: amount(a)?,
            provided_collateral: amount(collateral)?,
        }),
        Commands::Burn { amount: a } => ProtocolOperation::Burn(BurnOp {
            caller,
            stable_amount: amount(a)?,
        }),
        Commands::Transfer { to, amount: a } => ProtocolOperation::Transfer(TransferOp {
            caller,
            to: parse_identity(to)?,
            amount: amount(a)?,
        }),
        Commands::DistributeFees => ProtocolOperation::DistributeFee(DistributeFeeOp { caller }),
        Commands::Provide { collateral, stable } => {
            ProtocolOperation::ProvideLiquidity(ProvideLiquidityOp {
                caller,
                collateral_amount: amount(collateral)?,
                stable_amount: amount(stable)?,
            })
        }
        Commands::Withdraw { collateral, stable } => {
            ProtocolOperation::WithdrawLiquidity(WithdrawLiquidityOp {
                caller,
                collateral_amount: amount(collateral)?,
                stable_amount: amount(stable)?,
            })
        }
        Commands::Stabilize => ProtocolOperation::Stabilize(StabilizeOp { caller }),
        Commands::CheckPeg => ProtocolOperation::CheckPeg(CheckPegOp { caller }),
        Commands::Status | Commands::Balance { .. } | Commands::Keys(_) => {
            anyhow::bail!("not a ledger operation")
        }
    };
    Ok(op)
}

fn execute_block(
    machine: &mut ProtocolStateMachine<FileStore>,
    height: Option<u64>,
    op: ProtocolOperation,
    out: &OutputFormatter,
) -> anyhow::Result<()> {
    let height = height.unwrap_or(machine.block_height() + 1);
    let operation = op.operation_type();

    machine.begin_block(height)?;
    let result = machine.execute(op)?;
    let events = machine.end_block()?;

    out.success(&format!("{} committed at height {}", operation, height));
    out.data(&result);
    for event in events.events() {
        out.info(&format!("event {} @{}", event.event_type(), event.block_height()));
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// QUERIES
// ═══════════════════════════════════════════════════════════════════════════════

fn cmd_status(machine: &ProtocolStateMachine<FileStore>, out: &OutputFormatter) -> anyhow::Result<()> {
    let ledger = machine.ledger();
    if out.format() == OutputFormat::Json {
        out.data(&machine.summary());
        return Ok(());
    }

    let scale = ledger_scale(ledger);
    let fmt = |a: &Amount| format_amount(a, &scale);

    out.section("Ledger");
    out.kv("Block height", &machine.block_height().to_string());
    out.kv("Initialized", &ledger.is_initialized().to_string());
    out.kv("Lock state", &ledger.lock_state().to_string());
    if let Ok(price) = ledger.peg_price() {
        out.kv("Peg price", &fmt(&price));
    }
    out.kv("Collateral price", &fmt(ledger.collateral_price()));

    out.section("Supply");
    out.kv("Stable supply", &fmt(ledger.stable_supply()));
    out.kv("Collateral supply", &fmt(ledger.collateral_supply()));
    if let Ok(value) = ledger.total_collateral_value_usd() {
        out.kv("Collateral value", &fmt(&value));
    }

    out.section("Reserves");
    out.kv("Stable fees collected", &fmt(ledger.stable_fee_collected()));
    out.kv("Collateral fees collected", &fmt(ledger.collateral_fee_collected()));
    out.kv("Treasury stable", &fmt(ledger.treasury_stable()));
    out.kv("Treasury collateral", &fmt(ledger.treasury_collateral()));
    out.kv("Emergency stable", &fmt(ledger.emergency_stable()));
    out.kv("Emergency collateral", &fmt(ledger.emergency_collateral()));

    out.section("Stability pool");
    out.kv("Pool stable", &fmt(ledger.pool_stable()));
    out.kv("Pool collateral", &fmt(ledger.pool_collateral()));
    out.kv("Reward pool", &fmt(ledger.reward_pool()));
    Ok(())
}

fn cmd_balance(
    machine: &ProtocolStateMachine<FileStore>,
    identity: &PublicKey,
    out: &OutputFormatter,
) -> anyhow::Result<()> {
    let ledger = machine.ledger();
    let scale = ledger_scale(ledger);
    let fmt = |a: Amount| format_amount(&a, &scale);

    out.section(&format!("Balances of {}", identity.short()));
    out.kv("Stable", &fmt(ledger.stable_balance(identity)));
    out.kv("Collateral", &fmt(ledger.collateral_balance(identity)));
    out.kv("Pool stable", &fmt(ledger.pool_stable_balance(identity)));
    out.kv("Pool collateral", &fmt(ledger.pool_collateral_balance(identity)));
    out.kv(
        "Last mint height",
        &ledger
            .last_minted_at(identity)
            .map(|h| h.to_string())
            .unwrap_or_else(|| "-".into()),
    );
    Ok(())
}

fn cmd_keys(cmd: &KeysCommands, out: &OutputFormatter) -> anyhow::Result<()> {
    let keypair = match cmd {
        KeysCommands::Generate => KeyPair::generate(),
        KeysCommands::Show { private_key } => KeyPair::from_hex(private_key)?,
    };
    out.kv("Public key", &keypair.public_key().to_hex());
    if matches!(cmd, KeysCommands::Generate) {
        out.kv("Private key", &keypair.private_key().to_hex());
        out.warning("Store the private key safely; it is not written anywhere");
    }
    Ok(())
}
