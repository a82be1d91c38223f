use anyhow::Context as _;
use clap::{Args, Parser, Subcommand, ValueEnum};
use sol_token_metadata_sdk::{
    keys::parse_pubkey, rpc::RpcBackend, CancelToken, MetadataPayload, MetadataUpdater,
    RetryPolicy, SubmitBackend, TokenMetadataClient,
};
use solana_sdk::{
    commitment_config::CommitmentConfig, native_token::LAMPORTS_PER_SOL, signature::Signer,
};
use std::{path::PathBuf, time::Duration};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod signer;

use config::{sol_to_lamports, PayloadFile, UpdateConfig};
use signer::keypair_from_source;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ClusterArg {
    Mainnet,
    Devnet,
    Testnet,
    Localnet,
}

impl ClusterArg {
    fn default_rpc(self) -> &'static str {
        match self {
            ClusterArg::Mainnet => "https://api.mainnet-beta.solana.com",
            ClusterArg::Devnet => "https://api.devnet.solana.com",
            ClusterArg::Testnet => "https://api.testnet.solana.com",
            ClusterArg::Localnet => "http://127.0.0.1:8899",
        }
    }

    fn explorer_cluster(self) -> &'static str {
        match self {
            ClusterArg::Mainnet => "mainnet-alpha",
            ClusterArg::Devnet => "devnet-alpha",
            ClusterArg::Testnet => "testnet-solana",
            ClusterArg::Localnet => "localnet-solana",
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CommitmentArg {
    Confirmed,
    Finalized,
}

impl CommitmentArg {
    fn to_config(self) -> CommitmentConfig {
        match self {
            CommitmentArg::Confirmed => CommitmentConfig::confirmed(),
            CommitmentArg::Finalized => CommitmentConfig::finalized(),
        }
    }
}

#[derive(Clone, Debug, Args)]
struct SignerArg {
    /// Signer source: prompt|stdin|file:/path|env:VAR|<path>
    #[arg(
        long = "keypair",
        alias = "signer",
        env = "SOLANA_KEYPAIR",
        default_value = "file:keypair.json"
    )]
    keypair: String,
}

#[derive(Parser, Debug)]
#[command(
    name = "sol-metadata",
    version,
    about = "Solana Token Metadata CLI",
    long_about = "Creates Metaplex token metadata (CreateMetadataAccountV3) for an existing SPL mint.\nJSON is always printed to stdout; logs/status to stderr."
)]
struct Cli {
    /// RPC endpoint URL (defaults to the cluster's public endpoint)
    #[arg(env = "SOLANA_RPC_URL", global = true, long)]
    rpc: Option<String>,

    /// Cluster (selects the default RPC and the explorer link)
    #[arg(env = "SOLANA_CLUSTER", global = true, long, value_enum, default_value_t = ClusterArg::Mainnet)]
    cluster: ClusterArg,

    /// Confirmation level for sends and status checks
    #[arg(global = true, long, value_enum, default_value_t = CommitmentArg::Confirmed)]
    commitment: CommitmentArg,

    /// Total submission attempts, including the first
    #[arg(global = true, long, default_value_t = 3)]
    max_attempts: u32,

    /// Timeout for each network call, in seconds
    #[arg(global = true, long, default_value_t = 60)]
    attempt_timeout_secs: u64,

    /// Pause between attempts, in milliseconds
    #[arg(global = true, long, default_value_t = 0)]
    retry_delay_ms: u64,

    /// Minimum signer balance required before submitting, in SOL
    #[arg(global = true, long, default_value_t = 0.02)]
    min_balance_sol: f64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create metadata for an existing mint
    #[command(alias = "new", about = "Create token metadata for an existing mint")]
    Create {
        /// Mint address (base58)
        #[arg(long, env = "TOKEN_MINT")]
        mint: String,

        /// Token name
        #[arg(long, required_unless_present = "payload", conflicts_with = "payload")]
        name: Option<String>,

        /// Token symbol
        #[arg(long, required_unless_present = "payload", conflicts_with = "payload")]
        symbol: Option<String>,

        /// Off-chain metadata JSON URI
        #[arg(long, required_unless_present = "payload", conflicts_with = "payload")]
        uri: Option<String>,

        /// Royalty in basis points
        #[arg(long, default_value_t = 0, conflicts_with = "payload")]
        seller_fee_bps: u16,

        /// JSON payload file (DataV2 fields, camelCase)
        #[arg(long)]
        payload: Option<PathBuf>,

        /// If set, metadata can never be updated
        #[arg(long, default_value_t = false)]
        immutable: bool,

        #[command(flatten)]
        signer: SignerArg,
    },

    /// Show the metadata PDA of a mint
    #[command(alias = "address", about = "Derive the metadata PDA for a mint")]
    Pda {
        #[arg(long, env = "TOKEN_MINT")]
        mint: String,
    },

    /// Show the signer balance against the funds gate
    #[command(about = "Show the signer's balance and whether it covers the minimum")]
    Balance {
        #[command(flatten)]
        signer: SignerArg,
    },
}

impl Cli {
    fn update_config(&self) -> anyhow::Result<UpdateConfig> {
        let policy = RetryPolicy::default()
            .with_max_attempts(self.max_attempts)
            .with_attempt_timeout(Duration::from_secs(self.attempt_timeout_secs))
            .with_retry_delay(Duration::from_millis(self.retry_delay_ms));
        Ok(UpdateConfig {
            rpc_url: self
                .rpc
                .clone()
                .unwrap_or_else(|| self.cluster.default_rpc().to_string()),
            commitment: self.commitment.to_config(),
            policy,
            min_balance_lamports: sol_to_lamports(self.min_balance_sol)?,
            explorer_cluster: self.cluster.explorer_cluster(),
        })
    }
}

fn updater(config: &UpdateConfig) -> MetadataUpdater<RpcBackend> {
    info!(rpc = %config.rpc_url, "connecting to Solana cluster");
    let backend = RpcBackend::new(&config.rpc_url, config.commitment, config.rpc_timeout());
    MetadataUpdater::new(backend, config.policy).with_min_balance(config.min_balance_lamports)
}

fn cancel_on_ctrl_c() -> CancelToken {
    let cancel = CancelToken::new();
    let trip = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after the current attempt");
            trip.cancel();
        }
    });
    cancel
}

fn resolve_payload(
    name: Option<String>,
    symbol: Option<String>,
    uri: Option<String>,
    seller_fee_bps: u16,
    payload: Option<PathBuf>,
) -> anyhow::Result<MetadataPayload> {
    match payload {
        Some(path) => PayloadFile::load(&path)?.into_payload(),
        None => Ok(MetadataPayload::new(
            name.unwrap_or_default(),
            symbol.unwrap_or_default(),
            uri.unwrap_or_default(),
            seller_fee_bps,
        )),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Cli::parse();
    let config = args.update_config()?;

    match args.command {
        Commands::Create {
            mint,
            name,
            symbol,
            uri,
            seller_fee_bps,
            payload,
            immutable,
            signer,
        } => {
            info!("starting token metadata creation");
            let mint = parse_pubkey(&mint, "tokenMint")?;
            info!(%mint, "token mint");

            let mut payload = resolve_payload(name, symbol, uri, seller_fee_bps, payload)?;
            let kp = keypair_from_source(&signer.keypair)?;
            info!(wallet = %kp.pubkey(), "wallet keypair loaded");

            if payload.creators.is_empty() {
                payload = payload.with_sole_creator(kp.pubkey());
            }

            let cancel = cancel_on_ctrl_c();
            let report = updater(&config)
                .create_metadata(&kp, mint, payload, !immutable, None, &cancel)
                .await
                .with_context(|| format!("create metadata for mint {mint}"))?;

            let txid = report.signature.to_string();
            eprintln!(
                "create-metadata: txid={} attempts={}",
                txid, report.attempts
            );
            info!("it may take up to 24 hours for metadata to appear on explorers");
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "txid": txid,
                    "mint": report.mint.to_string(),
                    "metadata": report.metadata.to_string(),
                    "bump": report.bump,
                    "attempts": report.attempts,
                    "explorer": config.explorer_link(&txid),
                }))?
            );
        }
        Commands::Pda { mint } => {
            let mint = parse_pubkey(&mint, "tokenMint")?;
            let client = TokenMetadataClient::default();
            let derived = client.metadata_pda_and_bump(&mint)?;
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "program_id": client.program_id.to_string(),
                    "mint": mint.to_string(),
                    "metadata": derived.address.to_string(),
                    "bump": derived.bump,
                }))?
            );
        }
        Commands::Balance { signer } => {
            let kp = keypair_from_source(&signer.keypair)?;
            let updater = updater(&config);
            let lamports = updater
                .submitter()
                .backend()
                .balance(&kp.pubkey())
                .await
                .context("query wallet balance")?;
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "wallet": kp.pubkey().to_string(),
                    "lamports": lamports,
                    "sol": lamports as f64 / LAMPORTS_PER_SOL as f64,
                    "required_lamports": config.min_balance_lamports,
                    "sufficient": lamports >= config.min_balance_lamports,
                }))?
            );
        }
    }

    Ok(())
}
