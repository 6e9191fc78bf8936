use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use pusdc_sdk::{
    AlloyHttpTransport, BridgeConfig, ConfirmationOutcome, ConfirmationReport, FileTokenStore,
    HttpBackend, PrivacyBridge, Severity, StatusSink,
};

/// Connection and configuration flags shared by every subcommand.
#[derive(Clone, Debug, Args)]
pub struct GlobalArgs {
    /// JSON config file; missing fields use the deployed defaults.
    #[arg(long, global = true, env = "PUSDC_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,
    /// Base JSON-RPC endpoint.
    #[arg(long, global = true, env = "PUSDC_RPC_URL")]
    pub rpc_url: Option<String>,
    /// Witness backend base URL.
    #[arg(long, global = true, env = "PUSDC_API_URL")]
    pub api_url: Option<String>,
    /// Wallet private key.
    #[arg(
        long,
        global = true,
        env = "PUSDC_PRIVATE_KEY",
        hide_env_values = true,
        value_name = "HEX64"
    )]
    pub private_key: Option<String>,
    /// Where the login token is kept between runs.
    #[arg(
        long,
        global = true,
        env = "PUSDC_SESSION_FILE",
        default_value = ".pusdc/session.json",
        value_name = "PATH"
    )]
    pub session_file: PathBuf,
    /// Confirmation budget for deposit/withdraw/transfer.
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout_secs: Option<u64>,
}

pub type Bridge = PrivacyBridge<AlloyHttpTransport, HttpBackend>;

/// Config file plus flag and environment overrides.
pub fn load_config(global: &GlobalArgs) -> Result<BridgeConfig> {
    let mut config = match &global.config {
        Some(path) => BridgeConfig::load(path)?,
        None => BridgeConfig::default(),
    };
    if let Some(url) = &global.rpc_url {
        config.rpc_url = url.clone();
    }
    if let Some(url) = &global.api_url {
        config.api_url = url.clone();
    }
    if let Some(secs) = global.timeout_secs {
        config.confirmation_timeout_secs = secs;
    }
    config.validate()?;
    Ok(config)
}

pub fn token_store(global: &GlobalArgs) -> Arc<FileTokenStore> {
    Arc::new(FileTokenStore::new(&global.session_file))
}

pub fn backend(config: &BridgeConfig, tokens: Arc<FileTokenStore>) -> Result<HttpBackend> {
    Ok(HttpBackend::new(
        &config.api_url,
        config.http_timeout(),
        tokens,
    )?)
}

pub async fn connect(global: &GlobalArgs, config: &BridgeConfig) -> Result<AlloyHttpTransport> {
    let pk = global
        .private_key
        .as_ref()
        .context("--private-key (or PUSDC_PRIVATE_KEY) is required")?;
    let transport = AlloyHttpTransport::connect(&config.rpc_url, pk, config.chain_id)
        .await
        .with_context(|| format!("connecting to {}", config.rpc_url))?;
    Ok(transport.with_receipt_poll(config.receipt_poll()))
}

/// Connected bridge that reports progress on stdout.
pub async fn bridge(global: &GlobalArgs) -> Result<Bridge> {
    let config = load_config(global)?;
    let transport = connect(global, &config).await?;
    let backend = backend(&config, token_store(global))?;
    Ok(PrivacyBridge::new(
        transport,
        backend,
        &config,
        Arc::new(ConsoleSink),
    ))
}

/// Prints status messages with a severity tag.
pub struct ConsoleSink;

impl StatusSink for ConsoleSink {
    fn notify(&self, message: &str, severity: Severity) {
        println!("[{}] {message}", severity.as_str());
    }
}

pub fn print_report(report: &ConfirmationReport) {
    match &report.outcome {
        ConfirmationOutcome::ChainConfirmed {
            tx_hash,
            success: true,
        } => println!("confirmed on-chain: {tx_hash}"),
        ConfirmationOutcome::ChainConfirmed {
            tx_hash,
            success: false,
        } => println!("mined but reverted: {tx_hash}"),
        ConfirmationOutcome::BackendConfirmed { snapshot } => {
            println!("confirmed by backend balance change: {snapshot}")
        }
        ConfirmationOutcome::Unconfirmed => match report.tx_hash {
            Some(tx_hash) => println!("not confirmed yet: {tx_hash}"),
            None => println!("not confirmed yet"),
        },
    }
    if let Some(balance) = &report.balance {
        println!("balance: {balance}");
    }
}
