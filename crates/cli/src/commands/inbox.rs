use anyhow::{bail, Result};
use clap::Args;
use pusdc_sdk::{
    check_amount, parse_tx_no, validate_email, validate_otp, ActionOutcome, BackendApi,
    OutgoingFund, Settled, DEFAULT_DECIMALS,
};

use super::common::{backend, bridge, load_config, token_store, GlobalArgs};
use super::pool::AmountArgs;

#[derive(Clone, Debug, Args)]
pub struct AcceptArgs {
    #[arg(long)]
    pub tx_no: String,
    /// Claim credential from the email link.
    #[arg(long)]
    pub credential: String,
    /// Six-digit code from the email.
    #[arg(long)]
    pub otp: String,
}

#[derive(Clone, Debug, Args)]
pub struct SendEmailArgs {
    pub email: String,
    pub tx_no: String,
}

#[derive(Clone, Debug, Args)]
pub struct OutgoingArgs {
    /// Show a single fund instead of the whole list.
    #[arg(long)]
    pub tx_no: Option<String>,
    /// Claim credential; looks the fund up without a login.
    #[arg(long, requires = "tx_no")]
    pub credential: Option<String>,
}

#[derive(Clone, Debug, Args)]
pub struct RevokeArgs {
    /// Outgoing fund to reclaim.
    pub tx_no: String,
}

fn print_settled(settled: &Settled) {
    match settled.block_number {
        Some(block) => println!("mined in block {block}: {}", settled.tx_hash),
        None => println!("mined: {}", settled.tx_hash),
    }
}

pub async fn pay(global: &GlobalArgs, args: AmountArgs) -> Result<()> {
    check_amount(&args.amount)?;
    let bridge = bridge(global).await?;

    let mut outcome = bridge.pay(&args.amount).await?;
    if let ActionOutcome::Approved(tx_hash) = outcome {
        println!("approval mined: {tx_hash}");
        outcome = bridge.pay(&args.amount).await?;
    }
    match outcome {
        ActionOutcome::Completed(settled) => print_settled(&settled),
        ActionOutcome::Approved(tx_hash) => {
            bail!("allowance still short after approval {tx_hash}")
        }
    }
    Ok(())
}

pub async fn inbox_withdraw(global: &GlobalArgs, args: AmountArgs) -> Result<()> {
    check_amount(&args.amount)?;
    let bridge = bridge(global).await?;
    print_settled(&bridge.inbox_withdraw(&args.amount).await?);
    Ok(())
}

pub async fn accept(global: &GlobalArgs, args: AcceptArgs) -> Result<()> {
    parse_tx_no(&args.tx_no)?;
    validate_otp(&args.otp)?;
    let bridge = bridge(global).await?;
    let settled = bridge
        .accept(&args.tx_no, &args.credential, &args.otp)
        .await?;
    print_settled(&settled);
    Ok(())
}

pub async fn send_email(global: &GlobalArgs, args: SendEmailArgs) -> Result<()> {
    validate_email(&args.email)?;
    parse_tx_no(&args.tx_no)?;
    let bridge = bridge(global).await?;
    bridge.send_email(&args.email, &args.tx_no).await?;
    Ok(())
}

pub async fn revoke(global: &GlobalArgs, args: RevokeArgs) -> Result<()> {
    parse_tx_no(&args.tx_no)?;
    let bridge = bridge(global).await?;
    print_settled(&bridge.revoke(&args.tx_no).await?);
    Ok(())
}

pub async fn outgoing(global: &GlobalArgs, args: OutgoingArgs) -> Result<()> {
    let (funds, decimals) = match (&args.tx_no, &args.credential) {
        (Some(tx_no), Some(credential)) => {
            // Credential lookups are unauthenticated, so no wallet is needed.
            let tx_no = parse_tx_no(tx_no)?;
            let config = load_config(global)?;
            let backend = backend(&config, token_store(global))?;
            let fund = backend.outgoing_fund(tx_no, Some(credential.as_str())).await?;
            return print_funds(fund.as_slice(), DEFAULT_DECIMALS);
        }
        (Some(tx_no), None) => {
            parse_tx_no(tx_no)?;
            let bridge = bridge(global).await?;
            let fund = bridge.outgoing_fund(tx_no, None).await?;
            (fund.into_iter().collect::<Vec<_>>(), bridge.decimals().await)
        }
        _ => {
            let bridge = bridge(global).await?;
            (bridge.outgoing().await?, bridge.decimals().await)
        }
    };
    print_funds(&funds, decimals)
}

fn print_funds(funds: &[OutgoingFund], decimals: u8) -> Result<()> {
    if funds.is_empty() {
        println!("no outgoing funds");
    }
    for fund in funds {
        println!("{}", render_fund(fund, decimals));
    }
    Ok(())
}

fn render_fund(fund: &OutgoingFund, decimals: u8) -> String {
    let amount = fund
        .amount
        .as_ref()
        .map(|amount| amount.render(decimals))
        .unwrap_or_else(|| "?".to_string());
    let email = fund.email.as_deref().unwrap_or("-");
    match &fund.created_at {
        Some(at) => format!("#{:<6} {amount:>14} USDC  {email}  {at}", fund.tx_no),
        None => format!("#{:<6} {amount:>14} USDC  {email}", fund.tx_no),
    }
}
