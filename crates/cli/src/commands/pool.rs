use anyhow::Result;
use clap::Args;
use pusdc_sdk::{check_amount, format_amount, parse_address, ActionOutcome};

use super::common::{bridge, print_report, GlobalArgs};

#[derive(Clone, Debug, Args)]
pub struct AmountArgs {
    /// Decimal USDC amount, e.g. 12.5
    #[arg(allow_negative_numbers = true)]
    pub amount: String,
}

#[derive(Clone, Debug, Args)]
pub struct TransferArgs {
    /// Recipient address in the privacy pool.
    pub to: String,
    /// Decimal USDC amount.
    #[arg(allow_negative_numbers = true)]
    pub amount: String,
}

pub async fn balance(global: &GlobalArgs) -> Result<()> {
    let bridge = bridge(global).await?;
    println!("account: {}", bridge.owner());
    for (key, snapshot) in bridge.balances().await? {
        println!("{:<8} {snapshot}", key.as_str());
    }
    Ok(())
}

pub async fn info(global: &GlobalArgs) -> Result<()> {
    let bridge = bridge(global).await?;
    let info = bridge.pool_info().await?;
    let decimals = bridge.decimals().await;
    println!("chain:   {}", info.chain_identifier);
    println!("tick:    {}", info.tick);
    println!("token:   {}", info.erc20);
    println!("witness: {}", info.witness);
    println!("live:    {}", info.live);
    println!("total:   {}", format_amount(info.total, decimals));
    Ok(())
}

/// Approves the pool when needed, then deposits.
pub async fn deposit(global: &GlobalArgs, args: AmountArgs) -> Result<()> {
    check_amount(&args.amount)?;
    let bridge = bridge(global).await?;

    let mut outcome = bridge.deposit(&args.amount).await?;
    if let ActionOutcome::Approved(tx_hash) = outcome {
        println!("approval mined: {tx_hash}");
        outcome = bridge.deposit(&args.amount).await?;
    }
    match outcome {
        ActionOutcome::Completed(report) => print_report(&report),
        ActionOutcome::Approved(tx_hash) => {
            anyhow::bail!("allowance still short after approval {tx_hash}")
        }
    }
    Ok(())
}

pub async fn withdraw(global: &GlobalArgs, args: AmountArgs) -> Result<()> {
    check_amount(&args.amount)?;
    let bridge = bridge(global).await?;
    let report = bridge.withdraw(&args.amount).await?;
    print_report(&report);
    Ok(())
}

pub async fn transfer(global: &GlobalArgs, args: TransferArgs) -> Result<()> {
    parse_address(&args.to)?;
    check_amount(&args.amount)?;
    let bridge = bridge(global).await?;
    let report = bridge.transfer(&args.to, &args.amount).await?;
    print_report(&report);
    Ok(())
}
