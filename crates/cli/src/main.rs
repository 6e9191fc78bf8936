mod commands;

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::common::GlobalArgs;
use env_logger::Env;
use pusdc_sdk::PollScope;

#[derive(Parser)]
#[command(name = "pusdc-cli", about = "PUSDC privacy bridge CLI")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in to the witness backend with the wallet key.
    Login,
    /// Show whether the stored session is still valid.
    Status,
    /// Forget the stored session token.
    Logout,
    /// Wallet, privacy and inbox balances.
    Balance,
    /// Move USDC from the wallet into the privacy pool.
    Deposit(commands::pool::AmountArgs),
    /// Move USDC from the privacy pool back to the wallet.
    Withdraw(commands::pool::AmountArgs),
    /// Private transfer to another pool account.
    Transfer(commands::pool::TransferArgs),
    /// Escrow USDC in the inbox for an email payment.
    Pay(commands::pool::AmountArgs),
    /// Withdraw unclaimed USDC from the inbox.
    InboxWithdraw(commands::pool::AmountArgs),
    /// Claim an emailed fund with its credential and OTP.
    Accept(commands::inbox::AcceptArgs),
    /// Email the claim link for an outgoing fund.
    SendEmail(commands::inbox::SendEmailArgs),
    /// List outgoing inbox funds.
    Outgoing(commands::inbox::OutgoingArgs),
    /// Reclaim an outgoing fund that was never collected.
    Revoke(commands::inbox::RevokeArgs),
    /// Show privacy pool metadata.
    PoolInfo,
    /// Request an email login link.
    EmailLink(commands::session::EmailLinkArgs),
    /// Open an email login link; with --otp, finish the login.
    EmailVerify(commands::session::EmailVerifyArgs),
    /// Enrol an authenticator from a claim link; with --otp, bind it.
    BindAuthenticator(commands::session::BindAuthenticatorArgs),
    /// Print the effective configuration.
    Config,
}

async fn run(cli: Cli) -> Result<()> {
    let global = &cli.global;
    match cli.command {
        Commands::Login => commands::session::login(global).await,
        Commands::Status => commands::session::status(global).await,
        Commands::Logout => commands::session::logout(global),
        Commands::Balance => commands::pool::balance(global).await,
        Commands::Deposit(args) => commands::pool::deposit(global, args).await,
        Commands::Withdraw(args) => commands::pool::withdraw(global, args).await,
        Commands::Transfer(args) => commands::pool::transfer(global, args).await,
        Commands::Pay(args) => commands::inbox::pay(global, args).await,
        Commands::InboxWithdraw(args) => commands::inbox::inbox_withdraw(global, args).await,
        Commands::Accept(args) => commands::inbox::accept(global, args).await,
        Commands::SendEmail(args) => commands::inbox::send_email(global, args).await,
        Commands::Outgoing(args) => commands::inbox::outgoing(global, args).await,
        Commands::Revoke(args) => commands::inbox::revoke(global, args).await,
        Commands::PoolInfo => commands::pool::info(global).await,
        Commands::EmailLink(args) => commands::session::email_link(global, args).await,
        Commands::EmailVerify(args) => commands::session::email_verify(global, args).await,
        Commands::BindAuthenticator(args) => {
            commands::session::bind_authenticator(global, args).await
        }
        Commands::Config => commands::config::show(global),
    }
}

/// First Ctrl-C stops pending confirmation polls; a second one exits.
fn install_interrupt_handler() {
    static INTERRUPTED: AtomicBool = AtomicBool::new(false);
    tokio::spawn(async {
        while tokio::signal::ctrl_c().await.is_ok() {
            if INTERRUPTED.swap(true, Ordering::SeqCst) {
                std::process::exit(130);
            }
            log::warn!("interrupted; cancelling confirmation polls");
            PollScope::global().cancel_all();
        }
    });
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    install_interrupt_handler();

    if let Err(err) = run(cli).await {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}
