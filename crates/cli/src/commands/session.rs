use anyhow::{Context, Result};
use clap::Args;
use pusdc_sdk::{
    parse_tx_no,
    session::{self, unix_now},
    validate_email, validate_otp, BackendApi, TokenStore, TotpEnrollment,
};

use super::common::{backend, connect, load_config, token_store, GlobalArgs};

#[derive(Clone, Debug, Args)]
pub struct EmailLinkArgs {
    /// Address to send the login link to.
    pub email: String,
}

#[derive(Clone, Debug, Args)]
pub struct EmailVerifyArgs {
    /// Token from the emailed login link.
    #[arg(long)]
    pub token: String,
    /// Authenticator code; without it the enrolment secret is printed.
    #[arg(long)]
    pub otp: Option<String>,
}

#[derive(Clone, Debug, Args)]
pub struct BindAuthenticatorArgs {
    #[arg(long)]
    pub tx_no: String,
    /// Claim credential from the email link.
    #[arg(long)]
    pub credential: String,
    /// Authenticator code; without it the enrolment secret is printed.
    #[arg(long)]
    pub otp: Option<String>,
}

fn print_enrollment(enrollment: &TotpEnrollment) {
    println!("email:  {}", enrollment.email);
    match (&enrollment.secret, enrollment.otpauth_uri()) {
        (Some(secret), Some(uri)) => {
            println!("secret: {secret}");
            println!("uri:    {uri}");
            println!("add it to an authenticator app, then rerun with --otp");
        }
        _ => println!("authenticator already bound; rerun with --otp"),
    }
}

/// Signs the gateway login message and stores the returned token.
pub async fn login(global: &GlobalArgs) -> Result<()> {
    let config = load_config(global)?;
    let transport = connect(global, &config).await?;
    let tokens = token_store(global);
    let backend = backend(&config, tokens.clone())?;

    session::login(&transport, &backend, tokens.as_ref(), unix_now())
        .await
        .context("login failed")?;
    println!("logged in; token saved to {}", tokens.path().display());
    Ok(())
}

pub async fn status(global: &GlobalArgs) -> Result<()> {
    let config = load_config(global)?;
    let transport = connect(global, &config).await?;
    let tokens = token_store(global);
    let backend = backend(&config, tokens.clone())?;

    match session::restore(&transport, &backend, tokens.as_ref()).await? {
        Some(session) => {
            println!("logged in as {}", session.address);
            if let Some(other) = session.backend_address {
                println!("backend associates the token with {other}");
            }
        }
        None => println!("not logged in"),
    }
    Ok(())
}

/// Requests an email login link; needs no wallet.
pub async fn email_link(global: &GlobalArgs, args: EmailLinkArgs) -> Result<()> {
    let email = validate_email(&args.email)?;
    let config = load_config(global)?;
    let backend = backend(&config, token_store(global))?;
    backend.send_email_link(email).await?;
    println!("login link sent to {email}");
    Ok(())
}

/// Opens an email login link, or completes it when `--otp` is given.
pub async fn email_verify(global: &GlobalArgs, args: EmailVerifyArgs) -> Result<()> {
    if let Some(otp) = &args.otp {
        validate_otp(otp)?;
    }
    let config = load_config(global)?;
    let tokens = token_store(global);
    let backend = backend(&config, tokens.clone())?;

    match &args.otp {
        Some(otp) => {
            let email = session::complete_email_login(&backend, tokens.as_ref(), &args.token, otp)
                .await
                .context("email login failed")?;
            println!("logged in as {email}; token saved to {}", tokens.path().display());
        }
        None => print_enrollment(&backend.verify_email_link(&args.token).await?),
    }
    Ok(())
}

/// Enrols an authenticator through a claim link, or binds it when `--otp` is given.
pub async fn bind_authenticator(global: &GlobalArgs, args: BindAuthenticatorArgs) -> Result<()> {
    let tx_no = parse_tx_no(&args.tx_no)?;
    if let Some(otp) = &args.otp {
        validate_otp(otp)?;
    }
    let config = load_config(global)?;
    let tokens = token_store(global);
    let backend = backend(&config, tokens.clone())?;

    match &args.otp {
        Some(otp) => {
            session::bind_authenticator(&backend, tokens.as_ref(), tx_no, &args.credential, otp)
                .await
                .context("binding the authenticator failed")?;
            println!("authenticator bound; token saved to {}", tokens.path().display());
        }
        None => print_enrollment(&backend.email_authenticator(tx_no, &args.credential).await?),
    }
    Ok(())
}

pub fn logout(global: &GlobalArgs) -> Result<()> {
    token_store(global).clear()?;
    println!("session cleared");
    Ok(())
}
