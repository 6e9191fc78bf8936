//! Signature-based login and bearer-token persistence.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use alloy_primitives::Address;
use log::{info, warn};

use crate::{
    backend::{BackendApi, LoginRequest},
    bridge::validate_otp,
    error::{Error, ErrorCode, Result},
    transport::EvmMessageSigner,
};

/// Key under which the bearer token is stored.
pub const TOKEN_KEY: &str = "pusdc_auth_token";

/// Where the bearer token lives between runs.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Option<String>;
    fn store(&self, token: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Option<String> {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn store(&self, token: &str) -> Result<()> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// JSON key/value file holding the token under [`TOKEN_KEY`].
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> BTreeMap<String, String> {
        let Ok(raw) = fs::read_to_string(&self.path) else {
            return BTreeMap::new();
        };
        serde_json::from_str(&raw).unwrap_or_else(|err| {
            warn!("session: ignoring unreadable {}: {err}", self.path.display());
            BTreeMap::new()
        })
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|err| self.io_error(err))?;
        }
        let raw = serde_json::to_string_pretty(entries)
            .map_err(|err| Error::new(ErrorCode::Config, err.to_string()))?;
        fs::write(&self.path, raw).map_err(|err| self.io_error(err))
    }

    fn io_error(&self, err: std::io::Error) -> Error {
        Error::new(
            ErrorCode::Config,
            format!("session file {}: {err}", self.path.display()),
        )
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Option<String> {
        self.read_entries().remove(TOKEN_KEY)
    }

    fn store(&self, token: &str) -> Result<()> {
        let mut entries = self.read_entries();
        entries.insert(TOKEN_KEY.to_string(), token.to_string());
        self.write_entries(&entries)
    }

    fn clear(&self) -> Result<()> {
        let mut entries = self.read_entries();
        if entries.remove(TOKEN_KEY).is_some() {
            self.write_entries(&entries)?;
        }
        Ok(())
    }
}

pub fn login_message(timestamp: u64) -> String {
    format!("Login to PUSDC Gateway at {timestamp}")
}

pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}

/// Signs the login message, exchanges it for a token, and stores the token.
pub async fn login<S, B>(
    signer: &S,
    backend: &B,
    tokens: &dyn TokenStore,
    timestamp: u64,
) -> Result<String>
where
    S: EvmMessageSigner + ?Sized,
    B: BackendApi + ?Sized,
{
    let message = login_message(timestamp);
    let signature = signer.sign_message(message.as_bytes()).await?;
    let request = LoginRequest {
        address: signer.signer_address().to_string(),
        signature: signature.to_string(),
        timestamp: timestamp.to_string(),
    };
    let token = backend.login(&request).await?;
    tokens.store(&token)?;
    info!("session: logged in as {}", request.address);
    Ok(token)
}

/// Finishes an emailed login link with the authenticator code and stores the token.
///
/// Returns the account email.
pub async fn complete_email_login<B>(
    backend: &B,
    tokens: &dyn TokenStore,
    link_token: &str,
    otp: &str,
) -> Result<String>
where
    B: BackendApi + ?Sized,
{
    validate_otp(otp)?;
    let enrollment = backend.verify_email_link(link_token).await?;
    let token = backend
        .verify_email_otp(&enrollment.email, link_token, otp)
        .await?;
    tokens.store(&token)?;
    info!("session: logged in as {}", enrollment.email);
    Ok(enrollment.email)
}

/// Binds an authenticator through a claim link and stores the returned token.
pub async fn bind_authenticator<B>(
    backend: &B,
    tokens: &dyn TokenStore,
    tx_no: u64,
    credential: &str,
    otp: &str,
) -> Result<String>
where
    B: BackendApi + ?Sized,
{
    validate_otp(otp)?;
    let token = backend.bind_authenticator(tx_no, credential, otp).await?;
    tokens.store(&token)?;
    info!("session: authenticator bound for fund #{tx_no}");
    Ok(token)
}

/// A restored session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Always the local signer.
    pub address: Address,
    /// Address the backend associates with the token, when it differs.
    pub backend_address: Option<String>,
}

/// Validates a stored token with the backend.
///
/// Returns `None` when there is no usable token; a failed check clears it.
pub async fn restore<S, B>(
    signer: &S,
    backend: &B,
    tokens: &dyn TokenStore,
) -> Result<Option<Session>>
where
    S: EvmMessageSigner + ?Sized,
    B: BackendApi + ?Sized,
{
    if tokens.load().is_none() {
        return Ok(None);
    }

    let status = match backend.auth_status().await {
        Ok(status) if status.is_logged_in => status,
        Ok(_) => {
            tokens.clear()?;
            return Ok(None);
        }
        Err(err) => {
            warn!("session: status check failed, clearing token: {err}");
            tokens.clear()?;
            return Ok(None);
        }
    };

    let address = signer.signer_address();
    let backend_address = status.address.filter(|reported| {
        let same = reported
            .parse::<Address>()
            .map(|parsed| parsed == address)
            .unwrap_or(false);
        if !same {
            warn!("session: backend reports {reported}, using local signer {address}");
        }
        !same
    });

    Ok(Some(Session {
        address,
        backend_address,
    }))
}
