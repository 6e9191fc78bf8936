//! Typed balance snapshots and the board that keeps them current.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{PoisonError, RwLock};

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use log::{debug, warn};
use tokio::sync::OnceCell;

use crate::{
    backend::BackendApi,
    contracts::{Erc20Client, InboxClient, PrivacyPoolClient},
    error::{Error, ErrorCode, Result},
    transport::EvmViewTransport,
    units::{format_amount, DEFAULT_DECIMALS},
};

/// Which displayed balance a poll compares.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BalanceKey {
    /// Public USDC held by the wallet.
    Wallet,
    /// Decrypted shielded balance in the privacy pool.
    #[default]
    Privacy,
    /// Unclaimed balance held by the inbox contract.
    Inbox,
}

impl BalanceKey {
    pub fn symbol(self) -> &'static str {
        match self {
            BalanceKey::Wallet | BalanceKey::Inbox => "USDC",
            BalanceKey::Privacy => "PUSDC",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BalanceKey::Wallet => "wallet",
            BalanceKey::Privacy => "privacy",
            BalanceKey::Inbox => "inbox",
        }
    }
}

/// A balance in base units. Compared by value, rendered only for display.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BalanceSnapshot {
    raw: U256,
    decimals: u8,
    symbol: String,
}

impl BalanceSnapshot {
    pub fn new(raw: U256, decimals: u8, symbol: impl Into<String>) -> Self {
        Self {
            raw,
            decimals,
            symbol: symbol.into(),
        }
    }

    pub fn zero(decimals: u8, symbol: impl Into<String>) -> Self {
        Self::new(U256::ZERO, decimals, symbol)
    }

    pub fn raw(&self) -> U256 {
        self.raw
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Change detection: base units only, display metadata is ignored.
    pub fn same_balance(&self, other: &BalanceSnapshot) -> bool {
        self.raw == other.raw
    }
}

impl fmt::Display for BalanceSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", format_amount(self.raw, self.decimals), self.symbol)
    }
}

/// Latest snapshot per [`BalanceKey`].
#[derive(Debug, Default)]
pub struct BalanceBoard {
    values: RwLock<BTreeMap<BalanceKey, BalanceSnapshot>>,
}

impl BalanceBoard {
    pub fn get(&self, key: BalanceKey) -> Option<BalanceSnapshot> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned()
    }

    pub fn set(&self, key: BalanceKey, snapshot: BalanceSnapshot) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, snapshot);
    }

    pub fn all(&self) -> Vec<(BalanceKey, BalanceSnapshot)> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(key, snapshot)| (*key, snapshot.clone()))
            .collect()
    }
}

/// Source of the balances the poller compares.
#[async_trait]
pub trait BalanceRefresh: Send + Sync {
    /// Re-reads balances. Failures are tolerated by callers.
    async fn refresh(&self) -> Result<()>;

    fn snapshot(&self, key: BalanceKey) -> Option<BalanceSnapshot>;
}

/// Balances read from the chain, with the privacy balance decrypted by the backend.
pub struct ChainBalances<T, B> {
    owner: Address,
    token: Erc20Client<T>,
    pool: PrivacyPoolClient<T>,
    inbox: Option<InboxClient<T>>,
    backend: B,
    decimals: OnceCell<u8>,
    board: BalanceBoard,
}

impl<T, B> ChainBalances<T, B>
where
    T: EvmViewTransport,
    B: BackendApi,
{
    pub fn new(
        owner: Address,
        token: Erc20Client<T>,
        pool: PrivacyPoolClient<T>,
        backend: B,
    ) -> Self {
        Self {
            owner,
            token,
            pool,
            inbox: None,
            backend,
            decimals: OnceCell::new(),
            board: BalanceBoard::default(),
        }
    }

    pub fn with_inbox(mut self, inbox: InboxClient<T>) -> Self {
        self.inbox = Some(inbox);
        self
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn board(&self) -> &BalanceBoard {
        &self.board
    }

    /// Token decimals; falls back to USDC's 6 without caching the fallback.
    pub async fn decimals(&self) -> u8 {
        match self
            .decimals
            .get_or_try_init(|| self.token.decimals())
            .await
        {
            Ok(decimals) => *decimals,
            Err(err) => {
                warn!("balance: decimals() failed, using {DEFAULT_DECIMALS}: {err}");
                DEFAULT_DECIMALS
            }
        }
    }

    async fn read_wallet(&self, decimals: u8) -> Result<BalanceSnapshot> {
        let raw = self.token.balance_of(self.owner).await?;
        Ok(BalanceSnapshot::new(
            raw,
            decimals,
            BalanceKey::Wallet.symbol(),
        ))
    }

    async fn read_privacy(&self, decimals: u8) -> Result<BalanceSnapshot> {
        let cipher = self.pool.privacy_balance(self.owner).await?;
        if cipher.is_empty() {
            return Ok(BalanceSnapshot::zero(decimals, BalanceKey::Privacy.symbol()));
        }
        let raw = self.backend.decrypt_balance(&cipher).await?;
        Ok(BalanceSnapshot::new(
            raw,
            decimals,
            BalanceKey::Privacy.symbol(),
        ))
    }

    async fn read_inbox(&self, inbox: &InboxClient<T>, decimals: u8) -> Result<BalanceSnapshot> {
        let raw = inbox.inbox_balance(self.owner).await?;
        Ok(BalanceSnapshot::new(raw, decimals, BalanceKey::Inbox.symbol()))
    }

    fn store(&self, key: BalanceKey, read: Result<BalanceSnapshot>, failures: &mut Vec<String>) {
        match read {
            Ok(snapshot) => {
                debug!("balance: {} = {snapshot}", key.as_str());
                self.board.set(key, snapshot);
            }
            Err(err) => {
                warn!("balance: {} refresh failed: {err}", key.as_str());
                failures.push(format!("{}: {err}", key.as_str()));
            }
        }
    }
}

#[async_trait]
impl<T, B> BalanceRefresh for ChainBalances<T, B>
where
    T: EvmViewTransport,
    B: BackendApi,
{
    async fn refresh(&self) -> Result<()> {
        let decimals = self.decimals().await;
        let mut failures = Vec::new();
        let mut attempted = 2;

        self.store(
            BalanceKey::Wallet,
            self.read_wallet(decimals).await,
            &mut failures,
        );
        self.store(
            BalanceKey::Privacy,
            self.read_privacy(decimals).await,
            &mut failures,
        );
        if let Some(inbox) = &self.inbox {
            attempted += 1;
            self.store(
                BalanceKey::Inbox,
                self.read_inbox(inbox, decimals).await,
                &mut failures,
            );
        }

        if failures.len() == attempted {
            return Err(Error::new(ErrorCode::RefreshFailed, failures.join("; ")));
        }
        Ok(())
    }

    fn snapshot(&self, key: BalanceKey) -> Option<BalanceSnapshot> {
        self.board.get(key)
    }
}
