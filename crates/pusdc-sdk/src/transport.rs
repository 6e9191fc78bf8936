//! Transport abstractions for EVM RPC interactions.

use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;

#[cfg(not(target_arch = "wasm32"))]
use alloy_network::{EthereumWallet, ReceiptResponse};
#[cfg(not(target_arch = "wasm32"))]
use alloy_provider::{Provider, ProviderBuilder};
#[cfg(not(target_arch = "wasm32"))]
use alloy_rpc_types::eth::transaction::{TransactionInput, TransactionRequest};
#[cfg(not(target_arch = "wasm32"))]
use alloy_signer::Signer;
#[cfg(not(target_arch = "wasm32"))]
use alloy_signer_local::PrivateKeySigner;
#[cfg(not(target_arch = "wasm32"))]
use alloy_transport::{RpcError, TransportError};
#[cfg(not(target_arch = "wasm32"))]
use log::{debug, warn};
#[cfg(not(target_arch = "wasm32"))]
use std::time::Duration;

#[cfg(not(target_arch = "wasm32"))]
use crate::error::{Error, ErrorCode, TxErrorKind};
use crate::error::Result;

/// Encoded EVM call that can be dispatched via a transport.
#[derive(Clone, Debug)]
pub struct EvmCall {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
    pub gas_limit: Option<u64>,
}

impl EvmCall {
    pub fn new(to: Address, data: impl Into<Bytes>, value: U256) -> Self {
        Self {
            to,
            data: data.into(),
            value,
            gas_limit: None,
        }
    }
}

/// Result of waiting for a transaction to be included.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReceiptStatus {
    pub block_number: Option<u64>,
    /// `false` when the transaction was mined but reverted.
    pub success: bool,
}

/// Abstraction over sending signed EVM transactions and awaiting inclusion.
#[async_trait]
pub trait EvmTransport: Send + Sync {
    async fn send(&self, call: EvmCall) -> Result<B256>;

    /// Resolves once the transaction is mined. Has no timeout of its own.
    async fn wait_for_receipt(&self, tx_hash: B256) -> Result<ReceiptStatus>;
}

/// Abstraction over read-only `eth_call` style interactions.
#[async_trait]
pub trait EvmViewTransport: Send + Sync {
    async fn call_view(&self, call: EvmCall) -> Result<Bytes>;
}

/// Transports that can also sign login messages (EIP-191).
#[async_trait]
pub trait EvmMessageSigner: Send + Sync {
    async fn sign_message(&self, message: &[u8]) -> Result<Bytes>;
    fn signer_address(&self) -> Address;
}

#[cfg(not(target_arch = "wasm32"))]
/// JSON-RPC transport backed by Alloy's provider stack and a local private key signer.
#[derive(Clone)]
pub struct AlloyHttpTransport {
    rpc_url: reqwest::Url,
    wallet: PrivateKeySigner,
    receipt_poll: Duration,
}

#[cfg(not(target_arch = "wasm32"))]
impl AlloyHttpTransport {
    /// Connects to `rpc_url`, checks the node is on `expected_chain_id`, and
    /// signs with `private_key_hex`.
    pub async fn connect(
        rpc_url: &str,
        private_key_hex: &str,
        expected_chain_id: u64,
    ) -> Result<Self> {
        let url = reqwest::Url::parse(rpc_url)
            .map_err(|err| Error::new(ErrorCode::Config, format!("rpc url {rpc_url}: {err}")))?;

        let provider = ProviderBuilder::new().on_http(url.clone());
        let chain_id = provider
            .get_chain_id()
            .await
            .map_err(|err| map_rpc_error("get_chain_id", err))?;
        if chain_id != expected_chain_id {
            return Err(Error::new(
                ErrorCode::NetworkMismatch,
                format!("node reports chain {chain_id}, expected {expected_chain_id}"),
            ));
        }

        let mut wallet: PrivateKeySigner = private_key_hex
            .trim()
            .parse()
            .map_err(|_| Error::new(ErrorCode::Config, "private key is not valid hex"))?;
        wallet.set_chain_id(Some(chain_id));

        Ok(Self {
            rpc_url: url,
            wallet,
            receipt_poll: Duration::from_secs(2),
        })
    }

    pub fn with_receipt_poll(mut self, interval: Duration) -> Self {
        self.receipt_poll = interval;
        self
    }

    fn build_transaction(&self, call: EvmCall) -> TransactionRequest {
        let mut tx = TransactionRequest::default()
            .from(self.wallet.address())
            .input(TransactionInput::from(call.data))
            .value(call.value);
        if let Some(gas) = call.gas_limit {
            tx = tx.gas_limit(gas);
        }
        tx.to = Some(alloy_primitives::TxKind::Call(call.to));
        tx
    }
}

#[cfg(not(target_arch = "wasm32"))]
#[async_trait]
impl EvmTransport for AlloyHttpTransport {
    async fn send(&self, call: EvmCall) -> Result<B256> {
        let tx = self.build_transaction(call);
        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(EthereumWallet::new(self.wallet.clone()))
            .on_http(self.rpc_url.clone());
        let pending = provider
            .send_transaction(tx)
            .await
            .map_err(|err| map_rpc_error("send_transaction", err))?;
        debug!("transport: submitted {}", pending.tx_hash());
        Ok(*pending.tx_hash())
    }

    async fn wait_for_receipt(&self, tx_hash: B256) -> Result<ReceiptStatus> {
        let provider = ProviderBuilder::new().on_http(self.rpc_url.clone());
        loop {
            let receipt = provider
                .get_transaction_receipt(tx_hash)
                .await
                .map_err(|err| map_rpc_error("get_transaction_receipt", err))?;
            if let Some(receipt) = receipt {
                return Ok(ReceiptStatus {
                    block_number: receipt.block_number(),
                    success: receipt.status(),
                });
            }
            tokio::time::sleep(self.receipt_poll).await;
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
#[async_trait]
impl EvmViewTransport for AlloyHttpTransport {
    async fn call_view(&self, call: EvmCall) -> Result<Bytes> {
        let req = self.build_transaction(call);
        let provider = ProviderBuilder::new().on_http(self.rpc_url.clone());
        provider.call(&req).await.map_err(|err| {
            warn!("provider error (call_view): {err:?}");
            map_rpc_error("eth_call", err)
        })
    }
}

#[cfg(not(target_arch = "wasm32"))]
#[async_trait]
impl EvmMessageSigner for AlloyHttpTransport {
    async fn sign_message(&self, message: &[u8]) -> Result<Bytes> {
        let signature = self
            .wallet
            .sign_message(message)
            .await
            .map_err(|err| Error::transport(TxErrorKind::Rejected, format!("sign_message: {err}")))?;
        Ok(Bytes::from(signature.as_bytes().to_vec()))
    }

    fn signer_address(&self) -> Address {
        self.wallet.address()
    }
}

/// Maps provider failures onto typed kinds.
///
/// Deserialization failures are the provider-side equivalent of a wallet
/// `BAD_DATA` parse artifact; JSON-RPC error payloads are classified by their
/// code (4001 is an explicit user rejection) and message.
#[cfg(not(target_arch = "wasm32"))]
fn map_rpc_error(context: &str, err: TransportError) -> Error {
    let kind = match &err {
        RpcError::DeserError { .. } => TxErrorKind::BadData,
        RpcError::ErrorResp(payload) if payload.code == 4001 => TxErrorKind::Rejected,
        RpcError::ErrorResp(payload) => TxErrorKind::classify(&payload.message),
        other => TxErrorKind::classify(&other.to_string()),
    };
    Error::transport(kind, format!("{context}: {err}"))
}
