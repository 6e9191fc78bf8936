use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{sol, SolCall};

use crate::{
    contracts::{common::decode_error, TxHash},
    error::Result,
    transport::{EvmCall, EvmTransport, EvmViewTransport},
};

sol! {
    #[allow(non_camel_case_types)]
    contract Inbox {
        function chain_identifier() view returns (string);
        function erc20() view returns (address);
        function witness() view returns (address);
        function total() view returns (uint256);
        function withdraw(uint256 amount);
        function sendFund(uint256 amount);
        function acceptFund(uint256 txNo, address toAddr, uint256 convertAmount, bytes signature);
        function revokeFund(uint256 txNo);
        function inboxTransfers(uint256 txNo) view returns (address fromAddr, address toAddr, uint256 amount, bool finished);
        function inboxBalances(address owner) view returns (uint256 balance);
    }
}

/// Escrowed fund waiting to be collected by an email recipient.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboxTransfer {
    pub from: Address,
    pub to: Address,
    pub amount: U256,
    pub finished: bool,
}

#[derive(Clone)]
pub struct InboxClient<T> {
    inbox: Address,
    transport: T,
}

impl<T> InboxClient<T> {
    pub fn new(inbox: Address, transport: T) -> Self {
        Self { inbox, transport }
    }

    pub fn address(&self) -> Address {
        self.inbox
    }
}

impl<T: EvmTransport> InboxClient<T> {
    /// Escrows `amount` of the token for a later email claim.
    pub async fn send_fund(&self, amount: U256) -> Result<TxHash> {
        self.submit(Inbox::sendFundCall { amount }.abi_encode()).await
    }

    pub async fn withdraw(&self, amount: U256) -> Result<TxHash> {
        self.submit(Inbox::withdrawCall { amount }.abi_encode()).await
    }

    /// Claims escrowed fund `tx_no` with the witness signature from `collect_fund`.
    pub async fn accept_fund(
        &self,
        tx_no: U256,
        to: Address,
        convert_amount: U256,
        signature: Bytes,
    ) -> Result<TxHash> {
        let calldata = Inbox::acceptFundCall {
            txNo: tx_no,
            toAddr: to,
            convertAmount: convert_amount,
            signature,
        }
        .abi_encode();
        self.submit(calldata).await
    }

    pub async fn revoke_fund(&self, tx_no: U256) -> Result<TxHash> {
        self.submit(Inbox::revokeFundCall { txNo: tx_no }.abi_encode())
            .await
    }

    async fn submit(&self, calldata: Vec<u8>) -> Result<TxHash> {
        let call = EvmCall::new(self.inbox, Bytes::from(calldata), U256::ZERO);
        self.transport.send(call).await.map(Into::into)
    }
}

impl<T: EvmViewTransport> InboxClient<T> {
    pub async fn inbox_balance(&self, owner: Address) -> Result<U256> {
        let calldata = Inbox::inboxBalancesCall { owner }.abi_encode();
        let call = EvmCall::new(self.inbox, Bytes::from(calldata), U256::ZERO);
        let raw = self.transport.call_view(call).await?;
        let decoded = Inbox::inboxBalancesCall::abi_decode_returns(&raw, true)
            .map_err(|err| decode_error("inboxBalances", err))?;
        Ok(decoded.balance)
    }

    pub async fn transfer(&self, tx_no: U256) -> Result<InboxTransfer> {
        let calldata = Inbox::inboxTransfersCall { txNo: tx_no }.abi_encode();
        let call = EvmCall::new(self.inbox, Bytes::from(calldata), U256::ZERO);
        let raw = self.transport.call_view(call).await?;
        let decoded = Inbox::inboxTransfersCall::abi_decode_returns(&raw, true)
            .map_err(|err| decode_error("inboxTransfers", err))?;
        Ok(InboxTransfer {
            from: decoded.fromAddr,
            to: decoded.toAddr,
            amount: decoded.amount,
            finished: decoded.finished,
        })
    }
}
