use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{sol, SolCall};

use crate::{
    contracts::{common::decode_error, TxHash},
    error::Result,
    transport::{EvmCall, EvmTransport, EvmViewTransport},
};

sol! {
    #[allow(non_camel_case_types)]
    contract PrivacyPool {
        event PrivacyDeposit(address indexed addr, uint256 amount);
        event PrivacyWithdraw(address indexed addr, uint256 amount);
        event PrivacyTransfer(address indexed fromAddr, address indexed toAddr, bytes amountCipher);

        function privacyDeposit(uint256 amount, bytes amountCipher, bytes currentBalanceCipher, bytes updatedBalanceCipher, bytes signature);
        function privacyWithdraw(uint256 amount, bytes amountCipher, bytes currentBalanceCipher, bytes updatedBalanceCipher, bytes signature);
        function privacyTransfer(address toAddr, bytes amountCipher, bytes currentSenderBalanceCipher, bytes updatedSenderBalanceCipher, bytes currentReceiverBalanceCipher, bytes updatedReceiverBalanceCipher, bytes signature);
        function privacyBalances(address owner) view returns (bytes cipher);
        function privacyNonces(address owner) view returns (uint256 nonce);
        function chain_identifier() view returns (string);
        function tick() view returns (string);
        function erc20() view returns (address);
        function witness() view returns (address);
        function live() view returns (bool);
        function total() view returns (uint256);
    }
}

/// Witness-authorized deposit or withdrawal of a single account balance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BalanceUpdateArgs {
    pub amount: U256,
    pub amount_cipher: Bytes,
    pub current_balance: Bytes,
    pub updated_balance: Bytes,
    pub signature: Bytes,
    pub gas_limit: Option<u64>,
}

/// Witness-authorized transfer between two shielded balances.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrivacyTransferArgs {
    pub to: Address,
    pub amount_cipher: Bytes,
    pub current_sender_balance: Bytes,
    pub updated_sender_balance: Bytes,
    pub current_receiver_balance: Bytes,
    pub updated_receiver_balance: Bytes,
    pub signature: Bytes,
    pub gas_limit: Option<u64>,
}

/// Static metadata exposed by the pool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolInfo {
    pub chain_identifier: String,
    pub tick: String,
    pub erc20: Address,
    pub witness: Address,
    pub live: bool,
    pub total: U256,
}

#[derive(Clone)]
pub struct PrivacyPoolClient<T> {
    pool: Address,
    transport: T,
}

impl<T> PrivacyPoolClient<T> {
    pub fn new(pool: Address, transport: T) -> Self {
        Self { pool, transport }
    }

    pub fn address(&self) -> Address {
        self.pool
    }
}

impl<T: EvmTransport> PrivacyPoolClient<T> {
    pub async fn deposit(&self, args: BalanceUpdateArgs) -> Result<TxHash> {
        let calldata = PrivacyPool::privacyDepositCall {
            amount: args.amount,
            amountCipher: args.amount_cipher,
            currentBalanceCipher: args.current_balance,
            updatedBalanceCipher: args.updated_balance,
            signature: args.signature,
        }
        .abi_encode();
        self.submit(calldata, args.gas_limit).await
    }

    pub async fn withdraw(&self, args: BalanceUpdateArgs) -> Result<TxHash> {
        let calldata = PrivacyPool::privacyWithdrawCall {
            amount: args.amount,
            amountCipher: args.amount_cipher,
            currentBalanceCipher: args.current_balance,
            updatedBalanceCipher: args.updated_balance,
            signature: args.signature,
        }
        .abi_encode();
        self.submit(calldata, args.gas_limit).await
    }

    pub async fn transfer(&self, args: PrivacyTransferArgs) -> Result<TxHash> {
        let calldata = PrivacyPool::privacyTransferCall {
            toAddr: args.to,
            amountCipher: args.amount_cipher,
            currentSenderBalanceCipher: args.current_sender_balance,
            updatedSenderBalanceCipher: args.updated_sender_balance,
            currentReceiverBalanceCipher: args.current_receiver_balance,
            updatedReceiverBalanceCipher: args.updated_receiver_balance,
            signature: args.signature,
        }
        .abi_encode();
        self.submit(calldata, args.gas_limit).await
    }

    async fn submit(&self, calldata: Vec<u8>, gas_limit: Option<u64>) -> Result<TxHash> {
        let mut call = EvmCall::new(self.pool, Bytes::from(calldata), U256::ZERO);
        call.gas_limit = gas_limit;
        self.transport.send(call).await.map(Into::into)
    }
}

impl<T: EvmViewTransport> PrivacyPoolClient<T> {
    /// Encrypted balance of `owner`; empty when the account never deposited.
    pub async fn privacy_balance(&self, owner: Address) -> Result<Bytes> {
        let raw = self
            .view(PrivacyPool::privacyBalancesCall { owner }.abi_encode())
            .await?;
        let decoded = PrivacyPool::privacyBalancesCall::abi_decode_returns(&raw, true)
            .map_err(|err| decode_error("privacyBalances", err))?;
        Ok(decoded.cipher)
    }

    /// Last nonce consumed by `owner`; the witness expects the next one.
    pub async fn privacy_nonce(&self, owner: Address) -> Result<U256> {
        let raw = self
            .view(PrivacyPool::privacyNoncesCall { owner }.abi_encode())
            .await?;
        let decoded = PrivacyPool::privacyNoncesCall::abi_decode_returns(&raw, true)
            .map_err(|err| decode_error("privacyNonces", err))?;
        Ok(decoded.nonce)
    }

    pub async fn info(&self) -> Result<PoolInfo> {
        let raw = self
            .view(PrivacyPool::chain_identifierCall {}.abi_encode())
            .await?;
        let chain_identifier = PrivacyPool::chain_identifierCall::abi_decode_returns(&raw, true)
            .map_err(|err| decode_error("chain_identifier", err))?
            ._0;
        let raw = self.view(PrivacyPool::tickCall {}.abi_encode()).await?;
        let tick = PrivacyPool::tickCall::abi_decode_returns(&raw, true)
            .map_err(|err| decode_error("tick", err))?
            ._0;
        let raw = self.view(PrivacyPool::erc20Call {}.abi_encode()).await?;
        let erc20 = PrivacyPool::erc20Call::abi_decode_returns(&raw, true)
            .map_err(|err| decode_error("erc20", err))?
            ._0;
        let raw = self.view(PrivacyPool::witnessCall {}.abi_encode()).await?;
        let witness = PrivacyPool::witnessCall::abi_decode_returns(&raw, true)
            .map_err(|err| decode_error("witness", err))?
            ._0;
        let raw = self.view(PrivacyPool::liveCall {}.abi_encode()).await?;
        let live = PrivacyPool::liveCall::abi_decode_returns(&raw, true)
            .map_err(|err| decode_error("live", err))?
            ._0;
        let raw = self.view(PrivacyPool::totalCall {}.abi_encode()).await?;
        let total = PrivacyPool::totalCall::abi_decode_returns(&raw, true)
            .map_err(|err| decode_error("total", err))?
            ._0;
        Ok(PoolInfo {
            chain_identifier,
            tick,
            erc20,
            witness,
            live,
            total,
        })
    }

    async fn view(&self, calldata: Vec<u8>) -> Result<Bytes> {
        let call = EvmCall::new(self.pool, Bytes::from(calldata), U256::ZERO);
        self.transport.call_view(call).await
    }
}
