use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{sol, SolCall};

use crate::{
    contracts::{common::decode_error, TxHash},
    error::Result,
    transport::{EvmCall, EvmTransport, EvmViewTransport},
};

sol! {
    #[allow(non_camel_case_types)]
    contract Erc20 {
        function approve(address spender, uint256 amount) returns (bool);
        function allowance(address owner, address spender) view returns (uint256);
        function balanceOf(address account) view returns (uint256);
        function decimals() view returns (uint8);
    }
}

/// Client for the bridged stablecoin (USDC on Base).
#[derive(Clone)]
pub struct Erc20Client<T> {
    token: Address,
    transport: T,
}

impl<T> Erc20Client<T> {
    pub fn new(token: Address, transport: T) -> Self {
        Self { token, transport }
    }

    pub fn address(&self) -> Address {
        self.token
    }
}

impl<T: EvmTransport> Erc20Client<T> {
    pub async fn approve(
        &self,
        spender: Address,
        amount: U256,
        gas_limit: Option<u64>,
    ) -> Result<TxHash> {
        let calldata = Erc20::approveCall { spender, amount }.abi_encode();
        let mut call = EvmCall::new(self.token, Bytes::from(calldata), U256::ZERO);
        call.gas_limit = gas_limit;
        self.transport.send(call).await.map(Into::into)
    }
}

impl<T: EvmViewTransport> Erc20Client<T> {
    pub async fn allowance(&self, owner: Address, spender: Address) -> Result<U256> {
        let calldata = Erc20::allowanceCall { owner, spender }.abi_encode();
        let raw = self.view(calldata).await?;
        let decoded = Erc20::allowanceCall::abi_decode_returns(&raw, true)
            .map_err(|err| decode_error("allowance", err))?;
        Ok(decoded._0)
    }

    pub async fn balance_of(&self, account: Address) -> Result<U256> {
        let calldata = Erc20::balanceOfCall { account }.abi_encode();
        let raw = self.view(calldata).await?;
        let decoded = Erc20::balanceOfCall::abi_decode_returns(&raw, true)
            .map_err(|err| decode_error("balanceOf", err))?;
        Ok(decoded._0)
    }

    pub async fn decimals(&self) -> Result<u8> {
        let calldata = Erc20::decimalsCall {}.abi_encode();
        let raw = self.view(calldata).await?;
        let decoded = Erc20::decimalsCall::abi_decode_returns(&raw, true)
            .map_err(|err| decode_error("decimals", err))?;
        Ok(decoded._0)
    }

    async fn view(&self, calldata: Vec<u8>) -> Result<Bytes> {
        let call = EvmCall::new(self.token, Bytes::from(calldata), U256::ZERO);
        self.transport.call_view(call).await
    }
}
