use alloy_primitives::B256;

use crate::error::{Error, ErrorCode};

/// Hash returned by the transport after executing an EVM transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TxHash(pub B256);

impl From<B256> for TxHash {
    fn from(value: B256) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for TxHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub(crate) fn decode_error(call: &str, err: alloy_sol_types::Error) -> Error {
    Error::new(ErrorCode::DecodeFailed, format!("decode {call}: {err}"))
}
