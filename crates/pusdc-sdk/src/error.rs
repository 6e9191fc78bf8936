//! Error codes shared across the PUSDC SDK.

use core::fmt;

use thiserror::Error as ThisError;

/// Result type alias that carries [`Error`] failures.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error taxonomy for the SDK.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    /// Amount is malformed, zero, or negative.
    InvalidAmount = 1001,
    /// Address string could not be parsed.
    InvalidAddress = 1002,
    /// Email, OTP, or fund number failed validation.
    InvalidInput = 1003,
    /// Connected node reports a different chain than configured.
    NetworkMismatch = 2001,
    /// EVM transport or signing failure.
    TransportEvm = 2002,
    /// Contract return data could not be decoded.
    DecodeFailed = 2003,
    /// Wallet rejected the submission (user denial, revert on estimate, ...).
    SubmissionRejected = 2101,
    /// Witness backend HTTP failure.
    TransportBackend = 3001,
    /// Witness backend answered with a non-ok status.
    WitnessRejected = 3002,
    /// Login or session validation failed.
    AuthFailed = 3101,
    /// An authenticated endpoint was called without a stored token.
    AuthMissing = 3102,
    /// Every balance source failed during a refresh.
    RefreshFailed = 4001,
    /// Configuration file or override is invalid.
    Config = 5001,
}

impl ErrorCode {
    /// Numeric representation associated with the error.
    pub fn code(self) -> u16 {
        self as u16
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?} ({})", self.code())
    }
}

/// Provider-level classification of a failed submission.
///
/// `Nonce` and `BadData` are parse artifacts of the wallet/provider layer:
/// the transaction may already be on-chain even though the call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxErrorKind {
    Nonce,
    BadData,
    Rejected,
    Rpc,
}

impl TxErrorKind {
    /// Classifies an opaque provider message.
    pub fn classify(message: &str) -> Self {
        if message.contains("BAD_DATA") {
            TxErrorKind::BadData
        } else if message.contains("nonce") {
            TxErrorKind::Nonce
        } else {
            TxErrorKind::Rpc
        }
    }

    pub fn is_benign(self) -> bool {
        matches!(self, TxErrorKind::Nonce | TxErrorKind::BadData)
    }
}

/// Error value carried through every SDK call.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
#[error("{code}: {detail}")]
pub struct Error {
    code: ErrorCode,
    kind: Option<TxErrorKind>,
    detail: String,
}

impl Error {
    pub fn new(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self {
            code,
            kind: None,
            detail: detail.into(),
        }
    }

    /// EVM transport failure with a provider classification attached.
    pub fn transport(kind: TxErrorKind, detail: impl Into<String>) -> Self {
        let code = match kind {
            TxErrorKind::Rejected => ErrorCode::SubmissionRejected,
            _ => ErrorCode::TransportEvm,
        };
        Self {
            code,
            kind: Some(kind),
            detail: detail.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn kind(&self) -> Option<TxErrorKind> {
        self.kind
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }

    /// Whether a submission failure should degrade to backend-only confirmation.
    ///
    /// A typed provider kind wins; untyped errors fall back to inspecting the
    /// message for the `nonce` / `BAD_DATA` markers.
    pub fn is_benign_submission(&self) -> bool {
        match self.kind {
            Some(kind) => kind.is_benign(),
            None => TxErrorKind::classify(&self.detail).is_benign(),
        }
    }
}

impl From<ErrorCode> for Error {
    fn from(code: ErrorCode) -> Self {
        Self::new(code, "")
    }
}
