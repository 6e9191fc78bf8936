//! Client SDK for the PUSDC privacy bridge on Base.
//!
//! Actions submit pool and inbox transactions with witness data from the
//! backend, then confirm them by racing the chain receipt against a
//! backend-visible balance change (see [`confirm`]).

pub mod backend;
pub mod balance;
pub mod bridge;
pub mod config;
pub mod confirm;
pub mod contracts;
pub mod error;
pub mod session;
pub mod status;
pub mod transport;
pub mod units;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{
    AuthStatus, BackendApi, BalanceWitness, BalanceWitnessQuery, CollectFundRequest, FundAmount,
    HttpBackend, LoginRequest, OutgoingFund, TotpEnrollment, TransferWitness,
    TransferWitnessQuery,
};
pub use balance::{BalanceBoard, BalanceKey, BalanceRefresh, BalanceSnapshot, ChainBalances};
pub use bridge::{
    parse_address, parse_tx_no, validate_email, validate_otp, ActionOutcome, PrivacyBridge,
    Settled,
};
pub use config::{BackoffConfig, BridgeConfig};
pub use confirm::{
    confirm_submission, wait_for_state_change, BackoffPolicy, ConfirmationOutcome,
    ConfirmationReport, PollConfig, PollError, PollScope,
};
pub use contracts::{
    BalanceUpdateArgs, Erc20Client, InboxClient, InboxTransfer, PoolInfo, PrivacyPoolClient,
    PrivacyTransferArgs, TxHash,
};
pub use error::{Error, ErrorCode, Result, TxErrorKind};
pub use session::{
    bind_authenticator, complete_email_login, FileTokenStore, MemoryTokenStore, Session,
    TokenStore, TOKEN_KEY,
};
pub use status::{LogSink, Severity, StatusSink};
#[cfg(not(target_arch = "wasm32"))]
pub use transport::AlloyHttpTransport;
pub use transport::{EvmCall, EvmMessageSigner, EvmTransport, EvmViewTransport, ReceiptStatus};
pub use units::{check_amount, format_amount, parse_amount, DEFAULT_DECIMALS};
