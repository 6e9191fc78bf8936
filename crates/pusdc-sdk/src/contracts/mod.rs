pub mod common;
pub mod erc20;
pub mod inbox;
pub mod privacy_pool;

pub use common::TxHash;
pub use erc20::Erc20Client;
pub use inbox::{InboxClient, InboxTransfer};
pub use privacy_pool::{BalanceUpdateArgs, PoolInfo, PrivacyPoolClient, PrivacyTransferArgs};
