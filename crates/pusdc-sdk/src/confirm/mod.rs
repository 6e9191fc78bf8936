//! Balance-confirmation protocol: cancellation scope, poller, and coordinator.

pub mod cancel;
pub mod coordinator;
pub mod poller;

pub use cancel::PollScope;
pub use coordinator::{confirm_submission, ConfirmationOutcome, ConfirmationReport};
pub use poller::{
    wait_for_state_change, BackoffPolicy, PollConfig, PollError, DEFAULT_POLL_TIMEOUT,
};
