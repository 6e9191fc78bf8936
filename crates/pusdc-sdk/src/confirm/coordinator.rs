//! Races the chain receipt against the backend balance poll.

use std::future::Future;

use log::{debug, warn};
use tokio_util::sync::CancellationToken;

use crate::{
    balance::{BalanceRefresh, BalanceSnapshot},
    confirm::{
        cancel::PollScope,
        poller::{wait_for_state_change, PollConfig, PollError},
    },
    contracts::TxHash,
    error::Result,
    status::{Severity, StatusSink},
    transport::EvmTransport,
};

/// Which branch settled the confirmation race.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfirmationOutcome {
    /// The receipt arrived first. `success` is `false` for a reverted transaction.
    ChainConfirmed { tx_hash: TxHash, success: bool },
    /// The backend-visible balance changed first.
    BackendConfirmed { snapshot: BalanceSnapshot },
    /// The first branch to settle failed (receipt error or poll timeout) or
    /// the poll was torn down.
    Unconfirmed,
}

impl ConfirmationOutcome {
    pub fn is_confirmed(&self) -> bool {
        !matches!(self, ConfirmationOutcome::Unconfirmed)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfirmationReport {
    /// `None` when the submission failed with a benign wallet error.
    pub tx_hash: Option<TxHash>,
    pub outcome: ConfirmationOutcome,
    /// Balance at the polled key after the final refresh.
    pub balance: Option<BalanceSnapshot>,
}

/// Submits a transaction and waits for either the chain or the backend to confirm it.
///
/// Benign submission errors (wallet parse artifacts) degrade to backend-only
/// polling; any other submission error is returned without polling. A final
/// refresh always runs once the race settles.
pub async fn confirm_submission<R, T, F>(
    refresh: &R,
    transport: &T,
    submit: F,
    notify: &dyn StatusSink,
    config: &PollConfig,
    scope: &PollScope,
) -> Result<ConfirmationReport>
where
    R: BalanceRefresh + ?Sized,
    T: EvmTransport + ?Sized,
    F: Future<Output = Result<TxHash>>,
{
    let previous = refresh.snapshot(config.key);

    debug!("confirm: idle -> submitting");
    let tx_hash = match submit.await {
        Ok(tx_hash) => {
            debug!("confirm: submitted {tx_hash}");
            Some(tx_hash)
        }
        Err(err) if err.is_benign_submission() => {
            warn!("confirm: benign submission error, polling backend only: {err}");
            notify.notify(
                "Wallet reported parsing issue, but proceeding with backend confirmation...",
                Severity::Warning,
            );
            None
        }
        Err(err) => {
            debug!("confirm: submitting -> failed: {err}");
            return Err(err);
        }
    };

    debug!("confirm: submitting -> awaiting confirmation");
    let cancel = scope.issue();
    let outcome = race(
        refresh,
        transport,
        tx_hash,
        previous.as_ref(),
        notify,
        config,
        &cancel,
    )
    .await;
    cancel.cancel();

    match &outcome {
        ConfirmationOutcome::ChainConfirmed {
            tx_hash,
            success: false,
        } => warn!("confirm: {tx_hash} reverted on-chain"),
        ConfirmationOutcome::Unconfirmed => notify.notify(
            "Could not confirm the transaction yet; check your balance later.",
            Severity::Warning,
        ),
        _ => {}
    }
    debug!("confirm: awaiting confirmation -> confirmed ({outcome:?})");

    if let Err(err) = refresh.refresh().await {
        warn!("confirm: final refresh failed: {err}");
    }

    Ok(ConfirmationReport {
        tx_hash,
        outcome,
        balance: refresh.snapshot(config.key),
    })
}

async fn race<R, T>(
    refresh: &R,
    transport: &T,
    tx_hash: Option<TxHash>,
    previous: Option<&BalanceSnapshot>,
    notify: &dyn StatusSink,
    config: &PollConfig,
    cancel: &CancellationToken,
) -> ConfirmationOutcome
where
    R: BalanceRefresh + ?Sized,
    T: EvmTransport + ?Sized,
{
    let receipt = async {
        match tx_hash {
            Some(tx_hash) => transport.wait_for_receipt(tx_hash.0).await,
            None => std::future::pending().await,
        }
    };
    let poll = wait_for_state_change(refresh, previous, notify, config, cancel);

    // Whichever branch settles first decides; the other is dropped.
    tokio::select! {
        result = receipt => match (result, tx_hash) {
            (Ok(status), Some(tx_hash)) => {
                debug!("confirm: receipt for {tx_hash} in block {:?}", status.block_number);
                ConfirmationOutcome::ChainConfirmed {
                    tx_hash,
                    success: status.success,
                }
            }
            (Err(err), _) => {
                warn!("confirm: receipt wait failed: {err}");
                ConfirmationOutcome::Unconfirmed
            }
            (Ok(_), None) => ConfirmationOutcome::Unconfirmed,
        },
        result = poll => match result {
            Ok(snapshot) => {
                debug!("confirm: backend observed {snapshot}");
                ConfirmationOutcome::BackendConfirmed { snapshot }
            }
            Err(PollError::Cancelled) => {
                debug!("confirm: poll cancelled by teardown");
                ConfirmationOutcome::Unconfirmed
            }
            Err(err @ PollError::Timeout(_)) => {
                warn!("confirm: {err}");
                ConfirmationOutcome::Unconfirmed
            }
        },
    }
}
