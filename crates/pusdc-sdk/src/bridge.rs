//! User-facing bridge actions: deposit, withdraw, transfer, and the inbox flows.

use std::sync::Arc;

use alloy_primitives::{Address, Bytes, U256};
use log::{info, warn};

use crate::{
    backend::{
        BackendApi, BalanceWitnessQuery, CollectFundRequest, OutgoingFund, TransferWitnessQuery,
    },
    balance::{BalanceKey, BalanceRefresh, BalanceSnapshot, ChainBalances},
    config::BridgeConfig,
    confirm::{
        confirm_submission, ConfirmationOutcome, ConfirmationReport, PollConfig, PollScope,
    },
    contracts::{
        BalanceUpdateArgs, Erc20Client, InboxClient, PoolInfo, PrivacyPoolClient,
        PrivacyTransferArgs, TxHash,
    },
    error::{Error, ErrorCode, Result},
    status::{Severity, StatusSink},
    transport::{EvmMessageSigner, EvmTransport, EvmViewTransport, ReceiptStatus},
    units::{check_amount, parse_amount},
};

/// Result of an action that may first need an ERC-20 approval.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionOutcome<T> {
    /// Allowance was short; an approval was mined and the action must be re-run.
    Approved(TxHash),
    Completed(T),
}

/// A transaction that was mined successfully.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Settled {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
}

/// Client that drives the pool and inbox contracts with witness data from the backend.
pub struct PrivacyBridge<T, B> {
    owner: Address,
    transport: T,
    token: Erc20Client<T>,
    pool: PrivacyPoolClient<T>,
    inbox: InboxClient<T>,
    backend: B,
    balances: ChainBalances<T, B>,
    poll: PollConfig,
    scope: PollScope,
    notify: Arc<dyn StatusSink>,
}

impl<T, B> PrivacyBridge<T, B>
where
    T: EvmTransport + EvmViewTransport + EvmMessageSigner + Clone,
    B: BackendApi + Clone,
{
    /// Uses the global poll scope so the host's teardown hook reaches every action.
    pub fn new(
        transport: T,
        backend: B,
        config: &BridgeConfig,
        notify: Arc<dyn StatusSink>,
    ) -> Self {
        let owner = transport.signer_address();
        let token = Erc20Client::new(config.usdc, transport.clone());
        let pool = PrivacyPoolClient::new(config.pool, transport.clone());
        let inbox = InboxClient::new(config.inbox, transport.clone());
        let balances = ChainBalances::new(owner, token.clone(), pool.clone(), backend.clone())
            .with_inbox(inbox.clone());
        Self {
            owner,
            transport,
            token,
            pool,
            inbox,
            backend,
            balances,
            poll: config.poll_config(BalanceKey::Privacy),
            scope: PollScope::global().clone(),
            notify,
        }
    }

    pub fn with_scope(mut self, scope: PollScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Refreshes and returns every balance that could be read.
    pub async fn balances(&self) -> Result<Vec<(BalanceKey, BalanceSnapshot)>> {
        self.balances.refresh().await?;
        Ok(self.balances.board().all())
    }

    /// Moves public USDC into the privacy pool.
    pub async fn deposit(&self, amount: &str) -> Result<ActionOutcome<ConfirmationReport>> {
        let amount = self.amount(amount).await?;
        let pool = self.pool.address();
        if let Some(approval) = self.approve_if_needed(pool, amount).await? {
            return Ok(ActionOutcome::Approved(approval));
        }

        let (nonce, balance) = self.privacy_state().await?;
        self.status("Requesting witness signature...", Severity::Info);
        let witness = self
            .backend
            .sign_deposit(&BalanceWitnessQuery {
                addr: self.owner,
                amount,
                nonce: nonce + U256::from(1u8),
                balance,
            })
            .await?;

        let args = BalanceUpdateArgs {
            amount,
            amount_cipher: witness.amount_cipher,
            current_balance: witness.current_balance,
            updated_balance: witness.updated_balance,
            signature: witness.signature,
            gas_limit: None,
        };
        let report = self.confirm(self.pool.deposit(args)).await?;
        self.finish(&report, "Privacy Deposit successful!");
        Ok(ActionOutcome::Completed(report))
    }

    /// Moves shielded balance back to public USDC.
    pub async fn withdraw(&self, amount: &str) -> Result<ConfirmationReport> {
        let amount = self.amount(amount).await?;
        let (nonce, balance) = self.privacy_state().await?;
        self.status("Requesting witness signature...", Severity::Info);
        let witness = self
            .backend
            .sign_withdraw(&BalanceWitnessQuery {
                addr: self.owner,
                amount,
                nonce: nonce + U256::from(1u8),
                balance,
            })
            .await?;

        let args = BalanceUpdateArgs {
            amount,
            amount_cipher: witness.amount_cipher,
            current_balance: witness.current_balance,
            updated_balance: witness.updated_balance,
            signature: witness.signature,
            gas_limit: None,
        };
        let report = self.confirm(self.pool.withdraw(args)).await?;
        self.finish(&report, "Privacy Withdraw successful!");
        Ok(report)
    }

    /// Shielded transfer to another pool account.
    pub async fn transfer(&self, to: &str, amount: &str) -> Result<ConfirmationReport> {
        let to = parse_address(to)?;
        let amount = self.amount(amount).await?;

        self.status("Fetching current privacy state...", Severity::Info);
        let nonce = self.pool.privacy_nonce(self.owner).await?;
        let sender_balance = self.pool.privacy_balance(self.owner).await?;
        let receiver_balance = self.pool.privacy_balance(to).await?;

        self.status("Requesting witness signature...", Severity::Info);
        let witness = self
            .backend
            .sign_transfer(&TransferWitnessQuery {
                from: self.owner,
                to,
                amount,
                nonce: nonce + U256::from(1u8),
                sender_balance,
                receiver_balance,
            })
            .await?;

        let args = PrivacyTransferArgs {
            to,
            amount_cipher: witness.amount_cipher,
            current_sender_balance: witness.current_sender_balance,
            updated_sender_balance: witness.updated_sender_balance,
            current_receiver_balance: witness.current_receiver_balance,
            updated_receiver_balance: witness.updated_receiver_balance,
            signature: witness.signature,
            gas_limit: None,
        };
        let report = self.confirm(self.pool.transfer(args)).await?;
        self.finish(&report, "Privacy Transfer successful!");
        Ok(report)
    }

    /// Escrows USDC in the inbox for a later email claim.
    pub async fn pay(&self, amount: &str) -> Result<ActionOutcome<Settled>> {
        let amount = self.amount(amount).await?;
        let inbox = self.inbox.address();
        if let Some(approval) = self.approve_if_needed(inbox, amount).await? {
            return Ok(ActionOutcome::Approved(approval));
        }

        self.status("Confirming transaction in wallet...", Severity::Info);
        let tx_hash = self.inbox.send_fund(amount).await?;
        let settled = self.settle(tx_hash).await?;
        self.status("Inbox payment successful!", Severity::Success);
        Ok(ActionOutcome::Completed(settled))
    }

    /// Withdraws unclaimed USDC from the inbox.
    pub async fn inbox_withdraw(&self, amount: &str) -> Result<Settled> {
        let amount = self.amount(amount).await?;
        self.status("Confirming transaction in wallet...", Severity::Info);
        let tx_hash = self.inbox.withdraw(amount).await?;
        let settled = self.settle(tx_hash).await?;
        self.status("Inbox withdraw successful!", Severity::Success);
        Ok(settled)
    }

    /// Claims an emailed fund after OTP verification.
    pub async fn accept(&self, tx_no: &str, credential: &str, otp: &str) -> Result<Settled> {
        let tx_no = parse_tx_no(tx_no)?;
        validate_otp(otp)?;
        if credential.trim().is_empty() {
            return Err(Error::new(ErrorCode::InvalidInput, "credential is empty"));
        }

        self.status("Verifying OTP...", Severity::Info);
        let signature = self
            .backend
            .collect_fund(&CollectFundRequest {
                tx_no,
                credential: credential.trim().to_string(),
                otp: otp.to_string(),
                address: self.owner,
            })
            .await?;
        self.status("OTP Verified Success!", Severity::Success);

        let tx_hash = self
            .inbox
            .accept_fund(U256::from(tx_no), self.owner, U256::ZERO, signature)
            .await?;
        let settled = self.settle(tx_hash).await?;
        self.status("Transfer successful!", Severity::Success);
        Ok(settled)
    }

    /// Emails the claim link for outgoing fund `tx_no`.
    pub async fn send_email(&self, email: &str, tx_no: &str) -> Result<()> {
        let email = validate_email(email)?;
        let tx_no = parse_tx_no(tx_no)?;
        self.backend.send_fund(email, tx_no).await?;
        self.status("Fund sent through email!", Severity::Success);
        Ok(())
    }

    pub async fn outgoing(&self) -> Result<Vec<OutgoingFund>> {
        self.backend.outgoing_funds().await
    }

    pub async fn outgoing_fund(
        &self,
        tx_no: &str,
        credential: Option<&str>,
    ) -> Result<Option<OutgoingFund>> {
        let tx_no = parse_tx_no(tx_no)?;
        self.backend.outgoing_fund(tx_no, credential).await
    }

    /// Reclaims an inbox fund the recipient never collected.
    pub async fn revoke(&self, tx_no: &str) -> Result<Settled> {
        let tx_no = parse_tx_no(tx_no)?;
        self.status("Confirming transaction in wallet...", Severity::Info);
        let tx_hash = self.inbox.revoke_fund(U256::from(tx_no)).await?;
        let settled = self.settle(tx_hash).await?;
        self.status("Fund revoked!", Severity::Success);
        Ok(settled)
    }

    pub async fn pool_info(&self) -> Result<PoolInfo> {
        self.pool.info().await
    }

    /// Token decimals (6 when the token cannot be queried).
    pub async fn decimals(&self) -> u8 {
        self.balances.decimals().await
    }

    async fn amount(&self, input: &str) -> Result<U256> {
        check_amount(input)?;
        parse_amount(input, self.decimals().await)
    }

    async fn approve_if_needed(&self, spender: Address, amount: U256) -> Result<Option<TxHash>> {
        let allowance = self.token.allowance(self.owner, spender).await?;
        if allowance >= amount {
            return Ok(None);
        }
        self.status("Approving USDC...", Severity::Info);
        let tx_hash = self.token.approve(spender, amount, None).await?;
        self.settle(tx_hash).await?;
        self.status("Approval successful!", Severity::Success);
        Ok(Some(tx_hash))
    }

    async fn privacy_state(&self) -> Result<(U256, Bytes)> {
        self.status("Fetching current privacy state...", Severity::Info);
        let nonce = self.pool.privacy_nonce(self.owner).await?;
        let balance = self.pool.privacy_balance(self.owner).await?;
        Ok((nonce, balance))
    }

    async fn confirm<F>(&self, submit: F) -> Result<ConfirmationReport>
    where
        F: std::future::Future<Output = Result<TxHash>>,
    {
        // The poll compares against the board, so it must hold the pre-submission value.
        if let Err(err) = self.balances.refresh().await {
            warn!("bridge: balance refresh before submission failed: {err}");
        }
        self.status("Confirming transaction in wallet...", Severity::Info);
        confirm_submission(
            &self.balances,
            &self.transport,
            submit,
            self.notify.as_ref(),
            &self.poll,
            &self.scope,
        )
        .await
    }

    async fn settle(&self, tx_hash: TxHash) -> Result<Settled> {
        self.status("Waiting for confirmation...", Severity::Info);
        let ReceiptStatus {
            block_number,
            success,
        } = self.transport.wait_for_receipt(tx_hash.0).await?;
        if !success {
            return Err(Error::new(
                ErrorCode::SubmissionRejected,
                format!("transaction {tx_hash} reverted"),
            ));
        }
        info!("bridge: {tx_hash} mined in block {block_number:?}");
        Ok(Settled {
            tx_hash,
            block_number,
        })
    }

    fn finish(&self, report: &ConfirmationReport, message: &str) {
        match report.outcome {
            ConfirmationOutcome::ChainConfirmed { success: false, .. }
            | ConfirmationOutcome::Unconfirmed => {}
            _ => self.status(message, Severity::Success),
        }
    }

    fn status(&self, message: &str, severity: Severity) {
        self.notify.notify(message, severity);
    }
}

pub fn parse_address(input: &str) -> Result<Address> {
    input
        .trim()
        .parse()
        .map_err(|err| Error::new(ErrorCode::InvalidAddress, format!("{input}: {err}")))
}

/// Fund numbers are positive decimal integers.
pub fn parse_tx_no(input: &str) -> Result<u64> {
    let trimmed = input.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::new(
            ErrorCode::InvalidInput,
            format!("tx_no {input:?} is not a positive integer"),
        ));
    }
    match trimmed.parse::<u64>() {
        Ok(tx_no) if tx_no > 0 => Ok(tx_no),
        _ => Err(Error::new(
            ErrorCode::InvalidInput,
            format!("tx_no {input:?} is not a positive integer"),
        )),
    }
}

pub fn validate_otp(otp: &str) -> Result<()> {
    if otp.len() == 6 && otp.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(Error::new(ErrorCode::InvalidInput, "enter the 6-digit code"))
    }
}

pub fn validate_email(email: &str) -> Result<&str> {
    let email = email.trim();
    match email.split_once('@') {
        Some((user, domain)) if !user.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(Error::new(
            ErrorCode::InvalidInput,
            format!("{email:?} is not an email address"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::{erc20::Erc20, inbox::Inbox, privacy_pool::PrivacyPool};
    use crate::error::TxErrorKind;
    use crate::testing::{encode_bytes_return, word, MockBackend, MockTransport, RecordingSink};
    use alloy_sol_types::SolCall;

    struct Harness {
        transport: MockTransport,
        backend: MockBackend,
        sink: RecordingSink,
        bridge: PrivacyBridge<MockTransport, MockBackend>,
    }

    fn harness() -> Harness {
        let transport = MockTransport::default();
        transport.respond(Erc20::decimalsCall::SELECTOR, word(U256::from(6u64)));
        transport.respond(Erc20::balanceOfCall::SELECTOR, word(U256::from(50_000_000u64)));
        transport.respond(Erc20::allowanceCall::SELECTOR, word(U256::MAX));
        transport.respond(PrivacyPool::privacyNoncesCall::SELECTOR, word(U256::from(4u64)));
        transport.respond(
            PrivacyPool::privacyBalancesCall::SELECTOR,
            encode_bytes_return(&[]),
        );
        transport.respond(Inbox::inboxBalancesCall::SELECTOR, word(U256::ZERO));
        let backend = MockBackend::default();
        let sink = RecordingSink::default();
        let bridge = PrivacyBridge::new(
            transport.clone(),
            backend.clone(),
            &BridgeConfig::default(),
            Arc::new(sink.clone()),
        )
        .with_scope(PollScope::new());
        Harness {
            transport,
            backend,
            sink,
            bridge,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn short_allowance_approves_first() {
        let h = harness();
        h.transport
            .respond(Erc20::allowanceCall::SELECTOR, word(U256::from(1u64)));

        let outcome = h.bridge.deposit("2.5").await.unwrap();

        assert!(matches!(outcome, ActionOutcome::Approved(_)));
        let calls = h.transport.sent_calls();
        assert_eq!(calls.len(), 1);
        let approve = Erc20::approveCall::abi_decode(&calls[0].data, true).unwrap();
        assert_eq!(approve.spender, BridgeConfig::default().pool);
        assert_eq!(approve.amount, U256::from(2_500_000u64));
        assert!(h.backend.deposit_queries().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn deposit_requests_witness_for_next_nonce() {
        let h = harness();

        let outcome = h.bridge.deposit("1").await.unwrap();

        let ActionOutcome::Completed(report) = outcome else {
            panic!("expected a deposit");
        };
        assert!(matches!(
            report.outcome,
            ConfirmationOutcome::ChainConfirmed { success: true, .. }
        ));
        let query = &h.backend.deposit_queries()[0];
        assert_eq!(query.nonce, U256::from(5u64));
        assert_eq!(query.amount, U256::from(1_000_000u64));
        assert!(query.balance.is_empty());

        let call = &h.transport.sent_calls()[0];
        let decoded = PrivacyPool::privacyDepositCall::abi_decode(&call.data, true).unwrap();
        assert_eq!(decoded.amountCipher, Bytes::from(vec![0x0A; 4]));
        assert!(h.sink.has(Severity::Success));
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_amount_is_rejected_before_any_call() {
        let h = harness();
        for amount in ["0", "-3", "ten"] {
            let err = h.bridge.deposit(amount).await.expect_err(amount);
            assert_eq!(err.code(), ErrorCode::InvalidAmount);
        }
        assert!(h.transport.sent_calls().is_empty());
        assert!(h.backend.deposit_queries().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn withdraw_survives_wallet_nonce_error() {
        let h = harness();
        h.transport.respond(
            PrivacyPool::privacyBalancesCall::SELECTOR,
            encode_bytes_return(&[0xC1; 48]),
        );
        h.backend.queue_decrypted([
            Ok(U256::from(5_000_000u64)),
            Ok(U256::from(4_000_000u64)),
        ]);
        h.transport
            .fail_next_send(Error::transport(TxErrorKind::Nonce, "nonce: undefined"));

        let report = h.bridge.withdraw("1").await.unwrap();

        assert_eq!(report.tx_hash, None);
        assert_eq!(
            report.balance.map(|b| b.to_string()).as_deref(),
            Some("4.00 PUSDC")
        );
        assert!(matches!(
            report.outcome,
            ConfirmationOutcome::BackendConfirmed { .. }
        ));
        assert_eq!(h.backend.withdraw_queries()[0].balance, Bytes::from(vec![0xC1; 48]));
        assert!(h.sink.has(Severity::Warning));
    }

    #[tokio::test(start_paused = true)]
    async fn witness_rejection_stops_before_submission() {
        let h = harness();
        h.backend.reject_witness(Error::new(
            ErrorCode::WitnessRejected,
            "insufficient balance",
        ));

        let err = h.bridge.withdraw("1").await.expect_err("rejected");

        assert_eq!(err.code(), ErrorCode::WitnessRejected);
        assert!(h.transport.sent_calls().is_empty());
        assert!(!h.sink.has(Severity::Success));
    }

    #[tokio::test(start_paused = true)]
    async fn reverted_deposit_is_reported_without_success() {
        let h = harness();
        h.transport
            .set_receipt(crate::testing::ReceiptBehavior::After(Default::default(), false));

        let outcome = h.bridge.deposit("1").await.unwrap();

        let ActionOutcome::Completed(report) = outcome else {
            panic!("expected a deposit");
        };
        assert!(matches!(
            report.outcome,
            ConfirmationOutcome::ChainConfirmed { success: false, .. }
        ));
        assert!(!h.sink.has(Severity::Success));
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_submission_aborts_withdraw() {
        let h = harness();
        h.transport
            .fail_next_send(Error::transport(TxErrorKind::Rejected, "user denied"));

        let err = h.bridge.withdraw("1").await.expect_err("rejected");
        assert_eq!(err.code(), ErrorCode::SubmissionRejected);
        assert!(!h.sink.has(Severity::Success));
    }

    #[tokio::test(start_paused = true)]
    async fn transfer_validates_recipient_then_signs() {
        let h = harness();
        let err = h.bridge.transfer("0x1234", "1").await.expect_err("bad address");
        assert_eq!(err.code(), ErrorCode::InvalidAddress);
        assert!(h.backend.transfer_queries().is_empty());

        let to = Address::repeat_byte(0x77);
        h.transport.respond_exact(
            PrivacyPool::privacyBalancesCall { owner: to }.abi_encode(),
            encode_bytes_return(&[0x99; 8]),
        );
        h.bridge.transfer(&to.to_string(), "0.5").await.unwrap();

        let query = &h.backend.transfer_queries()[0];
        assert_eq!(query.from, Address::repeat_byte(0xEE));
        assert_eq!(query.to, to);
        assert_eq!(query.amount, U256::from(500_000u64));
        assert_eq!(query.nonce, U256::from(5u64));
        assert!(query.sender_balance.is_empty());
        assert_eq!(query.receiver_balance, Bytes::from(vec![0x99; 8]));
        let call = &h.transport.sent_calls()[0];
        let decoded = PrivacyPool::privacyTransferCall::abi_decode(&call.data, true).unwrap();
        assert_eq!(decoded.toAddr, to);
        assert_eq!(decoded.currentReceiverBalanceCipher, Bytes::from(vec![0x1B; 4]));
    }

    #[tokio::test]
    async fn pay_sends_fund_to_inbox() {
        let h = harness();
        let outcome = h.bridge.pay("3").await.unwrap();

        let ActionOutcome::Completed(settled) = outcome else {
            panic!("expected a payment");
        };
        assert_eq!(settled.block_number, Some(1));
        let call = &h.transport.sent_calls()[0];
        assert_eq!(call.to, BridgeConfig::default().inbox);
        let decoded = Inbox::sendFundCall::abi_decode(&call.data, true).unwrap();
        assert_eq!(decoded.amount, U256::from(3_000_000u64));
    }

    #[tokio::test]
    async fn reverted_inbox_withdraw_is_an_error() {
        let h = harness();
        h.transport
            .set_receipt(crate::testing::ReceiptBehavior::After(Default::default(), false));
        let err = h.bridge.inbox_withdraw("1").await.expect_err("reverted");
        assert_eq!(err.code(), ErrorCode::SubmissionRejected);
    }

    #[tokio::test]
    async fn accept_validates_then_claims_for_self() {
        let h = harness();
        for (tx_no, otp) in [("0", "123456"), ("abc", "123456"), ("5", "12345"), ("5", "12a456")] {
            let err = h.bridge.accept(tx_no, "cred", otp).await.expect_err(otp);
            assert_eq!(err.code(), ErrorCode::InvalidInput);
        }
        assert!(h.backend.collected().is_empty());

        h.bridge.accept("5", "cred", "654321").await.unwrap();

        let collected = &h.backend.collected()[0];
        assert_eq!(collected.tx_no, 5);
        assert_eq!(collected.address, Address::repeat_byte(0xEE));
        let call = &h.transport.sent_calls()[0];
        let decoded = Inbox::acceptFundCall::abi_decode(&call.data, true).unwrap();
        assert_eq!(decoded.txNo, U256::from(5u64));
        assert_eq!(decoded.toAddr, Address::repeat_byte(0xEE));
        assert!(decoded.convertAmount.is_zero());
        assert_eq!(decoded.signature, Bytes::from(vec![0x5A; 65]));
    }

    #[tokio::test]
    async fn send_email_checks_inputs() {
        let h = harness();
        let err = h.bridge.send_email("nobody", "3").await.expect_err("email");
        assert_eq!(err.code(), ErrorCode::InvalidInput);
        let err = h.bridge.send_email("a@b.co", "-1").await.expect_err("tx_no");
        assert_eq!(err.code(), ErrorCode::InvalidInput);

        h.bridge.send_email(" a@b.co ", "3").await.unwrap();
        assert_eq!(h.backend.sent_funds(), vec![("a@b.co".to_string(), 3)]);
    }

    #[tokio::test]
    async fn revoke_reclaims_fund_by_number() {
        let h = harness();
        let err = h.bridge.revoke("x").await.expect_err("tx_no");
        assert_eq!(err.code(), ErrorCode::InvalidInput);
        assert!(h.transport.sent_calls().is_empty());

        let settled = h.bridge.revoke("9").await.unwrap();

        assert_eq!(settled.block_number, Some(1));
        let call = &h.transport.sent_calls()[0];
        assert_eq!(call.to, BridgeConfig::default().inbox);
        let decoded = Inbox::revokeFundCall::abi_decode(&call.data, true).unwrap();
        assert_eq!(decoded.txNo, U256::from(9u64));
        assert!(h.sink.has(Severity::Success));
    }

    #[tokio::test]
    async fn outgoing_looks_up_single_fund() {
        let h = harness();
        let fund = OutgoingFund {
            tx_no: 3,
            email: Some("a@b.co".into()),
            amount: None,
            created_at: None,
        };
        h.backend.set_outgoing(vec![fund.clone()]);

        assert_eq!(h.bridge.outgoing().await.unwrap(), vec![fund.clone()]);
        assert_eq!(h.bridge.outgoing_fund("3", None).await.unwrap(), Some(fund));
        assert_eq!(h.bridge.outgoing_fund("4", Some("cred")).await.unwrap(), None);
        let err = h.bridge.outgoing_fund("0", None).await.expect_err("tx_no");
        assert_eq!(err.code(), ErrorCode::InvalidInput);
    }

    #[tokio::test]
    async fn balances_lists_every_key() {
        let h = harness();
        let balances = h.bridge.balances().await.unwrap();
        let rendered: Vec<String> = balances.iter().map(|(_, s)| s.to_string()).collect();
        assert_eq!(rendered, ["50.00 USDC", "0.00 PUSDC", "0.00 USDC"]);
    }

    #[test]
    fn tx_numbers_must_be_positive_integers() {
        assert_eq!(parse_tx_no(" 42 ").unwrap(), 42);
        for bad in ["", "0", "+4", "4.0", "1e3"] {
            assert_eq!(parse_tx_no(bad).unwrap_err().code(), ErrorCode::InvalidInput);
        }
    }
}
