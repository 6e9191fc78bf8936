//! Shared mocks for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use tokio::time::Instant;

use crate::{
    backend::{
        AuthStatus, BackendApi, BalanceWitness, BalanceWitnessQuery, CollectFundRequest,
        LoginRequest, OutgoingFund, TotpEnrollment, TransferWitness, TransferWitnessQuery,
    },
    balance::{BalanceBoard, BalanceKey, BalanceRefresh, BalanceSnapshot},
    error::{Error, ErrorCode, Result},
    status::{Severity, StatusSink},
    transport::{EvmCall, EvmMessageSigner, EvmTransport, EvmViewTransport, ReceiptStatus},
};

pub fn word(value: U256) -> Bytes {
    Bytes::from(value.to_be_bytes::<32>().to_vec())
}

pub fn encode_bytes_return(data: &[u8]) -> Bytes {
    let mut out = Vec::with_capacity(64 + data.len().div_ceil(32) * 32);
    let mut offset = [0u8; 32];
    offset[31] = 0x20;
    out.extend_from_slice(&offset);

    let mut len_word = [0u8; 32];
    let len = data.len() as u64;
    len_word[24..].copy_from_slice(&len.to_be_bytes());
    out.extend_from_slice(&len_word);

    let mut chunk = data.to_vec();
    while chunk.len() % 32 != 0 {
        chunk.push(0);
    }
    out.extend_from_slice(&chunk);
    Bytes::from(out)
}

pub fn pusdc(raw: u64) -> BalanceSnapshot {
    BalanceSnapshot::new(U256::from(raw), 6, BalanceKey::Privacy.symbol())
}

/// How the mock answers `wait_for_receipt`.
#[derive(Clone, Debug)]
pub enum ReceiptBehavior {
    Never,
    After(Duration, bool),
    Fail(Duration),
}

#[derive(Default)]
struct MockTransportState {
    calls: Vec<EvmCall>,
    send_results: VecDeque<Result<B256>>,
    by_selector: HashMap<[u8; 4], Bytes>,
    by_calldata: HashMap<Bytes, Bytes>,
    receipt: Option<ReceiptBehavior>,
    receipt_waits: usize,
}

#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockTransportState>>,
}

impl MockTransport {
    pub fn sent_calls(&self) -> Vec<EvmCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn respond(&self, selector: [u8; 4], data: Bytes) {
        self.state.lock().unwrap().by_selector.insert(selector, data);
    }

    pub fn respond_exact(&self, calldata: Vec<u8>, data: Bytes) {
        self.state
            .lock()
            .unwrap()
            .by_calldata
            .insert(Bytes::from(calldata), data);
    }

    pub fn fail_next_send(&self, err: Error) {
        self.state.lock().unwrap().send_results.push_back(Err(err));
    }

    pub fn set_receipt(&self, behavior: ReceiptBehavior) {
        self.state.lock().unwrap().receipt = Some(behavior);
    }

    pub fn receipt_waits(&self) -> usize {
        self.state.lock().unwrap().receipt_waits
    }
}

#[async_trait]
impl EvmTransport for MockTransport {
    async fn send(&self, call: EvmCall) -> Result<B256> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        let index = state.calls.len() as u8;
        state
            .send_results
            .pop_front()
            .unwrap_or(Ok(B256::repeat_byte(index)))
    }

    async fn wait_for_receipt(&self, _tx_hash: B256) -> Result<ReceiptStatus> {
        let behavior = {
            let mut state = self.state.lock().unwrap();
            state.receipt_waits += 1;
            state
                .receipt
                .clone()
                .unwrap_or(ReceiptBehavior::After(Duration::ZERO, true))
        };
        match behavior {
            ReceiptBehavior::Never => std::future::pending().await,
            ReceiptBehavior::After(delay, success) => {
                tokio::time::sleep(delay).await;
                Ok(ReceiptStatus {
                    block_number: Some(1),
                    success,
                })
            }
            ReceiptBehavior::Fail(delay) => {
                tokio::time::sleep(delay).await;
                Err(Error::new(ErrorCode::TransportEvm, "receipt lookup failed"))
            }
        }
    }
}

#[async_trait]
impl EvmViewTransport for MockTransport {
    async fn call_view(&self, call: EvmCall) -> Result<Bytes> {
        let state = self.state.lock().unwrap();
        if let Some(data) = state.by_calldata.get(&call.data) {
            return Ok(data.clone());
        }
        let mut selector = [0u8; 4];
        selector.copy_from_slice(&call.data[..4]);
        state
            .by_selector
            .get(&selector)
            .cloned()
            .ok_or_else(|| Error::new(ErrorCode::TransportEvm, "no mock response"))
    }
}

#[async_trait]
impl EvmMessageSigner for MockTransport {
    async fn sign_message(&self, message: &[u8]) -> Result<Bytes> {
        Ok(Bytes::from(message.to_vec()))
    }

    fn signer_address(&self) -> Address {
        Address::repeat_byte(0xEE)
    }
}

#[derive(Default)]
struct MockBackendState {
    logins: Vec<LoginRequest>,
    login_result: Option<Result<String>>,
    status: Option<Result<AuthStatus>>,
    decrypted: VecDeque<Result<U256>>,
    last_decrypted: Option<U256>,
    deposit_queries: Vec<BalanceWitnessQuery>,
    withdraw_queries: Vec<BalanceWitnessQuery>,
    transfer_queries: Vec<TransferWitnessQuery>,
    witness_error: Option<Error>,
    sent_funds: Vec<(String, u64)>,
    collected: Vec<CollectFundRequest>,
    outgoing: Vec<OutgoingFund>,
    email_links: Vec<String>,
    otp_checks: Vec<String>,
    otp_error: Option<Error>,
}

#[derive(Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockBackendState>>,
}

impl MockBackend {
    pub fn set_login(&self, result: Result<String>) {
        self.state.lock().unwrap().login_result = Some(result);
    }

    pub fn set_status(&self, result: Result<AuthStatus>) {
        self.state.lock().unwrap().status = Some(result);
    }

    /// Queues decrypted balances; the last value repeats once the queue drains.
    pub fn queue_decrypted(&self, values: impl IntoIterator<Item = Result<U256>>) {
        self.state.lock().unwrap().decrypted.extend(values);
    }

    pub fn reject_witness(&self, err: Error) {
        self.state.lock().unwrap().witness_error = Some(err);
    }

    pub fn set_outgoing(&self, funds: Vec<OutgoingFund>) {
        self.state.lock().unwrap().outgoing = funds;
    }

    pub fn logins(&self) -> Vec<LoginRequest> {
        self.state.lock().unwrap().logins.clone()
    }

    pub fn deposit_queries(&self) -> Vec<BalanceWitnessQuery> {
        self.state.lock().unwrap().deposit_queries.clone()
    }

    pub fn withdraw_queries(&self) -> Vec<BalanceWitnessQuery> {
        self.state.lock().unwrap().withdraw_queries.clone()
    }

    pub fn transfer_queries(&self) -> Vec<TransferWitnessQuery> {
        self.state.lock().unwrap().transfer_queries.clone()
    }

    pub fn sent_funds(&self) -> Vec<(String, u64)> {
        self.state.lock().unwrap().sent_funds.clone()
    }

    pub fn collected(&self) -> Vec<CollectFundRequest> {
        self.state.lock().unwrap().collected.clone()
    }

    pub fn reject_otp(&self, err: Error) {
        self.state.lock().unwrap().otp_error = Some(err);
    }

    /// Every OTP submitted to `verify_email_otp` or `bind_authenticator`.
    pub fn otp_checks(&self) -> Vec<String> {
        self.state.lock().unwrap().otp_checks.clone()
    }

    fn check_otp(&self, otp: &str, token: &str) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.otp_checks.push(otp.to_string());
        match state.otp_error.clone() {
            Some(err) => Err(err),
            None => Ok(token.to_string()),
        }
    }

    pub fn email_links(&self) -> Vec<String> {
        self.state.lock().unwrap().email_links.clone()
    }

    fn witness(&self) -> Result<BalanceWitness> {
        if let Some(err) = self.state.lock().unwrap().witness_error.clone() {
            return Err(err);
        }
        Ok(BalanceWitness {
            amount_cipher: Bytes::from(vec![0x0A; 4]),
            current_balance: Bytes::from(vec![0x0B; 4]),
            updated_balance: Bytes::from(vec![0x0C; 4]),
            signature: Bytes::from(vec![0x0D; 65]),
        })
    }
}

#[async_trait]
impl BackendApi for MockBackend {
    async fn login(&self, request: &LoginRequest) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.logins.push(request.clone());
        state
            .login_result
            .clone()
            .unwrap_or_else(|| Ok("token-1".to_string()))
    }

    async fn auth_status(&self) -> Result<AuthStatus> {
        self.state.lock().unwrap().status.clone().unwrap_or(Ok(AuthStatus {
            is_logged_in: false,
            address: None,
        }))
    }

    async fn decrypt_balance(&self, _cipher: &Bytes) -> Result<U256> {
        let mut state = self.state.lock().unwrap();
        match state.decrypted.pop_front() {
            Some(Ok(value)) => {
                state.last_decrypted = Some(value);
                Ok(value)
            }
            Some(Err(err)) => Err(err),
            None => state
                .last_decrypted
                .ok_or_else(|| Error::new(ErrorCode::WitnessRejected, "nothing to decrypt")),
        }
    }

    async fn sign_deposit(&self, query: &BalanceWitnessQuery) -> Result<BalanceWitness> {
        self.state.lock().unwrap().deposit_queries.push(query.clone());
        self.witness()
    }

    async fn sign_withdraw(&self, query: &BalanceWitnessQuery) -> Result<BalanceWitness> {
        self.state.lock().unwrap().withdraw_queries.push(query.clone());
        self.witness()
    }

    async fn sign_transfer(&self, query: &TransferWitnessQuery) -> Result<TransferWitness> {
        self.state.lock().unwrap().transfer_queries.push(query.clone());
        let base = self.witness()?;
        Ok(TransferWitness {
            amount_cipher: base.amount_cipher,
            current_sender_balance: base.current_balance,
            updated_sender_balance: base.updated_balance,
            current_receiver_balance: Bytes::from(vec![0x1B; 4]),
            updated_receiver_balance: Bytes::from(vec![0x1C; 4]),
            signature: base.signature,
        })
    }

    async fn send_fund(&self, email: &str, tx_no: u64) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .sent_funds
            .push((email.to_string(), tx_no));
        Ok(())
    }

    async fn collect_fund(&self, request: &CollectFundRequest) -> Result<Bytes> {
        self.state.lock().unwrap().collected.push(request.clone());
        Ok(Bytes::from(vec![0x5A; 65]))
    }

    async fn outgoing_funds(&self) -> Result<Vec<OutgoingFund>> {
        Ok(self.state.lock().unwrap().outgoing.clone())
    }

    async fn outgoing_fund(
        &self,
        tx_no: u64,
        _credential: Option<&str>,
    ) -> Result<Option<OutgoingFund>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .outgoing
            .iter()
            .find(|fund| fund.tx_no == tx_no)
            .cloned())
    }

    async fn send_email_link(&self, email: &str) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .email_links
            .push(email.to_string());
        Ok(())
    }

    async fn verify_email_link(&self, token: &str) -> Result<TotpEnrollment> {
        Ok(TotpEnrollment {
            email: format!("{token}@mail.test"),
            secret: Some("JBSWY3DP".to_string()),
        })
    }

    async fn verify_email_otp(&self, _email: &str, _token: &str, otp: &str) -> Result<String> {
        self.check_otp(otp, "email-token")
    }

    async fn email_authenticator(&self, tx_no: u64, _credential: &str) -> Result<TotpEnrollment> {
        Ok(TotpEnrollment {
            email: format!("claim-{tx_no}@mail.test"),
            secret: None,
        })
    }

    async fn bind_authenticator(&self, _tx_no: u64, _credential: &str, otp: &str) -> Result<String> {
        self.check_otp(otp, "bound-token")
    }
}

/// One scripted reaction to a `refresh` call.
#[derive(Clone, Debug)]
pub enum RefreshStep {
    Keep,
    Fail,
    Set(BalanceSnapshot),
}

/// Refresh source that follows a script and records when it was called.
pub struct ScriptedRefresh {
    board: BalanceBoard,
    script: Mutex<VecDeque<RefreshStep>>,
    calls: Mutex<Vec<Instant>>,
}

impl ScriptedRefresh {
    pub fn new(initial: Option<BalanceSnapshot>, script: Vec<RefreshStep>) -> Self {
        let board = BalanceBoard::default();
        if let Some(snapshot) = initial {
            board.set(BalanceKey::Privacy, snapshot);
        }
        Self {
            board,
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BalanceRefresh for ScriptedRefresh {
    async fn refresh(&self) -> Result<()> {
        self.calls.lock().unwrap().push(Instant::now());
        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(RefreshStep::Keep);
        match step {
            RefreshStep::Keep => Ok(()),
            RefreshStep::Fail => Err(Error::new(ErrorCode::RefreshFailed, "scripted failure")),
            RefreshStep::Set(snapshot) => {
                self.board.set(BalanceKey::Privacy, snapshot);
                Ok(())
            }
        }
    }

    fn snapshot(&self, key: BalanceKey) -> Option<BalanceSnapshot> {
        self.board.get(key)
    }
}

#[derive(Clone, Default)]
pub struct RecordingSink {
    messages: Arc<Mutex<Vec<(String, Severity)>>>,
}

impl RecordingSink {
    pub fn messages(&self) -> Vec<(String, Severity)> {
        self.messages.lock().unwrap().clone()
    }

    pub fn has(&self, severity: Severity) -> bool {
        self.messages().iter().any(|(_, s)| *s == severity)
    }
}

impl StatusSink for RecordingSink {
    fn notify(&self, message: &str, severity: Severity) {
        self.messages
            .lock()
            .unwrap()
            .push((message.to_string(), severity));
    }
}
