//! HTTP client for the PUSDC witness backend.
//!
//! Endpoints used:
//! - POST /api/auth/login, GET /api/auth/status, POST /api/auth/email/send
//! - GET  /api/auth/email/verify, POST /api/auth/email/otp_verify
//! - GET  /api/email_authenticator, POST /api/bind_authenticator
//! - GET  /api/base/usdc/decrypt_balance
//! - GET  /api/base/usdc/sign_deposit, sign_withdraw, sign_transfer
//! - POST /api/send_fund, POST /api/collect_fund
//! - GET  /api/outgoing_funds, GET /api/outgoing_fund
//!
//! Responses carrying a `status` other than `"ok"` are witness rejections.

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use log::debug;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::{Error, ErrorCode, Result},
    session::TokenStore,
    units::format_amount,
};

/// Body of `POST /api/auth/login`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LoginRequest {
    pub address: String,
    pub signature: String,
    /// Unix seconds, sent as a string.
    pub timestamp: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct AuthStatus {
    #[serde(default)]
    pub is_logged_in: bool,
    #[serde(default)]
    pub address: Option<String>,
}

/// Inputs for `sign_deposit` / `sign_withdraw`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BalanceWitnessQuery {
    pub addr: Address,
    pub amount: U256,
    /// On-chain nonce plus one.
    pub nonce: U256,
    /// Current balance ciphertext; empty is sent as `0x`.
    pub balance: Bytes,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct BalanceWitness {
    pub amount_cipher: Bytes,
    pub current_balance: Bytes,
    pub updated_balance: Bytes,
    pub signature: Bytes,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferWitnessQuery {
    pub from: Address,
    pub to: Address,
    pub amount: U256,
    pub nonce: U256,
    pub sender_balance: Bytes,
    pub receiver_balance: Bytes,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct TransferWitness {
    pub amount_cipher: Bytes,
    pub current_sender_balance: Bytes,
    pub updated_sender_balance: Bytes,
    pub current_receiver_balance: Bytes,
    pub updated_receiver_balance: Bytes,
    pub signature: Bytes,
}

/// Body of `POST /api/collect_fund`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollectFundRequest {
    pub tx_no: u64,
    pub credential: String,
    pub otp: String,
    pub address: Address,
}

/// Amount stored with an outgoing fund. Older records hold a formatted decimal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FundAmount {
    Raw(U256),
    Formatted(String),
}

impl FundAmount {
    pub fn render(&self, decimals: u8) -> String {
        match self {
            FundAmount::Raw(raw) => format_amount(*raw, decimals),
            FundAmount::Formatted(text) => text.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutgoingFund {
    pub tx_no: u64,
    pub email: Option<String>,
    pub amount: Option<FundAmount>,
    pub created_at: Option<String>,
}

/// Account email and TOTP secret returned when a link is opened.
///
/// `secret` is only present while the authenticator is not yet bound.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct TotpEnrollment {
    pub email: String,
    #[serde(rename = "code_2fa", default)]
    pub secret: Option<String>,
}

impl TotpEnrollment {
    /// `otpauth://` URI for authenticator apps.
    pub fn otpauth_uri(&self) -> Option<String> {
        self.secret.as_ref().map(|secret| {
            format!(
                "otpauth://totp/PUSDC:{}?secret={secret}&issuer=PUSDC",
                self.email
            )
        })
    }
}

/// Witness backend operations used by the bridge.
#[async_trait]
pub trait BackendApi: Send + Sync {
    /// Exchanges a signed login message for a bearer token.
    async fn login(&self, request: &LoginRequest) -> Result<String>;
    async fn auth_status(&self) -> Result<AuthStatus>;
    /// Decrypts a pool balance ciphertext into base units.
    async fn decrypt_balance(&self, cipher: &Bytes) -> Result<U256>;
    async fn sign_deposit(&self, query: &BalanceWitnessQuery) -> Result<BalanceWitness>;
    async fn sign_withdraw(&self, query: &BalanceWitnessQuery) -> Result<BalanceWitness>;
    async fn sign_transfer(&self, query: &TransferWitnessQuery) -> Result<TransferWitness>;
    async fn send_fund(&self, email: &str, tx_no: u64) -> Result<()>;
    /// Verifies the OTP and returns the witness signature for `acceptFund`.
    async fn collect_fund(&self, request: &CollectFundRequest) -> Result<Bytes>;
    async fn outgoing_funds(&self) -> Result<Vec<OutgoingFund>>;
    async fn outgoing_fund(
        &self,
        tx_no: u64,
        credential: Option<&str>,
    ) -> Result<Option<OutgoingFund>>;
    async fn send_email_link(&self, email: &str) -> Result<()>;
    /// Opens an emailed login link.
    async fn verify_email_link(&self, token: &str) -> Result<TotpEnrollment>;
    /// Completes an email login with the authenticator code; returns a bearer token.
    async fn verify_email_otp(&self, email: &str, token: &str, otp: &str) -> Result<String>;
    /// Opens a claim link for authenticator enrolment.
    async fn email_authenticator(&self, tx_no: u64, credential: &str) -> Result<TotpEnrollment>;
    /// Binds the authenticator to the claim email; returns a bearer token.
    async fn bind_authenticator(&self, tx_no: u64, credential: &str, otp: &str) -> Result<String>;
}

#[async_trait]
impl<B: BackendApi + ?Sized> BackendApi for Arc<B> {
    async fn login(&self, request: &LoginRequest) -> Result<String> {
        (**self).login(request).await
    }

    async fn auth_status(&self) -> Result<AuthStatus> {
        (**self).auth_status().await
    }

    async fn decrypt_balance(&self, cipher: &Bytes) -> Result<U256> {
        (**self).decrypt_balance(cipher).await
    }

    async fn sign_deposit(&self, query: &BalanceWitnessQuery) -> Result<BalanceWitness> {
        (**self).sign_deposit(query).await
    }

    async fn sign_withdraw(&self, query: &BalanceWitnessQuery) -> Result<BalanceWitness> {
        (**self).sign_withdraw(query).await
    }

    async fn sign_transfer(&self, query: &TransferWitnessQuery) -> Result<TransferWitness> {
        (**self).sign_transfer(query).await
    }

    async fn send_fund(&self, email: &str, tx_no: u64) -> Result<()> {
        (**self).send_fund(email, tx_no).await
    }

    async fn collect_fund(&self, request: &CollectFundRequest) -> Result<Bytes> {
        (**self).collect_fund(request).await
    }

    async fn outgoing_funds(&self) -> Result<Vec<OutgoingFund>> {
        (**self).outgoing_funds().await
    }

    async fn outgoing_fund(
        &self,
        tx_no: u64,
        credential: Option<&str>,
    ) -> Result<Option<OutgoingFund>> {
        (**self).outgoing_fund(tx_no, credential).await
    }

    async fn send_email_link(&self, email: &str) -> Result<()> {
        (**self).send_email_link(email).await
    }

    async fn verify_email_link(&self, token: &str) -> Result<TotpEnrollment> {
        (**self).verify_email_link(token).await
    }

    async fn verify_email_otp(&self, email: &str, token: &str, otp: &str) -> Result<String> {
        (**self).verify_email_otp(email, token, otp).await
    }

    async fn email_authenticator(&self, tx_no: u64, credential: &str) -> Result<TotpEnrollment> {
        (**self).email_authenticator(tx_no, credential).await
    }

    async fn bind_authenticator(&self, tx_no: u64, credential: &str, otp: &str) -> Result<String> {
        (**self).bind_authenticator(tx_no, credential, otp).await
    }
}

/// reqwest-backed [`BackendApi`] with bearer-token auth.
#[derive(Clone)]
pub struct HttpBackend {
    base: Url,
    client: Client,
    tokens: Arc<dyn TokenStore>,
}

impl HttpBackend {
    /// `base` like `"https://api.pusdc.xyz"`.
    pub fn new(base: &str, timeout: Duration, tokens: Arc<dyn TokenStore>) -> Result<Self> {
        let base = Url::parse(base)
            .map_err(|err| Error::new(ErrorCode::Config, format!("api url {base}: {err}")))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| Error::new(ErrorCode::TransportBackend, err.to_string()))?;
        Ok(Self {
            base,
            client,
            tokens,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|err| Error::new(ErrorCode::Config, format!("{path}: {err}")))
    }

    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        match self.tokens.load() {
            Some(token) => Ok(request.bearer_auth(token)),
            None => Err(Error::new(
                ErrorCode::AuthMissing,
                "not logged in; run `login` first",
            )),
        }
    }

    fn decrypt_request(&self, cipher: &Bytes) -> Result<RequestBuilder> {
        let url = self.endpoint("/api/base/usdc/decrypt_balance")?;
        self.authorized(self.client.get(url).query(&[("balance", cipher.to_string())]))
    }

    fn balance_witness_request(
        &self,
        path: &str,
        query: &BalanceWitnessQuery,
    ) -> Result<RequestBuilder> {
        let url = self.endpoint(path)?;
        let pairs = [
            ("addr", query.addr.to_string()),
            ("amount", query.amount.to_string()),
            ("nonce", query.nonce.to_string()),
            ("balance", query.balance.to_string()),
        ];
        self.authorized(self.client.get(url).query(&pairs))
    }

    fn transfer_witness_request(&self, query: &TransferWitnessQuery) -> Result<RequestBuilder> {
        let url = self.endpoint("/api/base/usdc/sign_transfer")?;
        let pairs = [
            ("from_addr", query.from.to_string()),
            ("to_addr", query.to.to_string()),
            ("amount", query.amount.to_string()),
            ("nonce", query.nonce.to_string()),
            ("sender_balance", query.sender_balance.to_string()),
            ("receiver_balance", query.receiver_balance.to_string()),
        ];
        self.authorized(self.client.get(url).query(&pairs))
    }

    fn outgoing_fund_request(&self, tx_no: u64, credential: Option<&str>) -> Result<RequestBuilder> {
        let url = self.endpoint("/api/outgoing_fund")?;
        let mut pairs = vec![("tx_no", tx_no.to_string())];
        match credential {
            // Recipients open the link without a session.
            Some(credential) => {
                pairs.push(("credential", credential.to_string()));
                Ok(self.client.get(url).query(&pairs))
            }
            None => self.authorized(self.client.get(url).query(&pairs)),
        }
    }

    fn email_verify_request(&self, token: &str) -> Result<RequestBuilder> {
        let url = self.endpoint("/api/auth/email/verify")?;
        Ok(self.client.get(url).query(&[("token", token)]))
    }

    fn email_authenticator_request(&self, tx_no: u64, credential: &str) -> Result<RequestBuilder> {
        let url = self.endpoint("/api/email_authenticator")?;
        let pairs = [("tx_no", tx_no.to_string()), ("credential", credential.to_string())];
        Ok(self.client.get(url).query(&pairs))
    }

    fn bind_authenticator_request(
        &self,
        tx_no: u64,
        credential: &str,
        otp: &str,
    ) -> Result<RequestBuilder> {
        let url = self.endpoint("/api/bind_authenticator")?;
        let body = BindAuthenticatorBody {
            tx_no: tx_no.to_string(),
            credential,
            otp,
        };
        Ok(self.client.post(url).json(&body))
    }

    async fn execute<T: DeserializeOwned>(&self, name: &str, request: RequestBuilder) -> Result<T> {
        let response = request.send().await.map_err(|err| {
            Error::new(ErrorCode::TransportBackend, format!("{name}: {err}"))
        })?;
        let status = response.status();
        let body = response.text().await.map_err(|err| {
            Error::new(ErrorCode::TransportBackend, format!("{name}: {err}"))
        })?;
        debug!("backend: {name} -> HTTP {status}");
        parse_response(name, status, &body)
    }
}

#[derive(Serialize)]
struct EmailBody<'a> {
    email: &'a str,
}

#[derive(Serialize)]
struct SendFundBody<'a> {
    email: &'a str,
    tx_no: String,
}

#[derive(Serialize)]
struct CollectFundBody<'a> {
    tx_no: String,
    credential: &'a str,
    otp: &'a str,
    address: String,
}

#[derive(Serialize)]
struct OtpVerifyBody<'a> {
    email: &'a str,
    token: &'a str,
    otp: &'a str,
}

#[derive(Serialize)]
struct BindAuthenticatorBody<'a> {
    tx_no: String,
    credential: &'a str,
    otp: &'a str,
}

#[derive(Deserialize)]
struct TokenReply {
    token: String,
}

#[derive(Deserialize)]
struct SignatureReply {
    signature: Bytes,
}

#[derive(Deserialize)]
struct ResultReply {
    #[serde(default)]
    result: Value,
}

#[async_trait]
impl BackendApi for HttpBackend {
    async fn login(&self, request: &LoginRequest) -> Result<String> {
        let url = self.endpoint("/api/auth/login")?;
        let reply: TokenReply = self
            .execute("login", self.client.post(url).json(request))
            .await
            .map_err(|err| Error::new(ErrorCode::AuthFailed, err.detail()))?;
        Ok(reply.token)
    }

    async fn auth_status(&self) -> Result<AuthStatus> {
        let url = self.endpoint("/api/auth/status")?;
        let request = self.authorized(self.client.get(url))?;
        self.execute("auth_status", request).await
    }

    async fn decrypt_balance(&self, cipher: &Bytes) -> Result<U256> {
        let reply: Value = self
            .execute("decrypt_balance", self.decrypt_request(cipher)?)
            .await?;
        reply
            .get("balance")
            .and_then(parse_u256_value)
            .ok_or_else(|| Error::new(ErrorCode::DecodeFailed, "decrypt_balance: missing balance"))
    }

    async fn sign_deposit(&self, query: &BalanceWitnessQuery) -> Result<BalanceWitness> {
        let request = self.balance_witness_request("/api/base/usdc/sign_deposit", query)?;
        self.execute("sign_deposit", request).await
    }

    async fn sign_withdraw(&self, query: &BalanceWitnessQuery) -> Result<BalanceWitness> {
        let request = self.balance_witness_request("/api/base/usdc/sign_withdraw", query)?;
        self.execute("sign_withdraw", request).await
    }

    async fn sign_transfer(&self, query: &TransferWitnessQuery) -> Result<TransferWitness> {
        let request = self.transfer_witness_request(query)?;
        self.execute("sign_transfer", request).await
    }

    async fn send_fund(&self, email: &str, tx_no: u64) -> Result<()> {
        let url = self.endpoint("/api/send_fund")?;
        let body = SendFundBody {
            email,
            tx_no: tx_no.to_string(),
        };
        let request = self.authorized(self.client.post(url).json(&body))?;
        let _: Value = self.execute("send_fund", request).await?;
        Ok(())
    }

    async fn collect_fund(&self, request: &CollectFundRequest) -> Result<Bytes> {
        let url = self.endpoint("/api/collect_fund")?;
        let body = CollectFundBody {
            tx_no: request.tx_no.to_string(),
            credential: &request.credential,
            otp: &request.otp,
            address: request.address.to_string(),
        };
        let reply: SignatureReply = self
            .execute("collect_fund", self.client.post(url).json(&body))
            .await?;
        Ok(reply.signature)
    }

    async fn outgoing_funds(&self) -> Result<Vec<OutgoingFund>> {
        let url = self.endpoint("/api/outgoing_funds")?;
        let request = self.authorized(self.client.get(url))?;
        let reply: ResultReply = self.execute("outgoing_funds", request).await?;
        match reply.result {
            Value::Array(items) => items.iter().map(parse_outgoing_fund).collect(),
            Value::Null => Ok(Vec::new()),
            other => Err(Error::new(
                ErrorCode::DecodeFailed,
                format!("outgoing_funds: unexpected result {other}"),
            )),
        }
    }

    async fn outgoing_fund(
        &self,
        tx_no: u64,
        credential: Option<&str>,
    ) -> Result<Option<OutgoingFund>> {
        let request = self.outgoing_fund_request(tx_no, credential)?;
        let reply: ResultReply = self.execute("outgoing_fund", request).await?;
        match reply.result {
            Value::Null => Ok(None),
            value => parse_outgoing_fund(&value).map(Some),
        }
    }

    async fn send_email_link(&self, email: &str) -> Result<()> {
        let url = self.endpoint("/api/auth/email/send")?;
        let _: Value = self
            .execute("email_send", self.client.post(url).json(&EmailBody { email }))
            .await?;
        Ok(())
    }

    async fn verify_email_link(&self, token: &str) -> Result<TotpEnrollment> {
        self.execute("email_verify", self.email_verify_request(token)?)
            .await
    }

    async fn verify_email_otp(&self, email: &str, token: &str, otp: &str) -> Result<String> {
        let url = self.endpoint("/api/auth/email/otp_verify")?;
        let body = OtpVerifyBody { email, token, otp };
        let reply: TokenReply = self
            .execute("email_otp_verify", self.client.post(url).json(&body))
            .await
            .map_err(|err| Error::new(ErrorCode::AuthFailed, err.detail()))?;
        Ok(reply.token)
    }

    async fn email_authenticator(&self, tx_no: u64, credential: &str) -> Result<TotpEnrollment> {
        let request = self.email_authenticator_request(tx_no, credential)?;
        self.execute("email_authenticator", request).await
    }

    async fn bind_authenticator(&self, tx_no: u64, credential: &str, otp: &str) -> Result<String> {
        let request = self.bind_authenticator_request(tx_no, credential, otp)?;
        let reply: TokenReply = self
            .execute("bind_authenticator", request)
            .await
            .map_err(|err| Error::new(ErrorCode::AuthFailed, err.detail()))?;
        Ok(reply.token)
    }
}

/// Checks the HTTP status and `status` field, then decodes the body.
fn parse_response<T: DeserializeOwned>(name: &str, http: StatusCode, body: &str) -> Result<T> {
    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(err) if http.is_success() => {
            return Err(Error::new(
                ErrorCode::DecodeFailed,
                format!("{name}: invalid JSON: {err}"),
            ))
        }
        Err(_) => Value::Null,
    };

    let message = value
        .get("error")
        .or_else(|| value.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string);

    if http == StatusCode::UNAUTHORIZED || http == StatusCode::FORBIDDEN {
        return Err(Error::new(
            ErrorCode::AuthFailed,
            format!("{name}: {}", message.unwrap_or_else(|| http.to_string())),
        ));
    }
    if !http.is_success() {
        return Err(Error::new(
            ErrorCode::TransportBackend,
            format!("{name}: HTTP {http}{}", message.map(|m| format!(": {m}")).unwrap_or_default()),
        ));
    }
    if let Some(status) = value.get("status").and_then(Value::as_str) {
        if status != "ok" {
            return Err(Error::new(
                ErrorCode::WitnessRejected,
                format!("{name}: {}", message.unwrap_or_else(|| format!("status {status}"))),
            ));
        }
    }

    serde_json::from_value(value)
        .map_err(|err| Error::new(ErrorCode::DecodeFailed, format!("{name}: {err}")))
}

/// Accepts a JSON number, a decimal string, or a `0x` hex string.
pub fn parse_u256_value(value: &Value) -> Option<U256> {
    match value {
        Value::Number(number) => number
            .as_u64()
            .map(U256::from)
            .or_else(|| number.to_string().parse().ok()),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn parse_outgoing_fund(value: &Value) -> Result<OutgoingFund> {
    let tx_no = value
        .get("tx_no")
        .and_then(|tx_no| match tx_no {
            Value::Number(number) => number.as_u64(),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        })
        .ok_or_else(|| Error::new(ErrorCode::DecodeFailed, format!("fund without tx_no: {value}")))?;

    let amount = match value.get("amount") {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) if text.contains('.') => Some(FundAmount::Formatted(text.clone())),
        Some(Value::String(text)) if text.is_empty() => None,
        Some(other) => Some(
            parse_u256_value(other)
                .map(FundAmount::Raw)
                .unwrap_or_else(|| FundAmount::Formatted(other.to_string())),
        ),
    };

    let text = |key: &str| {
        value
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    Ok(OutgoingFund {
        tx_no,
        email: text("email"),
        amount,
        created_at: text("created_at"),
    })
}
