//! Test Utilities Module
//!
//! Scripted transports and wallets that record every call, so coordinator
//! tests can assert on exact call order and timing without a network.
//!
//! These utilities are only compiled when running tests or when the
//! `test_utils` feature is enabled.

#![cfg(any(test, feature = "test_utils"))]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use tokio::time::Instant;

use crate::channel::{FormFields, ServerResponse, Transport};
use crate::errors::{PanelError, PanelResult};
use crate::wallet::{NetworkType, WalletProvider, WalletTransaction};

/// Scripted answer for one request
#[derive(Debug, Clone)]
pub enum Scripted {
    /// 200 with the given body
    Reply(String),
    Fail(PanelError),
    /// Never resolves
    Hang,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Post,
    Get,
}

/// One request observed by [`ScriptedTransport`]
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: Method,
    pub endpoint: String,
    pub fields: Option<FormFields>,
    pub at: Instant,
}

impl RecordedCall {
    /// `"POST /x"` style rendering for order assertions
    pub fn line(&self) -> String {
        let verb = match self.method {
            Method::Post => "POST",
            Method::Get => "GET",
        };
        format!("{} {}", verb, self.endpoint)
    }
}

/// Transport answering from per-method scripts; unscripted calls succeed with `"ok"`
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    posts: Mutex<VecDeque<Scripted>>,
    gets: Mutex<VecDeque<Scripted>>,
    post_fallback: Mutex<Option<Scripted>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script_post(&self, answer: Scripted) {
        self.posts.lock().push_back(answer);
    }

    pub fn script_get(&self, answer: Scripted) {
        self.gets.lock().push_back(answer);
    }

    /// Answer every unscripted POST with `err`
    pub fn fail_posts_forever(&self, err: PanelError) {
        *self.post_fallback.lock() = Some(Scripted::Fail(err));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn call_lines(&self) -> Vec<String> {
        self.calls.lock().iter().map(RecordedCall::line).collect()
    }

    async fn answer(answer: Scripted) -> PanelResult<ServerResponse> {
        match answer {
            Scripted::Reply(body) => Ok(ServerResponse { status: 200, body }),
            Scripted::Fail(err) => Err(err),
            Scripted::Hang => std::future::pending().await,
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn post_form(&self, endpoint: &str, fields: &FormFields) -> PanelResult<ServerResponse> {
        self.calls.lock().push(RecordedCall {
            method: Method::Post,
            endpoint: endpoint.to_string(),
            fields: Some(fields.clone()),
            at: Instant::now(),
        });
        let scripted = self.posts.lock().pop_front();
        let answer = scripted
            .or_else(|| self.post_fallback.lock().clone())
            .unwrap_or_else(|| Scripted::Reply("ok".to_string()));
        Self::answer(answer).await
    }

    async fn get(&self, endpoint: &str) -> PanelResult<ServerResponse> {
        self.calls.lock().push(RecordedCall {
            method: Method::Get,
            endpoint: endpoint.to_string(),
            fields: None,
            at: Instant::now(),
        });
        let scripted = self.gets.lock().pop_front();
        Self::answer(scripted.unwrap_or_else(|| Scripted::Reply("ok".to_string()))).await
    }
}

/// Wallet with fixed answers that records what it was asked
#[derive(Debug)]
pub struct FakeWallet {
    connected: bool,
    network: PanelResult<NetworkType>,
    accounts: PanelResult<Vec<String>>,
    send_error: Option<PanelError>,
    account_queries: Mutex<usize>,
    sent: Mutex<Vec<WalletTransaction>>,
}

impl FakeWallet {
    pub fn connected<S: Into<String>>(accounts: Vec<S>) -> Self {
        Self {
            connected: true,
            network: Ok(NetworkType::Main),
            accounts: Ok(accounts.into_iter().map(Into::into).collect()),
            send_error: None,
            account_queries: Mutex::new(0),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn disconnected() -> Self {
        Self {
            connected: false,
            ..Self::connected(Vec::<String>::new())
        }
    }

    pub fn on_network(mut self, network: NetworkType) -> Self {
        self.network = Ok(network);
        self
    }

    pub fn with_network_error(mut self, err: PanelError) -> Self {
        self.network = Err(err);
        self
    }

    pub fn with_accounts_error(mut self, err: PanelError) -> Self {
        self.accounts = Err(err);
        self
    }

    pub fn with_send_error(mut self, err: PanelError) -> Self {
        self.send_error = Some(err);
        self
    }

    pub fn account_queries(&self) -> usize {
        *self.account_queries.lock()
    }

    /// Every transfer handed to `send_value`, failed ones included
    pub fn sent(&self) -> Vec<WalletTransaction> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl WalletProvider for FakeWallet {
    async fn is_connected(&self) -> bool {
        self.connected
    }

    async fn network_type(&self) -> PanelResult<NetworkType> {
        self.network.clone()
    }

    async fn accounts(&self) -> PanelResult<Vec<String>> {
        *self.account_queries.lock() += 1;
        self.accounts.clone()
    }

    async fn send_value(&self, tx: &WalletTransaction) -> PanelResult<String> {
        self.sent.lock().push(tx.clone());
        match &self.send_error {
            Some(err) => Err(err.clone()),
            None => Ok(format!("0x{:064x}", self.sent.lock().len())),
        }
    }
}
