//! In-memory doubles for the capability traits
//!
//! Responses are queued up front and handed out in order; every request is
//! recorded so tests can assert on the exact calldata.

use crate::backend::{AccountSigner, ContractProvider, WalletExtension};
use crate::error::{Result, StarknetError};
use crate::types::{AddTransactionResponse, CallResponse, FunctionCall};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

type Queue<T> = Mutex<VecDeque<std::result::Result<T, String>>>;

fn pop<T>(queue: &Queue<T>, what: &str) -> Result<T> {
    let next = queue
        .lock()
        .map_err(|_| StarknetError::ContractError("mock poisoned".to_string()))?
        .pop_front();
    match next {
        Some(Ok(value)) => Ok(value),
        Some(Err(message)) => Err(StarknetError::ContractError(message)),
        None => Err(StarknetError::ContractError(format!("no {what} queued"))),
    }
}

/// Provider returning queued call results
#[derive(Debug, Default)]
pub struct MockProvider {
    responses: Queue<CallResponse>,
    calls: Mutex<Vec<FunctionCall>>,
}

impl MockProvider {
    /// Empty provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful result
    pub fn push_result<S: Into<String>>(
        &self,
        result: impl IntoIterator<Item = S>,
    ) -> &Self {
        let response = CallResponse::new(result.into_iter().map(Into::into).collect());
        self.responses.lock().expect("mock poisoned").push_back(Ok(response));
        self
    }

    /// Queues a failure
    pub fn push_error(&self, message: impl Into<String>) -> &Self {
        self.responses.lock().expect("mock poisoned").push_back(Err(message.into()));
        self
    }

    /// Calls seen so far
    pub fn calls(&self) -> Vec<FunctionCall> {
        self.calls.lock().expect("mock poisoned").clone()
    }
}

#[async_trait]
impl ContractProvider for MockProvider {
    async fn call_contract(&self, call: &FunctionCall) -> Result<CallResponse> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call.clone());
        }
        pop(&self.responses, "call result")
    }
}

/// Signer returning queued submission responses
#[derive(Debug, Default)]
pub struct MockSigner {
    responses: Queue<AddTransactionResponse>,
    calls: Mutex<Vec<FunctionCall>>,
}

impl MockSigner {
    /// Empty signer
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response
    pub fn push_response(&self, response: AddTransactionResponse) -> &Self {
        self.responses.lock().expect("mock poisoned").push_back(Ok(response));
        self
    }

    /// Queues a failure
    pub fn push_error(&self, message: impl Into<String>) -> &Self {
        self.responses.lock().expect("mock poisoned").push_back(Err(message.into()));
        self
    }

    /// Calls seen so far
    pub fn calls(&self) -> Vec<FunctionCall> {
        self.calls.lock().expect("mock poisoned").clone()
    }
}

#[async_trait]
impl AccountSigner for MockSigner {
    async fn add_transaction(&self, call: &FunctionCall) -> Result<AddTransactionResponse> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call.clone());
        }
        pop(&self.responses, "submission response")
    }
}

/// Scriptable injected wallet
#[derive(Debug)]
pub struct MockWallet {
    accounts: Mutex<std::result::Result<Vec<String>, String>>,
    connected: AtomicBool,
    enable_calls: AtomicUsize,
    signer: Arc<MockSigner>,
    provider: Arc<MockProvider>,
    events: broadcast::Sender<Vec<String>>,
}

impl MockWallet {
    /// Wallet that connects and exposes `account`
    pub fn new(account: impl Into<String>) -> Self {
        Self::with_accounts(vec![account.into()])
    }

    /// Wallet that connects and exposes exactly `accounts`
    pub fn with_accounts(accounts: Vec<String>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            accounts: Mutex::new(Ok(accounts)),
            connected: AtomicBool::new(true),
            enable_calls: AtomicUsize::new(0),
            signer: Arc::new(MockSigner::new()),
            provider: Arc::new(MockProvider::new()),
            events,
        }
    }

    /// Wallet whose `enable` fails, as when the user rejects
    pub fn rejecting(message: impl Into<String>) -> Self {
        let wallet = Self::new("0x0");
        *wallet.accounts.lock().expect("mock poisoned") = Err(message.into());
        wallet
    }

    /// Sets what `is_connected` reports
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Number of `enable` calls
    pub fn enable_calls(&self) -> usize {
        self.enable_calls.load(Ordering::SeqCst)
    }

    /// Emits an `accountsChanged` event, returning the number of listeners
    pub fn change_accounts(&self, accounts: Vec<String>) -> usize {
        self.events.send(accounts).unwrap_or(0)
    }

    /// The signer handed to sessions
    pub fn mock_signer(&self) -> Arc<MockSigner> {
        self.signer.clone()
    }

    /// The provider handed to sessions
    pub fn mock_provider(&self) -> Arc<MockProvider> {
        self.provider.clone()
    }
}

#[async_trait]
impl WalletExtension for MockWallet {
    async fn enable(&self) -> Result<Vec<String>> {
        self.enable_calls.fetch_add(1, Ordering::SeqCst);
        self.accounts
            .lock()
            .map_err(|_| StarknetError::ConnectionFailed("mock poisoned".to_string()))?
            .clone()
            .map_err(StarknetError::ConnectionFailed)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn signer(&self) -> Arc<dyn AccountSigner> {
        self.signer.clone()
    }

    fn provider(&self) -> Arc<dyn ContractProvider> {
        self.provider.clone()
    }

    fn accounts_changed(&self) -> broadcast::Receiver<Vec<String>> {
        self.events.subscribe()
    }
}
