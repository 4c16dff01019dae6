//! Wallet sessions for the browser flow
//!
//! A [`WalletSession`] records an established wallet connection: the active
//! account plus the signer and provider handles the wallet exposed. It is an
//! ordinary value owned by the caller and handed by reference to
//! [`SessionClient`], which issues the two contract calls the game front end
//! needs.

use crate::backend::{AccountSigner, ContractProvider, WalletExtension};
use crate::calldata::parse_felt;
use crate::config::{ContractSet, ErrorMode};
use crate::error::{Result, StarknetError};
use crate::types::{ContractRef, FunctionCall, TxHash};
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// Entry point of the multi-token contract that moves items on chain.
pub const COCHAIN_ENTRY_POINT: &str = "cochain";

/// Balance getter of the fungible token.
pub const BALANCE_OF_ENTRY_POINT: &str = "balanceOf";

/// An established (or empty) wallet connection
#[derive(Default, Clone)]
pub struct WalletSession {
    account: Option<String>,
    signer: Option<Arc<dyn AccountSigner>>,
    provider: Option<Arc<dyn ContractProvider>>,
}

impl WalletSession {
    /// A disconnected session
    pub fn new() -> Self {
        Self::default()
    }

    /// Connects through `wallet`.
    ///
    /// The session only changes when `enable` succeeds and the wallet then
    /// reports itself connected. `on_account_changed` receives the first
    /// account of every later `accountsChanged` event until the returned
    /// subscription is cancelled or dropped.
    pub async fn connect<W, F>(
        &mut self,
        wallet: &W,
        on_account_changed: F,
    ) -> Result<AccountSubscription>
    where
        W: WalletExtension + ?Sized,
        F: Fn(String) + Send + Sync + 'static,
    {
        let accounts = match wallet.enable().await {
            Ok(accounts) => accounts,
            Err(e) => {
                tracing::warn!(error = %e, "Wallet enable failed");
                return Err(match e {
                    StarknetError::ConnectionFailed(_) => e,
                    other => StarknetError::ConnectionFailed(other.to_string()),
                });
            }
        };

        tracing::debug!(connected = wallet.is_connected(), "Wallet enabled");
        if !wallet.is_connected() {
            tracing::warn!("Wallet enabled but reports disconnected");
            return Err(StarknetError::WalletNotConnected);
        }

        let Some(account) = accounts.into_iter().next() else {
            tracing::warn!("Wallet enabled without exposing an account");
            return Err(StarknetError::NoAccount);
        };
        let mut events = wallet.accounts_changed();

        self.account = Some(account);
        self.signer = Some(wallet.signer());
        self.provider = Some(wallet.provider());
        tracing::info!(account = ?self.account, "Wallet session connected");

        let task = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(accounts) => {
                        if let Some(account) = accounts.into_iter().next() {
                            tracing::info!(%account, "accountsChanged");
                            on_account_changed(account);
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Dropped account change events");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        Ok(AccountSubscription { task: Some(task) })
    }

    /// Forgets the connection. Safe to call any number of times.
    pub fn disconnect(&mut self) {
        if self.is_connected() {
            tracing::info!(account = ?self.account, "Wallet session disconnected");
        }
        self.account = None;
        self.signer = None;
        self.provider = None;
    }

    /// Whether a wallet is attached
    pub fn is_connected(&self) -> bool {
        self.account.is_some() && self.signer.is_some() && self.provider.is_some()
    }

    /// Active account, if connected
    pub fn account(&self) -> Option<&str> {
        self.account.as_deref()
    }

    /// Signer of the active account
    pub fn signer(&self) -> Result<&Arc<dyn AccountSigner>> {
        self.signer.as_ref().ok_or(StarknetError::NotConnected)
    }

    /// Provider of the connected wallet
    pub fn provider(&self) -> Result<&Arc<dyn ContractProvider>> {
        self.provider.as_ref().ok_or(StarknetError::NotConnected)
    }
}

impl fmt::Debug for WalletSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletSession")
            .field("connected", &self.is_connected())
            .field("account", &self.account)
            .finish()
    }
}

/// Handle on the `accountsChanged` listener
#[derive(Debug)]
pub struct AccountSubscription {
    task: Option<JoinHandle<()>>,
}

impl AccountSubscription {
    /// Stops delivering account changes
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// True until cancelled or until the wallet closes its event stream
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for AccountSubscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// `balanceOf(address)` on `token`
pub fn balance_of_request(token: ContractRef, address: &str) -> Result<FunctionCall> {
    Ok(token.call(BALANCE_OF_ENTRY_POINT, vec![parse_felt(address)?]))
}

/// Reads `balanceOf(address)` on `token` through `provider`, as a decimal string
pub async fn read_balance_from(
    provider: &dyn ContractProvider,
    token: ContractRef,
    address: &str,
) -> Result<String> {
    let call = balance_of_request(token, address)?;
    let response = provider.call_contract(&call).await?;
    Ok(response.first(BALANCE_OF_ENTRY_POINT)?.to_string())
}

/// Issues the session's contract calls
#[derive(Debug, Clone)]
pub struct SessionClient {
    contracts: ContractSet,
    error_mode: ErrorMode,
}

impl SessionClient {
    /// Client for `contracts`, surfacing errors
    pub fn new(contracts: ContractSet) -> Self {
        Self {
            contracts,
            error_mode: ErrorMode::default(),
        }
    }

    /// Sets how the callback variants treat failures
    pub fn with_error_mode(mut self, error_mode: ErrorMode) -> Self {
        self.error_mode = error_mode;
        self
    }

    /// Configured contracts
    pub fn contracts(&self) -> &ContractSet {
        &self.contracts
    }

    /// Invokes `cochain(from, token_id, amount)` on the multi-token contract.
    ///
    /// Succeeds only when the wallet answers `TRANSACTION_RECEIVED`.
    pub async fn invoke_transfer(
        &self,
        session: &WalletSession,
        from: &str,
        token_id: &str,
        amount: &str,
    ) -> Result<TxHash> {
        let signer = session.signer()?;
        let call = self.contracts.multi_token.call(
            COCHAIN_ENTRY_POINT,
            vec![parse_felt(from)?, parse_felt(token_id)?, parse_felt(amount)?],
        );

        let response = signer.add_transaction(&call).await?;
        tracing::debug!(code = %response.code, "cochain response");
        response.into_hash()
    }

    /// Reads `balanceOf(address)` on the fungible token, as a decimal string
    pub async fn read_balance(&self, session: &WalletSession, address: &str) -> Result<String> {
        let provider = session.provider()?;
        read_balance_from(provider.as_ref(), self.contracts.fungible_token, address).await
    }

    /// Callback form of [`invoke_transfer`](Self::invoke_transfer).
    ///
    /// `on_hash` runs only on success. In [`ErrorMode::Silent`] failures are
    /// logged and `Ok(())` is returned.
    pub async fn invoke_transfer_with<F>(
        &self,
        session: &WalletSession,
        from: &str,
        token_id: &str,
        amount: &str,
        on_hash: F,
    ) -> Result<()>
    where
        F: FnOnce(TxHash),
    {
        let outcome = self.invoke_transfer(session, from, token_id, amount).await;
        if let Some(hash) = self.error_mode.settle(COCHAIN_ENTRY_POINT, outcome)? {
            on_hash(hash);
        }
        Ok(())
    }

    /// Callback form of [`read_balance`](Self::read_balance)
    pub async fn read_balance_with<F>(
        &self,
        session: &WalletSession,
        address: &str,
        on_result: F,
    ) -> Result<()>
    where
        F: FnOnce(String),
    {
        let outcome = self.read_balance(session, address).await;
        if let Some(balance) = self.error_mode.settle(BALANCE_OF_ENTRY_POINT, outcome)? {
            on_result(balance);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockWallet;
    use crate::types::AddTransactionResponse;
    use starknet_core::types::Felt;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn contracts() -> ContractSet {
        ContractSet {
            multi_token: ContractRef::parse("0x1155").unwrap(),
            single_token: ContractRef::parse("0x721").unwrap(),
            fungible_token: ContractRef::parse("0x20").unwrap(),
        }
    }

    async fn connected(wallet: &MockWallet) -> (WalletSession, AccountSubscription) {
        let mut session = WalletSession::new();
        let subscription = session.connect(wallet, |_| {}).await.unwrap();
        (session, subscription)
    }

    #[tokio::test]
    async fn test_connect_stores_account() {
        let wallet = MockWallet::new("0xa11ce");
        let (session, _sub) = connected(&wallet).await;

        assert!(session.is_connected());
        assert_eq!(session.account(), Some("0xa11ce"));
        assert!(session.signer().is_ok());
        assert!(session.provider().is_ok());
    }

    #[tokio::test]
    async fn test_connect_leaves_session_when_wallet_disconnected() {
        let wallet = MockWallet::new("0xa11ce");
        wallet.set_connected(false);

        let mut session = WalletSession::new();
        let result = session.connect(&wallet, |_| {}).await;

        assert!(matches!(result, Err(StarknetError::WalletNotConnected)));
        assert!(!session.is_connected());
        assert_eq!(session.account(), None);
    }

    #[tokio::test]
    async fn test_connect_rejected_keeps_prior_state() {
        let first = MockWallet::new("0xa11ce");
        let (mut session, _sub) = connected(&first).await;

        let rejecting = MockWallet::rejecting("User rejected request");
        let result = session.connect(&rejecting, |_| {}).await;

        match result {
            Err(StarknetError::ConnectionFailed(message)) => {
                assert!(message.contains("rejected"))
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(session.account(), Some("0xa11ce"));
        assert_eq!(rejecting.enable_calls(), 1);
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let wallet = MockWallet::new("0xa11ce");
        let (mut session, _sub) = connected(&wallet).await;

        for _ in 0..3 {
            session.disconnect();
            assert!(!session.is_connected());
            assert_eq!(session.account(), None);
            assert!(matches!(session.signer(), Err(StarknetError::NotConnected)));
            assert!(matches!(session.provider(), Err(StarknetError::NotConnected)));
        }
    }

    #[tokio::test]
    async fn test_account_changes_reach_callback() {
        let wallet = MockWallet::new("0xa11ce");
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut session = WalletSession::new();
        let subscription = session
            .connect(&wallet, move |account| {
                let _ = tx.send(account);
            })
            .await
            .unwrap();

        assert!(subscription.is_active());
        assert_eq!(wallet.change_accounts(vec!["0xb0b".into(), "0xca7".into()]), 1);

        let received = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await.unwrap();
        assert_eq!(received.as_deref(), Some("0xb0b"));
        // the session keeps the account it connected with
        assert_eq!(session.account(), Some("0xa11ce"));
    }

    #[tokio::test]
    async fn test_cancelled_subscription_stops_delivery() {
        let wallet = MockWallet::new("0xa11ce");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();

        let mut session = WalletSession::new();
        let mut subscription = session
            .connect(&wallet, move |account| sink.lock().unwrap().push(account))
            .await
            .unwrap();

        subscription.cancel();
        assert!(!subscription.is_active());
        tokio::task::yield_now().await;

        wallet.change_accounts(vec!["0xb0b".into()]);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dropped_subscription_stops_delivery() {
        let wallet = MockWallet::new("0xa11ce");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();

        let mut session = WalletSession::new();
        let subscription = session
            .connect(&wallet, move |account| sink.lock().unwrap().push(account))
            .await
            .unwrap();

        drop(subscription);
        tokio::task::yield_now().await;

        wallet.change_accounts(vec!["0xb0b".into()]);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(seen.lock().unwrap().is_empty());
        assert!(session.is_connected());
    }

    #[tokio::test]
    async fn test_connect_without_accounts_keeps_session() {
        let first = MockWallet::new("0xa11ce");
        let (mut session, _sub) = connected(&first).await;

        let empty = MockWallet::with_accounts(Vec::new());
        let result = session.connect(&empty, |_| {}).await;
        assert!(matches!(result, Err(StarknetError::NoAccount)));
        assert_eq!(session.account(), Some("0xa11ce"));

        let mut fresh = WalletSession::new();
        assert!(matches!(fresh.connect(&empty, |_| {}).await, Err(StarknetError::NoAccount)));
        assert!(!fresh.is_connected());
        assert!(matches!(fresh.signer(), Err(StarknetError::NotConnected)));
    }

    #[tokio::test]
    async fn test_empty_account_change_is_skipped() {
        let wallet = MockWallet::new("0xa11ce");
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut session = WalletSession::new();
        let _subscription = session
            .connect(&wallet, move |account| {
                let _ = tx.send(account);
            })
            .await
            .unwrap();

        wallet.change_accounts(Vec::new());
        wallet.change_accounts(vec!["0xb0b".into()]);

        let received = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await.unwrap();
        assert_eq!(received.as_deref(), Some("0xb0b"));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_read_balance_from_provider() {
        let provider = crate::mock::MockProvider::new();
        provider.push_result(["0x10"]);

        let token = ContractRef::parse("0x20").unwrap();
        let balance = read_balance_from(&provider, token, "7").await.unwrap();
        assert_eq!(balance, "16");
        assert_eq!(provider.calls()[0], balance_of_request(token, "7").unwrap());
    }

    #[tokio::test]
    async fn test_invoke_transfer_requires_connection() {
        let client = SessionClient::new(contracts());
        let result = client.invoke_transfer(&WalletSession::new(), "0x1", "7", "2").await;
        assert!(matches!(result, Err(StarknetError::NotConnected)));
    }

    #[tokio::test]
    async fn test_invoke_transfer_builds_cochain_call() {
        let wallet = MockWallet::new("0xa11ce");
        wallet
            .mock_signer()
            .push_response(AddTransactionResponse::received("0xabc"));
        let (session, _sub) = connected(&wallet).await;

        let hash = SessionClient::new(contracts())
            .invoke_transfer(&session, "0xa11ce", "7", "2")
            .await
            .unwrap();
        assert_eq!(hash.as_str(), "0xabc");

        let calls = wallet.mock_signer().calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].contract_address, Felt::from_hex("0x1155").unwrap());
        assert_eq!(calls[0].entry_point, "cochain");
        assert_eq!(
            calls[0].calldata,
            vec![Felt::from_hex("0xa11ce").unwrap(), Felt::from(7u64), Felt::TWO]
        );
    }

    #[tokio::test]
    async fn test_callback_only_on_received() {
        let wallet = MockWallet::new("0xa11ce");
        wallet
            .mock_signer()
            .push_response(AddTransactionResponse::received("0xabc"))
            .push_response(AddTransactionResponse {
                code: "REJECTED".into(),
                transaction_hash: None,
                address: None,
            });
        let (session, _sub) = connected(&wallet).await;
        let client = SessionClient::new(contracts()).with_error_mode(ErrorMode::Silent);

        let mut hashes = Vec::new();
        client
            .invoke_transfer_with(&session, "0x1", "1", "1", |hash| hashes.push(hash))
            .await
            .unwrap();
        client
            .invoke_transfer_with(&session, "0x1", "1", "1", |hash| hashes.push(hash))
            .await
            .unwrap();

        assert_eq!(hashes, vec![TxHash::from("0xabc")]);
    }

    #[tokio::test]
    async fn test_rejected_status_surfaces_by_default() {
        let wallet = MockWallet::new("0xa11ce");
        wallet.mock_signer().push_response(AddTransactionResponse {
            code: "REJECTED".into(),
            transaction_hash: None,
            address: None,
        });
        let (session, _sub) = connected(&wallet).await;

        let mut called = false;
        let result = SessionClient::new(contracts())
            .invoke_transfer_with(&session, "0x1", "1", "1", |_| called = true)
            .await;

        assert!(matches!(
            result,
            Err(StarknetError::UnexpectedStatus { code }) if code == "REJECTED"
        ));
        assert!(!called);
    }

    #[tokio::test]
    async fn test_silent_mode_swallows_signer_failure() {
        let wallet = MockWallet::new("0xa11ce");
        wallet.mock_signer().push_error("User abort");
        let (session, _sub) = connected(&wallet).await;

        let mut called = false;
        SessionClient::new(contracts())
            .with_error_mode(ErrorMode::Silent)
            .invoke_transfer_with(&session, "0x1", "1", "1", |_| called = true)
            .await
            .unwrap();
        assert!(!called);
    }

    #[tokio::test]
    async fn test_read_balance() {
        let wallet = MockWallet::new("0xa11ce");
        wallet.mock_provider().push_result(["100"]);
        let (session, _sub) = connected(&wallet).await;

        let mut balance = None;
        SessionClient::new(contracts())
            .read_balance_with(&session, "0x1", |value| balance = Some(value))
            .await
            .unwrap();
        assert_eq!(balance.as_deref(), Some("100"));

        let calls = wallet.mock_provider().calls();
        assert_eq!(calls[0].contract_address, Felt::from_hex("0x20").unwrap());
        assert_eq!(calls[0].entry_point, "balanceOf");
        assert_eq!(calls[0].calldata, vec![Felt::ONE]);
    }

    #[tokio::test]
    async fn test_read_balance_converts_hex() {
        let wallet = MockWallet::new("0xa11ce");
        wallet.mock_provider().push_result(["0x3e8", "0x0"]);
        let (session, _sub) = connected(&wallet).await;

        let balance = SessionClient::new(contracts())
            .read_balance(&session, "0x1")
            .await
            .unwrap();
        assert_eq!(balance, "1000");
    }

    #[tokio::test]
    async fn test_read_balance_empty_result() {
        let wallet = MockWallet::new("0xa11ce");
        wallet.mock_provider().push_result(Vec::<String>::new());
        let (session, _sub) = connected(&wallet).await;

        let result = SessionClient::new(contracts()).read_balance(&session, "0x1").await;
        assert!(matches!(result, Err(StarknetError::EmptyResult(_))));
    }
}
