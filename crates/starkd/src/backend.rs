//! Capability traits for the wallet, signer and provider collaborators
//!
//! The session and ERC-20 components never talk to the network directly; they
//! go through these traits. [`JsonRpcProvider`](crate::rpc::JsonRpcProvider)
//! and [`GatewaySigner`](crate::signer::GatewaySigner) are the networked
//! implementations.

use crate::error::Result;
use crate::types::{AddTransactionResponse, CallResponse, FunctionCall};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Read-only contract calls
#[async_trait]
pub trait ContractProvider: Send + Sync {
    /// Executes `call` without submitting a transaction
    async fn call_contract(&self, call: &FunctionCall) -> Result<CallResponse>;
}

/// Submission of invoke transactions on behalf of an account
#[async_trait]
pub trait AccountSigner: Send + Sync {
    /// Signs and submits `call`
    async fn add_transaction(&self, call: &FunctionCall) -> Result<AddTransactionResponse>;
}

/// An injected browser wallet
#[async_trait]
pub trait WalletExtension: Send + Sync {
    /// Asks the user to connect, returning the exposed accounts
    async fn enable(&self) -> Result<Vec<String>>;

    /// Whether the wallet considers itself connected
    fn is_connected(&self) -> bool;

    /// Signer bound to the active account
    fn signer(&self) -> Arc<dyn AccountSigner>;

    /// Provider bound to the wallet's network
    fn provider(&self) -> Arc<dyn ContractProvider>;

    /// Subscribes to `accountsChanged` events
    fn accounts_changed(&self) -> broadcast::Receiver<Vec<String>>;
}
