//! # Starkd
//!
//! StarkNet integration for game front ends and their backends.
//!
//! Two independent components share the same call types:
//!
//! - [`session`]: a caller-owned [`WalletSession`] established through an
//!   injected wallet, and a [`SessionClient`] that invokes `cochain` on the
//!   multi-token contract and reads `balanceOf` on the fungible token.
//! - [`erc20`]: an [`Erc20Client`] that signs `transfer` with a local account
//!   key and queries `allowance` over JSON-RPC.
//!
//! The wallet, signer and provider are reached through the traits in
//! [`backend`]. Selector hashing, Pedersen and ECDSA come from `starknet-core`
//! and `starknet-crypto`.
//!
//! ## Example
//!
//! ```ignore
//! use starkd::prelude::*;
//!
//! let network = Network::Sepolia.config();
//! let token = ContractRef::parse(STRK_TOKEN)?;
//! let client = Erc20Client::new(&key, &network, &account, token)?;
//!
//! let hash = client.transfer("0x2", "0.5").await?;
//! let allowance = client.allowance("0x1", "0x2").await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod backend;
pub mod calldata;
pub mod config;
pub mod erc20;
pub mod error;
pub mod rpc;
pub mod session;
pub mod signer;
pub mod types;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use config::{ContractSet, ErrorMode, Network, NetworkConfig, StarkdConfig};
pub use erc20::Erc20Client;
pub use error::{Result, StarknetError};
pub use session::{AccountSubscription, SessionClient, WalletSession};
pub use starkd_provider::RateLimitConfig;
pub use starknet_core::types::Felt;
pub use types::{AddTransactionResponse, CallResponse, ContractRef, FunctionCall, TxHash};

/// Exposes commonly used types when working with Starkd.
pub mod prelude {
    pub use super::backend::{AccountSigner, ContractProvider, WalletExtension};
    pub use super::config::{ContractSet, ErrorMode, Network, NetworkConfig, StarkdConfig};
    pub use super::erc20::Erc20Client;
    pub use super::error::{Result, StarknetError};
    pub use super::rpc::JsonRpcProvider;
    pub use super::session::{AccountSubscription, SessionClient, WalletSession};
    pub use super::signer::GatewaySigner;
    pub use super::types::{ContractRef, FunctionCall, TxHash};
    pub use super::Felt;
}
