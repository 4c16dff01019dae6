//! Server-side ERC-20 client
//!
//! Builds and submits the two token calls the backend needs: a `transfer`
//! signed by the service account and a read-only `allowance` query.

use crate::backend::{AccountSigner, ContractProvider};
use crate::calldata::{
    compile_calldata, parse_felt, scale_amount, uint256_calldata, TOKEN_DECIMALS,
};
use crate::config::{ErrorMode, NetworkConfig};
use crate::error::{Result, StarknetError};
use crate::rpc::JsonRpcProvider;
use crate::signer::GatewaySigner;
use crate::types::{ContractRef, FunctionCall, TxHash};
use starknet_core::types::Felt;
use std::sync::Arc;

/// Token transfer entry point.
pub const TRANSFER_ENTRY_POINT: &str = "transfer";

/// Allowance getter entry point.
pub const ALLOWANCE_ENTRY_POINT: &str = "allowance";

/// Client for one ERC-20 contract, acting as one account
pub struct Erc20Client {
    contract: ContractRef,
    provider: Arc<dyn ContractProvider>,
    signer: Option<Arc<dyn AccountSigner>>,
    decimals: u32,
    error_mode: ErrorMode,
}

impl Erc20Client {
    /// Creates a client that reads over JSON-RPC and signs with `account_key`
    pub fn new(
        account_key: &str,
        network: &NetworkConfig,
        account_address: &str,
        contract: ContractRef,
    ) -> Result<Self> {
        let provider: Arc<dyn ContractProvider> =
            Arc::new(JsonRpcProvider::new(&network.provider_config())?);
        let signer =
            GatewaySigner::with_provider(account_key, account_address, network, provider.clone())?;
        tracing::debug!(network = %network.network, %contract, "ERC-20 client ready");
        Ok(Self::with_backends(contract, provider, Arc::new(signer)))
    }

    /// Creates a client that can only read, e.g. for `allowance`
    pub fn read_only(network: &NetworkConfig, contract: ContractRef) -> Result<Self> {
        let provider = JsonRpcProvider::new(&network.provider_config())?;
        Ok(Self {
            contract,
            provider: Arc::new(provider),
            signer: None,
            decimals: TOKEN_DECIMALS,
            error_mode: ErrorMode::default(),
        })
    }

    /// Creates a client over arbitrary backends
    pub fn with_backends(
        contract: ContractRef,
        provider: Arc<dyn ContractProvider>,
        signer: Arc<dyn AccountSigner>,
    ) -> Self {
        Self {
            contract,
            provider,
            signer: Some(signer),
            decimals: TOKEN_DECIMALS,
            error_mode: ErrorMode::default(),
        }
    }

    /// Overrides the token precision used to scale transfer amounts
    pub fn with_decimals(mut self, decimals: u32) -> Self {
        self.decimals = decimals;
        self
    }

    /// Sets how the `_settled` variants treat failures
    pub fn with_error_mode(mut self, error_mode: ErrorMode) -> Self {
        self.error_mode = error_mode;
        self
    }

    /// Token contract
    pub fn contract(&self) -> ContractRef {
        self.contract
    }

    /// `transfer(recipient, amount × 10^decimals as Uint256)`.
    ///
    /// `amount` is a decimal token amount such as `"5"` or `"0.25"`.
    pub fn transfer_request(&self, recipient: &str, amount: &str) -> Result<FunctionCall> {
        let [low, high] = uint256_calldata(scale_amount(amount, self.decimals)?);
        Ok(self
            .contract
            .call(TRANSFER_ENTRY_POINT, vec![parse_felt(recipient)?, low, high]))
    }

    /// `allowance(owner, spender)`
    pub fn allowance_request(&self, owner: &str, spender: &str) -> Result<FunctionCall> {
        let calldata = compile_calldata(&[("owner", owner), ("spender", spender)])?;
        Ok(self.contract.call(ALLOWANCE_ENTRY_POINT, calldata))
    }

    /// Transfers `amount` tokens to `recipient`
    pub async fn transfer(&self, recipient: &str, amount: &str) -> Result<TxHash> {
        let signer = self
            .signer
            .as_ref()
            .ok_or_else(|| StarknetError::SigningError("client has no account key".to_string()))?;
        let call = self.transfer_request(recipient, amount)?;
        let response = signer.add_transaction(&call).await?;
        let hash = response.into_hash()?;
        tracing::info!(%recipient, %amount, %hash, "Transfer submitted");
        Ok(hash)
    }

    /// Amount `spender` may still move on behalf of `owner`, in base units
    pub async fn allowance(&self, owner: &str, spender: &str) -> Result<Felt> {
        let call = self.allowance_request(owner, spender)?;
        let response = self.provider.call_contract(&call).await?;
        response.first(ALLOWANCE_ENTRY_POINT)
    }

    /// [`transfer`](Self::transfer) under the configured [`ErrorMode`]
    pub async fn transfer_settled(
        &self,
        recipient: &str,
        amount: &str,
    ) -> Result<Option<TxHash>> {
        let outcome = self.transfer(recipient, amount).await;
        self.error_mode.settle(TRANSFER_ENTRY_POINT, outcome)
    }

    /// [`allowance`](Self::allowance) under the configured [`ErrorMode`]
    pub async fn allowance_settled(&self, owner: &str, spender: &str) -> Result<Option<Felt>> {
        let outcome = self.allowance(owner, spender).await;
        self.error_mode.settle(ALLOWANCE_ENTRY_POINT, outcome)
    }
}

impl std::fmt::Debug for Erc20Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Erc20Client")
            .field("contract", &self.contract.to_string())
            .field("decimals", &self.decimals)
            .field("can_sign", &self.signer.is_some())
            .field("error_mode", &self.error_mode)
            .finish()
    }
}
