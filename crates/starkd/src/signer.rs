//! Local-key signer that submits invokes to the sequencer gateway
//!
//! Calls are routed through the account contract's `__execute__` with the
//! single-call array layout `[1, to, selector, 0, n, n, ...calldata, nonce]`.
//! Version 0 accounts track their own nonce, so it is read from the account's
//! `get_nonce` view before every submission. The transaction hash follows the
//! version 0 invoke scheme:
//!
//! ```text
//! h("invoke", 0, account, selector("__execute__"), h(calldata), max_fee, chain_id)
//! ```
//!
//! where `h` is the Pedersen hash chain over the elements followed by their
//! count.

use crate::backend::{AccountSigner, ContractProvider};
use crate::calldata::{parse_felt, selector, to_hex};
use crate::config::NetworkConfig;
use crate::error::{Result, StarknetError};
use crate::rpc::JsonRpcProvider;
use crate::types::{AddTransactionResponse, ContractRef, FunctionCall};
use async_trait::async_trait;
use serde::Serialize;
use starkd_provider::RpcClient;
use starknet_core::crypto::ecdsa_sign;
use starknet_core::types::Felt;
use starknet_core::utils::cairo_short_string_to_felt;
use starknet_crypto::{get_public_key, pedersen_hash};
use std::fmt;
use std::sync::Arc;

const EXECUTE_ENTRY_POINT: &str = "__execute__";

/// Nonce getter of version 0 account contracts.
pub const GET_NONCE_ENTRY_POINT: &str = "get_nonce";

/// Pedersen hash chain over `data`, closed with its length.
pub fn hash_on_elements(data: &[Felt]) -> Felt {
    let acc = data.iter().fold(Felt::ZERO, |acc, item| pedersen_hash(&acc, item));
    pedersen_hash(&acc, &Felt::from(data.len() as u64))
}

/// Account calldata executing a single `call` at `nonce`.
pub fn execute_calldata(call: &FunctionCall, nonce: Felt) -> Result<Vec<Felt>> {
    let len = Felt::from(call.calldata.len() as u64);
    let mut calldata = vec![
        Felt::ONE,
        call.contract_address,
        call.selector()?,
        Felt::ZERO,
        len,
        len,
    ];
    calldata.extend_from_slice(&call.calldata);
    calldata.push(nonce);
    Ok(calldata)
}

/// A fully signed invoke, ready for the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedInvoke {
    /// Account contract receiving the call
    pub contract_address: Felt,
    /// Selector of `__execute__`
    pub entry_point_selector: Felt,
    /// Account calldata
    pub calldata: Vec<Felt>,
    /// Fee cap
    pub max_fee: Felt,
    /// Hash that was signed
    pub transaction_hash: Felt,
    /// `[r, s]`
    pub signature: [Felt; 2],
}

#[derive(Debug, Serialize)]
struct GatewayInvoke {
    #[serde(rename = "type")]
    kind: &'static str,
    contract_address: String,
    entry_point_selector: String,
    calldata: Vec<String>,
    signature: Vec<String>,
    max_fee: String,
    version: &'static str,
}

impl From<&SignedInvoke> for GatewayInvoke {
    fn from(invoke: &SignedInvoke) -> Self {
        Self {
            kind: "INVOKE_FUNCTION",
            contract_address: to_hex(&invoke.contract_address),
            entry_point_selector: to_hex(&invoke.entry_point_selector),
            calldata: invoke.calldata.iter().map(|f| f.to_string()).collect(),
            signature: invoke.signature.iter().map(|f| f.to_string()).collect(),
            max_fee: to_hex(&invoke.max_fee),
            version: "0x0",
        }
    }
}

/// Signs invokes with a local private key and posts them to the gateway
pub struct GatewaySigner {
    client: RpcClient,
    provider: Arc<dyn ContractProvider>,
    gateway_url: String,
    account: Felt,
    private_key: Felt,
    chain_id: Felt,
    max_fee: Felt,
}

impl GatewaySigner {
    /// Creates a signer for `account_address` on `network`, reading nonces
    /// over the network's JSON-RPC endpoint
    pub fn new(private_key: &str, account_address: &str, network: &NetworkConfig) -> Result<Self> {
        let provider = JsonRpcProvider::new(&network.provider_config())?;
        Self::with_provider(private_key, account_address, network, Arc::new(provider))
    }

    /// Creates a signer that reads nonces through `provider`
    pub fn with_provider(
        private_key: &str,
        account_address: &str,
        network: &NetworkConfig,
        provider: Arc<dyn ContractProvider>,
    ) -> Result<Self> {
        let private_key = parse_felt(private_key).map_err(|_| {
            StarknetError::SigningError("private key is not a valid felt".to_string())
        })?;
        if private_key == Felt::ZERO {
            return Err(StarknetError::SigningError("private key is zero".to_string()));
        }

        let client = RpcClient::from_config(&network.provider_config())?;

        Ok(Self {
            client,
            provider,
            gateway_url: network.gateway_url.trim_end_matches('/').to_string(),
            account: parse_felt(account_address)?,
            private_key,
            chain_id: network.chain_id_felt()?,
            max_fee: Felt::from(network.max_fee),
        })
    }

    /// Account contract address
    pub fn account(&self) -> Felt {
        self.account
    }

    /// Stark public key of the signing key
    pub fn public_key(&self) -> Felt {
        get_public_key(&self.private_key)
    }

    /// Reads the account's current nonce
    pub async fn nonce(&self) -> Result<Felt> {
        let call = ContractRef::new(self.account).call(GET_NONCE_ENTRY_POINT, Vec::new());
        let response = self.provider.call_contract(&call).await?;
        response.first(GET_NONCE_ENTRY_POINT)
    }

    /// Computes the invoke hash for account calldata
    pub fn transaction_hash(&self, calldata: &[Felt]) -> Result<Felt> {
        let prefix = cairo_short_string_to_felt("invoke")
            .map_err(|e| StarknetError::SigningError(e.to_string()))?;

        Ok(hash_on_elements(&[
            prefix,
            Felt::ZERO,
            self.account,
            selector(EXECUTE_ENTRY_POINT)?,
            hash_on_elements(calldata),
            self.max_fee,
            self.chain_id,
        ]))
    }

    /// Wraps and signs `call` at `nonce` without submitting it
    pub fn sign(&self, call: &FunctionCall, nonce: Felt) -> Result<SignedInvoke> {
        let calldata = execute_calldata(call, nonce)?;
        let transaction_hash = self.transaction_hash(&calldata)?;
        let signature = ecdsa_sign(&self.private_key, &transaction_hash)
            .map_err(|e| StarknetError::SigningError(e.to_string()))?;

        Ok(SignedInvoke {
            contract_address: self.account,
            entry_point_selector: selector(EXECUTE_ENTRY_POINT)?,
            calldata,
            max_fee: self.max_fee,
            transaction_hash,
            signature: [signature.r, signature.s],
        })
    }
}

impl fmt::Debug for GatewaySigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewaySigner")
            .field("gateway_url", &self.gateway_url)
            .field("account", &to_hex(&self.account))
            .field("private_key", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl AccountSigner for GatewaySigner {
    async fn add_transaction(&self, call: &FunctionCall) -> Result<AddTransactionResponse> {
        let nonce = self.nonce().await?;
        let invoke = self.sign(call, nonce)?;
        tracing::debug!(
            entry_point = %call.entry_point,
            %nonce,
            transaction_hash = %to_hex(&invoke.transaction_hash),
            "Submitting invoke"
        );

        let url = format!("{}/add_transaction", self.gateway_url);
        let response: AddTransactionResponse =
            self.client.post_json(&url, GatewayInvoke::from(&invoke)).await?;
        Ok(response)
    }
}
