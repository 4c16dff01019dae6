//! JSON-RPC backed contract provider

use crate::backend::ContractProvider;
use crate::calldata::to_hex;
use crate::error::Result;
use crate::types::{CallResponse, FunctionCall};
use async_trait::async_trait;
use serde::Serialize;
use starkd_provider::{ProviderConfig, RpcClient};

#[derive(Debug, Clone, Serialize)]
struct RpcFunctionCall {
    contract_address: String,
    entry_point_selector: String,
    calldata: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
struct CallParams {
    request: RpcFunctionCall,
    block_id: &'static str,
}

/// Provider that executes calls through `starknet_call`
#[derive(Debug)]
pub struct JsonRpcProvider {
    client: RpcClient,
    url: String,
}

impl JsonRpcProvider {
    /// Creates a provider for the configured endpoint
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        config.validate()?;
        let client = RpcClient::from_config(config)?;
        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }

    /// Returns the endpoint URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Whether requests to the endpoint are throttled
    pub fn is_rate_limited(&self) -> bool {
        self.client.is_rate_limited()
    }
}

#[async_trait]
impl ContractProvider for JsonRpcProvider {
    async fn call_contract(&self, call: &FunctionCall) -> Result<CallResponse> {
        let params = CallParams {
            request: RpcFunctionCall {
                contract_address: to_hex(&call.contract_address),
                entry_point_selector: to_hex(&call.selector()?),
                calldata: call.calldata.iter().map(to_hex).collect(),
            },
            block_id: "latest",
        };

        tracing::debug!(
            entry_point = %call.entry_point,
            contract = %params.request.contract_address,
            "starknet_call"
        );
        let result: Vec<String> =
            self.client.rpc_call(&self.url, "starknet_call", params).await?;
        Ok(CallResponse::new(result))
    }
}
