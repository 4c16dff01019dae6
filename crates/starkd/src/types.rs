//! Contract call requests and responses

use crate::calldata::{self, parse_felt};
use crate::error::{Result, StarknetError};
use serde::{Deserialize, Serialize};
use starknet_core::types::Felt;
use std::fmt;

/// Status code the gateway uses for an accepted submission.
pub const TRANSACTION_RECEIVED: &str = "TRANSACTION_RECEIVED";

/// A deployed contract, identified by its address.
///
/// The default is the zero address, which stands for "not configured".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContractRef {
    address: Felt,
}

impl ContractRef {
    /// Wraps an already parsed address
    pub fn new(address: Felt) -> Self {
        Self { address }
    }

    /// Parses a hex or decimal address string
    pub fn parse(address: &str) -> Result<Self> {
        parse_felt(address).map(Self::new)
    }

    /// Returns the contract address
    pub fn address(&self) -> Felt {
        self.address
    }

    /// True for the zero placeholder address
    pub fn is_unset(&self) -> bool {
        self.address == Felt::ZERO
    }

    /// Builds a call to `entry_point` on this contract
    pub fn call(&self, entry_point: impl Into<String>, calldata: Vec<Felt>) -> FunctionCall {
        FunctionCall {
            contract_address: self.address,
            entry_point: entry_point.into(),
            calldata,
        }
    }
}

impl Default for ContractRef {
    fn default() -> Self {
        Self::new(Felt::ZERO)
    }
}

impl fmt::Display for ContractRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&calldata::to_hex(&self.address))
    }
}

impl Serialize for ContractRef {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ContractRef {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        ContractRef::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// A single contract invocation: target, entry point and calldata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionCall {
    /// Contract the call is addressed to
    pub contract_address: Felt,
    /// Entry point name, hashed into the selector on submission
    pub entry_point: String,
    /// Ordered arguments
    pub calldata: Vec<Felt>,
}

impl FunctionCall {
    /// Returns the selector of the entry point
    pub fn selector(&self) -> Result<Felt> {
        calldata::selector(&self.entry_point)
    }
}

/// Answer of the signer to a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddTransactionResponse {
    /// Submission status, `TRANSACTION_RECEIVED` on success
    pub code: String,
    /// Hash of the submitted transaction
    #[serde(default)]
    pub transaction_hash: Option<String>,
    /// Address of a deployed contract, for deploy transactions
    #[serde(default)]
    pub address: Option<String>,
}

impl AddTransactionResponse {
    /// Response for an accepted submission
    pub fn received(hash: impl Into<String>) -> Self {
        Self {
            code: TRANSACTION_RECEIVED.to_string(),
            transaction_hash: Some(hash.into()),
            address: None,
        }
    }

    /// True when the submission was accepted
    pub fn is_received(&self) -> bool {
        self.code == TRANSACTION_RECEIVED
    }

    /// Returns the hash of an accepted submission
    pub fn into_hash(self) -> Result<TxHash> {
        if !self.is_received() {
            return Err(StarknetError::UnexpectedStatus { code: self.code });
        }
        self.transaction_hash
            .map(TxHash::new)
            .ok_or_else(|| StarknetError::EmptyResult("transaction_hash".to_string()))
    }
}

/// Result of a read-only call: wire-encoded scalars.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallResponse {
    /// Raw result elements
    pub result: Vec<String>,
}

impl CallResponse {
    /// Wraps raw result elements
    pub fn new(result: Vec<String>) -> Self {
        Self { result }
    }

    /// Parses the first element, the only one either component reads
    pub fn first(&self, entry_point: &str) -> Result<Felt> {
        let raw = self
            .result
            .first()
            .ok_or_else(|| StarknetError::EmptyResult(entry_point.to_string()))?;
        parse_felt(raw)
    }
}

/// Represents a transaction hash
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxHash(pub String);

impl TxHash {
    /// Creates a new TxHash from a string
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    /// Returns the hash as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TxHash {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_ref_roundtrips_through_json() {
        const STRK: &str = "0x49d36570d4e46f48e99674bd3fcc84644ddd6b96f7c741b1562b82f9e004dc7";
        let contract = ContractRef::parse(STRK).unwrap();
        let json = serde_json::to_string(&contract).unwrap();
        assert_eq!(json, format!("\"{STRK}\""));
        assert_eq!(serde_json::from_str::<ContractRef>(&json).unwrap(), contract);
    }

    #[test]
    fn test_contract_ref_rejects_garbage() {
        assert!(serde_json::from_str::<ContractRef>("\"not-an-address\"").is_err());
    }

    #[test]
    fn test_received_response_yields_hash() {
        let raw = r#"{"code":"TRANSACTION_RECEIVED","transaction_hash":"0xabc"}"#;
        let response: AddTransactionResponse = serde_json::from_str(raw).unwrap();
        assert!(response.is_received());
        assert_eq!(response.into_hash().unwrap(), TxHash::from("0xabc"));
    }

    #[test]
    fn test_rejected_response_is_error() {
        let response: AddTransactionResponse =
            serde_json::from_str(r#"{"code":"REJECTED"}"#).unwrap();
        assert!(!response.is_received());
        match response.into_hash() {
            Err(StarknetError::UnexpectedStatus { code }) => assert_eq!(code, "REJECTED"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_received_without_hash() {
        let response = AddTransactionResponse {
            code: TRANSACTION_RECEIVED.into(),
            transaction_hash: None,
            address: None,
        };
        assert!(matches!(response.into_hash(), Err(StarknetError::EmptyResult(_))));
    }

    #[test]
    fn test_call_response_first() {
        let response = CallResponse::new(vec!["0x64".into(), "0x0".into()]);
        assert_eq!(response.first("allowance").unwrap(), Felt::from(100u64));
        assert!(matches!(
            CallResponse::default().first("balanceOf"),
            Err(StarknetError::EmptyResult(name)) if name == "balanceOf"
        ));
    }

    #[test]
    fn test_function_call_selector() {
        let call = ContractRef::new(Felt::ONE).call("balanceOf", vec![Felt::TWO]);
        assert_eq!(call.selector().unwrap(), calldata::selector("balanceOf").unwrap());
        assert_eq!(call.contract_address, Felt::ONE);
    }
}
