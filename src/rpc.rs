// src/rpc.rs
//! Minimal typed Solana JSON-RPC client: signature listing and transaction
//! detail, the only two calls the monitor consumes.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::MonitorError;

/// One entry of a `getSignaturesForAddress` response, newest first.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SignatureInfo {
    pub signature: String,
    #[allow(dead_code)]
    pub slot: u64,
    /// Non-null when the transaction itself failed on chain.
    #[serde(default)]
    pub err: Option<Value>,
    #[serde(default)]
    pub block_time: Option<i64>,
}

/// `getTransaction` result with `jsonParsed` encoding.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDetail {
    #[allow(dead_code)]
    pub slot: u64,
    #[serde(default)]
    pub block_time: Option<i64>,
    #[serde(default)]
    pub meta: Option<TxMeta>,
    pub transaction: TxPayload,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TxMeta {
    #[serde(default)]
    pub err: Option<Value>,
    #[serde(default)]
    pub pre_balances: Vec<u64>,
    #[serde(default)]
    pub post_balances: Vec<u64>,
    #[serde(default)]
    pub inner_instructions: Option<Vec<InnerInstructions>>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InnerInstructions {
    #[allow(dead_code)]
    pub index: u64,
    #[serde(default)]
    pub instructions: Vec<Instruction>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TxPayload {
    pub message: TxMessage,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TxMessage {
    #[serde(default)]
    pub account_keys: Vec<AccountKey>,
    #[serde(default)]
    pub instructions: Vec<Instruction>,
}

/// `accountKeys` entries are objects under `jsonParsed` but plain strings
/// under the legacy encodings; accept both.
#[derive(Debug, Deserialize, Clone)]
#[serde(untagged)]
pub enum AccountKey {
    Parsed { pubkey: String },
    Plain(String),
}

impl AccountKey {
    pub fn pubkey(&self) -> &str {
        match self {
            Self::Parsed { pubkey } => pubkey,
            Self::Plain(pubkey) => pubkey,
        }
    }
}

/// A message instruction: fully parsed when the RPC node knows the program,
/// otherwise partially decoded with resolved accounts and base58 data.
#[derive(Debug, Deserialize, Clone)]
#[serde(untagged)]
pub enum Instruction {
    Parsed(ParsedInstruction),
    Raw(RawInstruction),
}

#[derive(Debug, Deserialize, Clone)]
pub struct ParsedInstruction {
    #[serde(default)]
    pub program: Option<String>,
    /// `{type, info}` object for known programs; left untyped because the
    /// shape varies per instruction kind.
    pub parsed: Value,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RawInstruction {
    pub program_id: String,
    #[serde(default)]
    pub accounts: Vec<String>,
    #[serde(default)]
    pub data: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// The two upstream queries the monitor needs. Production uses
/// [`HttpLedgerRpc`]; tests inject a fake.
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    /// Signatures for `address`, newest first, strictly newer than `until`,
    /// at most `limit` entries.
    async fn signatures_for_address(
        &self,
        address: &str,
        until: Option<&str>,
        limit: usize,
    ) -> Result<Vec<SignatureInfo>, MonitorError>;

    /// Full transaction detail; `None` when the node does not have it.
    async fn transaction_detail(
        &self,
        signature: &str,
    ) -> Result<Option<TransactionDetail>, MonitorError>;
}

pub struct HttpLedgerRpc {
    client: Client,
    url: String,
}

impl HttpLedgerRpc {
    pub fn new(url: &str) -> Result<Self, MonitorError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<Option<T>, MonitorError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        debug!(method, url = %self.url, "sending rpc request");

        let resp = self.client.post(&self.url).json(&payload).send().await?;
        if resp.status() != StatusCode::OK {
            return Err(MonitorError::Rpc(format!(
                "{} returned HTTP {}",
                method,
                resp.status()
            )));
        }

        let body: RpcResponse<T> = resp
            .json()
            .await
            .map_err(|e| MonitorError::Rpc(format!("{} response parse failed: {}", method, e)))?;

        if let Some(err) = body.error {
            return Err(MonitorError::Rpc(format!(
                "{} failed: {} (code {})",
                method, err.message, err.code
            )));
        }
        Ok(body.result)
    }
}

#[async_trait]
impl LedgerRpc for HttpLedgerRpc {
    async fn signatures_for_address(
        &self,
        address: &str,
        until: Option<&str>,
        limit: usize,
    ) -> Result<Vec<SignatureInfo>, MonitorError> {
        let mut options = json!({
            "limit": limit,
            "commitment": "confirmed",
        });
        if let Some(until) = until {
            options["until"] = json!(until);
        }

        let result: Option<Vec<SignatureInfo>> = self
            .call("getSignaturesForAddress", json!([address, options]))
            .await?;
        Ok(result.unwrap_or_default())
    }

    async fn transaction_detail(
        &self,
        signature: &str,
    ) -> Result<Option<TransactionDetail>, MonitorError> {
        self.call(
            "getTransaction",
            json!([signature, {
                "encoding": "jsonParsed",
                "commitment": "confirmed",
                "maxSupportedTransactionVersion": 0,
            }]),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_parsed_transaction_detail() {
        let raw = r#"{
            "slot": 12345,
            "blockTime": 1700000000,
            "meta": {
                "err": null,
                "preBalances": [5000000000, 0],
                "postBalances": [3999995000, 1000000000],
                "innerInstructions": []
            },
            "transaction": {
                "message": {
                    "accountKeys": [
                        {"pubkey": "SourceAcc", "signer": true, "writable": true},
                        {"pubkey": "DestAcc", "signer": false, "writable": true}
                    ],
                    "instructions": [
                        {
                            "program": "system",
                            "programId": "11111111111111111111111111111111",
                            "parsed": {
                                "type": "transfer",
                                "info": {
                                    "source": "SourceAcc",
                                    "destination": "DestAcc",
                                    "lamports": 1000000000
                                }
                            }
                        }
                    ]
                }
            }
        }"#;

        let detail: TransactionDetail = serde_json::from_str(raw).expect("parses");
        let meta = detail.meta.as_ref().expect("meta present");
        assert!(meta.err.is_none());
        assert_eq!(meta.pre_balances, vec![5_000_000_000, 0]);
        assert_eq!(detail.transaction.message.account_keys[1].pubkey(), "DestAcc");
        assert!(matches!(
            detail.transaction.message.instructions[0],
            Instruction::Parsed(_)
        ));
    }

    #[test]
    fn deserializes_partially_decoded_instruction() {
        let raw = r#"{
            "programId": "11111111111111111111111111111111",
            "accounts": ["SourceAcc", "DestAcc"],
            "data": "3Bxs4NN8M2Yn4TLb"
        }"#;

        let instruction: Instruction = serde_json::from_str(raw).expect("parses");
        match instruction {
            Instruction::Raw(raw) => {
                assert_eq!(raw.accounts.len(), 2);
                assert!(!raw.data.is_empty());
            }
            Instruction::Parsed(_) => panic!("expected raw variant"),
        }
    }

    #[test]
    fn account_keys_accept_plain_strings() {
        let raw = r#"["SourceAcc", "DestAcc"]"#;
        let keys: Vec<AccountKey> = serde_json::from_str(raw).expect("parses");
        assert_eq!(keys[0].pubkey(), "SourceAcc");
    }

    #[test]
    fn signature_listing_entry_carries_err() {
        let raw = r#"{
            "signature": "sig1",
            "slot": 100,
            "err": {"InstructionError": [0, "Custom"]},
            "blockTime": 1700000000
        }"#;

        let info: SignatureInfo = serde_json::from_str(raw).expect("parses");
        assert!(info.err.is_some());
        assert_eq!(info.signature, "sig1");
    }
}
