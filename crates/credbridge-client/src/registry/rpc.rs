//! Ethereum JSON-RPC implementation of [`CredentialLedger`].
//!
//! ## Write path
//!
//! 1. `eth_getTransactionCount(signer, "pending")` for the nonce
//! 2. `eth_gasPrice`
//! 3. `eth_estimateGas`, padded by 20%; a revert here surfaces as
//!    [`ClientError::Reverted`] before anything is broadcast
//! 4. sign a legacy EIP-155 transaction and `eth_sendRawTransaction`
//! 5. poll `eth_getTransactionReceipt` until mined or the receipt timeout
//!
//! Steps 1-4 run under a process-wide lock so concurrent writes never race
//! for the same nonce. Step 4 is never retried.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use credbridge_core::CredentialHash;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use super::abi::{self, Token};
use super::signer::{LegacyTransaction, TransactionSigner};
use super::{
    Address, CredentialLedger, OnchainCredential, RegistryEvent, StoreCredentialRequest,
    TxReceipt,
};
use crate::config::RegistryConfig;
use crate::error::ClientError;

/// JSON-RPC error code geth and anvil use for execution reverts.
const REVERT_ERROR_CODE: i64 = 3;

#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    transaction_hash: String,
    #[serde(default)]
    block_number: Option<String>,
    #[serde(default)]
    gas_used: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    logs: Vec<RawLog>,
}

#[derive(Debug, Deserialize)]
struct RawLog {
    address: String,
    #[serde(default)]
    topics: Vec<String>,
    #[serde(default)]
    data: String,
}

/// Registry client over Ethereum JSON-RPC.
#[derive(Debug)]
pub struct RpcRegistry {
    http: reqwest::Client,
    config: RegistryConfig,
    signer: Option<TransactionSigner>,
    next_id: AtomicU64,
    send_lock: tokio::sync::Mutex<()>,
}

impl RpcRegistry {
    /// Build a client from configuration. Fails if the configured private
    /// key is not a usable secp256k1 key.
    pub fn new(config: RegistryConfig) -> Result<Self, ClientError> {
        let http = crate::http_client(config.timeout_secs)?;
        let signer = config
            .private_key
            .as_ref()
            .map(TransactionSigner::from_secret)
            .transpose()?;
        Ok(Self {
            http,
            config,
            signer,
            next_id: AtomicU64::new(1),
            send_lock: tokio::sync::Mutex::new(()),
        })
    }

    /// The configuration this client was built from.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    fn signer(&self) -> Result<&TransactionSigner, ClientError> {
        self.signer.as_ref().ok_or(ClientError::MissingSigner)
    }

    /// Issue one JSON-RPC request. `idempotent` requests are retried on
    /// transport failure.
    async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
        idempotent: bool,
    ) -> Result<T, ClientError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": self.next_id.fetch_add(1, Ordering::Relaxed),
            "method": method,
            "params": params,
        });
        let url = self.config.rpc_url.clone();
        let send = || self.http.post(url.clone()).json(&body).send();

        let result = if idempotent {
            crate::retry::retry_send(send).await
        } else {
            send().await
        };
        let resp = result.map_err(|e| ClientError::Http {
            endpoint: method.into(),
            source: e,
        })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Api {
                endpoint: method.into(),
                status,
                body,
            });
        }

        let envelope: RpcEnvelope =
            resp.json()
                .await
                .map_err(|e| ClientError::Deserialization {
                    endpoint: method.into(),
                    source: e,
                })?;

        if let Some(err) = envelope.error {
            let message = match err.data {
                Some(Value::String(data)) if !data.is_empty() => {
                    format!("{} ({data})", err.message)
                }
                _ => err.message,
            };
            return Err(ClientError::Rpc {
                method: method.into(),
                code: err.code,
                message,
            });
        }

        serde_json::from_value(envelope.result.unwrap_or(Value::Null)).map_err(|e| {
            ClientError::UnexpectedResult {
                method: method.into(),
                detail: e.to_string(),
            }
        })
    }

    async fn quantity(&self, method: &str, params: Value) -> Result<u128, ClientError> {
        let raw: String = self.request(method, params, true).await?;
        parse_quantity(method, &raw)
    }

    /// `eth_call` against the registry at the latest block.
    async fn call(&self, function: &str, args: &[Token<'_>]) -> Result<Vec<u8>, ClientError> {
        let data = abi::encode_call(function, args);
        let params = json!([
            { "to": self.config.registry_address.to_string(), "data": abi::encode_hex(&data) },
            "latest"
        ]);
        let raw: String = self
            .request("eth_call", params, true)
            .await
            .map_err(|e| as_revert(e, function))?;
        Ok(abi::decode_hex(&raw)?)
    }

    /// Sign, broadcast, and wait for a registry write.
    async fn transact(&self, function: &str, data: Vec<u8>) -> Result<TxReceipt, ClientError> {
        let signer = self.signer()?;
        let from = signer.address().to_string();
        let to = self.config.registry_address;

        let tx_hash = {
            let _guard = self.send_lock.lock().await;

            let nonce = self
                .quantity("eth_getTransactionCount", json!([from, "pending"]))
                .await?;
            let gas_price = self.quantity("eth_gasPrice", json!([])).await?;
            let estimate = self
                .quantity(
                    "eth_estimateGas",
                    json!([{ "from": from, "to": to.to_string(), "data": abi::encode_hex(&data) }]),
                )
                .await
                .map_err(|e| as_revert(e, function))?;

            let tx = LegacyTransaction {
                nonce: u64::try_from(nonce).map_err(|_| ClientError::UnexpectedResult {
                    method: "eth_getTransactionCount".into(),
                    detail: format!("nonce {nonce} out of range"),
                })?,
                gas_price,
                gas_limit: pad_gas(estimate),
                to,
                value: 0,
                data,
            };
            let raw = signer.sign_legacy(&tx, self.config.chain_id)?;

            let tx_hash: String = self
                .request(
                    "eth_sendRawTransaction",
                    json!([abi::encode_hex(&raw)]),
                    false,
                )
                .await
                .map_err(|e| as_revert(e, function))?;
            tracing::info!(
                function,
                tx_hash = %tx_hash,
                nonce = tx.nonce,
                gas_limit = tx.gas_limit,
                "registry transaction submitted"
            );
            tx_hash
        };

        self.wait_for_receipt(&tx_hash).await
    }

    async fn wait_for_receipt(&self, tx_hash: &str) -> Result<TxReceipt, ClientError> {
        let poll = Duration::from_millis(self.config.receipt_poll_ms);
        let deadline = Instant::now() + Duration::from_secs(self.config.receipt_timeout_secs);

        loop {
            let receipt: Option<RawReceipt> = self
                .request("eth_getTransactionReceipt", json!([tx_hash]), true)
                .await?;
            if let Some(receipt) = receipt {
                return self.finish_receipt(receipt);
            }
            if Instant::now() >= deadline {
                return Err(ClientError::ReceiptTimeout {
                    tx_hash: tx_hash.to_string(),
                    waited_secs: self.config.receipt_timeout_secs,
                });
            }
            tokio::time::sleep(poll).await;
        }
    }

    fn finish_receipt(&self, receipt: RawReceipt) -> Result<TxReceipt, ClientError> {
        const METHOD: &str = "eth_getTransactionReceipt";
        if receipt.status.as_deref().is_some_and(|s| {
            parse_quantity(METHOD, s).map(|v| v == 0).unwrap_or(false)
        }) {
            return Err(ClientError::TransactionFailed {
                tx_hash: receipt.transaction_hash,
            });
        }

        let optional_u64 = |raw: &Option<String>| -> Result<Option<u64>, ClientError> {
            raw.as_deref()
                .map(|s| parse_quantity(METHOD, s).map(|v| v as u64))
                .transpose()
        };
        let block_number = optional_u64(&receipt.block_number)?;
        let gas_used = optional_u64(&receipt.gas_used)?;

        let events = receipt
            .logs
            .iter()
            .filter_map(|log| match decode_log(log, &self.config.registry_address) {
                Ok(event) => event,
                Err(e) => {
                    tracing::debug!(error = %e, "skipping undecodable registry log");
                    None
                }
            })
            .collect();

        tracing::info!(
            tx_hash = %receipt.transaction_hash,
            block_number,
            gas_used,
            "registry transaction mined"
        );

        Ok(TxReceipt {
            transaction_hash: receipt.transaction_hash,
            block_number,
            gas_used,
            events,
        })
    }
}

#[async_trait]
impl CredentialLedger for RpcRegistry {
    async fn store_credential(
        &self,
        request: &StoreCredentialRequest,
    ) -> Result<TxReceipt, ClientError> {
        let data = abi::encode_call(
            abi::STORE_CREDENTIAL,
            &[
                Token::FixedBytes32(request.credential_hash.as_bytes()),
                Token::Str(&request.metadata),
                Token::Str(&request.subject_did),
                Token::Str(&request.issuer_name),
                Token::Str(&request.issuer_did),
            ],
        );
        self.transact(abi::STORE_CREDENTIAL, data).await
    }

    async fn set_credential_status(
        &self,
        credential_hash: &CredentialHash,
        active: bool,
    ) -> Result<TxReceipt, ClientError> {
        let data = abi::encode_call(
            abi::SET_CREDENTIAL_STATUS,
            &[
                Token::FixedBytes32(credential_hash.as_bytes()),
                Token::Bool(active),
            ],
        );
        self.transact(abi::SET_CREDENTIAL_STATUS, data).await
    }

    async fn get_credential(
        &self,
        credential_hash: &CredentialHash,
    ) -> Result<Option<OnchainCredential>, ClientError> {
        let output = match self
            .call(
                abi::GET_CREDENTIAL,
                &[Token::FixedBytes32(credential_hash.as_bytes())],
            )
            .await
        {
            Ok(output) => output,
            Err(e) if e.is_revert() => return Ok(None),
            Err(e) => return Err(e),
        };
        let (metadata, subject_did, issuer_name, issuer_did, active) =
            abi::decode_credential_tuple(&output)?;
        Ok(Some(OnchainCredential {
            metadata,
            subject_did,
            issuer_name,
            issuer_did,
            active,
        }))
    }

    async fn metadata_of(&self, credential_hash: &CredentialHash) -> Result<String, ClientError> {
        let output = self
            .call(
                abi::METADATA_OF,
                &[Token::FixedBytes32(credential_hash.as_bytes())],
            )
            .await?;
        Ok(abi::decode_string(&output)?)
    }

    async fn exists(&self, credential_hash: &CredentialHash) -> Result<bool, ClientError> {
        let output = self
            .call(abi::EXISTS, &[Token::FixedBytes32(credential_hash.as_bytes())])
            .await?;
        Ok(abi::decode_bool(&output)?)
    }

    async fn is_active(&self, credential_hash: &CredentialHash) -> Result<bool, ClientError> {
        let output = self
            .call(
                abi::IS_ACTIVE,
                &[Token::FixedBytes32(credential_hash.as_bytes())],
            )
            .await?;
        Ok(abi::decode_bool(&output)?)
    }

    async fn credentials_of_subject(
        &self,
        subject_did: &str,
    ) -> Result<Vec<CredentialHash>, ClientError> {
        let output = self
            .call(abi::CREDENTIALS_OF_SUBJECT, &[Token::Str(subject_did)])
            .await?;
        Ok(abi::decode_bytes32_array(&output)?
            .into_iter()
            .map(CredentialHash::from_bytes)
            .collect())
    }

    async fn signer_address(&self) -> Result<Address, ClientError> {
        Ok(self.signer()?.address())
    }

    fn registry_address(&self) -> Address {
        self.config.registry_address
    }

    fn endpoint(&self) -> String {
        self.config.rpc_url.to_string()
    }
}

/// Reclassify an RPC error as a revert of `function` when the node reports
/// one.
fn as_revert(err: ClientError, function: &str) -> ClientError {
    match err {
        ClientError::Rpc { code, message, .. }
            if code == REVERT_ERROR_CODE || message.to_ascii_lowercase().contains("revert") =>
        {
            ClientError::Reverted {
                function: function.to_string(),
                reason: message,
            }
        }
        other => other,
    }
}

/// Gas estimate plus 20% headroom.
fn pad_gas(estimate: u128) -> u64 {
    let padded = estimate.saturating_add(estimate / 5);
    u64::try_from(padded).unwrap_or(u64::MAX)
}

fn parse_quantity(method: &str, raw: &str) -> Result<u128, ClientError> {
    let digits = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .unwrap_or(raw);
    if digits.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(digits, 16).map_err(|_| ClientError::UnexpectedResult {
        method: method.into(),
        detail: format!("invalid quantity {raw:?}"),
    })
}

fn decode_log(log: &RawLog, registry: &Address) -> Result<Option<RegistryEvent>, abi::AbiError> {
    if Address::parse(&log.address)? != *registry {
        return Ok(None);
    }
    let (Some(topic0), Some(topic1)) = (log.topics.first(), log.topics.get(1)) else {
        return Ok(None);
    };
    let topic0 = abi::decode_hex(topic0)?;
    let hash_bytes: [u8; 32] = abi::decode_hex(topic1)?
        .try_into()
        .map_err(|_| abi::AbiError::InvalidHex(topic1.clone()))?;
    let credential_hash = CredentialHash::from_bytes(hash_bytes);

    if topic0 == abi::event_topic(abi::CREDENTIAL_STORED_EVENT) {
        Ok(Some(RegistryEvent::CredentialStored { credential_hash }))
    } else if topic0 == abi::event_topic(abi::CREDENTIAL_STATUS_CHANGED_EVENT) {
        let active = abi::decode_bool(&abi::decode_hex(&log.data)?)?;
        Ok(Some(RegistryEvent::CredentialStatusChanged {
            credential_hash,
            active,
        }))
    } else {
        Ok(None)
    }
}
