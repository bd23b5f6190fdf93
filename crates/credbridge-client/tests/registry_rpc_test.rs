//! Contract tests for RpcRegistry against a mocked Ethereum JSON-RPC node.
//!
//! ## Methods Exercised
//!
//! | JSON-RPC method | Test |
//! |-----------------|------|
//! | `eth_call` | `exists_*`, `get_credential_*`, `credentials_of_subject_*` |
//! | `eth_getTransactionCount`, `eth_gasPrice`, `eth_estimateGas` | `store_credential_*` |
//! | `eth_sendRawTransaction` | `store_credential_*`, `set_status_*` |
//! | `eth_getTransactionReceipt` | `store_credential_*`, `receipt_*` |

use credbridge_client::registry::abi::{self, Token};
use credbridge_client::{
    ClientError, CredentialLedger, RegistryConfig, RegistryEvent, RpcRegistry,
    StoreCredentialRequest,
};
use credbridge_core::CredentialHash;
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEY: &str = "0x4646464646464646464646464646464646464646464646464646464646464646";
const TX_HASH: &str = "0x7f1c0f2f44a3a5c0e1b3ec8d0c7b5c5e4b1f6b7a2d9e8c3f0a1b2c3d4e5f6a7b";

fn registry(server: &MockServer, key: Option<&str>) -> RpcRegistry {
    RpcRegistry::new(RegistryConfig::local_mock(&server.uri(), key).unwrap()).unwrap()
}

fn rpc_result(result: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "jsonrpc": "2.0", "id": 1, "result": result }))
}

fn rpc_error(code: i64, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "jsonrpc": "2.0",
        "id": 1,
        "error": { "code": code, "message": message }
    }))
}

async fn mount(server: &MockServer, rpc_method: &str, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": rpc_method })))
        .respond_with(response)
        .mount(server)
        .await;
}

async fn mount_write_path(server: &MockServer) {
    mount(server, "eth_getTransactionCount", rpc_result(json!("0x2"))).await;
    mount(server, "eth_gasPrice", rpc_result(json!("0x3b9aca00"))).await;
    mount(server, "eth_estimateGas", rpc_result(json!("0x186a0"))).await;
}

fn word_bool(value: bool) -> String {
    let mut word = [0u8; 32];
    word[31] = u8::from(value);
    abi::encode_hex(&word)
}

fn hash(byte: u8) -> CredentialHash {
    CredentialHash::from_bytes([byte; 32])
}

fn store_request() -> StoreCredentialRequest {
    StoreCredentialRequest {
        credential_hash: hash(0xab),
        metadata: r#"{"txnid":"T1"}"#.into(),
        subject_did: "example:alice".into(),
        issuer_name: "Issuer".into(),
        issuer_did: String::new(),
    }
}

// ── eth_call reads ───────────────────────────────────────────────────

#[tokio::test]
async fn exists_decodes_bool_from_eth_call() {
    let server = MockServer::start().await;
    let calldata = abi::encode_hex(&abi::encode_call(
        abi::EXISTS,
        &[Token::FixedBytes32(hash(1).as_bytes())],
    ));
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "method": "eth_call",
            "params": [{ "data": calldata }, "latest"]
        })))
        .respond_with(rpc_result(json!(word_bool(true))))
        .expect(1)
        .mount(&server)
        .await;

    let registry = registry(&server, None);
    assert!(registry.exists(&hash(1)).await.unwrap());
}

#[tokio::test]
async fn get_credential_decodes_tuple() {
    let server = MockServer::start().await;
    let encoded = abi::encode_args(&[
        Token::Str(r#"{"txnid":"T1"}"#),
        Token::Str("example:alice"),
        Token::Str("Issuer"),
        Token::Str("issuer:xyz"),
        Token::Bool(true),
    ]);
    mount(&server, "eth_call", rpc_result(json!(abi::encode_hex(&encoded)))).await;

    let record = registry(&server, None)
        .get_credential(&hash(2))
        .await
        .unwrap()
        .expect("credential present");
    assert_eq!(record.subject_did, "example:alice");
    assert_eq!(record.issuer_did, "issuer:xyz");
    assert!(record.active);
}

#[tokio::test]
async fn get_credential_revert_is_none() {
    let server = MockServer::start().await;
    mount(&server, "eth_call", rpc_error(3, "execution reverted: not found")).await;

    let record = registry(&server, None).get_credential(&hash(3)).await.unwrap();
    assert!(record.is_none());
}

#[tokio::test]
async fn exists_revert_is_an_error() {
    let server = MockServer::start().await;
    mount(&server, "eth_call", rpc_error(3, "execution reverted")).await;

    let err = registry(&server, None).exists(&hash(3)).await.unwrap_err();
    assert!(err.is_revert(), "got {err:?}");
}

#[tokio::test]
async fn credentials_of_subject_decodes_array() {
    let server = MockServer::start().await;
    let mut data = Vec::new();
    let mut offset = [0u8; 32];
    offset[31] = 32;
    let mut len = [0u8; 32];
    len[31] = 1;
    data.extend_from_slice(&offset);
    data.extend_from_slice(&len);
    data.extend_from_slice(&[0xcd; 32]);
    mount(&server, "eth_call", rpc_result(json!(abi::encode_hex(&data)))).await;

    let hashes = registry(&server, None)
        .credentials_of_subject("example:alice")
        .await
        .unwrap();
    assert_eq!(hashes, vec![hash(0xcd)]);
}

#[tokio::test]
async fn node_http_error_surfaces_as_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&server)
        .await;

    match registry(&server, None).is_active(&hash(4)).await {
        Err(ClientError::Api { status, .. }) => assert_eq!(status, 503),
        other => panic!("expected Api error, got {other:?}"),
    }
}

// ── transactions ─────────────────────────────────────────────────────

#[tokio::test]
async fn store_credential_signs_sends_once_and_decodes_receipt() {
    let server = MockServer::start().await;
    mount_write_path(&server).await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "eth_sendRawTransaction" })))
        .respond_with(rpc_result(json!(TX_HASH)))
        .expect(1)
        .mount(&server)
        .await;
    mount(
        &server,
        "eth_getTransactionReceipt",
        rpc_result(json!({
            "transactionHash": TX_HASH,
            "blockNumber": "0x10",
            "gasUsed": "0x15f90",
            "status": "0x1",
            "logs": [{
                "address": "0x1111111111111111111111111111111111111111",
                "topics": [
                    abi::encode_hex(&abi::event_topic(abi::CREDENTIAL_STORED_EVENT)),
                    abi::encode_hex(&[0xab; 32])
                ],
                "data": "0x"
            }]
        })),
    )
    .await;

    let receipt = registry(&server, Some(KEY))
        .store_credential(&store_request())
        .await
        .unwrap();
    assert_eq!(receipt.transaction_hash, TX_HASH);
    assert_eq!(receipt.block_number, Some(16));
    assert_eq!(receipt.gas_used, Some(90_000));
    assert_eq!(
        receipt.events,
        vec![RegistryEvent::CredentialStored {
            credential_hash: hash(0xab)
        }]
    );
}

#[tokio::test]
async fn store_credential_sends_from_the_configured_signer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "method": "eth_getTransactionCount",
            "params": ["0x9d8a62f656a8d1615c1294fd71e9cfb3e4855a4f", "pending"]
        })))
        .respond_with(rpc_result(json!("0x0")))
        .expect(1)
        .mount(&server)
        .await;
    mount(&server, "eth_gasPrice", rpc_result(json!("0x1"))).await;
    mount(&server, "eth_estimateGas", rpc_result(json!("0x5208"))).await;
    mount(&server, "eth_sendRawTransaction", rpc_result(json!(TX_HASH))).await;
    mount(
        &server,
        "eth_getTransactionReceipt",
        rpc_result(json!({ "transactionHash": TX_HASH, "status": "0x1", "logs": [] })),
    )
    .await;

    let registry = registry(&server, Some(KEY));
    assert_eq!(
        registry.signer_address().await.unwrap().to_string(),
        "0x9d8a62f656a8d1615c1294fd71e9cfb3e4855a4f"
    );
    registry.store_credential(&store_request()).await.unwrap();
}

#[tokio::test]
async fn store_credential_revert_in_estimate_never_broadcasts() {
    let server = MockServer::start().await;
    mount(&server, "eth_getTransactionCount", rpc_result(json!("0x2"))).await;
    mount(&server, "eth_gasPrice", rpc_result(json!("0x1"))).await;
    mount(
        &server,
        "eth_estimateGas",
        rpc_error(3, "execution reverted: credential already stored"),
    )
    .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "eth_sendRawTransaction" })))
        .respond_with(rpc_result(json!(TX_HASH)))
        .expect(0)
        .mount(&server)
        .await;

    match registry(&server, Some(KEY))
        .store_credential(&store_request())
        .await
    {
        Err(ClientError::Reverted { function, reason }) => {
            assert_eq!(function, abi::STORE_CREDENTIAL);
            assert!(reason.contains("already stored"));
        }
        other => panic!("expected Reverted, got {other:?}"),
    }
}

#[tokio::test]
async fn set_status_failed_receipt_is_an_error() {
    let server = MockServer::start().await;
    mount_write_path(&server).await;
    mount(&server, "eth_sendRawTransaction", rpc_result(json!(TX_HASH))).await;
    mount(
        &server,
        "eth_getTransactionReceipt",
        rpc_result(json!({ "transactionHash": TX_HASH, "status": "0x0", "logs": [] })),
    )
    .await;

    let err = registry(&server, Some(KEY))
        .set_credential_status(&hash(5), false)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::TransactionFailed { ref tx_hash } if tx_hash == TX_HASH));
}

#[tokio::test]
async fn receipt_wait_is_bounded() {
    let server = MockServer::start().await;
    mount_write_path(&server).await;
    mount(&server, "eth_sendRawTransaction", rpc_result(json!(TX_HASH))).await;
    mount(&server, "eth_getTransactionReceipt", rpc_result(Value::Null)).await;

    let err = registry(&server, Some(KEY))
        .set_credential_status(&hash(6), true)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::ReceiptTimeout { .. }), "got {err:?}");
}

#[tokio::test]
async fn writes_without_a_key_fail_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(rpc_result(json!("0x0")))
        .expect(0)
        .mount(&server)
        .await;

    let registry = registry(&server, None);
    assert!(matches!(
        registry.store_credential(&store_request()).await,
        Err(ClientError::MissingSigner)
    ));
    assert!(matches!(
        registry.signer_address().await,
        Err(ClientError::MissingSigner)
    ));
}
