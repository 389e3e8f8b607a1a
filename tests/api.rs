use axum::body::Body;
use axum::http::{Request, StatusCode};
use mockito::Matcher;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use subgate::amount::Tolerance;
use subgate::config::Config;
use subgate::handlers::{self, AppState, PollPolicy};
use subgate::networks::NetworkRegistry;
use subgate::services::{Ledger, MemoryLedger, PaymentVerificationService};

const RECEIVING_WALLET: &str = "0x742d35cc6634c0532925a3b844bc454e4438f44e";
const TRON_WALLET: &str = "TXk9JSxC1nrSYDRmJGH2nhLRBu2r9t5AbC";
const SENDER: &str = "0xd8da6bf26964af9d7eed9e03e53415d37aa96045";
// 5000 USDT at 6 decimals.
const DATA_5000_USDT: &str =
    "0x000000000000000000000000000000000000000000000000000000012a05f200";

fn tx_hash() -> String {
    format!("0x{}", "ab".repeat(32))
}

fn test_state(chain_url: &str, attempts: u32) -> (AppState, Arc<MemoryLedger>) {
    let config = Config {
        eth_rpc_url: Some(chain_url.to_string()),
        bnb_rpc_url: Some(chain_url.to_string()),
        tron_api_url: Some(chain_url.to_string()),
        receiving_wallet_evm: Some(RECEIVING_WALLET.to_string()),
        receiving_wallet_tron: Some(TRON_WALLET.to_string()),
        admin_token: Some("secret".to_string()),
        ..Config::default()
    };
    let registry = Arc::new(NetworkRegistry::from_config(&config));
    let verification = Arc::new(
        PaymentVerificationService::new(
            registry.clone(),
            Duration::from_secs(5),
            Tolerance::default(),
        )
        .unwrap(),
    );
    let ledger = Arc::new(MemoryLedger::new());

    let state = AppState {
        ledger: ledger.clone(),
        verification,
        registry,
        poll: PollPolicy {
            attempts,
            interval: Duration::from_millis(50),
        },
        admin_token: config.admin_token.clone(),
    };
    (state, ledger)
}

/// A state whose chain endpoints point at a closed port; any chain query
/// from these tests would fail loudly.
fn offline_state() -> (AppState, Arc<MemoryLedger>) {
    test_state("http://127.0.0.1:9", 0)
}

async fn request(
    state: &AppState,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
    admin_token: Option<&str>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = admin_token {
        builder = builder.header("x-admin-token", token);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = handlers::router(state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn create_body(network: &str, tx_hash: &str) -> serde_json::Value {
    let user_address = if network == "TRX" {
        TRON_WALLET.to_string()
    } else {
        SENDER.to_string()
    };
    json!({
        "userAddress": user_address,
        "userName": "Alice",
        "userEmail": "alice@example.com",
        "packageName": "VIP Gold",
        "amount": 5000,
        "network": network,
        "txHash": tx_hash,
    })
}

fn zero_bloom() -> String {
    format!("0x{}", "00".repeat(256))
}

fn receipt_result() -> serde_json::Value {
    let block_hash = format!("0x{}", "11".repeat(32));
    let token = "0xdac17f958d2ee523a2206206994597c13d831ec7";
    json!({
        "transactionHash": tx_hash(),
        "transactionIndex": "0x1",
        "blockHash": block_hash,
        "blockNumber": "0x112a880",
        "from": SENDER,
        "to": token,
        "cumulativeGasUsed": "0xa12a5",
        "gasUsed": "0xcf08",
        "contractAddress": null,
        "logs": [{
            "address": token,
            "topics": [
                "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef",
                format!("0x000000000000000000000000{}", SENDER.trim_start_matches("0x")),
                format!("0x000000000000000000000000{}", RECEIVING_WALLET.trim_start_matches("0x")),
            ],
            "data": DATA_5000_USDT,
            "blockHash": block_hash,
            "blockNumber": "0x112a880",
            "transactionHash": tx_hash(),
            "transactionIndex": "0x1",
            "logIndex": "0x5",
            "removed": false
        }],
        "logsBloom": zero_bloom(),
        "status": "0x1",
        "effectiveGasPrice": "0x4a817c800",
        "type": "0x2"
    })
}

fn block_result() -> serde_json::Value {
    json!({
        "hash": format!("0x{}", "11".repeat(32)),
        "parentHash": format!("0x{}", "22".repeat(32)),
        "sha3Uncles": "0x1dcc4de8dec75d7aab85b567b6ccd41ad312451b948a7413f0a142fd40d49347",
        "miner": "0x0000000000000000000000000000000000000000",
        "stateRoot": format!("0x{}", "33".repeat(32)),
        "transactionsRoot": format!("0x{}", "44".repeat(32)),
        "receiptsRoot": format!("0x{}", "55".repeat(32)),
        "number": "0x112a880",
        "gasUsed": "0x1ca35f8",
        "gasLimit": "0x1c9c380",
        "extraData": "0x",
        "logsBloom": zero_bloom(),
        "timestamp": "0x6553f100",
        "difficulty": "0x0",
        "totalDifficulty": "0x0",
        "sealFields": [],
        "uncles": [],
        "transactions": [],
        "size": "0x1f8b",
        "mixHash": format!("0x{}", "66".repeat(32)),
        "nonce": "0x0000000000000000",
        "baseFeePerGas": "0x4a817c800"
    })
}

async fn mock_rpc(
    server: &mut mockito::ServerGuard,
    method: &str,
    result: serde_json::Value,
    expect: usize,
) -> mockito::Mock {
    server
        .mock("POST", "/")
        .match_body(Matcher::PartialJsonString(format!(
            "{{\"method\":\"{method}\"}}"
        )))
        .with_header("content-type", "application/json")
        .with_body(json!({"jsonrpc": "2.0", "id": 1, "result": result}).to_string())
        .expect(expect)
        .create_async()
        .await
}

#[tokio::test]
async fn create_then_verify_is_idempotent() {
    let mut server = mockito::Server::new_async().await;
    // The chain is consulted exactly once; the second verify call answers
    // from the ledger.
    let receipt = mock_rpc(&mut server, "eth_getTransactionReceipt", receipt_result(), 1).await;
    let block = mock_rpc(&mut server, "eth_getBlockByNumber", block_result(), 1).await;

    let (state, _ledger) = test_state(&server.url(), 0);

    let (status, body) = request(
        &state,
        "POST",
        "/api/subscriptions",
        Some(create_body("ETH", &tx_hash())),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    let id = body["subscription"]["id"].as_str().unwrap().to_string();

    let (status, body) = request(
        &state,
        "POST",
        "/api/subscriptions/verify",
        Some(json!({"subscriptionId": id})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["verified"], true);
    assert_eq!(body["details"]["amount"], "5000");
    assert_eq!(body["details"]["to"], RECEIVING_WALLET);
    assert_eq!(body["details"]["blockNumber"], 18_000_000);
    assert_eq!(body["details"]["timestamp"], 1_700_000_000);

    let (status, body) = request(
        &state,
        "POST",
        "/api/subscriptions/verify",
        Some(json!({"txHash": tx_hash()})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["verified"], true);
    assert_eq!(body["message"], "Transaction already verified");

    receipt.assert_async().await;
    block.assert_async().await;
}

#[tokio::test]
async fn duplicate_tx_hash_is_rejected_with_conflict() {
    let (state, _ledger) = offline_state();

    let (status, _) = request(
        &state,
        "POST",
        "/api/subscriptions",
        Some(create_body("ETH", &tx_hash())),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = request(
        &state,
        "POST",
        "/api/subscriptions",
        Some(create_body("ETH", &tx_hash())),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_code"], "DUPLICATE_TRANSACTION");
}

#[tokio::test]
async fn unsupported_network_is_rejected_without_chain_calls() {
    let (state, _ledger) = offline_state();
    let (status, body) = request(
        &state,
        "POST",
        "/api/subscriptions",
        Some(create_body("SOL", &tx_hash())),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "UNSUPPORTED_NETWORK");
}

#[tokio::test]
async fn unconfigured_network_refuses_checkout() {
    let (mut state, _ledger) = offline_state();
    let config = Config {
        receiving_wallet_evm: Some(RECEIVING_WALLET.to_string()),
        receiving_wallet_tron: None,
        ..Config::default()
    };
    state.registry = Arc::new(NetworkRegistry::from_config(&config));

    let (status, body) = request(
        &state,
        "POST",
        "/api/subscriptions",
        Some(create_body("TRX", &"cd".repeat(32))),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error_code"], "RECEIVING_WALLET_NOT_CONFIGURED");
}

#[tokio::test]
async fn verify_requires_a_known_subscription() {
    let (state, _ledger) = offline_state();

    let (status, _) = request(
        &state,
        "POST",
        "/api/subscriptions/verify",
        Some(json!({"txHash": "0xdeadbeef"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = request(
        &state,
        "POST",
        "/api/subscriptions/verify",
        Some(json!({})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn admin_listing_requires_the_token() {
    let (state, _ledger) = offline_state();
    request(
        &state,
        "POST",
        "/api/subscriptions",
        Some(create_body("ETH", &tx_hash())),
        None,
    )
    .await;

    let (status, _) = request(&state, "GET", "/api/admin/subscriptions", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) =
        request(&state, "GET", "/api/admin/subscriptions", None, Some("wrong")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) =
        request(&state, "GET", "/api/admin/subscriptions", None, Some("secret")).await;
    assert_eq!(status, StatusCode::OK);
    let records = body.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["txVerified"], false);
    assert_eq!(records[0]["network"], "ETH");
}

#[tokio::test]
async fn background_task_marks_the_record_verified() {
    let mut server = mockito::Server::new_async().await;
    mock_rpc(&mut server, "eth_getTransactionReceipt", receipt_result(), 1).await;
    mock_rpc(&mut server, "eth_getBlockByNumber", block_result(), 1).await;

    let (state, ledger) = test_state(&server.url(), 3);

    let (status, body) = request(
        &state,
        "POST",
        "/api/subscriptions",
        Some(create_body("ETH", &tx_hash())),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id: uuid::Uuid = body["subscription"]["id"].as_str().unwrap().parse().unwrap();

    // The create response returned before verification; wait for the
    // background task to flip the record.
    let mut verified = false;
    for _ in 0..50 {
        let record = ledger.find_by_id(id).await.unwrap().unwrap();
        if record.tx_verified {
            assert!(record.verified_at.is_some());
            verified = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(verified, "background verification never completed");
}

#[tokio::test]
async fn health_reports_wallet_configuration() {
    let (state, _ledger) = offline_state();
    let (status, body) = request(&state, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    let networks = body["networks"].as_array().unwrap();
    assert_eq!(networks.len(), 3);
    assert!(networks.iter().all(|n| n["walletConfigured"] == true));
}
