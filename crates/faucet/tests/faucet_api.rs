mod common;

use axum::http::StatusCode;
use common::{harness, request_tokens, send, RECIPIENT, TOKEN_CONTRACT};
use testnet_faucet::chain::contract::encode_transfer;
use testnet_faucet::cooldown::DEFAULT_COOLDOWN_MS;
use testnet_faucet::Address;

const COOLDOWN_MESSAGE: &str = "Have already received tokens in last 24 hours.";

#[tokio::test]
async fn test_root_is_liveness_text() {
    let h = harness();
    let (status, body) = send(&h.app, "GET", "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Faucet is running.");
}

#[tokio::test]
async fn test_first_request_dispenses_then_cooldown_blocks() {
    let h = harness();

    let (status, body) = request_tokens(&h.app, "ETH", RECIPIENT).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        format!("Sent 0.5 ETH TX hash: 0x{:064x}.", 1)
    );

    let sent = h.primary.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, RECIPIENT.parse::<Address>().unwrap());
    assert_eq!(sent[0].value, 500_000_000_000_000_000);

    let (status, body) = request_tokens(&h.app, "ETH", RECIPIENT).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body, COOLDOWN_MESSAGE);
    assert_eq!(h.primary.sent().len(), 1, "dispatcher must not be called during cooldown");
}

#[tokio::test]
async fn test_cooldown_is_per_token_and_case_insensitive_on_address() {
    let h = harness();

    let (status, _) = request_tokens(&h.app, "ETH", RECIPIENT).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = request_tokens(&h.app, "TOKEN", RECIPIENT).await;
    assert_eq!(status, StatusCode::OK);

    let upper = RECIPIENT.replace('a', "A");
    let (status, body) = request_tokens(&h.app, "ETH", &upper).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body, COOLDOWN_MESSAGE);
}

#[tokio::test]
async fn test_window_boundary_is_inclusive() {
    let h = harness();
    request_tokens(&h.app, "ETH", RECIPIENT).await;

    h.clock.advance(DEFAULT_COOLDOWN_MS - 1);
    let (status, _) = request_tokens(&h.app, "ETH", RECIPIENT).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    h.clock.advance(1);
    let (status, body) = request_tokens(&h.app, "ETH", RECIPIENT).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.starts_with("Sent 0.5 ETH TX hash: 0x"));
    assert_eq!(h.primary.sent().len(), 2);
}

#[tokio::test]
async fn test_unsupported_token_creates_no_entry() {
    let h = harness();

    let (status, body) = request_tokens(&h.app, "DOGE", RECIPIENT).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, "Token unsupported.");
    assert!(h.cooldowns.is_empty().await);
    assert!(h.primary.sent().is_empty());
    assert!(h.secondary.sent().is_empty());
}

#[tokio::test]
async fn test_invalid_addresses_never_reach_dispatcher() {
    let h = harness();

    for address in [
        "0x1234",
        "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
        "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaZ",
        "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
        "0x0000000000000000000000000000000000000000",
        "0xf1f1f1f1f1f1f1f1f1f1f1f1f1f1f1f1f1f1f1f1",
    ] {
        let (status, body) = request_tokens(&h.app, "ETH", address).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "address {}", address);
        assert_eq!(body, "Invalid address");
    }

    assert!(h.primary.sent().is_empty());
    assert!(h.cooldowns.is_empty().await);
}

#[tokio::test]
async fn test_contract_transfer_goes_to_contract() {
    let h = harness();

    let (status, body) = request_tokens(&h.app, "token", RECIPIENT).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.starts_with("Sent 100 TOKEN TX hash: 0x"));

    let sent = h.primary.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, TOKEN_CONTRACT);
    assert_eq!(sent[0].value, 0);
    assert_eq!(
        sent[0].data,
        encode_transfer(&RECIPIENT.parse().unwrap(), 100_000_000_000_000_000_000)
    );
}

#[tokio::test]
async fn test_failed_contract_transfer_returns_message_and_frees_slot() {
    let h = harness();
    h.primary.fail_with("insufficient funds for gas * price + value");

    let (status, body) = request_tokens(&h.app, "TOKEN", RECIPIENT).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body, "insufficient funds for gas * price + value");
    assert!(h.cooldowns.is_empty().await);

    h.primary.recover();
    let (status, body) = request_tokens(&h.app, "TOKEN", RECIPIENT).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.starts_with("Sent 100 TOKEN"));
    assert_eq!(h.primary.sent().len(), 2);
}

#[tokio::test]
async fn test_secondary_chain_token_uses_its_own_wallet() {
    let h = harness();

    let (status, body) = request_tokens(&h.app, "MATIC", RECIPIENT).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.starts_with("Sent 1 MATIC TX hash: 0x"));
    assert_eq!(h.secondary.sent().len(), 1);
    assert!(h.primary.sent().is_empty());
}

#[tokio::test]
async fn test_concurrent_requests_dispense_once() {
    let h = harness();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let app = h.app.clone();
        handles.push(tokio::spawn(async move {
            request_tokens(&app, "ETH", RECIPIENT).await.0
        }));
    }

    let mut ok = 0;
    for handle in handles {
        if handle.await.unwrap() == StatusCode::OK {
            ok += 1;
        }
    }
    assert_eq!(ok, 1);
    assert_eq!(h.primary.sent().len(), 1);
}

#[tokio::test]
async fn test_sweep_after_window_forgets_pairs() {
    let h = harness();
    request_tokens(&h.app, "ETH", RECIPIENT).await;
    assert_eq!(h.cooldowns.len().await, 1);

    h.clock.advance(DEFAULT_COOLDOWN_MS);
    assert_eq!(h.cooldowns.sweep().await, 1);
    assert!(h.cooldowns.is_empty().await);
}

#[tokio::test]
async fn test_tokens_status_and_metrics_endpoints() {
    let h = harness();
    request_tokens(&h.app, "ETH", RECIPIENT).await;
    request_tokens(&h.app, "DOGE", RECIPIENT).await;

    let (status, body) = send(&h.app, "GET", "/tokens").await;
    assert_eq!(status, StatusCode::OK);
    let tokens: serde_json::Value = serde_json::from_str(&body).unwrap();
    let symbols: Vec<_> = tokens
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["symbol"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(symbols, vec!["ETH", "MATIC", "TOKEN"]);
    assert_eq!(tokens[2]["kind"], "erc20");
    assert_eq!(tokens[2]["contract"], TOKEN_CONTRACT.to_hex());

    let (status, body) = send(&h.app, "GET", "/api/status").await;
    assert_eq!(status, StatusCode::OK);
    let status_json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(status_json["cooldown_entries"], 1);
    assert_eq!(status_json["wallets"][0]["chain"], "primary");
    assert_eq!(status_json["wallets"][1]["chain"], "secondary");

    let (status, body) = send(&h.app, "GET", "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("faucet_dispense_total{token=\"ETH\"} 1"));
    assert!(body.contains("faucet_dispense_failures_total{reason=\"unsupported_token\"} 1"));
    assert!(body.contains("faucet_cooldown_entries 1"));

    let (status, body) = send(&h.app, "GET", "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("\"ok\""));
}

#[tokio::test]
async fn test_service_request_without_http() {
    let h = harness();
    let dispensed = h.service.request("eth", RECIPIENT).await.unwrap();
    assert_eq!(dispensed.symbol, "ETH");
    assert_eq!(dispensed.chain, "primary");
    assert!(h.cooldowns.get_last_sent(&dispensed.address, "ETH").await.is_some());
}
