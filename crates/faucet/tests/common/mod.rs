#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use testnet_faucet::chain::{ChainWallet, Erc20Contract, PendingTransaction, TransactionRequest};
use testnet_faucet::cooldown::{ManualClock, DEFAULT_COOLDOWN_MS};
use testnet_faucet::{
    Address, CooldownStore, FaucetError, FaucetResult, FaucetService, TokenConfig, TokenRegistry,
    TransferKind,
};
use tower::ServiceExt;

pub const RECIPIENT: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
pub const TOKEN_CONTRACT: Address = Address([0xcc; 20]);

/// Wallet that records submissions instead of talking to a node.
pub struct MockWallet {
    chain: &'static str,
    address: Address,
    counter: AtomicU64,
    failure: Mutex<Option<String>>,
    sent: Mutex<Vec<TransactionRequest>>,
}

impl MockWallet {
    pub fn new(chain: &'static str, address: Address) -> Arc<Self> {
        Arc::new(Self {
            chain,
            address,
            counter: AtomicU64::new(0),
            failure: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
        })
    }

    /// Make every following submission fail with `message`.
    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn recover(&self) {
        *self.failure.lock().unwrap() = None;
    }

    pub fn sent(&self) -> Vec<TransactionRequest> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChainWallet for MockWallet {
    fn chain(&self) -> &str {
        self.chain
    }

    fn address(&self) -> Address {
        self.address
    }

    async fn balance(&self) -> FaucetResult<u128> {
        Ok(1_000_000_000_000_000_000_000)
    }

    async fn send_transaction(
        &self,
        request: TransactionRequest,
    ) -> FaucetResult<PendingTransaction> {
        self.sent.lock().unwrap().push(request);
        if let Some(message) = self.failure.lock().unwrap().clone() {
            return Err(FaucetError::RpcError(message));
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(PendingTransaction {
            hash: format!("0x{:064x}", n),
            chain: self.chain.to_string(),
        })
    }
}

pub struct Harness {
    pub app: Router,
    pub service: Arc<FaucetService>,
    pub clock: Arc<ManualClock>,
    pub cooldowns: Arc<CooldownStore>,
    pub primary: Arc<MockWallet>,
    pub secondary: Arc<MockWallet>,
}

fn native(symbol: &str, amount: &str, wallet: Arc<MockWallet>) -> TokenConfig {
    TokenConfig::new(symbol, amount, 18, TransferKind::Native { wallet }).unwrap()
}

/// ETH and TOKEN on the primary chain, MATIC on the secondary chain.
pub fn harness() -> Harness {
    let primary = MockWallet::new("primary", Address([0xf1; 20]));
    let secondary = MockWallet::new("secondary", Address([0xf2; 20]));

    let tokens = vec![
        native("ETH", "0.5", primary.clone()),
        native("MATIC", "1", secondary.clone()),
        TokenConfig::new(
            "TOKEN",
            "100",
            18,
            TransferKind::ContractCall {
                contract: Erc20Contract::new(TOKEN_CONTRACT, primary.clone(), None),
            },
        )
        .unwrap(),
    ];
    let registry = Arc::new(TokenRegistry::new(tokens).unwrap());

    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    let cooldowns = Arc::new(CooldownStore::with_clock(
        Duration::from_millis(DEFAULT_COOLDOWN_MS as u64),
        clock.clone(),
    ));

    let mut wallets: HashMap<String, Arc<dyn ChainWallet>> = HashMap::new();
    wallets.insert("primary".to_string(), primary.clone());
    wallets.insert("secondary".to_string(), secondary.clone());

    let service = Arc::new(FaucetService::new(registry, cooldowns.clone(), wallets).unwrap());
    let app = testnet_faucet::api::router(service.clone());

    Harness {
        app,
        service,
        clock,
        cooldowns,
        primary,
        secondary,
    }
}

pub async fn send(app: &Router, method: &str, uri: &str) -> (StatusCode, String) {
    let response = app
        .clone()
        .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

pub async fn request_tokens(app: &Router, token: &str, address: &str) -> (StatusCode, String) {
    send(app, "POST", &format!("/faucet/{}/{}", token, address)).await
}
