//! Faucet service core logic

use crate::chain::ChainWallet;
use crate::config::FaucetConfig;
use crate::cooldown::{CooldownStore, COOLDOWN_WINDOW};
use crate::dispatcher::{Dispatcher, Dispensed};
use crate::error::{FaucetError, FaucetResult};
use crate::metrics::FaucetMetrics;
use crate::registry::{TokenInfo, TokenRegistry};
use crate::types::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Faucet service
pub struct FaucetService {
    dispatcher: Dispatcher,
    cooldowns: Arc<CooldownStore>,
    wallets: HashMap<String, Arc<dyn ChainWallet>>,
    metrics: FaucetMetrics,
}

impl FaucetService {
    pub fn new(
        registry: Arc<TokenRegistry>,
        cooldowns: Arc<CooldownStore>,
        wallets: HashMap<String, Arc<dyn ChainWallet>>,
    ) -> FaucetResult<Self> {
        let metrics = FaucetMetrics::new()
            .map_err(|e| FaucetError::InternalError(format!("metrics setup failed: {}", e)))?;

        Ok(Self {
            dispatcher: Dispatcher::new(registry),
            cooldowns,
            wallets,
            metrics,
        })
    }

    /// Validate the config, connect a wallet per chain and bind tokens.
    pub fn from_config(config: &FaucetConfig) -> FaucetResult<Self> {
        config.validate()?;

        let wallets = config.connect_wallets()?;
        let registry = TokenRegistry::from_settings(&config.tokens, &wallets)?;
        for token in registry.list() {
            info!(
                "Token {}: {} per request ({} on {})",
                token.symbol, token.amount, token.kind, token.chain
            );
        }

        let cooldowns = Arc::new(CooldownStore::new(COOLDOWN_WINDOW));
        Self::new(Arc::new(registry), cooldowns, wallets)
    }

    pub fn cooldowns(&self) -> Arc<CooldownStore> {
        self.cooldowns.clone()
    }

    pub fn tokens(&self) -> Vec<TokenInfo> {
        self.dispatcher.registry().list()
    }

    /// Handle `POST /faucet/{token}/{address}`.
    ///
    /// The cooldown slot is claimed before any network call and handed back
    /// if the transfer fails, so only submitted transfers start a window.
    pub async fn request(&self, token: &str, address: &str) -> FaucetResult<Dispensed> {
        let result = self.try_request(token, address).await;
        match &result {
            Ok(dispensed) => self.metrics.record_dispensed(&dispensed.symbol),
            Err(err) => self.metrics.record_failure(err.kind()),
        }
        result
    }

    async fn try_request(&self, token: &str, address: &str) -> FaucetResult<Dispensed> {
        debug!("Faucet request: token={} address={}", token, address);

        let recipient = self.validate_recipient(address)?;

        let symbol = match self.dispatcher.registry().lookup(token) {
            Some(config) => config.symbol.clone(),
            None => {
                debug!("Unsupported token requested: {}", token);
                return Err(FaucetError::UnsupportedToken(token.to_string()));
            }
        };

        let claimed_at = match self.cooldowns.try_claim(&recipient, &symbol).await {
            Ok(at) => at,
            Err(remaining_ms) => {
                warn!(
                    "{} already received {}; {}s left in cooldown",
                    recipient,
                    symbol,
                    remaining_ms / 1000
                );
                return Err(FaucetError::CooldownActive { remaining_ms });
            }
        };

        match self.dispatcher.dispense(&symbol, &recipient).await {
            Ok(dispensed) => Ok(dispensed),
            Err(err) => {
                self.cooldowns.release(&recipient, &symbol, claimed_at).await;
                Err(err)
            }
        }
    }

    /// Parse the recipient and refuse addresses that cannot receive.
    fn validate_recipient(&self, address: &str) -> FaucetResult<Address> {
        let recipient: Address = address.parse()?;

        if recipient.is_zero() {
            return Err(FaucetError::InvalidAddress("zero address not allowed".to_string()));
        }
        if self.wallets.values().any(|w| w.address() == recipient) {
            return Err(FaucetError::InvalidAddress("cannot send to faucet address".to_string()));
        }

        Ok(recipient)
    }

    /// Wallet balances and bookkeeping.
    pub async fn status(&self) -> FaucetStatus {
        let mut wallets = Vec::with_capacity(self.wallets.len());
        for (chain, wallet) in &self.wallets {
            let (balance, error) = match wallet.balance().await {
                Ok(balance) => (Some(balance.to_string()), None),
                Err(e) => {
                    warn!("Balance lookup on {} failed: {}", chain, e);
                    (None, Some(e.to_string()))
                }
            };
            wallets.push(WalletStatus {
                chain: chain.clone(),
                address: wallet.address().to_hex(),
                balance,
                error,
            });
        }
        wallets.sort_by(|a, b| a.chain.cmp(&b.chain));

        FaucetStatus {
            wallets,
            tokens: self.tokens(),
            cooldown_entries: self.cooldowns.len().await,
            cooldown_secs: self.cooldowns.window_ms() / 1000,
        }
    }

    /// Prometheus exposition with the cooldown gauge refreshed.
    pub async fn render_metrics(&self) -> FaucetResult<(String, Vec<u8>)> {
        self.metrics
            .cooldown_entries
            .set(self.cooldowns.len().await as i64);
        self.metrics
            .render()
            .map_err(|e| FaucetError::InternalError(format!("metrics encoding failed: {}", e)))
    }
}

/// Faucet wallet state on one chain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletStatus {
    pub chain: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Faucet status
#[derive(Debug, Clone, Serialize)]
pub struct FaucetStatus {
    pub wallets: Vec<WalletStatus>,
    pub tokens: Vec<TokenInfo>,
    pub cooldown_entries: usize,
    pub cooldown_secs: i64,
}
