//! Faucet configuration
//!
//! Values come from an optional config file, then `FAUCET_*` environment
//! variables, then CLI flags. [`FaucetConfig::validate`] must pass before the
//! service is built.

use crate::chain::wallet::parse_signing_key;
use crate::chain::{BlockchainRpcClient, ChainWallet, RpcWallet};
use crate::error::{FaucetError, FaucetResult};
use crate::registry::normalize_symbol;
use crate::types::Address;
use crate::units::parse_units;
use faucet_common::utils::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

pub const PRIMARY_CHAIN: &str = "primary";
pub const SECONDARY_CHAIN: &str = "secondary";

/// Faucet service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FaucetConfig {
    /// Server address
    pub server_addr: String,

    /// Enable CORS
    pub cors_enabled: bool,

    /// How often expired cooldown entries are evicted (seconds)
    pub sweep_interval_secs: u64,

    /// Timeout for a single JSON-RPC request (seconds)
    pub rpc_timeout_secs: u64,

    pub logging: LoggingConfig,

    /// Chain used by tokens that do not name one
    pub primary: ChainConfig,

    /// Optional second chain with its own wallet
    pub secondary: Option<ChainConfig>,

    pub tokens: Vec<TokenSettings>,
}

/// One chain endpoint and the faucet account used on it.
#[derive(Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    pub name: String,

    /// JSON-RPC endpoint
    pub rpc_url: String,

    /// Faucet account private key (hex)
    #[serde(default)]
    pub private_key: String,

    /// Fetched from the node when absent
    #[serde(default)]
    pub chain_id: Option<u64>,

    /// Gas price in wei; queried per transaction when absent
    #[serde(default)]
    pub gas_price: Option<String>,
}

impl fmt::Debug for ChainConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainConfig")
            .field("name", &self.name)
            .field("rpc_url", &self.rpc_url)
            .field(
                "private_key",
                &if self.private_key.is_empty() { "<unset>" } else { "<redacted>" },
            )
            .field("chain_id", &self.chain_id)
            .field("gas_price", &self.gas_price)
            .finish()
    }
}

impl ChainConfig {
    pub fn new(name: &str, rpc_url: &str) -> Self {
        Self {
            name: name.to_string(),
            rpc_url: rpc_url.to_string(),
            private_key: String::new(),
            chain_id: None,
            gas_price: None,
        }
    }

    fn validate(&self) -> FaucetResult<()> {
        if self.name.trim().is_empty() {
            return Err(FaucetError::Config("chain name is empty".to_string()));
        }

        let url = reqwest::Url::parse(&self.rpc_url).map_err(|e| {
            FaucetError::Config(format!(
                "chain {}: invalid rpc_url {:?}: {}",
                self.name, self.rpc_url, e
            ))
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(FaucetError::Config(format!(
                "chain {}: rpc_url must be http or https",
                self.name
            )));
        }

        parse_signing_key(&self.private_key)
            .map_err(|e| FaucetError::Config(format!("chain {}: {}", self.name, e)))?;

        if let Some(price) = &self.gas_price {
            price.parse::<u128>().map_err(|_| {
                FaucetError::Config(format!(
                    "chain {}: gas_price must be an integer in wei",
                    self.name
                ))
            })?;
        }

        Ok(())
    }

    /// Build the signing wallet for this chain.
    pub fn connect(&self, rpc_timeout: Duration) -> FaucetResult<RpcWallet> {
        let rpc = BlockchainRpcClient::new(self.rpc_url.clone(), rpc_timeout)?;
        let key = parse_signing_key(&self.private_key)?;
        let gas_price = self
            .gas_price
            .as_deref()
            .map(str::parse::<u128>)
            .transpose()
            .map_err(|e| FaucetError::Config(format!("chain {}: gas_price: {}", self.name, e)))?;

        Ok(RpcWallet::new(self.name.clone(), rpc, key, self.chain_id, gas_price))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Native,
    Erc20,
}

/// A dispensable token as written in configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSettings {
    pub symbol: String,

    /// Human-readable amount per dispense, e.g. "0.5"
    pub amount: String,

    #[serde(default = "default_decimals")]
    pub decimals: u8,

    pub kind: TokenKind,

    #[serde(default = "default_chain")]
    pub chain: String,

    /// Token contract, required for erc20
    #[serde(default)]
    pub contract: Option<String>,

    /// Fixed gas limit for the transfer; estimated when absent
    #[serde(default)]
    pub gas_limit: Option<u64>,
}

fn default_decimals() -> u8 { 18 }
fn default_chain() -> String { PRIMARY_CHAIN.to_string() }

impl TokenSettings {
    pub fn native(symbol: &str, amount: &str, chain: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            amount: amount.to_string(),
            decimals: default_decimals(),
            kind: TokenKind::Native,
            chain: chain.to_string(),
            contract: None,
            gas_limit: None,
        }
    }

    pub fn erc20(symbol: &str, amount: &str, contract: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            amount: amount.to_string(),
            decimals: default_decimals(),
            kind: TokenKind::Erc20,
            chain: default_chain(),
            contract: Some(contract.to_string()),
            gas_limit: None,
        }
    }
}

impl Default for FaucetConfig {
    fn default() -> Self {
        Self {
            server_addr: "0.0.0.0:3000".to_string(),
            cors_enabled: true,
            sweep_interval_secs: 86_400,
            rpc_timeout_secs: 30,
            logging: LoggingConfig::default(),
            primary: ChainConfig::new(PRIMARY_CHAIN, "http://localhost:8545"),
            secondary: None,
            tokens: vec![TokenSettings::native("ETH", "0.1", PRIMARY_CHAIN)],
        }
    }
}

impl FaucetConfig {
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply `FAUCET_*` overrides read through `lookup`.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("FAUCET_SERVER_ADDR") {
            self.server_addr = addr;
        }

        if let Some(enabled) = lookup("FAUCET_CORS_ENABLED") {
            self.cors_enabled = enabled.to_lowercase() == "true";
        }

        if let Some(interval) = lookup("FAUCET_SWEEP_INTERVAL_SECS") {
            self.sweep_interval_secs = interval.parse().unwrap_or(self.sweep_interval_secs);
        }

        if let Some(level) = lookup("FAUCET_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Some(format) = lookup("FAUCET_LOG_FORMAT") {
            self.logging.format = format;
        }

        if let Some(rpc_url) = lookup("FAUCET_RPC_URL") {
            self.primary.rpc_url = rpc_url;
        }

        if let Some(key) = lookup("FAUCET_PRIVATE_KEY") {
            self.primary.private_key = key;
        }

        if let Some(chain_id) = lookup("FAUCET_CHAIN_ID") {
            self.primary.chain_id = chain_id.parse().ok();
        }

        if let Some(amount) = lookup("FAUCET_NATIVE_AMOUNT") {
            let symbol = lookup("FAUCET_NATIVE_SYMBOL").unwrap_or_else(|| "ETH".to_string());
            self.upsert_token(TokenSettings::native(&symbol, &amount, PRIMARY_CHAIN));
        }

        if let Some(contract) = lookup("FAUCET_TOKEN_ADDRESS") {
            let symbol = lookup("FAUCET_TOKEN_SYMBOL").unwrap_or_else(|| "TOKEN".to_string());
            let amount = lookup("FAUCET_TOKEN_AMOUNT").unwrap_or_else(|| "100".to_string());
            let mut token = TokenSettings::erc20(&symbol, &amount, &contract);
            if let Some(decimals) = lookup("FAUCET_TOKEN_DECIMALS").and_then(|d| d.parse().ok()) {
                token.decimals = decimals;
            }
            self.upsert_token(token);
        }

        if let Some(rpc_url) = lookup("FAUCET_SECONDARY_RPC_URL") {
            let mut chain = self
                .secondary
                .take()
                .unwrap_or_else(|| ChainConfig::new(SECONDARY_CHAIN, &rpc_url));
            chain.rpc_url = rpc_url;
            self.secondary = Some(chain);
        }

        if let Some(chain) = self.secondary.as_mut() {
            if let Some(key) = lookup("FAUCET_SECONDARY_PRIVATE_KEY") {
                chain.private_key = key;
            }
            if let Some(chain_id) = lookup("FAUCET_SECONDARY_CHAIN_ID") {
                chain.chain_id = chain_id.parse().ok();
            }
            let chain_name = chain.name.clone();
            if let Some(symbol) = lookup("FAUCET_SECONDARY_SYMBOL") {
                let amount = lookup("FAUCET_SECONDARY_AMOUNT").unwrap_or_else(|| "0.1".to_string());
                self.upsert_token(TokenSettings::native(&symbol, &amount, &chain_name));
            }
        }
    }

    /// Replace any token with the same symbol, or append.
    pub fn upsert_token(&mut self, token: TokenSettings) {
        let symbol = normalize_symbol(&token.symbol);
        self.tokens.retain(|t| normalize_symbol(&t.symbol) != symbol);
        self.tokens.push(token);
    }

    pub fn chains(&self) -> impl Iterator<Item = &ChainConfig> {
        std::iter::once(&self.primary).chain(self.secondary.iter())
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }

    /// Reject anything that would leave the faucet unable to sign or route.
    pub fn validate(&self) -> FaucetResult<()> {
        self.server_addr.parse::<SocketAddr>().map_err(|e| {
            FaucetError::Config(format!("invalid server_addr {:?}: {}", self.server_addr, e))
        })?;

        if self.sweep_interval_secs == 0 {
            return Err(FaucetError::Config("sweep_interval_secs must be positive".to_string()));
        }
        if self.rpc_timeout_secs == 0 {
            return Err(FaucetError::Config("rpc_timeout_secs must be positive".to_string()));
        }

        let mut chain_names = HashSet::new();
        for chain in self.chains() {
            chain.validate()?;
            if !chain_names.insert(chain.name.as_str()) {
                return Err(FaucetError::Config(format!("chain {} configured twice", chain.name)));
            }
        }

        if self.tokens.is_empty() {
            return Err(FaucetError::Config("no tokens configured".to_string()));
        }

        let mut symbols = HashSet::new();
        for token in &self.tokens {
            let symbol = normalize_symbol(&token.symbol);
            if symbol.is_empty() || !symbol.bytes().all(|b| b.is_ascii_alphanumeric()) {
                return Err(FaucetError::Config(format!("invalid token symbol {:?}", token.symbol)));
            }
            if !symbols.insert(symbol.clone()) {
                return Err(FaucetError::Config(format!("token {} configured twice", symbol)));
            }
            if !chain_names.contains(token.chain.as_str()) {
                return Err(FaucetError::Config(format!(
                    "token {} refers to unknown chain {}",
                    symbol, token.chain
                )));
            }

            let amount = parse_units(&token.amount, token.decimals)
                .map_err(|e| FaucetError::Config(format!("token {}: {}", symbol, e)))?;
            if amount == 0 {
                return Err(FaucetError::Config(format!(
                    "token {}: amount must be positive",
                    symbol
                )));
            }

            match (token.kind, &token.contract) {
                (TokenKind::Native, None) => {}
                (TokenKind::Native, Some(_)) => {
                    return Err(FaucetError::Config(format!(
                        "token {} is native and must not name a contract",
                        symbol
                    )));
                }
                (TokenKind::Erc20, None) => {
                    return Err(FaucetError::Config(format!(
                        "token {} needs a contract address",
                        symbol
                    )));
                }
                (TokenKind::Erc20, Some(contract)) => {
                    let address: Address = contract.parse().map_err(|_| {
                        FaucetError::Config(format!(
                            "token {}: invalid contract address {:?}",
                            symbol, contract
                        ))
                    })?;
                    if address.is_zero() {
                        return Err(FaucetError::Config(format!(
                            "token {}: contract is the zero address",
                            symbol
                        )));
                    }
                }
            }
        }

        Ok(())
    }

    /// Connect one wallet per configured chain, keyed by chain name.
    pub fn connect_wallets(&self) -> FaucetResult<HashMap<String, Arc<dyn ChainWallet>>> {
        let mut wallets: HashMap<String, Arc<dyn ChainWallet>> = HashMap::new();
        for chain in self.chains() {
            let wallet = chain.connect(self.rpc_timeout())?;
            wallets.insert(chain.name.clone(), Arc::new(wallet));
        }
        Ok(wallets)
    }
}
