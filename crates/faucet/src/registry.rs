//! Immutable symbol -> dispatch metadata table

use crate::chain::{ChainWallet, Erc20Contract};
use crate::config::{TokenKind, TokenSettings};
use crate::error::{FaucetError, FaucetResult};
use crate::units::parse_units;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// How a token is moved to the recipient.
#[derive(Clone)]
pub enum TransferKind {
    /// Value transfer in the chain's base currency
    Native { wallet: Arc<dyn ChainWallet> },
    /// `transfer(to, amount)` on an issued-token contract
    ContractCall { contract: Erc20Contract },
}

impl TransferKind {
    pub fn chain(&self) -> &str {
        match self {
            TransferKind::Native { wallet } => wallet.chain(),
            TransferKind::ContractCall { contract } => contract.chain(),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            TransferKind::Native { .. } => "native",
            TransferKind::ContractCall { .. } => "erc20",
        }
    }
}

/// Dispatch metadata for one symbol.
#[derive(Clone)]
pub struct TokenConfig {
    pub symbol: String,
    /// Human-readable amount, as shown to users
    pub display_amount: String,
    /// Amount in the token's smallest unit
    pub amount: u128,
    pub transfer: TransferKind,
}

impl TokenConfig {
    pub fn new(
        symbol: &str,
        display_amount: &str,
        decimals: u8,
        transfer: TransferKind,
    ) -> FaucetResult<Self> {
        let amount = parse_units(display_amount, decimals)?;
        if amount == 0 {
            return Err(FaucetError::InvalidAmount(format!(
                "{} faucet amount must be positive",
                symbol
            )));
        }

        Ok(Self {
            symbol: normalize_symbol(symbol),
            display_amount: display_amount.trim().to_string(),
            amount,
            transfer,
        })
    }

    pub fn info(&self) -> TokenInfo {
        TokenInfo {
            symbol: self.symbol.clone(),
            amount: self.display_amount.clone(),
            kind: self.transfer.label(),
            chain: self.transfer.chain().to_string(),
            contract: match &self.transfer {
                TransferKind::Native { .. } => None,
                TransferKind::ContractCall { contract } => Some(contract.address().to_hex()),
            },
        }
    }
}

/// Public summary of a supported token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenInfo {
    pub symbol: String,
    pub amount: String,
    pub kind: &'static str,
    pub chain: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract: Option<String>,
}

pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_ascii_uppercase()
}

/// Read-only registry built once at startup.
#[derive(Clone, Default)]
pub struct TokenRegistry {
    tokens: HashMap<String, TokenConfig>,
}

impl TokenRegistry {
    pub fn new(tokens: Vec<TokenConfig>) -> FaucetResult<Self> {
        let mut map = HashMap::with_capacity(tokens.len());
        for token in tokens {
            let symbol = token.symbol.clone();
            if map.insert(symbol.clone(), token).is_some() {
                return Err(FaucetError::Config(format!("token {} configured twice", symbol)));
            }
        }
        Ok(Self { tokens: map })
    }

    /// Bind configured tokens to the wallets of their chains.
    pub fn from_settings(
        settings: &[TokenSettings],
        wallets: &HashMap<String, Arc<dyn ChainWallet>>,
    ) -> FaucetResult<Self> {
        let mut tokens = Vec::with_capacity(settings.len());

        for token in settings {
            let wallet = wallets.get(&token.chain).cloned().ok_or_else(|| {
                FaucetError::Config(format!(
                    "token {} refers to unknown chain {}",
                    token.symbol, token.chain
                ))
            })?;

            let transfer = match token.kind {
                TokenKind::Native => TransferKind::Native { wallet },
                TokenKind::Erc20 => {
                    let address = token
                        .contract
                        .as_deref()
                        .ok_or_else(|| {
                            FaucetError::Config(format!(
                                "token {} needs a contract address",
                                token.symbol
                            ))
                        })?
                        .parse()
                        .map_err(|_| {
                            FaucetError::Config(format!(
                                "token {} has an invalid contract address",
                                token.symbol
                            ))
                        })?;
                    TransferKind::ContractCall {
                        contract: Erc20Contract::new(address, wallet, token.gas_limit),
                    }
                }
            };

            tokens.push(TokenConfig::new(&token.symbol, &token.amount, token.decimals, transfer)?);
        }

        Self::new(tokens)
    }

    pub fn lookup(&self, symbol: &str) -> Option<&TokenConfig> {
        self.tokens.get(&normalize_symbol(symbol))
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Token summaries sorted by symbol.
    pub fn list(&self) -> Vec<TokenInfo> {
        let mut infos: Vec<_> = self.tokens.values().map(TokenConfig::info).collect();
        infos.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        infos
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{PendingTransaction, TransactionRequest};
    use crate::types::Address;
    use async_trait::async_trait;

    struct NullWallet(&'static str);

    #[async_trait]
    impl ChainWallet for NullWallet {
        fn chain(&self) -> &str {
            self.0
        }

        fn address(&self) -> Address {
            Address([1; 20])
        }

        async fn balance(&self) -> FaucetResult<u128> {
            Ok(0)
        }

        async fn send_transaction(
            &self,
            _request: TransactionRequest,
        ) -> FaucetResult<PendingTransaction> {
            Err(FaucetError::RpcError("not connected".into()))
        }
    }

    fn wallets() -> HashMap<String, Arc<dyn ChainWallet>> {
        let mut wallets: HashMap<String, Arc<dyn ChainWallet>> = HashMap::new();
        wallets.insert("primary".into(), Arc::new(NullWallet("primary")));
        wallets.insert("secondary".into(), Arc::new(NullWallet("secondary")));
        wallets
    }

    fn settings(
        symbol: &str,
        kind: TokenKind,
        chain: &str,
        contract: Option<&str>,
    ) -> TokenSettings {
        TokenSettings {
            symbol: symbol.into(),
            amount: "0.5".into(),
            decimals: 18,
            kind,
            chain: chain.into(),
            contract: contract.map(str::to_string),
            gas_limit: None,
        }
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = TokenRegistry::from_settings(
            &[settings("eth", TokenKind::Native, "primary", None)],
            &wallets(),
        )
        .unwrap();

        let token = registry.lookup("ETH").unwrap();
        assert_eq!(token.symbol, "ETH");
        assert_eq!(token.amount, 500_000_000_000_000_000);
        assert!(registry.lookup("eth").is_some());
        assert!(registry.lookup("DOGE").is_none());
    }

    #[test]
    fn test_tokens_bind_to_their_chain() {
        let registry = TokenRegistry::from_settings(
            &[
                settings("ETH", TokenKind::Native, "primary", None),
                settings("MATIC", TokenKind::Native, "secondary", None),
                settings(
                    "TOKEN",
                    TokenKind::Erc20,
                    "primary",
                    Some("0x1111111111111111111111111111111111111111"),
                ),
            ],
            &wallets(),
        )
        .unwrap();

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.lookup("MATIC").unwrap().transfer.chain(), "secondary");
        match &registry.lookup("TOKEN").unwrap().transfer {
            TransferKind::ContractCall { contract } => {
                assert_eq!(contract.address(), Address([0x11; 20]));
                assert_eq!(contract.chain(), "primary");
            }
            TransferKind::Native { .. } => panic!("TOKEN should be a contract transfer"),
        }

        let listed: Vec<_> = registry.list().into_iter().map(|t| t.symbol).collect();
        assert_eq!(listed, vec!["ETH", "MATIC", "TOKEN"]);
    }

    #[test]
    fn test_rejects_bad_settings() {
        let w = wallets();
        let unknown_chain = settings("ETH", TokenKind::Native, "mainnet", None);
        assert!(TokenRegistry::from_settings(&[unknown_chain], &w).is_err());
        let missing_contract = settings("TOKEN", TokenKind::Erc20, "primary", None);
        assert!(TokenRegistry::from_settings(&[missing_contract], &w).is_err());
        assert!(TokenRegistry::from_settings(
            &[settings("TOKEN", TokenKind::Erc20, "primary", Some("0x1234"))],
            &w
        )
        .is_err());
        assert!(TokenRegistry::from_settings(
            &[
                settings("ETH", TokenKind::Native, "primary", None),
                settings("eth", TokenKind::Native, "secondary", None),
            ],
            &w
        )
        .is_err());

        let mut zero = settings("ETH", TokenKind::Native, "primary", None);
        zero.amount = "0".into();
        assert!(TokenRegistry::from_settings(&[zero], &w).is_err());
    }
}
