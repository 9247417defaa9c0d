//! ERC-20 contract handle

use super::{ChainWallet, PendingTransaction, TransactionRequest};
use crate::error::FaucetResult;
use crate::types::Address;
use ethabi::{ParamType, Token};
use std::sync::Arc;

/// An issued-token contract reachable through a chain wallet.
#[derive(Clone)]
pub struct Erc20Contract {
    address: Address,
    wallet: Arc<dyn ChainWallet>,
    gas_limit: Option<u64>,
}

impl Erc20Contract {
    pub fn new(address: Address, wallet: Arc<dyn ChainWallet>, gas_limit: Option<u64>) -> Self {
        Self {
            address,
            wallet,
            gas_limit,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn chain(&self) -> &str {
        self.wallet.chain()
    }

    /// Submit `transfer(to, amount)` from the faucet wallet.
    pub async fn transfer(&self, to: Address, amount: u128) -> FaucetResult<PendingTransaction> {
        let request = TransactionRequest {
            to: self.address,
            value: 0,
            data: encode_transfer(&to, amount),
            gas_limit: self.gas_limit,
        };
        self.wallet.send_transaction(request).await
    }
}

/// Calldata for `transfer(address,uint256)`.
pub fn encode_transfer(to: &Address, amount: u128) -> Vec<u8> {
    let selector = ethabi::short_signature("transfer", &[ParamType::Address, ParamType::Uint(256)]);
    let args = ethabi::encode(&[
        Token::Address(ethabi::Address::from(to.0)),
        Token::Uint(ethabi::Uint::from(amount)),
    ]);

    let mut data = Vec::with_capacity(4 + args.len());
    data.extend_from_slice(&selector);
    data.extend_from_slice(&args);
    data
}
