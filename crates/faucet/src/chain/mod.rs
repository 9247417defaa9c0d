//! Chain interaction primitives.
//!
//! A [`ChainWallet`] submits a single transaction and returns as soon as the
//! node acknowledges it. Confirmation is never awaited.

pub mod contract;
pub mod rpc;
pub mod wallet;

pub use contract::Erc20Contract;
pub use rpc::BlockchainRpcClient;
pub use wallet::RpcWallet;

use crate::error::FaucetResult;
use crate::types::Address;
use async_trait::async_trait;
use serde::Serialize;

/// A transaction the wallet should sign and submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    pub to: Address,
    /// Native value in wei
    pub value: u128,
    pub data: Vec<u8>,
    /// Explicit gas limit; estimated when absent
    pub gas_limit: Option<u64>,
}

impl TransactionRequest {
    /// Plain value transfer.
    pub fn native(to: Address, value: u128) -> Self {
        Self {
            to,
            value,
            data: Vec::new(),
            gas_limit: None,
        }
    }
}

/// Handle for a submitted, not yet confirmed, transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingTransaction {
    pub hash: String,
    pub chain: String,
}

/// Signing account bound to one chain.
#[async_trait]
pub trait ChainWallet: Send + Sync {
    /// Name of the chain this wallet submits to
    fn chain(&self) -> &str;

    /// Sender address
    fn address(&self) -> Address;

    /// Current native balance of the sender in wei.
    async fn balance(&self) -> FaucetResult<u128>;

    /// Sign and submit exactly one transaction.
    async fn send_transaction(
        &self,
        request: TransactionRequest,
    ) -> FaucetResult<PendingTransaction>;
}
