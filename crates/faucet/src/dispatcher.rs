//! Routes a token symbol to its transfer mechanism.
//!
//! `dispense` never lets a chain failure escape as a panic or an error other
//! than [`FaucetError::UnsupportedToken`] / [`FaucetError::TransferFailed`].

use crate::chain::{PendingTransaction, TransactionRequest};
use crate::error::FaucetError;
use crate::registry::{TokenConfig, TokenRegistry, TransferKind};
use crate::types::Address;
use futures::FutureExt;
use serde::Serialize;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{info, warn};

/// Successful submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dispensed {
    pub symbol: String,
    pub amount: String,
    pub address: Address,
    pub tx_hash: String,
    pub chain: String,
}

impl fmt::Display for Dispensed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sent {} {} TX hash: {}.", self.amount, self.symbol, self.tx_hash)
    }
}

pub struct Dispatcher {
    registry: Arc<TokenRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<TokenRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &TokenRegistry {
        &self.registry
    }

    /// Submit one transfer of `symbol`'s configured amount to `address`.
    pub async fn dispense(
        &self,
        symbol: &str,
        address: &Address,
    ) -> Result<Dispensed, FaucetError> {
        let token = self
            .registry
            .lookup(symbol)
            .ok_or_else(|| FaucetError::UnsupportedToken(symbol.to_string()))?;

        let submitted = AssertUnwindSafe(submit(token, address)).catch_unwind().await;

        let outcome = match submitted {
            Ok(result) => result,
            Err(panic) => Err(FaucetError::TransferFailed(panic_message(panic.as_ref()))),
        };

        match outcome {
            Ok(tx) => {
                info!(
                    "Dispensed {} {} to {} on {}: {}",
                    token.display_amount, token.symbol, address, tx.chain, tx.hash
                );
                Ok(Dispensed {
                    symbol: token.symbol.clone(),
                    amount: token.display_amount.clone(),
                    address: *address,
                    tx_hash: tx.hash,
                    chain: tx.chain,
                })
            }
            Err(err) => {
                warn!("Transfer of {} to {} failed: {}", token.symbol, address, err);
                Err(FaucetError::TransferFailed(failure_text(err)))
            }
        }
    }
}

async fn submit(token: &TokenConfig, address: &Address) -> Result<PendingTransaction, FaucetError> {
    match &token.transfer {
        TransferKind::Native { wallet } => {
            wallet
                .send_transaction(TransactionRequest::native(*address, token.amount))
                .await
        }
        TransferKind::ContractCall { contract } => contract.transfer(*address, token.amount).await,
    }
}

/// The underlying message, without the variant's display prefix.
fn failure_text(err: FaucetError) -> String {
    match err {
        FaucetError::TransferFailed(msg)
        | FaucetError::RpcError(msg)
        | FaucetError::SigningError(msg)
        | FaucetError::InvalidAmount(msg)
        | FaucetError::Config(msg)
        | FaucetError::InternalError(msg) => msg,
        other => other.to_string(),
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "transfer aborted".to_string()
    }
}
