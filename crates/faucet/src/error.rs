//! Error types for the faucet service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Faucet service errors
///
/// The `Display` text of each variant is what the HTTP client sees, so the
/// request-level variants render as short human-readable sentences.
#[derive(Error, Debug)]
pub enum FaucetError {
    #[error("Token unsupported.")]
    UnsupportedToken(String),

    #[error("Invalid address")]
    InvalidAddress(String),

    #[error("Have already received tokens in last 24 hours.")]
    CooldownActive { remaining_ms: i64 },

    /// Carries the raw failure text from the chain interaction.
    #[error("{0}")]
    TransferFailed(String),

    #[error("RPC error: {0}")]
    RpcError(String),

    #[error("Signing error: {0}")]
    SigningError(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl FaucetError {
    /// Short label used for logs and the failure metric.
    pub fn kind(&self) -> &'static str {
        match self {
            FaucetError::UnsupportedToken(_) => "unsupported_token",
            FaucetError::InvalidAddress(_) => "invalid_address",
            FaucetError::CooldownActive { .. } => "cooldown_active",
            FaucetError::TransferFailed(_) => "transfer_failed",
            FaucetError::RpcError(_) => "rpc_error",
            FaucetError::SigningError(_) => "signing_error",
            FaucetError::Config(_) => "config",
            FaucetError::InvalidAmount(_) => "invalid_amount",
            FaucetError::InternalError(_) => "internal",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            FaucetError::UnsupportedToken(_) => StatusCode::NOT_FOUND,
            FaucetError::InvalidAddress(_) | FaucetError::InvalidAmount(_) => {
                StatusCode::BAD_REQUEST
            }
            FaucetError::CooldownActive { .. } => StatusCode::TOO_MANY_REQUESTS,
            FaucetError::TransferFailed(_) | FaucetError::RpcError(_) => StatusCode::BAD_GATEWAY,
            FaucetError::SigningError(_)
            | FaucetError::Config(_)
            | FaucetError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for FaucetError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

pub type FaucetResult<T> = Result<T, FaucetError>;
