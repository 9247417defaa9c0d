//! Testnet token faucet
//!
//! Dispenses a fixed amount of a native or ERC-20 token to an address, at
//! most once per cooldown window for each (address, token) pair:
//! - Cooldown memory with periodic eviction
//! - Token registry routing symbols to native or contract transfers
//! - Dispatcher that turns chain failures into messages
//! - HTTP API

pub mod api;
pub mod chain;
pub mod config;
pub mod cooldown;
pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod registry;
pub mod service;
pub mod types;
pub mod units;

pub use config::FaucetConfig;
pub use cooldown::{CooldownStore, CooldownSweeper};
pub use dispatcher::{Dispatcher, Dispensed};
pub use error::{FaucetError, FaucetResult};
pub use registry::{TokenConfig, TokenRegistry, TransferKind};
pub use service::{FaucetService, FaucetStatus};
pub use types::Address;
