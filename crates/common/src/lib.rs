//! Shared plumbing for the faucet workspace: logging setup and
//! configuration-file loading.

pub mod utils;
