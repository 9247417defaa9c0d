//! Signing wallet that submits EIP-155 legacy transactions over JSON-RPC

use super::rpc::BlockchainRpcClient;
use super::{ChainWallet, PendingTransaction, TransactionRequest};
use crate::error::{FaucetError, FaucetResult};
use crate::types::Address;
use async_trait::async_trait;
use k256::ecdsa::SigningKey;
use rlp::RlpStream;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, warn};

/// Gas used by a plain value transfer.
pub const NATIVE_TRANSFER_GAS: u64 = 21_000;

/// Parse a hex private key, with or without `0x`.
pub fn parse_signing_key(private_key: &str) -> FaucetResult<SigningKey> {
    let trimmed = private_key.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);

    if digits.is_empty() {
        return Err(FaucetError::Config("private key is empty".to_string()));
    }

    let bytes = hex::decode(digits)
        .map_err(|e| FaucetError::Config(format!("private key is not hex: {}", e)))?;
    if bytes.len() != 32 {
        return Err(FaucetError::Config(format!(
            "private key must be 32 bytes, got {}",
            bytes.len()
        )));
    }

    SigningKey::from_slice(&bytes)
        .map_err(|e| {
            FaucetError::Config(format!("private key is not a valid secp256k1 scalar: {}", e))
        })
}

/// Unsigned legacy transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTransaction {
    pub nonce: u64,
    pub gas_price: u128,
    pub gas_limit: u64,
    pub to: Address,
    pub value: u128,
    pub data: Vec<u8>,
    pub chain_id: u64,
}

impl LegacyTransaction {
    fn append_fields(&self, stream: &mut RlpStream) {
        append_uint(stream, self.nonce as u128);
        append_uint(stream, self.gas_price);
        append_uint(stream, self.gas_limit as u128);
        stream.append(&self.to.0.to_vec());
        append_uint(stream, self.value);
        stream.append(&self.data);
    }

    /// RLP payload hashed for signing (EIP-155).
    pub fn signing_payload(&self) -> Vec<u8> {
        let mut stream = RlpStream::new();
        stream.begin_list(9);
        self.append_fields(&mut stream);
        append_uint(&mut stream, self.chain_id as u128);
        append_uint(&mut stream, 0);
        append_uint(&mut stream, 0);
        stream.out().to_vec()
    }

    pub fn signing_hash(&self) -> [u8; 32] {
        keccak_hash::keccak(self.signing_payload()).0
    }

    /// Sign and return the raw transaction bytes ready for broadcast.
    pub fn sign(&self, key: &SigningKey) -> FaucetResult<Vec<u8>> {
        let hash = self.signing_hash();
        let (signature, recovery_id) = key
            .sign_prehash_recoverable(&hash)
            .map_err(|e| FaucetError::SigningError(e.to_string()))?;

        let v = recovery_id.to_byte() as u128 + self.chain_id as u128 * 2 + 35;
        let bytes = signature.to_bytes();
        let (r, s) = bytes.split_at(32);

        let mut stream = RlpStream::new();
        stream.begin_list(9);
        self.append_fields(&mut stream);
        append_uint(&mut stream, v);
        stream.append(&strip_leading_zeros(r).to_vec());
        stream.append(&strip_leading_zeros(s).to_vec());
        Ok(stream.out().to_vec())
    }
}

/// RLP integers are big-endian with no leading zero bytes; zero is empty.
fn append_uint(stream: &mut RlpStream, value: u128) {
    let bytes = value.to_be_bytes();
    stream.append(&strip_leading_zeros(&bytes).to_vec());
}

fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}

/// Faucet account on one chain, backed by a JSON-RPC node.
pub struct RpcWallet {
    chain: String,
    rpc: BlockchainRpcClient,
    signing_key: SigningKey,
    address: Address,
    chain_id: OnceCell<u64>,
    gas_price: Option<u128>,
    /// Serializes nonce lookup and submission
    submit_lock: Mutex<()>,
}

impl RpcWallet {
    pub fn new(
        chain: String,
        rpc: BlockchainRpcClient,
        signing_key: SigningKey,
        chain_id: Option<u64>,
        gas_price: Option<u128>,
    ) -> Self {
        let address = Address::from_verifying_key(signing_key.verifying_key());
        info!("Faucet wallet on {}: {}", chain, address);

        let cached_chain_id = OnceCell::new();
        if let Some(id) = chain_id {
            let _ = cached_chain_id.set(id);
        }

        Self {
            chain,
            rpc,
            signing_key,
            address,
            chain_id: cached_chain_id,
            gas_price,
            submit_lock: Mutex::new(()),
        }
    }

    async fn chain_id(&self) -> FaucetResult<u64> {
        self.chain_id
            .get_or_try_init(|| async {
                let id = self.rpc.chain_id().await?;
                info!("Chain {} reports chain id {}", self.chain, id);
                Ok::<_, FaucetError>(id)
            })
            .await
            .copied()
    }
}

#[async_trait]
impl ChainWallet for RpcWallet {
    fn chain(&self) -> &str {
        &self.chain
    }

    fn address(&self) -> Address {
        self.address
    }

    async fn balance(&self) -> FaucetResult<u128> {
        self.rpc.balance(&self.address).await
    }

    async fn send_transaction(
        &self,
        request: TransactionRequest,
    ) -> FaucetResult<PendingTransaction> {
        let _guard = self.submit_lock.lock().await;

        let chain_id = self.chain_id().await?;
        let nonce = self.rpc.pending_nonce(&self.address).await?;
        let gas_price = match self.gas_price {
            Some(price) => price,
            None => self.rpc.gas_price().await?,
        };
        let gas_limit = match request.gas_limit {
            Some(limit) => limit,
            None if request.data.is_empty() => NATIVE_TRANSFER_GAS,
            None => {
                self.rpc
                    .estimate_gas(&self.address, &request.to, request.value, &request.data)
                    .await?
            }
        };

        let tx = LegacyTransaction {
            nonce,
            gas_price,
            gas_limit,
            to: request.to,
            value: request.value,
            data: request.data,
            chain_id,
        };
        debug!(chain = %self.chain, nonce, gas_price, gas_limit, "Signing transaction");

        let raw = tx.sign(&self.signing_key)?;
        let local_hash = format!("0x{}", hex::encode(keccak_hash::keccak(&raw).0));

        let hash = self.rpc.send_raw_transaction(&raw).await?;
        if !hash.eq_ignore_ascii_case(&local_hash) {
            warn!("Node returned hash {} but transaction hashes to {}", hash, local_hash);
        }

        info!("Transaction sent on {}: {}", self.chain, hash);
        Ok(PendingTransaction {
            hash,
            chain: self.chain.clone(),
        })
    }
}
