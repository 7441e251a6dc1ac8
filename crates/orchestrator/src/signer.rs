use std::fmt;
use std::str::FromStr;

use alloy_primitives::{keccak256, Address, Bytes, B256};
use async_trait::async_trait;
use cow_operator_config::OperatorConfig;
use k256::ecdsa::SigningKey;

use crate::venue::{OperatorSigner, VenueError};

/// Offset added to the recovery id, as `ecrecover` expects
const RECOVERY_ID_OFFSET: u8 = 27;

/// Operator key held in memory.
///
/// Signs the raw 32-byte message hash with recoverable secp256k1 ECDSA,
/// no message prefix applied.
#[derive(Clone)]
pub struct LocalSigner {
    key: SigningKey,
    address: Address,
}

impl LocalSigner {
    pub fn from_bytes(secret: &[u8]) -> Result<Self, VenueError> {
        let key =
            SigningKey::from_slice(secret).map_err(|e| VenueError::InvalidKey(e.to_string()))?;
        let address = address_of(&key);
        Ok(Self { key, address })
    }

    /// Parse a hex private key, with or without `0x`
    pub fn from_hex(secret: &str) -> Result<Self, VenueError> {
        let secret =
            B256::from_str(secret.trim()).map_err(|e| VenueError::InvalidKey(e.to_string()))?;
        Self::from_bytes(secret.as_slice())
    }

    /// Load the key from the environment variable named `var`
    pub fn from_env(var: &str) -> Result<Self, VenueError> {
        let secret = std::env::var(var)
            .map_err(|_| VenueError::InvalidKey(format!("environment variable {var} is not set")))?;
        Self::from_hex(&secret)
    }

    /// Load the key from the variable named by `operator.private_key_env`
    pub fn from_config(config: &OperatorConfig) -> Result<Self, VenueError> {
        Self::from_env(&config.private_key_env)
    }

    /// Sign `hash` returning `r || s || v`
    pub fn sign(&self, hash: B256) -> Result<[u8; 65], VenueError> {
        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(hash.as_slice())
            .map_err(|e| VenueError::Signing(e.to_string()))?;

        let mut out = [0u8; 65];
        out[..64].copy_from_slice(&signature.to_bytes());
        out[64] = recovery_id.to_byte() + RECOVERY_ID_OFFSET;
        Ok(out)
    }
}

impl fmt::Debug for LocalSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalSigner")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl OperatorSigner for LocalSigner {
    async fn sign_hash(&self, hash: B256) -> Result<Bytes, VenueError> {
        Ok(Bytes::copy_from_slice(&self.sign(hash)?))
    }

    fn address(&self) -> Address {
        self.address
    }
}

/// Ethereum address: last 20 bytes of keccak256 over the uncompressed public key
fn address_of(key: &SigningKey) -> Address {
    let point = key.verifying_key().to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}
