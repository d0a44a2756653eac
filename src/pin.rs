//! Inspection PIN credentials using Argon2id.
//!
//! New PINs are always stored as a salted Argon2id digest. The older
//! reversible form (plain base64 of the PIN) is still understood so vaults
//! written by earlier builds keep working, and is upgraded on the next
//! successful unlock.

use argon2::{Argon2, Params, Version};
use base64::{engine::general_purpose::STANDARD, Engine};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Shortest accepted PIN.
pub const MIN_PIN_LEN: usize = 4;
/// Longest accepted PIN.
pub const MAX_PIN_LEN: usize = 8;

/// Errors that can occur while hashing or checking a PIN.
#[derive(Error, Debug)]
pub enum PinError {
    #[error("Invalid base64 encoding")]
    InvalidBase64,
    #[error("Invalid salt length")]
    InvalidSaltLength,
    #[error("Key derivation failed")]
    KeyDerivationFailed,
}

impl From<PinError> for crate::error::RollSafeError {
    fn from(err: PinError) -> Self {
        Self::Credential(err.to_string())
    }
}

/// A stored PIN credential.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum PinCredential {
    /// Reversible base64 encoding of the PIN. Read-only compatibility form.
    Encoded(String),
    /// Salted one-way digest.
    Argon2id { salt: String, hash: String },
}

impl PinCredential {
    /// Build the reversible legacy form. Only used to read and test old vaults.
    pub fn encoded(pin: &str) -> Self {
        Self::Encoded(STANDARD.encode(pin.as_bytes()))
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, Self::Encoded(_))
    }
}

/// Check that a PIN is 4 to 8 ASCII digits.
pub fn validate_pin(pin: &str) -> Result<(), String> {
    if pin.is_empty() {
        return Err("PIN cannot be empty".to_string());
    }
    if !pin.chars().all(|c| c.is_ascii_digit()) {
        return Err("PIN must contain digits only".to_string());
    }
    if pin.len() < MIN_PIN_LEN || pin.len() > MAX_PIN_LEN {
        return Err(format!(
            "PIN must be between {MIN_PIN_LEN} and {MAX_PIN_LEN} digits"
        ));
    }
    Ok(())
}

/// Hashes and verifies PINs.
#[derive(Debug, Clone)]
pub struct PinHasher {
    time_cost: u32,
    memory_cost: u32,
    parallelism: u32,
    hash_len: usize,
    salt_len: usize,
}

impl Default for PinHasher {
    fn default() -> Self {
        Self {
            time_cost: 2,
            memory_cost: 19_456, // 19 MiB
            parallelism: 1,
            hash_len: 32,
            salt_len: 16,
        }
    }
}

impl PinHasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hasher with custom Argon2 cost; low values keep tests fast.
    pub fn with_cost(memory_cost_kib: u32, time_cost: u32) -> Self {
        Self {
            time_cost,
            memory_cost: memory_cost_kib,
            ..Self::default()
        }
    }

    fn generate_salt(&self) -> Vec<u8> {
        let mut salt = vec![0u8; self.salt_len];
        OsRng.fill_bytes(&mut salt);
        salt
    }

    fn derive(&self, pin: &str, salt: &[u8]) -> Result<Digest, PinError> {
        if salt.len() != self.salt_len {
            return Err(PinError::InvalidSaltLength);
        }

        let params = Params::new(
            self.memory_cost,
            self.time_cost,
            self.parallelism,
            Some(self.hash_len),
        )
        .map_err(|_| PinError::KeyDerivationFailed)?;

        let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params);

        let mut output = vec![0u8; self.hash_len];
        argon2
            .hash_password_into(pin.as_bytes(), salt, &mut output)
            .map_err(|_| PinError::KeyDerivationFailed)?;

        Ok(Digest(output))
    }

    /// Produce a fresh salted credential for `pin`.
    pub fn hash(&self, pin: &str) -> Result<PinCredential, PinError> {
        let salt = self.generate_salt();
        let digest = self.derive(pin, &salt)?;
        Ok(PinCredential::Argon2id {
            salt: STANDARD.encode(&salt),
            hash: STANDARD.encode(&digest.0),
        })
    }

    /// Check `pin` against a stored credential.
    pub fn verify(&self, pin: &str, credential: &PinCredential) -> Result<bool, PinError> {
        match credential {
            PinCredential::Encoded(encoded) => {
                let candidate = STANDARD.encode(pin.as_bytes());
                Ok(constant_time_eq(candidate.as_bytes(), encoded.as_bytes()))
            }
            PinCredential::Argon2id { salt, hash } => {
                let salt = STANDARD
                    .decode(salt)
                    .map_err(|_| PinError::InvalidBase64)?;
                let expected = STANDARD
                    .decode(hash)
                    .map_err(|_| PinError::InvalidBase64)?;
                let digest = self.derive(pin, &salt)?;
                Ok(constant_time_eq(&digest.0, &expected))
            }
        }
    }
}

/// Derived digest, zeroed on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
struct Digest(Vec<u8>);

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
