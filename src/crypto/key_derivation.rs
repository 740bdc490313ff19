//! Key derivation using Argon2id
//!
//! Derives the AES-256 key from the operator secret using Argon2id, a
//! memory-hard key derivation function. Version 1 envelopes use a static
//! application salt; version 2 envelopes carry their own random salt.

use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::encryption::CryptoError;

/// Salt shared by every version 1 envelope
pub const STATIC_SALT: &[u8] = b"storevault-backup-encryption-salt";

/// Length of the derived key in bytes (AES-256)
pub const KEY_LEN: usize = 32;

/// Length of a per-backup random salt in bytes
pub const SALT_LEN: usize = 16;

/// Largest memory cost (KiB) accepted from an envelope: 4 GiB
pub const MAX_MEMORY_COST: u32 = 4 * 1024 * 1024;

/// Argon2 cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyDerivationParams {
    /// Memory cost in KiB (default: 65536 = 64 MiB)
    pub memory_cost: u32,
    /// Time cost (iterations, default: 3)
    pub time_cost: u32,
    /// Parallelism degree (default: 4)
    pub parallelism: u32,
}

impl Default for KeyDerivationParams {
    fn default() -> Self {
        Self {
            memory_cost: 65536,
            time_cost: 3,
            parallelism: 4,
        }
    }
}

impl KeyDerivationParams {
    /// Create params with specific values
    pub fn with_values(memory_cost: u32, time_cost: u32, parallelism: u32) -> Self {
        Self {
            memory_cost,
            time_cost,
            parallelism,
        }
    }

    /// Cheap parameters so unit tests don't spend seconds in Argon2
    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        Self::with_values(1024, 1, 1)
    }
}

/// A derived encryption key, zeroed when dropped
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    key: [u8; KEY_LEN],
}

impl DerivedKey {
    /// Get the key bytes
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.key
    }
}

/// Derive an encryption key from `secret` and `salt`
pub fn derive_key(
    secret: &[u8],
    salt: &[u8],
    params: &KeyDerivationParams,
) -> Result<DerivedKey, CryptoError> {
    let argon2_params = Params::new(
        params.memory_cost,
        params.time_cost,
        params.parallelism,
        Some(KEY_LEN),
    )
    .map_err(|e| CryptoError::KeyDerivation(format!("Invalid Argon2 parameters: {}", e)))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

    let mut key = [0u8; KEY_LEN];
    argon2
        .hash_password_into(secret, salt, &mut key)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;

    Ok(DerivedKey { key })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_key() {
        let params = KeyDerivationParams::for_tests();
        let key = derive_key(b"test_passphrase", STATIC_SALT, &params).unwrap();
        assert_eq!(key.as_bytes().len(), KEY_LEN);
    }

    #[test]
    fn test_same_secret_same_key() {
        let params = KeyDerivationParams::for_tests();
        let key1 = derive_key(b"test_passphrase", STATIC_SALT, &params).unwrap();
        let key2 = derive_key(b"test_passphrase", STATIC_SALT, &params).unwrap();
        assert_eq!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_different_secret_different_key() {
        let params = KeyDerivationParams::for_tests();
        let key1 = derive_key(b"passphrase1", STATIC_SALT, &params).unwrap();
        let key2 = derive_key(b"passphrase2", STATIC_SALT, &params).unwrap();
        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_different_salt_different_key() {
        let params = KeyDerivationParams::for_tests();
        let key1 = derive_key(b"same_passphrase", b"salt-one-16bytes", &params).unwrap();
        let key2 = derive_key(b"same_passphrase", b"salt-two-16bytes", &params).unwrap();
        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_invalid_params_rejected() {
        // Argon2 requires at least 8 KiB per lane
        let params = KeyDerivationParams::with_values(1, 1, 4);
        let result = derive_key(b"secret", STATIC_SALT, &params);
        assert!(matches!(result, Err(CryptoError::KeyDerivation(_))));
    }

    #[test]
    fn test_short_salt_rejected() {
        let params = KeyDerivationParams::for_tests();
        let result = derive_key(b"secret", b"tiny", &params);
        assert!(matches!(result, Err(CryptoError::KeyDerivation(_))));
    }
}
