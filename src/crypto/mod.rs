//! Cryptographic functions for StoreVault
//!
//! Provides AES-256-GCM authenticated encryption with Argon2id key derivation
//! for backup snapshots, the versioned envelope that carries the ciphertext,
//! and SHA-256 checksums for integrity reporting.

pub mod checksum;
pub mod encryption;
pub mod envelope;
pub mod key_derivation;
pub mod secure_memory;

pub use checksum::checksum;
pub use encryption::{CryptoEngine, CryptoError, EncryptedPayload, EngineStatus, ALGORITHM};
pub use envelope::{EncryptedEnvelope, EnvelopeVersion};
pub use key_derivation::{derive_key, DerivedKey, KeyDerivationParams};
pub use secure_memory::SecretString;
