//! AES-256-GCM encryption/decryption
//!
//! `CryptoEngine` turns a byte buffer into an authenticated ciphertext and
//! back. The engine is configured once from the operator secret; without a
//! usable secret it stays unconfigured and every encryption call returns
//! `CryptoError::NotConfigured` instead of failing loudly.

use std::sync::Arc;

use aes_gcm::aead::consts::U16;
use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{AeadInPlace, KeyInit, OsRng};
use aes_gcm::aes::Aes256;
use aes_gcm::{Aes256Gcm, AesGcm, Nonce, Tag};
use serde::Serialize;
use thiserror::Error;

use super::envelope::{EncryptedEnvelope, EnvelopeVersion};
use super::key_derivation::{derive_key, DerivedKey, KeyDerivationParams, SALT_LEN, STATIC_SALT};
use super::secure_memory::SecretString;

/// Cipher name reported by `status()`
pub const ALGORITHM: &str = "aes-256-gcm";

/// Minimum secret length (in characters) that activates encryption
pub const MIN_SECRET_LEN: usize = 32;

/// Size of the GCM authentication tag in bytes
pub const TAG_SIZE: usize = 16;

/// AES-256-GCM with the 16-byte IV used by version 1 envelopes
type LegacyAes256Gcm = AesGcm<Aes256, U16>;

/// Errors raised by the cipher layer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("encryption is not configured")]
    NotConfigured,

    #[error("decryption failed: invalid key or corrupted data")]
    AuthenticationFailed,

    #[error("malformed {field}: {reason}")]
    Malformed { field: &'static str, reason: String },

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("cipher failure: {0}")]
    Cipher(String),

    #[error("unsupported envelope version: {0}")]
    UnsupportedVersion(u8),
}

/// Ciphertext with the IV and tag produced by the same encryption call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedPayload {
    pub ciphertext: Vec<u8>,
    pub iv: Vec<u8>,
    pub auth_tag: Vec<u8>,
}

/// Operator-facing view of the engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineStatus {
    pub configured: bool,
    pub algorithm: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

struct ActiveKey {
    secret: SecretString,
    params: KeyDerivationParams,
    static_key: DerivedKey,
}

#[derive(Clone)]
enum EngineState {
    Unconfigured { reason: String },
    Configured(Arc<ActiveKey>),
}

/// Symmetric authenticated encryption over backup bytes
///
/// Cloning is cheap; clones share the derived key, which lets callers move
/// an engine onto a blocking worker thread.
#[derive(Clone)]
pub struct CryptoEngine {
    state: EngineState,
}

impl CryptoEngine {
    /// Configure the engine from an optional operator secret
    ///
    /// The static-salt key is derived eagerly. A missing or short secret, or
    /// unusable Argon2 parameters, leave the engine unconfigured.
    pub fn configure(secret: Option<&str>, params: KeyDerivationParams) -> Self {
        let secret = match secret {
            Some(s) if !s.is_empty() => SecretString::new(s),
            _ => return Self::unconfigured("no encryption secret provided"),
        };

        if secret.char_len() < MIN_SECRET_LEN {
            return Self::unconfigured(format!(
                "encryption secret must be at least {} characters",
                MIN_SECRET_LEN
            ));
        }

        match derive_key(secret.as_bytes(), STATIC_SALT, &params) {
            Ok(static_key) => Self {
                state: EngineState::Configured(Arc::new(ActiveKey {
                    secret,
                    params,
                    static_key,
                })),
            },
            Err(e) => Self::unconfigured(e.to_string()),
        }
    }

    /// An engine that never encrypts
    pub fn unconfigured(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        tracing::warn!(%reason, "backup encryption disabled");
        Self {
            state: EngineState::Unconfigured { reason },
        }
    }

    /// Whether a usable key is available
    pub fn is_configured(&self) -> bool {
        matches!(self.state, EngineState::Configured(_))
    }

    /// Current configuration state
    pub fn status(&self) -> EngineStatus {
        match &self.state {
            EngineState::Configured(_) => EngineStatus {
                configured: true,
                algorithm: ALGORITHM.to_string(),
                reason: None,
            },
            EngineState::Unconfigured { reason } => EngineStatus {
                configured: false,
                algorithm: ALGORITHM.to_string(),
                reason: Some(reason.clone()),
            },
        }
    }

    fn active(&self) -> Result<&ActiveKey, CryptoError> {
        match &self.state {
            EngineState::Configured(active) => Ok(active),
            EngineState::Unconfigured { .. } => Err(CryptoError::NotConfigured),
        }
    }

    /// Encrypt with the static-salt key and a fresh 16-byte IV
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<EncryptedPayload, CryptoError> {
        let active = self.active()?;
        seal_detached(&active.static_key, EnvelopeVersion::V1.iv_len(), plaintext)
    }

    /// Decrypt a payload produced under the static-salt key
    pub fn decrypt(
        &self,
        ciphertext: &[u8],
        iv: &[u8],
        auth_tag: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        let active = self.active()?;
        open_detached(&active.static_key, ciphertext, iv, auth_tag)
    }

    /// Encrypt `plaintext` into an envelope of the requested version
    pub fn seal(
        &self,
        plaintext: &[u8],
        version: EnvelopeVersion,
    ) -> Result<EncryptedEnvelope, CryptoError> {
        let active = self.active()?;

        match version {
            EnvelopeVersion::V1 => {
                let payload = seal_detached(&active.static_key, version.iv_len(), plaintext)?;
                Ok(EncryptedEnvelope::from_payload(&payload, version, None, None))
            }
            EnvelopeVersion::V2 => {
                let mut salt = [0u8; SALT_LEN];
                OsRng.fill_bytes(&mut salt);
                let key = derive_key(active.secret.as_bytes(), &salt, &active.params)?;
                let payload = seal_detached(&key, version.iv_len(), plaintext)?;
                Ok(EncryptedEnvelope::from_payload(
                    &payload,
                    version,
                    Some(&salt),
                    Some(active.params),
                ))
            }
        }
    }

    /// Decrypt an envelope of any supported version
    ///
    /// Keys are derived with the Argon2 cost recorded in the envelope; the
    /// configured cost applies only to envelopes that carry none.
    pub fn open(&self, envelope: &EncryptedEnvelope) -> Result<Vec<u8>, CryptoError> {
        let active = self.active()?;
        let decoded = envelope.decode()?;
        let payload = &decoded.payload;

        let derived;
        let key = match (&decoded.salt, decoded.kdf) {
            (Some(salt), kdf) => {
                let params = kdf.unwrap_or(active.params);
                derived = derive_key(active.secret.as_bytes(), salt, &params)?;
                &derived
            }
            (None, Some(kdf)) if kdf != active.params => {
                derived = derive_key(active.secret.as_bytes(), STATIC_SALT, &kdf)?;
                &derived
            }
            (None, _) => &active.static_key,
        };

        open_detached(key, &payload.ciphertext, &payload.iv, &payload.auth_tag)
    }
}

/// Run AES-256-GCM over `plaintext` with a fresh IV of `iv_len` bytes
fn seal_detached(
    key: &DerivedKey,
    iv_len: usize,
    plaintext: &[u8],
) -> Result<EncryptedPayload, CryptoError> {
    let mut iv = vec![0u8; iv_len];
    OsRng.fill_bytes(&mut iv);

    let mut buffer = plaintext.to_vec();
    let tag = match iv_len {
        12 => Aes256Gcm::new_from_slice(key.as_bytes())
            .map_err(|e| CryptoError::Cipher(e.to_string()))?
            .encrypt_in_place_detached(Nonce::from_slice(&iv), b"", &mut buffer),
        16 => LegacyAes256Gcm::new_from_slice(key.as_bytes())
            .map_err(|e| CryptoError::Cipher(e.to_string()))?
            .encrypt_in_place_detached(Nonce::<U16>::from_slice(&iv), b"", &mut buffer),
        other => return Err(invalid_iv(other)),
    }
    .map_err(|_| CryptoError::Cipher("encryption failed".to_string()))?;

    Ok(EncryptedPayload {
        ciphertext: buffer,
        iv,
        auth_tag: tag.to_vec(),
    })
}

/// Verify the tag and decrypt; the IV length selects the GCM variant
fn open_detached(
    key: &DerivedKey,
    ciphertext: &[u8],
    iv: &[u8],
    auth_tag: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    if auth_tag.len() != TAG_SIZE {
        return Err(CryptoError::Malformed {
            field: "authTag",
            reason: format!("expected {} bytes, got {}", TAG_SIZE, auth_tag.len()),
        });
    }
    let tag = Tag::from_slice(auth_tag);

    let mut buffer = ciphertext.to_vec();
    match iv.len() {
        12 => Aes256Gcm::new_from_slice(key.as_bytes())
            .map_err(|e| CryptoError::Cipher(e.to_string()))?
            .decrypt_in_place_detached(Nonce::from_slice(iv), b"", &mut buffer, tag),
        16 => LegacyAes256Gcm::new_from_slice(key.as_bytes())
            .map_err(|e| CryptoError::Cipher(e.to_string()))?
            .decrypt_in_place_detached(Nonce::<U16>::from_slice(iv), b"", &mut buffer, tag),
        other => return Err(invalid_iv(other)),
    }
    .map_err(|_| CryptoError::AuthenticationFailed)?;

    Ok(buffer)
}

fn invalid_iv(len: usize) -> CryptoError {
    CryptoError::Malformed {
        field: "iv",
        reason: format!("expected 12 or 16 bytes, got {}", len),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef-retail";

    fn test_engine() -> CryptoEngine {
        CryptoEngine::configure(Some(SECRET), KeyDerivationParams::for_tests())
    }

    #[test]
    fn test_encrypt_decrypt() {
        let engine = test_engine();
        let plaintext = b"{\"customers\":[]}";

        let payload = engine.encrypt(plaintext).unwrap();
        assert_eq!(payload.iv.len(), 16);
        assert_eq!(payload.auth_tag.len(), TAG_SIZE);

        let decrypted = engine
            .decrypt(&payload.ciphertext, &payload.iv, &payload.auth_tag)
            .unwrap();
        assert_eq!(plaintext, decrypted.as_slice());
    }

    #[test]
    fn test_fresh_iv_per_call() {
        let engine = test_engine();
        let plaintext = b"same bytes twice";

        let first = engine.encrypt(plaintext).unwrap();
        let second = engine.encrypt(plaintext).unwrap();

        assert_ne!(first.iv, second.iv);
        assert_ne!(first.ciphertext, second.ciphertext);
    }

    #[test]
    fn test_unconfigured_without_secret() {
        let engine = CryptoEngine::configure(None, KeyDerivationParams::for_tests());
        assert!(!engine.is_configured());
        assert_eq!(engine.encrypt(b"data"), Err(CryptoError::NotConfigured));

        let status = engine.status();
        assert!(!status.configured);
        assert_eq!(status.algorithm, ALGORITHM);
    }

    #[test]
    fn test_short_secret_leaves_engine_unconfigured() {
        let engine = CryptoEngine::configure(Some("too-short"), KeyDerivationParams::for_tests());
        assert!(!engine.is_configured());
        assert!(engine.status().reason.unwrap().contains("32"));
    }

    #[test]
    fn test_exactly_minimum_length_activates() {
        let secret = "x".repeat(MIN_SECRET_LEN);
        let engine = CryptoEngine::configure(Some(&secret), KeyDerivationParams::for_tests());
        assert!(engine.status().configured);
    }

    #[test]
    fn test_every_ciphertext_bit_flip_detected() {
        let engine = test_engine();
        let payload = engine.encrypt(b"orders: 42").unwrap();

        for index in 0..payload.ciphertext.len() {
            for bit in 0..8 {
                let mut tampered = payload.ciphertext.clone();
                tampered[index] ^= 1 << bit;
                let result = engine.decrypt(&tampered, &payload.iv, &payload.auth_tag);
                assert_eq!(result, Err(CryptoError::AuthenticationFailed));
            }
        }
    }

    #[test]
    fn test_every_tag_bit_flip_detected() {
        let engine = test_engine();
        let payload = engine.encrypt(b"rewards ledger").unwrap();

        for index in 0..payload.auth_tag.len() {
            for bit in 0..8 {
                let mut tag = payload.auth_tag.clone();
                tag[index] ^= 1 << bit;
                let result = engine.decrypt(&payload.ciphertext, &payload.iv, &tag);
                assert_eq!(result, Err(CryptoError::AuthenticationFailed));
            }
        }
    }

    #[test]
    fn test_wrong_key_fails() {
        let engine = test_engine();
        let other = CryptoEngine::configure(
            Some("another-secret-that-is-long-enough-to-use"),
            KeyDerivationParams::for_tests(),
        );

        let payload = engine.encrypt(b"loyalty members").unwrap();
        let result = other.decrypt(&payload.ciphertext, &payload.iv, &payload.auth_tag);
        assert_eq!(result, Err(CryptoError::AuthenticationFailed));
    }

    #[test]
    fn test_truncated_tag_is_malformed() {
        let engine = test_engine();
        let payload = engine.encrypt(b"data").unwrap();
        let result = engine.decrypt(&payload.ciphertext, &payload.iv, &payload.auth_tag[..8]);
        assert!(matches!(result, Err(CryptoError::Malformed { field: "authTag", .. })));
    }

    #[test]
    fn test_odd_iv_length_is_malformed() {
        let engine = test_engine();
        let payload = engine.encrypt(b"data").unwrap();
        let result = engine.decrypt(&payload.ciphertext, &payload.iv[..10], &payload.auth_tag);
        assert!(matches!(result, Err(CryptoError::Malformed { field: "iv", .. })));
    }

    #[test]
    fn test_seal_open_v1() {
        let engine = test_engine();
        let envelope = engine.seal(b"legacy format", EnvelopeVersion::V1).unwrap();

        assert!(envelope.version.is_none());
        assert_eq!(envelope.iv.len(), 32);
        assert_eq!(engine.open(&envelope).unwrap(), b"legacy format");
    }

    #[test]
    fn test_seal_open_v2() {
        let engine = test_engine();
        let envelope = engine.seal(b"salted format", EnvelopeVersion::V2).unwrap();

        assert_eq!(envelope.version, Some(2));
        assert_eq!(envelope.iv.len(), 24);
        assert!(envelope.salt.is_some());
        assert_eq!(engine.open(&envelope).unwrap(), b"salted format");
    }

    #[test]
    fn test_v2_opens_after_kdf_retune() {
        let sealing = test_engine();
        let envelope = sealing.seal(b"orders: 7", EnvelopeVersion::V2).unwrap();
        assert_eq!(envelope.kdf, Some(KeyDerivationParams::for_tests()));

        let retuned =
            CryptoEngine::configure(Some(SECRET), KeyDerivationParams::with_values(2048, 1, 1));
        assert_eq!(retuned.open(&envelope).unwrap(), b"orders: 7");
    }

    #[test]
    fn test_v2_without_recorded_kdf_uses_configured_cost() {
        let engine = test_engine();
        let mut envelope = engine.seal(b"early v2", EnvelopeVersion::V2).unwrap();
        envelope.kdf = None;
        assert_eq!(engine.open(&envelope).unwrap(), b"early v2");
    }

    #[test]
    fn test_v1_is_opened_with_configured_cost() {
        let engine = test_engine();
        let envelope = engine.seal(b"legacy", EnvelopeVersion::V1).unwrap();
        assert!(envelope.kdf.is_none());

        let retuned =
            CryptoEngine::configure(Some(SECRET), KeyDerivationParams::with_values(2048, 1, 1));
        assert_eq!(retuned.open(&envelope), Err(CryptoError::AuthenticationFailed));
    }

    #[test]
    fn test_v2_salts_differ_per_backup() {
        let engine = test_engine();
        let first = engine.seal(b"snapshot", EnvelopeVersion::V2).unwrap();
        let second = engine.seal(b"snapshot", EnvelopeVersion::V2).unwrap();
        assert_ne!(first.salt, second.salt);
    }

    #[test]
    fn test_open_detects_tampered_envelope_data() {
        use base64::{engine::general_purpose::STANDARD, Engine};

        let engine = test_engine();
        let mut envelope = engine.seal(b"customers: 3", EnvelopeVersion::V2).unwrap();

        let mut ciphertext = STANDARD.decode(&envelope.data).unwrap();
        ciphertext[0] ^= 0x01;
        envelope.data = STANDARD.encode(&ciphertext);

        assert_eq!(engine.open(&envelope), Err(CryptoError::AuthenticationFailed));
    }

    #[test]
    fn test_open_unconfigured() {
        let engine = test_engine();
        let envelope = engine.seal(b"x", EnvelopeVersion::V1).unwrap();

        let unconfigured = CryptoEngine::unconfigured("test");
        assert_eq!(unconfigured.open(&envelope), Err(CryptoError::NotConfigured));
    }

    #[test]
    fn test_empty_and_large_plaintext() {
        let engine = test_engine();

        let empty = engine.seal(b"", EnvelopeVersion::V2).unwrap();
        assert!(engine.open(&empty).unwrap().is_empty());

        let large: Vec<u8> = (0..100_000).map(|i| (i % 251) as u8).collect();
        let sealed = engine.seal(&large, EnvelopeVersion::V2).unwrap();
        assert_eq!(engine.open(&sealed).unwrap(), large);
    }
}
