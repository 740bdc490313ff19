//! Encrypted envelope format
//!
//! An envelope is the JSON object persisted for an encrypted backup:
//!
//! ```json
//! { "iv": "<hex>", "authTag": "<hex>", "data": "<base64>" }
//! ```
//!
//! Version 1 envelopes carry no `version` field, use a 16-byte IV and the
//! static key-derivation salt. Their Argon2 cost is not recorded, so they are
//! opened with the configured `kdf`, which legacy writers left at the
//! defaults. Version 2 envelopes add `"version": 2`, a 12-byte IV, a
//! per-backup random `salt` (hex) and the Argon2 cost they were sealed with:
//!
//! ```json
//! { "version": 2, "salt": "<hex>", "kdf": { "memory_cost": 65536, "time_cost": 3, "parallelism": 4 }, ... }
//! ```

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

use super::encryption::{CryptoError, EncryptedPayload};
use super::key_derivation::{KeyDerivationParams, MAX_MEMORY_COST};

/// Envelope format version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum EnvelopeVersion {
    /// Static salt, 16-byte IV
    V1,
    /// Per-backup salt, 12-byte IV
    #[default]
    V2,
}

impl EnvelopeVersion {
    /// IV length used when sealing with this version
    pub fn iv_len(self) -> usize {
        match self {
            Self::V1 => 16,
            Self::V2 => 12,
        }
    }
}

impl From<EnvelopeVersion> for u8 {
    fn from(version: EnvelopeVersion) -> Self {
        match version {
            EnvelopeVersion::V1 => 1,
            EnvelopeVersion::V2 => 2,
        }
    }
}

impl TryFrom<u8> for EnvelopeVersion {
    type Error = CryptoError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::V1),
            2 => Ok(Self::V2),
            other => Err(CryptoError::UnsupportedVersion(other)),
        }
    }
}

/// Serialized form of an encrypted snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedEnvelope {
    /// Absent on version 1 envelopes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u8>,
    /// Hex salt, version 2 only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
    /// Argon2 cost used for the key, version 2 only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kdf: Option<KeyDerivationParams>,
    /// Hex initialization vector
    pub iv: String,
    /// Hex GCM authentication tag
    pub auth_tag: String,
    /// Base64 ciphertext
    pub data: String,
}

/// Raw bytes of an envelope after hex/base64 decoding
pub(crate) struct DecodedEnvelope {
    pub salt: Option<Vec<u8>>,
    pub kdf: Option<KeyDerivationParams>,
    pub payload: EncryptedPayload,
}

impl EncryptedEnvelope {
    /// Build an envelope from a payload produced by a single encryption call
    pub(crate) fn from_payload(
        payload: &EncryptedPayload,
        version: EnvelopeVersion,
        salt: Option<&[u8]>,
        kdf: Option<KeyDerivationParams>,
    ) -> Self {
        Self {
            version: match version {
                EnvelopeVersion::V1 => None,
                EnvelopeVersion::V2 => Some(2),
            },
            salt: salt.map(hex::encode),
            kdf,
            iv: hex::encode(&payload.iv),
            auth_tag: hex::encode(&payload.auth_tag),
            data: STANDARD.encode(&payload.ciphertext),
        }
    }

    /// Check whether a parsed JSON document has the envelope shape
    pub fn matches_shape(value: &serde_json::Value) -> bool {
        value.as_object().is_some_and(|object| {
            object.contains_key("iv") && object.contains_key("authTag") && object.contains_key("data")
        })
    }

    /// Parse an envelope out of a JSON document already known to have its shape
    pub fn from_value(value: serde_json::Value) -> Result<Self, CryptoError> {
        serde_json::from_value(value).map_err(|e| CryptoError::Malformed {
            field: "envelope",
            reason: e.to_string(),
        })
    }

    /// The envelope's format version
    pub fn format_version(&self) -> Result<EnvelopeVersion, CryptoError> {
        EnvelopeVersion::try_from(self.version.unwrap_or(1))
    }

    /// Decode the hex and base64 fields
    pub(crate) fn decode(&self) -> Result<DecodedEnvelope, CryptoError> {
        let version = self.format_version()?;

        let salt = match (&self.salt, version) {
            (Some(salt), _) => Some(decode_hex("salt", salt)?),
            (None, EnvelopeVersion::V2) => {
                return Err(CryptoError::Malformed {
                    field: "salt",
                    reason: "version 2 envelope without salt".to_string(),
                })
            }
            (None, EnvelopeVersion::V1) => None,
        };

        if let Some(kdf) = &self.kdf {
            if kdf.memory_cost > MAX_MEMORY_COST {
                return Err(CryptoError::Malformed {
                    field: "kdf",
                    reason: format!(
                        "memory cost {} KiB exceeds {} KiB",
                        kdf.memory_cost, MAX_MEMORY_COST
                    ),
                });
            }
        }

        let ciphertext = STANDARD.decode(&self.data).map_err(|e| CryptoError::Malformed {
            field: "data",
            reason: e.to_string(),
        })?;

        Ok(DecodedEnvelope {
            salt,
            kdf: self.kdf,
            payload: EncryptedPayload {
                ciphertext,
                iv: decode_hex("iv", &self.iv)?,
                auth_tag: decode_hex("authTag", &self.auth_tag)?,
            },
        })
    }
}

fn decode_hex(field: &'static str, value: &str) -> Result<Vec<u8>, CryptoError> {
    hex::decode(value).map_err(|e| CryptoError::Malformed {
        field,
        reason: e.to_string(),
    })
}
