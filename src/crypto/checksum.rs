//! SHA-256 checksums for human-facing integrity reporting
//!
//! The checksum is never consulted when decrypting; tamper detection is the
//! job of the GCM authentication tag.

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 digest of `bytes`
pub fn checksum(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digest() {
        assert_eq!(
            checksum(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_checksum_is_stable() {
        let data = b"customers,orders,rewards";
        assert_eq!(checksum(data), checksum(data));
        assert_eq!(checksum(data).len(), 64);
    }

    #[test]
    fn test_single_byte_change_changes_checksum() {
        let original = b"loyalty snapshot".to_vec();
        let mut altered = original.clone();
        altered[3] ^= 0x01;
        assert_ne!(checksum(&original), checksum(&altered));
    }
}
