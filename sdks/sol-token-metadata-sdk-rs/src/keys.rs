//! Key material parsing.

use {
    crate::error::ValidationError,
    solana_sdk::{pubkey::Pubkey, signature::Keypair},
    std::str::FromStr,
};

/// Length of an ed25519 keypair: 32 secret bytes followed by 32 public bytes
pub const KEYPAIR_LENGTH: usize = 64;

/// Parse a base58 public key, naming `field` in the error.
pub fn parse_pubkey(value: &str, field: &str) -> Result<Pubkey, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::InvalidAddress {
            field: field.to_string(),
            value: "<empty>".to_string(),
        });
    }
    Pubkey::from_str(trimmed).map_err(|_| ValidationError::InvalidAddress {
        field: field.to_string(),
        value: trimmed.to_string(),
    })
}

/// Build a keypair from its 64-byte encoding.
///
/// The public half must match the secret half.
pub fn keypair_from_bytes(bytes: &[u8]) -> Result<Keypair, ValidationError> {
    if bytes.len() != KEYPAIR_LENGTH {
        return Err(ValidationError::InvalidKeypair(format!(
            "expected {KEYPAIR_LENGTH} bytes, got {}",
            bytes.len()
        )));
    }
    Keypair::try_from(bytes).map_err(|e| ValidationError::InvalidKeypair(e.to_string()))
}

#[cfg(test)]
mod tests {
    use {super::*, solana_sdk::signature::Signer};

    #[test]
    fn pubkey_errors_name_the_field() {
        let err = parse_pubkey("not-a-key", "tokenMint").unwrap_err();
        assert_eq!(err.to_string(), "Invalid tokenMint address: not-a-key");

        let err = parse_pubkey("   ", "tokenMint").unwrap_err();
        assert!(matches!(err, ValidationError::InvalidAddress { .. }));

        let key = Pubkey::new_unique();
        assert_eq!(parse_pubkey(&format!(" {key} "), "mint").unwrap(), key);
    }

    #[test]
    fn keypair_roundtrip_and_length_check() {
        let original = Keypair::new();
        let restored = keypair_from_bytes(&original.to_bytes()).unwrap();
        assert_eq!(restored.pubkey(), original.pubkey());

        let err = keypair_from_bytes(&[1u8; 32]).unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidKeypair("expected 64 bytes, got 32".into())
        );
    }

    #[test]
    fn mismatched_public_half_rejected() {
        let mut bytes = Keypair::new().to_bytes();
        bytes[32..].copy_from_slice(&Keypair::new().pubkey().to_bytes());
        assert!(keypair_from_bytes(&bytes).is_err());
    }
}
