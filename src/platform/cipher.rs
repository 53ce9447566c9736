//! Symmetric decoders used by the bootstrap step and the lksfy gate

use crate::error::GateKeyError;
use aes::Aes256;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, KeyIvInit};
use sha2::{Digest, Sha256};
use tracing::debug;

type Aes256CbcDec = cbc::Decryptor<Aes256>;

const KEY_SALT: &str = "sDye71jNq5";
const IV_SALT: &str = "7M9u8DG4X";

/// Decode base64 input and undo a repeating-key XOR
pub fn xor_decode(input_b64: &str, key: &[u8]) -> Result<String, GateKeyError> {
    if key.is_empty() {
        return Err(GateKeyError::DecryptionFailure("XOR key empty".to_string()));
    }

    let raw = STANDARD
        .decode(input_b64)
        .map_err(|e| GateKeyError::DecryptionFailure(format!("invalid base64: {}", e)))?;
    debug!("XOR payload decoded to {} bytes", raw.len());

    let plain: Vec<u8> = raw
        .iter()
        .zip(key.iter().cycle())
        .map(|(byte, k)| byte ^ k)
        .collect();

    String::from_utf8(plain)
        .map_err(|e| GateKeyError::DecryptionFailure(format!("XOR output is not UTF-8: {}", e)))
}

/// AES-256-CBC key and IV derived from a link alias
#[derive(Clone, PartialEq, Eq)]
pub struct CipherMaterial {
    key: [u8; 32],
    iv: [u8; 16],
}

impl CipherMaterial {
    /// Derive key and IV from the alias.
    ///
    /// Both are prefixes of the lowercase hex SHA-256 digest of a salted alias,
    /// used as ASCII bytes.
    pub fn derive(alias: &str) -> Self {
        let key_hex = hex_digest(&format!("{}{}", KEY_SALT, alias));
        let iv_hex = hex_digest(&format!("{}{}", IV_SALT, alias));

        let mut key = [0u8; 32];
        let mut iv = [0u8; 16];
        key.copy_from_slice(&key_hex.as_bytes()[..32]);
        iv.copy_from_slice(&iv_hex.as_bytes()[..16]);

        Self { key, iv }
    }

    pub fn key(&self) -> &[u8; 32] {
        &self.key
    }

    pub fn iv(&self) -> &[u8; 16] {
        &self.iv
    }

    /// Decrypt double base64 encoded ciphertext to UTF-8 text
    pub fn decrypt(&self, payload: &str) -> Result<String, GateKeyError> {
        let inner = STANDARD
            .decode(payload.trim())
            .map_err(|e| GateKeyError::DecryptionFailure(format!("outer base64: {}", e)))?;
        let ciphertext = STANDARD
            .decode(&inner)
            .map_err(|e| GateKeyError::DecryptionFailure(format!("inner base64: {}", e)))?;

        let mut buf = ciphertext;
        let cipher = Aes256CbcDec::new_from_slices(&self.key, &self.iv)
            .map_err(|e| GateKeyError::DecryptionFailure(e.to_string()))?;
        let plain = cipher
            .decrypt_padded_mut::<Pkcs7>(&mut buf)
            .map_err(|_| {
                GateKeyError::DecryptionFailure("bad padding (wrong alias?)".to_string())
            })?;

        String::from_utf8(plain.to_vec())
            .map_err(|e| GateKeyError::DecryptionFailure(format!("plaintext is not UTF-8: {}", e)))
    }
}

impl std::fmt::Debug for CipherMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CipherMaterial").finish_non_exhaustive()
    }
}

/// Decrypt a payload with material derived from `alias`
pub fn decrypt_for_alias(payload: &str, alias: &str) -> Result<String, GateKeyError> {
    CipherMaterial::derive(alias).decrypt(payload)
}

fn hex_digest(input: &str) -> String {
    format!("{:x}", Sha256::digest(input.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOOTSTRAP_KEY: &[u8] = b"k6kW8r#Tz3f;";

    // "https://generateed.pages.dev/?key=GOLDEN123&src=lksfy" under alias "abc"
    const GOLDEN_ABC: &str = "bkV6TEhxRTVONFV5QjNZWURzczU2NHh3R3hZNXNuUXZPWUlwTWx2d0sreCszaGRNWEtjN1lsYkJHMUdiYmxjaG5pODlmM01sY082TWtSMTFVZjRXVnc9PQ==";

    fn xor_encode(plain: &[u8], key: &[u8]) -> String {
        let mixed: Vec<u8> = plain
            .iter()
            .zip(key.iter().cycle())
            .map(|(byte, k)| byte ^ k)
            .collect();
        STANDARD.encode(mixed)
    }

    #[test]
    fn test_xor_round_trip() {
        let samples = [
            "",
            "a",
            r#"{"baseUrl":"https://api.example"}"#,
            "longer than the twelve byte key, so the key wraps several times",
            "ünïcødé ✓",
        ];
        for key in [&b"k"[..], BOOTSTRAP_KEY, b"another key"] {
            for sample in samples {
                let encoded = xor_encode(sample.as_bytes(), key);
                assert_eq!(xor_decode(&encoded, key).unwrap(), sample);
            }
        }
    }

    #[test]
    fn test_xor_known_value() {
        // precomputed with the bootstrap key
        assert_eq!(xor_decode("A1MHO1c=", BOOTSTRAP_KEY).unwrap(), "hello");
    }

    #[test]
    fn test_xor_failures() {
        assert!(matches!(
            xor_decode("***", BOOTSTRAP_KEY),
            Err(GateKeyError::DecryptionFailure(_))
        ));
        assert!(matches!(
            xor_decode("aGVsbG8=", b""),
            Err(GateKeyError::DecryptionFailure(_))
        ));
        // 0xff 0xfe never forms valid UTF-8
        let encoded = xor_encode(&[0xff, 0xfe], b"\0");
        assert!(matches!(
            xor_decode(&encoded, b"\0"),
            Err(GateKeyError::DecryptionFailure(_))
        ));
    }

    #[test]
    fn test_material_derivation() {
        let material = CipherMaterial::derive("abc");
        assert!(material.key().iter().all(|b| b.is_ascii_hexdigit()));
        assert!(material.iv().iter().all(|b| b.is_ascii_hexdigit()));
        assert_eq!(material, CipherMaterial::derive("abc"));
        assert_ne!(material, CipherMaterial::derive("abd"));
        assert_eq!(
            material.key().to_vec(),
            hex_digest("sDye71jNq5abc").as_bytes()[..32].to_vec()
        );
    }

    #[test]
    fn test_golden_vector() {
        assert_eq!(
            decrypt_for_alias(GOLDEN_ABC, "abc").unwrap(),
            "https://generateed.pages.dev/?key=GOLDEN123&src=lksfy"
        );
    }

    #[test]
    fn test_wrong_alias_fails() {
        let result = decrypt_for_alias(GOLDEN_ABC, "abd");
        assert!(matches!(result, Err(GateKeyError::DecryptionFailure(_))));
    }

    #[test]
    fn test_malformed_payloads() {
        assert!(decrypt_for_alias("not base64 at all!", "abc").is_err());
        // valid outer base64 wrapping invalid inner base64
        let outer = STANDARD.encode("%%%");
        assert!(decrypt_for_alias(&outer, "abc").is_err());
        // ciphertext not a multiple of the block size
        let outer = STANDARD.encode(STANDARD.encode([1u8, 2, 3]));
        assert!(decrypt_for_alias(&outer, "abc").is_err());
    }
}
