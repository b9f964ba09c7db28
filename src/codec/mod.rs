//! Coordinate codec
//!
//! Well coordinates are stored as opaque strings. A [`CoordinateCodec`]
//! turns one back into a number, or `None` when it cannot.
//!
//! - `PlainCoordinateCodec`: the string is the decimal value itself
//! - `ChaChaCoordinateCodec`: base64(nonce || ChaCha20-Poly1305 ciphertext)

use base64::{engine::general_purpose, Engine as _};
use chacha20poly1305::{aead::Aead, ChaCha20Poly1305, Key, KeyInit, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use std::sync::Arc;

use crate::config::{CodecConfig, CodecMode};

/// Key length for ChaCha20-Poly1305 (32 bytes)
pub const KEY_LEN: usize = 32;

/// Nonce length for ChaCha20-Poly1305 (12 bytes)
pub const NONCE_LEN: usize = 12;

/// Decrypts stored coordinate strings.
pub trait CoordinateCodec: Send + Sync {
    /// `None` when the string cannot be decrypted or is not a finite number.
    fn decrypt_to_number(&self, ciphertext: &str) -> Option<f64>;
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("invalid key: {0}")]
    InvalidKey(String),
    #[error("missing key: set codec.key_hex or ${0}")]
    MissingKey(String),
    #[error("encryption failed")]
    Encrypt,
}

/// Coordinates stored in the clear.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainCoordinateCodec;

impl CoordinateCodec for PlainCoordinateCodec {
    fn decrypt_to_number(&self, ciphertext: &str) -> Option<f64> {
        parse_finite(ciphertext)
    }
}

/// Coordinates sealed with ChaCha20-Poly1305 under a shared key.
pub struct ChaChaCoordinateCodec {
    cipher: ChaCha20Poly1305,
}

impl ChaChaCoordinateCodec {
    /// Build from a 32-byte key.
    pub fn new(key: &[u8; KEY_LEN]) -> Self {
        Self {
            cipher: ChaCha20Poly1305::new(Key::from_slice(key)),
        }
    }

    /// Build from 64 hex characters.
    pub fn from_hex(key_hex: &str) -> Result<Self, CodecError> {
        let bytes = hex::decode(key_hex.trim()).map_err(|e| CodecError::InvalidKey(e.to_string()))?;
        let key: [u8; KEY_LEN] = bytes.try_into().map_err(|b: Vec<u8>| {
            CodecError::InvalidKey(format!("expected {KEY_LEN} bytes, got {}", b.len()))
        })?;
        Ok(Self::new(&key))
    }

    /// Seal a coordinate for storage. A fresh random nonce is used per call.
    pub fn encrypt_number(&self, value: f64) -> Result<String, CodecError> {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let sealed = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), value.to_string().as_bytes())
            .map_err(|_| CodecError::Encrypt)?;

        let mut framed = Vec::with_capacity(NONCE_LEN + sealed.len());
        framed.extend_from_slice(&nonce);
        framed.extend_from_slice(&sealed);
        Ok(general_purpose::STANDARD.encode(framed))
    }
}

impl CoordinateCodec for ChaChaCoordinateCodec {
    fn decrypt_to_number(&self, ciphertext: &str) -> Option<f64> {
        let framed = general_purpose::STANDARD.decode(ciphertext.trim()).ok()?;
        if framed.len() <= NONCE_LEN {
            return None;
        }
        let (nonce, sealed) = framed.split_at(NONCE_LEN);
        let plain = self.cipher.decrypt(Nonce::from_slice(nonce), sealed).ok()?;
        parse_finite(std::str::from_utf8(&plain).ok()?)
    }
}

fn parse_finite(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Build the codec selected by configuration.
pub fn from_config(cfg: &CodecConfig) -> Result<Arc<dyn CoordinateCodec>, CodecError> {
    match cfg.mode {
        CodecMode::Plain => Ok(Arc::new(PlainCoordinateCodec)),
        CodecMode::Chacha => {
            let key_hex = cfg
                .resolve_key_hex()
                .ok_or_else(|| CodecError::MissingKey(cfg.key_env.clone()))?;
            Ok(Arc::new(ChaChaCoordinateCodec::from_hex(&key_hex)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY_HEX: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

    #[test]
    fn test_plain_codec() {
        assert_eq!(PlainCoordinateCodec.decrypt_to_number(" 52.25 "), Some(52.25));
        assert_eq!(PlainCoordinateCodec.decrypt_to_number("north"), None);
        assert_eq!(PlainCoordinateCodec.decrypt_to_number("NaN"), None);
    }

    #[test]
    fn test_chacha_encrypt_decrypt() {
        let codec = ChaChaCoordinateCodec::from_hex(KEY_HEX).unwrap();
        let sealed = codec.encrypt_number(54.7321).unwrap();
        assert_ne!(sealed, "54.7321");
        assert_eq!(codec.decrypt_to_number(&sealed), Some(54.7321));
    }

    #[test]
    fn test_chacha_rejects_tampered_and_foreign_ciphertext() {
        let codec = ChaChaCoordinateCodec::from_hex(KEY_HEX).unwrap();
        let other = ChaChaCoordinateCodec::new(&[7u8; KEY_LEN]);
        let sealed = other.encrypt_number(10.0).unwrap();

        assert_eq!(codec.decrypt_to_number(&sealed), None);
        assert_eq!(codec.decrypt_to_number("not base64 at all"), None);
        assert_eq!(codec.decrypt_to_number(""), None);
        assert_eq!(codec.decrypt_to_number("54.7"), None);
    }

    #[test]
    fn test_bad_key_hex() {
        assert!(matches!(
            ChaChaCoordinateCodec::from_hex("abcd"),
            Err(CodecError::InvalidKey(_))
        ));
        assert!(ChaChaCoordinateCodec::from_hex("zz").is_err());
    }

    #[test]
    fn test_from_config_plain() {
        let codec = from_config(&CodecConfig::default()).unwrap();
        assert_eq!(codec.decrypt_to_number("1.5"), Some(1.5));
    }
}
