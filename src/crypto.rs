//! AES-256-GCM sealing of personal data (display names, profiles) at rest.

use crate::domain::models::UserProfile;
use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose, Engine as _};
use rand_core::RngCore;
use thiserror::Error;

const NONCE_LEN: usize = 12;

#[derive(Error, Debug)]
pub enum CipherError {
    #[error("sealing failed")]
    Seal,
    #[error("opening failed")]
    Open,
    #[error("key must be 32 bytes")]
    InvalidKey,
    #[error("sealed profile is not valid JSON: {0}")]
    Profile(#[from] serde_json::Error),
}

#[derive(Clone)]
pub struct PersonalDataCipher {
    cipher: Aes256Gcm,
}

impl PersonalDataCipher {
    pub fn new(key: &[u8]) -> Result<Self, CipherError> {
        if key.len() != 32 {
            return Err(CipherError::InvalidKey);
        }
        let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CipherError::InvalidKey)?;
        Ok(Self { cipher })
    }

    pub fn seal_str(&self, value: &str) -> Result<String, CipherError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);
        let mut sealed = self
            .cipher
            .encrypt(nonce, value.as_bytes())
            .map_err(|_| CipherError::Seal)?;
        let mut combined = nonce_bytes.to_vec();
        combined.append(&mut sealed);
        Ok(general_purpose::STANDARD.encode(combined))
    }

    pub fn open_str(&self, encoded: &str) -> Result<String, CipherError> {
        let data = general_purpose::STANDARD
            .decode(encoded)
            .map_err(|_| CipherError::Open)?;
        if data.len() <= NONCE_LEN {
            return Err(CipherError::Open);
        }
        let (nonce_bytes, sealed) = data.split_at(NONCE_LEN);
        let plain = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), sealed)
            .map_err(|_| CipherError::Open)?;
        String::from_utf8(plain).map_err(|_| CipherError::Open)
    }

    pub fn seal_profile(&self, profile: &UserProfile) -> Result<String, CipherError> {
        self.seal_str(&serde_json::to_string(profile)?)
    }

    pub fn open_profile(&self, encoded: &str) -> Result<UserProfile, CipherError> {
        Ok(serde_json::from_str(&self.open_str(encoded)?)?)
    }

    /// Display name for a sealed value, falling back when the row cannot be opened.
    pub fn display_name(&self, enc_name: &str) -> String {
        self.open_str(enc_name).unwrap_or_else(|_| "Participant".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher() -> PersonalDataCipher {
        PersonalDataCipher::new(&[7u8; 32]).unwrap()
    }

    #[test]
    fn names_round_trip_with_fresh_nonces() {
        let c = cipher();
        let a = c.seal_str("Ada Lovelace").unwrap();
        let b = c.seal_str("Ada Lovelace").unwrap();
        assert_ne!(a, b);
        assert_eq!(c.open_str(&a).unwrap(), "Ada Lovelace");
    }

    #[test]
    fn profiles_round_trip() {
        let c = cipher();
        let profile = UserProfile {
            occupation: Some("Engineer".into()),
            years_experience: Some(4),
            ..UserProfile::default()
        };
        let sealed = c.seal_profile(&profile).unwrap();
        assert_eq!(c.open_profile(&sealed).unwrap(), profile);
    }

    #[test]
    fn wrong_key_or_garbage_fails() {
        let sealed = cipher().seal_str("secret").unwrap();
        let other = PersonalDataCipher::new(&[8u8; 32]).unwrap();
        assert!(matches!(other.open_str(&sealed), Err(CipherError::Open)));
        assert!(matches!(cipher().open_str("not base64!"), Err(CipherError::Open)));
        assert_eq!(other.display_name(&sealed), "Participant");
        assert!(matches!(PersonalDataCipher::new(&[1u8; 16]), Err(CipherError::InvalidKey)));
    }
}
