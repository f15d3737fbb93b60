//! HMAC-SHA256 sealing of cookie payloads.
//!
//! A sealed value is `base64url(json) "." base64url(mac)`. Opening never
//! panics; every way a value can be wrong maps to a [`SealError`].

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum SealError {
    #[error("sealed value is malformed")]
    Malformed,

    #[error("signature does not verify")]
    BadSignature,

    #[error("payload is not valid base64")]
    Encoding(#[from] base64::DecodeError),

    #[error("payload is not valid json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Signs and verifies cookie payloads with a server-held key.
#[derive(Clone)]
pub struct CookieSigner {
    key: Vec<u8>,
}

impl std::fmt::Debug for CookieSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieSigner").finish_non_exhaustive()
    }
}

impl CookieSigner {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self { key: key.into() }
    }

    /// A signer with a fresh random 32-byte key.
    pub fn random() -> Self {
        let mut key = vec![0u8; 32];
        rand::thread_rng().fill_bytes(&mut key);
        Self { key }
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.key).expect("HMAC can take key of any size")
    }

    pub fn seal<T: Serialize>(&self, value: &T) -> Result<String, SealError> {
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(value)?);
        let mut mac = self.mac();
        mac.update(payload.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        Ok(format!("{payload}.{signature}"))
    }

    pub fn open<T: DeserializeOwned>(&self, sealed: &str) -> Result<T, SealError> {
        let (payload, signature) = sealed.rsplit_once('.').ok_or(SealError::Malformed)?;
        let signature = URL_SAFE_NO_PAD.decode(signature)?;

        let mut mac = self.mac();
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature).map_err(|_| SealError::BadSignature)?;

        let json = URL_SAFE_NO_PAD.decode(payload)?;
        Ok(serde_json::from_slice(&json)?)
    }
}
