use crate::application_port::SessionError;
use hmac::{Hmac, KeyInit, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 over the raw refresh token. A leaked store yields only digests,
/// and without the key they cannot even be checked against a captured token.
#[derive(Clone)]
pub struct RefreshFingerprinter {
    key: Vec<u8>,
}

impl RefreshFingerprinter {
    pub fn new(key: Vec<u8>) -> Self {
        Self { key }
    }

    fn mac(&self) -> Result<HmacSha256, SessionError> {
        HmacSha256::new_from_slice(&self.key).map_err(|e| SessionError::InternalError(e.to_string()))
    }

    pub fn fingerprint(&self, token: &str) -> Result<String, SessionError> {
        let mut mac = self.mac()?;
        mac.update(token.as_bytes());
        let out = mac.finalize().into_bytes();
        Ok(hex::encode(out))
    }

    /// Constant-time comparison against a stored hex digest.
    pub fn matches(&self, token: &str, fingerprint_hex: &str) -> bool {
        let Ok(expected) = hex::decode(fingerprint_hex) else {
            return false;
        };
        let Ok(mut mac) = self.mac() else {
            return false;
        };
        mac.update(token.as_bytes());
        mac.verify_slice(&expected).is_ok()
    }
}
