//! Request signing.
//!
//! Every authenticated call carries a key id, a millisecond timestamp, and
//! an RSA-PSS/SHA-256 signature over exactly `timestamp + method + path`.
//! The path includes the API's fixed base path and excludes the query
//! string. Signatures are single-attempt artifacts: retries re-sign with a
//! fresh timestamp rather than reusing the original.

use crate::error::{KalshiError, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::pss::BlindedSigningKey;
use rsa::signature::{RandomizedSigner, SignatureEncoding};
use rsa::RsaPrivateKey;
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};

/// Signs requests with the account's RSA private key.
///
/// The key is loaded once at construction and never leaves this struct.
pub struct RequestSigner {
    api_key_id: String,
    // Blinded signing randomizes the PSS salt, so signatures are not
    // deterministic; the salt length is the SHA-256 digest length, which
    // must match the venue's verifier
    signing_key: BlindedSigningKey<Sha256>,
    api_path: String,
}

impl RequestSigner {
    /// Load the private key from a PEM file (PKCS#8, falling back to
    /// PKCS#1).
    pub fn from_key_file(
        api_key_id: impl Into<String>,
        key_path: &str,
        api_path: String,
    ) -> Result<Self> {
        let pem = std::fs::read_to_string(key_path).map_err(|e| KalshiError::KeyLoad {
            path: key_path.to_string(),
            reason: e.to_string(),
        })?;

        let key = RsaPrivateKey::from_pkcs8_pem(&pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(&pem))
            .map_err(|e| KalshiError::KeyLoad {
                path: key_path.to_string(),
                reason: format!("not an RSA private key: {}", e),
            })?;

        Ok(Self::from_key(api_key_id, key, api_path))
    }

    pub fn from_key(api_key_id: impl Into<String>, key: RsaPrivateKey, api_path: String) -> Self {
        Self {
            api_key_id: api_key_id.into(),
            signing_key: BlindedSigningKey::<Sha256>::new(key),
            api_path,
        }
    }

    pub fn api_key_id(&self) -> &str {
        &self.api_key_id
    }

    /// Current Unix timestamp in milliseconds
    pub fn current_timestamp_ms() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("Time went backwards")
            .as_millis() as u64
    }

    /// Sign `timestamp + method + path` and return (timestamp, signature)
    pub fn sign(&self, method: &str, path: &str) -> (String, String) {
        let timestamp = Self::current_timestamp_ms().to_string();
        let message = format!("{}{}{}", timestamp, method, path);

        let mut rng = rand::thread_rng();
        let signature = self.signing_key.sign_with_rng(&mut rng, message.as_bytes());

        (timestamp, STANDARD.encode(signature.to_bytes()))
    }

    /// Authentication headers for a REST endpoint.
    ///
    /// The query string is stripped and the API base path prepended before
    /// signing.
    pub fn headers(&self, method: &str, endpoint: &str) -> Vec<(String, String)> {
        let path_without_query = endpoint.split('?').next().unwrap_or(endpoint);
        let full_path = format!("{}{}", self.api_path, path_without_query);
        self.headers_for_path(method, &full_path)
    }

    /// Authentication headers for an already-complete path (e.g. the
    /// WebSocket handshake path)
    pub fn headers_for_path(&self, method: &str, full_path: &str) -> Vec<(String, String)> {
        let (timestamp, signature) = self.sign(method, full_path);
        vec![
            ("Content-Type".to_string(), "application/json".to_string()),
            ("KALSHI-ACCESS-KEY".to_string(), self.api_key_id.clone()),
            ("KALSHI-ACCESS-SIGNATURE".to_string(), signature),
            ("KALSHI-ACCESS-TIMESTAMP".to_string(), timestamp),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::pkcs8::EncodePrivateKey;
    use rsa::pss::{Signature, VerifyingKey};
    use rsa::signature::Verifier;
    use rsa::RsaPublicKey;
    use std::io::Write;

    fn test_key() -> RsaPrivateKey {
        RsaPrivateKey::new(&mut rand::thread_rng(), 2048).unwrap()
    }

    fn signer_with_key(key: RsaPrivateKey) -> RequestSigner {
        RequestSigner::from_key("test-key-id", key, "/trade-api/v2".to_string())
    }

    #[test]
    fn signature_round_trips_against_public_key() {
        let key = test_key();
        let public_key = RsaPublicKey::from(&key);
        let signer = signer_with_key(key);

        let (timestamp, signature_b64) = signer.sign("GET", "/trade-api/v2/markets");

        let message = format!("{}GET{}", timestamp, "/trade-api/v2/markets");
        let signature_bytes = STANDARD.decode(signature_b64).unwrap();
        let signature = Signature::try_from(signature_bytes.as_slice()).unwrap();

        let verifier = VerifyingKey::<Sha256>::new(public_key);
        assert!(verifier.verify(message.as_bytes(), &signature).is_ok());
    }

    #[test]
    fn tampered_message_fails_verification() {
        let key = test_key();
        let public_key = RsaPublicKey::from(&key);
        let signer = signer_with_key(key);

        let (timestamp, signature_b64) = signer.sign("GET", "/trade-api/v2/markets");

        let tampered = format!("{}DELETE{}", timestamp, "/trade-api/v2/markets");
        let signature_bytes = STANDARD.decode(signature_b64).unwrap();
        let signature = Signature::try_from(signature_bytes.as_slice()).unwrap();

        let verifier = VerifyingKey::<Sha256>::new(public_key);
        assert!(verifier.verify(tampered.as_bytes(), &signature).is_err());
    }

    #[test]
    fn headers_strip_query_and_include_all_keys() {
        let signer = signer_with_key(test_key());
        let headers = signer.headers("GET", "/markets?limit=100&cursor=abc");

        let keys: Vec<&str> = headers.iter().map(|(k, _)| k.as_str()).collect();
        assert!(keys.contains(&"KALSHI-ACCESS-KEY"));
        assert!(keys.contains(&"KALSHI-ACCESS-SIGNATURE"));
        assert!(keys.contains(&"KALSHI-ACCESS-TIMESTAMP"));

        let key_header = headers
            .iter()
            .find(|(k, _)| k == "KALSHI-ACCESS-KEY")
            .unwrap();
        assert_eq!(key_header.1, "test-key-id");
    }

    #[test]
    fn key_file_loads_pkcs8_pem() {
        let key = test_key();
        let pem = key.to_pkcs8_pem(rsa::pkcs8::LineEnding::LF).unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(pem.as_bytes()).unwrap();

        let signer = RequestSigner::from_key_file(
            "test-key-id",
            file.path().to_str().unwrap(),
            "/trade-api/v2".to_string(),
        );
        assert!(signer.is_ok());
    }

    #[test]
    fn missing_key_file_is_key_load_error() {
        let result = RequestSigner::from_key_file(
            "test-key-id",
            "/nonexistent/key.pem",
            "/trade-api/v2".to_string(),
        );
        assert!(matches!(result, Err(KalshiError::KeyLoad { .. })));
    }

    #[test]
    fn garbage_pem_is_key_load_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"not a pem file").unwrap();

        let result = RequestSigner::from_key_file(
            "test-key-id",
            file.path().to_str().unwrap(),
            "/trade-api/v2".to_string(),
        );
        assert!(matches!(result, Err(KalshiError::KeyLoad { .. })));
    }
}
