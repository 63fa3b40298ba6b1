//! Authentication utilities for the ACX API
//!
//! ACX signs every private request with HMAC-SHA256 over
//! `VERB|path|sorted-query`, hex-encoded. The websocket handshake signs the
//! raw challenge payload with the same key.

use crate::error::SdkError;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Credentials for authenticated API access
#[derive(Clone)]
pub struct Credentials {
    access_key: String,
    secret_key: String,
}

impl Credentials {
    /// Create new credentials from an ACX access key and secret key
    pub fn new(access_key: &str, secret_key: &str) -> Result<Self, SdkError> {
        if access_key.is_empty() || secret_key.is_empty() {
            return Err(SdkError::Authentication(
                "Access key and secret key are required".to_string(),
            ));
        }

        Ok(Self {
            access_key: access_key.to_string(),
            secret_key: secret_key.to_string(),
        })
    }

    /// Create credentials from environment variables
    ///
    /// Looks for `ACX_ACCESS_KEY` and `ACX_SECRET_KEY`
    pub fn from_env() -> Result<Self, SdkError> {
        let access_key = std::env::var("ACX_ACCESS_KEY")
            .map_err(|_| SdkError::Authentication("ACX_ACCESS_KEY not set".to_string()))?;
        let secret_key = std::env::var("ACX_SECRET_KEY")
            .map_err(|_| SdkError::Authentication("ACX_SECRET_KEY not set".to_string()))?;

        Self::new(&access_key, &secret_key)
    }

    /// Get the access key (sent alongside every signed request)
    pub fn access_key(&self) -> &str {
        &self.access_key
    }

    /// Sign a raw payload string, returning a lowercase hex digest.
    ///
    /// Used for the websocket challenge: the answer is
    /// `sign_payload(access_key + challenge)`.
    pub fn sign_payload(&self, payload: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(self.secret_key.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Compute the answer to a websocket authentication challenge
    pub fn challenge_answer(&self, challenge: &str) -> String {
        self.sign_payload(&format!("{}{}", self.access_key, challenge))
    }

    /// Sign a REST request.
    ///
    /// The signing payload is `VERB|path|query` where the query string has
    /// `access_key` merged in, keys sorted lexicographically, and values
    /// form-encoded exactly as they go on the wire.
    ///
    /// # Arguments
    /// * `verb` - HTTP verb, uppercased into the payload
    /// * `path` - API endpoint path (e.g., "/api/v2/orders.json")
    /// * `params` - query parameters, excluding access_key and signature
    pub fn sign_request(&self, verb: &str, path: &str, params: &[(String, String)]) -> String {
        let mut query: Vec<(String, String)> = params.to_vec();
        query.push(("access_key".to_string(), self.access_key.clone()));
        query.sort_by(|a, b| a.0.cmp(&b.0));

        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (k, v) in &query {
            serializer.append_pair(k, v);
        }
        let query_str = serializer.finish();

        let payload = format!("{}|{}|{}", verb.to_uppercase(), path, query_str);
        self.sign_payload(&payload)
    }

    /// Generate a tonce (milliseconds since epoch), sent with every signed
    /// request
    pub fn generate_tonce() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field(
                "access_key",
                &format!("{}...", &self.access_key.chars().take(8).collect::<String>()),
            )
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}
