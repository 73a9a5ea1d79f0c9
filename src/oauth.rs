use anyhow::{Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use secrecy::{ExposeSecret, SecretString};
use sha1::{Digest, Sha1};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// everything except RFC 3986 unreserved characters gets escaped
const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

// OAuth 1.0a HMAC-SHA1 signing as the twitter api expects it
const SIGNATURE_METHOD: &str = "HMAC-SHA1";
const VERSION: &str = "1.0";

#[derive(Debug)]
pub struct Credentials {
    pub consumer_key: String,
    pub consumer_secret: SecretString,
    pub token: String,
    pub token_secret: SecretString,
}

impl Credentials {
    /// `Authorization` header value for a request with no query or form parameters
    pub fn authorization(&self, method: &str, url: &str) -> Result<String> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default();
        self.authorization_with(method, url, &nonce(), &timestamp.to_string())
    }

    fn authorization_with(&self, method: &str, url: &str, nonce: &str, timestamp: &str) -> Result<String> {
        let mut params = vec![
            ("oauth_consumer_key", self.consumer_key.as_str()),
            ("oauth_nonce", nonce),
            ("oauth_signature_method", SIGNATURE_METHOD),
            ("oauth_timestamp", timestamp),
            ("oauth_token", self.token.as_str()),
            ("oauth_version", VERSION),
        ];
        let signature = signature(
            method,
            url,
            &params,
            self.consumer_secret.expose_secret(),
            self.token_secret.expose_secret(),
        )?;
        params.push(("oauth_signature", &signature));

        let fields: Vec<String> = params
            .iter()
            .map(|(key, value)| format!("{}=\"{}\"", encode(key), encode(value)))
            .collect();
        Ok(format!("OAuth {}", fields.join(", ")))
    }
}

pub fn encode(value: &str) -> String {
    utf8_percent_encode(value, UNRESERVED).to_string()
}

/// signature base string: method, url and the sorted, encoded parameters
pub fn base_string(method: &str, url: &str, params: &[(&str, &str)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(key, value)| (encode(key), encode(value)))
        .collect();
    encoded.sort();

    let joined: Vec<String> = encoded
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect();
    format!(
        "{}&{}&{}",
        method.to_uppercase(),
        encode(url),
        encode(&joined.join("&"))
    )
}

pub fn signature(
    method: &str,
    url: &str,
    params: &[(&str, &str)],
    consumer_secret: &str,
    token_secret: &str,
) -> Result<String> {
    let key = format!("{}&{}", encode(consumer_secret), encode(token_secret));
    let mut mac = Hmac::<Sha1>::new_from_slice(key.as_bytes())
        .map_err(|_| anyhow!("invalid oauth signing key"))?;
    mac.update(base_string(method, url, params).as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// unique per request within this process
fn nonce() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or_default();
    let digest = Sha1::new()
        .chain_update(nanos.to_le_bytes())
        .chain_update(std::process::id().to_le_bytes())
        .chain_update(COUNTER.fetch_add(1, Ordering::Relaxed).to_le_bytes())
        .finalize();
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}
