//! OAuth 1.0a request signing (HMAC-SHA1), as used by the Reader API.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ring::hmac;
use std::time::{SystemTime, UNIX_EPOCH};
use url::Url;

/// Access token pair issued by the xAuth handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub key: String,
    pub secret: String,
}

/// Consumer (application) key and secret.
#[derive(Debug, Clone, Copy)]
pub struct Consumer<'a> {
    pub key: &'a str,
    pub secret: &'a str,
}

/// Per-request nonce and timestamp.
#[derive(Debug, Clone)]
pub struct Nonce {
    pub value: String,
    pub timestamp: u64,
}

impl Nonce {
    pub fn fresh() -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self {
            value: uuid::Uuid::new_v4().simple().to_string(),
            timestamp,
        }
    }
}

/// RFC 3986 percent-encoding: everything except unreserved characters.
pub fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

/// `scheme://host[:port]/path`, without query or fragment.
fn base_string_uri(url: &Url) -> String {
    let mut base = format!("{}://{}", url.scheme(), url.host_str().unwrap_or_default());
    if let Some(port) = url.port() {
        base.push_str(&format!(":{}", port));
    }
    base.push_str(url.path());
    base
}

/// Signature base string (RFC 5849 §3.4.1). `params` must include the oauth_* protocol
/// parameters, query parameters, and form body parameters.
pub fn signature_base_string(method: &str, url: &Url, params: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .collect();
    encoded.sort();
    let normalized = encoded
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");
    format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        percent_encode(&base_string_uri(url)),
        percent_encode(&normalized)
    )
}

/// Base64 HMAC-SHA1 of the base string keyed with `consumer_secret&token_secret`.
pub fn hmac_sha1_signature(base_string: &str, consumer_secret: &str, token_secret: &str) -> String {
    let key_material = format!(
        "{}&{}",
        percent_encode(consumer_secret),
        percent_encode(token_secret)
    );
    let key = hmac::Key::new(hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY, key_material.as_bytes());
    let tag = hmac::sign(&key, base_string.as_bytes());
    STANDARD.encode(tag.as_ref())
}

/// Build the `Authorization: OAuth ...` header value for one request.
///
/// `form` holds form-encoded body parameters (empty for GET); query parameters are
/// taken from `url`.
pub fn authorization_header(
    method: &str,
    url: &Url,
    form: &[(&str, &str)],
    consumer: Consumer<'_>,
    token: Option<&TokenPair>,
    nonce: &Nonce,
) -> String {
    let mut oauth: Vec<(String, String)> = vec![
        ("oauth_consumer_key".into(), consumer.key.into()),
        ("oauth_nonce".into(), nonce.value.clone()),
        ("oauth_signature_method".into(), "HMAC-SHA1".into()),
        ("oauth_timestamp".into(), nonce.timestamp.to_string()),
        ("oauth_version".into(), "1.0".into()),
    ];
    if let Some(t) = token {
        oauth.push(("oauth_token".into(), t.key.clone()));
    }

    let mut all = oauth.clone();
    all.extend(
        url.query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned())),
    );
    all.extend(form.iter().map(|(k, v)| (k.to_string(), v.to_string())));

    let base = signature_base_string(method, url, &all);
    let token_secret = token.map(|t| t.secret.as_str()).unwrap_or("");
    let signature = hmac_sha1_signature(&base, consumer.secret, token_secret);
    oauth.push(("oauth_signature".into(), signature));

    let fields = oauth
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("OAuth {}", fields)
}
