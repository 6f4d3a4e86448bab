//! Error types for the Reader API boundary: authentication and page requests.

use thiserror::Error;

/// Authentication failures. Always fatal: nothing is fetched without a token pair.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Please provide {what}. Use {flag} or set the environment variable {env}.")]
    MissingCredential {
        what: &'static str,
        flag: &'static str,
        env: &'static str,
    },

    #[error("Authentication error: could not reach {url}: {source}")]
    Network { url: String, source: reqwest::Error },

    #[error("Authentication error: HTTP {status}: {body}. Please check your API key, API secret, login user and login password.")]
    Rejected { status: u16, body: String },

    #[error("Authentication error: token response did not contain {missing}.")]
    MalformedTokenResponse { missing: &'static str },

    #[error("Invalid API URL: {input}: {reason}")]
    InvalidUrl { input: String, reason: String },
}

/// Errors from a single API request. The fetch loop treats these as recoverable per page;
/// the meta call treats them as fatal.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid API URL: {input}: {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error("Network error: could not reach {url}: {source}")]
    Network { url: String, source: reqwest::Error },

    #[error("HTTP {status} {reason} when fetching: {url}")]
    HttpStatus {
        status: u16,
        reason: String,
        url: String,
    },

    #[error("Failed to read response body: {source}")]
    BodyRead { source: reqwest::Error },

    #[error("Could not parse bookmarks response from {url}: {source}")]
    Parse {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}
