//! Reader API boundary: page source trait, signed HTTP client, and xAuth authentication.

mod client;
mod error;

pub mod auth;
pub mod oauth;

pub use auth::{Authenticator, Credentials, XAuthAuthenticator};
pub use client::{PoliteClient, PoliteClientBuilder};
pub use error::{ApiError, AuthError};
pub use oauth::TokenPair;

use oauth::Nonce;
use url::Url;

/// Default Reader API root. Endpoint paths are joined onto it, so it must end with `/`.
pub const DEFAULT_API_BASE: &str = "https://www.readability.com/api/rest/v1/";

/// Outcome of one listing request, before any interpretation of the body.
#[derive(Debug, Clone)]
pub struct PageResponse {
    pub status: u16,
    pub reason: String,
    pub url: String,
    pub body: String,
}

impl PageResponse {
    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

/// Anything that can serve pages of the bookmark listing.
///
/// `Err` means the request never produced a response (transport failure);
/// non-success HTTP statuses come back as `Ok` with the status set.
pub trait BookmarkSource {
    fn fetch_page(&mut self, page: u32, per_page: u32) -> Result<PageResponse, ApiError>;
}

/// Parse and validate an API base URL, appending a trailing `/` if missing.
pub fn parse_api_base(input: &str) -> Result<Url, ApiError> {
    let mut s = input.trim().to_string();
    if !s.ends_with('/') {
        s.push('/');
    }
    let url = Url::parse(&s).map_err(|e| ApiError::InvalidUrl {
        input: input.to_string(),
        reason: e.to_string(),
    })?;
    if url.cannot_be_a_base() {
        return Err(ApiError::InvalidUrl {
            input: input.to_string(),
            reason: "URL cannot be used as a base".to_string(),
        });
    }
    Ok(url)
}

/// Build `{base}bookmarks?page={page}&per_page={per_page}`.
pub fn bookmarks_url(base: &Url, page: u32, per_page: u32) -> Result<Url, ApiError> {
    let mut url = base.join("bookmarks").map_err(|e| ApiError::InvalidUrl {
        input: base.to_string(),
        reason: e.to_string(),
    })?;
    url.query_pairs_mut()
        .append_pair("page", &page.to_string())
        .append_pair("per_page", &per_page.to_string());
    Ok(url)
}

/// OAuth-signed client for the bookmarks endpoint.
pub struct ReaderClient<'a> {
    http: &'a mut PoliteClient,
    base: Url,
    credentials: &'a Credentials,
    token: TokenPair,
}

impl<'a> ReaderClient<'a> {
    pub fn new(
        http: &'a mut PoliteClient,
        base: Url,
        credentials: &'a Credentials,
        token: TokenPair,
    ) -> Self {
        Self {
            http,
            base,
            credentials,
            token,
        }
    }
}

impl BookmarkSource for ReaderClient<'_> {
    fn fetch_page(&mut self, page: u32, per_page: u32) -> Result<PageResponse, ApiError> {
        let url = bookmarks_url(&self.base, page, per_page)?;
        log::debug!("GET {}", url);
        let credentials = self.credentials;
        let token = &self.token;
        // One attempt per page; failed pages are counted by the fetcher.
        let response = self
            .http
            .send_once(|http| {
                let header = oauth::authorization_header(
                    "GET",
                    &url,
                    &[],
                    credentials.consumer(),
                    Some(token),
                    &Nonce::fresh(),
                );
                http.get(url.clone())
                    .header(reqwest::header::AUTHORIZATION, header)
            })
            .map_err(|e| ApiError::Network {
                url: url.to_string(),
                source: e,
            })?;
        let status = response.status();
        let final_url = response.url().to_string();
        let body = response
            .text()
            .map_err(|e| ApiError::BodyRead { source: e })?;
        Ok(PageResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("").to_string(),
            url: final_url,
            body,
        })
    }
}
