//! xAuth handshake: exchanges API key/secret plus user login for an access token pair.

use crate::api::client::PoliteClient;
use crate::api::error::AuthError;
use crate::api::oauth::{self, Consumer, Nonce, TokenPair};
use url::Url;

/// API key/secret and user login. Empty strings count as missing.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String,
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Check every field is present, naming the first missing one with its flag and env variable.
    pub fn validate(&self) -> Result<(), AuthError> {
        let fields: [(&str, &'static str, &'static str, &'static str); 4] = [
            (
                self.api_key.as_str(),
                "a Readability API key",
                "--api-key",
                "READABILITY_CONSUMER_KEY",
            ),
            (
                self.api_secret.as_str(),
                "a Readability API secret",
                "--api-secret",
                "READABILITY_CONSUMER_SECRET",
            ),
            (
                self.username.as_str(),
                "your Readability user name",
                "--login-user",
                "READABILITY_USERNAME",
            ),
            (
                self.password.as_str(),
                "your Readability password",
                "--login-pw",
                "READABILITY_PASSWORD",
            ),
        ];
        for (value, what, flag, env) in fields {
            if value.trim().is_empty() {
                return Err(AuthError::MissingCredential { what, flag, env });
            }
        }
        Ok(())
    }

    pub fn consumer(&self) -> Consumer<'_> {
        Consumer {
            key: &self.api_key,
            secret: &self.api_secret,
        }
    }
}

/// Produces a token pair from credentials.
pub trait Authenticator {
    fn authenticate(&mut self, credentials: &Credentials) -> Result<TokenPair, AuthError>;
}

/// xAuth against `{base}/oauth/access_token/`.
pub struct XAuthAuthenticator<'a> {
    client: &'a mut PoliteClient,
    base: &'a Url,
}

impl<'a> XAuthAuthenticator<'a> {
    pub fn new(client: &'a mut PoliteClient, base: &'a Url) -> Self {
        Self { client, base }
    }
}

impl Authenticator for XAuthAuthenticator<'_> {
    fn authenticate(&mut self, credentials: &Credentials) -> Result<TokenPair, AuthError> {
        credentials.validate()?;
        let url = self
            .base
            .join("oauth/access_token/")
            .map_err(|e| AuthError::InvalidUrl {
                input: self.base.to_string(),
                reason: e.to_string(),
            })?;
        let form = [
            ("x_auth_username", credentials.username.as_str()),
            ("x_auth_password", credentials.password.as_str()),
            ("x_auth_mode", "client_auth"),
        ];
        log::debug!("requesting access token from {}", url);

        let response = self
            .client
            .send_with_retry(|http| {
                let header = oauth::authorization_header(
                    "POST",
                    &url,
                    &form,
                    credentials.consumer(),
                    None,
                    &Nonce::fresh(),
                );
                http.post(url.clone())
                    .header(reqwest::header::AUTHORIZATION, header)
                    .form(&form)
            })
            .map_err(|e| AuthError::Network {
                url: url.to_string(),
                source: e,
            })?;

        let status = response.status();
        let body = response.text().map_err(|e| AuthError::Network {
            url: url.to_string(),
            source: e,
        })?;
        if !status.is_success() {
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }
        parse_token_response(&body)
    }
}

/// Parse `oauth_token=...&oauth_token_secret=...` (form-encoded).
pub fn parse_token_response(body: &str) -> Result<TokenPair, AuthError> {
    let mut key = None;
    let mut secret = None;
    for (k, v) in url::form_urlencoded::parse(body.trim().as_bytes()) {
        match k.as_ref() {
            "oauth_token" => key = Some(v.into_owned()),
            "oauth_token_secret" => secret = Some(v.into_owned()),
            _ => {}
        }
    }
    let key = key
        .filter(|s| !s.is_empty())
        .ok_or(AuthError::MalformedTokenResponse {
            missing: "oauth_token",
        })?;
    let secret = secret
        .filter(|s| !s.is_empty())
        .ok_or(AuthError::MalformedTokenResponse {
            missing: "oauth_token_secret",
        })?;
    Ok(TokenPair { key, secret })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full() -> Credentials {
        Credentials {
            api_key: "k".into(),
            api_secret: "s".into(),
            username: "u".into(),
            password: "p".into(),
        }
    }

    #[test]
    fn complete_credentials_validate() {
        assert!(full().validate().is_ok());
    }

    #[test]
    fn missing_api_key_names_flag_and_env() {
        let mut c = full();
        c.api_key = "  ".into();
        match c.validate() {
            Err(AuthError::MissingCredential { flag, env, .. }) => {
                assert_eq!(flag, "--api-key");
                assert_eq!(env, "READABILITY_CONSUMER_KEY");
            }
            other => panic!("expected MissingCredential, got {:?}", other),
        }
    }

    #[test]
    fn missing_password_reported_after_other_fields() {
        let mut c = full();
        c.password.clear();
        match c.validate() {
            Err(AuthError::MissingCredential { env, .. }) => {
                assert_eq!(env, "READABILITY_PASSWORD")
            }
            other => panic!("expected MissingCredential, got {:?}", other),
        }
    }

    #[test]
    fn token_response_parses_both_fields() -> Result<(), AuthError> {
        let pair = parse_token_response(
            "oauth_token_secret=se%2Fcret&oauth_token=tok&oauth_callback_confirmed=true\n",
        )?;
        assert_eq!(pair.key, "tok");
        assert_eq!(pair.secret, "se/cret");
        Ok(())
    }

    #[test]
    fn token_response_without_secret_is_malformed() {
        assert!(matches!(
            parse_token_response("oauth_token=tok"),
            Err(AuthError::MalformedTokenResponse {
                missing: "oauth_token_secret"
            })
        ));
    }
}
