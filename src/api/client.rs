//! Blocking HTTP client with configurable politeness (delay between requests) and retries.

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use std::time::{Duration, Instant};

const DEFAULT_USER_AGENT: &str = concat!("readability-export/", env!("CARGO_PKG_VERSION"));
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_DELAY_SECS: u64 = 0;
const MAX_REDIRECTS: usize = 10;

/// Default number of attempts per request (initial plus retries).
const DEFAULT_RETRY_COUNT: u32 = 3;
/// Default backoff delays in seconds after each failed attempt.
const DEFAULT_BACKOFF_SECS: [u64; 2] = [1, 2];
/// Backoff for HTTP 429 (rate limit).
const BACKOFF_429_SECS: [u64; 4] = [30, 60, 90, 120];

/// Blocking HTTP client that enforces a delay between requests.
#[derive(Debug)]
pub struct PoliteClient {
    inner: Client,
    delay: Duration,
    last_request: Option<Instant>,
    retry_count: u32,
    backoff_secs: Vec<u64>,
}

impl PoliteClient {
    pub fn builder() -> PoliteClientBuilder {
        PoliteClientBuilder::default()
    }

    /// Send a request exactly once, after the politeness delay.
    pub fn send_once<F>(&mut self, build: F) -> Result<Response, reqwest::Error>
    where
        F: FnOnce(&Client) -> RequestBuilder,
    {
        self.wait_delay();
        let result = build(&self.inner).send();
        self.last_request = Some(Instant::now());
        result
    }

    /// Send a request with retries for transient failures.
    ///
    /// `build` is called once per attempt so each attempt can carry fresh headers
    /// (OAuth nonces must not be replayed). Retries on timeout, connection errors,
    /// HTTP 5xx, and HTTP 429. Other responses, including 4xx, are returned as-is.
    pub fn send_with_retry<F>(&mut self, mut build: F) -> Result<Response, reqwest::Error>
    where
        F: FnMut(&Client) -> RequestBuilder,
    {
        let mut attempt: u32 = 0;
        loop {
            self.wait_delay();
            let result = build(&self.inner).send();
            self.last_request = Some(Instant::now());
            let last_attempt = attempt + 1 >= self.retry_count;
            match result {
                Ok(response) => {
                    let status = response.status();
                    let retryable =
                        status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS;
                    if !retryable || last_attempt {
                        return Ok(response);
                    }
                    let backoff = if status == StatusCode::TOO_MANY_REQUESTS {
                        BACKOFF_429_SECS
                            .get(attempt as usize)
                            .copied()
                            .unwrap_or(BACKOFF_429_SECS[BACKOFF_429_SECS.len() - 1])
                    } else {
                        self.backoff_for(attempt)
                    };
                    log::debug!(
                        "HTTP {} from {}; retrying in {}s",
                        status,
                        response.url(),
                        backoff
                    );
                    std::thread::sleep(Duration::from_secs(backoff));
                }
                Err(e) => {
                    let retryable = e.is_timeout() || e.is_connect();
                    if !retryable || last_attempt {
                        return Err(e);
                    }
                    let backoff = self.backoff_for(attempt);
                    log::debug!("request failed ({}); retrying in {}s", e, backoff);
                    std::thread::sleep(Duration::from_secs(backoff));
                }
            }
            attempt += 1;
        }
    }

    fn backoff_for(&self, attempt: u32) -> u64 {
        self.backoff_secs
            .get(attempt as usize)
            .or_else(|| self.backoff_secs.last())
            .copied()
            .unwrap_or(1)
    }

    fn wait_delay(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.delay {
                std::thread::sleep(self.delay - elapsed);
            }
        }
    }
}

/// Builder for PoliteClient with optional User-Agent, delay, timeout, and retry settings.
#[derive(Debug)]
pub struct PoliteClientBuilder {
    user_agent: Option<String>,
    delay_secs: u64,
    timeout_secs: u64,
    retry_count: u32,
    retry_backoff_secs: Vec<u64>,
}

impl Default for PoliteClientBuilder {
    fn default() -> Self {
        Self {
            user_agent: None,
            delay_secs: DEFAULT_DELAY_SECS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            retry_count: DEFAULT_RETRY_COUNT,
            retry_backoff_secs: DEFAULT_BACKOFF_SECS.to_vec(),
        }
    }
}

impl PoliteClientBuilder {
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Delay between requests in seconds. Default 0.
    pub fn delay_secs(mut self, secs: u64) -> Self {
        self.delay_secs = secs;
        self
    }

    /// Request timeout in seconds. Default 30.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Number of HTTP attempts for transient failures (default 3, minimum 1).
    pub fn retry_count(mut self, n: u32) -> Self {
        self.retry_count = n.max(1);
        self
    }

    /// Backoff delays in seconds before each retry. If shorter than retry_count - 1, the
    /// last value is reused.
    pub fn retry_backoff_secs(mut self, secs: Vec<u64>) -> Self {
        self.retry_backoff_secs = secs;
        self
    }

    pub fn build(self) -> Result<PoliteClient, reqwest::Error> {
        let user_agent = self
            .user_agent
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        let inner = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(self.timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()?;
        let backoff_secs = if self.retry_backoff_secs.is_empty() {
            // Exponential: 1, 2, 4, ... for (retry_count - 1) steps
            let n = self.retry_count.saturating_sub(1) as usize;
            (0..n).map(|i| 1u64 << i.min(4)).collect::<Vec<_>>()
        } else {
            self.retry_backoff_secs
        };
        Ok(PoliteClient {
            inner,
            delay: Duration::from_secs(self.delay_secs),
            last_request: None,
            retry_count: self.retry_count,
            backoff_secs,
        })
    }
}
