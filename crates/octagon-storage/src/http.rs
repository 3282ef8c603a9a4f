//! HTTP transport seam and the fetcher providers go through.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, info_span, warn, Instrument};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("http status {status} for {url}")]
    HttpStatus { status: u16, url: String },
    #[error("rate limited by {url}")]
    RateLimited { url: String },
    #[error("could not decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub final_url: String,
    /// Header names are stored lowercased.
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            final_url: String::new(),
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// `Retry-After` given in whole seconds; HTTP-date values are ignored.
    pub fn retry_after(&self) -> Option<Duration> {
        self.header("retry-after")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
    }
}

/// Black-box GET used by every provider. TLS and redirects are the transport's job.
#[async_trait]
pub trait HttpTransport: Send + Sync + fmt::Debug {
    async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse, FetchError>;
}

#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    pub max_attempts: usize,
    pub step: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            step: Duration::from_millis(1000),
        }
    }
}

impl BackoffPolicy {
    /// Linear: `step * (attempt + 1)`.
    pub fn delay_for_attempt(&self, attempt_index: usize) -> Duration {
        let factor = u32::try_from(attempt_index + 1).unwrap_or(u32::MAX);
        self.step.saturating_mul(factor)
    }
}

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub timeout: Duration,
    pub user_agent: Option<String>,
    pub global_concurrency: usize,
    pub backoff: BackoffPolicy,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            user_agent: None,
            global_concurrency: 16,
            backoff: BackoffPolicy::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: &HttpClientConfig) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder()
            .gzip(true)
            .brotli(true)
            .timeout(config.timeout);

        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }

        let client = builder.build().context("building reqwest client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse, FetchError> {
        let transport_err = |err: reqwest::Error| FetchError::Transport {
            url: url.to_string(),
            message: err.to_string(),
        };

        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        let resp = request.send().await.map_err(transport_err)?;

        let status = resp.status().as_u16();
        let final_url = resp.url().to_string();
        let headers = resp
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = resp.bytes().await.map_err(transport_err)?.to_vec();

        Ok(HttpResponse {
            status,
            final_url,
            headers,
            body,
        })
    }
}

/// Shared fetch entry point: a transport behind a global concurrency limit.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    transport: Arc<dyn HttpTransport>,
    global_limit: Arc<Semaphore>,
    backoff: BackoffPolicy,
}

impl HttpFetcher {
    pub fn new(config: HttpClientConfig) -> anyhow::Result<Self> {
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self::with_transport(Arc::new(transport), &config))
    }

    pub fn with_transport(transport: Arc<dyn HttpTransport>, config: &HttpClientConfig) -> Self {
        Self {
            transport,
            global_limit: Arc::new(Semaphore::new(config.global_concurrency.max(1))),
            backoff: config.backoff,
        }
    }

    pub fn backoff(&self) -> BackoffPolicy {
        self.backoff
    }

    /// Single attempt; any status is returned to the caller.
    pub async fn get(
        &self,
        provider: &str,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<HttpResponse, FetchError> {
        let span = info_span!("http_fetch", provider, url);
        async {
            let _permit = self
                .global_limit
                .acquire()
                .await
                .map_err(|_| FetchError::Transport {
                    url: url.to_string(),
                    message: "fetcher limiter closed".to_string(),
                })?;
            let resp = self.transport.get(url, headers).await?;
            debug!(status = resp.status, bytes = resp.body.len(), "response received");
            Ok(resp)
        }
        .instrument(span)
        .await
    }

    /// Single attempt; non-2xx becomes [`FetchError::HttpStatus`].
    pub async fn get_text(
        &self,
        provider: &str,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<String, FetchError> {
        let resp = self.get(provider, url, headers).await?;
        if !resp.is_success() {
            return Err(FetchError::HttpStatus {
                status: resp.status,
                url: url.to_string(),
            });
        }
        Ok(resp.text())
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        provider: &str,
        url: &str,
    ) -> Result<T, FetchError> {
        let resp = self.get(provider, url, &[("accept", "application/json")]).await?;
        if !resp.is_success() {
            return Err(FetchError::HttpStatus {
                status: resp.status,
                url: url.to_string(),
            });
        }
        decode(url, &resp)
    }

    /// Retrying GET for authenticated APIs.
    ///
    /// A 429 waits for `Retry-After` seconds when present; every other failure
    /// waits `step * (attempt + 1)`. The last failure is returned once the
    /// attempt budget is spent.
    pub async fn get_json_with_retry<T: DeserializeOwned>(
        &self,
        provider: &str,
        url: &str,
    ) -> Result<T, FetchError> {
        let attempts = self.backoff.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 0..attempts {
            let delay = match self.get(provider, url, &[("accept", "application/json")]).await {
                Ok(resp) if resp.is_success() => return decode(url, &resp),
                Ok(resp) if resp.status == 429 => {
                    last_error = Some(FetchError::RateLimited {
                        url: url.to_string(),
                    });
                    resp.retry_after()
                        .unwrap_or_else(|| self.backoff.delay_for_attempt(attempt))
                }
                Ok(resp) => {
                    last_error = Some(FetchError::HttpStatus {
                        status: resp.status,
                        url: url.to_string(),
                    });
                    self.backoff.delay_for_attempt(attempt)
                }
                Err(err) => {
                    last_error = Some(err);
                    self.backoff.delay_for_attempt(attempt)
                }
            };

            if attempt + 1 < attempts {
                warn!(
                    provider,
                    url,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "request failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }

        Err(last_error.unwrap_or_else(|| FetchError::Transport {
            url: url.to_string(),
            message: "no attempts made".to_string(),
        }))
    }
}

fn decode<T: DeserializeOwned>(url: &str, resp: &HttpResponse) -> Result<T, FetchError> {
    serde_json::from_slice(&resp.body).map_err(|err| FetchError::Decode {
        url: url.to_string(),
        message: err.to_string(),
    })
}

/// Replays canned responses by exact URL. Unknown URLs get a 404.
///
/// Each URL holds a queue; the final entry repeats once the queue drains.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<String, VecDeque<Result<HttpResponse, FetchError>>>>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, url: impl Into<String>, reply: Result<HttpResponse, FetchError>) -> &Self {
        if let Ok(mut routes) = self.routes.lock() {
            routes.entry(url.into()).or_default().push_back(reply);
        }
        self
    }

    pub fn respond(&self, url: impl Into<String>, status: u16, body: impl Into<Vec<u8>>) -> &Self {
        self.push(url, Ok(HttpResponse::new(status, body)))
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn request_count(&self, url: &str) -> usize {
        self.requests().iter().filter(|u| u.as_str() == url).count()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn get(&self, url: &str, _headers: &[(&str, &str)]) -> Result<HttpResponse, FetchError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(url.to_string());
        }
        let mut routes = self.routes.lock().map_err(|_| FetchError::Transport {
            url: url.to_string(),
            message: "scripted transport poisoned".to_string(),
        })?;
        let reply = match routes.get_mut(url) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };
        let mut reply = reply.unwrap_or_else(|| Ok(HttpResponse::new(404, "")));
        if let Ok(resp) = &mut reply {
            if resp.final_url.is_empty() {
                resp.final_url = url.to_string();
            }
        }
        reply
    }
}
