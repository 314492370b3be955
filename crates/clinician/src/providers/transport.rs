//! HTTP exchange with a provider: candidate fallback, retries and timeouts.
//!
//! Candidates are tried strictly in order. A 422 moves on to the next
//! candidate, 429/5xx and transport failures retry the same candidate, and
//! any other status stops immediately. Each attempt builds its own client so
//! a failed attempt never leaves a connection behind for the next one.

use reqwest::header::ACCEPT;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use super::request::CandidateBody;
use super::retry::{parse_retry_after, RetryConfig};
use crate::errors::{is_retryable_status, ProviderError, ProviderResult};

/// Successful provider answer.
#[derive(Debug)]
pub enum ProviderResponse {
    /// Parsed body of a non-streaming call.
    Document(Value),
    /// Open response of a streaming call. Whoever holds it owns the connection.
    Stream(reqwest::Response),
}

enum AttemptFailure {
    Retry {
        error: ProviderError,
        retry_after: Option<Duration>,
    },
    Stop(ProviderError),
}

#[derive(Clone)]
pub struct Transport {
    provider: &'static str,
    url: String,
    api_key: String,
    retry: RetryConfig,
    timeout: Duration,
}

impl Transport {
    pub fn new(
        provider: &'static str,
        url: impl Into<String>,
        api_key: impl Into<String>,
        retry: RetryConfig,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            url: url.into(),
            api_key: api_key.into(),
            retry,
            timeout,
        }
    }

    pub fn provider(&self) -> &'static str {
        self.provider
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn send(
        &self,
        candidates: &[CandidateBody],
        stream: bool,
    ) -> ProviderResult<ProviderResponse> {
        let mut last_rejection = None;

        for candidate in candidates {
            match self.send_candidate(candidate, stream).await {
                Ok(response) => return Ok(response),
                Err(err @ ProviderError::ShapeRejected { .. }) => {
                    warn!(
                        provider = self.provider,
                        shape = ?candidate.shape,
                        "Request shape rejected, trying next candidate"
                    );
                    last_rejection = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        Err(match last_rejection {
            Some(err) => err.exhausted(),
            None => ProviderError::InvalidRequest("no request body to send".to_string()),
        })
    }

    async fn send_candidate(
        &self,
        candidate: &CandidateBody,
        stream: bool,
    ) -> ProviderResult<ProviderResponse> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            debug!(
                provider = self.provider,
                attempt,
                shape = ?candidate.shape,
                stream,
                "Sending provider request"
            );

            let (error, retry_after) = match self.attempt(candidate, stream).await {
                Ok(response) => return Ok(response),
                Err(AttemptFailure::Stop(error)) => return Err(error),
                Err(AttemptFailure::Retry { error, retry_after }) => (error, retry_after),
            };

            if attempt > self.retry.max_retries {
                warn!(provider = self.provider, attempt, "Giving up: {error}");
                return Err(error.exhausted());
            }

            let delay = self.retry.delay_for_attempt(attempt, retry_after);
            warn!(
                provider = self.provider,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "Retrying after error: {error}"
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn attempt(
        &self,
        candidate: &CandidateBody,
        stream: bool,
    ) -> Result<ProviderResponse, AttemptFailure> {
        let client = Client::builder()
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|source| {
                AttemptFailure::Stop(ProviderError::Transport {
                    provider: self.provider,
                    source,
                })
            })?;

        let mut request = client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&candidate.body);
        if stream {
            request = request.header(ACCEPT, "text/event-stream");
        }

        match tokio::time::timeout(self.timeout, self.exchange(request, stream)).await {
            Ok(result) => result,
            Err(_) => Err(AttemptFailure::Retry {
                error: ProviderError::Timeout {
                    provider: self.provider,
                    seconds: self.timeout.as_secs_f64(),
                },
                retry_after: None,
            }),
        }
    }

    async fn exchange(
        &self,
        request: RequestBuilder,
        stream: bool,
    ) -> Result<ProviderResponse, AttemptFailure> {
        let response = request.send().await.map_err(|e| self.transport_failure(e))?;
        let status = response.status();

        if status.is_success() {
            if stream {
                return Ok(ProviderResponse::Stream(response));
            }
            let body = response
                .bytes()
                .await
                .map_err(|e| self.transport_failure(e))?;
            let document = serde_json::from_slice(&body).map_err(|e| {
                AttemptFailure::Stop(ProviderError::Decode {
                    provider: self.provider,
                    detail: e.to_string(),
                })
            })?;
            return Ok(ProviderResponse::Document(document));
        }

        let retry_after = parse_retry_after(response.headers());
        // Reading the body to the end hands the connection back before the
        // next attempt starts.
        let body = response.text().await.unwrap_or_default();
        Err(self.classify(status, &body, retry_after))
    }

    fn classify(
        &self,
        status: StatusCode,
        body: &str,
        retry_after: Option<Duration>,
    ) -> AttemptFailure {
        if status == StatusCode::UNPROCESSABLE_ENTITY {
            // Any 422 is read as a shape problem, whatever the validation
            // error was about.
            return AttemptFailure::Stop(ProviderError::shape_rejected(self.provider, status, body));
        }

        let error = ProviderError::rejected(self.provider, status);
        if is_retryable_status(status.as_u16()) {
            AttemptFailure::Retry { error, retry_after }
        } else {
            AttemptFailure::Stop(error)
        }
    }

    fn transport_failure(&self, source: reqwest::Error) -> AttemptFailure {
        AttemptFailure::Retry {
            error: ProviderError::Transport {
                provider: self.provider,
                source,
            },
            retry_after: None,
        }
    }
}
