use std::time::Duration;

use anyhow::{Context, Result};
use bounty_issues::bounty_request::MarketplaceTaskRequest;
use bounty_issues::request_retry::{clip_error_text, RequestKind, RetryBudget, TransportFailure};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

const ERROR_DETAIL_MAX_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
/// A task created by the marketplace and the unsigned transaction funding it.
pub(super) struct MarketplaceTask {
    pub(super) task_id: String,
    pub(super) serialized_transaction: String,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub(super) enum MarketplaceError {
    #[error("marketplace rejected bounty request with status {status}: {detail}")]
    Rejected { status: u16, detail: String },
    #[error("marketplace request failed: {0}")]
    Transport(String),
    #[error("invalid marketplace response: {0}")]
    InvalidResponse(String),
}

#[derive(Clone)]
pub(super) struct MarketplaceClient {
    http: reqwest::Client,
    api_base: String,
    retry: RetryBudget,
}

impl MarketplaceClient {
    pub(super) fn new(
        api_base: String,
        api_key: Option<String>,
        request_timeout_ms: u64,
        retry_max_attempts: usize,
        retry_base_delay_ms: u64,
    ) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("bounty-bot"),
        );
        if let Some(api_key) = api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
        {
            headers.insert(
                reqwest::header::AUTHORIZATION,
                reqwest::header::HeaderValue::from_str(&format!("Bearer {api_key}"))
                    .context("invalid marketplace authorization header")?,
            );
        }
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(request_timeout_ms.max(1)))
            .build()
            .context("failed to create marketplace api client")?;
        Ok(Self {
            http: client,
            api_base: api_base.trim_end_matches('/').to_string(),
            retry: RetryBudget::new(retry_max_attempts, retry_base_delay_ms),
        })
    }

    /// Creates a task. A 5xx may still have created one, so only
    /// failures to connect are retried.
    pub(super) async fn create_task(
        &self,
        request: &MarketplaceTaskRequest,
    ) -> Result<MarketplaceTask, MarketplaceError> {
        let mut attempt = 0_usize;
        let response = loop {
            attempt = attempt.saturating_add(1);
            match self
                .http
                .post(format!("{}/tasks", self.api_base))
                .json(request)
                .send()
                .await
            {
                Ok(response) => break response,
                Err(error)
                    if self.retry.should_retry_failure(
                        RequestKind::Create,
                        attempt,
                        TransportFailure::classify(&error),
                    ) =>
                {
                    tokio::time::sleep(self.retry.backoff(attempt, None)).await;
                }
                Err(error) => return Err(MarketplaceError::Transport(error.to_string())),
            }
        };

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| MarketplaceError::Transport(error.to_string()))?;
        if !status.is_success() {
            return Err(MarketplaceError::Rejected {
                status: status.as_u16(),
                detail: marketplace_error_detail(&body),
            });
        }
        serde_json::from_str::<MarketplaceTask>(&body)
            .map_err(|error| MarketplaceError::InvalidResponse(error.to_string()))
    }
}

/// The `error`, `message` or `detail` field of a JSON error body, else the raw body.
pub(super) fn marketplace_error_detail(body: &str) -> String {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|value| {
        ["error", "message", "detail"].iter().find_map(|field| {
            value
                .get(*field)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .map(str::to_string)
        })
    });
    let detail = from_json.unwrap_or_else(|| body.trim().to_string());
    if detail.is_empty() {
        return "empty response body".to_string();
    }
    clip_error_text(&detail, ERROR_DETAIL_MAX_CHARS)
}
