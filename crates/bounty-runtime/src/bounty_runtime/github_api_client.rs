use std::time::Duration;

use anyhow::{bail, Context, Result};
use bounty_issues::request_retry::{
    clip_error_text, retry_after_hint, RequestKind, RetryBudget, TransportFailure,
};
use bounty_issues::issue_event_collection::{GithubIssue, GithubIssueComment, GithubRepository};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use super::RepoRef;

const COMMENTS_PAGE_SIZE: usize = 100;
const ERROR_BODY_MAX_CHARS: usize = 800;

#[derive(Debug, Clone, Deserialize)]
pub(super) struct GithubCommentCreateResponse {
    pub(super) id: u64,
    pub(super) html_url: Option<String>,
}

#[derive(Clone)]
pub(super) struct GithubApiClient {
    http: reqwest::Client,
    api_base: String,
    retry: RetryBudget,
}

impl GithubApiClient {
    pub(super) fn new(
        api_base: String,
        token: String,
        request_timeout_ms: u64,
        retry_max_attempts: usize,
        retry_base_delay_ms: u64,
    ) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("bounty-bot"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            reqwest::header::HeaderValue::from_static("2022-11-28"),
        );
        let auth_header = format!("Bearer {}", token.trim());
        headers.insert(
            reqwest::header::AUTHORIZATION,
            reqwest::header::HeaderValue::from_str(&auth_header)
                .context("invalid github authorization header")?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(request_timeout_ms.max(1)))
            .build()
            .context("failed to create github api client")?;
        Ok(Self {
            http: client,
            api_base: api_base.trim_end_matches('/').to_string(),
            retry: RetryBudget::new(retry_max_attempts, retry_base_delay_ms),
        })
    }

    pub(super) async fn resolve_bot_login(&self) -> Result<String> {
        #[derive(Deserialize)]
        struct Viewer {
            login: String,
        }

        let viewer: Viewer = self
            .request_json("resolve bot login", RequestKind::Read, || {
                self.http.get(format!("{}/user", self.api_base))
            })
            .await?;
        Ok(viewer.login)
    }

    /// Repository-wide issue comments updated at or after `since`.
    pub(super) async fn list_recent_comments(
        &self,
        repo: &RepoRef,
        since: &str,
    ) -> Result<Vec<GithubIssueComment>> {
        let mut page = 1_u32;
        let mut rows = Vec::new();
        loop {
            let page_value = page.to_string();
            let chunk: Vec<GithubIssueComment> = self
                .request_json("list issue comments", RequestKind::Read, || {
                    self.http
                        .get(format!(
                            "{}/repos/{}/{}/issues/comments",
                            self.api_base, repo.owner, repo.name
                        ))
                        .query(&[
                            ("sort", "created"),
                            ("direction", "desc"),
                            ("per_page", "100"),
                            ("since", since),
                            ("page", page_value.as_str()),
                        ])
                })
                .await?;
            let chunk_len = chunk.len();
            rows.extend(chunk);
            if chunk_len < COMMENTS_PAGE_SIZE {
                break;
            }
            page = page.saturating_add(1);
        }
        Ok(rows)
    }

    pub(super) async fn get_issue(&self, issue_url: &str) -> Result<GithubIssue> {
        let url = self.api_url(issue_url)?;
        self.request_json("get issue", RequestKind::Read, || self.http.get(url.as_str()))
            .await
    }

    pub(super) async fn get_repository(&self, repository_url: &str) -> Result<GithubRepository> {
        let url = self.api_url(repository_url)?;
        self.request_json("get repository", RequestKind::Read, || self.http.get(url.as_str()))
            .await
    }

    pub(super) async fn create_issue_comment(
        &self,
        repo: &RepoRef,
        issue_number: u64,
        body: &str,
    ) -> Result<GithubCommentCreateResponse> {
        let payload = json!({ "body": body });
        self.request_json("create issue comment", RequestKind::Create, || {
            self.http
                .post(format!(
                    "{}/repos/{}/{}/issues/{}/comments",
                    self.api_base, repo.owner, repo.name, issue_number
                ))
                .json(&payload)
        })
        .await
    }

    /// Links returned by the API are only followed when they stay on the
    /// configured API host, so the token never leaves it.
    fn api_url(&self, url: &str) -> Result<String> {
        let trimmed = url.trim();
        let prefix = format!("{}/", self.api_base);
        if !trimmed.starts_with(&prefix) {
            bail!("refusing to follow github url outside {}: {trimmed}", self.api_base);
        }
        Ok(trimmed.to_string())
    }

    /// Sends until the response settles under `kind`'s replay rules and
    /// decodes a successful body.
    async fn request_json<T, F>(
        &self,
        operation: &str,
        kind: RequestKind,
        mut request_builder: F,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        F: FnMut() -> reqwest::RequestBuilder,
    {
        let mut attempt = 0_usize;
        let response = loop {
            attempt = attempt.saturating_add(1);
            let error = match request_builder().send().await {
                Ok(response) if response.status().is_success() => break response,
                Ok(response) => {
                    let status = response.status().as_u16();
                    let hint = retry_after_hint(response.headers());
                    if self.retry.should_retry_status(kind, attempt, status) {
                        tracing::debug!(operation, status, attempt, "retrying github request");
                        tokio::time::sleep(self.retry.backoff(attempt, hint)).await;
                        continue;
                    }
                    let body = response.text().await.unwrap_or_default();
                    bail!(
                        "github api {operation} failed with status {status}: {}",
                        clip_error_text(&body, ERROR_BODY_MAX_CHARS)
                    );
                }
                Err(error) => error,
            };
            let failure = TransportFailure::classify(&error);
            if self.retry.should_retry_failure(kind, attempt, failure) {
                tracing::debug!(operation, ?failure, attempt, "retrying github request");
                tokio::time::sleep(self.retry.backoff(attempt, None)).await;
                continue;
            }
            return Err(error).with_context(|| format!("github api {operation} request failed"));
        };
        response
            .json::<T>()
            .await
            .with_context(|| format!("failed to decode github {operation}"))
    }
}
