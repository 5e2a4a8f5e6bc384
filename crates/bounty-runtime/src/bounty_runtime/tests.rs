//! Tests for bounty command intake, funding workflows and outcome reporting.

use std::sync::Arc;
use std::time::Duration;

use bounty_chain::network::{ConfirmationLevel, SignError, SignatureStatus};
use bounty_chain::pipeline::{ConfirmationPolicy, PipelineError, PipelineOutcome};
use bounty_chain::test_support::{ConfirmScript, ScriptedNetwork};
use bounty_issues::bounty_command::{BountyAllowList, BountyCommand};
use bounty_issues::issue_comment::BountyLinks;
use bounty_issues::token_labels::{USDC_MINT, WRAPPED_SOL_MINT};
use chrono::{SecondsFormat, Utc};
use httpmock::prelude::*;
use httpmock::Mock;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use super::marketplace_client::marketplace_error_detail;
use super::outcome_reporter::{render_command_report, CommandOutcome, CommandReport};
use super::{created_within_window, BountyBotRuntime, BountyBotRuntimeConfig, RepoRef};

mod core_and_parsing;

const ISSUE_NUMBER: u64 = 7;
const BOT_LOGIN: &str = "bounty-bot";
const TASK_ID: &str = "task-42";
const TASK_BLOB: &str = "blob-1";

fn fast_policy() -> ConfirmationPolicy {
    ConfirmationPolicy {
        submit_max_retries: 5,
        confirm_timeout: Duration::from_millis(30),
        fallback_settle_delay: Duration::from_millis(1),
        fallback_retries: 3,
        fallback_retry_delay: Duration::from_millis(1),
    }
}

fn test_config(base_url: &str, network: Arc<ScriptedNetwork>) -> BountyBotRuntimeConfig {
    BountyBotRuntimeConfig {
        network,
        allow_list: BountyAllowList::new(["alice", "@Bob"]),
        repo_slugs: vec!["owner/repo".to_string()],
        github_api_base: base_url.to_string(),
        github_token: "test-token".to_string(),
        bot_login: Some(BOT_LOGIN.to_string()),
        marketplace_api_base: format!("{base_url}/marketplace"),
        marketplace_api_key: Some("market-key".to_string()),
        marketplace_web_base: "https://market.example/tasks".to_string(),
        explorer_base: "https://solscan.io/tx".to_string(),
        explorer_cluster: None,
        payer: "Payer11111111111111111111111111111111111111".to_string(),
        confirmation_policy: fast_policy(),
        poll_interval: Duration::from_millis(1),
        cleanup_interval: Duration::from_secs(3_600),
        retention: Duration::from_secs(24 * 3_600),
        comment_lookback: Duration::from_secs(3_600),
        poll_once: true,
        request_timeout_ms: 3_000,
        retry_max_attempts: 2,
        retry_base_delay_ms: 1,
    }
}

fn minutes_ago(minutes: i64) -> String {
    (Utc::now() - chrono::Duration::minutes(minutes)).to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn issue_url(base_url: &str) -> String {
    format!("{base_url}/repos/owner/repo/issues/{ISSUE_NUMBER}")
}

fn comment_json(base_url: &str, id: u64, login: &str, body: &str) -> Value {
    json!({
        "id": id,
        "body": body,
        "user": {"login": login},
        "issue_url": issue_url(base_url),
        "created_at": minutes_ago(1),
    })
}

fn usdc_command(amount: &str) -> String {
    format!("/bounty {amount} {USDC_MINT}")
}

fn mock_comment_listing<'a>(server: &'a MockServer, comments: Value) -> Mock<'a> {
    server.mock(|when, then| {
        when.method(GET)
            .path("/repos/owner/repo/issues/comments")
            .query_param("sort", "created")
            .query_param_exists("since");
        then.status(200).json_body(comments);
    })
}

fn mock_issue_and_repository(server: &MockServer) -> (Mock<'_>, Mock<'_>) {
    let base_url = server.base_url();
    let issue = server.mock(|when, then| {
        when.method(GET)
            .path(format!("/repos/owner/repo/issues/{ISSUE_NUMBER}"));
        then.status(200).json_body(json!({
            "number": ISSUE_NUMBER,
            "title": "  Parser panics on empty input ",
            "body": "Steps to reproduce: run with an empty file.",
            "repository_url": format!("{base_url}/repos/owner/repo"),
            "html_url": "https://github.com/owner/repo/issues/7",
        }));
    });
    let repository = server.mock(|when, then| {
        when.method(GET).path("/repos/owner/repo");
        then.status(200)
            .json_body(json!({"full_name": "owner/repo", "language": "Rust"}));
    });
    (issue, repository)
}

fn mock_marketplace_task(server: &MockServer) -> Mock<'_> {
    server.mock(|when, then| {
        when.method(POST)
            .path("/marketplace/tasks")
            .header("authorization", "Bearer market-key");
        then.status(201).json_body(json!({
            "taskId": TASK_ID,
            "serializedTransaction": TASK_BLOB,
        }));
    })
}

fn mock_report_post<'a>(server: &'a MockServer, fragments: &[&str]) -> Mock<'a> {
    server.mock(|when, then| {
        fragments.iter().fold(
            when.method(POST)
                .path(format!("/repos/owner/repo/issues/{ISSUE_NUMBER}/comments")),
            |when, fragment| when.body_includes(*fragment),
        );
        then.status(201).json_body(json!({
            "id": 9_001,
            "html_url": "https://github.com/owner/repo/issues/7#issuecomment-9001",
        }));
    })
}

async fn runtime_for(server: &MockServer, network: &Arc<ScriptedNetwork>) -> BountyBotRuntime {
    BountyBotRuntime::new(test_config(&server.base_url(), network.clone()))
        .await
        .expect("runtime")
}
