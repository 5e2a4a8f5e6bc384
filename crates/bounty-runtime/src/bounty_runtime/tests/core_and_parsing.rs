use std::str::FromStr;

use super::*;

fn links() -> BountyLinks<'static> {
    BountyLinks {
        marketplace_web_base: "https://market.example/tasks",
        explorer_base: "https://solscan.io/tx",
        explorer_cluster: None,
    }
}

fn report_with(outcome: CommandOutcome, task_id: Option<&str>) -> CommandReport {
    CommandReport {
        comment_id: 101,
        issue_number: ISSUE_NUMBER,
        requester_login: "alice".to_string(),
        command: BountyCommand {
            amount: Decimal::from_str("5").expect("decimal"),
            token_address: WRAPPED_SOL_MINT.to_string(),
            issue_url: "https://api.github.com/repos/owner/repo/issues/7".to_string(),
        },
        task_id: task_id.map(str::to_string),
        outcome,
    }
}

#[test]
fn unit_repo_ref_parse_accepts_owner_repo_shape() {
    let repo = RepoRef::parse(" owner/repo ").expect("parse repo");
    assert_eq!(repo.owner, "owner");
    assert_eq!(repo.name, "repo");
    assert_eq!(repo.as_slug(), "owner/repo");

    let error = RepoRef::parse("missing").expect_err("invalid repo should fail");
    assert!(error.to_string().contains("expected owner/repo"));
    assert!(RepoRef::parse("a/b/c").is_err());
}

#[test]
fn unit_created_within_window_rejects_old_and_unparseable_timestamps() {
    let since = Utc::now() - chrono::Duration::minutes(60);
    assert!(created_within_window(&minutes_ago(5), since));
    assert!(!created_within_window(&minutes_ago(120), since));
    assert!(!created_within_window("yesterday", since));
}

#[test]
fn unit_marketplace_error_detail_prefers_structured_fields() {
    assert_eq!(
        marketplace_error_detail(r#"{"error":"unsupported token mint"}"#),
        "unsupported token mint"
    );
    assert_eq!(
        marketplace_error_detail(r#"{"code":12,"detail":"payer has no balance"}"#),
        "payer has no balance"
    );
    assert_eq!(marketplace_error_detail("gateway exploded\n"), "gateway exploded");
    assert_eq!(marketplace_error_detail("  "), "empty response body");
}

#[test]
fn functional_success_report_links_task_and_transaction_with_sol_label() {
    let body = render_command_report(
        &report_with(
            CommandOutcome::Pipeline(PipelineOutcome::Success {
                signature: "5sigabc".to_string(),
                level: ConfirmationLevel::Confirmed,
            }),
            Some(TASK_ID),
        ),
        links(),
    );
    assert!(body.contains("**5 SOL**"));
    assert!(body.contains("https://market.example/tasks/task-42"));
    assert!(body.contains("private, link-only"));
    assert!(body.contains("https://solscan.io/tx/5sigabc"));
    assert!(body.contains("<!-- bounty-event-key:comment:101 -->"));
    assert!(body.contains("reason_code `bounty_funded`"));
}

#[test]
fn regression_sign_failure_report_has_no_signature_or_explorer_link() {
    let body = render_command_report(
        &report_with(
            CommandOutcome::Pipeline(PipelineOutcome::Failure {
                signature: None,
                error: PipelineError::Sign(SignError::Malformed("truncated message".to_string())),
            }),
            Some(TASK_ID),
        ),
        links(),
    );
    assert!(body.contains("Failed to create a bounty"));
    assert!(body.contains("truncated message"));
    assert!(body.contains("https://market.example/tasks/task-42"));
    assert!(!body.contains("solscan.io"));
    assert!(!body.contains("Transaction `"));
}

#[test]
fn functional_ambiguous_report_keeps_signature_for_reconciliation() {
    let body = render_command_report(
        &report_with(
            CommandOutcome::Pipeline(PipelineOutcome::AmbiguousSuccess {
                signature: "5pending".to_string(),
                reason: "confirmation timed out".to_string(),
            }),
            Some(TASK_ID),
        ),
        links(),
    );
    assert!(body.contains("could not be confirmed yet"));
    assert!(body.contains("https://solscan.io/tx/5pending"));
    assert!(body.contains("_bounty status `pending`"));
}

#[test]
fn unit_aborted_report_without_task_omits_marketplace_link() {
    let body = render_command_report(
        &report_with(
            CommandOutcome::Aborted {
                error: "marketplace rejected bounty request with status 400: bad mint".to_string(),
            },
            None,
        ),
        links(),
    );
    assert!(body.contains("bad mint"));
    assert!(!body.contains("market.example"));
    assert!(body.contains("_bounty status `failed`"));
}
