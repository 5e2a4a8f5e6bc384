use bounty_chain::pipeline::PipelineOutcome;
use bounty_issues::bounty_command::BountyCommand;
use bounty_issues::issue_comment::{
    render_bounty_outcome_comment, render_unauthorized_comment, BountyCommentView, BountyLinks,
    BountyOutcomeView,
};

use super::github_api_client::GithubApiClient;
use super::RepoRef;

/// Terminal result of one authorized command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum CommandOutcome {
    /// The command reached the transaction pipeline.
    Pipeline(PipelineOutcome),
    /// The command failed before any transaction existed.
    Aborted { error: String },
}

impl CommandOutcome {
    pub(super) fn status(&self) -> &'static str {
        match self {
            Self::Pipeline(outcome) => outcome.status(),
            Self::Aborted { .. } => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct CommandReport {
    pub(super) comment_id: u64,
    pub(super) issue_number: u64,
    pub(super) requester_login: String,
    pub(super) command: BountyCommand,
    pub(super) task_id: Option<String>,
    pub(super) outcome: CommandOutcome,
}

pub(super) fn render_command_report(report: &CommandReport, links: BountyLinks<'_>) -> String {
    let error_text;
    let outcome = match &report.outcome {
        CommandOutcome::Pipeline(PipelineOutcome::Success { signature, .. }) => {
            BountyOutcomeView::Success { signature }
        }
        CommandOutcome::Pipeline(PipelineOutcome::AmbiguousSuccess { signature, .. }) => {
            BountyOutcomeView::Pending { signature }
        }
        CommandOutcome::Pipeline(PipelineOutcome::Failure { signature, error }) => {
            error_text = error.to_string();
            BountyOutcomeView::Failure {
                signature: signature.as_deref(),
                error: &error_text,
            }
        }
        CommandOutcome::Aborted { error } => BountyOutcomeView::Failure {
            signature: None,
            error,
        },
    };
    render_bounty_outcome_comment(
        BountyCommentView {
            comment_id: report.comment_id,
            requester_login: &report.requester_login,
            amount: report.command.amount,
            token_address: &report.command.token_address,
            task_id: report.task_id.as_deref(),
            outcome,
        },
        links,
    )
}

/// Posts result comments. Posting is best-effort: failures are logged and
/// reported back as `false`, never retried here.
#[derive(Clone)]
pub(super) struct OutcomeReporter {
    github_client: GithubApiClient,
    marketplace_web_base: String,
    explorer_base: String,
    explorer_cluster: Option<String>,
}

impl OutcomeReporter {
    pub(super) fn new(
        github_client: GithubApiClient,
        marketplace_web_base: String,
        explorer_base: String,
        explorer_cluster: Option<String>,
    ) -> Self {
        Self {
            github_client,
            marketplace_web_base,
            explorer_base,
            explorer_cluster,
        }
    }

    fn links(&self) -> BountyLinks<'_> {
        BountyLinks {
            marketplace_web_base: &self.marketplace_web_base,
            explorer_base: &self.explorer_base,
            explorer_cluster: self.explorer_cluster.as_deref(),
        }
    }

    pub(super) async fn report(&self, repo: &RepoRef, report: &CommandReport) -> bool {
        let body = render_command_report(report, self.links());
        self.post(repo, report.issue_number, report.comment_id, &body, report.outcome.status())
            .await
    }

    pub(super) async fn report_unauthorized(
        &self,
        repo: &RepoRef,
        issue_number: u64,
        comment_id: u64,
        requester_login: &str,
        command: &BountyCommand,
    ) -> bool {
        let body = render_unauthorized_comment(
            comment_id,
            requester_login,
            command.amount,
            &command.token_address,
        );
        self.post(repo, issue_number, comment_id, &body, "denied")
            .await
    }

    async fn post(
        &self,
        repo: &RepoRef,
        issue_number: u64,
        comment_id: u64,
        body: &str,
        status: &str,
    ) -> bool {
        match self
            .github_client
            .create_issue_comment(repo, issue_number, body)
            .await
        {
            Ok(posted) => {
                tracing::info!(
                    repo = %repo.as_slug(),
                    issue_number,
                    comment_id,
                    status,
                    report_comment_id = posted.id,
                    report_url = posted.html_url.as_deref().unwrap_or(""),
                    "posted bounty report"
                );
                true
            }
            Err(error) => {
                tracing::warn!(
                    repo = %repo.as_slug(),
                    issue_number,
                    comment_id,
                    status,
                    error = %format!("{error:#}"),
                    "failed to post bounty report"
                );
                false
            }
        }
    }
}
