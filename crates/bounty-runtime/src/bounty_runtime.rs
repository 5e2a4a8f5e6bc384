//! Bounty bot runtime: poll loop, command intake and outcome reporting.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use bounty_chain::network::BountyNetwork;
use bounty_chain::pipeline::{ConfirmationPolicy, PipelineOutcome, TransactionPipeline};
use bounty_issues::bounty_command::{
    evaluate_bounty_comment, BountyAllowList, BountyCommand, BountyCommentAction,
};
use bounty_issues::bounty_request::{build_bounty_request, MarketplaceTaskRequest};
use bounty_issues::comment_registry::ProcessedCommentRegistry;
use bounty_issues::issue_comment::extract_footer_comment_ids;
use bounty_issues::issue_event_collection::{collect_candidate_comments, BountyCandidateComment};
use chrono::{DateTime, SecondsFormat, Utc};
use tokio::time::MissedTickBehavior;

mod github_api_client;
mod marketplace_client;
mod outcome_reporter;

use github_api_client::GithubApiClient;
use marketplace_client::MarketplaceClient;
use outcome_reporter::{CommandOutcome, CommandReport, OutcomeReporter};

#[derive(Clone)]
/// Runtime configuration for the bounty bot polling loop.
pub struct BountyBotRuntimeConfig {
    pub network: Arc<dyn BountyNetwork>,
    pub allow_list: BountyAllowList,
    pub repo_slugs: Vec<String>,
    pub github_api_base: String,
    pub github_token: String,
    pub bot_login: Option<String>,
    pub marketplace_api_base: String,
    pub marketplace_api_key: Option<String>,
    pub marketplace_web_base: String,
    pub explorer_base: String,
    pub explorer_cluster: Option<String>,
    /// Base58 operator pubkey sent to the marketplace as the bounty payer.
    pub payer: String,
    pub confirmation_policy: ConfirmationPolicy,
    pub poll_interval: Duration,
    pub cleanup_interval: Duration,
    pub retention: Duration,
    pub comment_lookback: Duration,
    pub poll_once: bool,
    pub request_timeout_ms: u64,
    pub retry_max_attempts: usize,
    pub retry_base_delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let (owner, name) = trimmed
            .split_once('/')
            .ok_or_else(|| anyhow!("invalid --github-repo '{raw}', expected owner/repo"))?;
        let owner = owner.trim();
        let name = name.trim();
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            bail!("invalid --github-repo '{raw}', expected owner/repo");
        }
        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    pub fn as_slug(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PollCycleReport {
    pub discovered_comments: usize,
    pub processed_commands: usize,
    pub skipped_duplicate_comments: usize,
    pub ignored_comments: usize,
    pub unauthorized_commands: usize,
    pub succeeded_commands: usize,
    pub pending_commands: usize,
    pub failed_commands: usize,
    pub report_failures: usize,
    pub recovered_markers: usize,
    pub failed_repositories: usize,
}

/// Runs the bounty bot until ctrl-c, or for one tick in poll-once mode.
pub async fn run_bounty_bot(config: BountyBotRuntimeConfig) -> Result<()> {
    let mut runtime = BountyBotRuntime::new(config).await?;
    runtime.run().await
}

pub struct BountyBotRuntime {
    config: BountyBotRuntimeConfig,
    repos: Vec<RepoRef>,
    github_client: GithubApiClient,
    marketplace_client: MarketplaceClient,
    pipeline: TransactionPipeline,
    reporter: OutcomeReporter,
    registry: ProcessedCommentRegistry,
    bot_login: String,
}

impl BountyBotRuntime {
    pub async fn new(config: BountyBotRuntimeConfig) -> Result<Self> {
        let repos = config
            .repo_slugs
            .iter()
            .map(|slug| RepoRef::parse(slug))
            .collect::<Result<Vec<_>>>()?;
        if repos.is_empty() {
            bail!("at least one --github-repo is required");
        }
        let github_client = GithubApiClient::new(
            config.github_api_base.clone(),
            config.github_token.clone(),
            config.request_timeout_ms,
            config.retry_max_attempts,
            config.retry_base_delay_ms,
        )?;
        let marketplace_client = MarketplaceClient::new(
            config.marketplace_api_base.clone(),
            config.marketplace_api_key.clone(),
            config.request_timeout_ms,
            config.retry_max_attempts,
            config.retry_base_delay_ms,
        )?;
        let bot_login = match config.bot_login.clone() {
            Some(login) if !login.trim().is_empty() => login.trim().to_string(),
            _ => github_client
                .resolve_bot_login()
                .await
                .context("failed to resolve bot login; pass --github-bot-login")?,
        };
        let pipeline =
            TransactionPipeline::new(config.network.clone(), config.confirmation_policy.clone());
        let reporter = OutcomeReporter::new(
            github_client.clone(),
            config.marketplace_web_base.clone(),
            config.explorer_base.clone(),
            config.explorer_cluster.clone(),
        );
        if config.allow_list.is_empty() {
            tracing::warn!("bounty allow-list is empty; every /bounty command will be denied");
        }
        tracing::info!(
            repos = repos.len(),
            bot_login = %bot_login,
            allowed_users = config.allow_list.len(),
            payer = %config.payer,
            "bounty bot runtime ready"
        );
        Ok(Self {
            config,
            repos,
            github_client,
            marketplace_client,
            pipeline,
            reporter,
            registry: ProcessedCommentRegistry::new(),
            bot_login,
        })
    }

    pub fn bot_login(&self) -> &str {
        &self.bot_login
    }

    pub fn registry(&self) -> &ProcessedCommentRegistry {
        &self.registry
    }

    /// Ticks are awaited inside the select loop, so a poll never overlaps
    /// another poll or a cleanup.
    pub async fn run(&mut self) -> Result<()> {
        if self.config.poll_once {
            let report = self.poll_once().await?;
            if report.failed_repositories > 0 {
                bail!(
                    "bounty poll failed for {} of {} repositories",
                    report.failed_repositories,
                    self.repos.len()
                );
            }
            return Ok(());
        }

        let poll_period = self.config.poll_interval.max(Duration::from_millis(1));
        let cleanup_period = self.config.cleanup_interval.max(Duration::from_millis(1));
        let mut poll_interval = tokio::time::interval(poll_period);
        poll_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut cleanup_interval = tokio::time::interval_at(
            tokio::time::Instant::now() + cleanup_period,
            cleanup_period,
        );
        cleanup_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("bounty bot shutdown requested");
                    return Ok(());
                }
                _ = poll_interval.tick() => {
                    if let Err(error) = self.poll_once().await {
                        tracing::error!(error = %format!("{error:#}"), "bounty poll failed");
                    }
                }
                _ = cleanup_interval.tick() => {
                    self.purge_registry(Utc::now());
                }
            }
        }
    }

    /// Evicts registry entries older than the retention window.
    pub fn purge_registry(&mut self, now: DateTime<Utc>) -> usize {
        let window = chrono::Duration::from_std(self.config.retention)
            .unwrap_or_else(|_| chrono::Duration::hours(24));
        let removed = self.registry.purge_older_than(now, window);
        tracing::info!(
            removed,
            remaining = self.registry.len(),
            "purged processed comment registry"
        );
        removed
    }

    pub async fn poll_once(&mut self) -> Result<PollCycleReport> {
        let now = Utc::now();
        let lookback = chrono::Duration::from_std(self.config.comment_lookback)
            .context("comment lookback window is out of range")?;
        let since = now - lookback;
        let mut report = PollCycleReport::default();

        for repo in self.repos.clone() {
            if let Err(error) = self.poll_repository(&repo, since, now, &mut report).await {
                report.failed_repositories = report.failed_repositories.saturating_add(1);
                tracing::warn!(
                    repo = %repo.as_slug(),
                    error = %format!("{error:#}"),
                    "bounty poll failed for repository"
                );
            }
        }

        tracing::info!(
            discovered = report.discovered_comments,
            processed = report.processed_commands,
            duplicates = report.skipped_duplicate_comments,
            ignored = report.ignored_comments,
            unauthorized = report.unauthorized_commands,
            succeeded = report.succeeded_commands,
            pending = report.pending_commands,
            failed = report.failed_commands,
            report_failures = report.report_failures,
            failed_repositories = report.failed_repositories,
            "bounty poll complete"
        );
        Ok(report)
    }

    async fn poll_repository(
        &mut self,
        repo: &RepoRef,
        since: DateTime<Utc>,
        now: DateTime<Utc>,
        report: &mut PollCycleReport,
    ) -> Result<()> {
        let since_param = since.to_rfc3339_opts(SecondsFormat::Secs, true);
        let comments = self
            .github_client
            .list_recent_comments(repo, &since_param)
            .await?;
        let bot_login = self.bot_login.clone();

        for comment in comments
            .iter()
            .filter(|comment| comment.user.login.eq_ignore_ascii_case(&bot_login))
        {
            for comment_id in comment
                .body
                .as_deref()
                .map(extract_footer_comment_ids)
                .unwrap_or_default()
            {
                if self.registry.mark_seen(comment_id, now) {
                    report.recovered_markers = report.recovered_markers.saturating_add(1);
                }
            }
        }

        let candidates = collect_candidate_comments(&comments, &bot_login);
        report.discovered_comments = report.discovered_comments.saturating_add(candidates.len());

        for candidate in candidates {
            if !created_within_window(&candidate.created_at, since) {
                report.ignored_comments = report.ignored_comments.saturating_add(1);
                continue;
            }
            if !self.registry.mark_seen(candidate.comment_id, now) {
                report.skipped_duplicate_comments =
                    report.skipped_duplicate_comments.saturating_add(1);
                continue;
            }

            match evaluate_bounty_comment(
                &candidate.body,
                &candidate.author_login,
                &candidate.issue_url,
                &self.config.allow_list,
            ) {
                BountyCommentAction::NotCommand => {
                    report.ignored_comments = report.ignored_comments.saturating_add(1);
                }
                BountyCommentAction::Unauthorized(command) => {
                    report.unauthorized_commands = report.unauthorized_commands.saturating_add(1);
                    tracing::warn!(
                        repo = %repo.as_slug(),
                        comment_id = candidate.comment_id,
                        issue_number = candidate.issue_number,
                        requester = %candidate.author_login,
                        "bounty command from user outside allow-list"
                    );
                    if !self
                        .reporter
                        .report_unauthorized(
                            repo,
                            candidate.issue_number,
                            candidate.comment_id,
                            &candidate.author_login,
                            &command,
                        )
                        .await
                    {
                        report.report_failures = report.report_failures.saturating_add(1);
                    }
                }
                BountyCommentAction::Authorized(command) => {
                    let command_report = self.execute_command(repo, &candidate, command).await;
                    report.processed_commands = report.processed_commands.saturating_add(1);
                    match &command_report.outcome {
                        CommandOutcome::Pipeline(PipelineOutcome::Success { .. }) => {
                            report.succeeded_commands = report.succeeded_commands.saturating_add(1);
                        }
                        CommandOutcome::Pipeline(PipelineOutcome::AmbiguousSuccess { .. }) => {
                            report.pending_commands = report.pending_commands.saturating_add(1);
                        }
                        CommandOutcome::Pipeline(PipelineOutcome::Failure { .. })
                        | CommandOutcome::Aborted { .. } => {
                            report.failed_commands = report.failed_commands.saturating_add(1);
                        }
                    }
                    if !self.reporter.report(repo, &command_report).await {
                        report.report_failures = report.report_failures.saturating_add(1);
                    }
                }
            }
        }
        Ok(())
    }

    /// Runs one authorized command to a terminal outcome. Never errors; every
    /// failure becomes [`CommandOutcome`] so the command is reported once.
    async fn execute_command(
        &self,
        repo: &RepoRef,
        candidate: &BountyCandidateComment,
        command: BountyCommand,
    ) -> CommandReport {
        let mut command_report = CommandReport {
            comment_id: candidate.comment_id,
            issue_number: candidate.issue_number,
            requester_login: candidate.author_login.clone(),
            command,
            task_id: None,
            outcome: CommandOutcome::Aborted {
                error: String::new(),
            },
        };
        tracing::info!(
            repo = %repo.as_slug(),
            comment_id = candidate.comment_id,
            issue_number = candidate.issue_number,
            requester = %candidate.author_login,
            amount = %command_report.command.amount,
            token = %command_report.command.token_address,
            "processing bounty command"
        );

        let request = match self.load_bounty_request(&command_report.command).await {
            Ok(request) => request,
            Err(error) => {
                command_report.outcome = CommandOutcome::Aborted {
                    error: format!("{error:#}"),
                };
                return command_report;
            }
        };

        let task = match self.marketplace_client.create_task(&request).await {
            Ok(task) => task,
            Err(error) => {
                tracing::warn!(
                    repo = %repo.as_slug(),
                    comment_id = candidate.comment_id,
                    error = %error,
                    "marketplace rejected bounty request"
                );
                command_report.outcome = CommandOutcome::Aborted {
                    error: error.to_string(),
                };
                return command_report;
            }
        };
        tracing::info!(
            repo = %repo.as_slug(),
            comment_id = candidate.comment_id,
            task_id = %task.task_id,
            "marketplace task created"
        );
        command_report.task_id = Some(task.task_id.clone());

        let resolution = self.pipeline.execute(&task.serialized_transaction).await;
        tracing::info!(
            repo = %repo.as_slug(),
            comment_id = candidate.comment_id,
            task_id = %task.task_id,
            status = resolution.outcome.status(),
            signature = resolution.outcome.signature().unwrap_or("none"),
            fallback_checks = resolution.attempt.retry_count,
            "bounty transaction resolved"
        );
        command_report.outcome = CommandOutcome::Pipeline(resolution.outcome);
        command_report
    }

    async fn load_bounty_request(
        &self,
        command: &BountyCommand,
    ) -> Result<MarketplaceTaskRequest> {
        let issue = self
            .github_client
            .get_issue(&command.issue_url)
            .await
            .context("failed to load issue for bounty")?;
        let repository = self
            .github_client
            .get_repository(&issue.repository_url)
            .await
            .context("failed to load repository for bounty")?;
        Ok(build_bounty_request(
            command,
            &issue,
            &repository,
            &self.config.payer,
        ))
    }
}

/// Unparseable timestamps count as outside the window.
fn created_within_window(created_at: &str, since: DateTime<Utc>) -> bool {
    DateTime::parse_from_rfc3339(created_at.trim())
        .map(|created| created.with_timezone(&Utc) >= since)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests;
