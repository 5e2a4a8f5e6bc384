use anyhow::{bail, Result};
use bounty_runtime::RepoRef;

use crate::cli_args::Cli;

pub(crate) fn resolve_non_empty_cli_value(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn ensure_http_url(flag: &str, value: &str) -> Result<()> {
    let trimmed = value.trim();
    if !(trimmed.starts_with("https://") || trimmed.starts_with("http://")) {
        bail!("{flag} must be an http(s) URL, got '{trimmed}'");
    }
    Ok(())
}

pub(crate) fn validate_cli(cli: &Cli) -> Result<()> {
    if cli.github_repo.iter().all(|repo| repo.trim().is_empty()) {
        bail!("--github-repo is required");
    }
    for repo in cli.github_repo.iter().filter(|repo| !repo.trim().is_empty()) {
        RepoRef::parse(repo)?;
    }
    if resolve_non_empty_cli_value(cli.github_token.as_deref()).is_none() {
        bail!("--github-token (or GITHUB_TOKEN) is required");
    }
    ensure_http_url("--github-api-base", &cli.github_api_base)?;

    let Some(marketplace_api_base) =
        resolve_non_empty_cli_value(cli.marketplace_api_base.as_deref())
    else {
        bail!("--marketplace-api-base is required");
    };
    ensure_http_url("--marketplace-api-base", &marketplace_api_base)?;
    let Some(marketplace_web_base) =
        resolve_non_empty_cli_value(cli.marketplace_web_base.as_deref())
    else {
        bail!("--marketplace-web-base is required");
    };
    ensure_http_url("--marketplace-web-base", &marketplace_web_base)?;
    ensure_http_url("--solana-rpc-url", &cli.solana_rpc_url)?;
    ensure_http_url("--explorer-base", &cli.explorer_base)?;

    let has_inline_keypair = resolve_non_empty_cli_value(cli.wallet_keypair.as_deref()).is_some();
    match (has_inline_keypair, cli.wallet_keypair_file.is_some()) {
        (true, true) => {
            bail!("--wallet-keypair cannot be combined with --wallet-keypair-file")
        }
        (false, false) => bail!("--wallet-keypair or --wallet-keypair-file is required"),
        _ => {}
    }

    if cli.allowed_user.iter().any(|login| login.trim().is_empty()) {
        bail!("--allowed-user cannot be empty");
    }
    if cli.poll_interval_seconds == 0 {
        bail!("--poll-interval-seconds must be greater than 0");
    }
    if cli.cleanup_interval_seconds == 0 {
        bail!("--cleanup-interval-seconds must be greater than 0");
    }
    if cli.retention_hours == 0 {
        bail!("--retention-hours must be greater than 0");
    }
    if cli.comment_lookback_minutes == 0 {
        bail!("--comment-lookback-minutes must be greater than 0");
    }
    if cli.request_timeout_ms == 0 {
        bail!("--request-timeout-ms must be greater than 0");
    }
    if cli.retry_max_attempts == 0 {
        bail!("--retry-max-attempts must be greater than 0");
    }
    if cli.retry_base_delay_ms == 0 {
        bail!("--retry-base-delay-ms must be greater than 0");
    }
    if cli.confirm_timeout_seconds == 0 {
        bail!("--confirm-timeout-seconds must be greater than 0");
    }
    if cli.confirm_poll_interval_ms == 0 {
        bail!("--confirm-poll-interval-ms must be greater than 0");
    }
    Ok(())
}
