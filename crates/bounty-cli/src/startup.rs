use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use bounty_chain::network::BountyNetwork;
use bounty_chain::pipeline::ConfirmationPolicy;
use bounty_chain::solana_rpc::SolanaRpcNetwork;
use bounty_chain::wallet::OperatorWallet;
use bounty_issues::bounty_command::BountyAllowList;
use bounty_runtime::{run_bounty_bot, BountyBotRuntimeConfig};

use crate::cli_args::Cli;
use crate::runtime_cli_validation::{resolve_non_empty_cli_value, validate_cli};

pub(crate) async fn run_cli(cli: Cli) -> Result<()> {
    validate_cli(&cli)?;
    let wallet = load_operator_wallet(&cli)?;
    let payer = wallet.pubkey_base58();
    let network = SolanaRpcNetwork::new(cli.solana_rpc_url.clone(), wallet, cli.request_timeout_ms)?
        .with_confirm_poll_interval(Duration::from_millis(cli.confirm_poll_interval_ms));
    tracing::info!(
        payer = %payer,
        rpc_url = %cli.solana_rpc_url,
        "operator wallet loaded"
    );
    let config = build_runtime_config(&cli, Arc::new(network), payer)?;
    run_bounty_bot(config).await
}

pub(crate) fn load_operator_wallet(cli: &Cli) -> Result<OperatorWallet> {
    if let Some(keypair) = resolve_non_empty_cli_value(cli.wallet_keypair.as_deref()) {
        return OperatorWallet::from_base58(&keypair);
    }
    match cli.wallet_keypair_file.as_deref() {
        Some(path) => OperatorWallet::from_json_file(path),
        None => bail!("--wallet-keypair or --wallet-keypair-file is required"),
    }
}

pub(crate) fn confirmation_policy_from_cli(cli: &Cli) -> ConfirmationPolicy {
    ConfirmationPolicy {
        submit_max_retries: cli.submit_max_retries,
        confirm_timeout: Duration::from_secs(cli.confirm_timeout_seconds),
        fallback_settle_delay: Duration::from_millis(cli.fallback_settle_ms),
        fallback_retries: cli.fallback_retries,
        fallback_retry_delay: Duration::from_millis(cli.fallback_retry_delay_ms),
    }
}

pub(crate) fn build_runtime_config(
    cli: &Cli,
    network: Arc<dyn BountyNetwork>,
    payer: String,
) -> Result<BountyBotRuntimeConfig> {
    let Some(github_token) = resolve_non_empty_cli_value(cli.github_token.as_deref()) else {
        bail!("--github-token (or GITHUB_TOKEN) is required");
    };
    let Some(marketplace_api_base) =
        resolve_non_empty_cli_value(cli.marketplace_api_base.as_deref())
    else {
        bail!("--marketplace-api-base is required");
    };
    let Some(marketplace_web_base) =
        resolve_non_empty_cli_value(cli.marketplace_web_base.as_deref())
    else {
        bail!("--marketplace-web-base is required");
    };

    Ok(BountyBotRuntimeConfig {
        network,
        allow_list: BountyAllowList::new(cli.allowed_user.iter().map(String::as_str)),
        repo_slugs: cli
            .github_repo
            .iter()
            .map(|repo| repo.trim().to_string())
            .filter(|repo| !repo.is_empty())
            .collect(),
        github_api_base: cli.github_api_base.trim().to_string(),
        github_token,
        bot_login: resolve_non_empty_cli_value(cli.github_bot_login.as_deref()),
        marketplace_api_base,
        marketplace_api_key: resolve_non_empty_cli_value(cli.marketplace_api_key.as_deref()),
        marketplace_web_base,
        explorer_base: cli.explorer_base.trim().to_string(),
        explorer_cluster: resolve_non_empty_cli_value(cli.explorer_cluster.as_deref()),
        payer,
        confirmation_policy: confirmation_policy_from_cli(cli),
        poll_interval: Duration::from_secs(cli.poll_interval_seconds),
        cleanup_interval: Duration::from_secs(cli.cleanup_interval_seconds),
        retention: Duration::from_secs(cli.retention_hours.saturating_mul(3_600)),
        comment_lookback: Duration::from_secs(cli.comment_lookback_minutes.saturating_mul(60)),
        poll_once: cli.poll_once,
        request_timeout_ms: cli.request_timeout_ms,
        retry_max_attempts: cli.retry_max_attempts,
        retry_base_delay_ms: cli.retry_base_delay_ms,
    })
}
