use std::path::PathBuf;

use clap::{ArgAction, Parser};

#[derive(Debug, Parser)]
#[command(
    name = "bounty-bot",
    about = "Funds GitHub issue bounties requested with /bounty comments",
    version
)]
pub(crate) struct Cli {
    #[arg(
        long = "github-repo",
        env = "BOUNTY_GITHUB_REPOS",
        value_delimiter = ',',
        help = "GitHub repository in owner/repo format to watch (repeatable or comma-separated)"
    )]
    pub github_repo: Vec<String>,

    #[arg(
        long = "github-token",
        env = "GITHUB_TOKEN",
        hide_env_values = true,
        help = "GitHub token used to read comments and post bounty reports"
    )]
    pub github_token: Option<String>,

    #[arg(
        long = "github-api-base",
        env = "BOUNTY_GITHUB_API_BASE",
        default_value = "https://api.github.com",
        help = "GitHub API base URL"
    )]
    pub github_api_base: String,

    #[arg(
        long = "github-bot-login",
        env = "BOUNTY_GITHUB_BOT_LOGIN",
        help = "Login of the bot account; resolved from the token when omitted"
    )]
    pub github_bot_login: Option<String>,

    #[arg(
        long = "allowed-user",
        env = "BOUNTY_ALLOWED_USERS",
        value_delimiter = ',',
        help = "GitHub login allowed to create bounties (repeatable or comma-separated)"
    )]
    pub allowed_user: Vec<String>,

    #[arg(
        long = "marketplace-api-base",
        env = "BOUNTY_MARKETPLACE_API_BASE",
        help = "Bounty marketplace API base URL; tasks are created at <base>/tasks"
    )]
    pub marketplace_api_base: Option<String>,

    #[arg(
        long = "marketplace-api-key",
        env = "BOUNTY_MARKETPLACE_API_KEY",
        hide_env_values = true,
        help = "Optional bearer token for the bounty marketplace API"
    )]
    pub marketplace_api_key: Option<String>,

    #[arg(
        long = "marketplace-web-base",
        env = "BOUNTY_MARKETPLACE_WEB_BASE",
        help = "Public marketplace URL prefix used for task links in reports"
    )]
    pub marketplace_web_base: Option<String>,

    #[arg(
        long = "solana-rpc-url",
        env = "BOUNTY_SOLANA_RPC_URL",
        default_value = "https://api.mainnet-beta.solana.com",
        help = "Solana JSON-RPC endpoint used to submit and confirm transactions"
    )]
    pub solana_rpc_url: String,

    #[arg(
        long = "explorer-base",
        env = "BOUNTY_EXPLORER_BASE",
        default_value = "https://solscan.io/tx",
        help = "Block explorer transaction URL prefix"
    )]
    pub explorer_base: String,

    #[arg(
        long = "explorer-cluster",
        env = "BOUNTY_EXPLORER_CLUSTER",
        help = "Optional cluster query value appended to explorer links (for example devnet)"
    )]
    pub explorer_cluster: Option<String>,

    #[arg(
        long = "wallet-keypair",
        env = "BOUNTY_WALLET_KEYPAIR",
        hide_env_values = true,
        help = "Operator wallet secret as base58 (64-byte keypair or 32-byte secret)"
    )]
    pub wallet_keypair: Option<String>,

    #[arg(
        long = "wallet-keypair-file",
        env = "BOUNTY_WALLET_KEYPAIR_FILE",
        help = "Operator wallet keypair file as a JSON byte array"
    )]
    pub wallet_keypair_file: Option<PathBuf>,

    #[arg(
        long = "poll-interval-seconds",
        env = "BOUNTY_POLL_INTERVAL_SECONDS",
        default_value_t = 30,
        help = "Interval between comment polls"
    )]
    pub poll_interval_seconds: u64,

    #[arg(
        long = "cleanup-interval-seconds",
        env = "BOUNTY_CLEANUP_INTERVAL_SECONDS",
        default_value_t = 86_400,
        help = "Interval between processed-comment registry purges"
    )]
    pub cleanup_interval_seconds: u64,

    #[arg(
        long = "retention-hours",
        env = "BOUNTY_RETENTION_HOURS",
        default_value_t = 24,
        help = "How long processed comment ids are remembered"
    )]
    pub retention_hours: u64,

    #[arg(
        long = "comment-lookback-minutes",
        env = "BOUNTY_COMMENT_LOOKBACK_MINUTES",
        default_value_t = 60,
        help = "Only comments created within this window are considered"
    )]
    pub comment_lookback_minutes: u64,

    #[arg(
        long = "poll-once",
        env = "BOUNTY_POLL_ONCE",
        default_value_t = false,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        help = "Run a single poll cycle and exit"
    )]
    pub poll_once: bool,

    #[arg(
        long = "request-timeout-ms",
        env = "BOUNTY_REQUEST_TIMEOUT_MS",
        default_value_t = 30_000,
        help = "HTTP request timeout for GitHub, marketplace and RPC calls"
    )]
    pub request_timeout_ms: u64,

    #[arg(
        long = "retry-max-attempts",
        env = "BOUNTY_RETRY_MAX_ATTEMPTS",
        default_value_t = 4,
        help = "Maximum attempts for retryable GitHub and marketplace requests"
    )]
    pub retry_max_attempts: usize,

    #[arg(
        long = "retry-base-delay-ms",
        env = "BOUNTY_RETRY_BASE_DELAY_MS",
        default_value_t = 500,
        help = "Base backoff delay between retries"
    )]
    pub retry_base_delay_ms: u64,

    #[arg(
        long = "submit-max-retries",
        env = "BOUNTY_SUBMIT_MAX_RETRIES",
        default_value_t = 5,
        help = "Node-level rebroadcast budget passed to sendTransaction"
    )]
    pub submit_max_retries: usize,

    #[arg(
        long = "confirm-timeout-seconds",
        env = "BOUNTY_CONFIRM_TIMEOUT_SECONDS",
        default_value_t = 60,
        help = "Time to wait for confirmation before falling back to status checks"
    )]
    pub confirm_timeout_seconds: u64,

    #[arg(
        long = "confirm-poll-interval-ms",
        env = "BOUNTY_CONFIRM_POLL_INTERVAL_MS",
        default_value_t = 500,
        help = "Delay between signature status polls while confirming"
    )]
    pub confirm_poll_interval_ms: u64,

    #[arg(
        long = "fallback-settle-ms",
        env = "BOUNTY_FALLBACK_SETTLE_MS",
        default_value_t = 2_000,
        help = "Delay before the first fallback status check"
    )]
    pub fallback_settle_ms: u64,

    #[arg(
        long = "fallback-retries",
        env = "BOUNTY_FALLBACK_RETRIES",
        default_value_t = 3,
        help = "Extra fallback status checks after an expired blockhash"
    )]
    pub fallback_retries: usize,

    #[arg(
        long = "fallback-retry-delay-ms",
        env = "BOUNTY_FALLBACK_RETRY_DELAY_MS",
        default_value_t = 5_000,
        help = "Delay between extra fallback status checks"
    )]
    pub fallback_retry_delay_ms: u64,
}
