//! Issue-comment bodies for bounty outcomes and their event-key footers.

use rust_decimal::Decimal;

use crate::request_retry::clip_error_text;
use crate::token_labels::token_label;

pub const EVENT_KEY_MARKER_PREFIX: &str = "<!-- bounty-event-key:";
pub const EVENT_KEY_MARKER_SUFFIX: &str = " -->";
const COMMENT_EVENT_KEY_PREFIX: &str = "comment:";
const ERROR_MESSAGE_MAX_CHARS: usize = 600;

pub fn comment_event_key(comment_id: u64) -> String {
    format!("{COMMENT_EVENT_KEY_PREFIX}{comment_id}")
}

pub fn marketplace_task_url(marketplace_web_base: &str, task_id: &str) -> String {
    format!(
        "{}/{}",
        marketplace_web_base.trim_end_matches('/'),
        task_id.trim()
    )
}

pub fn explorer_transaction_url(
    explorer_base: &str,
    cluster: Option<&str>,
    signature: &str,
) -> String {
    let mut url = format!("{}/{}", explorer_base.trim_end_matches('/'), signature);
    if let Some(cluster) = cluster.map(str::trim).filter(|cluster| !cluster.is_empty()) {
        url.push_str("?cluster=");
        url.push_str(cluster);
    }
    url
}

#[derive(Debug, Clone, Copy)]
pub struct BountyLinks<'a> {
    pub marketplace_web_base: &'a str,
    pub explorer_base: &'a str,
    pub explorer_cluster: Option<&'a str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BountyOutcomeView<'a> {
    Success {
        signature: &'a str,
    },
    Pending {
        signature: &'a str,
    },
    Failure {
        signature: Option<&'a str>,
        error: &'a str,
    },
}

impl BountyOutcomeView<'_> {
    pub fn status(&self) -> &'static str {
        match self {
            Self::Success { .. } => "succeeded",
            Self::Pending { .. } => "pending",
            Self::Failure { .. } => "failed",
        }
    }

    pub fn signature(&self) -> Option<&str> {
        match self {
            Self::Success { signature } | Self::Pending { signature } => Some(signature),
            Self::Failure { signature, .. } => *signature,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BountyCommentView<'a> {
    pub comment_id: u64,
    pub requester_login: &'a str,
    pub amount: Decimal,
    pub token_address: &'a str,
    pub task_id: Option<&'a str>,
    pub outcome: BountyOutcomeView<'a>,
}

fn render_footer(comment_id: u64, status: &str, reason_code: &str) -> String {
    format!(
        "---\n{EVENT_KEY_MARKER_PREFIX}{}{EVENT_KEY_MARKER_SUFFIX}\n_bounty status `{status}` | reason_code `{reason_code}`_",
        comment_event_key(comment_id)
    )
}

pub fn render_bounty_outcome_comment(view: BountyCommentView<'_>, links: BountyLinks<'_>) -> String {
    let amount_label = format!("{} {}", view.amount, token_label(view.token_address));
    let mut lines = Vec::new();
    let reason_code = match view.outcome {
        BountyOutcomeView::Success { .. } => {
            lines.push(format!(
                "Bounty of **{amount_label}** created for this issue at the request of @{}.",
                view.requester_login
            ));
            "bounty_funded"
        }
        BountyOutcomeView::Pending { .. } => {
            lines.push(format!(
                "Bounty of **{amount_label}** submitted for this issue at the request of @{}, but the funding transaction could not be confirmed yet. It may still land; check the transaction link below before retrying.",
                view.requester_login
            ));
            "bounty_confirmation_pending"
        }
        BountyOutcomeView::Failure { error, .. } => {
            lines.push(format!(
                "Failed to create a bounty of **{amount_label}** for this issue."
            ));
            lines.push(String::new());
            lines.push(format!(
                "Error: `{}`",
                clip_error_text(error.trim(), ERROR_MESSAGE_MAX_CHARS)
            ));
            "bounty_failed"
        }
    };

    let mut details = Vec::new();
    if let Some(task_id) = view.task_id {
        details.push(format!(
            "- Marketplace listing (private, link-only): {}",
            marketplace_task_url(links.marketplace_web_base, task_id)
        ));
    }
    if let Some(signature) = view.outcome.signature() {
        details.push(format!(
            "- Transaction `{signature}`: {}",
            explorer_transaction_url(links.explorer_base, links.explorer_cluster, signature)
        ));
    }
    if !details.is_empty() {
        lines.push(String::new());
        lines.extend(details);
    }
    if matches!(view.outcome, BountyOutcomeView::Failure { .. })
        && (view.task_id.is_some() || view.outcome.signature().is_some())
    {
        lines.push(String::new());
        lines.push(
            "An operator can reconcile this bounty manually using the details above.".to_string(),
        );
    }

    format!(
        "{}\n\n{}",
        lines.join("\n"),
        render_footer(view.comment_id, view.outcome.status(), reason_code)
    )
}

pub fn render_unauthorized_comment(
    comment_id: u64,
    requester_login: &str,
    amount: Decimal,
    token_address: &str,
) -> String {
    format!(
        "@{requester_login} is not authorized to create bounties, so the request for **{amount} {}** was ignored. No transaction was submitted.\n\n{}",
        token_label(token_address),
        render_footer(comment_id, "denied", "bounty_requester_not_authorized")
    )
}

/// Collect event keys from marker footers in a previously posted comment.
pub fn extract_footer_event_keys(text: &str) -> Vec<String> {
    let mut keys = Vec::new();
    let mut cursor = text;
    while let Some(start) = cursor.find(EVENT_KEY_MARKER_PREFIX) {
        let after_start = &cursor[start + EVENT_KEY_MARKER_PREFIX.len()..];
        let Some(end) = after_start.find(EVENT_KEY_MARKER_SUFFIX) else {
            break;
        };
        let key = after_start[..end].trim();
        if !key.is_empty() {
            keys.push(key.to_string());
        }
        cursor = &after_start[end + EVENT_KEY_MARKER_SUFFIX.len()..];
    }
    keys
}

pub fn extract_footer_comment_ids(text: &str) -> Vec<u64> {
    extract_footer_event_keys(text)
        .iter()
        .filter_map(|key| key.strip_prefix(COMMENT_EVENT_KEY_PREFIX))
        .filter_map(|id| id.parse::<u64>().ok())
        .collect()
}
