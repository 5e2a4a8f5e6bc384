//! `/bounty <amount> <token>` grammar and requester authorization.

use std::collections::HashSet;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::Decimal;

pub const BOUNTY_COMMAND_PREFIX: &str = "/bounty";
const BOUNTY_COMMAND_PATTERN: &str =
    r"/bounty\s+(\d+(?:\.\d+)?)\s+([A-Za-z0-9]{32,44})(?:$|[^A-Za-z0-9])";

#[derive(Debug, Clone, PartialEq, Eq)]
/// A bounty request extracted from a comment.
pub struct BountyCommand {
    pub amount: Decimal,
    pub token_address: String,
    pub issue_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Outcome of matching one comment against the grammar and the allow-list.
pub enum BountyCommentAction {
    NotCommand,
    Unauthorized(BountyCommand),
    Authorized(BountyCommand),
}

#[derive(Debug, Clone, Default)]
/// Static set of GitHub logins allowed to create bounties.
///
/// Logins compare case-insensitively. An empty list authorizes nobody.
pub struct BountyAllowList {
    logins: HashSet<String>,
}

impl BountyAllowList {
    pub fn new<'a>(logins: impl IntoIterator<Item = &'a str>) -> Self {
        let logins = logins
            .into_iter()
            .map(normalize_login)
            .filter(|login| !login.is_empty())
            .collect::<HashSet<_>>();
        Self { logins }
    }

    pub fn is_authorized(&self, login: &str) -> bool {
        let login = normalize_login(login);
        !login.is_empty() && self.logins.contains(&login)
    }

    pub fn is_empty(&self) -> bool {
        self.logins.is_empty()
    }

    pub fn len(&self) -> usize {
        self.logins.len()
    }
}

fn normalize_login(raw: &str) -> String {
    raw.trim().trim_start_matches('@').to_ascii_lowercase()
}

fn bounty_command_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(BOUNTY_COMMAND_PATTERN).expect("bounty command pattern must compile")
    })
}

/// Syntactic match only; the first well-formed command in the body wins.
pub fn match_bounty_command(body: &str, issue_url: &str) -> Option<BountyCommand> {
    bounty_command_regex()
        .captures_iter(body)
        .find_map(|captures| {
            let amount = Decimal::from_str(captures.get(1)?.as_str()).ok()?;
            if amount <= Decimal::ZERO {
                return None;
            }
            Some(BountyCommand {
                amount,
                token_address: captures.get(2)?.as_str().to_string(),
                issue_url: issue_url.to_string(),
            })
        })
}

/// Classify a comment so callers can tell "not a command" from "not allowed".
pub fn evaluate_bounty_comment(
    body: &str,
    requester_login: &str,
    issue_url: &str,
    allow_list: &BountyAllowList,
) -> BountyCommentAction {
    match match_bounty_command(body, issue_url) {
        None => BountyCommentAction::NotCommand,
        Some(command) if allow_list.is_authorized(requester_login) => {
            BountyCommentAction::Authorized(command)
        }
        Some(command) => BountyCommentAction::Unauthorized(command),
    }
}

/// Returns the command only when it is well-formed and the requester is allowed.
pub fn parse_bounty_command(
    body: &str,
    requester_login: &str,
    issue_url: &str,
    allow_list: &BountyAllowList,
) -> Option<BountyCommand> {
    match evaluate_bounty_comment(body, requester_login, issue_url, allow_list) {
        BountyCommentAction::Authorized(command) => Some(command),
        BountyCommentAction::NotCommand | BountyCommentAction::Unauthorized(_) => None,
    }
}
