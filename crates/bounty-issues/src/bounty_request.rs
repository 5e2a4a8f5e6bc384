//! Marketplace task payload built from a command and its issue context.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::bounty_command::BountyCommand;
use crate::issue_event_collection::{GithubIssue, GithubRepository};

pub const BOUNTY_REQUIREMENTS: &str =
    "Submit a pull request that resolves the linked GitHub issue.";
pub const UNKNOWN_LANGUAGE_TAG: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketplaceTaskRequest {
    pub title: String,
    pub content: String,
    pub requirements: String,
    pub tags: Vec<String>,
    pub token: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub payer: String,
    pub is_private: bool,
}

pub fn language_tag(repository: &GithubRepository) -> String {
    repository
        .language
        .as_deref()
        .map(str::trim)
        .filter(|language| !language.is_empty())
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| UNKNOWN_LANGUAGE_TAG.to_string())
}

pub fn build_bounty_request(
    command: &BountyCommand,
    issue: &GithubIssue,
    repository: &GithubRepository,
    payer: &str,
) -> MarketplaceTaskRequest {
    MarketplaceTaskRequest {
        title: issue.title.trim().to_string(),
        content: issue.body.as_deref().unwrap_or_default().to_string(),
        requirements: BOUNTY_REQUIREMENTS.to_string(),
        tags: vec![language_tag(repository)],
        token: command.token_address.clone(),
        amount: command.amount,
        payer: payer.to_string(),
        is_private: true,
    }
}
