use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GithubUser {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
/// Issue comment as returned by the repository-wide comment listing.
pub struct GithubIssueComment {
    pub id: u64,
    pub body: Option<String>,
    pub user: GithubUser,
    pub issue_url: String,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GithubIssue {
    pub number: u64,
    pub title: String,
    pub body: Option<String>,
    pub repository_url: String,
    #[serde(default)]
    pub html_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GithubRepository {
    #[serde(default)]
    pub full_name: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A non-empty comment written by someone other than the bot.
pub struct BountyCandidateComment {
    pub comment_id: u64,
    pub issue_url: String,
    pub issue_number: u64,
    pub author_login: String,
    pub body: String,
    pub created_at: String,
}

/// Extract the trailing issue number from a GitHub API issue url.
pub fn issue_number_from_url(issue_url: &str) -> Option<u64> {
    let trimmed = issue_url.trim().trim_end_matches('/');
    let (prefix, number) = trimmed.rsplit_once('/')?;
    if !prefix.ends_with("/issues") {
        return None;
    }
    number.parse::<u64>().ok().filter(|number| *number > 0)
}

/// Filter raw comments down to command candidates, oldest first.
/// Duplicate ids are kept; the processed-comment registry de-duplicates.
pub fn collect_candidate_comments(
    comments: &[GithubIssueComment],
    bot_login: &str,
) -> Vec<BountyCandidateComment> {
    let mut candidates = comments
        .iter()
        .filter(|comment| !comment.user.login.eq_ignore_ascii_case(bot_login))
        .filter_map(|comment| {
            let body = comment.body.as_deref().unwrap_or_default().trim();
            if body.is_empty() {
                return None;
            }
            let issue_number = issue_number_from_url(&comment.issue_url)?;
            Some(BountyCandidateComment {
                comment_id: comment.id,
                issue_url: comment.issue_url.clone(),
                issue_number,
                author_login: comment.user.login.clone(),
                body: body.to_string(),
                created_at: comment.created_at.clone(),
            })
        })
        .collect::<Vec<_>>();
    candidates.sort_by(|left, right| {
        left.created_at
            .cmp(&right.created_at)
            .then(left.comment_id.cmp(&right.comment_id))
    });
    candidates
}
