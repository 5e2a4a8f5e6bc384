//! Polling runtime for the issue-comment bounty bot.
//!
//! [`BountyBotRuntime`] lists recent issue comments, filters `/bounty`
//! commands through the processed-comment registry and the allow-list,
//! funds authorized bounties through the marketplace and the transaction
//! pipeline, and posts exactly one outcome comment per command.

mod bounty_runtime;

pub use bounty_runtime::{
    run_bounty_bot, BountyBotRuntime, BountyBotRuntimeConfig, PollCycleReport, RepoRef,
};
