//! Shared helpers for the bounty bot runtime.
//! This crate provides the command grammar, the processed-comment registry,
//! marketplace payload building, GitHub wire types, request replay rules,
//! and issue-comment rendering consumed by the runtime crate.

pub mod bounty_command;
pub mod bounty_request;
pub mod comment_registry;
pub mod issue_comment;
pub mod issue_event_collection;
pub mod request_retry;
pub mod token_labels;
