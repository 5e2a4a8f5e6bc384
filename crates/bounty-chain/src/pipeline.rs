//! Sign → submit → confirm state machine with fallback status verification.
//!
//! A submitted transaction can land even when the confirmation call errors
//! or times out, so neither outcome is treated as failure on its own: the
//! pipeline falls back to querying the signature status directly and only
//! reports success once the network confirms it. When verification cannot
//! settle the question the result is [`PipelineOutcome::AmbiguousSuccess`],
//! which still carries the signature.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::network::{
    BountyNetwork, ConfirmationError, ConfirmationLevel, NetworkError, SignError,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationPolicy {
    /// Node-level rebroadcast budget passed to `sendTransaction`.
    pub submit_max_retries: usize,
    pub confirm_timeout: Duration,
    pub fallback_settle_delay: Duration,
    /// Extra status checks after the first one, only for expired blockhashes.
    pub fallback_retries: usize,
    pub fallback_retry_delay: Duration,
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            submit_max_retries: 5,
            confirm_timeout: Duration::from_secs(60),
            fallback_settle_delay: Duration::from_secs(2),
            fallback_retries: 3,
            fallback_retry_delay: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationState {
    Signed,
    Submitted,
    ConfirmationPending,
    Confirmed,
    ConfirmationAmbiguous,
    Resolved,
}

impl ConfirmationState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Signed => "signed",
            Self::Submitted => "submitted",
            Self::ConfirmationPending => "confirmation_pending",
            Self::Confirmed => "confirmed",
            Self::ConfirmationAmbiguous => "confirmation_ambiguous",
            Self::Resolved => "resolved",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionAttempt {
    pub signature: Option<String>,
    pub state: ConfirmationState,
    /// Fallback status checks performed after the primary confirmation.
    pub retry_count: usize,
}

impl TransactionAttempt {
    fn new() -> Self {
        Self {
            signature: None,
            state: ConfirmationState::Signed,
            retry_count: 0,
        }
    }

    fn transition(&mut self, next: ConfirmationState) {
        tracing::debug!(
            from = self.state.as_str(),
            to = next.as_str(),
            signature = self.signature.as_deref().unwrap_or("none"),
            "bounty transaction state transition"
        );
        self.state = next;
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("failed to sign transaction: {0}")]
    Sign(#[from] SignError),
    #[error("failed to submit transaction: {0}")]
    Submit(NetworkError),
    #[error("transaction was rejected on chain: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    Success {
        signature: String,
        level: ConfirmationLevel,
    },
    AmbiguousSuccess {
        signature: String,
        reason: String,
    },
    Failure {
        signature: Option<String>,
        error: PipelineError,
    },
}

impl PipelineOutcome {
    pub fn signature(&self) -> Option<&str> {
        match self {
            Self::Success { signature, .. } | Self::AmbiguousSuccess { signature, .. } => {
                Some(signature)
            }
            Self::Failure { signature, .. } => signature.as_deref(),
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            Self::Success { .. } => "succeeded",
            Self::AmbiguousSuccess { .. } => "pending",
            Self::Failure { .. } => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineResolution {
    pub attempt: TransactionAttempt,
    pub outcome: PipelineOutcome,
}

/// Why the transaction's fate has to be read from its signature status.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ConfirmFallbackTrigger {
    TimedOut(Duration),
    Errored(ConfirmationError),
    /// `sendTransaction` failed in transit; the node may still have it.
    SubmitInterrupted(String),
}

impl ConfirmFallbackTrigger {
    fn extra_checks(&self, policy: &ConfirmationPolicy) -> usize {
        match self {
            Self::Errored(ConfirmationError::BlockHeightExceeded) | Self::SubmitInterrupted(_) => {
                policy.fallback_retries
            }
            _ => 0,
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::TimedOut(timeout) => {
                format!("confirmation timed out after {}s", timeout.as_secs_f64())
            }
            Self::Errored(error) => format!("confirmation failed: {error}"),
            Self::SubmitInterrupted(message) => {
                format!("submission outcome unknown after transport error: {message}")
            }
        }
    }
}

enum StatusCheck {
    Confirmed(ConfirmationLevel),
    Rejected(String),
    Unsettled(String),
}

#[derive(Clone)]
pub struct TransactionPipeline {
    network: Arc<dyn BountyNetwork>,
    policy: ConfirmationPolicy,
}

impl TransactionPipeline {
    pub fn new(network: Arc<dyn BountyNetwork>, policy: ConfirmationPolicy) -> Self {
        Self { network, policy }
    }

    pub fn policy(&self) -> &ConfirmationPolicy {
        &self.policy
    }

    /// Drives one marketplace transaction to a terminal outcome. Never errors:
    /// every failure is folded into [`PipelineOutcome::Failure`].
    pub async fn execute(&self, serialized_transaction: &str) -> PipelineResolution {
        let mut attempt = TransactionAttempt::new();

        let signed = match self.network.sign(serialized_transaction) {
            Ok(signed) => signed,
            Err(error) => {
                tracing::warn!(error = %error, "bounty transaction signing failed");
                return resolve(
                    attempt,
                    PipelineOutcome::Failure {
                        signature: None,
                        error: PipelineError::Sign(error),
                    },
                );
            }
        };

        let signature = match self
            .network
            .submit(&signed, self.policy.submit_max_retries)
            .await
        {
            Ok(signature) => signature,
            Err(NetworkError::Transport(message)) => {
                tracing::warn!(
                    signature = %signed.signature,
                    error = %message,
                    "bounty submission transport error; verifying signature status"
                );
                attempt.signature = Some(signed.signature.clone());
                attempt.transition(ConfirmationState::ConfirmationPending);
                return self
                    .verify_after_confirm_failure(
                        attempt,
                        signed.signature.clone(),
                        ConfirmFallbackTrigger::SubmitInterrupted(message),
                    )
                    .await;
            }
            Err(error) => {
                tracing::warn!(error = %error, "bounty transaction submission rejected");
                return resolve(
                    attempt,
                    PipelineOutcome::Failure {
                        signature: None,
                        error: PipelineError::Submit(error),
                    },
                );
            }
        };
        attempt.signature = Some(signature.clone());
        attempt.transition(ConfirmationState::Submitted);
        tracing::info!(signature = %signature, "bounty transaction submitted");

        attempt.transition(ConfirmationState::ConfirmationPending);
        let trigger = match tokio::time::timeout(
            self.policy.confirm_timeout,
            self.network.confirm(&signed),
        )
        .await
        {
            Ok(Ok(level)) => {
                attempt.transition(ConfirmationState::Confirmed);
                return resolve(attempt, PipelineOutcome::Success { signature, level });
            }
            Ok(Err(ConfirmationError::TransactionFailed(error))) => {
                tracing::warn!(signature = %signature, error = %error, "bounty transaction failed on chain");
                return resolve(
                    attempt,
                    PipelineOutcome::Failure {
                        signature: Some(signature),
                        error: PipelineError::Rejected(error),
                    },
                );
            }
            Ok(Err(error)) => ConfirmFallbackTrigger::Errored(error),
            Err(_) => ConfirmFallbackTrigger::TimedOut(self.policy.confirm_timeout),
        };

        tracing::warn!(
            signature = %signature,
            reason = %trigger.describe(),
            "bounty confirmation inconclusive; verifying signature status"
        );
        self.verify_after_confirm_failure(attempt, signature, trigger)
            .await
    }

    async fn verify_after_confirm_failure(
        &self,
        mut attempt: TransactionAttempt,
        signature: String,
        trigger: ConfirmFallbackTrigger,
    ) -> PipelineResolution {
        let extra_checks = trigger.extra_checks(&self.policy);
        let mut last_observation = String::from("status not yet checked");

        tokio::time::sleep(self.policy.fallback_settle_delay).await;
        for check in 0..=extra_checks {
            if check > 0 {
                tokio::time::sleep(self.policy.fallback_retry_delay).await;
            }
            attempt.retry_count += 1;
            match self.check_status(&signature).await {
                StatusCheck::Confirmed(level) => {
                    tracing::info!(
                        signature = %signature,
                        level = level.as_str(),
                        checks = attempt.retry_count,
                        "bounty transaction confirmed by fallback status check"
                    );
                    attempt.transition(ConfirmationState::Confirmed);
                    return resolve(attempt, PipelineOutcome::Success { signature, level });
                }
                StatusCheck::Rejected(error) => {
                    return resolve(
                        attempt,
                        PipelineOutcome::Failure {
                            signature: Some(signature),
                            error: PipelineError::Rejected(error),
                        },
                    );
                }
                StatusCheck::Unsettled(observation) => last_observation = observation,
            }
        }

        attempt.transition(ConfirmationState::ConfirmationAmbiguous);
        let reason = format!(
            "{}; {} status check(s): {last_observation}",
            trigger.describe(),
            attempt.retry_count
        );
        tracing::warn!(signature = %signature, reason = %reason, "bounty transaction confirmation ambiguous");
        resolve(
            attempt,
            PipelineOutcome::AmbiguousSuccess { signature, reason },
        )
    }

    async fn check_status(&self, signature: &str) -> StatusCheck {
        match self.network.signature_status(signature).await {
            Ok(Some(status)) => {
                if let Some(error) = status.error {
                    return StatusCheck::Rejected(error);
                }
                match status.confirmed_level() {
                    Some(level) => StatusCheck::Confirmed(level),
                    None => StatusCheck::Unsettled(format!(
                        "last seen at {}",
                        status
                            .level
                            .map(ConfirmationLevel::as_str)
                            .unwrap_or("unknown commitment")
                    )),
                }
            }
            Ok(None) => StatusCheck::Unsettled("signature not found".to_string()),
            Err(error) => {
                tracing::warn!(signature = %signature, error = %error, "signature status check failed");
                StatusCheck::Unsettled(format!("status check failed: {error}"))
            }
        }
    }
}

fn resolve(mut attempt: TransactionAttempt, outcome: PipelineOutcome) -> PipelineResolution {
    attempt.transition(ConfirmationState::Resolved);
    PipelineResolution { attempt, outcome }
}
