//! Network collaborator contract and its typed error taxonomy.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
/// Commitment level reported for a signature, weakest first.
pub enum ConfirmationLevel {
    Processed,
    Confirmed,
    Finalized,
}

impl ConfirmationLevel {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "processed" => Some(Self::Processed),
            "confirmed" => Some(Self::Confirmed),
            "finalized" => Some(Self::Finalized),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Processed => "processed",
            Self::Confirmed => "confirmed",
            Self::Finalized => "finalized",
        }
    }

    /// `confirmed` or stronger.
    pub fn is_confirmed(self) -> bool {
        self >= Self::Confirmed
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureStatus {
    pub level: Option<ConfirmationLevel>,
    /// On-chain execution error, if the transaction landed but failed.
    pub error: Option<String>,
}

impl SignatureStatus {
    pub fn confirmed_level(&self) -> Option<ConfirmationLevel> {
        self.level.filter(|level| level.is_confirmed())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A transaction carrying the operator signature, ready for submission.
pub struct SignedTransaction {
    /// Base58 transaction id (first signature).
    pub signature: String,
    /// Base58 blockhash that bounds the transaction's validity.
    pub recent_blockhash: String,
    pub wire_base64: String,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SignError {
    #[error("transaction blob is not valid base64: {0}")]
    Decode(String),
    #[error("malformed transaction: {0}")]
    Malformed(String),
    #[error("operator key {signer} is not a required signer of this transaction")]
    SignerNotRequired { signer: String },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NetworkError {
    #[error("rpc transport error: {0}")]
    Transport(String),
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("invalid rpc response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfirmationError {
    #[error("block height exceeded: the transaction blockhash expired before confirmation")]
    BlockHeightExceeded,
    #[error("transaction failed on chain: {0}")]
    TransactionFailed(String),
    #[error(transparent)]
    Network(#[from] NetworkError),
}

#[async_trait]
/// Operations the transaction pipeline needs from a blockchain network.
pub trait BountyNetwork: Send + Sync {
    /// Applies the operator signature to a base64 wire transaction.
    fn sign(&self, serialized_transaction: &str) -> Result<SignedTransaction, SignError>;

    /// Sends the transaction and returns the signature reported by the node.
    async fn submit(
        &self,
        transaction: &SignedTransaction,
        max_retries: usize,
    ) -> Result<String, NetworkError>;

    /// Waits for `confirmed` or stronger, bounded by the transaction blockhash.
    async fn confirm(
        &self,
        transaction: &SignedTransaction,
    ) -> Result<ConfirmationLevel, ConfirmationError>;

    async fn signature_status(&self, signature: &str)
        -> Result<Option<SignatureStatus>, NetworkError>;
}

#[cfg(test)]
mod tests {
    use super::{ConfirmationError, ConfirmationLevel, NetworkError, SignatureStatus};

    #[test]
    fn unit_confirmation_level_parses_and_orders_commitments() {
        assert_eq!(
            ConfirmationLevel::parse("Finalized"),
            Some(ConfirmationLevel::Finalized)
        );
        assert_eq!(ConfirmationLevel::parse("recent"), None);
        assert!(!ConfirmationLevel::Processed.is_confirmed());
        assert!(ConfirmationLevel::Confirmed.is_confirmed());
        assert!(ConfirmationLevel::Finalized.is_confirmed());
    }

    #[test]
    fn unit_signature_status_only_reports_confirmed_levels() {
        let processed = SignatureStatus {
            level: Some(ConfirmationLevel::Processed),
            error: None,
        };
        let finalized = SignatureStatus {
            level: Some(ConfirmationLevel::Finalized),
            error: None,
        };
        assert_eq!(processed.confirmed_level(), None);
        assert_eq!(
            finalized.confirmed_level(),
            Some(ConfirmationLevel::Finalized)
        );
    }

    #[test]
    fn regression_confirmation_error_wraps_network_errors_transparently() {
        let error = ConfirmationError::from(NetworkError::Rpc {
            code: -32005,
            message: "node is behind".to_string(),
        });
        assert_eq!(error.to_string(), "rpc error -32005: node is behind");
    }
}
