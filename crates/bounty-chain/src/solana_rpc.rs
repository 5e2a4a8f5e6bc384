//! Solana JSON-RPC implementation of [`BountyNetwork`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::network::{
    BountyNetwork, ConfirmationError, ConfirmationLevel, NetworkError, SignError,
    SignatureStatus, SignedTransaction,
};
use crate::wallet::OperatorWallet;

const DEFAULT_CONFIRM_POLL_INTERVAL: Duration = Duration::from_millis(500);
const ERROR_BODY_LIMIT: usize = 400;

#[derive(Debug, Deserialize)]
struct RpcEnvelope<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcContextValue<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcSignatureStatus {
    #[serde(default)]
    confirmation_status: Option<String>,
    #[serde(default)]
    err: Option<Value>,
}

pub struct SolanaRpcNetwork {
    http: reqwest::Client,
    rpc_url: String,
    wallet: OperatorWallet,
    confirm_poll_interval: Duration,
    next_request_id: AtomicU64,
}

impl SolanaRpcNetwork {
    pub fn new(rpc_url: String, wallet: OperatorWallet, request_timeout_ms: u64) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(request_timeout_ms.max(1)))
            .build()
            .context("failed to create solana rpc client")?;
        Ok(Self {
            http,
            rpc_url: rpc_url.trim().to_string(),
            wallet,
            confirm_poll_interval: DEFAULT_CONFIRM_POLL_INTERVAL,
            next_request_id: AtomicU64::new(1),
        })
    }

    pub fn with_confirm_poll_interval(mut self, interval: Duration) -> Self {
        self.confirm_poll_interval = interval.max(Duration::from_millis(1));
        self
    }

    pub fn operator_pubkey(&self) -> String {
        self.wallet.pubkey_base58()
    }

    async fn rpc_call<T>(&self, method: &str, params: Value) -> Result<T, NetworkError>
    where
        T: DeserializeOwned,
    {
        let id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        let response = self
            .http
            .post(&self.rpc_url)
            .json(&payload)
            .send()
            .await
            .map_err(|error| NetworkError::Transport(format!("{method}: {error}")))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| NetworkError::Transport(format!("{method}: {error}")))?;
        if !status.is_success() {
            let snippet: String = body.chars().take(ERROR_BODY_LIMIT).collect();
            return Err(NetworkError::Transport(format!(
                "{method} returned http status {}: {snippet}",
                status.as_u16()
            )));
        }
        let envelope: RpcEnvelope<T> = serde_json::from_str(&body)
            .map_err(|error| NetworkError::InvalidResponse(format!("{method}: {error}")))?;
        if let Some(error) = envelope.error {
            return Err(NetworkError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        envelope
            .result
            .ok_or_else(|| NetworkError::InvalidResponse(format!("{method}: missing result")))
    }

    async fn is_blockhash_valid(&self, blockhash: &str) -> Result<bool, NetworkError> {
        let valid: RpcContextValue<bool> = self
            .rpc_call(
                "isBlockhashValid",
                json!([blockhash, { "commitment": "confirmed" }]),
            )
            .await?;
        Ok(valid.value)
    }
}

/// `Some(result)` once the status settles the confirmation either way.
fn settled(status: Option<&SignatureStatus>) -> Option<Result<ConfirmationLevel, ConfirmationError>> {
    let status = status?;
    if let Some(error) = &status.error {
        return Some(Err(ConfirmationError::TransactionFailed(error.clone())));
    }
    status.confirmed_level().map(Ok)
}

#[async_trait]
impl BountyNetwork for SolanaRpcNetwork {
    fn sign(&self, serialized_transaction: &str) -> Result<SignedTransaction, SignError> {
        self.wallet.sign_transaction(serialized_transaction)
    }

    async fn submit(
        &self,
        transaction: &SignedTransaction,
        max_retries: usize,
    ) -> Result<String, NetworkError> {
        self.rpc_call(
            "sendTransaction",
            json!([
                transaction.wire_base64,
                {
                    "encoding": "base64",
                    "maxRetries": max_retries,
                    "preflightCommitment": "confirmed",
                }
            ]),
        )
        .await
    }

    async fn confirm(
        &self,
        transaction: &SignedTransaction,
    ) -> Result<ConfirmationLevel, ConfirmationError> {
        loop {
            let status = self.signature_status(&transaction.signature).await?;
            if let Some(result) = settled(status.as_ref()) {
                return result;
            }
            if !self.is_blockhash_valid(&transaction.recent_blockhash).await? {
                // The transaction may have landed in the final valid block.
                let status = self.signature_status(&transaction.signature).await?;
                return settled(status.as_ref())
                    .unwrap_or(Err(ConfirmationError::BlockHeightExceeded));
            }
            tracing::debug!(
                signature = %transaction.signature,
                level = status
                    .as_ref()
                    .and_then(|status| status.level)
                    .map(ConfirmationLevel::as_str)
                    .unwrap_or("unknown"),
                "waiting for confirmation"
            );
            tokio::time::sleep(self.confirm_poll_interval).await;
        }
    }

    async fn signature_status(
        &self,
        signature: &str,
    ) -> Result<Option<SignatureStatus>, NetworkError> {
        let statuses: RpcContextValue<Vec<Option<RpcSignatureStatus>>> = self
            .rpc_call(
                "getSignatureStatuses",
                json!([[signature], { "searchTransactionHistory": true }]),
            )
            .await?;
        let Some(entry) = statuses.value.into_iter().next() else {
            return Err(NetworkError::InvalidResponse(
                "getSignatureStatuses: empty value list".to_string(),
            ));
        };
        Ok(entry.map(|status| SignatureStatus {
            level: status
                .confirmation_status
                .as_deref()
                .and_then(ConfirmationLevel::parse),
            error: status
                .err
                .filter(|error| !error.is_null())
                .map(|error| error.to_string()),
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use ed25519_dalek::SigningKey;
    use httpmock::prelude::*;
    use serde_json::json;

    use super::SolanaRpcNetwork;
    use crate::network::{
        BountyNetwork, ConfirmationError, ConfirmationLevel, NetworkError, SignedTransaction,
    };
    use crate::wallet::OperatorWallet;

    fn network(server: &MockServer) -> SolanaRpcNetwork {
        let wallet = OperatorWallet::from_signing_key(SigningKey::from_bytes(&[4_u8; 32]));
        SolanaRpcNetwork::new(server.url("/"), wallet, 2_000)
            .expect("network")
            .with_confirm_poll_interval(Duration::from_millis(5))
    }

    fn transaction() -> SignedTransaction {
        SignedTransaction {
            signature: "5sig".to_string(),
            recent_blockhash: "Hash111".to_string(),
            wire_base64: "AQID".to_string(),
        }
    }

    #[tokio::test]
    async fn functional_submit_sends_base64_transaction_with_retry_budget() {
        let server = MockServer::start();
        let send = server.mock(|when, then| {
            when.method(POST)
                .path("/")
                .body_includes("\"method\":\"sendTransaction\"")
                .body_includes("\"AQID\"")
                .body_includes("\"encoding\":\"base64\"")
                .body_includes("\"maxRetries\":5");
            then.status(200)
                .json_body(json!({"jsonrpc": "2.0", "id": 1, "result": "5sig"}));
        });

        let signature = network(&server)
            .submit(&transaction(), 5)
            .await
            .expect("submit");
        assert_eq!(signature, "5sig");
        send.assert_calls(1);
    }

    #[tokio::test]
    async fn functional_submit_maps_rpc_error_envelope() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/");
            then.status(200).json_body(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": {"code": -32002, "message": "Transaction simulation failed"}
            }));
        });

        let error = network(&server)
            .submit(&transaction(), 5)
            .await
            .expect_err("rpc error");
        assert_eq!(
            error,
            NetworkError::Rpc {
                code: -32002,
                message: "Transaction simulation failed".to_string()
            }
        );
    }

    #[tokio::test]
    async fn functional_signature_status_parses_level_and_on_chain_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST)
                .path("/")
                .body_includes("\"method\":\"getSignatureStatuses\"")
                .body_includes("\"searchTransactionHistory\":true");
            then.status(200).json_body(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": {
                    "context": {"slot": 10},
                    "value": [{
                        "slot": 9,
                        "confirmations": null,
                        "confirmationStatus": "finalized",
                        "err": {"InstructionError": [0, {"Custom": 1}]}
                    }]
                }
            }));
        });

        let status = network(&server)
            .signature_status("5sig")
            .await
            .expect("status")
            .expect("known signature");
        assert_eq!(status.level, Some(ConfirmationLevel::Finalized));
        assert!(status
            .error
            .as_deref()
            .is_some_and(|error| error.contains("InstructionError")));
    }

    #[tokio::test]
    async fn integration_confirm_returns_once_status_reaches_confirmed() {
        let server = MockServer::start();
        let status = server.mock(|when, then| {
            when.method(POST)
                .path("/")
                .body_includes("\"method\":\"getSignatureStatuses\"");
            then.status(200).json_body(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": {
                    "context": {"slot": 10},
                    "value": [{"confirmationStatus": "confirmed", "err": null}]
                }
            }));
        });

        let level = network(&server)
            .confirm(&transaction())
            .await
            .expect("confirmed");
        assert_eq!(level, ConfirmationLevel::Confirmed);
        status.assert_calls(1);
    }

    #[tokio::test]
    async fn regression_confirm_reports_block_height_exceeded_when_blockhash_expires() {
        let server = MockServer::start();
        let status = server.mock(|when, then| {
            when.method(POST)
                .path("/")
                .body_includes("\"method\":\"getSignatureStatuses\"");
            then.status(200).json_body(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": {"context": {"slot": 10}, "value": [null]}
            }));
        });
        let blockhash = server.mock(|when, then| {
            when.method(POST)
                .path("/")
                .body_includes("\"method\":\"isBlockhashValid\"")
                .body_includes("\"Hash111\"");
            then.status(200).json_body(json!({
                "jsonrpc": "2.0",
                "id": 2,
                "result": {"context": {"slot": 10}, "value": false}
            }));
        });

        let error = network(&server)
            .confirm(&transaction())
            .await
            .expect_err("expired");
        assert_eq!(error, ConfirmationError::BlockHeightExceeded);
        status.assert_calls(2);
        blockhash.assert_calls(1);
    }

    #[tokio::test]
    async fn regression_confirm_surfaces_http_failures_as_transport_errors() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/");
            then.status(503).body("upstream unavailable");
        });

        let error = network(&server)
            .confirm(&transaction())
            .await
            .expect_err("transport");
        assert!(matches!(
            error,
            ConfirmationError::Network(NetworkError::Transport(message))
                if message.contains("503")
        ));
    }
}
