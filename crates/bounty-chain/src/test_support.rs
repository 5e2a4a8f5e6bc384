//! Scripted in-memory [`BountyNetwork`] for pipeline and runtime tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::network::{
    BountyNetwork, ConfirmationError, ConfirmationLevel, NetworkError, SignError,
    SignatureStatus, SignedTransaction,
};

#[derive(Debug, Clone)]
pub enum ConfirmScript {
    Respond(Result<ConfirmationLevel, ConfirmationError>),
    /// Never resolves, so the caller's timeout fires.
    Hang,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptedCalls {
    pub sign: usize,
    pub submit: usize,
    pub confirm: usize,
    pub status: usize,
    pub signed_blobs: Vec<String>,
    pub submit_max_retries: Vec<usize>,
}

/// Each queue is consumed front to back; once empty, calls fall back to a
/// happy path: sign yields `sig-<blob>`, submit echoes it, confirm reports
/// `confirmed`, and status lookups find nothing.
#[derive(Debug, Default)]
pub struct ScriptedNetwork {
    sign_results: Mutex<VecDeque<Result<SignedTransaction, SignError>>>,
    submit_results: Mutex<VecDeque<Result<String, NetworkError>>>,
    confirm_results: Mutex<VecDeque<ConfirmScript>>,
    status_results: Mutex<VecDeque<Result<Option<SignatureStatus>, NetworkError>>>,
    calls: Mutex<ScriptedCalls>,
}

impl ScriptedNetwork {
    pub fn with_sign(self, result: Result<SignedTransaction, SignError>) -> Self {
        self.sign_results
            .lock()
            .expect("sign script lock")
            .push_back(result);
        self
    }

    pub fn with_submit(self, result: Result<String, NetworkError>) -> Self {
        self.submit_results
            .lock()
            .expect("submit script lock")
            .push_back(result);
        self
    }

    pub fn with_confirm(self, script: ConfirmScript) -> Self {
        self.confirm_results
            .lock()
            .expect("confirm script lock")
            .push_back(script);
        self
    }

    pub fn with_status(self, result: Result<Option<SignatureStatus>, NetworkError>) -> Self {
        self.status_results
            .lock()
            .expect("status script lock")
            .push_back(result);
        self
    }

    pub fn calls(&self) -> ScriptedCalls {
        self.calls.lock().expect("calls lock").clone()
    }
}

pub fn scripted_signed_transaction(serialized_transaction: &str) -> SignedTransaction {
    SignedTransaction {
        signature: format!("sig-{serialized_transaction}"),
        recent_blockhash: "ScriptedBlockhash1111111111111111111111111".to_string(),
        wire_base64: serialized_transaction.to_string(),
    }
}

#[async_trait]
impl BountyNetwork for ScriptedNetwork {
    fn sign(&self, serialized_transaction: &str) -> Result<SignedTransaction, SignError> {
        {
            let mut calls = self.calls.lock().expect("calls lock");
            calls.sign += 1;
            calls.signed_blobs.push(serialized_transaction.to_string());
        }
        self.sign_results
            .lock()
            .expect("sign script lock")
            .pop_front()
            .unwrap_or_else(|| Ok(scripted_signed_transaction(serialized_transaction)))
    }

    async fn submit(
        &self,
        transaction: &SignedTransaction,
        max_retries: usize,
    ) -> Result<String, NetworkError> {
        {
            let mut calls = self.calls.lock().expect("calls lock");
            calls.submit += 1;
            calls.submit_max_retries.push(max_retries);
        }
        let scripted = self
            .submit_results
            .lock()
            .expect("submit script lock")
            .pop_front();
        scripted.unwrap_or_else(|| Ok(transaction.signature.clone()))
    }

    async fn confirm(
        &self,
        _transaction: &SignedTransaction,
    ) -> Result<ConfirmationLevel, ConfirmationError> {
        self.calls.lock().expect("calls lock").confirm += 1;
        let scripted = self
            .confirm_results
            .lock()
            .expect("confirm script lock")
            .pop_front();
        match scripted {
            Some(ConfirmScript::Respond(result)) => result,
            Some(ConfirmScript::Hang) => std::future::pending().await,
            None => Ok(ConfirmationLevel::Confirmed),
        }
    }

    async fn signature_status(
        &self,
        _signature: &str,
    ) -> Result<Option<SignatureStatus>, NetworkError> {
        self.calls.lock().expect("calls lock").status += 1;
        let scripted = self
            .status_results
            .lock()
            .expect("status script lock")
            .pop_front();
        scripted.unwrap_or(Ok(None))
    }
}
