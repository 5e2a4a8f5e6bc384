//! Operator signing key loading.

use std::fmt;
use std::path::Path;

use anyhow::{bail, Context, Result};
use ed25519_dalek::SigningKey;

use crate::network::{SignError, SignedTransaction};
use crate::solana_wire::sign_serialized_transaction;

/// The operator's ed25519 keypair. Debug output never includes secret bytes.
pub struct OperatorWallet {
    signing_key: SigningKey,
}

impl fmt::Debug for OperatorWallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorWallet")
            .field("pubkey", &self.pubkey_base58())
            .finish_non_exhaustive()
    }
}

impl OperatorWallet {
    pub fn from_signing_key(signing_key: SigningKey) -> Self {
        Self { signing_key }
    }

    /// Accepts a base58 64-byte keypair (secret then public) or a 32-byte secret.
    pub fn from_base58(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            bail!("wallet keypair cannot be empty");
        }
        let bytes = bs58::decode(trimmed)
            .into_vec()
            .context("wallet keypair is not valid base58")?;
        Self::from_key_bytes(&bytes)
    }

    /// Accepts the JSON byte-array keypair format written by the Solana CLI.
    pub fn from_json_bytes(raw: &str) -> Result<Self> {
        let bytes: Vec<u8> =
            serde_json::from_str(raw.trim()).context("wallet keypair file is not a JSON byte array")?;
        Self::from_key_bytes(&bytes)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read wallet keypair {}", path.display()))?;
        Self::from_json_bytes(&raw)
            .with_context(|| format!("failed to load wallet keypair {}", path.display()))
    }

    fn from_key_bytes(bytes: &[u8]) -> Result<Self> {
        let signing_key = match bytes.len() {
            64 => {
                let mut keypair = [0_u8; 64];
                keypair.copy_from_slice(bytes);
                SigningKey::from_keypair_bytes(&keypair)
                    .context("wallet keypair public half does not match its secret")?
            }
            32 => {
                let mut secret = [0_u8; 32];
                secret.copy_from_slice(bytes);
                SigningKey::from_bytes(&secret)
            }
            other => bail!("wallet keypair must be 64 or 32 bytes, got {other}"),
        };
        Ok(Self { signing_key })
    }

    pub fn pubkey_bytes(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    pub fn pubkey_base58(&self) -> String {
        bs58::encode(self.pubkey_bytes()).into_string()
    }

    pub fn sign_transaction(
        &self,
        serialized_transaction: &str,
    ) -> Result<SignedTransaction, SignError> {
        sign_serialized_transaction(serialized_transaction, &self.signing_key)
    }
}
