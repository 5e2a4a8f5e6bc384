//! Minimal Solana transaction wire format: enough to locate the message,
//! its required signers and blockhash, and to place one signature.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use ed25519_dalek::{Signer, SigningKey};

use crate::network::{SignError, SignedTransaction};

const SIGNATURE_LEN: usize = 64;
const PUBKEY_LEN: usize = 32;
const BLOCKHASH_LEN: usize = 32;
const VERSION_PREFIX_MASK: u8 = 0x80;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireTransaction {
    signatures: Vec<[u8; SIGNATURE_LEN]>,
    message: Vec<u8>,
    num_required_signatures: usize,
    account_keys: Vec<[u8; PUBKEY_LEN]>,
    recent_blockhash: [u8; BLOCKHASH_LEN],
}

/// Returns `(value, bytes consumed)` for a compact-u16 length prefix.
pub fn decode_compact_u16(bytes: &[u8]) -> Result<(usize, usize), SignError> {
    let mut value = 0_usize;
    for (index, byte) in bytes.iter().take(3).enumerate() {
        let part = usize::from(byte & 0x7f);
        if index == 2 && *byte > 0x03 {
            return Err(SignError::Malformed("compact-u16 overflow".to_string()));
        }
        value |= part << (7 * index);
        if byte & 0x80 == 0 {
            return Ok((value, index + 1));
        }
    }
    Err(SignError::Malformed("truncated compact-u16".to_string()))
}

pub fn encode_compact_u16(mut value: usize, out: &mut Vec<u8>) {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        byte |= 0x80;
        out.push(byte);
    }
}

fn take<'a>(bytes: &'a [u8], offset: usize, len: usize, what: &str) -> Result<&'a [u8], SignError> {
    bytes
        .get(offset..offset.saturating_add(len))
        .ok_or_else(|| SignError::Malformed(format!("truncated {what}")))
}

impl WireTransaction {
    pub fn from_base64(raw: &str) -> Result<Self, SignError> {
        let bytes = BASE64
            .decode(raw.trim())
            .map_err(|error| SignError::Decode(error.to_string()))?;
        Self::parse(&bytes)
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, SignError> {
        let (signature_count, mut offset) = decode_compact_u16(bytes)?;
        let mut signatures = Vec::with_capacity(signature_count);
        for _ in 0..signature_count {
            let raw = take(bytes, offset, SIGNATURE_LEN, "signature")?;
            let mut signature = [0_u8; SIGNATURE_LEN];
            signature.copy_from_slice(raw);
            signatures.push(signature);
            offset += SIGNATURE_LEN;
        }

        let message = bytes
            .get(offset..)
            .filter(|message| !message.is_empty())
            .ok_or_else(|| SignError::Malformed("missing message".to_string()))?
            .to_vec();

        let mut cursor = 0_usize;
        let first = message[0];
        if first & VERSION_PREFIX_MASK != 0 {
            let version = first & !VERSION_PREFIX_MASK;
            if version != 0 {
                return Err(SignError::Malformed(format!(
                    "unsupported message version {version}"
                )));
            }
            cursor += 1;
        }
        let header = take(&message, cursor, 3, "message header")?;
        let num_required_signatures = usize::from(header[0]);
        cursor += 3;

        let (key_count, consumed) = decode_compact_u16(message.get(cursor..).unwrap_or_default())?;
        cursor += consumed;
        let mut account_keys = Vec::with_capacity(key_count);
        for _ in 0..key_count {
            let raw = take(&message, cursor, PUBKEY_LEN, "account key")?;
            let mut key = [0_u8; PUBKEY_LEN];
            key.copy_from_slice(raw);
            account_keys.push(key);
            cursor += PUBKEY_LEN;
        }
        let raw_blockhash = take(&message, cursor, BLOCKHASH_LEN, "recent blockhash")?;
        let mut recent_blockhash = [0_u8; BLOCKHASH_LEN];
        recent_blockhash.copy_from_slice(raw_blockhash);

        if num_required_signatures == 0 {
            return Err(SignError::Malformed(
                "message requires no signatures".to_string(),
            ));
        }
        if num_required_signatures > account_keys.len() {
            return Err(SignError::Malformed(format!(
                "message requires {num_required_signatures} signatures but lists {} account keys",
                account_keys.len()
            )));
        }
        if signatures.len() != num_required_signatures {
            return Err(SignError::Malformed(format!(
                "transaction carries {} signature slots but the message requires {num_required_signatures}",
                signatures.len()
            )));
        }

        Ok(Self {
            signatures,
            message,
            num_required_signatures,
            account_keys,
            recent_blockhash,
        })
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            3 + self.signatures.len() * SIGNATURE_LEN + self.message.len(),
        );
        encode_compact_u16(self.signatures.len(), &mut out);
        for signature in &self.signatures {
            out.extend_from_slice(signature);
        }
        out.extend_from_slice(&self.message);
        out
    }

    pub fn message_bytes(&self) -> &[u8] {
        &self.message
    }

    pub fn signer_index(&self, pubkey: &[u8; PUBKEY_LEN]) -> Option<usize> {
        self.account_keys[..self.num_required_signatures]
            .iter()
            .position(|key| key == pubkey)
    }

    pub fn sign_with(&mut self, signing_key: &SigningKey) -> Result<(), SignError> {
        let pubkey = signing_key.verifying_key().to_bytes();
        let index = self
            .signer_index(&pubkey)
            .ok_or_else(|| SignError::SignerNotRequired {
                signer: bs58::encode(pubkey).into_string(),
            })?;
        self.signatures[index] = signing_key.sign(&self.message).to_bytes();
        Ok(())
    }

    /// The transaction id: base58 of the fee payer's signature.
    pub fn signature_base58(&self) -> String {
        bs58::encode(self.signatures[0]).into_string()
    }

    pub fn recent_blockhash_base58(&self) -> String {
        bs58::encode(self.recent_blockhash).into_string()
    }

    pub fn into_signed(self) -> SignedTransaction {
        SignedTransaction {
            signature: self.signature_base58(),
            recent_blockhash: self.recent_blockhash_base58(),
            wire_base64: BASE64.encode(self.serialize()),
        }
    }
}

/// Decode, sign with the operator key, and re-encode a marketplace transaction.
pub fn sign_serialized_transaction(
    serialized_transaction: &str,
    signing_key: &SigningKey,
) -> Result<SignedTransaction, SignError> {
    let mut transaction = WireTransaction::from_base64(serialized_transaction)?;
    transaction.sign_with(signing_key)?;
    Ok(transaction.into_signed())
}

#[cfg(test)]
pub(crate) mod tests {
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;
    use ed25519_dalek::{Signature, SigningKey, Verifier};

    use super::{
        decode_compact_u16, encode_compact_u16, sign_serialized_transaction, WireTransaction,
    };
    use crate::network::SignError;

    /// Legacy transfer-shaped transaction with empty signature slots.
    pub(crate) fn unsigned_transaction(
        signers: &[[u8; 32]],
        extra_keys: usize,
        blockhash: [u8; 32],
    ) -> Vec<u8> {
        let mut message = vec![signers.len() as u8, 0, 1];
        encode_compact_u16(signers.len() + extra_keys, &mut message);
        for signer in signers {
            message.extend_from_slice(signer);
        }
        for index in 0..extra_keys {
            message.extend_from_slice(&[index as u8 + 200; 32]);
        }
        message.extend_from_slice(&blockhash);
        encode_compact_u16(0, &mut message);

        let mut bytes = Vec::new();
        encode_compact_u16(signers.len(), &mut bytes);
        for _ in signers {
            bytes.extend_from_slice(&[0_u8; 64]);
        }
        bytes.extend_from_slice(&message);
        bytes
    }

    #[test]
    fn unit_compact_u16_round_trips_boundary_values() {
        for value in [0_usize, 1, 127, 128, 16_383, 16_384, 65_535] {
            let mut encoded = Vec::new();
            encode_compact_u16(value, &mut encoded);
            assert_eq!(decode_compact_u16(&encoded), Ok((value, encoded.len())));
        }
        assert!(matches!(
            decode_compact_u16(&[0x80]),
            Err(SignError::Malformed(_))
        ));
        assert!(matches!(
            decode_compact_u16(&[0xff, 0xff, 0x04]),
            Err(SignError::Malformed(_))
        ));
    }

    #[test]
    fn functional_sign_places_verifiable_signature_in_fee_payer_slot() {
        let key = SigningKey::from_bytes(&[7_u8; 32]);
        let payer = key.verifying_key().to_bytes();
        let blockhash = [9_u8; 32];
        let raw = unsigned_transaction(&[payer], 1, blockhash);

        let signed = sign_serialized_transaction(&BASE64.encode(&raw), &key).expect("signed");
        assert_eq!(signed.recent_blockhash, bs58::encode(blockhash).into_string());

        let decoded = BASE64.decode(&signed.wire_base64).expect("base64");
        let parsed = WireTransaction::parse(&decoded).expect("parse");
        let signature_bytes = bs58::decode(&signed.signature)
            .into_vec()
            .expect("base58 signature");
        let signature =
            Signature::from_slice(&signature_bytes).expect("signature length");
        key.verifying_key()
            .verify(parsed.message_bytes(), &signature)
            .expect("valid signature");
    }

    #[test]
    fn integration_sign_fills_second_signer_slot_when_marketplace_pays_fees() {
        let fee_payer = SigningKey::from_bytes(&[1_u8; 32]);
        let operator = SigningKey::from_bytes(&[2_u8; 32]);
        let raw = unsigned_transaction(
            &[
                fee_payer.verifying_key().to_bytes(),
                operator.verifying_key().to_bytes(),
            ],
            0,
            [3_u8; 32],
        );
        let mut transaction = WireTransaction::parse(&raw).expect("parse");
        assert_eq!(
            transaction.signer_index(&operator.verifying_key().to_bytes()),
            Some(1)
        );
        transaction.sign_with(&operator).expect("sign");
        let reparsed = WireTransaction::parse(&transaction.serialize()).expect("reparse");
        assert_eq!(reparsed.signatures[0], [0_u8; 64]);
        assert_ne!(reparsed.signatures[1], [0_u8; 64]);
    }

    #[test]
    fn regression_sign_rejects_key_that_is_not_a_required_signer() {
        let key = SigningKey::from_bytes(&[7_u8; 32]);
        let other = SigningKey::from_bytes(&[8_u8; 32]);
        let raw = unsigned_transaction(&[other.verifying_key().to_bytes()], 1, [0_u8; 32]);
        let error = sign_serialized_transaction(&BASE64.encode(&raw), &key).expect_err("mismatch");
        assert!(matches!(error, SignError::SignerNotRequired { .. }));
    }

    #[test]
    fn regression_parse_rejects_garbage_and_truncated_blobs() {
        let key = SigningKey::from_bytes(&[7_u8; 32]);
        assert!(matches!(
            sign_serialized_transaction("not base64!!", &key),
            Err(SignError::Decode(_))
        ));
        assert!(matches!(
            WireTransaction::parse(&[]),
            Err(SignError::Malformed(_))
        ));
        let raw = unsigned_transaction(&[key.verifying_key().to_bytes()], 1, [0_u8; 32]);
        assert!(matches!(
            WireTransaction::parse(&raw[..raw.len() - 10]),
            Err(SignError::Malformed(_))
        ));
        let mut versioned = raw.clone();
        versioned[65] = 0x81;
        assert!(matches!(
            WireTransaction::parse(&versioned),
            Err(SignError::Malformed(message)) if message.contains("unsupported message version")
        ));
    }
}
