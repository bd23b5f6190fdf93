//! Legacy (EIP-155) transaction signing with a secp256k1 key.

use std::fmt;

use k256::ecdsa::{RecoveryId, Signature, SigningKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use zeroize::Zeroizing;

use super::abi::{decode_hex, keccak256};
use super::rlp::{self, Item};
use super::Address;
use crate::config::SigningSecret;
use crate::error::ClientError;

/// An unsigned legacy transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTransaction {
    pub nonce: u64,
    pub gas_price: u128,
    pub gas_limit: u64,
    pub to: Address,
    pub value: u128,
    pub data: Vec<u8>,
}

impl LegacyTransaction {
    fn base_items(&self) -> Vec<Item> {
        vec![
            Item::uint(u128::from(self.nonce)),
            Item::uint(self.gas_price),
            Item::uint(u128::from(self.gas_limit)),
            Item::Bytes(self.to.as_bytes().to_vec()),
            Item::uint(self.value),
            Item::Bytes(self.data.clone()),
        ]
    }

    /// RLP of `[nonce, gasPrice, gas, to, value, data, chainId, 0, 0]`.
    pub fn signing_payload(&self, chain_id: u64) -> Vec<u8> {
        let mut items = self.base_items();
        items.push(Item::uint(u128::from(chain_id)));
        items.push(Item::uint(0));
        items.push(Item::uint(0));
        rlp::encode(&Item::List(items))
    }

    /// Keccak-256 of the signing payload.
    pub fn signing_hash(&self, chain_id: u64) -> [u8; 32] {
        keccak256(&self.signing_payload(chain_id))
    }
}

/// Signs registry transactions. Holds the key in memory for the lifetime of
/// the process; `Debug` prints only the derived address.
pub struct TransactionSigner {
    key: SigningKey,
    address: Address,
}

impl TransactionSigner {
    /// Load a signer from a hex-encoded 32-byte private key.
    pub fn from_secret(secret: &SigningSecret) -> Result<Self, ClientError> {
        let raw = Zeroizing::new(
            decode_hex(secret.expose())
                .map_err(|_| ClientError::Signing("private key is not valid hex".into()))?,
        );
        if raw.is_empty() || raw.len() > 32 {
            return Err(ClientError::Signing(format!(
                "private key must be at most 32 bytes, got {}",
                raw.len()
            )));
        }
        let mut padded = Zeroizing::new([0u8; 32]);
        padded[32 - raw.len()..].copy_from_slice(&raw);
        let key = SigningKey::from_slice(&padded[..])
            .map_err(|e| ClientError::Signing(format!("invalid secp256k1 key: {e}")))?;
        let address = address_of(&key);
        Ok(Self { key, address })
    }

    /// The account address derived from the key.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Sign `tx` for `chain_id` and return the raw transaction bytes ready
    /// for `eth_sendRawTransaction`.
    pub fn sign_legacy(
        &self,
        tx: &LegacyTransaction,
        chain_id: u64,
    ) -> Result<Vec<u8>, ClientError> {
        let (signature, recovery_id) = self.sign_hash(&tx.signing_hash(chain_id))?;
        let v = u128::from(recovery_id.to_byte()) + 35 + 2 * u128::from(chain_id);
        let (r, s) = signature.split_bytes();

        let mut items = tx.base_items();
        items.push(Item::uint(v));
        items.push(Item::uint_bytes(&r));
        items.push(Item::uint_bytes(&s));
        Ok(rlp::encode(&Item::List(items)))
    }

    fn sign_hash(&self, hash: &[u8; 32]) -> Result<(Signature, RecoveryId), ClientError> {
        self.key
            .sign_prehash_recoverable(hash)
            .map_err(|e| ClientError::Signing(e.to_string()))
    }
}

impl fmt::Debug for TransactionSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionSigner")
            .field("address", &self.address.to_string())
            .finish_non_exhaustive()
    }
}

fn address_of(key: &SigningKey) -> Address {
    let point = key.verifying_key().as_affine().to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    let mut out = [0u8; 20];
    out.copy_from_slice(&hash[12..]);
    Address::from_bytes(out)
}
