//! secp256k1 signing key.
//!
//! The interpreter only verifies signatures. `PrivateKey` produces the
//! signatures that go into scriptSigs and witnesses: a low-S DER encoding
//! followed by the sighash type byte.

use k256::ecdsa::SigningKey;

use crate::ec::public_key::PublicKey;
use crate::ec::signature::Signature;
use crate::PrimitivesError;

/// A secp256k1 private key for signing.
///
/// The wrapped k256 key is zeroized when dropped.
#[derive(Clone, Debug)]
pub struct PrivateKey {
    inner: SigningKey,
}

impl PrivateKey {
    /// Create a private key from a raw 32-byte big-endian scalar.
    ///
    /// # Returns
    /// An error if the slice is not 32 bytes or the scalar is zero or not
    /// below the curve order.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        let inner = SigningKey::from_slice(bytes)
            .map_err(|e| PrimitivesError::InvalidPrivateKey(e.to_string()))?;
        Ok(PrivateKey { inner })
    }

    /// Create a private key from a 64-character hex string.
    pub fn from_hex(hex_str: &str) -> Result<Self, PrimitivesError> {
        Self::from_bytes(&hex::decode(hex_str)?)
    }

    /// Derive the corresponding public key.
    pub fn pub_key(&self) -> PublicKey {
        PublicKey::from_k256_verifying_key(self.inner.verifying_key())
    }

    /// Sign a 32-byte message hash using deterministic RFC6979 nonces.
    ///
    /// # Returns
    /// A low-S `Signature`, or an error if signing fails.
    pub fn sign(&self, hash: &[u8]) -> Result<Signature, PrimitivesError> {
        Signature::sign(hash, self)
    }

    /// Sign a signature hash and append `hash_type`, producing the bytes
    /// OP_CHECKSIG expects on the stack.
    ///
    /// # Arguments
    /// * `sighash` - The transaction signature hash.
    /// * `hash_type` - The sighash type byte (e.g. `0x01` for ALL).
    pub fn sign_with_hash_type(
        &self,
        sighash: &[u8; 32],
        hash_type: u8,
    ) -> Result<Vec<u8>, PrimitivesError> {
        let mut sig = self.sign(sighash)?.to_der();
        sig.push(hash_type);
        Ok(sig)
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.inner
    }
}
