//! Secret handles for key material.
//!
//! Nothing in this module implements `Clone`, `Serialize`, or a revealing
//! `Debug`. Buffers are zeroized when the owning value is dropped.

use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, Zeroizing};

use crate::errors::CryptoError;

pub const SEED_LEN: usize = 64;
pub const PRIVATE_KEY_LEN: usize = 32;

/// BIP-39 seed bytes derived from a mnemonic and optional password.
pub struct Seed(Zeroizing<[u8; SEED_LEN]>);

impl Seed {
    pub fn from_bytes(bytes: [u8; SEED_LEN]) -> Self {
        Self(Zeroizing::new(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; SEED_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for Seed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Seed(<redacted>)")
    }
}

/// Secp256k1 signing key owned by a resolved account.
///
/// The wrapped `SigningKey` zeroizes its scalar on drop.
pub struct SigningMaterial {
    key: SigningKey,
}

impl SigningMaterial {
    /// Build signing material from a big-endian 32-byte scalar.
    ///
    /// Rejects a zero scalar and values at or above the curve order.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != PRIVATE_KEY_LEN {
            return Err(CryptoError::new(format!(
                "expected {PRIVATE_KEY_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        let key = SigningKey::from_slice(bytes)
            .map_err(|_| CryptoError::new("scalar is zero or out of range"))?;
        Ok(Self { key })
    }

    pub(crate) fn from_signing_key(key: SigningKey) -> Self {
        Self { key }
    }

    pub fn verifying_key(&self) -> &VerifyingKey {
        self.key.verifying_key()
    }

    /// Sign a 32-byte prehash, producing a recoverable signature.
    pub fn sign_prehash(&self, digest: &[u8; 32]) -> Result<RecoverableSignature, CryptoError> {
        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(digest)
            .map_err(|e| CryptoError::new(format!("prehash signing failed: {e}")))?;
        Ok(RecoverableSignature::from_parts(&signature, recovery_id))
    }

    /// Raw scalar copy for re-encryption. The returned buffer zeroizes on drop.
    pub(crate) fn to_bytes(&self) -> Zeroizing<[u8; PRIVATE_KEY_LEN]> {
        let mut field_bytes = self.key.to_bytes();
        let mut out = Zeroizing::new([0u8; PRIVATE_KEY_LEN]);
        out.copy_from_slice(field_bytes.as_slice());
        field_bytes.as_mut_slice().zeroize();
        out
    }
}

impl std::fmt::Debug for SigningMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningMaterial")
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Secp256k1 signature in `r || s || v` form, `v` being the recovery id (0 or 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoverableSignature {
    pub r: [u8; 32],
    pub s: [u8; 32],
    pub v: u8,
}

impl RecoverableSignature {
    fn from_parts(signature: &Signature, recovery_id: RecoveryId) -> Self {
        let (r_bytes, s_bytes) = signature.split_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(r_bytes.as_slice());
        s.copy_from_slice(s_bytes.as_slice());
        Self {
            r,
            s,
            v: recovery_id.to_byte(),
        }
    }

    pub fn to_bytes(&self) -> [u8; 65] {
        let mut out = [0u8; 65];
        out[..32].copy_from_slice(&self.r);
        out[32..64].copy_from_slice(&self.s);
        out[64] = self.v;
        out
    }

    /// Recover the verifying key that produced this signature over `digest`.
    pub fn recover(&self, digest: &[u8; 32]) -> Result<VerifyingKey, CryptoError> {
        let mut rs = [0u8; 64];
        rs[..32].copy_from_slice(&self.r);
        rs[32..].copy_from_slice(&self.s);
        let signature = Signature::from_slice(&rs)
            .map_err(|e| CryptoError::new(format!("malformed signature: {e}")))?;
        let recovery_id = RecoveryId::from_byte(self.v)
            .ok_or_else(|| CryptoError::new(format!("invalid recovery id {}", self.v)))?;
        VerifyingKey::recover_from_prehash(digest, &signature, recovery_id)
            .map_err(|e| CryptoError::new(format!("recovery failed: {e}")))
    }
}
