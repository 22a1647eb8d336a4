//! Zeroizing wrappers for negotiated key material.

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Shared secret derived from key agreement or SRP.
///
/// Owned by exactly one security variant for the lifetime of its session;
/// the bytes are wiped when the session object is released.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret(Vec<u8>);

impl SharedSecret {
    /// Wrap raw secret bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// XOR another byte string into the secret in place.
    ///
    /// Used to fold a proof-of-possession digest into a key-agreement
    /// secret. Only the overlapping prefix is combined when lengths differ.
    pub fn xor_with(&mut self, other: &[u8]) {
        for (byte, mask) in self.0.iter_mut().zip(other.iter()) {
            *byte ^= mask;
        }
    }
}
