//! X25519 key agreement for the pairing handshake.
//!
//! Each session draws a fresh key pair and performs exactly one exchange
//! against the device's public key. The shared secret must be
//! contributory: an exchange against a small-order point collapses to all
//! zeros and is rejected, as is an all-zero peer key.

use provlink_core::error::KeygenError;
use rand::rngs::OsRng;
use x25519_dalek::{PublicKey, StaticSecret};

/// Per-session X25519 key pair.
///
/// The secret scalar lives inside [`StaticSecret`], which wipes itself on
/// drop.
pub struct EphemeralKeyPair {
    secret: StaticSecret,
    public: PublicKey,
}

impl EphemeralKeyPair {
    /// Draw a fresh key pair from the system RNG.
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Build a key pair from raw secret bytes. The scalar is clamped per
    /// RFC 7748, so distinct inputs may map to the same key.
    pub fn from_secret(secret: &[u8; 32]) -> Self {
        let secret = StaticSecret::from(*secret);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    /// The public key to send to the device.
    pub fn public_key(&self) -> [u8; 32] {
        self.public.to_bytes()
    }

    /// Run the exchange against the device's public key, consuming the key
    /// pair. Fails on an all-zero peer key or a non-contributory result.
    pub fn diffie_hellman(self, peer_public: &[u8; 32]) -> Result<[u8; 32], KeygenError> {
        if peer_public == &[0u8; 32] {
            return Err(KeygenError::InvalidPeerKey);
        }

        let shared = self.secret.diffie_hellman(&PublicKey::from(*peer_public));
        if !shared.was_contributory() {
            return Err(KeygenError::WeakSharedSecret);
        }

        Ok(shared.to_bytes())
    }
}
