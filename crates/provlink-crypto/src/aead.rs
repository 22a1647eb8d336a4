//! AES-256-GCM for password-authenticated sessions.
//!
//! Each sealed message is `ciphertext || 16-byte tag`. The nonce comes from
//! one of two policies fixed at construction:
//!
//! - **Counter**: the 8 low-order bytes of the device nonce become a fixed
//!   session id; each message uses `session_id || u32-be counter`, with the
//!   counter starting at 1 and advancing by one after every successful seal
//!   or open. Both directions share the counter space, so peers must stay
//!   in lockstep.
//! - **Fixed**: the device nonce is reused unchanged for every message.
//!   This is a known AEAD misuse kept only for old firmware; prefer the
//!   counter policy.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use provlink_core::error::CryptoError;
use zeroize::ZeroizeOnDrop;

/// GCM authentication tag length in bytes.
const TAG_LEN: usize = 16;
/// AES-GCM nonce length in bytes.
const NONCE_LEN: usize = 12;
/// Session-id prefix length under the counter policy.
const SESSION_ID_LEN: usize = 8;

enum NonceState {
    Counter { session_id: [u8; SESSION_ID_LEN], counter: u32 },
    Fixed([u8; NONCE_LEN]),
}

/// AEAD context keyed by the SRP session key.
#[derive(ZeroizeOnDrop)]
pub struct AeadCipher {
    key: [u8; 32],
    #[zeroize(skip)]
    cipher: Aes256Gcm,
    #[zeroize(skip)]
    nonce: NonceState,
}

impl AeadCipher {
    /// Create a cipher from a 32-byte key and the device-supplied nonce.
    ///
    /// `use_counter_nonce` selects the counter policy; otherwise the device
    /// nonce is used as-is for every message and must be exactly 12 bytes.
    pub fn new(key: &[u8], device_nonce: &[u8], use_counter_nonce: bool) -> Result<Self, CryptoError> {
        if key.len() != 32 {
            return Err(CryptoError::InvalidKeyLength {
                expected: 32,
                actual: key.len(),
            });
        }
        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|e| CryptoError::Encryption(format!("Invalid key: {}", e)))?;

        let nonce = if use_counter_nonce {
            if device_nonce.len() < SESSION_ID_LEN {
                return Err(CryptoError::Encryption(format!(
                    "Device nonce too short for session id: {} (expected >= {})",
                    device_nonce.len(),
                    SESSION_ID_LEN
                )));
            }
            let mut session_id = [0u8; SESSION_ID_LEN];
            session_id.copy_from_slice(&device_nonce[device_nonce.len() - SESSION_ID_LEN..]);
            NonceState::Counter { session_id, counter: 1 }
        } else {
            if device_nonce.len() != NONCE_LEN {
                return Err(CryptoError::Encryption(format!(
                    "Device nonce has wrong length: {} (expected {})",
                    device_nonce.len(),
                    NONCE_LEN
                )));
            }
            let mut fixed = [0u8; NONCE_LEN];
            fixed.copy_from_slice(device_nonce);
            NonceState::Fixed(fixed)
        };

        let mut key_arr = [0u8; 32];
        key_arr.copy_from_slice(key);
        Ok(Self {
            key: key_arr,
            cipher,
            nonce,
        })
    }

    /// Seal plaintext under the current nonce.
    ///
    /// Returns `ciphertext || tag` and advances the counter.
    pub fn seal(&mut self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let nonce = self.current_nonce();
        let sealed = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|_| CryptoError::Encryption("AEAD seal failed".to_string()))?;
        self.advance()?;
        Ok(sealed)
    }

    /// Open `ciphertext || tag` under the current nonce.
    ///
    /// Fails with `AuthTagMismatch` if the tag does not verify; the counter
    /// advances only on success.
    pub fn open(&mut self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if data.len() < TAG_LEN {
            return Err(CryptoError::Decryption(format!(
                "Ciphertext too short: {} (missing {}-byte tag)",
                data.len(),
                TAG_LEN
            )));
        }

        let nonce = self.current_nonce();
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(&nonce), data)
            .map_err(|_| CryptoError::AuthTagMismatch)?;
        self.advance()?;
        Ok(plaintext)
    }

    fn current_nonce(&self) -> [u8; NONCE_LEN] {
        match &self.nonce {
            NonceState::Counter { session_id, counter } => {
                let mut nonce = [0u8; NONCE_LEN];
                nonce[..SESSION_ID_LEN].copy_from_slice(session_id);
                nonce[SESSION_ID_LEN..].copy_from_slice(&counter.to_be_bytes());
                nonce
            }
            NonceState::Fixed(nonce) => *nonce,
        }
    }

    fn advance(&mut self) -> Result<(), CryptoError> {
        if let NonceState::Counter { counter, .. } = &mut self.nonce {
            *counter = counter.checked_add(1).ok_or_else(|| {
                CryptoError::Encryption("Nonce counter exhausted".to_string())
            })?;
        }
        Ok(())
    }
}
