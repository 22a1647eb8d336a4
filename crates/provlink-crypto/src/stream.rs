//! AES-256-CTR stream cipher for key-agreement sessions.
//!
//! One cipher context serves both directions for the whole session: the
//! keystream position advances across every call and never resets, so both
//! sides must consume the stream in the same order. Encryption and
//! decryption are the same XOR operation in CTR mode.

use aes::Aes256;
use ctr::cipher::{KeyIvInit, StreamCipher};
use ctr::Ctr128BE;
use provlink_core::error::CryptoError;

type Aes256Ctr = Ctr128BE<Aes256>;

/// Session-long AES-256-CTR context.
pub struct CtrCipher {
    cipher: Aes256Ctr,
}

impl CtrCipher {
    /// Create a cipher from a 32-byte key and 16-byte IV.
    ///
    /// The IV is the device-supplied random; the big-endian block counter
    /// occupies its low-order bytes and advances once per cipher block.
    pub fn new(key: &[u8], iv: &[u8]) -> Result<Self, CryptoError> {
        if key.len() != 32 {
            return Err(CryptoError::InvalidKeyLength {
                expected: 32,
                actual: key.len(),
            });
        }

        let cipher = Aes256Ctr::new_from_slices(key, iv).map_err(|_| {
            CryptoError::Encryption(format!("Invalid IV length: {} (expected 16)", iv.len()))
        })?;

        Ok(Self { cipher })
    }

    /// Apply the keystream to `data`.
    ///
    /// Used for both encrypt and decrypt; each call continues from where
    /// the previous one stopped.
    pub fn apply(&mut self, data: &[u8]) -> Vec<u8> {
        let mut buf = data.to_vec();
        self.cipher.apply_keystream(&mut buf);
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_and_iv() -> ([u8; 32], [u8; 16]) {
        // NIST SP 800-38A F.5.5 (CTR-AES256.Encrypt)
        let key = hex::decode("603deb1015ca71be2b73aef0857d77811f352c073b6108d72d9810a30914dff4")
            .unwrap();
        let iv = hex::decode("f0f1f2f3f4f5f6f7f8f9fafbfcfdfeff").unwrap();
        let mut key_arr = [0u8; 32];
        key_arr.copy_from_slice(&key);
        let mut iv_arr = [0u8; 16];
        iv_arr.copy_from_slice(&iv);
        (key_arr, iv_arr)
    }

    mod construction {
        use super::*;

        #[test]
        fn rejects_short_key() {
            let (_, iv) = key_and_iv();
            let result = CtrCipher::new(&[0u8; 16], &iv);
            assert!(matches!(
                result,
                Err(CryptoError::InvalidKeyLength { expected: 32, actual: 16 })
            ));
        }

        #[test]
        fn rejects_wrong_iv_length() {
            let (key, _) = key_and_iv();
            assert!(CtrCipher::new(&key, &[0u8; 12]).is_err());
        }
    }

    mod known_vectors {
        use super::*;

        #[test]
        fn nist_sp800_38a_ctr_aes256() {
            let (key, iv) = key_and_iv();
            let mut cipher = CtrCipher::new(&key, &iv).unwrap();

            let block1 = hex::decode("6bc1bee22e409f96e93d7e117393172a").unwrap();
            let block2 = hex::decode("ae2d8a571e03ac9c9eb76fac45af8e51").unwrap();

            assert_eq!(
                hex::encode(cipher.apply(&block1)),
                "601ec313775789a5b7a7f504bbf3d228"
            );
            // Second call continues the keystream at block 2
            assert_eq!(
                hex::encode(cipher.apply(&block2)),
                "f443e3ca4d62b59aca84e990cacaf5c5"
            );
        }

        #[test]
        fn chunked_calls_match_single_call() {
            let (key, iv) = key_and_iv();
            let plaintext = [0x5Au8; 48];

            let mut whole = CtrCipher::new(&key, &iv).unwrap();
            let expected = whole.apply(&plaintext);

            let mut chunked = CtrCipher::new(&key, &iv).unwrap();
            let mut actual = chunked.apply(&plaintext[..16]);
            actual.extend(chunked.apply(&plaintext[16..40]));
            actual.extend(chunked.apply(&plaintext[40..]));

            assert_eq!(actual, expected);
        }
    }

    mod round_trip {
        use super::*;

        #[test]
        fn peer_in_lockstep_recovers_plaintext() {
            let (key, iv) = key_and_iv();
            let mut client = CtrCipher::new(&key, &iv).unwrap();
            let mut device = CtrCipher::new(&key, &iv).unwrap();

            for message in [&b""[..], &b"x"[..], &[0xA5u8; 40][..]] {
                let ciphertext = client.apply(message);
                let plaintext = device.apply(&ciphertext);
                assert_eq!(plaintext, message);
            }
        }

        #[test]
        fn keystream_never_resets_between_messages() {
            let (key, iv) = key_and_iv();
            let mut cipher = CtrCipher::new(&key, &iv).unwrap();

            let first = cipher.apply(&[0u8; 16]);
            let second = cipher.apply(&[0u8; 16]);
            // Same plaintext, different keystream position
            assert_ne!(first, second);
        }
    }
}
