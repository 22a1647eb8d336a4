//! # provlink-crypto
//!
//! Cryptographic building blocks for the provisioning handshake:
//! - SRP6a (3072-bit, SHA-512) client engine for password authentication
//! - X25519 ECDH for key-agreement pairing
//! - AES-256-CTR stream cipher with a session-long keystream
//! - AES-256-GCM AEAD with counter or fixed nonce policies
//!
//! All secret material is zeroized on drop.

pub mod aead;
pub mod keys;
pub mod srp;
pub mod stream;
pub mod x25519;

pub use aead::AeadCipher;
pub use keys::SharedSecret;
pub use srp::SrpClient;
pub use stream::CtrCipher;
pub use x25519::EphemeralKeyPair;
