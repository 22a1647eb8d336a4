//! Error types for the provisioning security engine.

use thiserror::Error;

use crate::config::SecurityScheme;

/// Primary error type for all provlink operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Handshake error: {0}")]
    Handshake(#[from] HandshakeError),

    #[error("Key generation error: {0}")]
    Keygen(#[from] KeygenError),

    #[error("SRP error: {0}")]
    Srp(#[from] SrpError),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Protocol-sequencing violations on an otherwise healthy session.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session not established")]
    NotEstablished,

    #[error("Handshake already complete; no further requests may be generated")]
    HandshakeComplete,

    #[error("Invalid session state: {0}")]
    InvalidState(String),
}

/// Failures while driving the handshake to completion.
///
/// A failed handshake terminates the session; callers must build a new
/// session (with fresh ephemeral keys) before retrying.
#[derive(Error, Debug)]
pub enum HandshakeError {
    #[error("Response missing for step {step}")]
    MissingResponse { step: u8 },

    #[error("Security scheme mismatch: expected {expected}, device sent tag {actual}")]
    SchemeMismatch {
        expected: SecurityScheme,
        actual: i32,
    },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Key mismatch: device verification did not decrypt to our public key")]
    KeyMismatch,

    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// Ephemeral key-pair and key-agreement failures.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum KeygenError {
    #[error("Could not generate key pair: {0}")]
    KeyPair(String),

    #[error("Device public key is not a valid curve point")]
    InvalidPeerKey,

    #[error("Key agreement produced an all-zero shared secret")]
    WeakSharedSecret,
}

/// SRP6a client failures.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SrpError {
    #[error("Invalid server public key: B mod N is zero")]
    InvalidPublicKey,

    #[error("verify_session called before process_challenge")]
    MissingChallenge,

    #[error("Server key proof does not match expected evidence")]
    KeyProofMismatch,
}

/// Symmetric cipher failures.
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Decryption failed: {0}")]
    Decryption(String),

    #[error("Authentication tag mismatch")]
    AuthTagMismatch,

    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },
}

/// Transport failures, passed through opaquely from the transport layer.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Device unreachable: {0}")]
    DeviceUnreachable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Communication failed: {0}")]
    Communication(String),
}

/// Convenience Result type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formats() {
        let err = Error::Handshake(HandshakeError::SchemeMismatch {
            expected: SecurityScheme::KeyAgreement,
            actual: 2,
        });
        assert!(err.to_string().contains("Handshake error"));
        assert!(err.to_string().contains("key-agreement"));

        let err = Error::Srp(SrpError::KeyProofMismatch);
        assert!(err.to_string().contains("SRP error"));
        assert!(err.to_string().contains("key proof"));

        let err = Error::Session(SessionError::NotEstablished);
        assert!(err.to_string().contains("not established"));
    }

    #[test]
    fn error_source_chain() {
        use std::error::Error as StdError;

        let io_err = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "test");
        let err = Error::Transport(TransportError::Io(io_err));
        assert!(err.source().is_some());
    }

    #[test]
    fn error_conversions() {
        let err: Error = SrpError::InvalidPublicKey.into();
        assert!(matches!(err, Error::Srp(_)));

        let err: Error = HandshakeError::KeyMismatch.into();
        assert!(matches!(err, Error::Handshake(_)));

        let err: Error = CryptoError::AuthTagMismatch.into();
        assert!(matches!(err, Error::Crypto(_)));

        let err: Error = SessionError::HandshakeComplete.into();
        assert!(matches!(err, Error::Session(_)));

        let err: Error = KeygenError::KeyPair("rng failure".to_string()).into();
        assert!(matches!(err, Error::Keygen(_)));
    }
}
