//! Scheme 1: X25519 key agreement with optional proof of possession.
//!
//! Two rounds. The client sends its ephemeral public key, the device
//! answers with its own public key and a 16-byte random. Both sides derive
//! the shared secret (XORed with SHA-256 of the proof of possession when
//! one is configured) and key a single AES-256-CTR context with the device
//! random as IV. The second round exchanges verification data: each side
//! sends the other's public key through the cipher, so a key mismatch
//! surfaces before any configuration traffic flows.
//!
//! The CTR context is shared by encrypt and decrypt for the whole session;
//! its keystream position advances across every call. The verify exchange
//! consumes the first two 32-byte stretches, in the same order on both
//! sides, which keeps the peers in lockstep afterwards.

use prost::Message;
use provlink_core::config::SecurityScheme;
use provlink_core::error::{HandshakeError, KeygenError, Result, SessionError};
use provlink_crypto::{CtrCipher, EphemeralKeyPair, SharedSecret};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::proto::{
    sec1_payload, session_data, Sec1MsgType, Sec1Payload, SecSchemeVersion, SessionCmd0,
    SessionCmd1, SessionData,
};
use crate::security::{check_status, decode_envelope, Security};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Command0,
    Response0,
    Response1,
    Done,
}

/// Key-agreement security variant (client side).
pub struct KeyAgreement {
    state: State,
    proof_of_possession: Option<String>,
    key_pair: Option<EphemeralKeyPair>,
    public_key: [u8; 32],
    client_verify: Option<Vec<u8>>,
    cipher: Option<CtrCipher>,
}

impl KeyAgreement {
    /// Create a variant with an optional proof of possession.
    ///
    /// An empty string behaves like no proof at all, matching devices that
    /// treat the PoP as optional.
    pub fn new(proof_of_possession: Option<&str>) -> Self {
        let key_pair = EphemeralKeyPair::generate();
        let public_key = key_pair.public_key();
        Self {
            state: State::Command0,
            proof_of_possession: proof_of_possession
                .filter(|pop| !pop.is_empty())
                .map(str::to_string),
            key_pair: Some(key_pair),
            public_key,
            client_verify: None,
            cipher: None,
        }
    }

    /// Create a variant with a fixed ephemeral secret (for testing).
    #[cfg(test)]
    pub fn with_secret(proof_of_possession: Option<&str>, secret: &[u8; 32]) -> Self {
        let key_pair = EphemeralKeyPair::from_secret(secret);
        let public_key = key_pair.public_key();
        Self {
            state: State::Command0,
            proof_of_possession: proof_of_possession
                .filter(|pop| !pop.is_empty())
                .map(str::to_string),
            key_pair: Some(key_pair),
            public_key,
            client_verify: None,
            cipher: None,
        }
    }

    fn command0(&mut self) -> Result<Vec<u8>> {
        debug!("key agreement: sending client public key");
        let envelope = SessionData {
            sec_ver: SecSchemeVersion::SecScheme1 as i32,
            proto: Some(session_data::Proto::Sec1(Sec1Payload {
                msg: Sec1MsgType::SessionCommand0 as i32,
                payload: Some(sec1_payload::Payload::Sc0(SessionCmd0 {
                    client_pubkey: self.public_key.to_vec(),
                })),
            })),
        };
        Ok(envelope.encode_to_vec())
    }

    fn process_response0(&mut self, response: &[u8]) -> Result<Vec<u8>> {
        let envelope = decode_envelope(response, SecurityScheme::KeyAgreement)?;
        let resp = match envelope.proto {
            Some(session_data::Proto::Sec1(Sec1Payload {
                payload: Some(sec1_payload::Payload::Sr0(resp)),
                ..
            })) => resp,
            _ => {
                return Err(HandshakeError::Protocol(
                    "Expected scheme 1 session response 0".to_string(),
                )
                .into())
            }
        };
        check_status(resp.status, "session command 0")?;

        let device_pubkey: [u8; 32] = resp.device_pubkey.as_slice().try_into().map_err(|_| {
            HandshakeError::Protocol(format!(
                "Device public key has wrong length: {}",
                resp.device_pubkey.len()
            ))
        })?;

        let key_pair = self
            .key_pair
            .take()
            .ok_or_else(|| KeygenError::KeyPair("Ephemeral key already consumed".to_string()))?;
        let shared = key_pair.diffie_hellman(&device_pubkey)?;

        let mut secret = SharedSecret::new(shared.to_vec());
        if let Some(pop) = &self.proof_of_possession {
            secret.xor_with(&Sha256::digest(pop.as_bytes()));
        }

        let mut cipher = CtrCipher::new(secret.as_bytes(), &resp.device_random)?;

        // First keystream stretch: prove we derived the same key by sending
        // the device's public key back through the cipher.
        let client_verify = cipher.apply(&device_pubkey);
        self.cipher = Some(cipher);
        self.client_verify = Some(client_verify.clone());

        debug!("key agreement: shared secret derived, sending verify data");
        let envelope = SessionData {
            sec_ver: SecSchemeVersion::SecScheme1 as i32,
            proto: Some(session_data::Proto::Sec1(Sec1Payload {
                msg: Sec1MsgType::SessionCommand1 as i32,
                payload: Some(sec1_payload::Payload::Sc1(SessionCmd1 {
                    client_verify_data: client_verify,
                })),
            })),
        };
        Ok(envelope.encode_to_vec())
    }

    fn process_response1(&mut self, response: &[u8]) -> Result<()> {
        let envelope = decode_envelope(response, SecurityScheme::KeyAgreement)?;
        let resp = match envelope.proto {
            Some(session_data::Proto::Sec1(Sec1Payload {
                payload: Some(sec1_payload::Payload::Sr1(resp)),
                ..
            })) => resp,
            _ => {
                return Err(HandshakeError::Protocol(
                    "Expected scheme 1 session response 1".to_string(),
                )
                .into())
            }
        };
        check_status(resp.status, "session command 1")?;

        let cipher = self
            .cipher
            .as_mut()
            .ok_or(SessionError::InvalidState(
                "Verify response arrived before key derivation".to_string(),
            ))?;

        // Second keystream stretch: the device's verify data must decrypt
        // to our own public key.
        let decrypted = cipher.apply(&resp.device_verify_data);
        if decrypted != self.public_key {
            return Err(HandshakeError::KeyMismatch.into());
        }

        debug!("key agreement handshake complete");
        Ok(())
    }
}

impl Security for KeyAgreement {
    fn scheme(&self) -> SecurityScheme {
        SecurityScheme::KeyAgreement
    }

    fn next_request(&mut self, response: Option<&[u8]>) -> Result<Option<Vec<u8>>> {
        match self.state {
            State::Command0 => {
                let request = self.command0()?;
                self.state = State::Response0;
                Ok(Some(request))
            }
            State::Response0 => {
                let response =
                    response.ok_or(HandshakeError::MissingResponse { step: 0 })?;
                let request = self.process_response0(response)?;
                self.state = State::Response1;
                Ok(Some(request))
            }
            State::Response1 => {
                let response =
                    response.ok_or(HandshakeError::MissingResponse { step: 1 })?;
                self.process_response1(response)?;
                self.state = State::Done;
                Ok(None)
            }
            State::Done => Err(SessionError::HandshakeComplete.into()),
        }
    }

    fn encrypt(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        if self.state != State::Done {
            return Err(SessionError::NotEstablished.into());
        }
        match self.cipher.as_mut() {
            Some(cipher) => Ok(cipher.apply(data)),
            None => Err(SessionError::NotEstablished.into()),
        }
    }

    fn decrypt(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        // Same keystream as encrypt: CTR is its own inverse.
        self.encrypt(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use provlink_core::Error;

    fn response0(device: &EphemeralKeyPair, device_random: &[u8]) -> Vec<u8> {
        SessionData {
            sec_ver: SecSchemeVersion::SecScheme1 as i32,
            proto: Some(session_data::Proto::Sec1(Sec1Payload {
                msg: Sec1MsgType::SessionResponse0 as i32,
                payload: Some(sec1_payload::Payload::Sr0(crate::proto::SessionResp0 {
                    status: crate::proto::Status::Success as i32,
                    device_pubkey: device.public_key().to_vec(),
                    device_random: device_random.to_vec(),
                })),
            })),
        }
        .encode_to_vec()
    }

    #[test]
    fn command0_carries_client_public_key() {
        let mut security = KeyAgreement::with_secret(None, &[0x11u8; 32]);
        let request = security.next_request(None).unwrap().unwrap();

        let envelope = SessionData::decode(request.as_slice()).unwrap();
        assert_eq!(envelope.sec_ver, 1);
        match envelope.proto {
            Some(session_data::Proto::Sec1(Sec1Payload {
                payload: Some(sec1_payload::Payload::Sc0(cmd)),
                ..
            })) => assert_eq!(cmd.client_pubkey, security.public_key.to_vec()),
            _ => panic!("expected session command 0"),
        }
    }

    #[test]
    fn rejects_device_public_key_of_wrong_length() {
        let mut security = KeyAgreement::with_secret(None, &[0x11u8; 32]);
        security.next_request(None).unwrap();

        let bad = SessionData {
            sec_ver: SecSchemeVersion::SecScheme1 as i32,
            proto: Some(session_data::Proto::Sec1(Sec1Payload {
                msg: Sec1MsgType::SessionResponse0 as i32,
                payload: Some(sec1_payload::Payload::Sr0(crate::proto::SessionResp0 {
                    status: 0,
                    device_pubkey: vec![0xAB; 16],
                    device_random: vec![0u8; 16],
                })),
            })),
        }
        .encode_to_vec();

        let result = security.next_request(Some(&bad));
        assert!(matches!(
            result,
            Err(Error::Handshake(HandshakeError::Protocol(_)))
        ));
    }

    #[test]
    fn rejects_scheme_mismatch_in_response() {
        let mut security = KeyAgreement::with_secret(None, &[0x11u8; 32]);
        security.next_request(None).unwrap();

        let wrong_scheme = SessionData {
            sec_ver: SecSchemeVersion::SecScheme0 as i32,
            proto: None,
        }
        .encode_to_vec();

        let result = security.next_request(Some(&wrong_scheme));
        assert!(matches!(
            result,
            Err(Error::Handshake(HandshakeError::SchemeMismatch { .. }))
        ));
    }

    #[test]
    fn encrypt_before_handshake_completion_fails() {
        let mut security = KeyAgreement::with_secret(None, &[0x11u8; 32]);
        let result = security.encrypt(b"too early");
        assert!(matches!(
            result,
            Err(Error::Session(SessionError::NotEstablished))
        ));
    }

    #[test]
    fn zero_device_public_key_is_rejected() {
        let mut security = KeyAgreement::with_secret(None, &[0x11u8; 32]);
        security.next_request(None).unwrap();

        let bad = SessionData {
            sec_ver: SecSchemeVersion::SecScheme1 as i32,
            proto: Some(session_data::Proto::Sec1(Sec1Payload {
                msg: Sec1MsgType::SessionResponse0 as i32,
                payload: Some(sec1_payload::Payload::Sr0(crate::proto::SessionResp0 {
                    status: 0,
                    device_pubkey: vec![0u8; 32],
                    device_random: vec![0x33u8; 16],
                })),
            })),
        }
        .encode_to_vec();

        let result = security.next_request(Some(&bad));
        assert!(matches!(
            result,
            Err(Error::Keygen(KeygenError::InvalidPeerKey))
        ));
    }

    #[test]
    fn handshake_bytes_match_fixed_vector() {
        // Secrets 0x11/0x22, PoP "abc123", device random 0x33: the command
        // bytes are pinned against an independently computed reference, so
        // a drift in the secret derivation or keystream setup fails here
        // even when both ends of a round trip drift together.
        let device = EphemeralKeyPair::from_secret(&[0x22u8; 32]);
        let device_random = [0x33u8; 16];
        let mut security = KeyAgreement::with_secret(Some("abc123"), &[0x11u8; 32]);

        let cmd0 = security.next_request(None).unwrap().unwrap();
        let envelope = SessionData::decode(cmd0.as_slice()).unwrap();
        match envelope.proto {
            Some(session_data::Proto::Sec1(Sec1Payload {
                payload: Some(sec1_payload::Payload::Sc0(cmd)),
                ..
            })) => assert_eq!(
                hex::encode(&cmd.client_pubkey),
                "7b4e909bbe7ffe44c465a220037d608ee35897d31ef972f07f74892cb0f73f13"
            ),
            _ => panic!("expected session command 0"),
        }

        let cmd1 = security
            .next_request(Some(&response0(&device, &device_random)))
            .unwrap()
            .unwrap();
        let envelope = SessionData::decode(cmd1.as_slice()).unwrap();
        match envelope.proto {
            Some(session_data::Proto::Sec1(Sec1Payload {
                payload: Some(sec1_payload::Payload::Sc1(cmd)),
                ..
            })) => assert_eq!(
                hex::encode(&cmd.client_verify_data),
                "3874feb2dd10c6832f36a443dd03c5af5acc1b8020453fca406170ca75930f16"
            ),
            _ => panic!("expected session command 1"),
        }
    }

    #[test]
    fn verify_data_matches_independent_derivation() {
        let client_secret = [0x11u8; 32];
        let device = EphemeralKeyPair::from_secret(&[0x22u8; 32]);
        let device_random = [0x33u8; 16];

        let mut security = KeyAgreement::with_secret(Some("abc123"), &client_secret);
        security.next_request(None).unwrap();
        let request = security
            .next_request(Some(&response0(&device, &device_random)))
            .unwrap()
            .unwrap();

        // Recompute the expected verify data from the raw primitives
        let shared = EphemeralKeyPair::from_secret(&client_secret)
            .diffie_hellman(&device.public_key())
            .unwrap();
        let mut secret = SharedSecret::new(shared.to_vec());
        secret.xor_with(&Sha256::digest(b"abc123"));
        let mut cipher = CtrCipher::new(secret.as_bytes(), &device_random).unwrap();
        let expected_verify = cipher.apply(&device.public_key());

        let envelope = SessionData::decode(request.as_slice()).unwrap();
        match envelope.proto {
            Some(session_data::Proto::Sec1(Sec1Payload {
                payload: Some(sec1_payload::Payload::Sc1(cmd)),
                ..
            })) => assert_eq!(cmd.client_verify_data, expected_verify),
            _ => panic!("expected session command 1"),
        }
    }

    #[test]
    fn key_mismatch_detected_in_verify_round() {
        let device = EphemeralKeyPair::from_secret(&[0x22u8; 32]);
        let device_random = [0x33u8; 16];

        let mut security = KeyAgreement::with_secret(None, &[0x11u8; 32]);
        security.next_request(None).unwrap();
        security
            .next_request(Some(&response0(&device, &device_random)))
            .unwrap();

        // Garbage verify data cannot decrypt to the client's public key
        let bad = SessionData {
            sec_ver: SecSchemeVersion::SecScheme1 as i32,
            proto: Some(session_data::Proto::Sec1(Sec1Payload {
                msg: Sec1MsgType::SessionResponse1 as i32,
                payload: Some(sec1_payload::Payload::Sr1(crate::proto::SessionResp1 {
                    status: 0,
                    device_verify_data: vec![0u8; 32],
                })),
            })),
        }
        .encode_to_vec();

        let result = security.next_request(Some(&bad));
        assert!(matches!(
            result,
            Err(Error::Handshake(HandshakeError::KeyMismatch))
        ));
    }
}
