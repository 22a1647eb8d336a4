//! Scheme 2: SRP6a password authentication with AES-256-GCM traffic keys.
//!
//! Two rounds. The client opens with its username and SRP public key A;
//! the device answers with the account salt and its public key B. The
//! client derives the shared secret, sends its key proof M, and the device
//! answers with its own proof plus the AEAD nonce. Only after the device's
//! proof verifies does the session key become usable; traffic is then
//! sealed with AES-256-GCM keyed by the leading 32 bytes of K.

use prost::Message;
use provlink_core::config::SecurityScheme;
use provlink_core::error::{HandshakeError, Result, SessionError};
use provlink_crypto::{AeadCipher, SrpClient};
use tracing::debug;
use zeroize::Zeroizing;

use crate::proto::{
    sec2_payload, session_data, S2SessionCmd0, S2SessionCmd1, Sec2MsgType, Sec2Payload,
    SecSchemeVersion, SessionData,
};
use crate::security::{check_status, decode_envelope, Security};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Command0,
    Response0,
    Response1,
    Done,
}

/// Password-authentication security variant (client side).
pub struct PasswordAuth {
    state: State,
    srp: SrpClient,
    use_counter_nonce: bool,
    client_proof: Option<Vec<u8>>,
    symmetric_key: Option<Zeroizing<[u8; 32]>>,
    cipher: Option<AeadCipher>,
}

impl PasswordAuth {
    /// Create a variant for the given account.
    ///
    /// `use_counter_nonce` selects the per-message counter nonce; when
    /// false the device nonce is reused for every message, which is a known
    /// AEAD misuse kept only for firmware that predates the counter scheme.
    pub fn new(username: &str, password: &str, use_counter_nonce: bool) -> Self {
        Self {
            state: State::Command0,
            srp: SrpClient::new(username, password),
            use_counter_nonce,
            client_proof: None,
            symmetric_key: None,
            cipher: None,
        }
    }

    fn command0(&self) -> Vec<u8> {
        let (username, public_key) = self.srp.start_authentication();
        debug!(username = %username, "password auth: sending public key");
        SessionData {
            sec_ver: SecSchemeVersion::SecScheme2 as i32,
            proto: Some(session_data::Proto::Sec2(Sec2Payload {
                msg: Sec2MsgType::S2SessionCommand0 as i32,
                payload: Some(sec2_payload::Payload::Sc0(S2SessionCmd0 {
                    client_username: username.into_bytes(),
                    client_pubkey: public_key,
                })),
            })),
        }
        .encode_to_vec()
    }

    fn process_response0(&mut self, response: &[u8]) -> Result<Vec<u8>> {
        let envelope = decode_envelope(response, SecurityScheme::PasswordAuth)?;
        let resp = match envelope.proto {
            Some(session_data::Proto::Sec2(Sec2Payload {
                payload: Some(sec2_payload::Payload::Sr0(resp)),
                ..
            })) => resp,
            _ => {
                return Err(HandshakeError::Protocol(
                    "Expected scheme 2 session response 0".to_string(),
                )
                .into())
            }
        };
        check_status(resp.status, "session command 0")?;

        let (client_proof, symmetric_key) = self
            .srp
            .process_challenge(&resp.device_salt, &resp.device_pubkey)?;

        debug!("password auth: challenge processed, sending key proof");
        let request = SessionData {
            sec_ver: SecSchemeVersion::SecScheme2 as i32,
            proto: Some(session_data::Proto::Sec2(Sec2Payload {
                msg: Sec2MsgType::S2SessionCommand1 as i32,
                payload: Some(sec2_payload::Payload::Sc1(S2SessionCmd1 {
                    client_proof: client_proof.clone(),
                })),
            })),
        }
        .encode_to_vec();

        self.client_proof = Some(client_proof);
        self.symmetric_key = Some(Zeroizing::new(symmetric_key));
        Ok(request)
    }

    fn process_response1(&mut self, response: &[u8]) -> Result<()> {
        let envelope = decode_envelope(response, SecurityScheme::PasswordAuth)?;
        let resp = match envelope.proto {
            Some(session_data::Proto::Sec2(Sec2Payload {
                payload: Some(sec2_payload::Payload::Sr1(resp)),
                ..
            })) => resp,
            _ => {
                return Err(HandshakeError::Protocol(
                    "Expected scheme 2 session response 1".to_string(),
                )
                .into())
            }
        };
        check_status(resp.status, "session command 1")?;

        self.srp.verify_session(&resp.device_proof)?;
        if !self.srp.is_authenticated() {
            return Err(HandshakeError::AuthenticationFailed.into());
        }

        let key = self
            .symmetric_key
            .take()
            .ok_or_else(|| SessionError::InvalidState(
                "Proof response arrived before key derivation".to_string(),
            ))?;
        self.cipher = Some(AeadCipher::new(
            key.as_ref(),
            &resp.device_nonce,
            self.use_counter_nonce,
        )?);

        debug!("password auth handshake complete");
        Ok(())
    }
}

impl Security for PasswordAuth {
    fn scheme(&self) -> SecurityScheme {
        SecurityScheme::PasswordAuth
    }

    fn next_request(&mut self, response: Option<&[u8]>) -> Result<Option<Vec<u8>>> {
        match self.state {
            State::Command0 => {
                let request = self.command0();
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
            Some(cipher) => Ok(cipher.seal(data)?),
            None => Err(SessionError::NotEstablished.into()),
        }
    }

    fn decrypt(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        if self.state != State::Done {
            return Err(SessionError::NotEstablished.into());
        }
        match self.cipher.as_mut() {
            Some(cipher) => Ok(cipher.open(data)?),
            None => Err(SessionError::NotEstablished.into()),
        }
    }
}
