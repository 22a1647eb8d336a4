//! Scheme 0: plaintext session with a one-round handshake.

use prost::Message;
use provlink_core::config::SecurityScheme;
use provlink_core::error::{HandshakeError, Result, SessionError};
use tracing::debug;

use crate::proto::{
    sec0_payload, session_data, S0SessionCmd, Sec0MsgType, Sec0Payload, SecSchemeVersion,
    SessionData,
};
use crate::security::{check_status, decode_envelope, Security};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Command,
    Response,
    Done,
}

/// No-op security: the handshake only confirms the device accepts scheme 0,
/// and encrypt/decrypt pass data through unchanged.
pub struct Unsecured {
    state: State,
}

impl Unsecured {
    pub fn new() -> Self {
        Self {
            state: State::Command,
        }
    }
}

impl Default for Unsecured {
    fn default() -> Self {
        Self::new()
    }
}

impl Security for Unsecured {
    fn scheme(&self) -> SecurityScheme {
        SecurityScheme::Unsecured
    }

    fn next_request(&mut self, response: Option<&[u8]>) -> Result<Option<Vec<u8>>> {
        match self.state {
            State::Command => {
                debug!("unsecured handshake: sending command 0");
                let envelope = SessionData {
                    sec_ver: SecSchemeVersion::SecScheme0 as i32,
                    proto: Some(session_data::Proto::Sec0(Sec0Payload {
                        msg: Sec0MsgType::S0SessionCommand as i32,
                        payload: Some(sec0_payload::Payload::Sc(S0SessionCmd {})),
                    })),
                };
                self.state = State::Response;
                Ok(Some(envelope.encode_to_vec()))
            }
            State::Response => {
                let response =
                    response.ok_or(HandshakeError::MissingResponse { step: 0 })?;
                let envelope = decode_envelope(response, SecurityScheme::Unsecured)?;

                let resp = match envelope.proto {
                    Some(session_data::Proto::Sec0(Sec0Payload {
                        payload: Some(sec0_payload::Payload::Sr(resp)),
                        ..
                    })) => resp,
                    _ => {
                        return Err(HandshakeError::Protocol(
                            "Expected scheme 0 session response".to_string(),
                        )
                        .into())
                    }
                };
                check_status(resp.status, "session command")?;

                debug!("unsecured handshake complete");
                self.state = State::Done;
                Ok(None)
            }
            State::Done => Err(SessionError::HandshakeComplete.into()),
        }
    }

    fn encrypt(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn decrypt(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }
}
