//! The security variant trait and scheme-driven construction.

use provlink_core::config::{SecurityConfig, SecurityScheme};
use provlink_core::error::{HandshakeError, Result};

use crate::key_agreement::KeyAgreement;
use crate::password_auth::PasswordAuth;
use crate::proto::SessionData;
use crate::unsecured::Unsecured;

/// One security variant driving its handshake and the session traffic after.
///
/// The handshake is pumped through `next_request`: pass the device's last
/// response (or `None` for the opening step) and send whatever comes back.
/// `Ok(None)` means the handshake is complete and `encrypt`/`decrypt` are
/// live. A variant that has failed must be discarded, never pumped again.
pub trait Security: Send {
    /// The scheme this variant negotiates.
    fn scheme(&self) -> SecurityScheme;

    /// Produce the next handshake request, or `None` when done.
    fn next_request(&mut self, response: Option<&[u8]>) -> Result<Option<Vec<u8>>>;

    /// Encrypt outgoing data under the established session.
    fn encrypt(&mut self, data: &[u8]) -> Result<Vec<u8>>;

    /// Decrypt incoming data under the established session.
    fn decrypt(&mut self, data: &[u8]) -> Result<Vec<u8>>;
}

/// Build the security variant selected by the configuration.
pub fn from_config(config: &SecurityConfig) -> Box<dyn Security> {
    match config {
        SecurityConfig::Unsecured => Box::new(Unsecured::new()),
        SecurityConfig::KeyAgreement {
            proof_of_possession,
        } => Box::new(KeyAgreement::new(proof_of_possession.as_deref())),
        SecurityConfig::PasswordAuth {
            username,
            password,
            use_counter_nonce,
        } => Box::new(PasswordAuth::new(username, password, *use_counter_nonce)),
    }
}

/// Decode a session envelope and check its scheme tag.
pub(crate) fn decode_envelope(data: &[u8], expected: SecurityScheme) -> Result<SessionData> {
    use prost::Message;

    let envelope =
        SessionData::decode(data).map_err(|e| HandshakeError::Decode(e.to_string()))?;
    if envelope.sec_ver != expected.wire_value() {
        return Err(HandshakeError::SchemeMismatch {
            expected,
            actual: envelope.sec_ver,
        }
        .into());
    }
    Ok(envelope)
}

/// Fail if the device reported a non-success status for a handshake step.
pub(crate) fn check_status(status: i32, step: &str) -> Result<()> {
    use crate::proto::Status;

    if status != Status::Success as i32 {
        return Err(HandshakeError::Protocol(format!(
            "Device rejected {} with status {}",
            step, status
        ))
        .into());
    }
    Ok(())
}
