//! Session orchestrator: drives a security variant over a transport.

use provlink_core::config::{SecurityConfig, SecurityScheme};
use provlink_core::error::{Result, SessionError};
use tracing::{debug, warn};

use crate::security::{self, Security};
use crate::transport::Transport;

/// A session with one device: a security variant plus the transport that
/// reaches it.
///
/// `establish` pumps the variant's handshake with exactly one outstanding
/// request at a time. After it returns, the variant is retained as the
/// encrypt/decrypt provider for configuration traffic. A session that
/// failed to establish must be dropped and rebuilt; the ephemeral key
/// material inside the variant is single-use.
pub struct Session<T: Transport> {
    transport: T,
    security: Box<dyn Security>,
    established: bool,
}

impl<T: Transport> Session<T> {
    /// Create a session for the configured security scheme.
    pub fn new(transport: T, config: &SecurityConfig) -> Self {
        Self {
            transport,
            security: security::from_config(config),
            established: false,
        }
    }

    /// The scheme this session negotiates.
    pub fn scheme(&self) -> SecurityScheme {
        self.security.scheme()
    }

    /// Whether the handshake has completed successfully.
    pub fn is_established(&self) -> bool {
        self.established
    }

    /// Run the handshake to completion.
    ///
    /// Any transport or handshake error aborts immediately; cryptographic
    /// failures are never retried with the same key material.
    pub async fn establish(&mut self) -> Result<()> {
        self.establish_with(None).await
    }

    /// Run the handshake, seeding the first step with a response already in
    /// hand.
    ///
    /// Some transports receive session data while the connection is being
    /// set up; passing it here hands it to the security variant's first
    /// step instead of discarding it.
    pub async fn establish_with(&mut self, prior_response: Option<&[u8]>) -> Result<()> {
        if self.established {
            return Err(SessionError::InvalidState(
                "Session already established".to_string(),
            )
            .into());
        }

        debug!(scheme = %self.scheme(), "establishing session");
        let mut response: Option<Vec<u8>> = prior_response.map(<[u8]>::to_vec);
        loop {
            match self.security.next_request(response.as_deref())? {
                Some(request) => {
                    let reply = match self.transport.send_session_data(&request).await {
                        Ok(reply) => reply,
                        Err(e) => {
                            warn!(scheme = %self.scheme(), "session handshake aborted: {}", e);
                            return Err(e);
                        }
                    };
                    response = Some(reply);
                }
                None => {
                    debug!(scheme = %self.scheme(), "session established");
                    self.established = true;
                    return Ok(());
                }
            }
        }
    }

    /// Encrypt outgoing data under the established session.
    pub fn encrypt(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        if !self.established {
            return Err(SessionError::NotEstablished.into());
        }
        self.security.encrypt(data)
    }

    /// Decrypt incoming data under the established session.
    pub fn decrypt(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        if !self.established {
            return Err(SessionError::NotEstablished.into());
        }
        self.security.decrypt(data)
    }

    /// Send configuration data to an endpoint and decrypt the reply.
    pub async fn send_config_data(&mut self, path: &str, data: &[u8]) -> Result<Vec<u8>> {
        if !self.established {
            return Err(SessionError::NotEstablished.into());
        }
        let payload = self.security.encrypt(data)?;
        let reply = self.transport.send_config_data(path, &payload).await?;
        self.security.decrypt(&reply)
    }

    /// Tear down the transport connection.
    pub async fn disconnect(&mut self) -> Result<()> {
        self.transport.disconnect().await
    }
}
