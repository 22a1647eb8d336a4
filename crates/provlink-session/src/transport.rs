//! Transport abstraction for talking to the device.

use async_trait::async_trait;
use provlink_core::error::Result;

/// Transport over which handshake and configuration frames travel.
///
/// Implementations wrap whatever carrier reaches the device (BLE
/// characteristics, HTTP endpoints). Each send is a full request/response
/// exchange; the session layer never has more than one request in flight.
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait Transport: Send + Sync {
    /// Send a handshake frame to the session endpoint.
    async fn send_session_data(&mut self, data: &[u8]) -> Result<Vec<u8>>;

    /// Send an encrypted configuration frame to the named endpoint.
    async fn send_config_data(&mut self, path: &str, data: &[u8]) -> Result<Vec<u8>>;

    /// Whether the device reports itself as already provisioned.
    fn is_configured(&self) -> bool;

    /// Tear down the connection to the device.
    async fn disconnect(&mut self) -> Result<()>;
}
