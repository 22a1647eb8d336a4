//! # provlink-session
//!
//! Session establishment with a provisioning-mode device: the protobuf wire
//! envelope, the three security variants (unsecured, X25519 key agreement,
//! SRP6a password authentication) behind one trait, the async transport
//! abstraction, and the orchestrator that pumps the handshake and carries
//! configuration traffic afterwards.

pub mod key_agreement;
pub mod password_auth;
pub mod proto;
pub mod security;
pub mod session;
pub mod transport;
pub mod unsecured;

pub use key_agreement::KeyAgreement;
pub use password_auth::PasswordAuth;
pub use security::{from_config, Security};
pub use session::Session;
pub use transport::Transport;
pub use unsecured::Unsecured;
