//! # provlink-core
//!
//! Shared vocabulary for the provlink provisioning client:
//! - the error taxonomy used across all crates
//! - the security scheme tag negotiated with the device
//! - session construction parameters

pub mod config;
pub mod error;

pub use config::{SecurityConfig, SecurityScheme};
pub use error::{Error, Result};
