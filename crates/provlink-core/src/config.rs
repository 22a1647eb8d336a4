//! Security scheme selection and session construction parameters.

/// Security scheme negotiated with the device.
///
/// The scheme is fixed for the lifetime of a session and must match the
/// scheme the device firmware was built with; the handshake fails on a
/// mismatched scheme tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityScheme {
    /// No confidentiality; plaintext passthrough after an empty handshake.
    Unsecured,
    /// X25519 key agreement with an optional proof-of-possession secret.
    KeyAgreement,
    /// SRP6a password-authenticated key exchange with AES-GCM.
    PasswordAuth,
}

impl SecurityScheme {
    /// Wire tag carried in the session envelope.
    pub fn wire_value(self) -> i32 {
        match self {
            SecurityScheme::Unsecured => 0,
            SecurityScheme::KeyAgreement => 1,
            SecurityScheme::PasswordAuth => 2,
        }
    }
}

impl std::fmt::Display for SecurityScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecurityScheme::Unsecured => write!(f, "unsecured"),
            SecurityScheme::KeyAgreement => write!(f, "key-agreement"),
            SecurityScheme::PasswordAuth => write!(f, "password-auth"),
        }
    }
}

/// Construction parameters for a session's security layer.
///
/// Credentials live here only until the security variant is built; the
/// variant copies them into zeroizing storage.
#[derive(Clone)]
pub enum SecurityConfig {
    /// Plaintext session.
    Unsecured,
    /// Key-agreement pairing, optionally strengthened with an out-of-band
    /// proof-of-possession secret.
    KeyAgreement {
        proof_of_possession: Option<String>,
    },
    /// SRP6a login. `use_counter_nonce` selects the per-message counter
    /// nonce; the fixed-nonce fallback exists only for old firmware and
    /// reuses one AEAD nonce for the whole session.
    PasswordAuth {
        username: String,
        password: String,
        use_counter_nonce: bool,
    },
}

impl SecurityConfig {
    /// Scheme tag this configuration negotiates.
    pub fn scheme(&self) -> SecurityScheme {
        match self {
            SecurityConfig::Unsecured => SecurityScheme::Unsecured,
            SecurityConfig::KeyAgreement { .. } => SecurityScheme::KeyAgreement,
            SecurityConfig::PasswordAuth { .. } => SecurityScheme::PasswordAuth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_values_match_firmware_tags() {
        assert_eq!(SecurityScheme::Unsecured.wire_value(), 0);
        assert_eq!(SecurityScheme::KeyAgreement.wire_value(), 1);
        assert_eq!(SecurityScheme::PasswordAuth.wire_value(), 2);
    }

    #[test]
    fn config_reports_matching_scheme() {
        let config = SecurityConfig::PasswordAuth {
            username: "wifiprov".to_string(),
            password: "abcd1234".to_string(),
            use_counter_nonce: true,
        };
        assert_eq!(config.scheme(), SecurityScheme::PasswordAuth);

        let config = SecurityConfig::KeyAgreement {
            proof_of_possession: Some("abc123".to_string()),
        };
        assert_eq!(config.scheme(), SecurityScheme::KeyAgreement);

        assert_eq!(SecurityConfig::Unsecured.scheme(), SecurityScheme::Unsecured);
    }
}
