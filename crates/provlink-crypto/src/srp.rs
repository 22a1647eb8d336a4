//! SRP-6a client engine for password-authenticated pairing.
//!
//! Uses the 3072-bit prime from RFC 5054, generator g=5, SHA-512. Value
//! serialization follows the firmware's convention: A, B and S are hashed
//! as minimal big-endian byte strings (no leading-zero padding), g is
//! padded to the modulus width only inside the multiplier k, and the
//! client proof hashes the raw single-byte generator.

use num_bigint::{BigUint, RandBigInt};
use provlink_core::error::SrpError;
use rand::rngs::OsRng;
use sha2::{Digest, Sha512};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// N size in bytes (3072 bits = 384 bytes).
const N_BYTES: usize = 384;

/// RFC 5054 3072-bit prime N as hex string.
const RFC5054_N_3072: &str = concat!(
    "FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD129024E08",
    "8A67CC74020BBEA63B139B22514A08798E3404DDEF9519B3CD3A431B",
    "302B0A6DF25F14374FE1356D6D51C245E485B576625E7EC6F44C42E9",
    "A637ED6B0BFF5CB6F406B7EDEE386BFB5A899FA5AE9F24117C4B1FE6",
    "49286651ECE45B3DC2007CB8A163BF0598DA48361C55D39A69163FA8",
    "FD24CF5F83655D23DCA3AD961C62F356208552BB9ED529077096966D",
    "670C354E4ABC9804F1746C08CA18217C32905E462E36CE3BE39E772C",
    "180E86039B2783A2EC07A28FB5C55DF06F4C52C9DE2BCBF695581718",
    "3995497CEA956AE515D2261898FA051015728E5A8AAAC42DAD33170D",
    "04507A33A85521ABDF1CBA64ECFB850458DBEF0A8AEA71575D060C7D",
    "B3970F85A6E1E4C7ABF5AE8CDB0933D71E8C94E04A25619DCEE3D226",
    "1AD2EE6BF12FFA06D98A0864D87602733EC86A64521F2B18177B200C",
    "BBE117577A615D6C770988C0BAD946E208E24FA074E5AB3143DB5BFC",
    "E0FD108E4B82D120A93AD2CAFFFFFFFFFFFFFFFF"
);

/// SRP-6a group parameters (3072-bit, RFC 5054).
pub struct SrpParams {
    /// Prime modulus N.
    pub n: BigUint,
    /// Generator g (always 5).
    pub g: BigUint,
}

impl Default for SrpParams {
    fn default() -> Self {
        let n = BigUint::parse_bytes(RFC5054_N_3072.as_bytes(), 16)
            .expect("Invalid RFC 5054 prime constant");
        let g = BigUint::from(5u32);
        Self { n, g }
    }
}

/// Client-side SRP state machine.
///
/// One instance covers one authentication attempt: a fresh 256-bit private
/// exponent is drawn at construction and the public key never changes after
/// that. The session key becomes readable only once `verify_session` has
/// accepted the device's proof.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SrpClient {
    #[zeroize(skip)]
    params: SrpParams,
    username: String,
    password: String,
    private_key: Vec<u8>,
    #[zeroize(skip)]
    public_key: BigUint,
    session_key: Option<Vec<u8>>,
    expected_proof: Option<Vec<u8>>,
    authenticated: bool,
}

impl SrpClient {
    /// Create a new SRP client for the given account.
    pub fn new(username: &str, password: &str) -> Self {
        let params = SrpParams::default();

        // Private exponent a (256 bits), fresh per session
        let a = OsRng.gen_biguint(256);
        let private_key = a.to_bytes_be();

        // A = g^a mod N
        let public_key = params.g.modpow(&a, &params.n);

        Self {
            params,
            username: username.to_string(),
            password: password.to_string(),
            private_key,
            public_key,
            session_key: None,
            expected_proof: None,
            authenticated: false,
        }
    }

    /// Create an SRP client with a specific private exponent (for testing).
    #[cfg(test)]
    pub fn with_private_key(username: &str, password: &str, private_key: &[u8]) -> Self {
        let params = SrpParams::default();
        let a = BigUint::from_bytes_be(private_key);
        let public_key = params.g.modpow(&a, &params.n);

        Self {
            params,
            username: username.to_string(),
            password: password.to_string(),
            private_key: private_key.to_vec(),
            public_key,
            session_key: None,
            expected_proof: None,
            authenticated: false,
        }
    }

    /// Start authentication: the username and public key A to send first.
    ///
    /// A is serialized without leading-zero padding.
    pub fn start_authentication(&self) -> (String, Vec<u8>) {
        (self.username.clone(), self.public_key.to_bytes_be())
    }

    /// Process the device's challenge (salt and public key B).
    ///
    /// Derives the shared secret, stores the expected device proof for
    /// `verify_session`, and returns the client proof M together with the
    /// 32-byte symmetric key (the leading half of K).
    pub fn process_challenge(
        &mut self,
        salt: &[u8],
        server_public_key: &[u8],
    ) -> Result<(Vec<u8>, [u8; 32]), SrpError> {
        let n = &self.params.n;
        let b = BigUint::from_bytes_be(server_public_key);

        if &b % n == BigUint::ZERO {
            return Err(SrpError::InvalidPublicKey);
        }

        let a = BigUint::from_bytes_be(&self.private_key);
        let a_bytes = self.public_key.to_bytes_be();

        let u = compute_u(&a_bytes, server_public_key);
        let k = compute_k(&self.params);
        let x = compute_x(salt, &self.username, &self.password);

        // v = g^x mod N
        let v = self.params.g.modpow(&x, n);

        // S = (B + N - (k*v mod N))^(a + u*x) mod N. Adding N keeps the
        // base positive when B < k*v; the exponent is used unreduced.
        let base = &b + n - (&k * &v) % n;
        let exponent = &a + &u * &x;
        let s = base.modpow(&exponent, n);

        // K = H(S), unpadded
        let session_key = Sha512::digest(s.to_bytes_be()).to_vec();
        let mut symmetric_key = [0u8; 32];
        symmetric_key.copy_from_slice(&session_key[..32]);

        let client_proof = compute_m(
            &self.params,
            &self.username,
            salt,
            &a_bytes,
            server_public_key,
            &session_key,
        );
        let expected_proof = compute_hamk(&a_bytes, &client_proof, &session_key);

        self.session_key = Some(session_key);
        self.expected_proof = Some(expected_proof);

        Ok((client_proof, symmetric_key))
    }

    /// Verify the device's key proof (HAMK) and finalize authentication.
    pub fn verify_session(&mut self, key_proof: &[u8]) -> Result<(), SrpError> {
        let expected = self
            .expected_proof
            .as_ref()
            .ok_or(SrpError::MissingChallenge)?;

        if !bool::from(expected.ct_eq(key_proof)) {
            return Err(SrpError::KeyProofMismatch);
        }

        self.authenticated = true;
        Ok(())
    }

    /// Whether the device has proven knowledge of the same session key.
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// The 64-byte session key K, available only after authentication.
    pub fn session_key(&self) -> Option<&[u8]> {
        if self.authenticated {
            self.session_key.as_deref()
        } else {
            None
        }
    }
}

/// Pad a value's big-endian bytes to N_BYTES with leading zeros.
fn pad_to_n(value: &BigUint) -> Vec<u8> {
    let bytes = value.to_bytes_be();
    if bytes.len() >= N_BYTES {
        bytes[bytes.len() - N_BYTES..].to_vec()
    } else {
        let mut padded = vec![0u8; N_BYTES - bytes.len()];
        padded.extend_from_slice(&bytes);
        padded
    }
}

/// Compute u = SHA512(A || B) over the raw exchanged bytes.
fn compute_u(a_bytes: &[u8], b_bytes: &[u8]) -> BigUint {
    let mut hasher = Sha512::new();
    hasher.update(a_bytes);
    hasher.update(b_bytes);
    BigUint::from_bytes_be(&hasher.finalize())
}

/// Compute k = SHA512(N || PAD(g)).
fn compute_k(params: &SrpParams) -> BigUint {
    let mut hasher = Sha512::new();
    hasher.update(params.n.to_bytes_be());
    hasher.update(pad_to_n(&params.g));
    BigUint::from_bytes_be(&hasher.finalize())
}

/// Compute x = SHA512(salt || SHA512(username || ":" || password)).
fn compute_x(salt: &[u8], username: &str, password: &str) -> BigUint {
    let mut hasher = Sha512::new();
    hasher.update(username.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    let inner = hasher.finalize();

    let mut hasher = Sha512::new();
    hasher.update(salt);
    hasher.update(inner);
    BigUint::from_bytes_be(&hasher.finalize())
}

/// Compute M = H(H(N) XOR H(g) || H(username) || salt || A || B || K).
///
/// H(g) is over the raw generator byte, and A and B are the raw exchanged
/// bytes; only this exact serialization matches the device's proof.
fn compute_m(
    params: &SrpParams,
    username: &str,
    salt: &[u8],
    a_bytes: &[u8],
    b_bytes: &[u8],
    k: &[u8],
) -> Vec<u8> {
    let h_n = Sha512::digest(params.n.to_bytes_be());
    let h_g = Sha512::digest(params.g.to_bytes_be());

    let mut xor_result = [0u8; 64];
    for i in 0..64 {
        xor_result[i] = h_n[i] ^ h_g[i];
    }

    let h_i = Sha512::digest(username.as_bytes());

    let mut hasher = Sha512::new();
    hasher.update(xor_result);
    hasher.update(h_i);
    hasher.update(salt);
    hasher.update(a_bytes);
    hasher.update(b_bytes);
    hasher.update(k);
    hasher.finalize().to_vec()
}

/// Compute HAMK = H(A || M || K).
fn compute_hamk(a_bytes: &[u8], m: &[u8], k: &[u8]) -> Vec<u8> {
    let mut hasher = Sha512::new();
    hasher.update(a_bytes);
    hasher.update(m);
    hasher.update(k);
    hasher.finalize().to_vec()
}
