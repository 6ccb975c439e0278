use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::RngCore;
use sha1::Digest;
use sha1::Sha1;

use crate::error::{Error, Result};
use crate::util::rc4::Rc4;

pub const CHALLENGE_LEN: usize = 32;

const SHARED_KEY_CHALLENGE: &[u8] = b"evenmoresecret!!";

/// Source of challenge bytes. Injected into a session so handshakes can be
/// driven deterministically in tests.
pub trait ChallengeSource: Send + Sync {
    fn fill_challenge(&self, buf: &mut [u8]);
}

/// Default source, backed by the thread-local CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRngChallengeSource;

impl ChallengeSource for ThreadRngChallengeSource {
    fn fill_challenge(&self, buf: &mut [u8]) {
        rand::thread_rng().fill_bytes(buf);
    }
}

impl<F> ChallengeSource for F
where
    F: Fn(&mut [u8]) + Send + Sync,
{
    fn fill_challenge(&self, buf: &mut [u8]) {
        self(buf)
    }
}

/// Fresh random bytes for one handshake attempt. Dropped once the handshake ends.
pub struct Challenge([u8; CHALLENGE_LEN]);

impl Challenge {
    pub fn generate(source: &dyn ChallengeSource) -> Self {
        let mut bytes = [0u8; CHALLENGE_LEN];
        source.fill_challenge(&mut bytes);
        Challenge(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }
}

pub struct Auth;

impl Auth {
    /// The value a genuine device answers the login challenge with:
    /// hex(SHA1(RC4(shared key ^ mac, challenge))).
    pub fn make_challenge_response(challenge: &[u8], mac_address: &str) -> Result<String> {
        let derived_key = Self::derive_key(SHARED_KEY_CHALLENGE, mac_address)?;
        let mut rc4_cipher = Rc4::new(&derived_key)
            .ok_or_else(|| Error::InvalidArgument("derived key has invalid length".into()))?;
        let mut encrypted_challenge = challenge.to_vec();
        rc4_cipher.apply_keystream(&mut encrypted_challenge);

        let mut hasher = Sha1::new();
        hasher.update(&encrypted_challenge);
        Ok(hex::encode(hasher.finalize()))
    }

    /// Parses `aa:bb:cc:dd:ee:ff` into its six bytes.
    pub fn mac_to_bytes(mac: &str) -> Result<Vec<u8>> {
        let invalid = || Error::InvalidArgument(format!("invalid hardware address: {:?}", mac));
        let bytes = mac
            .split(':')
            .map(|part| {
                if part.len() != 2 {
                    return Err(invalid());
                }
                u8::from_str_radix(part, 16).map_err(|_| invalid())
            })
            .collect::<Result<Vec<u8>>>()?;
        if bytes.len() != 6 {
            return Err(invalid());
        }
        Ok(bytes)
    }

    pub fn derive_key(shared_key: &[u8], mac_address: &str) -> Result<Vec<u8>> {
        let mac_bytes = Self::mac_to_bytes(mac_address)?;
        Ok(shared_key
            .iter()
            .enumerate()
            .map(|(i, &byte)| byte ^ mac_bytes[i % mac_bytes.len()])
            .collect())
    }
}
