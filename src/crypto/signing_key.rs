use hmac::{Hmac, Mac};

use sha2::Sha256;

use secrecy::Secret;

/// Server-held HMAC-SHA256 key.
///
/// Used both to derive card serial numbers and to sign them for the
/// verification endpoint. Rotating the key invalidates every distributed
/// card and pass at once.
#[derive(Clone)]
pub struct SigningKey(Hmac<Sha256>);

impl SigningKey {
    pub fn new(key: &Secret<String>) -> anyhow::Result<Self> {
        use secrecy::ExposeSecret;

        let hmac = Hmac::new_from_slice(key.expose_secret().as_bytes())?;

        Ok(Self(hmac))
    }

    /// MAC over `msg`
    pub fn sign(&self, msg: &[u8]) -> Vec<u8> {
        self.0
            .clone()
            .chain_update(msg)
            .finalize()
            .into_bytes()
            .to_vec()
    }

    /// Constant-time check of `tag` against the MAC over `msg`
    pub fn verify(&self, msg: &[u8], tag: &[u8]) -> bool {
        self.0.clone().chain_update(msg).verify_slice(tag).is_ok()
    }
}
