use std::fmt;
use std::str::FromStr;

use base64::{
    alphabet,
    engine::{self, general_purpose},
    Engine as _,
};

use super::{CardSerial, SigningKey};

lazy_static::lazy_static! {
    // Base64 engine for URL-embedded signatures
    static ref BASE64_ENGINE: engine::GeneralPurpose =
        engine::GeneralPurpose::new(&alphabet::URL_SAFE, general_purpose::NO_PAD);
}

/// URL-safe signature over a card serial.
///
/// A pure function of (key, serial) — no timestamps, no nonces — so a QR
/// payload printed years ago verifies until the key rotates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardSignature(String);

impl CardSignature {
    /// Sign `serial` with the server key
    pub fn over(key: &SigningKey, serial: &CardSerial) -> Self {
        let tag = key.sign(serial.to_string().as_bytes());

        Self(BASE64_ENGINE.encode(tag))
    }

    /// Check a presented signature string against `serial`.
    ///
    /// Tag comparison is constant-time; malformed encodings are rejected the
    /// same way as mismatched tags.
    pub fn verify(key: &SigningKey, serial: &CardSerial, presented: &str) -> bool {
        match BASE64_ENGINE.decode(presented) {
            Ok(tag) => key.verify(serial.to_string().as_bytes(), &tag),
            Err(_) => false,
        }
    }
}

impl AsRef<str> for CardSignature {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CardSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for CardSignature {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.is_empty() {
            return Err("Signature cannot be empty".into());
        }
        Ok(Self(value.to_string()))
    }
}
