use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use uuid::Uuid;

use crate::domain::EmailAddress;

use super::SigningKey;

/// Opaque membership-card serial number.
///
/// Derived by keying the server HMAC over the member's normalized email, then
/// truncating to 128 bits. The same member always maps to the same serial, so
/// re-issuing a card never invalidates passes already in circulation, while
/// the value stays unguessable without the key. Independent of any database
/// row id. Rendered as 32 hex characters.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct CardSerial(Uuid);

impl CardSerial {
    pub fn derive(key: &SigningKey, email: &EmailAddress) -> Self {
        let mac = key.sign(email.as_ref().as_bytes());

        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&mac[..16]);

        Self(Uuid::from_bytes(bytes))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for CardSerial {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Display for CardSerial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.simple().fmt(f)
    }
}

impl FromStr for CardSerial {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let uuid =
            Uuid::parse_str(value.trim()).map_err(|_| "Malformed serial number".to_string())?;

        Ok(Self(uuid))
    }
}
