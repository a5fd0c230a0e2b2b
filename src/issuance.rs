use chrono::Duration;

use thiserror::Error;

use url::Url;

use uuid::Uuid;

use crate::crypto::{CardSerial, CardSignature, SigningKey};
use crate::domain::EmailAddress;
use crate::model::{MembershipCard, MembershipHistory, User};
use crate::repo::Ledger;

#[derive(Debug, Error)]
pub enum IssuanceError {
    /// The account has no ledger rows to derive a card from
    #[error("no membership on record")]
    NoMembership,

    #[error("failed to parse account email: {0}")]
    BadEmail(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Derives membership cards from ledger state.
///
/// Every card attribute is a pure function of the signing key and the
/// member's ledger rows, so concurrent get-or-create calls converge on the
/// same values and the final row write is safe to repeat.
pub struct CardIssuer {
    key: SigningKey,
    validity: Duration,
    base_url: Url,
}

impl CardIssuer {
    pub fn new(key: SigningKey, validity: Duration, base_url: Url) -> Self {
        Self {
            key,
            validity,
            base_url,
        }
    }

    /// Per-order coverage window used when aggregating ledger rows
    pub fn validity(&self) -> Duration {
        self.validity
    }

    /// Stable serial for a member; re-issuing never invalidates passes
    /// already in circulation
    pub fn derive_serial(&self, email: &EmailAddress) -> CardSerial {
        CardSerial::derive(&self.key, email)
    }

    pub fn sign_serial(&self, serial: &CardSerial) -> CardSignature {
        CardSignature::over(&self.key, serial)
    }

    /// Out-of-band verification link for a card; doubles as the QR payload
    pub fn verification_url(&self, card: &MembershipCard) -> Url {
        let signature = self.sign_serial(&card.serial_number);

        let mut url = self.base_url.clone();
        url.set_path(&format!("/verify-pass/{}", card.serial_number));
        url.set_query(Some(&format!("signature={}", signature.as_ref())));
        url
    }

    /// Fetch the member's current card, recomputing it first if the ledger
    /// has moved underneath it.
    #[tracing::instrument(
        name = "Get or create membership card",
        skip_all,
        fields(user_id = %user.id)
    )]
    pub async fn get_or_create(
        &self,
        ledger: &impl Ledger,
        user: &User,
        history: &MembershipHistory,
    ) -> Result<MembershipCard, IssuanceError> {
        let member_since = history.member_since().ok_or(IssuanceError::NoMembership)?;
        let member_until = history.member_until().ok_or(IssuanceError::NoMembership)?;

        let email: EmailAddress = user.email.parse().map_err(IssuanceError::BadEmail)?;
        let serial_number = self.derive_serial(&email);

        let existing = ledger.find_card_by_user(user.id).await?;
        if let Some(card) = &existing {
            if card.serial_number == serial_number
                && card.member_since == member_since
                && card.member_until == member_until
            {
                return Ok(card.clone());
            }
        }

        let card = MembershipCard {
            id: existing
                .as_ref()
                .map(|card| card.id)
                .unwrap_or_else(Uuid::new_v4),
            user_id: user.id,
            serial_number,
            member_since,
            member_until,
            // Assigned once; wallet passes key off this serial for updates
            apple_pass_serial_number: existing
                .as_ref()
                .map(|card| card.apple_pass_serial_number)
                .unwrap_or_else(Uuid::new_v4),
        };
        ledger.save_card(&card).await?;

        Ok(card)
    }
}
