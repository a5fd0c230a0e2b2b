use chrono::{Duration, Utc};

use crate::crypto::{CardSerial, CardSignature, SigningKey};
use crate::model::{MembershipCard, MembershipHistory, User};
use crate::repo::Ledger;

/// Result of checking a presented serial/signature pair.
///
/// Every failure shape collapses into `Invalid`: a forged signature, an
/// unknown serial, and stale data are indistinguishable to the caller, so
/// the endpoint cannot be used as an oracle for which serials exist.
#[derive(Debug)]
pub enum Verification {
    Valid(VerifiedCard),
    Invalid,
}

#[derive(Debug)]
pub struct VerifiedCard {
    pub card: MembershipCard,
    pub holder: User,
    /// Whether the holder's coverage includes the time of the check
    pub active: bool,
}

/// Validates serial/signature pairs presented out-of-band (scanned passes)
pub struct Verifier {
    key: SigningKey,
    validity: Duration,
}

impl Verifier {
    pub fn new(key: SigningKey, validity: Duration) -> Self {
        Self { key, validity }
    }

    #[tracing::instrument(name = "Verify card serial", skip(self, ledger, signature))]
    pub async fn verify(
        &self,
        ledger: &impl Ledger,
        serial: &str,
        signature: &str,
    ) -> sqlx::Result<Verification> {
        // Signature first: no lookup may run for an unauthenticated serial
        let serial: CardSerial = match serial.parse() {
            Ok(serial) => serial,
            Err(_) => return Ok(Verification::Invalid),
        };
        if !CardSignature::verify(&self.key, &serial, signature) {
            return Ok(Verification::Invalid);
        }

        let card = match ledger.find_card_by_serial(&serial).await? {
            Some(card) => card,
            None => return Ok(Verification::Invalid),
        };
        let holder = match ledger.find_user_by_id(card.user_id).await? {
            Some(user) => user,
            None => return Ok(Verification::Invalid),
        };

        let history = MembershipHistory::new(
            ledger.memberships_by_email(&holder.email).await?,
            self.validity,
        );
        let active = history.active_at(Utc::now());

        Ok(Verification::Valid(VerifiedCard {
            card,
            holder,
            active,
        }))
    }
}
