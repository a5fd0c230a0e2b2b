use chrono::{DateTime, Utc};

use serde::Serialize;

use uuid::Uuid;

use crate::crypto::CardSerial;

/// Issued membership card.
///
/// One current card per user; get-or-create recomputes the row in place when
/// the ledger moves underneath it. All attributes derive deterministically
/// from ledger state, so an overwrite always writes the same values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct MembershipCard {
    pub id: Uuid,
    pub user_id: Uuid,
    pub serial_number: CardSerial,
    /// Earliest membership start across the member's ledger rows
    pub member_since: DateTime<Utc>,
    /// Latest coverage end across the member's ledger rows
    pub member_until: DateTime<Utc>,
    /// Assigned once at first issuance; stable across recomputes so passes
    /// already added to wallets keep updating
    pub apple_pass_serial_number: Uuid,
}

impl MembershipCard {
    /// Bucket key for the signed pass artifact
    pub fn pass_storage_key(&self) -> String {
        format!(
            "membership-cards/apple-passes/{}.pkpass",
            self.apple_pass_serial_number.simple()
        )
    }
}
