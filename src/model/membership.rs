use chrono::{DateTime, Duration, Utc};

use serde::Serialize;

use uuid::Uuid;

/// Configured issuance policy: which line-item SKU grants a membership and
/// how long a single qualifying order covers
#[derive(Debug, Clone)]
pub struct MembershipPolicy {
    pub sku: String,
    pub validity: Duration,
}

/// Normalized membership period derived from one qualifying order.
/// The customer email is a join key to the account table, not a validated
/// address — malformed values are stored as-is.
#[derive(Debug, Clone)]
pub struct NewAnnualMembership {
    pub customer_email: String,
    pub full_name: String,
    /// Membership start; the order's modification date
    pub created_on: DateTime<Utc>,
    pub sku: String,
    /// Dedup key; one ledger row per store order
    pub source_order_id: String,
    pub order_number: String,
    /// Raw order snapshot
    pub payload: serde_json::Value,
}

/// Stored ledger row. Written once by a sync run, never mutated.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AnnualMembership {
    pub id: Uuid,
    pub customer_email: String,
    pub full_name: String,
    pub created_on: DateTime<Utc>,
    pub sku: String,
    pub source_order_id: String,
    pub order_number: String,
    #[serde(skip)]
    pub payload: serde_json::Value,
}

impl AnnualMembership {
    /// The coverage window is `[created_on, created_on + validity)`
    pub fn is_active_at(&self, as_of: DateTime<Utc>, validity: Duration) -> bool {
        self.created_on <= as_of && as_of < self.expires_on(validity)
    }

    pub fn expires_on(&self, validity: Duration) -> DateTime<Utc> {
        self.created_on + validity
    }
}

/// Read-side aggregation over one member's ledger rows
#[derive(Debug, Clone)]
pub struct MembershipHistory {
    memberships: Vec<AnnualMembership>,
    validity: Duration,
}

impl MembershipHistory {
    pub fn new(mut memberships: Vec<AnnualMembership>, validity: Duration) -> Self {
        // Kept ascending by start date for history display
        memberships.sort_by_key(|m| m.created_on);
        Self {
            memberships,
            validity,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.memberships.is_empty()
    }

    pub fn records(&self) -> &[AnnualMembership] {
        &self.memberships
    }

    /// Rows whose coverage window contains `as_of`; renewals may overlap
    pub fn active_memberships(&self, as_of: DateTime<Utc>) -> Vec<&AnnualMembership> {
        self.memberships
            .iter()
            .filter(|m| m.is_active_at(as_of, self.validity))
            .collect()
    }

    pub fn active_at(&self, as_of: DateTime<Utc>) -> bool {
        self.memberships
            .iter()
            .any(|m| m.is_active_at(as_of, self.validity))
    }

    pub fn has_active(&self) -> bool {
        self.active_at(Utc::now())
    }

    /// First-ever join date; renewals never move it
    pub fn member_since(&self) -> Option<DateTime<Utc>> {
        self.memberships.first().map(|m| m.created_on)
    }

    /// Coverage end: the maximum expiry across rows, not the latest row's.
    /// Overlapping renewals extend coverage without merging rows.
    pub fn member_until(&self) -> Option<DateTime<Utc>> {
        self.memberships
            .iter()
            .map(|m| m.expires_on(self.validity))
            .max()
    }
}
