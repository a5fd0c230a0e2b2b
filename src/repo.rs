mod cards;
mod memberships;
mod users;

pub use self::cards::CardRepo;
pub use self::memberships::{MembershipRepo, RecordOutcome};
pub use self::users::{NewUser, UserCredentials, UserRepo};

use chrono::{DateTime, Utc};

use sqlx::PgPool;

use uuid::Uuid;

use crate::crypto::CardSerial;
use crate::model::{AnnualMembership, MembershipCard, NewAnnualMembership, User};

/// Durable-store facade the sync, issuance, and verification engines run
/// against.
/// NOTE: Intended to facilitate easier testing/mocking
/// TODO: Swap async-trait for std async traits when those become stable
/// https://github.com/orgs/rust-lang/projects/28/views/2?pane=issue&itemId=21990165
#[async_trait::async_trait]
pub trait Ledger: Send + Sync {
    /// Conflict-checked insert keyed on `source_order_id`
    async fn record_membership(&self, new: &NewAnnualMembership) -> sqlx::Result<RecordOutcome>;

    /// The implicit sync checkpoint: max membership start on the ledger
    async fn last_ingested_at(&self) -> sqlx::Result<Option<DateTime<Utc>>>;

    async fn memberships_by_email(&self, email: &str) -> sqlx::Result<Vec<AnnualMembership>>;

    async fn find_card_by_user(&self, user_id: Uuid) -> sqlx::Result<Option<MembershipCard>>;

    async fn find_card_by_serial(&self, serial: &CardSerial)
        -> sqlx::Result<Option<MembershipCard>>;

    /// Safe-to-overwrite-with-same-values write of the member's current card
    async fn save_card(&self, card: &MembershipCard) -> sqlx::Result<()>;

    async fn find_user_by_id(&self, id: Uuid) -> sqlx::Result<Option<User>>;
}

/// Postgres-backed ledger
#[derive(Clone)]
pub struct PgLedger {
    pool: PgPool,
}

impl PgLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl Ledger for PgLedger {
    async fn record_membership(&self, new: &NewAnnualMembership) -> sqlx::Result<RecordOutcome> {
        MembershipRepo::insert(&self.pool, new).await
    }

    async fn last_ingested_at(&self) -> sqlx::Result<Option<DateTime<Utc>>> {
        MembershipRepo::last_ingested_at(&self.pool).await
    }

    async fn memberships_by_email(&self, email: &str) -> sqlx::Result<Vec<AnnualMembership>> {
        MembershipRepo::fetch_by_email(&self.pool, email).await
    }

    async fn find_card_by_user(&self, user_id: Uuid) -> sqlx::Result<Option<MembershipCard>> {
        CardRepo::find_by_user(&self.pool, user_id).await
    }

    async fn find_card_by_serial(
        &self,
        serial: &CardSerial,
    ) -> sqlx::Result<Option<MembershipCard>> {
        CardRepo::find_by_serial(&self.pool, serial).await
    }

    async fn save_card(&self, card: &MembershipCard) -> sqlx::Result<()> {
        CardRepo::save(&self.pool, card).await
    }

    async fn find_user_by_id(&self, id: Uuid) -> sqlx::Result<Option<User>> {
        UserRepo::fetch_by_id(&self.pool, id).await
    }
}

#[cfg(test)]
pub(crate) mod memory {
    use std::sync::Mutex;

    use super::*;

    /// In-memory ledger double for engine tests
    #[derive(Default)]
    pub struct MemoryLedger {
        inner: Mutex<State>,
    }

    #[derive(Default)]
    struct State {
        memberships: Vec<AnnualMembership>,
        cards: Vec<MembershipCard>,
        users: Vec<User>,
    }

    impl MemoryLedger {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_users(users: Vec<User>) -> Self {
            let ledger = Self::default();
            ledger.inner.lock().unwrap().users = users;
            ledger
        }

        pub fn membership_count(&self) -> usize {
            self.inner.lock().unwrap().memberships.len()
        }

        pub fn seed_membership(&self, membership: AnnualMembership) {
            self.inner.lock().unwrap().memberships.push(membership);
        }
    }

    #[async_trait::async_trait]
    impl Ledger for MemoryLedger {
        async fn record_membership(
            &self,
            new: &NewAnnualMembership,
        ) -> sqlx::Result<RecordOutcome> {
            let mut state = self.inner.lock().unwrap();
            if state
                .memberships
                .iter()
                .any(|m| m.source_order_id == new.source_order_id)
            {
                return Ok(RecordOutcome::AlreadyRecorded);
            }
            state.memberships.push(AnnualMembership {
                id: Uuid::new_v4(),
                customer_email: new.customer_email.clone(),
                full_name: new.full_name.clone(),
                created_on: new.created_on,
                sku: new.sku.clone(),
                source_order_id: new.source_order_id.clone(),
                order_number: new.order_number.clone(),
                payload: new.payload.clone(),
            });
            Ok(RecordOutcome::Created)
        }

        async fn last_ingested_at(&self) -> sqlx::Result<Option<DateTime<Utc>>> {
            let state = self.inner.lock().unwrap();
            Ok(state.memberships.iter().map(|m| m.created_on).max())
        }

        async fn memberships_by_email(&self, email: &str) -> sqlx::Result<Vec<AnnualMembership>> {
            let state = self.inner.lock().unwrap();
            Ok(state
                .memberships
                .iter()
                .filter(|m| m.customer_email == email)
                .cloned()
                .collect())
        }

        async fn find_card_by_user(&self, user_id: Uuid) -> sqlx::Result<Option<MembershipCard>> {
            let state = self.inner.lock().unwrap();
            Ok(state.cards.iter().find(|c| c.user_id == user_id).cloned())
        }

        async fn find_card_by_serial(
            &self,
            serial: &CardSerial,
        ) -> sqlx::Result<Option<MembershipCard>> {
            let state = self.inner.lock().unwrap();
            Ok(state
                .cards
                .iter()
                .find(|c| &c.serial_number == serial)
                .cloned())
        }

        async fn save_card(&self, card: &MembershipCard) -> sqlx::Result<()> {
            let mut state = self.inner.lock().unwrap();
            state.cards.retain(|c| c.user_id != card.user_id);
            state.cards.push(card.clone());
            Ok(())
        }

        async fn find_user_by_id(&self, id: Uuid) -> sqlx::Result<Option<User>> {
            let state = self.inner.lock().unwrap();
            Ok(state.users.iter().find(|u| u.id == id).cloned())
        }
    }
}
