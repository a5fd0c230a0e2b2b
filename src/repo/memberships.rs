use chrono::{DateTime, Utc};

use sqlx::PgExecutor;

use crate::model::{AnnualMembership, NewAnnualMembership};

/// Outcome of a conflict-checked ledger insert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Created,
    /// The source order is already on the ledger; first write wins
    AlreadyRecorded,
}

const MEMBERSHIP_COLUMNS: &str =
    "id, customer_email, full_name, created_on, sku, source_order_id, order_number, payload";

/// Repository for the membership-period ledger table
pub struct MembershipRepo;

impl MembershipRepo {
    /// Insert a normalized membership record.
    ///
    /// `source_order_id` carries a unique constraint, making this safe under
    /// concurrent and replayed sync runs with no further locking.
    #[tracing::instrument(
        name = "Record membership period",
        skip(executor, new),
        fields(source_order_id = %new.source_order_id)
    )]
    pub async fn insert<'con>(
        executor: impl PgExecutor<'con>,
        new: &NewAnnualMembership,
    ) -> sqlx::Result<RecordOutcome> {
        let result = sqlx::query(
            "insert into annual_memberships \
             (customer_email, full_name, created_on, sku, source_order_id, order_number, payload) \
             values ($1, $2, $3, $4, $5, $6, $7) \
             on conflict (source_order_id) do nothing",
        )
        .bind(&new.customer_email)
        .bind(&new.full_name)
        .bind(new.created_on)
        .bind(&new.sku)
        .bind(&new.source_order_id)
        .bind(&new.order_number)
        .bind(&new.payload)
        .execute(executor)
        .await?;

        if result.rows_affected() == 0 {
            Ok(RecordOutcome::AlreadyRecorded)
        } else {
            Ok(RecordOutcome::Created)
        }
    }

    #[tracing::instrument(name = "Fetch memberships by email", skip(executor))]
    pub async fn fetch_by_email<'con>(
        executor: impl PgExecutor<'con>,
        email: &str,
    ) -> sqlx::Result<Vec<AnnualMembership>> {
        sqlx::query_as::<_, AnnualMembership>(&format!(
            "select {} from annual_memberships where customer_email = $1 order by created_on",
            MEMBERSHIP_COLUMNS
        ))
        .bind(email)
        .fetch_all(executor)
        .await
    }

    /// High-water mark of ingested membership starts; the implicit sync
    /// checkpoint. Monotone because it only ever reflects committed rows.
    #[tracing::instrument(name = "Fetch sync checkpoint", skip(executor))]
    pub async fn last_ingested_at<'con>(
        executor: impl PgExecutor<'con>,
    ) -> sqlx::Result<Option<DateTime<Utc>>> {
        let row: (Option<DateTime<Utc>>,) =
            sqlx::query_as("select max(created_on) from annual_memberships")
                .fetch_one(executor)
                .await?;

        Ok(row.0)
    }
}
