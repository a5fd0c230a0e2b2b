use sqlx::PgExecutor;

use uuid::Uuid;

use crate::crypto::CardSerial;
use crate::model::MembershipCard;

const CARD_COLUMNS: &str =
    "id, user_id, serial_number, member_since, member_until, apple_pass_serial_number";

/// Repository for issued membership cards
pub struct CardRepo;

impl CardRepo {
    #[tracing::instrument(name = "Fetch card by user", skip(executor))]
    pub async fn find_by_user<'con>(
        executor: impl PgExecutor<'con>,
        user_id: Uuid,
    ) -> sqlx::Result<Option<MembershipCard>> {
        sqlx::query_as::<_, MembershipCard>(&format!(
            "select {} from membership_cards where user_id = $1",
            CARD_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(executor)
        .await
    }

    #[tracing::instrument(name = "Fetch card by serial", skip(executor))]
    pub async fn find_by_serial<'con>(
        executor: impl PgExecutor<'con>,
        serial: &CardSerial,
    ) -> sqlx::Result<Option<MembershipCard>> {
        sqlx::query_as::<_, MembershipCard>(&format!(
            "select {} from membership_cards where serial_number = $1",
            CARD_COLUMNS
        ))
        .bind(serial)
        .fetch_optional(executor)
        .await
    }

    /// Write the member's current card.
    ///
    /// Card attributes derive deterministically from ledger state, so a
    /// concurrent writer lands the same values; last-writer-wins is safe.
    /// The wallet pass serial is pinned by the first insert.
    #[tracing::instrument(name = "Save card", skip(executor, card), fields(user_id = %card.user_id))]
    pub async fn save<'con>(
        executor: impl PgExecutor<'con>,
        card: &MembershipCard,
    ) -> sqlx::Result<()> {
        sqlx::query(
            "insert into membership_cards \
             (id, user_id, serial_number, member_since, member_until, apple_pass_serial_number) \
             values ($1, $2, $3, $4, $5, $6) \
             on conflict (user_id) do update set \
                serial_number = excluded.serial_number, \
                member_since = excluded.member_since, \
                member_until = excluded.member_until, \
                updated_at = now()",
        )
        .bind(card.id)
        .bind(card.user_id)
        .bind(card.serial_number)
        .bind(card.member_since)
        .bind(card.member_until)
        .bind(card.apple_pass_serial_number)
        .execute(executor)
        .await?;

        Ok(())
    }
}
