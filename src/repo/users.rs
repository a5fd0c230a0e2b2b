use secrecy::Secret;

use sqlx::PgExecutor;

use uuid::Uuid;

use crate::domain::EmailAddress;
use crate::model::User;

#[derive(Debug)]
pub struct NewUser {
    pub email: EmailAddress,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
}

#[derive(Debug)]
pub struct UserCredentials {
    pub id: Uuid,
    pub password_hash: Secret<String>,
}

const USER_COLUMNS: &str = "id, email, first_name, last_name, is_operator, created_at";

pub struct UserRepo;

impl UserRepo {
    #[tracing::instrument(name = "Insert a new user record", skip(executor, new_user))]
    pub async fn insert<'con>(
        executor: impl PgExecutor<'con>,
        new_user: &NewUser,
    ) -> sqlx::Result<Uuid> {
        let row: (Uuid,) = sqlx::query_as(
            "insert into users (email, first_name, last_name, password_hash) \
             values ($1, $2, $3, $4) returning id",
        )
        .bind(new_user.email.as_ref())
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(&new_user.password_hash)
        .fetch_one(executor)
        .await?;

        Ok(row.0)
    }

    pub async fn fetch_credentials_by_email<'con>(
        executor: impl PgExecutor<'con>,
        email: &EmailAddress,
    ) -> sqlx::Result<Option<UserCredentials>> {
        let row: Option<(Uuid, String)> =
            sqlx::query_as("select id, password_hash from users where email = $1")
                .bind(email.as_ref())
                .fetch_optional(executor)
                .await?;

        Ok(row.map(|(id, password_hash)| UserCredentials {
            id,
            password_hash: Secret::new(password_hash),
        }))
    }

    #[tracing::instrument(name = "Fetch user by id", skip(executor))]
    pub async fn fetch_by_id<'con>(
        executor: impl PgExecutor<'con>,
        id: Uuid,
    ) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!("select {} from users where id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    #[tracing::instrument(name = "Fetch user by email", skip(executor))]
    pub async fn fetch_by_email<'con>(
        executor: impl PgExecutor<'con>,
        email: &EmailAddress,
    ) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            "select {} from users where email = $1",
            USER_COLUMNS
        ))
        .bind(email.as_ref())
        .fetch_optional(executor)
        .await
    }
}
