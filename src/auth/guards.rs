use std::future::Future;
use std::pin::Pin;

use actix_web::{dev, web, FromRequest, HttpRequest};

use anyhow::Context;

use argon2::{Argon2, PasswordHash, PasswordVerifier};

use sqlx::PgPool;

use crate::auth::Credentials;
use crate::domain::EmailAddress;
use crate::error::{RestError, RestResult};
use crate::model::User;
use crate::repo::UserRepo;
use crate::telemetry::spawn_blocking_with_tracing;

/// Authenticated member extractor: basic credentials validated against the
/// account table
#[derive(Debug)]
pub struct Member(User);

impl Member {
    pub fn into_user(self) -> User {
        self.0
    }
}

impl AsRef<User> for Member {
    fn as_ref(&self) -> &User {
        &self.0
    }
}

impl FromRequest for Member {
    type Error = RestError;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            // NOTE: Must be registered with the application at startup
            let pool: &PgPool = req
                .app_data::<web::Data<PgPool>>()
                .expect("PgPool not registered for application");
            // Pull the credentials from the headers
            let creds = Credentials::from_headers(req.headers())
                .map_err(|e| RestError::Unauthorized(e.to_string()))?;
            // Validate the credentials against the stored password hash
            let user = validate_credentials(pool, creds).await?;

            Ok(Member(user))
        })
    }
}

/// Operator extractor: an authenticated member with the operator flag set.
/// Gates the sync trigger endpoint.
#[derive(Debug)]
pub struct Operator(User);

impl AsRef<User> for Operator {
    fn as_ref(&self) -> &User {
        &self.0
    }
}

impl FromRequest for Operator {
    type Error = RestError;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, payload: &mut dev::Payload) -> Self::Future {
        let member = Member::from_request(req, payload);
        Box::pin(async move {
            let user = member.await?.into_user();
            if !user.is_operator {
                return Err(RestError::Forbidden("Operator access required".into()));
            }
            Ok(Operator(user))
        })
    }
}

#[tracing::instrument(name = "Validate credentials", skip(pool, credentials))]
async fn validate_credentials(pool: &PgPool, credentials: Credentials) -> RestResult<User> {
    let email: EmailAddress = credentials
        .email
        .parse()
        .map_err(RestError::ParseError)?;

    let stored = UserRepo::fetch_credentials_by_email(pool, &email)
        .await?
        .ok_or_else(|| RestError::Unauthorized("Unknown email".into()))?;

    let password = credentials.password;
    let expected_hash = stored.password_hash;
    let verification = spawn_blocking_with_tracing(move || {
        use secrecy::ExposeSecret;

        let parsed_hash = PasswordHash::new(expected_hash.expose_secret())?;
        Argon2::default().verify_password(password.expose_secret().as_bytes(), &parsed_hash)
    })
    .await
    .context("Failed to join password verification task")?;

    verification.map_err(|_| RestError::Unauthorized("Invalid password".into()))?;

    let user = UserRepo::fetch_by_id(pool, stored.id)
        .await?
        .ok_or_else(|| RestError::Unauthorized("Unknown user".into()))?;

    Ok(user)
}
