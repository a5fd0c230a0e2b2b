use std::time::Duration;

use actix_web::dev::HttpServiceFactory;
use actix_web::{get, post, web, HttpResponse, Responder};

use chrono::{DateTime, Utc};

use serde::Serialize;

use crate::auth::Member;
use crate::client::{CardEmail, CardStorage, EmailClient, PassRequest, PassSignerClient};
use crate::domain::EmailAddress;
use crate::error::{RestError, RestResult};
use crate::issuance::CardIssuer;
use crate::model::{AnnualMembership, MembershipCard, MembershipHistory, User};
use crate::repo::{Ledger, PgLedger};

const PKPASS_CONTENT_TYPE: &str = "application/vnd.apple.pkpass";

// Download links are single-purpose; a day covers email delivery lag
const ATTACHMENT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// JSON shape for the member's current card
#[derive(Debug, Serialize)]
struct CardSummary {
    serial_number: String,
    member_since: DateTime<Utc>,
    member_until: DateTime<Utc>,
    /// Doubles as the QR payload
    verification_url: String,
    membership_history: Vec<AnnualMembership>,
}

/// Current card for the authenticated member (get-or-create)
#[tracing::instrument(name = "Show membership card", skip_all)]
#[get("")]
async fn show(
    member: Member,
    ledger: web::Data<PgLedger>,
    issuer: web::Data<CardIssuer>,
) -> RestResult<impl Responder> {
    let user = member.into_user();
    let (card, history) = issue_card(&ledger, &issuer, &user).await?;

    Ok(HttpResponse::Ok().json(CardSummary {
        serial_number: card.serial_number.to_string(),
        member_since: card.member_since,
        member_until: card.member_until,
        verification_url: issuer.verification_url(&card).to_string(),
        membership_history: history.records().to_vec(),
    }))
}

/// Download the signed wallet pass for the member's card
#[tracing::instrument(name = "Download wallet pass", skip_all)]
#[get("/apple-pass")]
async fn apple_pass(
    member: Member,
    ledger: web::Data<PgLedger>,
    issuer: web::Data<CardIssuer>,
    pass_signer: web::Data<PassSignerClient>,
) -> RestResult<impl Responder> {
    let user = member.into_user();
    let (card, _history) = issue_card(&ledger, &issuer, &user).await?;

    let pass_bytes = pass_signer
        .sign_pass(&pass_request(&issuer, &card, &user))
        .await
        .map_err(|e| {
            tracing::error!("Pass signer failure: {:#}", e);
            RestError::Upstream("Pass signing unavailable".into())
        })?;

    let filename = format!("membership-card-{}.pkpass", user.last_name.to_lowercase());

    Ok(HttpResponse::Ok()
        .content_type(PKPASS_CONTENT_TYPE)
        .insert_header((
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", filename),
        ))
        .body(pass_bytes))
}

/// Email the member their card, with a time-limited pass download link
#[tracing::instrument(name = "Email membership card", skip_all)]
#[post("/email")]
async fn email(
    member: Member,
    ledger: web::Data<PgLedger>,
    issuer: web::Data<CardIssuer>,
    pass_signer: web::Data<PassSignerClient>,
    storage: web::Data<CardStorage>,
    email_client: web::Data<EmailClient>,
) -> RestResult<impl Responder> {
    let user = member.into_user();
    let recipient: EmailAddress = user.email.parse().map_err(RestError::ParseError)?;

    let (card, history) = issue_card(&ledger, &issuer, &user).await?;

    let pass_bytes = pass_signer
        .sign_pass(&pass_request(&issuer, &card, &user))
        .await
        .map_err(|e| {
            tracing::error!("Pass signer failure: {:#}", e);
            RestError::Upstream("Pass signing unavailable".into())
        })?;

    let storage_key = card.pass_storage_key();
    storage
        .upload(&storage_key, pass_bytes, PKPASS_CONTENT_TYPE)
        .await
        .map_err(|e| {
            tracing::error!("Pass upload failure: {:#}", e);
            RestError::Upstream("Pass storage unavailable".into())
        })?;
    let signed_url = storage
        .presigned_url(&storage_key, ATTACHMENT_TTL)
        .await
        .map_err(|e| {
            tracing::error!("Presign failure: {:#}", e);
            RestError::Upstream("Pass storage unavailable".into())
        })?;

    let card_email = build_card_email(&card, &user, &history, signed_url.as_str());
    email_client
        .send_card_email(&recipient, &card_email)
        .await
        .map_err(|e| {
            tracing::error!("Email delivery failure: {:#}", e);
            RestError::Upstream("Email delivery unavailable".into())
        })?;

    Ok(HttpResponse::Accepted())
}

/// Shared get-or-create path: aggregate the member's ledger rows, require
/// active coverage, and derive the current card
async fn issue_card(
    ledger: &PgLedger,
    issuer: &CardIssuer,
    user: &User,
) -> RestResult<(MembershipCard, MembershipHistory)> {
    let history = MembershipHistory::new(
        ledger.memberships_by_email(&user.email).await?,
        issuer.validity(),
    );
    if !history.has_active() {
        // A user-visible state, not an error condition
        return Err(RestError::NotFound("No active membership on record".into()));
    }

    let card = issuer.get_or_create(ledger, user, &history).await?;
    Ok((card, history))
}

fn pass_request(issuer: &CardIssuer, card: &MembershipCard, user: &User) -> PassRequest {
    PassRequest {
        serial_number: card.serial_number.to_string(),
        apple_pass_serial_number: card.apple_pass_serial_number.simple().to_string(),
        holder_name: user.full_name(),
        member_since: card.member_since,
        member_until: card.member_until,
        verification_url: issuer.verification_url(card).to_string(),
    }
}

fn build_card_email(
    card: &MembershipCard,
    user: &User,
    history: &MembershipHistory,
    pass_url: &str,
) -> CardEmail {
    CardEmail {
        subject: "Your membership card".into(),
        card_title: "Membership Card".into(),
        primary_info_text: user.full_name(),
        secondary_info_text: format!("Member Since {}", card.member_since.format("%b %Y")),
        aux_info_text: format!("Good through {}", card.member_until.format("%b %d, %Y")),
        serial_number: card.serial_number.to_string(),
        apple_pass_signed_url: pass_url.to_string(),
        membership_history: history.records().to_vec(),
    }
}

/// Membership card API endpoints
pub fn scope() -> impl HttpServiceFactory {
    web::scope("/card")
        .service(show)
        .service(apple_pass)
        .service(email)
}
