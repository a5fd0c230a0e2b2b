use actix_web::dev::HttpServiceFactory;
use actix_web::{get, web, HttpResponse, Responder};

use chrono::{DateTime, Utc};

use serde::{Deserialize, Serialize};

use crate::error::{RestError, RestResult};
use crate::repo::PgLedger;
use crate::verification::{Verification, Verifier};

const VERIFY_FAILED: &str = "Unable to verify signature!";

#[derive(Debug, Deserialize)]
struct VerifyQuery {
    signature: Option<String>,
}

#[derive(Debug, Serialize)]
struct VerifyResponse {
    serial_number: String,
    holder_name: String,
    member_since: DateTime<Utc>,
    member_until: DateTime<Utc>,
    active: bool,
}

/// Validate a scanned serial/signature pair.
/// All failure shapes collapse into the same 401.
#[tracing::instrument(name = "Verify a scanned pass", skip(ledger, verifier, query))]
#[get("/{serial_number}")]
async fn show(
    ledger: web::Data<PgLedger>,
    verifier: web::Data<Verifier>,
    path: web::Path<(String,)>,
    query: web::Query<VerifyQuery>,
) -> RestResult<impl Responder> {
    let (serial_number,) = path.into_inner();
    let signature = query
        .into_inner()
        .signature
        .ok_or_else(|| RestError::Unauthorized(VERIFY_FAILED.into()))?;

    match verifier
        .verify(ledger.get_ref(), &serial_number, &signature)
        .await?
    {
        Verification::Valid(verified) => Ok(HttpResponse::Ok().json(VerifyResponse {
            serial_number: verified.card.serial_number.to_string(),
            holder_name: verified.holder.full_name(),
            member_since: verified.card.member_since,
            member_until: verified.card.member_until,
            active: verified.active,
        })),
        Verification::Invalid => Err(RestError::Unauthorized(VERIFY_FAILED.into())),
    }
}

/// Pass verification endpoints
pub fn scope() -> impl HttpServiceFactory {
    web::scope("/verify-pass").service(show)
}
