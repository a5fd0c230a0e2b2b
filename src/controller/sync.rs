use actix_web::dev::HttpServiceFactory;
use actix_web::{post, web, HttpResponse, Responder};

use serde::Deserialize;

use crate::auth::Operator;
use crate::client::CommerceClient;
use crate::error::RestResult;
use crate::etl;
use crate::model::MembershipPolicy;
use crate::repo::PgLedger;

#[derive(Debug, Deserialize)]
struct SyncRequest {
    /// Overrides the configured membership SKU
    membership_sku: Option<String>,
    /// Re-read the whole order history instead of resuming from the
    /// checkpoint
    #[serde(default)]
    load_all: bool,
}

/// Trigger an order sync run (operators only)
#[tracing::instrument(name = "Trigger order sync", skip_all)]
#[post("")]
async fn run(
    _operator: Operator,
    commerce: web::Data<CommerceClient>,
    ledger: web::Data<PgLedger>,
    policy: web::Data<MembershipPolicy>,
    body: web::Json<SyncRequest>,
) -> RestResult<impl Responder> {
    let request = body.into_inner();
    let sku = request
        .membership_sku
        .unwrap_or_else(|| policy.sku.clone());

    let report = etl::sync(
        commerce.get_ref(),
        ledger.get_ref(),
        &sku,
        request.load_all,
    )
    .await?;

    Ok(HttpResponse::Ok().json(report))
}

/// Sync trigger endpoints
pub fn scope() -> impl HttpServiceFactory {
    web::scope("/sync").service(run)
}
