use std::net::TcpListener;

use actix_web::dev::Server;
use actix_web::{get, HttpResponse, Responder};
use actix_web::{web, App, HttpServer};

use tracing_actix_web::TracingLogger;

use crate::client::{CardStorage, CommerceClient, EmailClient, PassSignerClient};
use crate::controller::{cards, sync, verify};
use crate::issuance::CardIssuer;
use crate::model::MembershipPolicy;
use crate::repo::PgLedger;
use crate::verification::Verifier;

/// Simple health-check endpoint
#[tracing::instrument(name = "Health check")]
#[get("/health_check")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().body("I am alive")
}

/// Run the application on a specified TCP listener.
/// Collaborators are constructed by the caller and injected explicitly.
#[allow(clippy::too_many_arguments)]
pub fn run(
    listener: TcpListener,
    ledger: PgLedger,
    issuer: CardIssuer,
    verifier: Verifier,
    commerce: CommerceClient,
    email_client: EmailClient,
    pass_signer: PassSignerClient,
    storage: CardStorage,
    policy: MembershipPolicy,
) -> anyhow::Result<Server> {
    // Wrap application data
    // NOTE: The bare pool is registered alongside the ledger for the
    // credential guards
    let pool = web::Data::new(ledger.pool().clone());
    let ledger = web::Data::new(ledger);
    let issuer = web::Data::new(issuer);
    let verifier = web::Data::new(verifier);
    let commerce = web::Data::new(commerce);
    let email_client = web::Data::new(email_client);
    let pass_signer = web::Data::new(pass_signer);
    let storage = web::Data::new(storage);
    let policy = web::Data::new(policy);

    // Start the server
    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(pool.clone())
            .app_data(ledger.clone())
            .app_data(issuer.clone())
            .app_data(verifier.clone())
            .app_data(commerce.clone())
            .app_data(email_client.clone())
            .app_data(pass_signer.clone())
            .app_data(storage.clone())
            .app_data(policy.clone())
            .service(health_check)
            .service(cards::scope())
            .service(verify::scope())
            .service(sync::scope())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
