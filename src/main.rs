use std::net::TcpListener;

use anyhow::Context;

use sqlx::postgres::PgPoolOptions;

use member_card::app;
use member_card::client::{CardStorage, CommerceClient, EmailClient, PassSignerClient};
use member_card::crypto::SigningKey;
use member_card::issuance::CardIssuer;
use member_card::repo::PgLedger;
use member_card::settings::Settings;
use member_card::telemetry;
use member_card::verification::Verifier;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = telemetry::create_subscriber("info".into(), std::io::stdout);
    telemetry::set_subscriber(subscriber)?;

    let settings = Settings::load().expect("Failed to load settings");

    let pool = PgPoolOptions::new().connect_lazy_with(settings.database.with_db());

    let signing_key = SigningKey::new(settings.app.secret_key())?;

    let commerce = CommerceClient::new(
        settings.commerce.api_base_url(),
        settings.commerce.api_key(),
        settings.commerce.api_timeout(),
    )?;
    let email_client = EmailClient::new(
        settings.email.sender(),
        settings.email.api_timeout(),
        settings.email.api_base_url(),
        settings.email.api_auth_token(),
        settings.email.template_id(),
    )?;
    let pass_signer = PassSignerClient::new(
        settings.pass_signer.api_base_url(),
        settings.pass_signer.api_auth_token(),
        settings.pass_signer.api_timeout(),
    )?;
    let storage = CardStorage::from_env(settings.storage.bucket().to_string()).await;

    let policy = settings.membership.policy();
    let issuer = CardIssuer::new(signing_key.clone(), policy.validity, settings.app.base_url());
    let verifier = Verifier::new(signing_key, policy.validity);

    let ledger = PgLedger::new(pool);

    let listener = TcpListener::bind(settings.app.addr())?;

    app::run(
        listener,
        ledger,
        issuer,
        verifier,
        commerce,
        email_client,
        pass_signer,
        storage,
        policy,
    )?
    .await
    .context("Failed to run app")
}
