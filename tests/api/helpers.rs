use std::net::TcpListener;
use std::time::Duration;

use reqwest::{Client, Method, Response};

use secrecy::Secret;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

use url::Url;

use wiremock::MockServer;

use member_card::app;
use member_card::client::{CardStorage, CommerceClient, EmailClient, PassSignerClient};
use member_card::crypto::SigningKey;
use member_card::issuance::CardIssuer;
use member_card::model::MembershipPolicy;
use member_card::repo::PgLedger;
use member_card::verification::Verifier;

pub struct TestApp {
    addr: String,

    pub client: Client,
    pub commerce_server: MockServer,
    pub email_server: MockServer,
    pub signer_server: MockServer,
}

impl TestApp {
    /// Spawn the app against mocked upstreams and a lazily-connected pool.
    /// Endpoints that never touch the database are exercisable without a
    /// Postgres instance behind the pool.
    pub async fn spawn() -> Self {
        use rand::{distributions::Alphanumeric, Rng};

        let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to listen on random port");
        let port = listener.local_addr().unwrap().port();

        let addr = format!("http://127.0.0.1:{}", port);

        let signing_key = {
            let rand_key: String = rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(7)
                .map(char::from)
                .collect();
            let rand_key = Secret::new(rand_key);

            SigningKey::new(&rand_key).expect("Failed to create crypto signing key")
        };

        let commerce_server = MockServer::start().await;
        let email_server = MockServer::start().await;
        let signer_server = MockServer::start().await;

        let pool = PgPoolOptions::new().connect_lazy_with(
            PgConnectOptions::new()
                .host("localhost")
                .username("postgres")
                .database("member_card_test"),
        );

        let commerce = CommerceClient::new(
            Url::parse(&commerce_server.uri()).expect("Failed to parse mock server uri"),
            Secret::new("test-api-key".into()),
            Duration::from_secs(2),
        )
        .expect("Failed to create commerce client");

        let email_client = EmailClient::new(
            "cards@test.com".parse().expect("Failed to parse sender"),
            Duration::from_secs(2),
            Url::parse(&email_server.uri()).expect("Failed to parse mock server uri"),
            Secret::new("TestAuthorization".into()),
            "test-template".into(),
        )
        .expect("Failed to create email client");

        let pass_signer = PassSignerClient::new(
            Url::parse(&signer_server.uri()).expect("Failed to parse mock server uri"),
            Secret::new("TestAuthorization".into()),
            Duration::from_secs(2),
        )
        .expect("Failed to create pass signer client");

        let storage = {
            use aws_sdk_s3::config::{BehaviorVersion, Region};

            let config = aws_sdk_s3::Config::builder()
                .behavior_version(BehaviorVersion::latest())
                .region(Region::new("us-east-1"))
                .build();

            CardStorage::new(aws_sdk_s3::Client::from_conf(config), "test-bucket".into())
        };

        let policy = MembershipPolicy {
            sku: "SKU-TEST".into(),
            validity: chrono::Duration::days(365),
        };
        let issuer = CardIssuer::new(
            signing_key.clone(),
            policy.validity,
            Url::parse(&addr).unwrap(),
        );
        let verifier = Verifier::new(signing_key, policy.validity);
        let ledger = PgLedger::new(pool);

        let server = app::run(
            listener,
            ledger,
            issuer,
            verifier,
            commerce,
            email_client,
            pass_signer,
            storage,
            policy,
        )
        .expect("Failed to spawn app instance");
        let _ = tokio::spawn(server);

        let client = Client::new();

        Self {
            addr,
            client,
            commerce_server,
            email_server,
            signer_server,
        }
    }

    pub fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", &self.addr, url);
        self.client.request(method, url)
    }

    pub async fn health_check(&self) -> reqwest::Result<Response> {
        self.request(Method::GET, "health_check").send().await
    }

    pub async fn verify_pass(
        &self,
        serial_number: &str,
        signature: Option<&str>,
    ) -> reqwest::Result<Response> {
        let url = match signature {
            Some(signature) => format!("verify-pass/{}?signature={}", serial_number, signature),
            None => format!("verify-pass/{}", serial_number),
        };
        self.request(Method::GET, &url).send().await
    }
}
