use std::time::Duration;

use anyhow::Context;

use chrono::{DateTime, Utc};

use reqwest::Client;

use secrecy::Secret;

use serde::Serialize;

use url::Url;

/// Client for the wallet-pass signer service.
///
/// Pass assembly and the signing ceremony live entirely behind this API; the
/// same request contents produce the same pass, modulo the signer's signing
/// timestamp. A signer failure aborts the current card request — there is no
/// silent retry.
#[derive(Debug)]
pub struct PassSignerClient {
    client: Client,

    api_sign_url: Url,
    api_auth_token: Secret<String>,
}

impl PassSignerClient {
    pub fn new(
        api_base_url: Url,
        api_auth_token: Secret<String>,
        api_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(api_timeout)
            .build()
            .context("Failed to build http client")?;

        let api_sign_url = api_base_url
            .join("passes")
            .context("Failed to create pass signing endpoint URL")?;

        Ok(Self {
            client,
            api_sign_url,
            api_auth_token,
        })
    }

    /// Produce the signed binary pass artifact for a card
    #[tracing::instrument(name = "Sign wallet pass", skip(self, request), fields(serial_number = %request.serial_number))]
    pub async fn sign_pass(&self, request: &PassRequest) -> anyhow::Result<Vec<u8>> {
        use secrecy::ExposeSecret;

        let res = self
            .client
            .post(self.api_sign_url.clone())
            .bearer_auth(self.api_auth_token.expose_secret())
            .json(request)
            .send()
            .await
            .context("Failed to reach pass signer")?
            .error_for_status()
            .context("Pass signer refused the request")?;

        let bytes = res
            .bytes()
            .await
            .context("Failed to read signed pass bytes")?;

        Ok(bytes.to_vec())
    }
}

/// Card attributes the signer bakes into the pass
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassRequest {
    pub serial_number: String,
    pub apple_pass_serial_number: String,
    pub holder_name: String,
    pub member_since: DateTime<Utc>,
    pub member_until: DateTime<Utc>,
    /// Embedded in the pass barcode for out-of-band checks
    pub verification_url: String,
}
