use std::time::Duration;

use anyhow::Context;

use reqwest::Client;

use secrecy::Secret;

use serde::Serialize;

use url::Url;

use crate::domain::EmailAddress;
use crate::model::AnnualMembership;

/// Client for the transactional email REST service.
/// The provider renders the card from a dynamic template; this side only
/// supplies the template data.
#[derive(Debug)]
pub struct EmailClient {
    client: Client,
    sender: EmailAddress,

    api_send_url: Url,
    api_auth_token: Secret<String>,
    template_id: String,
}

impl EmailClient {
    pub fn new(
        sender: EmailAddress,
        api_timeout: Duration,
        api_base_url: Url,
        api_auth_token: Secret<String>,
        template_id: String,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(api_timeout)
            .build()
            .context("Failed to build http client")?;

        let api_send_url = api_base_url
            .join("v3/mail/send")
            .context("Failed to create send email endpoint URL")?;

        Ok(Self {
            client,
            sender,
            api_send_url,
            api_auth_token,
            template_id,
        })
    }

    /// Send the membership-card email
    #[tracing::instrument(name = "Send membership card email", skip(self, card_email))]
    pub async fn send_card_email(
        &self,
        recipient: &EmailAddress,
        card_email: &CardEmail,
    ) -> anyhow::Result<()> {
        use secrecy::ExposeSecret;

        let body = SendEmailRequest {
            personalizations: vec![Personalization {
                to: vec![Party {
                    email: recipient.as_ref(),
                }],
                dynamic_template_data: card_email,
            }],
            from: Party {
                email: self.sender.as_ref(),
            },
            template_id: &self.template_id,
        };

        self.client
            .post(self.api_send_url.clone())
            .bearer_auth(self.api_auth_token.expose_secret())
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Template payload summarizing the member's card
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardEmail {
    pub subject: String,
    pub card_title: String,
    /// Holder's display name
    pub primary_info_text: String,
    /// "Member Since ..." line
    pub secondary_info_text: String,
    /// "Good through ..." line
    pub aux_info_text: String,
    pub serial_number: String,
    /// Time-limited download link to the stored pass artifact
    pub apple_pass_signed_url: String,
    /// Sorted ascending by membership start
    pub membership_history: Vec<AnnualMembership>,
}

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    personalizations: Vec<Personalization<'a>>,
    from: Party<'a>,
    template_id: &'a str,
}

#[derive(Debug, Serialize)]
struct Personalization<'a> {
    to: Vec<Party<'a>>,
    dynamic_template_data: &'a CardEmail,
}

#[derive(Debug, Serialize)]
struct Party<'a> {
    email: &'a str,
}
