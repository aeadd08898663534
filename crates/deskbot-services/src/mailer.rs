//! Welcome-email resend client.

use crate::{endpoint, ensure_success};
use async_trait::async_trait;
use deskbot_core::{error::DeskbotError, traits::Mailer};
use tracing::{debug, info};

const SERVICE: &str = "email service";

pub struct MailerClient {
    client: reqwest::Client,
    base_url: String,
}

impl MailerClient {
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }
}

#[async_trait]
impl Mailer for MailerClient {
    async fn send_welcome_email(&self) -> Result<(), DeskbotError> {
        let url = endpoint(&self.base_url, "welcome-email/resend");
        debug!("mailer: POST {url}");

        let resp = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(|e| DeskbotError::collaborator(SERVICE, format!("request failed: {e}")))?;
        ensure_success(SERVICE, resp).await?;

        info!("welcome email resend accepted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_mailer_is_collaborator_error() {
        let client = MailerClient::new(reqwest::Client::new(), "http://127.0.0.1:1".into());
        let err = client.send_welcome_email().await.unwrap_err();
        assert_eq!(err.service(), Some("email service"));
    }
}
