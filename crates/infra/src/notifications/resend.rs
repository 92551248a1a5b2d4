//! Resend HTTP email transport.

use std::time::Duration;

use async_trait::async_trait;
use callslot_core::{EmailMessage, Mailer};
use callslot_domain::{CallSlotError, EmailConfig, Result};
use reqwest::Method;
use serde::Serialize;
use tracing::debug;

use crate::http::HttpClient;

#[derive(Serialize)]
struct SendEmail<'a> {
    from: &'a str,
    to: &'a [String],
    subject: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    html: &'a str,
}

pub struct ResendMailer {
    api_key: String,
    from: String,
    api_base: String,
    http: HttpClient,
}

impl ResendMailer {
    pub fn new(api_key: impl Into<String>, from: impl Into<String>, api_base: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into().trim().to_string();
        if api_key.is_empty() {
            return Err(CallSlotError::Config("RESEND_API_KEY is required.".into()));
        }
        let from = from.into().trim().to_string();
        if from.is_empty() {
            return Err(CallSlotError::Config("EMAIL_FROM is required.".into()));
        }
        let http = HttpClient::builder()
            .timeout(Some(Duration::from_secs(15)))
            .max_attempts(3)
            .build()?;
        Ok(Self { api_key, from, api_base: api_base.into().trim_end_matches('/').to_string(), http })
    }

    pub fn from_config(config: &EmailConfig) -> Result<Self> {
        Self::new(
            config.resend_api_key.clone().unwrap_or_default(),
            config.from.clone(),
            config.resend_api_base.clone(),
        )
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, message: EmailMessage) -> Result<()> {
        if message.to.is_empty() {
            return Err(CallSlotError::Config("Email recipient is required".into()));
        }
        let body = SendEmail {
            from: &self.from,
            to: &message.to,
            subject: &message.subject,
            text: &message.text,
            html: &message.html,
        };
        let request = self
            .http
            .request(Method::POST, format!("{}/emails", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&body);

        let response = self.http.send(request).await?;
        let status = response.status();
        if status.is_success() {
            debug!(subject = %message.subject, recipients = message.to.len(), "email sent via resend");
            return Ok(());
        }

        let detail = response.text().await.unwrap_or_default();
        let detail = if detail.trim().is_empty() {
            status.canonical_reason().unwrap_or("unknown status").to_string()
        } else {
            detail
        };
        Err(CallSlotError::Network(format!("Resend API error ({}): {detail}", status.as_u16())))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn message() -> EmailMessage {
        EmailMessage {
            to: vec!["owner@example.com".into()],
            subject: "Portfolio: New call booking".into(),
            text: "plain".into(),
            html: "<p>html</p>".into(),
        }
    }

    #[tokio::test]
    async fn posts_message_with_bearer_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .and(header("authorization", "Bearer re_test"))
            .and(body_json(json!({
                "from": "calls@example.com",
                "to": ["owner@example.com"],
                "subject": "Portfolio: New call booking",
                "text": "plain",
                "html": "<p>html</p>"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "em_1" })))
            .expect(1)
            .mount(&server)
            .await;

        let mailer = ResendMailer::new("re_test", "calls@example.com", server.uri()).expect("mailer");
        mailer.send(message()).await.expect("sent");
    }

    #[tokio::test]
    async fn client_error_is_reported_with_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(422).set_body_string("invalid from"))
            .expect(1)
            .mount(&server)
            .await;

        let mailer = ResendMailer::new("re_test", "calls@example.com", server.uri()).expect("mailer");
        let err = mailer.send(message()).await.expect_err("rejected");
        assert_eq!(err, CallSlotError::Network("Resend API error (422): invalid from".into()));
    }

    #[test]
    fn requires_key_and_sender() {
        assert!(ResendMailer::new("", "calls@example.com", "http://localhost").is_err());
        assert!(ResendMailer::new("re_test", " ", "http://localhost").is_err());
    }
}
