//! SendGrid v3 mail-send adapter.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::debug;
use zeroize::Zeroizing;

use crate::domain::Email;
use crate::domain::ports::{EmailMessage, MailError, Mailer};

const SEND_URL: &str = "https://api.sendgrid.com/v3/mail/send";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct Address<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Serialize)]
struct Personalization<'a> {
    to: [Address<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    value: &'a str,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    personalizations: [Personalization<'a>; 1],
    from: Address<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<Address<'a>>,
    subject: &'a str,
    content: [Content<'a>; 2],
}

/// Sends mail through the SendGrid HTTP API.
pub struct SendGridMailer {
    client: Client,
    api_key: Zeroizing<String>,
    from: Email,
    from_name: String,
    endpoint: String,
}

impl SendGridMailer {
    /// # Errors
    /// Returns the reqwest error when the HTTP client cannot be built.
    pub fn new(
        api_key: impl Into<String>,
        from: Email,
        from_name: impl Into<String>,
    ) -> Result<Self, reqwest::Error> {
        Self::with_endpoint(api_key, from, from_name, SEND_URL)
    }

    /// Point the adapter at a different API base, for tests and proxies.
    ///
    /// # Errors
    /// Returns the reqwest error when the HTTP client cannot be built.
    pub fn with_endpoint(
        api_key: impl Into<String>,
        from: Email,
        from_name: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            api_key: Zeroizing::new(api_key.into()),
            from,
            from_name: from_name.into(),
            endpoint: endpoint.into(),
        })
    }

    fn request<'a>(&'a self, message: &'a EmailMessage) -> SendRequest<'a> {
        SendRequest {
            personalizations: [Personalization {
                to: [Address {
                    email: message.to.as_ref(),
                    name: None,
                }],
            }],
            from: Address {
                email: self.from.as_ref(),
                name: Some(self.from_name.as_str()),
            },
            reply_to: message.reply_to.as_ref().map(|email| Address {
                email: email.as_ref(),
                name: None,
            }),
            subject: &message.subject,
            content: [
                Content {
                    kind: "text/plain",
                    value: &message.text,
                },
                Content {
                    kind: "text/html",
                    value: &message.html,
                },
            ],
        }
    }
}

#[async_trait]
impl Mailer for SendGridMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.as_str())
            .json(&self.request(message))
            .send()
            .await
            .map_err(|err| MailError::transport(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            debug!(to = %message.to, "sendgrid accepted message");
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                MailError::rejected(format!("{status}: {body}"))
            }
            _ => MailError::transport(format!("{status}: {body}")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn request_body_matches_the_v3_shape() {
        let mailer = SendGridMailer::new(
            "SG.key",
            Email::new("noreply@digidiploma.in").expect("from"),
            "DigiDiploma",
        )
        .expect("client");
        let message = EmailMessage {
            to: Email::new("student@example.com").expect("to"),
            subject: "Welcome".into(),
            html: "<p>Hi</p>".into(),
            text: "Hi".into(),
            reply_to: Some(Email::new("asha@example.com").expect("reply")),
        };

        let body = serde_json::to_value(mailer.request(&message)).expect("serialise");
        assert_eq!(body["personalizations"][0]["to"][0]["email"], "student@example.com");
        assert_eq!(body["from"]["name"], "DigiDiploma");
        assert_eq!(body["reply_to"]["email"], "asha@example.com");
        assert_eq!(body["content"][0]["type"], "text/plain");
        assert_eq!(body["content"][1]["value"], "<p>Hi</p>");
    }
}
