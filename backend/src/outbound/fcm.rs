//! Firebase Cloud Messaging (HTTP v1) adapter for the [`PushNotifier`] port.
//!
//! A service-account JWT (RS256) is exchanged for an OAuth access token,
//! which is cached until shortly before it expires.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use mockable::Clock;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::domain::ports::{PushError, PushMessage, PushNotifier};

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Refresh this long before the access token actually expires.
const EXPIRY_MARGIN_SECS: i64 = 60;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Service-account credentials.
#[derive(Clone)]
pub struct FcmConfig {
    pub project_id: String,
    pub client_email: String,
    /// PEM private key. Escaped `\n` sequences from env files are accepted.
    pub private_key: String,
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'static str,
    aud: &'static str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Reqwest-backed FCM sender.
pub struct FcmPushNotifier {
    client: Client,
    project_id: String,
    client_email: String,
    key: EncodingKey,
    token: Mutex<Option<CachedToken>>,
    clock: Arc<dyn Clock>,
}

impl FcmPushNotifier {
    /// # Errors
    /// Returns [`PushError::Auth`] when the private key is not valid RSA PEM
    /// and [`PushError::Delivery`] when the HTTP client cannot be built.
    pub fn new(config: FcmConfig, clock: Arc<dyn Clock>) -> Result<Self, PushError> {
        let pem = config.private_key.replace("\\n", "\n");
        let key = EncodingKey::from_rsa_pem(pem.as_bytes())
            .map_err(|err| PushError::auth(err.to_string()))?;
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| PushError::delivery(err.to_string()))?;
        Ok(Self {
            client,
            project_id: config.project_id,
            client_email: config.client_email,
            key,
            token: Mutex::new(None),
            clock,
        })
    }

    fn assertion(&self, now: DateTime<Utc>) -> Result<String, PushError> {
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: SCOPE,
            aud: TOKEN_URL,
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        };
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.key)
            .map_err(|err| PushError::auth(err.to_string()))
    }

    async fn access_token(&self) -> Result<String, PushError> {
        let now = self.clock.utc();
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.expires_at > now) {
            return Ok(token.value.clone());
        }

        let assertion = self.assertion(now)?;
        let response = self
            .client
            .post(TOKEN_URL)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .map_err(|err| PushError::auth(err.to_string()))?;
        if !response.status().is_success() {
            return Err(PushError::auth(format!(
                "token exchange returned {}",
                response.status()
            )));
        }
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|err| PushError::auth(err.to_string()))?;
        let lifetime = (token.expires_in - EXPIRY_MARGIN_SECS).max(0);
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: now + chrono::Duration::seconds(lifetime),
        });
        debug!("refreshed FCM access token");
        Ok(token.access_token)
    }

    fn send_url(&self) -> String {
        format!(
            "https://fcm.googleapis.com/v1/projects/{}/messages:send",
            self.project_id
        )
    }
}

fn message_body(token: &str, message: &PushMessage) -> serde_json::Value {
    let mut body = json!({
        "message": {
            "token": token,
            "notification": { "title": message.title, "body": message.body },
        }
    });
    if let Some(link) = &message.link {
        body["message"]["data"] = json!({ "link": link });
    }
    body
}

#[async_trait]
impl PushNotifier for FcmPushNotifier {
    async fn send(&self, tokens: &[String], message: &PushMessage) -> Result<usize, PushError> {
        if tokens.is_empty() {
            return Ok(0);
        }
        let access_token = self.access_token().await?;
        let url = self.send_url();
        let mut delivered = 0;
        for token in tokens {
            let result = self
                .client
                .post(&url)
                .bearer_auth(&access_token)
                .json(&message_body(token, message))
                .send()
                .await;
            match result {
                Ok(response) if response.status().is_success() => delivered += 1,
                Ok(response) => {
                    warn!(status = %response.status(), "FCM rejected a device token");
                }
                Err(err) => warn!(error = %err, "FCM request failed"),
            }
        }
        if delivered == 0 {
            return Err(PushError::delivery("no device accepted the message"));
        }
        Ok(delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn message_carries_link_as_data() {
        let body = message_body(
            "device-1",
            &PushMessage {
                title: "New notes".into(),
                body: "DBMS unit 3".into(),
                link: Some("/materials/1".into()),
            },
        );
        assert_eq!(body["message"]["token"], "device-1");
        assert_eq!(body["message"]["notification"]["title"], "New notes");
        assert_eq!(body["message"]["data"]["link"], "/materials/1");
    }

    #[rstest]
    fn message_without_link_has_no_data() {
        let body = message_body(
            "device-1",
            &PushMessage {
                title: "t".into(),
                body: "b".into(),
                link: None,
            },
        );
        assert!(body["message"].get("data").is_none());
    }

    #[rstest]
    fn rejects_a_non_rsa_key() {
        let result = FcmPushNotifier::new(
            FcmConfig {
                project_id: "digidiploma".into(),
                client_email: "push@digidiploma.iam.gserviceaccount.com".into(),
                private_key: "not a key".into(),
            },
            Arc::new(mockable::DefaultClock),
        );
        assert!(matches!(result, Err(PushError::Auth { .. })));
    }
}
