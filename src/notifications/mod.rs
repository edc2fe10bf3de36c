//! Notification gateway: outbound owner/supplier email at the interface
//! boundary. The gateway never retries; the workflow controller decides how
//! to react to a transport fault.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("transport failure: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for NotificationError {
    fn from(err: reqwest::Error) -> Self {
        NotificationError::Transport(err.to_string())
    }
}

/// One outbound message. `cc` is the optional secondary recipient.
#[derive(Debug, Clone, Serialize)]
pub struct OutboundEmail {
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cc: Option<String>,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait NotificationGateway: Send + Sync {
    async fn send(&self, email: &OutboundEmail) -> Result<(), NotificationError>;
}

/// Delivers mail by posting JSON to an HTTP mail-relay endpoint (the
/// SMTP-equivalent transport). Authentication is a bearer token; a non-2xx
/// response is a transport fault.
pub struct RelayMailer {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
    from: String,
}

#[derive(Serialize)]
struct RelayRequest<'a> {
    from: &'a str,
    #[serde(flatten)]
    email: &'a OutboundEmail,
}

impl RelayMailer {
    pub fn new(endpoint: String, token: Option<String>, from: String) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            endpoint,
            token,
            from,
        }
    }
}

#[async_trait]
impl NotificationGateway for RelayMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<(), NotificationError> {
        let mut request = self.client.post(&self.endpoint).json(&RelayRequest {
            from: &self.from,
            email,
        });
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(NotificationError::Transport(format!(
                "relay returned {} for {}",
                response.status(),
                email.to
            )));
        }
        debug!(to = %email.to, subject = %email.subject, "mail accepted by relay");
        Ok(())
    }
}

/// Capture backend for development and tests. Sends succeed unless the
/// recipient is on the deny list or the body matches a registered failure
/// substring.
#[derive(Default)]
pub struct InMemoryNotifier {
    sent: Mutex<Vec<OutboundEmail>>,
    deny_recipients: Mutex<Vec<String>>,
    deny_body_substrings: Mutex<Vec<String>>,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything accepted so far, in send order.
    pub async fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().await.clone()
    }

    /// Future sends to this address fail with a transport error.
    pub async fn fail_recipient(&self, address: &str) {
        self.deny_recipients.lock().await.push(address.to_string());
    }

    /// Future sends whose body contains this substring fail. Lets tests fault
    /// a single candidate inside a batch that all goes to one owner address.
    pub async fn fail_body_containing(&self, needle: &str) {
        self.deny_body_substrings.lock().await.push(needle.to_string());
    }
}

#[async_trait]
impl NotificationGateway for InMemoryNotifier {
    async fn send(&self, email: &OutboundEmail) -> Result<(), NotificationError> {
        if self.deny_recipients.lock().await.iter().any(|a| a == &email.to) {
            return Err(NotificationError::Transport(format!(
                "recipient {} refused",
                email.to
            )));
        }
        if self
            .deny_body_substrings
            .lock()
            .await
            .iter()
            .any(|n| email.body.contains(n))
        {
            return Err(NotificationError::Transport("message refused".to_string()));
        }
        self.sent.lock().await.push(email.clone());
        Ok(())
    }
}
