// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! SendGrid v3 mail client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{info, warn};

use super::{Mailer, MailerError, Template, TemplateVars, FROM_NAME, MAX_RETRIES};

const DEFAULT_API_BASE_URL: &str = "https://api.sendgrid.com";

pub struct SendGridMailer {
    http: Client,
    api_base_url: String,
    api_key: String,
    from_email: String,
    max_retries: u32,
    backoff: Duration,
}

impl SendGridMailer {
    pub fn new(from_email: impl Into<String>, api_key: impl Into<String>) -> Result<Self, MailerError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| MailerError::Client(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_key: api_key.into(),
            from_email: from_email.into(),
            max_retries: MAX_RETRIES,
            backoff: Duration::from_secs(1),
        })
    }

    /// Point the client at another API host.
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Base delay; attempt `n` (1-based) waits `n * backoff` after failing.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    async fn post_once(&self, payload: &serde_json::Value) -> Result<u16, String> {
        let response = self
            .http
            .post(format!(
                "{}/v3/mail/send",
                self.api_base_url.trim_end_matches('/')
            ))
            .bearer_auth(&self.api_key)
            .json(payload)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("SendGrid returned {status}: {body}"));
        }
        Ok(status.as_u16())
    }
}

#[async_trait]
impl Mailer for SendGridMailer {
    async fn send(
        &self,
        template: Template,
        recipient_name: &str,
        recipient_email: &str,
        vars: &TemplateVars,
        sandbox: bool,
    ) -> Result<(), MailerError> {
        let (subject, body) = template.render(vars);
        let payload = json!({
            "personalizations": [{
                "to": [{ "email": recipient_email, "name": recipient_name }]
            }],
            "from": { "email": self.from_email, "name": FROM_NAME },
            "subject": subject,
            "content": [{ "type": "text/html", "value": body }],
            "mail_settings": { "sandbox_mode": { "enable": sandbox } }
        });

        let mut last_error = String::new();
        for attempt in 1..=self.max_retries {
            match self.post_once(&payload).await {
                Ok(status) => {
                    info!(to = %recipient_email, status, "Email sent");
                    return Ok(());
                }
                Err(e) => {
                    warn!(
                        to = %recipient_email,
                        attempt,
                        max_attempts = self.max_retries,
                        error = %e,
                        "Failed to send email"
                    );
                    last_error = e;
                    if attempt < self.max_retries {
                        tokio::time::sleep(self.backoff * attempt).await;
                    }
                }
            }
        }

        Err(MailerError::RetriesExhausted {
            recipient: recipient_email.to_string(),
            attempts: self.max_retries,
            last_error,
        })
    }
}
