// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Outbound Mail
//!
//! Transactional email behind the [`Mailer`] trait.
//!
//! - [`SendGridMailer`]: SendGrid v3 HTTP API, retried with linear backoff
//! - [`LogMailer`]: development fallback that only logs the rendered mail
//!
//! Templates are compiled in and rendered by substituting `{{key}}`
//! placeholders with HTML-escaped values.

use std::collections::BTreeMap;

use async_trait::async_trait;

pub mod sendgrid;

pub use sendgrid::SendGridMailer;

/// Display name used as the sender.
pub const FROM_NAME: &str = "Social";

/// Attempts made before a send is reported as failed.
pub const MAX_RETRIES: u32 = 3;

/// Values substituted into a template.
pub type TemplateVars = BTreeMap<&'static str, String>;

#[derive(Debug, thiserror::Error)]
pub enum MailerError {
    #[error("failed to send email to {recipient} after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        recipient: String,
        attempts: u32,
        last_error: String,
    },
    #[error("mail client error: {0}")]
    Client(String),
}

/// Compiled-in email templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    /// Sent on registration; expects `username` and `activation_url`.
    UserWelcome,
}

impl Template {
    fn subject_source(&self) -> &'static str {
        match self {
            Template::UserWelcome => "Finish registration with Social",
        }
    }

    fn body_source(&self) -> &'static str {
        match self {
            Template::UserWelcome => {
                r#"<!doctype html>
<html>
  <body>
    <p>Hi {{username}},</p>
    <p>Thanks for signing up for Social. We're excited to have you on board!</p>
    <p>Before you can start using Social, you must confirm your email address.
      Click the link below to confirm:</p>
    <p><a href="{{activation_url}}">{{activation_url}}</a></p>
    <p>If you didn't sign up for Social, you can safely ignore this email.</p>
    <p>Thanks,<br>The Social Team</p>
  </body>
</html>
"#
            }
        }
    }

    /// Render `(subject, html_body)`.
    pub fn render(&self, vars: &TemplateVars) -> (String, String) {
        (
            substitute(self.subject_source(), vars),
            substitute(self.body_source(), vars),
        )
    }
}

fn substitute(source: &str, vars: &TemplateVars) -> String {
    vars.iter().fold(source.to_string(), |text, (key, value)| {
        text.replace(&format!("{{{{{key}}}}}"), &escape_html(value))
    })
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&#34;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Transactional mail sender.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Render `template` with `vars` and deliver it.
    ///
    /// `sandbox` asks the provider to validate without delivering.
    async fn send(
        &self,
        template: Template,
        recipient_name: &str,
        recipient_email: &str,
        vars: &TemplateVars,
        sandbox: bool,
    ) -> Result<(), MailerError>;
}

/// Mailer that writes the rendered message to the log instead of sending it.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(
        &self,
        template: Template,
        recipient_name: &str,
        recipient_email: &str,
        vars: &TemplateVars,
        sandbox: bool,
    ) -> Result<(), MailerError> {
        let (subject, body) = template.render(vars);
        tracing::info!(
            to = %recipient_email,
            name = %recipient_name,
            subject = %subject,
            sandbox,
            "Email not sent (no mail provider configured)"
        );
        tracing::debug!(body = %body, "Rendered email body");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> TemplateVars {
        TemplateVars::from([
            ("username", "alice".to_string()),
            (
                "activation_url",
                "http://localhost:3000/confirm/abc".to_string(),
            ),
        ])
    }

    #[test]
    fn welcome_template_substitutes_placeholders() {
        let (subject, body) = Template::UserWelcome.render(&vars());
        assert_eq!(subject, "Finish registration with Social");
        assert!(body.contains("Hi alice,"));
        assert!(body.contains(r#"href="http://localhost:3000/confirm/abc""#));
        assert!(!body.contains("{{"));
    }

    #[test]
    fn values_are_html_escaped() {
        let vars = TemplateVars::from([("username", "<b>&".to_string())]);
        let (_, body) = Template::UserWelcome.render(&vars);
        assert!(body.contains("Hi &lt;b&gt;&amp;,"));
    }

    #[tokio::test]
    async fn log_mailer_always_succeeds() {
        LogMailer
            .send(Template::UserWelcome, "alice", "a@example.com", &vars(), true)
            .await
            .unwrap();
    }
}
