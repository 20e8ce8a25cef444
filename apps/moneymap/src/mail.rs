//! # Mail
//!
//! Outgoing mail for password resets and the `test-email` command.
//!
//! With SMTP credentials configured, messages go through a STARTTLS relay via
//! lettre. Without them the [`Mailer::Log`] variant records the message at
//! `info` instead, so a development server still shows the reset link.

use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

const SENDER_NAME: &str = "MoneyMap";

pub const RESET_SUBJECT: &str = "MoneyMap - Password Reset Request";
pub const TEST_SUBJECT: &str = "MoneyMap Email Test";

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("could not build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("smtp error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("email credentials are not configured")]
    NotConfigured,
}

/// SMTP relay settings.
#[derive(Clone)]
pub struct MailSettings {
    pub smtp_host: String,
    pub smtp_port: u16,
    /// Login and password; the login doubles as the sender address.
    pub credentials: Option<(String, String)>,
}

impl fmt::Debug for MailSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailSettings")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("user", &self.credentials.as_ref().map(|(user, _)| user))
            .finish_non_exhaustive()
    }
}

/// A message ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Where outgoing mail goes.
pub enum Mailer {
    Smtp {
        transport: AsyncSmtpTransport<Tokio1Executor>,
        from: Mailbox,
    },
    /// Log the message instead of sending it.
    Log,
    /// Keep messages in memory.
    Capture(Arc<Mutex<Vec<OutgoingMail>>>),
}

impl fmt::Debug for Mailer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Smtp { from, .. } => write!(f, "Mailer::Smtp({from})"),
            Self::Log => f.write_str("Mailer::Log"),
            Self::Capture(_) => f.write_str("Mailer::Capture"),
        }
    }
}

impl Mailer {
    /// An SMTP mailer when credentials are present, otherwise a logging one.
    pub fn from_settings(settings: &MailSettings) -> Result<Self, MailError> {
        match &settings.credentials {
            Some(_) => Self::smtp(settings),
            None => Ok(Self::Log),
        }
    }

    /// An SMTP mailer; fails when no credentials are configured.
    pub fn smtp(settings: &MailSettings) -> Result<Self, MailError> {
        let (user, password) = settings
            .credentials
            .clone()
            .ok_or(MailError::NotConfigured)?;
        let from = Mailbox::new(Some(SENDER_NAME.to_string()), user.parse()?);
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.smtp_host)?
            .port(settings.smtp_port)
            .credentials(Credentials::new(user, password))
            .build();
        Ok(Self::Smtp { transport, from })
    }

    /// A mailer that stores messages, plus the handle to read them back.
    #[must_use]
    pub fn capture() -> (Self, Arc<Mutex<Vec<OutgoingMail>>>) {
        let outbox = Arc::new(Mutex::new(Vec::new()));
        (Self::Capture(Arc::clone(&outbox)), outbox)
    }

    pub async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        match self {
            Self::Smtp { transport, from } => {
                let message = Message::builder()
                    .from(from.clone())
                    .to(mail.to.parse()?)
                    .subject(mail.subject)
                    .multipart(MultiPart::alternative_plain_html(mail.text, mail.html))?;
                transport.send(message).await?;
                tracing::info!(to = %mail.to, "mail sent");
            }
            Self::Log => {
                tracing::info!(to = %mail.to, subject = %mail.subject, body = %mail.text, "mail not sent (no SMTP credentials)");
            }
            Self::Capture(outbox) => {
                outbox
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(mail);
            }
        }
        Ok(())
    }
}

/// The link a reset email points at.
#[must_use]
pub fn reset_link(frontend_url: &str, token: &str) -> String {
    format!("{}/reset-password?token={}", frontend_url.trim_end_matches('/'), token)
}

/// The password reset message.
#[must_use]
pub fn reset_email(to: &str, username: &str, link: &str) -> OutgoingMail {
    let name = escape_html(username);
    let href = escape_html(link);
    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>Password Reset - MoneyMap</title>
  <style>
    body {{ font-family: Arial, sans-serif; line-height: 1.6; color: #333; }}
    .container {{ max-width: 600px; margin: 0 auto; padding: 20px; }}
    .header {{ background: #059669; color: white; padding: 30px; text-align: center; border-radius: 10px 10px 0 0; }}
    .content {{ background: #f8fafc; padding: 30px; border-radius: 0 0 10px 10px; }}
    .button {{ display: inline-block; background: #059669; color: white; padding: 15px 30px; text-decoration: none; border-radius: 5px; margin: 20px 0; }}
  </style>
</head>
<body>
  <div class="container">
    <div class="header">
      <h1>MoneyMap</h1>
      <p>Password Reset Request</p>
    </div>
    <div class="content">
      <h2>Hello {name}!</h2>
      <p>We received a request to reset your password for your MoneyMap account.</p>
      <p>Click the button below to reset your password:</p>
      <a href="{href}" class="button">Reset My Password</a>
      <p><strong>This link will expire in 1 hour for security reasons.</strong></p>
      <p>If you didn't request this password reset, please ignore this email.</p>
      <hr style="margin: 30px 0; border: none; border-top: 1px solid #ddd;">
      <p style="font-size: 14px; color: #666;">
        If the button doesn't work, copy and paste this link into your browser:<br>
        <a href="{href}">{href}</a>
      </p>
    </div>
  </div>
</body>
</html>
"#
    );
    let text = format!(
        "Hello {username}!\n\n\
         We received a request to reset your password for your MoneyMap account.\n\n\
         Reset your password here: {link}\n\n\
         This link will expire in 1 hour for security reasons.\n\
         If you didn't request this password reset, please ignore this email.\n"
    );
    OutgoingMail {
        to: to.to_string(),
        subject: RESET_SUBJECT.to_string(),
        text,
        html,
    }
}

/// The message sent by `moneymap test-email`.
#[must_use]
pub fn test_email(to: &str) -> OutgoingMail {
    let text = "Hello!\n\n\
                This is a test email from MoneyMap.\n\
                If you receive this, your email configuration is working correctly!\n\n\
                Best regards,\n\
                MoneyMap Team\n";
    OutgoingMail {
        to: to.to_string(),
        subject: TEST_SUBJECT.to_string(),
        text: text.to_string(),
        html: format!("<p>{}</p>", text.replace("\n\n", "</p><p>").replace('\n', "<br>")),
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_link_joins_cleanly() {
        assert_eq!(
            reset_link("http://localhost:5173/", "abc"),
            "http://localhost:5173/reset-password?token=abc"
        );
    }

    #[test]
    fn reset_email_content() {
        let link = reset_link("https://app.example", "tok-123");
        let mail = reset_email("ana@example.com", "<ana>", &link);
        assert_eq!(mail.subject, RESET_SUBJECT);
        assert!(mail.html.contains("Hello &lt;ana&gt;!"));
        assert!(mail.html.contains("Reset My Password"));
        assert!(mail.html.contains("https://app.example/reset-password?token=tok-123"));
        assert!(mail.html.contains("This link will expire in 1 hour for security reasons."));
        assert!(mail.text.contains(&link));
    }

    #[tokio::test]
    async fn capture_keeps_messages() {
        let (mailer, outbox) = Mailer::capture();
        mailer.send(test_email("me@example.com")).await.unwrap();
        let sent = outbox.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, TEST_SUBJECT);
    }

    #[test]
    fn smtp_needs_credentials() {
        let settings = MailSettings {
            smtp_host: "smtp.example.com".into(),
            smtp_port: 587,
            credentials: None,
        };
        assert!(matches!(Mailer::smtp(&settings), Err(MailError::NotConfigured)));
        assert!(matches!(Mailer::from_settings(&settings), Ok(Mailer::Log)));
    }
}
