//! Outbound email.
//!
//! Bodies are wrapped in a small HTML layout with title and body slots.
//! [`LogMailer`] records mail instead of delivering it.

use std::sync::Mutex;

use thiserror::Error;

use crate::render::escape_html;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MailError {
    #[error("no recipient given")]
    NoRecipient,

    #[error("invalid recipient `{0}`")]
    InvalidRecipient(String),
}

pub trait Mailer: Send + Sync + 'static {
    /// `to` may list several recipients separated by `;`.
    fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError>;
}

const LAYOUT: &str = r#"<html>
<body>
<div style="width: 600px; margin: auto; border: 1px solid #ccc; border-radius: 5px; padding: 20px;">
<div style="font-size: 24px;">Notebook <span style="font-size: 14px;">| $title</span></div>
<hr style="border: none; border-top: 1px solid #ccc"/>
<div style="margin-top: 20px; font-size: 14px;">$body</div>
</div>
</body>
</html>
"#;

/// Wrap an HTML body fragment in the mail layout.
pub fn wrap_body(title: &str, body: &str) -> String {
    LAYOUT
        .replacen("$title", &escape_html(title), 1)
        .replacen("$body", body, 1)
}

/// Split and check a `;`-separated recipient list.
pub fn parse_recipients(to: &str) -> Result<Vec<String>, MailError> {
    let recipients: Vec<String> = to
        .split(';')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect();
    if recipients.is_empty() {
        return Err(MailError::NoRecipient);
    }
    if let Some(bad) = recipients.iter().find(|r| !r.contains('@')) {
        return Err(MailError::InvalidRecipient(bad.clone()));
    }
    Ok(recipients)
}

/// A message accepted by a [`Mailer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
}

/// Mailer that logs each message and keeps an outbox.
#[derive(Debug)]
pub struct LogMailer {
    from: String,
    outbox: Mutex<Vec<SentMail>>,
}

impl LogMailer {
    pub fn new(from: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            outbox: Mutex::new(Vec::new()),
        }
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.outbox.lock().expect("outbox mutex poisoned").clone()
    }
}

impl Mailer for LogMailer {
    fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        let to = parse_recipients(to)?;
        tracing::info!(
            from = %self.from,
            to = %to.join(";"),
            subject = %subject,
            "Sending email"
        );
        let mail = SentMail {
            from: self.from.clone(),
            to,
            subject: subject.to_string(),
            html: wrap_body(subject, body),
        };
        self.outbox.lock().expect("outbox mutex poisoned").push(mail);
        Ok(())
    }
}
