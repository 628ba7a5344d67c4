//! Alert delivery.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time;

use crate::alert::event::{AlertMessage, Severity};

/// Failure to hand a message to the mail system. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AlertError {
    #[error("failed to start {program}: {reason}")]
    Spawn { program: String, reason: String },

    #[error("mail delivery failed: {0}")]
    Delivery(String),

    #[error("mail delivery timed out after {0:?}")]
    Timeout(Duration),
}

/// Delivers rendered alerts.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &AlertMessage) -> Result<(), AlertError>;
}

/// Hands messages to the local MTA through `sendmail -t -i`.
#[derive(Debug, Clone)]
pub struct SendmailMailer {
    program: PathBuf,
    from: String,
    timeout: Duration,
}

impl SendmailMailer {
    pub fn new(program: impl Into<PathBuf>, from: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            from: from.into(),
            timeout,
        }
    }

    /// RFC 5322 message text.
    pub fn format(&self, message: &AlertMessage) -> String {
        format!(
            "From: {}\r\nTo: {}\r\nSubject: {}\r\nDate: {}\r\nX-Priority: {}\r\nContent-Type: text/plain; charset=utf-8\r\n\r\n{}",
            header_value(&self.from),
            header_value(&message.to),
            header_value(&message.subject),
            Utc::now().to_rfc2822(),
            priority(message),
            message.body.replace('\n', "\r\n"),
        )
    }

    async fn deliver(&self, text: String) -> Result<(), AlertError> {
        let mut child = Command::new(&self.program)
            .args(["-t", "-i"])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AlertError::Spawn {
                program: self.program.display().to_string(),
                reason: e.to_string(),
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .await
                .map_err(|e| AlertError::Delivery(e.to_string()))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| AlertError::Delivery(e.to_string()))?;

        if output.status.success() {
            Ok(())
        } else {
            Err(AlertError::Delivery(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }
}

/// Header values are single lines; control characters would start new headers.
fn header_value(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}

fn priority(message: &AlertMessage) -> u8 {
    match message.severity {
        Severity::Critical | Severity::Error => 1,
        Severity::Warning => 2,
        Severity::Notice => 3,
    }
}

#[async_trait]
impl Mailer for SendmailMailer {
    async fn send(&self, message: &AlertMessage) -> Result<(), AlertError> {
        let text = self.format(message);
        match time::timeout(self.timeout, self.deliver(text)).await {
            Ok(result) => result,
            Err(_) => Err(AlertError::Timeout(self.timeout)),
        }
    }
}
