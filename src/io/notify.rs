//! Notifiers
//!
//! Mail delivery is left to external tooling; the notifiers here report the
//! verdict list through the log or keep it in memory.

use std::fmt;
use std::sync::Mutex;

use crate::config::EmailConfig;
use crate::engine::AnomalyVerdict;
use crate::error::Result;
use crate::io::Notifier;

impl fmt::Display for AnomalyVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Day: {}, Graph: {}, Columns: {}",
            self.day,
            self.group,
            self.columns.join(", ")
        )
    }
}

/// Simple logging notifier
#[derive(Debug, Default)]
pub struct LoggingNotifier {
    /// Prefix for log messages
    prefix: String,
    /// Recipients named in the log line, if mail settings were configured
    recipients: Vec<String>,
}

impl LoggingNotifier {
    pub fn new(prefix: impl Into<String>) -> Self {
        LoggingNotifier {
            prefix: prefix.into(),
            recipients: Vec::new(),
        }
    }

    /// Takes the subject and recipients from the mail settings.
    pub fn from_email(email: &EmailConfig) -> Self {
        LoggingNotifier {
            prefix: email.subject.clone(),
            recipients: email.recipients.clone(),
        }
    }
}

/// Message body for a batch: one `Day/Graph/Columns` line per verdict, groups
/// without anomalies included.
pub fn render_message(verdicts: &[AnomalyVerdict]) -> String {
    verdicts
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

impl Notifier for LoggingNotifier {
    fn notify(&self, verdicts: &[AnomalyVerdict]) -> Result<()> {
        if !self.recipients.is_empty() {
            log::info!(
                "{}: would notify {}:\n{}",
                self.prefix,
                self.recipients.join(", "),
                render_message(verdicts)
            );
        }
        for verdict in verdicts {
            if verdict.has_anomalies() {
                log::warn!("{} ANOMALY: {}", self.prefix, verdict);
            } else {
                log::info!("{}: {}", self.prefix, verdict);
            }
        }
        if verdicts.iter().all(|v| !v.has_anomalies()) {
            log::info!("{}: no anomalies in {} group(s)", self.prefix, verdicts.len());
        }
        Ok(())
    }
}

/// Keeps every notified batch; useful in tests and embedding code.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    batches: Mutex<Vec<Vec<AnomalyVerdict>>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// All batches received so far
    pub fn batches(&self) -> Vec<Vec<AnomalyVerdict>> {
        self.batches
            .lock()
            .map(|batches| batches.to_vec())
            .unwrap_or_default()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, verdicts: &[AnomalyVerdict]) -> Result<()> {
        if let Ok(mut batches) = self.batches.lock() {
            batches.push(verdicts.to_vec());
        }
        Ok(())
    }
}
