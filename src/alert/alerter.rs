//! Alert dispatch with warning de-duplication.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::alert::event::{AlertEvent, AlertMessage};
use crate::alert::mailer::Mailer;
use crate::health::WarningFlags;
use crate::node::ServerPair;
use crate::observability::metrics;

/// What happened to a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// An identical warning went out within the de-duplication window.
    Suppressed,
    /// The mailer failed; the failure was logged.
    Failed,
}

impl Delivery {
    fn as_str(self) -> &'static str {
        match self {
            Delivery::Sent => "sent",
            Delivery::Suppressed => "suppressed",
            Delivery::Failed => "failed",
        }
    }
}

/// Formats and dispatches alert events.
pub struct Alerter {
    mailer: Arc<dyn Mailer>,
    recipient: String,
    servers: ServerPair,
    failover_ip: IpAddr,
    dedup_window: Duration,
    last_warning: HashMap<WarningFlags, Instant>,
}

impl Alerter {
    pub fn new(
        mailer: Arc<dyn Mailer>,
        recipient: impl Into<String>,
        servers: ServerPair,
        failover_ip: IpAddr,
        dedup_window: Duration,
    ) -> Self {
        Self {
            mailer,
            recipient: recipient.into(),
            servers,
            failover_ip,
            dedup_window,
            last_warning: HashMap::new(),
        }
    }

    /// Send `event`. Never fails: delivery problems are logged.
    pub async fn notify(&mut self, event: AlertEvent) -> Delivery {
        if let AlertEvent::Warning { flags, .. } = &event {
            if self.is_duplicate(*flags) {
                tracing::debug!(?flags, "Suppressing repeated warning");
                metrics::record_alert(event.kind(), Delivery::Suppressed.as_str());
                return Delivery::Suppressed;
            }
        }

        let message = AlertMessage::render(&event, &self.recipient, &self.servers, self.failover_ip);
        let delivery = match self.mailer.send(&message).await {
            Ok(()) => {
                tracing::info!(kind = event.kind(), to = %self.recipient, subject = %message.subject, "Alert sent");
                if let AlertEvent::Warning { flags, .. } = &event {
                    self.last_warning.insert(*flags, Instant::now());
                }
                Delivery::Sent
            }
            Err(e) => {
                tracing::error!(kind = event.kind(), error = %e, subject = %message.subject, "Alert delivery failed");
                Delivery::Failed
            }
        };

        metrics::record_alert(event.kind(), delivery.as_str());
        delivery
    }

    fn is_duplicate(&mut self, flags: WarningFlags) -> bool {
        let now = Instant::now();
        let window = self.dedup_window;
        self.last_warning
            .retain(|_, sent| now.saturating_duration_since(*sent) < window);
        self.last_warning.contains_key(&flags)
    }
}
