//! Best-effort dispatch of push notifications and email

use std::future::Future;
use std::sync::Arc;

use futures::StreamExt;

use super::{EmailMessage, EmailSender, Notification, NotificationSender};
use crate::data::Settings;
use crate::error::AppError;
use crate::lifecycle::SettingsService;
use crate::metrics::SIDE_EFFECTS_TOTAL;

const MAX_CONCURRENT_EMAILS: usize = 10;

/// Await a side effect, logging and counting a failure instead of
/// returning it. Returns whether the side effect succeeded.
pub async fn run_best_effort<F>(channel: &'static str, label: &str, side_effect: F) -> bool
where
    F: Future<Output = Result<(), AppError>>,
{
    match side_effect.await {
        Ok(()) => {
            SIDE_EFFECTS_TOTAL.with_label_values(&[channel, "sent"]).inc();
            true
        }
        Err(error) => {
            SIDE_EFFECTS_TOTAL.with_label_values(&[channel, "failed"]).inc();
            tracing::warn!(channel, label, %error, "Side effect failed; continuing");
            false
        }
    }
}

/// Result of a bulk email send
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkOutcome {
    pub sent: usize,
    pub failed: usize,
}

/// Notification dispatcher
///
/// Owns the push and email ports and consults the settings toggles before
/// each send. Nothing here ever returns an error to the caller.
#[derive(Clone)]
pub struct Dispatcher {
    push: Arc<dyn NotificationSender>,
    email: Arc<dyn EmailSender>,
    settings: Arc<SettingsService>,
    staff_roles: Vec<String>,
}

impl Dispatcher {
    pub fn new(
        push: Arc<dyn NotificationSender>,
        email: Arc<dyn EmailSender>,
        settings: Arc<SettingsService>,
        staff_roles: Vec<String>,
    ) -> Self {
        Self {
            push,
            email,
            settings,
            staff_roles,
        }
    }

    /// Roles that receive staff-facing notifications
    pub fn staff_roles(&self) -> &[String] {
        &self.staff_roles
    }

    /// Settings for a dispatch; unreadable settings fall back to defaults
    /// so a store hiccup never blocks a notification.
    pub async fn settings(&self) -> Arc<Settings> {
        match self.settings.get().await {
            Ok(settings) => settings,
            Err(error) => {
                tracing::warn!(%error, "Failed to read settings for dispatch; using defaults");
                Arc::new(Settings::default())
            }
        }
    }

    /// Send a push notification unless system notifications are off
    pub async fn push(&self, notification: Notification) {
        if !self.settings().await.notifications.system_notifications {
            SIDE_EFFECTS_TOTAL.with_label_values(&["push", "skipped"]).inc();
            tracing::debug!(kind = %notification.kind, "Push skipped: system notifications disabled");
            return;
        }

        let label = notification.kind.clone();
        run_best_effort("push", &label, self.push.send(notification)).await;
    }

    /// Send one email unless email notifications are off
    pub async fn email(&self, message: EmailMessage) {
        if !self.settings().await.notifications.email_notifications {
            SIDE_EFFECTS_TOTAL.with_label_values(&["email", "skipped"]).inc();
            tracing::debug!(to = %message.to, "Email skipped: email notifications disabled");
            return;
        }

        let label = message.subject.clone();
        run_best_effort("email", &label, self.email.send(message)).await;
    }

    /// Send many emails with bounded concurrency
    ///
    /// Each message is independent: a failed recipient does not stop the
    /// others, and sends already made are not undone.
    pub async fn email_all(&self, messages: Vec<EmailMessage>) -> BulkOutcome {
        if messages.is_empty() {
            return BulkOutcome::default();
        }
        if !self.settings().await.notifications.email_notifications {
            SIDE_EFFECTS_TOTAL
                .with_label_values(&["email", "skipped"])
                .inc_by(messages.len() as u64);
            tracing::debug!(count = messages.len(), "Bulk email skipped: email notifications disabled");
            return BulkOutcome::default();
        }

        let total = messages.len();
        let results: Vec<bool> = futures::stream::iter(messages)
            .map(|message| async move {
                let label = message.to.clone();
                run_best_effort("email", &label, self.email.send(message)).await
            })
            .buffer_unordered(MAX_CONCURRENT_EMAILS)
            .collect()
            .await;

        let sent = results.iter().filter(|sent| **sent).count();
        let outcome = BulkOutcome {
            sent,
            failed: total - sent,
        };

        tracing::info!(
            sent = outcome.sent,
            failed = outcome.failed,
            "Bulk email complete"
        );
        outcome
    }
}
