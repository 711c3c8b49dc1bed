//! Side-effect seams for the board session: user-facing notifications and
//! the closed-won celebration.

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use pipeline_common::{Deal, Stage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }
}

/// Delivers user-facing messages (toasts, log lines, websocket events).
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Fired exactly once per confirmed move into a closed-won stage.
pub trait Celebration: Send + Sync {
    fn celebrate(&self, deal: &Deal, stage: &Stage);
}

/// Writes notifications to the tracing log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Error => error!(message = %notification.message, "board notification"),
            _ => info!(level = ?notification.level, message = %notification.message, "board notification"),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LogCelebration;

impl Celebration for LogCelebration {
    fn celebrate(&self, deal: &Deal, stage: &Stage) {
        info!(
            deal_id = %deal.id,
            deal = %deal.name,
            value = %deal.value,
            stage = %stage.name,
            "Deal won"
        );
    }
}
