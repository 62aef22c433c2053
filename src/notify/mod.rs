//! Notification dispatch
//!
//! Fans a lifecycle event out to push notifications (role- or
//! user-targeted) and email. Every send is best effort: failures are
//! logged and counted, never returned to the operation that caused them.

mod dispatcher;
mod email;
mod push;

use axum::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::AppError;

pub use dispatcher::{BulkOutcome, Dispatcher, run_best_effort};
pub use email::{EmailMessage, HttpEmailSender, LogOnlyEmailSender};
pub use push::{HttpPushSender, LogOnlyPushSender};

/// Who receives a push notification
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NotificationTarget {
    Roles {
        #[serde(rename = "targetRoles")]
        target_roles: Vec<String>,
    },
    Users {
        #[serde(rename = "targetUids")]
        target_uids: Vec<String>,
    },
    Everyone {
        #[serde(rename = "targetAll")]
        target_all: bool,
    },
}

impl NotificationTarget {
    pub fn user(uid: &str) -> Self {
        Self::Users {
            target_uids: vec![uid.to_string()],
        }
    }

    pub fn everyone() -> Self {
        Self::Everyone { target_all: true }
    }

    pub fn roles(roles: &[String]) -> Self {
        Self::Roles {
            target_roles: roles.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPriority {
    Normal,
    High,
}

/// A push notification as handed to the sender
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub target: NotificationTarget,
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub click_action: Option<String>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub data: Map<String, Value>,
    pub priority: NotificationPriority,
}

impl Notification {
    pub fn new(
        kind: &str,
        target: NotificationTarget,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.to_string(),
            target,
            title: title.into(),
            body: body.into(),
            icon: None,
            click_action: None,
            data: Map::new(),
            priority: NotificationPriority::Normal,
        }
    }

    pub fn with_click_action(mut self, click_action: impl Into<String>) -> Self {
        self.click_action = Some(click_action.into());
        self
    }

    pub fn with_data(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.data.insert(key.to_string(), value.into());
        self
    }

    pub fn with_priority(mut self, priority: NotificationPriority) -> Self {
        self.priority = priority;
        self
    }
}

/// Push notification port
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, notification: Notification) -> Result<(), AppError>;
}

/// Email port
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), AppError>;
}
