//! Push messages and notification clicks.

use serde::{Deserialize, Serialize};

use patchnotes_core::Error;

pub const DEFAULT_TITLE: &str = "FAForever Patchnotes";
pub const DEFAULT_BODY: &str = "New FAForever patch available!";
pub const NOTIFICATION_TAG: &str = "patch-notification";
pub const ICON: &str = "/assets/images/icons/icon-192x192.png";
pub const BADGE: &str = "/assets/images/icons/icon-72x72.png";

/// Payload of a push event. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PushMessage {
    pub title: Option<String>,
    pub body: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// A notification ready to be shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub tag: String,
    /// URL opened by the "view" action.
    pub data: String,
    pub actions: Vec<NotificationAction>,
}

impl Notification {
    /// Fill in the defaults for anything the push left out.
    pub fn from_push(message: PushMessage) -> Self {
        Self {
            title: message.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            body: message.body.unwrap_or_else(|| DEFAULT_BODY.to_string()),
            icon: ICON.to_string(),
            badge: BADGE.to_string(),
            tag: NOTIFICATION_TAG.to_string(),
            data: message.url.unwrap_or_else(|| "/".to_string()),
            actions: vec![
                NotificationAction { action: "view".into(), title: "View Patch".into(), icon: Some(BADGE.into()) },
                NotificationAction { action: "dismiss".into(), title: "Dismiss".into(), icon: None },
            ],
        }
    }
}

/// A click on a shown notification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NotificationClick {
    #[serde(default)]
    pub action: String,
    /// The notification's data URL.
    pub url: Option<String>,
}

impl NotificationClick {
    /// URL to open in a client window. Only the "view" action opens one.
    pub fn target(&self) -> Option<String> {
        (self.action == "view").then(|| self.url.clone().unwrap_or_else(|| "/".to_string()))
    }
}

/// Displays notifications.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn show(&self, notification: &Notification) -> Result<(), Error>;
}

/// Notifier that writes notifications to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn show(&self, notification: &Notification) -> Result<(), Error> {
        tracing::info!(
            title = %notification.title,
            body = %notification.body,
            tag = %notification.tag,
            url = %notification.data,
            "showing notification"
        );
        Ok(())
    }
}
