//! Push payloads and the notifications they raise.
//!
//! A push message carries a JSON body `{"title", "body", "url"}`. The
//! interceptor turns it into a [`Notification`] with exactly two actions,
//! [`OPEN_ACTION`] and [`CLOSE_ACTION`]. Tapping `open` focuses or opens a
//! window at the notification URL; anything else only dismisses.

use http::Uri;
use http::uri::InvalidUri;
use offgrid_core::Origin;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::config::NotificationStyle;

/// Action identifier that navigates to the notification URL.
pub const OPEN_ACTION: &str = "open";
/// Action identifier that only dismisses.
pub const CLOSE_ACTION: &str = "close";

fn root_url() -> String {
    "/".to_owned()
}

/// Body of a push message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushPayload {
    /// Notification title.
    #[serde(default)]
    pub title: String,
    /// Notification text.
    #[serde(default)]
    pub body: String,
    /// Tap target. Site root when absent.
    #[serde(default = "root_url")]
    pub url: String,
}

impl PushPayload {
    /// Parses a raw push body.
    pub fn from_slice(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }
}

/// One button on a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    /// Identifier reported back on click.
    pub action: SmolStr,
    /// Button label.
    pub title: SmolStr,
}

/// A system notification shown by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Title line.
    pub title: String,
    /// Body text.
    pub body: String,
    /// Large icon path.
    pub icon: SmolStr,
    /// Badge path.
    pub badge: SmolStr,
    /// URL opened by the `open` action.
    pub url: String,
    /// Buttons, always `open` then `close`.
    pub actions: Vec<NotificationAction>,
}

impl Notification {
    /// Builds the notification for a push payload.
    pub fn from_payload(payload: PushPayload, style: &NotificationStyle) -> Self {
        Self {
            title: payload.title,
            body: payload.body,
            icon: style.icon.clone(),
            badge: style.badge.clone(),
            url: payload.url,
            actions: vec![
                NotificationAction {
                    action: SmolStr::new_static(OPEN_ACTION),
                    title: SmolStr::new_static("Open"),
                },
                NotificationAction {
                    action: SmolStr::new_static(CLOSE_ACTION),
                    title: SmolStr::new_static("Close"),
                },
            ],
        }
    }

    /// Resolves the notification URL against `origin`.
    ///
    /// Root-relative URLs are joined to the origin; absolute URLs are kept.
    pub fn target(&self, origin: &Origin) -> Result<Uri, InvalidUri> {
        if self.url.starts_with('/') {
            origin.join(&self.url)
        } else {
            self.url.parse()
        }
    }
}

/// The user interacted with a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationClick {
    /// The tapped action; `None` for the notification body.
    pub action: Option<SmolStr>,
    /// The clicked notification.
    pub notification: Notification,
}

impl NotificationClick {
    /// Whether the user asked to navigate.
    pub fn wants_open(&self) -> bool {
        self.action.as_deref() == Some(OPEN_ACTION)
    }
}

/// What a notification click resulted in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// An existing window at the URL was focused.
    Focused(Uri),
    /// A new window was opened at the URL.
    Opened(Uri),
    /// The notification was only dismissed.
    Dismissed,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn url_defaults_to_root() {
        let payload = PushPayload::from_slice(br#"{"title":"Meetup","body":"Tonight"}"#).unwrap();
        assert_eq!(payload.url, "/");
    }

    #[test]
    fn notification_has_open_and_close() {
        let payload = PushPayload::from_slice(
            br#"{"title":"New Event","body":"...","url":"/events/123"}"#,
        )
        .unwrap();
        let notification = Notification::from_payload(payload, &NotificationStyle::default());

        let actions: Vec<_> = notification
            .actions
            .iter()
            .map(|a| a.action.as_str())
            .collect();
        assert_eq!(actions, vec!["open", "close"]);

        let origin = Origin::parse("https://devcommunity.cn").unwrap();
        assert_eq!(
            notification.target(&origin).unwrap(),
            "https://devcommunity.cn/events/123"
        );
    }

    #[test]
    fn malformed_payload_is_an_error() {
        assert!(PushPayload::from_slice(b"not json").is_err());
    }
}
