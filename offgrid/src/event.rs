//! Events delivered to the interceptor and what handling them produced.

use bytes::Bytes;
use offgrid_core::{CacheName, Request};

use crate::context::FetchOutcome;
use crate::message::ControlMessage;
use crate::push::{ClickOutcome, Notification, NotificationClick};
use crate::trim::TrimReport;

/// Everything the host can deliver to a worker.
#[derive(Debug, Clone)]
pub enum Event {
    /// A new version was registered.
    Install,
    /// The installed version may take over.
    Activate,
    /// A page issued a request.
    Fetch(Request),
    /// A page posted a control message.
    Message(ControlMessage),
    /// A background sync fired.
    Sync {
        /// Registration tag.
        tag: String,
    },
    /// A push message arrived, with or without a body.
    Push(Option<Bytes>),
    /// The user interacted with a notification.
    NotificationClick(NotificationClick),
    /// An error escaped a handler.
    Error {
        /// Host-provided description.
        message: String,
    },
    /// A promise rejection nobody handled.
    UnhandledRejection {
        /// Host-provided rejection reason.
        reason: String,
    },
}

impl Event {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Event::Install => "install",
            Event::Activate => "activate",
            Event::Fetch(_) => "fetch",
            Event::Message(_) => "message",
            Event::Sync { .. } => "sync",
            Event::Push(_) => "push",
            Event::NotificationClick(_) => "notificationclick",
            Event::Error { .. } => "error",
            Event::UnhandledRejection { .. } => "unhandledrejection",
        }
    }
}

/// What handling an [`Event`] produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The install manifest was stored.
    Installed,
    /// Stale caches were deleted and pages claimed.
    Activated {
        /// Caches removed during activation.
        deleted: Vec<CacheName>,
    },
    /// A fetch was answered or passed through.
    Fetch(FetchOutcome),
    /// Caches were trimmed.
    Trimmed(TrimReport),
    /// A notification was shown.
    NotificationShown(Notification),
    /// A notification click was handled.
    NotificationClicked(ClickOutcome),
    /// A background sync was acknowledged. No deferred work exists yet.
    SyncAcknowledged,
    /// An error event was logged.
    Logged,
    /// The event needed no action.
    Ignored,
}
