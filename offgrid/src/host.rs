//! Host runtime facilities the interceptor drives.

use std::sync::Arc;

use async_trait::async_trait;
use http::Uri;
use thiserror::Error;

use crate::push::Notification;

/// A host facility refused or failed an operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation} failed: {reason}")]
pub struct HostError {
    /// Which facility failed.
    pub operation: &'static str,
    /// Host-provided reason.
    pub reason: String,
}

impl HostError {
    /// Creates a new host error.
    pub fn new(operation: &'static str, reason: impl Into<String>) -> Self {
        Self {
            operation,
            reason: reason.into(),
        }
    }
}

/// Window and notification control offered by the worker host.
///
/// Every call may fail. The interceptor logs these failures and carries on;
/// none of them aborts a lifecycle phase.
#[async_trait]
pub trait Host: Send + Sync {
    /// Lets a freshly installed version take over without waiting for old
    /// pages to close.
    async fn skip_waiting(&self) -> Result<(), HostError>;

    /// Takes control of every open page.
    async fn claim_clients(&self) -> Result<(), HostError>;

    /// Displays a system notification.
    async fn show_notification(&self, notification: &Notification) -> Result<(), HostError>;

    /// Removes a displayed notification.
    async fn close_notification(&self, notification: &Notification) -> Result<(), HostError>;

    /// Focuses an already open window at `url`. Returns `false` when none
    /// is open.
    async fn focus_window(&self, url: &Uri) -> Result<bool, HostError>;

    /// Opens a new window at `url`.
    async fn open_window(&self, url: &Uri) -> Result<(), HostError>;
}

#[async_trait]
impl<H> Host for Arc<H>
where
    H: Host + ?Sized,
{
    async fn skip_waiting(&self) -> Result<(), HostError> {
        (**self).skip_waiting().await
    }

    async fn claim_clients(&self) -> Result<(), HostError> {
        (**self).claim_clients().await
    }

    async fn show_notification(&self, notification: &Notification) -> Result<(), HostError> {
        (**self).show_notification(notification).await
    }

    async fn close_notification(&self, notification: &Notification) -> Result<(), HostError> {
        (**self).close_notification(notification).await
    }

    async fn focus_window(&self, url: &Uri) -> Result<bool, HostError> {
        (**self).focus_window(url).await
    }

    async fn open_window(&self, url: &Uri) -> Result<(), HostError> {
        (**self).open_window(url).await
    }
}
