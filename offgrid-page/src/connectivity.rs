//! Online/offline state of the page.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

/// Snapshot of the connectivity flag.
///
/// `reconnects` counts offline → online transitions, so a receiver that
/// only wakes after the page dropped offline again still learns that the
/// connection came back in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkState {
    /// Whether the page has connectivity.
    pub online: bool,
    /// Offline → online transitions since the flag was created.
    pub reconnects: u64,
}

/// Shared connectivity flag.
///
/// The host flips it from its online/offline events; caches read it and
/// subscribe to transitions. Clones observe the same flag.
#[derive(Debug, Clone)]
pub struct Connectivity {
    tx: Arc<watch::Sender<LinkState>>,
}

impl Default for Connectivity {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Connectivity {
    /// Create a flag with the given initial state.
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(LinkState {
            online,
            reconnects: 0,
        });
        Self { tx: Arc::new(tx) }
    }

    /// Whether the page currently has connectivity.
    pub fn is_online(&self) -> bool {
        self.tx.borrow().online
    }

    /// Records a connectivity change. Repeated values do not notify.
    pub fn set_online(&self, online: bool) {
        let changed = self.tx.send_if_modified(|state| {
            if state.online == online {
                return false;
            }
            state.online = online;
            if online {
                state.reconnects += 1;
            }
            true
        });
        if changed {
            info!(online, "connectivity changed");
        }
    }

    /// Receiver notified on every change.
    pub fn subscribe(&self) -> watch::Receiver<LinkState> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[tokio::test]
    async fn notifies_only_on_change() {
        let connectivity = Connectivity::default();
        let mut rx = connectivity.subscribe();

        connectivity.set_online(true);
        assert!(!rx.has_changed().unwrap());

        connectivity.set_online(false);
        rx.changed().await.unwrap();
        assert!(!rx.borrow_and_update().online);
        assert!(!connectivity.is_online());
    }

    #[test]
    fn reconnects_survive_a_missed_wakeup() {
        let connectivity = Connectivity::new(false);
        let mut rx = connectivity.subscribe();
        let seen = rx.borrow_and_update().reconnects;

        connectivity.set_online(true);
        connectivity.set_online(false);

        let state = *rx.borrow_and_update();
        assert!(!state.online);
        assert_eq!(state.reconnects, seen + 1);
    }
}
