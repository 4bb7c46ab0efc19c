//! Worker lifecycle state machine.
//!
//! ```text
//! Parsed --install--> Installing --ok--> Installed --activate--> Activating --> Activated
//!                         |
//!                         +--err--> Redundant
//! ```
//!
//! Transitions are named by [`LifecycleEvent`]. An event arriving in a state
//! that does not accept it is rejected and leaves the state untouched.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Phase of one worker version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LifecycleState {
    /// Registered, install not started.
    Parsed = 0,
    /// Writing the install manifest.
    Installing = 1,
    /// Installed and waiting to activate.
    Installed = 2,
    /// Deleting stale caches and claiming pages.
    Activating = 3,
    /// Handling fetches and events.
    Activated = 4,
    /// Install failed. Terminal.
    Redundant = 5,
}

impl LifecycleState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => LifecycleState::Parsed,
            1 => LifecycleState::Installing,
            2 => LifecycleState::Installed,
            3 => LifecycleState::Activating,
            4 => LifecycleState::Activated,
            _ => LifecycleState::Redundant,
        }
    }

    /// Returns the state as a string slice.
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Parsed => "parsed",
            LifecycleState::Installing => "installing",
            LifecycleState::Installed => "installed",
            LifecycleState::Activating => "activating",
            LifecycleState::Activated => "activated",
            LifecycleState::Redundant => "redundant",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events that move the lifecycle forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    /// Install the new version.
    Install,
    /// Activate the installed version.
    Activate,
}

impl LifecycleEvent {
    /// State the event is accepted in, and the state entered while it runs.
    fn transition(&self) -> (LifecycleState, LifecycleState) {
        match self {
            LifecycleEvent::Install => (LifecycleState::Parsed, LifecycleState::Installing),
            LifecycleEvent::Activate => (LifecycleState::Installed, LifecycleState::Activating),
        }
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleEvent::Install => f.write_str("install"),
            LifecycleEvent::Activate => f.write_str("activate"),
        }
    }
}

/// Lock-free holder of the current [`LifecycleState`].
#[derive(Debug)]
pub(crate) struct Lifecycle {
    state: AtomicU8,
}

impl Lifecycle {
    pub(crate) fn new() -> Self {
        Self {
            state: AtomicU8::new(LifecycleState::Parsed as u8),
        }
    }

    pub(crate) fn current(&self) -> LifecycleState {
        LifecycleState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Enters the running state of `event` if the current state accepts it.
    ///
    /// On rejection returns the state that was observed.
    pub(crate) fn begin(&self, event: LifecycleEvent) -> Result<(), LifecycleState> {
        let (from, running) = event.transition();
        self.state
            .compare_exchange(
                from as u8,
                running as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(|_| ())
            .map_err(LifecycleState::from_u8)
    }

    pub(crate) fn finish(&self, to: LifecycleState) {
        self.state.store(to as u8, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_only_from_parsed() {
        let lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.begin(LifecycleEvent::Activate), Err(LifecycleState::Parsed));

        lifecycle.begin(LifecycleEvent::Install).unwrap();
        assert_eq!(lifecycle.current(), LifecycleState::Installing);
        assert_eq!(
            lifecycle.begin(LifecycleEvent::Install),
            Err(LifecycleState::Installing)
        );
    }

    #[test]
    fn redundant_is_terminal() {
        let lifecycle = Lifecycle::new();
        lifecycle.begin(LifecycleEvent::Install).unwrap();
        lifecycle.finish(LifecycleState::Redundant);

        assert!(lifecycle.begin(LifecycleEvent::Install).is_err());
        assert!(lifecycle.begin(LifecycleEvent::Activate).is_err());
        assert_eq!(lifecycle.current(), LifecycleState::Redundant);
    }
}
