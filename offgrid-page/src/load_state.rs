//! Per-URL image load state.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::trace;

/// Where an image load stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageLoadState {
    /// The load started and has not settled.
    Loading,
    /// The image loaded.
    Loaded,
    /// The image failed to load.
    Failed,
}

impl ImageLoadState {
    /// Whether the load settled.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ImageLoadState::Loading)
    }
}

/// Load state of every image seen on the page.
///
/// A URL is in at most one state. Settled URLs stay settled until
/// [`clear`](Self::clear), so a known failure is not handled twice.
#[derive(Debug, Default)]
pub struct ImageLoadRegistry {
    states: DashMap<String, ImageLoadState>,
}

impl ImageLoadRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `src` as loading. Returns `false` if it was already tracked.
    pub fn start_loading(&self, src: &str) -> bool {
        match self.states.entry(src.to_owned()) {
            Entry::Vacant(entry) => {
                entry.insert(ImageLoadState::Loading);
                true
            }
            Entry::Occupied(entry) => {
                trace!(src, state = ?entry.get(), "image already tracked");
                false
            }
        }
    }

    /// Settles `src` as loaded.
    pub fn mark_loaded(&self, src: &str) -> bool {
        self.settle(src, ImageLoadState::Loaded)
    }

    /// Settles `src` as failed.
    pub fn mark_failed(&self, src: &str) -> bool {
        self.settle(src, ImageLoadState::Failed)
    }

    fn settle(&self, src: &str, to: ImageLoadState) -> bool {
        match self.states.entry(src.to_owned()) {
            Entry::Occupied(entry) if entry.get().is_terminal() => false,
            Entry::Occupied(mut entry) => {
                entry.insert(to);
                true
            }
            Entry::Vacant(entry) => {
                entry.insert(to);
                true
            }
        }
    }

    /// Current state of `src`.
    pub fn state(&self, src: &str) -> Option<ImageLoadState> {
        self.states.get(src).map(|state| *state)
    }

    /// Whether `src` is known to fail.
    pub fn has_failed(&self, src: &str) -> bool {
        self.state(src) == Some(ImageLoadState::Failed)
    }

    /// Whether `src` is loading right now.
    pub fn is_loading(&self, src: &str) -> bool {
        self.state(src) == Some(ImageLoadState::Loading)
    }

    /// Number of URLs in `state`.
    pub fn count(&self, state: ImageLoadState) -> usize {
        self.states.iter().filter(|entry| *entry.value() == state).count()
    }

    /// Forgets every URL.
    pub fn clear(&self) {
        self.states.clear();
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn loading_then_failed() {
        let registry = ImageLoadRegistry::new();
        assert!(registry.start_loading("/a.webp"));
        assert!(!registry.start_loading("/a.webp"));
        assert!(registry.is_loading("/a.webp"));

        assert!(registry.mark_failed("/a.webp"));
        assert!(registry.has_failed("/a.webp"));
        assert_eq!(registry.count(ImageLoadState::Loading), 0);
    }

    #[test]
    fn settled_state_is_kept_until_clear() {
        let registry = ImageLoadRegistry::new();
        registry.start_loading("/a.webp");
        registry.mark_loaded("/a.webp");

        assert!(!registry.mark_failed("/a.webp"));
        assert!(!registry.start_loading("/a.webp"));
        assert_eq!(registry.state("/a.webp"), Some(ImageLoadState::Loaded));

        registry.clear();
        assert_eq!(registry.state("/a.webp"), None);
        assert!(registry.start_loading("/a.webp"));
    }
}
