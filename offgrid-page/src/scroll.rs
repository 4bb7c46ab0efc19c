//! Scroll-debounced viewport proximity preloading.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::preload::{PreloadSink, ResourcePreloader};
use crate::task::TaskHandle;

/// Visible part of the page, in document pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Scroll offset of the top edge.
    pub top: f64,
    /// Visible height.
    pub height: f64,
}

impl Viewport {
    /// Offset of the bottom edge.
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

/// A city card as laid out on the page.
#[derive(Debug, Clone, PartialEq)]
pub struct CityCard {
    /// Link to the city page.
    pub href: String,
    /// Card image, if any.
    pub image: Option<String>,
    /// Offset of the card's top edge.
    pub top: f64,
    /// Offset of the card's bottom edge.
    pub bottom: f64,
}

impl CityCard {
    /// Whether the card is within `margin` pixels of the viewport.
    pub fn is_near(&self, viewport: Viewport, margin: f64) -> bool {
        self.bottom >= viewport.top - margin && self.top <= viewport.bottom() + margin
    }
}

/// Current layout of the city cards on the page.
pub trait CardLayout: Send + Sync {
    /// Every card with its current position.
    fn cards(&self) -> Vec<CityCard>;
}

impl<L> CardLayout for Arc<L>
where
    L: CardLayout + ?Sized,
{
    fn cards(&self) -> Vec<CityCard> {
        (**self).cards()
    }
}

/// Collects scroll events and, once they settle, preloads nearby cards.
#[derive(Debug)]
pub struct ScrollWatcher {
    tx: mpsc::UnboundedSender<Viewport>,
    _task: TaskHandle,
}

impl ScrollWatcher {
    /// Starts watching. Cards are checked `debounce` after the last scroll.
    pub fn spawn<P, L>(preloader: Arc<ResourcePreloader<P>>, layout: L, debounce: Duration) -> Self
    where
        P: PreloadSink + 'static,
        L: CardLayout + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<Viewport>();
        let handle = tokio::spawn(async move {
            while let Some(mut viewport) = rx.recv().await {
                let closed = loop {
                    match tokio::time::timeout(debounce, rx.recv()).await {
                        Ok(Some(next)) => {
                            trace!("scroll debounced");
                            viewport = next;
                        }
                        Ok(None) => break true,
                        Err(_) => break false,
                    }
                };
                let injected = preloader.preload_near(&layout.cards(), viewport);
                debug!(top = viewport.top, injected, "scroll settled");
                if closed {
                    break;
                }
            }
        });
        Self {
            tx,
            _task: TaskHandle::new(handle),
        }
    }

    /// Reports a scroll to `viewport`.
    pub fn on_scroll(&self, viewport: Viewport) {
        if self.tx.send(viewport).is_err() {
            trace!("scroll watcher stopped");
        }
    }
}
