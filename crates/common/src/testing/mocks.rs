//! Mock implementations of the popup seams

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use url::Url;

use crate::auth::popup::{CrossOriginAccess, PopupFeatures, PopupOpener, PopupWindow};

#[derive(Debug, Default)]
struct FakePopupState {
    closed: AtomicBool,
    /// `None` while the popup shows a foreign page.
    location: Mutex<Option<Url>>,
    probes: AtomicUsize,
    closes: AtomicUsize,
}

/// Popup whose location and closed state are scripted by the test.
///
/// Clones share state, so a test keeps one handle while the coordinator owns
/// another. Starts on a foreign origin (location unreadable).
#[derive(Debug, Clone, Default)]
pub struct FakePopup {
    state: Arc<FakePopupState>,
}

impl FakePopup {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the popup show `url`. Panics on an unparsable URL.
    pub fn navigate(&self, url: &str) {
        let url = Url::parse(url).expect("fake popup url must parse");
        *self.state.location.lock() = Some(url);
    }

    /// Make the popup show a page from a foreign origin.
    pub fn leave_to_foreign_origin(&self) {
        *self.state.location.lock() = None;
    }

    /// Simulate the user closing the window.
    pub fn close_by_user(&self) {
        self.state.closed.store(true, Ordering::SeqCst);
    }

    /// How many times the location has been read.
    #[must_use]
    pub fn probe_count(&self) -> usize {
        self.state.probes.load(Ordering::SeqCst)
    }

    /// How many times `close()` has been called.
    #[must_use]
    pub fn close_count(&self) -> usize {
        self.state.closes.load(Ordering::SeqCst)
    }
}

impl PopupWindow for FakePopup {
    fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::SeqCst)
    }

    fn location(&self) -> Result<Url, CrossOriginAccess> {
        self.state.probes.fetch_add(1, Ordering::SeqCst);
        self.state.location.lock().clone().ok_or(CrossOriginAccess)
    }

    fn close(&self) {
        self.state.closes.fetch_add(1, Ordering::SeqCst);
        self.state.closed.store(true, Ordering::SeqCst);
    }
}

/// Opener that hands out clones of one [`FakePopup`], or refuses like a
/// popup blocker.
#[derive(Debug, Clone)]
pub struct FakePopupOpener {
    popup: FakePopup,
    blocked: bool,
    opened: Arc<Mutex<Vec<(Url, PopupFeatures)>>>,
}

impl FakePopupOpener {
    #[must_use]
    pub fn new(popup: FakePopup) -> Self {
        Self { popup, blocked: false, opened: Arc::default() }
    }

    /// Opener that refuses every window.
    #[must_use]
    pub fn blocked() -> Self {
        Self { blocked: true, ..Self::new(FakePopup::new()) }
    }

    #[must_use]
    pub fn open_count(&self) -> usize {
        self.opened.lock().len()
    }

    #[must_use]
    pub fn opened_urls(&self) -> Vec<Url> {
        self.opened.lock().iter().map(|(url, _)| url.clone()).collect()
    }

    #[must_use]
    pub fn last_features(&self) -> Option<PopupFeatures> {
        self.opened.lock().last().map(|(_, features)| *features)
    }
}

impl PopupOpener for FakePopupOpener {
    fn open(&self, url: &Url, features: &PopupFeatures) -> Option<Box<dyn PopupWindow>> {
        if self.blocked {
            return None;
        }
        self.opened.lock().push((url.clone(), *features));
        Some(Box::new(self.popup.clone()))
    }
}
