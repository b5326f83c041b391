use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;
use url::Url;

use crate::{OverlayError, Result};

/// Why the current location may have changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationEvent {
    Push,
    Replace,
    /// Back/forward traversal.
    Pop,
    HashChange,
}

/// Owner of the navigable location and its session history.
///
/// Every call that moves the location notifies subscribers after the move, so
/// a subscriber reading [`NavigationWatcher::location`] always sees the state
/// that triggered (or superseded) the notification. Clones share state.
#[derive(Clone)]
pub struct NavigationWatcher {
    shared: Arc<Mutex<History>>,
}

struct History {
    entries: Vec<Url>,
    cursor: usize,
    subscribers: Vec<mpsc::UnboundedSender<NavigationEvent>>,
}

impl NavigationWatcher {
    pub fn new(initial: Url) -> Self {
        Self {
            shared: Arc::new(Mutex::new(History {
                entries: vec![initial],
                cursor: 0,
                subscribers: Vec::new(),
            })),
        }
    }

    pub fn parse(initial: &str) -> Result<Self> {
        Ok(Self::new(Url::parse(initial)?))
    }

    pub fn location(&self) -> Result<Url> {
        let history = self.lock()?;
        Ok(history.entries[history.cursor].clone())
    }

    /// Registers a new listener. Events are queued until received, never dropped.
    pub fn subscribe(&self) -> Result<NavigationReceiver> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock()?.subscribers.push(tx);
        Ok(NavigationReceiver { rx })
    }

    /// Broadcasts `event` to every live subscriber. Call sites that change the
    /// location through other means use this to trigger a pass.
    pub fn notify(&self, event: NavigationEvent) -> Result<()> {
        self.lock()?.notify(event);
        Ok(())
    }

    /// Adds a history entry. `target` may be relative to the current location.
    pub fn push_state(&self, target: &str) -> Result<Url> {
        let mut history = self.lock()?;
        let url = history.current().join(target)?;
        history.push(url.clone());
        history.notify(NavigationEvent::Push);
        Ok(url)
    }

    pub fn replace_state(&self, target: &str) -> Result<Url> {
        let mut history = self.lock()?;
        let url = history.current().join(target)?;
        let cursor = history.cursor;
        history.entries[cursor] = url.clone();
        history.notify(NavigationEvent::Replace);
        Ok(url)
    }

    /// Returns `false` without notifying when already at the oldest entry.
    pub fn back(&self) -> Result<bool> {
        let mut history = self.lock()?;
        if history.cursor == 0 {
            return Ok(false);
        }
        history.cursor -= 1;
        history.notify(NavigationEvent::Pop);
        Ok(true)
    }

    /// Returns `false` without notifying when already at the newest entry.
    pub fn forward(&self) -> Result<bool> {
        let mut history = self.lock()?;
        if history.cursor + 1 >= history.entries.len() {
            return Ok(false);
        }
        history.cursor += 1;
        history.notify(NavigationEvent::Pop);
        Ok(true)
    }

    /// Navigates to a new fragment. Setting the current fragment again is a
    /// no-op.
    pub fn set_fragment(&self, fragment: &str) -> Result<bool> {
        let mut history = self.lock()?;
        let fragment = fragment.strip_prefix('#').unwrap_or(fragment);
        let mut url = history.current().clone();
        url.set_fragment(Some(fragment));
        if url == *history.current() {
            return Ok(false);
        }
        history.push(url);
        history.notify(NavigationEvent::HashChange);
        Ok(true)
    }

    fn lock(&self) -> Result<MutexGuard<'_, History>> {
        self.shared
            .lock()
            .map_err(|_| OverlayError::msg("navigation history has been poisoned"))
    }
}

impl std::fmt::Debug for NavigationWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationWatcher").finish()
    }
}

impl History {
    fn current(&self) -> &Url {
        &self.entries[self.cursor]
    }

    fn push(&mut self, url: Url) {
        self.entries.truncate(self.cursor + 1);
        self.entries.push(url);
        self.cursor = self.entries.len() - 1;
    }

    fn notify(&mut self, event: NavigationEvent) {
        self.subscribers.retain(|tx| tx.send(event).is_ok());
        tracing::trace!(?event, listeners = self.subscribers.len(), "location changed");
    }
}

/// Receiving half handed out by [`NavigationWatcher::subscribe`].
#[derive(Debug)]
pub struct NavigationReceiver {
    rx: mpsc::UnboundedReceiver<NavigationEvent>,
}

impl NavigationReceiver {
    /// Waits for the next notification. Fails once every watcher is gone.
    pub async fn changed(&mut self) -> Result<NavigationEvent> {
        self.rx.recv().await.ok_or(OverlayError::NavigationClosed)
    }

    /// Returns a queued notification without waiting.
    pub fn try_changed(&mut self) -> Option<NavigationEvent> {
        self.rx.try_recv().ok()
    }
}
