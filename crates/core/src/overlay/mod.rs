use crate::{
    config::OverlayConfig,
    navigation::{NavigationEvent, NavigationReceiver, NavigationWatcher},
    query::RawQuery,
    reconcile::Reconciler,
    render::Renderer,
    timer::MatchTimer,
    Result,
};

/// What woke the overlay loop up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wakeup {
    Navigated(NavigationEvent),
    Tick,
}

/// Event loop that keeps a renderer in sync with the current location.
///
/// Passes run to completion between awaits, so two passes never interleave.
/// Each pass re-reads the location rather than trusting the event payload.
pub struct Overlay<R> {
    watcher: NavigationWatcher,
    events: NavigationReceiver,
    reconciler: Reconciler,
    timer: MatchTimer,
    renderer: R,
}

impl<R: Renderer> Overlay<R> {
    pub fn new(watcher: NavigationWatcher, config: OverlayConfig, renderer: R) -> Result<Self> {
        let events = watcher.subscribe()?;
        Ok(Self {
            watcher,
            events,
            reconciler: Reconciler::new(config),
            timer: MatchTimer::new(),
            renderer,
        })
    }

    pub fn watcher(&self) -> &NavigationWatcher {
        &self.watcher
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn timer(&self) -> &MatchTimer {
        &self.timer
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Runs one pass against the location as it is right now.
    pub fn reconcile(&mut self) -> Result<()> {
        let location = self.watcher.location()?;
        let query = RawQuery::from_url(&location);
        let commands = self.reconciler.apply(&query, &mut self.timer);
        self.renderer.apply(&commands)
    }

    /// Waits for one navigation notification or timer tick and handles it.
    pub async fn step(&mut self) -> Result<Wakeup> {
        tokio::select! {
            event = self.events.changed() => {
                let event = event?;
                tracing::debug!(?event, "navigation observed");
                self.reconcile()?;
                Ok(Wakeup::Navigated(event))
            }
            command = self.timer.next_tick() => {
                self.renderer.apply(&[command])?;
                Ok(Wakeup::Tick)
            }
        }
    }

    /// Applies the initial location, then follows navigation and the clock
    /// until the watcher goes away.
    pub async fn run(mut self) -> Result<()> {
        tracing::info!("overlay loop started");
        self.reconcile()?;
        loop {
            self.step().await?;
        }
    }
}

impl<R> std::fmt::Debug for Overlay<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Overlay")
            .field("reconciler", &self.reconciler)
            .field("timer", &self.timer)
            .finish()
    }
}
