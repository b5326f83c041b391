//! Background radio: shuffled queue plus the autoplay-policy state machine.
//!
//! Hosts commonly refuse audible playback until the user interacts with the
//! page. The scheduler starts playback anyway (muted if it has to) and arms a
//! one-shot gesture gate that unmutes on the first click, key press or touch.

use async_trait::async_trait;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::{
    config::{clamp_volume, RadioConfig},
    discovery::{discover, AssetProbe, CatalogSpec, MediaCatalog},
    Result,
};

/// Whether playback should start muted or audible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoplayPolicy {
    /// Guess from the host: audible inside a capture host, muted elsewhere.
    #[default]
    Auto,
    Muted,
    Sound,
}

impl AutoplayPolicy {
    /// Case-insensitive; unknown values mean [`AutoplayPolicy::Auto`].
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "muted" => Self::Muted,
            "sound" => Self::Sound,
            _ => Self::Auto,
        }
    }

    pub fn starts_muted(self, capture_host: bool) -> bool {
        match self {
            Self::Muted => true,
            Self::Sound => false,
            Self::Auto => !capture_host,
        }
    }
}

/// Recording/streaming hosts (OBS browser sources) allow audible autoplay.
pub fn is_capture_host(user_agent: Option<&str>) -> bool {
    user_agent
        .map(|ua| ua.to_ascii_lowercase().contains("obs"))
        .unwrap_or(false)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AutoplayState {
    BlockedUnknown,
    MutedPlaying,
    UnmutedPlaying,
    /// Playback is refused even muted; waiting for a user gesture.
    GestureArmed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    Pointer,
    Key,
    Touch,
}

/// One-shot latch shared by every gesture kind.
#[derive(Debug, Default)]
pub struct GestureGate {
    armed: bool,
}

impl GestureGate {
    /// Returns `false` if the gate was already armed.
    pub fn arm(&mut self) -> bool {
        !std::mem::replace(&mut self.armed, true)
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Returns `true` exactly once per arming, then disarms.
    pub fn fire(&mut self) -> bool {
        std::mem::take(&mut self.armed)
    }
}

/// Draw order over a catalog.
#[derive(Debug, Clone)]
pub struct PlaybackQueue {
    catalog: Vec<String>,
    pool: Vec<String>,
    unique: bool,
}

impl PlaybackQueue {
    pub fn new(catalog: &MediaCatalog, unique: bool) -> Self {
        let catalog = catalog.urls().to_vec();
        Self {
            pool: catalog.clone(),
            catalog,
            unique,
        }
    }

    pub fn catalog(&self) -> &[String] {
        &self.catalog
    }

    pub fn remaining(&self) -> usize {
        self.pool.len()
    }

    /// Unique mode draws without replacement and refills the pool from the
    /// full catalog once it runs dry. Otherwise every draw is independent.
    pub fn next<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<String> {
        if self.catalog.is_empty() {
            return None;
        }

        if !self.unique {
            let index = rng.gen_range(0..self.catalog.len());
            return Some(self.catalog[index].clone());
        }

        if self.pool.is_empty() {
            self.pool = self.catalog.clone();
        }
        let index = rng.gen_range(0..self.pool.len());
        Some(self.pool.swap_remove(index))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlayError {
    /// The host's autoplay policy refused playback.
    #[error("playback not allowed")]
    NotAllowed,
    #[error("playback failed: {0}")]
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaEvent {
    Ended,
    Error,
}

/// Audio output driven by the scheduler.
#[async_trait]
pub trait MediaSink: Send {
    fn set_source(&mut self, url: &str);
    async fn play(&mut self) -> std::result::Result<(), PlayError>;
    fn set_muted(&mut self, muted: bool);
    fn is_muted(&self) -> bool;
    fn is_paused(&self) -> bool;
    fn set_volume(&mut self, volume: f32);
    fn current_source(&self) -> Option<&str>;
}

/// Everything that can drive the scheduler after start-up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RadioInput {
    Media(MediaEvent),
    Gesture(Gesture),
    Advance,
    SetVolume(f32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulerOptions {
    pub unique: bool,
    pub volume: f32,
    pub start_muted: bool,
}

impl SchedulerOptions {
    pub fn from_config(config: &RadioConfig, capture_host: bool) -> Self {
        Self {
            unique: config.unique,
            volume: config.volume,
            start_muted: config.autoplay.starts_muted(capture_host),
        }
    }
}

pub struct RadioScheduler<S, R = StdRng> {
    sink: S,
    queue: PlaybackQueue,
    rng: R,
    options: SchedulerOptions,
    state: AutoplayState,
    gate: GestureGate,
}

impl<S: MediaSink> RadioScheduler<S> {
    pub fn new(sink: S, catalog: &MediaCatalog, options: SchedulerOptions) -> Self {
        Self::with_rng(sink, catalog, options, StdRng::from_entropy())
    }
}

impl<S: MediaSink, R: Rng> RadioScheduler<S, R> {
    pub fn with_rng(sink: S, catalog: &MediaCatalog, options: SchedulerOptions, rng: R) -> Self {
        Self {
            sink,
            queue: PlaybackQueue::new(catalog, options.unique),
            rng,
            options,
            state: AutoplayState::BlockedUnknown,
            gate: GestureGate::default(),
        }
    }

    pub fn state(&self) -> AutoplayState {
        self.state
    }

    pub fn gesture_armed(&self) -> bool {
        self.gate.is_armed()
    }

    pub fn catalog(&self) -> &[String] {
        self.queue.catalog()
    }

    pub fn current_source(&self) -> Option<&str> {
        self.sink.current_source()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Applies volume and the initial mute guess, then plays the first draw.
    pub async fn start(&mut self) {
        self.sink.set_volume(clamp_volume(self.options.volume));
        self.sink.set_muted(self.options.start_muted);
        tracing::info!(
            tracks = self.queue.catalog().len(),
            muted = self.options.start_muted,
            "radio starting"
        );
        self.play_next().await;
    }

    pub async fn handle(&mut self, input: RadioInput) {
        match input {
            RadioInput::Media(event) => self.on_media_event(event).await,
            RadioInput::Gesture(gesture) => {
                self.on_gesture(gesture).await;
            }
            RadioInput::Advance => self.play_next().await,
            RadioInput::SetVolume(volume) => self.set_volume(volume),
        }
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.sink.set_volume(clamp_volume(volume));
    }

    /// Both ends of a track advance the queue, whatever the autoplay state.
    pub async fn on_media_event(&mut self, event: MediaEvent) {
        if event == MediaEvent::Error {
            tracing::error!(
                source = self.sink.current_source().unwrap_or_default(),
                "audio error, skipping to next track"
            );
        }
        self.play_next().await;
    }

    pub async fn play_next(&mut self) {
        let Some(url) = self.queue.next(&mut self.rng) else {
            return;
        };
        tracing::debug!(%url, remaining = self.queue.remaining(), "next track");
        self.sink.set_source(&url);
        self.try_play().await;
    }

    /// Unmutes on the first gesture after arming. Later gestures are ignored.
    pub async fn on_gesture(&mut self, gesture: Gesture) -> bool {
        if !self.gate.fire() {
            return false;
        }
        tracing::debug!(?gesture, "gesture unlocked audio");

        self.sink.set_muted(false);
        if !self.sink.is_paused() {
            self.state = AutoplayState::UnmutedPlaying;
            return true;
        }

        match self.sink.play().await {
            Ok(()) => self.state = AutoplayState::UnmutedPlaying,
            Err(err) => {
                tracing::warn!(error = %err, "playback still refused after gesture");
                self.state = AutoplayState::BlockedUnknown;
            }
        }
        true
    }

    async fn try_play(&mut self) {
        match self.sink.play().await {
            Ok(()) => self.settle_playing(),
            Err(PlayError::NotAllowed) => {
                if !self.sink.is_muted() {
                    self.sink.set_muted(true);
                    if self.sink.play().await.is_ok() {
                        self.settle_playing();
                        return;
                    }
                }
                self.arm_gate();
                self.state = AutoplayState::GestureArmed;
                tracing::debug!("autoplay refused, waiting for a gesture");
            }
            Err(err) => tracing::warn!(error = %err, "play() failed"),
        }
    }

    /// Muted playback always leaves the gate armed so the first interaction
    /// restores sound.
    fn settle_playing(&mut self) {
        if self.sink.is_muted() {
            self.state = AutoplayState::MutedPlaying;
            self.arm_gate();
        } else {
            self.state = AutoplayState::UnmutedPlaying;
        }
    }

    fn arm_gate(&mut self) {
        if self.gate.arm() {
            tracing::debug!("gesture gate armed");
        }
    }
}

impl<S, R> std::fmt::Debug for RadioScheduler<S, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RadioScheduler")
            .field("tracks", &self.queue.catalog().len())
            .field("remaining", &self.queue.remaining())
            .field("state", &self.state)
            .field("gate", &self.gate)
            .finish()
    }
}

/// Discovers the catalog described by `config` and starts playing it.
///
/// An empty catalog comes back as an error; the caller logs it and simply
/// runs without a radio.
pub async fn launch<P, S>(
    probe: &P,
    config: &RadioConfig,
    sink: S,
    capture_host: bool,
) -> Result<RadioScheduler<S>>
where
    P: AssetProbe + ?Sized,
    S: MediaSink,
{
    let catalog = discover(probe, &CatalogSpec::from(config)).await?;
    let options = SchedulerOptions::from_config(config, capture_host);
    let mut scheduler = RadioScheduler::new(sink, &catalog, options);
    scheduler.start().await;
    Ok(scheduler)
}
