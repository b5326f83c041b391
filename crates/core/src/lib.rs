//! Core library for the Match Overlay.
//!
//! Two independent engines live here. The overlay side treats the query string
//! of the current location as the single source of truth: [`Overlay`] watches
//! navigation, [`Reconciler`] merges parameters over presets and committed
//! state, and the result leaves as declarative [`UpdateCommand`]s for whatever
//! renders the overlay. The radio side discovers numbered media files once and
//! shuffles them forever through a [`RadioScheduler`] that copes with hosts
//! refusing audible autoplay.

pub mod config;
pub mod discovery;
pub mod error;
pub mod navigation;
pub mod overlay;
pub mod playback;
pub mod preset;
pub mod query;
pub mod reconcile;
pub mod render;
pub mod timer;

pub use config::{AppConfig, OverlayConfig, RadioConfig};
pub use discovery::{discover, AssetProbe, CatalogSpec, FileProbe, HttpProbe, MediaCatalog};
pub use error::{OverlayError, Result};
pub use navigation::{NavigationEvent, NavigationReceiver, NavigationWatcher};
pub use overlay::{Overlay, Wakeup};
pub use playback::{
    is_capture_host, launch, AutoplayPolicy, AutoplayState, Gesture, GestureGate, MediaEvent,
    MediaSink, PlayError, PlaybackQueue, RadioInput, RadioScheduler, SchedulerOptions,
};
pub use preset::{PresetTable, StatePreset};
pub use query::{RawQuery, TimerAction};
pub use reconcile::{PlayerState, Reconciler, ScoreState};
pub use render::{Player, Renderer, Slot, UpdateCommand, ViewModel};
pub use timer::MatchTimer;
