use async_trait::async_trait;
use match_overlay_core::{MediaSink, PlayError};

/// Sink without an audio device: it logs what a real player would do, so the
/// scheduler can be driven by hand from the terminal.
#[derive(Debug)]
pub struct ConsoleSink {
    source: Option<String>,
    muted: bool,
    paused: bool,
    volume: f32,
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self {
            source: None,
            muted: false,
            paused: true,
            volume: 1.0,
        }
    }
}

impl ConsoleSink {
    pub fn volume(&self) -> f32 {
        self.volume
    }
}

#[async_trait]
impl MediaSink for ConsoleSink {
    fn set_source(&mut self, url: &str) {
        self.source = Some(url.to_string());
        self.paused = true;
    }

    async fn play(&mut self) -> Result<(), PlayError> {
        let Some(source) = self.source.as_deref() else {
            return Err(PlayError::Failed("no source loaded".into()));
        };
        self.paused = false;
        tracing::info!(source, muted = self.muted, volume = self.volume, "playing");
        Ok(())
    }

    fn set_muted(&mut self, muted: bool) {
        if self.muted != muted {
            tracing::info!(muted, "mute changed");
        }
        self.muted = muted;
    }

    fn is_muted(&self) -> bool {
        self.muted
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }

    fn current_source(&self) -> Option<&str> {
        self.source.as_deref()
    }
}
