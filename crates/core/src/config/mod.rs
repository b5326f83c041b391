use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    playback::AutoplayPolicy,
    preset::PresetTable,
    query::{parse_int_prefix, RawQuery},
    Result,
};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub overlay: OverlayConfig,
    pub radio: RadioConfig,
}

impl AppConfig {
    /// Loads a JSON file. Missing fields keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// Configuration consumed by the reconciliation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Host serving `/avatar/<ign>` images.
    pub avatar_host: String,
    pub presets: PresetTable,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            avatar_host: "cravatar.eu".to_string(),
            presets: PresetTable::default(),
        }
    }
}

impl OverlayConfig {
    pub fn avatar_url(&self, ign: &str) -> String {
        format!("http://{}/avatar/{ign}", self.avatar_host)
    }
}

/// Configuration for the background radio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadioConfig {
    /// Folder holding the media, without leading or trailing slashes.
    pub path: String,
    pub start: i64,
    /// Inclusive.
    pub end: i64,
    pub prefix: String,
    pub suffix: String,
    pub volume: f32,
    pub unique: bool,
    pub autoplay: AutoplayPolicy,
    pub probe_timeout_ms: u64,
    /// Upper bound on ids probed in one discovery run.
    pub max_candidates: usize,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            path: "audio".to_string(),
            start: 1,
            end: 50,
            prefix: String::new(),
            suffix: ".mp3".to_string(),
            volume: 1.0,
            unique: true,
            autoplay: AutoplayPolicy::Auto,
            probe_timeout_ms: 5_000,
            max_candidates: 10_000,
        }
    }
}

impl RadioConfig {
    /// Default configuration overridden by the radio parameters of `query`.
    pub fn from_query(query: &RawQuery) -> Self {
        Self::default().with_query(query)
    }

    /// Overrides fields with the radio parameters present in `query`.
    /// Empty or unparsable values leave the current value in place.
    pub fn with_query(mut self, query: &RawQuery) -> Self {
        if let Some(path) = non_empty(query, "path") {
            self.path = path.to_string();
        }
        self.path = self.path.trim_matches('/').to_string();

        if let Some(start) = non_empty(query, "start").and_then(parse_int_prefix) {
            self.start = start;
        }
        if let Some(end) = non_empty(query, "end").and_then(parse_int_prefix) {
            self.end = end;
        }
        if let Some(prefix) = non_empty(query, "prefix") {
            self.prefix = prefix.to_string();
        }
        if let Some(suffix) = non_empty(query, "suffix") {
            self.suffix = suffix.to_string();
        }
        if let Some(volume) = non_empty(query, "volume").and_then(|v| v.trim().parse::<f32>().ok())
        {
            self.volume = volume;
        }
        self.volume = clamp_volume(self.volume);

        if let Some(unique) = query.get("unique") {
            self.unique = unique != "0";
        }
        if let Some(autoplay) = query.get("autoplay") {
            self.autoplay = AutoplayPolicy::parse(autoplay);
        }
        self
    }
}

/// Clamps to `[0, 1]`; NaN becomes full volume.
pub fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        1.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}

fn non_empty<'a>(query: &'a RawQuery, name: &str) -> Option<&'a str> {
    query.get(name).filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn radio_defaults_without_params() {
        let config = RadioConfig::from_query(&RawQuery::default());
        assert_eq!(config, RadioConfig::default());
        assert_eq!(config.path, "audio");
        assert_eq!((config.start, config.end), (1, 50));
        assert_eq!(config.suffix, ".mp3");
        assert!(config.unique);
    }

    #[test]
    fn radio_params_override_defaults() {
        let query = RawQuery::parse(
            "path=/music/loops/&start=3&end=9&prefix=track_&suffix=.ogg&volume=2.5&unique=0&autoplay=SOUND",
        );
        let config = RadioConfig::from_query(&query);
        assert_eq!(config.path, "music/loops");
        assert_eq!((config.start, config.end), (3, 9));
        assert_eq!(config.prefix, "track_");
        assert_eq!(config.suffix, ".ogg");
        assert_eq!(config.volume, 1.0);
        assert!(!config.unique);
        assert_eq!(config.autoplay, AutoplayPolicy::Sound);
    }

    #[test]
    fn invalid_radio_params_fall_back() {
        let query = RawQuery::parse("path=&start=abc&volume=loud&unique=no&suffix=");
        let config = RadioConfig::from_query(&query);
        assert_eq!(config.path, "audio");
        assert_eq!(config.start, 1);
        assert_eq!(config.volume, 1.0);
        assert!(config.unique);
        assert_eq!(config.suffix, ".mp3");
    }

    #[test]
    fn negative_volume_clamps_to_zero() {
        let config = RadioConfig::from_query(&RawQuery::parse("volume=-0.3"));
        assert_eq!(config.volume, 0.0);
    }

    #[test]
    fn loads_partial_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overlay.json");
        fs::write(
            &path,
            r#"{"overlay": {"avatar_host": "avatars.test"}, "radio": {"end": 12}}"#,
        )
        .unwrap();

        let config = AppConfig::from_json_file(&path).unwrap();
        assert_eq!(config.overlay.avatar_url("Steve"), "http://avatars.test/avatar/Steve");
        assert_eq!(config.overlay.presets.resolve("4"), Some(false));
        assert_eq!(config.radio.end, 12);
        assert_eq!(config.radio.start, 1);
    }
}
