use crate::i18n::Locale;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Opaque reference to something the media output can load: a local path or a stream URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackRef(String);

impl TrackRef {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn from_path(path: &Path) -> Self {
        Self(path.to_string_lossy().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_stream(&self) -> bool {
        let lower = self.0.to_ascii_lowercase();
        lower.starts_with("http://") || lower.starts_with("https://")
    }

    /// Label used by the playlist view: the file name for paths, the last URL segment for streams.
    pub fn display_name(&self) -> String {
        if self.is_stream() {
            let without_query = self.0.split(['?', '#']).next().unwrap_or_default();
            return without_query
                .trim_end_matches('/')
                .rsplit('/')
                .next()
                .filter(|segment| !segment.is_empty())
                .unwrap_or(without_query)
                .to_string();
        }

        Path::new(&self.0)
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| self.0.clone())
    }
}

impl fmt::Display for TrackRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackRef {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TrackRef {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum VisualMode {
    #[default]
    Polygons,
    Waves,
    Stars,
    Lines,
}

impl VisualMode {
    pub fn next(self) -> Self {
        match self {
            Self::Polygons => Self::Waves,
            Self::Waves => Self::Stars,
            Self::Stars => Self::Lines,
            Self::Lines => Self::Polygons,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "polygons" => Some(Self::Polygons),
            "waves" => Some(Self::Waves),
            "stars" => Some(Self::Stars),
            "lines" => Some(Self::Lines),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub locale: Locale,
    #[serde(default = "default_volume")]
    pub volume: u8,
    #[serde(default)]
    pub repeat: bool,
    #[serde(default)]
    pub shuffle: bool,
    #[serde(default)]
    pub visual_mode: VisualMode,
    #[serde(default = "default_restart_threshold_ms")]
    pub restart_threshold_ms: u64,
    #[serde(default = "default_youtube_extractor")]
    pub youtube_extractor: String,
}

impl Settings {
    pub fn restart_threshold(&self) -> Duration {
        Duration::from_millis(self.restart_threshold_ms)
    }
}

fn default_volume() -> u8 {
    100
}

fn default_restart_threshold_ms() -> u64 {
    5_000
}

fn default_youtube_extractor() -> String {
    String::from("yt-dlp")
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            locale: Locale::default(),
            volume: default_volume(),
            repeat: false,
            shuffle: false,
            visual_mode: VisualMode::default(),
            restart_threshold_ms: default_restart_threshold_ms(),
            youtube_extractor: default_youtube_extractor(),
        }
    }
}
