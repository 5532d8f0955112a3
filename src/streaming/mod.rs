//! Resolution of third-party media URLs into references the media output can play.
//!
//! Each service is optional. A service without credentials stays constructible but
//! answers every request with [`ResolveError::ConfigurationMissing`].

mod soundcloud;
mod spotify;
mod youtube;

pub use soundcloud::{SoundCloudConfig, SoundCloudResolver};
pub use spotify::{SpotifyConfig, SpotifyResolver, spotify_track_id};
pub use youtube::{YouTubeConfig, YouTubeResolver, is_youtube_url};

use crate::error::ResolveError;
use crate::i18n::MessageKey;
use crate::model::TrackRef;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::debug;

const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    SoundCloud,
    Spotify,
    YouTube,
}

impl Service {
    pub const ALL: [Service; 3] = [Service::SoundCloud, Service::Spotify, Service::YouTube];

    pub fn prompt(self) -> MessageKey {
        match self {
            Self::SoundCloud => MessageKey::SoundcloudPrompt,
            Self::Spotify => MessageKey::SpotifyPrompt,
            Self::YouTube => MessageKey::YoutubePrompt,
        }
    }

    pub fn search_prompt(self) -> MessageKey {
        match self {
            Self::SoundCloud => MessageKey::SoundcloudSearchPrompt,
            Self::Spotify => MessageKey::SpotifySearchPrompt,
            Self::YouTube => MessageKey::YoutubeSearchPrompt,
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SoundCloud => "SoundCloud",
            Self::Spotify => "Spotify",
            Self::YouTube => "YouTube",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub title: String,
    pub artist: String,
    /// Page URL that can be handed back to [`StreamResolver::resolve`].
    pub url: String,
}

pub trait StreamResolver {
    fn service(&self) -> Service;
    fn is_configured(&self) -> bool;
    fn resolve(&self, url: &str) -> Result<TrackRef, ResolveError>;
    fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, ResolveError>;
}

/// Credentials file layout; every section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StreamingCredentials {
    #[serde(default)]
    pub soundcloud: Option<SoundCloudConfig>,
    #[serde(default)]
    pub spotify: Option<SpotifyConfig>,
    #[serde(default)]
    pub youtube: Option<YouTubeConfig>,
}

pub struct Resolvers {
    soundcloud: SoundCloudResolver,
    spotify: SpotifyResolver,
    youtube: YouTubeResolver,
}

impl Resolvers {
    pub fn new(credentials: StreamingCredentials, youtube_extractor: &str) -> Self {
        let youtube = credentials.youtube.unwrap_or_else(|| YouTubeConfig {
            api_key: None,
            extractor: youtube_extractor.to_string(),
            api_base: youtube::default_api_base(),
        });
        Self {
            soundcloud: SoundCloudResolver::new(credentials.soundcloud),
            spotify: SpotifyResolver::new(credentials.spotify),
            youtube: YouTubeResolver::new(youtube),
        }
    }

    pub fn get(&self, service: Service) -> &dyn StreamResolver {
        match service {
            Service::SoundCloud => &self.soundcloud,
            Service::Spotify => &self.spotify,
            Service::YouTube => &self.youtube,
        }
    }

    pub fn configured(&self) -> Vec<Service> {
        Service::ALL
            .into_iter()
            .filter(|service| self.get(*service).is_configured())
            .collect()
    }
}

fn agent() -> ureq::Agent {
    ureq::AgentBuilder::new().timeout(HTTP_TIMEOUT).build()
}

fn fetch_json<T: DeserializeOwned>(
    service: Service,
    request: ureq::Request,
) -> Result<T, ResolveError> {
    debug!(%service, url = request.url(), "requesting");
    let response = request.call().map_err(|err| http_error(service, err))?;
    response
        .into_json::<T>()
        .map_err(|err| ResolveError::resolution(service, format!("unexpected response: {err}")))
}

fn http_error(service: Service, err: ureq::Error) -> ResolveError {
    match err {
        ureq::Error::Status(404, _) => ResolveError::resolution(service, "not found"),
        ureq::Error::Status(code, _) => {
            ResolveError::resolution(service, format!("server answered with status {code}"))
        }
        ureq::Error::Transport(transport) => ResolveError::resolution(service, transport.to_string()),
    }
}

fn trimmed_base(base: &str) -> &str {
    base.trim_end_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_services_are_not_listed() {
        let resolvers = Resolvers::new(StreamingCredentials::default(), "yt-dlp");
        assert_eq!(resolvers.configured(), vec![Service::YouTube]);
    }

    #[test]
    fn credentials_file_sections_are_optional() {
        let credentials: StreamingCredentials =
            serde_json::from_str(r#"{"soundcloud": {"client_id": "abc"}}"#).expect("parse");
        let soundcloud = credentials.soundcloud.expect("soundcloud section");
        assert_eq!(soundcloud.client_id, "abc");
        assert!(credentials.spotify.is_none());
    }

    #[test]
    fn each_service_has_a_prompt() {
        assert_eq!(Service::Spotify.prompt(), MessageKey::SpotifyPrompt);
        assert_eq!(Service::YouTube.to_string(), "YouTube");
    }
}
