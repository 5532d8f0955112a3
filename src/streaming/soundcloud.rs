use super::{SearchHit, Service, StreamResolver, agent, fetch_json, trimmed_base};
use crate::error::ResolveError;
use crate::model::TrackRef;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SoundCloudConfig {
    pub client_id: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_api_base() -> String {
    String::from("https://api.soundcloud.com")
}

#[derive(Debug, Deserialize)]
struct SoundCloudTrack {
    #[serde(default)]
    title: String,
    #[serde(default)]
    stream_url: Option<String>,
    #[serde(default)]
    permalink_url: Option<String>,
    #[serde(default)]
    user: Option<SoundCloudUser>,
}

#[derive(Debug, Deserialize)]
struct SoundCloudUser {
    #[serde(default)]
    username: String,
}

pub struct SoundCloudResolver {
    config: Option<SoundCloudConfig>,
    agent: ureq::Agent,
}

impl SoundCloudResolver {
    pub fn new(config: Option<SoundCloudConfig>) -> Self {
        let config = config.filter(|config| !config.client_id.trim().is_empty());
        Self {
            config,
            agent: agent(),
        }
    }

    fn config(&self) -> Result<&SoundCloudConfig, ResolveError> {
        self.config
            .as_ref()
            .ok_or(ResolveError::ConfigurationMissing {
                service: Service::SoundCloud,
            })
    }
}

impl StreamResolver for SoundCloudResolver {
    fn service(&self) -> Service {
        Service::SoundCloud
    }

    fn is_configured(&self) -> bool {
        self.config.is_some()
    }

    fn resolve(&self, url: &str) -> Result<TrackRef, ResolveError> {
        let config = self.config()?;
        let request = self
            .agent
            .get(&format!("{}/resolve", trimmed_base(&config.api_base)))
            .query("url", url.trim())
            .query("client_id", &config.client_id);
        let track: SoundCloudTrack = fetch_json(Service::SoundCloud, request)?;

        let stream_url = track.stream_url.ok_or_else(|| {
            ResolveError::resolution(
                Service::SoundCloud,
                "stream URL not available for the given track",
            )
        })?;
        let separator = if stream_url.contains('?') { '&' } else { '?' };
        info!(title = %track.title, "resolved soundcloud track");
        Ok(TrackRef::new(format!(
            "{stream_url}{separator}client_id={}",
            config.client_id
        )))
    }

    fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, ResolveError> {
        let config = self.config()?;
        let request = self
            .agent
            .get(&format!("{}/tracks", trimmed_base(&config.api_base)))
            .query("q", query)
            .query("limit", &limit.to_string())
            .query("client_id", &config.client_id);
        let tracks: Vec<SoundCloudTrack> = fetch_json(Service::SoundCloud, request)?;

        Ok(tracks
            .into_iter()
            .filter_map(|track| {
                Some(SearchHit {
                    url: track.permalink_url?,
                    title: track.title,
                    artist: track.user.map(|user| user.username).unwrap_or_default(),
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_client_id_disables_resolution() {
        let resolver = SoundCloudResolver::new(None);
        assert!(!resolver.is_configured());
        assert!(matches!(
            resolver.resolve("https://soundcloud.com/artist/song"),
            Err(ResolveError::ConfigurationMissing {
                service: Service::SoundCloud
            })
        ));
    }

    #[test]
    fn blank_client_id_counts_as_missing() {
        let resolver = SoundCloudResolver::new(Some(SoundCloudConfig {
            client_id: String::from("  "),
            api_base: default_api_base(),
        }));
        assert!(!resolver.is_configured());
    }

    #[test]
    fn track_payload_tolerates_missing_fields() {
        let track: SoundCloudTrack =
            serde_json::from_str(r#"{"title": "Song", "user": {"username": "dj"}}"#)
                .expect("parse");
        assert_eq!(track.title, "Song");
        assert!(track.stream_url.is_none());
        assert_eq!(track.user.expect("user").username, "dj");
    }
}
