use super::{SearchHit, Service, StreamResolver, agent, fetch_json, http_error, trimmed_base};
use crate::error::ResolveError;
use crate::model::TrackRef;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Tokens are refreshed this long before Spotify says they expire.
const TOKEN_MARGIN: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpotifyConfig {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_accounts_base")]
    pub accounts_base: String,
}

fn default_api_base() -> String {
    String::from("https://api.spotify.com")
}

fn default_accounts_base() -> String {
    String::from("https://accounts.spotify.com")
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

#[derive(Debug, Deserialize)]
struct SpotifyTrack {
    #[serde(default)]
    name: String,
    #[serde(default)]
    artists: Vec<SpotifyArtist>,
    #[serde(default)]
    preview_url: Option<String>,
    #[serde(default)]
    external_urls: Option<ExternalUrls>,
}

#[derive(Debug, Deserialize)]
struct SpotifyArtist {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ExternalUrls {
    spotify: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    tracks: SearchPage,
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    items: Vec<SpotifyTrack>,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

pub struct SpotifyResolver {
    config: Option<SpotifyConfig>,
    agent: ureq::Agent,
    token: RefCell<Option<CachedToken>>,
}

impl SpotifyResolver {
    pub fn new(config: Option<SpotifyConfig>) -> Self {
        let config = config.filter(|config| {
            !config.client_id.trim().is_empty() && !config.client_secret.trim().is_empty()
        });
        Self {
            config,
            agent: agent(),
            token: RefCell::new(None),
        }
    }

    fn config(&self) -> Result<&SpotifyConfig, ResolveError> {
        self.config.as_ref().ok_or(ResolveError::ConfigurationMissing {
            service: Service::Spotify,
        })
    }

    fn access_token(&self, config: &SpotifyConfig) -> Result<String, ResolveError> {
        if let Some(cached) = self.token.borrow().as_ref()
            && Instant::now() < cached.expires_at
        {
            return Ok(cached.value.clone());
        }

        debug!("requesting spotify access token");
        let credentials = STANDARD.encode(format!("{}:{}", config.client_id, config.client_secret));
        let response = self
            .agent
            .post(&format!("{}/api/token", trimmed_base(&config.accounts_base)))
            .set("Authorization", &format!("Basic {credentials}"))
            .send_form(&[("grant_type", "client_credentials")])
            .map_err(|err| http_error(Service::Spotify, err))?;
        let token: TokenResponse = response.into_json().map_err(|err| {
            ResolveError::resolution(Service::Spotify, format!("unexpected token response: {err}"))
        })?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_MARGIN);
        *self.token.borrow_mut() = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });
        Ok(token.access_token)
    }
}

impl StreamResolver for SpotifyResolver {
    fn service(&self) -> Service {
        Service::Spotify
    }

    fn is_configured(&self) -> bool {
        self.config.is_some()
    }

    fn resolve(&self, url: &str) -> Result<TrackRef, ResolveError> {
        let config = self.config()?;
        let id = spotify_track_id(url).ok_or_else(|| ResolveError::UnsupportedUrl {
            service: Service::Spotify,
            url: url.to_string(),
        })?;
        let token = self.access_token(config)?;

        let request = self
            .agent
            .get(&format!("{}/v1/tracks/{id}", trimmed_base(&config.api_base)))
            .set("Authorization", &format!("Bearer {token}"));
        let track: SpotifyTrack = fetch_json(Service::Spotify, request)?;

        let preview = track.preview_url.ok_or_else(|| {
            ResolveError::resolution(Service::Spotify, "preview URL not available for the given track")
        })?;
        info!(title = %track.name, "resolved spotify preview");
        Ok(TrackRef::new(preview))
    }

    fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, ResolveError> {
        let config = self.config()?;
        let token = self.access_token(config)?;
        let request = self
            .agent
            .get(&format!("{}/v1/search", trimmed_base(&config.api_base)))
            .query("q", query)
            .query("type", "track")
            .query("limit", &limit.to_string())
            .set("Authorization", &format!("Bearer {token}"));
        let response: SearchResponse = fetch_json(Service::Spotify, request)?;

        Ok(response
            .tracks
            .items
            .into_iter()
            .filter_map(|track| {
                let url = track.external_urls.and_then(|urls| urls.spotify)?;
                let artist = track
                    .artists
                    .into_iter()
                    .map(|artist| artist.name)
                    .collect::<Vec<_>>()
                    .join(", ");
                Some(SearchHit {
                    title: track.name,
                    artist,
                    url,
                })
            })
            .collect())
    }
}

/// Extracts the track id from `spotify:track:<id>` URIs and `open.spotify.com` links.
pub fn spotify_track_id(input: &str) -> Option<&str> {
    let input = input.trim();
    if let Some(id) = input.strip_prefix("spotify:track:") {
        return valid_id(id);
    }

    let rest = input
        .strip_prefix("https://")
        .or_else(|| input.strip_prefix("http://"))
        .unwrap_or(input);
    let path = rest.strip_prefix("open.spotify.com/")?;
    let path = path.split(['?', '#']).next().unwrap_or_default();

    let mut segments = path.split('/');
    while let Some(segment) = segments.next() {
        if segment == "track" {
            return segments.next().and_then(valid_id);
        }
    }
    None
}

fn valid_id(id: &str) -> Option<&str> {
    (!id.is_empty() && id.chars().all(|ch| ch.is_ascii_alphanumeric())).then_some(id)
}
