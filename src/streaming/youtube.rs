use super::{SearchHit, Service, StreamResolver, agent, fetch_json, trimmed_base};
use crate::error::ResolveError;
use crate::model::TrackRef;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::process::Command;
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct YouTubeConfig {
    /// Only needed for search; resolving goes through the extractor.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_extractor")]
    pub extractor: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_extractor() -> String {
    String::from("yt-dlp")
}

pub(super) fn default_api_base() -> String {
    String::from("https://www.googleapis.com/youtube/v3")
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItemId {
    #[serde(default)]
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    channel_title: String,
}

pub struct YouTubeResolver {
    config: YouTubeConfig,
    agent: ureq::Agent,
}

impl YouTubeResolver {
    pub fn new(config: YouTubeConfig) -> Self {
        Self {
            config,
            agent: agent(),
        }
    }

    fn api_key(&self) -> Result<&str, ResolveError> {
        self.config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or(ResolveError::ConfigurationMissing {
                service: Service::YouTube,
            })
    }
}

impl StreamResolver for YouTubeResolver {
    fn service(&self) -> Service {
        Service::YouTube
    }

    /// Resolution only needs the extractor, so the service is always offered.
    fn is_configured(&self) -> bool {
        true
    }

    fn resolve(&self, url: &str) -> Result<TrackRef, ResolveError> {
        let url = url.trim();
        if !is_youtube_url(url) {
            return Err(ResolveError::UnsupportedUrl {
                service: Service::YouTube,
                url: url.to_string(),
            });
        }

        debug!(extractor = %self.config.extractor, url, "running extractor");
        let output = Command::new(&self.config.extractor)
            .args(["-f", "bestaudio", "-g", "--no-playlist", url])
            .output()
            .map_err(|err| {
                let reason = match err.kind() {
                    ErrorKind::NotFound => format!("{} is not installed", self.config.extractor),
                    _ => format!("failed to run {}: {err}", self.config.extractor),
                };
                ResolveError::resolution(Service::YouTube, reason)
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = stderr
                .lines()
                .rev()
                .find(|line| !line.trim().is_empty())
                .unwrap_or("extractor failed")
                .trim()
                .to_string();
            return Err(ResolveError::resolution(Service::YouTube, reason));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stream = stdout
            .lines()
            .map(str::trim)
            .find(|line| line.starts_with("http://") || line.starts_with("https://"))
            .ok_or_else(|| {
                ResolveError::resolution(Service::YouTube, "extractor returned no audio stream")
            })?;
        info!("resolved youtube audio stream");
        Ok(TrackRef::new(stream))
    }

    fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, ResolveError> {
        let key = self.api_key()?;
        let request = self
            .agent
            .get(&format!("{}/search", trimmed_base(&self.config.api_base)))
            .query("part", "snippet")
            .query("type", "video")
            .query("q", query)
            .query("maxResults", &limit.to_string())
            .query("key", key);
        let response: SearchResponse = fetch_json(Service::YouTube, request)?;

        Ok(response
            .items
            .into_iter()
            .filter_map(|item| {
                let id = item.id.video_id?;
                Some(SearchHit {
                    title: item.snippet.title,
                    artist: item.snippet.channel_title,
                    url: format!("https://www.youtube.com/watch?v={id}"),
                })
            })
            .collect())
    }
}

pub fn is_youtube_url(url: &str) -> bool {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    let host = rest.split(['/', '?']).next().unwrap_or_default();
    let host = host.strip_prefix("www.").unwrap_or(host);
    matches!(host, "youtube.com" | "m.youtube.com" | "music.youtube.com" | "youtu.be")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(extractor: &str) -> YouTubeConfig {
        YouTubeConfig {
            api_key: None,
            extractor: extractor.to_string(),
            api_base: default_api_base(),
        }
    }

    #[test]
    fn recognises_youtube_hosts() {
        assert!(is_youtube_url("https://www.youtube.com/watch?v=abc"));
        assert!(is_youtube_url("https://youtu.be/abc"));
        assert!(is_youtube_url("music.youtube.com/watch?v=abc"));
        assert!(!is_youtube_url("https://notyoutube.com/watch?v=abc"));
        assert!(!is_youtube_url("https://soundcloud.com/a/b"));
    }

    #[test]
    fn search_requires_api_key() {
        let resolver = YouTubeResolver::new(config("yt-dlp"));
        assert!(matches!(
            resolver.search("song", 3),
            Err(ResolveError::ConfigurationMissing {
                service: Service::YouTube
            })
        ));
    }

    #[test]
    fn missing_extractor_is_a_resolution_error() {
        let resolver = YouTubeResolver::new(config("cecilio-no-such-extractor"));
        let err = resolver
            .resolve("https://www.youtube.com/watch?v=abc")
            .expect_err("extractor missing");
        assert!(err.to_string().contains("not installed"), "{err}");
    }

    #[cfg(unix)]
    #[test]
    fn extractor_output_becomes_the_reference() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().expect("tempdir");
        let script = dir.path().join("fake-extractor");
        std::fs::write(
            &script,
            "#!/bin/sh\necho 'WARNING: noise' >&2\necho 'https://media.example/audio.webm'\n",
        )
        .expect("write script");
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755))
            .expect("chmod");

        let resolver = YouTubeResolver::new(config(&script.to_string_lossy()));
        let track = resolver
            .resolve("https://youtu.be/abc")
            .expect("resolved");
        assert_eq!(track.as_str(), "https://media.example/audio.webm");
    }

    #[cfg(unix)]
    #[test]
    fn failing_extractor_reports_its_last_error_line() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().expect("tempdir");
        let script = dir.path().join("failing-extractor");
        std::fs::write(&script, "#!/bin/sh\necho 'ERROR: Video unavailable' >&2\nexit 1\n")
            .expect("write script");
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755))
            .expect("chmod");

        let resolver = YouTubeResolver::new(config(&script.to_string_lossy()));
        let err = resolver
            .resolve("https://youtu.be/abc")
            .expect_err("extractor failed");
        assert!(err.to_string().contains("Video unavailable"), "{err}");
    }
}
