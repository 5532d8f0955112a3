use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

use cecilio::error::ResolveError;
use cecilio::streaming::{
    Service, SoundCloudConfig, SoundCloudResolver, SpotifyConfig, SpotifyResolver,
    StreamResolver,
};

type Route = fn(&str, &str) -> (u16, String);

/// Minimal HTTP/1.1 responder; every request head is recorded lowercased.
struct FakeServer {
    base: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl FakeServer {
    fn start(route: Route) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let base = format!("http://{}", listener.local_addr().expect("addr"));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else {
                    continue;
                };
                serve(stream, route, &recorded);
            }
        });

        Self { base, requests }
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("lock").clone()
    }

    fn count(&self, needle: &str) -> usize {
        self.requests()
            .iter()
            .filter(|request| request.contains(needle))
            .count()
    }
}

fn serve(stream: TcpStream, route: Route, recorded: &Mutex<Vec<String>>) {
    let mut reader = BufReader::new(stream);
    let mut head = String::new();
    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).unwrap_or(0) == 0 {
            return;
        }
        if line == "\r\n" {
            break;
        }
        let lower = line.to_ascii_lowercase();
        if let Some(value) = lower.strip_prefix("content-length:") {
            content_length = value.trim().parse().unwrap_or(0);
        }
        head.push_str(&lower);
    }
    let mut body = vec![0; content_length];
    let _ = reader.read_exact(&mut body);
    head.push_str(&String::from_utf8_lossy(&body));

    let mut parts = head.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let target = parts.next().unwrap_or_default().to_string();
    recorded.lock().expect("lock").push(head.clone());

    let (status, payload) = route(&method, &target);
    let response = format!(
        "HTTP/1.1 {status} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{payload}",
        payload.len()
    );
    let mut stream = reader.into_inner();
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

fn soundcloud(base: &str) -> SoundCloudResolver {
    SoundCloudResolver::new(Some(SoundCloudConfig {
        client_id: String::from("abc123"),
        api_base: base.to_string(),
    }))
}

fn spotify(base: &str) -> SpotifyResolver {
    SpotifyResolver::new(Some(SpotifyConfig {
        client_id: String::from("id"),
        client_secret: String::from("secret"),
        api_base: base.to_string(),
        accounts_base: base.to_string(),
    }))
}

#[test]
fn soundcloud_resolution_appends_client_id_to_stream_url() {
    let server = FakeServer::start(|_, target| {
        if target.starts_with("/resolve") {
            (
                200,
                String::from(
                    r#"{"title": "Song", "stream_url": "https://cdn.example/tracks/42/stream"}"#,
                ),
            )
        } else {
            (404, String::from("{}"))
        }
    });

    let track = soundcloud(&server.base)
        .resolve("https://soundcloud.com/artist/song")
        .expect("resolved");

    assert_eq!(
        track.as_str(),
        "https://cdn.example/tracks/42/stream?client_id=abc123"
    );
    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].contains("client_id=abc123"));
    assert!(requests[0].contains("soundcloud.com"));
}

#[test]
fn soundcloud_track_without_stream_is_a_resolution_error() {
    let server = FakeServer::start(|_, _| (200, String::from(r#"{"title": "Private"}"#)));

    let err = soundcloud(&server.base)
        .resolve("https://soundcloud.com/artist/private")
        .expect_err("no stream");

    assert!(matches!(
        err,
        ResolveError::Resolution {
            service: Service::SoundCloud,
            ..
        }
    ));
}

#[test]
fn soundcloud_not_found_is_reported() {
    let server = FakeServer::start(|_, _| (404, String::from("{}")));

    let err = soundcloud(&server.base)
        .resolve("https://soundcloud.com/nobody/nothing")
        .expect_err("missing");
    assert!(err.to_string().contains("not found"), "{err}");
}

#[test]
fn soundcloud_search_skips_tracks_without_permalink() {
    let server = FakeServer::start(|_, _| {
        (
            200,
            String::from(
                r#"[
                    {"title": "A", "permalink_url": "https://soundcloud.com/x/a", "user": {"username": "x"}},
                    {"title": "B"}
                ]"#,
            ),
        )
    });

    let hits = soundcloud(&server.base).search("a", 5).expect("search");

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].title, "A");
    assert_eq!(hits[0].artist, "x");
    assert!(server.requests()[0].contains("limit=5"));
}

fn spotify_route(method: &str, target: &str) -> (u16, String) {
    match (method, target) {
        ("post", "/api/token") => (
            200,
            String::from(r#"{"access_token": "tok", "token_type": "Bearer", "expires_in": 3600}"#),
        ),
        ("get", "/v1/tracks/withpreview") => (
            200,
            String::from(
                r#"{"name": "Song", "artists": [{"name": "Band"}], "preview_url": "https://p.scdn.co/mp3-preview/1"}"#,
            ),
        ),
        ("get", "/v1/tracks/nopreview") => (
            200,
            String::from(r#"{"name": "Song", "artists": [], "preview_url": null}"#),
        ),
        _ => (404, String::from("{}")),
    }
}

#[test]
fn spotify_resolves_preview_and_caches_token() {
    let server = FakeServer::start(spotify_route);
    let resolver = spotify(&server.base);

    let first = resolver
        .resolve("https://open.spotify.com/track/withpreview?si=1")
        .expect("first");
    let second = resolver
        .resolve("spotify:track:withpreview")
        .expect("second");

    assert_eq!(first.as_str(), "https://p.scdn.co/mp3-preview/1");
    assert_eq!(first, second);
    assert_eq!(server.count("/api/token"), 1);
    assert_eq!(server.count("authorization: bearer tok"), 2);
    assert!(server.count("grant_type=client_credentials") == 1);
}

#[test]
fn spotify_track_without_preview_is_a_resolution_error() {
    let server = FakeServer::start(spotify_route);

    let err = spotify(&server.base)
        .resolve("spotify:track:nopreview")
        .expect_err("no preview");

    match err {
        ResolveError::Resolution { service, reason } => {
            assert_eq!(service, Service::Spotify);
            assert!(reason.contains("preview"));
        }
        other => panic!("unexpected error {other:?}"),
    }
}
