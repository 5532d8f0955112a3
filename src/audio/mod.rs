use crate::model::TrackRef;
use anyhow::{Context, Result};
use rodio::Source;
use rodio::cpal::traits::{DeviceTrait, HostTrait};
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink};
#[cfg(unix)]
use std::ffi::CString;
use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const MAX_STREAM_BYTES: u64 = 256 * 1024 * 1024;
const STREAM_TIMEOUT: Duration = Duration::from_secs(30);

/// Notifications a media output reports back to whoever drives the sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaEvent {
    PositionChanged(Duration),
    DurationChanged(Duration),
    EndOfMedia,
}

/// Playback engine the sequencer drives. Loading a new reference supersedes whatever was loaded.
pub trait MediaOutput {
    fn load(&mut self, reference: &TrackRef) -> Result<()>;
    fn loaded(&self) -> Option<&TrackRef>;
    fn play(&mut self);
    fn pause(&mut self);
    fn is_playing(&self) -> bool;
    /// True once the loaded track has played to its end. Such a track must be loaded again to restart.
    fn is_finished(&self) -> bool;
    fn seek(&mut self, position: Duration) -> Result<()>;
    fn position(&self) -> Duration;
    fn duration(&self) -> Option<Duration>;
    /// Volume as a percentage, 0..=100.
    fn volume(&self) -> u8;
    fn set_volume(&mut self, percent: u8);
    fn output_name(&self) -> String;
    /// Drains notifications accumulated since the previous call.
    fn poll_events(&mut self) -> Vec<MediaEvent>;
}

#[derive(Debug, Default)]
struct EventTracker {
    position: Option<Duration>,
    duration: Option<Duration>,
    end_reported: bool,
}

impl EventTracker {
    fn reset(&mut self) {
        *self = Self::default();
    }

    fn collect(
        &mut self,
        position: Duration,
        duration: Option<Duration>,
        finished: bool,
    ) -> Vec<MediaEvent> {
        let mut events = Vec::new();
        if let Some(duration) = duration
            && self.duration != Some(duration)
        {
            self.duration = Some(duration);
            events.push(MediaEvent::DurationChanged(duration));
        }
        if self.position != Some(position) {
            self.position = Some(position);
            events.push(MediaEvent::PositionChanged(position));
        }
        if finished && !self.end_reported {
            self.end_reported = true;
            events.push(MediaEvent::EndOfMedia);
        }
        events
    }
}

pub struct RodioOutput {
    stream: OutputStream,
    sink: Sink,
    current: Option<TrackRef>,
    track_duration: Option<Duration>,
    volume: u8,
    events: EventTracker,
}

impl RodioOutput {
    pub fn new() -> Result<Self> {
        let (stream, sink) = Self::open_output_stream()?;
        Ok(Self {
            stream,
            sink,
            current: None,
            track_duration: None,
            volume: 100,
            events: EventTracker::default(),
        })
    }

    fn sink_volume(&self) -> f32 {
        f32::from(self.volume) / 100.0
    }

    fn open_output_stream() -> Result<(OutputStream, Sink)> {
        let mut stream = with_silenced_stderr(|| {
            match OutputStreamBuilder::from_default_device()
                .context("failed to open default system output stream")
                .and_then(|builder| {
                    builder
                        .with_error_callback(|_| {})
                        .open_stream_or_fallback()
                        .context("failed to start default output stream")
                }) {
                Ok(stream) => Ok(stream),
                Err(default_err) => {
                    let host = rodio::cpal::default_host();
                    let mut candidates: Vec<String> = host
                        .output_devices()
                        .ok()
                        .into_iter()
                        .flatten()
                        .filter_map(|device| device.name().ok())
                        .collect();
                    candidates.sort_by_cached_key(|name| {
                        let lower = name.to_ascii_lowercase();
                        let rank = if lower.contains("pulse") {
                            0_u8
                        } else if lower.contains("pipewire") {
                            1_u8
                        } else if lower.contains("default") {
                            2_u8
                        } else {
                            3_u8
                        };
                        (rank, lower)
                    });
                    candidates.dedup();

                    for candidate in candidates {
                        let Some(device) = host.output_devices().ok().into_iter().flatten().find(
                            |entry| entry.name().ok().as_deref() == Some(candidate.as_str()),
                        ) else {
                            continue;
                        };
                        let opened = OutputStreamBuilder::from_device(device)
                            .context("failed to open fallback output device")
                            .and_then(|builder| {
                                builder
                                    .with_error_callback(|_| {})
                                    .open_stream_or_fallback()
                                    .context("failed to start fallback output stream")
                            });
                        if let Ok(stream) = opened {
                            warn!(device = %candidate, "default output failed, using fallback device");
                            return Ok(stream);
                        }
                    }

                    Err(default_err.context("unable to start any audio output stream"))
                }
            }
        })?;
        stream.log_on_drop(false);
        let sink = Sink::connect_new(stream.mixer());
        Ok((stream, sink))
    }

    fn append_decoded<R>(&self, decoder: Decoder<R>) -> Option<Duration>
    where
        R: Read + Seek + Send + Sync + 'static,
    {
        let duration = decoder
            .total_duration()
            .filter(|duration| !duration.is_zero());
        self.sink.append(decoder);
        duration
    }
}

impl MediaOutput for RodioOutput {
    fn load(&mut self, reference: &TrackRef) -> Result<()> {
        self.sink.stop();
        self.sink = Sink::connect_new(self.stream.mixer());
        self.sink.pause();
        self.current = None;
        self.track_duration = None;
        self.events.reset();

        self.track_duration = if reference.is_stream() {
            let bytes = fetch_stream(reference.as_str())?;
            let decoder = Decoder::new(Cursor::new(bytes))
                .with_context(|| format!("failed to decode stream {reference}"))?;
            self.append_decoded(decoder)
        } else {
            let path = Path::new(reference.as_str());
            let file = File::open(path)
                .with_context(|| format!("failed to open track {}", path.display()))?;
            let decoder = Decoder::try_from(file)
                .with_context(|| format!("failed to decode {}", path.display()))?;
            self.append_decoded(decoder)
        };

        self.sink.set_volume(self.sink_volume());
        self.current = Some(reference.clone());
        info!(track = %reference, duration = ?self.track_duration, "loaded track");
        Ok(())
    }

    fn loaded(&self) -> Option<&TrackRef> {
        self.current.as_ref()
    }

    fn play(&mut self) {
        if self.current.is_some() {
            self.sink.play();
        }
    }

    fn pause(&mut self) {
        self.sink.pause();
    }

    fn is_playing(&self) -> bool {
        self.current.is_some() && !self.sink.is_paused() && !self.sink.empty()
    }

    fn is_finished(&self) -> bool {
        self.current.is_some() && self.sink.empty()
    }

    fn seek(&mut self, position: Duration) -> Result<()> {
        if self.current.is_none() {
            return Err(anyhow::anyhow!("no active track"));
        }
        // A drained sink accepts the seek but has nothing left to play.
        if self.sink.empty() {
            return Err(anyhow::anyhow!("track has finished"));
        }

        let target = self
            .track_duration
            .map_or(position, |duration| position.min(duration));
        self.sink
            .try_seek(target)
            .map_err(|err| anyhow::anyhow!("failed to seek current track: {err:?}"))?;
        self.events.end_reported = false;
        debug!(position = ?target, "seeked");
        Ok(())
    }

    fn position(&self) -> Duration {
        if self.current.is_none() {
            return Duration::ZERO;
        }
        self.sink.get_pos()
    }

    fn duration(&self) -> Option<Duration> {
        self.track_duration
    }

    fn volume(&self) -> u8 {
        self.volume
    }

    fn set_volume(&mut self, percent: u8) {
        self.volume = percent.min(100);
        self.sink.set_volume(self.sink_volume());
    }

    fn output_name(&self) -> String {
        String::from("System default output (CPAL)")
    }

    fn poll_events(&mut self) -> Vec<MediaEvent> {
        if self.current.is_none() {
            return Vec::new();
        }
        let finished = !self.sink.is_paused() && self.sink.empty();
        let position = self.position();
        self.events
            .collect(position, self.track_duration, finished)
    }
}

fn fetch_stream(url: &str) -> Result<Vec<u8>> {
    let response = ureq::get(url)
        .timeout(STREAM_TIMEOUT)
        .call()
        .with_context(|| format!("failed to request stream {url}"))?;
    let mut bytes = Vec::new();
    response
        .into_reader()
        .take(MAX_STREAM_BYTES)
        .read_to_end(&mut bytes)
        .with_context(|| format!("failed to download stream {url}"))?;
    debug!(url, bytes = bytes.len(), "downloaded stream");
    Ok(bytes)
}

#[cfg(unix)]
fn with_silenced_stderr<T>(operation: impl FnOnce() -> T) -> T {
    let saved = unsafe { libc::dup(libc::STDERR_FILENO) };
    if saved < 0 {
        return operation();
    }

    let devnull = CString::new("/dev/null")
        .ok()
        .map(|path| unsafe { libc::open(path.as_ptr(), libc::O_WRONLY) })
        .unwrap_or(-1);

    if devnull >= 0 {
        unsafe {
            libc::dup2(devnull, libc::STDERR_FILENO);
            libc::close(devnull);
        }
    }

    let result = operation();

    unsafe {
        libc::dup2(saved, libc::STDERR_FILENO);
        libc::close(saved);
    }

    result
}

#[cfg(not(unix))]
fn with_silenced_stderr<T>(operation: impl FnOnce() -> T) -> T {
    operation()
}

/// Output with a logical clock and no device. Used when audio cannot be opened.
pub struct NullOutput {
    current: Option<TrackRef>,
    playing: bool,
    volume: u8,
    started_at: Option<Instant>,
    position_offset: Duration,
    track_duration: Option<Duration>,
    events: EventTracker,
}

impl NullOutput {
    pub fn new() -> Self {
        Self {
            current: None,
            playing: false,
            volume: 100,
            started_at: None,
            position_offset: Duration::ZERO,
            track_duration: None,
            events: EventTracker::default(),
        }
    }

    /// Overrides the duration detected on load, for references that cannot be decoded.
    pub fn set_track_duration(&mut self, duration: Option<Duration>) {
        self.track_duration = duration;
    }

    fn estimate_duration(reference: &TrackRef) -> Option<Duration> {
        if reference.is_stream() {
            return None;
        }
        let file = File::open(reference.as_str()).ok()?;
        let source = Decoder::try_from(file).ok()?;
        source
            .total_duration()
            .filter(|duration| !duration.is_zero())
    }

    fn current_position(&self) -> Duration {
        let mut position = self.position_offset;
        if self.playing
            && let Some(started_at) = self.started_at
        {
            position = position.saturating_add(started_at.elapsed());
        }
        if let Some(duration) = self.track_duration {
            return position.min(duration);
        }
        position
    }
}

impl Default for NullOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaOutput for NullOutput {
    fn load(&mut self, reference: &TrackRef) -> Result<()> {
        self.current = Some(reference.clone());
        self.playing = false;
        self.started_at = None;
        self.position_offset = Duration::ZERO;
        self.track_duration = Self::estimate_duration(reference);
        self.events.reset();
        Ok(())
    }

    fn loaded(&self) -> Option<&TrackRef> {
        self.current.as_ref()
    }

    fn play(&mut self) {
        if self.current.is_none() {
            return;
        }
        if self.is_finished() {
            self.position_offset = Duration::ZERO;
            self.events.end_reported = false;
        } else if self.playing {
            return;
        }
        self.started_at = Some(Instant::now());
        self.playing = true;
    }

    fn pause(&mut self) {
        self.position_offset = self.current_position();
        self.started_at = None;
        self.playing = false;
    }

    fn is_playing(&self) -> bool {
        self.current.is_some() && self.playing && !self.is_finished()
    }

    fn is_finished(&self) -> bool {
        let Some(duration) = self.track_duration else {
            return false;
        };
        self.current.is_some() && self.playing && self.current_position() >= duration
    }

    fn seek(&mut self, position: Duration) -> Result<()> {
        if self.current.is_none() {
            return Err(anyhow::anyhow!("no active track"));
        }

        self.position_offset = self
            .track_duration
            .map_or(position, |duration| position.min(duration));
        self.started_at = self.playing.then(Instant::now);
        self.events.end_reported = false;
        Ok(())
    }

    fn position(&self) -> Duration {
        if self.current.is_none() {
            return Duration::ZERO;
        }
        self.current_position()
    }

    fn duration(&self) -> Option<Duration> {
        self.track_duration
    }

    fn volume(&self) -> u8 {
        self.volume
    }

    fn set_volume(&mut self, percent: u8) {
        self.volume = percent.min(100);
    }

    fn output_name(&self) -> String {
        String::from("Null audio output")
    }

    fn poll_events(&mut self) -> Vec<MediaEvent> {
        if self.current.is_none() {
            return Vec::new();
        }
        let finished = self.is_finished();
        let position = self.current_position();
        self.events
            .collect(position, self.track_duration, finished)
    }
}
