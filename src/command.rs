use crate::audio::{MediaEvent, MediaOutput};
use crate::error::{PlayerError, ResolveError};
use crate::i18n::{Locale, MessageKey};
use crate::model::TrackRef;
use crate::sequencer::Sequencer;
use std::time::Duration;
use tracing::warn;

/// Everything the presentation layer can ask of the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Play,
    Pause,
    PlayPause,
    Next,
    Previous,
    Open(Vec<TrackRef>),
    Append(TrackRef),
    ToggleShuffle(bool),
    ToggleRepeat(bool),
    ShuffleNow,
    Seek(Duration),
    SetVolume(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A user-facing message, resolved against a locale only when rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub key: MessageKey,
    pub count: Option<usize>,
    pub detail: Option<String>,
}

impl Notice {
    pub fn info(key: MessageKey) -> Self {
        Self {
            level: NoticeLevel::Info,
            key,
            count: None,
            detail: None,
        }
    }

    pub fn warning(key: MessageKey) -> Self {
        Self {
            level: NoticeLevel::Warning,
            ..Self::info(key)
        }
    }

    pub fn error(key: MessageKey, detail: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            detail: Some(detail.into()),
            ..Self::info(key)
        }
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    pub fn render(&self, locale: Locale) -> String {
        let mut text = locale.text(self.key).to_string();
        if let Some(count) = self.count {
            text = text.replace("{count}", &count.to_string());
        }
        match &self.detail {
            Some(detail) => format!("{text} ({detail})"),
            None => text,
        }
    }
}

impl From<PlayerError> for Notice {
    fn from(err: PlayerError) -> Self {
        match err {
            PlayerError::EmptyPlaylist => Notice::warning(MessageKey::ErrorNoFiles),
            PlayerError::Output(err) => Notice::error(MessageKey::PlaybackError, format!("{err:#}")),
        }
    }
}

impl From<ResolveError> for Notice {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::ConfigurationMissing { .. } => {
                Notice::warning(MessageKey::StreamingNotConfigured)
            }
            other => Notice::error(MessageKey::StreamingError, other.to_string()),
        }
    }
}

/// Last position and duration the media output reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    pub position: Duration,
    pub duration: Option<Duration>,
}

impl Progress {
    pub fn ratio(&self) -> Option<f64> {
        let duration = self.duration.filter(|duration| !duration.is_zero())?;
        Some((self.position.as_secs_f64() / duration.as_secs_f64()).clamp(0.0, 1.0))
    }
}

pub fn dispatch(
    sequencer: &mut Sequencer,
    output: &mut dyn MediaOutput,
    command: Command,
) -> Option<Notice> {
    let result = match command {
        Command::Play => sequencer.play_current(output),
        Command::Pause => {
            sequencer.pause(output);
            Ok(())
        }
        Command::PlayPause => sequencer.play_pause(output),
        Command::Next => sequencer.advance(output),
        Command::Previous => sequencer.retreat(output),
        Command::Open(tracks) => {
            let count = tracks.len();
            if count == 0 {
                return Some(Notice::warning(MessageKey::ErrorNoFiles));
            }
            sequencer.load(tracks);
            return Some(Notice::info(MessageKey::PlaylistLoaded).with_count(count));
        }
        Command::Append(track) => {
            sequencer.append(track);
            return Some(Notice::info(MessageKey::StreamAdded));
        }
        Command::ToggleShuffle(on) => {
            sequencer.toggle_shuffle(on);
            Ok(())
        }
        Command::ToggleRepeat(on) => {
            sequencer.toggle_repeat(on);
            Ok(())
        }
        Command::ShuffleNow => match sequencer.shuffle_now(output) {
            Ok(()) => return Some(Notice::info(MessageKey::PlaylistShuffled)),
            Err(err) => Err(err),
        },
        Command::Seek(position) => sequencer.seek(output, position),
        Command::SetVolume(percent) => {
            sequencer.set_volume(output, percent);
            Ok(())
        }
    };

    match result {
        Ok(()) => None,
        Err(err) => {
            warn!("command failed: {err:#}");
            Some(Notice::from(err))
        }
    }
}

pub fn handle_media_event(
    sequencer: &mut Sequencer,
    output: &mut dyn MediaOutput,
    progress: &mut Progress,
    event: MediaEvent,
) -> Option<Notice> {
    match event {
        MediaEvent::PositionChanged(position) => {
            progress.position = position;
            None
        }
        MediaEvent::DurationChanged(duration) => {
            progress.duration = Some(duration);
            None
        }
        MediaEvent::EndOfMedia => {
            *progress = Progress::default();
            sequencer.on_track_end(output).err().map(|err| {
                warn!("end-of-track handling failed: {err:#}");
                Notice::from(err)
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::NullOutput;

    fn loaded(names: &[&str]) -> (Sequencer, NullOutput) {
        let mut sequencer = Sequencer::seeded(21);
        let mut output = NullOutput::new();
        let tracks = names.iter().map(|name| TrackRef::new(*name)).collect();
        dispatch(&mut sequencer, &mut output, Command::Open(tracks));
        (sequencer, output)
    }

    #[test]
    fn open_reports_loaded_count() {
        let mut sequencer = Sequencer::seeded(1);
        let mut output = NullOutput::new();
        let notice = dispatch(
            &mut sequencer,
            &mut output,
            Command::Open(vec![TrackRef::new("a.mp3"), TrackRef::new("b.mp3")]),
        )
        .expect("notice");

        assert_eq!(notice.level, NoticeLevel::Info);
        assert_eq!(notice.render(Locale::English), "2 files added to playlist.");
        assert_eq!(sequencer.cursor(), Some(0));
    }

    #[test]
    fn open_with_nothing_keeps_playlist() {
        let (mut sequencer, mut output) = loaded(&["a.mp3"]);
        let notice = dispatch(&mut sequencer, &mut output, Command::Open(Vec::new()));
        assert_eq!(notice, Some(Notice::warning(MessageKey::ErrorNoFiles)));
        assert_eq!(sequencer.playlist().len(), 1);
    }

    #[test]
    fn play_on_empty_playlist_warns() {
        let mut sequencer = Sequencer::seeded(1);
        let mut output = NullOutput::new();
        let notice = dispatch(&mut sequencer, &mut output, Command::Play).expect("notice");

        assert_eq!(notice.level, NoticeLevel::Warning);
        assert_eq!(notice.render(Locale::Russian), "Нет файлов в плейлисте.");
        assert_eq!(sequencer.cursor(), None);
    }

    #[test]
    fn play_pause_toggles_output() {
        let (mut sequencer, mut output) = loaded(&["a.mp3", "b.mp3"]);

        assert_eq!(dispatch(&mut sequencer, &mut output, Command::PlayPause), None);
        assert!(output.is_playing());
        assert_eq!(dispatch(&mut sequencer, &mut output, Command::PlayPause), None);
        assert!(!output.is_playing());
        assert!(!sequencer.is_playing());
    }

    #[test]
    fn shuffle_now_reports_success() {
        let (mut sequencer, mut output) = loaded(&["a.mp3", "b.mp3", "c.mp3"]);
        let notice = dispatch(&mut sequencer, &mut output, Command::ShuffleNow);
        assert_eq!(notice, Some(Notice::info(MessageKey::PlaylistShuffled)));
        assert!(output.is_playing());
    }

    #[test]
    fn volume_is_forwarded_and_clamped() {
        let (mut sequencer, mut output) = loaded(&["a.mp3"]);
        dispatch(&mut sequencer, &mut output, Command::SetVolume(140));
        assert_eq!(output.volume(), 100);
        dispatch(&mut sequencer, &mut output, Command::SetVolume(35));
        assert_eq!(output.volume(), 35);
    }

    #[test]
    fn end_of_media_advances_and_resets_progress() {
        let (mut sequencer, mut output) = loaded(&["a.mp3", "b.mp3"]);
        dispatch(&mut sequencer, &mut output, Command::Play);
        let mut progress = Progress {
            position: Duration::from_secs(3),
            duration: Some(Duration::from_secs(3)),
        };

        let notice = handle_media_event(
            &mut sequencer,
            &mut output,
            &mut progress,
            MediaEvent::EndOfMedia,
        );

        assert_eq!(notice, None);
        assert_eq!(sequencer.cursor(), Some(1));
        assert_eq!(progress, Progress::default());
        assert_eq!(output.loaded(), Some(&TrackRef::new("b.mp3")));
    }

    #[test]
    fn position_and_duration_events_update_progress() {
        let (mut sequencer, mut output) = loaded(&["a.mp3"]);
        let mut progress = Progress::default();

        handle_media_event(
            &mut sequencer,
            &mut output,
            &mut progress,
            MediaEvent::DurationChanged(Duration::from_secs(10)),
        );
        handle_media_event(
            &mut sequencer,
            &mut output,
            &mut progress,
            MediaEvent::PositionChanged(Duration::from_secs(5)),
        );

        assert_eq!(progress.ratio(), Some(0.5));
    }

    #[test]
    fn unconfigured_streaming_maps_to_warning() {
        let notice = Notice::from(ResolveError::ConfigurationMissing {
            service: crate::streaming::Service::Spotify,
        });
        assert_eq!(notice.level, NoticeLevel::Warning);
        assert_eq!(notice.key, MessageKey::StreamingNotConfigured);
    }
}
