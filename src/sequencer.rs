use crate::audio::MediaOutput;
use crate::error::{PlayerError, PlayerResult};
use crate::model::TrackRef;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, info};

/// Elapsed position past which "previous" restarts the current track instead of moving back.
pub const DEFAULT_RESTART_THRESHOLD: Duration = Duration::from_secs(5);

/// Playlist, cursor and transport state for one player.
///
/// The cursor is `None` exactly when the playlist is empty. Every index stored in
/// the history or the shuffle order is within the playlist bounds.
#[derive(Debug)]
pub struct Sequencer {
    playlist: Vec<TrackRef>,
    cursor: Option<usize>,
    history: Vec<usize>,
    shuffle_order: VecDeque<usize>,
    repeat: bool,
    shuffle: bool,
    playing: bool,
    restart_threshold: Duration,
    rng: SmallRng,
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl Sequencer {
    pub fn new() -> Self {
        Self::with_rng(SmallRng::from_os_rng())
    }

    /// Deterministic shuffling, for reproducible runs.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(SmallRng::seed_from_u64(seed))
    }

    fn with_rng(rng: SmallRng) -> Self {
        Self {
            playlist: Vec::new(),
            cursor: None,
            history: Vec::new(),
            shuffle_order: VecDeque::new(),
            repeat: false,
            shuffle: false,
            playing: false,
            restart_threshold: DEFAULT_RESTART_THRESHOLD,
            rng,
        }
    }

    pub fn set_restart_threshold(&mut self, threshold: Duration) {
        self.restart_threshold = threshold;
    }

    pub fn playlist(&self) -> &[TrackRef] {
        &self.playlist
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn current(&self) -> Option<&TrackRef> {
        self.playlist.get(self.cursor?)
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn repeat(&self) -> bool {
        self.repeat
    }

    pub fn shuffle(&self) -> bool {
        self.shuffle
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn shuffle_order(&self) -> impl Iterator<Item = usize> + '_ {
        self.shuffle_order.iter().copied()
    }

    /// Replaces the playlist wholesale.
    pub fn load(&mut self, tracks: Vec<TrackRef>) {
        self.playlist = tracks;
        self.cursor = (!self.playlist.is_empty()).then_some(0);
        self.history.clear();
        self.playing = false;
        self.invalidate_shuffle_order();
        info!(tracks = self.playlist.len(), "playlist loaded");
    }

    /// Adds a reference at the end without disturbing the cursor or history.
    pub fn append(&mut self, track: TrackRef) {
        self.playlist.push(track);
        if self.cursor.is_none() {
            self.cursor = Some(0);
        }
        self.invalidate_shuffle_order();
        debug!(tracks = self.playlist.len(), "track appended");
    }

    pub fn play_current(&mut self, output: &mut dyn MediaOutput) -> PlayerResult<()> {
        if self.playlist.is_empty() {
            return Err(PlayerError::EmptyPlaylist);
        }
        let index = *self.cursor.get_or_insert(0);
        let track = &self.playlist[index];

        // A drained output cannot be restarted in place, so a finished track is loaded again.
        if output.loaded() != Some(track) || output.is_finished() {
            output.load(track)?;
        }
        output.play();
        self.playing = true;
        info!(index, track = %track, "playing");
        Ok(())
    }

    pub fn pause(&mut self, output: &mut dyn MediaOutput) {
        if !output.is_playing() {
            return;
        }
        output.pause();
        self.playing = false;
        debug!("paused");
    }

    pub fn play_pause(&mut self, output: &mut dyn MediaOutput) -> PlayerResult<()> {
        if output.is_playing() {
            self.pause(output);
            Ok(())
        } else {
            self.play_current(output)
        }
    }

    pub fn advance(&mut self, output: &mut dyn MediaOutput) -> PlayerResult<()> {
        if self.playlist.is_empty() {
            return Ok(());
        }
        let current = self.cursor.unwrap_or(0);
        self.history.push(current);

        let next = if self.shuffle {
            // An exhausted order is not replenished; traversal restarts from the first track.
            self.shuffle_order.pop_front().unwrap_or(0)
        } else {
            (current + 1) % self.playlist.len()
        };
        self.cursor = Some(next);
        self.play_current(output)
    }

    pub fn retreat(&mut self, output: &mut dyn MediaOutput) -> PlayerResult<()> {
        if self.playlist.is_empty() {
            return Ok(());
        }

        if let Some(previous) = self.history.pop() {
            self.cursor = Some(previous);
            return self.play_current(output);
        }

        if output.position() > self.restart_threshold {
            debug!("restarting current track");
            if output.is_finished() {
                return self.play_current(output);
            }
            return output.seek(Duration::ZERO).map_err(PlayerError::from);
        }

        let len = self.playlist.len();
        let current = self.cursor.unwrap_or(0);
        self.cursor = Some((current + len - 1) % len);
        self.play_current(output)
    }

    pub fn toggle_shuffle(&mut self, on: bool) {
        self.shuffle = on;
        if on {
            self.regenerate_shuffle_order();
        }
        info!(shuffle = on, "shuffle toggled");
    }

    pub fn toggle_repeat(&mut self, on: bool) {
        self.repeat = on;
        info!(repeat = on, "repeat toggled");
    }

    /// Permutes the playlist itself and starts again from its new first track.
    pub fn shuffle_now(&mut self, output: &mut dyn MediaOutput) -> PlayerResult<()> {
        if self.playlist.is_empty() {
            return Err(PlayerError::EmptyPlaylist);
        }
        self.playlist.shuffle(&mut self.rng);
        self.cursor = Some(0);
        self.history.clear();
        self.invalidate_shuffle_order();
        info!(tracks = self.playlist.len(), "playlist shuffled");
        self.play_current(output)
    }

    pub fn on_track_end(&mut self, output: &mut dyn MediaOutput) -> PlayerResult<()> {
        if !self.repeat {
            return self.advance(output);
        }
        let Some(track) = self.current().cloned() else {
            return Ok(());
        };

        if output.is_finished() {
            output.load(&track)?;
        } else if let Err(err) = output.seek(Duration::ZERO) {
            debug!("seek to start failed, reloading: {err:#}");
            output.load(&track)?;
        }
        output.play();
        self.playing = true;
        debug!(track = %track, "repeating track");
        Ok(())
    }

    pub fn seek(&mut self, output: &mut dyn MediaOutput, position: Duration) -> PlayerResult<()> {
        if output.loaded().is_none() {
            return Ok(());
        }
        output.seek(position).map_err(PlayerError::from)
    }

    pub fn set_volume(&mut self, output: &mut dyn MediaOutput, percent: u8) {
        output.set_volume(percent.min(100));
    }

    fn invalidate_shuffle_order(&mut self) {
        if self.shuffle {
            self.regenerate_shuffle_order();
        } else {
            self.shuffle_order.clear();
        }
    }

    fn regenerate_shuffle_order(&mut self) {
        let mut order: Vec<usize> = (0..self.playlist.len()).collect();
        order.shuffle(&mut self.rng);
        self.shuffle_order = order.into();
    }
}
