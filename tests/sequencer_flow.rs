use std::collections::HashSet;
use std::time::Duration;

use cecilio::audio::{MediaEvent, MediaOutput, NullOutput};
use cecilio::command::{Command, Progress, dispatch, handle_media_event};
use cecilio::model::TrackRef;
use cecilio::sequencer::Sequencer;

fn playlist(len: usize) -> Vec<TrackRef> {
    (0..len)
        .map(|idx| TrackRef::new(format!("track_{idx}.mp3")))
        .collect()
}

/// Forces the currently loaded track to end and lets the sequencer react.
fn finish_current(sequencer: &mut Sequencer, output: &mut NullOutput, progress: &mut Progress) {
    output.set_track_duration(Some(Duration::ZERO));
    pump(sequencer, output, progress);
}

fn pump(sequencer: &mut Sequencer, output: &mut dyn MediaOutput, progress: &mut Progress) {
    for event in output.poll_events() {
        handle_media_event(sequencer, output, progress, event);
    }
}

/// Behaves like an audio sink that ran dry: it stays finished and accepts seeks without
/// moving until something is loaded again.
#[derive(Default)]
struct DrainingOutput {
    inner: NullOutput,
    drained: bool,
    end_reported: bool,
    loads: usize,
    seeks: usize,
}

impl DrainingOutput {
    fn drain(&mut self) {
        self.drained = true;
        self.end_reported = false;
    }
}

impl MediaOutput for DrainingOutput {
    fn load(&mut self, reference: &TrackRef) -> anyhow::Result<()> {
        self.drained = false;
        self.loads += 1;
        self.inner.load(reference)
    }

    fn loaded(&self) -> Option<&TrackRef> {
        self.inner.loaded()
    }

    fn play(&mut self) {
        self.inner.play();
    }

    fn pause(&mut self) {
        self.inner.pause();
    }

    fn is_playing(&self) -> bool {
        !self.drained && self.inner.is_playing()
    }

    fn is_finished(&self) -> bool {
        self.drained
    }

    fn seek(&mut self, position: Duration) -> anyhow::Result<()> {
        self.seeks += 1;
        if self.drained {
            return Ok(());
        }
        self.inner.seek(position)
    }

    fn position(&self) -> Duration {
        self.inner.position()
    }

    fn duration(&self) -> Option<Duration> {
        self.inner.duration()
    }

    fn volume(&self) -> u8 {
        self.inner.volume()
    }

    fn set_volume(&mut self, percent: u8) {
        self.inner.set_volume(percent);
    }

    fn output_name(&self) -> String {
        String::from("draining output")
    }

    fn poll_events(&mut self) -> Vec<MediaEvent> {
        if self.drained && !self.end_reported {
            self.end_reported = true;
            return vec![MediaEvent::EndOfMedia];
        }
        Vec::new()
    }
}

#[test]
fn linear_playback_wraps_to_first_track() {
    let mut sequencer = Sequencer::seeded(1);
    let mut output = NullOutput::new();
    let mut progress = Progress::default();
    dispatch(&mut sequencer, &mut output, Command::Open(playlist(3)));
    dispatch(&mut sequencer, &mut output, Command::Play);

    let mut visited = vec![sequencer.cursor()];
    for _ in 0..3 {
        finish_current(&mut sequencer, &mut output, &mut progress);
        visited.push(sequencer.cursor());
    }

    assert_eq!(visited, vec![Some(0), Some(1), Some(2), Some(0)]);
    assert!(output.is_playing());
}

#[test]
fn shuffle_visits_every_track_once_then_backtracks_through_history() {
    let mut sequencer = Sequencer::seeded(99);
    let mut output = NullOutput::new();
    dispatch(&mut sequencer, &mut output, Command::Open(playlist(6)));
    dispatch(&mut sequencer, &mut output, Command::ToggleShuffle(true));
    dispatch(&mut sequencer, &mut output, Command::Play);

    let mut visited = Vec::new();
    for _ in 0..6 {
        dispatch(&mut sequencer, &mut output, Command::Next);
        visited.push(sequencer.cursor().expect("cursor"));
    }
    let distinct: HashSet<usize> = visited.iter().copied().collect();
    assert_eq!(distinct.len(), 6);

    for expected in visited.iter().rev().skip(1) {
        dispatch(&mut sequencer, &mut output, Command::Previous);
        assert_eq!(sequencer.cursor(), Some(*expected));
    }
}

#[test]
fn repeat_restarts_the_same_track_on_end() {
    let mut sequencer = Sequencer::seeded(4);
    let mut output = NullOutput::new();
    let mut progress = Progress::default();
    dispatch(&mut sequencer, &mut output, Command::Open(playlist(2)));
    dispatch(&mut sequencer, &mut output, Command::ToggleRepeat(true));
    dispatch(&mut sequencer, &mut output, Command::Play);

    finish_current(&mut sequencer, &mut output, &mut progress);

    assert_eq!(sequencer.cursor(), Some(0));
    assert_eq!(output.position(), Duration::ZERO);
    assert_eq!(output.loaded(), Some(&TrackRef::new("track_0.mp3")));
}

#[test]
fn appended_stream_joins_the_rotation() {
    let mut sequencer = Sequencer::seeded(8);
    let mut output = NullOutput::new();
    dispatch(&mut sequencer, &mut output, Command::Open(playlist(1)));
    dispatch(
        &mut sequencer,
        &mut output,
        Command::Append(TrackRef::new("https://cdn.example/stream?client_id=x")),
    );
    dispatch(&mut sequencer, &mut output, Command::Play);
    dispatch(&mut sequencer, &mut output, Command::Next);

    assert_eq!(sequencer.cursor(), Some(1));
    assert!(output.loaded().is_some_and(TrackRef::is_stream));
}

#[test]
fn single_track_without_repeat_keeps_playing_after_each_end() {
    let mut sequencer = Sequencer::seeded(2);
    let mut output = NullOutput::new();
    let mut progress = Progress::default();
    dispatch(&mut sequencer, &mut output, Command::Open(playlist(1)));
    dispatch(&mut sequencer, &mut output, Command::Play);

    for _ in 0..3 {
        finish_current(&mut sequencer, &mut output, &mut progress);

        assert_eq!(sequencer.cursor(), Some(0));
        assert!(sequencer.is_playing());
        assert!(output.is_playing());
        assert!(!output.is_finished());
        assert_eq!(output.loaded(), Some(&TrackRef::new("track_0.mp3")));
    }
}

#[test]
fn repeat_reloads_a_drained_output_that_ignores_seeks() {
    let mut sequencer = Sequencer::seeded(4);
    let mut output = DrainingOutput::default();
    let mut progress = Progress::default();
    dispatch(&mut sequencer, &mut output, Command::Open(playlist(2)));
    dispatch(&mut sequencer, &mut output, Command::ToggleRepeat(true));
    dispatch(&mut sequencer, &mut output, Command::Play);
    assert_eq!(output.loads, 1);

    for expected_loads in 2..4 {
        output.drain();
        pump(&mut sequencer, &mut output, &mut progress);

        assert_eq!(sequencer.cursor(), Some(0));
        assert_eq!(output.loads, expected_loads);
        assert!(output.is_playing());
        assert_eq!(output.loaded(), Some(&TrackRef::new("track_0.mp3")));
    }
    assert_eq!(output.seeks, 0);
}

#[test]
fn wrapping_onto_a_drained_track_reloads_it() {
    let mut sequencer = Sequencer::seeded(6);
    let mut output = DrainingOutput::default();
    let mut progress = Progress::default();
    dispatch(&mut sequencer, &mut output, Command::Open(playlist(1)));
    dispatch(&mut sequencer, &mut output, Command::Play);

    output.drain();
    pump(&mut sequencer, &mut output, &mut progress);

    assert_eq!(output.loads, 2);
    assert!(output.is_playing());
    assert_eq!(progress, Progress::default());
}
