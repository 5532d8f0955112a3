#![no_main]

use cecilio::audio::{MediaOutput, NullOutput};
use cecilio::command::{Command, Progress, dispatch, handle_media_event};
use cecilio::model::TrackRef;
use cecilio::sequencer::Sequencer;
use libfuzzer_sys::fuzz_target;
use std::time::Duration;

fuzz_target!(|data: &[u8]| {
    let Some((&seed, commands)) = data.split_first() else {
        return;
    };
    let mut sequencer = Sequencer::seeded(u64::from(seed));
    let mut output = NullOutput::new();
    let mut progress = Progress::default();
    let len = usize::from(seed % 16);
    let tracks = (0..len)
        .map(|idx| TrackRef::new(format!("track_{idx}.mp3")))
        .collect();
    dispatch(&mut sequencer, &mut output, Command::Open(tracks));

    for byte in commands {
        let command = match byte % 12 {
            0 => Command::Play,
            1 => Command::Pause,
            2 => Command::PlayPause,
            3 => Command::Next,
            4 => Command::Previous,
            5 => Command::ToggleShuffle(byte & 0x80 != 0),
            6 => Command::ToggleRepeat(byte & 0x80 != 0),
            7 => Command::ShuffleNow,
            8 => Command::Seek(Duration::from_secs(u64::from(*byte))),
            9 => Command::SetVolume(*byte),
            10 => Command::Append(TrackRef::new(format!("extra_{byte}.mp3"))),
            _ => {
                output.set_track_duration(Some(Duration::ZERO));
                for event in output.poll_events() {
                    handle_media_event(&mut sequencer, &mut output, &mut progress, event);
                }
                continue;
            }
        };
        dispatch(&mut sequencer, &mut output, command);

        let playlist_len = sequencer.playlist().len();
        assert!(sequencer.cursor().is_none_or(|cursor| cursor < playlist_len));
        assert!(sequencer.shuffle_order().all(|index| index < playlist_len));
        assert!(output.volume() <= 100);
    }
});
