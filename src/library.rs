use crate::model::TrackRef;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "flac", "ogg", "m4a"];

/// Turns user-supplied paths and URLs into playlist entries.
///
/// Stream URLs pass through untouched, audio files are kept, directories are walked
/// and their audio files appended in path order. Anything else is skipped.
pub fn expand<I, S>(inputs: I) -> Vec<TrackRef>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut tracks = Vec::new();

    for input in inputs {
        let raw = input.as_ref().trim();
        if raw.is_empty() {
            continue;
        }

        let candidate = TrackRef::new(raw);
        if candidate.is_stream() {
            tracks.push(candidate);
            continue;
        }

        let path = normalize_path(Path::new(raw));
        if path.is_dir() {
            let found = scan_folder(&path);
            debug!(dir = %path.display(), count = found.len(), "scanned folder");
            tracks.extend(found);
        } else if path.is_file() && is_audio(&path) {
            tracks.push(TrackRef::from_path(&path));
        } else {
            warn!(path = %path.display(), "skipping unsupported or missing path");
        }
    }

    tracks
}

pub fn scan_folder(root: &Path) -> Vec<TrackRef> {
    let mut paths: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file() && is_audio(entry.path()))
        .map(|entry| entry.into_path())
        .collect();

    paths.sort();
    paths.iter().map(|path| TrackRef::from_path(path)).collect()
}

pub fn is_audio(path: &Path) -> bool {
    let ext = path.extension().and_then(OsStr::to_str).unwrap_or_default();
    AUDIO_EXTENSIONS
        .iter()
        .any(|supported| ext.eq_ignore_ascii_case(supported))
}

pub fn normalize_path(path: &Path) -> PathBuf {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    strip_windows_verbatim_prefix(&canonical)
}

fn strip_windows_verbatim_prefix(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();

    if let Some(trimmed) = raw.strip_prefix(r"\\?\UNC\") {
        return PathBuf::from(format!(r"\\{trimmed}"));
    }

    if let Some(trimmed) = raw.strip_prefix(r"\\?\") {
        return PathBuf::from(trimmed);
    }

    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn scan_filters_non_audio_files_and_sorts() {
        let dir = tempdir().expect("tempdir");
        fs::create_dir(dir.path().join("nested")).expect("mkdir");
        fs::write(dir.path().join("b.mp3"), b"x").expect("write mp3");
        fs::write(dir.path().join("a.FLAC"), b"x").expect("write flac");
        fs::write(dir.path().join("nested").join("c.wav"), b"x").expect("write wav");
        fs::write(dir.path().join("notes.txt"), b"x").expect("write txt");

        let names: Vec<String> = scan_folder(dir.path())
            .iter()
            .map(TrackRef::display_name)
            .collect();
        assert_eq!(names, vec!["a.FLAC", "b.mp3", "c.wav"]);
    }

    #[test]
    fn expand_keeps_urls_and_files_in_input_order() {
        let dir = tempdir().expect("tempdir");
        let song = dir.path().join("song.ogg");
        fs::write(&song, b"x").expect("write ogg");

        let tracks = expand([
            "https://cdn.example/stream.mp3?sig=1",
            song.to_string_lossy().as_ref(),
            "   ",
        ]);

        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].as_str(), "https://cdn.example/stream.mp3?sig=1");
        assert_eq!(tracks[1].display_name(), "song.ogg");
    }

    #[test]
    fn expand_skips_missing_and_unsupported_paths() {
        let dir = tempdir().expect("tempdir");
        let text = dir.path().join("readme.md");
        fs::write(&text, b"x").expect("write md");

        let tracks = expand([
            text.to_string_lossy().to_string(),
            dir.path().join("missing.mp3").to_string_lossy().to_string(),
        ]);
        assert!(tracks.is_empty());
    }

    #[test]
    fn verbatim_prefixes_are_stripped() {
        assert_eq!(
            strip_windows_verbatim_prefix(Path::new(r"\\?\C:\Music\a.mp3")),
            PathBuf::from(r"C:\Music\a.mp3")
        );
        assert_eq!(
            strip_windows_verbatim_prefix(Path::new(r"\\?\UNC\server\share")),
            PathBuf::from(r"\\server\share")
        );
    }
}
