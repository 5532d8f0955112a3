use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Locale {
    #[default]
    English,
    Russian,
}

impl Locale {
    pub fn next(self) -> Self {
        match self {
            Self::English => Self::Russian,
            Self::Russian => Self::English,
        }
    }

    pub fn parse(code: &str) -> Option<Self> {
        match code.to_ascii_lowercase().as_str() {
            "en" | "english" => Some(Self::English),
            "ru" | "russian" => Some(Self::Russian),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Russian => "ru",
        }
    }

    pub fn text(self, key: MessageKey) -> &'static str {
        match self {
            Self::English => english(key),
            Self::Russian => russian(key),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    WindowTitle,
    Play,
    Pause,
    Next,
    Previous,
    OpenFiles,
    Shuffle,
    Repeat,
    Volume,
    ShufflePlaylist,
    PlaylistTitle,
    Visualisation,
    ErrorNoFiles,
    PlaylistShuffled,
    PlaylistLoaded,
    StreamAdded,
    SoundcloudPrompt,
    SpotifyPrompt,
    YoutubePrompt,
    OpenPrompt,
    SoundcloudSearchPrompt,
    SpotifySearchPrompt,
    YoutubeSearchPrompt,
    SearchResultsTitle,
    NoSearchResults,
    StreamingError,
    StreamingNotConfigured,
    PlaybackError,
}

fn english(key: MessageKey) -> &'static str {
    match key {
        MessageKey::WindowTitle => "Cecilio Music Player",
        MessageKey::Play => "Play",
        MessageKey::Pause => "Pause",
        MessageKey::Next => "Next",
        MessageKey::Previous => "Previous",
        MessageKey::OpenFiles => "Open Files",
        MessageKey::Shuffle => "Shuffle",
        MessageKey::Repeat => "Repeat",
        MessageKey::Volume => "Volume",
        MessageKey::ShufflePlaylist => "Shuffle Playlist",
        MessageKey::PlaylistTitle => "Playlist",
        MessageKey::Visualisation => "Visualisation",
        MessageKey::ErrorNoFiles => "No files in playlist.",
        MessageKey::PlaylistShuffled => "Playlist has been shuffled!",
        MessageKey::PlaylistLoaded => "{count} files added to playlist.",
        MessageKey::StreamAdded => "Stream added to playlist.",
        MessageKey::SoundcloudPrompt => "Enter Soundcloud URL:",
        MessageKey::SpotifyPrompt => "Enter Spotify URL:",
        MessageKey::YoutubePrompt => "Enter YouTube URL:",
        MessageKey::OpenPrompt => "Enter file or folder path:",
        MessageKey::SoundcloudSearchPrompt => "Search Soundcloud:",
        MessageKey::SpotifySearchPrompt => "Search Spotify:",
        MessageKey::YoutubeSearchPrompt => "Search YouTube:",
        MessageKey::SearchResultsTitle => "Search Results",
        MessageKey::NoSearchResults => "Nothing found.",
        MessageKey::StreamingError => "Failed to load stream. Please check the URL.",
        MessageKey::StreamingNotConfigured => "This streaming service is not configured.",
        MessageKey::PlaybackError => "Playback failed.",
    }
}

fn russian(key: MessageKey) -> &'static str {
    match key {
        MessageKey::WindowTitle => "Плеер Cecilio",
        MessageKey::Play => "Играть",
        MessageKey::Pause => "Пауза",
        MessageKey::Next => "Следующий",
        MessageKey::Previous => "Предыдущий",
        MessageKey::OpenFiles => "Открыть Файлы",
        MessageKey::Shuffle => "Перемешать",
        MessageKey::Repeat => "Повтор",
        MessageKey::Volume => "Громкость",
        MessageKey::ShufflePlaylist => "Перемешать Плейлист",
        MessageKey::PlaylistTitle => "Плейлист",
        MessageKey::Visualisation => "Визуализация",
        MessageKey::ErrorNoFiles => "Нет файлов в плейлисте.",
        MessageKey::PlaylistShuffled => "Плейлист перемешан!",
        MessageKey::PlaylistLoaded => "{count} файлов добавлено в плейлист.",
        MessageKey::StreamAdded => "Стрим добавлен в плейлист.",
        MessageKey::SoundcloudPrompt => "Введите URL Soundcloud:",
        MessageKey::SpotifyPrompt => "Введите URL Spotify:",
        MessageKey::YoutubePrompt => "Введите URL YouTube:",
        MessageKey::OpenPrompt => "Введите путь к файлу или папке:",
        MessageKey::SoundcloudSearchPrompt => "Поиск в Soundcloud:",
        MessageKey::SpotifySearchPrompt => "Поиск в Spotify:",
        MessageKey::YoutubeSearchPrompt => "Поиск в YouTube:",
        MessageKey::SearchResultsTitle => "Результаты Поиска",
        MessageKey::NoSearchResults => "Ничего не найдено.",
        MessageKey::StreamingError => "Не удалось загрузить стрим. Проверьте URL.",
        MessageKey::StreamingNotConfigured => "Этот стриминговый сервис не настроен.",
        MessageKey::PlaybackError => "Ошибка воспроизведения.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locales_translate_transport_labels() {
        assert_eq!(Locale::English.text(MessageKey::Play), "Play");
        assert_eq!(Locale::Russian.text(MessageKey::Play), "Играть");
    }

    #[test]
    fn parse_accepts_codes_and_names() {
        assert_eq!(Locale::parse("RU"), Some(Locale::Russian));
        assert_eq!(Locale::parse("english"), Some(Locale::English));
        assert_eq!(Locale::parse("de"), None);
    }

    #[test]
    fn loaded_message_carries_count_placeholder() {
        for locale in [Locale::English, Locale::Russian] {
            assert!(locale.text(MessageKey::PlaylistLoaded).contains("{count}"));
        }
    }
}
