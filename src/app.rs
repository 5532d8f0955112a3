use crate::audio::{MediaOutput, NullOutput, RodioOutput};
use crate::command::{self, Command, Notice, Progress};
use crate::config;
use crate::i18n::{Locale, MessageKey};
use crate::library;
use crate::model::{Settings, VisualMode};
use crate::sequencer::Sequencer;
use crate::streaming::{Resolvers, SearchHit, Service, StreamingCredentials};
use crate::visualiser::{self, VisualFrame, Visualiser};
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io::stdout;
use std::time::{Duration, Instant};
use tracing::{info, warn};

const INPUT_POLL: Duration = Duration::from_millis(33);
const REDRAW_INTERVAL: Duration = Duration::from_millis(250);
const SEEK_STEP: Duration = Duration::from_secs(5);
const VOLUME_STEP: u8 = 5;
const SEARCH_LIMIT: usize = 10;

#[derive(Debug, Default)]
pub struct StartupOptions {
    pub locale: Option<Locale>,
    pub visual_mode: Option<VisualMode>,
    pub paths: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    OpenPath,
    StreamUrl(Service),
    Search(Service),
}

impl Prompt {
    pub fn label(self) -> MessageKey {
        match self {
            Self::OpenPath => MessageKey::OpenPrompt,
            Self::StreamUrl(service) => service.prompt(),
            Self::Search(service) => service.search_prompt(),
        }
    }
}

/// Hits of the last search, shown in place of the playlist until one is picked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResults {
    pub service: Service,
    pub hits: Vec<SearchHit>,
    pub selected: usize,
}

impl SearchResults {
    fn select_next(&mut self) {
        if self.selected + 1 < self.hits.len() {
            self.selected += 1;
        }
    }

    fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn selected_hit(&self) -> Option<&SearchHit> {
        self.hits.get(self.selected)
    }
}

/// Everything the terminal front end owns between frames.
pub struct App {
    pub settings: Settings,
    pub sequencer: Sequencer,
    pub visualiser: Visualiser,
    pub resolvers: Resolvers,
    pub progress: Progress,
    pub frame: Option<VisualFrame>,
    pub notice: Option<Notice>,
    pub prompt: Option<Prompt>,
    pub search: Option<SearchResults>,
    pub input: String,
    pub dirty: bool,
    pub quit: bool,
}

impl App {
    pub fn new(settings: Settings, credentials: StreamingCredentials) -> Self {
        Self::with_sequencer(settings, credentials, Sequencer::new())
    }

    pub fn with_sequencer(
        settings: Settings,
        credentials: StreamingCredentials,
        mut sequencer: Sequencer,
    ) -> Self {
        sequencer.set_restart_threshold(settings.restart_threshold());
        sequencer.toggle_repeat(settings.repeat);
        sequencer.toggle_shuffle(settings.shuffle);

        let resolvers = Resolvers::new(credentials, &settings.youtube_extractor);
        info!(configured = ?resolvers.configured(), "streaming services");

        Self {
            visualiser: Visualiser::new(settings.visual_mode),
            settings,
            sequencer,
            resolvers,
            progress: Progress::default(),
            frame: None,
            notice: None,
            prompt: None,
            search: None,
            input: String::new(),
            dirty: true,
            quit: false,
        }
    }

    pub fn locale(&self) -> Locale {
        self.settings.locale
    }

    pub fn apply(&mut self, output: &mut dyn MediaOutput, command: Command) {
        if let Some(notice) = command::dispatch(&mut self.sequencer, output, command) {
            self.notice = Some(notice);
        }
        self.sync_visualiser();
        self.dirty = true;
    }

    /// Drains output notifications; end of media moves the sequencer on.
    pub fn pump_media(&mut self, output: &mut dyn MediaOutput) {
        let events = output.poll_events();
        if events.is_empty() {
            return;
        }
        for event in events {
            if let Some(notice) =
                command::handle_media_event(&mut self.sequencer, output, &mut self.progress, event)
            {
                self.notice = Some(notice);
            }
        }
        self.sync_visualiser();
        self.dirty = true;
    }

    pub fn tick_visualiser(&mut self, output: &dyn MediaOutput) {
        if let Some(frame) = self.visualiser.tick(output.is_playing(), output.volume()) {
            self.frame = Some(frame);
            self.dirty = true;
        }
    }

    fn sync_visualiser(&mut self) {
        if self.sequencer.is_playing() {
            self.visualiser
                .start(self.sequencer.shuffle(), self.sequencer.repeat());
        } else if self.visualiser.is_running() {
            self.visualiser.stop();
        }
    }

    pub fn handle_key(&mut self, output: &mut dyn MediaOutput, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if self.prompt.is_some() {
            self.handle_prompt_key(output, key);
            return;
        }
        if self.search.is_some() && self.handle_search_key(output, key) {
            return;
        }

        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => self.quit = true,
            KeyCode::Char('q') => self.quit = true,
            KeyCode::Char(' ') => self.apply(output, Command::PlayPause),
            KeyCode::Char('n') => self.apply(output, Command::Next),
            KeyCode::Char('p') => self.apply(output, Command::Previous),
            KeyCode::Char('s') => {
                let on = !self.sequencer.shuffle();
                self.apply(output, Command::ToggleShuffle(on));
            }
            KeyCode::Char('r') => {
                let on = !self.sequencer.repeat();
                self.apply(output, Command::ToggleRepeat(on));
            }
            KeyCode::Char('S') => self.apply(output, Command::ShuffleNow),
            KeyCode::Left => {
                let target = output.position().saturating_sub(SEEK_STEP);
                self.apply(output, Command::Seek(target));
            }
            KeyCode::Right => {
                let target = output.position() + SEEK_STEP;
                self.apply(output, Command::Seek(target));
            }
            KeyCode::Char('+') | KeyCode::Char('=') => {
                let percent = output.volume().saturating_add(VOLUME_STEP);
                self.apply(output, Command::SetVolume(percent));
            }
            KeyCode::Char('-') => {
                let percent = output.volume().saturating_sub(VOLUME_STEP);
                self.apply(output, Command::SetVolume(percent));
            }
            KeyCode::Char('v') => {
                let mode = self.visualiser.mode().next();
                self.visualiser.set_mode(mode);
                self.settings.visual_mode = mode;
                self.dirty = true;
            }
            KeyCode::Char('l') => {
                self.settings.locale = self.settings.locale.next();
                self.dirty = true;
            }
            KeyCode::Char('o') => self.open_prompt(Prompt::OpenPath),
            KeyCode::Char('1') => self.open_prompt(Prompt::StreamUrl(Service::SoundCloud)),
            KeyCode::Char('2') => self.open_prompt(Prompt::StreamUrl(Service::Spotify)),
            KeyCode::Char('3') => self.open_prompt(Prompt::StreamUrl(Service::YouTube)),
            KeyCode::Char('!') => self.open_prompt(Prompt::Search(Service::SoundCloud)),
            KeyCode::Char('@') => self.open_prompt(Prompt::Search(Service::Spotify)),
            KeyCode::Char('#') => self.open_prompt(Prompt::Search(Service::YouTube)),
            _ => {}
        }
    }

    /// Navigation keys of the results list. Anything else falls through to the player.
    fn handle_search_key(&mut self, output: &mut dyn MediaOutput, key: KeyEvent) -> bool {
        let Some(results) = self.search.as_mut() else {
            return false;
        };
        match key.code {
            KeyCode::Up => results.select_previous(),
            KeyCode::Down => results.select_next(),
            KeyCode::Esc => self.search = None,
            KeyCode::Enter => self.pick_search_hit(output),
            _ => return false,
        }
        self.dirty = true;
        true
    }

    fn pick_search_hit(&mut self, output: &mut dyn MediaOutput) {
        let Some(results) = self.search.take() else {
            return;
        };
        let Some(hit) = results.selected_hit() else {
            return;
        };
        self.append_stream(output, results.service, &hit.url);
    }

    fn append_stream(&mut self, output: &mut dyn MediaOutput, service: Service, url: &str) {
        let resolver = self.resolvers.get(service);
        match resolver.resolve(url) {
            Ok(track) => {
                info!(
                    service = %resolver.service(),
                    track = %track.display_name(),
                    "stream resolved"
                );
                self.apply(output, Command::Append(track));
            }
            Err(err) => {
                warn!(service = %err.service(), "stream resolution failed: {err}");
                self.notice = Some(Notice::from(err));
            }
        }
    }

    fn run_search(&mut self, service: Service, query: &str) {
        match self.resolvers.get(service).search(query, SEARCH_LIMIT) {
            Ok(hits) if hits.is_empty() => {
                self.search = None;
                self.notice = Some(Notice::info(MessageKey::NoSearchResults));
            }
            Ok(hits) => {
                info!(%service, hits = hits.len(), "search finished");
                self.search = Some(SearchResults {
                    service,
                    hits,
                    selected: 0,
                });
            }
            Err(err) => {
                warn!(service = %err.service(), "search failed: {err}");
                self.notice = Some(Notice::from(err));
            }
        }
    }

    fn open_prompt(&mut self, prompt: Prompt) {
        self.prompt = Some(prompt);
        self.input.clear();
        self.dirty = true;
    }

    fn handle_prompt_key(&mut self, output: &mut dyn MediaOutput, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.prompt = None;
                self.input.clear();
            }
            KeyCode::Enter => self.submit_prompt(output),
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.quit = true;
            }
            KeyCode::Char(ch) => self.input.push(ch),
            _ => {}
        }
        self.dirty = true;
    }

    fn submit_prompt(&mut self, output: &mut dyn MediaOutput) {
        let Some(prompt) = self.prompt.take() else {
            return;
        };
        let raw = std::mem::take(&mut self.input);
        let raw = raw.trim();

        match prompt {
            Prompt::OpenPath => {
                let tracks = library::expand(raw.split(';'));
                self.apply(output, Command::Open(tracks));
            }
            Prompt::StreamUrl(service) => {
                if !raw.is_empty() {
                    self.append_stream(output, service, raw);
                }
            }
            Prompt::Search(service) => {
                if !raw.is_empty() {
                    self.run_search(service, raw);
                }
            }
        }
    }

    /// Copies the live player state back into the settings that get persisted.
    pub fn capture_settings(&mut self, output: &dyn MediaOutput) -> &Settings {
        self.settings.volume = output.volume();
        self.settings.repeat = self.sequencer.repeat();
        self.settings.shuffle = self.sequencer.shuffle();
        self.settings.visual_mode = self.visualiser.mode();
        &self.settings
    }
}

pub fn run(options: StartupOptions) -> Result<()> {
    let mut settings = config::load_settings().unwrap_or_else(|err| {
        warn!("settings unavailable, using defaults: {err:#}");
        Settings::default()
    });
    let credentials = config::load_streaming_credentials().unwrap_or_else(|err| {
        warn!("streaming credentials unavailable: {err:#}");
        StreamingCredentials::default()
    });
    if let Some(locale) = options.locale {
        settings.locale = locale;
    }
    if let Some(mode) = options.visual_mode {
        settings.visual_mode = mode;
    }

    let mut output: Box<dyn MediaOutput> = match RodioOutput::new() {
        Ok(output) => Box::new(output),
        Err(err) => {
            warn!("audio device unavailable, continuing without sound: {err:#}");
            Box::new(NullOutput::new())
        }
    };
    info!(device = %output.output_name(), "audio output ready");

    let mut app = App::new(settings, credentials);
    let volume = app.settings.volume;
    app.apply(&mut *output, Command::SetVolume(volume));
    if !options.paths.is_empty() {
        let tracks = library::expand(&options.paths);
        app.apply(&mut *output, Command::Open(tracks));
    }

    enable_raw_mode()?;
    let mut out = stdout();
    execute!(out, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(out);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let mut last_draw = Instant::now();
    let mut last_visual_tick = Instant::now();

    let result: Result<()> = loop {
        if app.quit {
            break Ok(());
        }

        app.pump_media(&mut *output);
        if last_visual_tick.elapsed() >= visualiser::TICK_INTERVAL {
            app.tick_visualiser(&*output);
            last_visual_tick = Instant::now();
        }

        if app.dirty || last_draw.elapsed() > REDRAW_INTERVAL {
            if let Err(err) = terminal.draw(|frame| crate::ui::draw(frame, &app, &*output)) {
                break Err(err.into());
            }
            app.dirty = false;
            last_draw = Instant::now();
        }

        match event::poll(INPUT_POLL) {
            Ok(false) => continue,
            Ok(true) => {}
            Err(err) => break Err(err.into()),
        }
        match event::read() {
            Ok(Event::Key(key)) => app.handle_key(&mut *output, key),
            Ok(Event::Resize(_, _)) => app.dirty = true,
            Ok(_) => {}
            Err(err) => break Err(err.into()),
        }
    };

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    let save_result = config::save_settings(app.capture_settings(&*output));
    result?;
    save_result?;
    Ok(())
}
