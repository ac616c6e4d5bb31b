//! Interactive player: song, theme, font and volume selectors on top, typed
//! lyrics below. Playback runs on one worker thread per session and talks
//! back to the UI thread through a channel.

mod surface;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use lyricstream_core::{
    audio, AppConfig, Catalog, ColorCycle, PlaybackOutcome, PlaybackRequest, PlaybackState,
    Player, Result, Song, SystemClock, Theme, Transport,
};
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Clear, Paragraph, Wrap};
use ratatui::{DefaultTerminal, Frame};

use surface::{ChannelSurface, UiEvent};

const POLL_DURATION: Duration = Duration::from_millis(50);
const VOLUME_STEP: f32 = 0.1;
const START_STEP: f64 = 5.0;
const TEXT_COLOR: Color = Color::Rgb(0xde, 0xe2, 0xe6);

/// Terminal stand-in for a font family: how lyric text is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FontStyle {
    Regular,
    Bold,
    Italic,
}

impl FontStyle {
    fn next(self) -> Self {
        match self {
            FontStyle::Regular => FontStyle::Bold,
            FontStyle::Bold => FontStyle::Italic,
            FontStyle::Italic => FontStyle::Regular,
        }
    }

    fn label(self) -> &'static str {
        match self {
            FontStyle::Regular => "regular",
            FontStyle::Bold => "bold",
            FontStyle::Italic => "italic",
        }
    }

    fn modifier(self) -> Modifier {
        match self {
            FontStyle::Regular => Modifier::empty(),
            FontStyle::Bold => Modifier::BOLD,
            FontStyle::Italic => Modifier::ITALIC,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Ready,
    Playing,
    Paused,
    Stopped,
}

impl Status {
    fn label(self) -> &'static str {
        match self {
            Status::Ready => "Ready",
            Status::Playing => "Playing...",
            Status::Paused => "Paused",
            Status::Stopped => "Stopped",
        }
    }
}

#[derive(Debug, Clone)]
struct SongChoice {
    id: String,
    title: String,
}

pub struct App {
    config: AppConfig,
    songs: Vec<SongChoice>,
    selected: usize,
    title: String,
    artist: String,
    theme: Theme,
    font: FontStyle,
    volume: f32,
    start_at: f64,
    transport: Arc<Transport>,
    /// Bumped for every started worker; tags its `Ended` event.
    session: u64,
    worker: Option<JoinHandle<()>>,
    events_tx: Sender<UiEvent>,
    events_rx: Receiver<UiEvent>,
    lyrics: Vec<Line<'static>>,
    lyrics_done: bool,
    status: Status,
    dialog: Option<String>,
    quit: bool,
}

impl App {
    pub fn new(config: AppConfig) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        let transport = Arc::new(Transport::new());
        transport.set_volume(config.playback.volume);

        let mut app = Self {
            theme: config.playback.theme,
            volume: transport.volume(),
            config,
            songs: Vec::new(),
            selected: 0,
            title: "Select a song".to_string(),
            artist: String::new(),
            font: FontStyle::Regular,
            start_at: 0.0,
            transport,
            session: 0,
            worker: None,
            events_tx,
            events_rx,
            lyrics: vec![Line::default()],
            lyrics_done: false,
            status: Status::Ready,
            dialog: None,
            quit: false,
        };

        match Catalog::load(&app.config.catalog) {
            Ok(catalog) => {
                app.songs = catalog
                    .list()
                    .into_iter()
                    .map(|(id, title)| SongChoice {
                        id: id.to_string(),
                        title: title.to_string(),
                    })
                    .collect();
                app.refresh_header();
            }
            Err(err) => app.dialog = Some(err.to_string()),
        }
        app
    }

    fn event_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        while !self.quit {
            self.drain_events();
            terminal.draw(|frame| self.draw(frame))?;

            if event::poll(POLL_DURATION)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key);
                    }
                }
            }
        }
        Ok(())
    }

    /// Stops any running session and waits for its worker to exit.
    fn shutdown(&mut self) {
        self.transport.stop();
        self.reap_worker();
    }

    fn drain_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            self.apply(event);
        }
    }

    fn apply(&mut self, event: UiEvent) {
        match event {
            UiEvent::Char(ch, color) => {
                let fg = color
                    .map(|color| {
                        let (r, g, b) = color.rgb();
                        Color::Rgb(r, g, b)
                    })
                    .unwrap_or(TEXT_COLOR);
                let span = Span::styled(ch.to_string(), Style::new().fg(fg));
                match self.lyrics.last_mut() {
                    Some(line) => line.spans.push(span),
                    None => self.lyrics.push(Line::from(span)),
                }
            }
            UiEvent::Newline => self.lyrics.push(Line::default()),
            UiEvent::LyricsDone => self.lyrics_done = true,
            UiEvent::Ended(session, _) if session != self.session => {
                tracing::debug!(session, current = self.session, "ignoring stale session end");
            }
            UiEvent::Ended(_, result) => {
                match result {
                    Ok(outcome) => tracing::info!(?outcome, "session ended"),
                    Err(err) => self.dialog = Some(format!("Could not play audio: {err}")),
                }
                self.reset();
            }
        }
    }

    fn reset(&mut self) {
        self.transport.finish();
        self.status = Status::Ready;
        self.reap_worker();
    }

    fn reap_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::warn!("playback worker panicked");
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if self.dialog.take().is_some() {
            return;
        }

        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.quit = true
            }
            KeyCode::Char(' ') => self.toggle(),
            KeyCode::Esc => self.stop(),
            KeyCode::Enter => self.play(),
            KeyCode::Up => self.select(-1),
            KeyCode::Down => self.select(1),
            KeyCode::Char('t') => self.theme = self.theme.next(),
            KeyCode::Char('f') => self.font = self.font.next(),
            KeyCode::Char('+') | KeyCode::Char('=') => self.adjust_volume(VOLUME_STEP),
            KeyCode::Char('-') => self.adjust_volume(-VOLUME_STEP),
            KeyCode::Char(']') => self.start_at += START_STEP,
            KeyCode::Char('[') => self.start_at = (self.start_at - START_STEP).max(0.0),
            KeyCode::Char('q') => self.quit = true,
            _ => {}
        }
    }

    fn select(&mut self, delta: isize) {
        if self.songs.is_empty() {
            return;
        }
        let len = self.songs.len() as isize;
        self.selected = (self.selected as isize + delta).rem_euclid(len) as usize;
        self.refresh_header();
    }

    /// Re-reads the catalog so the header reflects the file as it is now.
    fn refresh_header(&mut self) {
        let Some(choice) = self.songs.get(self.selected) else {
            return;
        };
        let song = Catalog::load(&self.config.catalog)
            .and_then(|catalog| catalog.get(&choice.id).cloned());
        match song {
            Ok(song) => {
                self.title = song.display_title().to_string();
                self.artist = song.artist;
            }
            Err(err) => {
                tracing::warn!(id = %choice.id, %err, "cannot refresh song details");
                self.title = choice.title.clone();
                self.artist = String::new();
            }
        }
    }

    fn adjust_volume(&mut self, delta: f32) {
        let volume = ((self.volume + delta) * 10.0).round() / 10.0;
        self.volume = volume.clamp(0.0, 1.0);
        self.transport.set_volume(self.volume);
    }

    fn toggle(&mut self) {
        if self.transport.is_active() {
            self.transport.toggle();
            self.status = match self.transport.state() {
                PlaybackState::Paused => Status::Paused,
                _ => Status::Playing,
            };
        } else if !self.songs.is_empty() {
            self.play();
        }
    }

    fn stop(&mut self) {
        if self.transport.stop() {
            self.status = Status::Stopped;
        }
    }

    fn play(&mut self) {
        if self.worker.as_ref().is_some_and(|worker| !worker.is_finished()) {
            return;
        }
        // A finished worker may still have events queued; settle them first.
        self.drain_events();
        if self.worker.is_some() {
            self.reset();
        }
        let Some(choice) = self.songs.get(self.selected) else {
            self.dialog = Some("No songs in catalog".to_string());
            return;
        };

        let prepared = Catalog::load(&self.config.catalog).and_then(|catalog| {
            let song = catalog.get(&choice.id)?.clone();
            let audio_path = catalog.resolve_audio(&song)?;
            Ok((song, audio_path))
        });
        let (song, audio_path) = match prepared {
            Ok(prepared) => prepared,
            Err(err) => {
                self.dialog = Some(err.to_string());
                return;
            }
        };

        if !self.transport.begin() {
            return;
        }
        self.lyrics = vec![Line::default()];
        self.lyrics_done = false;
        self.status = Status::Playing;

        self.session += 1;
        match self.spawn_worker(song, audio_path) {
            Ok(worker) => self.worker = Some(worker),
            Err(err) => {
                self.transport.finish();
                self.status = Status::Ready;
                self.dialog = Some(format!("Cannot start playback: {err}"));
            }
        }
    }

    fn spawn_worker(&self, song: Song, audio_path: PathBuf) -> std::io::Result<JoinHandle<()>> {
        let events = self.events_tx.clone();
        let transport = Arc::clone(&self.transport);
        let playback = self.config.playback.clone();
        let start_at = self.start_at;
        let theme = self.theme;
        let session = self.session;

        thread::Builder::new()
            .name("playback".to_string())
            .spawn(move || {
                let mut surface = ChannelSurface::new(events.clone());
                // The output stream is opened here: it cannot leave this thread.
                let result = audio::open_default().and_then(|mut audio| {
                    let request = PlaybackRequest {
                        song: &song,
                        audio_path: &audio_path,
                        start_at,
                        theme,
                        cycle: ColorCycle::PerChar,
                    };
                    Player::new(SystemClock::new())
                        .with_config(&playback)
                        .run(request, audio.as_mut(), &mut surface, &transport)
                });
                let result = result.map_err(|err| err.to_string());
                let _ = events.send(UiEvent::Ended(session, result));
            })
    }

    fn draw(&self, frame: &mut Frame) {
        let [header, controls, lyrics, status] = Layout::vertical([
            Constraint::Length(2),
            Constraint::Length(6),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .areas(frame.area());

        let artist = if self.artist.is_empty() { "—" } else { &self.artist };
        frame.render_widget(
            Paragraph::new(vec![
                Line::from(Span::styled(
                    self.title.clone(),
                    Style::new().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(artist.to_string(), Style::new().fg(Color::Gray))),
            ]),
            header,
        );

        frame.render_widget(
            Paragraph::new(self.control_lines()).block(Block::bordered().title(" Controls ")),
            controls,
        );

        let visible = lyrics.height.saturating_sub(2) as usize;
        let offset = self.lyrics.len().saturating_sub(visible) as u16;
        frame.render_widget(
            Paragraph::new(self.lyrics.clone())
                .style(Style::new().fg(TEXT_COLOR).add_modifier(self.font.modifier()))
                .block(Block::bordered().title(" Lyrics "))
                .scroll((offset, 0)),
            lyrics,
        );

        let mut status_text = self.status.label().to_string();
        if self.lyrics_done && self.status != Status::Ready {
            status_text.push_str("  (all lyrics shown)");
        }
        frame.render_widget(
            Paragraph::new(status_text).style(Style::new().fg(Color::DarkGray)),
            status,
        );

        if let Some(message) = &self.dialog {
            let area = centered(frame.area(), 60, 6);
            frame.render_widget(Clear, area);
            frame.render_widget(
                Paragraph::new(vec![
                    Line::from(message.clone()),
                    Line::default(),
                    Line::from("Press any key").style(Style::new().fg(Color::DarkGray)),
                ])
                .wrap(Wrap { trim: true })
                .block(
                    Block::bordered()
                        .title(" Error ")
                        .border_style(Style::new().fg(Color::Red)),
                ),
                area,
            );
        }
    }

    fn control_lines(&self) -> Vec<Line<'static>> {
        let song = match self.songs.get(self.selected) {
            Some(choice) => format!("{} ({}/{})", choice.id, self.selected + 1, self.songs.len()),
            None => "(no songs)".to_string(),
        };
        let filled = (self.volume * 10.0).round() as usize;
        let bar = format!("{}{}", "#".repeat(filled), "-".repeat(10 - filled.min(10)));

        vec![
            Line::from(format!("Song   {song:<28} Theme  {}", self.theme)),
            Line::from(format!(
                "Start  {:<28} Volume [{bar}] {:>3.0}%",
                format!("{:.0}s", self.start_at),
                self.volume * 100.0
            )),
            Line::from(format!("Font   {}", self.font.label())),
            Line::from(
                "[Enter] play  [Space] pause/resume  [Esc] stop  [↑/↓] song  [t] theme  \
                 [f] font  [+/-] volume  [ [/] ] start  [q] quit",
            )
            .style(Style::new().fg(Color::DarkGray)),
        ]
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

pub fn run(config: AppConfig) -> Result<ExitCode> {
    let mut app = App::new(config);
    let mut terminal = ratatui::try_init()?;
    let result = app.event_loop(&mut terminal);
    ratatui::restore();
    app.shutdown();
    result.map(|()| ExitCode::SUCCESS)
}
