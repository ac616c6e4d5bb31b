//! Playback session: transport state shared across threads, and the player
//! loop that keeps audio and typed lyrics in step.

use std::path::Path;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::time::Duration;

use crate::timeline::{Clock, Control, Flow, LyricScheduler, Pacer, DEFAULT_POLL_INTERVAL};
use crate::{
    AudioBackend, ColorCycle, LyricSurface, PlaybackConfig, Result, Song, Theme, Typewriter,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PlaybackState {
    Idle = 0,
    Playing = 1,
    Paused = 2,
    Stopped = 3,
}

impl PlaybackState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => PlaybackState::Playing,
            2 => PlaybackState::Paused,
            3 => PlaybackState::Stopped,
            _ => PlaybackState::Idle,
        }
    }
}

/// Play/pause/stop state and volume, shared between the thread that takes
/// user input and the thread that plays.
///
/// Transitions follow `Idle -> Playing -> {Paused <-> Playing} -> Stopped -> Idle`.
/// Each method returns whether the transition happened.
#[derive(Debug)]
pub struct Transport {
    state: AtomicU8,
    volume: AtomicU32,
}

impl Default for Transport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(PlaybackState::Idle as u8),
            volume: AtomicU32::new(1.0_f32.to_bits()),
        }
    }

    pub fn state(&self) -> PlaybackState {
        PlaybackState::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn transition(&self, from: &[PlaybackState], to: PlaybackState) -> bool {
        self.state
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                from.contains(&PlaybackState::from_u8(current))
                    .then_some(to as u8)
            })
            .is_ok()
    }

    /// Starts a new session. Fails while another session is active.
    pub fn begin(&self) -> bool {
        self.transition(&[PlaybackState::Idle, PlaybackState::Stopped], PlaybackState::Playing)
    }

    pub fn pause(&self) -> bool {
        self.transition(&[PlaybackState::Playing], PlaybackState::Paused)
    }

    pub fn resume(&self) -> bool {
        self.transition(&[PlaybackState::Paused], PlaybackState::Playing)
    }

    /// Pauses when playing, resumes when paused.
    pub fn toggle(&self) -> bool {
        self.pause() || self.resume()
    }

    pub fn stop(&self) -> bool {
        self.transition(
            &[PlaybackState::Playing, PlaybackState::Paused],
            PlaybackState::Stopped,
        )
    }

    /// Ends the session, whatever state it was in.
    pub fn finish(&self) {
        self.state.store(PlaybackState::Idle as u8, Ordering::SeqCst);
    }

    pub fn is_active(&self) -> bool {
        matches!(
            self.state(),
            PlaybackState::Playing | PlaybackState::Paused
        )
    }

    pub fn volume(&self) -> f32 {
        f32::from_bits(self.volume.load(Ordering::SeqCst))
    }

    pub fn set_volume(&self, volume: f32) {
        let volume = if volume.is_nan() { 0.0 } else { volume.clamp(0.0, 1.0) };
        self.volume.store(volume.to_bits(), Ordering::SeqCst);
    }
}

impl Control for &Transport {
    fn poll(&mut self) -> Flow {
        match self.state() {
            PlaybackState::Paused => Flow::Hold,
            PlaybackState::Stopped => Flow::Stop,
            PlaybackState::Idle | PlaybackState::Playing => Flow::Run,
        }
    }
}

/// Gate that mirrors transport changes onto the audio backend on every poll.
struct AudioGate<'a, A: ?Sized> {
    transport: &'a Transport,
    audio: &'a mut A,
    paused: bool,
    volume: f32,
}

impl<'a, A: AudioBackend + ?Sized> AudioGate<'a, A> {
    fn new(transport: &'a Transport, audio: &'a mut A) -> Self {
        let volume = transport.volume();
        Self {
            transport,
            audio,
            paused: false,
            volume,
        }
    }
}

impl<A: AudioBackend + ?Sized> Control for AudioGate<'_, A> {
    fn poll(&mut self) -> Flow {
        let mut transport = self.transport;
        let flow = transport.poll();
        match flow {
            Flow::Hold if !self.paused => {
                self.audio.pause();
                self.paused = true;
            }
            Flow::Run if self.paused => {
                self.audio.resume();
                self.paused = false;
            }
            _ => {}
        }

        let volume = self.transport.volume();
        if volume != self.volume {
            self.audio.set_volume(volume);
            self.volume = volume;
        }
        flow
    }
}

/// Everything needed to play one song.
#[derive(Debug, Clone, Copy)]
pub struct PlaybackRequest<'a> {
    pub song: &'a Song,
    pub audio_path: &'a Path,
    pub start_at: f64,
    pub theme: Theme,
    pub cycle: ColorCycle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// Every line was shown and the audio ran out.
    Finished,
    Stopped,
}

/// Drives one playback session from audio start to completion or stop.
#[derive(Debug, Clone)]
pub struct Player<C> {
    clock: C,
    poll_interval: Duration,
    completion_poll: Duration,
}

impl<C: Clock + Clone> Player<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            poll_interval: DEFAULT_POLL_INTERVAL,
            completion_poll: Duration::from_millis(100),
        }
    }

    pub fn with_config(mut self, config: &PlaybackConfig) -> Self {
        self.poll_interval = config.poll_interval();
        self.completion_poll = config.completion_poll();
        self
    }

    /// Plays `request` to the end, or until `transport` is stopped.
    ///
    /// Blocks the calling thread. The transport is left idle afterwards.
    pub fn run<A, S>(
        &self,
        request: PlaybackRequest<'_>,
        audio: &mut A,
        surface: &mut S,
        transport: &Transport,
    ) -> Result<PlaybackOutcome>
    where
        A: AudioBackend + ?Sized,
        S: LyricSurface + ?Sized,
    {
        match transport.state() {
            PlaybackState::Idle => {
                transport.begin();
            }
            PlaybackState::Stopped => {
                transport.finish();
                return Ok(PlaybackOutcome::Stopped);
            }
            PlaybackState::Playing | PlaybackState::Paused => {}
        }

        let result = self.perform(request, audio, surface, transport);
        if !matches!(result, Ok(PlaybackOutcome::Finished)) {
            audio.stop();
        }
        transport.finish();

        match &result {
            Ok(outcome) => tracing::info!(song = %request.song.id, ?outcome, "playback ended"),
            Err(err) => tracing::warn!(song = %request.song.id, %err, "playback aborted"),
        }
        result
    }

    fn perform<A, S>(
        &self,
        request: PlaybackRequest<'_>,
        audio: &mut A,
        surface: &mut S,
        transport: &Transport,
    ) -> Result<PlaybackOutcome>
    where
        A: AudioBackend + ?Sized,
        S: LyricSurface + ?Sized,
    {
        let song = request.song;
        let start_at = request.start_at.max(0.0);
        let lines = song.lines();

        audio.load(request.audio_path)?;
        audio.set_volume(transport.volume());
        audio.play_from(start_at)?;
        tracing::info!(song = %song.id, start_at, theme = %request.theme, "playback started");

        let gate = AudioGate::new(transport, audio);
        let mut schedule = LyricScheduler::new(&lines, start_at, self.clock.clone(), gate)
            .with_poll_interval(self.poll_interval);
        let mut typewriter = Typewriter::new(request.theme, request.cycle);

        while let Some(line) = schedule.next() {
            tracing::debug!(timestamp = line.timestamp, position = schedule.position(), "line due");
            if !typewriter.type_line(&line.text, song.char_delay, surface, &mut schedule)? {
                break;
            }
            if line.delay > 0.0 && !schedule.pause_for(line.delay) {
                break;
            }
        }
        if schedule.is_stopped() {
            return Ok(PlaybackOutcome::Stopped);
        }

        surface.lyrics_finished()?;
        let completion_poll = self.completion_poll.as_secs_f64();
        while schedule.gate().audio.is_busy() {
            if !schedule.pause_for(completion_poll) {
                return Ok(PlaybackOutcome::Stopped);
            }
        }
        Ok(PlaybackOutcome::Finished)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::path::PathBuf;

    use super::*;
    use crate::timeline::ManualClock;
    use crate::{LyricEntry, LyricError, ThemeColor};

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Load(PathBuf),
        Play(f64),
        Pause,
        Resume,
        Stop,
        Volume(f32),
    }

    /// Audio double that stays busy for a fixed number of polls.
    struct FakeAudio<'t> {
        calls: Vec<Call>,
        busy_polls: Cell<usize>,
        fail_load: bool,
        resume_on_pause: Option<&'t Transport>,
    }

    impl<'t> FakeAudio<'t> {
        fn new(busy_polls: usize) -> Self {
            Self {
                calls: Vec::new(),
                busy_polls: Cell::new(busy_polls),
                fail_load: false,
                resume_on_pause: None,
            }
        }
    }

    impl AudioBackend for FakeAudio<'_> {
        fn load(&mut self, path: &Path) -> Result<()> {
            if self.fail_load {
                return Err(LyricError::AudioNotFound(path.to_path_buf()));
            }
            self.calls.push(Call::Load(path.to_path_buf()));
            Ok(())
        }

        fn play_from(&mut self, offset: f64) -> Result<()> {
            self.calls.push(Call::Play(offset));
            Ok(())
        }

        fn pause(&mut self) {
            self.calls.push(Call::Pause);
            if let Some(transport) = self.resume_on_pause {
                transport.resume();
            }
        }

        fn resume(&mut self) {
            self.calls.push(Call::Resume);
        }

        fn stop(&mut self) {
            self.calls.push(Call::Stop);
        }

        fn set_volume(&mut self, volume: f32) {
            self.calls.push(Call::Volume(volume));
        }

        fn is_busy(&self) -> bool {
            let left = self.busy_polls.get();
            if left == 0 {
                return false;
            }
            self.busy_polls.set(left - 1);
            true
        }
    }

    /// Surface that collects text and can act on the transport when a given
    /// character is typed.
    struct Screen<'t> {
        text: String,
        finished: bool,
        trigger: Option<(char, &'t Transport, fn(&Transport) -> bool)>,
    }

    impl<'t> Screen<'t> {
        fn new() -> Self {
            Self {
                text: String::new(),
                finished: false,
                trigger: None,
            }
        }
    }

    impl LyricSurface for Screen<'_> {
        fn put_char(&mut self, ch: char, _color: Option<ThemeColor>) -> Result<()> {
            self.text.push(ch);
            if let Some((on, transport, action)) = self.trigger {
                if on == ch {
                    action(transport);
                }
            }
            Ok(())
        }

        fn end_line(&mut self) -> Result<()> {
            self.text.push('\n');
            Ok(())
        }

        fn lyrics_finished(&mut self) -> Result<()> {
            self.finished = true;
            Ok(())
        }
    }

    fn song() -> Song {
        Song {
            id: "demo".to_string(),
            title: "Demo".to_string(),
            artist: String::new(),
            audio: "demo.mp3".to_string(),
            lyrics: vec![
                LyricEntry::new(0.0, "hi"),
                LyricEntry::new(0.5, "").with_delay(0.2),
                LyricEntry::new(1.0, "yo"),
            ],
            char_delay: 0.01,
            line_delay: 0.0,
        }
    }

    fn request<'a>(song: &'a Song, path: &'a Path, start_at: f64) -> PlaybackRequest<'a> {
        PlaybackRequest {
            song,
            audio_path: path,
            start_at,
            theme: Theme::Plain,
            cycle: ColorCycle::PerLine,
        }
    }

    #[test]
    fn plays_every_line_then_waits_for_audio() {
        let song = song();
        let path = PathBuf::from("demo.mp3");
        let transport = Transport::new();
        let mut audio = FakeAudio::new(3);
        let mut screen = Screen::new();
        let clock = ManualClock::new();

        let outcome = Player::new(clock.clone())
            .run(request(&song, &path, 0.0), &mut audio, &mut screen, &transport)
            .unwrap();

        assert_eq!(outcome, PlaybackOutcome::Finished);
        assert_eq!(screen.text, "hi\n\nyo\n");
        assert!(screen.finished);
        assert_eq!(
            audio.calls,
            vec![Call::Load(path.clone()), Call::Volume(1.0), Call::Play(0.0)]
        );
        assert_eq!(transport.state(), PlaybackState::Idle);
        // Last line is due at 1.0s, then typed and followed by three busy polls.
        assert!(clock.now() >= Duration::from_millis(1_300));
    }

    #[test]
    fn start_offset_seeks_audio_and_skips_earlier_lines() {
        let song = song();
        let path = PathBuf::from("demo.mp3");
        let transport = Transport::new();
        let mut audio = FakeAudio::new(0);
        let mut screen = Screen::new();

        Player::new(ManualClock::new())
            .run(request(&song, &path, 0.75), &mut audio, &mut screen, &transport)
            .unwrap();

        assert_eq!(screen.text, "yo\n");
        assert!(audio.calls.contains(&Call::Play(0.75)));
    }

    #[test]
    fn stop_interrupts_typing_and_audio() {
        let song = song();
        let path = PathBuf::from("demo.mp3");
        let transport = Transport::new();
        let mut audio = FakeAudio::new(100);
        let mut screen = Screen::new();
        screen.trigger = Some(('h', &transport, Transport::stop));

        let outcome = Player::new(ManualClock::new())
            .run(request(&song, &path, 0.0), &mut audio, &mut screen, &transport)
            .unwrap();

        assert_eq!(outcome, PlaybackOutcome::Stopped);
        assert_eq!(screen.text, "h\n");
        assert!(!screen.finished);
        assert_eq!(audio.calls.last(), Some(&Call::Stop));
        assert_eq!(transport.state(), PlaybackState::Idle);
    }

    #[test]
    fn pause_reaches_the_audio_and_resume_continues() {
        let song = song();
        let path = PathBuf::from("demo.mp3");
        let transport = Transport::new();
        let mut audio = FakeAudio::new(0);
        audio.resume_on_pause = Some(&transport);
        let mut screen = Screen::new();
        screen.trigger = Some(('y', &transport, Transport::pause));

        let outcome = Player::new(ManualClock::new())
            .run(request(&song, &path, 0.0), &mut audio, &mut screen, &transport)
            .unwrap();

        assert_eq!(outcome, PlaybackOutcome::Finished);
        assert_eq!(screen.text, "hi\n\nyo\n");
        let pause = audio.calls.iter().position(|c| *c == Call::Pause).unwrap();
        assert_eq!(audio.calls[pause + 1], Call::Resume);
    }

    #[test]
    fn volume_changes_are_applied_while_playing() {
        let song = song();
        let path = PathBuf::from("demo.mp3");
        let transport = Transport::new();
        let mut audio = FakeAudio::new(0);
        let mut screen = Screen::new();
        screen.trigger = Some(('i', &transport, |t: &Transport| {
            t.set_volume(0.25);
            true
        }));

        Player::new(ManualClock::new())
            .run(request(&song, &path, 0.0), &mut audio, &mut screen, &transport)
            .unwrap();

        assert!(audio.calls.contains(&Call::Volume(0.25)));
    }

    #[test]
    fn missing_audio_aborts_before_any_output() {
        let song = song();
        let path = PathBuf::from("missing.mp3");
        let transport = Transport::new();
        let mut audio = FakeAudio::new(0);
        audio.fail_load = true;
        let mut screen = Screen::new();

        let err = Player::new(ManualClock::new())
            .run(request(&song, &path, 0.0), &mut audio, &mut screen, &transport)
            .unwrap_err();

        assert!(matches!(err, LyricError::AudioNotFound(_)));
        assert!(screen.text.is_empty());
        assert_eq!(transport.state(), PlaybackState::Idle);
    }

    #[test]
    fn stop_before_start_plays_nothing() {
        let song = song();
        let path = PathBuf::from("demo.mp3");
        let transport = Transport::new();
        assert!(transport.begin());
        assert!(transport.stop());
        let mut audio = FakeAudio::new(0);
        let mut screen = Screen::new();

        let outcome = Player::new(ManualClock::new())
            .run(request(&song, &path, 0.0), &mut audio, &mut screen, &transport)
            .unwrap();

        assert_eq!(outcome, PlaybackOutcome::Stopped);
        assert!(audio.calls.is_empty());
    }

    #[test]
    fn transport_rejects_invalid_transitions() {
        let transport = Transport::new();
        assert!(!transport.pause());
        assert!(!transport.resume());
        assert!(!transport.stop());

        assert!(transport.begin());
        assert!(!transport.begin());
        assert!(transport.toggle());
        assert_eq!(transport.state(), PlaybackState::Paused);
        assert!(transport.toggle());
        assert_eq!(transport.state(), PlaybackState::Playing);

        assert!(transport.stop());
        assert!(!transport.pause());
        assert!(!transport.is_active());
        assert!(transport.begin());
    }

    #[test]
    fn volume_is_clamped() {
        let transport = Transport::new();
        transport.set_volume(1.5);
        assert_eq!(transport.volume(), 1.0);
        transport.set_volume(-1.0);
        assert_eq!(transport.volume(), 0.0);
    }
}
