use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::timeline::Clock;
use crate::{LyricEntry, LyricError, Result, Song};

/// Typing speed given to freshly recorded songs.
pub const RECORDED_CHAR_DELAY: f64 = 0.16;

/// Metadata for a song being timed by hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongDraft {
    pub id: String,
    pub title: String,
    pub audio: String,
}

impl SongDraft {
    /// Blank answers fall back to placeholder values.
    pub fn new(id: &str, title: &str, audio: &str) -> Self {
        fn or(value: &str, fallback: &str) -> String {
            let value = value.trim();
            if value.is_empty() {
                fallback.to_string()
            } else {
                value.to_string()
            }
        }

        Self {
            id: or(id, "song_1"),
            title: or(title, "Untitled"),
            audio: or(audio, "song.mp3"),
        }
    }
}

/// Stopwatch that collects lyric timestamps for a new catalog entry.
#[derive(Debug)]
pub struct StampRecorder<C> {
    clock: C,
    started: Option<Duration>,
    marks: Vec<(f64, String)>,
}

impl<C: Clock> StampRecorder<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            started: None,
            marks: Vec::new(),
        }
    }

    pub fn start(&mut self) {
        self.started = Some(self.clock.now());
        self.marks.clear();
    }

    pub fn is_recording(&self) -> bool {
        self.started.is_some()
    }

    /// Seconds since [`StampRecorder::start`].
    pub fn capture(&self) -> Result<f64> {
        let started = self
            .started
            .ok_or_else(|| LyricError::msg("timestamp recorder has not been started"))?;
        Ok(self.clock.now().saturating_sub(started).as_secs_f64())
    }

    /// Stores a line at a previously captured time. Blank text is kept as an
    /// empty line.
    pub fn push(&mut self, timestamp: f64, text: &str) {
        self.marks.push((timestamp, text.trim().to_string()));
    }

    pub fn len(&self) -> usize {
        self.marks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    /// Builds the catalog entry, or `None` when nothing was recorded.
    pub fn finish(&mut self, draft: SongDraft) -> Option<Song> {
        self.started = None;
        if self.marks.is_empty() {
            return None;
        }

        let mut lyrics = vec![
            LyricEntry::new(0.0, format!("🎵 {} 🎵", draft.title)),
            LyricEntry::new(2.0, ""),
        ];
        lyrics.extend(
            self.marks
                .drain(..)
                .map(|(timestamp, text)| LyricEntry::new(round_centis(timestamp), text)),
        );

        Some(Song {
            id: draft.id,
            title: draft.title,
            artist: String::new(),
            audio: draft.audio,
            lyrics,
            char_delay: RECORDED_CHAR_DELAY,
            line_delay: 0.0,
        })
    }
}

fn round_centis(seconds: f64) -> f64 {
    (seconds * 100.0).round() / 100.0
}
