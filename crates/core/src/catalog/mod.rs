//! Song catalog backed by a flat JSON file.
//!
//! The file holds a single object with a `songs` array. Every lookup helper
//! works on a freshly loaded [`Catalog`]; nothing is ever written back.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{LyricError, Result};

pub const DEFAULT_CATALOG_FILE: &str = "songs.json";
pub const DEFAULT_CHAR_DELAY: f64 = 0.03;
pub const DEFAULT_LINE_DELAY: f64 = 0.0;

fn default_char_delay() -> f64 {
    DEFAULT_CHAR_DELAY
}

fn default_line_delay() -> f64 {
    DEFAULT_LINE_DELAY
}

/// One song record as stored in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: String,
    /// Audio filename, relative to the catalog's directory.
    pub audio: String,
    #[serde(default)]
    pub lyrics: Vec<LyricEntry>,
    #[serde(default = "default_char_delay")]
    pub char_delay: f64,
    #[serde(default = "default_line_delay")]
    pub line_delay: f64,
}

impl Song {
    /// Title to show to the user; songs without one fall back to their id.
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            &self.id
        } else {
            &self.title
        }
    }

    /// Resolves every entry against the song-level line delay.
    pub fn lines(&self) -> Vec<LyricLine> {
        self.lyrics
            .iter()
            .map(|entry| entry.resolve(self.line_delay))
            .collect()
    }
}

/// Raw lyric entry: `[timestamp, text]` or `[timestamp, text, delay]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawEntry", into = "RawEntry")]
pub struct LyricEntry {
    pub timestamp: f64,
    pub text: String,
    /// Per-line override of the song's `line_delay`.
    pub delay: Option<f64>,
}

impl LyricEntry {
    pub fn new(timestamp: f64, text: impl Into<String>) -> Self {
        Self {
            timestamp,
            text: text.into(),
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: f64) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn resolve(&self, default_delay: f64) -> LyricLine {
        LyricLine {
            timestamp: self.timestamp,
            text: self.text.clone(),
            delay: self.delay.unwrap_or(default_delay),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Delayed(f64, String, f64),
    Plain(f64, String),
}

impl From<RawEntry> for LyricEntry {
    fn from(raw: RawEntry) -> Self {
        match raw {
            RawEntry::Delayed(timestamp, text, delay) => Self {
                timestamp,
                text,
                delay: Some(delay),
            },
            RawEntry::Plain(timestamp, text) => Self {
                timestamp,
                text,
                delay: None,
            },
        }
    }
}

impl From<LyricEntry> for RawEntry {
    fn from(entry: LyricEntry) -> Self {
        match entry.delay {
            Some(delay) => RawEntry::Delayed(entry.timestamp, entry.text, delay),
            None => RawEntry::Plain(entry.timestamp, entry.text),
        }
    }
}

/// A lyric entry with its delay resolved, ready for scheduling.
#[derive(Debug, Clone, PartialEq)]
pub struct LyricLine {
    pub timestamp: f64,
    pub text: String,
    /// Pause after the line has been typed, before the next wait begins.
    pub delay: f64,
}

impl LyricLine {
    pub fn new(timestamp: f64, text: impl Into<String>, delay: f64) -> Self {
        Self {
            timestamp,
            text: text.into(),
            delay,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    songs: Vec<Song>,
}

/// Songs loaded from one catalog file.
#[derive(Debug, Clone)]
pub struct Catalog {
    path: PathBuf,
    songs: Vec<Song>,
}

impl Catalog {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(LyricError::CatalogNotFound(path.to_path_buf()));
        }

        let raw = std::fs::read_to_string(path)?;
        let file: CatalogFile = serde_json::from_str(&raw)?;
        let catalog = Self {
            path: path.to_path_buf(),
            songs: file.songs,
        };
        catalog.audit();
        tracing::debug!(path = %path.display(), songs = catalog.songs.len(), "loaded catalog");
        Ok(catalog)
    }

    /// Logs records that break the catalog's assumed invariants.
    fn audit(&self) {
        for anomaly in self.anomalies() {
            match anomaly {
                Anomaly::DuplicateId(id) => {
                    tracing::warn!(%id, "duplicate song id; the first entry wins")
                }
                Anomaly::UnsortedLyrics(id) => {
                    tracing::warn!(%id, "lyrics are not in ascending timestamp order")
                }
            }
        }
    }

    fn anomalies(&self) -> Vec<Anomaly<'_>> {
        let mut seen = HashSet::new();
        let mut found = Vec::new();
        for song in &self.songs {
            if !seen.insert(song.id.as_str()) {
                found.push(Anomaly::DuplicateId(&song.id));
            }
            let ordered = song
                .lyrics
                .windows(2)
                .all(|pair| pair[0].timestamp <= pair[1].timestamp);
            if !ordered {
                found.push(Anomaly::UnsortedLyrics(&song.id));
            }
        }
        found
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    pub fn get(&self, id: &str) -> Result<&Song> {
        self.songs
            .iter()
            .find(|song| song.id == id)
            .ok_or_else(|| LyricError::SongNotFound(id.to_string()))
    }

    pub fn first(&self) -> Result<&Song> {
        self.songs.first().ok_or(LyricError::EmptyCatalog)
    }

    /// Looks up `id`, or the first song when no id is given.
    pub fn select(&self, id: Option<&str>) -> Result<&Song> {
        match id {
            Some(id) => self.get(id),
            None => self.first(),
        }
    }

    /// `(id, title)` pairs in catalog order.
    pub fn list(&self) -> Vec<(&str, &str)> {
        self.songs
            .iter()
            .map(|song| (song.id.as_str(), song.display_title()))
            .collect()
    }

    /// Directory that song audio filenames are relative to.
    pub fn base_dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    pub fn audio_path(&self, song: &Song) -> PathBuf {
        self.base_dir().join(&song.audio)
    }

    /// Like [`Catalog::audio_path`], but fails when the file does not exist.
    pub fn resolve_audio(&self, song: &Song) -> Result<PathBuf> {
        let path = self.audio_path(song);
        if path.is_file() {
            Ok(path)
        } else {
            Err(LyricError::AudioNotFound(path))
        }
    }
}

/// Catalog content that loads but is probably a mistake.
#[derive(Debug, PartialEq, Eq)]
enum Anomaly<'a> {
    DuplicateId(&'a str),
    UnsortedLyrics(&'a str),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_catalog(dir: &Path, json: &str) -> PathBuf {
        let path = dir.join("songs.json");
        std::fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn applies_documented_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_catalog(
            dir.path(),
            r#"{ "songs": [ { "id": "a", "title": "A", "audio": "a.mp3", "lyrics": [[0, "x"]] } ] }"#,
        );

        let catalog = Catalog::load(&path).unwrap();
        let song = catalog.get("a").unwrap();
        assert_eq!(song.char_delay, 0.03);
        assert_eq!(song.line_delay, 0.0);
        assert_eq!(song.artist, "");
    }

    #[test]
    fn parses_both_entry_shapes() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_catalog(
            dir.path(),
            r#"{ "songs": [ { "id": "a", "audio": "a.mp3", "line_delay": 0.4,
                 "lyrics": [[0, "first"], [1.5, "second", 2], [3, ""]] } ] }"#,
        );

        let catalog = Catalog::load(&path).unwrap();
        let lines = catalog.get("a").unwrap().lines();
        assert_eq!(
            lines,
            vec![
                LyricLine::new(0.0, "first", 0.4),
                LyricLine::new(1.5, "second", 2.0),
                LyricLine::new(3.0, "", 0.4),
            ]
        );
        assert!(lines[2].is_blank());
    }

    #[test]
    fn entries_serialize_back_to_arrays() {
        let entries = vec![LyricEntry::new(0.0, "a"), LyricEntry::new(1.0, "b").with_delay(0.5)];
        let json = serde_json::to_string(&entries).unwrap();
        assert_eq!(json, r#"[[0.0,"a"],[1.0,"b",0.5]]"#);
    }

    #[test]
    fn duplicate_ids_resolve_to_the_first_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_catalog(
            dir.path(),
            r#"{ "songs": [
                { "id": "dup", "title": "Original", "audio": "a.mp3",
                  "lyrics": [[2, "b"], [1, "a"]] },
                { "id": "dup", "title": "Copy", "audio": "b.mp3" }
            ] }"#,
        );

        let catalog = Catalog::load(&path).unwrap();
        assert_eq!(catalog.get("dup").unwrap().title, "Original");
        assert_eq!(
            catalog.anomalies(),
            vec![Anomaly::UnsortedLyrics("dup"), Anomaly::DuplicateId("dup")]
        );
    }

    #[test]
    fn lookups_and_listing() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_catalog(
            dir.path(),
            r#"{ "songs": [
                { "id": "one", "title": "Song One", "audio": "one.mp3" },
                { "id": "two", "audio": "two.mp3" }
            ] }"#,
        );

        let catalog = Catalog::load(&path).unwrap();
        assert_eq!(catalog.list(), vec![("one", "Song One"), ("two", "two")]);
        assert!(catalog.anomalies().is_empty());
        assert_eq!(catalog.select(None).unwrap().id, "one");
        assert_eq!(catalog.select(Some("two")).unwrap().id, "two");
        assert!(matches!(
            catalog.get("three"),
            Err(LyricError::SongNotFound(id)) if id == "three"
        ));
    }

    #[test]
    fn missing_file_and_empty_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(matches!(
            Catalog::load(&missing),
            Err(LyricError::CatalogNotFound(_))
        ));

        let path = write_catalog(dir.path(), "{}");
        let catalog = Catalog::load(&path).unwrap();
        assert!(catalog.is_empty());
        assert!(matches!(catalog.first(), Err(LyricError::EmptyCatalog)));
    }

    #[test]
    fn audio_resolves_next_to_the_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_catalog(
            dir.path(),
            r#"{ "songs": [ { "id": "a", "audio": "a.mp3" }, { "id": "b", "audio": "b.mp3" } ] }"#,
        );
        std::fs::write(dir.path().join("a.mp3"), b"").unwrap();

        let catalog = Catalog::load(&path).unwrap();
        let a = catalog.get("a").unwrap();
        assert_eq!(catalog.resolve_audio(a).unwrap(), dir.path().join("a.mp3"));

        let b = catalog.get("b").unwrap();
        assert!(matches!(
            catalog.resolve_audio(b),
            Err(LyricError::AudioNotFound(p)) if p == dir.path().join("b.mp3")
        ));
    }

    #[test]
    fn bare_filename_resolves_against_current_dir() {
        let catalog = Catalog {
            path: PathBuf::from("songs.json"),
            songs: Vec::new(),
        };
        assert_eq!(catalog.base_dir(), Path::new("."));
    }
}
