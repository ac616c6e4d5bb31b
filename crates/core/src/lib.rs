//! Core library for LyricStream.
//!
//! Plays a song through an [`AudioBackend`] while lyric lines from the JSON
//! [`Catalog`] are typed out one character at a time, in step with the song
//! position. Each module owns one part of that pipeline: the catalog, the
//! scheduler that decides when a line is due, the typewriter that renders
//! it, and the player that ties them to a shared [`Transport`].

pub mod audio;
pub mod catalog;
pub mod config;
pub mod error;
pub mod playback;
pub mod record;
pub mod render;
pub mod timeline;

pub use audio::AudioBackend;
#[cfg(feature = "rodio")]
pub use audio::RodioAudio;
pub use catalog::{Catalog, LyricEntry, LyricLine, Song};
pub use config::{AppConfig, PlaybackConfig};
pub use error::{LyricError, Result};
pub use playback::{PlaybackOutcome, PlaybackRequest, PlaybackState, Player, Transport};
pub use record::{SongDraft, StampRecorder};
pub use render::{ColorCycle, LyricSurface, TerminalSurface, Theme, ThemeColor, Typewriter};
pub use timeline::{
    Clock, Control, Flow, LyricScheduler, ManualClock, Pacer, PlaybackClock, StopWhen,
    SystemClock, Unstoppable, saturating_secs,
};
