use std::sync::mpsc::Sender;

use lyricstream_core::{LyricError, LyricSurface, PlaybackOutcome, Result, ThemeColor};

/// Messages from the playback worker to the UI thread.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    Char(char, Option<ThemeColor>),
    Newline,
    LyricsDone,
    /// The worker of session `.0` is about to exit. Errors are already
    /// rendered as text.
    Ended(u64, std::result::Result<PlaybackOutcome, String>),
}

/// [`LyricSurface`] that hands every character to the UI thread.
pub struct ChannelSurface {
    events: Sender<UiEvent>,
}

impl ChannelSurface {
    pub fn new(events: Sender<UiEvent>) -> Self {
        Self { events }
    }

    fn send(&self, event: UiEvent) -> Result<()> {
        self.events
            .send(event)
            .map_err(|_| LyricError::msg("lyric display has been closed"))
    }
}

impl LyricSurface for ChannelSurface {
    fn put_char(&mut self, ch: char, color: Option<ThemeColor>) -> Result<()> {
        self.send(UiEvent::Char(ch, color))
    }

    fn end_line(&mut self) -> Result<()> {
        self.send(UiEvent::Newline)
    }

    fn lyrics_finished(&mut self) -> Result<()> {
        self.send(UiEvent::LyricsDone)
    }
}
