use std::path::Path;

use crate::Result;

#[cfg(feature = "rodio")]
mod rodio_backend;

#[cfg(feature = "rodio")]
pub use rodio_backend::RodioAudio;

/// Narrow interface over an audio output library.
///
/// Implementations do the decoding and mixing; playback code only drives
/// the transport and asks whether anything is still playing.
pub trait AudioBackend {
    /// Opens and validates the file at `path`. Nothing plays until
    /// [`AudioBackend::play_from`] is called.
    fn load(&mut self, path: &Path) -> Result<()>;
    /// Starts the loaded track `offset` seconds in.
    fn play_from(&mut self, offset: f64) -> Result<()>;
    fn pause(&mut self);
    fn resume(&mut self);
    fn stop(&mut self);
    /// `volume` is clamped to `0.0..=1.0`.
    fn set_volume(&mut self, volume: f32);
    /// Whether a track is playing or paused with audio left to play.
    fn is_busy(&self) -> bool;
}

/// Opens the default output device with whichever backend this build carries.
pub fn open_default() -> Result<Box<dyn AudioBackend>> {
    #[cfg(feature = "rodio")]
    {
        Ok(Box::new(RodioAudio::open_default()?))
    }
    #[cfg(not(feature = "rodio"))]
    {
        Err(crate::LyricError::Audio(
            "built without an audio backend (enable the `rodio` feature)".to_string(),
        ))
    }
}
