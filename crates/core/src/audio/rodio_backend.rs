use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};

use super::AudioBackend;
use crate::timeline::saturating_secs;
use crate::{LyricError, Result};

/// [`AudioBackend`] that plays through the default output device.
///
/// The output stream is not `Send`, so a `RodioAudio` must be opened on the
/// thread that drives playback.
pub struct RodioAudio {
    _stream: OutputStream,
    handle: OutputStreamHandle,
    track: Option<PathBuf>,
    sink: Option<Sink>,
    volume: f32,
}

impl RodioAudio {
    pub fn open_default() -> Result<Self> {
        let (stream, handle) = OutputStream::try_default().map_err(LyricError::audio)?;
        Ok(Self {
            _stream: stream,
            handle,
            track: None,
            sink: None,
            volume: 1.0,
        })
    }

    fn decode(path: &Path) -> Result<Decoder<BufReader<File>>> {
        let file = File::open(path)?;
        Decoder::new(BufReader::new(file)).map_err(LyricError::audio)
    }
}

impl AudioBackend for RodioAudio {
    fn load(&mut self, path: &Path) -> Result<()> {
        if !path.is_file() {
            return Err(LyricError::AudioNotFound(path.to_path_buf()));
        }
        // Decode once up front so malformed files fail before playback starts.
        Self::decode(path)?;
        self.stop();
        self.track = Some(path.to_path_buf());
        tracing::debug!(path = %path.display(), "audio loaded");
        Ok(())
    }

    fn play_from(&mut self, offset: f64) -> Result<()> {
        let track = self
            .track
            .as_deref()
            .ok_or_else(|| LyricError::Audio("no track loaded".to_string()))?;
        let source = Self::decode(track)?;

        self.stop();
        let sink = Sink::try_new(&self.handle).map_err(LyricError::audio)?;
        sink.set_volume(self.volume);
        if offset > 0.0 {
            sink.append(source.skip_duration(saturating_secs(offset)));
        } else {
            sink.append(source);
        }
        sink.play();
        self.sink = Some(sink);
        Ok(())
    }

    fn pause(&mut self) {
        if let Some(sink) = &self.sink {
            sink.pause();
        }
    }

    fn resume(&mut self) {
        if let Some(sink) = &self.sink {
            sink.play();
        }
    }

    fn stop(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        if let Some(sink) = &self.sink {
            sink.set_volume(self.volume);
        }
    }

    fn is_busy(&self) -> bool {
        self.sink.as_ref().is_some_and(|sink| !sink.empty())
    }
}

impl std::fmt::Debug for RodioAudio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RodioAudio")
            .field("track", &self.track)
            .field("volume", &self.volume)
            .finish()
    }
}
