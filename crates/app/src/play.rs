use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;

use lyricstream_core::{
    audio, AppConfig, Catalog, ColorCycle, LyricError, PlaybackOutcome, PlaybackRequest, Player,
    Result, SystemClock, TerminalSurface, Theme, Transport,
};

/// Prints `  id: title` for every catalog song.
pub fn list(config: &AppConfig) -> Result<ExitCode> {
    let stdout = io::stdout();
    if write_listing(&mut stdout.lock(), config)? {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

/// Returns `false` when the catalog has no songs.
fn write_listing<W: Write>(out: &mut W, config: &AppConfig) -> Result<bool> {
    let catalog = Catalog::load(&config.catalog)?;
    if catalog.is_empty() {
        writeln!(
            out,
            "No songs found. Add songs to {}",
            catalog.path().display()
        )?;
        return Ok(false);
    }

    writeln!(out, "Available songs:")?;
    for (id, title) in catalog.list() {
        writeln!(out, "  {id}: {title}")?;
    }
    Ok(true)
}

/// A transport already in the playing state, so Ctrl+C counts from the
/// moment the handler is installed, before the audio device is open.
fn armed_transport(volume: f32) -> Arc<Transport> {
    let transport = Arc::new(Transport::new());
    transport.set_volume(volume);
    transport.begin();
    transport
}

/// Plays one song on the main thread until it finishes or Ctrl+C is pressed.
pub fn play(
    config: &AppConfig,
    song_id: Option<&str>,
    start_at: f64,
    theme: Theme,
) -> Result<ExitCode> {
    let catalog = Catalog::load(&config.catalog)?;
    if catalog.is_empty() {
        return Err(LyricError::EmptyCatalog);
    }
    let song = catalog.select(song_id)?;
    let audio_path = catalog.resolve_audio(song)?;

    let transport = armed_transport(config.playback.volume);
    let interrupt = Arc::clone(&transport);
    ctrlc::set_handler(move || {
        interrupt.stop();
    })
    .map_err(|err| LyricError::msg(format!("cannot install Ctrl+C handler: {err}")))?;

    let mut audio = audio::open_default()?;
    let stdout = io::stdout();
    let mut surface = TerminalSurface::new(stdout.lock());
    surface.clear()?;
    surface.banner(&format!("Playing: {}", song.display_title()))?;
    surface.line("")?;

    let request = PlaybackRequest {
        song,
        audio_path: &audio_path,
        start_at,
        theme,
        cycle: ColorCycle::PerLine,
    };
    let outcome = Player::new(SystemClock::new())
        .with_config(&config.playback)
        .run(request, audio.as_mut(), &mut surface, &transport)?;

    match outcome {
        PlaybackOutcome::Finished => surface.line("\n🎉 Song finished! 🎉")?,
        PlaybackOutcome::Stopped => surface.line("\n\nStopped by user")?,
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_for(dir: &std::path::Path, json: &str) -> AppConfig {
        let catalog = dir.join("songs.json");
        std::fs::write(&catalog, json).unwrap();
        AppConfig {
            catalog,
            ..AppConfig::default()
        }
    }

    #[test]
    fn lists_ids_with_titles() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_for(
            dir.path(),
            r#"{ "songs": [ { "id": "a", "title": "Alpha", "audio": "a.mp3" }, { "id": "b", "audio": "b.mp3" } ] }"#,
        );

        let mut out = Vec::new();
        assert!(write_listing(&mut out, &config).unwrap());
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Available songs:\n  a: Alpha\n  b: b\n"
        );
    }

    #[test]
    fn listing_an_empty_catalog_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_for(dir.path(), r#"{ "songs": [] }"#);

        let mut out = Vec::new();
        assert!(!write_listing(&mut out, &config).unwrap());
        assert!(String::from_utf8(out).unwrap().starts_with("No songs found."));
    }

    #[test]
    fn interrupt_before_playback_starts_is_honoured() {
        let transport = armed_transport(0.4);
        assert!(transport.stop());
        assert_eq!(transport.state(), lyricstream_core::PlaybackState::Stopped);
        assert!((transport.volume() - 0.4).abs() < 1e-6);
    }

    #[test]
    fn missing_catalog_song_and_audio_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = AppConfig {
            catalog: dir.path().join("absent.json"),
            ..AppConfig::default()
        };
        assert!(matches!(
            play(&missing, None, 0.0, Theme::Plain),
            Err(LyricError::CatalogNotFound(_))
        ));

        let config = config_for(dir.path(), r#"{ "songs": [ { "id": "a", "audio": "a.mp3" } ] }"#);
        assert!(matches!(
            play(&config, Some("zzz"), 0.0, Theme::Plain),
            Err(LyricError::SongNotFound(_))
        ));
        assert!(matches!(
            play(&config, None, 0.0, Theme::Plain),
            Err(LyricError::AudioNotFound(_))
        ));
    }
}
