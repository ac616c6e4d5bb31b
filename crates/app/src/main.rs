mod play;
mod stamp;
mod tui;

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;

use clap::{Parser, Subcommand};
use lyricstream_core::{AppConfig, LyricError, Theme};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_file.as_deref(), matches!(cli.command, Commands::Tui));

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err}");
            if matches!(err, LyricError::SongNotFound(_)) {
                eprintln!("Use --list to see available songs.");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> lyricstream_core::Result<ExitCode> {
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    if let Some(catalog) = cli.catalog {
        config.catalog = catalog;
    }
    tracing::debug!(catalog = %config.catalog.display(), "configuration resolved");

    match cli.command {
        Commands::Play {
            list: true,
            ..
        } => play::list(&config),
        Commands::Play {
            song,
            start,
            theme,
            list: false,
        } => {
            let theme = theme.unwrap_or(config.playback.theme);
            play::play(&config, song.as_deref(), start, theme)
        }
        Commands::Tui => tui::run(config),
        Commands::Stamp => stamp::run(),
    }
}

/// Logs go to stderr, or to `log_file` when given. The terminal UI owns the
/// screen, so it only logs when a file is given.
fn init_tracing(log_file: Option<&Path>, interactive: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match log_file.map(File::create) {
        Some(Ok(file)) => {
            let _ = builder.with_ansi(false).with_writer(Mutex::new(file)).try_init();
        }
        Some(Err(err)) => eprintln!("warning: cannot open log file: {err}"),
        None if interactive => {}
        None => {
            let _ = builder.with_writer(std::io::stderr).try_init();
        }
    }
}

fn parse_theme(value: &str) -> Result<Theme, String> {
    Theme::parse(value).map_err(|_| {
        format!(
            "unknown theme `{value}` (expected one of: {})",
            Theme::names().join(", ")
        )
    })
}

fn parse_start(value: &str) -> Result<f64, String> {
    let seconds: f64 = value
        .parse()
        .map_err(|_| format!("`{value}` is not a number of seconds"))?;
    if seconds.is_finite() && seconds >= 0.0 {
        Ok(seconds)
    } else {
        Err("start position must be zero or more seconds".to_string())
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Synced typewriter lyrics with audio", long_about = None)]
struct Cli {
    /// JSON configuration file.
    #[arg(long, global = true, env = "LYRICSTREAM_CONFIG")]
    config: Option<PathBuf>,
    /// Song catalog to read instead of the configured one.
    #[arg(long, global = true, env = "LYRICSTREAM_CATALOG")]
    catalog: Option<PathBuf>,
    /// Write logs to this file instead of stderr.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play a song in the terminal with typewriter lyrics.
    Play {
        /// Song id from the catalog. Omitted = play the first song.
        song: Option<String>,
        /// Start position in seconds.
        #[arg(short, long, default_value_t = 0.0, value_parser = parse_start)]
        start: f64,
        /// Display theme.
        #[arg(short, long, value_parser = parse_theme)]
        theme: Option<Theme>,
        /// List available songs and exit.
        #[arg(short, long)]
        list: bool,
    },
    /// Interactive player with song, theme, font and volume controls.
    Tui,
    /// Record lyric timestamps for a new catalog entry.
    Stamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_play_arguments() {
        let cli = Cli::try_parse_from([
            "lyricstream", "play", "demo", "--start", "12.5", "--theme", "warm",
        ])
        .unwrap();

        match cli.command {
            Commands::Play {
                song,
                start,
                theme,
                list,
            } => {
                assert_eq!(song.as_deref(), Some("demo"));
                assert_eq!(start, 12.5);
                assert_eq!(theme, Some(Theme::Warm));
                assert!(!list);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn play_defaults_and_short_flags() {
        let cli = Cli::try_parse_from(["lyricstream", "play", "-l"]).unwrap();
        match cli.command {
            Commands::Play {
                song,
                start,
                theme,
                list,
            } => {
                assert!(song.is_none());
                assert_eq!(start, 0.0);
                assert!(theme.is_none());
                assert!(list);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rejects_bad_theme_and_negative_start() {
        assert!(Cli::try_parse_from(["lyricstream", "play", "--theme", "neon"]).is_err());
        assert!(Cli::try_parse_from(["lyricstream", "play", "--start", "-3"]).is_err());
    }

    #[test]
    fn catalog_flag_is_global() {
        let cli = Cli::try_parse_from(["lyricstream", "tui", "--catalog", "other.json"]).unwrap();
        assert_eq!(cli.catalog, Some(PathBuf::from("other.json")));
    }
}
