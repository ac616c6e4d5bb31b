use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use lyricstream_core::{Clock, Result, Song, SongDraft, StampRecorder, SystemClock};

const RULE: &str = "============================================================";

pub fn run() -> Result<ExitCode> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match record_session(stdin.lock(), &mut out, SystemClock::new())? {
        Some(song) => {
            writeln!(out, "\n{RULE}\nSONG ENTRY - Add to the catalog\n{RULE}")?;
            writeln!(out, "{}", serde_json::to_string_pretty(&song)?)?;
            writeln!(out, "\nCopy the above JSON into the 'songs' array of the catalog.")?;
        }
        None => writeln!(out, "\nNo timestamps collected.")?,
    }
    Ok(ExitCode::SUCCESS)
}

fn prompt<I, W>(lines: &mut I, out: &mut W, question: &str) -> Result<Option<String>>
where
    I: Iterator<Item = io::Result<String>>,
    W: Write,
{
    write!(out, "{question}")?;
    out.flush()?;
    Ok(lines.next().transpose()?)
}

/// Runs the interactive timing session. Each Enter captures the current time,
/// then the next line of input is the lyric for it. End of input finishes.
fn record_session<R, W, C>(input: R, out: &mut W, clock: C) -> Result<Option<Song>>
where
    R: BufRead,
    W: Write,
    C: Clock,
{
    writeln!(out, "{RULE}\nTIMESTAMP HELPER\n{RULE}\n")?;
    writeln!(out, "Records when each lyric line starts.")?;
    writeln!(out, "  1. Start the song in any music player")?;
    writeln!(out, "  2. Press ENTER when a lyric line starts, then type it and press ENTER")?;
    writeln!(out, "  3. Press Ctrl+D when done\n")?;

    let mut lines = input.lines();
    let title =
        prompt(&mut lines, out, "Song title (e.g. 'My Song - Artist'): ")?.unwrap_or_default();
    let audio = prompt(&mut lines, out, "Audio filename (e.g. song.mp3): ")?.unwrap_or_default();
    let id =
        prompt(&mut lines, out, "Song ID for the catalog (e.g. my_song): ")?.unwrap_or_default();
    let draft = SongDraft::new(&id, &title, &audio);

    let mut recorder = StampRecorder::new(clock);
    if prompt(&mut lines, out, "\nPress ENTER when ready to start timing...")?.is_some() {
        recorder.start();
        writeln!(out, "\nTimer started. Press ENTER when each lyric line begins...")?;
        writeln!(out, "(Press Ctrl+D when finished)\n")?;

        while lines.next().transpose()?.is_some() {
            let timestamp = recorder.capture()?;
            let question = format!("[{timestamp:.2}s] Enter lyric line: ");
            let Some(text) = prompt(&mut lines, out, &question)? else {
                break;
            };
            let text = text.trim();
            recorder.push(timestamp, text);
            if text.is_empty() {
                writeln!(out, "Added empty line at {timestamp:.2}s\n")?;
            } else {
                writeln!(out, "Added: ({timestamp:.2}, \"{text}\")\n")?;
            }
        }
    }

    tracing::info!(lines = recorder.len(), id = %draft.id, "timing session finished");
    Ok(recorder.finish(draft))
}
