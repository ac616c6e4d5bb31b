use std::io::Write;

use crossterm::{
    cursor::MoveTo,
    queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};
use serde::{Deserialize, Serialize};
use strum::{EnumIter, IntoEnumIterator};

use crate::{timeline::Pacer, LyricError, Result};

/// Named palettes applied while typing lyrics.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    EnumIter,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Theme {
    #[default]
    Plain,
    Colorful,
    Warm,
    Cool,
}

impl Theme {
    pub fn palette(self) -> &'static [ThemeColor] {
        use ThemeColor::*;
        match self {
            Theme::Plain => &[],
            Theme::Colorful => &[Cyan, Green, Yellow, Magenta, Blue],
            Theme::Warm => &[Yellow, Red, Magenta],
            Theme::Cool => &[Cyan, Blue],
        }
    }

    pub fn names() -> Vec<&'static str> {
        Theme::iter().map(Into::into).collect()
    }

    pub fn parse(name: &str) -> Result<Self> {
        name.parse()
            .map_err(|_| LyricError::UnknownTheme(name.to_string()))
    }

    /// The theme after this one, wrapping around.
    pub fn next(self) -> Self {
        let all: Vec<Theme> = Theme::iter().collect();
        let index = all.iter().position(|theme| *theme == self).unwrap_or(0);
        all[(index + 1) % all.len()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeColor {
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
}

impl ThemeColor {
    /// Bright ANSI color used on plain terminals.
    pub fn terminal(self) -> Color {
        match self {
            ThemeColor::Red => Color::Red,
            ThemeColor::Green => Color::Green,
            ThemeColor::Yellow => Color::Yellow,
            ThemeColor::Blue => Color::Blue,
            ThemeColor::Magenta => Color::Magenta,
            ThemeColor::Cyan => Color::Cyan,
            ThemeColor::White => Color::White,
        }
    }

    /// True-color value used by the interactive view.
    pub fn rgb(self) -> (u8, u8, u8) {
        match self {
            ThemeColor::Red => (0xff, 0x6b, 0x6b),
            ThemeColor::Green => (0x51, 0xcf, 0x66),
            ThemeColor::Yellow => (0xfc, 0xc4, 0x19),
            ThemeColor::Blue => (0x33, 0x9a, 0xf0),
            ThemeColor::Magenta => (0xcc, 0x5d, 0xe8),
            ThemeColor::Cyan => (0x22, 0xb8, 0xcf),
            ThemeColor::White => (0xf8, 0xf9, 0xfa),
        }
    }
}

/// How the palette advances while a line is typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorCycle {
    /// Every character of a line shares one color.
    PerLine,
    /// Each character takes the next color, offset by the line index.
    PerChar,
}

/// Display target for typed lyrics.
pub trait LyricSurface {
    fn put_char(&mut self, ch: char, color: Option<ThemeColor>) -> Result<()>;
    fn end_line(&mut self) -> Result<()>;
    /// Called once every line has been emitted, before waiting for the audio.
    fn lyrics_finished(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Emits lines character by character, carrying the color cycle across lines.
#[derive(Debug, Clone)]
pub struct Typewriter {
    theme: Theme,
    cycle: ColorCycle,
    color_index: usize,
}

impl Typewriter {
    pub fn new(theme: Theme, cycle: ColorCycle) -> Self {
        Self {
            theme,
            cycle,
            color_index: 0,
        }
    }

    /// Continues a cycle that an earlier typewriter left at `index`.
    pub fn with_color_index(mut self, index: usize) -> Self {
        self.color_index = index;
        self
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn color_index(&self) -> usize {
        self.color_index
    }

    fn color_for(&self, char_index: usize) -> Option<ThemeColor> {
        let palette = self.theme.palette();
        if palette.is_empty() {
            return None;
        }
        let slot = match self.cycle {
            ColorCycle::PerLine => self.color_index,
            ColorCycle::PerChar => self.color_index + char_index,
        };
        Some(palette[slot % palette.len()])
    }

    /// Types `text` with `char_delay` seconds after each character.
    ///
    /// Blank lines only break the line and leave the cycle untouched. Returns
    /// `Ok(false)` when the pacer reports a stop part-way through.
    pub fn type_line<S, P>(
        &mut self,
        text: &str,
        char_delay: f64,
        surface: &mut S,
        pacer: &mut P,
    ) -> Result<bool>
    where
        S: LyricSurface + ?Sized,
        P: Pacer + ?Sized,
    {
        if text.trim().is_empty() {
            surface.end_line()?;
            return Ok(true);
        }

        for (index, ch) in text.chars().enumerate() {
            if !pacer.checkpoint() {
                surface.end_line()?;
                return Ok(false);
            }
            surface.put_char(ch, self.color_for(index))?;
            if !pacer.pause_for(char_delay) {
                surface.end_line()?;
                return Ok(false);
            }
        }
        surface.end_line()?;

        if !self.theme.palette().is_empty() {
            self.color_index += 1;
        }
        Ok(true)
    }
}

/// ANSI terminal output, flushed after every character.
pub struct TerminalSurface<W: Write> {
    out: W,
}

const RULE_WIDTH: usize = 50;

impl<W: Write> TerminalSurface<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn clear(&mut self) -> Result<()> {
        queue!(self.out, Clear(ClearType::All), MoveTo(0, 0))?;
        self.out.flush()?;
        Ok(())
    }

    /// Writes `text` framed by horizontal rules.
    pub fn banner(&mut self, text: &str) -> Result<()> {
        let rule = "=".repeat(RULE_WIDTH);
        writeln!(self.out, "{rule}")?;
        writeln!(self.out, "{text}")?;
        writeln!(self.out, "{rule}")?;
        self.out.flush()?;
        Ok(())
    }

    pub fn line(&mut self, text: &str) -> Result<()> {
        writeln!(self.out, "{text}")?;
        self.out.flush()?;
        Ok(())
    }
}

impl<W: Write> LyricSurface for TerminalSurface<W> {
    fn put_char(&mut self, ch: char, color: Option<ThemeColor>) -> Result<()> {
        match color {
            Some(color) => queue!(
                self.out,
                SetForegroundColor(color.terminal()),
                Print(ch),
                ResetColor
            )?,
            None => queue!(self.out, Print(ch))?,
        }
        self.out.flush()?;
        Ok(())
    }

    fn end_line(&mut self) -> Result<()> {
        writeln!(self.out)?;
        self.out.flush()?;
        Ok(())
    }

    fn lyrics_finished(&mut self) -> Result<()> {
        writeln!(self.out)?;
        self.banner("Song playing... (Press Ctrl+C to stop)")
    }
}
