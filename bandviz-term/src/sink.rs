//! Terminal output for rendered frames.

use crossterm::{
    cursor::{MoveToColumn, MoveUp},
    queue,
    style::Print,
    terminal::{Clear, ClearType},
};
use std::io::{self, Write};

/// How consecutive frames share the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkStyle {
    /// Overwrite the previous frame in place.
    Redraw,
    /// Print every frame below the previous one.
    Scroll,
}

/// Writes composed frames to a terminal-like writer.
pub struct TerminalSink<W: Write> {
    out: W,
    style: SinkStyle,
    lines_drawn: usize,
    rows: Option<u16>,
}

impl<W: Write> TerminalSink<W> {
    pub fn new(out: W, style: SinkStyle) -> Self {
        Self {
            out,
            style,
            lines_drawn: 0,
            rows: None,
        }
    }

    /// Sets the terminal height. A frame taller than `rows` cannot be
    /// redrawn in place, so the sink switches to scrolling when it sees one.
    pub fn with_rows(mut self, rows: u16) -> Self {
        self.rows = Some(rows);
        self
    }

    pub fn style(&self) -> SinkStyle {
        self.style
    }

    /// Writes one frame; `text` may span several `\n`-separated lines.
    pub fn write_frame(&mut self, text: &str) -> io::Result<()> {
        if self.style == SinkStyle::Redraw {
            if let Some(rows) = self.rows {
                let height = text.lines().count();
                if height > rows as usize {
                    log::warn!(
                        "Frame is {} lines but the terminal has {} rows, scrolling instead of redrawing",
                        height,
                        rows
                    );
                    if self.lines_drawn > 0 {
                        writeln!(self.out)?;
                        self.lines_drawn = 0;
                    }
                    self.style = SinkStyle::Scroll;
                }
            }
        }

        match self.style {
            SinkStyle::Scroll => writeln!(self.out, "{}", text)?,
            SinkStyle::Redraw => {
                if self.lines_drawn > 1 {
                    queue!(self.out, MoveUp((self.lines_drawn - 1) as u16))?;
                }
                let mut lines = 0;
                for (i, line) in text.lines().enumerate() {
                    if i > 0 {
                        queue!(self.out, Print("\n"))?;
                    }
                    queue!(self.out, MoveToColumn(0), Clear(ClearType::CurrentLine), Print(line))?;
                    lines += 1;
                }
                self.lines_drawn = lines;
            }
        }
        self.out.flush()
    }

    /// Leaves the cursor on a fresh line below the last frame.
    pub fn finish(&mut self) -> io::Result<()> {
        if self.style == SinkStyle::Redraw && self.lines_drawn > 0 {
            writeln!(self.out)?;
            self.lines_drawn = 0;
        }
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
