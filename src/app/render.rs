// src/app/render.rs

//! Line-oriented terminal renderer.
//!
//! Output lines go to the writer as they arrive; stderr lines are marked.
//! Final banners are styled by [`Tone`]: success green, failures red,
//! timeouts yellow, cancellation neutral.

use std::io::Write;

use owo_colors::OwoColorize;

use crate::app::core::{MenuItem, RenderOp};
use crate::exec::{Outcome, StreamSource};

/// Presentation class of a message or outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Success,
    Error,
    Warning,
    Neutral,
}

impl Tone {
    pub fn of(outcome: &Outcome) -> Self {
        match outcome {
            Outcome::Succeeded { .. } => Tone::Success,
            Outcome::FailedWithExitCode { .. } | Outcome::LaunchError { .. } => Tone::Error,
            Outcome::TimedOut { .. } => Tone::Warning,
            Outcome::Cancelled => Tone::Neutral,
        }
    }
}

/// Writes [`RenderOp`]s to a terminal (or any writer).
pub struct Renderer<W: Write> {
    out: W,
    color: bool,
}

impl<W: Write> Renderer<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self { out, color }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn render(&mut self, op: &RenderOp) -> std::io::Result<()> {
        match op {
            RenderOp::Menu(items) => self.menu(items)?,
            RenderOp::Started { label, command } => {
                let header = format!("==> {label}");
                let header = self.emphasize(&header);
                writeln!(self.out, "{header}")?;
                let command = format!("    $ {command}");
                let command = self.faint(&command);
                writeln!(self.out, "{command}")?;
            }
            RenderOp::Line(line) => match line.source {
                StreamSource::Stdout => writeln!(self.out, "  {}", line.text)?,
                StreamSource::Stderr => {
                    let marker = self.paint("!", Tone::Error);
                    writeln!(self.out, "{marker} {}", line.text)?;
                }
            },
            RenderOp::Finished { label, outcome } => {
                let tone = Tone::of(outcome);
                let symbol = match tone {
                    Tone::Success => "✔",
                    Tone::Error => "✘",
                    Tone::Warning => "⏱",
                    Tone::Neutral => "■",
                };
                let banner = format!("{symbol} {label}: {outcome}");
                let banner = self.paint(&banner, tone);
                writeln!(self.out, "{banner}")?;
                if matches!(outcome, Outcome::TimedOut { .. }) {
                    writeln!(self.out, "  retry with a longer --timeout if the script needs more time")?;
                }
            }
            RenderOp::Notice { tone, text } => {
                let text = self.paint(text, *tone);
                writeln!(self.out, "{text}")?;
            }
        }
        self.out.flush()
    }

    fn menu(&mut self, items: &[MenuItem]) -> std::io::Result<()> {
        if items.is_empty() {
            writeln!(self.out, "No catalog entries available.")?;
            return Ok(());
        }
        let title = self.emphasize("Available entries:");
        writeln!(self.out, "{title}")?;
        for item in items {
            write!(self.out, "  {:>2}) {} [{}]", item.index, item.label, item.name)?;
            if let Some(desc) = &item.description {
                let desc = format!(" - {desc}");
                let desc = self.faint(&desc);
                write!(self.out, "{desc}")?;
            }
            writeln!(self.out)?;
        }
        writeln!(self.out, "Select a number or name, 'q' to quit.")
    }

    fn paint(&self, text: &str, tone: Tone) -> String {
        if !self.color {
            return text.to_string();
        }
        match tone {
            Tone::Success => text.green().to_string(),
            Tone::Error => text.red().to_string(),
            Tone::Warning => text.yellow().to_string(),
            Tone::Neutral => text.to_string(),
        }
    }

    fn emphasize(&self, text: &str) -> String {
        if self.color {
            text.bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn faint(&self, text: &str) -> String {
        if self.color {
            text.dimmed().to_string()
        } else {
            text.to_string()
        }
    }
}
