pub mod types;

pub use types::{RunReport, SummaryEntry};

use colored::Colorize;
use std::io::{self, Write};

use crate::pr::PullRequest;
use crate::render::Palette;
use crate::ticket::Ticket;

const SEPARATOR_WIDTH: usize = 80;

/// Writes per-item output and the closing summary to a terminal (or any sink).
///
/// Layout for one explained item:
///
/// PR: TT-42 Fix cart totals | https://.../pullrequests/42
/// Jira Ticket: TT-42 - Cart total goes negative
///
/// <rendered explanation>
///
/// --------------------------------------------------------------------------------
pub struct Printer<W: Write> {
    out: W,
    reset: String,
}

impl<W: Write> Printer<W> {
    pub fn new(out: W, palette: &Palette) -> Self {
        Self {
            out,
            reset: palette.reset.clone(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn banner(&mut self, pr: &PullRequest, ticket: &Ticket) -> io::Result<()> {
        writeln!(self.out, "{}", format!("PR: {} | {}", pr.title, pr.url).on_green())?;
        writeln!(
            self.out,
            "{}\n",
            format!("Jira Ticket: {}", ticket.label()).on_green()
        )
    }

    pub fn explanation(&mut self, rendered: &str) -> io::Result<()> {
        writeln!(self.out, "{}", rendered)?;
        self.separator()
    }

    /// Echo the diff exactly as fetched; the separator starts on its own line.
    pub fn raw_diff(&mut self, diff: &str) -> io::Result<()> {
        self.out.write_all(diff.as_bytes())?;
        self.separator()
    }

    pub fn inspection(&mut self, listing: &str) -> io::Result<()> {
        write!(self.out, "{}", listing)?;
        self.separator()
    }

    /// Markdown-style bullet list of ticket and PR links.
    pub fn summary(&mut self, entries: &[SummaryEntry]) -> io::Result<()> {
        writeln!(self.out, "{}\n", "### List of Explained Tickets:".magenta())?;
        for entry in entries {
            writeln!(
                self.out,
                "- [{}]({}) | PR: [{}]({})",
                entry.ticket, entry.ticket_url, entry.pr_id, entry.pr_url
            )?;
        }
        self.out.flush()
    }

    // Leading reset closes any span an unbalanced explanation left open.
    fn separator(&mut self) -> io::Result<()> {
        writeln!(self.out, "{}\n{}\n", self.reset, "-".repeat(SEPARATOR_WIDTH))
    }
}
