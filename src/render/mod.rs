pub mod markup;

use colored::Color;

use markup::Token;

/// Section titles the explanation prompt asks for; each is turned into a
/// highlighted heading wherever it appears.
pub const SECTION_TITLES: [&str; 5] = [
    "Code Changes Explained:",
    "Why These Changes Might Have Been Necessary:",
    "Conclusion:",
    "Relevant Documentation, Links, and References:",
    "Possible Improvements:",
];

const RESET: &str = "\x1b[0m";

/// Escape sequences used by the renderer.
/// Passed in explicitly so output never depends on terminal-global state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    pub heading: String,
    pub bold: String,
    pub code: String,
    pub reset: String,
}

impl Palette {
    /// Cyan heading background, cyan bold text, green code.
    pub fn ansi() -> Self {
        Self {
            heading: format!("\x1b[{}m", Color::Cyan.to_bg_str()),
            bold: format!("\x1b[{}m", Color::Cyan.to_fg_str()),
            code: format!("\x1b[{}m", Color::Green.to_fg_str()),
            reset: RESET.to_string(),
        }
    }

    /// No escapes at all, for --no-color or when stdout is not a terminal.
    pub fn plain() -> Self {
        Self {
            heading: String::new(),
            bold: String::new(),
            code: String::new(),
            reset: String::new(),
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::ansi()
    }
}

/// Turns explanation text into terminal-styled text.
#[derive(Debug, Clone, Default)]
pub struct MarkupRenderer {
    palette: Palette,
}

#[derive(Default)]
struct ScanState {
    bold: bool,
    fence: bool,
}

impl MarkupRenderer {
    pub fn new(palette: Palette) -> Self {
        Self { palette }
    }

    /// Render `text`:
    /// - `###` heading markers are dropped
    /// - section titles become highlighted headings followed by a newline
    /// - `**bold**` spans are coloured and lose their asterisks
    /// - `` `code` `` spans are coloured and keep their backticks
    /// - ```` ``` ```` fences are coloured and lose their backticks
    ///
    /// Unbalanced delimiters are tolerated: the open span simply never
    /// gets its closing escape.
    pub fn render(&self, text: &str) -> String {
        let text = self.highlight_titles(&text.replace("###", ""));
        let p = &self.palette;
        let mut out = String::with_capacity(text.len() + text.len() / 4);
        let mut state = ScanState::default();

        for token in markup::tokenize(&text) {
            match token {
                Token::Text(run) => out.push_str(run),
                Token::BoldToggle => {
                    state.bold = !state.bold;
                    out.push_str(if state.bold { p.bold.as_str() } else { p.reset.as_str() });
                }
                Token::FenceToggle => {
                    state.fence = !state.fence;
                    if state.fence {
                        out.push('\n');
                        out.push_str(&p.code);
                    } else {
                        out.push_str(&p.reset);
                        out.push('\n');
                    }
                }
                Token::CodeSpan { body, closed } => {
                    out.push_str(&p.code);
                    out.push('`');
                    for ch in body.chars() {
                        out.push_str(&p.code);
                        out.push(ch);
                    }
                    // An unclosed span keeps its colour to end of input; no
                    // closing backtick or reset is invented for it.
                    if closed {
                        out.push_str(&p.code);
                        out.push('`');
                        out.push_str(&p.reset);
                    }
                }
            }
        }
        out
    }

    fn highlight_titles(&self, text: &str) -> String {
        let p = &self.palette;
        SECTION_TITLES.iter().fold(text.to_string(), |acc, title| {
            acc.replace(*title, &format!("{} {}{}\n", p.heading, title, p.reset))
        })
    }
}
