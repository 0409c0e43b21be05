/// One unit of the lightweight markup found in explanation text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    /// Text copied through untouched.
    Text(&'a str),
    /// `**`
    BoldToggle,
    /// `` `body` ``; `closed` is false when input ended before the closing backtick.
    CodeSpan { body: &'a str, closed: bool },
    /// ```` ``` ````
    FenceToggle,
}

/// Split `text` into markup tokens in a single left-to-right pass.
///
/// At each position the longest delimiter wins: a fence, then a bold
/// marker, then a single backtick. Delimiters are recognised purely
/// lexically; a `**` inside a code span is part of the span body and a
/// backtick inside a bold run opens a span. There is no nesting.
pub fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut pos = 0;
    let mut run_start = 0;

    while pos < text.len() {
        let rest = &text[pos..];
        let matched = if rest.starts_with("```") {
            Some((Token::FenceToggle, 3))
        } else if rest.starts_with("**") {
            Some((Token::BoldToggle, 2))
        } else if let Some(after) = rest.strip_prefix('`') {
            Some(match after.find('`') {
                Some(end) => (
                    Token::CodeSpan {
                        body: &after[..end],
                        closed: true,
                    },
                    end + 2,
                ),
                None => (
                    Token::CodeSpan {
                        body: after,
                        closed: false,
                    },
                    rest.len(),
                ),
            })
        } else {
            None
        };

        match matched {
            Some((token, len)) => {
                if run_start < pos {
                    tokens.push(Token::Text(&text[run_start..pos]));
                }
                tokens.push(token);
                pos += len;
                run_start = pos;
            }
            // Markers are ASCII, so stepping a whole char keeps `pos` on a boundary.
            None => pos += rest.chars().next().map_or(1, char::len_utf8),
        }
    }

    if run_start < text.len() {
        tokens.push(Token::Text(&text[run_start..]));
    }
    tokens
}
