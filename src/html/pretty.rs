//! Deterministic HTML formatter.
//!
//! Re-emits a serialized document one token per line with canonical
//! indentation. Output always uses `\n` line endings and ends with a newline.
//!
//! | Token | Effect |
//! |-------|--------|
//! | comment, doctype | emitted at the current level, trailing whitespace trimmed |
//! | raw block (`script`, `style`, `pre`, `textarea`) | start line at the current level, body at level + 1, end line at the current level |
//! | end tag | level decremented (never below zero), then emitted |
//! | void or self-closing tag | emitted, level unchanged |
//! | start tag | emitted, level incremented |
//! | text | one line per non-blank source line, trimmed |
//!
//! A raw block's body keeps its relative indentation: the common leading
//! whitespace of its lines is replaced by the block's own indent. That makes
//! formatting a fixed point, `format(format(x)) == format(x)`.

use super::FormatError;
use super::dom::is_void;
use super::lexer::{Lexer, Mode, TokenKind};

const RAW_BLOCK_ELEMENTS: &[&str] = &["script", "style", "pre", "textarea"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HtmlFormatter {
    indent: usize,
}

impl Default for HtmlFormatter {
    fn default() -> Self {
        Self { indent: 2 }
    }
}

impl HtmlFormatter {
    pub fn new(indent: i32) -> Result<Self, FormatError> {
        let indent = usize::try_from(indent).map_err(|_| FormatError::NegativeIndent(indent))?;
        Ok(Self { indent })
    }

    pub fn format(&self, html: &str) -> String {
        let src = html.replace("\r\n", "\n").replace('\r', "\n");
        let mut out = Writer {
            out: String::with_capacity(src.len()),
            unit: self.indent,
        };
        let mut level = 0usize;
        let mut tokens = Lexer::new(&src, Mode::Lenient, RAW_BLOCK_ELEMENTS)
            .filter_map(Result::ok)
            .peekable();

        while let Some(token) = tokens.next() {
            let text = token.text(&src);
            match &token.kind {
                TokenKind::Doctype | TokenKind::Comment => out.line(level, text.trim_end()),
                TokenKind::Text | TokenKind::RawText => {
                    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
                        out.line(level, line);
                    }
                }
                TokenKind::EndTag(_) => {
                    level = level.saturating_sub(1);
                    out.tag(level, text);
                }
                TokenKind::StartTag(tag) => {
                    let raw = !tag.self_closing
                        && RAW_BLOCK_ELEMENTS
                            .iter()
                            .any(|r| r.eq_ignore_ascii_case(tag.name));
                    if raw {
                        let mut end = token.span.end;
                        if let Some(body) = tokens.next_if(|t| t.kind == TokenKind::RawText) {
                            end = body.span.end;
                        }
                        if let Some(close) =
                            tokens.next_if(|t| matches!(t.kind, TokenKind::EndTag(_)))
                        {
                            end = close.span.end;
                        }
                        out.raw_block(level, &src[token.span.start..end]);
                    } else if tag.self_closing || is_void(tag.name) {
                        out.tag(level, text);
                    } else {
                        out.tag(level, text);
                        level += 1;
                    }
                }
            }
        }
        out.out
    }
}

/// Format `html` with `indent` spaces per level.
pub fn pretty_print(html: &str, indent: i32) -> Result<String, FormatError> {
    Ok(HtmlFormatter::new(indent)?.format(html))
}

struct Writer {
    out: String,
    unit: usize,
}

impl Writer {
    fn line(&mut self, level: usize, text: &str) {
        if !text.is_empty() {
            self.out.push_str(&" ".repeat(self.unit * level));
            self.out.push_str(text);
        }
        self.out.push('\n');
    }

    /// A tag whose attributes wrap onto several lines keeps the first line
    /// at `level` and the continuation lines one level deeper.
    fn tag(&mut self, level: usize, text: &str) {
        let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
        if let Some(first) = lines.next() {
            self.line(level, first);
        }
        for line in lines {
            self.line(level + 1, line);
        }
    }

    fn raw_block(&mut self, level: usize, block: &str) {
        let lines: Vec<&str> = block.split('\n').collect();
        let [first, body @ .., last] = lines.as_slice() else {
            self.line(level, block.trim());
            return;
        };

        self.line(level, first.trim_end());
        let common = body
            .iter()
            .filter(|l| !l.trim().is_empty())
            .map(|l| l.len() - l.trim_start_matches([' ', '\t']).len())
            .min()
            .unwrap_or(0);
        for line in body {
            if line.trim().is_empty() {
                self.line(level, "");
            } else {
                self.line(level + 1, line[common..].trim_end());
            }
        }
        self.line(level, last.trim());
    }
}
