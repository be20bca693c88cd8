//! Tokenizer shared by the document parser and the pretty-printer.
//!
//! The lexer works on byte offsets into the source string and never copies
//! text; every token carries its `span`. Both consumers feed it a different
//! set of raw-text elements: the parser needs `script`/`style`/`textarea`/
//! `title` so that their contents never become child elements, the
//! pretty-printer additionally treats `pre` as opaque so preformatted text
//! survives reformatting.
//!
//! In [`Mode::Strict`] a construct that starts but never ends (an unclosed
//! comment, a start tag cut off by end of input) is an error. In
//! [`Mode::Lenient`] the same bytes come out as plain text instead.

use std::ops::Range;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub offset: usize,
    pub reason: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Strict,
    Lenient,
}

/// An attribute exactly as written in the source (entities undecoded).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAttr<'a> {
    pub name: &'a str,
    pub value: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag<'a> {
    pub name: &'a str,
    pub attrs: Vec<RawAttr<'a>>,
    pub self_closing: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind<'a> {
    Doctype,
    Comment,
    Text,
    /// Contents of a raw-text element, between its start and end tag.
    RawText,
    StartTag(Tag<'a>),
    EndTag(&'a str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    pub span: Range<usize>,
}

impl Token<'_> {
    pub fn text<'s>(&self, src: &'s str) -> &'s str {
        &src[self.span.clone()]
    }
}

pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    mode: Mode,
    raw_elements: &'a [&'a str],
    pending_raw: Option<String>,
    failed: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str, mode: Mode, raw_elements: &'a [&'a str]) -> Self {
        Self {
            src,
            pos: 0,
            mode,
            raw_elements,
            pending_raw: None,
            failed: false,
        }
    }

    fn bytes(&self) -> &'a [u8] {
        self.src.as_bytes()
    }

    fn raw_text(&mut self, name: &str) -> Option<Result<Token<'a>, LexError>> {
        let start = self.pos;
        match find_end_tag(self.src, start, name) {
            Some(end) => {
                self.pos = end;
                (end > start).then(|| {
                    Ok(Token {
                        kind: TokenKind::RawText,
                        span: start..end,
                    })
                })
            }
            None if self.mode == Mode::Strict => {
                self.failed = true;
                Some(Err(LexError {
                    offset: start,
                    reason: "unterminated raw text element",
                }))
            }
            None => {
                self.pos = self.src.len();
                Some(Ok(Token {
                    kind: TokenKind::RawText,
                    span: start..self.src.len(),
                }))
            }
        }
    }

    /// Lex the construct starting at a `<`. `Ok(None)` means the `<` does
    /// not open markup and belongs to the surrounding text.
    fn markup(&mut self) -> Result<Option<Token<'a>>, LexError> {
        let bytes = self.bytes();
        let start = self.pos;
        let next = bytes.get(start + 1).copied();

        if self.src[start..].starts_with("<!--") {
            let end = find(self.src, start + 4, "-->").ok_or(LexError {
                offset: start,
                reason: "unterminated comment",
            })? + 3;
            return Ok(Some(self.emit(TokenKind::Comment, start, end)));
        }

        if matches!(next, Some(b'!') | Some(b'?')) {
            let end = find(self.src, start + 2, ">").ok_or(LexError {
                offset: start,
                reason: "unterminated declaration",
            })? + 1;
            let is_doctype = bytes
                .get(start + 2..start + 9)
                .is_some_and(|s| s.eq_ignore_ascii_case(b"doctype"));
            let kind = if is_doctype {
                TokenKind::Doctype
            } else {
                TokenKind::Comment
            };
            return Ok(Some(self.emit(kind, start, end)));
        }

        if next == Some(b'/') && bytes.get(start + 2).is_some_and(u8::is_ascii_alphabetic) {
            let name_end = scan_name(bytes, start + 2);
            let end = find(self.src, name_end, ">").ok_or(LexError {
                offset: start,
                reason: "unterminated end tag",
            })? + 1;
            let name = &self.src[start + 2..name_end];
            return Ok(Some(self.emit(TokenKind::EndTag(name), start, end)));
        }

        if next.is_some_and(|b| b.is_ascii_alphabetic()) {
            return self.start_tag(start).map(Some);
        }

        Ok(None)
    }

    fn start_tag(&mut self, start: usize) -> Result<Token<'a>, LexError> {
        let bytes = self.bytes();
        let unterminated = LexError {
            offset: start,
            reason: "unterminated start tag",
        };
        let name_end = scan_name(bytes, start + 1);
        let name = &self.src[start + 1..name_end];
        let mut attrs = Vec::new();
        let mut i = name_end;

        let self_closing = loop {
            i = skip_ws(bytes, i);
            match bytes.get(i) {
                None => return Err(unterminated),
                Some(b'>') => {
                    i += 1;
                    break false;
                }
                Some(b'/') if bytes.get(i + 1) == Some(&b'>') => {
                    i += 2;
                    break true;
                }
                Some(b'/') => {
                    i += 1;
                    continue;
                }
                Some(_) => {}
            }

            let attr_start = i;
            while i < bytes.len() && !is_ws(bytes[i]) && !matches!(bytes[i], b'=' | b'>' | b'/') {
                i += 1;
            }
            if i == attr_start {
                // A stray `=` where a name should be.
                i += 1;
            }
            let attr_name = &self.src[attr_start..i];

            let after_name = skip_ws(bytes, i);
            if bytes.get(after_name) != Some(&b'=') {
                attrs.push(RawAttr {
                    name: attr_name,
                    value: None,
                });
                continue;
            }

            i = skip_ws(bytes, after_name + 1);
            let value = match bytes.get(i) {
                None => return Err(unterminated),
                Some(&q) if q == b'"' || q == b'\'' => {
                    let close = find(self.src, i + 1, if q == b'"' { "\"" } else { "'" })
                        .ok_or(LexError {
                            offset: i,
                            reason: "unterminated attribute value",
                        })?;
                    let value = &self.src[i + 1..close];
                    i = close + 1;
                    value
                }
                Some(_) => {
                    let value_start = i;
                    while i < bytes.len() && !is_ws(bytes[i]) && bytes[i] != b'>' {
                        i += 1;
                    }
                    &self.src[value_start..i]
                }
            };
            attrs.push(RawAttr {
                name: attr_name,
                value: Some(value),
            });
        };

        if !self_closing
            && self
                .raw_elements
                .iter()
                .any(|raw| raw.eq_ignore_ascii_case(name))
        {
            self.pending_raw = Some(name.to_ascii_lowercase());
        }

        Ok(self.emit(
            TokenKind::StartTag(Tag {
                name,
                attrs,
                self_closing,
            }),
            start,
            i,
        ))
    }

    fn text(&mut self) -> Token<'a> {
        let bytes = self.bytes();
        let start = self.pos;
        let mut i = start + 1;
        let end = loop {
            match find(self.src, i, "<") {
                None => break self.src.len(),
                Some(lt) if starts_markup(bytes, lt) => break lt,
                Some(lt) => i = lt + 1,
            }
        };
        self.emit(TokenKind::Text, start, end)
    }

    fn emit(&mut self, kind: TokenKind<'a>, start: usize, end: usize) -> Token<'a> {
        self.pos = end;
        Token {
            kind,
            span: start..end,
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token<'a>, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        if let Some(name) = self.pending_raw.take() {
            if let Some(token) = self.raw_text(&name) {
                return Some(token);
            }
        }
        if self.pos >= self.src.len() {
            return None;
        }

        if self.bytes()[self.pos] == b'<' {
            match self.markup() {
                Ok(Some(token)) => return Some(Ok(token)),
                Ok(None) => {}
                Err(err) if self.mode == Mode::Strict => {
                    self.failed = true;
                    return Some(Err(err));
                }
                Err(_) => {
                    let start = self.pos;
                    let end = find(self.src, start + 1, "<").unwrap_or(self.src.len());
                    return Some(Ok(self.emit(TokenKind::Text, start, end)));
                }
            }
        }

        Some(Ok(self.text()))
    }
}

/// Tokenize the whole input, stopping at the first error in strict mode.
pub fn tokenize<'a>(
    src: &'a str,
    mode: Mode,
    raw_elements: &'a [&'a str],
) -> Result<Vec<Token<'a>>, LexError> {
    Lexer::new(src, mode, raw_elements).collect()
}

fn is_ws(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | 0x0c)
}

fn skip_ws(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && is_ws(bytes[i]) {
        i += 1;
    }
    i
}

fn scan_name(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && !is_ws(bytes[i]) && !matches!(bytes[i], b'/' | b'>') {
        i += 1;
    }
    i
}

/// Byte-level search, so `from` need not sit on a char boundary.
fn find(src: &str, from: usize, needle: &str) -> Option<usize> {
    let needle = needle.as_bytes();
    src.as_bytes()
        .get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| i + from)
}

fn starts_markup(bytes: &[u8], lt: usize) -> bool {
    match bytes.get(lt + 1) {
        Some(b'!') | Some(b'?') => true,
        Some(b'/') => bytes.get(lt + 2).is_some_and(u8::is_ascii_alphabetic),
        Some(b) => b.is_ascii_alphabetic(),
        None => false,
    }
}

/// Offset of the `</name` that closes a raw-text element opened before `from`.
fn find_end_tag(src: &str, from: usize, name: &str) -> Option<usize> {
    let bytes = src.as_bytes();
    let mut i = from;
    while let Some(lt) = find(src, i, "</") {
        let name_start = lt + 2;
        let name_end = name_start + name.len();
        let name_matches = bytes
            .get(name_start..name_end)
            .is_some_and(|n| n.eq_ignore_ascii_case(name.as_bytes()));
        let delimited = bytes
            .get(name_end)
            .is_none_or(|&b| is_ws(b) || b == b'/' || b == b'>');
        if name_matches && delimited {
            return Some(lt);
        }
        i = lt + 2;
    }
    None
}
