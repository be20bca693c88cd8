//! HTML document handling.
//!
//! | Module | Role |
//! |--------|------|
//! | [`lexer`] | Byte-offset tokenizer shared by the parser and the formatter |
//! | [`dom`] | Arena-backed mutable tree with selector queries and insertion |
//! | [`selector`] | The CSS selector subset used to find anchors in a page |
//! | [`pretty`] | Deterministic indenting formatter for the final output |

pub mod dom;
pub mod lexer;
pub mod pretty;
pub mod selector;

pub use dom::{Attribute, Document, InsertPosition, NodeId, NodeKind};
pub use pretty::{HtmlFormatter, pretty_print};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    #[error("Malformed document at byte {offset}: {reason}")]
    Malformed { offset: usize, reason: &'static str },
    #[error("Invalid selector {0}")]
    InvalidSelector(String),
    #[error("Cannot insert there: the target has no parent or would contain itself")]
    HierarchyRequest,
}

impl From<lexer::LexError> for DomError {
    fn from(err: lexer::LexError) -> Self {
        DomError::Malformed {
            offset: err.offset,
            reason: err.reason,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("Indent must be zero or more spaces, got {0}")]
    NegativeIndent(i32),
}

/// Escape text for use in element content or a double-quoted attribute.
pub fn escape(text: &str) -> String {
    maud::html! { (text) }.into_string()
}

/// Decode character references. Unknown named references are left as-is.
pub fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        match rest.find(';').filter(|&semi| semi <= 10) {
            Some(semi) => match decode_reference(&rest[1..semi]) {
                Some(c) => {
                    out.push(c);
                    rest = &rest[semi + 1..];
                }
                None => {
                    out.push('&');
                    rest = &rest[1..];
                }
            },
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_reference(name: &str) -> Option<char> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse().ok()?,
        };
        return char::from_u32(code);
    }
    Some(match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        _ => return None,
    })
}
