//! A small CSS selector engine.
//!
//! Supports the subset gallery pages need: type selectors, `*`, `#id`,
//! `.class`, `[attr]`, `[attr=value]` (quoted or bare), the descendant
//! combinator and comma-separated lists. Matching runs right to left: the
//! last compound must match the element itself, each earlier compound some
//! ancestor further up.

use super::DomError;
use super::dom::{Document, NodeId};

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrSelector {
    name: String,
    value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrSelector>,
}

impl Compound {
    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        let Some(name) = doc.tag_name(node) else {
            return false;
        };
        if self.tag.as_deref().is_some_and(|t| t != name) {
            return false;
        }
        if let Some(id) = &self.id {
            if doc.get_attribute(node, "id").as_deref() != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.iter().all(|c| doc.has_class(node, c)) {
            return false;
        }
        self.attrs.iter().all(|a| match &a.value {
            None => doc.has_attribute(node, &a.name),
            Some(expected) => doc.get_attribute(node, &a.name).as_ref() == Some(expected),
        })
    }
}

/// A chain of compounds joined by descendant combinators.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex(Vec<Compound>);

impl Complex {
    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        let Some((last, rest)) = self.0.split_last() else {
            return false;
        };
        if !last.matches(doc, node) {
            return false;
        }
        let mut ancestors = doc.ancestors(node);
        rest.iter()
            .rev()
            .all(|compound| ancestors.any(|a| compound.matches(doc, a)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList(Vec<Complex>);

impl SelectorList {
    pub fn parse(input: &str) -> Result<Self, DomError> {
        let invalid = |why: &str| DomError::InvalidSelector(format!("{input:?}: {why}"));
        let mut list = Vec::new();
        for part in split_top_level(input, ',') {
            let mut chain = Vec::new();
            for word in split_compounds(part).map_err(invalid)? {
                chain.push(parse_compound(word).map_err(invalid)?);
            }
            if chain.is_empty() {
                return Err(invalid("empty selector"));
            }
            list.push(Complex(chain));
        }
        Ok(Self(list))
    }

    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        self.0.iter().any(|c| c.matches(doc, node))
    }
}

/// Split on `sep` outside of brackets and quotes.
fn split_top_level(input: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote = None;
    let mut start = 0;
    for (i, c) in input.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, c) if c == sep && depth == 0 => {
                parts.push(&input[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

/// Split one complex selector into its whitespace-separated compounds.
fn split_compounds(input: &str) -> Result<Vec<&str>, &'static str> {
    let words: Vec<&str> = split_top_level(input.trim(), ' ')
        .into_iter()
        .flat_map(|w| split_top_level(w, '\t'))
        .flat_map(|w| split_top_level(w, '\n'))
        .filter(|w| !w.is_empty())
        .collect();
    if words.iter().any(|w| matches!(*w, ">" | "+" | "~")) {
        return Err("only the descendant combinator is supported");
    }
    Ok(words)
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

fn parse_compound(word: &str) -> Result<Compound, &'static str> {
    let mut compound = Compound::default();
    let mut rest = word;

    if let Some(r) = rest.strip_prefix('*') {
        rest = r;
    } else {
        let end = rest.find(|c| !is_ident_char(c)).unwrap_or(rest.len());
        if end > 0 {
            compound.tag = Some(rest[..end].to_ascii_lowercase());
            rest = &rest[end..];
        }
    }

    while let Some(c) = rest.chars().next() {
        match c {
            '#' | '.' => {
                let body = &rest[1..];
                let end = body.find(|c| !is_ident_char(c)).unwrap_or(body.len());
                if end == 0 {
                    return Err("expected a name after '#' or '.'");
                }
                let ident = body[..end].to_string();
                if c == '#' {
                    compound.id = Some(ident);
                } else {
                    compound.classes.push(ident);
                }
                rest = &body[end..];
            }
            '[' => {
                let close = rest.find(']').ok_or("unclosed '['")?;
                compound.attrs.push(parse_attr(&rest[1..close])?);
                rest = &rest[close + 1..];
            }
            _ => return Err("unexpected character"),
        }
    }
    Ok(compound)
}

fn parse_attr(body: &str) -> Result<AttrSelector, &'static str> {
    let (name, value) = match body.split_once('=') {
        None => (body.trim(), None),
        Some((name, value)) => {
            let value = value.trim();
            let unquoted = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
                .unwrap_or(value);
            (name.trim(), Some(unquoted.to_string()))
        }
    };
    if name.is_empty() || !name.chars().all(is_ident_char) {
        return Err("invalid attribute name");
    }
    Ok(AttrSelector {
        name: name.to_ascii_lowercase(),
        value,
    })
}
