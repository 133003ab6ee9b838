//! Structural selector decomposition
//!
//! Splits a CSS selector into its target compound (tag, id, classes,
//! attribute matchers). Combinators are tolerated; only the right-most
//! compound describes the element a selector points at.

use crate::{errors::LocatorError, ports::ElementHandle};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttrOp {
    /// `[attr]`
    Exists,
    /// `[attr="v"]`
    Equals,
    /// `[attr*="v"]`
    Contains,
    /// `[attr^="v"]`
    Prefix,
    /// `[attr$="v"]`
    Suffix,
    /// `[attr~="v"]`
    Word,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttrMatcher {
    pub name: String,
    pub op: AttrOp,
    pub value: Option<String>,
}

impl AttrMatcher {
    fn matches(&self, handle: &ElementHandle) -> bool {
        let Some(actual) = handle.attributes.get(&self.name) else {
            return false;
        };
        let expected = self.value.as_deref().unwrap_or_default();
        match self.op {
            AttrOp::Exists => true,
            AttrOp::Equals => actual == expected,
            AttrOp::Contains => !expected.is_empty() && actual.contains(expected),
            AttrOp::Prefix => !expected.is_empty() && actual.starts_with(expected),
            AttrOp::Suffix => !expected.is_empty() && actual.ends_with(expected),
            AttrOp::Word => actual.split_whitespace().any(|word| word == expected),
        }
    }
}

/// Decomposed target compound of a selector
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorParts {
    pub tag: Option<String>,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attributes: Vec<AttrMatcher>,
    pub pseudos: Vec<String>,
}

impl SelectorParts {
    fn attr_value(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.name == name && attr.op == AttrOp::Equals)
            .and_then(|attr| attr.value.as_deref())
    }

    pub fn name(&self) -> Option<&str> {
        self.attr_value("name")
    }

    pub fn input_type(&self) -> Option<&str> {
        self.attr_value("type")
    }

    /// Attribute name/value pairs that carry a concrete value
    pub fn attribute_map(&self) -> BTreeMap<String, String> {
        self.attributes
            .iter()
            .filter_map(|attr| {
                attr.value
                    .as_ref()
                    .map(|value| (attr.name.clone(), value.clone()))
            })
            .collect()
    }

    /// Whether the element satisfies every simple selector in this compound.
    /// Pseudo-classes are ignored.
    pub fn matches(&self, handle: &ElementHandle) -> bool {
        if let Some(tag) = self.tag.as_deref() {
            if tag != "*" && !tag.eq_ignore_ascii_case(&handle.tag) {
                return false;
            }
        }
        if let Some(id) = self.id.as_deref() {
            if handle.id() != Some(id) {
                return false;
            }
        }
        let classes = handle.classes();
        if !self.classes.iter().all(|class| classes.contains(&class.as_str())) {
            return false;
        }
        self.attributes.iter().all(|attr| attr.matches(handle))
    }
}

/// Decompose the right-most compound of `selector`.
pub fn decompose(selector: &str) -> Result<SelectorParts, LocatorError> {
    let trimmed = selector.trim();
    if trimmed.is_empty() {
        return Err(LocatorError::InvalidSelector("empty selector".into()));
    }
    let group = split_top_level(trimmed, ',')
        .into_iter()
        .next()
        .unwrap_or_default();
    let compound = last_compound(&group);
    parse_compound(compound)
}

/// Parse every comma-separated group, keeping only each group's target compound.
pub fn decompose_groups(selector: &str) -> Result<Vec<SelectorParts>, LocatorError> {
    let groups = split_top_level(selector.trim(), ',');
    if groups.iter().all(|group| group.trim().is_empty()) {
        return Err(LocatorError::InvalidSelector("empty selector".into()));
    }
    groups
        .iter()
        .filter(|group| !group.trim().is_empty())
        .map(|group| parse_compound(last_compound(group)))
        .collect()
}

fn split_top_level(input: &str, separator: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for ch in input.chars() {
        if escaped {
            current.push(ch);
            escaped = false;
            continue;
        }
        match ch {
            '\\' => {
                escaped = true;
                current.push(ch);
            }
            '"' | '\'' => {
                match quote {
                    Some(q) if q == ch => quote = None,
                    None => quote = Some(ch),
                    _ => {}
                }
                current.push(ch);
            }
            '[' | '(' if quote.is_none() => {
                depth += 1;
                current.push(ch);
            }
            ']' | ')' if quote.is_none() => {
                depth -= 1;
                current.push(ch);
            }
            c if c == separator && depth == 0 && quote.is_none() => {
                parts.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    parts.push(current);
    parts
}

fn last_compound(group: &str) -> &str {
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut start = 0usize;
    let mut escaped = false;
    let trimmed = group.trim();
    for (idx, ch) in trimmed.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '"' | '\'' => match quote {
                Some(q) if q == ch => quote = None,
                None => quote = Some(ch),
                _ => {}
            },
            '[' | '(' if quote.is_none() => depth += 1,
            ']' | ')' if quote.is_none() => depth -= 1,
            ' ' | '>' | '+' | '~' if depth == 0 && quote.is_none() => {
                start = idx + ch.len_utf8();
            }
            _ => {}
        }
    }
    trimmed[start..].trim()
}

fn is_ident_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '-' || ch == '_' || !ch.is_ascii()
}

fn read_ident(chars: &[char], pos: &mut usize) -> String {
    let mut out = String::new();
    while *pos < chars.len() {
        let ch = chars[*pos];
        if ch == '\\' && *pos + 1 < chars.len() {
            out.push(chars[*pos + 1]);
            *pos += 2;
        } else if is_ident_char(ch) {
            out.push(ch);
            *pos += 1;
        } else {
            break;
        }
    }
    out
}

fn read_until_close(chars: &[char], pos: &mut usize, open: char, close: char) -> Option<String> {
    let mut depth = 1i32;
    let mut quote: Option<char> = None;
    let mut out = String::new();
    while *pos < chars.len() {
        let ch = chars[*pos];
        *pos += 1;
        match ch {
            '"' | '\'' => {
                match quote {
                    Some(q) if q == ch => quote = None,
                    None => quote = Some(ch),
                    _ => {}
                }
                out.push(ch);
            }
            c if c == open && quote.is_none() => {
                depth += 1;
                out.push(c);
            }
            c if c == close && quote.is_none() => {
                depth -= 1;
                if depth == 0 {
                    return Some(out);
                }
                out.push(c);
            }
            _ => out.push(ch),
        }
    }
    None
}

fn parse_attribute(body: &str) -> Result<AttrMatcher, LocatorError> {
    let body = body.trim();
    if let Some(eq) = body.find('=') {
        let (op, name_end) = match body[..eq].chars().last() {
            Some('*') => (AttrOp::Contains, eq - 1),
            Some('^') => (AttrOp::Prefix, eq - 1),
            Some('$') => (AttrOp::Suffix, eq - 1),
            Some('~') => (AttrOp::Word, eq - 1),
            _ => (AttrOp::Equals, eq),
        };
        let name = body[..name_end].trim();
        if name.is_empty() || !name.chars().all(is_ident_char) {
            return Err(LocatorError::InvalidSelector(format!("[{body}]")));
        }
        let mut raw = body[eq + 1..].trim();
        if let Some(stripped) = raw.strip_suffix(" i").or_else(|| raw.strip_suffix(" s")) {
            raw = stripped.trim_end();
        }
        return Ok(AttrMatcher {
            name: name.to_ascii_lowercase(),
            op,
            value: Some(unquote(raw)),
        });
    }
    if body.is_empty() || !body.chars().all(is_ident_char) {
        return Err(LocatorError::InvalidSelector(format!("[{body}]")));
    }
    Ok(AttrMatcher {
        name: body.to_ascii_lowercase(),
        op: AttrOp::Exists,
        value: None,
    })
}

fn unquote(raw: &str) -> String {
    let bytes = raw.as_bytes();
    if bytes.len() >= 2
        && ((bytes[0] == b'"' && bytes[bytes.len() - 1] == b'"')
            || (bytes[0] == b'\'' && bytes[bytes.len() - 1] == b'\''))
    {
        raw[1..raw.len() - 1].replace("\\\"", "\"").replace("\\\\", "\\")
    } else {
        raw.to_string()
    }
}

fn parse_compound(compound: &str) -> Result<SelectorParts, LocatorError> {
    let chars: Vec<char> = compound.chars().collect();
    let mut parts = SelectorParts::default();
    let mut pos = 0usize;

    if chars.is_empty() {
        return Err(LocatorError::InvalidSelector(compound.to_string()));
    }

    if chars[0] == '*' {
        parts.tag = Some("*".into());
        pos = 1;
    } else if is_ident_char(chars[0]) {
        parts.tag = Some(read_ident(&chars, &mut pos).to_ascii_lowercase());
    }

    while pos < chars.len() {
        let ch = chars[pos];
        pos += 1;
        match ch {
            '#' => {
                let id = read_ident(&chars, &mut pos);
                if id.is_empty() {
                    return Err(LocatorError::InvalidSelector(compound.to_string()));
                }
                parts.id = Some(id);
            }
            '.' => {
                let class = read_ident(&chars, &mut pos);
                if class.is_empty() {
                    return Err(LocatorError::InvalidSelector(compound.to_string()));
                }
                parts.classes.push(class);
            }
            '[' => {
                let body = read_until_close(&chars, &mut pos, '[', ']')
                    .ok_or_else(|| LocatorError::InvalidSelector(compound.to_string()))?;
                parts.attributes.push(parse_attribute(&body)?);
            }
            ':' => {
                if pos < chars.len() && chars[pos] == ':' {
                    pos += 1;
                }
                let mut pseudo = read_ident(&chars, &mut pos);
                if pos < chars.len() && chars[pos] == '(' {
                    pos += 1;
                    let args = read_until_close(&chars, &mut pos, '(', ')')
                        .ok_or_else(|| LocatorError::InvalidSelector(compound.to_string()))?;
                    pseudo = format!("{pseudo}({args})");
                }
                parts.pseudos.push(pseudo);
            }
            _ => return Err(LocatorError::InvalidSelector(compound.to_string())),
        }
    }

    Ok(parts)
}
