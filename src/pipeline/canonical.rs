//! Canonicalization: reduce an SVG document to a minimal, deterministic form.
//!
//! The document is parsed into a small owned tree, a fixed minimization
//! preset is applied (optionally until nothing changes), and the tree is
//! written back without indentation. Finally every `"` becomes `'`, which
//! keeps the markup embeddable inside double-quoted JSON/Solidity strings.
//!
//! ## Preset
//!
//! 1. Drop the XML declaration, processing instructions, DOCTYPE, comments
//! 2. Drop `<metadata>` and editor data (`inkscape:`, `sodipodi:`, `sketch:`, `serif:`)
//! 3. Drop whitespace-only text, collapse whitespace runs in the rest
//! 4. Collapse whitespace inside attribute values
//! 5. Drop attributes with empty values
//! 6. Drop attribute-less, child-less containers (`<g/>`, `<defs/>`, …)
//!
//! Steps 1 and 3 happen while parsing; 2, 4, 5 and 6 run on the tree.
//! Entities declared in the DOCTYPE internal subset (as Illustrator writes
//! them) are expanded before the DOCTYPE itself is dropped. The output never
//! contains a line break.

use crate::error::CanonicalizeError;
use once_cell::sync::Lazy;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use std::collections::HashMap;
use std::fmt::Write as _;

/// Upper bound on minimization passes when `multipass` is on.
pub const MAX_PASSES: usize = 10;

/// Deepest element nesting accepted. Minimization, serialization and drop
/// all recurse per level.
pub const MAX_DEPTH: usize = 1024;

/// General entity declaration with a quoted literal value. Parameter
/// entities (`<!ENTITY % …>`) and external ones (`SYSTEM`/`PUBLIC`) don't match.
static RE_ENTITY_DECL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<!ENTITY\s+([A-Za-z_][\w.:-]*)\s+(?:"([^"]*)"|'([^']*)')\s*>"#).unwrap()
});

const EDITOR_PREFIXES: &[&str] = &["inkscape", "sodipodi", "sketch", "serif"];

const CONTAINERS: &[&str] = &[
    "g", "defs", "symbol", "marker", "clipPath", "mask", "pattern",
];

/// Options for [`canonicalize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanonicalizeOptions {
    /// Repeat the preset until the tree stops changing (at most [`MAX_PASSES`]).
    pub multipass: bool,
}

impl Default for CanonicalizeOptions {
    fn default() -> Self {
        Self { multipass: true }
    }
}

/// Canonicalize SVG bytes.
///
/// Deterministic, and a no-op on its own output.
///
/// # Errors
/// [`CanonicalizeError`] when the input is not UTF-8 or not well-formed XML.
pub fn canonicalize(
    bytes: &[u8],
    options: &CanonicalizeOptions,
) -> Result<Vec<u8>, CanonicalizeError> {
    let text = std::str::from_utf8(bytes).map_err(|e| CanonicalizeError::Utf8(e.to_string()))?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut root = parse(text)?;

    let passes = if options.multipass { MAX_PASSES } else { 1 };
    for _ in 0..passes {
        if !minimize(&mut root) {
            break;
        }
    }

    let mut out = String::with_capacity(bytes.len());
    write_element(&root, &mut out);
    Ok(out.replace('"', "'").into_bytes())
}

// ── Tree ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
struct Element {
    name: String,
    attrs: Vec<(String, String)>,
    children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Element(Element),
    Text(String),
    CData(String),
}

fn malformed(e: impl std::fmt::Display) -> CanonicalizeError {
    CanonicalizeError::Malformed(e.to_string())
}

/// Entities declared in the internal subset of a DOCTYPE. The first
/// declaration of a name wins.
fn parse_entity_decls(doctype: &str) -> HashMap<String, String> {
    let mut entities = HashMap::new();
    for caps in RE_ENTITY_DECL.captures_iter(doctype) {
        let value = caps.get(2).or_else(|| caps.get(3)).map_or("", |m| m.as_str());
        entities
            .entry(caps[1].to_string())
            .or_insert_with(|| value.to_string());
    }
    entities
}

fn resolve_entity<'a>(entities: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    match name {
        "lt" => Some("<"),
        "gt" => Some(">"),
        "amp" => Some("&"),
        "apos" => Some("'"),
        "quot" => Some("\""),
        _ => entities.get(name).map(String::as_str),
    }
}

fn open_element(
    start: &BytesStart<'_>,
    entities: &HashMap<String, String>,
) -> Result<Element, CanonicalizeError> {
    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(malformed)?
        .to_string();
    let mut attrs = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(malformed)?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(malformed)?
            .to_string();
        let value = attr
            .unescape_value_with(|name| resolve_entity(entities, name))
            .map_err(malformed)?
            .into_owned();
        attrs.push((key, value));
    }
    Ok(Element {
        name,
        attrs,
        children: Vec::new(),
    })
}

/// Parse into a single root element, discarding declarations, comments,
/// processing instructions and DOCTYPE on the way.
fn parse(text: &str) -> Result<Element, CanonicalizeError> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;
    let mut entities: HashMap<String, String> = HashMap::new();

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(e) => {
                return Err(malformed(format!(
                    "at byte {}: {e}",
                    reader.buffer_position()
                )))
            }
        };
        match event {
            Event::Start(start) => {
                if root.is_some() && stack.is_empty() {
                    return Err(malformed("more than one root element"));
                }
                if stack.len() >= MAX_DEPTH {
                    return Err(malformed(format!(
                        "elements nested deeper than {MAX_DEPTH} levels"
                    )));
                }
                stack.push(open_element(&start, &entities)?);
            }
            Event::Empty(start) => {
                let el = open_element(&start, &entities)?;
                attach(&mut stack, &mut root, Node::Element(el))?;
            }
            Event::End(_) => {
                let el = stack
                    .pop()
                    .ok_or_else(|| malformed("closing tag without an opening tag"))?;
                attach(&mut stack, &mut root, Node::Element(el))?;
            }
            Event::Text(t) => {
                let s = t
                    .unescape_with(|name| resolve_entity(&entities, name))
                    .map_err(malformed)?;
                let s = collapse_whitespace(&s);
                if s.is_empty() {
                    continue;
                }
                match stack.last_mut() {
                    Some(parent) => parent.children.push(Node::Text(s)),
                    None => return Err(malformed(format!("text outside the root element: {s:?}"))),
                }
            }
            Event::CData(c) => {
                let s = collapse_runs(std::str::from_utf8(&c).map_err(malformed)?);
                match stack.last_mut() {
                    Some(parent) => parent.children.push(Node::CData(s)),
                    None => return Err(malformed("CDATA outside the root element")),
                }
            }
            Event::DocType(d) => {
                entities = parse_entity_decls(std::str::from_utf8(&d).map_err(malformed)?);
            }
            Event::Decl(_) | Event::PI(_) | Event::Comment(_) => {}
            Event::Eof => break,
        }
    }

    if let Some(open) = stack.last() {
        return Err(malformed(format!("unclosed element <{}>", open.name)));
    }
    root.ok_or_else(|| malformed("no root element"))
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    node: Node,
) -> Result<(), CanonicalizeError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
        return Ok(());
    }
    match (root.is_some(), node) {
        (false, Node::Element(el)) => {
            *root = Some(el);
            Ok(())
        }
        (true, _) => Err(malformed("more than one root element")),
        (false, _) => Err(malformed("content outside the root element")),
    }
}

// ── Minimization ─────────────────────────────────────────────────────────

fn has_editor_prefix(name: &str) -> bool {
    let prefix = match name.strip_prefix("xmlns:") {
        Some(declared) => declared,
        None => match name.split_once(':') {
            Some((p, _)) => p,
            None => return false,
        },
    };
    EDITOR_PREFIXES.contains(&prefix)
}

fn is_xml_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r')
}

/// Trim, then turn every whitespace run into one space.
fn collapse_whitespace(value: &str) -> String {
    value
        .split(is_xml_space)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Turn every whitespace run into one space without trimming. Used for
/// CDATA, where a leading or trailing space may matter.
fn collapse_runs(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut in_run = false;
    for c in value.chars() {
        if is_xml_space(c) {
            if !in_run {
                out.push(' ');
            }
            in_run = true;
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out
}

/// Apply one pass of the preset. Returns whether anything changed.
fn minimize(el: &mut Element) -> bool {
    let mut changed = false;

    let before = el.attrs.len();
    el.attrs.retain(|(k, _)| !has_editor_prefix(k));
    for (_, v) in el.attrs.iter_mut() {
        let collapsed = collapse_whitespace(v);
        if collapsed != *v {
            *v = collapsed;
            changed = true;
        }
    }
    el.attrs.retain(|(_, v)| !v.is_empty());
    changed |= el.attrs.len() != before;

    let before = el.children.len();
    el.children.retain(|child| match child {
        Node::Element(c) => c.name != "metadata" && !has_editor_prefix(&c.name),
        _ => true,
    });
    changed |= el.children.len() != before;

    for child in el.children.iter_mut() {
        if let Node::Element(c) = child {
            changed |= minimize(c);
        }
    }

    let before = el.children.len();
    el.children.retain(|child| match child {
        Node::Element(c) => {
            !(CONTAINERS.contains(&c.name.as_str()) && c.attrs.is_empty() && c.children.is_empty())
        }
        _ => true,
    });
    changed |= el.children.len() != before;

    changed
}

// ── Serialization ────────────────────────────────────────────────────────

fn escape_attr(value: &str, out: &mut String) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '\'' => out.push_str("&apos;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
}

fn escape_text(value: &str, out: &mut String) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
}

fn write_element(el: &Element, out: &mut String) {
    out.push('<');
    out.push_str(&el.name);
    for (k, v) in &el.attrs {
        let _ = write!(out, " {k}='");
        escape_attr(v, out);
        out.push('\'');
    }
    if el.children.is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');
    for child in &el.children {
        match child {
            Node::Element(c) => write_element(c, out),
            Node::Text(t) => escape_text(t, out),
            Node::CData(c) => {
                out.push_str("<![CDATA[");
                out.push_str(c);
                out.push_str("]]>");
            }
        }
    }
    let _ = write!(out, "</{}>", el.name);
}
