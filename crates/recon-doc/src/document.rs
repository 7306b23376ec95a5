//! The in-memory document tree.
//!
//! Text is kept in its escaped source form so that untouched content is
//! written back byte for byte. Elements remember their original start tag
//! until their attributes are edited.

use std::path::Path;

use quick_xml::escape::{partial_escape, unescape};
use tracing::debug;

use crate::error::{DocError, DocResult, ParseError, SerializationError};
use crate::{reader, writer};

/// A parsed document: everything before the root, the root, everything after.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Document {
    pub(crate) bom: bool,
    /// Declaration, doctype, comments, processing instructions and
    /// whitespace preceding the root element.
    pub prolog: Vec<Misc>,
    pub root: Element,
    /// Comments, processing instructions and whitespace after the root.
    pub epilog: Vec<Misc>,
}

impl Document {
    /// A document consisting of a bare root element.
    pub fn new(root: Element) -> Self {
        Self {
            bom: false,
            prolog: Vec::new(),
            root,
            epilog: Vec::new(),
        }
    }

    pub fn parse(text: &str) -> Result<Self, ParseError> {
        reader::parse_document(text)
    }

    /// Parse UTF-8 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ParseError> {
        let text = std::str::from_utf8(bytes).map_err(|e| {
            ParseError::new(e.valid_up_to() as u64, "document is not valid UTF-8")
        })?;
        Self::parse(text)
    }

    /// Read and parse a document from disk.
    pub fn load(path: &Path) -> DocResult<Self> {
        let bytes = std::fs::read(path).map_err(|source| DocError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), bytes = bytes.len(), "loading document");
        Ok(Self::from_bytes(&bytes)?)
    }

    /// Render the document back to text.
    pub fn to_xml(&self) -> Result<String, SerializationError> {
        writer::write_document(self)
    }

    /// Serialize and write the document to disk.
    pub fn save(&self, path: &Path) -> DocResult<()> {
        let text = self.to_xml()?;
        std::fs::write(path, text).map_err(|source| DocError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Markup outside the root element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Misc {
    /// `<?xml ...?>`, stored without the `<?`/`?>` delimiters.
    Declaration(String),
    /// `<!DOCTYPE ...>` markup between `<!` and `>`, keyword spelled as in
    /// the source.
    DocType(String),
    Comment(String),
    ProcessingInstruction(String),
    Whitespace(String),
}

/// A child of an element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    /// Character data in escaped form.
    Text(String),
    /// Raw content of a CDATA section.
    CData(String),
    Comment(String),
    ProcessingInstruction(String),
}

impl Node {
    /// A text node holding `value`, escaped for output.
    pub fn text(value: &str) -> Self {
        Node::Text(partial_escape(value).into_owned())
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(e) => Some(e),
            _ => None,
        }
    }

    /// The unescaped character data of a text or CDATA node.
    pub fn text_value(&self) -> Option<String> {
        match self {
            Node::Text(raw) => Some(unescape_lossy(raw)),
            Node::CData(raw) => Some(raw.clone()),
            _ => None,
        }
    }

    /// Returns `true` for a text node containing only whitespace.
    pub fn is_blank_text(&self) -> bool {
        matches!(self, Node::Text(raw) if raw.trim().is_empty())
    }
}

/// An element: tag name, ordered attributes and ordered children.
#[derive(Clone, Debug)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
    pub(crate) self_closing: bool,
    /// Start tag content between `<` and `>` (or `/>`) as read from the
    /// source; dropped once the attributes change.
    pub(crate) raw_start: Option<String>,
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.attributes == other.attributes
            && self.children == other.children
    }
}

impl Eq for Element {}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
            self_closing: true,
            raw_start: None,
        }
    }

    pub(crate) fn from_source(
        name: String,
        attributes: Vec<(String, String)>,
        start: String,
        self_closing: bool,
    ) -> Self {
        Self {
            name,
            attributes,
            children: Vec::new(),
            self_closing,
            raw_start: Some(start),
        }
    }

    /// Parse a single element from its serialized form.
    ///
    /// Any declaration or comments around the element are discarded.
    pub fn parse_fragment(text: &str) -> Result<Self, ParseError> {
        Document::parse(text).map(|doc| doc.root)
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    pub fn with_text(mut self, value: &str) -> Self {
        self.children.push(Node::text(value));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, keeping its position if it already exists.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == name) {
            Some((_, existing)) if *existing == value => return,
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((name, value)),
        }
        self.forget_start_tag();
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        let pos = self.attributes.iter().position(|(k, _)| k == name)?;
        self.forget_start_tag();
        Some(self.attributes.remove(pos).1)
    }

    fn forget_start_tag(&mut self) {
        self.raw_start = None;
    }

    /// Child elements in document order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    pub fn has_element_children(&self) -> bool {
        self.children.iter().any(|n| matches!(n, Node::Element(_)))
    }

    /// The element's own character data: direct text and CDATA children,
    /// each trimmed, joined by single spaces. `None` when blank.
    pub fn text(&self) -> Option<String> {
        let parts: Vec<String> = self
            .children
            .iter()
            .filter_map(Node::text_value)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }

    /// Replace the element's own character data.
    ///
    /// `value` is matched against the text runs as [`Element::text`] joins
    /// them. Leading and trailing runs it still starts or ends with are left
    /// untouched; the changed words go into the runs between them, so text
    /// stays on its side of any child element. Whitespace around each run is
    /// preserved and child elements keep their indices.
    pub fn set_text(&mut self, value: &str) {
        let value = value.trim();
        let runs: Vec<(usize, String)> = self
            .children
            .iter()
            .enumerate()
            .filter_map(|(i, n)| n.text_value().map(|t| (i, t.trim().to_string())))
            .filter(|(_, t)| !t.is_empty())
            .collect();

        if runs.is_empty() {
            if value.is_empty() {
                return;
            }
            if !self.has_element_children() {
                self.children
                    .retain(|n| !matches!(n, Node::Text(_) | Node::CData(_)));
                self.children.insert(0, Node::text(value));
            } else if let Some(Node::Text(raw)) = self.children.first_mut() {
                *raw = format!("{}{raw}", partial_escape(value));
            } else {
                self.children.push(Node::text(value));
            }
            return;
        }

        let mut rest = value;
        let mut head = 0;
        while let Some(r) = runs.get(head).and_then(|(_, run)| strip_words_prefix(rest, run)) {
            rest = r;
            head += 1;
        }
        let mut tail = runs.len();
        while tail > head {
            match strip_words_suffix(rest, &runs[tail - 1].1) {
                Some(r) => {
                    rest = r;
                    tail -= 1;
                }
                None => break,
            }
        }

        if head == tail {
            // Only words between two untouched runs were added.
            if rest.is_empty() {
                return;
            }
            match head.checked_sub(1) {
                Some(before) => {
                    let joined = format!("{} {rest}", runs[before].1);
                    self.set_run(runs[before].0, &joined);
                }
                None => {
                    let joined = format!("{rest} {}", runs[head].1);
                    self.set_run(runs[head].0, &joined);
                }
            }
            return;
        }

        self.set_run(runs[head].0, rest);
        for &(index, _) in &runs[head + 1..tail] {
            self.set_run(index, "");
        }
    }

    /// Replace the text of child `index`, keeping the whitespace around it.
    fn set_run(&mut self, index: usize, value: &str) {
        let (lead, trail) = match &self.children[index] {
            Node::Text(raw) => (leading_ws(raw).to_string(), trailing_ws(raw).to_string()),
            _ => (String::new(), String::new()),
        };
        self.children[index] = if value.is_empty() {
            Node::Text(if trail.is_empty() { lead } else { trail })
        } else {
            Node::Text(format!("{lead}{}{trail}", partial_escape(value)))
        };
    }

    /// Serialize this element (and its subtree) on its own.
    pub fn to_xml(&self) -> Result<String, SerializationError> {
        writer::write_element_string(self)
    }
}

/// `rest` without the leading words of `run`.
fn strip_words_prefix<'a>(rest: &'a str, run: &str) -> Option<&'a str> {
    if rest == run {
        return Some("");
    }
    rest.strip_prefix(run)?.strip_prefix(' ')
}

/// `rest` without the trailing words of `run`.
fn strip_words_suffix<'a>(rest: &'a str, run: &str) -> Option<&'a str> {
    if rest == run {
        return Some("");
    }
    rest.strip_suffix(run)?.strip_suffix(' ')
}

fn leading_ws(s: &str) -> &str {
    &s[..s.len() - s.trim_start().len()]
}

fn trailing_ws(s: &str) -> &str {
    &s[s.trim_end().len()..]
}

pub(crate) fn unescape_lossy(raw: &str) -> String {
    unescape(raw)
        .map(|v| v.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}
