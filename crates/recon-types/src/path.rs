//! Location paths: XPath-like element addresses.
//!
//! `/` addresses the root element. Every other path is a sequence of
//! `/segment` steps below the root, where a segment is `tag`, `tag[N]`
//! (1-based among same-tag siblings) or `tag[@attr='value']`. A final
//! `/@attr` step addresses a single attribute of the element reached by the
//! preceding steps.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{TypeError, TypeResult};

/// The address of an element (or one of its attributes) within a document.
///
/// Stored in its textual form so that hand-edited values read back from a
/// change file survive until they are resolved; call [`LocationPath::parse`]
/// to validate.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationPath(String);

impl LocationPath {
    /// The path of the document root element.
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// Wrap an already formatted path.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Extend this path by one element step.
    pub fn child(&self, segment: &Segment) -> Self {
        if self.is_root() {
            Self(format!("/{segment}"))
        } else {
            Self(format!("{}/{segment}", self.0))
        }
    }

    /// Address the attribute `name` of the element at this path.
    pub fn attribute(&self, name: &str) -> Self {
        if self.is_root() {
            Self(format!("/@{name}"))
        } else {
            Self(format!("{}/@{name}", self.0))
        }
    }

    /// Parse the textual form into steps.
    pub fn parse(&self) -> TypeResult<ParsedPath> {
        ParsedPath::parse(&self.0)
    }
}

impl fmt::Display for LocationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LocationPath {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for LocationPath {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

/// A validated location path.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedPath {
    /// Element steps below the root, outermost first.
    pub segments: Vec<Segment>,
    /// Trailing attribute step, if any.
    pub attribute: Option<String>,
}

impl ParsedPath {
    pub fn parse(raw: &str) -> TypeResult<Self> {
        let invalid = |reason: &str| TypeError::InvalidPath {
            path: raw.to_string(),
            reason: reason.to_string(),
        };

        let body = raw
            .trim()
            .strip_prefix('/')
            .ok_or_else(|| invalid("must start with '/'"))?;

        let mut parsed = ParsedPath::default();
        if body.is_empty() {
            return Ok(parsed);
        }

        let parts = split_segments(body).map_err(invalid)?;
        let last = parts.len() - 1;
        for (i, part) in parts.into_iter().enumerate() {
            if let Some(attr) = part.strip_prefix('@') {
                if i != last {
                    return Err(invalid("attribute step must be last"));
                }
                if attr.is_empty() {
                    return Err(invalid("empty attribute name"));
                }
                parsed.attribute = Some(attr.to_string());
            } else {
                parsed.segments.push(Segment::parse(part).map_err(invalid)?);
            }
        }
        Ok(parsed)
    }

    /// Returns `true` if this addresses the root element itself.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty() && self.attribute.is_none()
    }

    /// The element path, with any attribute step removed.
    pub fn element_path(&self) -> LocationPath {
        self.segments
            .iter()
            .fold(LocationPath::root(), |path, segment| path.child(segment))
    }

    /// The last element step.
    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// Steps leading to the parent of the addressed element.
    pub fn parent_segments(&self) -> &[Segment] {
        match self.segments.split_last() {
            Some((_, parent)) => parent,
            None => &[],
        }
    }
}

fn split_segments(body: &str) -> Result<Vec<&str>, &'static str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for (i, c) in body.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '\'' | '"' if depth > 0 => quote = Some(c),
                '[' => depth += 1,
                ']' => {
                    if depth == 0 {
                        return Err("unbalanced ']'");
                    }
                    depth -= 1;
                }
                '/' if depth == 0 => {
                    parts.push(&body[start..i]);
                    start = i + 1;
                }
                _ => {}
            },
        }
    }

    if quote.is_some() {
        return Err("unterminated quote");
    }
    if depth != 0 {
        return Err("unterminated '['");
    }
    parts.push(&body[start..]);
    if parts.iter().any(|p| p.is_empty()) {
        return Err("empty segment");
    }
    Ok(parts)
}

/// How a step picks one element among same-tag siblings.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Selector {
    /// The tag is unique among siblings.
    Only,
    /// 1-based occurrence among same-tag siblings.
    Index(usize),
    /// The sibling whose identifying attribute has this value.
    Key { attr: String, value: String },
}

/// One element step of a location path.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Segment {
    pub tag: String,
    pub selector: Selector,
}

impl Segment {
    pub fn only(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            selector: Selector::Only,
        }
    }

    pub fn index(tag: impl Into<String>, position: usize) -> Self {
        Self {
            tag: tag.into(),
            selector: Selector::Index(position),
        }
    }

    pub fn key(tag: impl Into<String>, attr: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            selector: Selector::Key {
                attr: attr.into(),
                value: value.into(),
            },
        }
    }

    fn parse(part: &str) -> Result<Self, &'static str> {
        let Some(open) = part.find('[') else {
            return Ok(Self::only(part));
        };

        let tag = &part[..open];
        if tag.is_empty() {
            return Err("missing tag before '['");
        }
        let inner = part[open + 1..]
            .strip_suffix(']')
            .ok_or("selector must end with ']'")?;

        if let Some(key) = inner.strip_prefix('@') {
            let (attr, quoted) = key.split_once('=').ok_or("expected '=' in key selector")?;
            let attr = attr.trim();
            if attr.is_empty() {
                return Err("empty key attribute");
            }
            Ok(Self::key(tag, attr, unquote(quoted.trim())?))
        } else {
            let position: usize = inner.trim().parse().map_err(|_| "invalid position")?;
            if position == 0 {
                return Err("positions are 1-based");
            }
            Ok(Self::index(tag, position))
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.selector {
            Selector::Only => f.write_str(&self.tag),
            Selector::Index(n) => write!(f, "{}[{n}]", self.tag),
            Selector::Key { attr, value } => write!(f, "{}[@{attr}={}]", self.tag, quote(value)),
        }
    }
}

/// Quote a key value. Single quotes are preferred; the entity form is the
/// last resort and escapes `&` so that every entity in it decodes back.
fn quote(value: &str) -> String {
    let entity_like = value.contains("&apos;") || value.contains("&amp;");
    if !value.contains('\'') && !entity_like {
        format!("'{value}'")
    } else if !value.contains('"') {
        format!("\"{value}\"")
    } else {
        format!("'{}'", value.replace('&', "&amp;").replace('\'', "&apos;"))
    }
}

fn unquote(quoted: &str) -> Result<String, &'static str> {
    let mut chars = quoted.chars();
    let (Some(open), Some(close)) = (chars.next(), chars.next_back()) else {
        return Err("key value must be quoted");
    };
    if open != close || !(open == '\'' || open == '"') {
        return Err("key value must be quoted");
    }
    let inner = &quoted[1..quoted.len() - 1];
    Ok(if open == '\'' {
        decode_entities(inner)
    } else {
        inner.to_string()
    })
}

fn decode_entities(inner: &str) -> String {
    let mut out = String::with_capacity(inner.len());
    let mut rest = inner;
    while let Some(at) = rest.find('&') {
        out.push_str(&rest[..at]);
        rest = &rest[at..];
        if let Some(after) = rest.strip_prefix("&apos;") {
            out.push('\'');
            rest = after;
        } else if let Some(after) = rest.strip_prefix("&amp;") {
            out.push('&');
            rest = after;
        } else {
            out.push('&');
            rest = &rest[1..];
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn root_path() {
        let root = LocationPath::root();
        assert!(root.is_root());
        assert!(root.parse().unwrap().is_root());
        assert_eq!(root.child(&Segment::only("version")).as_str(), "/version");
    }

    #[test]
    fn builds_nested_paths() {
        let path = LocationPath::root()
            .child(&Segment::only("tools"))
            .child(&Segment::key("tool", "name", "Julia"))
            .child(&Segment::index("note", 2));
        assert_eq!(path.as_str(), "/tools/tool[@name='Julia']/note[2]");
        assert_eq!(path.attribute("lang").as_str(), "/tools/tool[@name='Julia']/note[2]/@lang");
    }

    #[test]
    fn parses_every_selector_kind() {
        let parsed = LocationPath::new("/tools/tool[@name='Julia']/note[2]/@lang")
            .parse()
            .unwrap();
        assert_eq!(
            parsed.segments,
            vec![
                Segment::only("tools"),
                Segment::key("tool", "name", "Julia"),
                Segment::index("note", 2),
            ]
        );
        assert_eq!(parsed.attribute.as_deref(), Some("lang"));
        assert_eq!(parsed.element_path().as_str(), "/tools/tool[@name='Julia']/note[2]");
        assert_eq!(parsed.parent_segments().len(), 2);
    }

    #[test]
    fn slashes_inside_key_values_are_not_separators() {
        let parsed = LocationPath::new("/links/link[@id='a/b']/title").parse().unwrap();
        assert_eq!(parsed.segments.len(), 2);
        assert_eq!(parsed.segments[0], Segment::key("link", "id", "a/b"));
    }

    #[test]
    fn quotes_in_values_pick_the_other_delimiter() {
        let seg = Segment::key("item", "name", "it's");
        assert_eq!(seg.to_string(), "item[@name=\"it's\"]");

        let both = Segment::key("item", "name", "it's \"x\"");
        assert_eq!(both.to_string(), "item[@name='it&apos;s \"x\"']");
        let parsed = LocationPath::root().child(&both).parse().unwrap();
        assert_eq!(parsed.segments[0], both);
    }

    #[test]
    fn entity_text_in_values_is_not_decoded_away() {
        for value in ["a&apos;b", "R&amp;D", "it's &apos;\"x\"", "R&D"] {
            let seg = Segment::key("item", "name", value);
            let parsed = LocationPath::root().child(&seg).parse().unwrap();
            assert_eq!(parsed.segments[0], seg, "{value:?}");
        }
        assert_eq!(Segment::key("item", "name", "R&D").to_string(), "item[@name='R&D']");
        assert_eq!(Segment::key("item", "name", "a&apos;b").to_string(), "item[@name=\"a&apos;b\"]");
    }

    #[test]
    fn rejects_malformed_paths() {
        for raw in ["", "version", "/a//b", "/a[0]", "/a[x]", "/a[@k=v]", "/a[@k='v", "/@x/a", "/[1]"] {
            assert!(LocationPath::new(raw).parse().is_err(), "{raw:?} should be rejected");
        }
    }

    proptest! {
        #[test]
        fn key_segments_survive_formatting(value in "([ -~]|&apos;|&amp;){0,24}") {
            let seg = Segment::key("tool", "name", value);
            let parsed = LocationPath::root().child(&seg).parse().unwrap();
            prop_assert_eq!(&parsed.segments[0], &seg);
        }
    }
}
