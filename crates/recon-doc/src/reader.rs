//! Document loader built on the `quick-xml` event reader.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::document::{Document, Element, Misc, Node};
use crate::error::ParseError;

const BOM: char = '\u{feff}';

pub(crate) fn parse_document(text: &str) -> Result<Document, ParseError> {
    let (bom, body) = match text.strip_prefix(BOM) {
        Some(rest) => (true, rest),
        None => (false, text),
    };

    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(false);

    let mut tree = TreeBuilder::default();

    loop {
        let start = reader.buffer_position() as usize;
        let event = reader
            .read_event()
            .map_err(|e| ParseError::new(reader.buffer_position() as u64, e.to_string()))?;
        let position = reader.buffer_position() as u64;

        match event {
            Event::Start(e) => {
                let element = element_from_start(&e, false, position)?;
                tree.open.push(element);
            }
            Event::Empty(e) => {
                let element = element_from_start(&e, true, position)?;
                tree.attach(element, position)?;
            }
            Event::End(e) => {
                let element = tree.open.pop().ok_or_else(|| {
                    ParseError::new(position, format!("unexpected end tag </{}>", String::from_utf8_lossy(&e)))
                })?;
                tree.attach(element, position)?;
            }
            Event::Text(t) => {
                let raw = utf8(&t, position)?.to_string();
                match tree.open.last_mut() {
                    Some(parent) => parent.children.push(Node::Text(raw)),
                    None if raw.trim().is_empty() => tree.misc(Misc::Whitespace(raw)),
                    None => return Err(ParseError::new(position, "text outside the root element")),
                }
            }
            Event::CData(t) => {
                let raw = utf8(&t, position)?.to_string();
                match tree.open.last_mut() {
                    Some(parent) => parent.children.push(Node::CData(raw)),
                    None => return Err(ParseError::new(position, "CDATA outside the root element")),
                }
            }
            Event::Comment(t) => {
                let raw = utf8(&t, position)?.to_string();
                match tree.open.last_mut() {
                    Some(parent) => parent.children.push(Node::Comment(raw)),
                    None => tree.misc(Misc::Comment(raw)),
                }
            }
            Event::PI(t) => {
                let raw = utf8(&t, position)?.to_string();
                match tree.open.last_mut() {
                    Some(parent) => parent.children.push(Node::ProcessingInstruction(raw)),
                    None => tree.misc(Misc::ProcessingInstruction(raw)),
                }
            }
            Event::Decl(d) => {
                if tree.root.is_some() || !tree.open.is_empty() {
                    return Err(ParseError::new(position, "misplaced XML declaration"));
                }
                tree.prolog.push(Misc::Declaration(utf8(&d, position)?.to_string()));
            }
            Event::DocType(_) => {
                if tree.root.is_some() || !tree.open.is_empty() {
                    return Err(ParseError::new(position, "misplaced DOCTYPE"));
                }
                let markup = bang_markup(body, start, position as usize)
                    .ok_or_else(|| ParseError::new(position, "unreadable DOCTYPE"))?;
                tree.prolog.push(Misc::DocType(markup.to_string()));
            }
            Event::Eof => break,
        }
    }

    let position = reader.buffer_position() as u64;
    if let Some(unclosed) = tree.open.last() {
        return Err(ParseError::new(
            position,
            format!("unclosed element <{}>", unclosed.name()),
        ));
    }
    let root = tree
        .root
        .ok_or_else(|| ParseError::new(position, "document has no root element"))?;

    Ok(Document {
        bom,
        prolog: tree.prolog,
        root,
        epilog: tree.epilog,
    })
}

#[derive(Default)]
struct TreeBuilder {
    open: Vec<Element>,
    root: Option<Element>,
    prolog: Vec<Misc>,
    epilog: Vec<Misc>,
}

impl TreeBuilder {
    fn attach(&mut self, element: Element, position: u64) -> Result<(), ParseError> {
        if let Some(parent) = self.open.last_mut() {
            parent.children.push(Node::Element(element));
            return Ok(());
        }
        if self.root.is_some() {
            return Err(ParseError::new(position, "more than one root element"));
        }
        self.root = Some(element);
        Ok(())
    }

    fn misc(&mut self, item: Misc) {
        if self.root.is_none() {
            self.prolog.push(item);
        } else {
            self.epilog.push(item);
        }
    }
}

fn element_from_start(
    e: &BytesStart<'_>,
    self_closing: bool,
    position: u64,
) -> Result<Element, ParseError> {
    let start = utf8(e, position)?.to_string();
    let name = utf8(e.name().as_ref(), position)?.to_string();

    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| ParseError::new(position, err.to_string()))?;
        let key = utf8(attr.key.as_ref(), position)?.to_string();
        let value = match attr.unescape_value() {
            Ok(v) => v.into_owned(),
            Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
        };
        attributes.push((key, value));
    }

    Ok(Element::from_source(name, attributes, start, self_closing))
}

/// The source text between `<!` and `>` of the declaration read from
/// `body[from..to]`. The event itself normalizes the keyword and the
/// whitespace after it.
fn bang_markup(body: &str, from: usize, to: usize) -> Option<&str> {
    let span = body.get(from..to)?;
    let open = span.find("<!")?;
    span[open + 2..].strip_suffix('>')
}

fn utf8(bytes: &[u8], position: u64) -> Result<&str, ParseError> {
    std::str::from_utf8(bytes).map_err(|_| ParseError::new(position, "invalid UTF-8 in markup"))
}
