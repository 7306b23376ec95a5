//! Document serializer: the inverse of the loader for untouched trees.

use std::fmt::Write as _;

use quick_xml::escape::escape;

use crate::document::{Document, Element, Misc, Node};
use crate::error::SerializationError;

pub(crate) fn write_document(doc: &Document) -> Result<String, SerializationError> {
    let mut out = String::new();
    if doc.bom {
        out.push('\u{feff}');
    }
    for item in &doc.prolog {
        write_misc(item, &mut out);
    }
    write_element(&doc.root, &mut out)?;
    for item in &doc.epilog {
        write_misc(item, &mut out);
    }
    Ok(out)
}

pub(crate) fn write_element_string(element: &Element) -> Result<String, SerializationError> {
    let mut out = String::new();
    write_element(element, &mut out)?;
    Ok(out)
}

fn write_misc(item: &Misc, out: &mut String) {
    match item {
        Misc::Declaration(raw) | Misc::ProcessingInstruction(raw) => {
            let _ = write!(out, "<?{raw}?>");
        }
        Misc::DocType(raw) => {
            let _ = write!(out, "<!{raw}>");
        }
        Misc::Comment(raw) => {
            let _ = write!(out, "<!--{raw}-->");
        }
        Misc::Whitespace(raw) => out.push_str(raw),
    }
}

fn write_element(element: &Element, out: &mut String) -> Result<(), SerializationError> {
    let name = element.name();
    check_name(name, name)?;

    out.push('<');
    match &element.raw_start {
        Some(start) => out.push_str(start),
        None => {
            out.push_str(name);
            for (key, value) in element.attributes() {
                check_name(name, key)?;
                let _ = write!(out, " {key}=\"{}\"", escape(value.as_str()));
            }
        }
    }

    if element.children.is_empty() && element.self_closing {
        out.push_str("/>");
        return Ok(());
    }
    out.push('>');

    for child in &element.children {
        match child {
            Node::Element(e) => write_element(e, out)?,
            Node::Text(raw) => out.push_str(raw),
            Node::CData(raw) => {
                if raw.contains("]]>") {
                    return Err(SerializationError::new(name, "CDATA content contains ']]>'"));
                }
                let _ = write!(out, "<![CDATA[{raw}]]>");
            }
            Node::Comment(raw) => {
                if raw.contains("--") {
                    return Err(SerializationError::new(name, "comment contains '--'"));
                }
                let _ = write!(out, "<!--{raw}-->");
            }
            Node::ProcessingInstruction(raw) => {
                if raw.contains("?>") {
                    return Err(SerializationError::new(name, "processing instruction contains '?>'"));
                }
                let _ = write!(out, "<?{raw}?>");
            }
        }
    }

    let _ = write!(out, "</{name}>");
    Ok(())
}

fn check_name(element: &str, name: &str) -> Result<(), SerializationError> {
    let valid = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit() || c == '-' || c == '.')
        && !name
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '<' | '>' | '&' | '"' | '\'' | '/' | '=' | '?' | '!'));
    if valid {
        Ok(())
    } else {
        Err(SerializationError::new(element, format!("invalid name {name:?}")))
    }
}

#[cfg(test)]
mod tests {
    use crate::document::{Document, Element, Node};
    use proptest::prelude::*;

    const SAMPLE: &str = "\u{feff}<?xml version='1.0' encoding=\"UTF-8\"?>\r\n\
        <!DOCTYPE catalog>\r\n\
        <!-- generated -->\r\n\
        <catalog  xmlns:x=\"urn:x\">\r\n\
        \t<tool name='Julia' x:kind=\"lang\" >\r\n\
        \t\t<version>1.9</version>\r\n\
        \t\t<desc><![CDATA[fast & <dynamic>]]> &amp; friendly</desc>\r\n\
        \t\t<empty />\r\n\
        \t\t<?render inline?>\r\n\
        \t</tool>\r\n\
        </catalog>\r\n\
        <!-- end -->";

    #[test]
    fn untouched_documents_round_trip_exactly() {
        let doc = Document::parse(SAMPLE).unwrap();
        assert_eq!(doc.to_xml().unwrap(), SAMPLE);
    }

    #[test]
    fn doctype_spelling_round_trips() {
        for source in [
            "<!DOCTYPE  catalog>\n<catalog/>",
            "<!doctype catalog>\n<catalog/>",
            "<!DOCTYPE\ncatalog>\n<catalog/>",
            "<?xml version=\"1.0\"?>\n<!DOCTYPE catalog SYSTEM \"catalog.dtd\">\n<catalog/>\n",
        ] {
            let mut doc = Document::parse(source).unwrap();
            assert_eq!(doc.to_xml().unwrap(), source);
            doc.root.set_attribute("v", "2");
            let edited = doc.to_xml().unwrap();
            assert!(edited.starts_with(&source[..source.find('>').unwrap() + 1]), "{edited}");
        }
    }

    #[test]
    fn edits_only_disturb_touched_markup() {
        let mut doc = Document::parse(SAMPLE).unwrap();
        let tool = doc.root.children.iter_mut().find_map(Node::as_element_mut).unwrap();
        tool.set_attribute("name", "Rust");
        let out = doc.to_xml().unwrap();
        assert!(out.contains("<tool name=\"Rust\" x:kind=\"lang\">"));
        assert!(out.contains("<empty />"));
        assert!(out.contains("<?render inline?>"));
    }

    #[test]
    fn invalid_names_fail_serialization() {
        let el = Element::new("tool").with_attribute("bad name", "x");
        let err = el.to_xml().unwrap_err();
        assert_eq!(err.element, "tool");

        assert!(Element::new("").to_xml().is_err());
        assert!(Element::new("1st").to_xml().is_err());
    }

    #[test]
    fn constructed_comments_are_validated() {
        let mut el = Element::new("a");
        el.children.push(Node::Comment("a -- b".into()));
        assert!(el.to_xml().is_err());
    }

    fn attrs() -> impl Strategy<Value = String> {
        prop::collection::btree_map("[a-z]{1,4}", "[a-zA-Z0-9 ]{0,8}", 0..3).prop_map(|map| {
            map.iter().map(|(k, v)| format!(" {k}=\"{v}\"")).collect()
        })
    }

    fn element() -> impl Strategy<Value = String> {
        let leaf = ("[a-z]{1,6}", attrs(), "[a-zA-Z0-9 .]{0,10}").prop_map(|(name, attrs, text)| {
            if text.is_empty() {
                format!("<{name}{attrs}/>")
            } else {
                format!("<{name}{attrs}>{text}</{name}>")
            }
        });
        leaf.prop_recursive(3, 24, 4, |inner| {
            ("[a-z]{1,6}", attrs(), prop::collection::vec(inner, 0..4), "[ \n\t]{0,3}").prop_map(
                |(name, attrs, kids, ws)| {
                    let body: String = kids.iter().map(|k| format!("{ws}{k}")).collect();
                    format!("<{name}{attrs}>{body}{ws}</{name}>")
                },
            )
        })
    }

    proptest! {
        #[test]
        fn generated_documents_round_trip(root in element()) {
            let source = format!("<?xml version=\"1.0\"?>\n{root}\n");
            let doc = Document::parse(&source).unwrap();
            prop_assert_eq!(doc.to_xml().unwrap(), source);
        }
    }
}
