//! Owned element tree built from `quick-xml` pull events
//!
//! The header schema is small and queried repeatedly (descendants by tag
//! name, attributes by key), so the sanitized text is materialized once
//! into a lightweight tree instead of being re-streamed for every query.
//! Text nodes are not kept: everything the reader needs lives in
//! attributes.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::MetadataError;

/// One XML element with its attributes and child elements
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlElement {
    /// Tag name
    pub name: String,
    /// Attributes in document order
    pub attributes: Vec<(String, String)>,
    /// Child elements in document order
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    /// Look up an attribute value by key
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Parse an attribute into any `FromStr` type
    ///
    /// Returns `Ok(None)` when the attribute is absent and an error when it
    /// is present but unparsable.
    pub fn parse_attribute<T: std::str::FromStr>(
        &self,
        key: &str,
    ) -> Result<Option<T>, MetadataError> {
        match self.attribute(key) {
            None => Ok(None),
            Some(raw) => raw.trim().parse().map(Some).map_err(|_| {
                MetadataError::InvalidAttributeValue(format!(
                    "{}/@{} = {:?}",
                    self.name, key, raw
                ))
            }),
        }
    }

    /// Like [`parse_attribute`](Self::parse_attribute) but the attribute must exist
    pub fn require_attribute<T: std::str::FromStr>(&self, key: &str) -> Result<T, MetadataError> {
        self.parse_attribute(key)?
            .ok_or_else(|| MetadataError::MissingAttribute(format!("{}/@{}", self.name, key)))
    }

    /// All descendants (excluding `self`) with the given tag name, in document order
    pub fn descendants<'a, 'n>(&'a self, name: &'n str) -> Descendants<'a, 'n> {
        Descendants {
            stack: self.children.iter().rev().collect(),
            name,
        }
    }

    /// First descendant with the given tag name
    pub fn first_descendant(&self, name: &str) -> Option<&XmlElement> {
        self.descendants(name).next()
    }

    /// Detach every descendant with the given tag name and return them in document order
    pub fn remove_descendants(&mut self, name: &str) -> Vec<XmlElement> {
        let mut removed = Vec::new();
        self.remove_into(name, &mut removed);
        removed
    }

    fn remove_into(&mut self, name: &str, removed: &mut Vec<XmlElement>) {
        let children = std::mem::take(&mut self.children);
        for mut child in children {
            if child.name == name {
                removed.push(child);
            } else {
                child.remove_into(name, removed);
                self.children.push(child);
            }
        }
    }

    /// Parse a complete document and return its root element
    pub fn parse_document(text: &str) -> Result<XmlElement, MetadataError> {
        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            match reader.read_event()? {
                Event::Start(ref e) => {
                    stack.push(element_from_start(e)?);
                }
                Event::Empty(ref e) => {
                    let element = element_from_start(e)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = stack.pop().ok_or_else(|| {
                        MetadataError::InvalidStructure("unexpected closing tag".to_string())
                    })?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(open) = stack.last() {
            return Err(MetadataError::InvalidStructure(format!(
                "element <{}> is never closed",
                open.name
            )));
        }
        root.ok_or_else(|| MetadataError::InvalidStructure("document has no root element".to_string()))
    }
}

/// Iterator over descendants with a given tag name, depth-first pre-order
pub struct Descendants<'a, 'n> {
    stack: Vec<&'a XmlElement>,
    name: &'n str,
}

impl<'a> Iterator for Descendants<'a, '_> {
    type Item = &'a XmlElement;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.stack.pop() {
            self.stack.extend(node.children.iter().rev());
            if node.name == self.name {
                return Some(node);
            }
        }
        None
    }
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<(), MetadataError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => {
            return Err(MetadataError::InvalidStructure(format!(
                "second root element <{}>",
                element.name
            )))
        }
    }
    Ok(())
}

fn element_from_start(e: &BytesStart) -> Result<XmlElement, MetadataError> {
    let name = std::str::from_utf8(e.name().as_ref())
        .map_err(|err| MetadataError::InvalidStructure(format!("tag name: {}", err)))?
        .to_string();

    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|e| MetadataError::XmlError(quick_xml::Error::from(e)))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|err| MetadataError::InvalidStructure(format!("attribute key: {}", err)))?
            .to_string();
        let raw = std::str::from_utf8(&attr.value)
            .map_err(|err| MetadataError::InvalidStructure(format!("attribute value: {}", err)))?;
        let value = quick_xml::escape::unescape(raw)
            .map_err(|e| MetadataError::XmlError(quick_xml::Error::from(e)))?
            .into_owned();
        attributes.push((key, value));
    }

    Ok(XmlElement {
        name,
        attributes,
        children: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<?xml version="1.0"?>
<Root Version="2">
  <A Name="a1"><B Id="1"/><A Name="a2"><B Id="2"/></A></A>
  <B Id="3"/>
</Root>"#;

    #[test]
    fn test_descendants_in_document_order() {
        let root = XmlElement::parse_document(DOC).unwrap();
        assert_eq!(root.name, "Root");
        assert_eq!(root.attribute("Version"), Some("2"));

        let ids: Vec<_> = root
            .descendants("B")
            .map(|b| b.attribute("Id").unwrap())
            .collect();
        assert_eq!(ids, vec!["1", "2", "3"]);

        let names: Vec<_> = root
            .descendants("A")
            .map(|a| a.attribute("Name").unwrap())
            .collect();
        assert_eq!(names, vec!["a1", "a2"]);
    }

    #[test]
    fn test_found_element_outlives_tag_name() {
        let root = XmlElement::parse_document(DOC).unwrap();
        let found = {
            let name = String::from("B");
            root.first_descendant(&name)
        };
        assert_eq!(found.and_then(|b| b.attribute("Id")), Some("1"));
    }

    #[test]
    fn test_remove_descendants() {
        let mut root = XmlElement::parse_document(DOC).unwrap();
        let removed = root.remove_descendants("B");
        assert_eq!(removed.len(), 3);
        assert!(root.first_descendant("B").is_none());
        assert_eq!(root.descendants("A").count(), 2);
    }

    #[test]
    fn test_attribute_parsing() {
        let root = XmlElement::parse_document(r#"<X N="12" F="1.5" Bad="z"/>"#).unwrap();
        assert_eq!(root.require_attribute::<u32>("N").unwrap(), 12);
        assert_eq!(root.parse_attribute::<f64>("F").unwrap(), Some(1.5));
        assert_eq!(root.parse_attribute::<u32>("Missing").unwrap(), None);
        assert!(matches!(
            root.parse_attribute::<u32>("Bad"),
            Err(MetadataError::InvalidAttributeValue(_))
        ));
        assert!(matches!(
            root.require_attribute::<u32>("Missing"),
            Err(MetadataError::MissingAttribute(_))
        ));
    }

    #[test]
    fn test_escaped_attribute() {
        let root = XmlElement::parse_document(r#"<X Name="a &amp; b"/>"#).unwrap();
        assert_eq!(root.attribute("Name"), Some("a & b"));
    }

    #[test]
    fn test_malformed_documents() {
        assert!(XmlElement::parse_document("<A><B></A>").is_err());
        assert!(XmlElement::parse_document("<A>").is_err());
        assert!(XmlElement::parse_document("").is_err());
        assert!(XmlElement::parse_document("<A/><B/>").is_err());
    }
}
