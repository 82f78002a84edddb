//! Owned XML element tree with quick-xml parse/serialize.

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use super::XmlError;

/// A parsed XML document: optional declaration plus the root element.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    has_decl: bool,
    pub root: XmlElement,
}

/// One element: qualified name, attributes in document order, children.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

/// A child node of an element.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
    CData(String),
    Comment(String),
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Local part of the qualified name (`bpmn:task` → `task`).
    pub fn local_name(&self) -> &str {
        match self.name.rsplit_once(':') {
            Some((_, local)) => local,
            None => &self.name,
        }
    }

    /// Child elements in document order.
    pub fn child_elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(el) => Some(el),
            _ => None,
        })
    }
}

impl XmlDocument {
    /// Parse a document from its textual form.
    pub fn parse(input: &str) -> Result<Self, XmlError> {
        let mut reader = Reader::from_str(input);
        reader.config_mut().trim_text(true);

        let mut has_decl = false;
        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Decl(_)) => has_decl = true,
                Ok(Event::Start(start)) => {
                    stack.push(element_from_start(&start)?);
                }
                Ok(Event::Empty(start)) => {
                    let element = element_from_start(&start)?;
                    place(&mut stack, &mut root, XmlNode::Element(element))?;
                }
                Ok(Event::End(_)) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| XmlError::Parse("unbalanced end tag".to_string()))?;
                    place(&mut stack, &mut root, XmlNode::Element(element))?;
                }
                Ok(Event::Text(text)) => {
                    let value = text
                        .unescape()
                        .map_err(|e| XmlError::Parse(e.to_string()))?
                        .into_owned();
                    if !value.is_empty() {
                        place(&mut stack, &mut root, XmlNode::Text(value))?;
                    }
                }
                Ok(Event::CData(cdata)) => {
                    let value = String::from_utf8_lossy(cdata.as_ref()).into_owned();
                    place(&mut stack, &mut root, XmlNode::CData(value))?;
                }
                Ok(Event::Comment(comment)) => {
                    let value = String::from_utf8_lossy(comment.as_ref()).into_owned();
                    place(&mut stack, &mut root, XmlNode::Comment(value))?;
                }
                Ok(Event::Eof) => break,
                Ok(_) => continue,
                Err(e) => return Err(XmlError::Parse(e.to_string())),
            }
        }

        if !stack.is_empty() {
            return Err(XmlError::Parse("unclosed element".to_string()));
        }

        match root {
            Some(root) => Ok(Self { has_decl, root }),
            None => Err(XmlError::Parse("document has no root element".to_string())),
        }
    }

    /// Serialize back to text. Element and attribute order are preserved;
    /// insignificant whitespace is not.
    pub fn to_xml(&self) -> Result<String, XmlError> {
        let mut writer = Writer::new(Vec::new());

        if self.has_decl {
            writer
                .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
                .map_err(|e| XmlError::Serialize(e.to_string()))?;
        }
        write_element(&mut writer, &self.root)?;

        String::from_utf8(writer.into_inner()).map_err(|e| XmlError::Serialize(e.to_string()))
    }
}

fn element_from_start(start: &BytesStart<'_>) -> Result<XmlElement, XmlError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut element = XmlElement::new(name);

    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| XmlError::Parse(e.to_string()))?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute
            .unescape_value()
            .map_err(|e| XmlError::Parse(e.to_string()))?
            .into_owned();
        element.attributes.push((key, value));
    }

    Ok(element)
}

/// Attach a completed node to the open element on top of the stack, or make
/// it the document root when the stack is empty.
fn place(
    stack: &mut Vec<XmlElement>,
    root: &mut Option<XmlElement>,
    node: XmlNode,
) -> Result<(), XmlError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
        return Ok(());
    }
    match node {
        XmlNode::Element(element) => {
            if root.is_some() {
                return Err(XmlError::Parse(
                    "document has more than one root element".to_string(),
                ));
            }
            *root = Some(element);
            Ok(())
        }
        // Stray top-level text/comments are dropped.
        _ => Ok(()),
    }
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &XmlElement) -> Result<(), XmlError> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.children.is_empty() {
        return writer
            .write_event(Event::Empty(start))
            .map_err(|e| XmlError::Serialize(e.to_string()));
    }

    writer
        .write_event(Event::Start(start))
        .map_err(|e| XmlError::Serialize(e.to_string()))?;

    for child in &element.children {
        match child {
            XmlNode::Element(el) => write_element(writer, el)?,
            XmlNode::Text(text) => writer
                .write_event(Event::Text(BytesText::new(text)))
                .map_err(|e| XmlError::Serialize(e.to_string()))?,
            XmlNode::CData(data) => writer
                .write_event(Event::CData(BytesCData::new(data)))
                .map_err(|e| XmlError::Serialize(e.to_string()))?,
            XmlNode::Comment(comment) => writer
                .write_event(Event::Comment(BytesText::new(comment)))
                .map_err(|e| XmlError::Serialize(e.to_string()))?,
        }
    }

    writer
        .write_event(Event::End(BytesEnd::new(element.name.as_str())))
        .map_err(|e| XmlError::Serialize(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trip() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?><bpmn:definitions xmlns:bpmn="http://www.omg.org/spec/BPMN/20100524/MODEL"><bpmn:process id="ProcessId-1"><bpmn:task id="node_1" name="Review"/></bpmn:process></bpmn:definitions>"#;
        let doc = XmlDocument::parse(xml).unwrap();
        assert_eq!(doc.root.name, "bpmn:definitions");

        let reparsed = XmlDocument::parse(&doc.to_xml().unwrap()).unwrap();
        assert_eq!(doc, reparsed);
    }

    #[test]
    fn test_attribute_escaping_survives_round_trip() {
        let xml = r#"<a note="x &lt; y &amp; z"><b>1 &amp; 2</b></a>"#;
        let doc = XmlDocument::parse(xml).unwrap();
        assert_eq!(doc.root.attributes[0].1, "x < y & z");

        let reparsed = XmlDocument::parse(&doc.to_xml().unwrap()).unwrap();
        assert_eq!(doc, reparsed);
    }

    #[test]
    fn test_parse_rejects_unclosed_element() {
        assert!(XmlDocument::parse("<a><b></a>").is_err());
    }
}
