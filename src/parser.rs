//! SOAP response parsing.
//!
//! Uses quick-xml, which does not expand external entities. Documents carrying
//! a DOCTYPE are refused outright.

use crate::error::{FfiecError, SoapFault};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// SOAP 1.1 envelope namespace.
pub const SOAP_11_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// A parsed element, keyed by local name. Namespaces are dropped: the
/// service's responses use a single target namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    /// Local name
    pub name: String,
    /// Concatenated text and CDATA content directly inside this element
    pub text: String,
    /// Child elements in document order
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    fn new(name: String) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    /// First child with the given local name.
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Text of the first child with the given local name.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(|c| c.text.as_str())
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// All text in this element and its descendants, in document order.
    pub fn deep_text(&self) -> String {
        let mut out = self.text.clone();
        for child in &self.children {
            let text = child.deep_text();
            if !text.is_empty() {
                if !out.is_empty() {
                    out.push(' ');
                }
                out.push_str(&text);
            }
        }
        out
    }
}

/// Parse raw bytes into an element tree rooted at the document element.
pub fn parse_document(data: &[u8]) -> Result<XmlElement, FfiecError> {
    let xml_str = std::str::from_utf8(data)
        .map_err(|e| FfiecError::XmlParse(format!("Invalid UTF-8: {}", e)))?;

    let mut reader = Reader::from_str(xml_str);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                stack.push(XmlElement::new(local_name_str(e)));
            }

            Ok(Event::Empty(ref e)) => {
                attach(&mut stack, &mut root, XmlElement::new(local_name_str(e)))?;
            }

            Ok(Event::End(_)) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| FfiecError::XmlParse("Unbalanced end tag".to_string()))?;
                attach(&mut stack, &mut root, element)?;
            }

            Ok(Event::Text(ref e)) => {
                if let Some(current) = stack.last_mut() {
                    let text = e
                        .unescape()
                        .map_err(|e| FfiecError::XmlParse(e.to_string()))?;
                    current.text.push_str(&text);
                }
            }

            Ok(Event::CData(ref e)) => {
                if let Some(current) = stack.last_mut() {
                    let raw = e.clone().into_inner();
                    let text = std::str::from_utf8(&raw)
                        .map_err(|e| FfiecError::XmlParse(format!("Invalid UTF-8: {}", e)))?;
                    current.text.push_str(text);
                }
            }

            Ok(Event::DocType(_)) => {
                return Err(FfiecError::XmlParse(
                    "DOCTYPE declarations are not allowed".to_string(),
                ));
            }

            Ok(Event::Eof) => break,

            Err(e) => {
                return Err(FfiecError::XmlParse(format!(
                    "Error at position {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }

            _ => {}
        }

        buf.clear();
    }

    if !stack.is_empty() {
        return Err(FfiecError::XmlParse("Unexpected end of document".to_string()));
    }

    root.ok_or_else(|| FfiecError::XmlParse("Empty document".to_string()))
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<(), FfiecError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => {
            return Err(FfiecError::XmlParse(
                "Multiple document elements".to_string(),
            ))
        }
    }
    Ok(())
}

/// Extract the `<{operation}Result>` element from a response envelope.
///
/// A Fault in the body becomes [`FfiecError::Fault`]. A response element
/// without a result (the service omits nil results) yields an empty element.
pub fn parse_operation_result(data: &[u8], operation: &str) -> Result<XmlElement, FfiecError> {
    let envelope = parse_document(data)?;
    if envelope.name != "Envelope" {
        return Err(FfiecError::UnexpectedResponse(format!(
            "Expected SOAP Envelope, found <{}>",
            envelope.name
        )));
    }

    let body = envelope.child("Body").ok_or_else(|| {
        FfiecError::UnexpectedResponse("SOAP Envelope has no Body".to_string())
    })?;

    if let Some(fault) = body.child("Fault") {
        return Err(FfiecError::Fault(parse_fault(fault)));
    }

    let response_name = format!("{}Response", operation);
    let response = body.child(&response_name).ok_or_else(|| {
        FfiecError::UnexpectedResponse(format!("Missing <{}> in SOAP Body", response_name))
    })?;

    let result_name = format!("{}Result", operation);
    Ok(response
        .child(&result_name)
        .cloned()
        .unwrap_or_else(|| XmlElement::new(result_name)))
}

fn parse_fault(fault: &XmlElement) -> SoapFault {
    SoapFault {
        detail: fault
            .child("detail")
            .map(XmlElement::deep_text)
            .filter(|text| !text.is_empty()),
        ..SoapFault::new(
            fault.child_text("faultcode").unwrap_or_default(),
            fault.child_text("faultstring").unwrap_or_default(),
        )
    }
}

/// Extract local name from element.
fn local_name_str(e: &BytesStart) -> String {
    let name = e.local_name();
    std::str::from_utf8(name.as_ref())
        .unwrap_or("")
        .to_string()
}
