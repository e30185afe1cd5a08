//! A minimal XML tree with canonical, pretty-printed output.
//!
//! Namespace declarations come first on an element (default namespace, then
//! prefixes in the order given), followed by the attributes sorted by name.
//! Empty elements are written as `<name/>`, children are indented by two
//! spaces and every element ends its line.

use std::collections::BTreeMap;

/// Declaration line written on top of standalone XML documents.
pub const XML_DECLARATION: &str = "<?xml version='1.0' encoding='utf-8'?>";

/// One XML element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    namespaces: Vec<(Option<String>, String)>,
    attributes: BTreeMap<String, String>,
    text: Option<String>,
    children: Vec<Element>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespaces: Vec::new(),
            attributes: BTreeMap::new(),
            text: None,
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declare a namespace on this element; `None` is the default namespace.
    pub fn with_namespace(mut self, prefix: Option<&str>, url: impl Into<String>) -> Self {
        self.namespaces.push((prefix.map(str::to_string), url.into()));
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn push(&mut self, child: Element) {
        self.children.push(child);
    }

    /// Render this element and its subtree, ending with a newline.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.write(&mut out, 0);
        out
    }

    /// Render with the XML declaration on the first line.
    pub fn render_document(&self) -> String {
        format!("{XML_DECLARATION}\n{}", self.render())
    }

    fn write(&self, out: &mut String, depth: usize) {
        let indent = "  ".repeat(depth);
        out.push_str(&indent);
        out.push('<');
        out.push_str(&self.name);

        // Default namespace first.
        let (defaults, prefixed): (Vec<_>, Vec<_>) =
            self.namespaces.iter().partition(|(prefix, _)| prefix.is_none());
        for (prefix, url) in defaults.into_iter().chain(prefixed) {
            match prefix {
                Some(prefix) => out.push_str(&format!(" xmlns:{prefix}=\"{}\"", escape_attribute(url))),
                None => out.push_str(&format!(" xmlns=\"{}\"", escape_attribute(url))),
            }
        }
        for (name, value) in &self.attributes {
            out.push_str(&format!(" {name}=\"{}\"", escape_attribute(value)));
        }

        match (&self.text, self.children.is_empty()) {
            (None, true) => out.push_str("/>\n"),
            (Some(text), true) => {
                out.push('>');
                out.push_str(&escape_text(text));
                out.push_str(&format!("</{}>\n", self.name));
            }
            (text, false) => {
                out.push('>');
                if let Some(text) = text {
                    out.push_str(&escape_text(text));
                }
                out.push('\n');
                for child in &self.children {
                    child.write(out, depth + 1);
                }
                out.push_str(&indent);
                out.push_str(&format!("</{}>\n", self.name));
            }
        }
    }
}

/// Escape text content.
pub fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Escape an attribute value for double quotes.
pub fn escape_attribute(value: &str) -> String {
    escape_text(value)
        .replace('"', "&quot;")
        .replace('\t', "&#9;")
        .replace('\n', "&#10;")
        .replace('\r', "&#13;")
}
