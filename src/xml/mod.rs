//! Minimal in-memory XML element tree.
//!
//! Package parts are small, so each one is read fully and turned into a tree of
//! [`Element`]s with [`quick_xml`]. Lookups compare the *local* tag name only and
//! ignore the namespace. This relaxation is intentional: OOXML producers emit a
//! variety of prefixes and occasionally nonstandard namespace URIs, and the
//! checks in this crate must not depend on matching them exactly. Namespaces are
//! still resolved so that qualified attribute lookups such as `r:id` work.
mod escape;

pub use escape::escape_xml;

use crate::error::{Error, Result};
use quick_xml::Reader;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesStart, Event};
use smallvec::SmallVec;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";
const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";

/// A possibly prefixed XML name with its resolved namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlName {
    prefix: Option<String>,
    local: String,
    namespace: Option<String>,
}

impl XmlName {
    fn split(qualified: &str) -> (Option<&str>, &str) {
        match qualified.split_once(':') {
            Some((prefix, local)) => (Some(prefix), local),
            None => (None, qualified),
        }
    }

    #[inline]
    pub fn local(&self) -> &str {
        &self.local
    }

    #[inline]
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    #[inline]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// The name as written in the source, e.g. `r:id`.
    pub fn qualified(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, self.local),
            None => self.local.clone(),
        }
    }
}

/// A single attribute of an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    name: XmlName,
    value: String,
}

impl Attribute {
    #[inline]
    pub fn name(&self) -> &XmlName {
        &self.name
    }

    #[inline]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Whether this is an `xmlns` or `xmlns:*` declaration.
    pub fn is_namespace_declaration(&self) -> bool {
        self.name.namespace.as_deref() == Some(XMLNS_NAMESPACE)
    }
}

/// Child content of an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: XmlName,
    attributes: SmallVec<[Attribute; 4]>,
    children: Vec<Node>,
}

impl Element {
    /// Tag name with any namespace prefix stripped.
    #[inline]
    pub fn local_name(&self) -> &str {
        &self.name.local
    }

    #[inline]
    pub fn name(&self) -> &XmlName {
        &self.name
    }

    #[inline]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Look up an attribute by the name written in the source (`Id`, `r:id`).
    pub fn attr(&self, name: &str) -> Option<&str> {
        let (prefix, local) = XmlName::split(name);
        self.attributes
            .iter()
            .find(|a| a.name.local == local && a.name.prefix.as_deref() == prefix)
            .map(|a| a.value.as_str())
    }

    /// Look up an attribute by namespace URI and local name, whatever prefix it uses.
    pub fn attr_ns(&self, namespace: &str, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.local == local && a.name.namespace.as_deref() == Some(namespace))
            .map(|a| a.value.as_str())
    }

    /// Direct child elements.
    pub fn children(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        })
    }

    /// Concatenated text of the direct text children.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                Node::Text(text) => Some(text.as_str()),
                Node::Element(_) => None,
            })
            .collect()
    }

    /// All elements in this subtree with the given local name, in document order.
    ///
    /// The element itself is included when it matches.
    pub fn find_all<'a>(&'a self, local_name: &str) -> Vec<&'a Element> {
        let mut found = Vec::new();
        let mut stack = vec![self];
        while let Some(el) = stack.pop() {
            if el.local_name() == local_name {
                found.push(el);
            }
            // reversed so that the first child is visited first
            stack.extend(el.children().collect::<Vec<_>>().into_iter().rev());
        }
        found
    }

    /// First element in this subtree with the given local name.
    pub fn find(&self, local_name: &str) -> Option<&Element> {
        self.find_all(local_name).into_iter().next()
    }

    /// Serialize this element and its descendants to text.
    ///
    /// Every element gets the namespace declarations it needs that are not
    /// already in scope in the output, so a subtree cut out of a larger document
    /// parses on its own with the same bindings. The output is meant for reports;
    /// it is not byte-identical to the source.
    pub fn to_xml_string(&self) -> String {
        let mut out = String::new();
        self.write_to(&mut out, &[]);
        out
    }

    fn write_to<'a>(&'a self, out: &mut String, inherited: &[Binding<'a>]) {
        let mut scope = inherited.to_vec();
        for attr in self.attributes.iter().filter(|a| a.is_namespace_declaration()) {
            let prefix = attr.name.prefix().map(|_| attr.name.local.as_str());
            scope.push((prefix, attr.value.as_str()));
        }

        let mut extra: Vec<Binding<'a>> = Vec::new();
        let names = std::iter::once(&self.name).chain(
            self.attributes
                .iter()
                .filter(|a| !a.is_namespace_declaration() && a.name.prefix.is_some())
                .map(|a| &a.name),
        );
        for name in names {
            let prefix = name.prefix();
            let wanted = name.namespace().unwrap_or("");
            if prefix == Some("xml") || (prefix.is_some() && wanted.is_empty()) {
                continue;
            }
            if lookup_binding(&scope, prefix) != wanted {
                extra.push((prefix, wanted));
                scope.push((prefix, wanted));
            }
        }

        let tag = self.name.qualified();
        out.push('<');
        out.push_str(&tag);
        for (prefix, uri) in &extra {
            match prefix {
                Some(prefix) => {
                    let _ = write!(out, " xmlns:{}=\"{}\"", prefix, escape_xml(uri));
                },
                None => {
                    let _ = write!(out, " xmlns=\"{}\"", escape_xml(uri));
                },
            }
        }
        for attr in &self.attributes {
            let _ = write!(
                out,
                " {}=\"{}\"",
                attr.name.qualified(),
                escape_xml(&attr.value)
            );
        }
        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for node in &self.children {
            match node {
                Node::Element(el) => el.write_to(out, &scope),
                Node::Text(text) => out.push_str(&escape_xml(text)),
            }
        }
        let _ = write!(out, "</{}>", tag);
    }

    fn push_text(&mut self, text: &str) {
        if let Some(Node::Text(last)) = self.children.last_mut() {
            last.push_str(text);
        } else {
            self.children.push(Node::Text(text.to_string()));
        }
    }
}

/// A prefix (`None` for the default namespace) bound to a namespace URI.
type Binding<'a> = (Option<&'a str>, &'a str);

/// URI bound to `prefix` in `scope`; an empty string when unbound.
fn lookup_binding<'a>(scope: &[Binding<'a>], prefix: Option<&str>) -> &'a str {
    scope
        .iter()
        .rev()
        .find(|(p, _)| *p == prefix)
        .map(|(_, uri)| *uri)
        .unwrap_or("")
}

/// A parsed XML document.
#[derive(Debug, Clone)]
pub struct Document {
    path: PathBuf,
    root: Element,
}

impl Document {
    /// Read and parse the file at `path`.
    ///
    /// The file handle is released before this returns, whether or not parsing succeeds.
    pub fn parse<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| Error::io(path, e))?;
        Self::from_bytes(path, &bytes)
    }

    /// Parse an in-memory document; `path` is only used in error messages.
    pub fn from_bytes<P: Into<PathBuf>>(path: P, xml: &[u8]) -> Result<Self> {
        let path = path.into();
        match TreeBuilder::default().build(xml) {
            Ok(root) => Ok(Self { path, root }),
            Err(message) => Err(Error::parse(path, message)),
        }
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn root(&self) -> &Element {
        &self.root
    }

    /// All elements with the given local name, whatever their namespace.
    #[inline]
    pub fn find_all<'a>(&'a self, local_name: &str) -> Vec<&'a Element> {
        self.root.find_all(local_name)
    }

    pub fn to_xml_string(&self) -> String {
        self.root.to_xml_string()
    }
}

/// Builds an element tree from reader events while tracking namespace scopes.
#[derive(Default)]
struct TreeBuilder {
    stack: Vec<Element>,
    scopes: Vec<Vec<(Option<String>, String)>>,
    root: Option<Element>,
}

impl TreeBuilder {
    fn build(mut self, xml: &[u8]) -> std::result::Result<Element, String> {
        let mut reader = Reader::from_reader(xml);
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => {
                    let el = self.open(e)?;
                    self.stack.push(el);
                },
                Ok(Event::Empty(ref e)) => {
                    let el = self.open(e)?;
                    self.scopes.pop();
                    self.attach(el)?;
                },
                Ok(Event::End(_)) => {
                    self.scopes.pop();
                    let el = self
                        .stack
                        .pop()
                        .ok_or_else(|| "end tag without matching start tag".to_string())?;
                    self.attach(el)?;
                },
                Ok(Event::Text(ref t)) => {
                    // entity references arrive as separate GeneralRef events
                    let raw = std::str::from_utf8(t.as_ref()).map_err(|e| e.to_string())?;
                    self.text(raw)?;
                },
                Ok(Event::CData(ref t)) => {
                    let raw = std::str::from_utf8(t.as_ref()).map_err(|e| e.to_string())?;
                    self.text(raw)?;
                },
                Ok(Event::GeneralRef(ref r)) => {
                    if let Some(ch) = r.resolve_char_ref().map_err(|e| e.to_string())? {
                        self.text(ch.encode_utf8(&mut [0u8; 4]))?;
                    } else {
                        let name = std::str::from_utf8(r).map_err(|e| e.to_string())?;
                        let text = resolve_predefined_entity(name)
                            .ok_or_else(|| format!("undefined entity reference &{};", name))?;
                        self.text(text)?;
                    }
                },
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(format!("{} (at byte {})", e, reader.buffer_position()));
                },
                _ => {},
            }
            buf.clear();
        }

        if let Some(open) = self.stack.last() {
            return Err(format!(
                "unexpected end of document: <{}> is not closed",
                open.name.qualified()
            ));
        }
        self.root.ok_or_else(|| "no root element".to_string())
    }

    fn open(&mut self, start: &BytesStart<'_>) -> std::result::Result<Element, String> {
        let mut raw_attrs = Vec::new();
        let mut scope = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| e.to_string())?;
            let key = std::str::from_utf8(attr.key.as_ref())
                .map_err(|e| e.to_string())?
                .to_string();
            let value = attr.unescape_value().map_err(|e| e.to_string())?.into_owned();
            if key == "xmlns" {
                scope.push((None, value.clone()));
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                scope.push((Some(prefix.to_string()), value.clone()));
            }
            raw_attrs.push((key, value));
        }
        self.scopes.push(scope);

        let tag = std::str::from_utf8(start.name().as_ref())
            .map_err(|e| e.to_string())?
            .to_string();
        let (prefix, local) = XmlName::split(&tag);
        let name = XmlName {
            prefix: prefix.map(str::to_string),
            local: local.to_string(),
            namespace: self.lookup(prefix),
        };

        let attributes = raw_attrs
            .into_iter()
            .map(|(key, value)| {
                let (prefix, local) = XmlName::split(&key);
                let namespace = match prefix {
                    _ if key == "xmlns" => Some(XMLNS_NAMESPACE.to_string()),
                    Some("xmlns") => Some(XMLNS_NAMESPACE.to_string()),
                    // unprefixed attributes are in no namespace
                    None => None,
                    Some(p) => self.lookup(Some(p)),
                };
                Attribute {
                    name: XmlName {
                        prefix: prefix.map(str::to_string),
                        local: local.to_string(),
                        namespace,
                    },
                    value,
                }
            })
            .collect();

        Ok(Element {
            name,
            attributes,
            children: Vec::new(),
        })
    }

    fn lookup(&self, prefix: Option<&str>) -> Option<String> {
        if prefix == Some("xml") {
            return Some(XML_NAMESPACE.to_string());
        }
        self.scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.iter())
            .find(|(p, _)| p.as_deref() == prefix)
            .map(|(_, uri)| uri.clone())
            .filter(|uri| !uri.is_empty())
    }

    fn attach(&mut self, el: Element) -> std::result::Result<(), String> {
        if let Some(parent) = self.stack.last_mut() {
            parent.children.push(Node::Element(el));
            Ok(())
        } else if self.root.is_some() {
            Err(format!(
                "multiple root elements: <{}> follows the document element",
                el.name.qualified()
            ))
        } else {
            self.root = Some(el);
            Ok(())
        }
    }

    fn text(&mut self, text: &str) -> std::result::Result<(), String> {
        match self.stack.last_mut() {
            Some(parent) => {
                parent.push_text(text);
                Ok(())
            },
            None if text.trim().is_empty() => Ok(()),
            None => Err("text content outside the document element".to_string()),
        }
    }
}
