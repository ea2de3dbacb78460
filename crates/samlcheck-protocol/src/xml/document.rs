//! Arena-backed XML tree.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::{XmlError, XmlResult, XML_NS};

const BYTE_ORDER_MARK: char = '\u{FEFF}';

/// Stable address of a node inside its owning [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// A possibly prefixed XML name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QName {
    /// Namespace prefix, if any.
    pub prefix: Option<String>,
    /// Local part of the name.
    pub local: String,
}

impl QName {
    fn parse(raw: &str) -> Self {
        match raw.split_once(':') {
            Some((prefix, local)) => Self {
                prefix: Some(prefix.to_string()),
                local: local.to_string(),
            },
            None => Self {
                prefix: None,
                local: raw.to_string(),
            },
        }
    }

    fn raw_len(&self) -> usize {
        self.prefix.as_ref().map_or(0, |p| p.len() + 1) + self.local.len()
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "{prefix}:{}", self.local),
            None => f.write_str(&self.local),
        }
    }
}

/// An attribute with its resolved namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Attribute name as written.
    pub name: QName,
    /// Namespace URI; unprefixed attributes have none.
    pub namespace: Option<String>,
    /// Normalized, unescaped value.
    pub value: String,
}

/// A namespace declaration (`xmlns` or `xmlns:prefix`) found on an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceDecl {
    /// Declared prefix; `None` for the default namespace.
    pub prefix: Option<String>,
    /// Namespace URI; empty when the default namespace is undeclared.
    pub uri: String,
}

/// Element payload of a node.
#[derive(Debug, Clone)]
pub struct Element {
    /// Element name as written.
    pub name: QName,
    /// Resolved namespace URI.
    pub namespace: Option<String>,
    /// Attributes in document order, namespace declarations excluded.
    pub attributes: Vec<Attribute>,
    /// Namespace declarations in document order.
    pub namespaces: Vec<NamespaceDecl>,
}

impl Element {
    /// Returns the value of an unqualified attribute.
    #[must_use]
    pub fn attribute(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.namespace.is_none() && a.name.prefix.is_none() && a.name.local == local)
            .map(|a| a.value.as_str())
    }

    /// Returns true if the element has the given namespace and local name.
    #[must_use]
    pub fn is(&self, namespace: &str, local: &str) -> bool {
        self.name.local == local && self.namespace.as_deref() == Some(namespace)
    }
}

/// Node payloads.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// The document node; parent of the document element.
    Document,
    /// An element.
    Element(Element),
    /// Character data, unescaped.
    Text(String),
    /// A CDATA section.
    CData(String),
    /// A comment.
    Comment(String),
    /// A processing instruction.
    ProcessingInstruction {
        /// PI target.
        target: String,
        /// PI data, possibly empty.
        data: String,
    },
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
    span: Range<usize>,
}

/// A parsed XML document.
///
/// Nodes are immutable after parsing and the document has exactly one
/// document element.
#[derive(Debug, Clone)]
pub struct Document {
    source: String,
    nodes: Vec<Node>,
    root: NodeId,
}

const DOCUMENT: NodeId = NodeId(0);

/// Attribute names treated as element identifiers by `#id` references.
const ID_ATTRIBUTES: [&str; 3] = ["ID", "Id", "id"];

impl Document {
    /// Parses a byte buffer as UTF-8 XML.
    ///
    /// # Errors
    ///
    /// Returns [`XmlError::Encoding`] for invalid UTF-8 and
    /// [`XmlError::Malformed`] for input that is not well-formed.
    pub fn parse_bytes(bytes: &[u8]) -> XmlResult<Self> {
        let text = std::str::from_utf8(bytes).map_err(|e| XmlError::Encoding(e.to_string()))?;
        Self::parse(text)
    }

    /// Parses a string as XML.
    ///
    /// A leading byte order mark is dropped; node spans and
    /// [`source`](Self::source) refer to the text after it.
    ///
    /// # Errors
    ///
    /// Returns [`XmlError::Malformed`] for input that is not well-formed.
    pub fn parse(text: &str) -> XmlResult<Self> {
        let text = text.strip_prefix(BYTE_ORDER_MARK).unwrap_or(text);
        Parser::new(text).run()
    }

    /// Returns the document node.
    #[must_use]
    pub const fn document_node(&self) -> NodeId {
        DOCUMENT
    }

    /// Returns the document element.
    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// Returns the text the document was parsed from.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns the payload of a node.
    #[must_use]
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    /// Returns the element payload, or `None` for non-element nodes.
    #[must_use]
    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes[id.0].kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Returns the parent of a node.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Returns the children of a node in document order.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Returns the element children of a node.
    pub fn child_elements(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(|&child| self.element(child).is_some())
    }

    /// Returns the element children with the given namespace and local name.
    pub fn children_named<'a>(
        &'a self,
        id: NodeId,
        namespace: &'a str,
        local: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.child_elements(id)
            .filter(move |&child| self.is_named(child, namespace, local))
    }

    /// Returns the first element child with the given namespace and local name.
    #[must_use]
    pub fn first_child_named(&self, id: NodeId, namespace: &str, local: &str) -> Option<NodeId> {
        self.children_named(id, namespace, local).next()
    }

    /// Returns all descendants of `id` (excluding `id`) in document order.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// Selects descendant elements by namespace URI and local name.
    ///
    /// Equivalent to the XPath
    /// `.//*[local-name(.)='local' and namespace-uri(.)='namespace']`
    /// evaluated with `id` as the context node.
    #[must_use]
    pub fn descendants_named(&self, id: NodeId, namespace: &str, local: &str) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|&node| self.is_named(node, namespace, local))
            .collect()
    }

    /// Returns true if `id` is an element with the given namespace and local name.
    #[must_use]
    pub fn is_named(&self, id: NodeId, namespace: &str, local: &str) -> bool {
        self.element(id).is_some_and(|e| e.is(namespace, local))
    }

    /// Returns true if `ancestor` is `id` or one of its ancestors.
    #[must_use]
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Returns the concatenated character data below a node.
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        let mut text = String::new();
        for node in std::iter::once(id).chain(self.descendants(id)) {
            match self.kind(node) {
                NodeKind::Text(t) | NodeKind::CData(t) => text.push_str(t),
                _ => {}
            }
        }
        text
    }

    /// Finds the element whose `ID`, `Id` or `id` attribute equals `value`.
    #[must_use]
    pub fn element_by_id(&self, value: &str) -> Option<NodeId> {
        std::iter::once(self.root)
            .chain(self.descendants(self.root))
            .find(|&node| {
                self.element(node).is_some_and(|e| {
                    ID_ATTRIBUTES
                        .iter()
                        .any(|name| e.attribute(name) == Some(value))
                })
            })
    }

    /// Returns the namespace bindings in scope at a node.
    ///
    /// The key is the prefix (`None` for the default namespace). Undeclared
    /// default namespaces are omitted; the implicit `xml` binding is not
    /// included.
    #[must_use]
    pub fn in_scope_namespaces(&self, id: NodeId) -> BTreeMap<Option<String>, String> {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current {
            chain.push(node);
            current = self.parent(node);
        }

        let mut scope = BTreeMap::new();
        for node in chain.into_iter().rev() {
            if let Some(element) = self.element(node) {
                apply_declarations(&mut scope, &element.namespaces);
            }
        }
        scope
    }

    /// Serializes a subtree back to XML text.
    ///
    /// The output is the exact source text of the subtree. For an element
    /// that is not the document element, namespace declarations inherited
    /// from its ancestors are added to its start tag so the text parses on
    /// its own with the same namespace bindings. Inherited `xml:*` attributes
    /// are not copied, so inclusive canonicalization of the result differs
    /// from canonicalizing the subtree in place when an ancestor has one.
    #[must_use]
    pub fn serialize(&self, id: NodeId) -> String {
        let node = &self.nodes[id.0];
        let source = &self.source[node.span.clone()];

        let element = match &node.kind {
            NodeKind::Element(element) => element,
            _ => return source.to_string(),
        };
        let Some(parent) = node.parent.filter(|&p| p != DOCUMENT) else {
            return source.to_string();
        };

        let inherited: Vec<(Option<String>, String)> = self
            .in_scope_namespaces(parent)
            .into_iter()
            .filter(|(prefix, _)| !element.namespaces.iter().any(|d| &d.prefix == prefix))
            .collect();
        if inherited.is_empty() {
            return source.to_string();
        }

        let split = 1 + element.name.raw_len();
        let mut out = String::with_capacity(source.len() + 64);
        out.push_str(&source[..split]);
        for (prefix, uri) in inherited {
            match prefix {
                Some(prefix) => out.push_str(&format!(" xmlns:{prefix}=\"")),
                None => out.push_str(" xmlns=\""),
            }
            out.push_str(&quick_xml::escape::escape(uri.as_str()));
            out.push('"');
        }
        out.push_str(&source[split..]);
        out
    }

    fn push(&mut self, parent: NodeId, kind: NodeKind, span: Range<usize>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: Some(parent),
            children: Vec::new(),
            kind,
            span,
        });
        self.nodes[parent.0].children.push(id);
        id
    }
}

fn apply_declarations(scope: &mut BTreeMap<Option<String>, String>, decls: &[NamespaceDecl]) {
    for decl in decls {
        if decl.uri.is_empty() {
            scope.remove(&decl.prefix);
        } else {
            scope.insert(decl.prefix.clone(), decl.uri.clone());
        }
    }
}

/// Streaming builder turning quick-xml events into a [`Document`].
struct Parser<'a> {
    text: &'a str,
    reader: Reader<&'a [u8]>,
    doc: Document,
    open: Vec<NodeId>,
    bindings: Vec<NamespaceDecl>,
    frames: Vec<usize>,
    cursor: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        let mut reader = Reader::from_str(text);
        let config = reader.config_mut();
        config.trim_text(false);
        config.check_end_names = true;
        config.check_comments = true;

        let doc = Document {
            source: text.to_string(),
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                kind: NodeKind::Document,
                span: 0..text.len(),
            }],
            root: DOCUMENT,
        };

        Self {
            text,
            reader,
            doc,
            open: vec![DOCUMENT],
            bindings: Vec::new(),
            frames: Vec::new(),
            cursor: 0,
        }
    }

    fn position(&self) -> usize {
        self.reader.buffer_position() as usize
    }

    fn malformed(&self, message: impl Into<String>) -> XmlError {
        XmlError::Malformed {
            position: self.position(),
            message: message.into(),
        }
    }

    fn current(&self) -> NodeId {
        self.open.last().copied().unwrap_or(DOCUMENT)
    }

    fn run(mut self) -> XmlResult<Document> {
        loop {
            let event = match self.reader.read_event() {
                Ok(event) => event,
                Err(e) => {
                    return Err(XmlError::Malformed {
                        position: self.reader.error_position() as usize,
                        message: e.to_string(),
                    })
                }
            };
            let end = self.position();

            match event {
                Event::Start(start) => {
                    let begin = end - start.len() - 2;
                    let id = self.open_element(&start, begin..end)?;
                    self.open.push(id);
                }
                Event::Empty(start) => {
                    let begin = end - start.len() - 3;
                    self.open_element(&start, begin..end)?;
                    self.close_frame();
                }
                Event::End(_) => {
                    let id = self.current();
                    if id == DOCUMENT {
                        return Err(self.malformed("unexpected end tag"));
                    }
                    self.open.pop();
                    self.doc.nodes[id.0].span.end = end;
                    self.close_frame();
                }
                Event::Text(text) => {
                    let raw = self.utf8(&text)?;
                    let span = self.cursor..self.cursor + raw.len();
                    if self.current() == DOCUMENT {
                        if !raw.chars().all(char::is_whitespace) {
                            return Err(self.malformed("character data outside the document element"));
                        }
                    } else {
                        let value = quick_xml::escape::unescape(&normalize_newlines(raw))
                            .map_err(|e| self.malformed(e.to_string()))?
                            .into_owned();
                        self.doc.push(self.current(), NodeKind::Text(value), span);
                    }
                }
                Event::CData(data) => {
                    if self.current() == DOCUMENT {
                        return Err(self.malformed("CDATA outside the document element"));
                    }
                    let raw = self.utf8(&data)?;
                    let value = normalize_newlines(raw).into_owned();
                    let span = end - raw.len() - 12..end;
                    self.doc.push(self.current(), NodeKind::CData(value), span);
                }
                Event::Comment(comment) => {
                    let raw = self.utf8(&comment)?;
                    let value = normalize_newlines(raw).into_owned();
                    let span = end - raw.len() - 7..end;
                    self.doc.push(self.current(), NodeKind::Comment(value), span);
                }
                Event::PI(pi) => {
                    let raw = self.utf8(&pi)?;
                    let (target, data) = match raw.split_once(char::is_whitespace) {
                        Some((target, data)) => (target, data.trim_start()),
                        None => (raw, ""),
                    };
                    let kind = NodeKind::ProcessingInstruction {
                        target: target.to_string(),
                        data: normalize_newlines(data).into_owned(),
                    };
                    let span = end - raw.len() - 4..end;
                    self.doc.push(self.current(), kind, span);
                }
                Event::Decl(_) | Event::DocType(_) => {}
                Event::Eof => break,
            }

            self.cursor = end;
        }

        if self.open.len() > 1 {
            return Err(self.malformed("unclosed element at end of input"));
        }
        if self.doc.root == DOCUMENT {
            return Err(self.malformed("no document element"));
        }
        Ok(self.doc)
    }

    fn utf8<'b>(&self, bytes: &'b [u8]) -> XmlResult<&'b str> {
        std::str::from_utf8(bytes).map_err(|e| XmlError::Encoding(e.to_string()))
    }

    fn open_element(&mut self, start: &BytesStart<'_>, span: Range<usize>) -> XmlResult<NodeId> {
        let parent = self.current();
        if parent == DOCUMENT && self.doc.root != DOCUMENT {
            return Err(self.malformed("more than one document element"));
        }

        let name = QName::parse(self.utf8(start.name().as_ref())?);

        let mut namespaces = Vec::new();
        let mut raw_attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| self.malformed(e.to_string()))?;
            let key = self.utf8(attr.key.as_ref())?;
            let value = attribute_value(self.utf8(&attr.value)?)
                .map_err(|message| self.malformed(message))?;

            if key == "xmlns" {
                namespaces.push(NamespaceDecl { prefix: None, uri: value });
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                if value.is_empty() {
                    return Err(self.malformed(format!("prefix '{prefix}' bound to empty namespace")));
                }
                namespaces.push(NamespaceDecl {
                    prefix: Some(prefix.to_string()),
                    uri: value,
                });
            } else {
                raw_attributes.push((QName::parse(key), value));
            }
        }

        self.frames.push(self.bindings.len());
        self.bindings.extend(namespaces.iter().cloned());

        let namespace = self.resolve(name.prefix.as_deref(), true)?;
        let mut attributes = Vec::with_capacity(raw_attributes.len());
        for (attr_name, value) in raw_attributes {
            let attr_namespace = match attr_name.prefix.as_deref() {
                Some(prefix) => self.resolve(Some(prefix), false)?,
                None => None,
            };
            attributes.push(Attribute {
                name: attr_name,
                namespace: attr_namespace,
                value,
            });
        }

        let element = Element {
            name,
            namespace,
            attributes,
            namespaces,
        };
        let id = self.doc.push(parent, NodeKind::Element(element), span);
        if parent == DOCUMENT {
            self.doc.root = id;
        }
        Ok(id)
    }

    fn close_frame(&mut self) {
        if let Some(len) = self.frames.pop() {
            self.bindings.truncate(len);
        }
    }

    fn resolve(&self, prefix: Option<&str>, use_default: bool) -> XmlResult<Option<String>> {
        match prefix {
            Some("xml") => Ok(Some(XML_NS.to_string())),
            Some("xmlns") => Err(self.malformed("the xmlns prefix cannot be used for names")),
            Some(prefix) => self
                .bindings
                .iter()
                .rev()
                .find(|d| d.prefix.as_deref() == Some(prefix))
                .map(|d| Some(d.uri.clone()))
                .ok_or_else(|| self.malformed(format!("unbound namespace prefix '{prefix}'"))),
            None if use_default => Ok(self
                .bindings
                .iter()
                .rev()
                .find(|d| d.prefix.is_none())
                .map(|d| d.uri.clone())
                .filter(|uri| !uri.is_empty())),
            None => Ok(None),
        }
    }
}

fn normalize_newlines(raw: &str) -> Cow<'_, str> {
    if raw.contains('\r') {
        Cow::Owned(raw.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(raw)
    }
}

/// Applies attribute-value normalization, then resolves references.
fn attribute_value(raw: &str) -> Result<String, String> {
    let normalized: String = normalize_newlines(raw)
        .chars()
        .map(|c| if matches!(c, '\t' | '\n') { ' ' } else { c })
        .collect();
    quick_xml::escape::unescape(&normalized)
        .map(Cow::into_owned)
        .map_err(|e| e.to_string())
}
