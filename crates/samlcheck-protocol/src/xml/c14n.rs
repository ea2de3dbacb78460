//! XML canonicalization.
//!
//! Implements Canonical XML 1.0 and Exclusive XML Canonicalization 1.0, with
//! and without comments, over a subtree of a [`Document`]. One node (and its
//! subtree) can be excluded from the output, which is how the
//! enveloped-signature transform is applied.

use std::collections::{BTreeMap, BTreeSet};

use crate::constants::canonicalization_algorithms as uris;

use super::document::{Attribute, Document, Element, NodeId, NodeKind};
use super::XML_NS;

/// Canonicalization algorithm and its parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalizationMethod {
    /// Exclusive (true) or inclusive (false) canonicalization.
    pub exclusive: bool,
    /// Whether comments are kept.
    pub with_comments: bool,
    /// `InclusiveNamespaces PrefixList` of exclusive canonicalization.
    /// `#default` stands for the default namespace.
    pub inclusive_prefixes: Vec<String>,
}

impl Default for CanonicalizationMethod {
    fn default() -> Self {
        Self::inclusive()
    }
}

impl CanonicalizationMethod {
    /// Canonical XML 1.0 without comments.
    #[must_use]
    pub const fn inclusive() -> Self {
        Self {
            exclusive: false,
            with_comments: false,
            inclusive_prefixes: Vec::new(),
        }
    }

    /// Exclusive XML Canonicalization 1.0 without comments.
    #[must_use]
    pub const fn exclusive() -> Self {
        Self {
            exclusive: true,
            with_comments: false,
            inclusive_prefixes: Vec::new(),
        }
    }

    /// Parses a canonicalization algorithm URI.
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        let (exclusive, with_comments) = match uri {
            uris::C14N => (false, false),
            uris::C14N_WITH_COMMENTS => (false, true),
            uris::EXCLUSIVE_C14N => (true, false),
            uris::EXCLUSIVE_C14N_WITH_COMMENTS => (true, true),
            _ => return None,
        };
        Some(Self {
            exclusive,
            with_comments,
            inclusive_prefixes: Vec::new(),
        })
    }

    /// Returns the algorithm URI.
    #[must_use]
    pub const fn uri(&self) -> &'static str {
        match (self.exclusive, self.with_comments) {
            (false, false) => uris::C14N,
            (false, true) => uris::C14N_WITH_COMMENTS,
            (true, false) => uris::EXCLUSIVE_C14N,
            (true, true) => uris::EXCLUSIVE_C14N_WITH_COMMENTS,
        }
    }

    /// Sets the inclusive prefix list from a whitespace separated `PrefixList`.
    #[must_use]
    pub fn with_prefix_list(mut self, prefix_list: &str) -> Self {
        self.inclusive_prefixes = prefix_list.split_whitespace().map(String::from).collect();
        self
    }
}

type Bindings = BTreeMap<Option<String>, String>;

/// Canonicalizes subtrees of one document.
pub struct Canonicalizer<'d> {
    doc: &'d Document,
    method: CanonicalizationMethod,
    excluded: Option<NodeId>,
}

impl<'d> Canonicalizer<'d> {
    /// Creates a canonicalizer for `doc`.
    #[must_use]
    pub fn new(doc: &'d Document, method: CanonicalizationMethod) -> Self {
        Self {
            doc,
            method,
            excluded: None,
        }
    }

    /// Omits `node` and its subtree from the output.
    #[must_use]
    pub fn excluding(mut self, node: Option<NodeId>) -> Self {
        self.excluded = node;
        self
    }

    /// Canonicalizes the subtree rooted at `apex`.
    ///
    /// `apex` may be the document node, in which case the whole document is
    /// canonicalized.
    #[must_use]
    pub fn canonicalize(&self, apex: NodeId) -> String {
        let mut out = String::new();

        if apex == self.doc.document_node() {
            self.write_document(&mut out);
            return out;
        }

        let scope = match self.doc.parent(apex) {
            Some(parent) => self.doc.in_scope_namespaces(parent),
            None => Bindings::new(),
        };
        self.write_node(&mut out, apex, &scope, &Bindings::new(), true);
        out
    }

    fn write_document(&self, out: &mut String) {
        let doc = self.doc;
        let mut seen_root = false;
        for &child in doc.children(doc.document_node()) {
            if Some(child) == self.excluded {
                continue;
            }
            match doc.kind(child) {
                NodeKind::Element(_) => {
                    self.write_node(out, child, &Bindings::new(), &Bindings::new(), false);
                    seen_root = true;
                }
                NodeKind::Comment(_) if !self.method.with_comments => {}
                NodeKind::Comment(_) | NodeKind::ProcessingInstruction { .. } => {
                    if seen_root {
                        out.push('\n');
                    }
                    self.write_node(out, child, &Bindings::new(), &Bindings::new(), false);
                    if !seen_root {
                        out.push('\n');
                    }
                }
                _ => {}
            }
        }
    }

    fn write_node(
        &self,
        out: &mut String,
        id: NodeId,
        parent_scope: &Bindings,
        rendered: &Bindings,
        is_apex: bool,
    ) {
        if Some(id) == self.excluded {
            return;
        }

        match self.doc.kind(id) {
            NodeKind::Element(element) => {
                self.write_element(out, id, element, parent_scope, rendered, is_apex);
            }
            NodeKind::Text(text) | NodeKind::CData(text) => escape_text(out, text),
            NodeKind::Comment(comment) => {
                if self.method.with_comments {
                    out.push_str("<!--");
                    out.push_str(comment);
                    out.push_str("-->");
                }
            }
            NodeKind::ProcessingInstruction { target, data } => {
                out.push_str("<?");
                out.push_str(target);
                if !data.is_empty() {
                    out.push(' ');
                    out.push_str(data);
                }
                out.push_str("?>");
            }
            NodeKind::Document => {}
        }
    }

    fn write_element(
        &self,
        out: &mut String,
        id: NodeId,
        element: &Element,
        parent_scope: &Bindings,
        rendered: &Bindings,
        is_apex: bool,
    ) {
        let mut scope = parent_scope.clone();
        for decl in &element.namespaces {
            if decl.uri.is_empty() {
                scope.remove(&decl.prefix);
            } else {
                scope.insert(decl.prefix.clone(), decl.uri.clone());
            }
        }

        let emitted = if self.method.exclusive {
            self.exclusive_namespaces(element, &scope, rendered)
        } else {
            inclusive_namespaces(&scope, rendered)
        };

        let mut now_rendered = rendered.clone();
        for (prefix, uri) in &emitted {
            if uri.is_empty() {
                now_rendered.remove(prefix);
            } else {
                now_rendered.insert(prefix.clone(), uri.clone());
            }
        }

        let inherited = if is_apex && !self.method.exclusive {
            self.inherited_xml_attributes(id, element)
        } else {
            Vec::new()
        };
        let mut attributes: Vec<&Attribute> =
            element.attributes.iter().chain(inherited.iter()).collect();
        attributes.sort_by(|a, b| {
            let key_a = (a.namespace.as_deref().unwrap_or(""), a.name.local.as_str());
            let key_b = (b.namespace.as_deref().unwrap_or(""), b.name.local.as_str());
            key_a.cmp(&key_b)
        });

        let qname = element.name.to_string();
        out.push('<');
        out.push_str(&qname);
        for (prefix, uri) in &emitted {
            match prefix {
                Some(prefix) => {
                    out.push_str(" xmlns:");
                    out.push_str(prefix);
                }
                None => out.push_str(" xmlns"),
            }
            out.push_str("=\"");
            escape_attribute(out, uri);
            out.push('"');
        }
        for attr in attributes {
            out.push(' ');
            out.push_str(&attr.name.to_string());
            out.push_str("=\"");
            escape_attribute(out, &attr.value);
            out.push('"');
        }
        out.push('>');

        for &child in self.doc.children(id) {
            self.write_node(out, child, &scope, &now_rendered, false);
        }

        out.push_str("</");
        out.push_str(&qname);
        out.push('>');
    }

    /// Namespace nodes output by exclusive canonicalization: those visibly
    /// used by the element or its attributes, plus the inclusive prefix list.
    fn exclusive_namespaces(
        &self,
        element: &Element,
        scope: &Bindings,
        rendered: &Bindings,
    ) -> BTreeMap<Option<String>, String> {
        let mut candidates: BTreeSet<Option<String>> = BTreeSet::new();
        candidates.insert(element.name.prefix.clone());
        for attr in &element.attributes {
            if attr.name.prefix.is_some() {
                candidates.insert(attr.name.prefix.clone());
            }
        }
        for prefix in &self.method.inclusive_prefixes {
            if prefix == "#default" {
                candidates.insert(None);
            } else {
                candidates.insert(Some(prefix.clone()));
            }
        }

        let mut emitted = BTreeMap::new();
        for prefix in candidates {
            if prefix.as_deref() == Some("xml") {
                continue;
            }
            let uri = scope.get(&prefix).cloned().unwrap_or_default();
            let current = rendered.get(&prefix).cloned().unwrap_or_default();
            if uri != current {
                emitted.insert(prefix, uri);
            }
        }
        emitted
    }

    /// `xml:*` attributes of ancestors that the apex of a document subset
    /// inherits under inclusive canonicalization.
    fn inherited_xml_attributes(&self, id: NodeId, element: &Element) -> Vec<Attribute> {
        let mut found: BTreeMap<String, Attribute> = BTreeMap::new();
        let mut current = self.doc.parent(id);
        while let Some(node) = current {
            if let Some(ancestor) = self.doc.element(node) {
                for attr in &ancestor.attributes {
                    if attr.namespace.as_deref() == Some(XML_NS) {
                        found
                            .entry(attr.name.local.clone())
                            .or_insert_with(|| attr.clone());
                    }
                }
            }
            current = self.doc.parent(node);
        }

        found
            .into_values()
            .filter(|attr| {
                !element.attributes.iter().any(|own| {
                    own.namespace.as_deref() == Some(XML_NS) && own.name.local == attr.name.local
                })
            })
            .collect()
    }
}

/// Namespace nodes output by inclusive canonicalization: every in-scope
/// binding that differs from what the nearest output ancestor rendered.
fn inclusive_namespaces(scope: &Bindings, rendered: &Bindings) -> BTreeMap<Option<String>, String> {
    let mut emitted = BTreeMap::new();
    for (prefix, uri) in scope {
        if rendered.get(prefix) != Some(uri) {
            emitted.insert(prefix.clone(), uri.clone());
        }
    }
    if !scope.contains_key(&None) && rendered.contains_key(&None) {
        emitted.insert(None, String::new());
    }
    emitted
}

fn escape_text(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(c),
        }
    }
}

fn escape_attribute(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#x9;"),
            '\n' => out.push_str("&#xA;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(c),
        }
    }
}
