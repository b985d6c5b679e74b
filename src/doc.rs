//! Document model: the loaded SVG diagram as an arena of element and text nodes.
//!
//! The tree is decoupled from any rendering surface. Nodes are addressed by
//! [`NodeId`] indices into the arena; detaching a node leaves its slot in place
//! so ids held elsewhere never dangle, they simply stop being reachable from
//! the root. Qualified names (`xlink:href`, `xmlns:xlink`) are stored verbatim.
//!
//! Parsing goes through `roxmltree`; comments and processing instructions are
//! dropped. Namespace declarations are rebuilt as `xmlns` attributes on the
//! element that introduces them so that serializing and re-parsing is stable.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

/// Index of a node in a [`DocStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Payload of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    Element { name: String, attrs: Vec<(String, String)> },
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
}

/// Errors raised while loading markup into a [`DocStore`].
#[derive(Debug, thiserror::Error)]
pub enum DocError {
    #[error("invalid SVG markup: {0}")]
    Parse(#[from] roxmltree::Error),
    #[error("document root is <{0}>, expected <svg>")]
    NotSvg(String),
}

/// The loaded SVG tree.
#[derive(Debug, Clone)]
pub struct DocStore {
    nodes: Vec<Node>,
    root: NodeId,
}

const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

impl DocStore {
    /// Parse SVG markup. The root element must be `svg`.
    ///
    /// # Errors
    ///
    /// Returns [`DocError::Parse`] for malformed XML and [`DocError::NotSvg`]
    /// when the root element is something else.
    pub fn parse(text: &str) -> Result<Self, DocError> {
        let mut options = roxmltree::ParsingOptions::default();
        options.allow_dtd = true;
        let xml = roxmltree::Document::parse_with_options(text, options)?;

        let source_root = xml.root_element();
        if !source_root.tag_name().name().eq_ignore_ascii_case("svg") {
            return Err(DocError::NotSvg(source_root.tag_name().name().to_owned()));
        }

        let mut doc = Self { nodes: Vec::new(), root: NodeId(0) };
        doc.root = doc.import(source_root);
        Ok(doc)
    }

    fn import(&mut self, source: roxmltree::Node<'_, '_>) -> NodeId {
        let id = self.push(NodeData::Element { name: qualified_tag(source), attrs: declared_attrs(source) });

        for child in source.children() {
            if child.is_element() {
                let child_id = self.import(child);
                self.attach(id, child_id, None);
            } else if child.is_text() {
                let text = child.text().unwrap_or_default();
                let child_id = self.create_text(text);
                self.attach(id, child_id, None);
            }
        }
        id
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node { parent: None, children: Vec::new(), data });
        id
    }

    // --- Structure ---

    /// The root `svg` element.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|n| n.parent)
    }

    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id.0).map_or(&[][..], |n| n.children.as_slice())
    }

    /// Element children only, skipping text.
    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id).iter().copied().filter(|c| self.is_element(*c))
    }

    /// Ancestors from the parent up to the root (or the top of a detached subtree).
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |n| self.parent(*n))
    }

    /// `id` and every node below it, in document order.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// Whether `node` is `ancestor` or lies beneath it.
    #[must_use]
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        node == ancestor || self.ancestors(node).any(|a| a == ancestor)
    }

    /// Whether the node is reachable from the root.
    #[must_use]
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.contains(self.root, id)
    }

    /// Elements reachable from the root, in document order.
    #[must_use]
    pub fn elements(&self) -> Vec<NodeId> {
        self.descendants(self.root).into_iter().filter(|n| self.is_element(*n)).collect()
    }

    // --- Node data ---

    #[must_use]
    pub fn data(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id.0).map(|n| &n.data)
    }

    #[must_use]
    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.data(id), Some(NodeData::Element { .. }))
    }

    /// Qualified element name, or `None` for text nodes.
    #[must_use]
    pub fn name(&self, id: NodeId) -> Option<&str> {
        match self.data(id) {
            Some(NodeData::Element { name, .. }) => Some(name.as_str()),
            _ => None,
        }
    }

    /// Element name with any prefix removed.
    #[must_use]
    pub fn local_name(&self, id: NodeId) -> Option<&str> {
        self.name(id).map(|n| n.rsplit(':').next().unwrap_or(n))
    }

    /// Case-insensitive test of the local element name.
    #[must_use]
    pub fn is_named(&self, id: NodeId, name: &str) -> bool {
        self.local_name(id).is_some_and(|n| n.eq_ignore_ascii_case(name))
    }

    #[must_use]
    pub fn attrs(&self, id: NodeId) -> &[(String, String)] {
        match self.data(id) {
            Some(NodeData::Element { attrs, .. }) => attrs.as_slice(),
            _ => &[],
        }
    }

    #[must_use]
    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attrs(id).iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    /// Numeric value of a length attribute such as `"120"` or `"12.5px"`; zero when absent.
    #[must_use]
    pub fn number_attr(&self, id: NodeId, name: &str) -> f64 {
        self.attr(id, name).and_then(parse_length).unwrap_or(0.0)
    }

    /// Set an attribute, replacing any existing value in place.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        let Some(NodeData::Element { attrs, .. }) = self.nodes.get_mut(id.0).map(|n| &mut n.data) else {
            return;
        };
        let value = value.into();
        match attrs.iter_mut().find(|(k, _)| k == name) {
            Some(slot) => slot.1 = value,
            None => attrs.push((name.to_owned(), value)),
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Option<String> {
        let Some(NodeData::Element { attrs, .. }) = self.nodes.get_mut(id.0).map(|n| &mut n.data) else {
            return None;
        };
        let index = attrs.iter().position(|(k, _)| k == name)?;
        Some(attrs.remove(index).1)
    }

    // --- Classes ---

    pub fn classes(&self, id: NodeId) -> impl Iterator<Item = &str> {
        self.attr(id, "class").unwrap_or_default().split_ascii_whitespace()
    }

    #[must_use]
    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.classes(id).any(|c| c == class)
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if !self.is_element(id) || self.has_class(id, class) {
            return;
        }
        let value = match self.attr(id, "class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {class}", existing.trim()),
            _ => class.to_owned(),
        };
        self.set_attr(id, "class", value);
    }

    /// Remove a class; returns `true` when it was present. An emptied `class` attribute is dropped.
    pub fn remove_class(&mut self, id: NodeId, class: &str) -> bool {
        if !self.has_class(id, class) {
            return false;
        }
        let rest: Vec<&str> = self.classes(id).filter(|c| *c != class).collect();
        let rest = rest.join(" ");
        if rest.is_empty() {
            self.remove_attr(id, "class");
        } else {
            self.set_attr(id, "class", rest);
        }
        true
    }

    // --- Inline style ---

    /// Value of one property in the inline `style` attribute.
    #[must_use]
    pub fn style(&self, id: NodeId, property: &str) -> Option<String> {
        parse_style(self.attr(id, "style")?)
            .into_iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(property))
            .map(|(_, v)| v)
            .filter(|v| !v.is_empty())
    }

    /// Set one inline style property. An empty value removes it, and the `style`
    /// attribute itself is dropped once no properties remain.
    pub fn set_style(&mut self, id: NodeId, property: &str, value: &str) {
        if !self.is_element(id) {
            return;
        }
        let mut props = self.attr(id, "style").map(parse_style).unwrap_or_default();
        let value = value.trim();
        match props.iter().position(|(k, _)| k.eq_ignore_ascii_case(property)) {
            Some(index) if value.is_empty() => {
                props.remove(index);
            }
            Some(index) => props[index].1 = value.to_owned(),
            None if value.is_empty() => {}
            None => props.push((property.to_owned(), value.to_owned())),
        }

        if props.is_empty() {
            self.remove_attr(id, "style");
        } else {
            let style = props.iter().map(|(k, v)| format!("{k}: {v};")).collect::<Vec<_>>().join(" ");
            self.set_attr(id, "style", style);
        }
    }

    // --- Text ---

    /// Concatenated text of all descendant text nodes.
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        self.descendants(id)
            .into_iter()
            .filter_map(|n| match self.data(n) {
                Some(NodeData::Text(text)) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Replace all children with a single text node.
    pub fn set_text_content(&mut self, id: NodeId, text: &str) {
        for child in self.children(id).to_vec() {
            self.detach(child);
        }
        if !text.is_empty() {
            let node = self.create_text(text);
            self.append_child(id, node);
        }
    }

    // --- Mutation ---

    /// Create a detached element.
    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.push(NodeData::Element { name: name.to_owned(), attrs: Vec::new() })
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Text(text.to_owned()))
    }

    /// Move `child` to the end of `parent`'s children.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.attach(parent, child, None);
    }

    /// Move `child` into `parent` immediately before `reference`.
    /// Falls back to appending when `reference` is not a child of `parent`.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: NodeId) {
        self.attach(parent, child, Some(reference));
    }

    fn attach(&mut self, parent: NodeId, child: NodeId, before: Option<NodeId>) {
        if parent.0 >= self.nodes.len() || child.0 >= self.nodes.len() || self.contains(child, parent) {
            return;
        }
        self.detach(child);
        let siblings = &mut self.nodes[parent.0].children;
        let index = before.and_then(|r| siblings.iter().position(|s| *s == r)).unwrap_or(siblings.len());
        siblings.insert(index, child);
        self.nodes[child.0].parent = Some(parent);
    }

    /// Unlink a node from its parent. The subtree stays intact and can be re-attached.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        self.nodes[parent.0].children.retain(|c| *c != id);
        self.nodes[id.0].parent = None;
    }

    /// Remove a node from the document. The root cannot be removed.
    pub fn remove(&mut self, id: NodeId) {
        if id != self.root {
            self.detach(id);
        }
    }

    /// Put `wrapper` where `node` was and move `node` inside it.
    pub fn wrap(&mut self, node: NodeId, wrapper: NodeId) {
        let Some(parent) = self.parent(node) else {
            return;
        };
        self.insert_before(parent, wrapper, node);
        self.append_child(wrapper, node);
    }

    // --- Queries ---

    /// First element below `id` (excluding `id`) with the given local name.
    #[must_use]
    pub fn find_descendant(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.descendants(id).into_iter().skip(1).find(|n| self.is_named(*n, name))
    }

    /// Attached element with the given `id` attribute.
    #[must_use]
    pub fn element_by_id(&self, value: &str) -> Option<NodeId> {
        self.elements().into_iter().find(|n| self.attr(*n, "id") == Some(value))
    }

    /// Attached elements whose `name` attribute equals `value`.
    #[must_use]
    pub fn elements_with_attr(&self, name: &str, value: &str) -> Vec<NodeId> {
        self.elements().into_iter().filter(|n| self.attr(*n, name) == Some(value)).collect()
    }

    /// Nearest ancestor (or self) with the given local name, stopping at the root.
    #[must_use]
    pub fn closest(&self, id: NodeId, name: &str) -> Option<NodeId> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .take_while(|n| *n != self.root)
            .find(|n| self.is_named(*n, name))
    }

    // --- Serialization ---

    /// Serialize the subtree at `id` as XML text.
    #[must_use]
    pub fn to_xml(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, &mut out);
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        match self.data(id) {
            Some(NodeData::Text(text)) => escape_text(text, out),
            Some(NodeData::Element { name, attrs }) => {
                out.push('<');
                out.push_str(name);
                for (key, value) in attrs {
                    out.push(' ');
                    out.push_str(key);
                    out.push_str("=\"");
                    escape_attr(value, out);
                    out.push('"');
                }
                let children = self.children(id);
                if children.is_empty() {
                    out.push_str("/>");
                    return;
                }
                out.push('>');
                for child in children {
                    self.write_node(*child, out);
                }
                out.push_str("</");
                out.push_str(name);
                out.push('>');
            }
            None => {}
        }
    }
}

/// Split an inline style declaration into trimmed `(property, value)` pairs.
#[must_use]
pub fn parse_style(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|decl| {
            let (key, value) = decl.split_once(':')?;
            let key = key.trim();
            (!key.is_empty()).then(|| (key.to_owned(), value.trim().to_owned()))
        })
        .collect()
}

fn qualified_tag(node: roxmltree::Node<'_, '_>) -> String {
    let tag = node.tag_name();
    let prefix = tag.namespace().and_then(|ns| node.lookup_prefix(ns));
    match prefix {
        Some(prefix) => format!("{prefix}:{}", tag.name()),
        None => tag.name().to_owned(),
    }
}

/// Namespace declarations introduced by this element, followed by its attributes.
fn declared_attrs(node: roxmltree::Node<'_, '_>) -> Vec<(String, String)> {
    let parent_scope: Vec<(Option<&str>, &str)> = node
        .parent_element()
        .map(|p| p.namespaces().map(|ns| (ns.name(), ns.uri())).collect())
        .unwrap_or_default();

    let mut attrs: Vec<(String, String)> = node
        .namespaces()
        .filter(|ns| ns.uri() != XML_NS && !parent_scope.contains(&(ns.name(), ns.uri())))
        .map(|ns| match ns.name() {
            Some(prefix) => (format!("xmlns:{prefix}"), ns.uri().to_owned()),
            None => ("xmlns".to_owned(), ns.uri().to_owned()),
        })
        .collect();

    for attr in node.attributes() {
        let prefix = attr.namespace().and_then(|ns| node.lookup_prefix(ns));
        let name = match prefix {
            Some(prefix) => format!("{prefix}:{}", attr.name()),
            None => attr.name().to_owned(),
        };
        attrs.push((name, attr.value().to_owned()));
    }
    attrs
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#13;"),
            _ => out.push(c),
        }
    }
}

fn escape_attr(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            '\t' => out.push_str("&#9;"),
            _ => out.push(c),
        }
    }
}

/// Leading numeric part of a length, ignoring any unit suffix.
#[must_use]
pub fn parse_length(value: &str) -> Option<f64> {
    let value = value.trim();
    let end = value
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || c == '.' || ((c == '-' || c == '+') && i == 0)))
        .map_or(value.len(), |(i, _)| i);
    match value[..end].parse::<f64>() {
        Ok(v) if v.is_finite() => Some(v),
        _ => None,
    }
}
