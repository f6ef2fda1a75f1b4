//! DOM Operations Adapter
//!
//! Thin layer over the `dom_query` crate giving the reducer and the locator
//! engine the handful of tree operations they need: parsing, destructive
//! cleanup, serialization and node-level accessors used for path
//! evaluation.

// Re-export core types for external use
pub use dom_query::{Document, NodeId, NodeRef, Selection};

// Re-export StrTendril for external use
pub use tendril::StrTendril;

// === Parsing and Serialization ===

/// Parse HTML into a document tree.
///
/// html5ever is error tolerant: malformed markup yields a best-effort tree,
/// never an error.
#[inline]
#[must_use]
pub fn parse(html: &str) -> Document {
    Document::from(html)
}

/// Serialize the whole document back to markup.
#[inline]
#[must_use]
pub fn serialize(doc: &Document) -> StrTendril {
    doc.html()
}

// === Destructive Cleanup ===

/// Remove every element whose tag is in `tags`, with its subtree.
pub fn remove_tags(doc: &Document, tags: &[&str]) {
    if tags.is_empty() {
        return;
    }
    doc.select(&tags.join(", ")).remove();
}

/// Remove all comment nodes from the document.
pub fn remove_comments(doc: &Document) {
    let comments: Vec<NodeRef> = document_order(doc)
        .into_iter()
        .filter(NodeRef::is_comment)
        .collect();

    for node in comments {
        Selection::from(node).remove();
    }
}

// === Node Accessors ===

/// Lowercased tag name of an element, `None` for other node kinds.
#[must_use]
pub fn tag_name(node: &NodeRef) -> Option<String> {
    if !node.is_element() {
        return None;
    }
    node.node_name().map(|t| t.to_ascii_lowercase())
}

/// Attributes of an element in source order as `(name, value)` pairs.
#[must_use]
pub fn attributes(node: &NodeRef) -> Vec<(String, String)> {
    if !node.is_element() {
        return Vec::new();
    }
    node.attrs()
        .iter()
        .map(|attr| (attr.name.local.to_string(), attr.value.to_string()))
        .collect()
}

/// Text of a node: its own text for text nodes, the concatenated text of
/// all descendant text nodes for elements and the document.
#[inline]
#[must_use]
pub fn text_content(node: &NodeRef) -> StrTendril {
    node.text()
}

// === Traversal ===

/// Direct child nodes (elements, text, comments) in document order.
#[must_use]
pub fn child_nodes<'a>(node: &NodeRef<'a>) -> Vec<NodeRef<'a>> {
    let mut out = Vec::new();
    let mut child = node.first_child();
    while let Some(c) = child {
        child = c.next_sibling();
        out.push(c);
    }
    out
}

/// All descendants of `node` in document (pre-)order, excluding `node`.
#[must_use]
pub fn descendant_nodes<'a>(node: &NodeRef<'a>) -> Vec<NodeRef<'a>> {
    let mut out = Vec::new();
    let mut stack: Vec<NodeRef<'a>> = child_nodes(node).into_iter().rev().collect();
    while let Some(current) = stack.pop() {
        stack.extend(child_nodes(&current).into_iter().rev());
        out.push(current);
    }
    out
}

/// The document node followed by every node of the tree in document order.
#[must_use]
pub fn document_order(doc: &Document) -> Vec<NodeRef<'_>> {
    let root = doc.root();
    let mut out = vec![root];
    out.extend(descendant_nodes(&root));
    out
}

/// Ancestors of `node`, nearest first, ending with the document node.
#[must_use]
pub fn ancestor_nodes<'a>(node: &NodeRef<'a>) -> Vec<NodeRef<'a>> {
    let mut out = Vec::new();
    let mut current = node.parent();
    while let Some(p) = current {
        current = p.parent();
        out.push(p);
    }
    out
}

/// Following siblings, nearest first.
#[must_use]
pub fn following_siblings<'a>(node: &NodeRef<'a>) -> Vec<NodeRef<'a>> {
    let mut out = Vec::new();
    let mut current = node.next_sibling();
    while let Some(s) = current {
        current = s.next_sibling();
        out.push(s);
    }
    out
}

/// Preceding siblings, nearest first.
#[must_use]
pub fn preceding_siblings<'a>(node: &NodeRef<'a>) -> Vec<NodeRef<'a>> {
    let mut out = Vec::new();
    let mut current = node.prev_sibling();
    while let Some(s) = current {
        current = s.prev_sibling();
        out.push(s);
    }
    out
}
