//! Document snapshot model.
//!
//! The engine does not run inside a browser; the host hands it a snapshot
//! of the page as an arena of elements (tag, attributes, direct text,
//! bounding rect, parent/children). Mutation helpers exist so hosts can
//! patch a snapshot between passes instead of rebuilding it.

use crate::core::BoundingRect;

/// Handle to one element in a [`Document`]. Only meaningful for the
/// document that issued it; a handle whose subtree was detached no longer
/// satisfies [`Document::contains`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

/// Tags that render without a closing tag and carry no children.
const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

#[derive(Clone, Debug)]
pub(crate) struct ElementData {
    pub tag_name: String,
    /// Insertion order preserved so rendered markup is deterministic.
    pub attributes: Vec<(String, String)>,
    /// Direct text of this element (not descendants).
    pub text: String,
    pub bounding_rect: BoundingRect,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

/// An element-tree snapshot of one page.
#[derive(Clone, Debug)]
pub struct Document {
    nodes: Vec<ElementData>,
    root: NodeId,
}

impl Document {
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Whether `id` is attached, i.e. reachable from the root.
    pub fn contains(&self, id: NodeId) -> bool {
        let mut cur = id;
        if cur.0 >= self.nodes.len() {
            return false;
        }
        while let Some(parent) = self.nodes[cur.0].parent {
            cur = parent;
        }
        cur == self.root
    }

    pub fn tag_name(&self, id: NodeId) -> &str {
        &self.nodes[id.0].tag_name
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.nodes[id.0]
            .attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn bounding_rect(&self, id: NodeId) -> BoundingRect {
        self.nodes[id.0].bounding_rect
    }

    /// 1-based position of `id` among same-tag siblings (CSS
    /// `:nth-of-type` semantics). The root counts as 1.
    pub fn nth_of_type(&self, id: NodeId) -> usize {
        let Some(parent) = self.nodes[id.0].parent else {
            return 1;
        };
        let tag = &self.nodes[id.0].tag_name;
        self.nodes[parent.0]
            .children
            .iter()
            .filter(|c| &self.nodes[c.0].tag_name == tag)
            .position(|c| *c == id)
            .map_or(1, |i| i + 1)
    }

    /// All attached elements in document (preorder) order.
    pub fn traverse(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            out.push(id);
            for child in self.nodes[id.0].children.iter().rev() {
                stack.push(*child);
            }
        }
        out
    }

    /// Concatenated text of the element and its descendants, in document
    /// order.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        out.push_str(&self.nodes[id.0].text);
        for child in &self.nodes[id.0].children {
            self.collect_text(*child, out);
        }
    }

    /// Rendered outer markup of the element and its subtree.
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.render(id, &mut out);
        out
    }

    fn render(&self, id: NodeId, out: &mut String) {
        let data = &self.nodes[id.0];
        out.push('<');
        out.push_str(&data.tag_name);
        for (name, value) in &data.attributes {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&escape_attr(value));
            out.push('"');
        }
        out.push('>');
        if VOID_TAGS.contains(&data.tag_name.as_str()) {
            return;
        }
        out.push_str(&escape_text(&data.text));
        for child in &data.children {
            self.render(*child, out);
        }
        out.push_str("</");
        out.push_str(&data.tag_name);
        out.push('>');
    }

    // ---- mutation helpers (host patches between passes) ----

    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        self.nodes[id.0].text = text.into();
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        let value = value.into();
        let attrs = &mut self.nodes[id.0].attributes;
        if let Some(slot) = attrs.iter_mut().find(|(n, _)| n == name) {
            slot.1 = value;
        } else {
            attrs.push((name.to_string(), value));
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        self.nodes[id.0].attributes.retain(|(n, _)| n != name);
    }

    pub fn set_bounding_rect(&mut self, id: NodeId, rect: BoundingRect) {
        self.nodes[id.0].bounding_rect = rect;
    }

    /// Detach the subtree rooted at `id`. The handle stays valid as a
    /// handle but the element is no longer part of the document.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|c| *c != id);
        }
    }
}

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn escape_attr(s: &str) -> String {
    escape_text(s).replace('"', "&quot;")
}

/// Builds a [`Document`] top-down.
///
/// The first `open` call creates the root. `open` returns the new node's
/// id and descends into it; `close` ascends. Ids can be used immediately.
pub struct DocumentBuilder {
    nodes: Vec<ElementData>,
    root: Option<NodeId>,
    open_stack: Vec<NodeId>,
}

impl DocumentBuilder {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            root: None,
            open_stack: Vec::new(),
        }
    }

    pub fn open(&mut self, tag: &str) -> NodeId {
        let id = NodeId(self.nodes.len());
        let parent = self.open_stack.last().copied();
        self.nodes.push(ElementData {
            tag_name: tag.to_ascii_lowercase(),
            attributes: Vec::new(),
            text: String::new(),
            bounding_rect: BoundingRect::new(0.0, 0.0, 0.0, 0.0),
            parent,
            children: Vec::new(),
        });
        if let Some(parent) = parent {
            self.nodes[parent.0].children.push(id);
        } else {
            self.root = Some(id);
        }
        self.open_stack.push(id);
        id
    }

    pub fn attr(&mut self, name: &str, value: &str) -> &mut Self {
        if let Some(id) = self.open_stack.last() {
            self.nodes[id.0]
                .attributes
                .push((name.to_string(), value.to_string()));
        }
        self
    }

    pub fn text(&mut self, text: &str) -> &mut Self {
        if let Some(id) = self.open_stack.last() {
            self.nodes[id.0].text.push_str(text);
        }
        self
    }

    pub fn rect(&mut self, x: f64, y: f64, width: f64, height: f64) -> &mut Self {
        if let Some(id) = self.open_stack.last() {
            self.nodes[id.0].bounding_rect = BoundingRect::new(x, y, width, height);
        }
        self
    }

    pub fn close(&mut self) -> &mut Self {
        self.open_stack.pop();
        self
    }

    /// Convenience: open, set text, close.
    pub fn leaf(&mut self, tag: &str, text: &str) -> NodeId {
        let id = self.open(tag);
        self.text(text);
        self.close();
        id
    }

    pub fn build(mut self) -> Document {
        let root = match self.root {
            Some(root) => root,
            None => {
                // Empty builder still yields a usable document.
                self.nodes.push(ElementData {
                    tag_name: "html".to_string(),
                    attributes: Vec::new(),
                    text: String::new(),
                    bounding_rect: BoundingRect::new(0.0, 0.0, 0.0, 0.0),
                    parent: None,
                    children: Vec::new(),
                });
                NodeId(0)
            }
        };
        Document {
            nodes: self.nodes,
            root,
        }
    }
}

impl Default for DocumentBuilder {
    fn default() -> Self {
        Self::new()
    }
}
