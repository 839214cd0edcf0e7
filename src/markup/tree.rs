//! Element arena built from quick-xml events.

use crate::error::{Error, Result};
use quick_xml::events::Event;
use quick_xml::Reader;

/// Index of an element inside a [`MarkupTree`].
///
/// Elements are stored in document order, so a smaller id always precedes a
/// larger one in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
enum Content {
    Element(NodeId),
    Text(String),
}

#[derive(Debug, Clone)]
struct Element {
    name: String,
    parent: Option<NodeId>,
    content: Vec<Content>,
    /// One past the id of the last descendant.
    subtree_end: usize,
}

/// Parsed markup document.
#[derive(Debug, Clone)]
pub struct MarkupTree {
    elements: Vec<Element>,
}

impl MarkupTree {
    /// Parse markup text into a tree.
    ///
    /// Malformed markup (mismatched or unclosed tags, bad entities, no root
    /// element) is a decode error.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut elements: Vec<Element> = Vec::new();
        let mut stack: Vec<NodeId> = Vec::new();

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) => {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                    let id = push_element(&mut elements, &stack, name);
                    stack.push(id);
                },
                Ok(Event::Empty(ref e)) => {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                    push_element(&mut elements, &stack, name);
                },
                Ok(Event::End(_)) => {
                    if let Some(id) = stack.pop() {
                        elements[id.0].subtree_end = elements.len();
                    }
                },
                Ok(Event::Text(e)) => {
                    let text = e.unescape().map_err(|err| {
                        Error::decode(
                            &format!("Invalid KML text near byte {}", reader.buffer_position()),
                            err,
                        )
                    })?;
                    append_text(&mut elements, &stack, &text);
                },
                Ok(Event::CData(e)) => {
                    append_text(&mut elements, &stack, &String::from_utf8_lossy(&e));
                },
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::decode(
                        &format!("KML parse error near byte {}", reader.buffer_position()),
                        e,
                    ));
                },
                _ => {},
            }
        }

        if let Some(open) = stack.last() {
            return Err(Error::Decode(format!(
                "KML parse error: element <{}> is never closed",
                elements[open.0].name
            )));
        }
        if elements.is_empty() {
            return Err(Error::Decode("KML document has no root element".to_string()));
        }

        Ok(Self { elements })
    }

    /// The document element.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Number of elements in the tree.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the tree holds no elements. Always false for a parsed tree.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Local name of an element.
    pub fn name(&self, id: NodeId) -> &str {
        &self.elements[id.0].name
    }

    /// Parent of an element, `None` for the root.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.elements[id.0].parent
    }

    /// Direct element children, in document order.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.elements[id.0].content.iter().filter_map(|c| match c {
            Content::Element(child) => Some(*child),
            Content::Text(_) => None,
        })
    }

    /// Direct element children with the given name.
    pub fn children_named<'a>(
        &'a self,
        id: NodeId,
        name: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.children(id).filter(move |child| self.name(*child) == name)
    }

    /// All descendants of an element (excluding itself), in document order.
    pub fn descendants(&self, id: NodeId) -> impl Iterator<Item = NodeId> {
        (id.0 + 1..self.elements[id.0].subtree_end).map(NodeId)
    }

    /// Descendants of an element with the given name, in document order.
    pub fn descendants_named<'a>(
        &'a self,
        id: NodeId,
        name: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.descendants(id).filter(move |node| self.name(*node) == name)
    }

    /// Every element in the document with the given name.
    pub fn find_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = NodeId> + 'a {
        (0..self.elements.len())
            .map(NodeId)
            .filter(move |node| self.name(*node) == name)
    }

    /// First descendant matching a descendant-combinator path.
    ///
    /// `select_first(scope, &["Polygon", "LinearRing", "coordinates"])` finds
    /// the first `coordinates` element below `scope` that has a `LinearRing`
    /// ancestor which in turn has a `Polygon` ancestor, all inside `scope`.
    pub fn select_first(&self, scope: NodeId, path: &[&str]) -> Option<NodeId> {
        let (target, ancestors) = path.split_last()?;
        self.descendants_named(scope, target)
            .find(|node| self.has_ancestor_path(*node, scope, ancestors))
    }

    fn has_ancestor_path(&self, node: NodeId, scope: NodeId, ancestors: &[&str]) -> bool {
        let mut remaining = ancestors;
        let mut current = self.parent(node);
        while let Some((wanted, rest)) = remaining.split_last() {
            match current {
                Some(id) if id != scope => {
                    if self.name(id) == *wanted {
                        remaining = rest;
                    }
                    current = self.parent(id);
                },
                _ => return false,
            }
        }
        true
    }

    /// Concatenated text of an element and all its descendants.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        for content in &self.elements[id.0].content {
            match content {
                Content::Text(text) => out.push_str(text),
                Content::Element(child) => self.collect_text(*child, out),
            }
        }
    }

    /// Text content of the first descendant with the given name.
    pub fn first_text(&self, scope: NodeId, name: &str) -> Option<String> {
        self.descendants_named(scope, name)
            .next()
            .map(|node| self.text_content(node))
    }
}

fn push_element(elements: &mut Vec<Element>, stack: &[NodeId], name: String) -> NodeId {
    let id = NodeId(elements.len());
    let parent = stack.last().copied();
    elements.push(Element {
        name,
        parent,
        content: Vec::new(),
        subtree_end: id.0 + 1,
    });
    if let Some(parent) = parent {
        elements[parent.0].content.push(Content::Element(id));
    }
    id
}

fn append_text(elements: &mut [Element], stack: &[NodeId], text: &str) {
    // Text outside the document element (prolog whitespace) has no owner.
    if let Some(owner) = stack.last() {
        elements[owner.0].content.push(Content::Text(text.to_string()));
    }
}
