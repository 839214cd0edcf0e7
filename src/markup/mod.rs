//! Queryable KML element tree.
//!
//! The asset parser needs a small subset of DOM behaviour: find every
//! element with a given tag, walk direct children, take the first descendant
//! matching a short descendant path (`Point coordinates`), and read an
//! element's text content. [`MarkupTree`] builds an element arena with
//! quick-xml and answers exactly those queries.
//!
//! Element names are matched on their local name, so namespace prefixes
//! (`kml:Folder`) are ignored.

mod tree;

pub use tree::{MarkupTree, NodeId};
