//! In-memory citation graph built during a single crawl.
//!
//! The [`GraphStore`] is the authoritative map of citation-key to [`Node`],
//! plus the ordered list of directed [`Edge`]s. Nodes are never removed during
//! a run; edges may point at keys that have no node (dangling edges are
//! recorded when the node cap was already reached at discovery time).

mod frontier;

pub use frontier::Frontier;

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use tracing::trace;

use crate::identity::CitationKey;
use crate::merge::merge_into;
use crate::record::Fields;

/// How a node entered the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeOrigin {
    /// Loaded from the initial seed batch.
    Seed,
    /// Created as a placeholder when first referenced as a citation target.
    Discovered,
}

impl NodeOrigin {
    /// Returns the stable label used in exported tables.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Seed => "seed",
            Self::Discovered => "discovered",
        }
    }
}

impl fmt::Display for NodeOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal state of a resolved node.
///
/// Both states end traversal for the node; the distinction is kept for
/// reporting only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The citation lookup succeeded.
    Resolved,
    /// The lookup failed or the key had no queryable form.
    FailedTerminal,
}

/// One distinct publication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    key: CitationKey,
    origin: NodeOrigin,
    fields: Fields,
    resolution: Option<Resolution>,
}

impl Node {
    fn new(key: CitationKey, origin: NodeOrigin, fields: Fields) -> Self {
        Self {
            key,
            origin,
            fields,
            resolution: None,
        }
    }

    /// Returns the node's citation-key.
    #[must_use]
    pub fn key(&self) -> &CitationKey {
        &self.key
    }

    /// Returns how the node entered the graph.
    #[must_use]
    pub fn origin(&self) -> NodeOrigin {
        self.origin
    }

    /// Returns the node's descriptive fields.
    #[must_use]
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Returns a single field value, if present.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Returns true once the node's citation list has been fetched or definitively failed.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.resolution.is_some()
    }

    /// Returns the terminal state, if resolved.
    #[must_use]
    pub fn resolution(&self) -> Option<Resolution> {
        self.resolution
    }
}

/// A directed citation `from -> to`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    /// Citing publication.
    pub from: CitationKey,
    /// Cited publication (may have no node).
    pub to: CitationKey,
}

/// Authoritative node table and edge list for one crawl.
#[derive(Debug, Default)]
pub struct GraphStore {
    nodes: Vec<Node>,
    index: HashMap<CitationKey, usize>,
    edges: Vec<Edge>,
    field_names: BTreeSet<String>,
}

impl GraphStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the store has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns true if a node with `key` exists.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Returns the node with `key`, if any.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.index.get(key).map(|&slot| &self.nodes[slot])
    }

    /// Inserts a new node. Returns `false` and leaves the store untouched if
    /// the key is already present.
    pub fn insert(&mut self, key: CitationKey, origin: NodeOrigin, fields: Fields) -> bool {
        if self.index.contains_key(&key) {
            return false;
        }
        self.field_names.extend(fields.keys().cloned());
        trace!(key = %key, %origin, "node created");
        self.index.insert(key.clone(), self.nodes.len());
        self.nodes.push(Node::new(key, origin, fields));
        true
    }

    /// Fill-gaps merges `incoming` into the node with `key`.
    ///
    /// Returns the number of fields written, or `None` if the node is unknown.
    pub fn merge_fields(&mut self, key: &str, incoming: &Fields) -> Option<usize> {
        let slot = *self.index.get(key)?;
        self.field_names.extend(incoming.keys().cloned());
        Some(merge_into(&mut self.nodes[slot].fields, incoming))
    }

    /// Marks the node with `key` as resolved.
    ///
    /// Returns `false` if the node is unknown or was already resolved; an
    /// existing resolution is never overwritten.
    pub fn mark_resolved(&mut self, key: &str, resolution: Resolution) -> bool {
        let Some(&slot) = self.index.get(key) else {
            return false;
        };
        let node = &mut self.nodes[slot];
        if node.resolution.is_some() {
            return false;
        }
        node.resolution = Some(resolution);
        true
    }

    /// Records a directed edge. Duplicates and dangling targets are allowed.
    pub fn add_edge(&mut self, from: CitationKey, to: CitationKey) {
        self.edges.push(Edge { from, to });
    }

    /// Iterates nodes in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Returns every recorded edge in insertion order.
    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Returns the sorted set of every field name observed on any node.
    #[must_use]
    pub fn field_names(&self) -> &BTreeSet<String> {
        &self.field_names
    }

    /// Returns the number of edges whose target has no node.
    #[must_use]
    pub fn dangling_edge_count(&self) -> usize {
        self.edges
            .iter()
            .filter(|edge| !self.contains(edge.to.as_str()))
            .count()
    }
}
