//! Namespace tree for the data sink
//!
//! Channels are organized into a forest of namespace nodes, one supplier
//! root per upstream source. Each node's children are kept sorted with the
//! crate [`Collator`] so lookups binary-search and render order is stable:
//! the same set of insertions yields the same tree regardless of order.
//!
//! Removing a channel removes only the terminal node; intermediate nodes
//! that become empty are left in place so the tree keeps its shape across
//! reconnect cycles.

use std::sync::Arc;

use crate::collate::Collator;
use crate::sink::channel::DataChannel;

/// One segment of the namespace tree.
#[derive(Debug, Clone, Default)]
pub struct DataNode {
    /// Node identifier (full path, rewritten to `source:id` once a channel binds)
    pub id: String,
    /// Display name (own path segment)
    pub name: String,
    /// Nested nodes, sorted by the collator
    pub nodes: Vec<DataNode>,
    /// Data channel mounted at the node
    pub channel: Option<Arc<DataChannel>>,
}

impl DataNode {
    /// Create a node with the given identifier and display name.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            nodes: Vec::new(),
            channel: None,
        }
    }
}

/// Separates a path into tokens, trimming ornamental whitespace and
/// dropping empty segments. Both `/` and `:` act as separators.
pub fn split_path(path: &str) -> Vec<&str> {
    path.split(['/', ':'])
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .collect()
}

/// Returns the node corresponding to `path`, creating intermediate nodes
/// as necessary. Returns `None` if the path is trivially empty.
///
/// Children stay sorted at every level; insertion position comes from a
/// binary search with the collator.
pub fn get_or_create<'a>(
    root: &'a mut DataNode,
    path: &str,
    collator: &Collator,
) -> Option<&'a mut DataNode> {
    let tokens = split_path(path);
    if tokens.is_empty() {
        return None;
    }

    let mut current = root;
    for token in tokens {
        let index = match current
            .nodes
            .binary_search_by(|node| collator.compare(&node.name, token))
        {
            Ok(index) => index,
            Err(index) => {
                let id = format!("{}/{}", current.id, token);
                current.nodes.insert(index, DataNode::new(id, token));
                index
            }
        };

        current = &mut current.nodes[index];
    }

    Some(current)
}

/// Removes the node corresponding to `path`.
///
/// Returns `false` without mutating anything when any path segment is
/// missing; never creates nodes. On a full match the terminal node is
/// detached from its parent and its channel binding cleared. Intermediate
/// nodes are never pruned.
pub fn remove(root: &mut DataNode, path: &str, collator: &Collator) -> bool {
    let tokens = split_path(path);
    if tokens.is_empty() {
        return false;
    }

    remove_tokens(root, &tokens, collator)
}

fn remove_tokens(parent: &mut DataNode, tokens: &[&str], collator: &Collator) -> bool {
    let Ok(index) = parent
        .nodes
        .binary_search_by(|node| collator.compare(&node.name, tokens[0]))
    else {
        return false;
    };

    if tokens.len() == 1 {
        let mut removed = parent.nodes.remove(index);
        removed.channel = None;
        true
    } else {
        remove_tokens(&mut parent.nodes[index], &tokens[1..], collator)
    }
}
