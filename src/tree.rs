//! Document model: placed elements and the tree that owns them.
//!
//! `DocumentTree` is an arena keyed by [`NodeId`]. Each [`ElementNode`] lists
//! its children by id and keeps a plain `parent` id for lookups; ownership of
//! every node stays with the arena, so relocating a subtree only rewrites the
//! moved node's `parent` and the two children sequences involved.
//!
//! [`NodeSnapshot`] is the nested, plain representation used for inserting
//! whole subtrees and for `serialize`/`load`.

#[cfg(test)]
#[path = "tree_test.rs"]
mod tree_test;

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::EditorError;
use crate::kind::ElementKind;

/// Unique identifier for a placed element.
pub type NodeId = Uuid;

/// A placed element as stored in the arena.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementNode {
    pub id: NodeId,
    pub kind: ElementKind,
    /// Content and attributes edited through the property panel.
    pub properties: Map<String, Value>,
    /// Inline style overrides.
    pub styles: BTreeMap<String, String>,
    /// Child ids in paint order.
    pub children: Vec<NodeId>,
    /// Owning node; `None` only for the root.
    pub parent: Option<NodeId>,
}

/// Plain nested record mirroring [`ElementNode`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub kind: ElementKind,
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<NodeId>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub styles: BTreeMap<String, String>,
}

impl NodeSnapshot {
    /// A fresh element of `kind` with a new id and the kind's default properties.
    #[must_use]
    pub fn new(kind: ElementKind) -> Self {
        Self::with_id(Uuid::new_v4(), kind)
    }

    #[must_use]
    pub fn with_id(id: NodeId, kind: ElementKind) -> Self {
        Self {
            id,
            kind,
            properties: kind.default_properties(),
            children: Vec::new(),
            parent: None,
            styles: BTreeMap::new(),
        }
    }

    /// Append `child` and return `self`, for building fixtures.
    #[must_use]
    pub fn child(mut self, child: NodeSnapshot) -> Self {
        self.children.push(child);
        self
    }

    /// Visit this node and all descendants in pre-order.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a NodeSnapshot)) {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            visit(node);
            stack.extend(node.children.iter().rev());
        }
    }
}

/// The owning structure of all placed elements plus an id index.
#[derive(Debug, Default)]
pub struct DocumentTree {
    root: Option<NodeId>,
    nodes: HashMap<NodeId, ElementNode>,
}

impl DocumentTree {
    /// Create an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tree holding only a childless root.
    #[must_use]
    pub fn with_root(id: NodeId, kind: ElementKind) -> Self {
        let mut tree = Self::new();
        tree.index_subtree(NodeSnapshot::with_id(id, kind), None);
        tree
    }

    #[must_use]
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Number of nodes, root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Return a node by id.
    #[must_use]
    pub fn lookup(&self, id: &NodeId) -> Option<&ElementNode> {
        self.nodes.get(id)
    }

    /// Attach `node` (and its subtree) as the last child of `parent`.
    ///
    /// With no `parent`, an empty tree adopts `node` as its root and a
    /// non-empty tree attaches it under the root. Every node in the subtree is
    /// indexed and its `parent` rewritten to reflect the new position.
    ///
    /// # Errors
    ///
    /// `NotFound` if `parent` is given but unknown; `InvalidOperation` if any id
    /// in the subtree is already present or repeated.
    pub fn insert(&mut self, node: NodeSnapshot, parent: Option<NodeId>) -> Result<NodeId, EditorError> {
        let parent = match parent {
            Some(pid) if !self.nodes.contains_key(&pid) => return Err(EditorError::NotFound(pid)),
            Some(pid) => Some(pid),
            None => self.root,
        };

        let mut seen = HashSet::new();
        let mut clash = None;
        node.walk(&mut |n| {
            if clash.is_none() && (self.nodes.contains_key(&n.id) || !seen.insert(n.id)) {
                clash = Some(n.id);
            }
        });
        if let Some(id) = clash {
            return Err(EditorError::InvalidOperation(format!("duplicate node id {id}")));
        }

        let id = node.id;
        if let Some(pid) = parent {
            if let Some(p) = self.nodes.get_mut(&pid) {
                p.children.push(id);
            }
        }
        self.index_subtree(node, parent);
        Ok(id)
    }

    /// Detach a node from its parent and drop it and its subtree from the index.
    ///
    /// Returns the removed subtree.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id; `InvalidOperation` for the root.
    pub fn remove(&mut self, id: &NodeId) -> Result<NodeSnapshot, EditorError> {
        let Some(node) = self.nodes.get(id) else {
            return Err(EditorError::NotFound(*id));
        };
        let Some(parent) = node.parent else {
            return Err(EditorError::InvalidOperation("the root cannot be removed".into()));
        };

        if let Some(p) = self.nodes.get_mut(&parent) {
            p.children.retain(|c| c != id);
        }
        let Some(mut removed) = self.take_subtree(id) else {
            return Err(EditorError::NotFound(*id));
        };
        removed.parent = None;
        Ok(removed)
    }

    /// Relocate `id` under `new_parent` at `index` (appended when `None`).
    ///
    /// The node is detached before it is attached, so `index` addresses the
    /// destination sequence as it looks without the moved node. Out-of-range
    /// indices append.
    ///
    /// # Errors
    ///
    /// `NotFound` if either id is unknown; `InvalidOperation` when moving the
    /// root or moving a node into its own subtree.
    pub fn move_node(&mut self, id: &NodeId, new_parent: &NodeId, index: Option<usize>) -> Result<(), EditorError> {
        let Some(node) = self.nodes.get(id) else {
            return Err(EditorError::NotFound(*id));
        };
        if !self.nodes.contains_key(new_parent) {
            return Err(EditorError::NotFound(*new_parent));
        }
        let Some(old_parent) = node.parent else {
            return Err(EditorError::InvalidOperation("the root cannot be re-parented".into()));
        };
        if self.is_ancestor_or_self(id, new_parent) {
            return Err(EditorError::InvalidOperation(format!("{id} cannot be moved into its own subtree")));
        }

        if let Some(p) = self.nodes.get_mut(&old_parent) {
            p.children.retain(|c| c != id);
        }
        if let Some(p) = self.nodes.get_mut(new_parent) {
            let at = index.map_or(p.children.len(), |i| i.min(p.children.len()));
            p.children.insert(at, *id);
        }
        if let Some(n) = self.nodes.get_mut(id) {
            n.parent = Some(*new_parent);
        }
        Ok(())
    }

    /// Merge `updates` into a node's properties. `null` values delete keys.
    ///
    /// # Errors
    ///
    /// `NotFound` if `id` is unknown.
    pub fn update_properties(&mut self, id: &NodeId, updates: &Map<String, Value>) -> Result<(), EditorError> {
        let Some(node) = self.nodes.get_mut(id) else {
            return Err(EditorError::NotFound(*id));
        };
        for (k, v) in updates {
            if v.is_null() {
                node.properties.remove(k);
            } else {
                node.properties.insert(k.clone(), v.clone());
            }
        }
        Ok(())
    }

    /// Whether `ancestor` is `id` itself or lies on `id`'s parent chain.
    #[must_use]
    pub fn is_ancestor_or_self(&self, ancestor: &NodeId, id: &NodeId) -> bool {
        let mut cursor = Some(*id);
        while let Some(cur) = cursor {
            if cur == *ancestor {
                return true;
            }
            cursor = self.nodes.get(&cur).and_then(|n| n.parent);
        }
        false
    }

    /// Ids of `id` and all its descendants in pre-order. Empty for unknown ids.
    #[must_use]
    pub fn descendants(&self, id: &NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![*id];
        while let Some(cur) = stack.pop() {
            let Some(node) = self.nodes.get(&cur) else {
                continue;
            };
            out.push(cur);
            stack.extend(node.children.iter().rev());
        }
        out
    }

    /// Produce the nested snapshot of the whole tree.
    #[must_use]
    pub fn serialize(&self) -> Option<NodeSnapshot> {
        self.root.and_then(|r| self.snapshot_of(&r))
    }

    /// Nested snapshot of the subtree rooted at `id`.
    #[must_use]
    pub fn snapshot_of(&self, id: &NodeId) -> Option<NodeSnapshot> {
        assemble(id, self.descendants(id), |cur| self.nodes.get(cur).cloned())
    }

    /// Replace the whole tree with `snapshot`, rebuilding the index from scratch.
    ///
    /// A snapshot is rejected when ids repeat, when the root records a parent,
    /// or when a child's recorded `parent` disagrees with the node that lists
    /// it. Absent `parent` fields are filled in. On error the current tree is
    /// left untouched.
    ///
    /// # Errors
    ///
    /// `InvalidSnapshot` describing the first inconsistency found.
    pub fn load(&mut self, snapshot: NodeSnapshot) -> Result<(), EditorError> {
        if let Some(p) = snapshot.parent {
            return Err(EditorError::InvalidSnapshot(format!("root {} records parent {p}", snapshot.id)));
        }
        validate_snapshot(&snapshot)?;

        let mut fresh = Self::new();
        fresh.index_subtree(snapshot, None);
        *self = fresh;
        Ok(())
    }

    fn index_subtree(&mut self, node: NodeSnapshot, parent: Option<NodeId>) {
        if parent.is_none() {
            self.root = Some(node.id);
        }
        let mut stack = vec![(node, parent)];
        while let Some((node, parent)) = stack.pop() {
            let id = node.id;
            let children: Vec<NodeId> = node.children.iter().map(|c| c.id).collect();
            self.nodes.insert(
                id,
                ElementNode {
                    id,
                    kind: node.kind,
                    properties: node.properties,
                    styles: node.styles,
                    children,
                    parent,
                },
            );
            stack.extend(node.children.into_iter().map(|child| (child, Some(id))));
        }
    }

    fn take_subtree(&mut self, id: &NodeId) -> Option<NodeSnapshot> {
        let order = self.descendants(id);
        assemble(id, order, |cur| self.nodes.remove(cur))
    }
}

/// Build the nested snapshot rooted at `id` from a pre-order id list.
///
/// Nodes are fetched in reverse pre-order so every child is assembled before
/// its parent.
fn assemble(
    id: &NodeId,
    order: Vec<NodeId>,
    mut fetch: impl FnMut(&NodeId) -> Option<ElementNode>,
) -> Option<NodeSnapshot> {
    let mut built: HashMap<NodeId, NodeSnapshot> = HashMap::new();
    for cur in order.iter().rev() {
        let Some(node) = fetch(cur) else {
            continue;
        };
        let children = node.children.iter().filter_map(|c| built.remove(c)).collect();
        built.insert(
            node.id,
            NodeSnapshot {
                id: node.id,
                kind: node.kind,
                properties: node.properties,
                children,
                parent: node.parent,
                styles: node.styles,
            },
        );
    }
    built.remove(id)
}

fn validate_snapshot(root: &NodeSnapshot) -> Result<(), EditorError> {
    let mut seen = HashSet::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if !seen.insert(node.id) {
            return Err(EditorError::InvalidSnapshot(format!("duplicate node id {}", node.id)));
        }
        for child in &node.children {
            if let Some(p) = child.parent {
                if p != node.id {
                    return Err(EditorError::InvalidSnapshot(format!(
                        "{} records parent {p} but is listed under {}",
                        child.id, node.id
                    )));
                }
            }
        }
        stack.extend(node.children.iter().rev());
    }
    Ok(())
}
