//! Scene graph: CPU-side hierarchy of nodes.
//!
//! Nodes live in an id-keyed arena with parent/child links. World transforms
//! are cached on the nodes and refreshed by [`SceneGraph::update_world_transforms`]
//! whenever the hierarchy or a local transform changed.

use std::collections::HashMap;

use glam::Mat4;

use super::node::{LocalTransform, NodeContent, SceneNode, SceneNodeId};

/// CPU-side scene graph.
#[derive(Debug)]
pub struct SceneGraph {
    nodes: HashMap<SceneNodeId, SceneNode>,
    root: SceneNodeId,
    next_id: u64,
    dirty: bool,
}

impl SceneGraph {
    /// Create a new scene graph with a root Group node.
    pub fn new() -> Self {
        let root_id = SceneNodeId(0);
        let root_node = SceneNode::new(root_id, "root", NodeContent::Group);

        let mut nodes = HashMap::new();
        nodes.insert(root_id, root_node);

        Self {
            nodes,
            root: root_id,
            next_id: 1,
            dirty: true,
        }
    }

    /// Get the root node ID.
    pub fn root(&self) -> SceneNodeId {
        self.root
    }

    fn alloc_id(&mut self) -> SceneNodeId {
        let id = SceneNodeId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Add a child node under `parent`. Returns the new node's ID.
    pub fn add_child(
        &mut self,
        parent: SceneNodeId,
        name: impl Into<String>,
        content: NodeContent,
    ) -> SceneNodeId {
        let id = self.alloc_id();
        let mut node = SceneNode::new(id, name, content);
        node.parent = Some(parent);

        self.nodes.insert(id, node);

        if let Some(parent_node) = self.nodes.get_mut(&parent) {
            parent_node.children.push(id);
        }

        self.dirty = true;
        id
    }

    /// Remove a node and its entire subtree. Cannot remove the root.
    ///
    /// Returns the removed nodes, subtree root first, so callers can release
    /// whatever they reference.
    pub fn remove(&mut self, id: SceneNodeId) -> Vec<SceneNode> {
        if id == self.root || !self.nodes.contains_key(&id) {
            return Vec::new();
        }

        let to_remove = self.subtree(id);

        if let Some(parent_id) = self.nodes.get(&id).and_then(|n| n.parent) {
            if let Some(parent) = self.nodes.get_mut(&parent_id) {
                parent.children.retain(|c| *c != id);
            }
        }

        self.dirty = true;
        to_remove
            .into_iter()
            .filter_map(|nid| self.nodes.remove(&nid))
            .collect()
    }

    /// Move a node to a new parent. Cannot reparent the root.
    pub fn reparent(&mut self, id: SceneNodeId, new_parent: SceneNodeId) {
        if id == self.root || !self.nodes.contains_key(&new_parent) {
            return;
        }

        if let Some(old_parent_id) = self.nodes.get(&id).and_then(|n| n.parent) {
            if let Some(old_parent) = self.nodes.get_mut(&old_parent_id) {
                old_parent.children.retain(|c| *c != id);
            }
        }

        if let Some(new_parent_node) = self.nodes.get_mut(&new_parent) {
            new_parent_node.children.push(id);
        }
        if let Some(node) = self.nodes.get_mut(&id) {
            node.parent = Some(new_parent);
        }

        self.dirty = true;
    }

    /// Set the local transform of a node.
    pub fn set_transform(&mut self, id: SceneNodeId, transform: LocalTransform) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.local_transform = transform;
            self.dirty = true;
        }
    }

    /// Set the visibility of a node.
    pub fn set_visible(&mut self, id: SceneNodeId, visible: bool) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.visible = visible;
        }
    }

    pub fn contains(&self, id: SceneNodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Get an immutable reference to a node.
    pub fn get(&self, id: SceneNodeId) -> Option<&SceneNode> {
        self.nodes.get(&id)
    }

    /// Get a mutable reference to a node.
    pub fn get_mut(&mut self, id: SceneNodeId) -> Option<&mut SceneNode> {
        self.dirty = true;
        self.nodes.get_mut(&id)
    }

    /// Iterate over the children of a node.
    pub fn children(&self, id: SceneNodeId) -> impl Iterator<Item = SceneNodeId> + '_ {
        self.nodes
            .get(&id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
            .iter()
            .copied()
    }

    /// `id` followed by its ancestors up to the root.
    pub fn ancestors(&self, id: SceneNodeId) -> impl Iterator<Item = &SceneNode> + '_ {
        std::iter::successors(self.nodes.get(&id), |node| {
            node.parent.and_then(|p| self.nodes.get(&p))
        })
    }

    /// All node IDs of the subtree rooted at `id`, breadth first.
    pub fn subtree(&self, id: SceneNodeId) -> Vec<SceneNodeId> {
        if !self.nodes.contains_key(&id) {
            return Vec::new();
        }
        let mut out = vec![id];
        let mut i = 0;
        while i < out.len() {
            if let Some(node) = self.nodes.get(&out[i]) {
                out.extend_from_slice(&node.children);
            }
            i += 1;
        }
        out
    }

    /// Subtree of `id` restricted to nodes whose whole ancestor chain
    /// (within the subtree) is visible.
    pub fn visible_subtree(&self, id: SceneNodeId) -> Vec<SceneNodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get(&current) else {
                continue;
            };
            if !node.visible {
                continue;
            }
            out.push(current);
            stack.extend(node.children.iter().rev());
        }
        out
    }

    /// First node in the subtree of `id` with the given name.
    pub fn find_by_name(&self, id: SceneNodeId, name: &str) -> Option<SceneNodeId> {
        self.subtree(id)
            .into_iter()
            .find(|nid| self.nodes.get(nid).is_some_and(|n| n.name == name))
    }

    /// Total number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Cached world transform of a node. Call
    /// [`update_world_transforms`](Self::update_world_transforms) after edits.
    pub fn world_transform(&self, id: SceneNodeId) -> Mat4 {
        self.nodes
            .get(&id)
            .map(|n| n.world_transform)
            .unwrap_or(Mat4::IDENTITY)
    }

    /// Propagate world transforms from the root if anything changed.
    pub fn update_world_transforms(&mut self) {
        if !self.dirty {
            return;
        }
        self.propagate_transforms(self.root, Mat4::IDENTITY);
        self.dirty = false;
    }

    fn propagate_transforms(&mut self, node_id: SceneNodeId, parent_world: Mat4) {
        let (local_mat, children) = {
            let node = match self.nodes.get(&node_id) {
                Some(n) => n,
                None => return,
            };
            (node.local_transform.to_mat4(), node.children.clone())
        };

        let world = parent_world * local_mat;

        if let Some(node) = self.nodes.get_mut(&node_id) {
            node.world_transform = world;
        }

        for child_id in children {
            self.propagate_transforms(child_id, world);
        }
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}
