//! Arena-backed tree storage.
//!
//! Generalized from the `k` crate's `IdTree<T>`: nodes live in one `Vec`
//! and reference each other by index rather than by pointer, so the tree
//! has no lifetime parameter and no `Rc`/`RefCell` bookkeeping (§9:
//! "arena+index ... without cycles").

use std::slice::{Iter, IterMut};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

#[derive(Debug)]
pub struct ArenaNode<T> {
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub id: NodeId,
    pub data: T,
}

impl<T> ArenaNode<T> {
    fn new(data: T, id: NodeId) -> Self {
        ArenaNode { parent: None, children: Vec::new(), id, data }
    }
}

/// An arena of `ArenaNode<T>`, addressed by `NodeId`.
#[derive(Debug, Default)]
pub struct Arena<T> {
    nodes: Vec<ArenaNode<T>>,
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Arena { nodes: Vec::new() }
    }

    pub fn create_node(&mut self, data: T) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(ArenaNode::new(data, id));
        id
    }

    pub fn set_parent_child(&mut self, parent_id: NodeId, child_id: NodeId) {
        self.nodes[child_id.0].parent = Some(parent_id);
        self.nodes[parent_id.0].children.push(child_id);
    }

    pub fn get(&self, id: NodeId) -> &ArenaNode<T> {
        &self.nodes[id.0]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut ArenaNode<T> {
        &mut self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> Iter<ArenaNode<T>> {
        self.nodes.iter()
    }

    pub fn iter_mut(&mut self) -> IterMut<ArenaNode<T>> {
        self.nodes.iter_mut()
    }

    pub fn root_id(&self) -> Option<NodeId> {
        self.nodes.iter().find(|n| n.parent.is_none()).map(|n| n.id)
    }

    /// Depth-first pre-order traversal that visits children in the order
    /// they were attached -- the order is user-meaningful for scene data
    /// (§4.2: "Order of children is preserved").
    pub fn walk_preorder<F: FnMut(NodeId)>(&self, root: NodeId, mut visit: F) {
        fn go<T, F: FnMut(NodeId)>(arena: &Arena<T>, id: NodeId, visit: &mut F) {
            visit(id);
            for &child in &arena.get(id).children {
                go(arena, child, visit);
            }
        }
        go(self, root, &mut visit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preorder_preserves_sibling_order() {
        let mut arena = Arena::<&'static str>::new();
        let root = arena.create_node("root");
        let a = arena.create_node("a");
        let b = arena.create_node("b");
        let c = arena.create_node("c");
        arena.set_parent_child(root, a);
        arena.set_parent_child(root, b);
        arena.set_parent_child(a, c);

        let mut order = Vec::new();
        arena.walk_preorder(root, |id| order.push(arena.get(id).data));
        assert_eq!(order, vec!["root", "a", "c", "b"]);
    }

    #[test]
    fn root_id_finds_parentless_node() {
        let mut arena = Arena::<i32>::new();
        let root = arena.create_node(0);
        let child = arena.create_node(1);
        arena.set_parent_child(root, child);
        assert_eq!(arena.root_id(), Some(root));
    }
}
