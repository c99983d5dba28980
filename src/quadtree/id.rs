use crate::quadtree::Node;
use std::num::NonZeroU32;
use std::ops::{Index, IndexMut};

/// Index of a node in the `Quadtree` arena.
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct NodeId(NonZeroU32);
impl NodeId {
    pub fn root() -> Self {
        NodeId(NonZeroU32::MIN)
    }
    pub fn index(&self) -> usize {
        self.0.get() as usize - 1
    }
    pub(super) fn from_index(index: usize) -> Self {
        let id = u32::try_from(index + 1).ok().and_then(NonZeroU32::new);
        NodeId(id.expect("quadtree arena exceeds u32 indices"))
    }
}
impl std::fmt::Debug for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "NodeId({})", self.index())
    }
}
impl Index<NodeId> for Vec<Node> {
    type Output = Node;
    fn index(&self, id: NodeId) -> &Node {
        &self[id.index()]
    }
}
impl IndexMut<NodeId> for Vec<Node> {
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self[id.index()]
    }
}
