//! Arena backed quadtree over the Web Mercator square.

mod id;

pub use id::NodeId;

use std::collections::BTreeSet;
use types::{mercator, MercatorBox, Quadrant, TileAddress, MERCATOR_EXTENT};

#[derive(Clone, Debug)]
pub struct Node {
    pub address: TileAddress,
    pub bounds: MercatorBox,
    pub children: [Option<NodeId>; 4],
}
impl Node {
    pub fn level(&self) -> u8 {
        self.address.level()
    }
    pub fn is_leaf(&self) -> bool {
        self.children.iter().all(Option::is_none)
    }
}

/// Tree of tiles rooted at the level 0 tile covering `[-πR, πR]²`.
///
/// Nodes are never removed from the arena. Detached subtrees stay allocated but are no longer
/// reachable from the root.
pub struct Quadtree {
    nodes: Vec<Node>,
}

impl Quadtree {
    /// A tree holding only the root.
    pub fn root_only() -> Self {
        let root = Node {
            address: TileAddress::root(),
            bounds: MercatorBox::new(
                -MERCATOR_EXTENT,
                MERCATOR_EXTENT,
                MERCATOR_EXTENT,
                -MERCATOR_EXTENT,
            ),
            children: [None; 4],
        };
        Self { nodes: vec![root] }
    }

    /// A complete tree down to `max_level`.
    pub fn new(max_level: u8) -> Self {
        let mut tree = Self::root_only();
        tree.subdivide(NodeId::root(), &mut |_: &Node| true, max_level);
        tree
    }

    pub fn root(&self) -> NodeId {
        NodeId::root()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn child(&self, id: NodeId, quadrant: Quadrant) -> Option<NodeId> {
        self.nodes[id].children[quadrant.index()]
    }

    /// Refine `id` down to `max_depth`, attaching and descending into every child for which
    /// `condition` holds. Children that are already attached are reused. An attached child that
    /// fails `condition` is kept but not refined further.
    pub fn subdivide<F>(&mut self, id: NodeId, condition: &mut F, max_depth: u8)
    where
        F: FnMut(&Node) -> bool,
    {
        if self.nodes[id].level() >= max_depth {
            return;
        }

        let parent = self.nodes[id].clone();
        let addresses = parent.address.children();
        let boxes = parent.bounds.quadrants();
        for q in 0..4 {
            let child = match parent.children[q] {
                Some(existing) => {
                    if !condition(&self.nodes[existing]) {
                        continue;
                    }
                    existing
                }
                None => {
                    let candidate =
                        Node { address: addresses[q], bounds: boxes[q], children: [None; 4] };
                    if !condition(&candidate) {
                        continue;
                    }
                    let child = NodeId::from_index(self.nodes.len());
                    self.nodes.push(candidate);
                    self.nodes[id].children[q] = Some(child);
                    child
                }
            };
            self.subdivide(child, condition, max_depth);
        }
    }

    /// Every node reachable from the root, in pre-order (self, then NW, NE, SW, SE).
    pub fn flatten(&self) -> Vec<NodeId> {
        self.flatten_from(self.root())
    }

    pub fn flatten_from(&self, id: NodeId) -> Vec<NodeId> {
        let mut output = Vec::new();
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            output.push(id);
            stack.extend(self.nodes[id].children.iter().rev().flatten());
        }
        output
    }

    pub fn nodes_at_level(&self, level: u8) -> Vec<NodeId> {
        self.flatten().into_iter().filter(|&id| self.nodes[id].level() == level).collect()
    }

    /// Detach every child for which `condition` holds, without looking inside it. Returns the
    /// number of detached subtrees.
    pub fn prune_children<F>(&mut self, condition: &mut F) -> usize
    where
        F: FnMut(&Node) -> bool,
    {
        let mut pruned = 0;
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            for quadrant in Quadrant::ALL {
                if let Some(child) = self.child(id, quadrant) {
                    if condition(&self.nodes[child]) {
                        self.detach_child(id, quadrant);
                        pruned += 1;
                    } else {
                        stack.push(child);
                    }
                }
            }
        }
        pruned
    }

    /// Remove the link from `parent` to one of its children, returning the detached subtree root.
    pub fn detach_child(&mut self, parent: NodeId, quadrant: Quadrant) -> Option<NodeId> {
        self.nodes[parent].children[quadrant.index()].take()
    }

    /// Integer degree `(lng, lat)` cells overlapping the node inflated by `margin_fraction` of its
    /// width on every side.
    pub fn covering_source_cells(&self, id: NodeId, margin_fraction: f64) -> BTreeSet<(i32, i32)> {
        covering_cells(&self.nodes[id].bounds, margin_fraction)
    }
}

/// Cells are named by their south west corner.
pub fn covering_cells(bounds: &MercatorBox, margin_fraction: f64) -> BTreeSet<(i32, i32)> {
    let inflated = bounds.inflate(margin_fraction * bounds.width());
    let (max_lat, min_lng) = mercator::invert(inflated.x0, inflated.y0);
    let (min_lat, max_lng) = mercator::invert(inflated.x1, inflated.y1);

    let mut cells = BTreeSet::new();
    for lng in (min_lng.floor() as i32)..(max_lng.ceil() as i32) {
        for lat in (min_lat.floor() as i32)..(max_lat.ceil() as i32) {
            cells.insert((lng, lat));
        }
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_tree_sizes() {
        for level in 0..=4u8 {
            let tree = Quadtree::new(level);
            assert_eq!(tree.flatten().len(), ((4usize.pow(level as u32 + 1)) - 1) / 3);
            assert_eq!(tree.nodes_at_level(level).len(), 4usize.pow(level as u32));
        }
    }

    #[test]
    fn children_match_addresses_and_quadrants() {
        let tree = Quadtree::new(3);
        for id in tree.flatten() {
            let node = tree.node(id);
            let expected = node.address.bounds();
            for (a, b) in [
                (node.bounds.x0, expected.x0),
                (node.bounds.x1, expected.x1),
                (node.bounds.y0, expected.y0),
                (node.bounds.y1, expected.y1),
            ] {
                assert!((a - b).abs() < 1e-6);
            }
            for (q, child) in node.children.iter().enumerate() {
                if let Some(child) = child {
                    let child = tree.node(*child);
                    assert_eq!(child.address, node.address.children()[q]);
                    assert_eq!(child.bounds, node.bounds.quadrants()[q]);
                }
            }
        }
    }

    #[test]
    fn pre_order() {
        let tree = Quadtree::new(2);
        let order: Vec<String> =
            tree.flatten().iter().take(7).map(|&id| tree.node(id).address.to_string()).collect();
        assert_eq!(order, ["0/0/0", "1/0/0", "2/0/0", "2/1/0", "2/0/1", "2/1/1", "1/1/0"]);
    }

    #[test]
    fn conditional_subdivision() {
        let mut tree = Quadtree::root_only();
        let root = tree.root();
        tree.subdivide(root, &mut |n: &Node| n.address.i() == 0, 3);
        let levels: Vec<usize> = (0..=3).map(|l| tree.nodes_at_level(l).len()).collect();
        assert_eq!(levels, vec![1, 2, 4, 8]);
        assert!(tree.nodes_at_level(4).is_empty());

        // Reuses attached children instead of duplicating them.
        tree.subdivide(root, &mut |_: &Node| true, 1);
        assert_eq!(tree.nodes_at_level(1).len(), 4);
        assert_eq!(tree.nodes_at_level(3).len(), 8);
    }

    #[test]
    fn pruning() {
        let mut tree = Quadtree::new(3);
        let pruned = tree.prune_children(&mut |n: &Node| n.level() == 1 && n.address.j() == 1);
        assert_eq!(pruned, 2);
        assert_eq!(tree.flatten().len(), 1 + 2 + 8 + 32);
        assert!(tree.flatten().iter().all(|&id| {
            let node = tree.node(id);
            node.level() == 0 || node.address.j() < 1 << (node.level() - 1)
        }));

        let root = tree.root();
        let detached = tree.detach_child(root, Quadrant::NorthWest).unwrap();
        assert_eq!(tree.node(detached).address, TileAddress::new(1, 0, 0));
        assert_eq!(tree.flatten_from(detached).len(), 21);
        assert_eq!(tree.flatten().len(), 1 + 21);
        assert_eq!(tree.detach_child(root, Quadrant::NorthWest), None);
    }

    #[test]
    fn covering_cells_of_small_tile() {
        let (x0, y0) = mercator::project(10.5, 20.5);
        let (x1, y1) = mercator::project(10.2, 20.8);
        let cells = covering_cells(&MercatorBox::new(x0, x1, y0, y1), 0.0);
        assert_eq!(cells.into_iter().collect::<Vec<_>>(), vec![(20, 10)]);

        let (x0, y0) = mercator::project(11.0, 20.0);
        let (x1, y1) = mercator::project(10.0, 21.0);
        let cells = covering_cells(&MercatorBox::new(x0, x1, y0, y1), 0.1);
        assert_eq!(cells.len(), 9);
        assert!(cells.contains(&(19, 9)) && cells.contains(&(21, 11)));
    }
}
