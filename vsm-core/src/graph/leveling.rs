//! Level Assignment
//!
//! Places every node on a column so that each edge points one column to the
//! right.
//!
//! # Algorithm
//!
//! 1. The root (current pipeline or material) sits at relative level 0.
//! 2. Ancestors are pulled left: a parent sits at least one level before
//!    each of its children. A node that already sits further left is never
//!    moved back, so the longest path wins.
//! 3. Descendants are pushed right the same way.
//! 4. Nodes reached only through mixed directions take a level from a
//!    levelled neighbour, then a sweep in topological order raises children
//!    until every edge points strictly right.
//! 5. Levels are shifted so the leftmost is 0.
//! 6. Edges spanning more than one level are routed through chains of dummy
//!    nodes, one per intermediate level.
//!
//! The graph must be acyclic; callers check before layering.

use std::collections::{HashMap, HashSet, VecDeque};

use indexmap::IndexMap;
use tracing::debug;

use super::node::{Node, NodeId};

/// Node ids grouped by level, lowest level first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeLevelMap {
    levels: Vec<Vec<NodeId>>,
}

impl NodeLevelMap {
    /// Group nodes by their assigned level, keeping insertion order within
    /// a level.
    pub(crate) fn from_nodes(nodes: &IndexMap<NodeId, Node>) -> Self {
        let height = nodes.values().map(|n| n.level() + 1).max().unwrap_or(0);
        let mut levels = vec![Vec::new(); height];
        for node in nodes.values() {
            levels[node.level()].push(node.id().clone());
        }
        Self { levels }
    }

    pub fn levels(&self) -> &[Vec<NodeId>] {
        &self.levels
    }

    pub fn level(&self, level: usize) -> Option<&[NodeId]> {
        self.levels.get(level).map(Vec::as_slice)
    }

    pub(crate) fn set_level(&mut self, level: usize, ids: Vec<NodeId>) {
        if let Some(slot) = self.levels.get_mut(level) {
            *slot = ids;
        }
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

/// Remove the dummy chains of a previous layering and reconnect the real
/// endpoints, so that layering can run again after more edges were added.
pub(crate) fn strip_dummies(nodes: &mut IndexMap<NodeId, Node>) {
    if !nodes.values().any(Node::is_dummy) {
        return;
    }

    let follow = |start: &NodeId, downward: bool| -> NodeId {
        let mut current = start.clone();
        while let Some(node) = nodes.get(&current).filter(|n| n.is_dummy()) {
            let next = if downward {
                node.children().first()
            } else {
                node.parents().first()
            };
            match next {
                Some(next) => current = next.clone(),
                None => break,
            }
        }
        current
    };

    let restored: Vec<(NodeId, Vec<NodeId>, Vec<NodeId>)> = nodes
        .values()
        .filter(|n| !n.is_dummy())
        .map(|n| {
            let parents = unique(n.parents().iter().map(|p| follow(p, false)));
            let children = unique(n.children().iter().map(|c| follow(c, true)));
            (n.id().clone(), parents, children)
        })
        .collect();

    nodes.retain(|_, n| !n.is_dummy());
    for (id, parents, children) in restored {
        if let Some(node) = nodes.get_mut(&id) {
            node.set_parents(parents);
            node.set_children(children);
        }
    }
}

fn unique(ids: impl Iterator<Item = NodeId>) -> Vec<NodeId> {
    let mut seen = HashSet::new();
    ids.filter(|id| seen.insert(id.clone())).collect()
}

/// Assign every node a level anchored on `root`.
pub(crate) fn assign_levels(nodes: &mut IndexMap<NodeId, Node>, root: &NodeId) {
    if !nodes.contains_key(root) {
        return;
    }

    let mut levels: HashMap<NodeId, i64> = HashMap::with_capacity(nodes.len());
    levels.insert(root.clone(), 0);
    propagate(nodes, root, &mut levels, Direction::Upstream);
    propagate(nodes, root, &mut levels, Direction::Downstream);

    let order = topological_order(nodes);

    for id in &order {
        if levels.contains_key(id) {
            continue;
        }
        let Some(node) = nodes.get(id) else { continue };
        let after_parents = node.parents().iter().filter_map(|p| levels.get(p)).max().map(|l| l + 1);
        let before_children = node.children().iter().filter_map(|c| levels.get(c)).min().map(|l| l - 1);
        levels.insert(id.clone(), after_parents.or(before_children).unwrap_or(0));
    }

    for id in &order {
        let Some(node) = nodes.get(id) else { continue };
        if let Some(floor) = node.parents().iter().filter_map(|p| levels.get(p)).max().map(|l| l + 1) {
            let level = levels.entry(id.clone()).or_insert(floor);
            if *level < floor {
                *level = floor;
            }
        }
    }

    let lowest = levels.values().copied().min().unwrap_or(0);
    for (id, level) in levels {
        if let Some(node) = nodes.get_mut(&id) {
            node.set_level((level - lowest) as usize);
        }
    }
}

#[derive(Clone, Copy)]
enum Direction {
    Upstream,
    Downstream,
}

/// Move neighbours in `direction` away from `root` until each sits at least
/// one level beyond the node that reached it.
fn propagate(
    nodes: &IndexMap<NodeId, Node>,
    root: &NodeId,
    levels: &mut HashMap<NodeId, i64>,
    direction: Direction,
) {
    let mut worklist = vec![root.clone()];
    while let Some(id) = worklist.pop() {
        let (Some(node), Some(&level)) = (nodes.get(&id), levels.get(&id)) else {
            continue;
        };
        let (neighbours, target) = match direction {
            Direction::Upstream => (node.parents(), level - 1),
            Direction::Downstream => (node.children(), level + 1),
        };
        for neighbour in neighbours {
            let settled = match (levels.get(neighbour), direction) {
                (Some(&current), Direction::Upstream) => current <= target,
                (Some(&current), Direction::Downstream) => current >= target,
                (None, _) => false,
            };
            if !settled {
                levels.insert(neighbour.clone(), target);
                worklist.push(neighbour.clone());
            }
        }
    }
}

/// Kahn's algorithm over the whole graph; ties keep insertion order.
fn topological_order(nodes: &IndexMap<NodeId, Node>) -> Vec<NodeId> {
    let mut in_degree: HashMap<&NodeId, usize> = HashMap::with_capacity(nodes.len());
    let mut queue = VecDeque::new();

    for (id, node) in nodes {
        let degree = node.parents().len();
        in_degree.insert(id, degree);
        if degree == 0 {
            queue.push_back(id);
        }
    }

    let mut result = Vec::with_capacity(nodes.len());
    while let Some(id) = queue.pop_front() {
        result.push(id.clone());
        if let Some(node) = nodes.get(id) {
            for child in node.children() {
                if let Some(degree) = in_degree.get_mut(child) {
                    *degree = degree.saturating_sub(1);
                    if *degree == 0 {
                        queue.push_back(child);
                    }
                }
            }
        }
    }

    result
}

/// Route every edge spanning more than one level through dummy nodes.
/// Returns the number of dummies created.
pub(crate) fn insert_dummies(nodes: &mut IndexMap<NodeId, Node>) -> usize {
    let graph: &IndexMap<NodeId, Node> = nodes;
    let long_edges: Vec<(NodeId, NodeId, usize, usize)> = graph
        .values()
        .flat_map(|parent| {
            parent.children().iter().filter_map(move |child_id| {
                let child = graph.get(child_id)?;
                (child.level() > parent.level() + 1).then(|| {
                    (parent.id().clone(), child_id.clone(), parent.level(), child.level())
                })
            })
        })
        .collect();

    let mut sequence = 0usize;
    let mut created = 0usize;

    for (parent, child, from, to) in long_edges {
        let chain: Vec<NodeId> = (from + 1..to)
            .map(|_| next_dummy_id(nodes, &mut sequence))
            .collect();

        for (offset, id) in chain.iter().enumerate() {
            let mut dummy = Node::dummy(id.clone(), from + 1 + offset);
            dummy.add_parent(if offset == 0 { &parent } else { &chain[offset - 1] });
            dummy.add_child(chain.get(offset + 1).unwrap_or(&child));
            nodes.insert(id.clone(), dummy);
        }

        if let (Some(first), Some(last)) = (chain.first(), chain.last()) {
            if let Some(node) = nodes.get_mut(&parent) {
                node.replace_child(&child, first.clone());
            }
            if let Some(node) = nodes.get_mut(&child) {
                node.replace_parent(&parent, last.clone());
            }
            debug!(parent = %parent, child = %child, dummies = chain.len(), "routed edge through dummy nodes");
        }
        created += chain.len();
    }

    created
}

fn next_dummy_id(nodes: &IndexMap<NodeId, Node>, sequence: &mut usize) -> NodeId {
    loop {
        *sequence += 1;
        let id = NodeId::new(format!("__dummy:{sequence}"));
        if !nodes.contains_key(&id) {
            return id;
        }
    }
}
