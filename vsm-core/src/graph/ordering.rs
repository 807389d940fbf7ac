//! Ordering Within Levels
//!
//! Gives each node a depth (its slot within its level) and sorts levels by
//! it, so the layout does not depend on the order edges were discovered in.
//!
//! Depths are initialised by walking away from the root, parents first and
//! then children. A node reached for the first time takes the next free slot
//! on its level, but never a slot above the node that reached it, which
//! keeps upstream chains aligned with their dependants. Optional barycenter
//! sweeps then move each node towards the mean position of its neighbours
//! on the adjacent level to reduce crossings.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use super::leveling::NodeLevelMap;
use super::node::{Node, NodeId};

/// Assign depths and sort every level of `levels` by `(depth, id)`.
pub(crate) fn order_levels(
    nodes: &mut IndexMap<NodeId, Node>,
    root: &NodeId,
    levels: &mut NodeLevelMap,
    sweeps: usize,
) {
    initialize_depths(nodes, root, levels);
    sort_by_depth(nodes, levels);

    for _ in 0..sweeps {
        barycenter_pass(nodes, levels, true);
        barycenter_pass(nodes, levels, false);
    }
}

fn initialize_depths(nodes: &mut IndexMap<NodeId, Node>, root: &NodeId, levels: &NodeLevelMap) {
    let mut last_depth = vec![0usize; levels.len()];
    let mut visited: HashSet<NodeId> = HashSet::with_capacity(nodes.len());

    if let Some(node) = nodes.get_mut(root) {
        node.set_depth(1);
        if let Some(slot) = last_depth.get_mut(node.level()) {
            *slot = 1;
        }
        visited.insert(root.clone());
        visit(nodes, root, true, &mut last_depth, &mut visited);
        visit(nodes, root, false, &mut last_depth, &mut visited);
    }

    for (level, ids) in levels.levels().iter().enumerate() {
        for id in ids {
            if visited.insert(id.clone()) {
                last_depth[level] += 1;
                if let Some(node) = nodes.get_mut(id) {
                    node.set_depth(last_depth[level]);
                }
            }
        }
    }
}

/// Depth-first walk away from `start`. Each frame holds a node and the index
/// of the next neighbour to try.
fn visit(
    nodes: &mut IndexMap<NodeId, Node>,
    start: &NodeId,
    upstream: bool,
    last_depth: &mut [usize],
    visited: &mut HashSet<NodeId>,
) {
    let mut stack: Vec<(NodeId, usize)> = vec![(start.clone(), 0)];

    while let Some((id, next)) = stack.pop() {
        let Some(node) = nodes.get(&id) else { continue };
        let neighbours = if upstream { node.parents() } else { node.children() };
        let Some(neighbour) = neighbours.get(next).cloned() else { continue };
        let depth = node.depth();
        stack.push((id, next + 1));

        if !visited.insert(neighbour.clone()) {
            continue;
        }
        let Some(reached) = nodes.get_mut(&neighbour) else { continue };
        let Some(slot) = last_depth.get_mut(reached.level()) else { continue };
        *slot = depth.max(*slot + 1);
        reached.set_depth(*slot);
        stack.push((neighbour, 0));
    }
}

fn sort_by_depth(nodes: &IndexMap<NodeId, Node>, levels: &mut NodeLevelMap) {
    for level in 0..levels.len() {
        let mut ids = levels.level(level).map(<[NodeId]>::to_vec).unwrap_or_default();
        ids.sort_by(|a, b| {
            let depth = |id: &NodeId| nodes.get(id).map(Node::depth).unwrap_or(usize::MAX);
            depth(a).cmp(&depth(b)).then_with(|| a.cmp(b))
        });
        levels.set_level(level, ids);
    }
}

/// Reorder each level by the mean position of its neighbours on the level
/// already processed, then renumber depths from 1.
fn barycenter_pass(nodes: &mut IndexMap<NodeId, Node>, levels: &mut NodeLevelMap, downward: bool) {
    let count = levels.len();
    if count < 2 {
        return;
    }
    let order: Vec<usize> = if downward {
        (1..count).collect()
    } else {
        (0..count - 1).rev().collect()
    };

    for level in order {
        let reference = if downward { level - 1 } else { level + 1 };
        let positions: HashMap<NodeId, usize> = levels
            .level(reference)
            .unwrap_or_default()
            .iter()
            .enumerate()
            .map(|(position, id)| (id.clone(), position))
            .collect();

        let mut keyed: Vec<(f64, usize, NodeId)> = levels
            .level(level)
            .unwrap_or_default()
            .iter()
            .enumerate()
            .map(|(position, id)| {
                let neighbours = nodes
                    .get(id)
                    .map(|n| if downward { n.parents() } else { n.children() })
                    .unwrap_or(&[]);
                let placed: Vec<usize> = neighbours.iter().filter_map(|n| positions.get(n).copied()).collect();
                let barycenter = if placed.is_empty() {
                    position as f64
                } else {
                    placed.iter().sum::<usize>() as f64 / placed.len() as f64
                };
                (barycenter, position, id.clone())
            })
            .collect();

        keyed.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal).then(a.1.cmp(&b.1)));

        let ids: Vec<NodeId> = keyed.into_iter().map(|(_, _, id)| id).collect();
        for (position, id) in ids.iter().enumerate() {
            if let Some(node) = nodes.get_mut(id) {
                node.set_depth(position + 1);
            }
        }
        levels.set_level(level, ids);
    }
}
