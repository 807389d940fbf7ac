//! Cycle Detection
//!
//! A lineage becomes cyclic when configuration changes between builds: a
//! pipeline that used to be upstream of the current pipeline is now
//! downstream of it. Such a graph cannot be layered.
//!
//! # Algorithm
//!
//! Iterative depth-first search over child edges with three colours. A node
//! is grey while it is on the DFS stack and black once all its descendants
//! are done. Reaching a grey node is a back-edge, i.e. a cycle; reaching a
//! black node is just a second path (a diamond) and is fine. Every node is
//! tried as a start so that components not reachable from the current
//! pipeline are covered too.

use std::collections::HashMap;

use indexmap::IndexMap;

use super::node::{Node, NodeId};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Colour {
    Grey,
    Black,
}

/// Whether following child edges from any node can lead back to it.
pub(crate) fn has_cycle(nodes: &IndexMap<NodeId, Node>) -> bool {
    let mut colours: HashMap<&NodeId, Colour> = HashMap::with_capacity(nodes.len());

    for start in nodes.keys() {
        if colours.contains_key(start) {
            continue;
        }

        // Each frame is a node and the index of the next child to visit.
        let mut stack: Vec<(&NodeId, usize)> = vec![(start, 0)];
        colours.insert(start, Colour::Grey);

        while let Some((id, next)) = stack.pop() {
            let children = nodes.get(id).map(Node::children).unwrap_or(&[]);
            match children.get(next) {
                Some(child) => {
                    stack.push((id, next + 1));
                    match colours.get(child) {
                        Some(Colour::Grey) => return true,
                        Some(Colour::Black) => {}
                        None => {
                            colours.insert(child, Colour::Grey);
                            stack.push((child, 0));
                        }
                    }
                }
                None => {
                    colours.insert(id, Colour::Black);
                }
            }
        }
    }

    false
}
