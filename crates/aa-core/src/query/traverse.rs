//! Bounded breadth-first relationship traversal.

use crate::error::AtlasResult;
use crate::graph::{AttackGraph, NodeType};
use crate::limits;
use crate::resolver::resolve;
use serde::Serialize;
use std::collections::{HashSet, VecDeque};

/// Which side of the discovering edge the neighbor sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Outgoing,
    Incoming,
}

/// One discovered neighbor.
#[derive(Debug, Clone, Serialize)]
pub struct ExploreItem {
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub relationship: String,
    pub direction: Direction,
    /// Hops from the start node.
    pub distance: u32,
}

/// Explores the graph around a start entity up to `depth` hops.
///
/// BFS over both edge directions; each node is discovered at most once, so
/// the output is a BFS tree rather than all paths. Leaf-category nodes
/// (techniques, malware, tools) found past the start are recorded but never
/// expanded, which keeps a walk from tunneling through shared software into
/// unrelated techniques. Output is truncated to
/// [`limits::MAX_TRAVERSAL_RESULTS`] items.
///
/// Returns `Ok(None)` when the start entity does not resolve.
pub fn explore(
    graph: &AttackGraph,
    start: &str,
    depth: u32,
) -> AtlasResult<Option<Vec<ExploreItem>>> {
    limits::check_depth(depth)?;

    let Some(start_node) = resolve(graph, start) else {
        return Ok(None);
    };
    let start_id = start_node.stix_id.clone();

    let mut results = Vec::new();
    let mut visited: HashSet<String> = HashSet::from([start_id.clone()]);
    let mut queue: VecDeque<(String, u32)> = VecDeque::from([(start_id.clone(), 0)]);

    while let Some((current, dist)) = queue.pop_front() {
        if dist >= depth {
            continue;
        }
        // The start node is always expanded once, even when it is itself a
        // leaf category.
        if current != start_id {
            let is_leaf = graph
                .node(&current)
                .map(|n| n.node_type.is_leaf())
                .unwrap_or(false);
            if is_leaf {
                continue;
            }
        }

        for edge in graph.outgoing(&current) {
            discover(
                graph,
                &edge.target,
                &edge.relation,
                Direction::Outgoing,
                dist + 1,
                &mut visited,
                &mut queue,
                &mut results,
            );
        }
        for edge in graph.incoming(&current) {
            discover(
                graph,
                &edge.source,
                &edge.relation,
                Direction::Incoming,
                dist + 1,
                &mut visited,
                &mut queue,
                &mut results,
            );
        }
    }

    results.truncate(limits::MAX_TRAVERSAL_RESULTS);
    Ok(Some(results))
}

#[allow(clippy::too_many_arguments)]
fn discover(
    graph: &AttackGraph,
    neighbor: &str,
    relation: &str,
    direction: Direction,
    distance: u32,
    visited: &mut HashSet<String>,
    queue: &mut VecDeque<(String, u32)>,
    results: &mut Vec<ExploreItem>,
) {
    if visited.contains(neighbor) {
        return;
    }
    let Some(node) = graph.node(neighbor) else {
        return;
    };
    results.push(ExploreItem {
        name: node.name.clone(),
        node_type: node.node_type.clone(),
        relationship: relation.to_string(),
        direction,
        distance,
    });
    visited.insert(neighbor.to_string());
    queue.push_back((neighbor.to_string(), distance));
}
