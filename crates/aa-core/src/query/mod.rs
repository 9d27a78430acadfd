//! Read-only queries against a built graph.
//!
//! All operations here take a shared graph reference and never mutate it;
//! any number of them may run concurrently. Input bounds are enforced at
//! this boundary (see [`crate::limits`]) before any graph state is touched.

mod details;
mod traverse;

pub use details::{
    entity_details, technique_detail, technique_profile, AnalyticDetail, DetectionDetail,
    EntityDetails, TechniqueDetail, TechniqueDetailKind, TechniqueProfile,
};
pub use traverse::{explore, Direction, ExploreItem};

use crate::graph::{AttackGraph, GraphNode, NodeType};
use crate::limits;
use crate::resolver::resolve;
use crate::error::AtlasResult;
use serde::Serialize;

/// One search result.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    /// ATT&CK id when the object carries one.
    pub id: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// Truncated description.
    pub description: String,
    /// Tactic phase labels, techniques only.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tactics: Vec<String>,
}

impl SearchHit {
    fn from_node(node: &GraphNode) -> Self {
        Self {
            id: node.attack_id.clone(),
            name: node.name.clone(),
            node_type: node.node_type.clone(),
            description: limits::preview(&node.description),
            tactics: node
                .kill_chain_phases
                .iter()
                .map(|p| p.phase_name.clone())
                .collect(),
        }
    }
}

/// Searches the graph by id, exact name, then name substring.
///
/// An exact resolution short-circuits to a single hit. The substring scan
/// walks nodes in lexical STIX-id order and stops at `limit` matches
/// (clamped, never rejected). Queries over the length cap fail with
/// `InvalidInput` before the graph is consulted.
pub fn search(graph: &AttackGraph, query: &str, limit: Option<usize>) -> AtlasResult<Vec<SearchHit>> {
    limits::check_query_len(query)?;
    let limit = limits::clamp_limit(limit, limits::DEFAULT_SEARCH_RESULTS);

    if let Some(node) = resolve(graph, query) {
        return Ok(vec![SearchHit::from_node(node)]);
    }

    let needle = query.trim().to_lowercase();
    let mut hits = Vec::new();
    for node in graph.nodes() {
        if node.name.to_lowercase().contains(&needle) {
            hits.push(SearchHit::from_node(node));
            if hits.len() >= limit {
                break;
            }
        }
    }
    Ok(hits)
}

/// A technique row in a tactic listing.
#[derive(Debug, Clone, Serialize)]
pub struct TacticEntry {
    pub id: Option<String>,
    pub name: String,
}

/// One page of a tactic listing.
#[derive(Debug, Clone, Serialize)]
pub struct TacticPage {
    /// Total matches across all pages.
    pub count: usize,
    pub data: Vec<TacticEntry>,
    /// Offset of the next page, present iff more results remain.
    pub next_cursor: Option<usize>,
}

/// Lists techniques whose kill-chain phases match a tactic name.
///
/// The tactic is normalized to the dataset's hyphenated phase-label form
/// ("Privilege Escalation" -> "privilege-escalation") and matched as a
/// substring of each phase label.
pub fn list_by_tactic(
    graph: &AttackGraph,
    tactic: &str,
    limit: Option<usize>,
    offset: usize,
) -> TacticPage {
    let needle = normalize_tactic(tactic);

    let matches: Vec<TacticEntry> = graph
        .nodes()
        .filter(|node| node.node_type == NodeType::Technique)
        .filter(|node| {
            node.kill_chain_phases
                .iter()
                .any(|phase| phase.phase_name.contains(&needle))
        })
        .map(|node| TacticEntry {
            id: node.attack_id.clone(),
            name: node.name.clone(),
        })
        .collect();

    let limit = limits::clamp_limit(limit, limits::DEFAULT_TACTIC_PAGE);
    let count = matches.len();
    let page: Vec<TacticEntry> = matches.into_iter().skip(offset).take(limit).collect();
    let consumed = offset + page.len();
    let next_cursor = if consumed < count && !page.is_empty() {
        Some(consumed)
    } else {
        None
    };

    TacticPage {
        count,
        data: page,
        next_cursor,
    }
}

fn normalize_tactic(tactic: &str) -> String {
    tactic
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}
