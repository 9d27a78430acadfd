//! In-memory directed property graph over the ATT&CK dataset.
//!
//! Nodes are the bundle's non-relationship STIX objects, keyed by STIX id;
//! edges carry the relationship label. Node storage is a `BTreeMap` so that
//! every scan (name resolution, substring search) iterates in lexical
//! STIX-id order, giving deterministic results across rebuilds.

mod builder;

pub use builder::build_graph;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Synthetic relation connecting a detection strategy to its analytics.
pub const REL_REFERENCES_ANALYTIC: &str = "references_analytic";

/// Synthetic relation connecting an analytic to its data components.
pub const REL_REFERENCES_DATA_COMPONENT: &str = "references_data_component";

/// Discriminated STIX object category.
///
/// Replaces the dataset's free-form type tag with a closed set; anything
/// outside the ATT&CK vocabulary is carried through as [`NodeType::Other`]
/// so an unusual bundle still builds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeType {
    /// `attack-pattern`: an ATT&CK technique or sub-technique.
    #[serde(rename = "attack-pattern")]
    Technique,
    Malware,
    Tool,
    IntrusionSet,
    Campaign,
    /// A mitigation.
    CourseOfAction,
    #[serde(rename = "x-mitre-detection-strategy")]
    DetectionStrategy,
    #[serde(rename = "x-mitre-analytic")]
    Analytic,
    #[serde(rename = "x-mitre-data-component")]
    DataComponent,
    #[serde(rename = "x-mitre-data-source")]
    DataSource,
    #[serde(rename = "x-mitre-tactic")]
    Tactic,
    Identity,
    #[serde(untagged)]
    Other(String),
}

impl NodeType {
    /// Parses the STIX `type` tag.
    pub fn from_stix(tag: &str) -> Self {
        match tag {
            "attack-pattern" => NodeType::Technique,
            "malware" => NodeType::Malware,
            "tool" => NodeType::Tool,
            "intrusion-set" => NodeType::IntrusionSet,
            "campaign" => NodeType::Campaign,
            "course-of-action" => NodeType::CourseOfAction,
            "x-mitre-detection-strategy" => NodeType::DetectionStrategy,
            "x-mitre-analytic" => NodeType::Analytic,
            "x-mitre-data-component" => NodeType::DataComponent,
            "x-mitre-data-source" => NodeType::DataSource,
            "x-mitre-tactic" => NodeType::Tactic,
            "identity" => NodeType::Identity,
            other => NodeType::Other(other.to_string()),
        }
    }

    /// The dataset's own tag for this category.
    pub fn as_stix(&self) -> &str {
        match self {
            NodeType::Technique => "attack-pattern",
            NodeType::Malware => "malware",
            NodeType::Tool => "tool",
            NodeType::IntrusionSet => "intrusion-set",
            NodeType::Campaign => "campaign",
            NodeType::CourseOfAction => "course-of-action",
            NodeType::DetectionStrategy => "x-mitre-detection-strategy",
            NodeType::Analytic => "x-mitre-analytic",
            NodeType::DataComponent => "x-mitre-data-component",
            NodeType::DataSource => "x-mitre-data-source",
            NodeType::Tactic => "x-mitre-tactic",
            NodeType::Identity => "identity",
            NodeType::Other(tag) => tag,
        }
    }

    /// Leaf categories are never expanded during traversal (past the start
    /// node); they are where technique-to-technique explosion through
    /// shared software would otherwise happen.
    pub fn is_leaf(&self) -> bool {
        matches!(self, NodeType::Technique | NodeType::Malware | NodeType::Tool)
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_stix())
    }
}

/// One kill-chain phase entry on a technique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KillChainPhase {
    pub kill_chain_name: String,
    pub phase_name: String,
}

/// A node in the knowledge graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    /// Dataset-assigned stable identity; the graph key.
    pub stix_id: String,
    /// Object category.
    pub node_type: NodeType,
    /// Display name, used for case-insensitive exact and substring search.
    pub name: String,
    /// Human-facing ATT&CK id (e.g. T1059), when the object carries one.
    pub attack_id: Option<String>,
    /// Full description; truncation happens at render time only.
    pub description: String,
    /// Tactic phase labels.
    pub kill_chain_phases: Vec<KillChainPhase>,
    /// The complete original object, kept for detail drill-down fields.
    pub raw: serde_json::Value,
}

impl GraphNode {
    /// Reads a string-array field from the raw object (e.g. platforms).
    pub fn raw_string_list(&self, field: &str) -> Vec<String> {
        self.raw
            .get(field)
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// A directed, labeled edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    /// Dataset relationship type, or one of the synthetic labels.
    pub relation: String,
}

/// The immutable knowledge graph plus its lookup index.
///
/// Built once per (re)build and published wholesale; no mutation is
/// possible after construction, so any number of readers can share it.
#[derive(Debug, Default)]
pub struct AttackGraph {
    nodes: BTreeMap<String, GraphNode>,
    outgoing: HashMap<String, Vec<GraphEdge>>,
    incoming: HashMap<String, Vec<GraphEdge>>,
    attack_id_index: HashMap<String, String>,
    edge_count: usize,
    /// The bundle's own modification timestamp, when present.
    version: Option<String>,
}

impl AttackGraph {
    /// Looks up a node by STIX id.
    pub fn node(&self, stix_id: &str) -> Option<&GraphNode> {
        self.nodes.get(stix_id)
    }

    pub fn contains(&self, stix_id: &str) -> bool {
        self.nodes.contains_key(stix_id)
    }

    /// All nodes in lexical STIX-id order.
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values()
    }

    /// Edges leaving `stix_id`.
    pub fn outgoing(&self, stix_id: &str) -> &[GraphEdge] {
        self.outgoing.get(stix_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Edges arriving at `stix_id`.
    pub fn incoming(&self, stix_id: &str) -> &[GraphEdge] {
        self.incoming.get(stix_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Exact uppercase ATT&CK-id lookup.
    pub fn by_attack_id(&self, attack_id_upper: &str) -> Option<&str> {
        self.attack_id_index.get(attack_id_upper).map(String::as_str)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Dataset modification timestamp, or `None` when the bundle carried none.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub(crate) fn set_version(&mut self, version: Option<String>) {
        self.version = version;
    }

    pub(crate) fn insert_node(&mut self, node: GraphNode) {
        if let Some(attack_id) = &node.attack_id {
            self.attack_id_index
                .insert(attack_id.to_uppercase(), node.stix_id.clone());
        }
        self.nodes.insert(node.stix_id.clone(), node);
    }

    /// Adds an edge; silently dropped unless both endpoints exist.
    pub(crate) fn insert_edge(&mut self, source: &str, target: &str, relation: &str) {
        if !self.contains(source) || !self.contains(target) {
            return;
        }
        let edge = GraphEdge {
            source: source.to_string(),
            target: target.to_string(),
            relation: relation.to_string(),
        };
        self.outgoing
            .entry(source.to_string())
            .or_default()
            .push(edge.clone());
        self.incoming.entry(target.to_string()).or_default().push(edge);
        self.edge_count += 1;
    }
}
