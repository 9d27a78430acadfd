//! Structured entity detail aggregation.
//!
//! Detail shapes depend on the resolved node's category: techniques carry
//! mitigation and detection context, intrusion sets carry their software.
//! Categories without a detail shape return the base summary with empty
//! collections, which is a valid answer rather than an error.

use crate::error::AtlasError;
use crate::graph::{
    AttackGraph, GraphNode, NodeType, REL_REFERENCES_ANALYTIC, REL_REFERENCES_DATA_COMPONENT,
};
use crate::limits;
use crate::resolver::resolve;
use serde::Serialize;
use std::collections::HashSet;

/// An analytic under a detection strategy, with the data components
/// (log sources) it reads.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyticDetail {
    pub name: String,
    pub log_sources: Vec<String>,
}

/// A detection strategy expanded one hop into its analytics.
#[derive(Debug, Clone, Serialize)]
pub struct DetectionDetail {
    pub strategy: String,
    pub analytics: Vec<AnalyticDetail>,
}

/// Entity details; heavy collections are filled only when `detailed` is set.
#[derive(Debug, Clone, Serialize)]
pub struct EntityDetails {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mitigations: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub detections: Vec<DetectionDetail>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub software: Vec<String>,
}

/// Aggregates details for an entity; `None` when it does not resolve.
pub fn entity_details(
    graph: &AttackGraph,
    query: &str,
    detailed: bool,
) -> Option<EntityDetails> {
    let node = resolve(graph, query)?;

    let mut details = EntityDetails {
        id: display_id(node),
        name: node.name.clone(),
        node_type: node.node_type.clone(),
        description: limits::preview(&node.description),
        mitigations: vec![],
        detections: vec![],
        software: vec![],
    };

    if !detailed {
        return Some(details);
    }

    match node.node_type {
        NodeType::Technique => {
            details.mitigations = technique_mitigations(graph, &node.stix_id);
            details.detections = technique_detections(graph, &node.stix_id);
        }
        NodeType::IntrusionSet => {
            details.software = intrusion_set_software(graph, &node.stix_id);
        }
        // Other categories have no detail shape; the summary stands alone.
        _ => {}
    }

    Some(details)
}

/// Course-of-action names mitigating the technique.
fn technique_mitigations(graph: &AttackGraph, stix_id: &str) -> Vec<String> {
    graph
        .incoming(stix_id)
        .iter()
        .filter(|edge| edge.relation == "mitigates")
        .filter_map(|edge| graph.node(&edge.source))
        .filter(|source| source.node_type == NodeType::CourseOfAction)
        .map(|source| source.name.clone())
        .collect()
}

/// Detection strategies on the technique, each expanded into its analytics
/// and their data components.
fn technique_detections(graph: &AttackGraph, stix_id: &str) -> Vec<DetectionDetail> {
    graph
        .incoming(stix_id)
        .iter()
        .filter(|edge| edge.relation == "detects")
        .filter_map(|edge| graph.node(&edge.source))
        .filter(|source| source.node_type == NodeType::DetectionStrategy)
        .map(|strategy| DetectionDetail {
            strategy: strategy.name.clone(),
            analytics: strategy_analytics(graph, &strategy.stix_id),
        })
        .collect()
}

fn strategy_analytics(graph: &AttackGraph, strategy_id: &str) -> Vec<AnalyticDetail> {
    graph
        .outgoing(strategy_id)
        .iter()
        .filter(|edge| edge.relation == REL_REFERENCES_ANALYTIC)
        .filter_map(|edge| graph.node(&edge.target))
        .map(|analytic| AnalyticDetail {
            name: analytic.name.clone(),
            log_sources: graph
                .outgoing(&analytic.stix_id)
                .iter()
                .filter(|edge| edge.relation == REL_REFERENCES_DATA_COMPONENT)
                .filter_map(|edge| graph.node(&edge.target))
                .map(|dc| dc.name.clone())
                .collect(),
        })
        .collect()
}

/// Malware and tools used by the group, deduplicated by name.
fn intrusion_set_software(graph: &AttackGraph, stix_id: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    graph
        .outgoing(stix_id)
        .iter()
        .filter(|edge| edge.relation == "uses")
        .filter_map(|edge| graph.node(&edge.target))
        .filter(|target| matches!(target.node_type, NodeType::Malware | NodeType::Tool))
        .filter(|target| seen.insert(target.name.clone()))
        .map(|target| target.name.clone())
        .collect()
}

/// Technique summary with platform and tactic context.
#[derive(Debug, Clone, Serialize)]
pub struct TechniqueProfile {
    pub id: String,
    pub name: String,
    pub description: String,
    pub platforms: Vec<String>,
    pub tactics: Vec<String>,
}

/// Resolves a technique; `None` when the query misses or resolves to a
/// non-technique object.
pub fn technique_profile(graph: &AttackGraph, query: &str) -> Option<TechniqueProfile> {
    let node = resolve(graph, query)?;
    if node.node_type != NodeType::Technique {
        return None;
    }
    Some(TechniqueProfile {
        id: display_id(node),
        name: node.name.clone(),
        description: limits::preview(&node.description),
        platforms: node.raw_string_list("x_mitre_platforms"),
        tactics: node
            .kill_chain_phases
            .iter()
            .map(|p| p.phase_name.clone())
            .collect(),
    })
}

/// Which single attribute a technique-detail request drills into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TechniqueDetailKind {
    Description,
    Platforms,
    DataSources,
}

impl std::str::FromStr for TechniqueDetailKind {
    type Err = AtlasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "description" => Ok(TechniqueDetailKind::Description),
            "platforms" => Ok(TechniqueDetailKind::Platforms),
            "data_sources" => Ok(TechniqueDetailKind::DataSources),
            other => Err(AtlasError::InvalidInput(format!(
                "unknown detail '{}'; expected description, platforms, or data_sources",
                other
            ))),
        }
    }
}

/// A single drilled-down technique attribute.
#[derive(Debug, Clone, Serialize)]
pub struct TechniqueDetail {
    pub id: String,
    pub name: String,
    pub detail: serde_json::Value,
}

/// Drills into one technique attribute; `None` when the technique does not
/// resolve.
pub fn technique_detail(
    graph: &AttackGraph,
    query: &str,
    kind: TechniqueDetailKind,
) -> Option<TechniqueDetail> {
    let node = resolve(graph, query)?;
    if node.node_type != NodeType::Technique {
        return None;
    }

    let detail = match kind {
        // The full text, not the summary preview.
        TechniqueDetailKind::Description => serde_json::Value::String(node.description.clone()),
        TechniqueDetailKind::Platforms => string_list_value(node, "x_mitre_platforms"),
        TechniqueDetailKind::DataSources => string_list_value(node, "x_mitre_data_sources"),
    };

    Some(TechniqueDetail {
        id: display_id(node),
        name: node.name.clone(),
        detail,
    })
}

fn string_list_value(node: &GraphNode, field: &str) -> serde_json::Value {
    serde_json::Value::Array(
        node.raw_string_list(field)
            .into_iter()
            .map(serde_json::Value::String)
            .collect(),
    )
}

/// ATT&CK id when present, STIX id otherwise.
fn display_id(node: &GraphNode) -> String {
    node.attack_id
        .clone()
        .unwrap_or_else(|| node.stix_id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build_graph;
    use serde_json::json;

    fn graph() -> AttackGraph {
        let bundle = json!({
            "type": "bundle",
            "objects": [
                {
                    "type": "attack-pattern", "id": "attack-pattern--1",
                    "name": "Scripting",
                    "description": "Adversaries may use scripts.",
                    "x_mitre_platforms": ["Windows", "Linux"],
                    "x_mitre_data_sources": ["Process: Process Creation"],
                    "external_references": [
                        { "source_name": "mitre-attack", "external_id": "T1059" }
                    ],
                    "kill_chain_phases": [
                        { "kill_chain_name": "mitre-attack", "phase_name": "execution" }
                    ]
                },
                { "type": "course-of-action", "id": "course-of-action--1", "name": "Execution Prevention" },
                { "type": "course-of-action", "id": "course-of-action--2", "name": "Code Signing" },
                {
                    "type": "x-mitre-detection-strategy", "id": "x-mitre-detection-strategy--1",
                    "name": "Monitor Script Execution",
                    "x_mitre_analytic_refs": ["x-mitre-analytic--1"]
                },
                {
                    "type": "x-mitre-analytic", "id": "x-mitre-analytic--1",
                    "name": "Suspicious Interpreter Spawn",
                    "x_mitre_data_component_refs": ["x-mitre-data-component--1"]
                },
                { "type": "x-mitre-data-component", "id": "x-mitre-data-component--1", "name": "Process Creation" },
                {
                    "type": "intrusion-set", "id": "intrusion-set--1", "name": "APT29",
                    "external_references": [
                        { "source_name": "mitre-attack", "external_id": "G0016" }
                    ]
                },
                { "type": "malware", "id": "malware--1", "name": "Emotet" },
                { "type": "malware", "id": "malware--2", "name": "Emotet" },
                { "type": "tool", "id": "tool--1", "name": "Cobalt Strike" },
                { "type": "identity", "id": "identity--1", "name": "MITRE" },
                {
                    "type": "relationship", "id": "relationship--1",
                    "source_ref": "course-of-action--1", "target_ref": "attack-pattern--1",
                    "relationship_type": "mitigates"
                },
                {
                    "type": "relationship", "id": "relationship--2",
                    "source_ref": "course-of-action--2", "target_ref": "attack-pattern--1",
                    "relationship_type": "mitigates"
                },
                {
                    "type": "relationship", "id": "relationship--3",
                    "source_ref": "x-mitre-detection-strategy--1", "target_ref": "attack-pattern--1",
                    "relationship_type": "detects"
                },
                {
                    "type": "relationship", "id": "relationship--4",
                    "source_ref": "intrusion-set--1", "target_ref": "malware--1",
                    "relationship_type": "uses"
                },
                {
                    "type": "relationship", "id": "relationship--5",
                    "source_ref": "intrusion-set--1", "target_ref": "malware--2",
                    "relationship_type": "uses"
                },
                {
                    "type": "relationship", "id": "relationship--6",
                    "source_ref": "intrusion-set--1", "target_ref": "tool--1",
                    "relationship_type": "uses"
                }
            ]
        });
        build_graph(&serde_json::to_vec(&bundle).unwrap()).unwrap()
    }

    #[test]
    fn test_summary_only_when_not_detailed() {
        let g = graph();
        let d = entity_details(&g, "T1059", false).unwrap();
        assert_eq!(d.id, "T1059");
        assert_eq!(d.node_type, NodeType::Technique);
        assert!(d.mitigations.is_empty());
        assert!(d.detections.is_empty());
    }

    #[test]
    fn test_technique_mitigations_and_detections() {
        let g = graph();
        let d = entity_details(&g, "T1059", true).unwrap();
        assert_eq!(d.mitigations.len(), 2);
        assert!(d.mitigations.contains(&"Execution Prevention".to_string()));

        assert_eq!(d.detections.len(), 1);
        let det = &d.detections[0];
        assert_eq!(det.strategy, "Monitor Script Execution");
        assert_eq!(det.analytics.len(), 1);
        assert_eq!(det.analytics[0].name, "Suspicious Interpreter Spawn");
        assert_eq!(det.analytics[0].log_sources, vec!["Process Creation"]);
    }

    #[test]
    fn test_intrusion_set_software_dedups_by_name() {
        let g = graph();
        let d = entity_details(&g, "G0016", true).unwrap();
        // Two Emotet nodes collapse to one entry; Cobalt Strike stays.
        assert_eq!(d.software.len(), 2);
        assert!(d.software.contains(&"Emotet".to_string()));
        assert!(d.software.contains(&"Cobalt Strike".to_string()));
    }

    #[test]
    fn test_unrecognized_type_gets_bare_summary() {
        let g = graph();
        let d = entity_details(&g, "MITRE", true).unwrap();
        assert_eq!(d.node_type, NodeType::Identity);
        assert!(d.mitigations.is_empty());
        assert!(d.detections.is_empty());
        assert!(d.software.is_empty());
    }

    #[test]
    fn test_unknown_entity_is_none() {
        let g = graph();
        assert!(entity_details(&g, "T9999", true).is_none());
    }

    #[test]
    fn test_technique_profile() {
        let g = graph();
        let p = technique_profile(&g, "t1059").unwrap();
        assert_eq!(p.id, "T1059");
        assert_eq!(p.platforms, vec!["Windows", "Linux"]);
        assert_eq!(p.tactics, vec!["execution"]);
    }

    #[test]
    fn test_technique_profile_rejects_non_technique() {
        let g = graph();
        assert!(technique_profile(&g, "G0016").is_none());
    }

    #[test]
    fn test_technique_detail_platforms() {
        let g = graph();
        let d = technique_detail(&g, "T1059", TechniqueDetailKind::Platforms).unwrap();
        assert_eq!(d.detail, json!(["Windows", "Linux"]));
    }

    #[test]
    fn test_technique_detail_full_description() {
        let g = graph();
        let d = technique_detail(&g, "T1059", TechniqueDetailKind::Description).unwrap();
        assert_eq!(d.detail, json!("Adversaries may use scripts."));
    }

    #[test]
    fn test_detail_kind_parsing() {
        assert_eq!(
            "platforms".parse::<TechniqueDetailKind>().unwrap(),
            TechniqueDetailKind::Platforms
        );
        assert!("bogus".parse::<TechniqueDetailKind>().is_err());
    }
}
