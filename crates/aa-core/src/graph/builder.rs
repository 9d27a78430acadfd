//! Two-pass STIX bundle ingestion.
//!
//! Pass 1 materializes nodes so that pass 2 can drop any edge whose
//! endpoint is absent; reversing the passes would either crash on partial
//! bundles or require patching edges up afterwards. Revoked and deprecated
//! objects are filtered in both passes, so they appear neither as nodes nor
//! as traversal endpoints.

use crate::error::{AtlasError, AtlasResult};
use crate::graph::{
    AttackGraph, GraphNode, KillChainPhase, NodeType, REL_REFERENCES_ANALYTIC,
    REL_REFERENCES_DATA_COMPONENT,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

/// External-reference source tag that carries ATT&CK ids.
const ATTACK_SOURCE_NAME: &str = "mitre-attack";

#[derive(Debug, Deserialize)]
struct StixBundle {
    #[serde(default)]
    objects: Vec<Value>,
}

/// Builds a fresh graph from verified bundle bytes.
///
/// Always constructs into a new [`AttackGraph`]; the caller decides when
/// (and whether) to publish it. Malformed member objects are skipped, a
/// bundle that is not JSON at all is a parse error.
pub fn build_graph(bytes: &[u8]) -> AtlasResult<AttackGraph> {
    let bundle: StixBundle =
        serde_json::from_slice(bytes).map_err(|e| AtlasError::Parse(e.to_string()))?;

    let mut graph = AttackGraph::default();

    // Pass 1: nodes.
    for obj in &bundle.objects {
        if is_excluded(obj) {
            continue;
        }
        let Some(type_tag) = obj.get("type").and_then(Value::as_str) else {
            continue;
        };
        if type_tag == "relationship" {
            continue;
        }
        let Some(stix_id) = obj.get("id").and_then(Value::as_str) else {
            continue;
        };

        if type_tag == "x-mitre-collection" {
            let modified = obj
                .get("modified")
                .and_then(Value::as_str)
                .map(str::to_string);
            graph.set_version(modified);
        }

        graph.insert_node(GraphNode {
            stix_id: stix_id.to_string(),
            node_type: NodeType::from_stix(type_tag),
            name: obj
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or("Unknown")
                .to_string(),
            attack_id: extract_attack_id(obj),
            description: obj
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            kill_chain_phases: extract_phases(obj),
            raw: obj.clone(),
        });
    }

    // Pass 2: edges.
    for obj in &bundle.objects {
        if is_excluded(obj) {
            continue;
        }
        match obj.get("type").and_then(Value::as_str) {
            Some("relationship") => {
                let source = obj.get("source_ref").and_then(Value::as_str);
                let target = obj.get("target_ref").and_then(Value::as_str);
                let relation = obj
                    .get("relationship_type")
                    .and_then(Value::as_str)
                    .unwrap_or("connected");
                if let (Some(source), Some(target)) = (source, target) {
                    graph.insert_edge(source, target, relation);
                }
            }
            // Detection strategies and analytics express their relations as
            // inline reference lists; synthesize labeled edges for them.
            Some("x-mitre-detection-strategy") => {
                if let Some(source) = obj.get("id").and_then(Value::as_str) {
                    for target in ref_list(obj, "x_mitre_analytic_refs") {
                        graph.insert_edge(source, target, REL_REFERENCES_ANALYTIC);
                    }
                }
            }
            Some("x-mitre-analytic") => {
                if let Some(source) = obj.get("id").and_then(Value::as_str) {
                    for target in ref_list(obj, "x_mitre_data_component_refs") {
                        graph.insert_edge(source, target, REL_REFERENCES_DATA_COMPONENT);
                    }
                    // Log source references nest the data component ref one
                    // level down.
                    if let Some(refs) = obj
                        .get("x_mitre_log_source_references")
                        .and_then(Value::as_array)
                    {
                        for entry in refs {
                            if let Some(target) = entry
                                .get("x_mitre_data_component_ref")
                                .and_then(Value::as_str)
                            {
                                graph.insert_edge(source, target, REL_REFERENCES_DATA_COMPONENT);
                            }
                        }
                    }
                }
            }
            _ => {}
        }
    }

    info!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        version = graph.version().unwrap_or("unknown"),
        "Knowledge graph built"
    );
    debug!(indexed_ids = graph.node_count(), "ATT&CK id index ready");

    Ok(graph)
}

fn is_excluded(obj: &Value) -> bool {
    obj.get("revoked").and_then(Value::as_bool).unwrap_or(false)
        || obj
            .get("x_mitre_deprecated")
            .and_then(Value::as_bool)
            .unwrap_or(false)
}

/// First external reference whose source is the canonical ATT&CK tag.
fn extract_attack_id(obj: &Value) -> Option<String> {
    obj.get("external_references")?
        .as_array()?
        .iter()
        .find(|r| r.get("source_name").and_then(Value::as_str) == Some(ATTACK_SOURCE_NAME))?
        .get("external_id")?
        .as_str()
        .map(str::to_string)
}

fn extract_phases(obj: &Value) -> Vec<KillChainPhase> {
    obj.get("kill_chain_phases")
        .and_then(Value::as_array)
        .map(|phases| {
            phases
                .iter()
                .filter_map(|p| {
                    Some(KillChainPhase {
                        kill_chain_name: p.get("kill_chain_name")?.as_str()?.to_string(),
                        phase_name: p.get("phase_name")?.as_str()?.to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

fn ref_list<'a>(obj: &'a Value, field: &str) -> Vec<&'a str> {
    obj.get(field)
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}
