//! Identifier and name resolution.
//!
//! Every query entry point funnels through [`resolve`]: ATT&CK ids hit the
//! uppercase index in O(1), names fall back to a linear case-insensitive
//! scan in lexical STIX-id order (first match wins; the dataset keeps names
//! unique per type but nothing here enforces that).

use crate::graph::{AttackGraph, GraphNode};

/// Resolves an ATT&CK id or display name to a node.
///
/// A miss is `None`, a domain-level outcome the caller renders as
/// "entity not found"; it is never an error.
pub fn resolve<'g>(graph: &'g AttackGraph, query: &str) -> Option<&'g GraphNode> {
    let id_probe = query.trim().to_uppercase();
    if let Some(stix_id) = graph.by_attack_id(&id_probe) {
        return graph.node(stix_id);
    }

    let name_probe = query.trim().to_lowercase();
    graph
        .nodes()
        .find(|node| node.name.to_lowercase() == name_probe)
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
                    "type": "attack-pattern",
                    "id": "attack-pattern--1",
                    "name": "PowerShell",
                    "external_references": [
                        { "source_name": "mitre-attack", "external_id": "T1059.001" }
                    ]
                },
                {
                    "type": "intrusion-set",
                    "id": "intrusion-set--1",
                    "name": "APT29",
                    "external_references": [
                        { "source_name": "mitre-attack", "external_id": "G0016" }
                    ]
                }
            ]
        });
        build_graph(&serde_json::to_vec(&bundle).unwrap()).unwrap()
    }

    #[test]
    fn test_resolve_by_attack_id_case_insensitive() {
        let g = graph();
        let lower = resolve(&g, "t1059.001").unwrap();
        let upper = resolve(&g, "T1059.001").unwrap();
        assert_eq!(lower.stix_id, upper.stix_id);
        assert_eq!(lower.stix_id, "attack-pattern--1");
    }

    #[test]
    fn test_resolve_by_name_case_insensitive() {
        let g = graph();
        let node = resolve(&g, "  powershell ").unwrap();
        assert_eq!(node.stix_id, "attack-pattern--1");
    }

    #[test]
    fn test_id_probe_wins_over_name_scan() {
        let g = graph();
        let node = resolve(&g, "g0016").unwrap();
        assert_eq!(node.name, "APT29");
    }

    #[test]
    fn test_unknown_query_is_none() {
        let g = graph();
        assert!(resolve(&g, "T9999").is_none());
        assert!(resolve(&g, "No Such Thing").is_none());
    }
}
