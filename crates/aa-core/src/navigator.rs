//! ATT&CK Navigator layer export.
//!
//! Produces a minimal layer document from a set of technique ids. The
//! output path is always the sanitized basename joined to the configured
//! output directory; callers cannot select a directory, so traversal input
//! like `../etc/passwd` degrades to a safe basename inside the sandbox.

use crate::error::AtlasResult;
use crate::graph::AttackGraph;
use crate::limits::sanitize_filename;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Navigator format version written into every layer.
const NAVIGATOR_VERSION: &str = "4.8.0";

/// Layer format version written into every layer.
const LAYER_VERSION: &str = "4.4";

/// ATT&CK content version tag.
const ATTACK_VERSION: &str = "18";

const DEFAULT_SCORE: u32 = 1;
const DEFAULT_COLOR: &str = "#ff6666";

#[derive(Debug, Serialize)]
struct LayerVersions {
    attack: &'static str,
    navigator: &'static str,
    layer: &'static str,
}

#[derive(Debug, Serialize)]
struct LayerTechnique {
    #[serde(rename = "techniqueID")]
    technique_id: String,
    score: u32,
    color: &'static str,
    comment: String,
}

#[derive(Debug, Serialize)]
struct LayerDocument {
    name: String,
    versions: LayerVersions,
    domain: String,
    techniques: Vec<LayerTechnique>,
}

/// Outcome of a layer export.
#[derive(Debug, Clone, Serialize)]
pub struct LayerExport {
    /// Where the layer was written.
    pub path: PathBuf,
    /// Technique ids actually included, in request order.
    pub included: Vec<String>,
    /// Number of requested ids that did not resolve.
    pub skipped: usize,
}

/// Writes a Navigator layer for the given technique ids.
///
/// Ids are matched against the ATT&CK-id index after trim + uppercase;
/// unresolved ids are skipped silently and excluded from the returned
/// count. The output directory is created when missing.
pub fn export_layer(
    graph: &AttackGraph,
    technique_ids: &[String],
    filename: &str,
    output_dir: &Path,
    domain: &str,
) -> AtlasResult<LayerExport> {
    let mut techniques = Vec::new();
    let mut included = Vec::new();
    let mut skipped = 0usize;

    for requested in technique_ids {
        let attack_id = requested.trim().to_uppercase();
        match graph.by_attack_id(&attack_id).and_then(|s| graph.node(s)) {
            Some(node) => {
                techniques.push(LayerTechnique {
                    technique_id: attack_id.clone(),
                    score: DEFAULT_SCORE,
                    color: DEFAULT_COLOR,
                    comment: node.name.clone(),
                });
                included.push(attack_id);
            }
            None => {
                warn!(technique_id = %attack_id, "Skipping unresolved technique id");
                skipped += 1;
            }
        }
    }

    let document = LayerDocument {
        name: "Attack Atlas Layer".to_string(),
        versions: LayerVersions {
            attack: ATTACK_VERSION,
            navigator: NAVIGATOR_VERSION,
            layer: LAYER_VERSION,
        },
        domain: domain.to_string(),
        techniques,
    };

    let path = output_dir.join(sanitize_filename(filename));
    std::fs::create_dir_all(output_dir)?;
    std::fs::write(&path, serde_json::to_vec_pretty(&document)?)?;

    info!(
        path = %path.display(),
        included = included.len(),
        skipped,
        "Navigator layer written"
    );

    Ok(LayerExport {
        path,
        included,
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build_graph;
    use serde_json::json;
    use tempfile::TempDir;

    fn graph() -> AttackGraph {
        let bundle = json!({
            "type": "bundle",
            "objects": [
                {
                    "type": "attack-pattern", "id": "attack-pattern--1", "name": "Scripting",
                    "external_references": [
                        { "source_name": "mitre-attack", "external_id": "T1059" }
                    ]
                },
                {
                    "type": "attack-pattern", "id": "attack-pattern--2", "name": "Phishing",
                    "external_references": [
                        { "source_name": "mitre-attack", "external_id": "T1566" }
                    ]
                }
            ]
        });
        build_graph(&serde_json::to_vec(&bundle).unwrap()).unwrap()
    }

    #[test]
    fn test_unknown_ids_are_skipped() {
        let g = graph();
        let dir = TempDir::new().unwrap();
        let ids = vec!["t1059".to_string(), "T9999".to_string()];
        let export = export_layer(&g, &ids, "layer", dir.path(), "enterprise-attack").unwrap();

        assert_eq!(export.included, vec!["T1059"]);
        assert_eq!(export.skipped, 1);

        let written: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&export.path).unwrap()).unwrap();
        let techniques = written["techniques"].as_array().unwrap();
        assert_eq!(techniques.len(), 1);
        assert_eq!(techniques[0]["techniqueID"], "T1059");
        assert_eq!(techniques[0]["comment"], "Scripting");
    }

    #[test]
    fn test_traversal_filename_stays_in_output_dir() {
        let g = graph();
        let dir = TempDir::new().unwrap();
        let ids = vec!["T1059".to_string()];
        let export =
            export_layer(&g, &ids, "../etc/passwd", dir.path(), "enterprise-attack").unwrap();

        assert!(export.path.starts_with(dir.path()));
        assert_eq!(export.path.file_name().unwrap(), "passwd.json");
    }

    #[test]
    fn test_layer_document_shape() {
        let g = graph();
        let dir = TempDir::new().unwrap();
        let ids = vec!["T1059".to_string(), "T1566".to_string()];
        let export = export_layer(&g, &ids, "full.json", dir.path(), "enterprise-attack").unwrap();

        let written: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&export.path).unwrap()).unwrap();
        assert_eq!(written["domain"], "enterprise-attack");
        assert_eq!(written["versions"]["navigator"], "4.8.0");
        assert_eq!(written["versions"]["layer"], "4.4");
        assert_eq!(written["techniques"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_empty_request_writes_empty_layer() {
        let g = graph();
        let dir = TempDir::new().unwrap();
        let export = export_layer(&g, &[], "empty", dir.path(), "enterprise-attack").unwrap();
        assert!(export.included.is_empty());
        assert_eq!(export.skipped, 0);
        assert!(export.path.exists());
    }
}
