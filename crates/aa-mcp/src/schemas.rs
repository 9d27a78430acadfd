//! Tool catalog and typed argument structs.
//!
//! Each tool advertised over `tools/list` has a matching `*Params` struct
//! here; arguments are deserialized through serde so missing or mistyped
//! fields surface as a single uniform validation failure at the dispatch
//! boundary.

use crate::types::{InputSchema, PropertySchema, ToolDefinition};
use serde::Deserialize;
use std::collections::BTreeMap;

pub const GET_TECHNIQUE: &str = "get_technique";
pub const GET_TECHNIQUE_DETAIL: &str = "get_technique_detail";
pub const SEARCH: &str = "search_knowledge_base";
pub const EXPLORE: &str = "explore_relationships";
pub const LIST_BY_TACTIC: &str = "list_techniques_by_tactic";
pub const ENTITY_DETAILS: &str = "get_entity_details";
pub const GENERATE_LAYER: &str = "generate_navigator_layer";
pub const UPDATE_BUNDLE: &str = "update_bundle";
pub const GET_VERSION: &str = "get_version";

#[derive(Debug, Deserialize)]
pub struct GetTechniqueParams {
    pub id_or_name: String,
}

#[derive(Debug, Deserialize)]
pub struct GetTechniqueDetailParams {
    pub id_or_name: String,
    pub detail: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: String,
    #[serde(default)]
    pub limit: Option<usize>,
}

fn default_depth() -> u32 {
    2
}

#[derive(Debug, Deserialize)]
pub struct ExploreParams {
    pub id_or_name: String,
    #[serde(default = "default_depth")]
    pub depth: u32,
}

#[derive(Debug, Deserialize)]
pub struct ListByTacticParams {
    pub tactic: String,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: usize,
}

#[derive(Debug, Deserialize)]
pub struct EntityDetailsParams {
    pub id: String,
    #[serde(default)]
    pub detailed: bool,
}

#[derive(Debug, Deserialize)]
pub struct GenerateLayerParams {
    pub technique_ids: Vec<String>,
    pub filename: String,
}

/// The full tool catalog, in the order it is advertised.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: GET_TECHNIQUE,
            description: "Get a technique summary by ATT&CK id (e.g. T1059) or name",
            input_schema: object(
                [(
                    "id_or_name",
                    PropertySchema::scalar("string", "ATT&CK id or display name"),
                )],
                vec!["id_or_name"],
            ),
        },
        ToolDefinition {
            name: GET_TECHNIQUE_DETAIL,
            description: "Drill into one attribute of a technique",
            input_schema: object(
                [
                    (
                        "id_or_name",
                        PropertySchema::scalar("string", "ATT&CK id or display name"),
                    ),
                    (
                        "detail",
                        PropertySchema::one_of(
                            "Which attribute to return",
                            vec!["description", "platforms", "data_sources"],
                        ),
                    ),
                ],
                vec!["id_or_name", "detail"],
            ),
        },
        ToolDefinition {
            name: SEARCH,
            description: "Search any ATT&CK object (techniques, malware, groups, campaigns)",
            input_schema: object(
                [
                    (
                        "query",
                        PropertySchema::scalar("string", "Id, exact name, or name substring"),
                    ),
                    (
                        "limit",
                        PropertySchema::scalar("integer", "Maximum results (default 5, max 100)"),
                    ),
                ],
                vec!["query"],
            ),
        },
        ToolDefinition {
            name: EXPLORE,
            description: "Traverse relationships around an entity up to a bounded depth",
            input_schema: object(
                [
                    (
                        "id_or_name",
                        PropertySchema::scalar("string", "Start entity id or name"),
                    ),
                    (
                        "depth",
                        PropertySchema::scalar("integer", "Traversal depth (default 2, max 4)"),
                    ),
                ],
                vec!["id_or_name"],
            ),
        },
        ToolDefinition {
            name: LIST_BY_TACTIC,
            description: "List techniques belonging to a tactic, paginated",
            input_schema: object(
                [
                    (
                        "tactic",
                        PropertySchema::scalar("string", "Tactic name (e.g. privilege escalation)"),
                    ),
                    (
                        "limit",
                        PropertySchema::scalar("integer", "Page size (default 20, max 100)"),
                    ),
                    (
                        "offset",
                        PropertySchema::scalar("integer", "Page start offset (default 0)"),
                    ),
                ],
                vec!["tactic"],
            ),
        },
        ToolDefinition {
            name: ENTITY_DETAILS,
            description: "Get mitigations, detections, and software for an entity",
            input_schema: object(
                [
                    (
                        "id",
                        PropertySchema::scalar("string", "Entity id or name"),
                    ),
                    (
                        "detailed",
                        PropertySchema::scalar(
                            "boolean",
                            "Include mitigation/detection/software aggregation",
                        ),
                    ),
                ],
                vec!["id"],
            ),
        },
        ToolDefinition {
            name: GENERATE_LAYER,
            description: "Write an ATT&CK Navigator layer for a set of technique ids",
            input_schema: object(
                [
                    (
                        "technique_ids",
                        PropertySchema::string_array("Technique ids to include"),
                    ),
                    (
                        "filename",
                        PropertySchema::scalar(
                            "string",
                            "Output file name; sanitized and confined to the output directory",
                        ),
                    ),
                ],
                vec!["technique_ids", "filename"],
            ),
        },
        ToolDefinition {
            name: UPDATE_BUNDLE,
            description: "Refetch the STIX bundle and rebuild the knowledge graph",
            input_schema: object([], vec![]),
        },
        ToolDefinition {
            name: GET_VERSION,
            description: "Report the loaded dataset's modification timestamp",
            input_schema: object([], vec![]),
        },
    ]
}

fn object<const N: usize>(
    properties: [(&'static str, PropertySchema); N],
    required: Vec<&'static str>,
) -> InputSchema {
    InputSchema {
        schema_type: "object",
        properties: BTreeMap::from(properties),
        required,
    }
}
