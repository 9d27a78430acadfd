//! MCP dispatcher: JSON-RPC 2.0 over line-delimited stdio.
//!
//! Converts tool calls into knowledge graph operations and typed results.
//! Domain not-found outcomes render as structured payloads, caller input
//! errors render as failed tool results, and anything else is logged
//! server-side and reduced to a fixed "internal error" string so internal
//! detail never crosses the wire.

use crate::schemas::{self, tool_definitions};
use crate::types::{error_codes, JsonRpcRequest, JsonRpcResponse, ToolCallResult};
use aa_core::{
    entity_details, explore, export_layer, list_by_tactic, search, technique_detail,
    technique_profile, AtlasError, KnowledgeBase, TechniqueDetailKind,
};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info, warn};

/// Server name advertised during `initialize`.
const SERVER_NAME: &str = "attack-atlas";

/// MCP protocol revision this dispatcher speaks.
const PROTOCOL_VERSION: &str = "2024-11-05";

/// The MCP tool server.
pub struct McpServer {
    kb: Arc<KnowledgeBase>,
    /// Fixed sandbox directory for Navigator layers.
    layer_dir: PathBuf,
    /// ATT&CK domain tag written into layers.
    domain: String,
}

impl McpServer {
    pub fn new(kb: Arc<KnowledgeBase>, layer_dir: PathBuf, domain: String) -> Self {
        Self {
            kb,
            layer_dir,
            domain,
        }
    }

    /// Dispatches a single request to a response.
    ///
    /// Notifications are executed for their effects but the returned
    /// response must not be written; [`run_stdio`](Self::run_stdio)
    /// enforces that.
    pub async fn handle_request(&self, request: &JsonRpcRequest) -> JsonRpcResponse {
        match request.method.as_str() {
            "initialize" => JsonRpcResponse::success(
                request.id.clone(),
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": { "tools": { "listChanged": false } },
                    "serverInfo": {
                        "name": SERVER_NAME,
                        "version": env!("CARGO_PKG_VERSION")
                    }
                }),
            ),
            "tools/list" => JsonRpcResponse::success(
                request.id.clone(),
                json!({ "tools": tool_definitions() }),
            ),
            "tools/call" => {
                let result = self.handle_tool_call(&request.params).await;
                match serde_json::to_value(result) {
                    Ok(value) => JsonRpcResponse::success(request.id.clone(), value),
                    Err(e) => {
                        error!(error = %e, "Failed to serialize tool result");
                        JsonRpcResponse::success(
                            request.id.clone(),
                            serde_json::to_value(ToolCallResult::failure("internal error"))
                                .unwrap_or(serde_json::Value::Null),
                        )
                    }
                }
            }
            other => JsonRpcResponse::error(
                request.id.clone(),
                error_codes::METHOD_NOT_FOUND,
                format!("Method not found: {}", other),
            ),
        }
    }

    async fn handle_tool_call(&self, params: &serde_json::Value) -> ToolCallResult {
        let Some(name) = params.get("name").and_then(|v| v.as_str()) else {
            return ToolCallResult::failure("Missing tool name");
        };
        let arguments = params.get("arguments").cloned().unwrap_or(json!({}));

        let outcome = match name {
            schemas::GET_TECHNIQUE => self.tool_get_technique(arguments).await,
            schemas::GET_TECHNIQUE_DETAIL => self.tool_get_technique_detail(arguments).await,
            schemas::SEARCH => self.tool_search(arguments).await,
            schemas::EXPLORE => self.tool_explore(arguments).await,
            schemas::LIST_BY_TACTIC => self.tool_list_by_tactic(arguments).await,
            schemas::ENTITY_DETAILS => self.tool_entity_details(arguments).await,
            schemas::GENERATE_LAYER => self.tool_generate_layer(arguments).await,
            schemas::UPDATE_BUNDLE => self.tool_update_bundle().await,
            schemas::GET_VERSION => self.tool_get_version().await,
            other => return ToolCallResult::failure(format!("Unknown tool: {}", other)),
        };

        outcome.unwrap_or_else(|e| render_error(name, e))
    }

    async fn tool_get_technique(
        &self,
        arguments: serde_json::Value,
    ) -> Result<ToolCallResult, AtlasError> {
        let params: schemas::GetTechniqueParams = parse_args(arguments)?;
        let graph = self.kb.graph().await?;
        match technique_profile(&graph, &params.id_or_name) {
            Some(profile) => json_result(&profile),
            None => Ok(not_found(&params.id_or_name)),
        }
    }

    async fn tool_get_technique_detail(
        &self,
        arguments: serde_json::Value,
    ) -> Result<ToolCallResult, AtlasError> {
        let params: schemas::GetTechniqueDetailParams = parse_args(arguments)?;
        let kind: TechniqueDetailKind = params.detail.parse()?;
        let graph = self.kb.graph().await?;
        match technique_detail(&graph, &params.id_or_name, kind) {
            Some(detail) => json_result(&detail),
            None => Ok(not_found(&params.id_or_name)),
        }
    }

    async fn tool_search(
        &self,
        arguments: serde_json::Value,
    ) -> Result<ToolCallResult, AtlasError> {
        let params: schemas::SearchParams = parse_args(arguments)?;
        let graph = self.kb.graph().await?;
        let hits = search(&graph, &params.query, params.limit)?;
        json_result(&hits)
    }

    async fn tool_explore(
        &self,
        arguments: serde_json::Value,
    ) -> Result<ToolCallResult, AtlasError> {
        let params: schemas::ExploreParams = parse_args(arguments)?;
        let graph = self.kb.graph().await?;
        match explore(&graph, &params.id_or_name, params.depth)? {
            Some(items) => json_result(&items),
            None => Ok(not_found(&params.id_or_name)),
        }
    }

    async fn tool_list_by_tactic(
        &self,
        arguments: serde_json::Value,
    ) -> Result<ToolCallResult, AtlasError> {
        let params: schemas::ListByTacticParams = parse_args(arguments)?;
        let graph = self.kb.graph().await?;
        let page = list_by_tactic(&graph, &params.tactic, params.limit, params.offset);
        json_result(&page)
    }

    async fn tool_entity_details(
        &self,
        arguments: serde_json::Value,
    ) -> Result<ToolCallResult, AtlasError> {
        let params: schemas::EntityDetailsParams = parse_args(arguments)?;
        let graph = self.kb.graph().await?;
        match entity_details(&graph, &params.id, params.detailed) {
            Some(details) => json_result(&details),
            None => Ok(not_found(&params.id)),
        }
    }

    async fn tool_generate_layer(
        &self,
        arguments: serde_json::Value,
    ) -> Result<ToolCallResult, AtlasError> {
        let params: schemas::GenerateLayerParams = parse_args(arguments)?;
        let graph = self.kb.graph().await?;
        let export = export_layer(
            &graph,
            &params.technique_ids,
            &params.filename,
            &self.layer_dir,
            &self.domain,
        )?;
        json_result(&export)
    }

    async fn tool_update_bundle(&self) -> Result<ToolCallResult, AtlasError> {
        self.kb.rebuild().await?;
        let graph = self.kb.graph().await?;
        json_result(&json!({
            "status": "rebuilt",
            "nodes": graph.node_count(),
            "edges": graph.edge_count(),
            "version": graph.version(),
        }))
    }

    async fn tool_get_version(&self) -> Result<ToolCallResult, AtlasError> {
        // Lazily build so the very first call reports a real version.
        let _ = self.kb.graph().await?;
        json_result(&json!({
            "version": self.kb.dataset_version().await
        }))
    }

    /// Serves requests from stdin until EOF.
    pub async fn run_stdio(&self) -> std::io::Result<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        let mut stdout = tokio::io::stdout();
        let mut lines = stdin.lines();

        info!("MCP server listening on stdio");

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            let request: JsonRpcRequest = match serde_json::from_str(&line) {
                Ok(req) => req,
                Err(e) => {
                    let resp = JsonRpcResponse::error(
                        None,
                        error_codes::PARSE_ERROR,
                        format!("Parse error: {}", e),
                    );
                    write_response(&mut stdout, &resp).await?;
                    continue;
                }
            };

            let is_notification = request.is_notification();
            let response = self.handle_request(&request).await;
            if !is_notification {
                write_response(&mut stdout, &response).await?;
            }
        }

        info!("stdin closed; MCP server shutting down");
        Ok(())
    }
}

async fn write_response(
    stdout: &mut tokio::io::Stdout,
    response: &JsonRpcResponse,
) -> std::io::Result<()> {
    let mut payload = serde_json::to_vec(response).unwrap_or_default();
    payload.push(b'\n');
    stdout.write_all(&payload).await?;
    stdout.flush().await
}

fn parse_args<T: DeserializeOwned>(arguments: serde_json::Value) -> Result<T, AtlasError> {
    serde_json::from_value(arguments)
        .map_err(|e| AtlasError::InvalidInput(format!("invalid arguments: {}", e)))
}

fn json_result<T: serde::Serialize>(value: &T) -> Result<ToolCallResult, AtlasError> {
    Ok(ToolCallResult::success(serde_json::to_string(value)?))
}

/// Domain-level miss; a valid answer, not a transport error.
fn not_found(query: &str) -> ToolCallResult {
    ToolCallResult::success(
        json!({ "error": format!("ID or Name '{}' not found.", query) }).to_string(),
    )
}

fn render_error(tool: &str, err: AtlasError) -> ToolCallResult {
    if err.is_caller_visible() {
        warn!(tool, error = %err, "Tool call rejected");
        ToolCallResult::failure(err.to_string())
    } else {
        error!(tool, error = %err, "Tool call failed internally");
        ToolCallResult::failure("internal error")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aa_core::{AtlasResult, BundleProvider};
    use async_trait::async_trait;
    use serde_json::Value;

    struct StaticProvider(Vec<u8>);

    #[async_trait]
    impl BundleProvider for StaticProvider {
        async fn fetch_verified(&self) -> AtlasResult<Vec<u8>> {
            Ok(self.0.clone())
        }
    }

    fn fixture_bundle() -> Vec<u8> {
        serde_json::to_vec(&json!({
            "type": "bundle",
            "objects": [
                {
                    "type": "x-mitre-collection",
                    "id": "x-mitre-collection--1",
                    "name": "Enterprise ATT&CK",
                    "modified": "2025-10-01T00:00:00.000Z"
                },
                {
                    "type": "attack-pattern", "id": "attack-pattern--1",
                    "name": "Scripting",
                    "description": "Adversaries may use scripts.",
                    "x_mitre_platforms": ["Windows"],
                    "external_references": [
                        { "source_name": "mitre-attack", "external_id": "T1059" }
                    ],
                    "kill_chain_phases": [
                        { "kill_chain_name": "mitre-attack", "phase_name": "execution" }
                    ]
                },
                { "type": "malware", "id": "malware--1", "name": "Emotet" },
                {
                    "type": "relationship", "id": "relationship--1",
                    "source_ref": "malware--1", "target_ref": "attack-pattern--1",
                    "relationship_type": "uses"
                }
            ]
        }))
        .unwrap()
    }

    fn server(dir: &std::path::Path) -> McpServer {
        let kb = Arc::new(KnowledgeBase::new(Arc::new(StaticProvider(
            fixture_bundle(),
        ))));
        McpServer::new(kb, dir.to_path_buf(), "enterprise-attack".to_string())
    }

    fn request(method: &str, params: Value) -> JsonRpcRequest {
        serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params
        }))
        .unwrap()
    }

    fn tool_text(response: &JsonRpcResponse) -> String {
        let result = response.result.as_ref().unwrap();
        result["content"][0]["text"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_initialize() {
        let dir = tempfile::TempDir::new().unwrap();
        let server = server(dir.path());
        let resp = server.handle_request(&request("initialize", json!({}))).await;
        let result = resp.result.unwrap();
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], SERVER_NAME);
    }

    #[tokio::test]
    async fn test_tools_list_advertises_all_tools() {
        let dir = tempfile::TempDir::new().unwrap();
        let server = server(dir.path());
        let resp = server.handle_request(&request("tools/list", json!({}))).await;
        let tools = resp.result.unwrap()["tools"].as_array().unwrap().len();
        assert_eq!(tools, 9);
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let dir = tempfile::TempDir::new().unwrap();
        let server = server(dir.path());
        let resp = server.handle_request(&request("bogus/method", json!({}))).await;
        assert_eq!(resp.error.unwrap().code, error_codes::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_get_technique() {
        let dir = tempfile::TempDir::new().unwrap();
        let server = server(dir.path());
        let resp = server
            .handle_request(&request(
                "tools/call",
                json!({ "name": "get_technique", "arguments": { "id_or_name": "t1059" } }),
            ))
            .await;
        let payload: Value = serde_json::from_str(&tool_text(&resp)).unwrap();
        assert_eq!(payload["id"], "T1059");
        assert_eq!(payload["platforms"], json!(["Windows"]));
    }

    #[tokio::test]
    async fn test_get_technique_not_found_is_domain_result() {
        let dir = tempfile::TempDir::new().unwrap();
        let server = server(dir.path());
        let resp = server
            .handle_request(&request(
                "tools/call",
                json!({ "name": "get_technique", "arguments": { "id_or_name": "T9999" } }),
            ))
            .await;
        let result = resp.result.unwrap();
        // Not a tool-level failure, a structured miss.
        assert!(result["isError"].is_null());
        assert!(result["content"][0]["text"]
            .as_str()
            .unwrap()
            .contains("not found"));
    }

    #[tokio::test]
    async fn test_search_oversized_query_is_tool_failure() {
        let dir = tempfile::TempDir::new().unwrap();
        let server = server(dir.path());
        let resp = server
            .handle_request(&request(
                "tools/call",
                json!({
                    "name": "search_knowledge_base",
                    "arguments": { "query": "q".repeat(101) }
                }),
            ))
            .await;
        let result = resp.result.unwrap();
        assert_eq!(result["isError"], true);
        assert!(result["content"][0]["text"]
            .as_str()
            .unwrap()
            .contains("maximum length"));
    }

    #[tokio::test]
    async fn test_explore_depth_over_cap_is_tool_failure() {
        let dir = tempfile::TempDir::new().unwrap();
        let server = server(dir.path());
        let resp = server
            .handle_request(&request(
                "tools/call",
                json!({
                    "name": "explore_relationships",
                    "arguments": { "id_or_name": "T1059", "depth": 9 }
                }),
            ))
            .await;
        assert_eq!(resp.result.unwrap()["isError"], true);
    }

    #[tokio::test]
    async fn test_invalid_detail_value_is_tool_failure() {
        let dir = tempfile::TempDir::new().unwrap();
        let server = server(dir.path());
        let resp = server
            .handle_request(&request(
                "tools/call",
                json!({
                    "name": "get_technique_detail",
                    "arguments": { "id_or_name": "T1059", "detail": "bogus" }
                }),
            ))
            .await;
        let result = resp.result.unwrap();
        assert_eq!(result["isError"], true);
    }

    #[tokio::test]
    async fn test_generate_layer_writes_into_sandbox() {
        let dir = tempfile::TempDir::new().unwrap();
        let server = server(dir.path());
        let resp = server
            .handle_request(&request(
                "tools/call",
                json!({
                    "name": "generate_navigator_layer",
                    "arguments": {
                        "technique_ids": ["T1059", "T9999"],
                        "filename": "../escape"
                    }
                }),
            ))
            .await;
        let payload: Value = serde_json::from_str(&tool_text(&resp)).unwrap();
        assert_eq!(payload["included"], json!(["T1059"]));
        assert_eq!(payload["skipped"], 1);
        let path = std::path::PathBuf::from(payload["path"].as_str().unwrap());
        assert!(path.starts_with(dir.path()));
    }

    #[tokio::test]
    async fn test_get_version() {
        let dir = tempfile::TempDir::new().unwrap();
        let server = server(dir.path());
        let resp = server
            .handle_request(&request(
                "tools/call",
                json!({ "name": "get_version", "arguments": {} }),
            ))
            .await;
        let payload: Value = serde_json::from_str(&tool_text(&resp)).unwrap();
        assert_eq!(payload["version"], "2025-10-01T00:00:00.000Z");
    }

    #[tokio::test]
    async fn test_update_bundle_reports_counts() {
        let dir = tempfile::TempDir::new().unwrap();
        let server = server(dir.path());
        let resp = server
            .handle_request(&request(
                "tools/call",
                json!({ "name": "update_bundle", "arguments": {} }),
            ))
            .await;
        let payload: Value = serde_json::from_str(&tool_text(&resp)).unwrap();
        assert_eq!(payload["status"], "rebuilt");
        assert_eq!(payload["nodes"], 3);
        assert_eq!(payload["edges"], 1);
    }

    #[tokio::test]
    async fn test_missing_arguments_is_tool_failure() {
        let dir = tempfile::TempDir::new().unwrap();
        let server = server(dir.path());
        let resp = server
            .handle_request(&request(
                "tools/call",
                json!({ "name": "get_technique" }),
            ))
            .await;
        assert_eq!(resp.result.unwrap()["isError"], true);
    }
}
