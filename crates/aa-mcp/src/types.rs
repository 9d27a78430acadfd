//! JSON-RPC 2.0 envelope and MCP tool types.
//!
//! The dispatcher owns the request/response envelope; the knowledge graph
//! core never sees these shapes. Requests without an id are notifications
//! and produce no reply.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A JSON-RPC 2.0 request or notification.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    /// Absent for notifications.
    pub id: Option<serde_json::Value>,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

impl JsonRpcRequest {
    /// Notifications never receive a reply.
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// A JSON-RPC 2.0 response.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: &'static str,
    pub id: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
}

/// Standard JSON-RPC error codes used by the dispatcher.
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const METHOD_NOT_FOUND: i64 = -32601;
}

impl JsonRpcResponse {
    pub fn success(id: Option<serde_json::Value>, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Option<serde_json::Value>, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// An MCP tool definition advertised via `tools/list`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: InputSchema,
}

/// JSON Schema fragment describing a tool's arguments.
///
/// `BTreeMap` keeps advertised property order stable across runs.
#[derive(Debug, Clone, Serialize)]
pub struct InputSchema {
    #[serde(rename = "type")]
    pub schema_type: &'static str,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<&'static str, PropertySchema>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<&'static str>,
}

/// Schema for a single tool argument.
#[derive(Debug, Clone, Serialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub prop_type: &'static str,
    pub description: &'static str,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<&'static str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<PropertySchema>>,
}

impl PropertySchema {
    pub fn scalar(prop_type: &'static str, description: &'static str) -> Self {
        Self {
            prop_type,
            description,
            allowed: None,
            items: None,
        }
    }

    pub fn one_of(
        description: &'static str,
        allowed: Vec<&'static str>,
    ) -> Self {
        Self {
            prop_type: "string",
            description,
            allowed: Some(allowed),
            items: None,
        }
    }

    pub fn string_array(description: &'static str) -> Self {
        Self {
            prop_type: "array",
            description,
            allowed: None,
            items: Some(Box::new(PropertySchema::scalar("string", "item"))),
        }
    }
}

/// Result of a tool invocation.
#[derive(Debug, Clone, Serialize)]
pub struct ToolCallResult {
    pub content: Vec<ContentBlock>,
    #[serde(rename = "isError", skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

/// A single content block; this server only emits text.
#[derive(Debug, Clone, Serialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub content_type: &'static str,
    pub text: String,
}

impl ToolCallResult {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock {
                content_type: "text",
                text: text.into(),
            }],
            is_error: None,
        }
    }

    /// Caller-visible tool failure (validation, fetch, integrity).
    pub fn failure(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock {
                content_type: "text",
                text: text.into(),
            }],
            is_error: Some(true),
        }
    }
}
