//! Tool registry: the static table of tools this proxy exposes.
//!
//! Provides:
//! - Lookup by tool name (fail fast on unknown names)
//! - Declaration-ordered listing for capability discovery
//! - Serialization of tools into the MCP `tools/list` format

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::catalog::Catalog;
use super::errors::RegistryError;
use super::schema::Schema;

// ─── ToolDefinition ──────────────────────────────────────────────────────────

/// HTTP method used to reach a tool's upstream endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => f.write_str("GET"),
            Self::Post => f.write_str("POST"),
        }
    }
}

/// How validated arguments are shaped into the upstream payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestBody {
    /// Send the validated arguments as the payload.
    Arguments,
    /// Wrap as `{"tool": <name>, "arguments": {...}}` for a single
    /// multiplexed execute endpoint.
    ToolEnvelope,
}

/// A named operation forwarded to the upstream API.
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Schema,
    /// Path appended to the configured base URL (e.g. `/universal-mcp/status`).
    pub endpoint: &'static str,
    pub method: HttpMethod,
    pub body: RequestBody,
}

impl ToolDefinition {
    /// A tool whose arguments are POSTed as a JSON body.
    pub fn post(
        name: &'static str,
        description: &'static str,
        endpoint: &'static str,
        input_schema: Schema,
    ) -> Self {
        Self {
            name,
            description,
            input_schema,
            endpoint,
            method: HttpMethod::Post,
            body: RequestBody::Arguments,
        }
    }

    /// A tool whose arguments are sent as query parameters.
    pub fn get(
        name: &'static str,
        description: &'static str,
        endpoint: &'static str,
        input_schema: Schema,
    ) -> Self {
        Self {
            method: HttpMethod::Get,
            ..Self::post(name, description, endpoint, input_schema)
        }
    }

    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    /// MCP `tools/list` entry: `{name, description, inputSchema}`.
    pub fn to_mcp_tool(&self) -> serde_json::Value {
        serde_json::json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.input_schema.to_json_schema(),
        })
    }
}

// ─── ToolRegistry ────────────────────────────────────────────────────────────

/// Immutable, declaration-ordered tool table.
///
/// Built once at startup and shared read-only (wrap in `Arc` to share across
/// tasks); no interior mutability.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: Vec<ToolDefinition>,
    /// `tool_name → index into tools`.
    index: HashMap<&'static str, usize>,
}

impl ToolRegistry {
    /// Build a registry from a table. Rejects duplicate names.
    pub fn new(definitions: Vec<ToolDefinition>) -> Result<Self, RegistryError> {
        let mut index = HashMap::with_capacity(definitions.len());
        for (i, def) in definitions.iter().enumerate() {
            if index.insert(def.name, i).is_some() {
                return Err(RegistryError::DuplicateTool {
                    name: def.name.to_string(),
                });
            }
        }
        Ok(Self {
            tools: definitions,
            index,
        })
    }

    /// Build the registry for one of the shipped deployment catalogs.
    pub fn from_catalog(catalog: Catalog) -> Result<Self, RegistryError> {
        let registry = Self::new(catalog.definitions())?;
        tracing::debug!(
            catalog = catalog.name(),
            tool_count = registry.len(),
            "tool registry built"
        );
        Ok(registry)
    }

    /// Look up a tool by name.
    pub fn lookup(&self, name: &str) -> Result<&ToolDefinition, RegistryError> {
        self.get(name).ok_or_else(|| RegistryError::NotFound {
            name: name.to_string(),
        })
    }

    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    /// All tools in declaration order.
    pub fn list(&self) -> &[ToolDefinition] {
        &self.tools
    }

    /// Tool names in declaration order.
    pub fn tool_names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|t| t.name).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Serialize every tool into MCP `tools/list` format.
    pub fn to_mcp_tools(&self) -> Vec<serde_json::Value> {
        self.tools.iter().map(ToolDefinition::to_mcp_tool).collect()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
