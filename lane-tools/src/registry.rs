//! Runtime registry for tool metadata and execution.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use jsonschema::{Draft, Validator};
use lane_primitives::{ExecutionLane, ToolId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Result alias for tool operations.
pub type ToolResult<T> = Result<T, ToolError>;

/// Metadata describing a registered tool.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ToolMetadata {
    tool_id: ToolId,
    version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default)]
    execution_lane: ExecutionLane,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    request_schema: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
}

impl ToolMetadata {
    /// Creates metadata for the supplied identifier and version.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidMetadata`] if the identifier is malformed or
    /// the version is empty.
    pub fn new(tool_id: impl Into<String>, version: impl Into<String>) -> ToolResult<Self> {
        let tool_id = ToolId::new(tool_id).map_err(|err| ToolError::InvalidMetadata {
            reason: err.to_string(),
        })?;

        let version = version.into();
        if version.trim().is_empty() {
            return Err(ToolError::InvalidMetadata {
                reason: "tool version cannot be empty".into(),
            });
        }

        Ok(Self {
            tool_id,
            version,
            description: None,
            execution_lane: ExecutionLane::default(),
            request_schema: None,
            response_schema: None,
        })
    }

    /// Sets the human-readable description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the lane the tool executes in.
    #[must_use]
    pub fn with_execution_lane(mut self, lane: ExecutionLane) -> Self {
        self.execution_lane = lane;
        self
    }

    /// Sets the JSON Schema (draft 2020-12) every input must satisfy.
    #[must_use]
    pub fn with_request_schema(mut self, schema: Value) -> Self {
        self.request_schema = Some(schema);
        self
    }

    /// Sets the JSON Schema (draft 2020-12) every output must satisfy.
    #[must_use]
    pub fn with_response_schema(mut self, schema: Value) -> Self {
        self.response_schema = Some(schema);
        self
    }

    /// Returns the tool identifier.
    #[must_use]
    pub fn tool_id(&self) -> &ToolId {
        &self.tool_id
    }

    /// Returns the semantic version string.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the optional description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the execution lane.
    #[must_use]
    pub fn execution_lane(&self) -> ExecutionLane {
        self.execution_lane
    }

    /// Returns the request schema, if one was declared.
    #[must_use]
    pub fn request_schema(&self) -> Option<&Value> {
        self.request_schema.as_ref()
    }

    /// Returns the response schema, if one was declared.
    #[must_use]
    pub fn response_schema(&self) -> Option<&Value> {
        self.response_schema.as_ref()
    }
}

/// Compiled request and response schemas of a registered tool.
struct ToolContract {
    request: Option<Validator>,
    response: Option<Validator>,
}

impl ToolContract {
    fn compile(metadata: &ToolMetadata) -> ToolResult<Self> {
        let compile = |schema: Option<&Value>, side: &str| {
            schema
                .map(|schema| {
                    jsonschema::options()
                        .with_draft(Draft::Draft202012)
                        .build(schema)
                        .map_err(|err| ToolError::InvalidMetadata {
                            reason: format!(
                                "invalid {side} schema for `{}`: {err}",
                                metadata.tool_id()
                            ),
                        })
                })
                .transpose()
        };

        Ok(Self {
            request: compile(metadata.request_schema(), "request")?,
            response: compile(metadata.response_schema(), "response")?,
        })
    }
}

fn schema_issues(validator: Option<&Validator>, value: &Value) -> Vec<String> {
    validator
        .map(|validator| {
            validator
                .iter_errors(value)
                .map(|err| err.to_string())
                .collect()
        })
        .unwrap_or_default()
}

/// Trait implemented by tool executors.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Invokes the tool with the given JSON input, returning JSON output.
    async fn invoke(&self, input: Value) -> ToolResult<Value>;
}

#[async_trait]
impl<F, Fut> Tool for F
where
    F: Send + Sync + Fn(Value) -> Fut,
    Fut: Future<Output = ToolResult<Value>> + Send,
{
    async fn invoke(&self, input: Value) -> ToolResult<Value> {
        (self)(input).await
    }
}

/// Handle returned by the registry for direct invocation.
#[derive(Clone)]
pub struct ToolHandle {
    metadata: ToolMetadata,
    contract: Arc<ToolContract>,
    executor: Arc<dyn Tool>,
}

impl std::fmt::Debug for ToolHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolHandle")
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

impl ToolHandle {
    /// Returns the associated metadata.
    #[must_use]
    pub fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    /// Checks `input` against the request schema.
    ///
    /// Returns one message per violation; empty when the input conforms or
    /// the tool declares no request schema.
    #[must_use]
    pub fn check_request(&self, input: &Value) -> Vec<String> {
        schema_issues(self.contract.request.as_ref(), input)
    }

    /// Checks `output` against the response schema.
    #[must_use]
    pub fn check_response(&self, output: &Value) -> Vec<String> {
        schema_issues(self.contract.response.as_ref(), output)
    }

    /// Executes the underlying tool implementation.
    ///
    /// Schemas are not enforced here; see [`Self::check_request`] and
    /// [`Self::check_response`].
    ///
    /// # Errors
    ///
    /// Propagates any [`ToolError::Execution`] returned by the underlying
    /// implementation.
    pub async fn invoke(&self, input: Value) -> ToolResult<Value> {
        self.executor.invoke(input).await
    }
}

/// Registry that stores tool implementations keyed by tool identifier.
#[derive(Default)]
pub struct ToolRegistry {
    inner: RwLock<HashMap<String, ToolHandle>>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read().expect("tool registry poisoned");
        let mut ids: Vec<_> = inner.keys().cloned().collect();
        ids.sort();
        f.debug_struct("ToolRegistry")
            .field("registered", &ids)
            .finish()
    }
}

impl ToolRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool implementation.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::DuplicateTool`] if the identifier is already
    /// present, or [`ToolError::InvalidMetadata`] if a declared schema does
    /// not compile.
    ///
    /// # Panics
    ///
    /// Panics if the internal registry lock is poisoned.
    pub fn register_tool<T>(&self, metadata: ToolMetadata, tool: T) -> ToolResult<()>
    where
        T: Tool + 'static,
    {
        let contract = ToolContract::compile(&metadata)?;
        let mut inner = self.inner.write().expect("tool registry poisoned");
        let tool_id = metadata.tool_id().as_str().to_owned();
        if inner.contains_key(&tool_id) {
            return Err(ToolError::DuplicateTool { tool_id });
        }

        debug!(tool_id = %tool_id, version = metadata.version(), "tool registered");
        inner.insert(
            tool_id,
            ToolHandle {
                metadata,
                contract: Arc::new(contract),
                executor: Arc::new(tool),
            },
        );

        Ok(())
    }

    /// Returns a handle to the tool matching the supplied identifier.
    #[must_use]
    pub fn get(&self, tool_id: &str) -> Option<ToolHandle> {
        let inner = self.inner.read().ok()?;
        inner.get(tool_id).cloned()
    }

    /// Returns `true` when a tool is registered under the identifier.
    #[must_use]
    pub fn contains(&self, tool_id: &str) -> bool {
        self.get(tool_id).is_some()
    }

    /// Invokes a registered tool directly.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::UnknownTool`] when the tool is not found or
    /// propagates [`ToolError::Execution`] when the implementation fails.
    pub async fn invoke(&self, tool_id: &str, input: Value) -> ToolResult<Value> {
        let handle = self.get(tool_id).ok_or_else(|| ToolError::UnknownTool {
            tool_id: tool_id.to_owned(),
        })?;
        handle.invoke(input).await
    }

    /// Lists the metadata of all registered tools ordered by identifier.
    ///
    /// # Panics
    ///
    /// Panics if the internal registry lock is poisoned.
    #[must_use]
    pub fn list(&self) -> Vec<ToolMetadata> {
        let inner = self.inner.read().expect("tool registry poisoned");
        let mut tools: Vec<_> = inner
            .values()
            .map(|handle| handle.metadata.clone())
            .collect();
        tools.sort_by(|a, b| a.tool_id.cmp(&b.tool_id));
        tools
    }
}

/// Errors produced by tool registration and invocation.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Tool metadata failed validation.
    #[error("invalid tool metadata: {reason}")]
    InvalidMetadata {
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// Tool identifier collided with an existing registration.
    #[error("tool `{tool_id}` is already registered")]
    DuplicateTool {
        /// Identifier of the offending tool.
        tool_id: String,
    },

    /// Requested tool does not exist.
    #[error("tool `{tool_id}` is not registered")]
    UnknownTool {
        /// Identifier of the missing tool.
        tool_id: String,
    },

    /// Tool execution failed.
    #[error("tool execution failed: {reason}")]
    Execution {
        /// Human-readable error returned by the tool implementation.
        reason: String,
    },
}

impl ToolError {
    /// Creates an execution error from the supplied reason.
    #[must_use]
    pub fn execution(reason: impl Into<String>) -> Self {
        Self::Execution {
            reason: reason.into(),
        }
    }
}
