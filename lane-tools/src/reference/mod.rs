//! Reference tools shipped with the lane.

pub mod fetch_object_storage;
pub mod record_run_summary;

use async_trait::async_trait;
use lane_primitives::{CatalogEntry, ExecutionLane, ToolCatalog, ToolId};
use serde::Serialize;
use serde_json::{Value, json};

use crate::registry::{Tool, ToolError, ToolMetadata, ToolRegistry, ToolResult};

/// Version shared by the reference tools.
pub const REFERENCE_TOOL_VERSION: &str = "1.0.0";

/// Identifier of the catalog returned by [`reference_catalog`].
pub const REFERENCE_CATALOG_ID: &str = "reference-tools";

/// [`Tool`] wrapper around [`fetch_object_storage::run`].
#[derive(Debug, Default, Clone, Copy)]
pub struct FetchObjectStorage;

#[async_trait]
impl Tool for FetchObjectStorage {
    async fn invoke(&self, input: Value) -> ToolResult<Value> {
        to_output(&fetch_object_storage::run(&input))
    }
}

/// [`Tool`] wrapper around [`record_run_summary::run`].
#[derive(Debug, Default, Clone, Copy)]
pub struct RecordRunSummary;

#[async_trait]
impl Tool for RecordRunSummary {
    async fn invoke(&self, input: Value) -> ToolResult<Value> {
        to_output(&record_run_summary::run(&input))
    }
}

fn to_output<T: Serialize>(output: &T) -> ToolResult<Value> {
    serde_json::to_value(output).map_err(|err| ToolError::execution(err.to_string()))
}

/// Registers both reference tools with the supplied registry.
///
/// # Errors
///
/// Returns [`ToolError::DuplicateTool`] if either identifier is already taken.
/// Both tools carry request and response schemas.
pub fn register_reference_tools(registry: &ToolRegistry) -> ToolResult<()> {
    registry.register_tool(
        ToolMetadata::new(fetch_object_storage::TOOL_ID, REFERENCE_TOOL_VERSION)?
            .with_description("Resolve an object storage asset to a URI")
            .with_execution_lane(ExecutionLane::Python)
            .with_request_schema(fetch_object_storage::request_schema())
            .with_response_schema(fetch_object_storage::response_schema()),
        FetchObjectStorage,
    )?;
    registry.register_tool(
        ToolMetadata::new(record_run_summary::TOOL_ID, REFERENCE_TOOL_VERSION)?
            .with_description("Record the summary of a completed run")
            .with_execution_lane(ExecutionLane::Python)
            .with_request_schema(record_run_summary::request_schema())
            .with_response_schema(record_run_summary::response_schema()),
        RecordRunSummary,
    )?;
    Ok(())
}

/// Describes the reference tools, including a worked request/response pair
/// for each.
///
/// # Errors
///
/// Returns [`lane_primitives::Error`] if the static catalog data fails
/// validation.
pub fn reference_catalog() -> lane_primitives::Result<ToolCatalog> {
    let fetch = CatalogEntry::new(
        ToolId::new(fetch_object_storage::TOOL_ID)?,
        "Fetch object storage asset",
        REFERENCE_TOOL_VERSION,
        "tools/fetch_object_storage.py",
    )?
    .with_description("Returns a deterministic URI for the requested bucket and key.")
    .with_execution_lane(ExecutionLane::Python)
    .with_examples(
        json!({"bucket": "reports", "key": "2024/q1.parquet"}),
        json!({
            "uri": "s3://reports/2024/q1.parquet",
            "content_type": fetch_object_storage::CONTENT_TYPE,
        }),
    );

    let summary = CatalogEntry::new(
        ToolId::new(record_run_summary::TOOL_ID)?,
        "Record run summary",
        REFERENCE_TOOL_VERSION,
        "tools/record_run_summary.py",
    )?
    .with_description("Echoes the run summary payload for auditing.")
    .with_execution_lane(ExecutionLane::Python)
    .with_examples(
        json!({"summary": {"status": "completed", "steps": 4}}),
        json!({"recorded": true, "summary": {"status": "completed", "steps": 4}}),
    );

    ToolCatalog::builder(REFERENCE_CATALOG_ID)
        .name("Reference tools")?
        .version(REFERENCE_TOOL_VERSION)?
        .owner("governed-lane")?
        .timestamps("2024-01-01T00:00:00Z", "2024-01-01T00:00:00Z")
        .tool(fetch)
        .tool(summary)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn catalog_examples_match_tools() {
        let registry = ToolRegistry::new();
        register_reference_tools(&registry).unwrap();
        let catalog = reference_catalog().unwrap();

        for entry in catalog.tools() {
            let handle = registry.get(entry.tool_id().as_str()).unwrap();
            assert!(handle.check_request(entry.request_example()).is_empty());
            let output = handle.invoke(entry.request_example().clone()).await.unwrap();
            assert_eq!(&output, entry.response_example(), "{}", entry.tool_id());
            assert!(handle.check_response(&output).is_empty());
        }
    }

    #[test]
    fn catalog_and_registry_agree() {
        let registry = ToolRegistry::new();
        register_reference_tools(&registry).unwrap();
        let catalog = reference_catalog().unwrap();

        let registered: Vec<_> = registry
            .list()
            .into_iter()
            .map(|m| (m.tool_id().clone(), m.version().to_owned()))
            .collect();
        let listed: Vec<_> = catalog
            .tools()
            .iter()
            .map(|e| (e.tool_id().clone(), e.version().to_owned()))
            .collect();
        assert_eq!(registered, listed);
    }

    #[tokio::test]
    async fn reference_schemas_reject_mistyped_fields() {
        let registry = ToolRegistry::new();
        register_reference_tools(&registry).unwrap();

        let fetch = registry.get(fetch_object_storage::TOOL_ID).unwrap();
        assert!(fetch.check_request(&json!({})).is_empty());
        assert_eq!(fetch.check_request(&json!({"bucket": 42})).len(), 1);
        assert!(!fetch.check_response(&json!({"uri": "s3://b/k"})).is_empty());

        let summary = registry.get(record_run_summary::TOOL_ID).unwrap();
        assert!(summary.check_request(&json!({})).is_empty());
        assert_eq!(summary.check_request(&json!({"summary": "done"})).len(), 1);
        let output = summary.invoke(json!({})).await.unwrap();
        assert!(summary.check_response(&output).is_empty());
        assert!(!summary.check_response(&json!({"recorded": false, "summary": {}})).is_empty());
    }

    #[test]
    fn double_registration_fails() {
        let registry = ToolRegistry::new();
        register_reference_tools(&registry).unwrap();
        assert!(matches!(
            register_reference_tools(&registry),
            Err(ToolError::DuplicateTool { .. })
        ));
    }
}
