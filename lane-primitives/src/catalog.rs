//! Tool catalog advertised to callers of the lane.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::ToolId;

/// Execution lane a tool is expected to run in.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionLane {
    /// Governed Python lane.
    #[default]
    Python,
}

/// Describes a single tool listed in a [`ToolCatalog`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    tool_id: ToolId,
    name: String,
    #[serde(default)]
    description: String,
    version: String,
    #[serde(default)]
    execution_lane: ExecutionLane,
    entrypoint: String,
    #[serde(default)]
    request_example: Value,
    #[serde(default)]
    response_example: Value,
}

impl CatalogEntry {
    /// Creates an entry for the supplied tool.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCatalog`] when the name, version, or entrypoint
    /// is empty.
    pub fn new(
        tool_id: ToolId,
        name: impl Into<String>,
        version: impl Into<String>,
        entrypoint: impl Into<String>,
    ) -> Result<Self> {
        let name = non_empty("entry name", name.into())?;
        let version = non_empty("entry version", version.into())?;
        let entrypoint = non_empty("entry entrypoint", entrypoint.into())?;
        Ok(Self {
            tool_id,
            name,
            description: String::new(),
            version,
            execution_lane: ExecutionLane::default(),
            entrypoint,
            request_example: Value::Null,
            response_example: Value::Null,
        })
    }

    /// Sets the human-readable description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the execution lane.
    #[must_use]
    pub fn with_execution_lane(mut self, lane: ExecutionLane) -> Self {
        self.execution_lane = lane;
        self
    }

    /// Attaches a sample request and the response the tool produces for it.
    #[must_use]
    pub fn with_examples(mut self, request: Value, response: Value) -> Self {
        self.request_example = request;
        self.response_example = response;
        self
    }

    /// Returns the tool identifier.
    #[must_use]
    pub fn tool_id(&self) -> &ToolId {
        &self.tool_id
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the description, empty when none was provided.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the tool version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the execution lane.
    #[must_use]
    pub fn execution_lane(&self) -> ExecutionLane {
        self.execution_lane
    }

    /// Returns the entrypoint path of the tool implementation.
    #[must_use]
    pub fn entrypoint(&self) -> &str {
        &self.entrypoint
    }

    /// Returns the sample request payload.
    #[must_use]
    pub fn request_example(&self) -> &Value {
        &self.request_example
    }

    /// Returns the response expected for [`Self::request_example`].
    #[must_use]
    pub fn response_example(&self) -> &Value {
        &self.response_example
    }
}

/// Versioned collection of tools published by an owner.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCatalog {
    catalog_id: String,
    name: String,
    version: String,
    owner: String,
    created_at: String,
    updated_at: String,
    #[serde(default)]
    tools: Vec<CatalogEntry>,
}

impl ToolCatalog {
    /// Starts building a [`ToolCatalog`].
    #[must_use]
    pub fn builder(catalog_id: impl Into<String>) -> ToolCatalogBuilder {
        ToolCatalogBuilder {
            catalog_id: catalog_id.into(),
            name: None,
            version: None,
            owner: None,
            created_at: None,
            updated_at: None,
            tools: Vec::new(),
        }
    }

    /// Returns the catalog identifier.
    #[must_use]
    pub fn catalog_id(&self) -> &str {
        &self.catalog_id
    }

    /// Returns the catalog display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the catalog version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the owning team or system.
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub fn created_at(&self) -> &str {
        &self.created_at
    }

    /// Returns the last update timestamp.
    #[must_use]
    pub fn updated_at(&self) -> &str {
        &self.updated_at
    }

    /// Returns the catalog entries.
    #[must_use]
    pub fn tools(&self) -> &[CatalogEntry] {
        &self.tools
    }

    /// Looks up an entry by tool identifier.
    #[must_use]
    pub fn entry(&self, tool_id: &str) -> Option<&CatalogEntry> {
        self.tools
            .iter()
            .find(|entry| entry.tool_id.as_str() == tool_id)
    }

    /// Checks invariants on a catalog obtained through deserialisation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCatalog`] when a required field is empty or a
    /// tool identifier appears more than once.
    pub fn validate(&self) -> Result<()> {
        for (label, value) in [
            ("catalog id", &self.catalog_id),
            ("catalog name", &self.name),
            ("catalog version", &self.version),
            ("catalog owner", &self.owner),
        ] {
            if value.trim().is_empty() {
                return Err(Error::InvalidCatalog {
                    reason: format!("{label} cannot be empty"),
                });
            }
        }
        ensure_unique(&self.tools)
    }
}

/// Builder for [`ToolCatalog`].
#[derive(Debug)]
pub struct ToolCatalogBuilder {
    catalog_id: String,
    name: Option<String>,
    version: Option<String>,
    owner: Option<String>,
    created_at: Option<String>,
    updated_at: Option<String>,
    tools: Vec<CatalogEntry>,
}

impl ToolCatalogBuilder {
    /// Sets the catalog display name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCatalog`] when the name is empty.
    pub fn name(mut self, name: impl Into<String>) -> Result<Self> {
        self.name = Some(non_empty("catalog name", name.into())?);
        Ok(self)
    }

    /// Sets the catalog version.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCatalog`] when the version string is empty.
    pub fn version(mut self, version: impl Into<String>) -> Result<Self> {
        self.version = Some(non_empty("catalog version", version.into())?);
        Ok(self)
    }

    /// Sets the owning team or system.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCatalog`] when the owner is empty.
    pub fn owner(mut self, owner: impl Into<String>) -> Result<Self> {
        self.owner = Some(non_empty("catalog owner", owner.into())?);
        Ok(self)
    }

    /// Sets the creation and update timestamps.
    #[must_use]
    pub fn timestamps(mut self, created_at: impl Into<String>, updated_at: impl Into<String>) -> Self {
        self.created_at = Some(created_at.into());
        self.updated_at = Some(updated_at.into());
        self
    }

    /// Adds an entry to the catalog.
    #[must_use]
    pub fn tool(mut self, entry: CatalogEntry) -> Self {
        self.tools.push(entry);
        self
    }

    /// Consumes the builder and returns the catalog.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCatalog`] if mandatory fields are missing or
    /// two entries share a tool identifier.
    pub fn build(self) -> Result<ToolCatalog> {
        let catalog_id = non_empty("catalog id", self.catalog_id)?;
        let name = self.name.ok_or_else(|| Error::InvalidCatalog {
            reason: "catalog name must be provided".into(),
        })?;
        let version = self.version.ok_or_else(|| Error::InvalidCatalog {
            reason: "catalog version must be provided".into(),
        })?;
        let owner = self.owner.ok_or_else(|| Error::InvalidCatalog {
            reason: "catalog owner must be provided".into(),
        })?;
        ensure_unique(&self.tools)?;

        let created_at = self.created_at.unwrap_or_default();
        let updated_at = self.updated_at.unwrap_or_else(|| created_at.clone());

        Ok(ToolCatalog {
            catalog_id,
            name,
            version,
            owner,
            created_at,
            updated_at,
            tools: self.tools,
        })
    }
}

fn non_empty(label: &str, value: String) -> Result<String> {
    if value.trim().is_empty() {
        return Err(Error::InvalidCatalog {
            reason: format!("{label} cannot be empty"),
        });
    }
    Ok(value)
}

fn ensure_unique(tools: &[CatalogEntry]) -> Result<()> {
    let mut seen = BTreeSet::new();
    for entry in tools {
        if !seen.insert(entry.tool_id.as_str()) {
            return Err(Error::InvalidCatalog {
                reason: format!("tool `{}` listed more than once", entry.tool_id),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    fn entry(id: &str) -> CatalogEntry {
        CatalogEntry::new(ToolId::new(id).unwrap(), "Echo", "1.0.0", "tools/echo.py")
            .unwrap()
            .with_description("Echo payload")
    }

    #[test]
    fn builds_catalog() {
        let catalog = ToolCatalog::builder("cat-1")
            .name("Reference")
            .unwrap()
            .version("1.0.0")
            .unwrap()
            .owner("platform")
            .unwrap()
            .timestamps("2024-01-01T00:00:00Z", "2024-02-01T00:00:00Z")
            .tool(entry("echo"))
            .build()
            .unwrap();

        assert_eq!(catalog.name(), "Reference");
        assert_eq!(catalog.tools().len(), 1);
        assert_eq!(catalog.entry("echo").map(CatalogEntry::name), Some("Echo"));
        assert!(catalog.entry("missing").is_none());
        catalog.validate().unwrap();
    }

    #[test]
    fn duplicate_tools_rejected() {
        let err = ToolCatalog::builder("cat-1")
            .name("Reference")
            .and_then(|b| b.version("1"))
            .and_then(|b| b.owner("platform"))
            .map(|b| b.tool(entry("echo")).tool(entry("echo")))
            .and_then(ToolCatalogBuilder::build)
            .expect_err("duplicate should fail");

        assert!(matches!(err, Error::InvalidCatalog { reason } if reason.contains("echo")));
    }

    #[test]
    fn name_is_required() {
        assert!(ToolCatalog::builder("cat-1").build().is_err());
    }

    #[test]
    fn deserialized_catalog_is_validated() {
        let catalog: ToolCatalog = serde_json::from_value(json!({
            "catalog_id": "cat-1",
            "name": "Reference",
            "version": "1.0.0",
            "owner": " ",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z",
            "tools": [{
                "tool_id": "echo",
                "name": "Echo",
                "version": "1.0.0",
                "execution_lane": "python",
                "entrypoint": "tools/echo.py"
            }]
        }))
        .unwrap();

        assert_eq!(catalog.tools()[0].execution_lane(), ExecutionLane::Python);
        assert!(catalog.validate().is_err());
    }
}
