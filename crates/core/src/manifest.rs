//! Tool manifest emitted by the installer.
//!
//! The installer prints a JSON object mapping each tool name to the list of
//! installed instances of that tool:
//!
//! ```json
//! {
//!   "maven": [{
//!     "primaryExecutable": "/tools/maven/bin/mvn",
//!     "environmentVariables": { "MAVEN_HOME": "/tools/maven" },
//!     "pathElements": ["/tools/maven/bin"],
//!     "unhandledProjectResources": { "userSettingsFile": "/etc/settings.xml" }
//!   }]
//! }
//! ```
//!
//! Document order is preserved for both tool names and variables, so that
//! composing the same manifest twice yields the same result.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::{Error, Result};

/// One installed tool instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolRecord {
    /// Main executable of the tool, if the installer designates one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_executable: Option<PathBuf>,
    /// Variables to export verbatim.
    pub environment_variables: IndexMap<String, String>,
    /// Directories to put on `PATH`, highest precedence first.
    pub path_elements: Vec<String>,
    /// Resources the installer could not apply itself.
    #[serde(
        default,
        rename = "unhandledProjectResources",
        skip_serializing_if = "IndexMap::is_empty"
    )]
    pub unhandled_resources: IndexMap<String, String>,
}

/// Decoded installer output: tool name to its installed instances.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolManifest {
    tools: IndexMap<String, Vec<ToolRecord>>,
}

impl ToolManifest {
    /// Decode the installer's stdout.
    ///
    /// Optional fields default to empty, but a document that does not have the
    /// manifest's shape is rejected rather than treated as empty.
    pub fn parse(json: &str) -> Result<Self> {
        let deserializer = &mut serde_json::Deserializer::from_str(json);
        serde_path_to_error::deserialize(deserializer).map_err(|e| {
            let path = e.path().to_string();
            let inner = e.into_inner();
            if path == "." {
                Error::manifest_parse(inner.to_string())
            } else {
                Error::manifest_parse(format!("at {path}: {inner}"))
            }
        })
    }

    /// Iterate tools in document order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ToolRecord])> {
        self.tools
            .iter()
            .map(|(name, records)| (name.as_str(), records.as_slice()))
    }

    /// Records installed for a tool.
    #[must_use]
    pub fn get(&self, tool: &str) -> Option<&[ToolRecord]> {
        self.tools.get(tool).map(Vec::as_slice)
    }

    /// Number of tools in the manifest.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the installer reported no tools.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl FromIterator<(String, Vec<ToolRecord>)> for ToolManifest {
    fn from_iter<T: IntoIterator<Item = (String, Vec<ToolRecord>)>>(iter: T) -> Self {
        Self {
            tools: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_record() {
        let manifest = ToolManifest::parse(
            r#"{
                "maven": [{
                    "primaryExecutable": "/tools/maven/bin/mvn",
                    "environmentVariables": {"MAVEN_HOME": "/tools/maven"},
                    "pathElements": ["/tools/maven/bin"],
                    "unhandledProjectResources": {"userSettingsFile": "/etc/settings.xml"}
                }]
            }"#,
        )
        .unwrap();

        let records = manifest.get("maven").unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(
            record.primary_executable,
            Some(PathBuf::from("/tools/maven/bin/mvn"))
        );
        assert_eq!(record.environment_variables["MAVEN_HOME"], "/tools/maven");
        assert_eq!(record.path_elements, vec!["/tools/maven/bin"]);
        assert_eq!(
            record.unhandled_resources["userSettingsFile"],
            "/etc/settings.xml"
        );
    }

    #[test]
    fn test_optional_fields_default_to_empty() {
        let manifest = ToolManifest::parse(
            r#"{"jdk": [{"environmentVariables": {}, "pathElements": ["/jdk/bin"]}]}"#,
        )
        .unwrap();

        let record = &manifest.get("jdk").unwrap()[0];
        assert!(record.primary_executable.is_none());
        assert!(record.unhandled_resources.is_empty());
    }

    #[test]
    fn test_preserves_document_order() {
        let manifest = ToolManifest::parse(
            r#"{
                "nodejs": [{"environmentVariables": {}, "pathElements": []}],
                "jdk": [{"environmentVariables": {}, "pathElements": []}],
                "maven": [{"environmentVariables": {}, "pathElements": []}]
            }"#,
        )
        .unwrap();

        let names: Vec<_> = manifest.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["nodejs", "jdk", "maven"]);
    }

    #[test]
    fn test_empty_manifest() {
        let manifest = ToolManifest::parse("{}").unwrap();
        assert!(manifest.is_empty());
    }

    #[test]
    fn test_rejects_malformed_json() {
        let err = ToolManifest::parse("{not json").unwrap_err();
        assert!(matches!(err, Error::ManifestParse { .. }));
    }

    #[test]
    fn test_rejects_wrong_shape() {
        let err = ToolManifest::parse(r#"{"maven": {"pathElements": []}}"#).unwrap_err();
        assert!(matches!(err, Error::ManifestParse { .. }));
        assert!(err.to_string().contains("maven"), "{err}");
    }

    #[test]
    fn test_rejects_missing_required_field() {
        let err =
            ToolManifest::parse(r#"{"maven": [{"environmentVariables": {}}]}"#).unwrap_err();
        assert!(err.to_string().contains("pathElements"), "{err}");
    }

    #[test]
    fn test_rejects_empty_document() {
        assert!(ToolManifest::parse("").is_err());
    }
}
