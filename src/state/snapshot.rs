//! Parser for full state snapshot documents.
//!
//! A snapshot is the tool's machine-readable description of every resource
//! it currently knows about. Parsing is pure: a structurally invalid
//! document fails with a [`SnapshotError`] and never yields a partial map.

use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::{Result, SnapshotError};

use super::types::{ResourceMode, ResourceRecord, ResourceStatus, Sensitive};

/// Serialized forms treated as absent rather than zero-valued.
pub const BLANK_ITEMS: [&str; 6] = ["[]", "", "null", "\"\"", "{}", "[{}]"];

/// Attribute key that carries the tool-reported resource status.
const INSTANCE_STATE_KEY: &str = "instance_state";

/// Parser for state snapshot documents.
#[derive(Debug, Default)]
pub struct SnapshotParser;

impl SnapshotParser {
    /// Creates a new snapshot parser.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Parses the managed resources out of a snapshot document.
    ///
    /// # Errors
    ///
    /// Returns a [`SnapshotError`] when the document is empty, not a JSON
    /// container, lacks the version marker, or the nested
    /// `values.root_module.resources` path is missing at any level.
    pub fn parse(&self, document: &str) -> Result<BTreeMap<String, ResourceRecord>> {
        self.parse_mode(document, ResourceMode::Managed)
    }

    /// Parses the data-sourced resources out of a snapshot document.
    ///
    /// Same algorithm as [`Self::parse`] with the mode filter flipped.
    ///
    /// # Errors
    ///
    /// Returns a [`SnapshotError`] under the same conditions as [`Self::parse`].
    pub fn parse_data_resources(&self, document: &str) -> Result<BTreeMap<String, ResourceRecord>> {
        self.parse_mode(document, ResourceMode::Data)
    }

    fn parse_mode(
        &self,
        document: &str,
        mode: ResourceMode,
    ) -> Result<BTreeMap<String, ResourceRecord>> {
        let root: Value = serde_json::from_str(document).map_err(|e| SnapshotError::Malformed {
            message: e.to_string(),
        })?;

        let Some(root_obj) = root.as_object() else {
            return Err(SnapshotError::invalid("document is not a container").into());
        };
        if root_obj.is_empty() {
            return Err(SnapshotError::invalid("document is empty").into());
        }
        if !root_obj.contains_key("terraform_version") {
            return Err(SnapshotError::invalid("no version marker present").into());
        }

        let values = root_obj
            .get("values")
            .ok_or_else(|| SnapshotError::missing_node("values"))?;
        let root_module = values
            .get("root_module")
            .ok_or_else(|| SnapshotError::missing_node("values.root_module"))?;
        let resources = root_module
            .get("resources")
            .ok_or_else(|| SnapshotError::missing_node("values.root_module.resources"))?;
        let resources = resources
            .as_array()
            .ok_or_else(|| SnapshotError::invalid("'resources' is not a list"))?;

        let mode_name = match mode {
            ResourceMode::Managed => "managed",
            ResourceMode::Data => "data",
        };

        let mut result = BTreeMap::new();
        for resource in resources {
            if resource.get("mode").and_then(Value::as_str) != Some(mode_name) {
                continue;
            }
            let record = Self::parse_resource(resource, mode)?;
            result.insert(record.address.clone(), record);
        }

        debug!("Parsed {} {} resources from snapshot", result.len(), mode_name);
        Ok(result)
    }

    fn parse_resource(resource: &Value, mode: ResourceMode) -> Result<ResourceRecord> {
        let address = required_str(resource, "address")?;
        let resource_type = required_str(resource, "type")?;
        let name = required_str(resource, "name")?;
        let provider = required_str(resource, "provider_name")?;

        let mut record = ResourceRecord::new(address, mode, resource_type, name, provider);

        if let Some(values) = resource.get("values").and_then(Value::as_object) {
            for (key, value) in values {
                if is_blank(value) {
                    continue;
                }
                if key.eq_ignore_ascii_case(INSTANCE_STATE_KEY)
                    && let Some(raw) = value.as_str()
                {
                    record.status = ResourceStatus::from(raw);
                }
                record.values.insert(key.clone(), value.clone());
            }
        }

        if let Some(sensitive) = resource.get("sensitive_values").and_then(Value::as_object) {
            for (key, value) in sensitive {
                if is_blank(value) {
                    continue;
                }
                record
                    .sensitive_values
                    .insert(key.clone(), Sensitive::new(value.clone()));
            }
        }

        Ok(record)
    }
}

fn required_str<'a>(resource: &'a Value, field: &str) -> Result<&'a str> {
    resource
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| {
            SnapshotError::MissingField {
                field: field.to_string(),
            }
            .into()
        })
}

/// Returns true when the value's serialized form is one of the blank
/// sentinels and should be treated as absent.
fn is_blank(value: &Value) -> bool {
    if value.is_null() {
        return true;
    }
    let serialized = value.to_string();
    BLANK_ITEMS.contains(&serialized.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TerradriftError;
    use serde_json::json;

    fn sample_state() -> String {
        json!({
            "format_version": "1.0",
            "terraform_version": "1.5.7",
            "values": {
                "root_module": {
                    "resources": [
                        {
                            "address": "aws_instance.web",
                            "mode": "managed",
                            "type": "aws_instance",
                            "name": "web",
                            "provider_name": "registry.terraform.io/hashicorp/aws",
                            "values": {
                                "ami": "ami-0c02fb55956c7d316",
                                "instance_state": "running",
                                "tags": {},
                                "user_data": null,
                                "security_groups": []
                            },
                            "sensitive_values": {
                                "private_key": "-----BEGIN RSA-----",
                                "credentials": {}
                            }
                        },
                        {
                            "address": "data.aws_ami.ubuntu",
                            "mode": "data",
                            "type": "aws_ami",
                            "name": "ubuntu",
                            "provider_name": "registry.terraform.io/hashicorp/aws",
                            "values": {"id": "ami-1234"}
                        }
                    ]
                }
            }
        })
        .to_string()
    }

    #[test]
    fn test_parse_emits_managed_only() {
        let parser = SnapshotParser::new();
        let resources = parser.parse(&sample_state()).unwrap();

        assert_eq!(resources.len(), 1);
        let record = &resources["aws_instance.web"];
        assert_eq!(record.mode, ResourceMode::Managed);
        assert_eq!(record.resource_type, "aws_instance");
        assert_eq!(record.name, "web");
        assert_eq!(record.provider, "registry.terraform.io/hashicorp/aws");
    }

    #[test]
    fn test_parse_data_resources_flips_the_filter() {
        let parser = SnapshotParser::new();
        let resources = parser.parse_data_resources(&sample_state()).unwrap();

        assert_eq!(resources.len(), 1);
        assert!(resources.contains_key("data.aws_ami.ubuntu"));
    }

    #[test]
    fn test_blank_values_are_suppressed() {
        let parser = SnapshotParser::new();
        let resources = parser.parse(&sample_state()).unwrap();
        let record = &resources["aws_instance.web"];

        assert!(record.values.contains_key("ami"));
        assert!(!record.values.contains_key("tags"));
        assert!(!record.values.contains_key("user_data"));
        assert!(!record.values.contains_key("security_groups"));
        assert!(record.sensitive_values.contains_key("private_key"));
        assert!(!record.sensitive_values.contains_key("credentials"));
    }

    #[test]
    fn test_every_blank_sentinel_is_suppressed() {
        let doc = json!({
            "terraform_version": "1.5.7",
            "values": {"root_module": {"resources": [{
                "address": "null_resource.blanks",
                "mode": "managed",
                "type": "null_resource",
                "name": "blanks",
                "provider_name": "null",
                "values": {
                    "empty_list": [],
                    "empty_string": "",
                    "empty_object": {},
                    "null_value": null,
                    "list_of_empty_object": [{}],
                    "kept": "value"
                }
            }]}}
        })
        .to_string();

        let parser = SnapshotParser::new();
        let resources = parser.parse(&doc).unwrap();
        let record = &resources["null_resource.blanks"];

        assert_eq!(record.values.len(), 1);
        assert!(record.values.contains_key("kept"));
    }

    #[test]
    fn test_instance_state_populates_status() {
        let parser = SnapshotParser::new();
        let resources = parser.parse(&sample_state()).unwrap();
        assert_eq!(
            resources["aws_instance.web"].status,
            ResourceStatus::Running
        );
    }

    #[test]
    fn test_status_defaults_when_not_reported() {
        let doc = json!({
            "terraform_version": "1.5.7",
            "values": {"root_module": {"resources": [{
                "address": "aws_s3_bucket.logs",
                "mode": "managed",
                "type": "aws_s3_bucket",
                "name": "logs",
                "provider_name": "aws",
                "values": {"bucket": "logs"}
            }]}}
        })
        .to_string();

        let parser = SnapshotParser::new();
        let resources = parser.parse(&doc).unwrap();
        assert_eq!(resources["aws_s3_bucket.logs"].status, ResourceStatus::Ok);
    }

    #[test]
    fn test_missing_resources_node_fails() {
        let doc = json!({
            "terraform_version": "1.5.7",
            "values": {"root_module": {}}
        })
        .to_string();

        let parser = SnapshotParser::new();
        let err = parser.parse(&doc).unwrap_err();
        assert!(matches!(
            err,
            TerradriftError::Snapshot(SnapshotError::MissingNode { ref path })
                if path == "values.root_module.resources"
        ));
    }

    #[test]
    fn test_missing_values_node_fails() {
        let doc = json!({"terraform_version": "1.5.7"}).to_string();
        let parser = SnapshotParser::new();
        let err = parser.parse(&doc).unwrap_err();
        assert!(matches!(
            err,
            TerradriftError::Snapshot(SnapshotError::MissingNode { ref path }) if path == "values"
        ));
    }

    #[test]
    fn test_missing_version_marker_fails() {
        let doc = json!({"values": {}}).to_string();
        let parser = SnapshotParser::new();
        let err = parser.parse(&doc).unwrap_err();
        assert!(matches!(
            err,
            TerradriftError::Snapshot(SnapshotError::Invalid { .. })
        ));
    }

    #[test]
    fn test_empty_or_non_container_document_fails() {
        let parser = SnapshotParser::new();
        assert!(parser.parse("{}").is_err());
        assert!(parser.parse("42").is_err());
        assert!(parser.parse("not json at all").is_err());
    }
}
