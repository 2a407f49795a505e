//! Resolved template document model.
//!
//! The analysis pipeline consumes a fully resolved template: a plain tree of
//! mappings, sequences, and scalars with no unresolved macro syntax. This
//! module wraps that tree in a [`Template`] which validates the top-level
//! sections once, up front, so the rest of the pipeline can treat the
//! document as structurally sound.
//!
//! # Sections
//!
//! | Section      | Shape                                   | Required |
//! |--------------|-----------------------------------------|----------|
//! | `Resources`  | logical ID → `{Type, Properties?, ...}` | no (empty when missing) |
//! | `Parameters` | name → declaration                      | no |
//! | `Mappings`   | name → lookup table                     | no |
//! | `Conditions` | name → condition expression             | no |
//! | `Outputs`    | name → `{Value, Export?, Condition?}`   | no |
//!
//! Any of these present with a non-mapping value is rejected with
//! [`SplitError::InvalidSection`]; malformed resource entries are rejected
//! with [`SplitError::InvalidResource`].

pub mod io;
pub mod references;

use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::core::{Result, SplitError};

/// Name of the resources section.
pub const RESOURCES: &str = "Resources";
/// Name of the parameters section.
pub const PARAMETERS: &str = "Parameters";
/// Name of the mappings section.
pub const MAPPINGS: &str = "Mappings";
/// Name of the conditions section.
pub const CONDITIONS: &str = "Conditions";
/// Name of the outputs section.
pub const OUTPUTS: &str = "Outputs";

const MAPPING_SECTIONS: [&str; 5] = [RESOURCES, PARAMETERS, MAPPINGS, CONDITIONS, OUTPUTS];

/// One declared resource of a template.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    /// Logical ID, unique within the template.
    pub logical_id: String,
    /// Resource type string (e.g. `AWS::EC2::VPC`).
    pub resource_type: String,
    /// The `Properties` tree, when present.
    pub properties: Option<Value>,
    /// Explicit ordering hints from `DependsOn`, normalized to a list.
    pub depends_on: Vec<String>,
    /// Name of the condition gating this resource.
    pub condition: Option<String>,
    /// The full resource definition as written in the template.
    pub definition: Map<String, Value>,
}

/// A validated, fully resolved template document.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    document: Map<String, Value>,
    resources: Vec<Resource>,
    index: HashMap<String, usize>,
}

impl Template {
    /// Validate a resolved document and wrap it.
    ///
    /// # Errors
    ///
    /// Returns [`SplitError::InvalidSection`] when the root or a known
    /// top-level section is not a mapping, and [`SplitError::InvalidResource`]
    /// when a resource lacks a string `Type` or carries a malformed
    /// `DependsOn`/`Condition`.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(document) = value else {
            return Err(SplitError::InvalidSection {
                section: "<root>".to_string(),
                reason: format!("expected a mapping, found {}", value_kind(&value)),
            });
        };

        for section in MAPPING_SECTIONS {
            if let Some(found) = document.get(section)
                && !found.is_object()
            {
                return Err(SplitError::InvalidSection {
                    section: section.to_string(),
                    reason: format!("expected a mapping, found {}", value_kind(found)),
                });
            }
        }

        let mut resources = Vec::new();
        if let Some(Value::Object(declared)) = document.get(RESOURCES) {
            for (logical_id, definition) in declared {
                resources.push(parse_resource(logical_id, definition)?);
            }
        }

        let index = resources
            .iter()
            .enumerate()
            .map(|(i, resource)| (resource.logical_id.clone(), i))
            .collect();

        Ok(Self {
            document,
            resources,
            index,
        })
    }

    /// The full document, in source key order.
    pub fn document(&self) -> &Map<String, Value> {
        &self.document
    }

    /// Declared resources, in source order.
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    /// Look up a resource by logical ID.
    pub fn resource(&self, logical_id: &str) -> Option<&Resource> {
        self.index.get(logical_id).map(|&i| &self.resources[i])
    }

    /// Return a top-level mapping section.
    pub fn section(&self, name: &str) -> Option<&Map<String, Value>> {
        self.document.get(name).and_then(Value::as_object)
    }

    pub fn parameters(&self) -> Option<&Map<String, Value>> {
        self.section(PARAMETERS)
    }

    pub fn mappings(&self) -> Option<&Map<String, Value>> {
        self.section(MAPPINGS)
    }

    pub fn conditions(&self) -> Option<&Map<String, Value>> {
        self.section(CONDITIONS)
    }

    pub fn outputs(&self) -> Option<&Map<String, Value>> {
        self.section(OUTPUTS)
    }

    /// The template's `Description`, when it is a string.
    pub fn description(&self) -> Option<&str> {
        self.document.get("Description").and_then(Value::as_str)
    }

    /// Clone the document back into a plain value tree.
    pub fn to_value(&self) -> Value {
        Value::Object(self.document.clone())
    }
}

fn parse_resource(logical_id: &str, definition: &Value) -> Result<Resource> {
    let invalid = |reason: String| SplitError::InvalidResource {
        logical_id: logical_id.to_string(),
        reason,
    };

    let Value::Object(body) = definition else {
        return Err(invalid(format!("expected a mapping, found {}", value_kind(definition))));
    };

    let resource_type = match body.get("Type") {
        Some(Value::String(t)) => t.clone(),
        Some(other) => {
            return Err(invalid(format!("'Type' must be a string, found {}", value_kind(other))));
        }
        None => return Err(invalid("missing 'Type'".to_string())),
    };

    let depends_on = match body.get("DependsOn") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(name)) => vec![name.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    invalid(format!(
                        "'DependsOn' entries must be strings, found {}",
                        value_kind(item)
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?,
        Some(other) => {
            return Err(invalid(format!(
                "'DependsOn' must be a string or a list, found {}",
                value_kind(other)
            )));
        }
    };

    let condition = match body.get("Condition") {
        None | Some(Value::Null) => None,
        Some(Value::String(name)) => Some(name.clone()),
        Some(other) => {
            return Err(invalid(format!(
                "'Condition' must be a string, found {}",
                value_kind(other)
            )));
        }
    };

    Ok(Resource {
        logical_id: logical_id.to_string(),
        resource_type,
        properties: body.get("Properties").cloned(),
        depends_on,
        condition,
        definition: body.clone(),
    })
}

/// Short human-readable name of a value's shape, for error messages.
pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parses_resources_in_order() {
        let template = Template::from_value(json!({
            "Resources": {
                "Vpc": { "Type": "AWS::EC2::VPC" },
                "Subnet": {
                    "Type": "AWS::EC2::Subnet",
                    "DependsOn": "Vpc",
                    "Condition": "IsProd",
                    "Properties": { "VpcId": { "Ref": "Vpc" } }
                }
            }
        }))
        .unwrap();

        let ids: Vec<_> = template.resources().iter().map(|r| r.logical_id.as_str()).collect();
        assert_eq!(ids, vec!["Vpc", "Subnet"]);

        let subnet = template.resource("Subnet").unwrap();
        assert_eq!(subnet.depends_on, vec!["Vpc".to_string()]);
        assert_eq!(subnet.condition.as_deref(), Some("IsProd"));
        assert!(subnet.properties.is_some());
    }

    #[test]
    fn test_missing_resources_is_empty() {
        let template = Template::from_value(json!({ "Description": "empty" })).unwrap();
        assert!(template.resources().is_empty());
        assert_eq!(template.description(), Some("empty"));
    }

    #[test]
    fn test_non_mapping_resources_names_section() {
        let err = Template::from_value(json!({ "Resources": ["a", "b"] })).unwrap_err();
        match err {
            SplitError::InvalidSection {
                section,
                ..
            } => assert_eq!(section, "Resources"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_non_mapping_outputs_names_section() {
        let err = Template::from_value(json!({ "Resources": {}, "Outputs": "nope" })).unwrap_err();
        assert!(err.to_string().contains("'Outputs'"));
    }

    #[test]
    fn test_root_must_be_mapping() {
        let err = Template::from_value(json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, SplitError::InvalidSection { .. }));
    }

    #[test]
    fn test_resource_without_type() {
        let err = Template::from_value(json!({
            "Resources": { "Bucket": { "Properties": {} } }
        }))
        .unwrap_err();
        match err {
            SplitError::InvalidResource {
                logical_id,
                reason,
            } => {
                assert_eq!(logical_id, "Bucket");
                assert!(reason.contains("Type"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_depends_on_list_with_non_string() {
        let err = Template::from_value(json!({
            "Resources": { "Bucket": { "Type": "AWS::S3::Bucket", "DependsOn": ["A", 3] } }
        }))
        .unwrap_err();
        assert!(err.to_string().contains("DependsOn"));
    }
}
