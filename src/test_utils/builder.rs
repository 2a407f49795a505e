//! Fluent builder for template documents in tests.

use serde_json::{Map, Value, json};

use crate::template::Template;

/// Builds a template document one resource at a time.
///
/// ```rust,no_run
/// use stacksplit::test_utils::TemplateBuilder;
///
/// let template = TemplateBuilder::new()
///     .resource("Role", "AWS::IAM::Role")
///     .resource("Fn", "AWS::Lambda::Function")
///     .with_get_att("Fn", "Role", "Role", "Arn")
///     .build();
/// assert_eq!(template.resources().len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TemplateBuilder {
    description: Option<String>,
    resources: Map<String, Value>,
    parameters: Map<String, Value>,
    conditions: Map<String, Value>,
    outputs: Map<String, Value>,
}

impl TemplateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Add a resource with no properties.
    pub fn resource(mut self, id: &str, resource_type: &str) -> Self {
        self.resources.insert(id.to_string(), json!({ "Type": resource_type }));
        self
    }

    /// Add `count` resources of one type named `<prefix>1..=count`.
    pub fn resources(mut self, prefix: &str, resource_type: &str, count: usize) -> Self {
        for i in 1..=count {
            self = self.resource(&format!("{prefix}{i}"), resource_type);
        }
        self
    }

    /// Set `Properties.<property>` of `id` to an arbitrary value.
    pub fn property(mut self, id: &str, property: &str, value: Value) -> Self {
        let resource = self.resource_mut(id);
        let properties = resource
            .entry("Properties")
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(properties) = properties {
            properties.insert(property.to_string(), value);
        }
        self
    }

    /// `Properties.<property>: { Ref: target }`.
    pub fn with_ref(self, id: &str, property: &str, target: &str) -> Self {
        self.property(id, property, json!({ "Ref": target }))
    }

    /// `Properties.<property>: { Fn::GetAtt: [target, attribute] }`.
    pub fn with_get_att(self, id: &str, property: &str, target: &str, attribute: &str) -> Self {
        self.property(id, property, json!({ "Fn::GetAtt": [target, attribute] }))
    }

    /// Append `target` to the resource's `DependsOn` list.
    pub fn depends_on(mut self, id: &str, target: &str) -> Self {
        let resource = self.resource_mut(id);
        let entry = resource.entry("DependsOn").or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(items) = entry {
            items.push(Value::String(target.to_string()));
        }
        self
    }

    /// Gate a resource on a condition, declaring the condition if needed.
    pub fn condition(mut self, id: &str, condition: &str) -> Self {
        self.conditions
            .entry(condition.to_string())
            .or_insert_with(|| json!({ "Fn::Equals": ["a", "a"] }));
        self.resource_mut(id).insert("Condition".into(), Value::String(condition.to_string()));
        self
    }

    pub fn parameter(mut self, name: &str, parameter_type: &str) -> Self {
        self.parameters.insert(name.to_string(), json!({ "Type": parameter_type }));
        self
    }

    pub fn output(mut self, name: &str, value: Value) -> Self {
        self.outputs.insert(name.to_string(), json!({ "Value": value }));
        self
    }

    fn resource_mut(&mut self, id: &str) -> &mut Map<String, Value> {
        self.resources
            .entry(id.to_string())
            .or_insert_with(|| json!({ "Type": "AWS::CloudFormation::WaitConditionHandle" }))
            .as_object_mut()
            .expect("builder resources are always mappings")
    }

    /// The document as a JSON value.
    pub fn to_value(&self) -> Value {
        let mut document = Map::new();
        document.insert("AWSTemplateFormatVersion".into(), json!("2010-09-09"));
        if let Some(description) = &self.description {
            document.insert("Description".into(), json!(description));
        }
        if !self.parameters.is_empty() {
            document.insert("Parameters".into(), Value::Object(self.parameters.clone()));
        }
        if !self.conditions.is_empty() {
            document.insert("Conditions".into(), Value::Object(self.conditions.clone()));
        }
        document.insert("Resources".into(), Value::Object(self.resources.clone()));
        if !self.outputs.is_empty() {
            document.insert("Outputs".into(), Value::Object(self.outputs.clone()));
        }
        Value::Object(document)
    }

    /// Parse the document; panics on an invalid one.
    pub fn build(&self) -> Template {
        Template::from_value(self.to_value()).expect("builder produced an invalid template")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_produces_references() {
        let template = TemplateBuilder::new()
            .parameter("Env", "String")
            .resource("Vpc", "AWS::EC2::VPC")
            .resource("Subnet", "AWS::EC2::Subnet")
            .with_ref("Subnet", "VpcId", "Vpc")
            .depends_on("Subnet", "Vpc")
            .condition("Subnet", "IsProd")
            .output("SubnetId", json!({ "Ref": "Subnet" }))
            .build();

        let subnet = template.resource("Subnet").unwrap();
        assert_eq!(subnet.depends_on, vec!["Vpc".to_string()]);
        assert_eq!(subnet.condition.as_deref(), Some("IsProd"));
        assert!(template.parameters().unwrap().contains_key("Env"));
        assert!(template.conditions().unwrap().contains_key("IsProd"));
        assert_eq!(template.outputs().unwrap().len(), 1);
    }

    #[test]
    fn test_bulk_resources() {
        let template = TemplateBuilder::new().resources("Queue", "AWS::SQS::Queue", 3).build();
        let ids: Vec<&str> =
            template.resources().iter().map(|r| r.logical_id.as_str()).collect();
        assert_eq!(ids, vec!["Queue1", "Queue2", "Queue3"]);
    }
}
