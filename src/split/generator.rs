//! Materialize a split suggestion as child templates plus a parent stack.
//!
//! Each child carries its own resources, the parameters, mappings, and
//! conditions they actually use, and an export for every value another child
//! imports. The parent declares one nested stack per child in deployment
//! order, forwards the original parameters, and encodes the ordering with
//! `DependsOn`.

use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

use super::exports::{ExportKey, ReferenceRewriter, export_name};
use super::model::{SplitOption, SplitSuggestion};
use crate::constants::{
    NESTED_STACK_TYPE, PARENT_STACK_NAME, TEMPLATE_BASE_URL_PARAMETER, TEMPLATE_FORMAT_VERSION,
};
use crate::core::{Result, SplitError};
use crate::graph::DependencyGraph;
use crate::template::io::TemplateFormat;
use crate::template::references::{TemplateReference, collect_references};
use crate::template::{CONDITIONS, MAPPINGS, OUTPUTS, PARAMETERS, RESOURCES, Template};

/// Options of [`generate_split`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateOptions {
    pub generate_parent: bool,
    /// Leading component of every export name; empty for none.
    pub stack_name_prefix: String,
    /// Serialization the host will write; decides the parent's template URLs.
    pub format: TemplateFormat,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            generate_parent: true,
            stack_name_prefix: String::new(),
            format: TemplateFormat::default(),
        }
    }
}

/// One generated template document.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedStack {
    pub name: String,
    pub template: Value,
}

impl GeneratedStack {
    pub fn file_name(&self, format: TemplateFormat) -> String {
        format!("{}.{}", self.name, format.extension())
    }
}

/// Child stacks in deployment order, plus the optional parent.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitOutput {
    pub child_stacks: Vec<GeneratedStack>,
    pub parent_stack: Option<GeneratedStack>,
}

impl SplitOutput {
    pub fn child(&self, name: &str) -> Option<&GeneratedStack> {
        self.child_stacks.iter().find(|stack| stack.name == name)
    }

    /// Children first, then the parent.
    pub fn stacks(&self) -> impl Iterator<Item = &GeneratedStack> {
        self.child_stacks.iter().chain(self.parent_stack.iter())
    }
}

/// Content of one child while it is being assembled.
#[derive(Default)]
struct ChildDraft {
    resources: Map<String, Value>,
    outputs: Map<String, Value>,
    /// Stacks this child must deploy after.
    prerequisites: BTreeSet<String>,
}

/// Build child templates (and a parent) for the recommended option.
///
/// # Errors
///
/// Returns [`SplitError::InvalidOptions`] when the option's clusters do not
/// partition the template's resources.
pub fn generate_split(
    template: &Template,
    graph: &DependencyGraph,
    suggestion: &SplitSuggestion,
    options: &GenerateOptions,
) -> Result<SplitOutput> {
    let option = &suggestion.recommended;
    let owner = resource_owners(template, graph, option)?;
    let stack_order = stack_order(option);

    let mut drafts: BTreeMap<&str, ChildDraft> =
        stack_order.iter().map(|name| (name.as_str(), ChildDraft::default())).collect();
    let mut exports: BTreeMap<String, BTreeSet<ExportKey>> = BTreeMap::new();

    for name in &stack_order {
        let mut rewriter = ReferenceRewriter::new(name, &owner, &options.stack_name_prefix);
        let mut resources = Map::new();
        let mut prerequisites = BTreeSet::new();

        for resource in template.resources() {
            if owner.get(&resource.logical_id) != Some(name) {
                continue;
            }
            let mut definition = Map::new();
            for (key, value) in &resource.definition {
                match key.as_str() {
                    "Type" | "Condition" => {
                        definition.insert(key.clone(), value.clone());
                    }
                    "DependsOn" => {
                        let (local, foreign): (Vec<&String>, Vec<&String>) = resource
                            .depends_on
                            .iter()
                            .partition(|target| !rewriter.is_foreign(target));
                        for target in foreign {
                            if let Some(stack) = owner.get(target.as_str()) {
                                prerequisites.insert(stack.clone());
                            }
                        }
                        match (value, local.as_slice()) {
                            (_, []) => {}
                            (Value::String(_), [only]) => {
                                definition.insert(key.clone(), json!(only));
                            }
                            _ => {
                                definition.insert(key.clone(), json!(local));
                            }
                        }
                    }
                    _ => {
                        definition.insert(key.clone(), rewriter.rewrite(value));
                    }
                }
            }
            resources.insert(resource.logical_id.clone(), Value::Object(definition));
        }

        let draft = drafts.entry(name.as_str()).or_default();
        draft.resources = resources;
        draft.outputs = assigned_outputs(template, &owner, &stack_order, name, &mut rewriter);

        let imports = rewriter.into_imports();
        for (stack, keys) in imports {
            prerequisites.insert(stack.clone());
            exports.entry(stack).or_default().extend(keys);
        }
        draft.prerequisites = prerequisites;
    }

    for (stack, keys) in &exports {
        let Some(draft) = drafts.get_mut(stack.as_str()) else {
            continue;
        };
        for key in keys {
            let mut output = Map::new();
            output.insert("Value".to_string(), key.value());
            output.insert(
                "Export".to_string(),
                json!({
                    "Name": export_name(
                        &options.stack_name_prefix,
                        stack,
                        &key.logical_id,
                        key.attribute.as_deref(),
                    )
                }),
            );
            if let Some(condition) =
                template.resource(&key.logical_id).and_then(|r| r.condition.as_ref())
            {
                output.insert("Condition".to_string(), json!(condition));
            }
            let output_name = unique_key(&draft.outputs, &key.output_name());
            draft.outputs.insert(output_name, Value::Object(output));
        }
    }

    let mut child_stacks = Vec::with_capacity(stack_order.len());
    let mut forwarded: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for name in &stack_order {
        let Some(draft) = drafts.remove(name.as_str()) else {
            continue;
        };
        let (document, parameters) = child_document(template, name, &draft);
        debug!(
            stack = %name,
            resources = draft.resources.len(),
            outputs = draft.outputs.len(),
            parameters = parameters.len(),
            "Generated child stack"
        );
        forwarded.insert(name.as_str(), parameters);
        child_stacks.push((
            GeneratedStack {
                name: name.clone(),
                template: document,
            },
            draft.prerequisites,
        ));
    }

    let parent_stack = options
        .generate_parent
        .then(|| parent_document(template, &child_stacks, &forwarded, options.format));

    Ok(SplitOutput {
        child_stacks: child_stacks.into_iter().map(|(stack, _)| stack).collect(),
        parent_stack,
    })
}

/// Map every resource to its stack, rejecting gaps and overlaps.
fn resource_owners(
    template: &Template,
    graph: &DependencyGraph,
    option: &SplitOption,
) -> Result<HashMap<String, String>> {
    let mut owner = HashMap::new();
    for cluster in &option.clusters {
        for id in &cluster.resources {
            if !graph.contains(id) {
                return Err(SplitError::InvalidOptions {
                    reason: format!("stack '{}' lists unknown resource '{id}'", cluster.name),
                });
            }
            if let Some(previous) = owner.insert(id.clone(), cluster.name.clone()) {
                return Err(SplitError::InvalidOptions {
                    reason: format!(
                        "resource '{id}' is assigned to both '{previous}' and '{}'",
                        cluster.name
                    ),
                });
            }
        }
    }
    if let Some(missing) = template.resources().iter().find(|r| !owner.contains_key(&r.logical_id))
    {
        return Err(SplitError::InvalidOptions {
            reason: format!("resource '{}' is not assigned to any stack", missing.logical_id),
        });
    }
    Ok(owner)
}

/// Stack names in deployment order, then any stacks the order omits.
fn stack_order(option: &SplitOption) -> Vec<String> {
    let mut order: Vec<String> = option
        .deployment_order
        .iter()
        .filter(|name| option.cluster(name).is_some())
        .cloned()
        .collect();
    for cluster in &option.clusters {
        if !order.contains(&cluster.name) {
            order.push(cluster.name.clone());
        }
    }
    order
}

/// Original outputs that belong to `stack`, rewritten for it.
///
/// An output belongs to the referenced stack that deploys last, so every
/// import it needs points at a stack already deployed before it. Outputs
/// that reference no resource go to the first stack.
fn assigned_outputs(
    template: &Template,
    owner: &HashMap<String, String>,
    stack_order: &[String],
    stack: &str,
    rewriter: &mut ReferenceRewriter<'_>,
) -> Map<String, Value> {
    let Some(outputs) = template.outputs() else {
        return Map::new();
    };
    let position = |name: &str| stack_order.iter().position(|s| s == name);

    outputs
        .iter()
        .filter(|(_, output)| {
            let home = collect_references(output)
                .into_iter()
                .filter_map(|reference| match reference {
                    TemplateReference::Ref(target) | TemplateReference::GetAtt { target, .. } => {
                        owner.get(&target).and_then(|s| position(s.as_str()))
                    }
                    _ => None,
                })
                .max()
                .unwrap_or(0);
            stack_order.get(home).map(String::as_str) == Some(stack)
        })
        .map(|(name, output)| (name.clone(), rewriter.rewrite(output)))
        .collect()
}

fn unique_key(map: &Map<String, Value>, base: &str) -> String {
    if !map.contains_key(base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{base}{n}"))
        .find(|candidate| !map.contains_key(candidate))
        .unwrap_or_else(|| base.to_string())
}

/// Parameters, mappings, and conditions a child's content depends on.
#[derive(Default)]
struct Needs {
    parameters: BTreeSet<String>,
    mappings: BTreeSet<String>,
    conditions: BTreeSet<String>,
}

impl Needs {
    fn scan(&mut self, template: &Template, value: &Value) {
        let parameters = template.parameters();
        for reference in collect_references(value) {
            match reference {
                TemplateReference::Ref(name) => {
                    if parameters.is_some_and(|p| p.contains_key(&name)) {
                        self.parameters.insert(name);
                    }
                }
                TemplateReference::Mapping(name) => {
                    self.mappings.insert(name);
                }
                TemplateReference::Condition(name) => {
                    self.conditions.insert(name);
                }
                TemplateReference::GetAtt { .. } => {}
            }
        }
    }

    /// Scan condition bodies until no new names appear.
    fn close_over_conditions(&mut self, template: &Template) {
        let Some(declared) = template.conditions() else {
            return;
        };
        let mut pending: Vec<String> = self.conditions.iter().cloned().collect();
        while let Some(name) = pending.pop() {
            let Some(body) = declared.get(&name) else {
                continue;
            };
            let before: BTreeSet<String> = self.conditions.clone();
            self.scan(template, body);
            pending.extend(self.conditions.difference(&before).cloned());
        }
    }
}

/// Copy the named entries of a section, preserving source order.
fn filtered_section(
    template: &Template,
    section: &str,
    names: &BTreeSet<String>,
) -> Map<String, Value> {
    template
        .section(section)
        .map(|entries| {
            entries
                .iter()
                .filter(|(name, _)| names.contains(*name))
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect()
        })
        .unwrap_or_default()
}

/// Assemble a child document; also returns the parameters it declares.
fn child_document(template: &Template, name: &str, draft: &ChildDraft) -> (Value, Vec<String>) {
    let mut needs = Needs::default();
    for resource in draft.resources.values() {
        needs.scan(template, resource);
        if let Some(Value::String(condition)) = resource.get("Condition") {
            needs.conditions.insert(condition.clone());
        }
    }
    for output in draft.outputs.values() {
        needs.scan(template, output);
        if let Some(Value::String(condition)) = output.get("Condition") {
            needs.conditions.insert(condition.clone());
        }
    }
    needs.close_over_conditions(template);

    let mut document = Map::new();
    let version = template
        .document()
        .get("AWSTemplateFormatVersion")
        .cloned()
        .unwrap_or_else(|| json!(TEMPLATE_FORMAT_VERSION));
    document.insert("AWSTemplateFormatVersion".to_string(), version);
    let description = match template.description() {
        Some(original) => format!("{original} ({name})"),
        None => format!("{name} stack"),
    };
    document.insert("Description".to_string(), json!(description));
    if let Some(transform) = template.document().get("Transform") {
        document.insert("Transform".to_string(), transform.clone());
    }

    let parameters = filtered_section(template, PARAMETERS, &needs.parameters);
    let declared: Vec<String> = parameters.keys().cloned().collect();
    for (section, entries) in [
        (PARAMETERS, parameters),
        (MAPPINGS, filtered_section(template, MAPPINGS, &needs.mappings)),
        (CONDITIONS, filtered_section(template, CONDITIONS, &needs.conditions)),
    ] {
        if !entries.is_empty() {
            document.insert(section.to_string(), Value::Object(entries));
        }
    }
    document.insert(RESOURCES.to_string(), Value::Object(draft.resources.clone()));
    if !draft.outputs.is_empty() {
        document.insert(OUTPUTS.to_string(), Value::Object(draft.outputs.clone()));
    }

    (Value::Object(document), declared)
}

/// Nested-stack logical ID for a stack name.
fn nested_stack_id(name: &str) -> String {
    name.chars().filter(char::is_ascii_alphanumeric).collect()
}

fn parent_document(
    template: &Template,
    children: &[(GeneratedStack, BTreeSet<String>)],
    forwarded: &BTreeMap<&str, Vec<String>>,
    format: TemplateFormat,
) -> GeneratedStack {
    let used: BTreeSet<String> = forwarded.values().flatten().cloned().collect();

    let mut parameters = Map::new();
    parameters.insert(
        TEMPLATE_BASE_URL_PARAMETER.to_string(),
        json!({
            "Type": "String",
            "Description": "Base URL the child templates were uploaded to"
        }),
    );
    parameters.extend(filtered_section(template, PARAMETERS, &used));

    let mut resources = Map::new();
    for (child, prerequisites) in children {
        let mut properties = Map::new();
        properties.insert(
            "TemplateURL".to_string(),
            json!({
                "Fn::Sub": format!("${{{TEMPLATE_BASE_URL_PARAMETER}}}/{}", child.file_name(format))
            }),
        );
        if let Some(names) = forwarded.get(child.name.as_str())
            && !names.is_empty()
        {
            let values: Map<String, Value> =
                names.iter().map(|p| (p.clone(), json!({ "Ref": p }))).collect();
            properties.insert("Parameters".to_string(), Value::Object(values));
        }

        let mut resource = Map::new();
        resource.insert("Type".to_string(), json!(NESTED_STACK_TYPE));
        let depends_on: Vec<String> = prerequisites
            .iter()
            .filter(|p| **p != child.name)
            .map(|p| nested_stack_id(p))
            .collect();
        if !depends_on.is_empty() {
            resource.insert("DependsOn".to_string(), json!(depends_on));
        }
        resource.insert("Properties".to_string(), Value::Object(properties));
        resources.insert(nested_stack_id(&child.name), Value::Object(resource));
    }

    let description = match template.description() {
        Some(original) => format!("{original} (parent)"),
        None => "Parent stack".to_string(),
    };
    GeneratedStack {
        name: PARENT_STACK_NAME.to_string(),
        template: json!({
            "AWSTemplateFormatVersion": TEMPLATE_FORMAT_VERSION,
            "Description": description,
            "Parameters": parameters,
            "Resources": resources,
        }),
    }
}
