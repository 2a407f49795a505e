//! Cross-stack wiring of generated templates.

use serde_json::{Value, json};
use std::collections::BTreeSet;

use stacksplit::graph::build_graph;
use stacksplit::split::{
    AnalyzeOptions, GenerateOptions, SplitOutput, analyze_and_cluster, generate_split,
};
use stacksplit::template::io::{TemplateFormat, parse_template, render_document};
use stacksplit::test_utils::TemplateFixture;

fn split(fixture: &TemplateFixture, analyze: &AnalyzeOptions, prefix: &str) -> SplitOutput {
    let template = fixture.build();
    let graph = build_graph(&template);
    let suggestion = analyze_and_cluster(&template, &graph, analyze).unwrap();
    let options = GenerateOptions {
        stack_name_prefix: prefix.to_string(),
        ..GenerateOptions::default()
    };
    generate_split(&template, &graph, &suggestion, &options).unwrap()
}

/// Every `Fn::ImportValue` name anywhere in `value`.
fn imports(value: &Value, found: &mut BTreeSet<String>) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(name)) = map.get("Fn::ImportValue") {
                found.insert(name.clone());
            }
            map.values().for_each(|v| imports(v, found));
        }
        Value::Array(items) => items.iter().for_each(|v| imports(v, found)),
        _ => {}
    }
}

/// Export names declared in a template's outputs.
fn exports(template: &Value) -> BTreeSet<String> {
    template["Outputs"]
        .as_object()
        .map(|outputs| {
            outputs
                .values()
                .filter_map(|output| output["Export"]["Name"].as_str())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[test]
fn test_round_trip_wiring() {
    let output = split(&TemplateFixture::web_service(), &AnalyzeOptions::default(), "web");

    let names: Vec<&str> = output.child_stacks.iter().map(|s| s.name.as_str()).collect();
    let position = |name: &str| names.iter().position(|n| *n == name).unwrap();
    assert_eq!(names.len(), 3);
    assert!(position("IAM") < position("Compute"));

    let compute = &output.child("Compute").unwrap().template;
    assert_eq!(
        compute["Resources"]["Function"]["Properties"]["Role"],
        json!({ "Fn::ImportValue": "web-IAM-Role-Arn" })
    );
    assert_eq!(compute["Parameters"]["Env"]["Type"], json!("String"));
    assert!(compute["Outputs"].get("FunctionArn").is_some());

    let iam = &output.child("IAM").unwrap().template;
    assert!(exports(iam).contains("web-IAM-Role-Arn"));
    assert_eq!(iam["Outputs"]["RoleArnExport"]["Value"], json!({ "Fn::GetAtt": ["Role", "Arn"] }));

    let networking = &output.child("Networking").unwrap().template;
    assert_eq!(networking["Resources"]["Subnet"]["Properties"]["VpcId"], json!({ "Ref": "Vpc" }));
    assert!(networking.get("Outputs").is_none());
    assert!(networking.get("Parameters").is_none());
}

#[test]
fn test_every_import_has_an_export() {
    let analyze = AnalyzeOptions {
        max_cluster_size: 4,
        ..AnalyzeOptions::default()
    };
    let output = split(&TemplateFixture::large_application(), &analyze, "shop");

    let mut imported = BTreeSet::new();
    let mut exported = BTreeSet::new();
    let mut resources = BTreeSet::new();
    for stack in &output.child_stacks {
        imports(&stack.template, &mut imported);
        exported.extend(exports(&stack.template));
        let declared = stack.template["Resources"].as_object().unwrap();
        assert!(declared.len() <= 4, "{} has {} resources", stack.name, declared.len());
        for id in declared.keys() {
            assert!(resources.insert(id.clone()), "{id} declared twice");
        }
    }

    let template = TemplateFixture::large_application().build();
    let expected: BTreeSet<String> =
        template.resources().iter().map(|r| r.logical_id.clone()).collect();
    assert_eq!(resources, expected);
    assert!(!imported.is_empty());
    assert!(imported.is_subset(&exported), "missing exports: {:?}", imported.difference(&exported));
    assert!(imported.iter().all(|name| name.starts_with("shop-")));
}

#[test]
fn test_parent_depends_on_imported_stacks() {
    let analyze = AnalyzeOptions {
        max_cluster_size: 4,
        ..AnalyzeOptions::default()
    };
    let output = split(&TemplateFixture::large_application(), &analyze, "");
    let parent = output.parent_stack.as_ref().unwrap();
    let nested = parent.template["Resources"].as_object().unwrap();
    assert_eq!(nested.len(), output.child_stacks.len());

    for child in &output.child_stacks {
        let id: String = child.name.chars().filter(char::is_ascii_alphanumeric).collect();
        let resource = &nested[&id];
        assert_eq!(resource["Type"], json!("AWS::CloudFormation::Stack"));

        let depends_on: BTreeSet<&str> = resource["DependsOn"]
            .as_array()
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        assert!(!depends_on.contains(id.as_str()));
        for target in &depends_on {
            assert!(nested.contains_key(*target), "{id} depends on unknown {target}");
        }

        let mut imported = BTreeSet::new();
        imports(&child.template, &mut imported);
        for name in imported {
            let owner = name.split('-').next().unwrap();
            assert!(depends_on.contains(owner), "{id} imports from {owner} without depending on it");
        }
    }
}

#[test]
fn test_generated_templates_parse_back() {
    let output = split(&TemplateFixture::web_service(), &AnalyzeOptions::default(), "app");
    for format in [TemplateFormat::Json, TemplateFormat::Yaml] {
        for stack in output.stacks() {
            let text = render_document(&stack.template, format).unwrap();
            let parsed = parse_template(&text, format, &stack.file_name(format)).unwrap();
            assert_eq!(parsed.to_value(), stack.template);
        }
    }
}
