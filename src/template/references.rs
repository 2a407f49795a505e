//! Deep reference scanning over resolved template values.
//!
//! A resolved template still expresses relationships through intrinsic
//! functions. This module finds every such relationship inside a value tree
//! without interpreting it:
//!
//! - `{"Ref": "Name"}` → [`TemplateReference::Ref`]
//! - `{"Fn::GetAtt": ["Name", "Attr"]}` or `{"Fn::GetAtt": "Name.Attr"}` →
//!   [`TemplateReference::GetAtt`]
//! - `{"Fn::Sub": "...${Name}...${Name.Attr}..."}` (string or `[string, vars]`
//!   form) → `Ref` / `GetAtt` per placeholder, skipping `${!Literal}` escapes
//!   and names bound by the vars map
//! - `{"Fn::FindInMap": ["Map", ...]}` → [`TemplateReference::Mapping`]
//! - `{"Fn::If": ["Cond", ...]}` and `{"Condition": "Cond"}` →
//!   [`TemplateReference::Condition`]
//!
//! Names are reported as written. Callers decide which names denote
//! resources, parameters, or platform pseudo-parameters.

use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::constants::PSEUDO_PARAMETER_PREFIX;

/// Matches one `${...}` placeholder in a substitution string.
pub(crate) static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]*)\}").expect("placeholder pattern is valid"));

/// A single relationship found while scanning a value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TemplateReference {
    /// A value reference to a resource or parameter.
    Ref(String),
    /// A reference to a named attribute of a resource.
    GetAtt {
        /// Logical ID being read
        target: String,
        /// Attribute name (may itself contain dots, e.g. `Outputs.Url`)
        attribute: String,
    },
    /// Use of a named condition.
    Condition(String),
    /// Lookup into a named mapping.
    Mapping(String),
}

/// A parsed `${...}` placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub name: String,
    pub attribute: Option<String>,
}

/// Whether `name` is a platform pseudo-parameter such as `AWS::Region`.
pub fn is_pseudo_parameter(name: &str) -> bool {
    name.starts_with(PSEUDO_PARAMETER_PREFIX)
}

/// Parse the inside of a `${...}` placeholder.
///
/// Returns `None` for literal escapes (`${!Name}`) and empty placeholders.
pub fn parse_placeholder(content: &str) -> Option<Placeholder> {
    let content = content.trim();
    if content.is_empty() || content.starts_with('!') {
        return None;
    }
    // Pseudo-parameters contain `::` but never an attribute.
    if is_pseudo_parameter(content) {
        return Some(Placeholder {
            name: content.to_string(),
            attribute: None,
        });
    }
    match content.split_once('.') {
        Some((name, attribute)) if !name.is_empty() && !attribute.is_empty() => {
            Some(Placeholder {
                name: name.to_string(),
                attribute: Some(attribute.to_string()),
            })
        }
        _ => Some(Placeholder {
            name: content.to_string(),
            attribute: None,
        }),
    }
}

/// All placeholders of a substitution string, in order.
pub fn sub_placeholders(text: &str) -> Vec<Placeholder> {
    PLACEHOLDER
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).and_then(|m| parse_placeholder(m.as_str())))
        .collect()
}

/// Decode the argument of `Fn::GetAtt` in either list or dotted-string form.
pub fn parse_get_att(arg: &Value) -> Option<(String, String)> {
    match arg {
        Value::Array(items) if items.len() == 2 => {
            let target = items[0].as_str()?;
            let attribute = items[1].as_str()?;
            Some((target.to_string(), attribute.to_string()))
        }
        Value::String(dotted) => {
            let (target, attribute) = dotted.split_once('.')?;
            if target.is_empty() || attribute.is_empty() {
                return None;
            }
            Some((target.to_string(), attribute.to_string()))
        }
        _ => None,
    }
}

/// Collect every reference inside `value`, in document order.
///
/// Duplicates are kept; callers that need a set deduplicate themselves.
pub fn collect_references(value: &Value) -> Vec<TemplateReference> {
    let mut found = Vec::new();
    walk(value, &mut found);
    found
}

fn walk(value: &Value, found: &mut Vec<TemplateReference>) {
    match value {
        Value::Object(map) => {
            if map.len() == 1
                && let Some((key, arg)) = map.iter().next()
                && scan_intrinsic(key, arg, found)
            {
                return;
            }
            for child in map.values() {
                walk(child, found);
            }
        }
        Value::Array(items) => {
            for item in items {
                walk(item, found);
            }
        }
        _ => {}
    }
}

/// Handle a single-key intrinsic. Returns `false` when `key` is not one we
/// understand (or its argument is malformed) so the caller keeps walking.
fn scan_intrinsic(key: &str, arg: &Value, found: &mut Vec<TemplateReference>) -> bool {
    match key {
        "Ref" => {
            let Some(name) = arg.as_str() else {
                return false;
            };
            found.push(TemplateReference::Ref(name.to_string()));
            true
        }
        "Fn::GetAtt" => {
            let Some((target, attribute)) = parse_get_att(arg) else {
                return false;
            };
            found.push(TemplateReference::GetAtt {
                target,
                attribute,
            });
            true
        }
        "Fn::Sub" => scan_sub(arg, found),
        "Fn::FindInMap" => {
            let Some(items) = arg.as_array() else {
                return false;
            };
            match items.first() {
                Some(Value::String(name)) => {
                    found.push(TemplateReference::Mapping(name.clone()));
                }
                Some(other) => walk(other, found),
                None => {}
            }
            for rest in items.iter().skip(1) {
                walk(rest, found);
            }
            true
        }
        "Fn::If" => {
            let Some(items) = arg.as_array() else {
                return false;
            };
            if let Some(Value::String(name)) = items.first() {
                found.push(TemplateReference::Condition(name.clone()));
            }
            for branch in items.iter().skip(1) {
                walk(branch, found);
            }
            true
        }
        "Condition" => {
            let Some(name) = arg.as_str() else {
                return false;
            };
            found.push(TemplateReference::Condition(name.to_string()));
            true
        }
        _ => false,
    }
}

fn scan_sub(arg: &Value, found: &mut Vec<TemplateReference>) -> bool {
    let (text, vars) = match arg {
        Value::String(text) => (text.as_str(), None),
        Value::Array(items) if !items.is_empty() => {
            let Some(text) = items[0].as_str() else {
                return false;
            };
            (text, items.get(1).and_then(Value::as_object))
        }
        _ => return false,
    };

    let bound: HashSet<&str> =
        vars.map(|vars| vars.keys().map(String::as_str).collect()).unwrap_or_default();

    for placeholder in sub_placeholders(text) {
        let full = match &placeholder.attribute {
            Some(attribute) => format!("{}.{}", placeholder.name, attribute),
            None => placeholder.name.clone(),
        };
        if bound.contains(full.as_str()) || bound.contains(placeholder.name.as_str()) {
            continue;
        }
        found.push(match placeholder.attribute {
            Some(attribute) => TemplateReference::GetAtt {
                target: placeholder.name,
                attribute,
            },
            None => TemplateReference::Ref(placeholder.name),
        });
    }

    if let Some(vars) = vars {
        for value in vars.values() {
            walk(value, found);
        }
    }
    true
}
