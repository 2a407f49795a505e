//! Cross-stack export naming and reference rewriting.
//!
//! When a resource moves into its own stack, every reference to it from
//! another stack has to go through an export of the owning stack and an
//! `Fn::ImportValue` in the consuming stack. [`ReferenceRewriter`] performs
//! that rewrite for one consuming stack and records which exports it needs.

use regex::Captures;
use serde_json::{Map, Value, json};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::constants::MAX_EXPORT_NAME_LEN;
use crate::template::references::{PLACEHOLDER, parse_get_att, parse_placeholder};

/// Length of the digest suffix on truncated export names.
const DIGEST_SUFFIX_LEN: usize = 12;

/// A value some stack must export: a resource's `Ref` or one attribute.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExportKey {
    pub logical_id: String,
    pub attribute: Option<String>,
}

impl ExportKey {
    /// The intrinsic that reads this value inside the owning stack.
    pub fn value(&self) -> Value {
        match &self.attribute {
            Some(attribute) => json!({ "Fn::GetAtt": [self.logical_id, attribute] }),
            None => json!({ "Ref": self.logical_id }),
        }
    }

    /// Output logical ID in the owning stack, before de-duplication.
    pub fn output_name(&self) -> String {
        let raw = format!(
            "{}{}Export",
            self.logical_id,
            self.attribute.as_deref().unwrap_or_default()
        );
        raw.chars().filter(char::is_ascii_alphanumeric).collect()
    }
}

/// Deterministic export name `<prefix>-<stack>-<logicalId>[-<attribute>]`.
///
/// Characters outside `[A-Za-z0-9:-]` become `-`. Names longer than the
/// platform limit are cut and suffixed with a SHA-256 digest of the full
/// name so they stay unique.
pub fn export_name(prefix: &str, stack: &str, logical_id: &str, attribute: Option<&str>) -> String {
    let mut parts = Vec::with_capacity(4);
    if !prefix.is_empty() {
        parts.push(prefix);
    }
    parts.push(stack);
    parts.push(logical_id);
    if let Some(attribute) = attribute {
        parts.push(attribute);
    }

    let name: String = parts
        .join("-")
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == ':' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect();
    if name.len() <= MAX_EXPORT_NAME_LEN {
        return name;
    }

    let digest = hex::encode(Sha256::digest(name.as_bytes()));
    let keep = MAX_EXPORT_NAME_LEN - DIGEST_SUFFIX_LEN - 1;
    format!("{}-{}", &name[..keep], &digest[..DIGEST_SUFFIX_LEN])
}

/// Rewrites references to resources owned by other stacks.
pub struct ReferenceRewriter<'a> {
    home: &'a str,
    owner: &'a HashMap<String, String>,
    prefix: &'a str,
    imports: BTreeMap<String, BTreeSet<ExportKey>>,
}

impl<'a> ReferenceRewriter<'a> {
    /// `owner` maps every logical ID to its stack; `home` is the stack
    /// whose content is being rewritten.
    pub fn new(home: &'a str, owner: &'a HashMap<String, String>, prefix: &'a str) -> Self {
        Self {
            home,
            owner,
            prefix,
            imports: BTreeMap::new(),
        }
    }

    /// Exports this stack imports, grouped by owning stack.
    pub fn imports(&self) -> &BTreeMap<String, BTreeSet<ExportKey>> {
        &self.imports
    }

    pub fn into_imports(self) -> BTreeMap<String, BTreeSet<ExportKey>> {
        self.imports
    }

    /// Whether `logical_id` is a resource of another stack.
    pub fn is_foreign(&self, logical_id: &str) -> bool {
        self.foreign(logical_id).is_some()
    }

    fn foreign(&self, logical_id: &str) -> Option<&'a str> {
        self.owner
            .get(logical_id)
            .map(String::as_str)
            .filter(|&stack| stack != self.home)
    }

    fn import(&mut self, stack: &str, logical_id: &str, attribute: Option<&str>) -> Value {
        self.imports.entry(stack.to_string()).or_default().insert(ExportKey {
            logical_id: logical_id.to_string(),
            attribute: attribute.map(str::to_string),
        });
        json!({ "Fn::ImportValue": export_name(self.prefix, stack, logical_id, attribute) })
    }

    /// Copy `value`, replacing foreign references with imports.
    pub fn rewrite(&mut self, value: &Value) -> Value {
        match value {
            Value::Object(map) => {
                if map.len() == 1
                    && let Some((key, arg)) = map.iter().next()
                    && let Some(rewritten) = self.rewrite_intrinsic(key, arg)
                {
                    return rewritten;
                }
                Value::Object(map.iter().map(|(k, v)| (k.clone(), self.rewrite(v))).collect())
            }
            Value::Array(items) => Value::Array(items.iter().map(|v| self.rewrite(v)).collect()),
            other => other.clone(),
        }
    }

    fn rewrite_intrinsic(&mut self, key: &str, arg: &Value) -> Option<Value> {
        match key {
            "Ref" => {
                let name = arg.as_str()?;
                let stack = self.foreign(name)?;
                Some(self.import(stack, name, None))
            }
            "Fn::GetAtt" => {
                let (target, attribute) = parse_get_att(arg)?;
                let stack = self.foreign(&target)?;
                Some(self.import(stack, &target, Some(&attribute)))
            }
            "Fn::Sub" => self.rewrite_sub(arg),
            _ => None,
        }
    }

    /// Foreign `${Name}` / `${Name.Attr}` placeholders become variables bound
    /// to `Fn::ImportValue`, switching to the `[string, vars]` form.
    fn rewrite_sub(&mut self, arg: &Value) -> Option<Value> {
        let (text, vars) = match arg {
            Value::String(text) => (text.as_str(), None),
            Value::Array(items) if !items.is_empty() => {
                (items[0].as_str()?, items.get(1).and_then(Value::as_object))
            }
            _ => return None,
        };
        let bound: HashSet<&str> =
            vars.map(|vars| vars.keys().map(String::as_str).collect()).unwrap_or_default();

        let mut added = Map::new();
        let mut variables: HashMap<String, String> = HashMap::new();
        let rewritten = PLACEHOLDER
            .replace_all(text, |caps: &Captures<'_>| {
                let whole = caps[0].to_string();
                let Some(placeholder) = parse_placeholder(&caps[1]) else {
                    return whole;
                };
                let full = match &placeholder.attribute {
                    Some(attribute) => format!("{}.{attribute}", placeholder.name),
                    None => placeholder.name.clone(),
                };
                if bound.contains(full.as_str()) || bound.contains(placeholder.name.as_str()) {
                    return whole;
                }
                let Some(stack) = self.foreign(&placeholder.name) else {
                    return whole;
                };
                let import = self.import(stack, &placeholder.name, placeholder.attribute.as_deref());
                let variable = match variables.get(&full) {
                    Some(variable) => variable.clone(),
                    None => {
                        let base: String = format!("{full}Import")
                            .chars()
                            .filter(char::is_ascii_alphanumeric)
                            .collect();
                        let variable = free_variable(&base, |name| {
                            bound.contains(name) || added.contains_key(name)
                        });
                        added.insert(variable.clone(), import);
                        variables.insert(full, variable.clone());
                        variable
                    }
                };
                format!("${{{variable}}}")
            })
            .into_owned();

        let mut new_vars: Map<String, Value> = match vars {
            Some(vars) => vars.iter().map(|(k, v)| (k.clone(), self.rewrite(v))).collect(),
            None => Map::new(),
        };
        new_vars.extend(added);

        if vars.is_none() && new_vars.is_empty() {
            Some(json!({ "Fn::Sub": rewritten }))
        } else {
            Some(json!({ "Fn::Sub": [rewritten, new_vars] }))
        }
    }
}

/// `base`, or the first `base2`, `base3`, ... that is not taken.
fn free_variable(base: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{base}{n}"))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| base.to_string())
}
