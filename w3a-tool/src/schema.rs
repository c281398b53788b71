//! Repair of MCP tool input schemas before they are declared to the model.
//!
//! MCP servers written against plain JSON Schema routinely advertise
//! `"type": ["string", "number"]` unions, non-string enum members and arrays
//! without `items`. Gemini's function declarations reject all three, so each
//! tool schema goes through [`fix_schema`] once, when the toolset lists tools.

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

/// Keys removed when [`SchemaFixOptions::strip_unsupported`] is set.
pub const UNSUPPORTED_KEYS: [&str; 4] = ["$schema", "definitions", "$ref", "additionalProperties"];

/// Environment variable holding the Gemini API key.
pub const MODEL_API_KEY_ENV: &str = "GOOGLE_API_KEY";

/// Minimum plausible length of a model API key.
pub const MIN_API_KEY_LEN: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaFixOptions {
    /// Replacement for a `type` given as an array.
    pub convert_type_arrays_to: String,
    /// Log every individual fix at debug level.
    pub verbose: bool,
    /// Also stringify enum members.
    pub aggressive: bool,
    /// Remove [`UNSUPPORTED_KEYS`].
    pub strip_unsupported: bool,
}

impl Default for SchemaFixOptions {
    fn default() -> Self {
        Self {
            convert_type_arrays_to: "string".to_string(),
            verbose: false,
            aggressive: true,
            strip_unsupported: true,
        }
    }
}

impl SchemaFixOptions {
    pub fn with_type_arrays_as(mut self, ty: impl Into<String>) -> Self {
        self.convert_type_arrays_to = ty.into();
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn aggressive(mut self, aggressive: bool) -> Self {
        self.aggressive = aggressive;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaFixKind {
    TypeUnion { from: Vec<String>, to: String },
    EnumStringified,
    MissingItems,
    Stripped { key: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaFix {
    /// Dotted location of the fixed node, e.g. `properties.args`; empty at the root.
    pub path: String,
    pub kind: SchemaFixKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaFixReport {
    pub fixes: Vec<SchemaFix>,
}

impl SchemaFixReport {
    pub fn is_empty(&self) -> bool {
        self.fixes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fixes.len()
    }

    pub fn paths_with(&self, pred: impl Fn(&SchemaFixKind) -> bool) -> Vec<&str> {
        self.fixes.iter().filter(|f| pred(&f.kind)).map(|f| f.path.as_str()).collect()
    }
}

/// Repairs `schema` in place and reports what changed.
pub fn fix_schema(schema: &mut Value, options: &SchemaFixOptions) -> SchemaFixReport {
    let mut report = SchemaFixReport::default();
    walk(schema, options, "", &mut report);
    report
}

fn child_path(path: &str, key: &str) -> String {
    if path.is_empty() { key.to_string() } else { format!("{path}.{key}") }
}

/// Keys whose object value maps parameter names to schemas rather than being a schema.
const NAME_MAP_KEYS: [&str; 2] = ["properties", "patternProperties"];

fn walk(value: &mut Value, options: &SchemaFixOptions, path: &str, report: &mut SchemaFixReport) {
    match value {
        Value::Object(map) => {
            fix_object(map, options, path, report);
            for (key, child) in map.iter_mut() {
                let child_path = child_path(path, key);
                if NAME_MAP_KEYS.contains(&key.as_str()) {
                    if let Value::Object(names) = child {
                        walk_name_map(names, options, &child_path, report);
                        continue;
                    }
                }
                if child.is_object() || child.is_array() {
                    walk(child, options, &child_path, report);
                }
            }
        }
        Value::Array(items) => {
            for (i, item) in items.iter_mut().enumerate() {
                if item.is_object() || item.is_array() {
                    walk(item, options, &format!("{path}[{i}]"), report);
                }
            }
        }
        _ => {}
    }
}

/// Entries of a `properties` map are parameter names, so only their values get repaired.
fn walk_name_map(
    names: &mut Map<String, Value>,
    options: &SchemaFixOptions,
    path: &str,
    report: &mut SchemaFixReport,
) {
    for (name, schema) in names.iter_mut() {
        if schema.is_object() || schema.is_array() {
            walk(schema, options, &child_path(path, name), report);
        }
    }
}

fn fix_object(
    map: &mut Map<String, Value>,
    options: &SchemaFixOptions,
    path: &str,
    report: &mut SchemaFixReport,
) {
    if let Some(Value::Array(types)) = map.get("type") {
        let from: Vec<String> =
            types.iter().map(|t| t.as_str().map_or_else(|| t.to_string(), str::to_string)).collect();
        if options.verbose {
            debug!(path, ?from, to = %options.convert_type_arrays_to, "converting type array");
        }
        map.insert("type".to_string(), Value::String(options.convert_type_arrays_to.clone()));
        report.fixes.push(SchemaFix {
            path: path.to_string(),
            kind: SchemaFixKind::TypeUnion { from, to: options.convert_type_arrays_to.clone() },
        });
    }

    if options.aggressive {
        if let Some(Value::Array(members)) = map.get_mut("enum") {
            let mut changed = false;
            for member in members.iter_mut() {
                if !member.is_string() {
                    *member = Value::String(member.to_string());
                    changed = true;
                }
            }
            if changed {
                if options.verbose {
                    debug!(path, "stringified enum members");
                }
                report
                    .fixes
                    .push(SchemaFix { path: path.to_string(), kind: SchemaFixKind::EnumStringified });
            }
        }
    }

    if map.get("type").and_then(Value::as_str) == Some("array") && !map.contains_key("items") {
        map.insert("items".to_string(), serde_json::json!({ "type": "string" }));
        info!(path, "fixed array schema missing items");
        report.fixes.push(SchemaFix { path: path.to_string(), kind: SchemaFixKind::MissingItems });
    }

    if options.strip_unsupported {
        for key in UNSUPPORTED_KEYS {
            if map.remove(key).is_some() {
                if options.verbose {
                    debug!(path, key, "removed unsupported schema key");
                }
                report.fixes.push(SchemaFix {
                    path: path.to_string(),
                    kind: SchemaFixKind::Stripped { key: key.to_string() },
                });
            }
        }
    }
}

/// Warns when the model API key named `var` is missing or implausibly short.
pub fn validate_model_api_key<F>(var: &str, lookup: F) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => {
            warn!(var, "model API key environment variable is not set");
            false
        }
        Some(key) if key.trim().is_empty() => {
            warn!(var, "model API key environment variable is empty");
            false
        }
        Some(key) if key.len() < MIN_API_KEY_LEN => {
            warn!(var, length = key.len(), "model API key seems too short");
            false
        }
        Some(key) => {
            info!(var, length = key.len(), "model API key found");
            true
        }
    }
}
