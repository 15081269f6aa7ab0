//! Declarative tool parameters and the JSON argument binder.
//!
//! Each tool declares an ordered list of [`ParamSpec`]s. The binder coerces
//! the caller's JSON argument bag against that list, producing either a
//! typed [`BoundArgs`] or a list of structured [`ParamError`]s. Unknown
//! arguments are ignored for forward compatibility.

use serde_json::{Map, Value, json};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Int,
    Bool,
    StringArray,
    /// Array of objects, each bound against the nested parameter list.
    ObjectArray(Vec<ParamSpec>),
}

impl ParamKind {
    /// Name used in binder error messages and kept stable for clients.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Bool => "bool",
            Self::StringArray => "string-array",
            Self::ObjectArray(_) => "object-array",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub description: &'static str,
    pub default: Option<Value>,
    /// Marks a parameter whose value names filesystem paths; the executor
    /// runs every such value through the path guard before the tool sees it.
    pub is_path: bool,
}

impl ParamSpec {
    #[must_use]
    pub fn new(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: false,
            description,
            default: None,
            is_path: false,
        }
    }

    #[must_use]
    pub fn string(name: &'static str, description: &'static str) -> Self {
        Self::new(name, ParamKind::String, description)
    }

    #[must_use]
    pub fn int(name: &'static str, description: &'static str) -> Self {
        Self::new(name, ParamKind::Int, description)
    }

    #[must_use]
    pub fn bool(name: &'static str, description: &'static str) -> Self {
        Self::new(name, ParamKind::Bool, description)
    }

    #[must_use]
    pub fn string_array(name: &'static str, description: &'static str) -> Self {
        Self::new(name, ParamKind::StringArray, description)
    }

    #[must_use]
    pub fn object_array(
        name: &'static str,
        nested: Vec<ParamSpec>,
        description: &'static str,
    ) -> Self {
        Self::new(name, ParamKind::ObjectArray(nested), description)
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        assert!(
            self.default.is_none(),
            "required parameter '{}' cannot have a default",
            self.name
        );
        self.required = true;
        self
    }

    #[must_use]
    pub fn path(mut self) -> Self {
        self.is_path = true;
        self
    }

    #[must_use]
    pub fn default_value(mut self, value: Value) -> Self {
        assert!(
            !self.required,
            "required parameter '{}' cannot have a default",
            self.name
        );
        self.default = Some(value);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamError {
    pub name: String,
    pub message: String,
}

impl fmt::Display for ParamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl ParamError {
    fn missing(name: &str) -> Self {
        Self {
            name: name.to_string(),
            message: format!("required argument '{name}' not found"),
        }
    }

    fn wrong_kind(name: &str, kind: &ParamKind) -> Self {
        Self {
            name: name.to_string(),
            message: format!("argument '{name}' must be a {}", kind.label()),
        }
    }
}

/// Type-checked argument bag. Getters mirror the declared kinds; a `None`
/// simply means the optional parameter was not supplied.
#[derive(Debug, Clone, Default)]
pub struct BoundArgs {
    values: Map<String, Value>,
}

impl BoundArgs {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    #[must_use]
    pub fn str(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(Value::as_str)
    }

    #[must_use]
    pub fn int(&self, name: &str) -> Option<i64> {
        self.values.get(name).and_then(Value::as_i64)
    }

    #[must_use]
    pub fn flag(&self, name: &str) -> Option<bool> {
        self.values.get(name).and_then(Value::as_bool)
    }

    #[must_use]
    pub fn str_list(&self, name: &str) -> Option<Vec<&str>> {
        self.values
            .get(name)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
    }

    #[must_use]
    pub fn objects(&self, name: &str) -> Option<&Vec<Value>> {
        self.values.get(name).and_then(Value::as_array)
    }
}

/// Bind a JSON argument object against an ordered parameter list.
pub fn bind(specs: &[ParamSpec], args: &Map<String, Value>) -> Result<BoundArgs, Vec<ParamError>> {
    let mut values = Map::new();
    let mut errors = Vec::new();

    for spec in specs {
        match args.get(spec.name) {
            None | Some(Value::Null) => {
                if spec.required {
                    errors.push(ParamError::missing(spec.name));
                } else if let Some(default) = &spec.default {
                    values.insert(spec.name.to_string(), default.clone());
                }
            }
            Some(value) => match check_kind(spec.name, &spec.kind, value) {
                Ok(()) => {
                    values.insert(spec.name.to_string(), value.clone());
                }
                Err(mut kind_errors) => errors.append(&mut kind_errors),
            },
        }
    }

    if errors.is_empty() {
        Ok(BoundArgs { values })
    } else {
        Err(errors)
    }
}

fn check_kind(name: &str, kind: &ParamKind, value: &Value) -> Result<(), Vec<ParamError>> {
    match kind {
        ParamKind::String => {
            if value.is_string() {
                Ok(())
            } else {
                Err(vec![ParamError::wrong_kind(name, kind)])
            }
        }
        ParamKind::Int => {
            if value.is_i64() || value.is_u64() {
                Ok(())
            } else {
                Err(vec![ParamError::wrong_kind(name, kind)])
            }
        }
        ParamKind::Bool => {
            if value.is_boolean() {
                Ok(())
            } else {
                Err(vec![ParamError::wrong_kind(name, kind)])
            }
        }
        ParamKind::StringArray => {
            let Some(items) = value.as_array() else {
                return Err(vec![ParamError::wrong_kind(name, kind)]);
            };
            let errors: Vec<ParamError> = items
                .iter()
                .enumerate()
                .filter(|(_, item)| !item.is_string())
                .map(|(i, _)| {
                    ParamError::wrong_kind(&format!("{name}[{i}]"), &ParamKind::String)
                })
                .collect();
            if errors.is_empty() { Ok(()) } else { Err(errors) }
        }
        ParamKind::ObjectArray(nested) => {
            let Some(items) = value.as_array() else {
                return Err(vec![ParamError::wrong_kind(name, kind)]);
            };
            let mut errors = Vec::new();
            for (i, item) in items.iter().enumerate() {
                let Some(object) = item.as_object() else {
                    errors.push(ParamError {
                        name: format!("{name}[{i}]"),
                        message: format!("argument '{name}[{i}]' must be an object"),
                    });
                    continue;
                };
                if let Err(nested_errors) = bind(nested, object) {
                    for err in nested_errors {
                        errors.push(ParamError {
                            name: format!("{name}[{i}].{}", err.name),
                            message: format!("{name}[{i}]: {}", err.message),
                        });
                    }
                }
            }
            if errors.is_empty() { Ok(()) } else { Err(errors) }
        }
    }
}

/// Flatten a parameter list into the JSON-Schema-like object `tools/list`
/// advertises for each tool.
#[must_use]
pub fn to_input_schema(specs: &[ParamSpec]) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for spec in specs {
        properties.insert(spec.name.to_string(), schema_for(spec));
        if spec.required {
            required.push(Value::String(spec.name.to_string()));
        }
    }
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

fn schema_for(spec: &ParamSpec) -> Value {
    match &spec.kind {
        ParamKind::String => json!({"type": "string", "description": spec.description}),
        ParamKind::Int => json!({"type": "integer", "description": spec.description}),
        ParamKind::Bool => json!({"type": "boolean", "description": spec.description}),
        ParamKind::StringArray => json!({
            "type": "array",
            "items": {"type": "string"},
            "description": spec.description,
        }),
        ParamKind::ObjectArray(nested) => json!({
            "type": "array",
            "items": to_input_schema(nested),
            "description": spec.description,
        }),
    }
}
