//! Table, field, record and cell types shared by every basediff component

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Column type tag. Only the types the compare pipeline treats differently are named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    SingleSelect,
    MultiSelect,
    #[default]
    #[serde(other)]
    Other,
}

impl FieldType {
    pub fn is_selection(&self) -> bool {
        matches!(self, Self::SingleSelect | Self::MultiSelect)
    }

    /// Whether a column of this type can hold an added/deleted result
    pub fn accepts_diff_output(&self) -> bool {
        matches!(self, Self::Text | Self::MultiSelect)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Text => "Text",
            Self::SingleSelect => "SingleSelect",
            Self::MultiSelect => "MultiSelect",
            Self::Other => "Other",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOption {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<FieldOption>,
}

impl FieldDescriptor {
    pub fn new(id: impl Into<String>, name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            field_type,
            options: Vec::new(),
        }
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        self.options = options
            .into_iter()
            .map(|(id, name)| FieldOption {
                id: id.into(),
                name: name.into(),
            })
            .collect();
        self
    }

    pub fn option_by_id(&self, id: &str) -> Option<&FieldOption> {
        self.options.iter().find(|opt| opt.id == id)
    }

    /// Exact, case-sensitive match on the option's display name
    pub fn option_by_name(&self, name: &str) -> Option<&FieldOption> {
        self.options.iter().find(|opt| opt.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMeta {
    pub id: String,
    pub name: String,
}

/// What the host currently has selected (used only to default the table choice)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub record_id: String,
    #[serde(default)]
    pub fields: IndexMap<String, Value>,
}

impl Record {
    pub fn cell(&self, field_id: &str) -> &Value {
        self.fields.get(field_id).unwrap_or(&Value::Null)
    }
}

/// One page of a paginated record read
#[derive(Debug, Clone, Default)]
pub struct RecordPage {
    pub records: Vec<Record>,
    pub has_more: bool,
    pub page_token: Option<String>,
}

/// Raw cell value decoded into the shapes the normalizer understands
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Absent,
    Scalar(String),
    Object {
        text: Option<String>,
        name: Option<String>,
        rendered: String,
    },
    List(Vec<CellValue>),
}

impl CellValue {
    /// Decode a top-level cell. `null`, `false`, `0` and `""` count as empty.
    pub fn from_json(value: &Value) -> Self {
        if !is_truthy(value) {
            return Self::Absent;
        }
        match value {
            Value::Array(items) => {
                Self::List(items.iter().filter_map(Self::element_from_json).collect())
            }
            Value::Object(_) => Self::object_from_json(value),
            other => Self::Scalar(scalar_to_string(other)),
        }
    }

    /// Decode an element of a list cell. Scalars are kept even when falsy,
    /// nested lists follow the object rule, `null` elements are skipped.
    fn element_from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Array(_) | Value::Object(_) => Some(Self::object_from_json(value)),
            other => Some(Self::Scalar(scalar_to_string(other))),
        }
    }

    fn object_from_json(value: &Value) -> Self {
        let attr = |key: &str| value.get(key).filter(|v| is_truthy(v)).map(display_string);
        Self::Object {
            text: attr("text"),
            name: attr("name"),
            rendered: render_json(value),
        }
    }

    /// Display text of an object-shaped cell: `text`, then `name`, then the JSON rendering
    pub fn object_display(&self) -> Option<&str> {
        match self {
            Self::Object { text, name, rendered } => {
                Some(text.as_deref().or(name.as_deref()).unwrap_or(rendered))
            }
            _ => None,
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn display_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => render_json(value),
        other => scalar_to_string(other),
    }
}

/// Compact JSON text with keys in host order and integral floats printed as integers
fn render_json(value: &Value) -> String {
    integral_floats_as_integers(value).to_string()
}

fn integral_floats_as_integers(value: &Value) -> Value {
    match value {
        Value::Number(n) if n.is_f64() => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => Value::from(f as i64),
            _ => value.clone(),
        },
        Value::Array(items) => {
            Value::Array(items.iter().map(integral_floats_as_integers).collect())
        }
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, v)| (key.clone(), integral_floats_as_integers(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => {
            if n.is_f64() {
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
                    _ => n.to_string(),
                }
            } else {
                n.to_string()
            }
        }
        other => other.to_string(),
    }
}

/// Reference to an existing option of a selection field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionRef {
    pub id: String,
    pub text: String,
}

/// Value written into a destination column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WriteValue {
    Text(String),
    Options(Vec<OptionRef>),
}

impl WriteValue {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(s) => s.is_empty(),
            Self::Options(opts) => opts.is_empty(),
        }
    }

    /// Cell shape used when the value is stored back as raw JSON
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Field writes for a single record, submitted as part of a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingUpdate {
    pub record_id: String,
    pub fields: IndexMap<String, WriteValue>,
}
