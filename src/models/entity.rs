use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use thiserror::Error;
use uuid::Uuid;

use super::kind::{AttrType, KindSpec};

/// Lifecycle keys managed by the entity itself. `update` silently skips
/// them; `restore` consumes them before reading domain attributes.
pub const PROTECTED_FIELDS: &[&str] = &["id", "created_at", "updated_at", "__class__"];

/// Model-layer errors.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unknown kind {0:?}")]
    UnknownKind(String),

    #[error("attribute {name:?} expects {expected}, got {value}")]
    MalformedAttribute {
        name: String,
        expected: &'static str,
        value: String,
    },
}

fn malformed(name: &str, expected: &'static str, value: impl ToString) -> ModelError {
    ModelError::MalformedAttribute {
        name: name.to_string(),
        expected,
        value: value.to_string(),
    }
}

/// A single domain attribute value. The JSON form is untagged: numbers
/// persist as JSON numbers, strings as JSON strings, lists as JSON arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Int(i64),
    Float(f64),
    Str(String),
    StrList(Vec<String>),
}

impl AttrValue {
    /// Best-effort coercion for undeclared attributes: numeric-looking
    /// values become numbers, everything else stays a string.
    pub fn from_raw(raw: &str) -> Self {
        if let Ok(n) = raw.parse::<i64>() {
            return Self::Int(n);
        }
        if let Ok(f) = raw.parse::<f64>() {
            // "inf" and "NaN" parse as f64 but have no JSON form.
            if f.is_finite() {
                return Self::Float(f);
            }
        }
        Self::Str(raw.to_string())
    }

    /// Coerce a raw textual value to a declared type.
    fn coerce_raw(name: &str, ty: AttrType, raw: &str) -> Result<Self, ModelError> {
        match ty {
            AttrType::Str => Ok(Self::Str(raw.to_string())),
            AttrType::Int => raw
                .trim()
                .parse::<i64>()
                .map(Self::Int)
                .map_err(|_| malformed(name, ty.describe(), format!("{raw:?}"))),
            AttrType::Float => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(Self::Float)
                .ok_or_else(|| malformed(name, ty.describe(), format!("{raw:?}"))),
            AttrType::StrList => Err(malformed(name, ty.describe(), format!("{raw:?}"))),
        }
    }

    /// Coerce a persisted JSON value to a declared type. Numeric strings
    /// become numbers where the declaration is numeric.
    fn coerce_json(name: &str, ty: AttrType, value: &Value) -> Result<Self, ModelError> {
        let coerced = match (ty, value) {
            (AttrType::Str, Value::String(s)) => Some(Self::Str(s.clone())),
            (AttrType::Str, Value::Number(n)) => Some(Self::Str(n.to_string())),
            (AttrType::Int, Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
                .map(Self::Int),
            (AttrType::Int, Value::String(s)) => s.trim().parse::<i64>().ok().map(Self::Int),
            (AttrType::Float, Value::Number(n)) => {
                n.as_f64().filter(|f| f.is_finite()).map(Self::Float)
            }
            (AttrType::Float, Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(Self::Float),
            (AttrType::StrList, Value::Array(items)) => items
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
                .map(Self::StrList),
            _ => None,
        };
        coerced.ok_or_else(|| malformed(name, ty.describe(), value))
    }

    /// Type a persisted JSON value with no declaration from its shape alone.
    fn from_json(name: &str, value: &Value) -> Result<Self, ModelError> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(Self::Float))
                .ok_or_else(|| malformed(name, "a finite number", value)),
            Value::String(s) => Ok(Self::Str(s.clone())),
            Value::Array(items) => items
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
                .map(Self::StrList)
                .ok_or_else(|| malformed(name, "a string list", value)),
            _ => Err(malformed(name, "a string, number, or string list", value)),
        }
    }

    fn to_json(&self) -> Value {
        match self {
            Self::Int(n) => Value::Number((*n).into()),
            // Finite by construction; Null is unreachable.
            Self::Float(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
            Self::Str(s) => Value::String(s.clone()),
            Self::StrList(items) => {
                Value::Array(items.iter().cloned().map(Value::String).collect())
            }
        }
    }
}

/// One instance of a domain kind.
///
/// Every entity carries an opaque globally-unique `id` (immutable after
/// creation), `created_at` (set once) and `updated_at` (refreshed by
/// [`Entity::touch`] on every persisted mutation), plus the domain
/// attributes declared by its [`KindSpec`] and any overflow attributes
/// found in a persisted document.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    kind: &'static KindSpec,
    id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    attrs: BTreeMap<String, AttrValue>,
}

impl Entity {
    /// Fresh entity: new identity, both timestamps at now, declared
    /// attributes at their defaults.
    pub fn new(kind: &'static KindSpec) -> Self {
        let now = Utc::now();
        let attrs = kind
            .fields
            .iter()
            .map(|f| (f.name.to_string(), f.ty.default_value()))
            .collect();
        Self {
            kind,
            id: Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
            attrs,
        }
    }

    /// Rebuild an entity from a persisted attribute mapping.
    ///
    /// `id`, `created_at` and `updated_at` are required and consumed
    /// verbatim; identity and timestamps are never regenerated here.
    /// Declared attributes are coerced to their declared type; unrecognized
    /// keys become extra domain attributes typed from their JSON shape.
    pub fn restore(kind: &'static KindSpec, doc: &Map<String, Value>) -> Result<Self, ModelError> {
        let id = doc
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| malformed("id", "an identity string", doc.get("id").unwrap_or(&Value::Null)))?
            .to_string();
        let created_at = parse_timestamp("created_at", doc)?;
        let updated_at = parse_timestamp("updated_at", doc)?;

        let mut attrs = BTreeMap::new();
        for (key, value) in doc {
            if PROTECTED_FIELDS.contains(&key.as_str()) {
                continue;
            }
            let parsed = match kind.field(key) {
                Some(field) => AttrValue::coerce_json(key, field.ty, value)?,
                None => AttrValue::from_json(key, value)?,
            };
            attrs.insert(key.clone(), parsed);
        }
        // Declared attributes absent from the document fall back to defaults.
        for field in kind.fields {
            attrs
                .entry(field.name.to_string())
                .or_insert_with(|| field.ty.default_value());
        }

        Ok(Self {
            kind,
            id,
            created_at,
            updated_at,
            attrs,
        })
    }

    pub fn kind_name(&self) -> &'static str {
        self.kind.name
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.get(name)
    }

    /// Composite storage key, `Kind.id`.
    pub fn key(&self) -> String {
        format!("{}.{}", self.kind.name, self.id)
    }

    /// Refresh `updated_at`. Called by every mutating operation that is
    /// meant to persist.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Set one attribute from its textual form.
    ///
    /// Protected lifecycle fields are silently skipped. Declared attributes
    /// coerce to their declared type; undeclared attributes get best-effort
    /// numeric coercion and are created if absent.
    pub fn set_attr(&mut self, name: &str, raw: &str) -> Result<(), ModelError> {
        if PROTECTED_FIELDS.contains(&name) {
            return Ok(());
        }
        let value = match self.kind.field(name) {
            Some(field) => AttrValue::coerce_raw(name, field.ty, raw)?,
            None => AttrValue::from_raw(raw),
        };
        self.attrs.insert(name.to_string(), value);
        Ok(())
    }

    /// Serialized attribute mapping: lifecycle fields with RFC 3339
    /// timestamps, the `__class__` marker, and every domain attribute.
    /// Key order is stable per kind.
    pub fn to_document(&self) -> Map<String, Value> {
        let mut doc = Map::new();
        doc.insert("__class__".into(), Value::String(self.kind.name.into()));
        doc.insert("id".into(), Value::String(self.id.clone()));
        doc.insert(
            "created_at".into(),
            Value::String(self.created_at.to_rfc3339()),
        );
        doc.insert(
            "updated_at".into(),
            Value::String(self.updated_at.to_rfc3339()),
        );
        for (name, value) in &self.attrs {
            doc.insert(name.clone(), value.to_json());
        }
        doc
    }

    /// Human-readable form, `[Kind] (id) {attributes}`. Display only, never
    /// parsed back.
    pub fn describe(&self) -> String {
        format!(
            "[{}] ({}) {}",
            self.kind.name,
            self.id,
            Value::Object(self.to_document())
        )
    }
}

fn parse_timestamp(name: &str, doc: &Map<String, Value>) -> Result<DateTime<Utc>, ModelError> {
    let value = doc.get(name).unwrap_or(&Value::Null);
    let text = value
        .as_str()
        .ok_or_else(|| malformed(name, "a timestamp string", value))?;
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }
    // Offset-less ISO form written by older tooling; read as UTC.
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|dt| dt.and_utc())
        .map_err(|_| malformed(name, "a timestamp string", value))
}
