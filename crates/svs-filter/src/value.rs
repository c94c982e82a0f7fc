//! [`FilterValue`] – the uniform value type flowing between filters.
//!
//! A closed [`Value`] enum carries the payload; [`FilterValue`] adds the
//! dirty flag consumers use to tell whether they have already mirrored the
//! current payload.
//!
//! # Equality
//!
//! | Payload | Compares |
//! |---|---|
//! | `Int`, `Float`, `Bool`, `Str` | structurally, same variant only |
//! | `Node`, `Struct` | never equal to another instance |
//!
//! The second row is deliberately conservative: a node reference may stand
//! for geometry that moved, so it is always treated as different.
//!
//! # Example
//!
//! ```rust
//! use svs_filter::value::FilterValue;
//!
//! let mut v = FilterValue::from(3_i64);
//! assert_eq!(v.get::<i64>(), Some(3));
//! assert_eq!(v.get::<f64>(), Some(3.0)); // ints widen to floats
//! assert_eq!(v.get::<bool>(), None);
//!
//! v.clear_dirty();
//! assert!(!v.set(3_i64));
//! assert!(!v.is_dirty());
//! assert!(v.set(4_i64));
//! assert!(v.is_dirty());
//! ```

use std::collections::BTreeMap;

use svs_types::NodeId;

/// Reference to a scene node, as carried through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeRef {
    pub id: NodeId,
    pub name: String,
}

/// The payload of a [`FilterValue`].
#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Node(NodeRef),
    /// Named sub-values, e.g. the `x`/`y`/`z` of a position.
    Struct(Vec<(String, Value)>),
}

impl Value {
    /// Human-readable variant name used in type-mismatch errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::Str(_) => "string",
            Value::Node(_) => "node",
            Value::Struct(_) => "struct",
        }
    }

    /// Conservative equality, see the module docs.
    pub fn same_as(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            _ => false,
        }
    }

    /// Flatten into `sub-field → text`.  Scalars use the empty key.
    pub fn rep(&self) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        self.rep_into("", &mut out);
        out
    }

    fn rep_into(&self, prefix: &str, out: &mut BTreeMap<String, String>) {
        match self {
            Value::Int(i) => {
                out.insert(prefix.to_string(), i.to_string());
            }
            Value::Float(f) => {
                out.insert(prefix.to_string(), f.to_string());
            }
            Value::Bool(b) => {
                out.insert(prefix.to_string(), b.to_string());
            }
            Value::Str(s) => {
                out.insert(prefix.to_string(), s.clone());
            }
            Value::Node(n) => {
                out.insert(join_key(prefix, "id"), n.name.clone());
            }
            Value::Struct(fields) => {
                for (name, v) in fields {
                    v.rep_into(&join_key(prefix, name), out);
                }
            }
        }
    }
}

fn join_key(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::Node(n) => write!(f, "{}", n.name),
            Value::Struct(fields) => {
                write!(f, "(")?;
                for (i, (name, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{name}:{v}")?;
                }
                write!(f, ")")
            }
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<NodeRef> for Value {
    fn from(v: NodeRef) -> Self {
        Value::Node(v)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Typed extraction
// ─────────────────────────────────────────────────────────────────────────────

/// Types that can be read out of a [`Value`].
pub trait FromValue: Sized {
    /// Name reported when extraction fails.
    const TYPE_NAME: &'static str;

    fn from_value(v: &Value) -> Option<Self>;
}

impl FromValue for i64 {
    const TYPE_NAME: &'static str = "int";

    fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl FromValue for f64 {
    const TYPE_NAME: &'static str = "float";

    fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }
}

impl FromValue for bool {
    const TYPE_NAME: &'static str = "bool";

    fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl FromValue for String {
    const TYPE_NAME: &'static str = "string";

    fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::Str(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl FromValue for NodeRef {
    const TYPE_NAME: &'static str = "node";

    fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::Node(n) => Some(n.clone()),
            _ => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// FilterValue
// ─────────────────────────────────────────────────────────────────────────────

/// A [`Value`] plus a dirty flag.
///
/// The flag starts set.  Consumers clear it once they have observed the
/// payload; [`set`][FilterValue::set] raises it again when the payload
/// actually changes.
#[derive(Debug, Clone)]
pub struct FilterValue {
    value: Value,
    dirty: bool,
}

impl FilterValue {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            dirty: true,
        }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Typed read.  `None` when the payload is not a `T`.
    pub fn get<T: FromValue>(&self) -> Option<T> {
        T::from_value(&self.value)
    }

    /// Replace the payload.  Returns `true` (and marks the value dirty) when
    /// the new payload differs from the old one.
    pub fn set(&mut self, value: impl Into<Value>) -> bool {
        let value = value.into();
        if self.value.same_as(&value) {
            return false;
        }
        self.value = value;
        self.dirty = true;
        true
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    pub fn rep(&self) -> BTreeMap<String, String> {
        self.value.rep()
    }
}

macro_rules! filter_value_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for FilterValue {
                fn from(v: $t) -> Self {
                    FilterValue::new(v)
                }
            }
        )*
    };
}

filter_value_from!(i64, f64, bool, &str, String, NodeRef, Value);

impl PartialEq for FilterValue {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other) || self.value.same_as(&other.value)
    }
}

impl std::fmt::Display for FilterValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.value.fmt(f)
    }
}
