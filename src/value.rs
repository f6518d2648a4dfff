//! Dynamic instance representation
//!
//! Generated fixtures are recomposed into `Value` trees. The representation is
//! deliberately untyped at the edges: collaborators produce and consume plain
//! values, and the property tree is what gives them shape. Equality and
//! hashing treat floats by bit pattern so values can live in uniqueness sets.

use std::fmt;
use std::hash::{Hash, Hasher};

/// A generated fixture value
#[derive(Debug, Clone)]
pub enum Value {
    /// Absent value (nullable property, exceeded depth, empty optional)
    Null,
    /// Boolean leaf
    Bool(bool),
    /// Integer leaf
    Int(i64),
    /// Floating point leaf
    Float(f64),
    /// Text leaf
    Text(String),
    /// Ordered collection (lists and sets both materialize here)
    List(Vec<Value>),
    /// Ordered key/value pairs
    Map(Vec<(Value, Value)>),
    /// Assembled object instance
    Object(ObjectValue),
}

/// An assembled object: its registered type name plus ordered named fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectValue {
    /// Name the type was registered under
    pub type_name: String,
    /// Fields in declared property order
    pub fields: Vec<(String, Value)>,
}

impl ObjectValue {
    /// Look up a field by name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }
}

impl Value {
    /// Field access on object values; `None` for every other variant
    pub fn get(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Object(object) => object.get(name),
            _ => None,
        }
    }

    /// Element access on list values
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Entry access on map values
    pub fn as_map(&self) -> Option<&[(Value, Value)]> {
        match self {
            Value::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Whether this is the absent value
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Integer payload, if any
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Text payload, if any
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            // Bit-pattern comparison: NaN == NaN, 0.0 != -0.0. Uniqueness
            // sets need reflexive equality, which IEEE comparison breaks.
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::Int(n) => n.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Text(s) => s.hash(state),
            Value::List(items) => items.hash(state),
            Value::Map(entries) => entries.hash(state),
            Value::Object(object) => {
                object.type_name.hash(state);
                object.fields.hash(state);
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
            Value::Text(s) => write!(f, "{:?}", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
            Value::Object(object) => {
                write!(f, "{} {{", object.type_name)?;
                for (i, (name, value)) in object.fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, " {}: {}", name, value)?;
                }
                write!(f, " }}")
            }
        }
    }
}
