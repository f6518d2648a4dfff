//! Property model and declared-type representation
//!
//! A `Property` is the uniform read-only view of one named, typed, annotated
//! member of a type, decoupled from how it was discovered. Synthetic container
//! elements are properties with no name. `TypeSpec` is the declared type with
//! its generic arguments already resolved; since Rust has no runtime
//! reflection, object types refer to schemas registered explicitly in the
//! [`TypeRegistry`](crate::metadata::TypeRegistry).

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Declared type of a property, generic arguments resolved
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeSpec {
    /// Boolean leaf type
    Bool,
    /// Integer leaf type
    Integer,
    /// Floating point leaf type
    Float,
    /// Text leaf type
    Text,
    /// Optional wrapper around an inner type
    Option(Box<TypeSpec>),
    /// Ordered collection of one element type
    List(Box<TypeSpec>),
    /// Collection of distinct elements of one element type
    Set(Box<TypeSpec>),
    /// Key/value container
    Map(Box<TypeSpec>, Box<TypeSpec>),
    /// Object type registered under a schema name
    Object(String),
}

/// Kind-level view of a type, used by assignability matchers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// Boolean
    Bool,
    /// Integer
    Integer,
    /// Float
    Float,
    /// Text
    Text,
    /// Optional wrapper
    Option,
    /// List container
    List,
    /// Set container
    Set,
    /// Map container
    Map,
    /// Registered object
    Object,
}

impl TypeSpec {
    /// Kind of this type, ignoring type arguments
    pub fn kind(&self) -> TypeKind {
        match self {
            TypeSpec::Bool => TypeKind::Bool,
            TypeSpec::Integer => TypeKind::Integer,
            TypeSpec::Float => TypeKind::Float,
            TypeSpec::Text => TypeKind::Text,
            TypeSpec::Option(_) => TypeKind::Option,
            TypeSpec::List(_) => TypeKind::List,
            TypeSpec::Set(_) => TypeKind::Set,
            TypeSpec::Map(_, _) => TypeKind::Map,
            TypeSpec::Object(_) => TypeKind::Object,
        }
    }

    /// Resolved generic type arguments, outermost level only
    pub fn type_arguments(&self) -> Vec<&TypeSpec> {
        match self {
            TypeSpec::Option(inner) | TypeSpec::List(inner) | TypeSpec::Set(inner) => {
                vec![inner]
            }
            TypeSpec::Map(key, value) => vec![key, value],
            _ => Vec::new(),
        }
    }

    /// Number of generic type arguments
    pub fn arity(&self) -> usize {
        self.type_arguments().len()
    }

    /// Whether this type carries elements rather than named properties
    pub fn is_container(&self) -> bool {
        matches!(
            self.kind(),
            TypeKind::Option | TypeKind::List | TypeKind::Set | TypeKind::Map
        )
    }

    /// Whether this type terminates decomposition
    pub fn is_leaf(&self) -> bool {
        matches!(
            self.kind(),
            TypeKind::Bool | TypeKind::Integer | TypeKind::Float | TypeKind::Text
        )
    }
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSpec::Bool => write!(f, "bool"),
            TypeSpec::Integer => write!(f, "integer"),
            TypeSpec::Float => write!(f, "float"),
            TypeSpec::Text => write!(f, "text"),
            TypeSpec::Option(inner) => write!(f, "option<{}>", inner),
            TypeSpec::List(inner) => write!(f, "list<{}>", inner),
            TypeSpec::Set(inner) => write!(f, "set<{}>", inner),
            TypeSpec::Map(key, value) => write!(f, "map<{}, {}>", key, value),
            TypeSpec::Object(name) => write!(f, "{}", name),
        }
    }
}

/// Opaque annotation marker attached to a property
///
/// The core never interprets annotations; collaborators match on them through
/// their own matchers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    /// Annotation name
    pub name: String,
    /// Optional free-form payload
    pub payload: Option<String>,
}

impl Annotation {
    /// Marker annotation with no payload
    pub fn new(name: impl Into<String>) -> Self {
        Annotation {
            name: name.into(),
            payload: None,
        }
    }

    /// Annotation carrying a payload string
    pub fn with_payload(name: impl Into<String>, payload: impl Into<String>) -> Self {
        Annotation {
            name: name.into(),
            payload: Some(payload.into()),
        }
    }
}

static NEXT_VOLATILE_IDENTITY: AtomicU64 = AtomicU64::new(1);

/// Uniform description of one member of a type
///
/// Equality is structural by default, which makes properties for the same
/// field interchangeable for caching. A property constructed through
/// [`Property::volatile`] instead compares by a per-construction identity,
/// the escape hatch dynamic-value collaborators use to defeat the cache.
#[derive(Debug, Clone)]
pub struct Property {
    name: Option<String>,
    type_spec: TypeSpec,
    annotations: Vec<Annotation>,
    nullable: bool,
    identity: Option<u64>,
}

impl Property {
    /// Named member of an object type
    pub fn new(name: impl Into<String>, type_spec: TypeSpec) -> Self {
        Property {
            name: Some(name.into()),
            type_spec,
            annotations: Vec::new(),
            nullable: false,
            identity: None,
        }
    }

    /// Synthetic unnamed property, used for container elements and roots
    pub fn element(type_spec: TypeSpec) -> Self {
        Property {
            name: None,
            type_spec,
            annotations: Vec::new(),
            nullable: false,
            identity: None,
        }
    }

    /// Mark this property nullable
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Attach an annotation marker
    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    /// Give this property a unique per-construction identity so the type
    /// cache re-resolves it on every access
    pub fn volatile(mut self) -> Self {
        self.identity = Some(NEXT_VOLATILE_IDENTITY.fetch_add(1, Ordering::Relaxed));
        self
    }

    /// Member name; `None` for synthetic container elements
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Declared type with resolved generic arguments
    pub fn type_spec(&self) -> &TypeSpec {
        &self.type_spec
    }

    /// Ordered annotation markers
    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    /// Whether the member may hold an absent value
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Whether the type cache may store the property sequence containing
    /// this property
    pub fn is_cacheable(&self) -> bool {
        self.identity.is_none()
    }
}

impl PartialEq for Property {
    fn eq(&self, other: &Property) -> bool {
        match (self.identity, other.identity) {
            (None, None) => {
                self.name == other.name
                    && self.type_spec == other.type_spec
                    && self.annotations == other.annotations
                    && self.nullable == other.nullable
            }
            (a, b) => a == b,
        }
    }
}

impl Eq for Property {}

/// How a tree node renders its own path segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyNameStrategy {
    /// Plain field name
    Field,
    /// Synthetic positional name, e.g. a container element index
    Positional,
}

/// A property placed among its siblings, ready for path resolution
#[derive(Debug, Clone)]
pub struct ObjectProperty {
    /// The underlying property
    pub property: Property,
    /// Position among siblings
    pub element_index: usize,
    /// How the path segment for this node renders
    pub name_strategy: PropertyNameStrategy,
}

impl ObjectProperty {
    /// Rendered path segment for diagnostics
    pub fn path_segment(&self) -> String {
        match (self.name_strategy, self.property.name()) {
            (PropertyNameStrategy::Field, Some(name)) => name.to_string(),
            _ => format!("[{}]", self.element_index),
        }
    }
}

/// Size bounds controlling how many element nodes a container materializes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArbitraryContainerInfo {
    /// Minimum element count, inclusive
    pub min_size: usize,
    /// Maximum element count, inclusive
    pub max_size: usize,
}

impl ArbitraryContainerInfo {
    /// Fixed-size bounds
    pub fn exactly(size: usize) -> Self {
        ArbitraryContainerInfo {
            min_size: size,
            max_size: size,
        }
    }

    /// Inclusive range bounds
    pub fn between(min_size: usize, max_size: usize) -> Self {
        ArbitraryContainerInfo { min_size, max_size }
    }

    /// All-apply composition of two size constraints. Bounds intersect; an
    /// empty intersection collapses to the later constraint's minimum.
    pub fn intersect(self, other: ArbitraryContainerInfo) -> Self {
        let min_size = self.min_size.max(other.min_size);
        let max_size = self.max_size.min(other.max_size).max(min_size);
        ArbitraryContainerInfo { min_size, max_size }
    }
}

impl Default for ArbitraryContainerInfo {
    fn default() -> Self {
        ArbitraryContainerInfo {
            min_size: 0,
            max_size: 3,
        }
    }
}

/// Layout of a multi-element node: element templates plus size bounds
///
/// Lists, sets and optionals carry one template; maps carry a key template
/// and a value template.
#[derive(Debug, Clone)]
pub struct ContainerProperty {
    /// Element property templates
    pub element_templates: Vec<Property>,
    /// Materialization bounds
    pub info: ArbitraryContainerInfo,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_equality_by_default() {
        let a = Property::new("age", TypeSpec::Integer);
        let b = Property::new("age", TypeSpec::Integer);
        assert_eq!(a, b);
    }

    #[test]
    fn volatile_properties_are_unique_per_construction() {
        let a = Property::new("token", TypeSpec::Text).volatile();
        let b = Property::new("token", TypeSpec::Text).volatile();
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
        assert!(!a.is_cacheable());
    }

    #[test]
    fn volatile_never_equals_structural() {
        let a = Property::new("token", TypeSpec::Text);
        let b = Property::new("token", TypeSpec::Text).volatile();
        assert_ne!(a, b);
    }

    #[test]
    fn type_arity() {
        assert_eq!(TypeSpec::Text.arity(), 0);
        assert_eq!(TypeSpec::List(Box::new(TypeSpec::Integer)).arity(), 1);
        assert_eq!(
            TypeSpec::Map(Box::new(TypeSpec::Text), Box::new(TypeSpec::Integer)).arity(),
            2
        );
    }

    #[test]
    fn container_info_intersection() {
        let a = ArbitraryContainerInfo::between(0, 3);
        let b = ArbitraryContainerInfo::exactly(5);
        let merged = a.intersect(b);
        assert_eq!(merged.min_size, 5);
        assert_eq!(merged.max_size, 5);
    }

    #[test]
    fn positional_path_segment() {
        let op = ObjectProperty {
            property: Property::element(TypeSpec::Integer),
            element_index: 2,
            name_strategy: PropertyNameStrategy::Positional,
        };
        assert_eq!(op.path_segment(), "[2]");
    }
}
