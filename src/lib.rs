//! # Specimen
//!
//! A randomized test-fixture generation engine. Given a structured type,
//! specimen builds a property-tree model of it, produces randomized values
//! for every leaf through a chain of matchers and introspectors, recomposes
//! them into whole instances, and lets callers override any path in the tree
//! (fixed values, custom generators, filters, size bounds) before sampling.
//!
//! Randomness flows through a seedable `ChaCha8Rng`; a fixed seed makes
//! single-threaded sampling reproducible bit-for-bit.

pub mod combinable;
pub mod customizer;
pub mod engine;
pub mod error;
pub mod expression;
pub mod introspector;
pub mod matcher;
pub mod metadata;
pub mod options;
pub mod property;
pub mod tree;
pub mod value;

// Re-export core types for easy access
pub use combinable::{new_value_set, CombinableArbitrary, SharedArbitrary, SharedValueSet};
pub use customizer::{CustomizerRegistry, Effect};
pub use engine::{FixtureEngine, FixtureSampler};
pub use error::{FixtureError, FixtureResult};
pub use expression::{ExpressionPath, Segment};
pub use introspector::{
    ArbitraryIntrospector, Introspected, IntrospectContext, PrimitiveIntrospector,
};
pub use matcher::{
    intersect, AllOf, AnyOf, AssignableType, ExactType, GenericArity, Matcher, MatcherExt,
    NameContains, Not,
};
pub use metadata::{TypeRegistry, TypeSchema};
pub use options::{FixtureOptions, FixtureOptionsBuilder, GenerationConfig, Plugin};
pub use property::{
    Annotation, ArbitraryContainerInfo, ContainerProperty, ObjectProperty, Property,
    PropertyNameStrategy, TypeKind, TypeSpec,
};
pub use tree::{
    ContainerPropertyGenerator, DefaultContainerPropertyGenerator, DefaultObjectPropertyGenerator,
    FilterPredicate, GeneratorContext, NodeKind, ObjectPropertyGenerator, PropertyNode,
    TreeBuilder, ValueOverride,
};
pub use value::{ObjectValue, Value};
