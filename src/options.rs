//! Options assembly: ordered extension-point chains and global config
//!
//! The builder is the only mutable surface. Each extension point keeps an
//! ordered chain of (matcher, collaborator) entries; `insert_first` gives an
//! entry priority over everything registered before it, which is how later
//! plugins override built-in behavior for conflicting type claims. `build`
//! consumes the builder into an immutable snapshot, so no registration can
//! happen once concurrent samplers hold the options.

use crate::introspector::{ArbitraryIntrospector, PrimitiveIntrospector};
use crate::matcher::{AnyOf, AssignableType, Matcher};
use crate::metadata::TypeRegistry;
use crate::property::{ArbitraryContainerInfo, Property, TypeKind};
use crate::tree::{
    ContainerPropertyGenerator, DefaultContainerPropertyGenerator, DefaultObjectPropertyGenerator,
    ObjectPropertyGenerator,
};
use std::sync::Arc;

/// Global generation configuration
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Default container size bounds
    pub container_info: ArbitraryContainerInfo,
    /// Probability that a nullable property samples as null
    pub null_probability: f64,
    /// Maximum decomposition depth before a branch is cut off
    pub max_depth: usize,
    /// Default retry budget for filter and uniqueness wrappers
    pub retry_budget: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        GenerationConfig {
            container_info: ArbitraryContainerInfo::default(),
            null_probability: 0.15,
            max_depth: 8,
            retry_budget: 1000,
        }
    }
}

type ObjectEntry = (Box<dyn Matcher>, Box<dyn ObjectPropertyGenerator>);
type ContainerEntry = (Box<dyn Matcher>, Box<dyn ContainerPropertyGenerator>);
type IntrospectorEntry = (Box<dyn Matcher>, Box<dyn ArbitraryIntrospector>);

/// Collaborator bundle registered through the builder
pub trait Plugin {
    /// Register matchers, generators and introspectors. The builder is the
    /// only side channel a plugin gets.
    fn accept(&self, builder: &mut FixtureOptionsBuilder);
}

/// Mutable assembly for one engine configuration
pub struct FixtureOptionsBuilder {
    registry: Arc<TypeRegistry>,
    object_generators: Vec<ObjectEntry>,
    container_generators: Vec<ContainerEntry>,
    introspectors: Vec<IntrospectorEntry>,
    config: GenerationConfig,
}

impl FixtureOptionsBuilder {
    /// Builder pre-loaded with the built-in object generator, container
    /// generators and primitive introspector
    pub fn new() -> Self {
        let mut builder = FixtureOptionsBuilder {
            registry: Arc::new(TypeRegistry::new()),
            object_generators: Vec::new(),
            container_generators: Vec::new(),
            introspectors: Vec::new(),
            config: GenerationConfig::default(),
        };
        builder.insert_last_object_generator(
            Box::new(AssignableType(TypeKind::Object)),
            Box::new(DefaultObjectPropertyGenerator),
        );
        builder.insert_last_container_generator(
            Box::new(AnyOf(vec![
                Box::new(AssignableType(TypeKind::Option)),
                Box::new(AssignableType(TypeKind::List)),
                Box::new(AssignableType(TypeKind::Set)),
                Box::new(AssignableType(TypeKind::Map)),
            ])),
            Box::new(DefaultContainerPropertyGenerator),
        );
        builder.insert_last_introspector(
            Box::new(AnyOf(vec![
                Box::new(AssignableType(TypeKind::Bool)),
                Box::new(AssignableType(TypeKind::Integer)),
                Box::new(AssignableType(TypeKind::Float)),
                Box::new(AssignableType(TypeKind::Text)),
            ])),
            Box::new(PrimitiveIntrospector),
        );
        builder
    }

    /// Schema registry this configuration will consult
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Give an object generator priority over every existing entry
    pub fn insert_first_object_generator(
        &mut self,
        matcher: Box<dyn Matcher>,
        generator: Box<dyn ObjectPropertyGenerator>,
    ) {
        self.object_generators.insert(0, (matcher, generator));
    }

    /// Append an object generator after every existing entry
    pub fn insert_last_object_generator(
        &mut self,
        matcher: Box<dyn Matcher>,
        generator: Box<dyn ObjectPropertyGenerator>,
    ) {
        self.object_generators.push((matcher, generator));
    }

    /// Give a container generator priority over every existing entry
    pub fn insert_first_container_generator(
        &mut self,
        matcher: Box<dyn Matcher>,
        generator: Box<dyn ContainerPropertyGenerator>,
    ) {
        self.container_generators.insert(0, (matcher, generator));
    }

    /// Append a container generator after every existing entry
    pub fn insert_last_container_generator(
        &mut self,
        matcher: Box<dyn Matcher>,
        generator: Box<dyn ContainerPropertyGenerator>,
    ) {
        self.container_generators.push((matcher, generator));
    }

    /// Give an introspector priority over every existing entry
    pub fn insert_first_introspector(
        &mut self,
        matcher: Box<dyn Matcher>,
        introspector: Box<dyn ArbitraryIntrospector>,
    ) {
        self.introspectors.insert(0, (matcher, introspector));
    }

    /// Append an introspector after every existing entry
    pub fn insert_last_introspector(
        &mut self,
        matcher: Box<dyn Matcher>,
        introspector: Box<dyn ArbitraryIntrospector>,
    ) {
        self.introspectors.push((matcher, introspector));
    }

    /// Default container size bounds
    pub fn container_info(&mut self, info: ArbitraryContainerInfo) -> &mut Self {
        self.config.container_info = info;
        self
    }

    /// Null probability for nullable properties
    pub fn null_probability(&mut self, probability: f64) -> &mut Self {
        self.config.null_probability = probability;
        self
    }

    /// Maximum decomposition depth
    pub fn max_depth(&mut self, max_depth: usize) -> &mut Self {
        self.config.max_depth = max_depth;
        self
    }

    /// Retry budget for filter and uniqueness wrappers
    pub fn retry_budget(&mut self, retry_budget: usize) -> &mut Self {
        self.config.retry_budget = retry_budget;
        self
    }

    /// Let a plugin register its collaborators. Plugins run in application
    /// order; a later plugin using `insert_first` wins conflicting claims.
    pub fn plugin(&mut self, plugin: &dyn Plugin) -> &mut Self {
        plugin.accept(self);
        self
    }

    /// Snapshot into an immutable configuration
    pub fn build(self) -> FixtureOptions {
        FixtureOptions {
            inner: Arc::new(OptionsInner {
                registry: self.registry,
                object_generators: self.object_generators,
                container_generators: self.container_generators,
                introspectors: self.introspectors,
                config: self.config,
            }),
        }
    }
}

impl Default for FixtureOptionsBuilder {
    fn default() -> Self {
        FixtureOptionsBuilder::new()
    }
}

struct OptionsInner {
    registry: Arc<TypeRegistry>,
    object_generators: Vec<ObjectEntry>,
    container_generators: Vec<ContainerEntry>,
    introspectors: Vec<IntrospectorEntry>,
    config: GenerationConfig,
}

/// Immutable configuration snapshot shared by concurrent samplers
#[derive(Clone)]
pub struct FixtureOptions {
    inner: Arc<OptionsInner>,
}

impl FixtureOptions {
    /// Global generation configuration
    pub fn config(&self) -> &GenerationConfig {
        &self.inner.config
    }

    /// Schema registry
    pub fn registry(&self) -> &TypeRegistry {
        &self.inner.registry
    }

    /// First object generator whose matcher claims the property
    pub fn first_object_generator(&self, property: &Property) -> Option<&dyn ObjectPropertyGenerator> {
        self.inner
            .object_generators
            .iter()
            .find(|(matcher, _)| matcher.matches(property))
            .map(|(_, generator)| generator.as_ref())
    }

    /// First container generator whose matcher claims the property
    pub fn first_container_generator(
        &self,
        property: &Property,
    ) -> Option<&dyn ContainerPropertyGenerator> {
        self.inner
            .container_generators
            .iter()
            .find(|(matcher, _)| matcher.matches(property))
            .map(|(_, generator)| generator.as_ref())
    }

    /// Introspector chain entries whose matcher claims the property, in
    /// priority order. The pipeline asks each until one claims.
    pub fn matching_introspectors<'a>(
        &'a self,
        property: &'a Property,
    ) -> impl Iterator<Item = &'a dyn ArbitraryIntrospector> {
        self.inner
            .introspectors
            .iter()
            .filter(move |(matcher, _)| matcher.matches(property))
            .map(|(_, introspector)| introspector.as_ref())
    }
}
