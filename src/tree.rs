//! Property tree construction
//!
//! The builder decomposes a declared type into a tree of object, container
//! and leaf nodes by consulting the ordered generator chains: the first
//! matcher accepting a property wins, first-match not best-match. Recursion
//! carries an explicit seen-types branch stack; revisiting a type already on
//! the current branch, or exceeding the configured depth, terminates that
//! branch with an absent node that samples as `Null`. A type claimed by no
//! chain entry is a configuration error, never silently defaulted.

use crate::combinable::SharedArbitrary;
use crate::customizer::CustomizerRegistry;
use crate::error::{FixtureError, FixtureResult};
use crate::expression::Segment;
use crate::metadata::TypeRegistry;
use crate::options::FixtureOptions;
use crate::property::{
    ArbitraryContainerInfo, ContainerProperty, ObjectProperty, Property, PropertyNameStrategy,
    TypeSpec,
};
use crate::value::Value;
use log::debug;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::fmt;
use std::sync::Arc;

/// Context handed to object/container property generators
pub struct GeneratorContext<'a> {
    /// The property whose type is being decomposed
    pub property: &'a Property,
    /// Schema registry for member discovery
    pub registry: &'a TypeRegistry,
    /// Size bounds already merged from global config and path overrides
    pub container_info: ArbitraryContainerInfo,
}

/// Collaborator that turns a property-bearing type into its ordered members
pub trait ObjectPropertyGenerator: Send + Sync {
    /// Ordered child properties of the claimed type
    fn generate(&self, ctx: &GeneratorContext<'_>) -> FixtureResult<Vec<ObjectProperty>>;
}

/// Collaborator that turns an element-bearing type into its container layout
pub trait ContainerPropertyGenerator: Send + Sync {
    /// Element templates plus size bounds for the claimed type
    fn generate(&self, ctx: &GeneratorContext<'_>) -> FixtureResult<ContainerProperty>;
}

/// Built-in object decomposition backed by the schema registry
#[derive(Debug, Default)]
pub struct DefaultObjectPropertyGenerator;

impl ObjectPropertyGenerator for DefaultObjectPropertyGenerator {
    fn generate(&self, ctx: &GeneratorContext<'_>) -> FixtureResult<Vec<ObjectProperty>> {
        let type_name = match ctx.property.type_spec() {
            TypeSpec::Object(name) => name,
            other => {
                return Err(FixtureError::UnsupportedType {
                    type_spec: other.to_string(),
                })
            }
        };
        let properties = ctx.registry.get_properties(type_name)?;
        Ok(properties
            .iter()
            .enumerate()
            .map(|(index, property)| ObjectProperty {
                property: property.clone(),
                element_index: index,
                name_strategy: if property.name().is_some() {
                    PropertyNameStrategy::Field
                } else {
                    PropertyNameStrategy::Positional
                },
            })
            .collect())
    }
}

/// Built-in container layout for optionals, lists, sets and maps
#[derive(Debug, Default)]
pub struct DefaultContainerPropertyGenerator;

impl ContainerPropertyGenerator for DefaultContainerPropertyGenerator {
    fn generate(&self, ctx: &GeneratorContext<'_>) -> FixtureResult<ContainerProperty> {
        match ctx.property.type_spec() {
            TypeSpec::Option(inner) => Ok(ContainerProperty {
                element_templates: vec![Property::element((**inner).clone())],
                info: ArbitraryContainerInfo::exactly(1),
            }),
            TypeSpec::List(element) | TypeSpec::Set(element) => Ok(ContainerProperty {
                element_templates: vec![Property::element((**element).clone())],
                info: ctx.container_info,
            }),
            TypeSpec::Map(key, value) => Ok(ContainerProperty {
                element_templates: vec![
                    Property::element((**key).clone()),
                    Property::element((**value).clone()),
                ],
                info: ctx.container_info,
            }),
            other => Err(FixtureError::UnsupportedType {
                type_spec: other.to_string(),
            }),
        }
    }
}

/// Value-producing override applied to a node; later registrations replace
/// earlier ones
#[derive(Debug)]
pub enum ValueOverride {
    /// Always produce this value
    Fixed(Value),
    /// Delegate to a caller-supplied combinator, possibly shared across a
    /// wildcard fan-out
    Generator(SharedArbitrary),
}

/// Acceptance predicate attached by an `AddFilter` override
pub type FilterPredicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Override state accumulated on a node before sampling
#[derive(Default)]
pub struct NodeOverrides {
    /// Last-registered value-producing override, if any
    pub value: Option<ValueOverride>,
    /// Additive filters, applied in registration order
    pub filters: Vec<FilterPredicate>,
    /// Null probability override for this node
    pub null_probability: Option<f64>,
}

impl fmt::Debug for NodeOverrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeOverrides")
            .field("value", &self.value)
            .field("filters", &self.filters.len())
            .field("null_probability", &self.null_probability)
            .finish()
    }
}

/// Structural kind of a materialized tree node
#[derive(Debug)]
pub enum NodeKind {
    /// Primitive terminal resolved through the introspector chain
    Leaf,
    /// Cycle or depth cut-off; samples as `Null`
    Absent,
    /// Property-bearing node with ordered children
    Object {
        /// Registered type name, used for assembly
        type_name: String,
        /// Children in declared property order
        children: Vec<PropertyNode>,
    },
    /// Ordered element container
    List {
        /// One node per materialized element
        children: Vec<PropertyNode>,
    },
    /// Distinct-element container
    Set {
        /// One node per materialized element
        children: Vec<PropertyNode>,
    },
    /// Key/value container
    Map {
        /// One (key, value) node pair per materialized entry
        entries: Vec<(PropertyNode, PropertyNode)>,
    },
    /// Optional wrapper; nullability is decided at sample time
    Optional {
        /// The wrapped node, transparent for path resolution
        inner: Box<PropertyNode>,
    },
}

/// One materialized node of the property tree
#[derive(Debug)]
pub struct PropertyNode {
    /// The property this node materializes, with its sibling position
    pub object_property: ObjectProperty,
    /// Structural kind
    pub kind: NodeKind,
    /// Overrides applied by the customizer registry
    pub overrides: NodeOverrides,
    /// Concrete path from the root, used for override matching
    pub path: Vec<Segment>,
}

impl PropertyNode {
    /// Rendered path for diagnostics; the root renders as `$`
    pub fn rendered_path(&self) -> String {
        render(&self.path)
    }
}

/// Recursive tree builder over one options snapshot
pub struct TreeBuilder<'a> {
    options: &'a FixtureOptions,
    customizers: &'a CustomizerRegistry,
}

impl<'a> TreeBuilder<'a> {
    /// Builder consulting the given options and override registry
    pub fn new(options: &'a FixtureOptions, customizers: &'a CustomizerRegistry) -> Self {
        TreeBuilder {
            options,
            customizers,
        }
    }

    /// Decompose a root type into a property tree. Container sizes are
    /// decided here, drawing from `rng`, so the tree shape is reproducible
    /// for a fixed seed.
    pub fn build(&self, root: &TypeSpec, rng: &mut ChaCha8Rng) -> FixtureResult<PropertyNode> {
        let root_property = ObjectProperty {
            property: Property::element(root.clone()),
            element_index: 0,
            name_strategy: PropertyNameStrategy::Positional,
        };
        let mut branch = Vec::new();
        let mut path = Vec::new();
        self.build_node(root_property, 0, &mut branch, &mut path, rng)
    }

    fn build_node(
        &self,
        object_property: ObjectProperty,
        depth: usize,
        branch: &mut Vec<String>,
        path: &mut Vec<Segment>,
        rng: &mut ChaCha8Rng,
    ) -> FixtureResult<PropertyNode> {
        let config = self.options.config();
        let spec = object_property.property.type_spec().clone();

        if depth >= config.max_depth && !spec.is_leaf() {
            debug!(
                "depth limit {} reached at `{}`, terminating branch",
                config.max_depth,
                render(path)
            );
            return Ok(self.node(object_property, NodeKind::Absent, path));
        }

        if let Some(generator) = self
            .options
            .first_container_generator(&object_property.property)
        {
            let merged_info = self
                .customizers
                .container_info_for(path, config.container_info);
            let ctx = GeneratorContext {
                property: &object_property.property,
                registry: self.options.registry(),
                container_info: merged_info,
            };
            let container = generator.generate(&ctx)?;
            let kind = self.build_container(&spec, container, depth, branch, path, rng)?;
            return Ok(self.node(object_property, kind, path));
        }

        if let Some(generator) = self
            .options
            .first_object_generator(&object_property.property)
        {
            if let TypeSpec::Object(type_name) = &spec {
                if branch.iter().any(|seen| seen == type_name) {
                    debug!(
                        "cycle on type `{}` at `{}`, terminating branch",
                        type_name,
                        render(path)
                    );
                    return Ok(self.node(object_property, NodeKind::Absent, path));
                }
            }
            let ctx = GeneratorContext {
                property: &object_property.property,
                registry: self.options.registry(),
                container_info: config.container_info,
            };
            let members = generator.generate(&ctx)?;
            let type_name = match &spec {
                TypeSpec::Object(name) => name.clone(),
                other => other.to_string(),
            };

            branch.push(type_name.clone());
            let mut children = Vec::with_capacity(members.len());
            for member in members {
                let segment = match member.property.name() {
                    Some(name) => Segment::Property(name.to_string()),
                    None => Segment::Element(member.element_index),
                };
                path.push(segment);
                let child = self.build_node(member, depth + 1, branch, path, rng)?;
                path.pop();
                children.push(child);
            }
            branch.pop();

            return Ok(self.node(
                object_property,
                NodeKind::Object {
                    type_name,
                    children,
                },
                path,
            ));
        }

        if spec.is_leaf() {
            return Ok(self.node(object_property, NodeKind::Leaf, path));
        }

        Err(FixtureError::UnsupportedType {
            type_spec: spec.to_string(),
        })
    }

    fn build_container(
        &self,
        spec: &TypeSpec,
        container: ContainerProperty,
        depth: usize,
        branch: &mut Vec<String>,
        path: &mut Vec<Segment>,
        rng: &mut ChaCha8Rng,
    ) -> FixtureResult<NodeKind> {
        match spec {
            TypeSpec::Option(_) => {
                let template = element_template(&container, 0, spec)?;
                // Transparent for paths: the inner node shares this path.
                let inner = self.build_node(
                    positioned(template, 0),
                    depth + 1,
                    branch,
                    path,
                    rng,
                )?;
                Ok(NodeKind::Optional {
                    inner: Box::new(inner),
                })
            }
            TypeSpec::Map(_, _) => {
                let key_template = element_template(&container, 0, spec)?;
                let value_template = element_template(&container, 1, spec)?;
                let count = sample_size(container.info, rng);
                let mut entries = Vec::with_capacity(count);
                for index in 0..count {
                    path.push(Segment::Element(index));
                    path.push(Segment::MapKey);
                    let key = self.build_node(
                        positioned(key_template.clone(), index),
                        depth + 1,
                        branch,
                        path,
                        rng,
                    )?;
                    path.pop();
                    path.push(Segment::MapValue);
                    let value = self.build_node(
                        positioned(value_template.clone(), index),
                        depth + 1,
                        branch,
                        path,
                        rng,
                    )?;
                    path.pop();
                    path.pop();
                    entries.push((key, value));
                }
                Ok(NodeKind::Map { entries })
            }
            _ => {
                let template = element_template(&container, 0, spec)?;
                let count = sample_size(container.info, rng);
                let mut children = Vec::with_capacity(count);
                for index in 0..count {
                    path.push(Segment::Element(index));
                    let child = self.build_node(
                        positioned(template.clone(), index),
                        depth + 1,
                        branch,
                        path,
                        rng,
                    )?;
                    path.pop();
                    children.push(child);
                }
                if matches!(spec, TypeSpec::Set(_)) {
                    Ok(NodeKind::Set { children })
                } else {
                    Ok(NodeKind::List { children })
                }
            }
        }
    }

    fn node(
        &self,
        object_property: ObjectProperty,
        kind: NodeKind,
        path: &[Segment],
    ) -> PropertyNode {
        PropertyNode {
            object_property,
            kind,
            overrides: NodeOverrides::default(),
            path: path.to_vec(),
        }
    }
}

fn positioned(property: Property, index: usize) -> ObjectProperty {
    ObjectProperty {
        property,
        element_index: index,
        name_strategy: PropertyNameStrategy::Positional,
    }
}

fn element_template(
    container: &ContainerProperty,
    index: usize,
    spec: &TypeSpec,
) -> FixtureResult<Property> {
    container
        .element_templates
        .get(index)
        .cloned()
        .ok_or_else(|| FixtureError::UnsupportedType {
            type_spec: spec.to_string(),
        })
}

fn sample_size(info: ArbitraryContainerInfo, rng: &mut ChaCha8Rng) -> usize {
    if info.min_size >= info.max_size {
        info.min_size
    } else {
        rng.gen_range(info.min_size..=info.max_size)
    }
}

fn render(path: &[Segment]) -> String {
    if path.is_empty() {
        return "$".to_string();
    }
    let mut out = String::new();
    for (i, segment) in path.iter().enumerate() {
        match segment {
            Segment::Property(name) => {
                if i > 0 {
                    out.push('.');
                }
                out.push_str(name);
            }
            Segment::Element(index) => out.push_str(&format!("[{}]", index)),
            Segment::AllElements => out.push_str("[*]"),
            Segment::MapKey => out.push_str(".key"),
            Segment::MapValue => out.push_str(".value"),
        }
    }
    out
}
