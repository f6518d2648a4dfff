//! Fixture engine: the generation pipeline and public sampling entry points
//!
//! One engine wraps one immutable options snapshot and may be shared freely
//! across threads. Each sample call builds its own property tree, applies
//! the call-scoped overrides, composes one combinator per node bottom-up and
//! samples the root; nothing per-sample is shared between concurrent calls.
//! A fixed seed makes single-threaded sampling reproducible bit-for-bit.

use crate::combinable::{new_value_set, CombinableArbitrary};
use crate::customizer::{CustomizerRegistry, Effect};
use crate::error::{FixtureError, FixtureResult};
use crate::expression::ExpressionPath;
use crate::introspector::{Introspected, IntrospectContext};
use crate::options::FixtureOptions;
use crate::property::{Property, TypeSpec};
use crate::tree::{NodeKind, PropertyNode, TreeBuilder, ValueOverride};
use crate::value::{ObjectValue, Value};
use log::debug;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::{Arc, Mutex};

/// Thread-safe fixture generation engine over one configuration
#[derive(Clone)]
pub struct FixtureEngine {
    options: FixtureOptions,
}

impl FixtureEngine {
    /// Engine over an immutable options snapshot
    pub fn new(options: FixtureOptions) -> Self {
        FixtureEngine { options }
    }

    /// The configuration this engine samples with
    pub fn options(&self) -> &FixtureOptions {
        &self.options
    }

    /// Drop cached property sequences; for isolation between test suites
    pub fn clear_cache(&self) {
        self.options.registry().clear_cache();
    }

    /// Per-call sampler accepting override effects scoped to that call
    pub fn sampler(&self, type_spec: TypeSpec) -> FixtureSampler {
        FixtureSampler {
            options: self.options.clone(),
            type_spec,
            customizers: CustomizerRegistry::new(),
        }
    }

    /// Generate one instance of the type
    pub fn sample(&self, type_spec: &TypeSpec, seed: u64) -> FixtureResult<Value> {
        self.sampler(type_spec.clone()).sample(seed)
    }

    /// Generate `count` instances of the type
    pub fn sample_many(
        &self,
        type_spec: &TypeSpec,
        seed: u64,
        count: usize,
    ) -> FixtureResult<Vec<Value>> {
        self.sampler(type_spec.clone()).sample_many(seed, count)
    }
}

/// One sampling request: a type plus call-scoped overrides
pub struct FixtureSampler {
    options: FixtureOptions,
    type_spec: TypeSpec,
    customizers: CustomizerRegistry,
}

impl FixtureSampler {
    /// Fix the value at a textual path
    pub fn set(mut self, path: &str, value: Value) -> FixtureResult<Self> {
        let path = ExpressionPath::parse(path)?;
        self.customizers.set_fixed(path, value);
        Ok(self)
    }

    /// Fix the value at a structured path
    pub fn set_path(mut self, path: ExpressionPath, value: Value) -> Self {
        self.customizers.set_fixed(path, value);
        self
    }

    /// Replace the generator at a path. When the path fans out over several
    /// elements the combinator is shared between them and drawn once per
    /// element.
    pub fn set_generator(
        mut self,
        path: &str,
        arbitrary: CombinableArbitrary,
    ) -> FixtureResult<Self> {
        let path = ExpressionPath::parse(path)?;
        self.customizers
            .set_generator(path, Arc::new(Mutex::new(arbitrary)));
        Ok(self)
    }

    /// Add an acceptance predicate at a path; additive with other filters
    pub fn filter<F>(mut self, path: &str, predicate: F) -> FixtureResult<Self>
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        let path = ExpressionPath::parse(path)?;
        self.customizers.add_filter(path, Arc::new(predicate));
        Ok(self)
    }

    /// Constrain the element count of the container at a path
    pub fn size(mut self, path: &str, min_size: usize, max_size: usize) -> FixtureResult<Self> {
        let path = ExpressionPath::parse(path)?;
        self.customizers.set_container_size(path, min_size, max_size);
        Ok(self)
    }

    /// Override the null probability at a path
    pub fn null_probability(mut self, path: &str, probability: f64) -> FixtureResult<Self> {
        let path = ExpressionPath::parse(path)?;
        self.customizers.set_null_probability(path, probability);
        Ok(self)
    }

    /// Register an arbitrary effect at a structured path
    pub fn customize(mut self, path: ExpressionPath, effect: Effect) -> Self {
        self.customizers.add(path, effect);
        self
    }

    /// Generate one instance with the given seed
    pub fn sample(&self, seed: u64) -> FixtureResult<Value> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        self.sample_with(&mut rng)
    }

    /// Generate `count` instances with the given seed. Each instance gets
    /// its own tree; container sizes may differ between instances when the
    /// bounds allow.
    pub fn sample_many(&self, seed: u64, count: usize) -> FixtureResult<Vec<Value>> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(self.sample_with(&mut rng)?);
        }
        Ok(values)
    }

    fn sample_with(&self, rng: &mut ChaCha8Rng) -> FixtureResult<Value> {
        let builder = TreeBuilder::new(&self.options, &self.customizers);
        let mut tree = builder.build(&self.type_spec, rng)?;
        self.customizers.apply(&mut tree)?;

        let mut root = self.compose(&tree)?;
        let value = root.combined(rng)?;
        // Shared override combinators outlive this graph; drop their state.
        root.clear();
        debug!("sampled one `{}` instance", self.type_spec);
        Ok(value)
    }

    fn compose(&self, node: &PropertyNode) -> FixtureResult<CombinableArbitrary> {
        let config = self.options.config();
        let path = node.rendered_path();

        let base = if let Some(value_override) = &node.overrides.value {
            match value_override {
                ValueOverride::Fixed(value) => CombinableArbitrary::fixed_value(value.clone()),
                ValueOverride::Generator(shared) => CombinableArbitrary::shared(Arc::clone(shared)),
            }
        } else {
            match &node.kind {
                NodeKind::Absent => CombinableArbitrary::fixed_value(Value::Null),
                NodeKind::Leaf => self.resolve_leaf(node, &path)?,
                NodeKind::Optional { inner } => self.compose(inner)?,
                NodeKind::Object {
                    type_name,
                    children,
                } => self.compose_object(node, type_name, children, &path)?,
                NodeKind::List { children } => {
                    let composed = children
                        .iter()
                        .map(|child| self.compose(child))
                        .collect::<FixtureResult<Vec<_>>>()?;
                    CombinableArbitrary::object(path.clone(), composed, |values| {
                        Ok(Value::List(values))
                    })
                }
                NodeKind::Set { children } => {
                    let seen = new_value_set();
                    let mut composed = Vec::with_capacity(children.len());
                    for child in children {
                        let element = self.compose(child)?;
                        composed.push(element.unique(
                            format!("distinct element at `{}`", child.rendered_path()),
                            Arc::clone(&seen),
                            config.retry_budget,
                        ));
                    }
                    CombinableArbitrary::object(path.clone(), composed, |values| {
                        Ok(Value::List(values))
                    })
                }
                NodeKind::Map { entries } => {
                    let seen = new_value_set();
                    let mut composed = Vec::with_capacity(entries.len() * 2);
                    for (key, value) in entries {
                        let key_arbitrary = self.compose(key)?.unique(
                            format!("distinct key at `{}`", key.rendered_path()),
                            Arc::clone(&seen),
                            config.retry_budget,
                        );
                        composed.push(key_arbitrary);
                        composed.push(self.compose(value)?);
                    }
                    CombinableArbitrary::object(path.clone(), composed, |values| {
                        let mut entries = Vec::with_capacity(values.len() / 2);
                        let mut iter = values.into_iter();
                        while let (Some(key), Some(value)) = (iter.next(), iter.next()) {
                            entries.push((key, value));
                        }
                        Ok(Value::Map(entries))
                    })
                }
            }
        };

        let mut arbitrary = base;

        // A value-producing override wins over nullability. The null outcome
        // is decided beneath the filters, so every registered filter observes
        // it: a filter rejecting `Null` retries, one accepting it passes.
        if node.overrides.value.is_none() {
            let implicitly_nullable = node.object_property.property.is_nullable()
                || matches!(node.kind, NodeKind::Optional { .. });
            let probability = node.overrides.null_probability.or(if implicitly_nullable {
                Some(config.null_probability)
            } else {
                None
            });
            if let Some(probability) = probability {
                if probability > 0.0 {
                    arbitrary = arbitrary.null_or(probability);
                }
            }
        }

        for (index, predicate) in node.overrides.filters.iter().enumerate() {
            let predicate = Arc::clone(predicate);
            arbitrary = arbitrary.filter(
                format!("filter #{} at `{}`", index + 1, path),
                config.retry_budget,
                move |value| predicate(value),
            );
        }

        Ok(arbitrary)
    }

    fn compose_object(
        &self,
        node: &PropertyNode,
        type_name: &str,
        children: &[PropertyNode],
        path: &str,
    ) -> FixtureResult<CombinableArbitrary> {
        let composed = children
            .iter()
            .map(|child| self.compose(child))
            .collect::<FixtureResult<Vec<_>>>()?;

        let property = &node.object_property.property;
        let ctx = IntrospectContext::with_children(
            property,
            path.to_string(),
            self.options.config(),
            composed,
        );
        if let Some(arbitrary) = self.first_claim(property, &ctx)? {
            return Ok(arbitrary);
        }

        let field_names: Vec<String> = children
            .iter()
            .map(|child| match child.object_property.property.name() {
                Some(name) => name.to_string(),
                None => child.object_property.element_index.to_string(),
            })
            .collect();
        let assembled_name = type_name.to_string();
        Ok(CombinableArbitrary::object(
            type_name,
            ctx.take_children(),
            move |values| {
                Ok(Value::Object(ObjectValue {
                    type_name: assembled_name.clone(),
                    fields: field_names.iter().cloned().zip(values).collect(),
                }))
            },
        ))
    }

    fn resolve_leaf(&self, node: &PropertyNode, path: &str) -> FixtureResult<CombinableArbitrary> {
        let property = &node.object_property.property;
        let ctx = IntrospectContext::leaf(property, path.to_string(), self.options.config());
        match self.first_claim(property, &ctx)? {
            Some(arbitrary) => Ok(arbitrary),
            None => Err(FixtureError::UnsupportedType {
                type_spec: property.type_spec().to_string(),
            }),
        }
    }

    fn first_claim(
        &self,
        property: &Property,
        ctx: &IntrospectContext<'_>,
    ) -> FixtureResult<Option<CombinableArbitrary>> {
        for introspector in self.options.matching_introspectors(property) {
            match introspector.introspect(ctx)? {
                Introspected::Arbitrary(arbitrary) => return Ok(Some(arbitrary)),
                Introspected::NotIntrospected => continue,
            }
        }
        Ok(None)
    }
}
