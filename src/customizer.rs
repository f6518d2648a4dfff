//! Customizer registry: ordered (path, effect) overrides
//!
//! Effects are held in registration order. Container-size constraints are
//! consulted while the tree is being built, since they decide how many
//! element nodes materialize; every other effect is applied to the built
//! tree before sampling. Value-producing effects replace each other, last
//! registration wins; filters and size constraints compose additively. A
//! path that resolves to nothing is `PathNotFound`, surfaced eagerly, with
//! one deliberate exception: an all-elements segment fanning out over a
//! container that materialized zero elements is a resolved no-op.

use crate::combinable::SharedArbitrary;
use crate::error::{FixtureError, FixtureResult};
use crate::expression::{ExpressionPath, Segment};
use crate::property::ArbitraryContainerInfo;
use crate::tree::{FilterPredicate, NodeKind, PropertyNode, ValueOverride};
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// One override effect
pub enum Effect {
    /// Always produce this value at the matched node
    SetFixed(Value),
    /// Replace the matched node's combinator
    SetGenerator(SharedArbitrary),
    /// Add an acceptance predicate; additive with other filters
    AddFilter(FilterPredicate),
    /// Constrain how many elements the matched container materializes
    SetContainerSize(ArbitraryContainerInfo),
    /// Override the null probability of the matched node
    SetNullProbability(f64),
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::SetFixed(value) => f.debug_tuple("SetFixed").field(value).finish(),
            Effect::SetGenerator(_) => f.write_str("SetGenerator"),
            Effect::AddFilter(_) => f.write_str("AddFilter"),
            Effect::SetContainerSize(info) => {
                f.debug_tuple("SetContainerSize").field(info).finish()
            }
            Effect::SetNullProbability(p) => {
                f.debug_tuple("SetNullProbability").field(p).finish()
            }
        }
    }
}

/// Ordered set of (path, effect) entries
#[derive(Debug, Default)]
pub struct CustomizerRegistry {
    entries: Vec<(ExpressionPath, Effect)>,
}

impl CustomizerRegistry {
    /// Empty registry
    pub fn new() -> Self {
        CustomizerRegistry::default()
    }

    /// Append an entry, preserving registration order
    pub fn add(&mut self, path: ExpressionPath, effect: Effect) {
        self.entries.push((path, effect));
    }

    /// Register a fixed value at a path
    pub fn set_fixed(&mut self, path: ExpressionPath, value: Value) {
        self.add(path, Effect::SetFixed(value));
    }

    /// Register a generator replacement at a path
    pub fn set_generator(&mut self, path: ExpressionPath, generator: SharedArbitrary) {
        self.add(path, Effect::SetGenerator(generator));
    }

    /// Register an additional filter at a path
    pub fn add_filter(&mut self, path: ExpressionPath, predicate: FilterPredicate) {
        self.add(path, Effect::AddFilter(predicate));
    }

    /// Register container-size bounds at a path
    pub fn set_container_size(&mut self, path: ExpressionPath, min_size: usize, max_size: usize) {
        self.add(
            path,
            Effect::SetContainerSize(ArbitraryContainerInfo::between(min_size, max_size)),
        );
    }

    /// Register a null-probability override at a path
    pub fn set_null_probability(&mut self, path: ExpressionPath, probability: f64) {
        self.add(path, Effect::SetNullProbability(probability));
    }

    /// Number of registered entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries are registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Size bounds for the container at `concrete`, if any size entry covers
    /// it. Overrides replace the base; several covering overrides intersect.
    pub fn container_info_for(
        &self,
        concrete: &[Segment],
        base: ArbitraryContainerInfo,
    ) -> ArbitraryContainerInfo {
        let mut merged: Option<ArbitraryContainerInfo> = None;
        for (path, effect) in &self.entries {
            if let Effect::SetContainerSize(info) = effect {
                if path.covers(concrete) {
                    merged = Some(match merged {
                        None => *info,
                        Some(existing) => existing.intersect(*info),
                    });
                }
            }
        }
        merged.unwrap_or(base)
    }

    /// Apply every entry to the built tree, in registration order. Fails
    /// with `PathNotFound` for any entry resolving to no node.
    pub fn apply(&self, root: &mut PropertyNode) -> FixtureResult<()> {
        for (path, effect) in &self.entries {
            let mut outcome = Outcome::default();
            walk(root, path.segments(), effect, &mut outcome);
            if outcome.applied == 0 && !outcome.empty_fanout {
                return Err(FixtureError::PathNotFound {
                    path: path.to_string(),
                });
            }
        }
        Ok(())
    }
}

#[derive(Default)]
struct Outcome {
    applied: usize,
    empty_fanout: bool,
}

fn walk(node: &mut PropertyNode, segments: &[Segment], effect: &Effect, outcome: &mut Outcome) {
    // Optionals are transparent for path resolution; size constraints also
    // look through them when the path stops at the wrapper.
    if let NodeKind::Optional { inner } = &mut node.kind {
        if !segments.is_empty() || matches!(effect, Effect::SetContainerSize(_)) {
            walk(inner, segments, effect, outcome);
            return;
        }
    }

    let (head, rest) = match segments.split_first() {
        None => {
            apply_to(node, effect, outcome);
            return;
        }
        Some(split) => split,
    };

    match (&mut node.kind, head) {
        (NodeKind::Object { children, .. }, Segment::Property(name)) => {
            for child in children {
                if child.object_property.property.name() == Some(name.as_str()) {
                    walk(child, rest, effect, outcome);
                }
            }
        }
        (NodeKind::List { children }, Segment::Element(index))
        | (NodeKind::Set { children }, Segment::Element(index)) => {
            if let Some(child) = children.get_mut(*index) {
                walk(child, rest, effect, outcome);
            }
        }
        (NodeKind::List { children }, Segment::AllElements)
        | (NodeKind::Set { children }, Segment::AllElements) => {
            if children.is_empty() {
                outcome.empty_fanout = true;
            }
            for child in children {
                walk(child, rest, effect, outcome);
            }
        }
        (NodeKind::Map { entries }, Segment::Element(index)) => {
            if let Some((key, value)) = entries.get_mut(*index) {
                walk_entry(key, value, rest, effect, outcome);
            }
        }
        (NodeKind::Map { entries }, Segment::AllElements) => {
            if entries.is_empty() {
                outcome.empty_fanout = true;
            }
            for (key, value) in entries {
                walk_entry(key, value, rest, effect, outcome);
            }
        }
        _ => {}
    }
}

fn walk_entry(
    key: &mut PropertyNode,
    value: &mut PropertyNode,
    rest: &[Segment],
    effect: &Effect,
    outcome: &mut Outcome,
) {
    match rest.split_first() {
        Some((Segment::MapKey, tail)) => walk(key, tail, effect, outcome),
        Some((Segment::MapValue, tail)) => walk(value, tail, effect, outcome),
        _ => {}
    }
}

fn apply_to(node: &mut PropertyNode, effect: &Effect, outcome: &mut Outcome) {
    match effect {
        Effect::SetFixed(value) => {
            node.overrides.value = Some(ValueOverride::Fixed(value.clone()));
            outcome.applied += 1;
        }
        Effect::SetGenerator(shared) => {
            node.overrides.value = Some(ValueOverride::Generator(Arc::clone(shared)));
            outcome.applied += 1;
        }
        Effect::AddFilter(predicate) => {
            node.overrides.filters.push(Arc::clone(predicate));
            outcome.applied += 1;
        }
        Effect::SetNullProbability(probability) => {
            node.overrides.null_probability = Some(*probability);
            outcome.applied += 1;
        }
        Effect::SetContainerSize(_) => {
            // Size took effect during construction; this pass only verifies
            // the path addressed a real container.
            if matches!(
                node.kind,
                NodeKind::List { .. } | NodeKind::Set { .. } | NodeKind::Map { .. }
            ) {
                outcome.applied += 1;
            }
        }
    }
}
