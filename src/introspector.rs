//! Arbitrary introspectors
//!
//! An introspector turns a claimed property into a concrete combinator, or
//! declines and lets the next chain entry try. The context exposes the
//! property, its tree path, the global generation config, and the already
//! resolved child combinators of composite nodes; an introspector that
//! claims a composite takes ownership of those children for its own
//! assembly.

use crate::combinable::CombinableArbitrary;
use crate::error::FixtureResult;
use crate::options::GenerationConfig;
use crate::property::{Property, TypeSpec};
use crate::value::Value;
use once_cell::sync::Lazy;
use rand::Rng;
use std::cell::RefCell;

/// Outcome of asking an introspector about a property
pub enum Introspected {
    /// The introspector claims the property and supplies its combinator
    Arbitrary(CombinableArbitrary),
    /// The introspector declines; the chain continues
    NotIntrospected,
}

/// Context for one introspection request
pub struct IntrospectContext<'a> {
    /// The property being resolved
    pub property: &'a Property,
    /// Rendered tree path of the node, for failure context
    pub path: String,
    /// Global generation configuration
    pub config: &'a GenerationConfig,
    children: RefCell<Vec<CombinableArbitrary>>,
}

impl<'a> IntrospectContext<'a> {
    /// Context for a leaf property with no children
    pub fn leaf(property: &'a Property, path: String, config: &'a GenerationConfig) -> Self {
        IntrospectContext {
            property,
            path,
            config,
            children: RefCell::new(Vec::new()),
        }
    }

    /// Context for a composite node whose children are already resolved
    pub fn with_children(
        property: &'a Property,
        path: String,
        config: &'a GenerationConfig,
        children: Vec<CombinableArbitrary>,
    ) -> Self {
        IntrospectContext {
            property,
            path,
            config,
            children: RefCell::new(children),
        }
    }

    /// Number of resolved child combinators available
    pub fn child_count(&self) -> usize {
        self.children.borrow().len()
    }

    /// Take ownership of the resolved child combinators. An introspector
    /// that claims a composite node calls this exactly once.
    pub fn take_children(&self) -> Vec<CombinableArbitrary> {
        std::mem::take(&mut *self.children.borrow_mut())
    }
}

/// Collaborator producing combinators for claimed properties
pub trait ArbitraryIntrospector: Send + Sync {
    /// Produce a combinator for the property, or decline
    fn introspect(&self, ctx: &IntrospectContext<'_>) -> FixtureResult<Introspected>;
}

static TEXT_ALPHABET: Lazy<Vec<char>> = Lazy::new(|| {
    ('a'..='z')
        .chain('A'..='Z')
        .chain('0'..='9')
        .collect::<Vec<char>>()
});

const DEFAULT_INT_MIN: i64 = i32::MIN as i64;
const DEFAULT_INT_MAX: i64 = i32::MAX as i64;
const DEFAULT_FLOAT_BOUND: f64 = 1_000_000.0;
const MAX_TEXT_LEN: usize = 16;

/// Built-in leaf generation for booleans, integers, floats and text
#[derive(Debug, Default)]
pub struct PrimitiveIntrospector;

impl ArbitraryIntrospector for PrimitiveIntrospector {
    fn introspect(&self, ctx: &IntrospectContext<'_>) -> FixtureResult<Introspected> {
        let arbitrary = match ctx.property.type_spec() {
            TypeSpec::Bool => {
                CombinableArbitrary::from_fn(|rng| Ok(Value::Bool(rng.gen_bool(0.5))))
            }
            TypeSpec::Integer => CombinableArbitrary::from_fn(|rng| {
                Ok(Value::Int(rng.gen_range(DEFAULT_INT_MIN..=DEFAULT_INT_MAX)))
            }),
            TypeSpec::Float => CombinableArbitrary::from_fn(|rng| {
                Ok(Value::Float(
                    rng.gen_range(-DEFAULT_FLOAT_BOUND..=DEFAULT_FLOAT_BOUND),
                ))
            }),
            TypeSpec::Text => CombinableArbitrary::from_fn(|rng| {
                let len = rng.gen_range(0..=MAX_TEXT_LEN);
                let text: String = (0..len)
                    .map(|_| TEXT_ALPHABET[rng.gen_range(0..TEXT_ALPHABET.len())])
                    .collect();
                Ok(Value::Text(text))
            }),
            _ => return Ok(Introspected::NotIntrospected),
        };
        Ok(Introspected::Arbitrary(arbitrary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn config() -> GenerationConfig {
        GenerationConfig::default()
    }

    fn introspect_leaf(spec: TypeSpec) -> Introspected {
        let property = Property::element(spec);
        let config = config();
        let ctx = IntrospectContext::leaf(&property, "$".to_string(), &config);
        PrimitiveIntrospector.introspect(&ctx).unwrap()
    }

    #[test]
    fn produces_matching_leaf_values() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..200 {
            match introspect_leaf(TypeSpec::Integer) {
                Introspected::Arbitrary(mut a) => {
                    let v = a.combined(&mut rng).unwrap();
                    let n = v.as_int().expect("integer leaf must sample ints");
                    assert!((DEFAULT_INT_MIN..=DEFAULT_INT_MAX).contains(&n));
                }
                Introspected::NotIntrospected => panic!("integer must be claimed"),
            }
        }
    }

    #[test]
    fn text_respects_alphabet_and_length() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        if let Introspected::Arbitrary(mut a) = introspect_leaf(TypeSpec::Text) {
            for _ in 0..200 {
                let v = a.combined(&mut rng).unwrap();
                let s = v.as_text().unwrap();
                assert!(s.len() <= MAX_TEXT_LEN);
                assert!(s.chars().all(|c| c.is_ascii_alphanumeric()));
            }
        } else {
            panic!("text must be claimed");
        }
    }

    #[test]
    fn declines_composites() {
        match introspect_leaf(TypeSpec::List(Box::new(TypeSpec::Integer))) {
            Introspected::NotIntrospected => {}
            Introspected::Arbitrary(_) => panic!("lists are not primitive leaves"),
        }
    }

    #[test]
    fn context_children_are_taken_once() {
        let property = Property::element(TypeSpec::Object("T".to_string()));
        let config = config();
        let children = vec![CombinableArbitrary::fixed_value(Value::Int(1))];
        let ctx = IntrospectContext::with_children(&property, "$".to_string(), &config, children);
        assert_eq!(ctx.child_count(), 1);
        let taken = ctx.take_children();
        assert_eq!(taken.len(), 1);
        assert_eq!(ctx.child_count(), 0);
    }
}
