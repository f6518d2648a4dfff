//! Combinable generator engine
//!
//! `CombinableArbitrary` is the lazy, composable unit of value production.
//! Every transformation (`map`, `filter`, `unique`, nullability, object
//! assembly) wraps the source without sampling it; values flow only when
//! `combined` is called with a random source. Retry-bounded operations fail
//! with `GenerationExhausted` instead of silently returning a non-matching
//! value, and `clear` propagates through the whole graph to drop memoized
//! fixed state between independent generation requests.

use crate::error::{FixtureError, FixtureResult};
use crate::value::Value;
use log::trace;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex};

/// Raw value supplier wrapped by [`CombinableArbitrary::from_fn`]
pub type Supplier = Box<dyn FnMut(&mut ChaCha8Rng) -> FixtureResult<Value> + Send>;

/// Pure value transformation used by `map`
pub type MapFn = Box<dyn Fn(Value) -> Value + Send>;

/// Acceptance predicate used by `filter`
pub type FilterFn = Box<dyn Fn(&Value) -> bool + Send>;

/// Assembly function recomposing sampled child values into one instance
pub type AssembleFn = Box<dyn Fn(Vec<Value>) -> FixtureResult<Value> + Send>;

/// Session-scoped set of already-produced values, shared by `unique`
pub type SharedValueSet = Arc<Mutex<HashSet<Value>>>;

/// A combinator shared across several tree nodes, e.g. an override fanned
/// out over every element of a container
pub type SharedArbitrary = Arc<Mutex<CombinableArbitrary>>;

/// New empty session-scoped uniqueness set
pub fn new_value_set() -> SharedValueSet {
    Arc::new(Mutex::new(HashSet::new()))
}

enum Kind {
    Supplier(Supplier),
    Fixed(Value),
    Map {
        source: Box<CombinableArbitrary>,
        transform: MapFn,
    },
    Filter {
        source: Box<CombinableArbitrary>,
        predicate: FilterFn,
        max_tries: usize,
        context: String,
    },
    Unique {
        source: Box<CombinableArbitrary>,
        seen: SharedValueSet,
        max_tries: usize,
        context: String,
    },
    NullOr {
        source: Box<CombinableArbitrary>,
        probability: f64,
    },
    Object {
        type_name: String,
        children: Vec<CombinableArbitrary>,
        assemble: AssembleFn,
    },
    Shared(SharedArbitrary),
}

/// Lazy, composable value generator
pub struct CombinableArbitrary {
    kind: Kind,
    pinned: bool,
    memo: Option<Value>,
}

impl CombinableArbitrary {
    fn wrap(kind: Kind) -> Self {
        CombinableArbitrary {
            kind,
            pinned: false,
            memo: None,
        }
    }

    /// Wrap a raw generation function
    pub fn from_fn<F>(supplier: F) -> Self
    where
        F: FnMut(&mut ChaCha8Rng) -> FixtureResult<Value> + Send + 'static,
    {
        CombinableArbitrary::wrap(Kind::Supplier(Box::new(supplier)))
    }

    /// Always produce the given value
    pub fn fixed_value(value: Value) -> Self {
        CombinableArbitrary::wrap(Kind::Fixed(value))
    }

    /// Lazily transform every produced value. The source is not sampled
    /// until this combinator is.
    pub fn map<F>(self, transform: F) -> Self
    where
        F: Fn(Value) -> Value + Send + 'static,
    {
        CombinableArbitrary::wrap(Kind::Map {
            source: Box::new(self),
            transform: Box::new(transform),
        })
    }

    /// Retry sampling until the predicate accepts, up to `max_tries` draws.
    /// Exhaustion fails the sample with the given context string.
    pub fn filter<F>(self, context: impl Into<String>, max_tries: usize, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + 'static,
    {
        CombinableArbitrary::wrap(Kind::Filter {
            source: Box::new(self),
            predicate: Box::new(predicate),
            max_tries,
            context: context.into(),
        })
    }

    /// Retry sampling until a value not yet in `seen` appears, up to
    /// `max_tries` draws; an accepted value is inserted into the set. The
    /// set is session-local unless the caller deliberately shares it.
    pub fn unique(self, context: impl Into<String>, seen: SharedValueSet, max_tries: usize) -> Self {
        CombinableArbitrary::wrap(Kind::Unique {
            source: Box::new(self),
            seen,
            max_tries,
            context: context.into(),
        })
    }

    /// Produce `Null` with the given probability, the source value otherwise
    pub fn null_or(self, probability: f64) -> Self {
        CombinableArbitrary::wrap(Kind::NullOr {
            source: Box::new(self),
            probability,
        })
    }

    /// Compose child combinators into one instance. Children are sampled in
    /// order and handed to `assemble`; a rejecting assembly surfaces as
    /// `AssemblyFailed` and is never retried here.
    pub fn object<F>(
        type_name: impl Into<String>,
        children: Vec<CombinableArbitrary>,
        assemble: F,
    ) -> Self
    where
        F: Fn(Vec<Value>) -> FixtureResult<Value> + Send + 'static,
    {
        CombinableArbitrary::wrap(Kind::Object {
            type_name: type_name.into(),
            children,
            assemble: Box::new(assemble),
        })
    }

    /// Delegate to a combinator shared with other tree nodes
    pub fn shared(shared: SharedArbitrary) -> Self {
        CombinableArbitrary::wrap(Kind::Shared(shared))
    }

    /// Pin this combinator: the first produced value is memoized and
    /// re-returned until [`clear`](Self::clear)
    pub fn pin(mut self) -> Self {
        self.pinned = true;
        self
    }

    /// Whether repeated `combined` calls return the same logical value
    pub fn is_fixed(&self) -> bool {
        if self.pinned {
            return true;
        }
        match &self.kind {
            Kind::Fixed(_) => true,
            Kind::Supplier(_) => false,
            Kind::Map { source, .. } | Kind::Filter { source, .. } => source.is_fixed(),
            Kind::Unique { .. } => false,
            Kind::NullOr {
                source,
                probability,
            } => *probability == 0.0 && source.is_fixed(),
            Kind::Object { children, .. } => children.iter().all(CombinableArbitrary::is_fixed),
            Kind::Shared(shared) => lock_arbitrary(shared).is_fixed(),
        }
    }

    /// Drop memoized fixed state here and in every child, forcing fresh
    /// sampling on the next use
    pub fn clear(&mut self) {
        self.memo = None;
        match &mut self.kind {
            Kind::Supplier(_) | Kind::Fixed(_) => {}
            Kind::Map { source, .. }
            | Kind::Filter { source, .. }
            | Kind::Unique { source, .. }
            | Kind::NullOr { source, .. } => source.clear(),
            Kind::Object { children, .. } => {
                for child in children {
                    child.clear();
                }
            }
            Kind::Shared(shared) => lock_arbitrary(shared).clear(),
        }
    }

    /// Sample one value. Deterministic given the random source state; a
    /// pinned combinator that has already produced a value re-returns it.
    pub fn combined(&mut self, rng: &mut ChaCha8Rng) -> FixtureResult<Value> {
        if self.pinned {
            if let Some(value) = &self.memo {
                return Ok(value.clone());
            }
        }
        let value = self.sample(rng)?;
        if self.pinned {
            self.memo = Some(value.clone());
        }
        Ok(value)
    }

    fn sample(&mut self, rng: &mut ChaCha8Rng) -> FixtureResult<Value> {
        match &mut self.kind {
            Kind::Supplier(supplier) => supplier(rng),
            Kind::Fixed(value) => Ok(value.clone()),
            Kind::Map { source, transform } => {
                let value = source.combined(rng)?;
                Ok(transform(value))
            }
            Kind::Filter {
                source,
                predicate,
                max_tries,
                context,
            } => {
                for attempt in 0..*max_tries {
                    let candidate = source.combined(rng)?;
                    if predicate(&candidate) {
                        return Ok(candidate);
                    }
                    trace!("filter rejected draw {} at {}", attempt + 1, context);
                }
                Err(FixtureError::GenerationExhausted {
                    context: context.clone(),
                    tries: *max_tries,
                })
            }
            Kind::Unique {
                source,
                seen,
                max_tries,
                context,
            } => {
                for _ in 0..*max_tries {
                    let candidate = source.combined(rng)?;
                    let mut seen = seen.lock().unwrap_or_else(|e| e.into_inner());
                    if seen.insert(candidate.clone()) {
                        return Ok(candidate);
                    }
                }
                Err(FixtureError::GenerationExhausted {
                    context: context.clone(),
                    tries: *max_tries,
                })
            }
            Kind::NullOr {
                source,
                probability,
            } => {
                if *probability > 0.0 && rng.gen_bool((*probability).min(1.0)) {
                    Ok(Value::Null)
                } else {
                    source.combined(rng)
                }
            }
            Kind::Object {
                children, assemble, ..
            } => {
                let mut sampled = Vec::with_capacity(children.len());
                for child in children.iter_mut() {
                    sampled.push(child.combined(rng)?);
                }
                assemble(sampled)
            }
            Kind::Shared(shared) => lock_arbitrary(shared).combined(rng),
        }
    }
}

fn lock_arbitrary(shared: &SharedArbitrary) -> std::sync::MutexGuard<'_, CombinableArbitrary> {
    shared.lock().unwrap_or_else(|e| e.into_inner())
}

impl fmt::Debug for CombinableArbitrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            Kind::Supplier(_) => "supplier",
            Kind::Fixed(_) => "fixed",
            Kind::Map { .. } => "map",
            Kind::Filter { .. } => "filter",
            Kind::Unique { .. } => "unique",
            Kind::NullOr { .. } => "null_or",
            Kind::Object { .. } => "object",
            Kind::Shared(_) => "shared",
        };
        f.debug_struct("CombinableArbitrary")
            .field("kind", &kind)
            .field("pinned", &self.pinned)
            .field("memoized", &self.memo.is_some())
            .finish()
    }
}
