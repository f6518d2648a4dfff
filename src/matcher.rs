//! Matcher algebra
//!
//! A `Matcher` is a pure predicate over a property, deciding whether a
//! collaborator claims it. Matchers compose with and/or/not plus an all-of
//! `intersect`, and resolution chains evaluate them in registration order,
//! first match wins. Substring-keyed generator lookup is expressed as the
//! [`NameContains`] matcher rather than a separate mechanism.

use crate::property::{Property, TypeKind, TypeSpec};

/// Predicate deciding whether a collaborator applies to a property
///
/// Implementations must be pure and safe to call repeatedly and concurrently.
pub trait Matcher: Send + Sync {
    /// Whether this matcher claims the property
    fn matches(&self, property: &Property) -> bool;
}

impl<F> Matcher for F
where
    F: Fn(&Property) -> bool + Send + Sync,
{
    fn matches(&self, property: &Property) -> bool {
        self(property)
    }
}

/// Matches properties whose declared type equals the given type exactly,
/// type arguments included
#[derive(Debug, Clone)]
pub struct ExactType(pub TypeSpec);

impl Matcher for ExactType {
    fn matches(&self, property: &Property) -> bool {
        *property.type_spec() == self.0
    }
}

/// Matches properties assignable to a type kind, ignoring type arguments
///
/// `AssignableType(TypeKind::Object)` claims every registered object type;
/// `AssignableType(TypeKind::List)` claims lists of any element type.
#[derive(Debug, Clone, Copy)]
pub struct AssignableType(pub TypeKind);

impl Matcher for AssignableType {
    fn matches(&self, property: &Property) -> bool {
        property.type_spec().kind() == self.0
    }
}

/// Matches properties whose declared type has exactly this many resolved
/// generic type arguments
#[derive(Debug, Clone, Copy)]
pub struct GenericArity(pub usize);

impl GenericArity {
    /// One type argument (lists, sets, optionals)
    pub fn single() -> Self {
        GenericArity(1)
    }

    /// Two type arguments (maps)
    pub fn double() -> Self {
        GenericArity(2)
    }
}

impl Matcher for GenericArity {
    fn matches(&self, property: &Property) -> bool {
        property.type_spec().arity() == self.0
    }
}

/// Matches named properties whose name contains the given substring
///
/// Unnamed synthetic element properties never match.
#[derive(Debug, Clone)]
pub struct NameContains(pub String);

impl Matcher for NameContains {
    fn matches(&self, property: &Property) -> bool {
        property
            .name()
            .map(|name| name.contains(self.0.as_str()))
            .unwrap_or(false)
    }
}

/// All-of composite: claims a property only when every inner matcher does
pub struct AllOf(pub Vec<Box<dyn Matcher>>);

impl Matcher for AllOf {
    fn matches(&self, property: &Property) -> bool {
        self.0.iter().all(|m| m.matches(property))
    }
}

/// Any-of composite
pub struct AnyOf(pub Vec<Box<dyn Matcher>>);

impl Matcher for AnyOf {
    fn matches(&self, property: &Property) -> bool {
        self.0.iter().any(|m| m.matches(property))
    }
}

/// Negation of an inner matcher
pub struct Not(pub Box<dyn Matcher>);

impl Matcher for Not {
    fn matches(&self, property: &Property) -> bool {
        !self.0.matches(property)
    }
}

/// Intersect a set of matchers into one all-of matcher
pub fn intersect(matchers: Vec<Box<dyn Matcher>>) -> AllOf {
    AllOf(matchers)
}

/// Combinator methods available on every sized matcher
pub trait MatcherExt: Matcher + Sized + 'static {
    /// Both this matcher and `other` must claim the property
    fn and<M: Matcher + 'static>(self, other: M) -> AllOf {
        AllOf(vec![Box::new(self), Box::new(other)])
    }

    /// Either this matcher or `other` claims the property
    fn or<M: Matcher + 'static>(self, other: M) -> AnyOf {
        AnyOf(vec![Box::new(self), Box::new(other)])
    }

    /// Inverts this matcher
    fn negate(self) -> Not {
        Not(Box::new(self))
    }
}

impl<T: Matcher + Sized + 'static> MatcherExt for T {}
