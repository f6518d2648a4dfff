//! Expression paths: declarative addresses into a property tree
//!
//! A path is an ordered sequence of segments built either through the
//! structured API or parsed from the textual form:
//!
//! ```text
//! identifier ('.' identifier | '[' (digit+ | '*') ']' | '.key' | '.value')*
//! ```
//!
//! `.key` and `.value` are reserved in every position after the first and
//! narrow a map element to its key or value sub-property. `[*]` expands to
//! every element the container materialized, so it is evaluated against the
//! decided container size, not the size at registration time.

use crate::error::{FixtureError, FixtureResult};
use std::fmt;

/// One step of a path expression
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Named child of an object node
    Property(String),
    /// The i-th materialized element of a container node
    Element(usize),
    /// Every materialized element of a container node
    AllElements,
    /// Key sub-property of a map element
    MapKey,
    /// Value sub-property of a map element
    MapValue,
}

impl Segment {
    /// Whether this pattern segment covers the given concrete tree segment
    pub fn covers(&self, concrete: &Segment) -> bool {
        match (self, concrete) {
            (Segment::AllElements, Segment::Element(_)) => true,
            (pattern, concrete) => pattern == concrete,
        }
    }
}

/// Ordered segment sequence addressing nodes in a property tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ExpressionPath {
    segments: Vec<Segment>,
}

impl ExpressionPath {
    /// Empty path, addressing the root
    pub fn root() -> Self {
        ExpressionPath::default()
    }

    /// Append a named-property segment
    pub fn property(mut self, name: impl Into<String>) -> Self {
        self.segments.push(Segment::Property(name.into()));
        self
    }

    /// Append an indexed-element segment
    pub fn element(mut self, index: usize) -> Self {
        self.segments.push(Segment::Element(index));
        self
    }

    /// Append an all-elements segment
    pub fn all_elements(mut self) -> Self {
        self.segments.push(Segment::AllElements);
        self
    }

    /// Append a map-key segment
    pub fn map_key(mut self) -> Self {
        self.segments.push(Segment::MapKey);
        self
    }

    /// Append a map-value segment
    pub fn map_value(mut self) -> Self {
        self.segments.push(Segment::MapValue);
        self
    }

    /// Concatenate: this path becomes the prefix of `inner`. This is the
    /// prepend rule nested customization scopes compose with.
    pub fn nested(mut self, inner: ExpressionPath) -> Self {
        self.segments.extend(inner.segments);
        self
    }

    /// The ordered segments
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Whether this pattern addresses exactly the given concrete node path
    pub fn covers(&self, concrete: &[Segment]) -> bool {
        self.segments.len() == concrete.len()
            && self
                .segments
                .iter()
                .zip(concrete)
                .all(|(pattern, step)| pattern.covers(step))
    }

    /// Parse the textual form
    pub fn parse(input: &str) -> FixtureResult<Self> {
        Parser::new(input).parse()
    }
}

impl fmt::Display for ExpressionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Property(name) => {
                    if i > 0 {
                        write!(f, ".")?;
                    }
                    write!(f, "{}", name)?;
                }
                Segment::Element(index) => write!(f, "[{}]", index)?,
                Segment::AllElements => write!(f, "[*]")?,
                Segment::MapKey => write!(f, ".key")?,
                Segment::MapValue => write!(f, ".value")?,
            }
        }
        Ok(())
    }
}

struct Parser<'a> {
    input: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Parser {
            input,
            chars: input.char_indices().peekable(),
        }
    }

    fn error(&self, reason: impl Into<String>) -> FixtureError {
        FixtureError::PathParse {
            input: self.input.to_string(),
            reason: reason.into(),
        }
    }

    fn parse(mut self) -> FixtureResult<ExpressionPath> {
        let mut path = ExpressionPath::root();

        let first = self.identifier()?;
        path = path.property(first);

        while let Some(&(_, c)) = self.chars.peek() {
            match c {
                '.' => {
                    self.chars.next();
                    let name = self.identifier()?;
                    // Reserved tokens narrow a map element; any other
                    // identifier is an ordinary property segment.
                    path = match name.as_str() {
                        "key" => path.map_key(),
                        "value" => path.map_value(),
                        _ => path.property(name),
                    };
                }
                '[' => {
                    self.chars.next();
                    path = self.index_segment(path)?;
                }
                other => {
                    return Err(self.error(format!("unexpected character `{}`", other)));
                }
            }
        }
        Ok(path)
    }

    fn identifier(&mut self) -> FixtureResult<String> {
        let mut name = String::new();
        while let Some(&(_, c)) = self.chars.peek() {
            // Digits are allowed only after the leading character.
            let accepted = if name.is_empty() {
                c.is_alphabetic() || c == '_'
            } else {
                c.is_alphanumeric() || c == '_'
            };
            if accepted {
                name.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        if name.is_empty() {
            Err(self.error("expected identifier"))
        } else {
            Ok(name)
        }
    }

    fn index_segment(&mut self, path: ExpressionPath) -> FixtureResult<ExpressionPath> {
        let path = match self.chars.peek() {
            Some(&(_, '*')) => {
                self.chars.next();
                path.all_elements()
            }
            Some(&(_, c)) if c.is_ascii_digit() => {
                let mut digits = String::new();
                while let Some(&(_, c)) = self.chars.peek() {
                    if c.is_ascii_digit() {
                        digits.push(c);
                        self.chars.next();
                    } else {
                        break;
                    }
                }
                let index = digits
                    .parse::<usize>()
                    .map_err(|_| self.error(format!("index `{}` out of range", digits)))?;
                path.element(index)
            }
            _ => return Err(self.error("expected element index or `*` after `[`")),
        };
        match self.chars.next() {
            Some((_, ']')) => Ok(path),
            _ => Err(self.error("unterminated `[` segment")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_properties() {
        let path = ExpressionPath::parse("address.city").unwrap();
        assert_eq!(
            path.segments(),
            &[
                Segment::Property("address".to_string()),
                Segment::Property("city".to_string()),
            ]
        );
    }

    #[test]
    fn parses_indices_and_wildcards() {
        let path = ExpressionPath::parse("orders[0].lines[*].amount").unwrap();
        assert_eq!(
            path.segments(),
            &[
                Segment::Property("orders".to_string()),
                Segment::Element(0),
                Segment::Property("lines".to_string()),
                Segment::AllElements,
                Segment::Property("amount".to_string()),
            ]
        );
    }

    #[test]
    fn parses_map_key_and_value() {
        let path = ExpressionPath::parse("attributes[*].key").unwrap();
        assert_eq!(
            path.segments(),
            &[
                Segment::Property("attributes".to_string()),
                Segment::AllElements,
                Segment::MapKey,
            ]
        );
        let path = ExpressionPath::parse("attributes[2].value").unwrap();
        assert_eq!(path.segments().last(), Some(&Segment::MapValue));
    }

    #[test]
    fn first_segment_may_be_named_key() {
        // The reserved reading applies only after the first segment.
        let path = ExpressionPath::parse("key.value").unwrap();
        assert_eq!(
            path.segments(),
            &[Segment::Property("key".to_string()), Segment::MapValue]
        );
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(ExpressionPath::parse("").is_err());
        assert!(ExpressionPath::parse("a..b").is_err());
        assert!(ExpressionPath::parse("a[").is_err());
        assert!(ExpressionPath::parse("a[x]").is_err());
        assert!(ExpressionPath::parse("a[1").is_err());
        assert!(ExpressionPath::parse("a]b").is_err());
    }

    #[test]
    fn identifiers_must_not_start_with_a_digit() {
        assert!(ExpressionPath::parse("2fast.city").is_err());
        assert!(ExpressionPath::parse("a.1b").is_err());
        // Digits after the leading character stay legal.
        let path = ExpressionPath::parse("line2.total").unwrap();
        assert_eq!(
            path.segments(),
            &[
                Segment::Property("line2".to_string()),
                Segment::Property("total".to_string()),
            ]
        );
    }

    #[test]
    fn display_round_trips() {
        for text in &["address.city", "orders[0].lines[*].amount", "m[*].key"] {
            let path = ExpressionPath::parse(text).unwrap();
            assert_eq!(path.to_string(), *text);
        }
    }

    #[test]
    fn nested_prepends() {
        let outer = ExpressionPath::root().property("address");
        let inner = ExpressionPath::root().property("city");
        let composed = outer.nested(inner);
        assert_eq!(composed, ExpressionPath::parse("address.city").unwrap());
    }

    #[test]
    fn wildcard_covers_concrete_elements() {
        let pattern = ExpressionPath::parse("tags[*]").unwrap();
        let concrete = vec![Segment::Property("tags".to_string()), Segment::Element(2)];
        assert!(pattern.covers(&concrete));
        let other = vec![Segment::Property("tags".to_string())];
        assert!(!pattern.covers(&other));
    }
}
