//! Error taxonomy for fixture generation
//!
//! Every fatal condition aborts the current sample and carries enough context
//! (failing path, failing type) to diagnose the configuration that caused it.
//! Nothing in this crate retries a failed sample automatically; bounded retry
//! exists only inside `filter`/`unique` combinators.

/// Type alias for fixture generation results
pub type FixtureResult<T> = Result<T, FixtureError>;

/// Errors surfaced by tree building, override resolution and sampling
#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    /// No registered object/container generator claimed a type during tree
    /// building. This is a configuration error, never silently defaulted.
    #[error("no registered generator claims type `{type_spec}`")]
    UnsupportedType {
        /// Rendered form of the unclaimed type
        type_spec: String,
    },

    /// An override path did not resolve against the built property tree
    /// (typo, wrong index, wrong container size). Surfaced at
    /// override-application time, before any sampling happens.
    #[error("override path `{path}` does not resolve against the property tree")]
    PathNotFound {
        /// Rendered form of the unresolvable path
        path: String,
    },

    /// A bounded `filter`/`unique` retry budget was exhausted without
    /// producing an accepted value.
    #[error("retry budget exhausted after {tries} attempts at {context}")]
    GenerationExhausted {
        /// Where in the tree the budget ran out
        context: String,
        /// How many draws were attempted
        tries: usize,
    },

    /// An introspector's assembly step rejected the sampled child values.
    /// Not retried by the core; wrap with `filter` for probabilistic
    /// acceptance.
    #[error("assembly failed for `{type_name}`: {reason}")]
    AssemblyFailed {
        /// Type whose assembly rejected its inputs
        type_name: String,
        /// Assembly-provided rejection reason
        reason: String,
    },

    /// A textual path expression could not be parsed.
    #[error("cannot parse path expression `{input}`: {reason}")]
    PathParse {
        /// The offending input string
        input: String,
        /// What went wrong
        reason: String,
    },
}
