//! Rich diagnostic error types for the inference engine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text so rule authors can tell which part of a
//! formula graph is malformed. "Nothing matched" is never an error: searches and
//! formula evaluations report it as an empty result instead.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the inference engine.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain through to the caller.
#[derive(Debug, Error, Diagnostic)]
pub enum InferenceError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Memory(#[from] MemoryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Formula(#[from] FormulaError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Kb(#[from] crate::kb::KbError),
}

// ---------------------------------------------------------------------------
// Memory errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum MemoryError {
    #[error("element not found: {element}")]
    #[diagnostic(
        code(sc::memory::not_found),
        help(
            "The element does not exist in this memory or was erased. \
             Erasing an element also erases every connector incident to it."
        )
    )]
    ElementNotFound { element: String },

    #[error("invalid element type: expected {expected}, got {actual}")]
    #[diagnostic(
        code(sc::memory::invalid_type),
        help(
            "Nodes and links are created with `create_node`/`create_link`, \
             connectors with `create_connector`. Check the element type you passed."
        )
    )]
    InvalidType { expected: String, actual: String },

    #[error("system identifier \"{identifier}\" is already bound to {element}")]
    #[diagnostic(
        code(sc::memory::duplicate_identifier),
        help("System identifiers are unique. Use `resolve` to reuse an existing element.")
    )]
    DuplicateIdentifier { identifier: String, element: String },

    #[error("element allocator exhausted")]
    #[diagnostic(
        code(sc::memory::exhausted),
        help("The element ID space is exhausted (2^64 - 1 allocations).")
    )]
    AllocatorExhausted,
}

// ---------------------------------------------------------------------------
// Template errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum TemplateError {
    #[error("cannot build template from {structure}: {message}")]
    #[diagnostic(
        code(sc::template::build),
        help(
            "A template is a structure whose members include at least one connector. \
             Every connector endpoint must resolve to an element or a variable."
        )
    )]
    PatternBuild { structure: String, message: String },

    #[error("cannot generate template {structure}: {message}")]
    #[diagnostic(
        code(sc::template::generation),
        help("Generation needs every connector endpoint to be bound or generatable.")
    )]
    Generation { structure: String, message: String },
}

// ---------------------------------------------------------------------------
// Formula errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum FormulaError {
    #[error("item not found: {message}")]
    #[diagnostic(
        code(sc::formula::item_not_found),
        help(
            "A formula set needs at least one priority group reachable through rrel_1, \
             and every operator formula needs its operands."
        )
    )]
    ItemNotFound { message: String },

    #[error("structural inconsistency in {formula}: {message}")]
    #[diagnostic(
        code(sc::formula::inconsistent),
        help(
            "The formula graph is authored in a way the engine cannot evaluate. \
             Equivalences need an operand with constants that is not marked for generation."
        )
    )]
    StructuralInconsistency { formula: String, message: String },
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read inference config: {path}")]
    #[diagnostic(code(sc::config::io), help("Ensure the file exists and is readable."))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse inference config: {message}")]
    #[diagnostic(
        code(sc::config::parse),
        help("Check the [inference] table. Enum values are snake_case, e.g. `search = \"in_structures\"`.")
    )]
    Parse { message: String },

    #[error("invalid inference config: {message}")]
    #[diagnostic(code(sc::config::invalid))]
    Invalid { message: String },

    #[error("target mode requested but no target structure is given")]
    #[diagnostic(
        code(sc::config::missing_target),
        help(
            "Declare the goal pattern in the knowledge base, e.g. \
             `target = [[\"mortal\", \"?who\"]]`, or run with `--mode all`."
        )
    )]
    MissingTarget,
}

/// Convenience result type for engine operations.
pub type InferResult<T> = std::result::Result<T, InferenceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formula_errors_convert_to_top_level() {
        let err: InferenceError = FormulaError::ItemNotFound {
            message: "no formulas sets found".into(),
        }
        .into();
        assert!(matches!(err, InferenceError::Formula(_)));
        assert_eq!(err.to_string(), "item not found: no formulas sets found");
    }

    #[test]
    fn diagnostic_codes_survive_wrapping() {
        let err: InferenceError = TemplateError::PatternBuild {
            structure: "rule".into(),
            message: "no connectors".into(),
        }
        .into();
        let code = err.code().map(|c| c.to_string());
        assert_eq!(code.as_deref(), Some("sc::template::build"));
    }

    #[test]
    fn missing_target_carries_help() {
        let err: InferenceError = ConfigError::MissingTarget.into();
        assert_eq!(
            err.code().map(|c| c.to_string()).as_deref(),
            Some("sc::config::missing_target")
        );
        assert!(err.help().is_some());
    }
}
