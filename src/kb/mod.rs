//! Knowledge bases: facts, formulas and rule sets written into memory.
//!
//! [`KnowledgeBuilder`] is the programmatic way to author knowledge;
//! [`KnowledgeBase`] reads the same constructions from a TOML bundle and
//! turns them into the parameters of an inference run.

pub mod builder;
pub mod bundle;

use miette::Diagnostic;
use thiserror::Error;

pub use builder::{KnowledgeBuilder, PatternBuilder};
pub use bundle::{AppliedKnowledge, KnowledgeBase};

// ── Errors ──────────────────────────────────────────────────────────────

#[derive(Debug, Error, Diagnostic)]
pub enum KbError {
    #[error("failed to read knowledge base: {path}")]
    #[diagnostic(code(sc::kb::io), help("Ensure the file exists and is readable."))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse knowledge base: {message}")]
    #[diagnostic(
        code(sc::kb::parse),
        help(
            "Facts are `[subject, relation, object]` triples or `[class, member]` pairs. \
             Formulas are tables with exactly one of `atom`, `and`, `or`, `not`, `if`/`then`, `iff`."
        )
    )]
    Parse { message: String },

    #[error("unknown variable \"{name}\" in rule \"{rule}\"")]
    #[diagnostic(
        code(sc::kb::unknown_variable),
        help("Rule arguments must name variables used in the rule's formula, e.g. `?x`.")
    )]
    UnknownVariable { rule: String, name: String },

    #[error("failed to apply knowledge base: {message}")]
    #[diagnostic(
        code(sc::kb::apply),
        help("Check that every rule belongs to a priority group and that names are used consistently.")
    )]
    Apply { message: String },
}

pub type KbResult<T> = std::result::Result<T, KbError>;

impl From<crate::error::MemoryError> for KbError {
    fn from(e: crate::error::MemoryError) -> Self {
        KbError::Apply {
            message: e.to_string(),
        }
    }
}
