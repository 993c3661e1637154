//! Inference configuration.
//!
//! Every knob of an inference run lives in [`InferenceConfig`]. It is read
//! from the `[inference]` table of a TOML document, or built in code with
//! [`InferenceConfig::default`] and the `with_*` builders.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How an atomic formula marked for generation treats existing matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationType {
    /// Search before generating; skip rows that already hold.
    #[default]
    Unique,
    /// Generate for every row.
    All,
}

/// How many matches a template search collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplacementsUsing {
    /// Stop after the first match. Generation stops after the first row.
    #[default]
    First,
    All,
}

/// What the run records as provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolutionTreeType {
    /// One entry per fired formula and binding row.
    #[default]
    Full,
    /// Recorded like `Full`.
    OnlySuccessBranch,
    /// Only the output structure is filled; no entries are written.
    OnlyOutputStructure,
}

impl SolutionTreeType {
    pub fn records_entries(self) -> bool {
        !matches!(self, SolutionTreeType::OnlyOutputStructure)
    }
}

/// Which elements template search may match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    /// The whole memory.
    #[default]
    AllKb,
    /// Only elements belonging to an input structure.
    InStructures,
    /// Membership arcs must belong to an input structure, other elements are free.
    OnlyMembershipArcsInStructures,
}

/// Which constructions land in the output structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputStructureFilling {
    #[default]
    GeneratedOnly,
    /// Also constructions found by the search that precedes generation.
    SearchedAndGenerated,
}

/// Bindings used by the search that precedes generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchBeforeGeneration {
    /// Search with the row's bindings.
    #[default]
    WithReplacements,
    /// Search the unbound pattern; any instance suppresses generation.
    WithoutReplacements,
}

/// Configuration of one inference run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// (default: `unique`)
    pub generation: GenerationType,
    /// (default: `first`)
    pub replacements: ReplacementsUsing,
    /// (default: `full`)
    pub solution_tree: SolutionTreeType,
    /// (default: `all_kb`)
    pub search: SearchType,
    /// (default: `generated_only`)
    pub filling: OutputStructureFilling,
    /// (default: `with_replacements`)
    pub search_before_generation: SearchBeforeGeneration,
    /// Restarts allowed in target-directed mode before giving up (default: 100).
    pub max_passes: usize,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            generation: GenerationType::default(),
            replacements: ReplacementsUsing::default(),
            solution_tree: SolutionTreeType::default(),
            search: SearchType::default(),
            filling: OutputStructureFilling::default(),
            search_before_generation: SearchBeforeGeneration::default(),
            max_passes: 100,
        }
    }
}

impl InferenceConfig {
    /// The configuration an inference request gets when it names no options:
    /// search is scoped to the input structures when there are any.
    pub fn for_request(has_input_structures: bool) -> Self {
        let search = if has_input_structures {
            SearchType::InStructures
        } else {
            SearchType::AllKb
        };
        Self {
            search,
            ..Default::default()
        }
    }

    pub fn with_generation(mut self, generation: GenerationType) -> Self {
        self.generation = generation;
        self
    }

    pub fn with_replacements(mut self, replacements: ReplacementsUsing) -> Self {
        self.replacements = replacements;
        self
    }

    pub fn with_solution_tree(mut self, solution_tree: SolutionTreeType) -> Self {
        self.solution_tree = solution_tree;
        self
    }

    pub fn with_search(mut self, search: SearchType) -> Self {
        self.search = search;
        self
    }

    pub fn with_filling(mut self, filling: OutputStructureFilling) -> Self {
        self.filling = filling;
        self
    }

    pub fn with_search_before_generation(mut self, mode: SearchBeforeGeneration) -> Self {
        self.search_before_generation = mode;
        self
    }

    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes;
        self
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_passes == 0 {
            return Err(ConfigError::Invalid {
                message: "max_passes must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Parse either a bare config table or a document with an
    /// `[inference]` table. A document without one yields the defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let mut table: toml::Table = toml::from_str(content).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        let section = table
            .remove("inference")
            .unwrap_or(toml::Value::Table(table));
        let config: Self = section
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::Parse {
                message: e.to_string(),
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml_str(&content)
    }
}
