//! Engine facade: top-level API for sc-inference.
//!
//! The `Engine` owns a memory, its keynodes and the inference configuration,
//! and runs one inference per call.

use serde::Serialize;

use crate::config::InferenceConfig;
use crate::element::ElementId;
use crate::error::InferResult;
use crate::kb::KnowledgeBuilder;
use crate::keynodes::Keynodes;
use crate::manager::{InferenceManager, InferenceParams};
use crate::memory::Memory;
use crate::solution::{SolutionEntry, SolutionEraser, SolutionTreeSearcher};

/// What one inference run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InferenceReport {
    /// The target was reached or, without a target, some rule fired.
    pub target_achieved: bool,
    /// The solution node of the run.
    pub solution: ElementId,
    pub output_structure: ElementId,
    /// Rule firings, counted once per firing.
    pub fired: usize,
    /// Recorded entries, in firing order. Empty when the solution tree
    /// mode records none.
    pub entries: Vec<SolutionEntry>,
}

/// A memory plus the configuration inference runs against it with.
pub struct Engine {
    memory: Memory,
    keynodes: Keynodes,
    config: InferenceConfig,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("elements", &self.memory.element_count())
            .field("connectors", &self.memory.connector_count())
            .field("config", &self.config)
            .finish()
    }
}

impl Engine {
    /// Create an engine over a fresh memory.
    pub fn new(config: InferenceConfig) -> InferResult<Self> {
        Self::with_memory(Memory::new(), config)
    }

    /// Create an engine over an existing memory, resolving its keynodes.
    pub fn with_memory(memory: Memory, config: InferenceConfig) -> InferResult<Self> {
        config.validate()?;
        let keynodes = Keynodes::resolve(&memory)?;
        tracing::info!(
            elements = memory.element_count(),
            search = ?config.search,
            solution_tree = ?config.solution_tree,
            "initializing sc-inference engine"
        );
        Ok(Self {
            memory,
            keynodes,
            config,
        })
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn keynodes(&self) -> &Keynodes {
        &self.keynodes
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: InferenceConfig) -> InferResult<()> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// Builder for facts, formulas and rules in this engine's memory.
    pub fn builder(&self) -> KnowledgeBuilder<'_> {
        KnowledgeBuilder::new(&self.memory, &self.keynodes)
    }

    /// Run inference and finalize its solution.
    ///
    /// Structural problems in the rules are errors. A run that reaches
    /// nothing is a report with `target_achieved == false`.
    pub fn apply_inference(&self, params: &InferenceParams) -> InferResult<InferenceReport> {
        let mut manager = InferenceManager::new(&self.memory, &self.keynodes, self.config.clone())?;
        let target_achieved = manager.apply_inference(params)?;
        let solution = manager.generate_solution(params.output_structure, target_achieved)?;
        Ok(InferenceReport {
            target_achieved,
            solution,
            output_structure: params.output_structure,
            fired: manager.fired(),
            entries: manager.solution_tree().entries(),
        })
    }

    /// Read access to every recorded solution.
    pub fn solution_tree(&self) -> SolutionTreeSearcher<'_> {
        SolutionTreeSearcher::new(&self.memory, &self.keynodes)
    }

    /// Erase a solution and its entries. Returns whether it existed.
    pub fn erase_solution(&self, solution: ElementId) -> bool {
        SolutionEraser::new(&self.memory, &self.keynodes).erase(solution)
    }
}
