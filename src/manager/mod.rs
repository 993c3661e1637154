//! The inference loop.
//!
//! An [`InferenceManager`] splits a formulas set into priority queues,
//! evaluates rules one by one through [`use_formula`](InferenceManager::use_formula)
//! and records every rule that generated something in the solution tree.
//! The order in which queues are walked is the job of the strategies in
//! [`strategy`].

pub mod strategy;

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::InferenceConfig;
use crate::element::{ElementId, ElementType};
use crate::error::{ConfigError, FormulaError, InferResult};
use crate::keynodes::{Keynodes, MAX_ROLE_RELATION};
use crate::logic::{EvalContext, ExpressionBuilder, LogicFormulaResult, OutputStructure};
use crate::memory::{Memory, relations};
use crate::searcher::{TemplateSearcher, scope_for};
use crate::solution::{SolutionEraser, SolutionTreeManager, solution_tree_for};
use crate::template_manager::{ArgumentBinding, GenerationSettings, TemplateManager};

/// How the rule queues are walked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InferenceMode {
    /// Try every rule once, in priority order.
    #[default]
    All,
    /// Stop as soon as the target structure holds, rescanning from the
    /// first queue after every rule that fires.
    Target,
}

impl fmt::Display for InferenceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Target => write!(f, "target"),
        }
    }
}

/// Inputs of one inference run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceParams {
    /// Ordered set of priority groups of rules.
    pub formulas_set: ElementId,
    /// Candidate values for rule variables.
    pub arguments: Vec<ElementId>,
    /// Structures the search is restricted to, for scoped search types.
    pub input_structures: Vec<ElementId>,
    /// Structure that receives every generated construction.
    pub output_structure: ElementId,
    /// Goal pattern for target-directed runs.
    pub target_structure: Option<ElementId>,
}

impl InferenceParams {
    /// Target-directed when a target is given, otherwise all rules once.
    pub fn mode(&self) -> InferenceMode {
        if self.target_structure.is_some() {
            InferenceMode::Target
        } else {
            InferenceMode::All
        }
    }

    /// Force `mode`. `All` drops the target; `Target` needs one.
    pub fn set_mode(&mut self, mode: InferenceMode) -> Result<(), ConfigError> {
        match mode {
            InferenceMode::All => self.target_structure = None,
            InferenceMode::Target if self.target_structure.is_none() => {
                return Err(ConfigError::MissingTarget);
            }
            InferenceMode::Target => {}
        }
        Ok(())
    }
}

/// Phases of a run, for tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferenceState {
    Idle,
    PartitioningFormulas,
    IteratingQueue { queue: usize },
    FormulaApplied,
    FormulaSkipped,
    TargetCheck,
    Terminated { success: bool },
}

/// Runs rules against memory and logs what fired.
pub struct InferenceManager<'a> {
    memory: &'a Memory,
    keynodes: &'a Keynodes,
    config: InferenceConfig,
    searcher: TemplateSearcher<'a>,
    solution_tree: Box<dyn SolutionTreeManager + 'a>,
    arguments: Vec<ElementId>,
    state: InferenceState,
    fired: usize,
}

impl fmt::Debug for InferenceManager<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InferenceManager")
            .field("config", &self.config)
            .field("searcher", &self.searcher)
            .field("solution_tree", &self.solution_tree)
            .field("state", &self.state)
            .field("fired", &self.fired)
            .finish()
    }
}

impl<'a> InferenceManager<'a> {
    /// Validate `config` and build the searcher and solution tree it selects.
    pub fn new(memory: &'a Memory, keynodes: &'a Keynodes, config: InferenceConfig) -> InferResult<Self> {
        config.validate()?;
        let searcher = TemplateSearcher::new(memory, keynodes, scope_for(config.search))
            .with_replacements_using(config.replacements);
        let solution_tree = solution_tree_for(memory, keynodes, config.solution_tree)?;
        Ok(Self {
            memory,
            keynodes,
            config,
            searcher,
            solution_tree,
            arguments: Vec::new(),
            state: InferenceState::Idle,
            fired: 0,
        })
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    pub fn solution_tree(&self) -> &dyn SolutionTreeManager {
        &*self.solution_tree
    }

    pub fn state(&self) -> InferenceState {
        self.state
    }

    /// Rules that generated something during the last run, counted per firing.
    pub fn fired(&self) -> usize {
        self.fired
    }

    /// Run inference in the mode `params` implies.
    ///
    /// Returns whether the target was reached or, without a target, whether
    /// any rule generated something.
    pub fn apply_inference(&mut self, params: &InferenceParams) -> InferResult<bool> {
        let mode = params.mode();
        tracing::info!(
            mode = %mode,
            formulas = %self.memory.label(params.formulas_set),
            arguments = params.arguments.len(),
            input_structures = params.input_structures.len(),
            search = self.searcher.scope_name(),
            "starting inference"
        );

        self.arguments = params.arguments.clone();
        self.fired = 0;
        self.searcher = TemplateSearcher::new(self.memory, self.keynodes, scope_for(self.config.search))
            .with_replacements_using(self.config.replacements)
            .with_input_structures(params.input_structures.clone());

        let mut output = OutputStructure::load(self.memory, params.output_structure);
        let result = match (mode, params.target_structure) {
            (InferenceMode::Target, Some(target)) => self.apply_target(params, target, &mut output),
            _ => self.apply_all(params, &mut output),
        };

        if let Err(err) = &result {
            let solution = self.solution_tree.solution();
            SolutionEraser::new(self.memory, self.keynodes).erase(solution);
            tracing::warn!(solution = %solution, error = %err, "inference failed, solution discarded");
        }

        let success = *result.as_ref().unwrap_or(&false);
        self.set_state(InferenceState::Terminated { success });
        tracing::info!(
            mode = %mode,
            fired = self.fired,
            output = output.len(),
            success,
            "inference finished"
        );
        result
    }

    /// Mark the solution of this run and attach the output structure.
    pub fn generate_solution(&self, output_structure: ElementId, target_achieved: bool) -> InferResult<ElementId> {
        self.solution_tree.generate_solution(output_structure, target_achieved)
    }

    fn set_state(&mut self, state: InferenceState) {
        tracing::trace!(from = ?self.state, to = ?state, "inference state");
        self.state = state;
    }

    /// Priority queues of `formulas_set`: the group under `rrel_1` first,
    /// then the groups that follow it along `nrel_basic_sequence`. Each
    /// queue holds the rule nodes of its group in memory order.
    pub fn formula_queues(&mut self, formulas_set: ElementId) -> InferResult<Vec<Vec<ElementId>>> {
        self.set_state(InferenceState::PartitioningFormulas);
        let memory = self.memory;
        let mut queues = Vec::new();
        let mut seen = HashSet::new();
        let mut group = relations::any_by_out_relation(memory, formulas_set, self.keynodes.rrel_1());
        while let Some(set) = group {
            if !seen.insert(set) {
                break;
            }
            queues.push(relations::members(memory, set, ElementType::is_node));
            group = relations::next_in_sequence(memory, formulas_set, set, self.keynodes.nrel_basic_sequence);
        }

        if queues.is_empty() {
            return Err(FormulaError::ItemNotFound {
                message: format!("no formulas sets found in {}", memory.label(formulas_set)),
            }
            .into());
        }
        tracing::debug!(queues = queues.len(), "partitioned formulas");
        Ok(queues)
    }

    /// Evaluate one rule.
    ///
    /// The rule's root formula hangs off `rrel_main_key_sc_element`. A rule
    /// that lists variables under `rrel_1`, `rrel_2`, ... binds them to the
    /// arguments positionally; otherwise arguments are matched by class.
    pub fn use_formula(&self, formula: ElementId, output: &mut OutputStructure) -> InferResult<LogicFormulaResult> {
        let memory = self.memory;
        let Some(root) = relations::any_by_out_relation(memory, formula, self.keynodes.rrel_main_key_sc_element)
        else {
            tracing::warn!(formula = %memory.label(formula), "rule has no root formula, skipping");
            return Ok(LogicFormulaResult::fail());
        };

        let binding = match self.fixed_arguments(formula) {
            Some(variables) => ArgumentBinding::Fixed(variables),
            None => ArgumentBinding::ByClass,
        };
        let templates = TemplateManager::new(memory, binding)
            .with_arguments(self.arguments.clone())
            .with_settings(GenerationSettings::from(&self.config));

        let tree = ExpressionBuilder::new(memory, self.keynodes).build(root)?;
        let mut ctx = EvalContext {
            memory,
            keynodes: self.keynodes,
            searcher: &self.searcher,
            templates: &templates,
            output,
        };
        tree.compute(&mut ctx)
    }

    /// Variables under `rrel_1` .. `rrel_10`, stopping at the first gap.
    fn fixed_arguments(&self, formula: ElementId) -> Option<Vec<ElementId>> {
        let variables: Vec<ElementId> = (1..=MAX_ROLE_RELATION)
            .map_while(|n| {
                let role = self.keynodes.rrel(n)?;
                relations::any_by_out_relation(self.memory, formula, role)
            })
            .collect();
        (!variables.is_empty()).then_some(variables)
    }

    /// Record a rule that generated something.
    fn record(&mut self, formula: ElementId, result: &LogicFormulaResult) -> InferResult<()> {
        self.fired += 1;
        self.set_state(InferenceState::FormulaApplied);
        tracing::debug!(
            formula = %self.memory.label(formula),
            rows = result.replacements.row_count(),
            "rule generated"
        );
        if !self.solution_tree.add_node(formula, &result.replacements)? {
            tracing::warn!(formula = %self.memory.label(formula), "solution entry could not be chained");
        }
        Ok(())
    }
}
