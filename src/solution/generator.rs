//! Writes solution nodes and their entries.
//!
//! Layout of one solution:
//!
//! ```text
//! concept_solution -> solution
//! solution -> rrel_1: entry_1
//! (solution -> entry_1) =>nrel_basic_sequence: (solution -> entry_2)
//! entry -> rrel_1: formula
//! entry -> rrel_2: substitutions
//! substitutions -> pair
//! pair -> rrel_1: value
//! pair -> rrel_2: variable
//! variable ~> value            (temporary arc)
//! ```

use std::collections::BTreeSet;

use crate::element::{ConnectorKind, ElementId, ElementType};
use crate::error::{FormulaError, InferResult};
use crate::keynodes::Keynodes;
use crate::memory::{Memory, MemoryResult, relations};
use crate::template::TemplateParams;

#[derive(Debug)]
pub struct SolutionTreeGenerator<'a> {
    memory: &'a Memory,
    keynodes: &'a Keynodes,
    solution: ElementId,
    last_entry: Option<ElementId>,
}

impl<'a> SolutionTreeGenerator<'a> {
    /// Create a fresh solution node in `concept_solution`.
    pub fn new(memory: &'a Memory, keynodes: &'a Keynodes) -> MemoryResult<Self> {
        let solution = memory.create_node(ElementType::CONST_NODE)?;
        memory.create_connector(
            ElementType::CONST_PERM_POS_ARC,
            keynodes.concept_solution,
            solution,
        )?;
        Ok(Self {
            memory,
            keynodes,
            solution,
            last_entry: None,
        })
    }

    pub fn solution(&self) -> ElementId {
        self.solution
    }

    /// Append an entry for `formula` fired with `params`.
    ///
    /// Returns `false` if the entry could not be chained after the previous one.
    pub fn add_node(
        &mut self,
        formula: ElementId,
        params: &TemplateParams,
        variables: &BTreeSet<ElementId>,
    ) -> InferResult<bool> {
        let entry = self.create_entry(formula, params, variables)?;
        let chained = match self.last_entry {
            None => {
                relations::connect_by_relation(self.memory, self.solution, entry, self.keynodes.rrel_1())?;
                true
            }
            Some(last) => {
                let previous = self
                    .memory
                    .iterate3(Some(self.solution), Some(ConnectorKind::PermPosArc), Some(last))
                    .first()
                    .map(|t| t.connector);
                match previous {
                    Some(previous) => {
                        let next = self.memory.create_connector(
                            ElementType::CONST_PERM_POS_ARC,
                            self.solution,
                            entry,
                        )?;
                        relations::link_in_sequence(
                            self.memory,
                            previous,
                            next,
                            self.keynodes.nrel_basic_sequence,
                        )?;
                        true
                    }
                    None => false,
                }
            }
        };
        self.last_entry = Some(entry);
        Ok(chained)
    }

    fn create_entry(
        &self,
        formula: ElementId,
        params: &TemplateParams,
        variables: &BTreeSet<ElementId>,
    ) -> InferResult<ElementId> {
        let memory = self.memory;
        let entry = memory.create_node(ElementType::CONST_NODE)?;
        relations::connect_by_relation(memory, entry, formula, self.keynodes.rrel_1())?;
        let substitutions = memory.create_node(ElementType::CONST_NODE)?;
        relations::connect_by_relation(memory, entry, substitutions, self.keynodes.rrel_2())?;

        for variable in variables {
            let value = params.get(variable).copied().ok_or_else(|| FormulaError::ItemNotFound {
                message: format!(
                    "formula {} has variable {} but the bindings have no value for it",
                    memory.label(formula),
                    memory.label(*variable)
                ),
            })?;
            let pair = memory.create_node(ElementType::CONST_NODE)?;
            memory.create_connector(ElementType::CONST_PERM_POS_ARC, substitutions, pair)?;
            relations::connect_by_relation(memory, pair, value, self.keynodes.rrel_1())?;
            relations::connect_by_relation(memory, pair, *variable, self.keynodes.rrel_2())?;
            memory.create_connector(ElementType::CONST_TEMP_POS_ARC, *variable, value)?;
        }
        Ok(entry)
    }

    /// Mark the solution successful or not and attach the output structure.
    pub fn generate_solution(
        &self,
        output_structure: ElementId,
        target_achieved: bool,
    ) -> MemoryResult<ElementId> {
        let marker = if target_achieved {
            ElementType::CONST_PERM_POS_ARC
        } else {
            ElementType::CONST_PERM_NEG_ARC
        };
        self.memory
            .create_connector(marker, self.keynodes.concept_success_solution, self.solution)?;
        relations::connect_by_relation(
            self.memory,
            self.solution,
            output_structure,
            self.keynodes.nrel_output_structure,
        )?;
        Ok(self.solution)
    }
}
