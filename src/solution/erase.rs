//! Deleting a recorded solution.

use crate::element::{ConnectorKind, ElementId, ElementType};
use crate::keynodes::Keynodes;
use crate::memory::{Memory, relations};

#[derive(Debug, Clone, Copy)]
pub struct SolutionEraser<'a> {
    memory: &'a Memory,
    keynodes: &'a Keynodes,
}

impl<'a> SolutionEraser<'a> {
    pub fn new(memory: &'a Memory, keynodes: &'a Keynodes) -> Self {
        Self { memory, keynodes }
    }

    /// Erase `solution` with its entries, substitution sets, pair nodes and
    /// the temporary variable-to-value arcs. Formulas, variables and values
    /// stay.
    ///
    /// Returns `false` if `solution` is not a recorded solution.
    pub fn erase(&self, solution: ElementId) -> bool {
        let memory = self.memory;
        if !memory.is_element(solution) || !memory.is_member(self.keynodes.concept_solution, solution) {
            return false;
        }

        let entries = relations::members(memory, solution, ElementType::is_node);
        let mut erased = 0usize;
        for entry in &entries {
            for substitutions in relations::all_by_out_relation(memory, *entry, self.keynodes.rrel_2()) {
                for pair in relations::members(memory, substitutions, ElementType::is_node) {
                    self.erase_binding_arc(pair);
                    memory.erase_element(pair);
                }
                memory.erase_element(substitutions);
            }
            if memory.erase_element(*entry) {
                erased += 1;
            }
        }
        memory.erase_element(solution);
        tracing::debug!(solution = %solution, entries = erased, "erased solution");
        true
    }

    /// One `variable ~> value` arc per pair. Several entries may bind the same
    /// pair, each owning its own arc.
    fn erase_binding_arc(&self, pair: ElementId) {
        let memory = self.memory;
        let value = relations::any_by_out_relation(memory, pair, self.keynodes.rrel_1());
        let variable = relations::any_by_out_relation(memory, pair, self.keynodes.rrel_2());
        if let (Some(value), Some(variable)) = (value, variable) {
            let arc = memory
                .iterate3(Some(variable), Some(ConnectorKind::TempPosArc), Some(value))
                .first()
                .map(|t| t.connector);
            if let Some(arc) = arc {
                memory.erase_element(arc);
            }
        }
    }
}
