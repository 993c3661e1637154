//! Reads solutions back: the re-fire guard and entry listing.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::element::{ConnectorKind, ElementId, ElementType};
use crate::error::FormulaError;
use crate::keynodes::Keynodes;
use crate::memory::{Memory, relations};
use crate::template::TemplateParams;

/// One recorded formula application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SolutionEntry {
    pub node: ElementId,
    pub formula: ElementId,
    /// `(variable, value)` pairs in recording order.
    pub substitutions: Vec<(ElementId, ElementId)>,
}

#[derive(Debug, Clone, Copy)]
pub struct SolutionTreeSearcher<'a> {
    memory: &'a Memory,
    keynodes: &'a Keynodes,
}

impl<'a> SolutionTreeSearcher<'a> {
    pub fn new(memory: &'a Memory, keynodes: &'a Keynodes) -> Self {
        Self { memory, keynodes }
    }

    /// Every solution node in memory.
    pub fn solutions(&self) -> Vec<ElementId> {
        relations::members(self.memory, self.keynodes.concept_solution, ElementType::is_node)
    }

    /// Whether any solution already has an entry for `formula` that binds
    /// each of `variables` the way `params` does.
    pub fn check_if_solution_node_exists(
        &self,
        formula: ElementId,
        params: &TemplateParams,
        variables: &BTreeSet<ElementId>,
    ) -> Result<bool, FormulaError> {
        let mut expected = Vec::with_capacity(variables.len());
        for variable in variables {
            let value = params.get(variable).ok_or_else(|| FormulaError::ItemNotFound {
                message: format!(
                    "formula {} has variable {} but the bindings have no value for it",
                    self.memory.label(formula),
                    self.memory.label(*variable)
                ),
            })?;
            expected.push((*variable, *value));
        }

        Ok(self.solutions().into_iter().any(|solution| {
            relations::members(self.memory, solution, ElementType::is_node)
                .into_iter()
                .any(|entry| self.entry_matches(entry, formula, &expected))
        }))
    }

    fn entry_matches(
        &self,
        entry: ElementId,
        formula: ElementId,
        expected: &[(ElementId, ElementId)],
    ) -> bool {
        let memory = self.memory;
        if !relations::all_by_out_relation(memory, entry, self.keynodes.rrel_1()).contains(&formula) {
            return false;
        }
        relations::all_by_out_relation(memory, entry, self.keynodes.rrel_2())
            .into_iter()
            .any(|substitutions| {
                expected.iter().all(|(variable, value)| {
                    memory.check_connector(*variable, *value, ConnectorKind::TempPosArc)
                        && self.has_pair(substitutions, *variable, *value)
                })
            })
    }

    fn has_pair(&self, substitutions: ElementId, variable: ElementId, value: ElementId) -> bool {
        relations::members(self.memory, substitutions, ElementType::is_node)
            .into_iter()
            .any(|pair| self.pair(pair) == Some((variable, value)))
    }

    fn pair(&self, pair: ElementId) -> Option<(ElementId, ElementId)> {
        let value = relations::any_by_out_relation(self.memory, pair, self.keynodes.rrel_1())?;
        let variable = relations::any_by_out_relation(self.memory, pair, self.keynodes.rrel_2())?;
        Some((variable, value))
    }

    /// The entries of `solution` in the order they were recorded.
    pub fn entries(&self, solution: ElementId) -> Vec<SolutionEntry> {
        let sequence = self.keynodes.nrel_basic_sequence;
        let mut entries = Vec::new();
        let mut current = relations::any_by_out_relation(self.memory, solution, self.keynodes.rrel_1());
        while let Some(node) = current {
            if let Some(entry) = self.read_entry(node) {
                entries.push(entry);
            }
            current = relations::next_in_sequence(self.memory, solution, node, sequence);
        }
        entries
    }

    fn read_entry(&self, node: ElementId) -> Option<SolutionEntry> {
        let formula = relations::any_by_out_relation(self.memory, node, self.keynodes.rrel_1())?;
        let substitutions = relations::any_by_out_relation(self.memory, node, self.keynodes.rrel_2())
            .map(|set| {
                relations::members(self.memory, set, ElementType::is_node)
                    .into_iter()
                    .filter_map(|pair| self.pair(pair))
                    .collect()
            })
            .unwrap_or_default();
        Some(SolutionEntry {
            node,
            formula,
            substitutions,
        })
    }

    /// `Some(true)` for a successful solution, `Some(false)` for a failed
    /// one, `None` if the solution was never finalized.
    pub fn is_successful(&self, solution: ElementId) -> Option<bool> {
        self.memory
            .iterate3(Some(self.keynodes.concept_success_solution), None, Some(solution))
            .into_iter()
            .find_map(|t| match self.memory.element_type(t.connector)?.connector_kind()? {
                ConnectorKind::PermPosArc => Some(true),
                ConnectorKind::PermNegArc => Some(false),
                _ => None,
            })
    }

    /// The output structure attached to a finalized solution.
    pub fn output_structure(&self, solution: ElementId) -> Option<ElementId> {
        relations::any_by_out_relation(self.memory, solution, self.keynodes.nrel_output_structure)
    }
}
