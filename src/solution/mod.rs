//! Solution trees: the provenance log of an inference run.
//!
//! Every rule that fires appends an entry naming the rule and the
//! variable substitutions it fired with. Entries are chained in firing
//! order under one solution node, which is finally marked successful or
//! failed and linked to the run's output structure.
//!
//! Two managers implement [`SolutionTreeManager`]: [`FullSolutionTree`]
//! records entries, [`EmptySolutionTree`] only creates the final solution.

pub mod erase;
pub mod generator;
pub mod searcher;

use std::collections::BTreeSet;
use std::fmt;

use crate::config::SolutionTreeType;
use crate::element::ElementId;
use crate::error::InferResult;
use crate::keynodes::Keynodes;
use crate::memory::{Memory, MemoryResult};
use crate::replacements::Replacements;
use crate::template::TemplateParams;

pub use erase::SolutionEraser;
pub use generator::SolutionTreeGenerator;
pub use searcher::{SolutionEntry, SolutionTreeSearcher};

/// Records fired rules for one inference run.
pub trait SolutionTreeManager: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Record `formula` once per row of `replacements`.
    ///
    /// Returns the conjunction of the per-row results.
    fn add_node(&mut self, formula: ElementId, replacements: &Replacements) -> InferResult<bool>;

    /// Whether `formula` was already recorded with the same value for each
    /// of `variables`.
    fn check_if_solution_node_exists(
        &self,
        formula: ElementId,
        params: &TemplateParams,
        variables: &BTreeSet<ElementId>,
    ) -> InferResult<bool>;

    /// Mark the solution and attach `output_structure`.
    fn generate_solution(&self, output_structure: ElementId, target_achieved: bool) -> InferResult<ElementId>;

    /// The solution node of this run.
    fn solution(&self) -> ElementId;

    /// Entries recorded so far, in order.
    fn entries(&self) -> Vec<SolutionEntry>;
}

impl fmt::Debug for dyn SolutionTreeManager + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SolutionTreeManager")
            .field("name", &self.name())
            .field("solution", &self.solution())
            .finish()
    }
}

/// Records every fired rule.
#[derive(Debug)]
pub struct FullSolutionTree<'a> {
    generator: SolutionTreeGenerator<'a>,
    searcher: SolutionTreeSearcher<'a>,
}

impl<'a> FullSolutionTree<'a> {
    pub fn new(memory: &'a Memory, keynodes: &'a Keynodes) -> MemoryResult<Self> {
        Ok(Self {
            generator: SolutionTreeGenerator::new(memory, keynodes)?,
            searcher: SolutionTreeSearcher::new(memory, keynodes),
        })
    }
}

impl SolutionTreeManager for FullSolutionTree<'_> {
    fn name(&self) -> &str {
        "full"
    }

    fn add_node(&mut self, formula: ElementId, replacements: &Replacements) -> InferResult<bool> {
        let variables = replacements.key_set();
        let mut added = true;
        for params in replacements.to_params_list() {
            added &= self.generator.add_node(formula, &params, &variables)?;
        }
        Ok(added)
    }

    fn check_if_solution_node_exists(
        &self,
        formula: ElementId,
        params: &TemplateParams,
        variables: &BTreeSet<ElementId>,
    ) -> InferResult<bool> {
        Ok(self
            .searcher
            .check_if_solution_node_exists(formula, params, variables)?)
    }

    fn generate_solution(&self, output_structure: ElementId, target_achieved: bool) -> InferResult<ElementId> {
        Ok(self.generator.generate_solution(output_structure, target_achieved)?)
    }

    fn solution(&self) -> ElementId {
        self.generator.solution()
    }

    fn entries(&self) -> Vec<SolutionEntry> {
        self.searcher.entries(self.generator.solution())
    }
}

/// Writes no entries. Used when only the output structure matters.
#[derive(Debug)]
pub struct EmptySolutionTree<'a> {
    inner: FullSolutionTree<'a>,
}

impl<'a> EmptySolutionTree<'a> {
    pub fn new(memory: &'a Memory, keynodes: &'a Keynodes) -> MemoryResult<Self> {
        Ok(Self {
            inner: FullSolutionTree::new(memory, keynodes)?,
        })
    }
}

impl SolutionTreeManager for EmptySolutionTree<'_> {
    fn name(&self) -> &str {
        "empty"
    }

    fn add_node(&mut self, _formula: ElementId, _replacements: &Replacements) -> InferResult<bool> {
        Ok(true)
    }

    fn check_if_solution_node_exists(
        &self,
        formula: ElementId,
        params: &TemplateParams,
        variables: &BTreeSet<ElementId>,
    ) -> InferResult<bool> {
        self.inner.check_if_solution_node_exists(formula, params, variables)
    }

    fn generate_solution(&self, output_structure: ElementId, target_achieved: bool) -> InferResult<ElementId> {
        self.inner.generate_solution(output_structure, target_achieved)
    }

    fn solution(&self) -> ElementId {
        self.inner.solution()
    }

    fn entries(&self) -> Vec<SolutionEntry> {
        Vec::new()
    }
}

/// The manager matching `mode`.
pub fn solution_tree_for<'a>(
    memory: &'a Memory,
    keynodes: &'a Keynodes,
    mode: SolutionTreeType,
) -> MemoryResult<Box<dyn SolutionTreeManager + 'a>> {
    Ok(if mode.records_entries() {
        Box::new(FullSolutionTree::new(memory, keynodes)?)
    } else {
        Box::new(EmptySolutionTree::new(memory, keynodes)?)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{ConnectorKind, ElementType};
    use crate::kb::KnowledgeBuilder;

    struct Fixture {
        memory: Memory,
        keynodes: Keynodes,
    }

    impl Fixture {
        fn new() -> Self {
            let memory = Memory::new();
            let keynodes = Keynodes::resolve(&memory).unwrap();
            Self { memory, keynodes }
        }

        fn kb(&self) -> KnowledgeBuilder<'_> {
            KnowledgeBuilder::new(&self.memory, &self.keynodes)
        }
    }

    fn single(var: ElementId, value: ElementId) -> Replacements {
        let row = TemplateParams::from([(var, value)]);
        Replacements::from_params([var], [&row])
    }

    #[test]
    fn refire_guard_matches_recorded_bindings_only() {
        let fx = Fixture::new();
        let kb = fx.kb();
        let formula = kb.node("rule").unwrap();
        let x = kb.var("_x").unwrap();
        let n1 = kb.node("n1").unwrap();
        let n2 = kb.node("n2").unwrap();

        let mut tree = FullSolutionTree::new(&fx.memory, &fx.keynodes).unwrap();
        assert!(tree.add_node(formula, &single(x, n1)).unwrap());

        let vars = BTreeSet::from([x]);
        let same = TemplateParams::from([(x, n1)]);
        let other = TemplateParams::from([(x, n2)]);
        assert!(tree.check_if_solution_node_exists(formula, &same, &vars).unwrap());
        assert!(!tree.check_if_solution_node_exists(formula, &other, &vars).unwrap());

        let elsewhere = kb.node("other_rule").unwrap();
        assert!(!tree.check_if_solution_node_exists(elsewhere, &same, &vars).unwrap());

        // A variable without a value cannot be checked.
        let missing = BTreeSet::from([x, kb.var("_y").unwrap()]);
        assert!(tree.check_if_solution_node_exists(formula, &same, &missing).is_err());
    }

    #[test]
    fn entries_keep_firing_order() {
        let fx = Fixture::new();
        let kb = fx.kb();
        let first = kb.node("first").unwrap();
        let second = kb.node("second").unwrap();
        let x = kb.var("_x").unwrap();
        let n1 = kb.node("n1").unwrap();
        let n2 = kb.node("n2").unwrap();

        let mut tree = FullSolutionTree::new(&fx.memory, &fx.keynodes).unwrap();
        tree.add_node(first, &single(x, n1)).unwrap();
        tree.add_node(second, &single(x, n2)).unwrap();
        tree.add_node(first, &single(x, n2)).unwrap();

        let entries = tree.entries();
        let fired: Vec<_> = entries.iter().map(|e| e.formula).collect();
        assert_eq!(fired, vec![first, second, first]);
        assert_eq!(entries[1].substitutions, vec![(x, n2)]);
        assert!(fx.memory.check_connector(x, n1, ConnectorKind::TempPosArc));
    }

    #[test]
    fn one_entry_per_row() {
        let fx = Fixture::new();
        let kb = fx.kb();
        let formula = kb.node("rule").unwrap();
        let x = kb.var("_x").unwrap();
        let rows = [
            TemplateParams::from([(x, kb.node("n1").unwrap())]),
            TemplateParams::from([(x, kb.node("n2").unwrap())]),
        ];
        let replacements = Replacements::from_params([x], rows.iter());

        let mut tree = FullSolutionTree::new(&fx.memory, &fx.keynodes).unwrap();
        assert!(tree.add_node(formula, &replacements).unwrap());
        assert_eq!(tree.entries().len(), 2);
    }

    #[test]
    fn empty_tree_writes_no_entries() {
        let fx = Fixture::new();
        let kb = fx.kb();
        let formula = kb.node("rule").unwrap();
        let x = kb.var("_x").unwrap();
        let n1 = kb.node("n1").unwrap();

        let mut tree = solution_tree_for(&fx.memory, &fx.keynodes, SolutionTreeType::OnlyOutputStructure)
            .unwrap();
        assert_eq!(tree.name(), "empty");
        let before = fx.memory.element_count();
        assert!(tree.add_node(formula, &single(x, n1)).unwrap());
        assert_eq!(fx.memory.element_count(), before);
        assert!(tree.entries().is_empty());
    }

    #[test]
    fn generated_solution_is_marked() {
        let fx = Fixture::new();
        let output = fx.memory.create_node(ElementType::CONST_STRUCTURE).unwrap();
        let tree = solution_tree_for(&fx.memory, &fx.keynodes, SolutionTreeType::Full).unwrap();
        let solution = tree.generate_solution(output, false).unwrap();

        let searcher = SolutionTreeSearcher::new(&fx.memory, &fx.keynodes);
        assert_eq!(searcher.is_successful(solution), Some(false));
        assert_eq!(searcher.output_structure(solution), Some(output));
        assert_eq!(searcher.solutions(), vec![solution]);
    }

    #[test]
    fn erase_removes_provenance_but_keeps_facts() {
        let fx = Fixture::new();
        let kb = fx.kb();
        let formula = kb.node("rule").unwrap();
        let x = kb.var("_x").unwrap();
        let n1 = kb.node("n1").unwrap();
        let output = fx.memory.create_node(ElementType::CONST_STRUCTURE).unwrap();

        let mut tree = FullSolutionTree::new(&fx.memory, &fx.keynodes).unwrap();
        tree.add_node(formula, &single(x, n1)).unwrap();
        let solution = tree.generate_solution(output, true).unwrap();

        let eraser = SolutionEraser::new(&fx.memory, &fx.keynodes);
        assert!(eraser.erase(solution));
        assert!(!fx.memory.is_element(solution));
        assert!(!fx.memory.check_connector(x, n1, ConnectorKind::TempPosArc));
        for kept in [formula, x, n1, output] {
            assert!(fx.memory.is_element(kept));
        }
        assert!(!eraser.erase(solution));
        // Not a solution.
        assert!(!eraser.erase(n1));
    }
}
