//! Well-known elements the engine reads and writes by identifier.
//!
//! [`Keynodes`] is resolved once per [`Memory`] and passed by reference to
//! every component that needs it. Resolving finds each keynode by system
//! identifier or creates it with its canonical type.

use crate::element::{ElementId, ElementType};
use crate::memory::{Memory, MemoryResult};

/// System identifiers of the keynodes.
pub mod idtf {
    pub const ATOMIC_LOGICAL_FORMULA: &str = "atomic_logical_formula";
    pub const NREL_NEGATION: &str = "nrel_negation";
    pub const NREL_CONJUNCTION: &str = "nrel_conjunction";
    pub const NREL_DISJUNCTION: &str = "nrel_disjunction";
    pub const NREL_IMPLICATION: &str = "nrel_implication";
    pub const NREL_EQUIVALENCE: &str = "nrel_equivalence";
    pub const CONCEPT_TEMPLATE_FOR_GENERATION: &str = "concept_template_for_generation";
    pub const CONCEPT_TEMPLATE_WITH_LINKS: &str = "concept_template_with_links";
    pub const CONCEPT_SOLUTION: &str = "concept_solution";
    pub const CONCEPT_SUCCESS_SOLUTION: &str = "concept_success_solution";
    pub const NREL_OUTPUT_STRUCTURE: &str = "nrel_output_structure";
    pub const NREL_BASIC_SEQUENCE: &str = "nrel_basic_sequence";
    pub const RREL_MAIN_KEY_SC_ELEMENT: &str = "rrel_main_key_sc_element";
    pub const RREL_IF: &str = "rrel_if";
    pub const RREL_THEN: &str = "rrel_then";
}

/// Highest ordinal role relation (`rrel_10`).
pub const MAX_ROLE_RELATION: usize = 10;

/// Resolved keynode handles.
#[derive(Debug, Clone)]
pub struct Keynodes {
    pub atomic_logical_formula: ElementId,
    pub nrel_negation: ElementId,
    pub nrel_conjunction: ElementId,
    pub nrel_disjunction: ElementId,
    pub nrel_implication: ElementId,
    pub nrel_equivalence: ElementId,
    pub concept_template_for_generation: ElementId,
    pub concept_template_with_links: ElementId,
    pub concept_solution: ElementId,
    pub concept_success_solution: ElementId,
    pub nrel_output_structure: ElementId,
    pub nrel_basic_sequence: ElementId,
    pub rrel_main_key_sc_element: ElementId,
    pub rrel_if: ElementId,
    pub rrel_then: ElementId,
    /// `rrel_1` ..= `rrel_10`, index 0 is `rrel_1`.
    ordinals: Vec<ElementId>,
}

impl Keynodes {
    /// Find or create every keynode in `memory`.
    pub fn resolve(memory: &Memory) -> MemoryResult<Self> {
        let class = |name: &str| memory.resolve(name, ElementType::CONST_CLASS);
        let norole = |name: &str| memory.resolve(name, ElementType::CONST_NOROLE);
        let role = |name: &str| memory.resolve(name, ElementType::CONST_ROLE);

        let ordinals = (1..=MAX_ROLE_RELATION)
            .map(|i| role(&format!("rrel_{i}")))
            .collect::<MemoryResult<Vec<_>>>()?;

        Ok(Self {
            atomic_logical_formula: class(idtf::ATOMIC_LOGICAL_FORMULA)?,
            nrel_negation: norole(idtf::NREL_NEGATION)?,
            nrel_conjunction: norole(idtf::NREL_CONJUNCTION)?,
            nrel_disjunction: norole(idtf::NREL_DISJUNCTION)?,
            nrel_implication: norole(idtf::NREL_IMPLICATION)?,
            nrel_equivalence: norole(idtf::NREL_EQUIVALENCE)?,
            concept_template_for_generation: class(idtf::CONCEPT_TEMPLATE_FOR_GENERATION)?,
            concept_template_with_links: class(idtf::CONCEPT_TEMPLATE_WITH_LINKS)?,
            concept_solution: class(idtf::CONCEPT_SOLUTION)?,
            concept_success_solution: class(idtf::CONCEPT_SUCCESS_SOLUTION)?,
            nrel_output_structure: norole(idtf::NREL_OUTPUT_STRUCTURE)?,
            nrel_basic_sequence: norole(idtf::NREL_BASIC_SEQUENCE)?,
            rrel_main_key_sc_element: role(idtf::RREL_MAIN_KEY_SC_ELEMENT)?,
            rrel_if: role(idtf::RREL_IF)?,
            rrel_then: role(idtf::RREL_THEN)?,
            ordinals,
        })
    }

    /// The ordinal role relation `rrel_<n>`, for `n` in `1..=10`.
    pub fn rrel(&self, n: usize) -> Option<ElementId> {
        n.checked_sub(1).and_then(|i| self.ordinals.get(i).copied())
    }

    pub fn rrel_1(&self) -> ElementId {
        self.ordinals[0]
    }

    pub fn rrel_2(&self) -> ElementId {
        self.ordinals[1]
    }
}
