//! Formula classification.
//!
//! A formula's kind is read from which marker relation it belongs to,
//! checked in a fixed priority order: atomic, negation, conjunction,
//! disjunction, implication, equivalence. The first marker that matches
//! wins. Implications and equivalences are further split by their own
//! shape: a common arc (or edge) between two operands, or a tuple.

use std::fmt;

use crate::element::{ConnectorKind, ElementId, ElementKind, ElementType, NodeKind};
use crate::keynodes::Keynodes;
use crate::memory::{Memory, relations};

/// Syntactic kind of a formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormulaKind {
    /// The formula element does not exist.
    Invalid,
    /// No marker matched.
    Unclassified,
    Atomic,
    Negation,
    Conjunction,
    Disjunction,
    /// `premise => conclusion` as a directed common arc.
    ImplicationEdge,
    /// A tuple with `rrel_if` and `rrel_then` operands.
    ImplicationTuple,
    /// `left <=> right` as an undirected common edge.
    EquivalenceEdge,
    /// A tuple of operands.
    EquivalenceTuple,
}

impl FormulaKind {
    pub fn is_valid(self) -> bool {
        !matches!(self, FormulaKind::Invalid | FormulaKind::Unclassified)
    }
}

impl fmt::Display for FormulaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FormulaKind::Invalid => "invalid",
            FormulaKind::Unclassified => "unclassified",
            FormulaKind::Atomic => "atomic",
            FormulaKind::Negation => "negation",
            FormulaKind::Conjunction => "conjunction",
            FormulaKind::Disjunction => "disjunction",
            FormulaKind::ImplicationEdge => "implication (edge)",
            FormulaKind::ImplicationTuple => "implication (tuple)",
            FormulaKind::EquivalenceEdge => "equivalence (edge)",
            FormulaKind::EquivalenceTuple => "equivalence (tuple)",
        };
        f.write_str(name)
    }
}

/// Reads formula kinds and flags from memory. Never writes.
#[derive(Debug, Clone, Copy)]
pub struct FormulaClassifier<'a> {
    memory: &'a Memory,
    keynodes: &'a Keynodes,
}

impl<'a> FormulaClassifier<'a> {
    pub fn new(memory: &'a Memory, keynodes: &'a Keynodes) -> Self {
        Self { memory, keynodes }
    }

    /// Classify `formula` by its marker relations and shape.
    pub fn classify(&self, formula: ElementId) -> FormulaKind {
        let Some(ty) = self.memory.element_type(formula) else {
            tracing::debug!(formula = %formula, "formula does not exist");
            return FormulaKind::Invalid;
        };
        let k = self.keynodes;
        let marked = |class: ElementId| self.memory.is_member(class, formula);

        let kind = if marked(k.atomic_logical_formula) {
            FormulaKind::Atomic
        } else if marked(k.nrel_negation) {
            FormulaKind::Negation
        } else if marked(k.nrel_conjunction) {
            FormulaKind::Conjunction
        } else if marked(k.nrel_disjunction) {
            FormulaKind::Disjunction
        } else if marked(k.nrel_implication) {
            match ty.kind {
                ElementKind::Connector(ConnectorKind::CommonArc) => FormulaKind::ImplicationEdge,
                ElementKind::Node(NodeKind::Tuple) => FormulaKind::ImplicationTuple,
                _ => FormulaKind::Unclassified,
            }
        } else if marked(k.nrel_equivalence) {
            match ty.kind {
                ElementKind::Connector(ConnectorKind::CommonEdge) if ty.is_const() => {
                    FormulaKind::EquivalenceEdge
                }
                ElementKind::Node(NodeKind::Tuple) => FormulaKind::EquivalenceTuple,
                _ => FormulaKind::Unclassified,
            }
        } else if ty == ElementType::CONST_STRUCTURE && self.has_variables(formula) {
            // Unmarked pattern structures are plain atomic templates.
            FormulaKind::Atomic
        } else {
            FormulaKind::Unclassified
        };

        tracing::debug!(formula = %self.memory.label(formula), %kind, "classified formula");
        kind
    }

    /// The formula's own members include a constant node or link.
    pub fn has_constants(&self, formula: ElementId) -> bool {
        !relations::members(self.memory, formula, |t| {
            t.is_const() && (t.is_node() || t.is_link())
        })
        .is_empty()
    }

    /// The formula's own members include a variable element.
    pub fn has_variables(&self, formula: ElementId) -> bool {
        !relations::members(self.memory, formula, ElementType::is_var).is_empty()
    }

    /// The formula belongs to `concept_template_for_generation`.
    pub fn is_marked_for_generation(&self, formula: ElementId) -> bool {
        self.memory
            .is_member(self.keynodes.concept_template_for_generation, formula)
    }

    /// The formula belongs to `concept_template_with_links`.
    pub fn has_content_links(&self, formula: ElementId) -> bool {
        self.memory
            .is_member(self.keynodes.concept_template_with_links, formula)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Memory, Keynodes) {
        let memory = Memory::new();
        let keynodes = Keynodes::resolve(&memory).unwrap();
        (memory, keynodes)
    }

    fn mark(memory: &Memory, class: ElementId, element: ElementId) {
        memory
            .create_connector(ElementType::CONST_PERM_POS_ARC, class, element)
            .unwrap();
    }

    #[test]
    fn markers_in_priority_order() {
        let (memory, k) = setup();
        let classifier = FormulaClassifier::new(&memory, &k);

        let formula = memory.create_node(ElementType::CONST_TUPLE).unwrap();
        assert_eq!(classifier.classify(formula), FormulaKind::Unclassified);

        mark(&memory, k.nrel_disjunction, formula);
        assert_eq!(classifier.classify(formula), FormulaKind::Disjunction);

        // Conjunction outranks disjunction.
        mark(&memory, k.nrel_conjunction, formula);
        assert_eq!(classifier.classify(formula), FormulaKind::Conjunction);

        mark(&memory, k.atomic_logical_formula, formula);
        assert_eq!(classifier.classify(formula), FormulaKind::Atomic);
        // Pure function of the graph.
        assert_eq!(classifier.classify(formula), classifier.classify(formula));
    }

    #[test]
    fn implication_and_equivalence_shapes() {
        let (memory, k) = setup();
        let classifier = FormulaClassifier::new(&memory, &k);
        let a = memory.create_node(ElementType::CONST_STRUCTURE).unwrap();
        let b = memory.create_node(ElementType::CONST_STRUCTURE).unwrap();

        let arc = memory
            .create_connector(ElementType::CONST_COMMON_ARC, a, b)
            .unwrap();
        mark(&memory, k.nrel_implication, arc);
        assert_eq!(classifier.classify(arc), FormulaKind::ImplicationEdge);

        let tuple = memory.create_node(ElementType::CONST_TUPLE).unwrap();
        mark(&memory, k.nrel_implication, tuple);
        assert_eq!(classifier.classify(tuple), FormulaKind::ImplicationTuple);

        let edge = memory
            .create_connector(ElementType::CONST_COMMON_EDGE, a, b)
            .unwrap();
        mark(&memory, k.nrel_equivalence, edge);
        assert_eq!(classifier.classify(edge), FormulaKind::EquivalenceEdge);

        let plain = memory.create_node(ElementType::CONST_NODE).unwrap();
        mark(&memory, k.nrel_equivalence, plain);
        assert_eq!(classifier.classify(plain), FormulaKind::Unclassified);

        let ghost = ElementId::new(99_999).unwrap();
        assert_eq!(classifier.classify(ghost), FormulaKind::Invalid);
    }

    #[test]
    fn flags() {
        let (memory, k) = setup();
        let classifier = FormulaClassifier::new(&memory, &k);
        let formula = memory.create_node(ElementType::CONST_STRUCTURE).unwrap();
        assert!(!classifier.has_constants(formula));
        assert!(!classifier.is_marked_for_generation(formula));

        let var = memory.create_node(ElementType::VAR_NODE).unwrap();
        mark(&memory, formula, var);
        assert!(!classifier.has_constants(formula));
        assert!(classifier.has_variables(formula));
        // Unmarked structure with variables.
        assert_eq!(classifier.classify(formula), FormulaKind::Atomic);

        let class = memory.create_node(ElementType::CONST_CLASS).unwrap();
        mark(&memory, formula, class);
        assert!(classifier.has_constants(formula));

        mark(&memory, k.concept_template_for_generation, formula);
        mark(&memory, k.concept_template_with_links, formula);
        assert!(classifier.is_marked_for_generation(formula));
        assert!(classifier.has_content_links(formula));
    }
}
