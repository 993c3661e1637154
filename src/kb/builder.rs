//! Programmatic construction of facts, formulas and rule sets.
//!
//! [`KnowledgeBuilder`] writes the graph encodings the engine reads: atomic
//! patterns as structures, operator formulas as marked tuples or
//! connectors, rules pointing at their root formula, and formula sets
//! ordered into priority groups.

use crate::element::{ElementId, ElementType};
use crate::keynodes::{Keynodes, MAX_ROLE_RELATION};
use crate::memory::{Memory, MemoryResult, relations};

#[derive(Debug, Clone, Copy)]
enum PatternPart {
    Member {
        set: ElementId,
        element: ElementId,
    },
    Relation {
        source: ElementId,
        relation: ElementId,
        target: ElementId,
    },
}

/// Collects the connectors of one pattern structure.
///
/// Every connector of the pattern is a variable connector; endpoints keep
/// whatever constancy they were created with.
#[derive(Debug, Clone)]
pub struct PatternBuilder<'b> {
    memory: &'b Memory,
    keynodes: &'b Keynodes,
    parts: Vec<PatternPart>,
    extra: Vec<ElementId>,
}

impl<'b> PatternBuilder<'b> {
    /// `set -> element`
    pub fn member(mut self, set: ElementId, element: ElementId) -> Self {
        self.parts.push(PatternPart::Member { set, element });
        self
    }

    /// `source =>relation: target`
    pub fn relation(mut self, source: ElementId, relation: ElementId, target: ElementId) -> Self {
        self.parts.push(PatternPart::Relation {
            source,
            relation,
            target,
        });
        self
    }

    /// Add an element to the structure without a connector, e.g. a link
    /// whose content matters.
    pub fn include(mut self, element: ElementId) -> Self {
        self.extra.push(element);
        self
    }

    /// Write the pattern as an unmarked structure.
    pub fn build(self) -> MemoryResult<ElementId> {
        let memory = self.memory;
        let mut members = Vec::new();
        for part in &self.parts {
            match *part {
                PatternPart::Member { set, element } => {
                    let arc = memory.create_connector(ElementType::VAR_PERM_POS_ARC, set, element)?;
                    members.extend([set, element, arc]);
                }
                PatternPart::Relation {
                    source,
                    relation,
                    target,
                } => {
                    let arc = memory.create_connector(ElementType::VAR_COMMON_ARC, source, target)?;
                    let attr =
                        memory.create_connector(ElementType::VAR_PERM_POS_ARC, relation, arc)?;
                    members.extend([source, target, relation, arc, attr]);
                }
            }
        }
        members.extend(self.extra.iter().copied());

        let structure = memory.create_node(ElementType::CONST_STRUCTURE)?;
        let mut seen = std::collections::HashSet::new();
        for element in members.into_iter().filter(|e| seen.insert(*e)) {
            memory.create_connector(ElementType::CONST_PERM_POS_ARC, structure, element)?;
        }
        Ok(structure)
    }

    /// Write the pattern as an atomic logical formula.
    pub fn atom(self) -> MemoryResult<ElementId> {
        let memory = self.memory;
        let class = self.keynodes.atomic_logical_formula;
        let structure = self.build()?;
        memory.create_connector(ElementType::CONST_PERM_POS_ARC, class, structure)?;
        Ok(structure)
    }
}

/// Writes knowledge into a [`Memory`] using the engine's conventions.
#[derive(Debug, Clone, Copy)]
pub struct KnowledgeBuilder<'a> {
    memory: &'a Memory,
    keynodes: &'a Keynodes,
}

impl<'a> KnowledgeBuilder<'a> {
    pub fn new(memory: &'a Memory, keynodes: &'a Keynodes) -> Self {
        Self { memory, keynodes }
    }

    pub fn memory(&self) -> &'a Memory {
        self.memory
    }

    pub fn keynodes(&self) -> &'a Keynodes {
        self.keynodes
    }

    // -----------------------------------------------------------------------
    // Named elements
    // -----------------------------------------------------------------------

    pub fn node(&self, name: &str) -> MemoryResult<ElementId> {
        self.memory.resolve(name, ElementType::CONST_NODE)
    }

    pub fn class(&self, name: &str) -> MemoryResult<ElementId> {
        self.memory.resolve(name, ElementType::CONST_CLASS)
    }

    /// A non-role relation (`nrel_*`).
    pub fn relation(&self, name: &str) -> MemoryResult<ElementId> {
        self.memory.resolve(name, ElementType::CONST_NOROLE)
    }

    /// A role relation (`rrel_*`).
    pub fn role(&self, name: &str) -> MemoryResult<ElementId> {
        self.memory.resolve(name, ElementType::CONST_ROLE)
    }

    /// A variable node. Variables with the same name are the same element.
    pub fn var(&self, name: &str) -> MemoryResult<ElementId> {
        self.memory.resolve(name, ElementType::VAR_NODE)
    }

    pub fn link(&self, content: &str) -> MemoryResult<ElementId> {
        self.memory.create_link(content)
    }

    pub fn var_link(&self, content: &str) -> MemoryResult<ElementId> {
        self.memory.create_var_link(content)
    }

    // -----------------------------------------------------------------------
    // Facts and sets
    // -----------------------------------------------------------------------

    /// `set -> element` as a constant membership arc.
    pub fn add_member(&self, set: ElementId, element: ElementId) -> MemoryResult<ElementId> {
        self.memory
            .create_connector(ElementType::CONST_PERM_POS_ARC, set, element)
    }

    /// `source =>relation: target`
    pub fn connect(
        &self,
        source: ElementId,
        relation: ElementId,
        target: ElementId,
    ) -> MemoryResult<ElementId> {
        relations::connect_by_relation(self.memory, source, target, relation)
    }

    /// A structure with the given members.
    pub fn structure(&self, elements: &[ElementId]) -> MemoryResult<ElementId> {
        let structure = self.memory.create_node(ElementType::CONST_STRUCTURE)?;
        for element in elements {
            self.add_member(structure, *element)?;
        }
        Ok(structure)
    }

    // -----------------------------------------------------------------------
    // Formulas
    // -----------------------------------------------------------------------

    pub fn pattern(&self) -> PatternBuilder<'a> {
        PatternBuilder {
            memory: self.memory,
            keynodes: self.keynodes,
            parts: Vec::new(),
            extra: Vec::new(),
        }
    }

    fn marked_tuple(&self, marker: ElementId, operands: &[ElementId]) -> MemoryResult<ElementId> {
        let tuple = self.memory.create_node(ElementType::CONST_TUPLE)?;
        for operand in operands {
            self.add_member(tuple, *operand)?;
        }
        self.add_member(marker, tuple)?;
        Ok(tuple)
    }

    pub fn conjunction(&self, operands: &[ElementId]) -> MemoryResult<ElementId> {
        self.marked_tuple(self.keynodes.nrel_conjunction, operands)
    }

    pub fn disjunction(&self, operands: &[ElementId]) -> MemoryResult<ElementId> {
        self.marked_tuple(self.keynodes.nrel_disjunction, operands)
    }

    pub fn negation(&self, operand: ElementId) -> MemoryResult<ElementId> {
        self.marked_tuple(self.keynodes.nrel_negation, &[operand])
    }

    /// `premise => conclusion` as a marked common arc.
    pub fn implication(&self, premise: ElementId, conclusion: ElementId) -> MemoryResult<ElementId> {
        let arc = self
            .memory
            .create_connector(ElementType::CONST_COMMON_ARC, premise, conclusion)?;
        self.add_member(self.keynodes.nrel_implication, arc)?;
        Ok(arc)
    }

    /// Implication as a tuple with `rrel_if` and `rrel_then` operands.
    pub fn implication_tuple(
        &self,
        premise: ElementId,
        conclusion: ElementId,
    ) -> MemoryResult<ElementId> {
        let tuple = self.memory.create_node(ElementType::CONST_TUPLE)?;
        self.connect(tuple, self.keynodes.rrel_if, premise)?;
        self.connect(tuple, self.keynodes.rrel_then, conclusion)?;
        self.add_member(self.keynodes.nrel_implication, tuple)?;
        Ok(tuple)
    }

    /// `left <=> right` as a marked common edge.
    pub fn equivalence(&self, left: ElementId, right: ElementId) -> MemoryResult<ElementId> {
        let edge = self
            .memory
            .create_connector(ElementType::CONST_COMMON_EDGE, left, right)?;
        self.add_member(self.keynodes.nrel_equivalence, edge)?;
        Ok(edge)
    }

    pub fn equivalence_tuple(&self, operands: &[ElementId]) -> MemoryResult<ElementId> {
        self.marked_tuple(self.keynodes.nrel_equivalence, operands)
    }

    pub fn mark_for_generation(&self, formula: ElementId) -> MemoryResult<ElementId> {
        self.add_member(self.keynodes.concept_template_for_generation, formula)
    }

    pub fn mark_with_links(&self, formula: ElementId) -> MemoryResult<ElementId> {
        self.add_member(self.keynodes.concept_template_with_links, formula)
    }

    // -----------------------------------------------------------------------
    // Rules and formula sets
    // -----------------------------------------------------------------------

    /// A rule whose root formula is `root`.
    pub fn rule(&self, root: ElementId) -> MemoryResult<ElementId> {
        let rule = self.memory.create_node(ElementType::CONST_NODE)?;
        self.connect(rule, self.keynodes.rrel_main_key_sc_element, root)?;
        Ok(rule)
    }

    /// A rule that binds `variables` positionally to the run's arguments.
    /// Positions past the tenth are not recorded.
    pub fn rule_with_arguments(
        &self,
        root: ElementId,
        variables: &[ElementId],
    ) -> MemoryResult<ElementId> {
        let rule = self.rule(root)?;
        for (i, var) in variables.iter().take(MAX_ROLE_RELATION).enumerate() {
            if let Some(role) = self.keynodes.rrel(i + 1) {
                self.connect(rule, role, *var)?;
            }
        }
        Ok(rule)
    }

    /// A formula set whose priority groups are tried in the given order.
    pub fn formulas_set(&self, groups: &[Vec<ElementId>]) -> MemoryResult<ElementId> {
        let set = self.memory.create_node(ElementType::CONST_NODE)?;
        let mut previous_arc = None;
        for (i, rules) in groups.iter().enumerate() {
            let group = self.memory.create_node(ElementType::CONST_NODE)?;
            for rule in rules {
                self.add_member(group, *rule)?;
            }
            let arc = if i == 0 {
                self.connect(set, self.keynodes.rrel_1(), group)?
            } else {
                self.add_member(set, group)?
            };
            if let Some(previous) = previous_arc {
                relations::link_in_sequence(
                    self.memory,
                    previous,
                    arc,
                    self.keynodes.nrel_basic_sequence,
                )?;
            }
            previous_arc = Some(arc);
        }
        Ok(set)
    }
}
