//! Logic expression trees over formula graphs.
//!
//! A formula is read from memory once per use by [`ExpressionBuilder`] into
//! a [`LogicExpressionNode`] tree, evaluated, and dropped. Leaves are atomic
//! template formulas; operator nodes combine their operands' replacement
//! tables with the algebra in [`crate::replacements`].
//!
//! Operands of conjunction, disjunction and equivalence are split three
//! ways before evaluation:
//!
//! - atoms without constants are only searched, seeded by the bindings the
//!   other operands produced
//! - atoms marked for generation are generated, also seeded
//! - everything else is computed directly, first

mod atom;
pub mod builder;
mod conjunction;
mod disjunction;
mod equivalence;
mod implication;
mod negation;
pub mod output;

use crate::classifier::FormulaClassifier;
use crate::element::ElementId;
use crate::error::InferResult;
use crate::keynodes::Keynodes;
use crate::memory::Memory;
use crate::replacements::Replacements;
use crate::searcher::TemplateSearcher;
use crate::template_manager::TemplateManager;

pub use builder::ExpressionBuilder;
pub use output::OutputStructure;

/// Outcome of computing or generating one expression node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogicFormulaResult {
    /// Truth value under the bindings found.
    pub value: bool,
    /// Whether new content was written to memory.
    pub is_generated: bool,
    /// Binding rows that made the node true or were generated.
    pub replacements: Replacements,
}

impl LogicFormulaResult {
    /// False, nothing generated, no bindings.
    pub fn fail() -> Self {
        Self::default()
    }

    /// True iff `replacements` has rows.
    pub fn from_replacements(replacements: Replacements) -> Self {
        Self {
            value: !replacements.is_empty(),
            is_generated: false,
            replacements,
        }
    }
}

/// Everything an expression node needs while it runs.
pub struct EvalContext<'a> {
    pub memory: &'a Memory,
    pub keynodes: &'a Keynodes,
    pub searcher: &'a TemplateSearcher<'a>,
    pub templates: &'a TemplateManager<'a>,
    pub output: &'a mut OutputStructure,
}

impl<'a> EvalContext<'a> {
    pub fn classifier(&self) -> FormulaClassifier<'a> {
        FormulaClassifier::new(self.memory, self.keynodes)
    }
}

impl std::fmt::Debug for EvalContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvalContext")
            .field("searcher", self.searcher)
            .field("arguments", &self.templates.arguments().len())
            .field("output", &self.output.element())
            .finish()
    }
}

/// One node of a formula tree. Each node exclusively owns its operands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogicExpressionNode {
    Atomic {
        formula: ElementId,
    },
    Negation {
        formula: ElementId,
        operand: Box<LogicExpressionNode>,
    },
    Conjunction {
        formula: ElementId,
        operands: Vec<LogicExpressionNode>,
    },
    Disjunction {
        formula: ElementId,
        operands: Vec<LogicExpressionNode>,
    },
    Implication {
        formula: ElementId,
        premise: Box<LogicExpressionNode>,
        conclusion: Box<LogicExpressionNode>,
    },
    Equivalence {
        formula: ElementId,
        operands: Vec<LogicExpressionNode>,
    },
}

impl LogicExpressionNode {
    /// The formula element this node was built from.
    pub fn formula(&self) -> ElementId {
        match self {
            Self::Atomic { formula }
            | Self::Negation { formula, .. }
            | Self::Conjunction { formula, .. }
            | Self::Disjunction { formula, .. }
            | Self::Implication { formula, .. }
            | Self::Equivalence { formula, .. } => *formula,
        }
    }

    /// The template formula, if this is a leaf.
    pub fn as_atom(&self) -> Option<ElementId> {
        match self {
            Self::Atomic { formula } => Some(*formula),
            _ => None,
        }
    }

    /// Evaluate this node against memory.
    pub fn compute(&self, ctx: &mut EvalContext<'_>) -> InferResult<LogicFormulaResult> {
        let result = match self {
            Self::Atomic { formula } => atom::compute(ctx, *formula)?,
            Self::Negation { operand, .. } => negation::compute(ctx, operand)?,
            Self::Conjunction { operands, .. } => conjunction::compute(ctx, operands)?,
            Self::Disjunction { operands, .. } => disjunction::compute(ctx, operands)?,
            Self::Implication {
                premise,
                conclusion,
                ..
            } => implication::compute(ctx, premise, conclusion)?,
            Self::Equivalence { formula, operands } => {
                equivalence::compute(ctx, *formula, operands)?
            }
        };
        tracing::debug!(
            formula = %ctx.memory.label(self.formula()),
            value = result.value,
            generated = result.is_generated,
            rows = result.replacements.row_count(),
            "computed formula"
        );
        Ok(result)
    }

    /// Write this node's content for every row of `replacements`.
    ///
    /// Only atoms and conjunctions can be generated; other nodes fail.
    pub fn generate(
        &self,
        ctx: &mut EvalContext<'_>,
        replacements: &Replacements,
    ) -> InferResult<LogicFormulaResult> {
        match self {
            Self::Atomic { formula } => atom::generate(ctx, *formula, replacements),
            Self::Conjunction { operands, .. } => conjunction::generate(ctx, operands, replacements),
            _ => Ok(LogicFormulaResult::fail()),
        }
    }
}

/// Operands split by how they are evaluated.
struct Partition<'n> {
    direct: Vec<&'n LogicExpressionNode>,
    without_constants: Vec<ElementId>,
    to_generate: Vec<ElementId>,
}

fn partition<'n>(ctx: &EvalContext<'_>, operands: &'n [LogicExpressionNode]) -> Partition<'n> {
    let classifier = ctx.classifier();
    let mut parts = Partition {
        direct: Vec::new(),
        without_constants: Vec::new(),
        to_generate: Vec::new(),
    };
    for operand in operands {
        match operand.as_atom() {
            Some(formula) if !classifier.has_constants(formula) => {
                tracing::debug!(formula = %ctx.memory.label(formula), "operand without constants");
                parts.without_constants.push(formula);
            }
            Some(formula) if classifier.is_marked_for_generation(formula) => {
                tracing::debug!(formula = %ctx.memory.label(formula), "operand to generate");
                parts.to_generate.push(formula);
            }
            _ => parts.direct.push(operand),
        }
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GenerationType, ReplacementsUsing};
    use crate::element::ElementType;
    use crate::kb::KnowledgeBuilder;
    use crate::searcher::GeneralScope;
    use crate::template_manager::{ArgumentBinding, GenerationSettings};

    /// Memory with classes `a`, `b`, `c` and nodes `n1` in `a`, `n2` in `c`.
    struct World {
        pub memory: Memory,
        pub keynodes: Keynodes,
        pub output: ElementId,
    }

    impl World {
        pub fn new() -> Self {
            let memory = Memory::new();
            let keynodes = Keynodes::resolve(&memory).unwrap();
            let output = memory.create_node(ElementType::CONST_STRUCTURE).unwrap();
            let world = Self {
                memory,
                keynodes,
                output,
            };
            let kb = world.kb();
            let n1 = kb.node("n1").unwrap();
            let n2 = kb.node("n2").unwrap();
            kb.add_member(kb.class("a").unwrap(), n1).unwrap();
            kb.add_member(kb.class("c").unwrap(), n2).unwrap();
            kb.class("b").unwrap();
            world
        }

        pub fn kb(&self) -> KnowledgeBuilder<'_> {
            KnowledgeBuilder::new(&self.memory, &self.keynodes)
        }

        pub fn el(&self, name: &str) -> ElementId {
            self.memory.find_by_system_identifier(name).unwrap()
        }

        /// `class -> ?x` as an atom.
        pub fn atom(&self, class: &str) -> ElementId {
            let kb = self.kb();
            kb.pattern()
                .member(self.el(class), kb.var("_x").unwrap())
                .atom()
                .unwrap()
        }

        pub fn run(
            &self,
            root: ElementId,
            arguments: Vec<ElementId>,
            settings: GenerationSettings,
        ) -> InferResult<LogicFormulaResult> {
            let searcher = TemplateSearcher::new(&self.memory, &self.keynodes, Box::new(GeneralScope))
                .with_replacements_using(settings.replacements);
            let templates = TemplateManager::new(&self.memory, ArgumentBinding::ByClass)
                .with_arguments(arguments)
                .with_settings(settings);
            let mut output = OutputStructure::load(&self.memory, self.output);
            let mut ctx = EvalContext {
                memory: &self.memory,
                keynodes: &self.keynodes,
                searcher: &searcher,
                templates: &templates,
                output: &mut output,
            };
            let node = ExpressionBuilder::new(&self.memory, &self.keynodes)
                .build(root)
                .map_err(crate::error::InferenceError::from)?;
            node.compute(&mut ctx)
        }
    }

    fn all_rows() -> GenerationSettings {
        GenerationSettings {
            replacements: ReplacementsUsing::All,
            ..Default::default()
        }
    }

    #[test]
    fn atom_computes_against_arguments() {
        let w = World::new();
        let a = w.atom("a");
        let n1 = w.el("n1");
        let n2 = w.el("n2");

        let result = w.run(a, vec![n1], all_rows()).unwrap();
        assert!(result.value);
        assert_eq!(result.replacements.column(w.el("_x")).unwrap(), &[n1]);

        assert!(!w.run(a, vec![n2], all_rows()).unwrap().value);
        // Without arguments the pattern is searched unbound.
        assert!(w.run(a, vec![], all_rows()).unwrap().value);
    }

    #[test]
    fn conjunction_short_circuits() {
        let w = World::new();
        let both = w.kb().conjunction(&[w.atom("a"), w.atom("c")]).unwrap();
        let result = w.run(both, vec![], all_rows()).unwrap();
        assert!(!result.value);
        assert!(result.replacements.is_empty());
    }

    #[test]
    fn disjunction_keeps_the_branch_that_holds() {
        let w = World::new();
        let either = w.kb().disjunction(&[w.atom("a"), w.atom("c")]).unwrap();
        let n2 = w.el("n2");
        let result = w.run(either, vec![n2], all_rows()).unwrap();
        assert!(result.value);
        assert_eq!(result.replacements.column(w.el("_x")).unwrap(), &[n2]);
    }

    #[test]
    fn negation_flips_value_only() {
        let w = World::new();
        let not_b = w.kb().negation(w.atom("b")).unwrap();
        let result = w.run(not_b, vec![], all_rows()).unwrap();
        assert!(result.value);
        assert!(result.replacements.is_empty());

        let not_a = w.kb().negation(w.atom("a")).unwrap();
        let result = w.run(not_a, vec![], all_rows()).unwrap();
        assert!(!result.value);
        assert_eq!(result.replacements.row_count(), 1);
    }

    #[test]
    fn implication_generates_conclusion_once() {
        let w = World::new();
        let kb = w.kb();
        let rule = kb.implication(w.atom("a"), w.atom("b")).unwrap();
        let n1 = w.el("n1");
        let b = w.el("b");

        let first = w.run(rule, vec![n1], GenerationSettings::default()).unwrap();
        assert!(first.value && first.is_generated);
        assert!(w.memory.is_member(b, n1));
        assert!(w.memory.is_member(w.output, n1));
        assert_eq!(first.replacements.column(w.el("_x")).unwrap(), &[n1]);

        // The conclusion already holds, so nothing new is written.
        let again = w.run(rule, vec![n1], GenerationSettings::default()).unwrap();
        assert!(!again.is_generated);
        assert!(!again.value);
    }

    #[test]
    fn implication_truth_table() {
        // (premise, conclusion already holds) -> value
        let w = World::new();
        let kb = w.kb();
        let n1 = w.el("n1");
        let n2 = w.el("n2");

        // (F, -): premise fails, implication holds, nothing generated.
        let rule = kb.implication(w.atom("a"), w.atom("b")).unwrap();
        let vacuous = w.run(rule, vec![n2], GenerationSettings::default()).unwrap();
        assert!(vacuous.value && !vacuous.is_generated);

        // (T, T) under `all` generation writes again and holds.
        let settings = GenerationSettings {
            generation: GenerationType::All,
            ..Default::default()
        };
        let generated = w.run(rule, vec![n1], settings).unwrap();
        assert!(generated.value && generated.is_generated);
    }

    #[test]
    fn conjunction_seeds_search_only_operands() {
        let w = World::new();
        let kb = w.kb();
        let rel = kb.relation("nrel_friend").unwrap();
        let n1 = w.el("n1");
        let n2 = w.el("n2");
        kb.connect(n1, rel, n2).unwrap();

        // a -> _x; _x =>_r: _y (no constants)
        let x = kb.var("_x").unwrap();
        let y = kb.var("_y").unwrap();
        let r = kb.var("_r").unwrap();
        let loose = kb.pattern().relation(x, r, y).atom().unwrap();
        let both = kb.conjunction(&[loose, w.atom("a")]).unwrap();

        let result = w.run(both, vec![n1], all_rows()).unwrap();
        assert!(result.value);
        assert_eq!(result.replacements.column(y).unwrap(), &[n2]);
        assert_eq!(result.replacements.column(r).unwrap(), &[rel]);
    }

    #[test]
    fn equivalence_compares_values() {
        let w = World::new();
        let kb = w.kb();
        let same = kb.equivalence(w.atom("b"), w.atom("a")).unwrap();
        // b(x) is false, a(x) is true.
        assert!(!w.run(same, vec![], all_rows()).unwrap().value);

        let both_hold = kb.equivalence_tuple(&[w.atom("a"), w.atom("a")]).unwrap();
        let result = w.run(both_hold, vec![], all_rows()).unwrap();
        assert!(result.value);
        assert_eq!(result.replacements.column(w.el("_x")).unwrap(), &[w.el("n1")]);
    }

    #[test]
    fn equivalence_without_direct_operands_is_an_error() {
        let w = World::new();
        let kb = w.kb();
        let gen_a = w.atom("a");
        let gen_b = w.atom("b");
        kb.mark_for_generation(gen_a).unwrap();
        kb.mark_for_generation(gen_b).unwrap();
        let same = kb.equivalence(gen_a, gen_b).unwrap();
        assert!(w.run(same, vec![], all_rows()).is_err());
    }
}
