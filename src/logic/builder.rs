//! Formula graph → [`LogicExpressionNode`] tree.

use crate::classifier::{FormulaClassifier, FormulaKind};
use crate::element::ElementId;
use crate::error::FormulaError;
use crate::keynodes::Keynodes;
use crate::memory::{Memory, relations};

use super::LogicExpressionNode;

/// Reads formulas through the classifier and builds their trees.
#[derive(Debug, Clone, Copy)]
pub struct ExpressionBuilder<'a> {
    memory: &'a Memory,
    keynodes: &'a Keynodes,
    classifier: FormulaClassifier<'a>,
}

impl<'a> ExpressionBuilder<'a> {
    pub fn new(memory: &'a Memory, keynodes: &'a Keynodes) -> Self {
        Self {
            memory,
            keynodes,
            classifier: FormulaClassifier::new(memory, keynodes),
        }
    }

    /// Build the tree rooted at `formula`.
    pub fn build(&self, formula: ElementId) -> Result<LogicExpressionNode, FormulaError> {
        let kind = self.classifier.classify(formula);
        match kind {
            FormulaKind::Atomic => Ok(LogicExpressionNode::Atomic { formula }),
            FormulaKind::Negation => {
                let [operand] = self.exactly::<1>(formula, kind, self.tuple_operands(formula)?)?;
                Ok(LogicExpressionNode::Negation {
                    formula,
                    operand: Box::new(operand),
                })
            }
            FormulaKind::Conjunction => Ok(LogicExpressionNode::Conjunction {
                formula,
                operands: self.non_empty(formula, kind, self.tuple_operands(formula)?)?,
            }),
            FormulaKind::Disjunction => Ok(LogicExpressionNode::Disjunction {
                formula,
                operands: self.non_empty(formula, kind, self.tuple_operands(formula)?)?,
            }),
            FormulaKind::ImplicationEdge | FormulaKind::ImplicationTuple => {
                let operands = if kind == FormulaKind::ImplicationEdge {
                    self.connector_operands(formula)?
                } else {
                    self.implication_tuple_operands(formula)?
                };
                let [premise, conclusion] = self.exactly::<2>(formula, kind, operands)?;
                Ok(LogicExpressionNode::Implication {
                    formula,
                    premise: Box::new(premise),
                    conclusion: Box::new(conclusion),
                })
            }
            FormulaKind::EquivalenceEdge => {
                let operands = self.exactly::<2>(formula, kind, self.connector_operands(formula)?)?;
                Ok(LogicExpressionNode::Equivalence {
                    formula,
                    operands: operands.into(),
                })
            }
            FormulaKind::EquivalenceTuple => {
                // Tuples may chain more than two operands.
                let operands = self.tuple_operands(formula)?;
                if operands.len() < 2 {
                    return Err(self.operand_count(formula, kind, operands.len(), "at least two"));
                }
                Ok(LogicExpressionNode::Equivalence { formula, operands })
            }
            FormulaKind::Invalid => Err(FormulaError::ItemNotFound {
                message: format!("formula {formula} is invalid"),
            }),
            FormulaKind::Unclassified => Err(FormulaError::ItemNotFound {
                message: format!("{} is not a known formula type", self.memory.label(formula)),
            }),
        }
    }

    fn tuple_operands(&self, tuple: ElementId) -> Result<Vec<LogicExpressionNode>, FormulaError> {
        let operands: Vec<_> = relations::members(self.memory, tuple, |_| true)
            .into_iter()
            .map(|operand| self.build(operand))
            .collect::<Result<_, _>>()?;
        tracing::debug!(
            formula = %self.memory.label(tuple),
            operands = operands.len(),
            "resolved tuple operands"
        );
        Ok(operands)
    }

    fn connector_operands(&self, connector: ElementId) -> Result<Vec<LogicExpressionNode>, FormulaError> {
        match self.memory.connector_ends(connector) {
            Some((source, target)) => Ok(vec![self.build(source)?, self.build(target)?]),
            None => Ok(Vec::new()),
        }
    }

    fn implication_tuple_operands(
        &self,
        tuple: ElementId,
    ) -> Result<Vec<LogicExpressionNode>, FormulaError> {
        [self.keynodes.rrel_if, self.keynodes.rrel_then]
            .into_iter()
            .filter_map(|role| relations::any_by_out_relation(self.memory, tuple, role))
            .map(|operand| self.build(operand))
            .collect()
    }

    fn exactly<const N: usize>(
        &self,
        formula: ElementId,
        kind: FormulaKind,
        operands: Vec<LogicExpressionNode>,
    ) -> Result<[LogicExpressionNode; N], FormulaError> {
        let found = operands.len();
        operands
            .try_into()
            .map_err(|_| self.operand_count(formula, kind, found, &N.to_string()))
    }

    fn non_empty(
        &self,
        formula: ElementId,
        kind: FormulaKind,
        operands: Vec<LogicExpressionNode>,
    ) -> Result<Vec<LogicExpressionNode>, FormulaError> {
        if operands.is_empty() {
            return Err(self.operand_count(formula, kind, 0, "at least one"));
        }
        Ok(operands)
    }

    fn operand_count(
        &self,
        formula: ElementId,
        kind: FormulaKind,
        found: usize,
        expected: &str,
    ) -> FormulaError {
        FormulaError::ItemNotFound {
            message: format!(
                "{kind} {} has {found} operands, expected {expected}",
                self.memory.label(formula)
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ElementType;
    use crate::kb::KnowledgeBuilder;

    #[test]
    fn builds_nested_trees() {
        let memory = Memory::new();
        let keynodes = Keynodes::resolve(&memory).unwrap();
        let kb = KnowledgeBuilder::new(&memory, &keynodes);
        let x = kb.var("_x").unwrap();
        let a = kb.pattern().member(kb.class("a").unwrap(), x).atom().unwrap();
        let c = kb.pattern().member(kb.class("c").unwrap(), x).atom().unwrap();
        let b = kb.pattern().member(kb.class("b").unwrap(), x).atom().unwrap();
        let either = kb.disjunction(&[a, c]).unwrap();
        let rule = kb.implication_tuple(either, b).unwrap();

        let tree = ExpressionBuilder::new(&memory, &keynodes).build(rule).unwrap();
        let (premise, conclusion) = match tree {
            LogicExpressionNode::Implication {
                premise,
                conclusion,
                ..
            } => (premise, conclusion),
            other => panic!("expected implication, got {other:?}"),
        };
        assert_eq!(conclusion.as_atom(), Some(b));
        assert_eq!(
            *premise,
            LogicExpressionNode::Disjunction {
                formula: either,
                operands: vec![
                    LogicExpressionNode::Atomic { formula: a },
                    LogicExpressionNode::Atomic { formula: c },
                ],
            }
        );
    }

    #[test]
    fn malformed_formulas_are_reported() {
        let memory = Memory::new();
        let keynodes = Keynodes::resolve(&memory).unwrap();
        let kb = KnowledgeBuilder::new(&memory, &keynodes);
        let builder = ExpressionBuilder::new(&memory, &keynodes);
        let x = kb.var("_x").unwrap();
        let a = kb.pattern().member(kb.class("a").unwrap(), x).atom().unwrap();
        let b = kb.pattern().member(kb.class("b").unwrap(), x).atom().unwrap();

        let two = kb.negation(a).unwrap();
        kb.add_member(two, b).unwrap();
        let err = builder.build(two).unwrap_err();
        assert!(err.to_string().contains("has 2 operands"), "{err}");

        let empty = kb.conjunction(&[]).unwrap();
        assert!(builder.build(empty).is_err());

        let plain = memory.create_node(ElementType::CONST_NODE).unwrap();
        assert!(matches!(builder.build(plain), Err(FormulaError::ItemNotFound { .. })));
    }
}
