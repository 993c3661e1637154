//! Equivalence: two sub-results must agree in value.

use crate::element::ElementId;
use crate::error::{FormulaError, InferResult};

use super::{EvalContext, LogicExpressionNode, LogicFormulaResult, atom, partition};

/// Direct operands are computed first. The first operand without constants
/// is then searched and the first marked operand generated, both seeded by
/// the first direct result. The first two results are compared.
pub(super) fn compute(
    ctx: &mut EvalContext<'_>,
    formula: ElementId,
    operands: &[LogicExpressionNode],
) -> InferResult<LogicFormulaResult> {
    let parts = partition(ctx, operands);

    let mut results = Vec::with_capacity(operands.len());
    for operand in parts.direct {
        results.push(operand.compute(ctx)?);
    }
    let Some(seed) = results.first().map(|r| r.replacements.clone()) else {
        return Err(FormulaError::StructuralInconsistency {
            formula: ctx.memory.label(formula),
            message: "every operand lacks constants or is marked for generation".into(),
        }
        .into());
    };

    if let Some(first) = parts.without_constants.first() {
        results.push(atom::search(ctx, *first, &seed)?);
    }
    if let Some(first) = parts.to_generate.first() {
        results.push(atom::generate(ctx, *first, &seed)?);
    }

    let [left, right, ..] = results.as_slice() else {
        return Err(FormulaError::StructuralInconsistency {
            formula: ctx.memory.label(formula),
            message: "an equivalence needs two evaluated operands".into(),
        }
        .into());
    };

    let value = left.value == right.value;
    Ok(LogicFormulaResult {
        value,
        is_generated: results.iter().any(|r| r.is_generated),
        replacements: if value {
            left.replacements.intersect(&right.replacements)
        } else {
            Default::default()
        },
    })
}
