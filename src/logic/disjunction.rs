//! Disjunction: any operand may hold; bindings of all that hold are kept.

use crate::error::InferResult;

use super::{EvalContext, LogicExpressionNode, LogicFormulaResult, atom, partition};

fn merge(acc: &mut LogicFormulaResult, next: LogicFormulaResult) {
    acc.value |= next.value;
    acc.is_generated |= next.is_generated;
    acc.replacements = acc.replacements.unite(&next.replacements);
}

pub(super) fn compute(
    ctx: &mut EvalContext<'_>,
    operands: &[LogicExpressionNode],
) -> InferResult<LogicFormulaResult> {
    let parts = partition(ctx, operands);

    let mut acc = LogicFormulaResult::fail();
    for operand in parts.direct {
        let next = operand.compute(ctx)?;
        merge(&mut acc, next);
    }
    if acc.replacements.is_empty() {
        return Ok(LogicFormulaResult::fail());
    }

    for formula in parts.without_constants {
        let next = atom::search(ctx, formula, &acc.replacements)?;
        merge(&mut acc, next);
    }
    for formula in parts.to_generate {
        let next = atom::generate(ctx, formula, &acc.replacements)?;
        merge(&mut acc, next);
    }
    Ok(acc)
}
