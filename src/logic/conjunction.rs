//! Conjunction: every operand must hold under shared bindings.

use crate::error::InferResult;
use crate::replacements::Replacements;

use super::{EvalContext, LogicExpressionNode, LogicFormulaResult, atom, partition};

/// Fold `next` into `acc` by natural join. `None` means the conjunction failed.
fn join(mut acc: LogicFormulaResult, next: LogicFormulaResult) -> Option<LogicFormulaResult> {
    if !next.value {
        return None;
    }
    acc.replacements = acc.replacements.intersect(&next.replacements);
    acc.is_generated |= next.is_generated;
    (!acc.replacements.is_empty()).then_some(acc)
}

pub(super) fn compute(
    ctx: &mut EvalContext<'_>,
    operands: &[LogicExpressionNode],
) -> InferResult<LogicFormulaResult> {
    let parts = partition(ctx, operands);

    let mut acc: Option<LogicFormulaResult> = None;
    for operand in parts.direct {
        let next = operand.compute(ctx)?;
        if !next.value {
            return Ok(LogicFormulaResult::fail());
        }
        acc = match acc {
            None => Some(next),
            Some(acc) => match join(acc, next) {
                Some(joined) => Some(joined),
                None => return Ok(LogicFormulaResult::fail()),
            },
        };
    }
    // Seeded operands need something to be seeded with.
    let Some(mut acc) = acc else {
        return Ok(LogicFormulaResult::fail());
    };

    for formula in parts.without_constants {
        let next = atom::search(ctx, formula, &acc.replacements)?;
        acc = match join(acc, next) {
            Some(joined) => joined,
            None => return Ok(LogicFormulaResult::fail()),
        };
    }
    for formula in parts.to_generate {
        let next = atom::generate(ctx, formula, &acc.replacements)?;
        acc = match join(acc, next) {
            Some(joined) => joined,
            None => return Ok(LogicFormulaResult::fail()),
        };
    }
    Ok(acc)
}

/// Generate every operand in turn, each seeded by the bindings so far.
pub(super) fn generate(
    ctx: &mut EvalContext<'_>,
    operands: &[LogicExpressionNode],
    replacements: &Replacements,
) -> InferResult<LogicFormulaResult> {
    let mut acc = LogicFormulaResult {
        value: true,
        is_generated: false,
        replacements: replacements.clone(),
    };
    for operand in operands {
        let next = operand.generate(ctx, &acc.replacements)?;
        acc = match join(acc, next) {
            Some(joined) => joined,
            None => return Ok(LogicFormulaResult::fail()),
        };
    }
    Ok(acc)
}
