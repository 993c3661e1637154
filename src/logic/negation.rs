use crate::error::InferResult;

use super::{EvalContext, LogicExpressionNode, LogicFormulaResult};

/// Flip the operand's value. Its bindings pass through unchanged.
pub(super) fn compute(
    ctx: &mut EvalContext<'_>,
    operand: &LogicExpressionNode,
) -> InferResult<LogicFormulaResult> {
    let mut result = operand.compute(ctx)?;
    result.value = !result.value;
    Ok(result)
}
