//! Implication: compute the premise, generate the conclusion from its bindings.

use crate::element::ElementType;
use crate::error::InferResult;

use super::{EvalContext, LogicExpressionNode, LogicFormulaResult};

pub(super) fn compute(
    ctx: &mut EvalContext<'_>,
    premise: &LogicExpressionNode,
    conclusion: &LogicExpressionNode,
) -> InferResult<LogicFormulaResult> {
    // Atomic conclusions are always generated, so they carry the marker.
    if let Some(formula) = conclusion.as_atom() {
        if !ctx.classifier().is_marked_for_generation(formula) {
            tracing::debug!(formula = %ctx.memory.label(formula), "marking conclusion for generation");
            ctx.memory.create_connector(
                ElementType::CONST_PERM_POS_ARC,
                ctx.keynodes.concept_template_for_generation,
                formula,
            )?;
        }
    }

    let premise_result = premise.compute(ctx)?;
    let conclusion_result = conclusion.generate(ctx, &premise_result.replacements)?;

    let replacements = if conclusion_result.value {
        premise_result
            .replacements
            .unite(&conclusion_result.replacements)
            .dedup_rows()
    } else {
        Default::default()
    };
    Ok(LogicFormulaResult {
        value: !premise_result.value || conclusion_result.value,
        is_generated: premise_result.is_generated || conclusion_result.is_generated,
        replacements,
    })
}
