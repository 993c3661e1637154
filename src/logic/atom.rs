//! Atomic formulas: search, find and generate one template.

use crate::config::{
    GenerationType, OutputStructureFilling, ReplacementsUsing, SearchBeforeGeneration,
};
use crate::element::ElementId;
use crate::error::{FormulaError, InferResult};
use crate::replacements::Replacements;
use crate::template::{Template, TemplateParams};

use super::{EvalContext, LogicFormulaResult};

/// Search the template with candidate bindings built from the arguments.
/// With no arguments the template is searched unbound.
pub(super) fn compute(ctx: &mut EvalContext<'_>, formula: ElementId) -> InferResult<LogicFormulaResult> {
    let params = if ctx.templates.arguments().is_empty() {
        vec![TemplateParams::new()]
    } else {
        ctx.templates.create_params(formula)
    };
    let replacements = ctx.searcher.search_batch(formula, &params)?;
    Ok(LogicFormulaResult::from_replacements(replacements))
}

/// Search the template once per row of `replacements`.
pub(super) fn search(
    ctx: &mut EvalContext<'_>,
    formula: ElementId,
    replacements: &Replacements,
) -> InferResult<LogicFormulaResult> {
    let params = replacements.to_params_list();
    let found = ctx.searcher.search_batch(formula, &params)?;
    tracing::debug!(
        formula = %ctx.memory.label(formula),
        rows = found.row_count(),
        "searched formula with seeded bindings"
    );
    Ok(LogicFormulaResult::from_replacements(found))
}

/// Generate the template once per row of `replacements` that does not
/// already hold.
pub(super) fn generate(
    ctx: &mut EvalContext<'_>,
    formula: ElementId,
    replacements: &Replacements,
) -> InferResult<LogicFormulaResult> {
    let params_list = replacements.to_params_list();
    if params_list.is_empty() {
        tracing::debug!(formula = %ctx.memory.label(formula), "nothing to generate from");
        return Ok(LogicFormulaResult::fail());
    }

    let settings = ctx.templates.settings();
    let mut variables = replacements.key_set();
    variables.extend(ctx.searcher.variables_of(formula));

    let mut result = LogicFormulaResult::fail();
    let mut rows = Replacements::with_keys(variables.iter().copied());
    let mut count = 0usize;

    for params in &params_list {
        if settings.replacements == ReplacementsUsing::First && result.is_generated {
            break;
        }

        if settings.generation == GenerationType::Unique {
            let probe = match settings.search_before_generation {
                SearchBeforeGeneration::WithReplacements => params.clone(),
                SearchBeforeGeneration::WithoutReplacements => TemplateParams::new(),
            };
            let found = ctx.searcher.search_constructions(formula, &probe)?;
            if !found.replacements.is_empty() {
                if settings.filling == OutputStructureFilling::SearchedAndGenerated {
                    for construction in &found.constructions {
                        ctx.output.add_all(ctx.memory, construction)?;
                    }
                }
                continue;
            }
        }

        let template = Template::build(ctx.memory, formula, params)?;
        let generated = template.generate(ctx.memory)?;
        count += 1;
        result.value = true;
        result.is_generated = true;

        let mut row = TemplateParams::new();
        for var in &variables {
            let value = generated
                .bindings
                .get(var)
                .or_else(|| params.get(var))
                .copied()
                .ok_or_else(|| FormulaError::StructuralInconsistency {
                    formula: ctx.memory.label(formula),
                    message: format!(
                        "generation left {} without a value",
                        ctx.memory.label(*var)
                    ),
                })?;
            row.insert(*var, value);
        }
        rows.push_row(&row);
        ctx.output.add_all(ctx.memory, &generated.elements)?;
    }

    tracing::debug!(formula = %ctx.memory.label(formula), count, "generated formula");
    result.replacements = rows.dedup_rows();
    Ok(result)
}
