//! Queue iteration strategies.

use std::collections::VecDeque;

use crate::element::ElementId;
use crate::error::InferResult;
use crate::logic::OutputStructure;
use crate::template::TemplateParams;
use crate::template_manager::{ArgumentBinding, TemplateManager};

use super::{InferenceManager, InferenceParams, InferenceState};

impl InferenceManager<'_> {
    /// Try every rule once, queue by queue. True if anything was generated.
    pub(super) fn apply_all(&mut self, params: &InferenceParams, output: &mut OutputStructure) -> InferResult<bool> {
        let queues = self.formula_queues(params.formulas_set)?;
        let mut generated = false;
        for (index, queue) in queues.iter().enumerate() {
            self.set_state(InferenceState::IteratingQueue { queue: index });
            tracing::debug!(queue = index + 1, formulas = queue.len(), "applying queue");
            for formula in queue {
                let result = self.use_formula(*formula, output)?;
                if result.is_generated {
                    generated = true;
                    self.record(*formula, &result)?;
                } else {
                    self.set_state(InferenceState::FormulaSkipped);
                }
            }
        }
        Ok(generated)
    }

    /// Fire rules until `target` holds.
    ///
    /// After a rule fires the rules already tried in the current queue are
    /// queued again, and once the queue drains the scan restarts from the
    /// first queue. Runs stop with failure after `max_passes` restarts.
    pub(super) fn apply_target(
        &mut self,
        params: &InferenceParams,
        target: ElementId,
        output: &mut OutputStructure,
    ) -> InferResult<bool> {
        let seed = TemplateManager::new(self.memory, ArgumentBinding::ByClass)
            .with_arguments(self.arguments.clone())
            .create_params(target);
        if self.is_target_achieved(target, &seed)? {
            tracing::info!(target = %self.memory.label(target), "target already achieved");
            return Ok(true);
        }

        let queues = self.formula_queues(params.formulas_set)?;
        // Generated content must be visible to the target check.
        self.searcher.add_input_structure(output.element());

        let mut index = 0;
        let mut passes = 0;
        while index < queues.len() {
            self.set_state(InferenceState::IteratingQueue { queue: index });
            let mut unchecked: VecDeque<ElementId> = queues[index].iter().copied().collect();
            let mut checked = Vec::new();
            let mut restart = false;
            tracing::debug!(queue = index + 1, formulas = unchecked.len(), pass = passes, "applying queue");

            while let Some(formula) = unchecked.pop_front() {
                let result = self.use_formula(formula, output)?;
                if !result.is_generated {
                    self.set_state(InferenceState::FormulaSkipped);
                    checked.push(formula);
                    continue;
                }
                self.record(formula, &result)?;

                self.set_state(InferenceState::TargetCheck);
                if self.is_target_achieved(target, &result.replacements.to_params_list())? {
                    tracing::info!(
                        target = %self.memory.label(target),
                        formula = %self.memory.label(formula),
                        "target achieved"
                    );
                    return Ok(true);
                }
                unchecked.extend(checked.drain(..));
                restart = true;
            }

            if restart {
                passes += 1;
                if passes > self.config.max_passes {
                    tracing::warn!(
                        max_passes = self.config.max_passes,
                        "pass limit reached before the target was achieved"
                    );
                    return Ok(false);
                }
                index = 0;
            } else {
                index += 1;
            }
        }
        Ok(false)
    }

    /// Whether `target` has a match under any of `rows`. Without rows the
    /// target is searched unbound.
    fn is_target_achieved(&self, target: ElementId, rows: &[TemplateParams]) -> InferResult<bool> {
        if rows.is_empty() {
            return Ok(!self.searcher.search(target, &TemplateParams::new())?.is_empty());
        }
        for row in rows {
            if !self.searcher.search(target, row)?.is_empty() {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
