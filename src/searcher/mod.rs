//! Template searcher: formula templates → replacement tables.
//!
//! Wraps [`Template::search`] with the policies an inference run needs:
//! a visibility [`SearchScope`], the input structures that scope reads,
//! first-or-all match collection and link content filtering for formulas
//! in `concept_template_with_links`.

pub mod scope;

use std::collections::BTreeSet;

use crate::config::ReplacementsUsing;
use crate::element::{ElementId, ElementType};
use crate::keynodes::Keynodes;
use crate::memory::{Memory, relations};
use crate::replacements::Replacements;
use crate::template::{SearchControl, SearchItem, Template, TemplateParams, TemplateResult};

pub use scope::{
    GeneralScope, InStructuresScope, MembershipArcsInStructuresScope, SearchScope, scope_for,
};

/// Replacements plus the matched constructions behind each row.
#[derive(Debug, Clone, Default)]
pub struct SearchOutcome {
    pub replacements: Replacements,
    /// Elements of every accepted match, in match order.
    pub constructions: Vec<Vec<ElementId>>,
}

/// Searches formula templates under one scope and policy.
pub struct TemplateSearcher<'a> {
    memory: &'a Memory,
    keynodes: &'a Keynodes,
    scope: Box<dyn SearchScope>,
    input_structures: Vec<ElementId>,
    replacements_using: ReplacementsUsing,
}

impl std::fmt::Debug for TemplateSearcher<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateSearcher")
            .field("scope", &self.scope.name())
            .field("input_structures", &self.input_structures.len())
            .field("replacements_using", &self.replacements_using)
            .finish()
    }
}

impl<'a> TemplateSearcher<'a> {
    pub fn new(memory: &'a Memory, keynodes: &'a Keynodes, scope: Box<dyn SearchScope>) -> Self {
        Self {
            memory,
            keynodes,
            scope,
            input_structures: Vec::new(),
            replacements_using: ReplacementsUsing::default(),
        }
    }

    pub fn with_input_structures(mut self, structures: Vec<ElementId>) -> Self {
        self.input_structures = structures;
        self
    }

    pub fn with_replacements_using(mut self, using: ReplacementsUsing) -> Self {
        self.replacements_using = using;
        self
    }

    pub fn input_structures(&self) -> &[ElementId] {
        &self.input_structures
    }

    /// Widen the scope with another structure (no-op if already present).
    pub fn add_input_structure(&mut self, structure: ElementId) {
        if !self.input_structures.contains(&structure) {
            self.input_structures.push(structure);
        }
    }

    pub fn replacements_using(&self) -> ReplacementsUsing {
        self.replacements_using
    }

    pub fn scope_name(&self) -> &str {
        self.scope.name()
    }

    /// All variable members of `formula`, connectors included.
    pub fn variables_of(&self, formula: ElementId) -> BTreeSet<ElementId> {
        relations::members(self.memory, formula, ElementType::is_var)
            .into_iter()
            .collect()
    }

    /// Search `formula` with `params` substituted.
    pub fn search(&self, formula: ElementId, params: &TemplateParams) -> TemplateResult<Replacements> {
        self.search_constructions(formula, params)
            .map(|outcome| outcome.replacements)
    }

    /// Search once per parameter row and merge the results.
    ///
    /// An empty row list searches nothing and yields an empty table.
    pub fn search_batch(
        &self,
        formula: ElementId,
        params_list: &[TemplateParams],
    ) -> TemplateResult<Replacements> {
        let mut result = Replacements::new();
        for params in params_list {
            result.extend_rows(&self.search(formula, params)?);
        }
        Ok(result)
    }

    /// Like [`search`](Self::search), also returning the matched elements.
    pub fn search_constructions(
        &self,
        formula: ElementId,
        params: &TemplateParams,
    ) -> TemplateResult<SearchOutcome> {
        let template = Template::build(self.memory, formula, params)?;

        let formula_variables = self.variables_of(formula);
        let keys: Vec<ElementId> = template
            .variables()
            .iter()
            .chain(template.params().keys())
            .filter(|v| formula_variables.contains(v))
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let expected_content = self.expected_link_content(formula);
        let element_filter =
            |element: ElementId| self.scope.is_visible(self.memory, &self.input_structures, element);
        let item_filter = |item: &SearchItem| {
            expected_content.iter().all(|(link, content)| {
                let matched = item.get(*link).unwrap_or(*link);
                self.memory.link_content(matched).as_deref() == Some(content.as_str())
            })
        };

        let mut outcome = SearchOutcome {
            replacements: Replacements::with_keys(keys.iter().copied()),
            constructions: Vec::new(),
        };
        let stop_after_first = self.replacements_using == ReplacementsUsing::First;
        template.search(self.memory, &element_filter, &item_filter, &mut |item| {
            outcome.replacements.push_row(item.bindings());
            outcome.constructions.push(item.elements().to_vec());
            if stop_after_first {
                SearchControl::Stop
            } else {
                SearchControl::Continue
            }
        });

        tracing::debug!(
            formula = %self.memory.label(formula),
            scope = self.scope.name(),
            rows = outcome.replacements.row_count(),
            "template search"
        );
        Ok(outcome)
    }

    /// Link members of a content formula whose content must be matched.
    fn expected_link_content(&self, formula: ElementId) -> Vec<(ElementId, String)> {
        if !self.memory.is_member(self.keynodes.concept_template_with_links, formula) {
            return Vec::new();
        }
        relations::members(self.memory, formula, ElementType::is_link)
            .into_iter()
            .filter(|link| {
                self.scope
                    .constrains_content(self.memory, &self.input_structures, *link)
            })
            .filter_map(|link| self.memory.link_content(link).map(|c| (link, c)))
            .collect()
    }
}
