//! Backtracking template search.
//!
//! Triples are joined one at a time, always picking the open triple with the
//! most resolved positions so each step scans from a known element. A
//! complete match is offered to the item filter and then to the callback,
//! which decides whether the search continues.

use crate::element::ElementId;
use crate::memory::{Memory, Triple};

use super::{Template, TemplateItem, TemplateParams, TemplateTriple};

/// Callback verdict after each accepted match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchControl {
    Continue,
    Stop,
}

/// One complete match of a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchItem {
    bindings: TemplateParams,
    elements: Vec<ElementId>,
}

impl SearchItem {
    /// Value of a variable, including variables bound at build time.
    pub fn get(&self, var: ElementId) -> Option<ElementId> {
        self.bindings.get(&var).copied()
    }

    pub fn bindings(&self) -> &TemplateParams {
        &self.bindings
    }

    /// Every element of the matched construction.
    pub fn elements(&self) -> &[ElementId] {
        &self.elements
    }
}

struct Matcher<'a> {
    memory: &'a Memory,
    template: &'a Template,
    element_filter: &'a dyn Fn(ElementId) -> bool,
    item_filter: &'a dyn Fn(&SearchItem) -> bool,
    on_item: &'a mut dyn FnMut(&SearchItem) -> SearchControl,
    found: bool,
}

impl Template {
    /// Search memory for matches of this template.
    ///
    /// Every element of a match must pass `element_filter`; whole matches
    /// must pass `item_filter`. Returns whether any match was accepted.
    pub fn search(
        &self,
        memory: &Memory,
        element_filter: &dyn Fn(ElementId) -> bool,
        item_filter: &dyn Fn(&SearchItem) -> bool,
        on_item: &mut dyn FnMut(&SearchItem) -> SearchControl,
    ) -> bool {
        let mut matcher = Matcher {
            memory,
            template: self,
            element_filter,
            item_filter,
            on_item,
            found: false,
        };
        let mut done = vec![false; self.triples.len()];
        let mut bindings = self.params.clone();
        let mut elements = Vec::new();
        matcher.step(&mut done, &mut bindings, &mut elements);
        matcher.found
    }

    /// Collect all matches.
    pub fn search_all(&self, memory: &Memory) -> Vec<SearchItem> {
        let mut items = Vec::new();
        self.search(memory, &|_| true, &|_| true, &mut |item| {
            items.push(item.clone());
            SearchControl::Continue
        });
        items
    }
}

impl Matcher<'_> {
    fn step(
        &mut self,
        done: &mut [bool],
        bindings: &mut TemplateParams,
        elements: &mut Vec<ElementId>,
    ) -> SearchControl {
        let next = self
            .template
            .triples
            .iter()
            .enumerate()
            .filter(|(i, _)| !done[*i])
            .max_by_key(|(i, t)| (resolved_count(t, bindings), std::cmp::Reverse(*i)))
            .map(|(i, t)| (i, *t));

        let Some((index, triple)) = next else {
            return self.emit(bindings, elements);
        };

        done[index] = true;
        let mut control = SearchControl::Continue;
        for candidate in self.candidates(&triple, bindings) {
            let mut bound = Vec::new();
            let fits = triple
                .items()
                .into_iter()
                .zip(candidate.elements())
                .all(|(item, element)| self.bind(item, element, bindings, &mut bound));

            if fits {
                let mark = elements.len();
                elements.extend(candidate.elements());
                control = self.step(done, bindings, elements);
                elements.truncate(mark);
            }
            for var in bound {
                bindings.remove(&var);
            }
            if control == SearchControl::Stop {
                break;
            }
        }
        done[index] = false;
        control
    }

    fn emit(&mut self, bindings: &TemplateParams, elements: &[ElementId]) -> SearchControl {
        let mut unique = Vec::with_capacity(elements.len());
        for element in elements {
            if !unique.contains(element) {
                unique.push(*element);
            }
        }
        let item = SearchItem {
            bindings: bindings.clone(),
            elements: unique,
        };
        if !(self.item_filter)(&item) {
            return SearchControl::Continue;
        }
        self.found = true;
        (self.on_item)(&item)
    }

    /// Try to unify one item with a candidate element, recording new bindings.
    fn bind(
        &self,
        item: TemplateItem,
        element: ElementId,
        bindings: &mut TemplateParams,
        bound: &mut Vec<ElementId>,
    ) -> bool {
        if !(self.element_filter)(element) {
            return false;
        }
        match item {
            TemplateItem::Fixed(expected) => expected == element,
            TemplateItem::Var { var, ty } => match bindings.get(&var) {
                Some(value) => *value == element,
                None => {
                    let admitted = self
                        .memory
                        .element_type(element)
                        .is_some_and(|actual| ty.admits(actual));
                    if admitted {
                        bindings.insert(var, element);
                        bound.push(var);
                    }
                    admitted
                }
            },
        }
    }

    fn candidates(&self, triple: &TemplateTriple, bindings: &TemplateParams) -> Vec<Triple> {
        let source = triple.source.resolve(bindings);
        let target = triple.target.resolve(bindings);
        let kind = match triple.connector {
            TemplateItem::Fixed(element) => self
                .memory
                .element_type(element)
                .and_then(|t| t.connector_kind()),
            TemplateItem::Var { ty, .. } => ty.connector_kind(),
        };
        let Some(kind) = kind else {
            return Vec::new();
        };

        match triple.connector.resolve(bindings) {
            Some(connector) => {
                let Some((from, to)) = self.memory.connector_ends(connector) else {
                    return Vec::new();
                };
                let mut found = vec![Triple::new(from, connector, to)];
                if kind.is_undirected() && from != to {
                    found.push(Triple::new(to, connector, from));
                }
                found.retain(|t| {
                    source.is_none_or(|s| s == t.source) && target.is_none_or(|x| x == t.target)
                });
                found
            }
            None => self.memory.iterate3(source, Some(kind), target),
        }
    }
}

fn resolved_count(triple: &TemplateTriple, bindings: &TemplateParams) -> usize {
    triple
        .items()
        .iter()
        .filter(|item| item.resolve(bindings).is_some())
        .count()
}
