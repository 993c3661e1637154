//! Candidate bindings for formula templates.
//!
//! Before searching an atomic formula the engine asks the
//! [`TemplateManager`] which argument values each variable may take.
//! Candidates only ever come from the argument list, so the number of rows
//! is bounded by the arguments and never by the size of memory.

use crate::config::{
    GenerationType, InferenceConfig, OutputStructureFilling, ReplacementsUsing,
    SearchBeforeGeneration,
};
use crate::element::{ConnectorKind, ElementId, ElementType};
use crate::memory::{Memory, relations};
use crate::template::TemplateParams;

/// How variables are paired with arguments.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ArgumentBinding {
    /// Each variable node takes the arguments that belong to one of its
    /// declared classes; rows are the cartesian product over variables.
    #[default]
    ByClass,
    /// Variable `i` of this list takes argument `i`, in one row.
    Fixed(Vec<ElementId>),
}

/// Generation policy carried from the configuration to atomic formulas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GenerationSettings {
    pub generation: GenerationType,
    pub replacements: ReplacementsUsing,
    pub search_before_generation: SearchBeforeGeneration,
    pub filling: OutputStructureFilling,
}

impl From<&InferenceConfig> for GenerationSettings {
    fn from(config: &InferenceConfig) -> Self {
        Self {
            generation: config.generation,
            replacements: config.replacements,
            search_before_generation: config.search_before_generation,
            filling: config.filling,
        }
    }
}

/// Builds candidate parameter rows from the current argument vector.
#[derive(Debug, Clone)]
pub struct TemplateManager<'a> {
    memory: &'a Memory,
    binding: ArgumentBinding,
    arguments: Vec<ElementId>,
    settings: GenerationSettings,
}

impl<'a> TemplateManager<'a> {
    pub fn new(memory: &'a Memory, binding: ArgumentBinding) -> Self {
        Self {
            memory,
            binding,
            arguments: Vec::new(),
            settings: GenerationSettings::default(),
        }
    }

    pub fn with_arguments(mut self, arguments: Vec<ElementId>) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn with_settings(mut self, settings: GenerationSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn arguments(&self) -> &[ElementId] {
        &self.arguments
    }

    pub fn binding(&self) -> &ArgumentBinding {
        &self.binding
    }

    pub fn settings(&self) -> GenerationSettings {
        self.settings
    }

    /// Candidate parameter rows for `template`.
    pub fn create_params(&self, template: ElementId) -> Vec<TemplateParams> {
        match &self.binding {
            ArgumentBinding::ByClass => self.params_by_class(template),
            ArgumentBinding::Fixed(variables) => {
                let row: TemplateParams = variables
                    .iter()
                    .copied()
                    .zip(self.arguments.iter().copied())
                    .collect();
                if row.is_empty() { Vec::new() } else { vec![row] }
            }
        }
    }

    fn params_by_class(&self, template: ElementId) -> Vec<TemplateParams> {
        let mut rows: Vec<TemplateParams> = Vec::new();
        let var_nodes = relations::members(self.memory, template, |t| t.is_var() && t.is_node());

        for var in var_nodes {
            let candidates = self.candidates_for(template, var);
            if candidates.is_empty() {
                continue;
            }
            rows = if rows.is_empty() {
                candidates
                    .iter()
                    .map(|c| TemplateParams::from([(var, *c)]))
                    .collect()
            } else {
                candidates
                    .iter()
                    .flat_map(|c| {
                        rows.iter().map(move |row| {
                            let mut row = row.clone();
                            row.insert(var, *c);
                            row
                        })
                    })
                    .collect()
            };
        }
        rows
    }

    /// Arguments belonging to a class declared for `var` inside `template`,
    /// in ascending id order.
    fn candidates_for(&self, template: ElementId, var: ElementId) -> Vec<ElementId> {
        let classes = self
            .memory
            .iterate5(
                None,
                Some(ConnectorKind::PermPosArc),
                Some(var),
                Some(ConnectorKind::PermPosArc),
                Some(template),
            )
            .into_iter()
            .filter(|a| {
                self.memory
                    .element_type(a.triple.connector)
                    .is_some_and(ElementType::is_var)
                    && self
                        .memory
                        .element_type(a.triple.source)
                        .is_some_and(|t| t.is_const() && t.is_node())
            })
            .map(|a| a.triple.source);

        let mut candidates: Vec<ElementId> = classes
            .flat_map(|class| {
                self.arguments
                    .iter()
                    .copied()
                    .filter(move |arg| self.memory.is_member(class, *arg))
            })
            .collect();
        candidates.sort();
        candidates.dedup();
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        memory: Memory,
        template: ElementId,
        x: ElementId,
        y: ElementId,
        a: ElementId,
        b: ElementId,
    }

    /// Template `man -> _x; woman -> _y` with arguments classed under both.
    fn fixture() -> Fixture {
        let memory = Memory::new();
        let man = memory.create_node(ElementType::CONST_CLASS).unwrap();
        let woman = memory.create_node(ElementType::CONST_CLASS).unwrap();
        let template = memory.create_node(ElementType::CONST_STRUCTURE).unwrap();
        let x = memory.create_node(ElementType::VAR_NODE).unwrap();
        let y = memory.create_node(ElementType::VAR_NODE).unwrap();
        for (class, var) in [(man, x), (woman, y)] {
            let arc = memory
                .create_connector(ElementType::VAR_PERM_POS_ARC, class, var)
                .unwrap();
            for element in [class, var, arc] {
                memory
                    .create_connector(ElementType::CONST_PERM_POS_ARC, template, element)
                    .unwrap();
            }
        }

        let a = memory.create_node(ElementType::CONST_NODE).unwrap();
        let b = memory.create_node(ElementType::CONST_NODE).unwrap();
        for arg in [a, b] {
            memory
                .create_connector(ElementType::CONST_PERM_POS_ARC, man, arg)
                .unwrap();
        }
        memory
            .create_connector(ElementType::CONST_PERM_POS_ARC, woman, b)
            .unwrap();
        Fixture {
            memory,
            template,
            x,
            y,
            a,
            b,
        }
    }

    #[test]
    fn by_class_is_cartesian_over_arguments() {
        let f = fixture();
        let manager =
            TemplateManager::new(&f.memory, ArgumentBinding::ByClass).with_arguments(vec![f.a, f.b]);
        let rows = manager.create_params(f.template);
        assert_eq!(rows.len(), 2);
        assert!(rows.contains(&TemplateParams::from([(f.x, f.a), (f.y, f.b)])));
        assert!(rows.contains(&TemplateParams::from([(f.x, f.b), (f.y, f.b)])));
    }

    #[test]
    fn by_class_skips_variables_without_candidates() {
        let f = fixture();
        let manager =
            TemplateManager::new(&f.memory, ArgumentBinding::ByClass).with_arguments(vec![f.a]);
        assert_eq!(
            manager.create_params(f.template),
            vec![TemplateParams::from([(f.x, f.a)])]
        );

        let none = TemplateManager::new(&f.memory, ArgumentBinding::ByClass);
        assert!(none.create_params(f.template).is_empty());
    }

    #[test]
    fn fixed_arguments_pair_positionally() {
        let f = fixture();
        let manager = TemplateManager::new(&f.memory, ArgumentBinding::Fixed(vec![f.y, f.x]))
            .with_arguments(vec![f.a]);
        assert_eq!(
            manager.create_params(f.template),
            vec![TemplateParams::from([(f.y, f.a)])]
        );

        let unbound = TemplateManager::new(&f.memory, ArgumentBinding::Fixed(vec![f.y]));
        assert!(unbound.create_params(f.template).is_empty());
    }

    #[test]
    fn settings_follow_config() {
        let config = InferenceConfig::default().with_generation(GenerationType::All);
        let settings = GenerationSettings::from(&config);
        assert_eq!(settings.generation, GenerationType::All);
        assert_eq!(settings.replacements, ReplacementsUsing::First);
    }
}
