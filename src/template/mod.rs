//! Graph templates: parameterized patterns built from structures.
//!
//! A template is read from a structure node: every connector that belongs to
//! the structure becomes a `(source, connector, target)` triple. Variable
//! elements stay open unless a binding is supplied at build time.
//!
//! - [`Template::build`] compiles a structure plus known bindings
//! - [`Template::search`] finds matches in memory (see [`search`])
//! - [`Template::generate`] writes a new instance of the pattern

pub mod search;

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::element::{ElementId, ElementKind, ElementType};
use crate::error::TemplateError;
use crate::memory::{Memory, relations};

pub use search::{SearchControl, SearchItem};

/// Variable → value bindings for one template instantiation.
pub type TemplateParams = BTreeMap<ElementId, ElementId>;

/// Result type for template operations.
pub type TemplateResult<T> = std::result::Result<T, TemplateError>;

/// One position of a template triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateItem {
    /// A constant element, or a variable already bound by a parameter.
    Fixed(ElementId),
    /// An open variable with the type its value must have.
    Var { var: ElementId, ty: ElementType },
}

impl TemplateItem {
    /// The element this item resolves to under `bindings`, if any.
    pub fn resolve(&self, bindings: &TemplateParams) -> Option<ElementId> {
        match self {
            TemplateItem::Fixed(element) => Some(*element),
            TemplateItem::Var { var, .. } => bindings.get(var).copied(),
        }
    }
}

/// A `(source, connector, target)` pattern triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateTriple {
    pub source: TemplateItem,
    pub connector: TemplateItem,
    pub target: TemplateItem,
}

impl TemplateTriple {
    pub fn items(&self) -> [TemplateItem; 3] {
        [self.source, self.connector, self.target]
    }
}

/// Outcome of instantiating a template.
#[derive(Debug, Clone, Default)]
pub struct GenerationResult {
    /// Every variable of the template mapped to its value, params included.
    pub bindings: TemplateParams,
    /// Elements created by this generation.
    pub created: Vec<ElementId>,
    /// All elements of the instantiated construction, in triple order.
    pub elements: Vec<ElementId>,
}

/// A compiled graph pattern.
#[derive(Debug, Clone)]
pub struct Template {
    structure: ElementId,
    /// Triples in an order where connector variables are produced before
    /// they are used as endpoints.
    triples: Vec<TemplateTriple>,
    /// Build-time bindings restricted to variables of this template.
    params: TemplateParams,
    /// Variables left open.
    variables: BTreeSet<ElementId>,
}

impl Template {
    /// Compile the pattern stored in `structure`, substituting `params`.
    pub fn build(
        memory: &Memory,
        structure: ElementId,
        params: &TemplateParams,
    ) -> TemplateResult<Self> {
        let build_error = |message: &str| TemplateError::PatternBuild {
            structure: memory.label(structure),
            message: message.to_string(),
        };

        if !memory.is_element(structure) {
            return Err(build_error("structure does not exist"));
        }

        let connectors = relations::members(memory, structure, ElementType::is_connector);
        if connectors.is_empty() {
            return Err(build_error("structure has no connectors"));
        }

        let mut used_params = TemplateParams::new();
        let mut variables = BTreeSet::new();
        let mut item = |element: ElementId| -> TemplateResult<TemplateItem> {
            let ty = memory
                .element_type(element)
                .ok_or_else(|| build_error("template element does not exist"))?;
            if ty.is_const() {
                return Ok(TemplateItem::Fixed(element));
            }
            match params.get(&element) {
                Some(value) => {
                    used_params.insert(element, *value);
                    Ok(TemplateItem::Fixed(*value))
                }
                None => {
                    variables.insert(element);
                    Ok(TemplateItem::Var { var: element, ty })
                }
            }
        };

        let mut triples = Vec::with_capacity(connectors.len());
        for connector in &connectors {
            let (source, target) = memory
                .connector_ends(*connector)
                .ok_or_else(|| build_error("connector has no endpoints"))?;
            triples.push(TemplateTriple {
                source: item(source)?,
                connector: item(*connector)?,
                target: item(target)?,
            });
        }

        let triples = order_for_generation(triples).ok_or_else(|| {
            build_error("connector variables depend on each other in a cycle")
        })?;

        Ok(Self {
            structure,
            triples,
            params: used_params,
            variables,
        })
    }

    /// The structure this template was built from.
    pub fn structure(&self) -> ElementId {
        self.structure
    }

    pub fn triples(&self) -> &[TemplateTriple] {
        &self.triples
    }

    /// Open variables of the template.
    pub fn variables(&self) -> &BTreeSet<ElementId> {
        &self.variables
    }

    /// Bindings substituted at build time.
    pub fn params(&self) -> &TemplateParams {
        &self.params
    }

    /// Write a new instance of this pattern, creating constant elements for
    /// every open variable.
    pub fn generate(&self, memory: &Memory) -> TemplateResult<GenerationResult> {
        let generation_error = |message: String| TemplateError::Generation {
            structure: memory.label(self.structure),
            message,
        };

        let mut result = GenerationResult {
            bindings: self.params.clone(),
            ..Default::default()
        };

        for triple in &self.triples {
            let source = materialize(memory, triple.source, &mut result)
                .map_err(&generation_error)?;
            let target = materialize(memory, triple.target, &mut result)
                .map_err(&generation_error)?;
            let connector = match triple.connector {
                TemplateItem::Fixed(element) => element,
                TemplateItem::Var { var, ty } => match result.bindings.get(&var) {
                    Some(value) => *value,
                    None => {
                        let created = memory
                            .create_connector(ty.as_const(), source, target)
                            .map_err(|e| generation_error(e.to_string()))?;
                        result.bindings.insert(var, created);
                        result.created.push(created);
                        created
                    }
                },
            };
            result.elements.extend([source, connector, target]);
        }

        let mut seen = HashSet::new();
        result.elements.retain(|e| seen.insert(*e));
        Ok(result)
    }
}

/// Resolve an endpoint item during generation, creating nodes and links for
/// open variables.
fn materialize(
    memory: &Memory,
    item: TemplateItem,
    result: &mut GenerationResult,
) -> Result<ElementId, String> {
    let (var, ty) = match item {
        TemplateItem::Fixed(element) => return Ok(element),
        TemplateItem::Var { var, ty } => (var, ty),
    };
    if let Some(value) = result.bindings.get(&var) {
        return Ok(*value);
    }
    let created = match ty.kind {
        ElementKind::Link => memory.create_link(memory.link_content(var).unwrap_or_default()),
        ElementKind::Node(_) => memory.create_node(ty.as_const()),
        ElementKind::Connector(_) => {
            return Err(format!(
                "connector variable {} is used as an endpoint before it is generated",
                memory.label(var)
            ));
        }
    };
    let created = created.map_err(|e| e.to_string())?;
    result.bindings.insert(var, created);
    result.created.push(created);
    Ok(created)
}

/// Order triples so that a connector variable's own triple comes before any
/// triple using it as an endpoint. Returns `None` on cyclic dependencies.
fn order_for_generation(mut pending: Vec<TemplateTriple>) -> Option<Vec<TemplateTriple>> {
    let produced_by_template: HashSet<ElementId> = pending
        .iter()
        .filter_map(|t| match t.connector {
            TemplateItem::Var { var, .. } => Some(var),
            TemplateItem::Fixed(_) => None,
        })
        .collect();

    let mut produced = HashSet::new();
    let mut ordered = Vec::with_capacity(pending.len());
    while !pending.is_empty() {
        let ready = |item: &TemplateItem| match item {
            TemplateItem::Var { var, .. } if produced_by_template.contains(var) => {
                produced.contains(var)
            }
            _ => true,
        };
        let position = pending
            .iter()
            .position(|t| ready(&t.source) && ready(&t.target))?;
        let triple = pending.remove(position);
        if let TemplateItem::Var { var, .. } = triple.connector {
            produced.insert(var);
        }
        ordered.push(triple);
    }
    Some(ordered)
}
