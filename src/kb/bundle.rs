//! TOML knowledge-base bundles.
//!
//! A bundle declares everything one inference run needs:
//!
//! ```toml
//! name = "mortality"
//! facts = [
//!     ["human", "socrates"],              # class membership
//!     ["socrates", "nrel_student_of", "plato"],  # relation
//! ]
//! arguments = ["socrates"]
//! target = [["mortal", "?who"]]
//!
//! [[rules]]
//! name = "humans_are_mortal"
//! formula = { if = { atom = [["human", "?x"]] }, then = { atom = [["mortal", "?x"]] } }
//!
//! [inference]
//! generation = "unique"
//! ```
//!
//! Terms starting with `?` are variables, scoped to their rule. Terms
//! quoted with `'` are links. Rules with a lower `priority` are tried
//! first; rules sharing a priority form one group.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::Deserialize;

use crate::config::InferenceConfig;
use crate::element::{ElementId, ElementType};
use crate::manager::InferenceParams;
use crate::memory::Memory;
use crate::keynodes::Keynodes;

use super::{KbError, KbResult, KnowledgeBuilder, PatternBuilder};

// ── Data model ──────────────────────────────────────────────────────────

/// One `[class, member]` pair or `[subject, relation, object]` triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fact {
    Member { class: String, element: String },
    Relation { source: String, relation: String, target: String },
}

/// A formula tree as written in a bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Formula {
    Atom { facts: Vec<Fact>, generate: bool },
    And(Vec<Formula>),
    Or(Vec<Formula>),
    Not(Box<Formula>),
    Implies { premise: Box<Formula>, conclusion: Box<Formula> },
    Iff(Vec<Formula>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub name: String,
    pub priority: u32,
    /// Variables bound positionally to the run's arguments.
    pub arguments: Vec<String>,
    pub formula: Formula,
}

/// A named structure; its facts are asserted and their elements added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureDecl {
    pub name: String,
    pub facts: Vec<Fact>,
}

/// A parsed bundle, not yet written into memory.
#[derive(Debug, Clone, PartialEq)]
pub struct KnowledgeBase {
    pub name: String,
    pub description: String,
    pub facts: Vec<Fact>,
    pub structures: Vec<StructureDecl>,
    pub rules: Vec<Rule>,
    pub arguments: Vec<String>,
    pub input_structures: Vec<String>,
    pub target: Option<Vec<Fact>>,
    pub config: InferenceConfig,
}

/// A bundle written into memory.
#[derive(Debug, Clone)]
pub struct AppliedKnowledge {
    pub params: InferenceParams,
    pub config: InferenceConfig,
    /// Rule name to rule node, in declaration order.
    pub rules: Vec<(String, ElementId)>,
}

// ── TOML deserialization helpers ─────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct KbToml {
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    facts: Vec<Vec<String>>,
    #[serde(default)]
    structures: Vec<StructureToml>,
    #[serde(default)]
    rules: Vec<RuleToml>,
    #[serde(default)]
    arguments: Vec<String>,
    #[serde(default)]
    input_structures: Vec<String>,
    #[serde(default)]
    target: Option<Vec<Vec<String>>>,
    #[serde(default)]
    inference: InferenceConfig,
}

#[derive(Debug, Deserialize)]
struct StructureToml {
    name: String,
    #[serde(default)]
    facts: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RuleToml {
    name: String,
    #[serde(default = "default_priority")]
    priority: u32,
    #[serde(default)]
    arguments: Vec<String>,
    formula: FormulaToml,
}

fn default_priority() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FormulaToml {
    atom: Option<Vec<Vec<String>>>,
    #[serde(default)]
    generate: bool,
    and: Option<Vec<FormulaToml>>,
    or: Option<Vec<FormulaToml>>,
    not: Option<Box<FormulaToml>>,
    #[serde(rename = "if")]
    premise: Option<Box<FormulaToml>>,
    then: Option<Box<FormulaToml>>,
    iff: Option<Vec<FormulaToml>>,
}

fn parse_error(message: impl Into<String>) -> KbError {
    KbError::Parse {
        message: message.into(),
    }
}

fn parse_fact(terms: Vec<String>) -> KbResult<Fact> {
    match <[String; 2]>::try_from(terms) {
        Ok([class, element]) => Ok(Fact::Member { class, element }),
        Err(terms) => match <[String; 3]>::try_from(terms) {
            Ok([source, relation, target]) => Ok(Fact::Relation {
                source,
                relation,
                target,
            }),
            Err(terms) => Err(parse_error(format!(
                "a fact has 2 or 3 terms, got {}: {terms:?}",
                terms.len()
            ))),
        },
    }
}

fn parse_facts(facts: Vec<Vec<String>>) -> KbResult<Vec<Fact>> {
    facts.into_iter().map(parse_fact).collect()
}

impl FormulaToml {
    fn into_formula(self, rule: &str) -> KbResult<Formula> {
        let kinds = [
            self.atom.is_some(),
            self.and.is_some(),
            self.or.is_some(),
            self.not.is_some(),
            self.premise.is_some() || self.then.is_some(),
            self.iff.is_some(),
        ];
        if kinds.iter().filter(|k| **k).count() != 1 {
            return Err(parse_error(format!(
                "rule \"{rule}\": a formula needs exactly one of atom, and, or, not, if/then, iff"
            )));
        }
        let all = |operands: Vec<FormulaToml>| -> KbResult<Vec<Formula>> {
            operands.into_iter().map(|f| f.into_formula(rule)).collect()
        };

        if let Some(facts) = self.atom {
            if facts.is_empty() {
                return Err(parse_error(format!("rule \"{rule}\": an atom needs at least one fact")));
            }
            return Ok(Formula::Atom {
                facts: parse_facts(facts)?,
                generate: self.generate,
            });
        }
        if let Some(operands) = self.and {
            return Ok(Formula::And(all(operands)?));
        }
        if let Some(operands) = self.or {
            return Ok(Formula::Or(all(operands)?));
        }
        if let Some(operand) = self.not {
            return Ok(Formula::Not(Box::new(operand.into_formula(rule)?)));
        }
        if let Some(operands) = self.iff {
            return Ok(Formula::Iff(all(operands)?));
        }
        match (self.premise, self.then) {
            (Some(premise), Some(conclusion)) => Ok(Formula::Implies {
                premise: Box::new(premise.into_formula(rule)?),
                conclusion: Box::new(conclusion.into_formula(rule)?),
            }),
            _ => Err(parse_error(format!("rule \"{rule}\": `if` needs a matching `then`"))),
        }
    }
}

// ── Loading ─────────────────────────────────────────────────────────────

impl KnowledgeBase {
    /// Parse a bundle from TOML text.
    pub fn from_toml_str(content: &str) -> KbResult<Self> {
        let parsed: KbToml = toml::from_str(content).map_err(|e| parse_error(e.to_string()))?;
        parsed
            .inference
            .validate()
            .map_err(|e| parse_error(e.to_string()))?;

        let rules = parsed
            .rules
            .into_iter()
            .map(|rule| {
                Ok(Rule {
                    formula: rule.formula.into_formula(&rule.name)?,
                    name: rule.name,
                    priority: rule.priority,
                    arguments: rule.arguments,
                })
            })
            .collect::<KbResult<Vec<_>>>()?;

        let structures = parsed
            .structures
            .into_iter()
            .map(|s| {
                Ok(StructureDecl {
                    name: s.name,
                    facts: parse_facts(s.facts)?,
                })
            })
            .collect::<KbResult<Vec<_>>>()?;

        Ok(Self {
            name: parsed.name,
            description: parsed.description,
            facts: parse_facts(parsed.facts)?,
            structures,
            rules,
            arguments: parsed.arguments,
            input_structures: parsed.input_structures,
            target: parsed.target.map(parse_facts).transpose()?,
            config: parsed.inference,
        })
    }

    /// Read and parse a bundle file.
    pub fn load(path: &Path) -> KbResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| KbError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Write the bundle into `memory` and assemble the run parameters.
    ///
    /// A fresh output structure is created for the run.
    pub fn apply(&self, memory: &Memory, keynodes: &Keynodes) -> KbResult<AppliedKnowledge> {
        let kb = KnowledgeBuilder::new(memory, keynodes);
        let writer = Writer { kb };

        for fact in &self.facts {
            writer.assert_fact(fact)?;
        }

        let mut structures = HashMap::new();
        for decl in &self.structures {
            let structure = memory.resolve(&decl.name, ElementType::CONST_STRUCTURE)?;
            for fact in &decl.facts {
                for element in writer.assert_fact(fact)? {
                    if !memory.is_member(structure, element) {
                        kb.add_member(structure, element)?;
                    }
                }
            }
            structures.insert(decl.name.as_str(), structure);
        }
        let input_structures = self
            .input_structures
            .iter()
            .map(|name| {
                structures.get(name.as_str()).copied().ok_or_else(|| KbError::Apply {
                    message: format!("input structure \"{name}\" is not declared under [[structures]]"),
                })
            })
            .collect::<KbResult<Vec<_>>>()?;

        let mut groups: BTreeMap<u32, Vec<ElementId>> = BTreeMap::new();
        let mut rules = Vec::with_capacity(self.rules.len());
        for rule in &self.rules {
            let node = writer.rule(rule)?;
            groups.entry(rule.priority).or_default().push(node);
            rules.push((rule.name.clone(), node));
        }
        let groups: Vec<Vec<ElementId>> = groups.into_values().collect();
        let formulas_set = kb.formulas_set(&groups)?;

        let arguments = self
            .arguments
            .iter()
            .map(|name| kb.node(name))
            .collect::<Result<Vec<_>, _>>()?;

        let target_structure = match &self.target {
            Some(facts) => {
                let mut scope = Scope::new("target");
                let mut pattern = kb.pattern();
                for fact in facts {
                    pattern = writer.pattern_fact(pattern, fact, &mut scope)?.0;
                }
                Some(pattern.build()?)
            }
            None => None,
        };

        let output_structure = memory.create_node(ElementType::CONST_STRUCTURE)?;
        tracing::info!(
            kb = %self.name,
            facts = self.facts.len(),
            rules = rules.len(),
            groups = groups.len(),
            "applied knowledge base"
        );

        Ok(AppliedKnowledge {
            params: InferenceParams {
                formulas_set,
                arguments,
                input_structures,
                output_structure,
                target_structure,
            },
            config: self.config.clone(),
            rules,
        })
    }
}

// ── Writing ─────────────────────────────────────────────────────────────

/// Variables of one rule, by written name.
struct Scope {
    prefix: String,
    variables: HashMap<String, ElementId>,
}

impl Scope {
    fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            variables: HashMap::new(),
        }
    }
}

enum Term<'t> {
    Variable(&'t str),
    Link(&'t str),
    Name(&'t str),
}

fn term(text: &str) -> Term<'_> {
    if let Some(name) = text.strip_prefix('?') {
        return Term::Variable(name);
    }
    if let Some(content) = text.strip_prefix('\'').and_then(|t| t.strip_suffix('\'')) {
        return Term::Link(content);
    }
    Term::Name(text)
}

#[derive(Clone, Copy)]
enum Position {
    Class,
    Element,
    Relation,
}

struct Writer<'a> {
    kb: KnowledgeBuilder<'a>,
}

impl Writer<'_> {
    fn constant(&self, text: &str, position: Position) -> KbResult<ElementId> {
        let kb = &self.kb;
        Ok(match (term(text), position) {
            (Term::Variable(name), _) => {
                return Err(KbError::Apply {
                    message: format!("variable ?{name} is only allowed inside rules and the target"),
                });
            }
            (Term::Link(content), _) => kb.link(content)?,
            (Term::Name(name), Position::Class) => kb.class(name)?,
            (Term::Name(name), Position::Relation) => kb.relation(name)?,
            (Term::Name(name), Position::Element) => kb.node(name)?,
        })
    }

    /// Assert a fact. Returns every element of the construction.
    fn assert_fact(&self, fact: &Fact) -> KbResult<Vec<ElementId>> {
        let kb = &self.kb;
        match fact {
            Fact::Member { class, element } => {
                let class = self.constant(class, Position::Class)?;
                let element = self.constant(element, Position::Element)?;
                let arc = kb.add_member(class, element)?;
                Ok(vec![class, element, arc])
            }
            Fact::Relation {
                source,
                relation,
                target,
            } => {
                let source = self.constant(source, Position::Element)?;
                let relation = self.constant(relation, Position::Relation)?;
                let target = self.constant(target, Position::Element)?;
                let arc = kb.connect(source, relation, target)?;
                let mut elements = vec![source, relation, target, arc];
                elements.extend(
                    kb.memory()
                        .iterate3(Some(relation), None, Some(arc))
                        .into_iter()
                        .map(|t| t.connector),
                );
                Ok(elements)
            }
        }
    }

    /// A pattern term. Returns the element and whether it is a link.
    fn pattern_term(&self, text: &str, position: Position, scope: &mut Scope) -> KbResult<(ElementId, bool)> {
        let kb = &self.kb;
        match term(text) {
            Term::Variable(name) => {
                let var = match scope.variables.get(name) {
                    Some(var) => *var,
                    None => {
                        let var = kb.var(&format!("_{}_{name}", scope.prefix))?;
                        scope.variables.insert(name.to_string(), var);
                        var
                    }
                };
                Ok((var, false))
            }
            Term::Link(content) => Ok((kb.var_link(content)?, true)),
            Term::Name(_) => Ok((self.constant(text, position)?, false)),
        }
    }

    fn pattern_fact<'p>(
        &self,
        pattern: PatternBuilder<'p>,
        fact: &Fact,
        scope: &mut Scope,
    ) -> KbResult<(PatternBuilder<'p>, bool)> {
        Ok(match fact {
            Fact::Member { class, element } => {
                let (class, l1) = self.pattern_term(class, Position::Class, scope)?;
                let (element, l2) = self.pattern_term(element, Position::Element, scope)?;
                (pattern.member(class, element), l1 || l2)
            }
            Fact::Relation {
                source,
                relation,
                target,
            } => {
                let (source, l1) = self.pattern_term(source, Position::Element, scope)?;
                let (relation, l2) = self.pattern_term(relation, Position::Relation, scope)?;
                let (target, l3) = self.pattern_term(target, Position::Element, scope)?;
                (pattern.relation(source, relation, target), l1 || l2 || l3)
            }
        })
    }

    fn formula(&self, formula: &Formula, scope: &mut Scope) -> KbResult<ElementId> {
        let kb = &self.kb;
        let operands = |operands: &[Formula], scope: &mut Scope| -> KbResult<Vec<ElementId>> {
            operands.iter().map(|f| self.formula(f, scope)).collect()
        };
        Ok(match formula {
            Formula::Atom { facts, generate } => {
                let mut pattern = kb.pattern();
                let mut with_links = false;
                for fact in facts {
                    let (next, links) = self.pattern_fact(pattern, fact, scope)?;
                    pattern = next;
                    with_links |= links;
                }
                let atom = pattern.atom()?;
                if *generate {
                    kb.mark_for_generation(atom)?;
                }
                if with_links {
                    kb.mark_with_links(atom)?;
                }
                atom
            }
            Formula::And(items) => kb.conjunction(&operands(items, scope)?)?,
            Formula::Or(items) => kb.disjunction(&operands(items, scope)?)?,
            Formula::Not(item) => kb.negation(self.formula(item, scope)?)?,
            Formula::Implies {
                premise,
                conclusion,
            } => {
                let premise = self.formula(premise, scope)?;
                let conclusion = self.formula(conclusion, scope)?;
                kb.implication(premise, conclusion)?
            }
            Formula::Iff(items) => {
                let items = operands(items, scope)?;
                match items.as_slice() {
                    [left, right] => kb.equivalence(*left, *right)?,
                    _ => kb.equivalence_tuple(&items)?,
                }
            }
        })
    }

    fn rule(&self, rule: &Rule) -> KbResult<ElementId> {
        let kb = &self.kb;
        let mut scope = Scope::new(&rule.name);
        let root = self.formula(&rule.formula, &mut scope)?;

        let variables = rule
            .arguments
            .iter()
            .map(|argument| {
                let name = argument.strip_prefix('?').unwrap_or(argument);
                scope.variables.get(name).copied().ok_or_else(|| KbError::UnknownVariable {
                    rule: rule.name.clone(),
                    name: argument.clone(),
                })
            })
            .collect::<KbResult<Vec<_>>>()?;

        let node = if variables.is_empty() {
            kb.rule(root)?
        } else {
            kb.rule_with_arguments(root, &variables)?
        };
        kb.memory().set_system_identifier(node, &rule.name)?;
        Ok(node)
    }
}
