//! End-to-end integration tests for the sc-inference engine.
//!
//! These tests exercise the full pipeline from writing facts and rules
//! through inference, solution recording and erasure, validating that the
//! memory, formula evaluation and manager work together.

use std::collections::BTreeSet;
use std::io::Write;

use sc_inference::config::InferenceConfig;
use sc_inference::element::{ElementId, ElementType};
use sc_inference::engine::Engine;
use sc_inference::error::{FormulaError, InferenceError};
use sc_inference::kb::{KnowledgeBase, KnowledgeBuilder};
use sc_inference::manager::{InferenceManager, InferenceParams};
use sc_inference::template::TemplateParams;

fn test_engine() -> Engine {
    Engine::new(InferenceConfig::default()).unwrap()
}

/// `from(x) -> to(x)` over the shared variable `_x`.
fn class_rule(kb: &KnowledgeBuilder<'_>, from: &str, to: &str) -> ElementId {
    let x = kb.var("_x").unwrap();
    let premise = kb.pattern().member(kb.class(from).unwrap(), x).atom().unwrap();
    let conclusion = kb.pattern().member(kb.class(to).unwrap(), x).atom().unwrap();
    kb.rule(kb.implication(premise, conclusion).unwrap()).unwrap()
}

fn params(engine: &Engine, formulas_set: ElementId, arguments: Vec<ElementId>) -> InferenceParams {
    InferenceParams {
        formulas_set,
        arguments,
        input_structures: vec![],
        output_structure: engine.memory().create_node(ElementType::CONST_STRUCTURE).unwrap(),
        target_structure: None,
    }
}

#[test]
fn single_rule_classifies_argument() {
    let engine = test_engine();
    let kb = engine.builder();
    let arg = kb.node("arg").unwrap();
    kb.add_member(kb.class("a").unwrap(), arg).unwrap();
    let rule = class_rule(&kb, "a", "b");
    let set = kb.formulas_set(&[vec![rule]]).unwrap();

    let report = engine.apply_inference(&params(&engine, set, vec![arg])).unwrap();

    assert!(report.target_achieved);
    let memory = engine.memory();
    assert!(memory.is_member(kb.class("a").unwrap(), arg));
    assert!(memory.is_member(kb.class("b").unwrap(), arg));
    assert!(memory.is_member(report.output_structure, arg));
}

#[test]
fn disjunctive_premise_fires_through_second_branch() {
    let engine = test_engine();
    let kb = engine.builder();
    let arg = kb.node("arg").unwrap();
    kb.add_member(kb.class("c").unwrap(), arg).unwrap();

    let x = kb.var("_x").unwrap();
    let a = kb.pattern().member(kb.class("a").unwrap(), x).atom().unwrap();
    let c = kb.pattern().member(kb.class("c").unwrap(), x).atom().unwrap();
    let b = kb.pattern().member(kb.class("b").unwrap(), x).atom().unwrap();
    let premise = kb.disjunction(&[a, c]).unwrap();
    let rule = kb.rule(kb.implication(premise, b).unwrap()).unwrap();
    let set = kb.formulas_set(&[vec![rule]]).unwrap();

    let report = engine.apply_inference(&params(&engine, set, vec![arg])).unwrap();

    assert!(report.target_achieved);
    assert!(engine.memory().is_member(kb.class("b").unwrap(), arg));
    assert!(!engine.memory().is_member(kb.class("a").unwrap(), arg));
}

#[test]
fn empty_formulas_set_is_an_error() {
    let engine = test_engine();
    let kb = engine.builder();
    let arg = kb.node("arg").unwrap();
    let set = kb.formulas_set(&[]).unwrap();

    let err = engine
        .apply_inference(&params(&engine, set, vec![arg]))
        .unwrap_err();
    assert!(matches!(
        err,
        InferenceError::Formula(FormulaError::ItemNotFound { .. })
    ));
    assert!(engine.solution_tree().solutions().is_empty());
}

#[test]
fn malformed_rule_leaves_no_solution() {
    let engine = test_engine();
    let kb = engine.builder();
    let arg = kb.node("arg").unwrap();
    kb.add_member(kb.class("a").unwrap(), arg).unwrap();
    let fires = class_rule(&kb, "a", "b");

    // Both sides marked for generation: nothing to evaluate directly.
    let e = kb.var("_e").unwrap();
    let left = kb.pattern().member(kb.class("c").unwrap(), e).atom().unwrap();
    let right = kb.pattern().member(kb.class("d").unwrap(), e).atom().unwrap();
    kb.mark_for_generation(left).unwrap();
    kb.mark_for_generation(right).unwrap();
    let broken = kb.rule(kb.equivalence(left, right).unwrap()).unwrap();
    let set = kb.formulas_set(&[vec![fires, broken]]).unwrap();

    let err = engine
        .apply_inference(&params(&engine, set, vec![arg]))
        .unwrap_err();

    assert!(matches!(
        err,
        InferenceError::Formula(FormulaError::StructuralInconsistency { .. })
    ));
    assert!(engine.solution_tree().solutions().is_empty());
    assert!(engine.memory().is_member(kb.class("b").unwrap(), arg));
}

#[test]
fn rootless_rule_is_skipped_and_run_completes() {
    let engine = test_engine();
    let kb = engine.builder();
    let arg = kb.node("arg").unwrap();
    let rootless = kb.memory().create_node(ElementType::CONST_NODE).unwrap();
    let set = kb.formulas_set(&[vec![rootless]]).unwrap();

    let report = engine.apply_inference(&params(&engine, set, vec![arg])).unwrap();

    assert!(!report.target_achieved);
    assert_eq!(engine.solution_tree().solutions(), vec![report.solution]);
    assert_eq!(engine.solution_tree().is_successful(report.solution), Some(false));
}

#[test]
fn satisfied_target_returns_without_firing() {
    let engine = test_engine();
    let kb = engine.builder();
    let arg = kb.node("arg").unwrap();
    kb.add_member(kb.class("a").unwrap(), arg).unwrap();
    kb.add_member(kb.class("goal").unwrap(), arg).unwrap();
    let rule = class_rule(&kb, "a", "b");
    let set = kb.formulas_set(&[vec![rule]]).unwrap();
    let t = kb.var("_t").unwrap();
    let target = kb.pattern().member(kb.class("goal").unwrap(), t).build().unwrap();

    let mut params = params(&engine, set, vec![arg]);
    params.target_structure = Some(target);
    let report = engine.apply_inference(&params).unwrap();

    assert!(report.target_achieved);
    assert_eq!(report.fired, 0);
    assert!(report.entries.is_empty());
    assert!(!engine.memory().is_member(kb.class("b").unwrap(), arg));
}

#[test]
fn lower_priority_rule_unblocks_higher_one() {
    let engine = test_engine();
    let kb = engine.builder();
    let arg = kb.node("arg").unwrap();
    kb.add_member(kb.class("a").unwrap(), arg).unwrap();
    let finish = class_rule(&kb, "b", "goal");
    let unblock = class_rule(&kb, "a", "b");
    let set = kb.formulas_set(&[vec![finish], vec![unblock]]).unwrap();
    let t = kb.var("_t").unwrap();
    let target = kb.pattern().member(kb.class("goal").unwrap(), t).build().unwrap();

    let mut params = params(&engine, set, vec![arg]);
    params.target_structure = Some(target);
    let report = engine.apply_inference(&params).unwrap();

    assert!(report.target_achieved);
    assert_eq!(report.fired, 2);
    let fired: Vec<ElementId> = report.entries.iter().map(|e| e.formula).collect();
    assert_eq!(fired, vec![unblock, finish]);
    assert!(engine.memory().is_member(kb.class("goal").unwrap(), arg));
}

#[test]
fn all_mode_without_matches_generates_nothing() {
    let engine = test_engine();
    let kb = engine.builder();
    let arg = kb.node("arg").unwrap();
    let rule = class_rule(&kb, "a", "b");
    let set = kb.formulas_set(&[vec![rule]]).unwrap();

    let report = engine.apply_inference(&params(&engine, set, vec![arg])).unwrap();

    assert!(!report.target_achieved);
    assert_eq!(report.fired, 0);
    assert_eq!(engine.solution_tree().is_successful(report.solution), Some(false));
}

#[test]
fn recorded_binding_is_found_again() {
    let engine = test_engine();
    let kb = engine.builder();
    let arg = kb.node("arg").unwrap();
    let other = kb.node("other").unwrap();
    kb.add_member(kb.class("a").unwrap(), arg).unwrap();
    let rule = class_rule(&kb, "a", "b");
    let set = kb.formulas_set(&[vec![rule]]).unwrap();
    let x = kb.var("_x").unwrap();

    let mut manager =
        InferenceManager::new(engine.memory(), engine.keynodes(), InferenceConfig::default()).unwrap();
    assert!(manager.apply_inference(&params(&engine, set, vec![arg])).unwrap());

    let tree = manager.solution_tree();
    let vars = BTreeSet::from([x]);
    assert!(tree
        .check_if_solution_node_exists(rule, &TemplateParams::from([(x, arg)]), &vars)
        .unwrap());
    assert!(!tree
        .check_if_solution_node_exists(rule, &TemplateParams::from([(x, other)]), &vars)
        .unwrap());
}

#[test]
fn erased_solution_leaves_derived_facts() {
    let engine = test_engine();
    let kb = engine.builder();
    let arg = kb.node("arg").unwrap();
    kb.add_member(kb.class("a").unwrap(), arg).unwrap();
    let rule = class_rule(&kb, "a", "b");
    let set = kb.formulas_set(&[vec![rule]]).unwrap();

    let report = engine.apply_inference(&params(&engine, set, vec![arg])).unwrap();
    assert_eq!(engine.solution_tree().solutions(), vec![report.solution]);

    assert!(engine.erase_solution(report.solution));
    assert!(!engine.memory().is_element(report.solution));
    assert!(engine.solution_tree().solutions().is_empty());
    assert!(engine.memory().is_member(kb.class("b").unwrap(), arg));

    // A second erase finds nothing.
    assert!(!engine.erase_solution(report.solution));
}

#[test]
fn knowledge_base_bundle_runs_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
name = "mortality"
facts = [["human", "socrates"]]
arguments = ["socrates"]
target = [["mortal", "?who"]]

[[rules]]
name = "humans_are_mortal"
formula = {{ if = {{ atom = [["human", "?x"]] }}, then = {{ atom = [["mortal", "?x"]] }} }}
"#
    )
    .unwrap();

    let bundle = KnowledgeBase::load(file.path()).unwrap();
    let engine = Engine::new(bundle.config.clone()).unwrap();
    let applied = bundle.apply(engine.memory(), engine.keynodes()).unwrap();
    assert_eq!(applied.rules.len(), 1);
    assert!(applied.params.target_structure.is_some());

    let report = engine.apply_inference(&applied.params).unwrap();

    assert!(report.target_achieved);
    assert_eq!(report.fired, 1);
    assert_eq!(report.entries[0].formula, applied.rules[0].1);
    let memory = engine.memory();
    let mortal = memory.find_by_system_identifier("mortal").unwrap();
    let socrates = memory.find_by_system_identifier("socrates").unwrap();
    assert!(memory.is_member(mortal, socrates));
}

#[test]
fn missing_bundle_is_an_io_error() {
    let dir = tempfile::TempDir::new().unwrap();
    let err = KnowledgeBase::load(&dir.path().join("absent.toml")).unwrap_err();
    assert!(err.to_string().contains("absent.toml"));
}
