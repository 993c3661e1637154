// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # sc-inference
//!
//! A forward-chaining rule inference engine over a semantic graph memory.
//!
//! ## Architecture
//!
//! - **Memory** (`memory`, `element`): typed nodes, links and first-class connectors
//! - **Templates** (`template`, `searcher`, `template_manager`): pattern search and generation
//! - **Replacements** (`replacements`): binding tables and their join/union algebra
//! - **Logic** (`classifier`, `logic`): formula trees built from the graph and evaluated
//! - **Solutions** (`solution`): provenance of every rule that fired
//! - **Manager** (`manager`, `engine`): the inference loop and its facade
//! - **Knowledge bases** (`kb`): builders and TOML bundles
//!
//! ## Library usage
//!
//! ```no_run
//! use sc_inference::config::InferenceConfig;
//! use sc_inference::element::ElementType;
//! use sc_inference::engine::Engine;
//! use sc_inference::manager::InferenceParams;
//!
//! let engine = Engine::new(InferenceConfig::default()).unwrap();
//! let kb = engine.builder();
//! let socrates = kb.node("socrates").unwrap();
//! kb.add_member(kb.class("human").unwrap(), socrates).unwrap();
//!
//! let x = kb.var("_x").unwrap();
//! let human = kb.pattern().member(kb.class("human").unwrap(), x).atom().unwrap();
//! let mortal = kb.pattern().member(kb.class("mortal").unwrap(), x).atom().unwrap();
//! let rule = kb.rule(kb.implication(human, mortal).unwrap()).unwrap();
//!
//! let report = engine
//!     .apply_inference(&InferenceParams {
//!         formulas_set: kb.formulas_set(&[vec![rule]]).unwrap(),
//!         arguments: vec![socrates],
//!         input_structures: vec![],
//!         output_structure: engine.memory().create_node(ElementType::CONST_STRUCTURE).unwrap(),
//!         target_structure: None,
//!     })
//!     .unwrap();
//! assert!(report.target_achieved);
//! ```

pub mod classifier;
pub mod config;
pub mod element;
pub mod engine;
pub mod error;
pub mod kb;
pub mod keynodes;
pub mod logic;
pub mod manager;
pub mod memory;
pub mod replacements;
pub mod searcher;
pub mod solution;
pub mod template;
pub mod template_manager;
