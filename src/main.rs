//! sc-infer CLI: run rule inference over a knowledge-base bundle.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use miette::{IntoDiagnostic, Result};

use sc_inference::config::InferenceConfig;
use sc_inference::element::{ConnectorKind, ElementId, ElementType};
use sc_inference::engine::{Engine, InferenceReport};
use sc_inference::kb::KnowledgeBase;
use sc_inference::manager::InferenceMode;
use sc_inference::memory::{Memory, relations};

#[derive(Parser)]
#[command(name = "sc-infer", version, about = "Forward-chaining rule inference over a semantic graph")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a knowledge base and run inference over it.
    Run {
        /// Path to the knowledge-base TOML bundle.
        #[arg(long)]
        kb: PathBuf,

        /// Iteration mode. Defaults to `target` when the bundle has a target.
        #[arg(long, value_enum)]
        mode: Option<Mode>,

        /// Inference settings overriding the bundle's `[inference]` table.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Load and validate a knowledge base without running it.
    Check {
        /// Path to the knowledge-base TOML bundle.
        #[arg(long)]
        kb: PathBuf,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Try every rule once.
    All,
    /// Fire rules until the target holds.
    Target,
}

impl From<Mode> for InferenceMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::All => InferenceMode::All,
            Mode::Target => InferenceMode::Target,
        }
    }
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            kb,
            mode,
            config,
            json,
        } => {
            let bundle = KnowledgeBase::load(&kb)?;
            let config = match config {
                Some(path) => InferenceConfig::load(&path)?,
                None => bundle.config.clone(),
            };

            let engine = Engine::new(config)?;
            let applied = bundle.apply(engine.memory(), engine.keynodes())?;
            let mut params = applied.params;
            if let Some(mode) = mode {
                params.set_mode(mode.into())?;
            }

            let report = engine.apply_inference(&params)?;
            if json {
                let value = serde_json::json!({
                    "kb": bundle.name,
                    "mode": params.mode(),
                    "report": report,
                    "fired": fired_rules(engine.memory(), &report),
                    "derived": derived_facts(engine.memory(), report.output_structure),
                });
                println!("{}", serde_json::to_string_pretty(&value).into_diagnostic()?);
            } else {
                print_report(&engine, &bundle, &report, params.target_structure.is_some());
            }
        }

        Commands::Check { kb } => {
            let bundle = KnowledgeBase::load(&kb)?;
            let engine = Engine::new(bundle.config.clone())?;
            let applied = bundle.apply(engine.memory(), engine.keynodes())?;
            println!("Knowledge base \"{}\" is valid.", bundle.name);
            if !bundle.description.is_empty() {
                println!("  {}", bundle.description);
            }
            println!("  facts:     {}", bundle.facts.len());
            println!("  rules:     {}", applied.rules.len());
            println!("  arguments: {}", applied.params.arguments.len());
            println!(
                "  target:    {}",
                if applied.params.target_structure.is_some() { "yes" } else { "no" }
            );
            println!("  elements:  {}", engine.memory().element_count());
        }
    }

    Ok(())
}

fn print_report(engine: &Engine, bundle: &KnowledgeBase, report: &InferenceReport, targeted: bool) {
    let memory = engine.memory();
    let outcome = match (targeted, report.target_achieved) {
        (true, true) => "target achieved",
        (true, false) => "target not achieved",
        (false, true) => "new knowledge generated",
        (false, false) => "nothing generated",
    };
    println!("Inference over \"{}\": {outcome}", bundle.name);
    println!("  solution: {}", report.solution);

    let fired = fired_rules(memory, report);
    if !fired.is_empty() {
        println!("\nFired rules ({}):", report.fired);
        for (i, line) in fired.iter().enumerate() {
            println!("  {}. {line}", i + 1);
        }
    }

    let derived = derived_facts(memory, report.output_structure);
    if derived.is_empty() {
        println!("\nNo facts derived.");
    } else {
        println!("\nDerived facts ({}):", derived.len());
        for fact in &derived {
            println!("  {fact}");
        }
    }
}

/// `rule {var = value, ...}` per recorded entry. Rule-local variable
/// prefixes are stripped.
fn fired_rules(memory: &Memory, report: &InferenceReport) -> Vec<String> {
    report
        .entries
        .iter()
        .map(|entry| {
            let rule = memory.label(entry.formula);
            let prefix = format!("_{rule}_");
            let bindings: Vec<String> = entry
                .substitutions
                .iter()
                .filter(|(var, _)| memory.element_type(*var).is_some_and(ElementType::is_node))
                .map(|(var, value)| {
                    let var = memory.label(*var);
                    let var = var.strip_prefix(&prefix).unwrap_or(&var).to_string();
                    format!("?{var} = {}", memory.label(*value))
                })
                .collect();
            format!("{rule} {{{}}}", bindings.join(", "))
        })
        .collect()
}

/// Facts in the output structure, as `class -> member` or
/// `source =relation=> target`.
fn derived_facts(memory: &Memory, output: ElementId) -> Vec<String> {
    relations::members(memory, output, ElementType::is_connector)
        .into_iter()
        .filter_map(|connector| {
            let (source, target) = memory.connector_ends(connector)?;
            match memory.element_type(connector)?.connector_kind()? {
                ConnectorKind::PermPosArc if memory.element_type(target)?.is_node() => {
                    Some(format!("{} -> {}", memory.label(source), memory.label(target)))
                }
                ConnectorKind::CommonArc => {
                    let relation = memory
                        .iterate3(None, Some(ConnectorKind::PermPosArc), Some(connector))
                        .into_iter()
                        .map(|t| t.source)
                        .find(|s| *s != output)?;
                    Some(format!(
                        "{} ={}=> {}",
                        memory.label(source),
                        memory.label(relation),
                        memory.label(target)
                    ))
                }
                _ => None,
            }
        })
        .collect()
}
