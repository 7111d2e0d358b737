//! Conduct CLI - Command-line interface for the behavior runtime
//!
//! Provides subcommands for checking behavior scripts against a facade
//! fixture and for executing them and inspecting the outcome.

use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use conduct::runtime::{BehaviorError, EntityId, FacadeFixture, StaticEntityFacade, Value};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "conduct")]
#[command(about = "Behavior-scripting runtime for industrial monitoring equipment", long_about = None)]
struct Cli {
    /// Facade fixture file (JSON) providing attributes, state, behaviors,
    /// and display devices
    #[arg(short, long)]
    fixture: Option<PathBuf>,

    /// Equipment entity id (UUID); a fresh one is generated when omitted
    #[arg(long)]
    entity: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and analyze a behavior, printing all diagnostics
    Check {
        /// Behavior source file
        behavior: PathBuf,
    },

    /// Execute a behavior and print the outcome
    Run {
        /// Behavior source file
        behavior: PathBuf,

        /// Actual parameter values, in declaration order (parsed as int,
        /// float, bool, or string)
        #[arg(short, long)]
        param: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let facade = load_facade(cli.fixture.as_deref())?;
    let entity = match &cli.entity {
        Some(raw) => EntityId::from_uuid(Uuid::parse_str(raw).context("invalid entity id")?),
        None => EntityId::new(),
    };

    match cli.command {
        Commands::Check { behavior } => {
            let source = std::fs::read_to_string(&behavior)
                .with_context(|| format!("reading {}", behavior.display()))?;
            let diagnostics = conduct::check_behavior(&source, entity, &facade)?;
            if diagnostics.is_empty() {
                println!("{}: no defects", behavior.display());
            } else {
                for diagnostic in &diagnostics {
                    println!("{}: {}", behavior.display(), diagnostic);
                }
                bail!("{} defect(s) found", diagnostics.len());
            }
        }

        Commands::Run { behavior, param } => {
            let source = std::fs::read_to_string(&behavior)
                .with_context(|| format!("reading {}", behavior.display()))?;
            let params: Vec<Value> = param.iter().map(|raw| parse_param(raw)).collect();
            match conduct::run_behavior(&source, &params, entity, &facade) {
                Ok(outcome) => {
                    println!("{}", serde_json::to_string_pretty(&outcome)?);
                }
                Err(BehaviorError::Analysis(diagnostics)) => {
                    for diagnostic in &diagnostics {
                        println!("{}: {}", behavior.display(), diagnostic);
                    }
                    bail!("{} defect(s) found", diagnostics.len());
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    Ok(())
}

fn load_facade(path: Option<&std::path::Path>) -> anyhow::Result<StaticEntityFacade> {
    match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            let fixture: FacadeFixture =
                serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
            Ok(StaticEntityFacade::from_fixture(fixture))
        }
        None => Ok(StaticEntityFacade::new()),
    }
}

/// Parse a CLI parameter: int, then float, then bool, else string.
fn parse_param(raw: &str) -> Value {
    if let Ok(value) = raw.parse::<i64>() {
        return Value::Int(value);
    }
    if let Ok(value) = raw.parse::<f64>() {
        return Value::Float(value);
    }
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::Str(raw.to_string()),
    }
}
