//! Validate an onboarding configuration file and print its step layout.
//!
//! ```text
//! onboard-check <configuration.(json|yaml)> [--data <snapshot.json>] [--engine-config <engine.yaml>]
//! ```
//!
//! With `--data`, the visible steps and the payload a submission would send
//! for that data are printed as well.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use onboard_core::domain::visibility;
use onboard_core::{resolve_visible, DataSnapshot, Diagnostics, EngineConfig};
use onboard_dsl::{
    model::walk_fields, parse_configuration, validate_configuration, ConfigFormat, FieldNode,
    OnboardingConfiguration,
};
use onboard_monitoring::MonitoringConfig;

/// Validate an onboarding configuration and print its step layout
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration document (.json, .yaml or .yml)
    configuration: PathBuf,

    /// Data snapshot (JSON) to preview visibility and the submission payload
    #[arg(long)]
    data: Option<PathBuf>,

    /// Engine settings file; ONBOARD_* variables still override it
    #[arg(long)]
    engine_config: Option<PathBuf>,
}

fn load_configuration(path: &Path) -> Result<OnboardingConfiguration> {
    let format = ConfigFormat::from_path(path)?;
    let input = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file {}", path.display()))?;
    Ok(parse_configuration(&input, format)?)
}

fn print_layout(configuration: &OnboardingConfiguration, engine: &EngineConfig) -> usize {
    let mut too_deep = 0;
    println!(
        "{} ({}) v{}: {} step(s)",
        configuration.name,
        configuration.id,
        configuration.version,
        configuration.steps.len()
    );

    for step in configuration.ordered_steps() {
        let conditional = if step.conditional_visibility.is_some() { " [conditional]" } else { "" };
        println!("  {}. {}{}", step.order, step.key, conditional);

        walk_fields(&step.fields, "", &mut |node: FieldNode<'_>, path: &str, depth: usize| {
            let field = match node {
                FieldNode::Leaf(field) | FieldNode::Group { field, .. } | FieldNode::Array { field, .. } => field,
            };
            let marker = if field.is_required { "*" } else { "" };
            println!("{:indent$}- {}{} ({})", "", path, marker, field.kind, indent = 4 + depth * 2);
            if depth > engine.max_nesting_depth {
                too_deep += 1;
            }
            true
        });
    }
    too_deep
}

fn print_preview(configuration: &OnboardingConfiguration, data_path: &Path) -> Result<()> {
    let input = std::fs::read_to_string(data_path)
        .with_context(|| format!("Failed to read data file {}", data_path.display()))?;
    let snapshot = DataSnapshot::from_value(serde_json::from_str(&input)?)?;

    let mut diagnostics = Diagnostics::new();
    let visible = resolve_visible(configuration, &snapshot, &mut diagnostics);
    println!("Visible steps: {}", visible.step_keys().join(", "));

    let payload = visibility::visible_payload(configuration, &snapshot, &mut diagnostics);
    println!("Payload: {}", serde_json::to_string_pretty(&payload)?);

    for diagnostic in diagnostics.entries() {
        println!("warning: {}: {}", diagnostic.subject, diagnostic.message);
    }
    Ok(())
}

fn run() -> Result<bool> {
    let args = Args::parse();
    let engine = EngineConfig::load(args.engine_config.as_deref()).context("Failed to load engine configuration")?;

    onboard_monitoring::init(MonitoringConfig {
        log_filter: engine.log_filter.clone(),
        json_logging: engine.json_logging,
        ..MonitoringConfig::for_service("onboard-check")
    })
    .context("Failed to initialize monitoring")?;

    let configuration = load_configuration(&args.configuration)?;
    let too_deep = print_layout(&configuration, &engine);

    let mut ok = true;
    if let Err(e) = validate_configuration(&configuration) {
        ok = false;
        let errors = e.validation_errors();
        if errors.is_empty() {
            eprintln!("error: {}", e);
        }
        for error in errors {
            eprintln!("error: {}", error);
        }
    }
    if too_deep > 0 {
        ok = false;
        eprintln!(
            "error: {} field(s) nest deeper than the limit of {}",
            too_deep, engine.max_nesting_depth
        );
    }

    if ok {
        if let Some(data) = &args.data {
            print_preview(&configuration, data)?;
        }
    }
    Ok(ok)
}

fn main() -> ExitCode {
    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(2)
        }
    }
}
