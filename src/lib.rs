pub mod builder;
pub mod cli;
pub mod error;
pub mod files;
pub mod glob;
pub mod model;
pub mod options;
pub mod path;
pub mod targets;

use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::Context;

pub use builder::{ModelBuilder, NodeRegistry, ParseContext};
pub use error::{NodeError, ProjgenError};
pub use model::{Configuration, Project, Reference, Solution};
pub use options::OptionSet;
pub use targets::{Mode, Target, TargetRegistry};

/// Parse `file` and run `mode` for `target` over every solution in it.
pub fn generate(file: &Path, target: &str, mode: Mode) -> anyhow::Result<()> {
    let registry = TargetRegistry::with_builtin_targets();
    let solutions = ModelBuilder::new()
        .parse_file(file)
        .with_context(|| format!("Reading {}", file.display()))?;
    registry
        .dispatch(target, &solutions, mode)
        .with_context(|| format!("Running target {target}"))?;
    Ok(())
}

pub fn run(cli: &cli::Cli) -> anyhow::Result<()> {
    if cli.list_targets {
        let registry = TargetRegistry::with_builtin_targets();
        let mut out = io::stdout().lock();
        for name in registry.names() {
            writeln!(out, "{name}")?;
        }
        return Ok(());
    }

    let target = cli.target.as_deref().context("No target given")?;
    let mode = if cli.clean { Mode::Clean } else { Mode::Generate };

    if cli.needs_confirmation() && !confirm("Are you sure that you want to delete all target files? (y/n) ")? {
        tracing::info!("Clean cancelled");
        return Ok(());
    }

    generate(&cli.file, target, mode)
}

fn confirm(prompt: &str) -> anyhow::Result<bool> {
    let mut stdout = io::stdout().lock();
    write!(stdout, "{prompt}")?;
    stdout.flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer).context("Reading confirmation")?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
