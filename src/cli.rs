use clap::Parser;
use std::path::PathBuf;

/// Generate IDE and build-tool project files from a prebuild XML description.
#[derive(Parser, Debug)]
#[command(name = "projgen", author, version, about)]
pub struct Cli {
    /// Target toolchain (`vs2005`, `vs2008`, `monodev`, `nant`, `autotools`, or `all`)
    #[arg(short, long, required_unless_present = "list_targets")]
    pub target: Option<String>,

    /// Build description to read
    #[arg(short, long, value_name = "FILE", default_value = "prebuild.xml")]
    pub file: PathBuf,

    /// Delete previously generated files instead of writing them
    #[arg(long)]
    pub clean: bool,

    /// Do not ask for confirmation before `--target all --clean`
    #[arg(short, long)]
    pub yes: bool,

    /// Also write the log to this file
    #[arg(long, value_name = "FILE")]
    pub log: Option<PathBuf>,

    /// Print the registered targets and exit
    #[arg(long)]
    pub list_targets: bool,

    /// Debug-level logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// `--target all --clean` deletes every toolchain's files.
    pub fn needs_confirmation(&self) -> bool {
        self.clean && !self.yes && self.target.as_deref().is_some_and(|t| t.eq_ignore_ascii_case("all"))
    }
}
