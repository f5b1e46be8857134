//! `debug`: print the parsed model to stdout instead of writing build files.

use std::io::{self, Write};

use crate::error::{ProjgenError, Result};
use crate::model::Solution;
use crate::targets::Target;

#[derive(Debug, Clone, Copy, Default)]
pub struct DebugTarget;

impl DebugTarget {
    fn dump(w: &mut dyn Write, solution: &Solution) -> io::Result<()> {
        writeln!(w, "Solution [ {}, {} ]", solution.name, solution.path)?;
        for file in solution.files.iter() {
            writeln!(w, "\tFile [ {} ]", file.path)?;
        }

        for project in solution.projects() {
            writeln!(w, "\tProject [ {}, {}, {} ]", project.name, project.path, project.language)?;
            for conf in &project.configurations {
                writeln!(w, "\t\tConfiguration [ {} ]", conf.name)?;
            }
            for reference in &project.references {
                writeln!(w, "\t\tReference [ {} ]", reference.name)?;
            }
            for file in project.files.iter() {
                writeln!(w, "\t\tFile [ {}, {} ]", file.path, file.build_action)?;
            }
        }
        Ok(())
    }
}

impl Target for DebugTarget {
    fn name(&self) -> &'static str {
        "debug"
    }

    fn write(&self, solution: &Solution) -> Result<()> {
        let mut out = io::stdout().lock();
        Self::dump(&mut out, solution).map_err(|e| ProjgenError::io("<stdout>", e))
    }

    /// Nothing is written, so nothing is cleaned.
    fn clean(&self, _solution: &Solution) -> Result<()> {
        Ok(())
    }
}
