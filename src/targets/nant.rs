//! NAnt build files: one `<Name>.build` per project plus a solution-level
//! `<Solution>.build` that drives them.

use std::io::{self, Write};
use std::path::PathBuf;

use crate::error::Result;
use crate::files::BuildAction;
use crate::model::{Project, Reference, Solution};
use crate::path;
use crate::targets::xml::XmlWriter;
use crate::targets::{
    ResolvedReference, Target, delete_if_exists, relative_artifact, resolve_reference, write_artifact, xml_doc_file,
};

const BUILD_DIR: &str = "${nant.project.basedir}/${build.dir}";
const FRAMEWORK_DIR: &str = "${nant.settings.currentframework.frameworkassemblydirectory}";

#[derive(Debug, Clone, Copy, Default)]
pub struct NAntTarget;

impl NAntTarget {
    pub fn project_file(project: &Project) -> PathBuf {
        path::join_with_extension(&project.full_path, &project.name, "build")
    }

    pub fn solution_file(solution: &Solution) -> PathBuf {
        path::join_with_extension(&solution.full_path, &solution.name, "build")
    }

    fn reference_include(solution: &Solution, project: &Project, reference: &Reference) -> String {
        match resolve_reference(solution, project, reference) {
            ResolvedReference::Project(dep) => {
                let rel = path::relativize_paths(&project.full_path, &dep.full_path);
                let rel = if rel == "./" { String::new() } else { path::end_path(&rel, '/') };
                format!("${{nant.project.basedir}}/{rel}${{build.dir}}/{}", dep.output_file_name())
            }
            ResolvedReference::Assembly(dll) => {
                path::prepend_dot(&path::relativize_paths(&project.full_path, &dll))
            }
            ResolvedReference::Named(name) => format!("{FRAMEWORK_DIR}/{name}.dll"),
        }
    }

    fn render_project(w: &mut dyn Write, solution: &Solution, project: &Project) -> io::Result<()> {
        let mut xml = XmlWriter::new(w, b' ', 4);
        xml.declaration(None)?;
        xml.start("project", &[("name", project.name.as_str()), ("default", "build")])?;

        xml.element("target", &[("name", "build")], |xml| {
            let message = format!("Build Directory is {BUILD_DIR}");
            xml.empty("echo", &[("message", message.as_str())])?;
            xml.empty("mkdir", &[("dir", BUILD_DIR)])?;

            let target = project.project_type.as_str().to_ascii_lowercase();
            let doc = project
                .configurations
                .first()
                .map(|conf| format!("{BUILD_DIR}/{}", xml_doc_file(project, conf)));
            let output = format!("{BUILD_DIR}/{}", project.output_file_name());
            let icon = path::normalize(project.app_icon.as_str(), '/');

            let mut csc = vec![("target", target.as_str()), ("debug", "${build.debug}"), ("unsafe", "true")];
            if let Some(doc) = &doc {
                csc.push(("doc", doc.as_str()));
            }
            csc.push(("output", output.as_str()));
            if !project.app_icon.is_empty() {
                csc.push(("win32icon", icon.as_str()));
            }

            xml.element("csc", &csc, |xml| {
                xml.element("sources", &[("failonempty", "true")], |xml| {
                    for file in project.files.with_action(BuildAction::Compile) {
                        xml.empty("include", &[("name", path::prepend_dot(&file.path).as_str())])?;
                    }
                    Ok(())
                })?;
                xml.element("references", &[("basedir", BUILD_DIR)], |xml| {
                    for reference in &project.references {
                        let include = Self::reference_include(solution, project, reference);
                        xml.empty("include", &[("name", include.as_str())])?;
                    }
                    Ok(())
                })?;
                xml.element("resources", &[], |xml| {
                    for file in project.files.with_action(BuildAction::EmbeddedResource) {
                        xml.empty("include", &[("name", path::prepend_dot(&file.path).as_str())])?;
                    }
                    Ok(())
                })?;
                Ok(())
            })?;
            Ok(())
        })?;

        xml.element("target", &[("name", "clean")], |xml| {
            xml.empty("delete", &[("dir", "${bin.dir}"), ("failonerror", "false")])?;
            xml.empty("delete", &[("dir", "${obj.dir}"), ("failonerror", "false")])?;
            Ok(())
        })?;

        xml.end("project")?;
        xml.finish()
    }

    fn render_solution(w: &mut dyn Write, solution: &Solution) -> io::Result<()> {
        let mut xml = XmlWriter::new(w, b' ', 4);
        xml.declaration(None)?;
        xml.start("project", &[("name", solution.name.as_str()), ("default", "build")])?;
        xml.empty("echo", &[("message", "Using '${nant.settings.currentframework}' Framework")])?;

        property(&mut xml, "bin.dir", "bin")?;
        property(&mut xml, "obj.dir", "obj")?;
        property(&mut xml, "project.main.dir", "${nant.project.basedir}")?;
        if let Some(first) = solution.configurations.first() {
            property(&mut xml, "project.config", &first.name)?;
        }

        for conf in &solution.configurations {
            xml.element("target", &[("name", conf.name.as_str()), ("description", "")], |xml| {
                property(xml, "project.config", &conf.name)?;
                let debug = if conf.options.flag("DebugInformation") { "true" } else { "false" };
                property(xml, "build.debug", debug)
            })?;
        }

        xml.element("target", &[("name", "init"), ("description", "")], |xml| {
            xml.empty("call", &[("target", "${project.config}")])?;
            xml.empty("sysinfo", &[])?;
            xml.empty("echo", &[("message", "Platform ${sys.os.platform}")])?;
            property(xml, "build.dir", "${bin.dir}/${project.config}")
        })?;

        let buildfile = |project: &Project| relative_artifact(&solution.full_path, &project.full_path, &project.name, "build");

        xml.element("target", &[("name", "clean"), ("description", "")], |xml| {
            xml.empty("echo", &[("message", "Deleting all builds from all configurations")])?;
            for project in solution.projects() {
                xml.empty("nant", &[("buildfile", buildfile(project).as_str()), ("target", "clean")])?;
            }
            Ok(())
        })?;

        // Dependencies must be built before the projects that reference them.
        xml.element("target", &[("name", "build"), ("depends", "init"), ("description", "")], |xml| {
            for project in solution.build_order() {
                xml.empty("nant", &[("buildfile", buildfile(project).as_str()), ("target", "build")])?;
            }
            Ok(())
        })?;

        xml.end("project")?;
        xml.finish()
    }
}

fn property<W: Write>(xml: &mut XmlWriter<W>, name: &str, value: &str) -> io::Result<()> {
    xml.empty("property", &[("name", name), ("value", value)])?;
    Ok(())
}

impl Target for NAntTarget {
    fn name(&self) -> &'static str {
        "nant"
    }

    fn write(&self, solution: &Solution) -> Result<()> {
        tracing::info!("Creating NAnt build files");
        for project in solution.projects() {
            tracing::info!("...Creating project: {}", project.name);
            write_artifact(&Self::project_file(project), |w| Self::render_project(w, solution, project))?;
        }
        write_artifact(&Self::solution_file(solution), |w| Self::render_solution(w, solution))
    }

    fn clean(&self, solution: &Solution) -> Result<()> {
        tracing::info!("Cleaning NAnt build files for {}", solution.name);
        delete_if_exists(&Self::solution_file(solution))?;
        for project in solution.projects() {
            tracing::info!("...Cleaning project: {}", project.name);
            delete_if_exists(&Self::project_file(project))?;
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════
