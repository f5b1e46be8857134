//! MonoDevelop project (`.mdp`) and combine (`.mds`) files.

use std::io::{self, Write};
use std::path::PathBuf;

use crate::error::Result;
use crate::files::BuildAction;
use crate::model::{ClrRuntime, Project, Solution};
use crate::path;
use crate::targets::xml::XmlWriter;
use crate::targets::{ResolvedReference, Target, delete_if_exists, relative_artifact, resolve_reference, write_artifact};

#[derive(Debug, Clone, Copy, Default)]
pub struct MonoDevelopTarget;

fn build_action(action: BuildAction) -> &'static str {
    match action {
        BuildAction::Compile => "Compile",
        BuildAction::None => "Nothing",
        BuildAction::Content => "Exclude",
        BuildAction::EmbeddedResource => "EmbedAsResource",
    }
}

/// `(compiler, runtime)` attribute values.
fn toolchain(runtime: ClrRuntime) -> (&'static str, &'static str) {
    match runtime {
        ClrRuntime::Microsoft => ("Csc", "MsNet"),
        ClrRuntime::Mono => ("Mcs", "Mono"),
    }
}

impl MonoDevelopTarget {
    pub fn project_file(project: &Project) -> PathBuf {
        path::join_with_extension(&project.full_path, &project.name, "mdp")
    }

    pub fn combine_file(solution: &Solution) -> PathBuf {
        path::join_with_extension(&solution.full_path, &solution.name, "mds")
    }

    fn render_project(w: &mut dyn Write, solution: &Solution, project: &Project) -> io::Result<()> {
        let (compiler, runtime) = toolchain(project.runtime);
        let active = solution.configurations.first().map_or("Debug", |c| c.name.as_str());
        let mut xml = XmlWriter::new(w, b' ', 2);

        xml.start(
            "Project",
            &[
                ("name", project.name.as_str()),
                ("description", ""),
                ("standardNamespace", project.root_namespace.as_str()),
                ("newfilesearch", "None"),
                ("enableviewstate", "True"),
                ("fileversion", "2.0"),
                ("language", "C#"),
                ("ctype", "DotNetProject"),
            ],
        )?;

        xml.element("Configurations", &[("active", active)], |xml| {
            for conf in &project.configurations {
                let opts = &conf.options;
                let output = path::end_path(&path::prepend_dot(&path::normalize(opts.text("OutputPath"), '/')), '/');
                let target = project.project_type.as_str();
                let warning_level = opts.number("WarningLevel").to_string();
                let flag = |key: &str| if opts.flag(key) { "true" } else { "false" };

                xml.element("Configuration", &[("name", conf.name.as_str()), ("ctype", "DotNetProjectConfiguration")], |xml| {
                    xml.empty(
                        "Output",
                        &[
                            ("directory", output.as_str()),
                            ("assembly", project.assembly_name.as_str()),
                            ("executeScript", ""),
                            ("executeBeforeBuild", ""),
                            ("executeAfterBuild", ""),
                        ],
                    )?;
                    xml.empty("Build", &[("debugmode", "True"), ("target", target)])?;
                    xml.empty(
                        "Execution",
                        &[("runwithwarnings", "True"), ("consolepause", "True"), ("runtime", runtime)],
                    )?;
                    xml.empty(
                        "CodeGeneration",
                        &[
                            ("compiler", compiler),
                            ("warninglevel", warning_level.as_str()),
                            ("nowarn", opts.text("SuppressWarnings")),
                            ("includedebuginformation", flag("DebugInformation")),
                            ("optimize", flag("OptimizeCode")),
                            ("unsafecodeallowed", flag("AllowUnsafe")),
                            ("generateoverflowchecks", flag("CheckUnderflowOverflow")),
                            ("mainclass", project.startup_object.as_str()),
                            ("target", target),
                            ("definesymbols", opts.text("CompilerDefines")),
                            ("generatexmldocumentation", flag("GenerateXmlDocFile")),
                            ("ctype", "CSharpCompilerParameters"),
                        ],
                    )?;
                    Ok(())
                })?;
            }
            Ok(())
        })?;

        xml.element("DeploymentInformation", &[("target", ""), ("script", ""), ("strategy", "File")], |xml| {
            xml.empty("excludeFiles", &[])?;
            Ok(())
        })?;

        xml.element("Contents", &[], |xml| {
            for file in project.files.iter() {
                let name = path::prepend_dot(&file.path);
                xml.empty(
                    "File",
                    &[
                        ("name", name.as_str()),
                        ("subtype", "Code"),
                        ("buildaction", build_action(file.build_action)),
                        ("dependson", ""),
                        ("data", ""),
                    ],
                )?;
            }
            Ok(())
        })?;

        xml.element("References", &[], |xml| {
            for reference in &project.references {
                let local_copy = if reference.local_copy { "true" } else { "false" };
                match resolve_reference(solution, project, reference) {
                    ResolvedReference::Project(dep) => xml.empty(
                        "ProjectReference",
                        &[("type", "Project"), ("localcopy", local_copy), ("refto", dep.name.as_str())],
                    )?,
                    ResolvedReference::Assembly(dll) => {
                        let refto = path::prepend_dot(&path::relativize_paths(&project.full_path, &dll));
                        xml.empty(
                            "ProjectReference",
                            &[("type", "Assembly"), ("refto", refto.as_str()), ("localcopy", local_copy)],
                        )?
                    }
                    ResolvedReference::Named(name) => xml.empty(
                        "ProjectReference",
                        &[("type", "Gac"), ("localcopy", local_copy), ("refto", name)],
                    )?,
                };
            }
            Ok(())
        })?;

        xml.end("Project")?;
        xml.finish()
    }

    fn render_combine(w: &mut dyn Write, solution: &Solution) -> io::Result<()> {
        let projects = solution.projects();
        let active = solution.configurations.first().map_or("Debug", |c| c.name.as_str());
        let mut xml = XmlWriter::new(w, b' ', 2);

        xml.start("Combine", &[("name", solution.name.as_str()), ("fileversion", "2.0"), ("description", "")])?;

        xml.element("Configurations", &[("active", active)], |xml| {
            for conf in &solution.configurations {
                xml.element("Configuration", &[("name", conf.name.as_str()), ("ctype", "CombineConfiguration")], |xml| {
                    for project in projects {
                        xml.empty(
                            "Entry",
                            &[("configuration", conf.name.as_str()), ("build", "True"), ("name", project.name.as_str())],
                        )?;
                    }
                    Ok(())
                })?;
            }
            Ok(())
        })?;

        if let Some(first) = projects.first() {
            xml.element("StartMode", &[("startupentry", first.name.as_str()), ("single", "True")], |xml| {
                for project in projects {
                    xml.empty("Execute", &[("type", "None"), ("entry", project.name.as_str())])?;
                }
                Ok(())
            })?;
        }

        xml.element("Entries", &[], |xml| {
            for project in projects {
                let file = path::prepend_dot(&relative_artifact(&solution.full_path, &project.full_path, &project.name, "mdp"));
                xml.empty("Entry", &[("filename", file.as_str())])?;
            }
            Ok(())
        })?;

        xml.end("Combine")?;
        xml.finish()
    }
}

impl Target for MonoDevelopTarget {
    fn name(&self) -> &'static str {
        "monodev"
    }

    fn write(&self, solution: &Solution) -> Result<()> {
        tracing::info!("Creating MonoDevelop combine and project files");
        for project in solution.projects() {
            tracing::info!("...Creating project: {}", project.name);
            write_artifact(&Self::project_file(project), |w| Self::render_project(w, solution, project))?;
        }
        write_artifact(&Self::combine_file(solution), |w| Self::render_combine(w, solution))
    }

    fn clean(&self, solution: &Solution) -> Result<()> {
        tracing::info!("Cleaning MonoDevelop combine and project files for {}", solution.name);
        delete_if_exists(&Self::combine_file(solution))?;
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ModelBuilder;
    use std::fs;

    const XML: &str = r#"
        <Prebuild><Solution name="Sample">
          <Configuration name="Debug"><Options><DebugInformation>true</DebugInformation></Options></Configuration>
          <Configuration name="Release"/>
          <Project name="App" path="App" runtime="Mono">
            <Reference name="Lib"/>
            <Reference name="System.Xml"/>
            <Files><File>Main.cs</File><File buildAction="EmbeddedResource">icon.ico</File></Files>
          </Project>
          <Project name="Lib" path="Lib" type="Library"/>
        </Solution></Prebuild>"#;

    fn setup() -> (tempfile::TempDir, Solution) {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("App")).unwrap();
        fs::create_dir_all(dir.path().join("Lib")).unwrap();
        fs::write(dir.path().join("App/Main.cs"), "").unwrap();
        fs::write(dir.path().join("App/icon.ico"), "").unwrap();
        let sln = ModelBuilder::new().parse_str(XML, dir.path()).unwrap().remove(0);
        (dir, sln)
    }

    #[test]
    fn project_file_contents() {
        let (_dir, sln) = setup();
        let mut out = Vec::new();
        MonoDevelopTarget::render_project(&mut out, &sln, sln.project("App").unwrap()).unwrap();
        let text = String::from_utf8(out).unwrap();

        let doc = roxmltree::Document::parse(&text).unwrap();
        let first = |tag: &str| doc.descendants().find(|n| n.has_tag_name(tag)).unwrap();

        assert_eq!(first("Configurations").attribute("active"), Some("Debug"));
        assert_eq!(first("CodeGeneration").attribute("compiler"), Some("Mcs"));
        assert_eq!(first("CodeGeneration").attribute("includedebuginformation"), Some("true"));
        assert_eq!(first("Execution").attribute("runtime"), Some("Mono"));
        assert_eq!(first("Output").attribute("directory"), Some("./bin/"));

        let files: Vec<_> = doc
            .descendants()
            .filter(|n| n.has_tag_name("File"))
            .map(|n| (n.attribute("name").unwrap(), n.attribute("buildaction").unwrap()))
            .collect();
        assert_eq!(files, [("./Main.cs", "Compile"), ("./icon.ico", "EmbedAsResource")]);

        let references: Vec<_> = doc
            .descendants()
            .filter(|n| n.has_tag_name("ProjectReference"))
            .map(|n| (n.attribute("type").unwrap(), n.attribute("refto").unwrap(), n.attribute("localcopy").unwrap()))
            .collect();
        assert_eq!(references, [("Project", "Lib", "false"), ("Gac", "System.Xml", "false")]);
    }

    #[test]
    fn names_and_defines_are_escaped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("A&B.cs"), "").unwrap();
        let sln = ModelBuilder::new()
            .parse_str(
                r#"<Prebuild><Solution name="S&amp;T">
                     <Configuration name="Debug"><Options><CompilerDefines>X&lt;Y</CompilerDefines></Options></Configuration>
                     <Project name="R&amp;D"><Files><File>A&amp;B.cs</File></Files></Project>
                   </Solution></Prebuild>"#,
                dir.path(),
            )
            .unwrap()
            .remove(0);

        let mut out = Vec::new();
        MonoDevelopTarget::render_project(&mut out, &sln, sln.project("R&D").unwrap()).unwrap();
        let text = String::from_utf8(out).unwrap();
        let doc = roxmltree::Document::parse(&text).unwrap();
        assert_eq!(doc.root_element().attribute("name"), Some("R&D"));
        let first = |tag: &str| doc.descendants().find(|n| n.has_tag_name(tag)).unwrap();
        assert_eq!(first("CodeGeneration").attribute("definesymbols"), Some("X<Y"));
        assert_eq!(first("File").attribute("name"), Some("./A&B.cs"));

        let mut out = Vec::new();
        MonoDevelopTarget::render_combine(&mut out, &sln).unwrap();
        let combine = String::from_utf8(out).unwrap();
        let doc = roxmltree::Document::parse(&combine).unwrap();
        assert_eq!(doc.root_element().attribute("name"), Some("S&T"));
    }

    #[test]
    fn write_and_clean() {
        let (dir, sln) = setup();
        MonoDevelopTarget.write(&sln).unwrap();

        let combine = fs::read_to_string(dir.path().join("Sample.mds")).unwrap();
        let doc = roxmltree::Document::parse(&combine).unwrap();
        let entries: Vec<_> = doc.descendants().filter_map(|n| n.attribute("filename")).collect();
        assert_eq!(entries, ["./App/App.mdp", "./Lib/Lib.mdp"]);
        assert!(combine.contains(r#"<Entry configuration="Release" build="True" name="Lib"/>"#));
        assert!(combine.contains(r#"<StartMode startupentry="App" single="True">"#));
        assert!(dir.path().join("Lib/Lib.mdp").is_file());

        MonoDevelopTarget.clean(&sln).unwrap();
        assert!(!dir.path().join("Sample.mds").exists());
        assert!(!dir.path().join("App/App.mdp").exists());
        assert!(dir.path().join("App/Main.cs").exists());
    }
}
