//! Visual Studio .NET 2003: `<VisualStudioProject>` project files and
//! format 8.00 solutions.

use std::io::{self, Write};
use std::path::PathBuf;

use crate::error::{ProjgenError, Result};
use crate::model::{Project, Solution};
use crate::path;
use crate::targets::vs::{ToolInfo, braced_guid, documentation_file, tool_for, user_file_path};
use crate::targets::xml::XmlWriter;
use crate::targets::{ResolvedReference, Target, delete_if_exists, relative_artifact, resolve_reference, write_artifact};

const PRODUCT_VERSION: &str = "7.10.3077";
const SCHEMA_VERSION: &str = "2.0";
const SOLUTION_FORMAT: &str = "8.00";

/// `<Config>` attribute → option it is rendered from.
const CONFIG_ATTRIBUTES: &[(&str, &str)] = &[
    ("AllowUnsafeBlocks", "AllowUnsafe"),
    ("BaseAddress", "BaseAddress"),
    ("CheckForOverflowUnderflow", "CheckUnderflowOverflow"),
    ("DefineConstants", "CompilerDefines"),
    ("DebugSymbols", "DebugInformation"),
    ("FileAlignment", "FileAlignment"),
    ("IncrementalBuild", "IncrementalBuild"),
    ("NoStdLib", "NoStdLib"),
    ("NoWarn", "SuppressWarnings"),
    ("Optimize", "OptimizeCode"),
    ("RegisterForComInterop", "RegisterComInterop"),
    ("RemoveIntegerChecks", "RemoveIntegerChecks"),
    ("TreatWarningsAsErrors", "WarningsAsErrors"),
    ("WarningLevel", "WarningLevel"),
];

#[derive(Debug, Clone, Copy, Default)]
pub struct Vs2003Target;

/// Language tool and the element that wraps the project body.
fn language(project: &Project) -> Result<(&'static ToolInfo, &'static str)> {
    let tool = tool_for(&project.language);
    let tag = tool.and_then(|t| match t.language {
        "C#" => Some("CSHARP"),
        "VisualBasic" => Some("VisualBasic"),
        _ => None,
    });
    tool.zip(tag).ok_or_else(|| ProjgenError::UnknownLanguage {
        project: project.name.clone(),
        language: project.language.clone(),
    })
}

impl Vs2003Target {
    pub fn project_file(project: &Project) -> Result<PathBuf> {
        let (tool, _) = language(project)?;
        Ok(path::join_with_extension(&project.full_path, &project.name, tool.extension))
    }

    pub fn solution_file(solution: &Solution) -> PathBuf {
        path::join_with_extension(&solution.full_path, &solution.name, "sln")
    }

    fn write_project(solution: &Solution, project: &Project) -> Result<()> {
        let (tool, tag) = language(project)?;
        let project_file = path::join_with_extension(&project.full_path, &project.name, tool.extension);
        write_artifact(&project_file, |w| Self::render_project(w, solution, project, tool, tag))?;
        write_artifact(&user_file_path(&project_file), |w| Self::render_user_file(w, project, tag))
    }

    fn render_project(
        w: &mut dyn Write,
        solution: &Solution,
        project: &Project,
        tool: &ToolInfo,
        tag: &str,
    ) -> io::Result<()> {
        let mut xml = XmlWriter::new(w, b'\t', 1);
        let guid = braced_guid(&project.guid);

        xml.start("VisualStudioProject", &[])?;
        xml.start(
            tag,
            &[
                ("ProjectType", "Local"),
                ("ProductVersion", PRODUCT_VERSION),
                ("SchemaVersion", SCHEMA_VERSION),
                ("ProjectGuid", guid.as_str()),
            ],
        )?;

        xml.start("Build", &[])?;
        let output_type = project.project_type.as_str();
        xml.element(
            "Settings",
            &[
                ("ApplicationIcon", project.app_icon.as_str()),
                ("AssemblyKeyContainerName", ""),
                ("AssemblyName", project.assembly_name.as_str()),
                ("AssemblyOriginatorKeyFile", ""),
                ("DefaultClientScript", "JScript"),
                ("DefaultHTMLPageLayout", "Grid"),
                ("DefaultTargetSchema", "IE50"),
                ("DelaySign", "false"),
                ("OutputType", output_type),
                ("RootNamespace", project.root_namespace.as_str()),
                ("StartupObject", project.startup_object.as_str()),
            ],
            |xml| {
                for conf in &project.configurations {
                    let opts = &conf.options;
                    let values: Vec<(&str, String)> = CONFIG_ATTRIBUTES
                        .iter()
                        .map(|(attr, option)| (*attr, opts.get(option).map(ToString::to_string).unwrap_or_default()))
                        .collect();
                    let doc_file = documentation_file(project, conf);
                    let output = path::end_path(&path::to_backslash(opts.text("OutputPath")), '\\');

                    let mut attrs: Vec<(&str, &str)> = vec![("Name", conf.name.as_str()), ("ConfigurationOverrideFile", "")];
                    attrs.extend(values.iter().map(|(k, v)| (*k, v.as_str())));
                    attrs.push(("DocumentationFile", doc_file.as_str()));
                    attrs.push(("OutputPath", output.as_str()));
                    xml.empty("Config", &attrs)?;
                }
                Ok(())
            },
        )?;

        xml.element("References", &[], |xml| {
            for reference in &project.references {
                match resolve_reference(solution, project, reference) {
                    ResolvedReference::Project(dep) => {
                        let dep_guid = braced_guid(&dep.guid);
                        xml.empty(
                            "Reference",
                            &[("Name", reference.name.as_str()), ("Project", dep_guid.as_str()), ("Package", tool.guid)],
                        )?;
                    }
                    ResolvedReference::Assembly(dll) => {
                        let hint = path::to_backslash(&path::relativize_paths(&project.full_path, &dll));
                        let private = reference.local_copy.to_string();
                        xml.empty(
                            "Reference",
                            &[("Name", reference.name.as_str()), ("HintPath", hint.as_str()), ("Private", private.as_str())],
                        )?;
                    }
                    ResolvedReference::Named(name) => {
                        xml.empty("Reference", &[("Name", name)])?;
                    }
                }
            }
            Ok(())
        })?;
        xml.end("Build")?;

        xml.element("Files", &[], |xml| {
            xml.element("Include", &[], |xml| {
                for file in project.files.iter() {
                    let rel = path::to_backslash(&file.path);
                    xml.empty(
                        "File",
                        &[("RelPath", rel.as_str()), ("SubType", "Code"), ("BuildAction", file.build_action.as_str())],
                    )?;
                }
                Ok(())
            })?;
            Ok(())
        })?;

        xml.end(tag)?;
        xml.end("VisualStudioProject")?;
        xml.finish()
    }

    fn render_user_file(w: &mut dyn Write, project: &Project, tag: &str) -> io::Result<()> {
        let mut xml = XmlWriter::new(w, b'\t', 1);
        let reference_path = project
            .reference_paths
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(";");

        xml.start("VisualStudioProject", &[])?;
        xml.start(tag, &[])?;
        xml.element("Build", &[], |xml| {
            xml.element("Settings", &[("ReferencePath", reference_path.as_str())], |xml| {
                for conf in &project.configurations {
                    xml.empty("Config", &[("Name", conf.name.as_str())])?;
                }
                Ok(())
            })?;
            Ok(())
        })?;
        xml.end(tag)?;
        xml.end("VisualStudioProject")?;
        xml.finish()
    }

    /// Render the `.sln` into memory, so an unknown language fails before
    /// anything is written.
    fn render_solution(solution: &Solution) -> Result<Vec<u8>> {
        let mut entries = Vec::new();
        for project in solution.projects() {
            entries.push((project, language(project)?.0));
        }

        let mut out = Vec::new();
        Self::write_solution(&mut out, solution, &entries)
            .map_err(|e| ProjgenError::io(Self::solution_file(solution), e))?;
        Ok(out)
    }

    fn write_solution(w: &mut dyn Write, solution: &Solution, entries: &[(&Project, &'static ToolInfo)]) -> io::Result<()> {
        writeln!(w, "Microsoft Visual Studio Solution File, Format Version {SOLUTION_FORMAT}")?;
        for (project, tool) in entries {
            writeln!(
                w,
                "Project(\"{}\") = \"{}\", \"{}\", \"{}\"",
                tool.guid,
                project.name,
                path::to_backslash(&relative_artifact(&solution.full_path, &project.full_path, &project.name, tool.extension)),
                braced_guid(&project.guid)
            )?;
            writeln!(w, "\tProjectSection(ProjectDependencies) = postProject")?;
            writeln!(w, "\tEndProjectSection")?;
            writeln!(w, "EndProject")?;
        }

        writeln!(w, "Global")?;
        writeln!(w, "\tGlobalSection(SolutionConfiguration) = preSolution")?;
        for conf in &solution.configurations {
            writeln!(w, "\t\t{0} = {0}", conf.name)?;
        }
        writeln!(w, "\tEndGlobalSection")?;

        // Keyed by the reference's position in the referencing project.
        writeln!(w, "\tGlobalSection(ProjectDependencies) = postSolution")?;
        for (project, _) in entries {
            for (i, reference) in project.references.iter().enumerate() {
                if let Some(dep) = solution.project(&reference.name) {
                    writeln!(w, "\t\t({}).{i} = ({})", braced_guid(&project.guid), braced_guid(&dep.guid))?;
                }
            }
        }
        writeln!(w, "\tEndGlobalSection")?;

        writeln!(w, "\tGlobalSection(ProjectConfiguration) = postSolution")?;
        for (project, _) in entries {
            let id = braced_guid(&project.guid);
            for conf in &solution.configurations {
                writeln!(w, "\t\t{id}.{0}.ActiveCfg = {0}|.NET", conf.name)?;
                writeln!(w, "\t\t{id}.{0}.Build.0 = {0}|.NET", conf.name)?;
            }
        }
        writeln!(w, "\tEndGlobalSection")?;

        if !solution.files.is_empty() {
            writeln!(w, "\tGlobalSection(SolutionItems) = postSolution")?;
            for file in solution.files.iter() {
                let item = path::to_backslash(&file.path);
                writeln!(w, "\t\t{item} = {item}")?;
            }
            writeln!(w, "\tEndGlobalSection")?;
        }
        writeln!(w, "EndGlobal")
    }
}

impl Target for Vs2003Target {
    fn name(&self) -> &'static str {
        "vs2003"
    }

    fn write(&self, solution: &Solution) -> Result<()> {
        tracing::info!("Creating Visual Studio 2003 solution and project files");
        for project in solution.projects() {
            tracing::info!("...Creating project: {}", project.name);
            Self::write_project(solution, project)?;
        }
        let contents = Self::render_solution(solution)?;
        write_artifact(&Self::solution_file(solution), |w| w.write_all(&contents))
    }

    fn clean(&self, solution: &Solution) -> Result<()> {
        tracing::info!("Cleaning Visual Studio 2003 solution and project files for {}", solution.name);
        delete_if_exists(&Self::solution_file(solution))?;
        delete_if_exists(&path::join_with_extension(&solution.full_path, &solution.name, "suo"))?;
        for project in solution.projects() {
            tracing::info!("...Cleaning project: {}", project.name);
            match Self::project_file(project) {
                Ok(project_file) => {
                    delete_if_exists(&project_file)?;
                    delete_if_exists(&user_file_path(&project_file))?;
                }
                Err(e) => tracing::warn!("{e}"),
            }
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
          <Configuration name="Debug">
            <Options><OptimizeCode>false</OptimizeCode><CompilerDefines>DEBUG;TRACE</CompilerDefines></Options>
          </Configuration>
          <Project name="App" path="App" guid="11111111-2222-3333-4444-555555555555">
            <Reference name="System"/>
            <Reference name="Lib"/>
            <Files><File>Main.cs</File><File buildAction="EmbeddedResource">App.resx</File></Files>
          </Project>
          <Project name="Lib" path="Lib" type="Library" language="VisualBasic" guid="aaaaaaaa-bbbb-cccc-dddd-eeeeeeeeeeee"/>
        </Solution></Prebuild>"#;

    fn setup() -> (tempfile::TempDir, Solution) {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("App")).unwrap();
        fs::create_dir_all(dir.path().join("Lib")).unwrap();
        fs::write(dir.path().join("App/Main.cs"), "").unwrap();
        fs::write(dir.path().join("App/App.resx"), "").unwrap();
        let sln = ModelBuilder::new().parse_str(XML, dir.path()).unwrap().remove(0);
        (dir, sln)
    }

    #[test]
    fn project_file_layout() {
        let (_dir, sln) = setup();
        let app = sln.project("App").unwrap();
        let (tool, tag) = language(app).unwrap();
        let mut out = Vec::new();
        Vs2003Target::render_project(&mut out, &sln, app, tool, tag).unwrap();
        let text = String::from_utf8(out).unwrap();
        let doc = roxmltree::Document::parse(&text).unwrap();

        let root = doc.root_element();
        assert!(root.has_tag_name("VisualStudioProject"));
        let body = root.first_element_child().unwrap();
        assert!(body.has_tag_name("CSHARP"));
        assert_eq!(body.attribute("ProductVersion"), Some(PRODUCT_VERSION));
        assert_eq!(body.attribute("ProjectGuid"), Some("{11111111-2222-3333-4444-555555555555}"));

        let config = doc.descendants().find(|n| n.has_tag_name("Config")).unwrap();
        assert_eq!(config.attribute("Name"), Some("Debug"));
        assert_eq!(config.attribute("Optimize"), Some("false"));
        assert_eq!(config.attribute("DefineConstants"), Some("DEBUG;TRACE"));
        assert_eq!(config.attribute("OutputPath"), Some(r"bin\"));

        let references: Vec<_> = doc.descendants().filter(|n| n.has_tag_name("Reference")).collect();
        assert_eq!(references[0].attribute("Name"), Some("System"));
        assert_eq!(references[0].attribute("Project"), None);
        assert_eq!(references[1].attribute("Project"), Some("{AAAAAAAA-BBBB-CCCC-DDDD-EEEEEEEEEEEE}"));

        let files: Vec<_> = doc
            .descendants()
            .filter(|n| n.has_tag_name("File"))
            .map(|f| (f.attribute("RelPath"), f.attribute("BuildAction")))
            .collect();
        assert_eq!(files, [(Some("Main.cs"), Some("Compile")), (Some("App.resx"), Some("EmbeddedResource"))]);
    }

    #[test]
    fn solution_lists_dependencies_by_reference_index() {
        let (_dir, sln) = setup();
        let text = String::from_utf8(Vs2003Target::render_solution(&sln).unwrap()).unwrap();

        assert!(text.starts_with("Microsoft Visual Studio Solution File, Format Version 8.00\n"));
        assert!(text.contains(
            "Project(\"{F184B08F-C81C-45F6-A57F-5ABD9991F28F}\") = \"Lib\", \"Lib\\Lib.vbproj\", \"{AAAAAAAA-BBBB-CCCC-DDDD-EEEEEEEEEEEE}\""
        ));
        assert!(text.contains(
            "\t\t({11111111-2222-3333-4444-555555555555}).1 = ({AAAAAAAA-BBBB-CCCC-DDDD-EEEEEEEEEEEE})\n"
        ));
        assert!(text.contains("\t\t{11111111-2222-3333-4444-555555555555}.Debug.ActiveCfg = Debug|.NET\n"));
        assert!(!text.contains("SolutionItems"));
    }

    #[test]
    fn write_and_clean() {
        let (dir, sln) = setup();
        Vs2003Target.write(&sln).unwrap();

        let user = fs::read_to_string(dir.path().join("Lib/Lib.vbproj.user")).unwrap();
        let doc = roxmltree::Document::parse(&user).unwrap();
        assert!(doc.root_element().first_element_child().unwrap().has_tag_name("VisualBasic"));
        assert!(dir.path().join("App/App.csproj").is_file());
        assert!(dir.path().join("Sample.sln").is_file());

        Vs2003Target.clean(&sln).unwrap();
        for gone in ["Sample.sln", "App/App.csproj", "App/App.csproj.user", "Lib/Lib.vbproj", "Lib/Lib.vbproj.user"] {
            assert!(!dir.path().join(gone).exists(), "{gone}");
        }
        assert!(dir.path().join("App/Main.cs").exists());
    }

    #[test]
    fn boo_has_no_2003_project_type() {
        let dir = tempfile::tempdir().unwrap();
        let sln = ModelBuilder::new()
            .parse_str(r#"<Prebuild><Solution name="S"><Project name="A" language="Boo"/></Solution></Prebuild>"#, dir.path())
            .unwrap()
            .remove(0);
        let err = Vs2003Target.write(&sln).unwrap_err();
        assert!(matches!(err, ProjgenError::UnknownLanguage { .. }));
        assert!(!dir.path().join("S.sln").exists());
    }
}
