//! Visual Studio 2005 / 2008 project and solution files.
//!
//! All MSBuild editions share one emitter; [`VsVersion`] carries the values
//! that differ between them: format and product versions, `ToolsVersion`,
//! the target framework element, indentation and the languages accepted.

use std::collections::HashSet;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::{ProjgenError, Result};
use crate::files::{BuildAction, CopyToOutput, FileEntry, SubType};
use crate::model::{Configuration, Project, Solution};
use crate::path;
use crate::targets::xml::XmlWriter;
use crate::targets::{
    ResolvedReference, Target, delete_if_exists, project_dependencies, relative_artifact,
    resolve_reference, write_artifact, xml_doc_file,
};

const MSBUILD_NS: &str = "http://schemas.microsoft.com/developer/msbuild/2003";
const SOLUTION_FOLDER_GUID: &str = "{2150E333-8FDC-42A3-9474-1A3956D46DE8}";

// ═══════════════════════════════════════════════════════════════════════════════
//  Language tools
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolInfo {
    pub language: &'static str,
    pub guid: &'static str,
    pub extension: &'static str,
    pub import: &'static str,
}

pub const TOOLS: &[ToolInfo] = &[
    ToolInfo {
        language: "C#",
        guid: "{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}",
        extension: "csproj",
        import: r"$(MSBuildBinPath)\Microsoft.CSHARP.Targets",
    },
    ToolInfo {
        language: "VisualBasic",
        guid: "{F184B08F-C81C-45F6-A57F-5ABD9991F28F}",
        extension: "vbproj",
        import: r"$(MSBuildBinPath)\Microsoft.VisualBasic.Targets",
    },
    ToolInfo {
        language: "Boo",
        guid: "{45CEA7DC-C2ED-48A6-ACE0-E16144C02365}",
        extension: "booproj",
        import: r"$(BooBinPath)\Boo.Microsoft.Build.targets",
    },
];

pub fn tool_for(language: &str) -> Option<&'static ToolInfo> {
    TOOLS.iter().find(|t| t.language.eq_ignore_ascii_case(language))
}

/// `{XXXXXXXX-...}` in upper case, as Visual Studio writes ids.
pub fn braced_guid(guid: &uuid::Uuid) -> String {
    format!("{{{}}}", guid.to_string().to_uppercase())
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Versions
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VsVersion {
    Vs2005,
    /// Visual C# Express 2005: the 2005 formats, C# projects only.
    Vs2005Express,
    Vs2008,
}

impl VsVersion {
    pub fn target_name(self) -> &'static str {
        match self {
            Self::Vs2005 => "vs2005",
            Self::Vs2005Express => "vs2005express",
            Self::Vs2008 => "vs2008",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Vs2005 => "Visual Studio 2005",
            Self::Vs2005Express => "Visual C# Express 2005",
            Self::Vs2008 => "Visual Studio 2008",
        }
    }

    pub fn solution_format(self) -> &'static str {
        match self {
            Self::Vs2005 | Self::Vs2005Express => "9.00",
            Self::Vs2008 => "10.00",
        }
    }

    pub fn product_version(self) -> &'static str {
        match self {
            Self::Vs2005 => "8.0.50727",
            Self::Vs2005Express => "8.0.40607.16",
            Self::Vs2008 => "9.0.21022",
        }
    }

    fn tools_version(self) -> Option<&'static str> {
        match self {
            Self::Vs2005 | Self::Vs2005Express => None,
            Self::Vs2008 => Some("3.5"),
        }
    }

    fn xml_writer(self, w: &mut dyn Write) -> XmlWriter<&mut dyn Write> {
        match self {
            Self::Vs2005 | Self::Vs2005Express => XmlWriter::new(w, b'\t', 1),
            Self::Vs2008 => XmlWriter::new(w, b' ', 2),
        }
    }

    /// Language tool for `project`, if this edition can build it.
    fn tool(self, project: &Project) -> Result<&'static ToolInfo> {
        tool_for(&project.language)
            .filter(|tool| self != Self::Vs2005Express || tool.language == "C#")
            .ok_or_else(|| ProjgenError::UnknownLanguage {
                project: project.name.clone(),
                language: project.language.clone(),
            })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Emitter
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy)]
pub struct VsTarget {
    version: VsVersion,
}

/// MSBuild property → option it is rendered from, for the simple cases.
const CONFIG_PROPERTIES: &[(&str, &str)] = &[
    ("AllowUnsafeBlocks", "AllowUnsafe"),
    ("BaseAddress", "BaseAddress"),
    ("CheckForOverflowUnderflow", "CheckUnderflowOverflow"),
    ("DefineConstants", "CompilerDefines"),
    ("DebugSymbols", "DebugInformation"),
    ("FileAlignment", "FileAlignment"),
    ("Optimize", "OptimizeCode"),
    ("RegisterForComInterop", "RegisterComInterop"),
    ("RemoveIntegerChecks", "RemoveIntegerChecks"),
    ("TreatWarningsAsErrors", "WarningsAsErrors"),
    ("WarningLevel", "WarningLevel"),
    ("NoWarn", "SuppressWarnings"),
    ("NoStdLib", "NoStdLib"),
];

/// An MSBuild item: `<Tag Include="...">` with optional metadata children.
struct Item {
    tag: String,
    include: String,
    metadata: Vec<(&'static str, String)>,
}

impl Item {
    fn new(tag: impl Into<String>, include: impl Into<String>) -> Self {
        Self { tag: tag.into(), include: include.into(), metadata: Vec::new() }
    }

    fn meta(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.metadata.push((key, value.into()));
        self
    }

    fn write<W: Write>(&self, xml: &mut XmlWriter<W>) -> io::Result<()> {
        let attrs = [("Include", self.include.as_str())];
        if self.metadata.is_empty() {
            xml.empty(&self.tag, &attrs)?;
            return Ok(());
        }
        xml.element(&self.tag, &attrs, |xml| {
            for (key, value) in &self.metadata {
                xml.text(key, value)?;
            }
            Ok(())
        })?;
        Ok(())
    }
}

fn condition(conf: &Configuration) -> String {
    format!(" '$(Configuration)|$(Platform)' == '{}|AnyCPU' ", conf.name)
}

const CONFIGURATION_UNSET: &str = " '$(Configuration)' == '' ";
const PLATFORM_UNSET: &str = " '$(Platform)' == '' ";

/// `DocumentationFile` value: empty unless `GenerateXmlDocFile` is set.
pub(crate) fn documentation_file(project: &Project, conf: &Configuration) -> String {
    if conf.options.flag("GenerateXmlDocFile") {
        path::to_backslash(&xml_doc_file(project, conf))
    } else {
        String::new()
    }
}

pub(crate) fn user_file_path(project_file: &Path) -> PathBuf {
    let mut name = project_file.as_os_str().to_os_string();
    name.push(".user");
    PathBuf::from(name)
}

impl VsTarget {
    pub fn new(version: VsVersion) -> Self {
        Self { version }
    }

    pub fn project_file(&self, project: &Project) -> Result<PathBuf> {
        let tool = self.version.tool(project)?;
        Ok(path::join_with_extension(&project.full_path, &project.name, tool.extension))
    }

    pub fn solution_file(&self, solution: &Solution) -> PathBuf {
        path::join_with_extension(&solution.full_path, &solution.name, "sln")
    }

    fn default_configuration(project: &Project) -> &str {
        project.configurations.first().map_or("Debug", |c| c.name.as_str())
    }

    // ─── Project file ────────────────────────────────────────────────────

    fn write_project(&self, solution: &Solution, project: &Project) -> Result<()> {
        let tool = self.version.tool(project)?;
        let project_file = path::join_with_extension(&project.full_path, &project.name, tool.extension);

        write_artifact(&project_file, |w| self.render_project(w, solution, project, tool))?;
        write_artifact(&user_file_path(&project_file), |w| self.render_user_file(w, project))
    }

    fn render_project(&self, w: &mut dyn Write, solution: &Solution, project: &Project, tool: &ToolInfo) -> io::Result<()> {
        let mut xml = self.version.xml_writer(w);

        let mut root = vec![("DefaultTargets", "Build"), ("xmlns", MSBUILD_NS)];
        if let Some(tv) = self.version.tools_version() {
            root.push(("ToolsVersion", tv));
        }
        xml.start("Project", &root)?;

        // ── Header ───────────────────────────────────────────────────────
        xml.element("PropertyGroup", &[], |xml| {
            xml.text("ProjectType", "Local")?
                .text("ProductVersion", self.version.product_version())?
                .text("SchemaVersion", "2.0")?
                .text("ProjectGuid", &braced_guid(&project.guid))?
                .text_with("Configuration", &[("Condition", CONFIGURATION_UNSET)], Self::default_configuration(project))?
                .text_with("Platform", &[("Condition", PLATFORM_UNSET)], "AnyCPU")?
                .text("ApplicationIcon", &project.app_icon)?
                .text("AssemblyName", &project.assembly_name)?;
            if let Some(conf) = project.configurations.iter().find(|c| !c.options.text("KeyFile").is_empty()) {
                xml.text("AssemblyOriginatorKeyFile", conf.options.text("KeyFile"))?
                    .text("SignAssembly", "true")?;
            }
            if self.version == VsVersion::Vs2008 {
                xml.text("TargetFrameworkVersion", &project.framework_version.dotted())?;
            }
            xml.text("OutputType", project.project_type.as_str())?
                .text("AppDesignerFolder", &project.designer_folder)?
                .text("RootNamespace", &project.root_namespace)?
                .text("StartupObject", &project.startup_object)?;
            Ok(())
        })?;

        // ── Configurations ───────────────────────────────────────────────
        for conf in &project.configurations {
            let opts = &conf.options;
            xml.element("PropertyGroup", &[("Condition", condition(conf).as_str())], |xml| {
                for (property, option) in CONFIG_PROPERTIES {
                    if let Some(value) = opts.get(option) {
                        xml.text(property, &value.to_string())?;
                    }
                }
                xml.text("DocumentationFile", &documentation_file(project, conf))?
                    .text("OutputPath", &path::end_path(&path::to_backslash(opts.text("OutputPath")), '\\'))?;
                Ok(())
            })?;
        }

        // ── References ───────────────────────────────────────────────────
        let resolved: Vec<_> = project
            .references
            .iter()
            .map(|r| (r, resolve_reference(solution, project, r)))
            .collect();

        xml.element("ItemGroup", &[], |xml| {
            for (reference, target) in &resolved {
                let include = match &reference.version {
                    Some(version) => format!("{}, Version={version}", reference.name),
                    None => reference.name.clone(),
                };
                let item = match target {
                    ResolvedReference::Project(_) => continue,
                    ResolvedReference::Assembly(dll) => Item::new("Reference", include)
                        .meta("Name", reference.name.clone())
                        .meta("HintPath", path::to_backslash(&path::relativize_paths(&project.full_path, dll)))
                        .meta("Private", reference.local_copy.to_string()),
                    ResolvedReference::Named(name) => Item::new("Reference", include).meta("Name", *name),
                };
                item.write(xml)?;
            }
            Ok(())
        })?;

        xml.element("ItemGroup", &[], |xml| {
            for (_, target) in &resolved {
                let ResolvedReference::Project(dep) = target else {
                    continue;
                };
                let dep_tool = tool_for(&dep.language).unwrap_or(tool);
                Item::new(
                    "ProjectReference",
                    path::to_backslash(&relative_artifact(&project.full_path, &dep.full_path, &dep.name, dep_tool.extension)),
                )
                .meta("Name", dep.name.clone())
                .meta("Project", braced_guid(&dep.guid))
                .meta("Package", dep_tool.guid)
                .write(xml)?;
            }
            Ok(())
        })?;

        // ── Files ────────────────────────────────────────────────────────
        xml.element("ItemGroup", &[], |xml| {
            for item in file_items(project) {
                item.write(xml)?;
            }
            Ok(())
        })?;

        xml.empty("Import", &[("Project", tool.import)])?;
        xml.element("PropertyGroup", &[], |xml| {
            xml.text("PreBuildEvent", "")?.text("PostBuildEvent", "")?;
            Ok(())
        })?;
        xml.end("Project")?;
        xml.finish()
    }

    fn render_user_file(&self, w: &mut dyn Write, project: &Project) -> io::Result<()> {
        let mut xml = self.version.xml_writer(w);
        let reference_path = project
            .reference_paths
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(";");

        xml.start("Project", &[("xmlns", MSBUILD_NS)])?;
        xml.element("PropertyGroup", &[], |xml| {
            xml.text_with("Configuration", &[("Condition", CONFIGURATION_UNSET)], Self::default_configuration(project))?
                .text_with("Platform", &[("Condition", PLATFORM_UNSET)], "AnyCPU")?
                .text("ReferencePath", &reference_path)?
                .text("LastOpenVersion", self.version.product_version())?
                .text("ProjectView", "ProjectFiles")?
                .text("ProjectTrust", "0")?;
            Ok(())
        })?;
        for conf in &project.configurations {
            xml.empty("PropertyGroup", &[("Condition", condition(conf).as_str())])?;
        }
        xml.end("Project")?;
        xml.finish()
    }

    // ─── Solution file ───────────────────────────────────────────────────

    /// Render the `.sln` into memory, so an unknown language fails before
    /// anything is written.
    fn render_solution(&self, solution: &Solution) -> Result<Vec<u8>> {
        let mut entries = Vec::new();
        for project in solution.projects() {
            entries.push((project, self.version.tool(project)?));
        }

        let mut out = Vec::new();
        self.write_solution(&mut out, solution, &entries)
            .map_err(|e| ProjgenError::io(self.solution_file(solution), e))?;
        Ok(out)
    }

    fn write_solution(
        &self,
        w: &mut dyn Write,
        solution: &Solution,
        entries: &[(&Project, &'static ToolInfo)],
    ) -> io::Result<()> {
        writeln!(w, "Microsoft Visual Studio Solution File, Format Version {}", self.version.solution_format())?;
        writeln!(w, "# {}", self.version.display_name())?;

        for (project, tool) in entries {
            writeln!(
                w,
                "Project(\"{}\") = \"{}\", \"{}\", \"{}\"",
                tool.guid,
                project.name,
                path::to_backslash(&relative_artifact(&solution.full_path, &project.full_path, &project.name, tool.extension)),
                braced_guid(&project.guid)
            )?;
            let deps: Vec<_> = project_dependencies(solution, project).collect();
            if !deps.is_empty() {
                writeln!(w, "\tProjectSection(ProjectDependencies) = postProject")?;
                for dep in deps {
                    let id = braced_guid(&dep.guid);
                    writeln!(w, "\t\t{id} = {id}")?;
                }
                writeln!(w, "\tEndProjectSection")?;
            }
            writeln!(w, "EndProject")?;
        }

        if !solution.files.is_empty() {
            writeln!(
                w,
                "Project(\"{SOLUTION_FOLDER_GUID}\") = \"Solution Items\", \"Solution Items\", \"{}\"",
                braced_guid(&solution.items_guid)
            )?;
            writeln!(w, "\tProjectSection(SolutionItems) = preProject")?;
            for file in solution.files.iter() {
                let item = path::to_backslash(&file.path);
                writeln!(w, "\t\t{item} = {item}")?;
            }
            writeln!(w, "\tEndProjectSection")?;
            writeln!(w, "EndProject")?;
        }

        writeln!(w, "Global")?;
        writeln!(w, "\tGlobalSection(SolutionConfigurationPlatforms) = preSolution")?;
        for conf in &solution.configurations {
            writeln!(w, "\t\t{0}|Any CPU = {0}|Any CPU", conf.name)?;
        }
        writeln!(w, "\tEndGlobalSection")?;

        writeln!(w, "\tGlobalSection(ProjectConfigurationPlatforms) = postSolution")?;
        for (project, _) in entries {
            let id = braced_guid(&project.guid);
            for conf in &solution.configurations {
                writeln!(w, "\t\t{id}.{0}|Any CPU.ActiveCfg = {0}|Any CPU", conf.name)?;
                writeln!(w, "\t\t{id}.{0}|Any CPU.Build.0 = {0}|Any CPU", conf.name)?;
            }
        }
        writeln!(w, "\tEndGlobalSection")?;

        writeln!(w, "\tGlobalSection(SolutionProperties) = preSolution")?;
        writeln!(w, "\t\tHideSolutionNode = FALSE")?;
        writeln!(w, "\tEndGlobalSection")?;
        writeln!(w, "EndGlobal")
    }

    fn clean_project(&self, project: &Project) -> Result<()> {
        tracing::info!("...Cleaning project: {}", project.name);
        match self.project_file(project) {
            Ok(project_file) => {
                delete_if_exists(&project_file)?;
                delete_if_exists(&user_file_path(&project_file))?;
            }
            Err(e) => tracing::warn!("{e}"),
        }
        Ok(())
    }
}

/// Manifest items for every file of `project`.
///
/// Designer resources expand into a resx/generated-code pair, settings files
/// get their generator metadata and forms pull in their resx. Files that
/// are emitted as part of such a pair are not repeated on their own.
fn file_items(project: &Project) -> Vec<Item> {
    let mut paired: HashSet<String> = HashSet::new();
    for file in project.files.iter() {
        match file.sub_type {
            SubType::Designer => {
                paired.insert(format!("{}.Designer.cs", file.stem_path()));
            }
            SubType::Form | SubType::UserControl | SubType::Component => {
                paired.insert(format!("{}.resx", file.stem_path()));
            }
            _ => {}
        }
    }

    let mut items = Vec::new();
    for file in project.files.iter() {
        match file.sub_type {
            SubType::Designer => {
                let resx = format!("{}.resx", file.stem_path());
                let generated = format!("{}.Designer.cs", file.stem_path());
                items.push(
                    Item::new("EmbeddedResource", path::to_backslash(&resx))
                        .meta("SubType", "Designer")
                        .meta("Generator", "ResXFileCodeGenerator")
                        .meta("LastGenOutput", file_name(&generated)),
                );
                items.push(
                    Item::new("Compile", path::to_backslash(&generated))
                        .meta("AutoGen", "True")
                        .meta("DesignTime", "True")
                        .meta("DependentUpon", file_name(&resx)),
                );
                continue;
            }
            SubType::Settings => {
                items.push(settings_item(file));
                continue;
            }
            SubType::Form | SubType::UserControl | SubType::Component => {
                items.push(
                    Item::new("EmbeddedResource", path::to_backslash(&format!("{}.resx", file.stem_path())))
                        .meta("DependentUpon", file.file_name())
                        .meta("SubType", "Designer"),
                );
            }
            SubType::Code | SubType::CodeBehind => {}
        }

        if paired.contains(&file.path) {
            continue;
        }
        items.push(plain_item(file));
    }
    items
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn settings_item(file: &FileEntry) -> Item {
    let item = Item::new(file.build_action.as_str(), path::to_backslash(&file.path));
    let name = file.file_name();
    let stem = name.rsplit_once('.').map_or(name, |(s, _)| s);
    if file.build_action == BuildAction::None {
        item.meta("Generator", "SettingsSingleFileGenerator")
            .meta("LastGenOutput", format!("{stem}.Designer.cs"))
    } else {
        // Settings.Designer.cs depends on Settings.settings.
        let base = stem.rsplit_once('.').map_or(stem, |(s, _)| s);
        item.meta("SubType", "Code")
            .meta("AutoGen", "True")
            .meta("DesignTimeSharedInput", "True")
            .meta("DependentUpon", format!("{base}.settings"))
    }
}

fn plain_item(file: &FileEntry) -> Item {
    let mut item = Item::new(file.build_action.as_str(), path::to_backslash(&file.path));
    let name = file.file_name();

    if let Some(owner) = name.strip_suffix(".Designer.cs") {
        item = item.meta("DependentUpon", format!("{owner}.cs"));
    }
    if let Some(alias) = file.link_alias() {
        item = item.meta("Link", path::to_backslash(&alias));
    } else if !matches!(file.build_action, BuildAction::None | BuildAction::EmbeddedResource)
        && file.sub_type != SubType::Code
    {
        item = item.meta("SubType", file.sub_type.as_str());
    }
    if file.copy_to_output != CopyToOutput::Never {
        item = item.meta("CopyToOutputDirectory", file.copy_to_output.as_str());
    }
    item
}

impl Target for VsTarget {
    fn name(&self) -> &'static str {
        self.version.target_name()
    }

    fn write(&self, solution: &Solution) -> Result<()> {
        tracing::info!("Creating {} solution and project files", self.version.display_name());

        for project in solution.projects() {
            tracing::info!("...Creating project: {}", project.name);
            self.write_project(solution, project)?;
        }

        let solution_file = self.solution_file(solution);
        let contents = self.render_solution(solution)?;
        write_artifact(&solution_file, |w| w.write_all(&contents))
    }

    fn clean(&self, solution: &Solution) -> Result<()> {
        tracing::info!("Cleaning {} solution and project files", self.version.display_name());

        delete_if_exists(&self.solution_file(solution))?;
        delete_if_exists(&path::join_with_extension(&solution.full_path, &solution.name, "suo"))?;
        for project in solution.projects() {
            self.clean_project(project)?;
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════
