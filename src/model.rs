//! The document model: solutions, projects, configurations and references.
//!
//! Every node type here is built by a `parse` function that receives the
//! [`ModelBuilder`] (to dispatch child elements through the tag registry)
//! and a [`ParseContext`] (current base directory plus the enclosing
//! solution's options and configurations).

use std::collections::HashMap;
use std::path::PathBuf;

use uuid::Uuid;

use crate::builder::{ModelBuilder, Node, ParseContext};
use crate::error::{NodeError, NodeResult};
use crate::files::{FileSet, named_enum};
use crate::options::{OptionSet, parse_bool};

// ═══════════════════════════════════════════════════════════════════════════════
//  Enumerations
// ═══════════════════════════════════════════════════════════════════════════════

named_enum! {
    /// Output kind of a project.
    ProjectType { Exe, WinExe, Library }
}

named_enum! {
    /// Runtime a project is built for.
    ClrRuntime { Microsoft, Mono }
}

named_enum! {
    /// Target framework, written `v3_5` in build descriptions and `v3.5` in
    /// generated files.
    #[allow(non_camel_case_types)]
    FrameworkVersion { v2_0, v3_0, v3_5 }
}

impl FrameworkVersion {
    pub fn dotted(self) -> String {
        self.as_str().replace('_', ".")
    }
}

/// Parse an optional enum attribute; an unknown value is a warning.
fn enum_attribute<T>(node: &roxmltree::Node, name: &str, default: T) -> NodeResult<T>
where
    T: std::str::FromStr<Err = String>,
{
    match node.attribute(name) {
        Some(raw) => raw.parse().map_err(NodeError::Warning),
        None => Ok(default),
    }
}

fn string_attribute(node: &roxmltree::Node, name: &str) -> Option<String> {
    node.attribute(name).map(str::trim).filter(|v| !v.is_empty()).map(String::from)
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Configuration
// ═══════════════════════════════════════════════════════════════════════════════

/// A named build variant and its options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    pub name: String,
    pub options: OptionSet,
}

impl Configuration {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), options: OptionSet::new() }
    }

    /// `all` is a merge directive, not a real variant.
    pub fn is_all(&self) -> bool {
        self.name.eq_ignore_ascii_case("all")
    }

    pub fn parse(builder: &ModelBuilder, node: roxmltree::Node, ctx: &ParseContext) -> NodeResult<Self> {
        let mut conf = Self::new(node.attribute("name").unwrap_or("unknown"));
        for child in node.children().filter(|n| n.is_element()) {
            if let Some(Node::Options(options)) = builder.parse_node(child, ctx)? {
                options.copy_into(&mut conf.options);
            }
        }
        Ok(conf)
    }
}

/// Resolve the configurations of one scope.
///
/// Starts from deep copies of `inherited`. Each declared name not yet present
/// is added, seeded from `root`. Every `all` declaration is then broadcast
/// into every configuration, after which each named declaration is applied
/// on top, so an explicit same-name value beats the broadcast. `all` never
/// appears in the result.
pub fn merge_configurations(
    inherited: &[Configuration],
    root: &OptionSet,
    declared: Vec<Configuration>,
) -> Vec<Configuration> {
    let mut merged = inherited.to_vec();
    let (broadcast, named): (Vec<_>, Vec<_>) = declared.into_iter().partition(Configuration::is_all);

    for conf in &named {
        if !merged.iter().any(|m| m.name == conf.name) {
            let mut seeded = Configuration::new(conf.name.clone());
            root.copy_into(&mut seeded.options);
            merged.push(seeded);
        }
    }

    for all in &broadcast {
        for target in &mut merged {
            all.options.copy_into(&mut target.options);
        }
    }

    for conf in &named {
        if let Some(target) = merged.iter_mut().find(|m| m.name == conf.name) {
            conf.options.copy_into(&mut target.options);
        }
    }

    merged
}

// ═══════════════════════════════════════════════════════════════════════════════
//  References
// ═══════════════════════════════════════════════════════════════════════════════

/// A dependency on another project of the solution or on an external assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub name: String,
    pub path: Option<String>,
    pub local_copy: bool,
    pub version: Option<String>,
}

impl Reference {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), path: None, local_copy: false, version: None }
    }

    pub fn parse(node: roxmltree::Node) -> NodeResult<Self> {
        let name = string_attribute(&node, "name")
            .ok_or_else(|| NodeError::warning("Reference element has no name"))?;
        Ok(Self {
            name,
            path: string_attribute(&node, "path"),
            local_copy: node.attribute("localCopy").is_some_and(parse_bool),
            version: string_attribute(&node, "version"),
        })
    }
}

/// Parse `<ReferencePath>`: the text is a directory searched for external
/// assemblies. An unresolvable directory is a warning.
pub fn parse_reference_path(node: roxmltree::Node, ctx: &ParseContext) -> NodeResult<PathBuf> {
    let raw = node.text().unwrap_or("").trim();
    ctx.resolve(raw)
        .map_err(|e| NodeError::warning(format!("Could not resolve reference path: {raw} ({e})")))
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Project
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct Project {
    pub name: String,
    /// `path` attribute as written.
    pub path: String,
    /// Absolute directory of the project.
    pub full_path: PathBuf,
    pub assembly_name: String,
    pub root_namespace: String,
    pub language: String,
    pub project_type: ProjectType,
    pub runtime: ClrRuntime,
    pub startup_object: String,
    pub app_icon: String,
    pub designer_folder: String,
    pub framework_version: FrameworkVersion,
    /// Assigned once at parse time; other projects link to this one by it.
    pub guid: Uuid,
    pub configurations: Vec<Configuration>,
    pub references: Vec<Reference>,
    pub reference_paths: Vec<PathBuf>,
    pub files: FileSet,
}

impl Project {
    pub fn parse(builder: &ModelBuilder, node: roxmltree::Node, ctx: &ParseContext) -> NodeResult<Self> {
        let name = string_attribute(&node, "name")
            .ok_or_else(|| NodeError::warning("Project element has no name"))?;
        let path = node.attribute("path").unwrap_or("").to_string();

        // Nothing inside the project can be located without its directory.
        let full_path = ctx.resolve(&path).map_err(|e| {
            NodeError::fatal(format!("Could not resolve project path '{path}' of {name}: {e}"))
        })?;
        let inner = ctx.enter(&full_path);

        let guid = match node.attribute("guid") {
            Some(raw) => Uuid::parse_str(raw.trim().trim_matches(['{', '}']))
                .map_err(|e| NodeError::warning(format!("Invalid guid '{raw}' on project {name}: {e}")))?,
            None => Uuid::new_v4(),
        };

        let mut project = Self {
            assembly_name: string_attribute(&node, "assemblyName").unwrap_or_else(|| name.clone()),
            root_namespace: string_attribute(&node, "rootNamespace").unwrap_or_else(|| name.clone()),
            language: string_attribute(&node, "language").unwrap_or_else(|| "C#".to_string()),
            project_type: enum_attribute(&node, "type", ProjectType::Exe)?,
            runtime: enum_attribute(&node, "runtime", ClrRuntime::Microsoft)?,
            startup_object: string_attribute(&node, "startupObject").unwrap_or_default(),
            app_icon: string_attribute(&node, "icon").unwrap_or_default(),
            designer_folder: string_attribute(&node, "designerFolder").unwrap_or_default(),
            framework_version: enum_attribute(&node, "frameworkVersion", FrameworkVersion::v2_0)?,
            guid,
            configurations: Vec::new(),
            references: Vec::new(),
            reference_paths: Vec::new(),
            files: FileSet::new(),
            name,
            path,
            full_path,
        };

        let mut declared = Vec::new();
        for child in node.children().filter(|n| n.is_element()) {
            match builder.parse_node(child, &inner)? {
                Some(Node::Configuration(conf)) => declared.push(conf),
                Some(Node::Reference(reference)) => project.references.push(reference),
                Some(Node::ReferencePath(dir)) => project.reference_paths.push(dir),
                Some(Node::Files(files)) => project.files.append(files),
                _ => {}
            }
        }

        let fallback = OptionSet::new();
        let root = ctx.root_options().unwrap_or(&fallback);
        project.configurations = merge_configurations(ctx.configurations(), root, declared);

        Ok(project)
    }

    pub fn configuration(&self, name: &str) -> Option<&Configuration> {
        self.configurations.iter().find(|c| c.name == name)
    }

    /// File name of the built assembly.
    pub fn output_file_name(&self) -> String {
        let ext = match self.project_type {
            ProjectType::Library => "dll",
            ProjectType::Exe | ProjectType::WinExe => "exe",
        };
        format!("{}.{ext}", self.assembly_name)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Solution
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct Solution {
    pub name: String,
    pub path: String,
    pub full_path: PathBuf,
    /// Root defaults for every configuration in the solution.
    pub options: OptionSet,
    pub configurations: Vec<Configuration>,
    /// Loose files shown as "Solution Items".
    pub files: FileSet,
    /// Id of the "Solution Items" folder.
    pub items_guid: Uuid,
    projects: Vec<Project>,
    index: HashMap<String, usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Active,
    Done,
}

impl Solution {
    pub fn parse(builder: &ModelBuilder, node: roxmltree::Node, ctx: &ParseContext) -> NodeResult<Self> {
        let name = string_attribute(&node, "name")
            .ok_or_else(|| NodeError::warning("Solution element has no name"))?;
        let path = node.attribute("path").unwrap_or("").to_string();
        let full_path = ctx.resolve(&path).map_err(|e| {
            NodeError::fatal(format!("Could not resolve solution path '{path}' of {name}: {e}"))
        })?;
        let inner = ctx.enter(&full_path);

        // Options and configurations first, so projects see them wherever
        // they appear in the element.
        let mut options = OptionSet::new();
        let mut declared = Vec::new();
        let mut files = FileSet::new();
        for child in node.children().filter(|n| n.is_element() && n.tag_name().name() != "Project") {
            match builder.parse_node(child, &inner)? {
                Some(Node::Options(parsed)) => parsed.copy_into(&mut options),
                Some(Node::Configuration(conf)) => declared.push(conf),
                Some(Node::Files(parsed)) => files.append(parsed),
                _ => {}
            }
        }
        let configurations = merge_configurations(&[], &options, declared);

        let mut solution = Self {
            name,
            path,
            full_path,
            options,
            configurations,
            files,
            items_guid: Uuid::new_v4(),
            projects: Vec::new(),
            index: HashMap::new(),
        };

        let scoped = inner.with_solution(&solution.options, &solution.configurations);
        let mut projects = Vec::new();
        for child in node.children().filter(|n| n.is_element() && n.tag_name().name() == "Project") {
            if let Some(Node::Project(project)) = builder.parse_node(child, &scoped)? {
                projects.push(project);
            }
        }
        for project in projects {
            solution.add_project(project);
        }

        Ok(solution)
    }

    /// Add a project; a duplicate name replaces the earlier project in place.
    pub fn add_project(&mut self, project: Project) {
        match self.index.get(&project.name) {
            Some(&i) => {
                tracing::warn!("Duplicate project name in solution {}: {}", self.name, project.name);
                self.projects[i] = project;
            }
            None => {
                self.index.insert(project.name.clone(), self.projects.len());
                self.projects.push(project);
            }
        }
    }

    /// Projects in declaration order.
    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn project(&self, name: &str) -> Option<&Project> {
        self.index.get(name).map(|&i| &self.projects[i])
    }

    pub fn contains_project(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Projects ordered so that every in-solution dependency precedes its
    /// dependents; otherwise declaration order. Cycles are reported and the
    /// closing edge ignored.
    pub fn build_order(&self) -> Vec<&Project> {
        let mut marks = vec![Mark::Unvisited; self.projects.len()];
        let mut order = Vec::with_capacity(self.projects.len());
        for i in 0..self.projects.len() {
            self.visit(i, &mut marks, &mut order);
        }
        order.into_iter().map(|i| &self.projects[i]).collect()
    }

    fn visit(&self, i: usize, marks: &mut [Mark], order: &mut Vec<usize>) {
        match marks[i] {
            Mark::Done => return,
            Mark::Active => {
                tracing::warn!("Circular project reference involving {}", self.projects[i].name);
                return;
            }
            Mark::Unvisited => {}
        }
        marks[i] = Mark::Active;
        for reference in &self.projects[i].references {
            if let Some(&dep) = self.index.get(&reference.name) {
                self.visit(dep, marks, order);
            }
        }
        marks[i] = Mark::Done;
        order.push(i);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════
