//! Build the document model from a build description.
//!
//! [`ModelBuilder`] owns a [`NodeRegistry`] mapping element names to factory
//! functions. Every element is dispatched through [`ModelBuilder::parse_node`]:
//! unknown elements are skipped, warnings are logged and drop the element,
//! fatal errors propagate and end the run.
//!
//! Relative paths resolve against the base directory carried by the
//! [`ParseContext`]. Entering a solution or project yields a child context
//! for its directory that is dropped when the element is done, so the
//! process working directory is never changed.
//!
//! # Example
//! ```no_run
//! use projgen_rs::ModelBuilder;
//!
//! let solutions = ModelBuilder::new().parse_file("prebuild.xml").unwrap();
//! for solution in &solutions {
//!     println!("{}: {} projects", solution.name, solution.projects().len());
//! }
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{NodeError, NodeResult, PathResolutionError, ProjgenError, Result};
use crate::files::{FileEntry, FileSet, expand_match};
use crate::model::{Configuration, Project, Reference, Solution, parse_reference_path};
use crate::options::OptionSet;
use crate::path;

// ═══════════════════════════════════════════════════════════════════════════════
//  Nodes
// ═══════════════════════════════════════════════════════════════════════════════

/// Result of parsing one registered element.
#[derive(Debug)]
pub enum Node {
    Solution(Solution),
    Project(Project),
    Configuration(Configuration),
    Options(OptionSet),
    Reference(Reference),
    ReferencePath(PathBuf),
    Files(FileSet),
    File(FileEntry),
    Match(Vec<FileEntry>),
    /// Absolute path of a build description to include.
    Process(PathBuf),
}

pub type NodeFactory = fn(&ModelBuilder, roxmltree::Node, &ParseContext) -> NodeResult<Node>;

// ═══════════════════════════════════════════════════════════════════════════════
//  Registry
// ═══════════════════════════════════════════════════════════════════════════════

/// Element name → factory table.
#[derive(Debug, Clone)]
pub struct NodeRegistry {
    factories: HashMap<&'static str, NodeFactory>,
}

impl Default for NodeRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("Solution", |b, n, ctx| Solution::parse(b, n, ctx).map(Node::Solution));
        registry.register("Project", |b, n, ctx| Project::parse(b, n, ctx).map(Node::Project));
        registry.register("Configuration", |b, n, ctx| Configuration::parse(b, n, ctx).map(Node::Configuration));
        registry.register("Options", |_, n, _| Ok(Node::Options(OptionSet::parse(n))));
        registry.register("Reference", |_, n, _| Reference::parse(n).map(Node::Reference));
        registry.register("ReferencePath", |_, n, ctx| parse_reference_path(n, ctx).map(Node::ReferencePath));
        registry.register("Files", |b, n, ctx| parse_files(b, n, ctx).map(Node::Files));
        registry.register("File", |_, n, ctx| FileEntry::parse(n, ctx.base_dir()).map(Node::File));
        registry.register("Match", |_, n, ctx| expand_match(n, ctx.base_dir()).map(Node::Match));
        registry.register("Process", |_, n, ctx| parse_process(n, ctx).map(Node::Process));
        registry
    }
}

impl NodeRegistry {
    pub fn empty() -> Self {
        Self { factories: HashMap::new() }
    }

    /// Register `factory` for `tag`, replacing any previous entry.
    pub fn register(&mut self, tag: &'static str, factory: NodeFactory) {
        self.factories.insert(tag, factory);
    }

    pub fn get(&self, tag: &str) -> Option<NodeFactory> {
        self.factories.get(tag).copied()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.factories.contains_key(tag)
    }
}

fn parse_files(builder: &ModelBuilder, node: roxmltree::Node, ctx: &ParseContext) -> NodeResult<FileSet> {
    let mut files = FileSet::new();
    for child in node.children().filter(|n| n.is_element()) {
        match builder.parse_node(child, ctx)? {
            Some(Node::File(entry)) => files.insert(entry),
            Some(Node::Match(entries)) => files.extend(entries),
            _ => {}
        }
    }
    Ok(files)
}

fn parse_process(node: roxmltree::Node, ctx: &ParseContext) -> NodeResult<PathBuf> {
    let raw = node.text().unwrap_or("").trim();
    let target = path::clean(&ctx.base_dir().join(path::normalize(raw, std::path::MAIN_SEPARATOR)));
    if raw.is_empty() || !target.is_file() {
        return Err(NodeError::Fatal(ProjgenError::MissingInclude(target)));
    }
    Ok(target)
}

// ═══════════════════════════════════════════════════════════════════════════════
//  ParseContext
// ═══════════════════════════════════════════════════════════════════════════════

/// Base directory for relative paths plus the enclosing solution's options
/// and configurations.
#[derive(Debug, Clone)]
pub struct ParseContext<'a> {
    base_dir: PathBuf,
    root_options: Option<&'a OptionSet>,
    configurations: &'a [Configuration],
}

impl ParseContext<'static> {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into(), root_options: None, configurations: &[] }
    }
}

impl<'a> ParseContext<'a> {
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Child context rooted at `dir`.
    pub fn enter(&self, dir: &Path) -> ParseContext<'a> {
        ParseContext { base_dir: dir.to_path_buf(), ..self.clone() }
    }

    /// Child context that sees a solution's options and configurations.
    pub fn with_solution<'b>(&self, options: &'b OptionSet, configurations: &'b [Configuration]) -> ParseContext<'b> {
        ParseContext {
            base_dir: self.base_dir.clone(),
            root_options: Some(options),
            configurations,
        }
    }

    pub fn root_options(&self) -> Option<&'a OptionSet> {
        self.root_options
    }

    pub fn configurations(&self) -> &'a [Configuration] {
        self.configurations
    }

    pub fn resolve(&self, raw: &str) -> std::result::Result<PathBuf, PathResolutionError> {
        path::resolve_absolute(&self.base_dir, raw)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  ModelBuilder
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default)]
pub struct ModelBuilder {
    registry: NodeRegistry,
}

impl ModelBuilder {
    /// Builder with every built-in element registered.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(registry: NodeRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    /// Parse one element through the registry.
    ///
    /// `Ok(None)` when the element is unknown or was dropped with a warning.
    pub fn parse_node(&self, node: roxmltree::Node, ctx: &ParseContext) -> Result<Option<Node>> {
        let tag = node.tag_name().name();
        let Some(factory) = self.registry.get(tag) else {
            tracing::debug!("skipping unknown element <{tag}>");
            return Ok(None);
        };

        match factory(self, node, ctx) {
            Ok(parsed) => Ok(Some(parsed)),
            Err(NodeError::Warning(message)) => {
                tracing::warn!("{message}");
                Ok(None)
            }
            Err(NodeError::Fatal(error)) => Err(error),
        }
    }

    /// Parse a build description from disk, following `<Process>` includes.
    pub fn parse_file(&self, file: impl AsRef<Path>) -> Result<Vec<Solution>> {
        let file = file.as_ref();
        let absolute = if file.is_absolute() {
            file.to_path_buf()
        } else {
            let cwd = std::env::current_dir().map_err(|e| ProjgenError::io(file, e))?;
            cwd.join(file)
        };
        self.parse_included(&path::clean(&absolute), &mut Vec::new())
    }

    /// Parse a build description held in memory. Relative paths resolve
    /// against `base_dir`.
    pub fn parse_str(&self, source: &str, base_dir: impl AsRef<Path>) -> Result<Vec<Solution>> {
        let base_dir = base_dir.as_ref();
        self.parse_source(source, base_dir, base_dir, &mut Vec::new())
    }

    fn parse_included(&self, file: &Path, stack: &mut Vec<PathBuf>) -> Result<Vec<Solution>> {
        if stack.iter().any(|p| p == file) {
            return Err(ProjgenError::IncludeCycle(file.to_path_buf()));
        }

        let source = std::fs::read_to_string(file).map_err(|e| ProjgenError::io(file, e))?;
        let base_dir = file.parent().unwrap_or_else(|| Path::new("."));

        tracing::debug!("processing {}", file.display());
        stack.push(file.to_path_buf());
        let result = self.parse_source(&source, file, base_dir, stack);
        stack.pop();
        result
    }

    fn parse_source(
        &self,
        source: &str,
        origin: &Path,
        base_dir: &Path,
        stack: &mut Vec<PathBuf>,
    ) -> Result<Vec<Solution>> {
        let doc = roxmltree::Document::parse(source)
            .map_err(|e| ProjgenError::Xml { path: origin.to_path_buf(), source: e })?;
        let ctx = ParseContext::new(base_dir);
        let root = doc.root_element();

        // A bare <Solution> document is accepted as well as a wrapper element.
        let elements: Vec<roxmltree::Node> = if root.tag_name().name() == "Solution" {
            vec![root]
        } else {
            root.children().filter(|n| n.is_element()).collect()
        };

        let mut solutions = Vec::new();
        for element in elements {
            match self.parse_node(element, &ctx)? {
                Some(Node::Solution(solution)) => solutions.push(solution),
                Some(Node::Process(include)) => solutions.extend(self.parse_included(&include, stack)?),
                _ => {}
            }
        }
        Ok(solutions)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════
