//! File manifests: `<File>`, `<Match>` and the ordered [`FileSet`] they fill.

use std::collections::HashMap;
use std::path::Path;

use regex::Regex;
use walkdir::WalkDir;

use crate::error::{NodeError, NodeResult};
use crate::glob::{Glob, parse_glob};
use crate::options::parse_bool;
use crate::path;

// ═══════════════════════════════════════════════════════════════════════════════
//  Classifications
// ═══════════════════════════════════════════════════════════════════════════════

/// Declare a closed, case-insensitively parsed enum whose `Display` is the
/// variant name as written in build files.
macro_rules! named_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),*
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),*];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => stringify!($variant)),*
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                let s = s.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(s))
                    .ok_or_else(|| format!("unknown {} '{s}'", stringify!($name)))
            }
        }
    };
}

named_enum! {
    /// How a file participates in the build.
    BuildAction { Compile, EmbeddedResource, Content, None }
}

named_enum! {
    /// Designer classification; drives paired entries in IDE manifests.
    SubType { Code, Component, Designer, Form, Settings, UserControl, CodeBehind }
}

named_enum! {
    CopyToOutput { Never, Always, PreserveNewest }
}

pub(crate) use named_enum;

// ═══════════════════════════════════════════════════════════════════════════════
//  FileEntry
// ═══════════════════════════════════════════════════════════════════════════════

/// One file of a manifest. `path` is relative to the owning project (or
/// solution) directory and uses `/` separators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: String,
    pub build_action: BuildAction,
    pub sub_type: SubType,
    pub copy_to_output: CopyToOutput,
    pub link: bool,
    pub link_path: Option<String>,
    pub preserve_path: bool,
}

impl FileEntry {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            build_action: BuildAction::Compile,
            sub_type: SubType::Code,
            copy_to_output: CopyToOutput::Never,
            link: false,
            link_path: None,
            preserve_path: false,
        }
    }

    /// Last path segment.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// Path without its final extension.
    pub fn stem_path(&self) -> &str {
        match self.path.rfind('.') {
            Some(dot) if dot > self.path.rfind('/').map_or(0, |s| s + 1) => &self.path[..dot],
            _ => &self.path,
        }
    }

    /// Display path for a linked file: `linkPath` followed by the file name,
    /// or by the whole relative path when `preservePath` is set.
    pub fn link_alias(&self) -> Option<String> {
        if !self.link {
            return None;
        }
        let tail = if self.preserve_path {
            self.path.trim_start_matches(['.', '/'])
        } else {
            self.file_name()
        };
        let prefix = self.link_path.as_deref().map(|p| path::end_path(&path::normalize(p, '/'), '/'));
        Some(format!("{}{tail}", prefix.unwrap_or_default()))
    }

    /// Read the per-file attributes shared by `<File>` and `<Match>`.
    fn apply_attributes(&mut self, node: &roxmltree::Node) -> NodeResult<()> {
        if let Some(v) = node.attribute("buildAction") {
            self.build_action = v.parse().map_err(NodeError::Warning)?;
        }
        if let Some(v) = node.attribute("subType") {
            self.sub_type = v.parse().map_err(NodeError::Warning)?;
        }
        if let Some(v) = node.attribute("copyToOutput") {
            self.copy_to_output = v.parse().map_err(NodeError::Warning)?;
        }
        if let Some(v) = node.attribute("link") {
            self.link = parse_bool(v);
        }
        if let Some(v) = node.attribute("linkPath") {
            self.link_path = Some(v.to_string());
        }
        if let Some(v) = node.attribute("preservePath") {
            self.preserve_path = parse_bool(v);
        }
        Ok(())
    }

    /// Parse `<File>`: the element text is the path, relative to `base`.
    /// A missing file is a warning and contributes nothing.
    pub fn parse(node: roxmltree::Node, base: &Path) -> NodeResult<Self> {
        let raw = node.text().unwrap_or("").trim();
        if raw.is_empty() {
            return Err(NodeError::warning("File element has no path"));
        }

        let rel = path::normalize(raw, '/');
        if !base.join(&rel).is_file() {
            return Err(NodeError::warning(format!("File does not exist: {rel}")));
        }

        let mut entry = Self::new(rel);
        entry.apply_attributes(&node)?;
        Ok(entry)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Match expansion
// ═══════════════════════════════════════════════════════════════════════════════

enum Matcher {
    Glob(Glob),
    Regex(Regex),
}

impl Matcher {
    fn compile(pattern: &str, use_regex: bool) -> NodeResult<Self> {
        if use_regex {
            Regex::new(pattern)
                .map(Self::Regex)
                .map_err(|e| NodeError::warning(format!("Could not compile regex pattern: {e}")))
        } else {
            parse_glob(pattern).map(Self::Glob).map_err(NodeError::Warning)
        }
    }

    /// Globs look at the file name; regexes at the path relative to the
    /// match directory.
    fn is_match(&self, file_name: &str, rel_path: &str) -> bool {
        match self {
            Self::Glob(g) => g.is_match(file_name),
            Self::Regex(r) => r.is_match(rel_path),
        }
    }
}

/// Expand `<Match path=".." pattern=".." recurse=".." useRegex="..">` into
/// concrete entries relative to `base`, in directory-walk order sorted by
/// file name. `<Exclude pattern=".."/>` children remove matches.
///
/// An absent directory, a bad pattern or an empty result are warnings.
pub fn expand_match(node: roxmltree::Node, base: &Path) -> NodeResult<Vec<FileEntry>> {
    let dir_attr = node.attribute("path").filter(|p| !p.trim().is_empty()).unwrap_or(".");
    let pattern = node.attribute("pattern").unwrap_or("*");
    let recurse = node.attribute("recurse").is_some_and(parse_bool);
    let use_regex = node.attribute("useRegex").is_some_and(parse_bool);

    let mut template = FileEntry::new(String::new());
    template.apply_attributes(&node)?;

    let dir = path::clean(&base.join(path::normalize(dir_attr.trim(), std::path::MAIN_SEPARATOR)));
    if !dir.is_dir() {
        return Err(NodeError::warning(format!("Match path does not exist: {}", dir.display())));
    }

    let matcher = Matcher::compile(pattern, use_regex)?;
    let excludes = node
        .children()
        .filter(|n| n.is_element() && n.tag_name().name() == "Exclude")
        .filter_map(|n| n.attribute("pattern"))
        .map(|p| Matcher::compile(p, use_regex))
        .collect::<NodeResult<Vec<_>>>()?;

    let walker = WalkDir::new(&dir)
        .min_depth(1)
        .max_depth(if recurse { usize::MAX } else { 1 })
        .sort_by_file_name();

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                tracing::debug!("skipping unreadable entry under {}: {err}", dir.display());
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy();
        let within = path::relativize_paths(&dir, entry.path());
        if !matcher.is_match(&file_name, &within) {
            continue;
        }
        if excludes.iter().any(|x| x.is_match(&file_name, &within)) {
            continue;
        }

        let mut file = template.clone();
        file.path = path::relativize_paths(base, entry.path());
        files.push(file);
    }

    if files.is_empty() {
        return Err(NodeError::warning(format!(
            "Match returned no files: {}{pattern}",
            path::end_path(&path::to_forward(&dir), '/')
        )));
    }
    Ok(files)
}

// ═══════════════════════════════════════════════════════════════════════════════
//  FileSet
// ═══════════════════════════════════════════════════════════════════════════════

/// Ordered set of distinct files. Re-inserting a path keeps its original
/// position and replaces its classification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSet {
    order: Vec<String>,
    entries: HashMap<String, FileEntry>,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entry: FileEntry) {
        if !self.entries.contains_key(&entry.path) {
            self.order.push(entry.path.clone());
        }
        self.entries.insert(entry.path.clone(), entry);
    }

    pub fn extend(&mut self, entries: impl IntoIterator<Item = FileEntry>) {
        for entry in entries {
            self.insert(entry);
        }
    }

    /// Merge another set into this one, in its order.
    pub fn append(&mut self, other: FileSet) {
        let FileSet { order, mut entries } = other;
        for key in order {
            if let Some(entry) = entries.remove(&key) {
                self.insert(entry);
            }
        }
    }

    pub fn get(&self, path: &str) -> Option<&FileEntry> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &FileEntry> {
        self.order.iter().filter_map(|p| self.entries.get(p))
    }

    pub fn with_action(&self, action: BuildAction) -> impl Iterator<Item = &FileEntry> {
        self.iter().filter(move |f| f.build_action == action)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════
