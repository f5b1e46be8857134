//! Target emitters and their registry.
//!
//! A [`Target`] renders a [`Solution`] into one toolchain's build files and
//! knows how to delete them again. [`TargetRegistry`] maps the lowercase
//! target name to an emitter and dispatches generate/clean runs to it.

pub mod autotools;
pub mod debug;
pub mod monodevelop;
pub mod nant;
pub mod vs;
pub mod vs2003;
pub mod xml;

use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{ProjgenError, Result};
use crate::model::{Configuration, Project, Reference, Solution};
use crate::path;

pub use autotools::AutotoolsTarget;
pub use debug::DebugTarget;
pub use monodevelop::MonoDevelopTarget;
pub use nant::NAntTarget;
pub use vs::{VsTarget, VsVersion};
pub use vs2003::Vs2003Target;

// ═══════════════════════════════════════════════════════════════════════════════
//  Contract
// ═══════════════════════════════════════════════════════════════════════════════

pub trait Target {
    /// Stable lowercase identifier used on the command line.
    fn name(&self) -> &'static str;

    /// Write every artifact for `solution`.
    fn write(&self, solution: &Solution) -> Result<()>;

    /// Delete what [`write`](Self::write) produces. Missing files are not an error.
    fn clean(&self, solution: &Solution) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Generate,
    Clean,
}

/// The emitters compiled into this crate.
pub fn builtin_targets() -> Vec<Box<dyn Target>> {
    vec![
        Box::new(Vs2003Target),
        Box::new(VsTarget::new(VsVersion::Vs2005)),
        Box::new(VsTarget::new(VsVersion::Vs2005Express)),
        Box::new(VsTarget::new(VsVersion::Vs2008)),
        Box::new(MonoDevelopTarget),
        Box::new(NAntTarget),
        Box::new(AutotoolsTarget),
        Box::new(DebugTarget),
    ]
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Registry
// ═══════════════════════════════════════════════════════════════════════════════

/// Name → emitter table. Pseudo-target `all` runs every registered emitter.
#[derive(Default)]
pub struct TargetRegistry {
    targets: BTreeMap<String, Box<dyn Target>>,
}

impl fmt::Debug for TargetRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.targets.keys()).finish()
    }
}

impl TargetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtin_targets() -> Self {
        let mut registry = Self::new();
        registry.discover(builtin_targets());
        registry
    }

    /// Record each emitter under its lowercase name. A later emitter with
    /// the same name replaces an earlier one.
    pub fn discover(&mut self, targets: impl IntoIterator<Item = Box<dyn Target>>) {
        for target in targets {
            let key = target.name().to_ascii_lowercase();
            tracing::debug!("registered target {key}");
            self.targets.insert(key, target);
        }
    }

    pub fn get(&self, name: &str) -> Option<&dyn Target> {
        self.targets.get(&name.to_ascii_lowercase()).map(|t| t.as_ref())
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.targets.keys().map(String::as_str)
    }

    /// Run `mode` for target `name` once per solution, in order.
    pub fn dispatch(&self, name: &str, solutions: &[Solution], mode: Mode) -> Result<()> {
        if name.eq_ignore_ascii_case("all") {
            for target in self.targets.values() {
                run(target.as_ref(), solutions, mode)?;
            }
            return Ok(());
        }

        let target = self.get(name).ok_or_else(|| ProjgenError::UnknownTarget(name.to_string()))?;
        run(target, solutions, mode)
    }
}

fn run(target: &dyn Target, solutions: &[Solution], mode: Mode) -> Result<()> {
    for solution in solutions {
        match mode {
            Mode::Generate => target.write(solution)?,
            Mode::Clean => target.clean(solution)?,
        }
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Shared helpers
// ═══════════════════════════════════════════════════════════════════════════════

/// Create (or truncate) `path` and hand a buffered writer to `render`.
pub fn write_artifact(path: &Path, render: impl FnOnce(&mut dyn Write) -> io::Result<()>) -> Result<()> {
    let file = File::create(path).map_err(|e| ProjgenError::io(path, e))?;
    let mut out = BufWriter::new(file);
    render(&mut out)
        .and_then(|()| out.flush())
        .map_err(|e| ProjgenError::io(path, e))?;
    tracing::debug!("wrote {}", path.display());
    Ok(())
}

/// Delete `path`; `Ok(false)` when it did not exist.
pub fn delete_if_exists(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!("deleted {}", path.display());
            Ok(true)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(ProjgenError::io(path, e)),
    }
}

/// `<dir>/<name>.<ext>` expressed relative to `base`, forward slashes.
pub fn relative_artifact(base: &Path, dir: &Path, name: &str, ext: &str) -> String {
    let rel = path::relativize_paths(base, dir);
    let rel = if rel == "./" { String::new() } else { rel };
    path::to_forward(&path::join_with_extension(Path::new(&rel), name, ext))
}

/// `Name.dll` unless the name already carries an assembly extension.
pub fn assembly_file_name(name: &str) -> String {
    let lower = name.to_ascii_lowercase();
    if lower.ends_with(".dll") || lower.ends_with(".exe") {
        name.to_string()
    } else {
        format!("{name}.dll")
    }
}

/// Documentation file name for `conf`: `XmlDocFile`, or the assembly name
/// with an `.xml` extension when that is empty.
pub fn xml_doc_file(project: &Project, conf: &Configuration) -> String {
    match conf.options.text("XmlDocFile") {
        "" => {
            let name = &project.assembly_name;
            let stem = name
                .rsplit_once('.')
                .filter(|(_, ext)| matches!(*ext, "dll" | "exe"))
                .map_or(name.as_str(), |(s, _)| s);
            format!("{stem}.xml")
        }
        doc => path::normalize(doc, '/'),
    }
}

/// What a [`Reference`] points at.
#[derive(Debug, Clone)]
pub enum ResolvedReference<'a> {
    /// Another project of the same solution.
    Project(&'a Project),
    /// An assembly found on disk, either via the explicit `path` attribute
    /// or in one of the project's reference paths.
    Assembly(PathBuf),
    /// Nothing found; the toolchain resolves the bare name itself.
    Named(&'a str),
}

/// Resolve `reference` as seen from `project`.
///
/// A name matching a project of the solution always wins, then the explicit
/// `path`, then the first reference path holding `<name>.dll`, then the
/// bare name.
pub fn resolve_reference<'a>(solution: &'a Solution, project: &Project, reference: &'a Reference) -> ResolvedReference<'a> {
    if let Some(target) = solution.project(&reference.name) {
        return ResolvedReference::Project(target);
    }

    let file_name = assembly_file_name(&reference.name);
    if let Some(dir) = &reference.path {
        let dir = path::normalize(dir.as_str(), std::path::MAIN_SEPARATOR);
        return ResolvedReference::Assembly(path::clean(&project.full_path.join(dir).join(&file_name)));
    }

    project
        .reference_paths
        .iter()
        .map(|dir| dir.join(&file_name))
        .find(|candidate| candidate.is_file())
        .map_or(ResolvedReference::Named(reference.name.as_str()), ResolvedReference::Assembly)
}

/// Project references of `project` that name projects of `solution`.
pub fn project_dependencies<'a>(solution: &'a Solution, project: &'a Project) -> impl Iterator<Item = &'a Project> + 'a {
    project.references.iter().filter_map(move |r| solution.project(&r.name))
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ModelBuilder;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Recorder {
        name: &'static str,
        log: Rc<RefCell<Vec<String>>>,
    }

    impl Target for Recorder {
        fn name(&self) -> &'static str {
            self.name
        }

        fn write(&self, solution: &Solution) -> Result<()> {
            self.log.borrow_mut().push(format!("{}:write:{}", self.name, solution.name));
            Ok(())
        }

        fn clean(&self, solution: &Solution) -> Result<()> {
            self.log.borrow_mut().push(format!("{}:clean:{}", self.name, solution.name));
            Ok(())
        }
    }

    fn solutions(dir: &Path, xml: &str) -> Vec<Solution> {
        ModelBuilder::new().parse_str(xml, dir).unwrap()
    }

    #[test]
    fn builtin_names() {
        let registry = TargetRegistry::with_builtin_targets();
        let names: Vec<_> = registry.names().collect();
        assert_eq!(
            names,
            ["autotools", "debug", "monodev", "nant", "vs2003", "vs2005", "vs2005express", "vs2008"]
        );
    }

    #[test]
    fn dispatch_is_case_insensitive_and_ordered() {
        let dir = tempfile::tempdir().unwrap();
        let sols = solutions(dir.path(), r#"<Prebuild><Solution name="A"/><Solution name="B"/></Prebuild>"#);
        let log = Rc::new(RefCell::new(Vec::new()));

        let mut registry = TargetRegistry::new();
        registry.discover([Box::new(Recorder { name: "rec", log: log.clone() }) as Box<dyn Target>]);
        registry.dispatch("REC", &sols, Mode::Generate).unwrap();
        registry.dispatch("rec", &sols, Mode::Clean).unwrap();

        assert_eq!(*log.borrow(), ["rec:write:A", "rec:write:B", "rec:clean:A", "rec:clean:B"]);
    }

    #[test]
    fn last_registration_wins() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut registry = TargetRegistry::new();
        registry.discover([
            Box::new(Recorder { name: "dup", log: Rc::new(RefCell::new(Vec::new())) }) as Box<dyn Target>,
            Box::new(Recorder { name: "dup", log: log.clone() }),
        ]);

        let dir = tempfile::tempdir().unwrap();
        let sols = solutions(dir.path(), r#"<Prebuild><Solution name="S"/></Prebuild>"#);
        registry.dispatch("dup", &sols, Mode::Generate).unwrap();
        assert_eq!(log.borrow().len(), 1);
        assert_eq!(registry.names().count(), 1);
    }

    #[test]
    fn unknown_target_is_an_error() {
        let registry = TargetRegistry::with_builtin_targets();
        let err = registry.dispatch("vs1999", &[], Mode::Generate).unwrap_err();
        assert!(matches!(err, ProjgenError::UnknownTarget(name) if name == "vs1999"));
    }

    #[test]
    fn delete_if_exists_tolerates_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("x.sln");
        fs::write(&file, "").unwrap();
        assert!(delete_if_exists(&file).unwrap());
        assert!(!delete_if_exists(&file).unwrap());
    }

    #[test]
    fn project_names_win_over_reference_paths() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("lib")).unwrap();
        fs::write(dir.path().join("lib/Lib.dll"), "").unwrap();
        fs::write(dir.path().join("lib/Extern.dll"), "").unwrap();

        let xml = r#"
            <Prebuild><Solution name="S">
              <Project name="App">
                <ReferencePath>lib</ReferencePath>
                <Reference name="Lib"/>
                <Reference name="Extern"/>
                <Reference name="System.Xml"/>
                <Reference name="Vendor" path="vendor/bin"/>
              </Project>
              <Project name="Lib" type="Library"/>
            </Solution></Prebuild>"#;
        let sols = solutions(dir.path(), xml);
        let sln = &sols[0];
        let app = sln.project("App").unwrap();

        let resolved: Vec<_> = app.references.iter().map(|r| resolve_reference(sln, app, r)).collect();
        assert!(matches!(resolved[0], ResolvedReference::Project(p) if p.name == "Lib"));
        assert!(matches!(&resolved[1], ResolvedReference::Assembly(p) if p.ends_with("lib/Extern.dll")));
        assert!(matches!(resolved[2], ResolvedReference::Named("System.Xml")));
        assert!(matches!(&resolved[3], ResolvedReference::Assembly(p) if p.ends_with("vendor/bin/Vendor.dll")));
    }

    #[test]
    fn relative_artifact_paths() {
        let base = Path::new("/work/sln");
        assert_eq!(relative_artifact(base, Path::new("/work/sln"), "App", "csproj"), "App.csproj");
        assert_eq!(relative_artifact(base, Path::new("/work/sln/src/App"), "App", "csproj"), "src/App/App.csproj");
        assert_eq!(relative_artifact(base, Path::new("/work/lib"), "Lib", "csproj"), "../lib/Lib.csproj");
    }

    #[test]
    fn assembly_file_names() {
        assert_eq!(assembly_file_name("System.Xml"), "System.Xml.dll");
        assert_eq!(assembly_file_name("Tool.EXE"), "Tool.EXE");
    }

    #[test]
    fn doc_file_defaults_to_assembly_name() {
        let dir = tempfile::tempdir().unwrap();
        let sols = solutions(dir.path(), r#"<Prebuild><Solution name="S"><Project name="Lib" type="Library"/></Solution></Prebuild>"#);
        let lib = sols[0].project("Lib").unwrap();
        let mut project_conf = Configuration::new("Debug");
        assert_eq!(xml_doc_file(lib, &project_conf), "Lib.xml");
        project_conf.options.set("XmlDocFile", r"doc\Lib.xml");
        assert_eq!(xml_doc_file(lib, &project_conf), "doc/Lib.xml");
    }
}
