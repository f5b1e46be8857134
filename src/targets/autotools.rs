//! GNU autotools output: an `Include.am` fragment per project, the
//! solution's `Makefile.am` and `configure.ac`, and a pkg-config template
//! (`<Name>.pc.in`) for every library.
//!
//! Fragments are included into the top-level `Makefile.am`, so every path
//! they contain is relative to the solution directory.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::files::BuildAction;
use crate::model::{Project, ProjectType, Reference, Solution};
use crate::path;
use crate::targets::{ResolvedReference, Target, delete_if_exists, resolve_reference, write_artifact, xml_doc_file};

const OUTPUT_DIR: &str = "$(BUILD_DIR)/$(CONFIG)";

#[derive(Debug, Clone, Copy, Default)]
pub struct AutotoolsTarget;

/// `dir` relative to the solution directory, with a trailing `/`, or empty
/// when it is the solution directory itself.
fn solution_relative(solution: &Solution, dir: &Path) -> String {
    match path::relativize_paths(&solution.full_path, dir).as_str() {
        "./" => String::new(),
        rel => path::end_path(rel, '/'),
    }
}

fn libraries(solution: &Solution) -> impl Iterator<Item = &Project> {
    solution.projects().iter().filter(|p| p.project_type == ProjectType::Library)
}

impl AutotoolsTarget {
    pub fn fragment_file(project: &Project) -> PathBuf {
        path::join_with_extension(&project.full_path, "Include", "am")
    }

    pub fn makefile(solution: &Solution) -> PathBuf {
        path::join_with_extension(&solution.full_path, "Makefile", "am")
    }

    pub fn configure_script(solution: &Solution) -> PathBuf {
        path::join_with_extension(&solution.full_path, "configure", "ac")
    }

    pub fn pkgconfig_template(solution: &Solution, project: &Project) -> PathBuf {
        path::join_with_extension(&solution.full_path, &project.name, "pc.in")
    }

    fn reference_arg(solution: &Solution, project: &Project, reference: &Reference) -> String {
        match resolve_reference(solution, project, reference) {
            ResolvedReference::Project(dep) => format!(
                "{}{OUTPUT_DIR}/{}",
                solution_relative(solution, &dep.full_path),
                dep.output_file_name()
            ),
            ResolvedReference::Assembly(dll) => path::relativize_paths(&solution.full_path, &dll),
            ResolvedReference::Named(name) => format!("{name}.dll"),
        }
    }

    // ─── Include.am ──────────────────────────────────────────────────────

    fn render_fragment(w: &mut dyn Write, solution: &Solution, project: &Project) -> io::Result<()> {
        let rel = solution_relative(solution, &project.full_path);
        let output = project.output_file_name();
        let confs = &project.configurations;

        let deps: Vec<_> = project
            .references
            .iter()
            .filter_map(|r| solution.project(&r.name))
            .map(|dep| dep.output_file_name())
            .collect();
        if deps.is_empty() {
            writeln!(w, "{output}:")?;
        } else {
            writeln!(w, "{output}: {}", deps.join(" "))?;
        }
        writeln!(w, "\tmkdir -p {rel}{OUTPUT_DIR}/")?;

        let mut args = vec![
            format!("$(CSC)\t/out:{rel}{OUTPUT_DIR}/{output}"),
            format!("/target:{}", project.project_type.as_str().to_ascii_lowercase()),
        ];
        if !project.references.is_empty() {
            let refs: Vec<_> = project
                .references
                .iter()
                .map(|r| Self::reference_arg(solution, project, r))
                .collect();
            args.push(format!("/reference:{}", refs.join(",")));
        }
        if let Some(conf) = confs.iter().find(|c| !c.options.text("KeyFile").is_empty()) {
            args.push(format!("/keyfile:{rel}{}", path::normalize(conf.options.text("KeyFile"), '/')));
        }
        if confs.iter().any(|c| c.options.flag("AllowUnsafe")) {
            args.push("/unsafe".to_string());
        }
        if let Some(conf) = confs
            .iter()
            .find(|c| c.options.flag("GenerateXmlDocFile") || !c.options.text("XmlDocFile").is_empty())
        {
            args.push(format!("/doc:{rel}{OUTPUT_DIR}/{}", xml_doc_file(project, conf)));
        }
        for file in project.files.with_action(BuildAction::Compile) {
            args.push(format!("{rel}{}", file.path));
        }
        for file in project.files.with_action(BuildAction::EmbeddedResource) {
            args.push(format!("/resource:{rel}{}", file.path));
        }
        writeln!(w, "\t{}", args.join(" \\\n\t\t"))?;
        writeln!(w)?;

        if project.project_type == ProjectType::Library {
            let assembly = format!("{rel}{OUTPUT_DIR}/{output}");
            writeln!(w, "install-{}:", project.name)?;
            writeln!(w, "\techo \"$(GACUTIL) /i {assembly} /f $(GACUTIL_FLAGS)\"; \\")?;
            writeln!(w, "\t$(GACUTIL) /i {assembly} /f $(GACUTIL_FLAGS) || exit 1;")?;
            writeln!(w)?;
            writeln!(w, "uninstall-{}:", project.name)?;
            writeln!(w, "\techo \"$(GACUTIL) /u {} $(GACUTIL_FLAGS)\"; \\", project.assembly_name)?;
            writeln!(w, "\t$(GACUTIL) /u {} $(GACUTIL_FLAGS) || exit 1;", project.assembly_name)?;
            writeln!(w)?;
        }

        let stem = &project.assembly_name;
        writeln!(
            w,
            "CLEANFILES += {rel}{OUTPUT_DIR}/{output} {rel}{OUTPUT_DIR}/{stem}.mdb {rel}{OUTPUT_DIR}/{stem}.pdb"
        )?;

        let mut extra: Vec<String> = project
            .files
            .iter()
            .filter(|f| f.build_action != BuildAction::Compile)
            .map(|f| format!("{rel}{}", f.path))
            .collect();
        if let Some(conf) = confs.iter().find(|c| !c.options.text("KeyFile").is_empty()) {
            extra.push(format!("{rel}{}", path::normalize(conf.options.text("KeyFile"), '/')));
        }
        if !extra.is_empty() {
            writeln!(w, "EXTRA_DIST += \\")?;
            writeln!(w, "\t{}", extra.join(" \\\n\t"))?;
        }
        Ok(())
    }

    // ─── Makefile.am ─────────────────────────────────────────────────────

    fn render_makefile(w: &mut dyn Write, solution: &Solution) -> io::Result<()> {
        let libs: Vec<_> = libraries(solution).collect();

        if !libs.is_empty() {
            let templates: Vec<_> = libs.iter().map(|p| format!("{}.pc.in", p.name)).collect();
            writeln!(w, "pkgconfig_in_files = {}", templates.join(" "))?;
            writeln!(w, "pkgconfigdir=$(prefix)/lib/pkgconfig")?;
            writeln!(w, "pkgconfig_DATA=$(pkgconfig_in_files:.pc.in=.pc)")?;
            writeln!(w)?;
        }

        writeln!(w, "CLEANFILES =")?;
        if libs.is_empty() {
            writeln!(w, "EXTRA_DIST =")?;
        } else {
            writeln!(w, "EXTRA_DIST = \\")?;
            writeln!(w, "\t$(pkgconfig_in_files)")?;
        }
        writeln!(w)?;

        for project in solution.projects() {
            writeln!(w, "include {}Include.am", solution_relative(solution, &project.full_path))?;
        }
        writeln!(w)?;

        // Dependencies first.
        let outputs: Vec<_> = solution.build_order().iter().map(|p| p.output_file_name()).collect();
        writeln!(w, "all-local: \\")?;
        writeln!(w, "\t{}", outputs.join(" "))?;
        writeln!(w)?;

        if !libs.is_empty() {
            let names = |prefix: &str| {
                libs.iter().map(|p| format!("{prefix}-{}", p.name)).collect::<Vec<_>>().join(" ")
            };
            writeln!(w, "install-data-local: {}", names("install"))?;
            writeln!(w, "uninstall-local: {}", names("uninstall"))?;
            writeln!(w)?;
        }

        writeln!(w, "DISTCLEANFILES = \\")?;
        writeln!(w, "\tconfigure \\")?;
        writeln!(w, "\tMakefile.in \\")?;
        writeln!(w, "\taclocal.m4")
    }

    fn render_pkgconfig(w: &mut dyn Write, project: &Project) -> io::Result<()> {
        writeln!(w, "prefix=@prefix@")?;
        writeln!(w, "exec_prefix=${{prefix}}")?;
        writeln!(w, "libdir=${{exec_prefix}}/lib")?;
        writeln!(w)?;
        writeln!(w, "Name: {}", project.name)?;
        writeln!(w, "Description: {}", project.name)?;
        writeln!(w, "Version: @VERSION@")?;
        writeln!(w, "Libs:  -r:${{libdir}}/mono/{}/{}", project.name, project.output_file_name())
    }

    // ─── configure.ac ────────────────────────────────────────────────────

    fn render_configure(w: &mut dyn Write, solution: &Solution) -> io::Result<()> {
        match libraries(solution).next() {
            Some(lib) => writeln!(w, "AC_INIT({}.pc.in)", lib.name)?,
            None => writeln!(w, "AC_INIT(Makefile.am)")?,
        }
        writeln!(w, "AC_PREREQ(2.53)")?;
        writeln!(w, "AC_CANONICAL_SYSTEM")?;
        writeln!(w, "AM_INIT_AUTOMAKE([{}],[2.0.0],[])", solution.name)?;
        writeln!(w)?;
        writeln!(w, "AM_MAINTAINER_MODE")?;
        writeln!(w)?;
        writeln!(w, "AC_PROG_INSTALL")?;
        writeln!(w)?;
        writeln!(w, "MONO_REQUIRED_VERSION=1.1")?;
        writeln!(w)?;
        writeln!(w, "AC_PATH_PROG(MONO, mono)")?;
        writeln!(w, "AC_PATH_PROG(GMCS, gmcs)")?;
        writeln!(w)?;
        writeln!(w, "dnl Find pkg-config")?;
        writeln!(w, "AC_PATH_PROG(PKGCONFIG, pkg-config, no)")?;
        writeln!(w, "if test \"x$PKGCONFIG\" = \"xno\"; then")?;
        writeln!(w, "        AC_MSG_ERROR([You need to install pkg-config])")?;
        writeln!(w, "fi")?;
        writeln!(w)?;
        writeln!(
            w,
            "PKG_CHECK_MODULES(MONO_DEPENDENCY, mono >= $MONO_REQUIRED_VERSION, has_mono=true, has_mono=false)"
        )?;

        let config = solution.configurations.last().map_or("Release", |c| c.name.as_str());
        writeln!(w, "BUILD_DIR=\"bin\"")?;
        writeln!(w, "CONFIG=\"{config}\"")?;
        writeln!(w, "AC_SUBST(BUILD_DIR)")?;
        writeln!(w, "AC_SUBST(CONFIG)")?;
        writeln!(w)?;
        writeln!(w, "if test \"x$has_mono\" = \"xtrue\"; then")?;
        writeln!(w, "  AC_PATH_PROG(RUNTIME, mono, no)")?;
        writeln!(w, "  AC_PATH_PROG(CSC, gmcs, no)")?;
        writeln!(w, "else")?;
        writeln!(w, "  AC_PATH_PROG(CSC, csc.exe, no)")?;
        writeln!(w, "  if test x$CSC = \"xno\"; then")?;
        writeln!(w, "        AC_MSG_ERROR([You need to install either mono or .Net])")?;
        writeln!(w, "  else")?;
        writeln!(w, "    RUNTIME=")?;
        writeln!(w, "  fi")?;
        writeln!(w, "fi")?;
        writeln!(w)?;
        writeln!(w, "AC_SUBST(RUNTIME)")?;
        writeln!(w, "AC_SUBST(CSC)")?;
        writeln!(w)?;
        writeln!(w, "AC_PATH_PROG(GACUTIL, gacutil, no)")?;
        writeln!(w, "if test \"x$GACUTIL\" = \"xno\" ; then")?;
        writeln!(w, "        AC_MSG_ERROR([No gacutil tool found])")?;
        writeln!(w, "fi")?;
        writeln!(w)?;
        writeln!(w, "GACUTIL_FLAGS='/package {} /gacdir $(DESTDIR)$(prefix)/lib'", solution.name)?;
        writeln!(w, "AC_SUBST(GACUTIL_FLAGS)")?;
        writeln!(w)?;
        writeln!(w, "AC_OUTPUT([")?;
        writeln!(w, "Makefile")?;
        for lib in libraries(solution) {
            writeln!(w, "{}.pc", lib.name)?;
        }
        writeln!(w, "])")?;
        writeln!(w)?;
        writeln!(w, "echo \"---\"")?;
        writeln!(w, "echo \"Configuration summary\"")?;
        writeln!(w, "echo \"\"")?;
        writeln!(w, "echo \"   * Installation prefix: $prefix\"")?;
        writeln!(w, "echo \"   * compiler: $CSC\"")?;
        writeln!(w, "echo \"\"")?;
        writeln!(w, "echo \"---\"")
    }
}

impl Target for AutotoolsTarget {
    fn name(&self) -> &'static str {
        "autotools"
    }

    fn write(&self, solution: &Solution) -> Result<()> {
        tracing::info!("Creating Autotools make files");
        for project in solution.projects() {
            tracing::info!("...Creating makefile: {}", project.name);
            write_artifact(&Self::fragment_file(project), |w| Self::render_fragment(w, solution, project))?;
        }
        for lib in libraries(solution) {
            write_artifact(&Self::pkgconfig_template(solution, lib), |w| Self::render_pkgconfig(w, lib))?;
        }
        write_artifact(&Self::makefile(solution), |w| Self::render_makefile(w, solution))?;
        write_artifact(&Self::configure_script(solution), |w| Self::render_configure(w, solution))
    }

    fn clean(&self, solution: &Solution) -> Result<()> {
        tracing::info!("Cleaning Autotools make files for {}", solution.name);
        delete_if_exists(&Self::makefile(solution))?;
        delete_if_exists(&Self::configure_script(solution))?;
        for project in solution.projects() {
            tracing::info!("...Cleaning project: {}", project.name);
            delete_if_exists(&Self::fragment_file(project))?;
        }
        for lib in libraries(solution) {
            delete_if_exists(&Self::pkgconfig_template(solution, lib))?;
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
          <Configuration name="Debug"/>
          <Configuration name="Release"><Options><AllowUnsafe>true</AllowUnsafe></Options></Configuration>
          <Project name="App" path="src/App">
            <Reference name="Lib"/>
            <Reference name="System.Xml"/>
            <Files><File>Main.cs</File><File buildAction="Content">README</File></Files>
          </Project>
          <Project name="Lib" path="src/Lib" type="Library">
            <Files><File>Lib.cs</File></Files>
          </Project>
        </Solution></Prebuild>"#;

    fn setup() -> (tempfile::TempDir, Solution) {
        let dir = tempfile::tempdir().unwrap();
        for file in ["src/App/Main.cs", "src/App/README", "src/Lib/Lib.cs"] {
            let p = dir.path().join(file);
            fs::create_dir_all(p.parent().unwrap()).unwrap();
            fs::write(p, "").unwrap();
        }
        let sln = ModelBuilder::new().parse_str(XML, dir.path()).unwrap().remove(0);
        (dir, sln)
    }

    fn render(f: impl FnOnce(&mut dyn Write) -> io::Result<()>) -> String {
        let mut out = Vec::new();
        let w: &mut dyn Write = &mut out;
        f(w).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn fragment_paths_are_solution_relative() {
        let (_dir, sln) = setup();
        let app = sln.project("App").unwrap();
        let text = render(|w| AutotoolsTarget::render_fragment(w, &sln, app));

        assert!(text.starts_with("App.exe: Lib.dll\n\tmkdir -p src/App/$(BUILD_DIR)/$(CONFIG)/\n"));
        assert!(text.contains("$(CSC)\t/out:src/App/$(BUILD_DIR)/$(CONFIG)/App.exe \\\n\t\t/target:exe \\\n"));
        assert!(text.contains("/reference:src/Lib/$(BUILD_DIR)/$(CONFIG)/Lib.dll,System.Xml.dll \\\n"));
        assert!(text.contains("\t\t/unsafe \\\n"));
        assert!(text.contains("\t\tsrc/App/Main.cs\n"));
        assert!(text.contains("EXTRA_DIST += \\\n\tsrc/App/README\n"));
        assert!(!text.contains("install-App"));
    }

    #[test]
    fn library_fragment_installs_into_gac() {
        let (_dir, sln) = setup();
        let lib = sln.project("Lib").unwrap();
        let text = render(|w| AutotoolsTarget::render_fragment(w, &sln, lib));
        assert!(text.starts_with("Lib.dll:\n"));
        assert!(text.contains("install-Lib:\n"));
        assert!(text.contains("$(GACUTIL) /u Lib $(GACUTIL_FLAGS) || exit 1;"));
    }

    #[test]
    fn makefile_orders_dependencies_first() {
        let (_dir, sln) = setup();
        let text = render(|w| AutotoolsTarget::render_makefile(w, &sln));

        assert!(text.contains("pkgconfig_in_files = Lib.pc.in\n"));
        assert!(text.contains("include src/App/Include.am\ninclude src/Lib/Include.am\n"));
        assert!(text.contains("all-local: \\\n\tLib.dll App.exe\n"));
        assert!(text.contains("install-data-local: install-Lib\n"));
    }

    #[test]
    fn configure_script_names_library_templates() {
        let (_dir, sln) = setup();
        let text = render(|w| AutotoolsTarget::render_configure(w, &sln));
        assert!(text.starts_with("AC_INIT(Lib.pc.in)\n"));
        assert!(text.contains("AM_INIT_AUTOMAKE([Sample],[2.0.0],[])"));
        assert!(text.contains("CONFIG=\"Release\""));
        assert!(text.contains("AC_OUTPUT([\nMakefile\nLib.pc\n])"));
    }

    #[test]
    fn write_then_clean() {
        let (dir, sln) = setup();
        AutotoolsTarget.write(&sln).unwrap();
        for file in ["Makefile.am", "configure.ac", "Lib.pc.in", "src/App/Include.am", "src/Lib/Include.am"] {
            assert!(dir.path().join(file).is_file(), "{file} missing");
        }
        let pc = fs::read_to_string(dir.path().join("Lib.pc.in")).unwrap();
        assert!(pc.contains("Libs:  -r:${libdir}/mono/Lib/Lib.dll"));

        AutotoolsTarget.clean(&sln).unwrap();
        for file in ["Makefile.am", "configure.ac", "Lib.pc.in", "src/App/Include.am"] {
            assert!(!dir.path().join(file).exists(), "{file} left behind");
        }
        assert!(dir.path().join("src/Lib/Lib.cs").exists());
    }
}
