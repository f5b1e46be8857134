use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;
use projgen_rs::{Mode, ProjgenError, generate};
use walkdir::WalkDir;

const APP_GUID: &str = "{11111111-2222-3333-4444-555555555555}";
const LIB_GUID: &str = "{AAAAAAAA-BBBB-CCCC-DDDD-EEEEEEEEEEEE}";

const PREBUILD: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<Prebuild version="1.10">
  <Solution name="Sample">
    <Configuration name="Debug">
      <Options>
        <CompilerDefines>DEBUG;TRACE</CompilerDefines>
        <DebugInformation>true</DebugInformation>
      </Options>
    </Configuration>
    <Project name="App" path="App" type="Exe" guid="11111111-2222-3333-4444-555555555555">
      <Reference name="Lib"/>
      <Reference name="System"/>
      <Files>
        <Match pattern="*.cs" recurse="true"/>
      </Files>
    </Project>
    <Project name="Lib" path="Lib" type="Library" guid="aaaaaaaa-bbbb-cccc-dddd-eeeeeeeeeeee">
      <Files>
        <File>Lib.cs</File>
      </Files>
    </Project>
  </Solution>
</Prebuild>
"#;

fn workspace() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("App/Util")).unwrap();
    fs::create_dir_all(root.join("Lib")).unwrap();
    fs::write(root.join("App/Main.cs"), "class Program {}").unwrap();
    fs::write(root.join("App/Util/Helpers.cs"), "static class Helpers {}").unwrap();
    fs::write(root.join("Lib/Lib.cs"), "public class Lib {}").unwrap();
    fs::write(root.join("prebuild.xml"), PREBUILD).unwrap();
    dir
}

fn tree(root: &Path) -> BTreeSet<String> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
        .collect()
}

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn vs2008_generates_linked_projects() {
    let dir = workspace();
    let root = dir.path();
    generate(&root.join("prebuild.xml"), "vs2008", Mode::Generate).unwrap();

    let app = fs::read_to_string(root.join("App/App.csproj")).unwrap();
    assert!(app.contains(&format!("<ProjectGuid>{APP_GUID}</ProjectGuid>")));
    assert!(app.contains(r#"<ProjectReference Include="..\Lib\Lib.csproj">"#));
    assert!(app.contains(&format!("<Project>{LIB_GUID}</Project>")));
    assert!(app.contains(r#"<Reference Include="System">"#));
    assert!(app.contains(r#"<Compile Include="Main.cs"/>"#));
    assert!(app.contains(r#"<Compile Include="Util\Helpers.cs"/>"#));
    assert!(app.contains("<DefineConstants>DEBUG;TRACE</DefineConstants>"));
    assert!(app.contains(r#"<Import Project="$(MSBuildBinPath)\Microsoft.CSHARP.Targets"/>"#));

    let sln = fs::read_to_string(root.join("Sample.sln")).unwrap();
    let lines: Vec<_> = sln.lines().collect();
    assert_eq!(lines[0], "Microsoft Visual Studio Solution File, Format Version 10.00");
    assert_eq!(lines[1], "# Visual Studio 2008");
    assert!(sln.contains(&format!(
        "Project(\"{{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}}\") = \"App\", \"App\\App.csproj\", \"{APP_GUID}\""
    )));
    assert!(sln.contains(&format!("\t\t{LIB_GUID} = {LIB_GUID}")));
    assert!(sln.contains("\t\tDebug|Any CPU = Debug|Any CPU"));
    assert!(sln.contains(&format!("\t\t{APP_GUID}.Debug|Any CPU.ActiveCfg = Debug|Any CPU")));
    assert!(sln.contains(&format!("\t\t{LIB_GUID}.Debug|Any CPU.Build.0 = Debug|Any CPU")));
    assert_eq!(lines.last().copied(), Some("EndGlobal"));
}

#[test]
fn clean_removes_exactly_what_was_generated() {
    let dir = workspace();
    let root = dir.path();
    let before = tree(root);

    generate(&root.join("prebuild.xml"), "vs2005", Mode::Generate).unwrap();
    let generated: BTreeSet<_> = tree(root).difference(&before).cloned().collect();
    assert_eq!(
        generated,
        set(&["App/App.csproj", "App/App.csproj.user", "Lib/Lib.csproj", "Lib/Lib.csproj.user", "Sample.sln"])
    );

    generate(&root.join("prebuild.xml"), "vs2005", Mode::Clean).unwrap();
    assert_eq!(tree(root), before);

    // A second clean has nothing left to delete.
    generate(&root.join("prebuild.xml"), "vs2005", Mode::Clean).unwrap();
    assert_eq!(tree(root), before);
}

#[test]
fn every_target_round_trips_through_clean() {
    let dir = workspace();
    let root = dir.path();
    let before = tree(root);

    generate(&root.join("prebuild.xml"), "all", Mode::Generate).unwrap();
    let after = tree(root);
    for file in [
        "Sample.sln",
        "Sample.mds",
        "Sample.build",
        "Makefile.am",
        "configure.ac",
        "Lib.pc.in",
        "App/App.csproj",
        "App/App.csproj.user",
        "App/App.mdp",
        "App/App.build",
        "App/Include.am",
        "Lib/Lib.csproj",
        "Lib/Lib.build",
    ] {
        assert!(after.contains(file), "{file} was not generated");
    }

    // The MSBuild editions share file names, so only the last one remains.
    let app = fs::read_to_string(root.join("App/App.csproj")).unwrap();
    assert!(app.contains(r#"ToolsVersion="3.5""#));

    generate(&root.join("prebuild.xml"), "all", Mode::Clean).unwrap();
    assert_eq!(tree(root), before);
}

#[test]
fn each_msbuild_edition_round_trips_through_clean() {
    for target in ["vs2003", "vs2005", "vs2005express", "vs2008"] {
        let dir = workspace();
        let root = dir.path();
        let before = tree(root);

        generate(&root.join("prebuild.xml"), target, Mode::Generate).unwrap();
        let generated: BTreeSet<_> = tree(root).difference(&before).cloned().collect();
        assert_eq!(
            generated,
            set(&["App/App.csproj", "App/App.csproj.user", "Lib/Lib.csproj", "Lib/Lib.csproj.user", "Sample.sln"]),
            "{target}"
        );

        let project = fs::read_to_string(root.join("Lib/Lib.csproj")).unwrap();
        roxmltree::Document::parse(&project).unwrap();

        generate(&root.join("prebuild.xml"), target, Mode::Clean).unwrap();
        assert_eq!(tree(root), before, "{target}");
    }
}

#[test]
fn generated_xml_is_well_formed() {
    let dir = workspace();
    let root = dir.path();
    for target in ["vs2008", "monodev", "nant"] {
        generate(&root.join("prebuild.xml"), target, Mode::Generate).unwrap();
        for file in tree(root) {
            let xml = [".csproj", ".user", ".mdp", ".mds", ".build"].iter().any(|ext| file.ends_with(ext));
            if xml {
                let text = fs::read_to_string(root.join(&file)).unwrap();
                assert!(roxmltree::Document::parse(&text).is_ok(), "{target}: {file}");
            }
        }
    }
}

// ─── Generated guids ────────────────────────────────────────────────────────

const AUTO_GUIDS: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<Prebuild version="1.10">
  <Solution name="Sample">
    <Configuration name="Debug">
      <Options>
        <OptimizeCode>false</OptimizeCode>
      </Options>
    </Configuration>
    <Project name="App" path="App" type="Exe">
      <Reference name="Lib"/>
      <Files>
        <File>Main.cs</File>
        <File buildAction="EmbeddedResource">Logo.bmp</File>
      </Files>
    </Project>
    <Project name="Lib" path="Lib" type="Library">
      <Files>
        <File>Lib.cs</File>
      </Files>
    </Project>
  </Solution>
</Prebuild>
"#;

fn text_of<'a>(doc: &'a roxmltree::Document, tag: &str) -> Vec<&'a str> {
    doc.descendants()
        .filter(|n| n.tag_name().name() == tag)
        .filter_map(|n| n.text())
        .collect()
}

#[test]
fn generated_guids_link_projects_and_solution() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("App")).unwrap();
    fs::create_dir_all(root.join("Lib")).unwrap();
    fs::write(root.join("App/Main.cs"), "class Program {}").unwrap();
    fs::write(root.join("App/Logo.bmp"), "").unwrap();
    fs::write(root.join("Lib/Lib.cs"), "public class Lib {}").unwrap();
    fs::write(root.join("prebuild.xml"), AUTO_GUIDS).unwrap();

    generate(&root.join("prebuild.xml"), "vs2005", Mode::Generate).unwrap();

    let lib_text = fs::read_to_string(root.join("Lib/Lib.csproj")).unwrap();
    let lib = roxmltree::Document::parse(&lib_text).unwrap();
    let lib_guid = text_of(&lib, "ProjectGuid")[0].to_string();
    assert_eq!(lib_guid.len(), 38);
    assert!(lib_guid.starts_with('{') && lib_guid.ends_with('}'));

    let app_text = fs::read_to_string(root.join("App/App.csproj")).unwrap();
    let app = roxmltree::Document::parse(&app_text).unwrap();
    let app_guid = text_of(&app, "ProjectGuid")[0].to_string();
    assert_ne!(app_guid, lib_guid);

    let reference = app.descendants().find(|n| n.tag_name().name() == "ProjectReference").unwrap();
    assert_eq!(reference.attribute("Include"), Some(r"..\Lib\Lib.csproj"));
    let referenced: Vec<_> = reference
        .children()
        .filter(|n| n.tag_name().name() == "Project")
        .filter_map(|n| n.text())
        .collect();
    assert_eq!(referenced, [lib_guid.as_str()]);

    let items = |tag: &str| -> Vec<String> {
        app.descendants()
            .filter(|n| n.tag_name().name() == tag)
            .filter_map(|n| n.attribute("Include"))
            .map(str::to_string)
            .collect()
    };
    assert_eq!(items("Compile"), ["Main.cs"]);
    assert_eq!(items("EmbeddedResource"), ["Logo.bmp"]);
    assert_eq!(text_of(&app, "Optimize"), ["false"]);

    let sln = fs::read_to_string(root.join("Sample.sln")).unwrap();
    assert!(sln.contains(&format!(
        "Project(\"{{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}}\") = \"Lib\", \"Lib\\Lib.csproj\", \"{lib_guid}\""
    )));
    let app_section = sln.split("= \"App\"").nth(1).unwrap().split("EndProject").next().unwrap();
    assert!(app_section.contains("ProjectSection(ProjectDependencies) = postProject"));
    assert!(app_section.contains(&format!("\t\t{lib_guid} = {lib_guid}")));
}

#[test]
fn unknown_target_fails() {
    let dir = workspace();
    let err = generate(&dir.path().join("prebuild.xml"), "xcode", Mode::Generate).unwrap_err();
    assert!(matches!(err.downcast_ref::<ProjgenError>(), Some(ProjgenError::UnknownTarget(_))));
}

#[test]
fn missing_input_fails() {
    let dir = tempfile::tempdir().unwrap();
    assert!(generate(&dir.path().join("prebuild.xml"), "nant", Mode::Generate).is_err());
}
