//! Build-manifest presets and workspace staging.
//!
//! The functional suite always declares all four targets so one manifest
//! serves every requested platform; the error suite declares exactly one
//! target named `test` for the fixture's language.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::WalkDir;

use pastel_contracts::{BuildManifest, Target, BUILD_MANIFEST_FILE, SOURCE_FIXTURE_FILE};
use pastel_targets::TargetLanguage;

use crate::catalog::ErrorCase;
use crate::rng::NameRng;

/// Solution file whose project/solution GUID placeholders are templated at
/// load time.
pub const SOLUTION_FILE: &str = "PastelTest.sln";
const PROJ_GUID_PLACEHOLDER: &str = "PROJ_GUID";
const SOLUTION_GUID_PLACEHOLDER: &str = "SOLUTION_GUID";

pub fn fvt_manifest() -> Result<BuildManifest> {
    Ok(BuildManifest::new(vec![
        Target::csharp("csharp", "PastelTest.GeneratedCode", "FunctionWrapper.cs", "csgen")?,
        Target::java("java", "FunctionWrapper.java", ".")?,
        Target::js("js", "gen.js"),
        Target::python("python", "pygen/__init__.py"),
    ]))
}

pub fn error_manifest(lang: TargetLanguage) -> Result<BuildManifest> {
    let target = match lang {
        TargetLanguage::Csharp => {
            Target::csharp("test", "PastelGenerated", "FunctionWrapper.cs", ".")?
        }
        TargetLanguage::Java => Target::java("test", "FunctionWrapper.java", ".")?,
        TargetLanguage::Js => Target::js("test", "gen.js"),
        TargetLanguage::Python => Target::python("test", "gen.py"),
    };
    Ok(BuildManifest::new(vec![target]))
}

/// Support files staged into every functional workspace, loaded once per
/// run. The solution file gets fresh GUIDs drawn from the injected RNG.
pub fn load_support_files(dir: &Path, rng: &mut NameRng) -> Result<Vec<(String, String)>> {
    if !dir.is_dir() {
        anyhow::bail!("missing support file directory: {}", dir.display());
    }
    let mut out = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.with_context(|| format!("scan support dir: {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        let content = std::fs::read_to_string(entry.path())
            .with_context(|| format!("read support file: {}", entry.path().display()))?;
        let content = if name == SOLUTION_FILE {
            content
                .replace(PROJ_GUID_PLACEHOLDER, &rng.csharp_guid())
                .replace(SOLUTION_GUID_PLACEHOLDER, &rng.csharp_guid())
        } else {
            content
        };
        out.push((name.to_string(), content));
    }
    out.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(out)
}

/// Absolute paths of the staged manifest and source fixture.
pub struct StagedCase {
    pub manifest_path: PathBuf,
    pub source_path: PathBuf,
}

pub fn stage_functional_workspace(
    workspace: &Path,
    code: &str,
    support: &[(String, String)],
) -> Result<StagedCase> {
    for (name, content) in support {
        write_text(&workspace.join(name), content)?;
    }
    stage_common(workspace, &fvt_manifest()?, code)
}

pub fn stage_error_workspace(workspace: &Path, case: &ErrorCase) -> Result<StagedCase> {
    stage_common(workspace, &error_manifest(case.lang)?, &case.code)
}

fn stage_common(workspace: &Path, manifest: &BuildManifest, code: &str) -> Result<StagedCase> {
    let manifest_path = workspace.join(BUILD_MANIFEST_FILE);
    write_text(&manifest_path, &manifest.to_pretty_string()?)?;
    let source_path = workspace.join(SOURCE_FIXTURE_FILE);
    write_text(&source_path, code)?;
    Ok(StagedCase {
        manifest_path,
        source_path,
    })
}

fn write_text(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content).with_context(|| format!("write {}", path.display()))
}
