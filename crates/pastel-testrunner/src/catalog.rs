//! Fixture discovery.
//!
//! Layout under the tests root:
//! - `fvt/` — functional cases, one `.pst` source per case
//! - `fvt-lib/` — support files staged into every functional workspace
//! - `errors/` — negative cases, one `.txt` fixture per case
//!
//! Discovery performs no content validation beyond the error-fixture split;
//! a malformed negative fixture is reported per fixture so the rest of the
//! suite still runs.

use std::path::Path;

use anyhow::{Context, Result};
use walkdir::WalkDir;

use pastel_targets::TargetLanguage;

use crate::fixture::split_error_fixture;

pub const FUNCTIONAL_DIR: &str = "fvt";
pub const SUPPORT_DIR: &str = "fvt-lib";
pub const ERRORS_DIR: &str = "errors";

#[derive(Debug, Clone)]
pub struct FunctionalCase {
    pub id: String,
    pub code: String,
}

#[derive(Debug, Clone)]
pub struct ErrorCase {
    pub id: String,
    pub code: String,
    pub expected: String,
    pub lang: TargetLanguage,
}

/// Outcome of loading one negative fixture. Invalid fixtures stay in the
/// catalog so they show up as failures instead of silently vanishing.
#[derive(Debug, Clone)]
pub enum ErrorCaseLoad {
    Case(ErrorCase),
    Invalid { id: String, message: String },
}

impl ErrorCaseLoad {
    pub fn id(&self) -> &str {
        match self {
            ErrorCaseLoad::Case(c) => &c.id,
            ErrorCaseLoad::Invalid { id, .. } => id,
        }
    }
}

pub fn discover_functional(dir: &Path) -> Result<Vec<FunctionalCase>> {
    let mut out = Vec::new();
    for (id, path) in fixture_files(dir, "pst")? {
        let code = read_text(&path)?;
        out.push(FunctionalCase { id, code });
    }
    out.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(out)
}

pub fn discover_error(dir: &Path) -> Result<Vec<ErrorCaseLoad>> {
    let mut out = Vec::new();
    for (id, path) in fixture_files(dir, "txt")? {
        let content = read_text(&path)?;
        let loaded = match split_error_fixture(&content, &path) {
            Ok((code, expected)) => match target_for_id(&id) {
                Ok(lang) => ErrorCaseLoad::Case(ErrorCase {
                    id,
                    code,
                    expected,
                    lang,
                }),
                Err(message) => ErrorCaseLoad::Invalid { id, message },
            },
            Err(err) => ErrorCaseLoad::Invalid {
                id,
                message: format!("{err:#}"),
            },
        };
        out.push(loaded);
    }
    out.sort_by(|a, b| a.id().cmp(b.id()));
    Ok(out)
}

/// Negative-test ids may carry a bracketed language tag (`case[java]`); the
/// default target is js.
fn target_for_id(id: &str) -> Result<TargetLanguage, String> {
    let Some(stripped) = id.strip_suffix(']') else {
        return Ok(TargetLanguage::Js);
    };
    let Some((_, tag)) = stripped.rsplit_once('[') else {
        return Ok(TargetLanguage::Js);
    };
    TargetLanguage::parse(tag).ok_or_else(|| format!("unknown target language tag: [{tag}]"))
}

fn fixture_files(dir: &Path, ext: &str) -> Result<Vec<(String, std::path::PathBuf)>> {
    if !dir.is_dir() {
        anyhow::bail!("missing test fixture directory: {}", dir.display());
    }
    let mut out = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.with_context(|| format!("scan fixture dir: {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(ext));
        if !matches {
            continue;
        }
        let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        out.push((id.to_string(), path.to_path_buf()));
    }
    Ok(out)
}

fn read_text(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("read fixture: {}", path.display()))?;
    let text =
        String::from_utf8(bytes).with_context(|| format!("fixture is not UTF-8: {}", path.display()))?;
    Ok(text.replace("\r\n", "\n"))
}
