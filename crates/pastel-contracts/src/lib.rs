//! Shared wire formats between the harness and the Pastel compiler.
//!
//! The build manifest (`test.json`) is the single input document the compiler
//! consumes besides the source file itself. The types here are the only place
//! that knows its JSON shape; both the harness and the self-test stub compiler
//! go through them.

use anyhow::Result;
use serde_json::json;

use pastel_targets::TargetLanguage;

/// Schema id stamped into the harness's machine-readable run report.
pub const TESTRUNNER_REPORT_SCHEMA_VERSION: &str = "pastel.testrunner.report@0.1.0";

/// File name of the build manifest inside a test workspace.
pub const BUILD_MANIFEST_FILE: &str = "test.json";

/// File name of the staged source fixture inside a test workspace, and the
/// canonical placeholder substituted for its absolute path in diagnostics.
pub const SOURCE_FIXTURE_FILE: &str = "test.pst";

/// Fixed import list of every C# target.
pub const CSHARP_IMPORTS: [&str; 1] = ["System.Collections.Generic"];

/// Language-specific output configuration, one variant per supported target.
///
/// The original tool assembled these from lookup tables keyed by language
/// strings; a closed set of variants makes an invalid combination (say, a
/// wrapper class for a scripting target) unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetOutput {
    Csharp {
        namespace: String,
        structs_path: String,
        functions_path: String,
        wrapper_class: String,
    },
    Java {
        structs_path: String,
        functions_path: String,
        wrapper_class: String,
    },
    Js {
        functions_path: String,
    },
    Python {
        functions_path: String,
    },
}

/// One entry of the build manifest's `targets` array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub name: String,
    pub output: TargetOutput,
}

impl Target {
    /// C# target. `functions_path` must end in `.cs`; the wrapper class name
    /// is derived from its file stem.
    pub fn csharp(
        name: &str,
        namespace: &str,
        functions_path: &str,
        structs_path: &str,
    ) -> Result<Self> {
        let wrapper_class = wrapper_class_from_path(functions_path, TargetLanguage::Csharp)?;
        Ok(Target {
            name: name.to_string(),
            output: TargetOutput::Csharp {
                namespace: namespace.to_string(),
                structs_path: structs_path.to_string(),
                functions_path: functions_path.to_string(),
                wrapper_class,
            },
        })
    }

    /// Java target. `functions_path` must end in `.java`.
    pub fn java(name: &str, functions_path: &str, structs_path: &str) -> Result<Self> {
        let wrapper_class = wrapper_class_from_path(functions_path, TargetLanguage::Java)?;
        Ok(Target {
            name: name.to_string(),
            output: TargetOutput::Java {
                structs_path: structs_path.to_string(),
                functions_path: functions_path.to_string(),
                wrapper_class,
            },
        })
    }

    pub fn js(name: &str, functions_path: &str) -> Self {
        Target {
            name: name.to_string(),
            output: TargetOutput::Js {
                functions_path: functions_path.to_string(),
            },
        }
    }

    pub fn python(name: &str, functions_path: &str) -> Self {
        Target {
            name: name.to_string(),
            output: TargetOutput::Python {
                functions_path: functions_path.to_string(),
            },
        }
    }

    pub fn language(&self) -> TargetLanguage {
        match self.output {
            TargetOutput::Csharp { .. } => TargetLanguage::Csharp,
            TargetOutput::Java { .. } => TargetLanguage::Java,
            TargetOutput::Js { .. } => TargetLanguage::Js,
            TargetOutput::Python { .. } => TargetLanguage::Python,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match &self.output {
            TargetOutput::Csharp {
                namespace,
                structs_path,
                functions_path,
                wrapper_class,
            } => json!({
                "name": self.name,
                "language": TargetLanguage::Csharp.manifest_id(),
                "imports": CSHARP_IMPORTS,
                "output": {
                    "namespace": namespace,
                    "structs-path": structs_path,
                    "functions-path": functions_path,
                    "functions-wrapper-class": wrapper_class,
                },
            }),
            TargetOutput::Java {
                structs_path,
                functions_path,
                wrapper_class,
            } => json!({
                "name": self.name,
                "language": TargetLanguage::Java.manifest_id(),
                "output": {
                    "structs-path": structs_path,
                    "functions-path": functions_path,
                    "functions-wrapper-class": wrapper_class,
                },
            }),
            TargetOutput::Js { functions_path } => json!({
                "name": self.name,
                "language": TargetLanguage::Js.manifest_id(),
                "output": { "functions-path": functions_path },
            }),
            TargetOutput::Python { functions_path } => json!({
                "name": self.name,
                "language": TargetLanguage::Python.manifest_id(),
                "output": { "functions-path": functions_path },
            }),
        }
    }
}

fn wrapper_class_from_path(functions_path: &str, lang: TargetLanguage) -> Result<String> {
    let ext = lang.source_ext();
    let Some(stem) = functions_path.strip_suffix(ext) else {
        anyhow::bail!(
            "{} functions path must end in {ext}: {functions_path:?}",
            lang.tag()
        );
    };
    if stem.is_empty() {
        anyhow::bail!("functions path has an empty file stem: {functions_path:?}");
    }
    Ok(stem.to_string())
}

/// The build manifest the compiler consumes: one source file and the ordered
/// list of targets to generate.
#[derive(Debug, Clone)]
pub struct BuildManifest {
    pub source: String,
    pub targets: Vec<Target>,
}

impl BuildManifest {
    pub fn new(targets: Vec<Target>) -> Self {
        BuildManifest {
            source: SOURCE_FIXTURE_FILE.to_string(),
            targets,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "source": self.source,
            "targets": self.targets.iter().map(Target::to_json).collect::<Vec<_>>(),
        })
    }

    /// Stable, human-diffable serialization written into the workspace.
    pub fn to_pretty_string(&self) -> Result<String> {
        let mut out = serde_json::to_string_pretty(&self.to_json())?;
        out.push('\n');
        Ok(out)
    }
}
