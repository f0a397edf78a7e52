//! Per-target runtime adapters for the functional suite.
//!
//! All four adapters share one contract: build (if the target needs it) and
//! execute the generated program inside the workspace, treating any stdout
//! as a failure report. The fixture programs self-validate and stay silent
//! on success.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use walkdir::WalkDir;

use pastel_targets::TargetLanguage;

use crate::invoke::{run_tool, CapturedOutput};
use crate::manifest::SOLUTION_FILE;

const JS_GENERATED_FILE: &str = "gen.js";
const JS_ENTRY: &str = "index.js";
const JS_EXPORT_SNIPPET: &str = "export default { runner, registerExtension: PASTEL_regCallback };";
const PYTHON_ENTRY: &str = "main.py";
const JAVA_MAIN_CLASS: &str = "PastelTest";
const DOTNET_BUILD_OK: &str = "Build succeeded.";

/// External tool commands, overridable per invocation of the harness.
#[derive(Debug, Clone)]
pub struct ToolCommands {
    pub node: String,
    pub python: String,
    pub javac: String,
    pub java: String,
    pub dotnet: String,
}

impl Default for ToolCommands {
    fn default() -> Self {
        ToolCommands {
            node: "node".to_string(),
            python: if cfg!(windows) { "python" } else { "python3" }.to_string(),
            javac: "javac".to_string(),
            java: "java".to_string(),
            dotnet: "dotnet".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum RunOutcome {
    Ok,
    BuildFailed { output: String },
    RunFailed { output: String },
}

impl RunOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, RunOutcome::Ok)
    }
}

pub fn run_platform(
    lang: TargetLanguage,
    workspace: &Path,
    tools: &ToolCommands,
    timeout: Duration,
) -> RunOutcome {
    match lang {
        TargetLanguage::Js => run_js(workspace, tools, timeout),
        TargetLanguage::Python => run_python(workspace, tools, timeout),
        TargetLanguage::Java => run_java(workspace, tools, timeout),
        TargetLanguage::Csharp => run_csharp(workspace, tools, timeout),
    }
}

/// The generated module does not export anything by itself yet, so the
/// bootstrap export is appended before the entry script imports it.
fn run_js(workspace: &Path, tools: &ToolCommands, timeout: Duration) -> RunOutcome {
    let gen_path = workspace.join(JS_GENERATED_FILE);
    let appended = std::fs::read_to_string(&gen_path)
        .map(|code| format!("{code}\n\n{JS_EXPORT_SNIPPET}\n"))
        .and_then(|code| std::fs::write(&gen_path, code));
    if let Err(err) = appended {
        return RunOutcome::RunFailed {
            output: format!("append export snippet to {}: {err}", gen_path.display()),
        };
    }
    classify_run(run_tool(&tools.node, &[JS_ENTRY], Some(workspace), timeout))
}

fn run_python(workspace: &Path, tools: &ToolCommands, timeout: Duration) -> RunOutcome {
    classify_run(run_tool(&tools.python, &[PYTHON_ENTRY], Some(workspace), timeout))
}

fn run_java(workspace: &Path, tools: &ToolCommands, timeout: Duration) -> RunOutcome {
    let sources = match java_sources(workspace) {
        Ok(sources) => sources,
        Err(err) => {
            return RunOutcome::BuildFailed {
                output: format!("{err:#}"),
            }
        }
    };
    if sources.is_empty() {
        return RunOutcome::BuildFailed {
            output: format!("no .java sources in {}", workspace.display()),
        };
    }

    match run_tool(&tools.javac, &sources, Some(workspace), timeout) {
        Err(err) => {
            return RunOutcome::BuildFailed {
                output: format!("{err:#}"),
            }
        }
        Ok(out) => {
            if let Some(output) = build_failure_output(&out) {
                return RunOutcome::BuildFailed { output };
            }
        }
    }

    classify_run(run_tool(&tools.java, &[JAVA_MAIN_CLASS], Some(workspace), timeout))
}

fn run_csharp(workspace: &Path, tools: &ToolCommands, timeout: Duration) -> RunOutcome {
    match run_tool(
        &tools.dotnet,
        &["build", SOLUTION_FILE],
        Some(workspace),
        timeout,
    ) {
        Err(err) => {
            return RunOutcome::BuildFailed {
                output: format!("{err:#}"),
            }
        }
        Ok(out) => {
            if !out.stdout.contains(DOTNET_BUILD_OK) {
                return RunOutcome::BuildFailed { output: out.combined() };
            }
        }
    }

    let exe_name = if cfg!(windows) {
        "PastelTest.exe"
    } else {
        "PastelTest"
    };
    let exe = workspace
        .join("bin")
        .join("Debug")
        .join("net8.0")
        .join(exe_name);
    classify_run(run_tool(&exe, &[] as &[&str], Some(workspace), timeout))
}

/// Workspace-relative names of the Java sources to compile; `Command` does
/// no shell globbing, so the `javac *.java` expansion happens here.
fn java_sources(workspace: &Path) -> Result<Vec<String>> {
    let mut sources = Vec::new();
    for entry in WalkDir::new(workspace).min_depth(1).max_depth(1) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if name.ends_with(".java") {
            sources.push(name.to_string());
        }
    }
    sources.sort();
    Ok(sources)
}

fn build_failure_output(out: &CapturedOutput) -> Option<String> {
    if out.timed_out {
        return Some("build timed out".to_string());
    }
    let mut combined = out.combined();
    if out.stdout_truncated || out.stderr_truncated {
        combined.push_str("\n[output truncated]");
    }
    if !combined.trim().is_empty() {
        return Some(combined);
    }
    if !out.exited_cleanly() {
        return Some(format!("build exited with status {:?}", out.exit_code));
    }
    None
}

fn classify_run(result: Result<CapturedOutput>) -> RunOutcome {
    let out = match result {
        Ok(out) => out,
        Err(err) => {
            return RunOutcome::RunFailed {
                output: format!("{err:#}"),
            }
        }
    };
    if out.timed_out {
        return RunOutcome::RunFailed {
            output: "timed out".to_string(),
        };
    }
    if !out.stdout_trimmed().is_empty() {
        let mut output = out.stdout_trimmed().to_string();
        if out.stdout_truncated {
            output.push_str("\n[output truncated]");
        }
        return RunOutcome::RunFailed { output };
    }
    if !out.exited_cleanly() {
        let mut output = format!("exited with status {:?}", out.exit_code);
        if !out.stderr.trim().is_empty() {
            output.push('\n');
            output.push_str(out.stderr.trim());
        }
        return RunOutcome::RunFailed { output };
    }
    RunOutcome::Ok
}
