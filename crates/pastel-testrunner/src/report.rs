//! Machine-readable run report and the human summary/exit mapping.
//!
//! The report mirrors the shape of the progress output: one record per case,
//! per-target records for functional cases, expected/actual payloads for
//! diagnostic mismatches.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use pastel_contracts::TESTRUNNER_REPORT_SCHEMA_VERSION;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Pass,
    CompilerFailure,
    BuildFailure,
    RuntimeFailure,
    Mismatch,
    FixtureError,
    Error,
}

impl CaseStatus {
    pub fn is_pass(self) -> bool {
        self == CaseStatus::Pass
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetStatus {
    Pass,
    CompilerFailure,
    BuildFailure,
    RuntimeFailure,
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct TargetResult {
    pub platform: String,
    pub status: TargetStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CaseResult {
    pub id: String,
    pub suite: String,
    pub status: CaseStatus,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<TargetResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diags: Vec<Diag>,
}

impl CaseResult {
    pub fn new(id: &str, suite: &str) -> Self {
        CaseResult {
            id: id.to_string(),
            suite: suite.to_string(),
            status: CaseStatus::Error,
            duration_ms: 0,
            workspace: None,
            targets: Vec::new(),
            expected: None,
            actual: None,
            diags: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Diag {
    pub code: String,
    pub message: String,
}

impl Diag {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Diag {
            code: code.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Summary {
    pub passed: u64,
    pub failed: u64,
    pub errors: u64,
    pub fixture_errors: u64,
    pub compiler_failures: u64,
    pub build_failures: u64,
    pub runtime_failures: u64,
    pub mismatches: u64,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InvocationInfo {
    pub argv: Vec<String>,
    pub cwd: String,
    pub compiler: String,
    pub seed: u64,
    pub fail_fast: bool,
    pub platforms: Vec<String>,
    pub errtests: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TestReport {
    pub schema_version: String,
    pub tool: ToolInfo,
    pub invocation: InvocationInfo,
    pub summary: Summary,
    pub cases: Vec<CaseResult>,
}

impl TestReport {
    pub fn new(invocation: InvocationInfo, summary: Summary, cases: Vec<CaseResult>) -> Self {
        TestReport {
            schema_version: TESTRUNNER_REPORT_SCHEMA_VERSION.to_string(),
            tool: ToolInfo {
                name: "pastel-testrunner".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            invocation,
            summary,
            cases,
        }
    }
}

pub fn summarize(cases: &[CaseResult], elapsed: Duration) -> Summary {
    let mut summary = Summary {
        duration_ms: elapsed.as_millis() as u64,
        ..Summary::default()
    };
    for case in cases {
        match case.status {
            CaseStatus::Pass => summary.passed += 1,
            CaseStatus::CompilerFailure => {
                summary.failed += 1;
                summary.compiler_failures += 1;
            }
            CaseStatus::BuildFailure => {
                summary.failed += 1;
                summary.build_failures += 1;
            }
            CaseStatus::RuntimeFailure => {
                summary.failed += 1;
                summary.runtime_failures += 1;
            }
            CaseStatus::Mismatch => {
                summary.failed += 1;
                summary.mismatches += 1;
            }
            CaseStatus::FixtureError => summary.fixture_errors += 1,
            CaseStatus::Error => summary.errors += 1,
        }
    }
    summary
}

/// 0 = all green, 10 = at least one exercised case failed, 12 = only
/// fixture/harness-level errors, 2 (from main) = internal error.
pub fn compute_exit_code(summary: &Summary) -> u8 {
    if summary.failed > 0 {
        return 10;
    }
    if summary.fixture_errors > 0 || summary.errors > 0 {
        return 12;
    }
    0
}

pub fn write_report(path: &PathBuf, report: &TestReport) -> anyhow::Result<()> {
    use anyhow::Context as _;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create report dir: {}", parent.display()))?;
        }
    }
    let json = serde_json::to_string(report)? + "\n";
    std::fs::write(path, json).with_context(|| format!("write report: {}", path.display()))
}

pub fn print_summary_line(summary: &Summary, exit_code: u8) {
    println!(
        "summary: passed={} failed={} fixture_errors={} errors={} duration_ms={} (exit={})",
        summary.passed,
        summary.failed,
        summary.fixture_errors,
        summary.errors,
        summary.duration_ms,
        exit_code
    );
}
