//! Per-case pipelines for the functional and error suites.
//!
//! A case failure is recorded and the run continues; only setup problems
//! that make the whole suite meaningless (missing fixture directories,
//! missing support files) propagate out.

use std::time::{Duration, Instant};

use anyhow::Result;

use pastel_targets::TargetLanguage;

use crate::catalog::{self, ErrorCase, ErrorCaseLoad, FunctionalCase};
use crate::compare::{diagnostics_match, normalize, rewrite_source_path};
use crate::invoke::invoke_compiler;
use crate::manifest::{
    load_support_files, stage_error_workspace, stage_functional_workspace, StagedCase,
};
use crate::report::{CaseResult, CaseStatus, Diag, TargetResult, TargetStatus};
use crate::runners::{run_platform, RunOutcome, ToolCommands};
use crate::workspace::{Workspace, WorkspaceAllocator};

const FAIL_BANNER: &str = "*FAIL!*";
const RULE: &str = "----------------------------------------";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepPolicy {
    Discard,
    Failed,
    All,
}

impl KeepPolicy {
    fn keeps(self, failed: bool) -> bool {
        match self {
            KeepPolicy::Discard => false,
            KeepPolicy::Failed => failed,
            KeepPolicy::All => true,
        }
    }
}

pub struct SuiteConfig {
    pub compiler: std::path::PathBuf,
    pub tests_root: std::path::PathBuf,
    pub tools: ToolCommands,
    pub timeout: Duration,
    pub fail_fast: bool,
    pub keep: KeepPolicy,
    pub filter: Option<String>,
    pub exact: bool,
    pub verbose: bool,
}

impl SuiteConfig {
    pub fn matches_filter(&self, id: &str) -> bool {
        match &self.filter {
            None => true,
            Some(f) if self.exact => id == f.as_str(),
            Some(f) => id.contains(f.as_str()),
        }
    }
}

pub fn run_functional_suite(
    cfg: &SuiteConfig,
    platforms: &[TargetLanguage],
    alloc: &mut WorkspaceAllocator,
) -> Result<Vec<CaseResult>> {
    let cases = catalog::discover_functional(&cfg.tests_root.join(catalog::FUNCTIONAL_DIR))?;
    let support =
        load_support_files(&cfg.tests_root.join(catalog::SUPPORT_DIR), alloc.rng_mut())?;

    let mut out = Vec::new();
    for case in cases {
        if !cfg.matches_filter(&case.id) {
            continue;
        }
        out.push(run_functional_case(cfg, &case, platforms, &support, alloc));
    }
    Ok(out)
}

fn run_functional_case(
    cfg: &SuiteConfig,
    case: &FunctionalCase,
    platforms: &[TargetLanguage],
    support: &[(String, String)],
    alloc: &mut WorkspaceAllocator,
) -> CaseResult {
    let start = Instant::now();
    let mut result = CaseResult::new(&case.id, "fvt");

    let mut ws = match alloc.allocate(Some(&case.id)) {
        Ok(ws) => ws,
        Err(err) => {
            eprintln!("error: {}: {err:#}", case.id);
            result.diags.push(Diag::new("EWORKSPACE", format!("{err:#}")));
            result.duration_ms = start.elapsed().as_millis() as u64;
            return result;
        }
    };

    let staged = match stage_functional_workspace(ws.path(), &case.code, support) {
        Ok(staged) => staged,
        Err(err) => {
            eprintln!("error: {}: {err:#}", case.id);
            result.diags.push(Diag::new("ESTAGE", format!("{err:#}")));
            return finish_case(result, &mut ws, cfg, start);
        }
    };

    let mut first_failure: Option<CaseStatus> = None;
    for &platform in platforms {
        if first_failure.is_some() && cfg.fail_fast {
            result.targets.push(TargetResult {
                platform: platform.tag().to_string(),
                status: TargetStatus::Skipped,
                output: None,
            });
            continue;
        }

        println!("Running FVT: {} [{}]", case.id, platform.tag());
        let target = run_one_target(cfg, platform, &staged, ws.path());
        if first_failure.is_none() {
            first_failure = match target.status {
                TargetStatus::Pass | TargetStatus::Skipped => None,
                TargetStatus::CompilerFailure => Some(CaseStatus::CompilerFailure),
                TargetStatus::BuildFailure => Some(CaseStatus::BuildFailure),
                TargetStatus::RuntimeFailure => Some(CaseStatus::RuntimeFailure),
            };
        }
        result.targets.push(target);
    }

    result.status = first_failure.unwrap_or(CaseStatus::Pass);
    finish_case(result, &mut ws, cfg, start)
}

fn run_one_target(
    cfg: &SuiteConfig,
    platform: TargetLanguage,
    staged: &StagedCase,
    workspace: &std::path::Path,
) -> TargetResult {
    let compile = invoke_compiler(
        &cfg.compiler,
        &staged.manifest_path,
        platform.tag(),
        cfg.timeout,
    );
    let failure = |status: TargetStatus, output: String| TargetResult {
        platform: platform.tag().to_string(),
        status,
        output: Some(output),
    };

    match compile {
        Err(err) => {
            let output = format!("{err:#}");
            print_fail_banner(" -- Pastel compilation", &output);
            return failure(TargetStatus::CompilerFailure, output);
        }
        Ok(out) => {
            let diag = out.stdout_trimmed();
            if out.timed_out {
                let output = "compiler timed out".to_string();
                print_fail_banner(" -- Pastel compilation", &output);
                return failure(TargetStatus::CompilerFailure, output);
            }
            if !diag.is_empty() || !out.exited_cleanly() {
                let output = if diag.is_empty() {
                    format!("compiler exited with status {:?}", out.exit_code)
                } else {
                    diag.to_string()
                };
                print_fail_banner(" -- Pastel compilation", &output);
                return failure(TargetStatus::CompilerFailure, output);
            }
        }
    }

    match run_platform(platform, workspace, &cfg.tools, cfg.timeout) {
        RunOutcome::Ok => TargetResult {
            platform: platform.tag().to_string(),
            status: TargetStatus::Pass,
            output: None,
        },
        RunOutcome::BuildFailed { output } => {
            print_fail_banner(build_stage_suffix(platform), &output);
            failure(TargetStatus::BuildFailure, output)
        }
        RunOutcome::RunFailed { output } => {
            print_fail_banner("", &output);
            failure(TargetStatus::RuntimeFailure, output)
        }
    }
}

fn build_stage_suffix(platform: TargetLanguage) -> &'static str {
    match platform {
        TargetLanguage::Java => " -- Java compilation",
        TargetLanguage::Csharp => " -- C# compilation",
        TargetLanguage::Js | TargetLanguage::Python => "",
    }
}

fn print_fail_banner(stage_suffix: &str, output: &str) {
    println!("{FAIL_BANNER}{stage_suffix}");
    if !output.is_empty() {
        println!("{output}");
    }
}

pub fn run_error_suite(cfg: &SuiteConfig, alloc: &mut WorkspaceAllocator) -> Result<Vec<CaseResult>> {
    let loads = catalog::discover_error(&cfg.tests_root.join(catalog::ERRORS_DIR))?;

    let mut out = Vec::new();
    for load in loads {
        if !cfg.matches_filter(load.id()) {
            continue;
        }
        match load {
            ErrorCaseLoad::Invalid { id, message } => {
                println!("Running Error Test: {id}");
                println!("FAIL!");
                println!("{message}");
                let mut result = CaseResult::new(&id, "errors");
                result.status = CaseStatus::FixtureError;
                result.diags.push(Diag::new("EFIXTURE", message));
                out.push(result);
            }
            ErrorCaseLoad::Case(case) => out.push(run_error_case(cfg, &case, alloc)),
        }
    }
    Ok(out)
}

fn run_error_case(
    cfg: &SuiteConfig,
    case: &ErrorCase,
    alloc: &mut WorkspaceAllocator,
) -> CaseResult {
    let start = Instant::now();
    let mut result = CaseResult::new(&case.id, "errors");

    println!("Running Error Test: {}", case.id);

    let mut ws = match alloc.allocate(Some(&case.id)) {
        Ok(ws) => ws,
        Err(err) => {
            eprintln!("error: {}: {err:#}", case.id);
            result.diags.push(Diag::new("EWORKSPACE", format!("{err:#}")));
            result.duration_ms = start.elapsed().as_millis() as u64;
            return result;
        }
    };

    let staged = match stage_error_workspace(ws.path(), case) {
        Ok(staged) => staged,
        Err(err) => {
            eprintln!("error: {}: {err:#}", case.id);
            result.diags.push(Diag::new("ESTAGE", format!("{err:#}")));
            return finish_case(result, &mut ws, cfg, start);
        }
    };

    // The compiler is expected to reject the source, so its exit status is
    // irrelevant here; the diagnostic text on stdout is the verdict.
    let out = match invoke_compiler(&cfg.compiler, &staged.manifest_path, "test", cfg.timeout) {
        Ok(out) => out,
        Err(err) => {
            let output = format!("{err:#}");
            println!("FAIL!");
            println!("{output}");
            result.status = CaseStatus::CompilerFailure;
            result.diags.push(Diag::new("ECOMPILER", output));
            return finish_case(result, &mut ws, cfg, start);
        }
    };
    if out.timed_out {
        println!("FAIL!");
        println!("compiler timed out");
        result.status = CaseStatus::CompilerFailure;
        result.diags.push(Diag::new("ECOMPILER", "compiler timed out"));
        return finish_case(result, &mut ws, cfg, start);
    }

    let source_path = staged.source_path.display().to_string();
    let actual = rewrite_source_path(&normalize(&out.stdout), &source_path);
    let expected = normalize(&case.expected);

    if diagnostics_match(&expected, &actual) {
        result.status = CaseStatus::Pass;
    } else {
        result.status = CaseStatus::Mismatch;
        println!("FAIL!");
        println!("BUILD FILE:");
        println!("  {}", staged.manifest_path.display());
        println!("{RULE}");
        println!("Expected:\n{expected}");
        println!("{RULE}");
        println!("Actual:\n{actual}");
        println!("{RULE}");
        result.expected = Some(expected);
        result.actual = Some(actual);
    }

    finish_case(result, &mut ws, cfg, start)
}

fn finish_case(
    mut result: CaseResult,
    ws: &mut Workspace,
    cfg: &SuiteConfig,
    start: Instant,
) -> CaseResult {
    result.duration_ms = start.elapsed().as_millis() as u64;
    if cfg.keep.keeps(!result.status.is_pass()) {
        ws.retain();
        result.workspace = Some(ws.path().display().to_string());
        if cfg.verbose {
            eprintln!("workspace kept: {}", ws.path().display());
        }
    }
    result
}
