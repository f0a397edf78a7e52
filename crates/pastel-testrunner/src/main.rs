use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;

use pastel_targets::{TargetLanguage, ALL_TARGETS};

mod catalog;
mod compare;
mod fixture;
mod invoke;
mod manifest;
mod report;
mod rng;
mod runners;
mod suite;
mod workspace;

use report::{compute_exit_code, print_summary_line, summarize, InvocationInfo, TestReport};
use runners::ToolCommands;
use suite::{run_error_suite, run_functional_suite, KeepPolicy, SuiteConfig};
use workspace::WorkspaceAllocator;

#[derive(Parser, Debug)]
#[command(name = "pastel-testrunner")]
#[command(about = "Conformance test runner for the Pastel compiler.", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the pastel compiler binary.
    compiler: PathBuf,

    /// Run the diagnostic (error) test suite.
    #[arg(long)]
    errtests: bool,

    /// Functional-suite platform to run. May be passed multiple times.
    #[arg(long = "fvt", value_enum, value_name = "PLATFORM")]
    fvt: Vec<TargetLanguage>,

    /// Run the functional suite on every supported platform.
    #[arg(long)]
    fvt_all: bool,

    /// Directory containing the fvt/, fvt-lib/, and errors/ fixture trees.
    #[arg(long, value_name = "DIR", default_value = "tests")]
    tests_root: PathBuf,

    /// Scratch root for generated workspaces. Defaults to <tests-root>/tmp.
    #[arg(long, value_name = "DIR")]
    tmp_root: Option<PathBuf>,

    #[arg(long, value_name = "SUBSTR")]
    filter: Option<String>,

    #[arg(long)]
    exact: bool,

    /// List the selected test cases and exit.
    #[arg(long)]
    list: bool,

    /// Seed for workspace naming; omitted, a fresh seed is drawn from OS
    /// entropy (the seed in use is recorded in the report either way).
    #[arg(long, value_name = "N")]
    seed: Option<u64>,

    /// Keep every workspace instead of deleting it when its case finishes.
    #[arg(long)]
    keep_workspaces: bool,

    /// Keep the workspaces of failing cases for debugging.
    #[arg(long)]
    keep_failed: bool,

    /// Keep running the remaining platforms of a case after one fails.
    #[arg(long)]
    no_fail_fast: bool,

    /// Wall timeout for each toolchain child process.
    #[arg(long, value_name = "SECS", default_value_t = 300)]
    timeout_secs: u64,

    #[arg(long, value_name = "PATH")]
    report_out: Option<PathBuf>,

    /// Print the JSON report to stdout instead of the summary line.
    #[arg(long)]
    json: bool,

    #[arg(long)]
    verbose: bool,

    #[arg(long, value_name = "CMD")]
    node_cmd: Option<String>,

    #[arg(long, value_name = "CMD")]
    python_cmd: Option<String>,

    #[arg(long, value_name = "CMD")]
    javac_cmd: Option<String>,

    #[arg(long, value_name = "CMD")]
    java_cmd: Option<String>,

    #[arg(long, value_name = "CMD")]
    dotnet_cmd: Option<String>,
}

fn main() -> std::process::ExitCode {
    match try_main() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            std::process::ExitCode::from(2)
        }
    }
}

fn try_main() -> Result<std::process::ExitCode> {
    let started = Instant::now();
    let cli = Cli::parse();

    if !cli.compiler.exists() {
        anyhow::bail!("compiler path does not exist: {}", cli.compiler.display());
    }
    let compiler = cli
        .compiler
        .canonicalize()
        .with_context(|| format!("canonicalize compiler path: {}", cli.compiler.display()))?;

    let platforms: Vec<TargetLanguage> = ALL_TARGETS
        .into_iter()
        .filter(|lang| cli.fvt_all || cli.fvt.contains(lang))
        .collect();

    if platforms.is_empty() && !cli.errtests && !cli.list {
        anyhow::bail!("nothing to do: pass --fvt <platform>, --fvt-all, and/or --errtests");
    }

    let seed = match cli.seed {
        Some(seed) => seed,
        None => rng::entropy_seed()?,
    };

    let tmp_root = cli
        .tmp_root
        .clone()
        .unwrap_or_else(|| cli.tests_root.join("tmp"));

    let mut tools = ToolCommands::default();
    if let Some(cmd) = cli.node_cmd.clone() {
        tools.node = cmd;
    }
    if let Some(cmd) = cli.python_cmd.clone() {
        tools.python = cmd;
    }
    if let Some(cmd) = cli.javac_cmd.clone() {
        tools.javac = cmd;
    }
    if let Some(cmd) = cli.java_cmd.clone() {
        tools.java = cmd;
    }
    if let Some(cmd) = cli.dotnet_cmd.clone() {
        tools.dotnet = cmd;
    }

    let keep = if cli.keep_workspaces {
        KeepPolicy::All
    } else if cli.keep_failed {
        KeepPolicy::Failed
    } else {
        KeepPolicy::Discard
    };

    let cfg = SuiteConfig {
        compiler,
        tests_root: cli.tests_root.clone(),
        tools,
        timeout: Duration::from_secs(cli.timeout_secs.max(1)),
        fail_fast: !cli.no_fail_fast,
        keep,
        filter: cli.filter.clone(),
        exact: cli.exact,
        verbose: cli.verbose,
    };

    if cli.list {
        return list_cases(&cli, &cfg, &platforms);
    }

    if cli.verbose {
        eprintln!(
            "pastel-testrunner: platforms=[{}] errtests={} seed={}",
            platforms
                .iter()
                .map(|l| l.tag())
                .collect::<Vec<_>>()
                .join(","),
            cli.errtests,
            seed
        );
    }

    let mut alloc = WorkspaceAllocator::new(tmp_root, rng::NameRng::seeded(seed));

    let mut cases = Vec::new();
    if !platforms.is_empty() {
        cases.extend(run_functional_suite(&cfg, &platforms, &mut alloc)?);
    }
    if cli.errtests {
        cases.extend(run_error_suite(&cfg, &mut alloc)?);
    }

    let summary = summarize(&cases, started.elapsed());
    let exit_code = compute_exit_code(&summary);

    let invocation = InvocationInfo {
        argv: std::env::args().collect(),
        cwd: std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .display()
            .to_string(),
        compiler: cfg.compiler.display().to_string(),
        seed,
        fail_fast: cfg.fail_fast,
        platforms: platforms.iter().map(|l| l.tag().to_string()).collect(),
        errtests: cli.errtests,
    };
    let report = TestReport::new(invocation, summary, cases);

    if let Some(out_path) = &cli.report_out {
        report::write_report(out_path, &report)?;
        if cli.verbose {
            eprintln!("report written: {}", out_path.display());
        }
    }

    if cli.json {
        println!("{}", serde_json::to_string(&report)?);
    } else {
        print_summary_line(&report.summary, exit_code);
    }

    Ok(std::process::ExitCode::from(exit_code))
}

fn list_cases(
    cli: &Cli,
    cfg: &SuiteConfig,
    platforms: &[TargetLanguage],
) -> Result<std::process::ExitCode> {
    let list_fvt = !platforms.is_empty() || !cli.errtests;
    let list_errors = cli.errtests || platforms.is_empty();

    if list_fvt {
        let cases =
            catalog::discover_functional(&cfg.tests_root.join(catalog::FUNCTIONAL_DIR))?;
        for case in cases {
            if cfg.matches_filter(&case.id) {
                println!("fvt\t{}", case.id);
            }
        }
    }
    if list_errors {
        let loads = catalog::discover_error(&cfg.tests_root.join(catalog::ERRORS_DIR))?;
        for load in loads {
            if cfg.matches_filter(load.id()) {
                println!("errors\t{}", load.id());
            }
        }
    }
    Ok(std::process::ExitCode::SUCCESS)
}
