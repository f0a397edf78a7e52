use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::Value;

fn runner_exe() -> &'static str {
    env!("CARGO_BIN_EXE_pastel-testrunner")
}

fn fake_pastel() -> &'static str {
    env!("CARGO_BIN_EXE_fake-pastel")
}

fn fake_runtime() -> &'static str {
    env!("CARGO_BIN_EXE_fake-runtime")
}

/// Fresh `tests/` fixture tree under the target tmp dir, pre-populated with
/// the support files every functional workspace receives.
fn setup_tests_root(test: &str) -> PathBuf {
    let root = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join(test);
    let _ = std::fs::remove_dir_all(&root);
    let tests = root.join("tests");
    for sub in ["fvt", "fvt-lib", "errors"] {
        std::fs::create_dir_all(tests.join(sub)).unwrap();
    }
    write(
        &tests.join("fvt-lib").join("index.js"),
        "import PST from './gen.js';\n\nPST.registerExtension('fail', (args) => { throw new Error(args[0]); });\nPST.runner();\n",
    );
    write(&tests.join("fvt-lib").join("main.py"), "import pygen\npygen.V_runner()\n");
    write(
        &tests.join("fvt-lib").join("PastelTest.java"),
        "public class PastelTest {\n  public static void main(String[] args) {\n    FunctionWrapper.runner();\n  }\n}\n",
    );
    write(
        &tests.join("fvt-lib").join("PastelTest.sln"),
        "Project(\"{PROJ_GUID}\") = \"PastelTest\"\nGlobal\n  SolutionGuid = {SOLUTION_GUID}\nEndGlobal\n",
    );
    tests
}

fn write(path: &Path, content: &str) {
    std::fs::write(path, content).unwrap_or_else(|e| panic!("write {}: {e}", path.display()));
}

fn run_harness(tests_root: &Path, args: &[&str], envs: &[(&str, &str)]) -> Output {
    let mut cmd = Command::new(runner_exe());
    cmd.arg(fake_pastel());
    cmd.args(["--tests-root", tests_root.to_str().unwrap()]);
    cmd.args(args);
    for (key, value) in envs {
        cmd.env(key, value);
    }
    cmd.output().expect("run pastel-testrunner")
}

fn stdout_of(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr_of(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

fn read_report(path: &Path) -> Value {
    let text = std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("read report {}: {e}", path.display()));
    serde_json::from_str(&text).expect("parse report JSON")
}

fn tmp_entries(tests_root: &Path) -> Vec<String> {
    let tmp = tests_root.join("tmp");
    if !tmp.is_dir() {
        return Vec::new();
    }
    let mut names: Vec<String> = std::fs::read_dir(&tmp)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn error_suite_passes_on_exact_diagnostic() {
    let tests = setup_tests_root("err-pass");
    write(
        &tests.join("errors").join("divide-by-zero[js].txt"),
        "x = 1 / 0\n###\nError: division by zero at line 1 [test.pst]\n",
    );
    let report_path = tests.join("report.json");

    let out = run_harness(
        &tests,
        &["--errtests", "--seed", "7", "--report-out", report_path.to_str().unwrap()],
        &[("FAKE_PASTEL_DIAG", "Error: division by zero at line 1 [{source}]")],
    );

    let stdout = stdout_of(&out);
    assert_eq!(out.status.code(), Some(0), "stdout:\n{stdout}");
    assert!(stdout.contains("Running Error Test: divide-by-zero[js]"));
    assert!(!stdout.contains("FAIL!"), "stdout:\n{stdout}");

    let report = read_report(&report_path);
    assert_eq!(report["schema_version"], "pastel.testrunner.report@0.1.0");
    assert_eq!(report["summary"]["passed"], 1);
    assert_eq!(report["summary"]["failed"], 0);
    assert_eq!(report["invocation"]["seed"], 7);
    assert_eq!(report["cases"][0]["id"], "divide-by-zero[js]");
    assert_eq!(report["cases"][0]["suite"], "errors");
    assert_eq!(report["cases"][0]["status"], "pass");

    // Workspaces are released on success.
    assert!(tmp_entries(&tests).is_empty());
}

#[test]
fn error_suite_reports_mismatch_with_both_texts() {
    let tests = setup_tests_root("err-mismatch");
    write(
        &tests.join("errors").join("divide-by-zero[js].txt"),
        "x = 1 / 0\n###\nError: division by zero at line 1 [test.pst]\n",
    );
    let report_path = tests.join("report.json");
    let envs = [(
        "FAKE_PASTEL_DIAG",
        "Error: division by zero at line 2 [{source}]",
    )];

    let out = run_harness(
        &tests,
        &["--errtests", "--report-out", report_path.to_str().unwrap()],
        &envs,
    );

    let stdout = stdout_of(&out);
    assert_eq!(out.status.code(), Some(10), "stdout:\n{stdout}");
    assert!(stdout.contains("FAIL!"));
    assert!(stdout.contains("BUILD FILE:"));
    assert!(stdout.contains("Expected:\nError: division by zero at line 1 [test.pst]"));
    assert!(stdout.contains("Actual:\nError: division by zero at line 2 [test.pst]"));

    let report = read_report(&report_path);
    assert_eq!(report["summary"]["failed"], 1);
    assert_eq!(report["summary"]["mismatches"], 1);
    assert_eq!(report["cases"][0]["status"], "mismatch");
    assert_eq!(
        report["cases"][0]["expected"],
        "Error: division by zero at line 1 [test.pst]"
    );
    assert_eq!(
        report["cases"][0]["actual"],
        "Error: division by zero at line 2 [test.pst]"
    );
    assert!(tmp_entries(&tests).is_empty());

    // Same run with --keep-failed retains the workspace for debugging.
    let out = run_harness(&tests, &["--errtests", "--keep-failed"], &envs);
    assert_eq!(out.status.code(), Some(10));
    let kept = tmp_entries(&tests);
    assert_eq!(kept.len(), 1);
    assert!(kept[0].starts_with("divide-by-zero[js]_"));
}

#[test]
fn malformed_error_fixtures_are_reported_not_run() {
    let tests = setup_tests_root("err-fixture");
    write(&tests.join("errors").join("broken.txt"), "no divider anywhere\n");
    write(&tests.join("errors").join("weird[php].txt"), "x\n###\nError\n");
    let report_path = tests.join("report.json");

    let out = run_harness(
        &tests,
        &["--errtests", "--report-out", report_path.to_str().unwrap()],
        &[],
    );

    let stdout = stdout_of(&out);
    assert_eq!(out.status.code(), Some(12), "stdout:\n{stdout}");
    assert!(stdout.contains("invalid test file"));
    assert!(stdout.contains("[php]"));

    let report = read_report(&report_path);
    assert_eq!(report["summary"]["fixture_errors"], 2);
    assert_eq!(report["summary"]["passed"], 0);
    assert_eq!(report["cases"][0]["status"], "fixture_error");
    assert_eq!(report["cases"][1]["status"], "fixture_error");
}

#[test]
fn fvt_js_case_passes_and_stages_all_targets() {
    let tests = setup_tests_root("fvt-pass");
    write(&tests.join("fvt").join("hello.pst"), "print(1)\n");
    let report_path = tests.join("report.json");

    let out = run_harness(
        &tests,
        &[
            "--fvt",
            "js",
            "--node-cmd",
            fake_runtime(),
            "--seed",
            "1",
            "--keep-workspaces",
            "--report-out",
            report_path.to_str().unwrap(),
        ],
        &[],
    );

    let stdout = stdout_of(&out);
    assert_eq!(out.status.code(), Some(0), "stdout:\n{stdout}");
    assert!(stdout.contains("Running FVT: hello [js]"));

    let report = read_report(&report_path);
    assert_eq!(report["summary"]["passed"], 1);
    assert_eq!(report["cases"][0]["suite"], "fvt");
    assert_eq!(report["cases"][0]["targets"][0]["platform"], "js");
    assert_eq!(report["cases"][0]["targets"][0]["status"], "pass");

    // Inspect the retained workspace: manifest with all four targets, staged
    // fixture, support files, templated solution GUIDs, export snippet.
    let kept = tmp_entries(&tests);
    assert_eq!(kept.len(), 1);
    assert!(kept[0].starts_with("hello_"));
    let ws = tests.join("tmp").join(&kept[0]);

    let manifest: Value =
        serde_json::from_str(&std::fs::read_to_string(ws.join("test.json")).unwrap()).unwrap();
    let names: Vec<&str> = manifest["targets"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["csharp", "java", "js", "python"]);

    assert_eq!(std::fs::read_to_string(ws.join("test.pst")).unwrap(), "print(1)\n");
    assert!(ws.join("index.js").is_file());
    assert!(ws.join("main.py").is_file());
    assert!(ws.join("PastelTest.java").is_file());

    let sln = std::fs::read_to_string(ws.join("PastelTest.sln")).unwrap();
    assert!(!sln.contains("PROJ_GUID"));
    assert!(!sln.contains("SOLUTION_GUID"));

    let gen = std::fs::read_to_string(ws.join("gen.js")).unwrap();
    assert!(gen.ends_with(
        "export default { runner, registerExtension: PASTEL_regCallback };\n"
    ));
}

#[test]
fn runtime_failure_aborts_remaining_targets() {
    let tests = setup_tests_root("fvt-failfast");
    write(&tests.join("fvt").join("boom.pst"), "assert_fail()\n");
    let report_path = tests.join("report.json");

    let out = run_harness(
        &tests,
        &[
            "--fvt",
            "js",
            "--fvt",
            "python",
            "--node-cmd",
            fake_runtime(),
            "--python-cmd",
            fake_runtime(),
            "--report-out",
            report_path.to_str().unwrap(),
        ],
        &[
            ("FAKE_RUNTIME_MATCH_ARG", "index.js"),
            ("FAKE_RUNTIME_STDOUT", "FAIL! assertion blew up"),
        ],
    );

    let stdout = stdout_of(&out);
    assert_eq!(out.status.code(), Some(10), "stdout:\n{stdout}");
    assert!(stdout.contains("Running FVT: boom [js]"));
    assert!(stdout.contains("*FAIL!*"));
    assert!(stdout.contains("FAIL! assertion blew up"));
    assert!(!stdout.contains("[python]"), "stdout:\n{stdout}");

    let report = read_report(&report_path);
    assert_eq!(report["summary"]["runtime_failures"], 1);
    assert_eq!(report["cases"][0]["status"], "runtime_failure");
    let targets = report["cases"][0]["targets"].as_array().unwrap();
    assert_eq!(targets.len(), 2);
    assert_eq!(targets[0]["platform"], "js");
    assert_eq!(targets[0]["status"], "runtime_failure");
    assert_eq!(targets[0]["output"], "FAIL! assertion blew up");
    assert_eq!(targets[1]["platform"], "python");
    assert_eq!(targets[1]["status"], "skipped");
}

#[test]
fn no_fail_fast_runs_remaining_targets() {
    let tests = setup_tests_root("fvt-nofailfast");
    write(&tests.join("fvt").join("boom.pst"), "assert_fail()\n");
    let report_path = tests.join("report.json");

    let out = run_harness(
        &tests,
        &[
            "--fvt",
            "js",
            "--fvt",
            "python",
            "--no-fail-fast",
            "--node-cmd",
            fake_runtime(),
            "--python-cmd",
            fake_runtime(),
            "--report-out",
            report_path.to_str().unwrap(),
        ],
        &[
            ("FAKE_RUNTIME_MATCH_ARG", "index.js"),
            ("FAKE_RUNTIME_STDOUT", "FAIL! assertion blew up"),
        ],
    );

    let stdout = stdout_of(&out);
    assert_eq!(out.status.code(), Some(10), "stdout:\n{stdout}");
    assert!(stdout.contains("Running FVT: boom [python]"));

    let report = read_report(&report_path);
    assert_eq!(report["invocation"]["fail_fast"], false);
    let targets = report["cases"][0]["targets"].as_array().unwrap();
    assert_eq!(targets[0]["status"], "runtime_failure");
    assert_eq!(targets[1]["status"], "pass");
    assert_eq!(report["cases"][0]["status"], "runtime_failure");
}

#[test]
fn compiler_diagnostic_on_positive_case_is_a_compiler_failure() {
    let tests = setup_tests_root("fvt-compilerfail");
    write(&tests.join("fvt").join("hello.pst"), "print(1)\n");
    let report_path = tests.join("report.json");

    let out = run_harness(
        &tests,
        &[
            "--fvt",
            "js",
            "--node-cmd",
            fake_runtime(),
            "--report-out",
            report_path.to_str().unwrap(),
        ],
        &[
            ("FAKE_PASTEL_DIAG", "unexpected token at line 3 [{source}]"),
            ("FAKE_PASTEL_FAIL_TARGET", "js"),
        ],
    );

    let stdout = stdout_of(&out);
    assert_eq!(out.status.code(), Some(10), "stdout:\n{stdout}");
    assert!(stdout.contains("*FAIL!* -- Pastel compilation"));
    assert!(stdout.contains("unexpected token at line 3"));

    let report = read_report(&report_path);
    assert_eq!(report["summary"]["compiler_failures"], 1);
    assert_eq!(report["cases"][0]["status"], "compiler_failure");
    assert_eq!(report["cases"][0]["targets"][0]["status"], "compiler_failure");
}

#[test]
fn java_build_failure_stops_before_execution() {
    let tests = setup_tests_root("fvt-javabuild");
    write(&tests.join("fvt").join("javacase.pst"), "print(1)\n");
    let report_path = tests.join("report.json");

    let out = run_harness(
        &tests,
        &[
            "--fvt",
            "java",
            "--javac-cmd",
            fake_runtime(),
            "--java-cmd",
            fake_runtime(),
            "--report-out",
            report_path.to_str().unwrap(),
        ],
        &[
            ("FAKE_RUNTIME_MATCH_ARG", "FunctionWrapper.java"),
            ("FAKE_RUNTIME_STDOUT", "FunctionWrapper.java:4: error: kaboom"),
        ],
    );

    let stdout = stdout_of(&out);
    assert_eq!(out.status.code(), Some(10), "stdout:\n{stdout}");
    assert!(stdout.contains("*FAIL!* -- Java compilation"));
    assert!(stdout.contains("error: kaboom"));

    let report = read_report(&report_path);
    assert_eq!(report["summary"]["build_failures"], 1);
    assert_eq!(report["cases"][0]["targets"][0]["status"], "build_failure");
}

#[test]
fn dotnet_build_without_success_marker_is_a_build_failure() {
    let tests = setup_tests_root("fvt-dotnetbuild");
    write(&tests.join("fvt").join("cscase.pst"), "print(1)\n");
    let report_path = tests.join("report.json");

    let out = run_harness(
        &tests,
        &[
            "--fvt",
            "csharp",
            "--dotnet-cmd",
            fake_runtime(),
            "--report-out",
            report_path.to_str().unwrap(),
        ],
        &[("FAKE_RUNTIME_BUILD_STDOUT", "Build FAILED.\n    2 Error(s)")],
    );

    let stdout = stdout_of(&out);
    assert_eq!(out.status.code(), Some(10), "stdout:\n{stdout}");
    assert!(stdout.contains("*FAIL!* -- C# compilation"));
    assert!(stdout.contains("Build FAILED."));

    let report = read_report(&report_path);
    assert_eq!(report["summary"]["build_failures"], 1);
    assert_eq!(report["cases"][0]["targets"][0]["status"], "build_failure");
}

#[test]
fn list_prints_selected_case_ids() {
    let tests = setup_tests_root("list");
    write(&tests.join("fvt").join("alpha.pst"), "print(1)\n");
    write(&tests.join("errors").join("beta.txt"), "x\n###\nError\n");

    let out = run_harness(&tests, &["--list", "--fvt", "js", "--errtests"], &[]);
    let stdout = stdout_of(&out);
    assert_eq!(out.status.code(), Some(0), "stdout:\n{stdout}");
    assert!(stdout.contains("fvt\talpha"));
    assert!(stdout.contains("errors\tbeta"));
    assert!(!stdout.contains("Running"));
}

#[test]
fn missing_compiler_path_is_a_startup_error() {
    let tests = setup_tests_root("nocompiler");
    let out = Command::new(runner_exe())
        .args([
            "/definitely/not/a/compiler",
            "--errtests",
            "--tests-root",
            tests.to_str().unwrap(),
        ])
        .output()
        .expect("run pastel-testrunner");
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr_of(&out).contains("compiler path does not exist"));
}

#[test]
fn nothing_to_do_is_a_startup_error() {
    let tests = setup_tests_root("nothing");
    let out = run_harness(&tests, &[], &[]);
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr_of(&out).contains("nothing to do"));
}

#[test]
fn seeded_runs_reuse_workspace_names() {
    let tests = setup_tests_root("seeded");
    write(&tests.join("fvt").join("hello.pst"), "print(1)\n");
    let args = [
        "--fvt",
        "js",
        "--node-cmd",
        fake_runtime(),
        "--seed",
        "42",
        "--keep-workspaces",
    ];

    let out = run_harness(&tests, &args, &[]);
    assert_eq!(out.status.code(), Some(0));
    let first = tmp_entries(&tests);
    assert_eq!(first.len(), 1);

    // Identical seed reproduces the name; the pre-existing directory must be
    // reused, not rejected.
    let out = run_harness(&tests, &args, &[]);
    assert_eq!(out.status.code(), Some(0), "stdout:\n{}", stdout_of(&out));
    assert_eq!(tmp_entries(&tests), first);
}

#[test]
fn json_mode_prints_report_to_stdout() {
    let tests = setup_tests_root("jsonmode");
    write(
        &tests.join("errors").join("case.txt"),
        "x\n###\nError: nope [test.pst]\n",
    );

    let out = run_harness(
        &tests,
        &["--errtests", "--json"],
        &[("FAKE_PASTEL_DIAG", "Error: nope [{source}]")],
    );
    assert_eq!(out.status.code(), Some(0));
    let stdout = stdout_of(&out);
    let last_line = stdout.lines().last().expect("report line");
    let report: Value = serde_json::from_str(last_line).expect("parse report JSON from stdout");
    assert_eq!(report["schema_version"], "pastel.testrunner.report@0.1.0");
    assert_eq!(report["summary"]["passed"], 1);
    assert_eq!(report["tool"]["name"], "pastel-testrunner");
}
