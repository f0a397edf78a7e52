//! Stand-in compiler honoring the `pastel <manifest> <target>` contract,
//! used by the harness's own integration tests.
//!
//! Behavior is driven by environment variables:
//! - `FAKE_PASTEL_DIAG`: print this diagnostic (with `{source}` expanded to
//!   the absolute path of the staged source file) and exit 1.
//! - `FAKE_PASTEL_FAIL_TARGET`: with `FAKE_PASTEL_DIAG` set, only the named
//!   target fails; every other target compiles silently.
//!
//! Without a diagnostic configured, the declared output files of the
//! selected target are written and nothing is printed, which is the success
//! convention real compilations follow.

use std::path::Path;

use anyhow::{Context, Result};

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
    let args: Vec<String> = std::env::args().skip(1).collect();
    let [manifest_path, target_name] = args.as_slice() else {
        anyhow::bail!("usage: fake-pastel <manifest> <target>");
    };

    let bytes = std::fs::read(manifest_path)
        .with_context(|| format!("read manifest: {manifest_path}"))?;
    let doc: serde_json::Value = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse manifest JSON: {manifest_path}"))?;

    let manifest_dir = Path::new(manifest_path).parent().unwrap_or(Path::new("."));
    let source_rel = doc
        .get("source")
        .and_then(|v| v.as_str())
        .context("manifest: missing source")?;
    let source_path = manifest_dir.join(source_rel);

    let diag = std::env::var("FAKE_PASTEL_DIAG").ok();
    let fail_target = std::env::var("FAKE_PASTEL_FAIL_TARGET").ok();
    if let Some(diag) = diag {
        let fails = match fail_target {
            Some(fail_target) => fail_target == *target_name,
            None => true,
        };
        if fails {
            println!("{}", diag.replace("{source}", &source_path.display().to_string()));
            return Ok(std::process::ExitCode::from(1));
        }
    }

    let targets = doc
        .get("targets")
        .and_then(|v| v.as_array())
        .context("manifest: missing targets")?;
    let target = targets
        .iter()
        .find(|t| t.get("name").and_then(|n| n.as_str()) == Some(target_name.as_str()))
        .with_context(|| format!("manifest has no target named {target_name:?}"))?;

    let functions_path = target
        .get("output")
        .and_then(|o| o.get("functions-path"))
        .and_then(|v| v.as_str())
        .with_context(|| format!("target {target_name:?} has no output.functions-path"))?;

    let out_path = manifest_dir.join(functions_path);
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir: {}", parent.display()))?;
    }
    std::fs::write(&out_path, "// generated by fake-pastel\n")
        .with_context(|| format!("write output: {}", out_path.display()))?;

    Ok(std::process::ExitCode::SUCCESS)
}
