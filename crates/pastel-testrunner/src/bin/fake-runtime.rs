//! Stand-in for the per-target runtimes and build tools (`node`, `python3`,
//! `javac`, `java`, `dotnet`), used by the harness's own integration tests.
//!
//! - `fake-runtime build ...` prints `FAKE_RUNTIME_BUILD_STDOUT` (default
//!   `Build succeeded.`), covering the `dotnet build` marker convention.
//! - Any other invocation prints `FAKE_RUNTIME_STDOUT` (default: nothing);
//!   with `FAKE_RUNTIME_MATCH_ARG` set, only when some argv entry equals it.
//! - The exit code is `FAKE_RUNTIME_EXIT` (default 0).

fn main() -> std::process::ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let payload = if args.first().is_some_and(|a| a == "build") {
        std::env::var("FAKE_RUNTIME_BUILD_STDOUT").unwrap_or_else(|_| "Build succeeded.".to_string())
    } else {
        let selected = match std::env::var("FAKE_RUNTIME_MATCH_ARG") {
            Ok(needle) => args.iter().any(|a| *a == needle),
            Err(_) => true,
        };
        if selected {
            std::env::var("FAKE_RUNTIME_STDOUT").unwrap_or_default()
        } else {
            String::new()
        }
    };

    if !payload.is_empty() {
        println!("{payload}");
    }

    let code = std::env::var("FAKE_RUNTIME_EXIT")
        .ok()
        .and_then(|s| s.parse::<u8>().ok())
        .unwrap_or(0);
    std::process::ExitCode::from(code)
}
