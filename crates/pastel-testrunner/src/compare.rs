//! Output normalization and comparison.
//!
//! Workspace names are random, so diagnostics that embed the absolute path of
//! the staged source file are rewritten to the canonical `test.pst`
//! placeholder before comparison. Comparison itself is exact string equality
//! after normalization; there is no fuzzy matching.

use pastel_contracts::SOURCE_FIXTURE_FILE;

/// Canonicalize line endings and strip symmetric whitespace.
pub fn normalize(text: &str) -> String {
    text.replace("\r\n", "\n").trim().to_string()
}

/// Replace the absolute staged-source path with `test.pst`. Plain substring
/// replacement, so applying it twice is a no-op.
pub fn rewrite_source_path(text: &str, source_path: &str) -> String {
    text.replace(source_path, SOURCE_FIXTURE_FILE)
}

pub fn diagnostics_match(expected: &str, actual: &str) -> bool {
    normalize(expected) == normalize(actual)
}
