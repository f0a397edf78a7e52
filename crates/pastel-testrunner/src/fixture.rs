//! Negative-test fixture splitting.
//!
//! An error fixture is a single text file: source code, a divider line of
//! three or more `#` characters alone on its line, then the expected
//! diagnostic text.

use std::path::Path;

use anyhow::Result;

fn is_divider(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= 3 && trimmed.bytes().all(|b| b == b'#')
}

/// Split fixture content into (source code, expected diagnostic). The first
/// divider wins; a fixture without one is malformed and never yields an
/// empty expectation.
pub fn split_error_fixture(content: &str, path: &Path) -> Result<(String, String)> {
    let normalized = content.replace("\r\n", "\n");
    let lines: Vec<&str> = normalized.split('\n').collect();
    for (i, line) in lines.iter().enumerate() {
        if is_divider(line) {
            let code = lines[..i].join("\n").trim().to_string();
            let expected = lines[i + 1..].join("\n").trim().to_string();
            return Ok((code, expected));
        }
    }
    anyhow::bail!("invalid test file: {}", path.display())
}
