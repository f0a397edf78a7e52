//! Shared target-language registry.
//!
//! This crate exists so both:
//! - the harness (Rust)
//! - the build-manifest contracts (Rust)
//!
//! can share an authoritative list of supported target languages and their
//! naming conventions.

/// One supported output language of the Pastel compiler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum TargetLanguage {
    Csharp,
    Java,
    Js,
    Python,
}

/// The four platforms in the canonical suite order.
pub const ALL_TARGETS: [TargetLanguage; 4] = [
    TargetLanguage::Csharp,
    TargetLanguage::Java,
    TargetLanguage::Js,
    TargetLanguage::Python,
];

impl TargetLanguage {
    /// Short tag used on the command line and in bracketed fixture ids.
    pub fn tag(self) -> &'static str {
        match self {
            TargetLanguage::Csharp => "csharp",
            TargetLanguage::Java => "java",
            TargetLanguage::Js => "js",
            TargetLanguage::Python => "python",
        }
    }

    /// Language id as it appears in the build manifest's `language` field.
    pub fn manifest_id(self) -> &'static str {
        match self {
            TargetLanguage::Csharp => "csharp",
            TargetLanguage::Java => "java",
            TargetLanguage::Js => "javascript",
            TargetLanguage::Python => "python",
        }
    }

    /// Conventional extension for generated source files, with the dot.
    pub fn source_ext(self) -> &'static str {
        match self {
            TargetLanguage::Csharp => ".cs",
            TargetLanguage::Java => ".java",
            TargetLanguage::Js => ".js",
            TargetLanguage::Python => ".py",
        }
    }

    /// True if generating code for this target needs a separate build step
    /// before anything can run.
    pub fn has_build_step(self) -> bool {
        matches!(self, TargetLanguage::Csharp | TargetLanguage::Java)
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "csharp" => Some(TargetLanguage::Csharp),
            "java" => Some(TargetLanguage::Java),
            "js" => Some(TargetLanguage::Js),
            "python" => Some(TargetLanguage::Python),
            _ => None,
        }
    }
}
