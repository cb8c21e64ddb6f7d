//! Decorative commit message synthesis.
//!
//! Messages are built by picking one phrase from each of three word lists.
//! The randomness is injected through [`IndexSource`] so callers control it.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const PREFIXES: &[&str] = &[
    "✨ Add",
    "🔧 Fix",
    "♻️ Refactor",
    "⚡ Improve",
    "🎨 Enhance",
    "🚀 Optimize",
    "📝 Update",
    "🗑️ Remove",
    "🔨 Modify",
    "🏗️ Restructure",
    "🧹 Clean up",
    "🔒 Secure",
    "📦 Bundle",
    "🎯 Focus",
    "💡 Implement",
    "🔀 Merge",
];

const AREAS: &[&str] = &[
    "codebase",
    "functionality",
    "architecture",
    "UI/UX",
    "performance",
    "documentation",
    "configuration",
    "dependencies",
    "features",
    "components",
    "API endpoints",
    "database schema",
    "test coverage",
    "error handling",
    "user experience",
    "code quality",
    "security measures",
    "build process",
];

const DETAILS: &[&str] = &[
    "for better maintainability",
    "to improve user experience",
    "for compatibility with latest standards",
    "to address technical debt",
    "for enhanced security",
    "to optimize resource usage",
    "based on user feedback",
    "following best practices",
    "to meet accessibility standards",
    "for improved performance",
    "to reduce complexity",
    "for better error handling",
    "to enhance readability",
    "for future scalability",
];

/// Supplies uniformly distributed indices.
pub trait IndexSource {
    /// Returns an index in `0..upper`. `upper` is never zero.
    fn next_index(&mut self, upper: usize) -> usize;
}

/// [`IndexSource`] backed by a `rand` generator.
#[derive(Debug, Clone)]
pub struct RandomIndex<R> {
    rng: R,
}

impl<R: Rng> RandomIndex<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RandomIndex<StdRng> {
    /// Seeds a standard generator from the operating system.
    pub fn from_os_rng() -> Self {
        Self::new(StdRng::from_os_rng())
    }
}

impl<R: Rng> IndexSource for RandomIndex<R> {
    fn next_index(&mut self, upper: usize) -> usize {
        self.rng.random_range(0..upper)
    }
}

/// Builds a "prefix area detail" commit message.
pub fn synthesize_commit_message(source: &mut dyn IndexSource) -> String {
    let prefix = pick(source, PREFIXES);
    let area = pick(source, AREAS);
    let detail = pick(source, DETAILS);
    format!("{prefix} {area} {detail}")
}

fn pick(source: &mut dyn IndexSource, words: &[&'static str]) -> &'static str {
    // An out-of-range index from a misbehaving source wraps instead of panicking.
    words[source.next_index(words.len()) % words.len()]
}
