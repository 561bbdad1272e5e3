use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::ffi::OsStr;
use std::path::Path;
use tracing::debug;

/// Decides which directory entries are left out of a listing.
///
/// Only the bare entry name is passed in, never a path.
pub trait ExcludeMatcher: Send + Sync {
    fn is_excluded(&self, name: &OsStr) -> bool;
}

/// Keeps every entry
#[derive(Debug, Clone, Copy, Default)]
pub struct NoExclusions;

impl ExcludeMatcher for NoExclusions {
    fn is_excluded(&self, _name: &OsStr) -> bool {
        false
    }
}

impl<F> ExcludeMatcher for F
where
    F: Fn(&OsStr) -> bool + Send + Sync,
{
    fn is_excluded(&self, name: &OsStr) -> bool {
        self(name)
    }
}

/// Glob exclusions in gitignore syntax (`*.o`, `build`, `!keep.o`).
///
/// Patterns are matched against names as if they were regular files, so
/// directory-only patterns such as `build/` never match.
pub struct PatternExcluder {
    matcher: Option<Gitignore>,
}

impl PatternExcluder {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Self {
        Self {
            matcher: Self::build_matcher(patterns),
        }
    }

    fn build_matcher<S: AsRef<str>>(patterns: &[S]) -> Option<Gitignore> {
        if patterns.is_empty() {
            return None;
        }

        let mut builder = GitignoreBuilder::new("");
        for pattern in patterns {
            let pattern = pattern.as_ref();
            if let Err(err) = builder.add_line(None, pattern) {
                debug!("Failed to add exclusion pattern '{}': {}", pattern, err);
            } else {
                debug!("Added exclusion pattern: {}", pattern);
            }
        }

        match builder.build() {
            Ok(matcher) => {
                debug!("Built exclusion matcher with {} patterns", patterns.len());
                Some(matcher)
            }
            Err(e) => {
                debug!("Failed to build exclusion matcher: {}", e);
                None
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.matcher.as_ref().map_or(true, |m| m.is_empty())
    }
}

impl ExcludeMatcher for PatternExcluder {
    fn is_excluded(&self, name: &OsStr) -> bool {
        match self.matcher {
            Some(ref matcher) => matcher.matched(Path::new(name), false).is_ignore(),
            None => false,
        }
    }
}
