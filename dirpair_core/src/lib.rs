pub mod collation;
pub mod compare;
pub mod comparer;
pub mod diagnostics;
pub mod exclude;
pub mod identity;
pub mod listing;
pub mod loop_detect;
pub mod merge;
pub mod node;
pub mod resolve;
pub mod walk;

#[cfg(test)]
mod tests_merge;


pub use collation::{default_collator, CollationError, CollationKey, Collator, UnicodeCollator};
#[cfg(unix)]
pub use collation::LocaleCollator;
pub use compare::{bytewise, NameOrder, OrderingMode};
pub use comparer::{CompareOptions, DirComparer};
pub use diagnostics::{CollectingSink, Diagnostic, DiagnosticSink, TracingSink};
pub use exclude::{ExcludeMatcher, NoExclusions, PatternExcluder};
pub use identity::{FileIdentity, FileKind, FileStat};
pub use listing::DirListing;
pub use loop_detect::is_ancestor_loop;
pub use merge::Pairing;
pub use node::{ComparisonNode, DirHandle, FileSide};
pub use walk::{TreeWalk, WalkEvent, WalkOptions, WalkReporter};
