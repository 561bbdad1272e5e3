use crate::collation::{default_collator, Collator};
use crate::compare::{NameOrder, OrderingMode};
use crate::diagnostics::{DiagnosticSink, TracingSink};
use crate::exclude::{ExcludeMatcher, NoExclusions, PatternExcluder};
use dirpair_common::AppConfig;
use std::ffi::OsString;
use std::sync::Arc;

/// Per-run settings of the directory comparison engine
#[derive(Debug, Clone, Default)]
pub struct CompareOptions {
    /// Pair names that differ only in case
    pub ignore_file_name_case: bool,
    /// Open directories through symbolic links
    pub follow_symlinks: bool,
    /// At the top level, skip entries that sort before this name
    pub starting_file: Option<OsString>,
}

impl CompareOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            ignore_file_name_case: config.ignore_file_name_case,
            follow_symlinks: !config.no_dereference,
            starting_file: None,
        }
    }
}

/// Execution context for directory comparisons.
///
/// Holds the collaborators (collation, exclusions, diagnostics) and the
/// ordering mode of the current run. Reading, merging and resolving are
/// implemented on this type in their own modules.
pub struct DirComparer {
    pub(crate) options: CompareOptions,
    pub(crate) order: NameOrder,
    pub(crate) excluder: Arc<dyn ExcludeMatcher>,
    pub(crate) sink: Arc<dyn DiagnosticSink>,
    collator: Arc<dyn Collator>,
}

impl DirComparer {
    pub fn new(options: CompareOptions) -> Self {
        let collator = default_collator();
        let sink: Arc<dyn DiagnosticSink> = Arc::new(TracingSink);
        let order = NameOrder::new(collator.clone(), sink.clone(), options.ignore_file_name_case);
        Self {
            options,
            order,
            excluder: Arc::new(NoExclusions),
            sink,
            collator,
        }
    }

    /// Comparer configured from application settings, with the configured
    /// exclusion patterns.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(CompareOptions::from_config(config))
            .with_exclusions(PatternExcluder::new(&config.ignore_patterns))
    }

    pub fn with_exclusions(mut self, excluder: impl ExcludeMatcher + 'static) -> Self {
        self.excluder = Arc::new(excluder);
        self
    }

    pub fn with_diagnostics(mut self, sink: impl DiagnosticSink + 'static) -> Self {
        self.sink = Arc::new(sink);
        self.rebuild_order();
        self
    }

    pub fn with_collator(mut self, collator: impl Collator + 'static) -> Self {
        self.collator = Arc::new(collator);
        self.rebuild_order();
        self
    }

    pub fn with_starting_file(mut self, name: impl Into<OsString>) -> Self {
        self.options.starting_file = Some(name.into());
        self
    }

    fn rebuild_order(&mut self) {
        self.order = NameOrder::new(
            self.collator.clone(),
            self.sink.clone(),
            self.options.ignore_file_name_case,
        );
    }

    pub fn options(&self) -> &CompareOptions {
        &self.options
    }

    pub fn ordering_mode(&self) -> OrderingMode {
        self.order.mode()
    }

    pub fn diagnostics(&self) -> &dyn DiagnosticSink {
        self.sink.as_ref()
    }

    /// Begin a new top-level comparison run with collation enabled again
    pub fn begin_run(&mut self) {
        self.order.reset();
    }
}
