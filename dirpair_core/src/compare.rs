use crate::collation::{CollationError, CollationKey, Collator};
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use std::cmp::Ordering;
use std::ffi::OsStr;
use std::sync::Arc;
use tracing::debug;

/// How file names are being ordered in the current run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrderingMode {
    /// Collation, with byte order breaking ties
    #[default]
    Collated,
    /// Raw byte order; entered after the first collation failure
    Bytewise,
}

/// Raw byte ordering of two names, as the operating system encodes them.
pub fn bytewise(a: &OsStr, b: &OsStr) -> Ordering {
    a.as_encoded_bytes().cmp(b.as_encoded_bytes())
}

/// File name ordering for one comparison run.
///
/// Case-sensitive runs order names by their bytes and never consult the
/// collator. Case-insensitive runs start out collated. The first collation
/// failure is reported once and switches the run to
/// [`OrderingMode::Bytewise`] for good; listings sorted before the switch
/// must be sorted again before they are merged.
pub struct NameOrder {
    collator: Arc<dyn Collator>,
    sink: Arc<dyn DiagnosticSink>,
    ignore_case: bool,
    mode: OrderingMode,
}

impl NameOrder {
    pub fn new(collator: Arc<dyn Collator>, sink: Arc<dyn DiagnosticSink>, ignore_case: bool) -> Self {
        Self {
            collator,
            sink,
            ignore_case,
            mode: OrderingMode::Collated,
        }
    }

    pub fn mode(&self) -> OrderingMode {
        self.mode
    }

    pub fn ignore_case(&self) -> bool {
        self.ignore_case
    }

    /// Start a new run with collation enabled again
    pub fn reset(&mut self) {
        self.mode = OrderingMode::Collated;
    }

    /// Ordering used to pair names across the two sides.
    ///
    /// With case-insensitive matching, names that collate equal compare
    /// equal here even if their bytes differ.
    pub fn compare(&mut self, a: &OsStr, b: &OsStr) -> Ordering {
        if let Some(order) = self.collate(a, b) {
            if order != Ordering::Equal || self.ignore_case {
                return order;
            }
        }
        bytewise(a, b)
    }

    /// Ordering used to sort one side. Always total over distinct names.
    pub fn compare_for_sort(&mut self, a: &OsStr, b: &OsStr) -> Ordering {
        match self.collate(a, b) {
            Some(order) if order != Ordering::Equal => order,
            _ => bytewise(a, b),
        }
    }

    /// Sort `items` by the names `name_of` projects out of them.
    ///
    /// Collation keys for every name are computed up front; if any of them
    /// fails the run drops to byte order and the sort is done bytewise.
    pub fn sort_by_name<'a, T: Copy>(&mut self, items: &mut [T], name_of: impl Fn(&T) -> &'a OsStr) {
        if self.collating() {
            match self.collation_keys(items.iter().map(&name_of)) {
                Ok(keys) => {
                    let mut keyed: Vec<(CollationKey, T)> =
                        keys.into_iter().zip(items.iter().copied()).collect();
                    keyed.sort_by(|(ka, a), (kb, b)| {
                        ka.cmp(kb).then_with(|| bytewise(name_of(a), name_of(b)))
                    });
                    for (slot, (_, item)) in items.iter_mut().zip(keyed) {
                        *slot = item;
                    }
                    return;
                }
                Err((name, err)) => self.fall_back(name, None, err),
            }
        }

        items.sort_by(|a, b| bytewise(name_of(a), name_of(b)));
    }

    fn collation_keys<'a>(
        &self,
        names: impl Iterator<Item = &'a OsStr>,
    ) -> Result<Vec<CollationKey>, (&'a OsStr, CollationError)> {
        names
            .map(|name| {
                self.collator
                    .collation_key(name, self.ignore_case)
                    .map_err(|err| (name, err))
            })
            .collect()
    }

    fn collating(&self) -> bool {
        self.ignore_case && self.mode == OrderingMode::Collated
    }

    fn collate(&mut self, a: &OsStr, b: &OsStr) -> Option<Ordering> {
        if !self.collating() {
            return None;
        }

        let keys = self.collator.collation_key(a, self.ignore_case).and_then(|ka| {
            self.collator
                .collation_key(b, self.ignore_case)
                .map(|kb| (ka, kb))
        });

        match keys {
            Ok((ka, kb)) => Some(ka.cmp(&kb)),
            Err(err) => {
                self.fall_back(a, Some(b), err);
                None
            }
        }
    }

    fn fall_back(&mut self, name: &OsStr, other: Option<&OsStr>, err: CollationError) {
        debug!("Switching to byte ordering of file names");
        self.mode = OrderingMode::Bytewise;
        self.sink.report(Diagnostic::CollationFallback {
            name: name.to_os_string(),
            other: other.map(OsStr::to_os_string),
            reason: err.to_string(),
        });
    }
}
