use crate::compare::bytewise;
use crate::comparer::DirComparer;
use crate::node::FileSide;
use std::cmp::Ordering;
use std::ffi::OsStr;
use std::path::PathBuf;
use tracing::debug;

impl DirComparer {
    /// Path of the entry called `name` inside `dir`.
    ///
    /// With case-insensitive matching the directory is searched for the
    /// actual spelling on disk: an exact match wins, otherwise the first
    /// case-insensitive match is used. Without it, or when nothing matches
    /// or the directory cannot be read, `name` is used as given.
    pub fn resolve(&mut self, dir: &mut FileSide, name: &OsStr) -> PathBuf {
        if !self.order.ignore_case() {
            return dir.path.join(name);
        }

        let listing = match self.read_dir(dir, Some(name), true) {
            Ok(listing) => listing,
            Err(err) => {
                debug!("Cannot search {:?} for {:?}: {}", dir.path, name, err);
                return dir.path.join(name);
            }
        };

        let mut matched: Option<&OsStr> = None;
        for candidate in listing.names() {
            if bytewise(candidate, name) == Ordering::Equal {
                matched = Some(candidate);
                break;
            }
            if matched.is_none() {
                matched = Some(candidate);
            }
        }

        dir.path.join(matched.unwrap_or(name))
    }
}
