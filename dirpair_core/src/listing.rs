use crate::compare::{NameOrder, OrderingMode};
use crate::comparer::DirComparer;
use crate::identity::FileStat;
use crate::node::{DirHandle, FileSide};
use dirpair_common::DirReadError;
use std::cmp::Ordering;
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::Path;
use tracing::debug;

const INITIAL_ARENA_CAPACITY: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NameSpan {
    start: usize,
    len: usize,
}

#[cfg(unix)]
fn name_at(arena: &[u8], span: NameSpan) -> &OsStr {
    use std::os::unix::ffi::OsStrExt;
    OsStr::from_bytes(&arena[span.start..span.start + span.len])
}

#[cfg(not(unix))]
fn name_at(arena: &[u8], span: NameSpan) -> &OsStr {
    let bytes = &arena[span.start..span.start + span.len];
    // SAFETY: every span covers exactly the bytes one whole name produced by
    // `OsStr::as_encoded_bytes` in this process (see `DirListing::push`).
    unsafe { OsStr::from_encoded_bytes_unchecked(bytes) }
}

/// Names read from one directory.
///
/// All names live back to back in a single byte arena; the listing keeps one
/// span per name, in sorted order once the reader is done with it.
#[derive(Debug, Clone, Default)]
pub struct DirListing {
    arena: Vec<u8>,
    spans: Vec<NameSpan>,
    sorted_under: Option<OrderingMode>,
}

impl DirListing {
    pub fn new() -> Self {
        Self {
            arena: Vec::with_capacity(INITIAL_ARENA_CAPACITY),
            spans: Vec::new(),
            sorted_under: None,
        }
    }

    /// Unsorted listing holding `names` in the given order
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut listing = Self::new();
        for name in names {
            listing.push(name.as_ref());
        }
        listing
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn name(&self, index: usize) -> &OsStr {
        name_at(&self.arena, self.spans[index])
    }

    pub fn get(&self, index: usize) -> Option<&OsStr> {
        self.spans.get(index).map(|span| name_at(&self.arena, *span))
    }

    pub fn names(&self) -> impl Iterator<Item = &OsStr> + '_ {
        self.spans.iter().map(|span| name_at(&self.arena, *span))
    }

    /// Ordering mode the listing was last sorted under, if any
    pub fn sorted_under(&self) -> Option<OrderingMode> {
        self.sorted_under
    }

    /// Bytes of name storage in use
    pub fn arena_len(&self) -> usize {
        self.arena.len()
    }

    fn push(&mut self, name: &OsStr) {
        let bytes = name.as_encoded_bytes();
        let start = self.arena.len();
        self.arena.extend_from_slice(bytes);
        self.spans.push(NameSpan {
            start,
            len: bytes.len(),
        });
    }

    /// Sort the names from `from` onwards under `order`'s current mode.
    pub(crate) fn sort_from(&mut self, from: usize, order: &mut NameOrder) {
        let arena = &self.arena;
        order.sort_by_name(&mut self.spans[from..], |span| name_at(arena, *span));
        self.sorted_under = Some(order.mode());
    }

    /// Move the name at `found` to position `at`, shifting the names in
    /// between one place towards the end.
    pub(crate) fn rotate_to(&mut self, at: usize, found: usize) {
        self.spans[at..=found].rotate_right(1);
    }
}

fn open_error(path: &Path, source: io::Error) -> DirReadError {
    DirReadError::Open {
        path: path.to_path_buf(),
        source,
    }
}

impl DirComparer {
    /// Read and sort the entries of `side`'s directory.
    ///
    /// With `start`, names ordered before it are skipped; with `start_only`
    /// as well, so are names ordered after it, leaving only the names that
    /// match `start`. A nonexistent side reads as an empty directory. On
    /// success `side` is marked opened and its stat is filled in.
    pub fn read_dir(
        &mut self,
        side: &mut FileSide,
        start: Option<&OsStr>,
        start_only: bool,
    ) -> Result<DirListing, DirReadError> {
        let mut listing = DirListing::new();

        if side.is_nonexistent() {
            listing.sorted_under = Some(self.order.mode());
            return Ok(listing);
        }

        let entries = self.open_dir(side)?;

        for entry in entries {
            let entry = entry.map_err(|source| DirReadError::Read {
                path: side.path.clone(),
                source,
            })?;
            let name = entry.file_name();

            if name == "." || name == ".." {
                continue;
            }

            if let Some(start) = start {
                let order = self.order.compare(&name, start);
                if order == Ordering::Less || (start_only && order != Ordering::Equal) {
                    continue;
                }
            }

            if self.excluder.is_excluded(&name) {
                continue;
            }

            listing.push(&name);
        }

        listing.sort_from(0, &mut self.order);
        debug!(
            "Read {} entries ({} bytes of names) from {:?}",
            listing.len(),
            listing.arena_len(),
            side.path
        );
        Ok(listing)
    }

    fn open_dir(&self, side: &mut FileSide) -> Result<fs::ReadDir, DirReadError> {
        let meta = if self.options.follow_symlinks {
            fs::metadata(&side.path)
        } else {
            fs::symlink_metadata(&side.path)
        }
        .map_err(|e| open_error(&side.path, e))?;

        if meta.file_type().is_symlink() {
            return Err(open_error(
                &side.path,
                io::Error::new(io::ErrorKind::Other, "Too many levels of symbolic links"),
            ));
        }
        if !meta.is_dir() {
            return Err(open_error(
                &side.path,
                io::Error::new(io::ErrorKind::Other, "Not a directory"),
            ));
        }

        let entries = fs::read_dir(&side.path).map_err(|e| open_error(&side.path, e))?;

        if side.stat.is_none() {
            side.stat = FileStat::from_metadata(&side.path, &meta).ok();
        }
        side.handle = DirHandle::Opened;
        Ok(entries)
    }
}
