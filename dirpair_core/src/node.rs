use crate::identity::FileStat;
use dirpair_common::Side;
use std::io;
use std::path::{Path, PathBuf};

/// State of the directory behind a [`FileSide`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirHandle {
    /// Known not to exist; reads yield an empty listing
    Nonexistent,
    /// Not opened yet
    Unopened,
    /// Opened and enumerated at least once
    Opened,
}

/// One operand of a comparison
#[derive(Debug, Clone)]
pub struct FileSide {
    pub path: PathBuf,
    pub handle: DirHandle,
    pub stat: Option<FileStat>,
}

impl FileSide {
    /// A side whose directory will be opened on first read
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            handle: DirHandle::Unopened,
            stat: None,
        }
    }

    /// A side that is compared as if it were an empty directory
    pub fn nonexistent(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            handle: DirHandle::Nonexistent,
            stat: None,
        }
    }

    /// A side with an already known stat
    pub fn with_stat(path: impl Into<PathBuf>, stat: FileStat) -> Self {
        Self {
            path: path.into(),
            handle: DirHandle::Unopened,
            stat: Some(stat),
        }
    }

    /// Stat `path` now so its identity is available for loop detection.
    pub fn probe(path: impl Into<PathBuf>, follow: bool) -> io::Result<Self> {
        let path = path.into();
        let stat = FileStat::probe(&path, follow)?;
        Ok(Self::with_stat(path, stat))
    }

    pub fn is_nonexistent(&self) -> bool {
        self.handle == DirHandle::Nonexistent
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// A directory pair being compared, linked to the pair it was reached from.
///
/// The parent link only borrows; nodes are created by whoever drives the
/// recursion and live on its stack.
#[derive(Debug)]
pub struct ComparisonNode<'p> {
    pub sides: [FileSide; 2],
    parent: Option<&'p ComparisonNode<'p>>,
}

impl ComparisonNode<'static> {
    pub fn root(left: FileSide, right: FileSide) -> Self {
        Self {
            sides: [left, right],
            parent: None,
        }
    }
}

impl<'p> ComparisonNode<'p> {
    /// A node for a subdirectory pair found while comparing `self`
    pub fn child<'q>(&'q self, left: FileSide, right: FileSide) -> ComparisonNode<'q> {
        ComparisonNode {
            sides: [left, right],
            parent: Some(self),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn parent(&self) -> Option<&'p ComparisonNode<'p>> {
        self.parent
    }

    /// Ancestors from the nearest parent up to the root
    pub fn ancestors(&self) -> impl Iterator<Item = &'p ComparisonNode<'p>> {
        std::iter::successors(self.parent, |node| node.parent)
    }

    pub fn side(&self, side: Side) -> &FileSide {
        &self.sides[side.index()]
    }

    pub fn side_mut(&mut self, side: Side) -> &mut FileSide {
        &mut self.sides[side.index()]
    }

    pub fn depth(&self) -> usize {
        self.ancestors().count()
    }
}
