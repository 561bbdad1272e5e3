use crate::comparer::DirComparer;
use crate::identity::{FileKind, FileStat};
use crate::merge::Pairing;
use crate::node::{ComparisonNode, FileSide};
use dirpair_common::{AppConfig, Side, Status};
use std::ffi::OsString;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const BUFFER_SIZE: usize = 64 * 1024;

/// What the tree walk does with the pairings the engine produces
#[derive(Debug, Clone, Default)]
pub struct WalkOptions {
    /// Descend into subdirectories present on both sides
    pub recursive: bool,
    /// Compare one-sided entries against an empty file or directory
    pub new_file: bool,
    /// Emit [`WalkEvent::Identical`] for files that compare equal
    pub report_identical: bool,
}

impl WalkOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            recursive: config.recursive,
            new_file: config.new_file,
            report_identical: config.report_identical_files,
        }
    }
}

/// Findings of a tree walk, in the order they were made
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkEvent {
    OnlyIn {
        dir: PathBuf,
        name: OsString,
    },
    CommonSubdirectories {
        left: PathBuf,
        right: PathBuf,
    },
    Identical {
        left: PathBuf,
        right: PathBuf,
    },
    Differ {
        left: PathBuf,
        right: PathBuf,
    },
    KindMismatch {
        left: PathBuf,
        left_kind: FileKind,
        right: PathBuf,
        right_kind: FileKind,
    },
    Trouble {
        path: PathBuf,
        message: String,
    },
}

impl fmt::Display for WalkEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalkEvent::OnlyIn { dir, name } => {
                write!(f, "Only in {}: {}", dir.display(), name.to_string_lossy())
            }
            WalkEvent::CommonSubdirectories { left, right } => write!(
                f,
                "Common subdirectories: {} and {}",
                left.display(),
                right.display()
            ),
            WalkEvent::Identical { left, right } => {
                write!(f, "Files {} and {} are identical", left.display(), right.display())
            }
            WalkEvent::Differ { left, right } => {
                write!(f, "Files {} and {} differ", left.display(), right.display())
            }
            WalkEvent::KindMismatch {
                left,
                left_kind,
                right,
                right_kind,
            } => write!(
                f,
                "File {} is a {} while file {} is a {}",
                left.display(),
                left_kind,
                right.display(),
                right_kind
            ),
            WalkEvent::Trouble { path, message } => write!(f, "{}: {}", path.display(), message),
        }
    }
}

/// Receiver for [`WalkEvent`]s
pub trait WalkReporter {
    fn report(&mut self, event: WalkEvent);
}

impl<F> WalkReporter for F
where
    F: FnMut(WalkEvent),
{
    fn report(&mut self, event: WalkEvent) {
        self(event)
    }
}

/// Drives a [`DirComparer`] over two trees.
///
/// The comparer only pairs the names of one directory level; the walk
/// decides what each pairing means, recurses into subdirectory pairs and
/// keeps the chain of ancestor nodes used for loop detection.
pub struct TreeWalk<'r> {
    options: WalkOptions,
    reporter: &'r mut dyn WalkReporter,
}

impl<'r> TreeWalk<'r> {
    pub fn new(options: WalkOptions, reporter: &'r mut dyn WalkReporter) -> Self {
        Self { options, reporter }
    }

    /// Compare two operands given on the command line.
    ///
    /// A directory compared with a file stands for the entry of the same
    /// name inside the directory.
    pub fn compare_paths(&mut self, comparer: &mut DirComparer, left: &Path, right: &Path) -> Status {
        comparer.begin_run();
        info!("Comparing {} and {}", left.display(), right.display());

        let follow = comparer.options().follow_symlinks;
        let left_stat = match FileStat::probe(left, follow) {
            Ok(stat) => stat,
            Err(e) => return self.trouble(left, &e),
        };
        let right_stat = match FileStat::probe(right, follow) {
            Ok(stat) => stat,
            Err(e) => return self.trouble(right, &e),
        };

        match (left_stat.kind.is_dir(), right_stat.kind.is_dir()) {
            (true, true) => {
                let mut root = ComparisonNode::root(
                    FileSide::with_stat(left, left_stat),
                    FileSide::with_stat(right, right_stat),
                );
                self.compare_dirs(comparer, &mut root)
            }
            (true, false) => {
                let mut dir = FileSide::with_stat(left, left_stat);
                self.compare_dir_with_file(comparer, &mut dir, right, right_stat, Side::Left)
            }
            (false, true) => {
                let mut dir = FileSide::with_stat(right, right_stat);
                self.compare_dir_with_file(comparer, &mut dir, left, left_stat, Side::Right)
            }
            (false, false) => self.compare_entries(comparer, None, left, left_stat, right, right_stat),
        }
    }

    /// Compare the directory pair of `node` level by level.
    pub fn compare_dirs(&mut self, comparer: &mut DirComparer, node: &mut ComparisonNode<'_>) -> Status {
        debug!(
            "Comparing directories {:?} and {:?} at depth {}",
            node.sides[0].path,
            node.sides[1].path,
            node.depth()
        );
        comparer.merge(node, |comparer, node, pairing| {
            self.handle_pairing(comparer, node, pairing)
        })
    }

    fn compare_dir_with_file(
        &mut self,
        comparer: &mut DirComparer,
        dir: &mut FileSide,
        file: &Path,
        file_stat: FileStat,
        dir_side: Side,
    ) -> Status {
        let Some(name) = file.file_name() else {
            return self.trouble_message(file, "cannot compare a directory with this file name");
        };

        let resolved = comparer.resolve(dir, name);
        let resolved_stat = match FileStat::probe(&resolved, comparer.options().follow_symlinks) {
            Ok(stat) => stat,
            Err(e) => return self.trouble(&resolved, &e),
        };

        match dir_side {
            Side::Left => self.compare_entries(comparer, None, &resolved, resolved_stat, file, file_stat),
            Side::Right => self.compare_entries(comparer, None, file, file_stat, &resolved, resolved_stat),
        }
    }

    fn handle_pairing(
        &mut self,
        comparer: &mut DirComparer,
        node: &ComparisonNode<'_>,
        pairing: Pairing<'_>,
    ) -> Status {
        if let Some(side) = pairing.only_side() {
            if !self.options.new_file {
                self.reporter.report(WalkEvent::OnlyIn {
                    dir: node.side(side).path.clone(),
                    name: pairing.name().to_os_string(),
                });
                return Status::Different;
            }
        }

        let path_of = |side: Side| {
            node.side(side)
                .path
                .join(pairing.get(side).unwrap_or_else(|| pairing.name()))
        };
        let left_path = path_of(Side::Left);
        let right_path = path_of(Side::Right);

        let follow = comparer.options().follow_symlinks;
        let mut stats: [Option<FileStat>; 2] = [None, None];
        for (side, path) in [(Side::Left, &left_path), (Side::Right, &right_path)] {
            if pairing.get(side).is_none() {
                continue;
            }
            match FileStat::probe(path, follow) {
                Ok(stat) => stats[side.index()] = Some(stat),
                Err(e) => return self.trouble(path, &e),
            }
        }

        match stats {
            [Some(left_stat), Some(right_stat)] => {
                self.compare_entries(comparer, Some(node), &left_path, left_stat, &right_path, right_stat)
            }
            [Some(stat), None] => {
                self.compare_with_absent(comparer, node, Side::Left, &left_path, stat, &right_path)
            }
            [None, Some(stat)] => {
                self.compare_with_absent(comparer, node, Side::Right, &right_path, stat, &left_path)
            }
            [None, None] => Status::Same,
        }
    }

    fn compare_entries(
        &mut self,
        comparer: &mut DirComparer,
        parent: Option<&ComparisonNode<'_>>,
        left: &Path,
        left_stat: FileStat,
        right: &Path,
        right_stat: FileStat,
    ) -> Status {
        if left_stat.kind != right_stat.kind {
            self.reporter.report(WalkEvent::KindMismatch {
                left: left.to_path_buf(),
                left_kind: left_stat.kind,
                right: right.to_path_buf(),
                right_kind: right_stat.kind,
            });
            return Status::Different;
        }

        let kind = left_stat.kind;
        match kind {
            FileKind::Directory => match parent {
                Some(parent) if self.options.recursive => {
                    let mut child = parent.child(
                        FileSide::with_stat(left, left_stat),
                        FileSide::with_stat(right, right_stat),
                    );
                    self.compare_dirs(comparer, &mut child)
                }
                _ => {
                    self.reporter.report(WalkEvent::CommonSubdirectories {
                        left: left.to_path_buf(),
                        right: right.to_path_buf(),
                    });
                    Status::Same
                }
            },
            FileKind::Regular => {
                let identical = if left_stat.same_file(&right_stat) {
                    Ok(true)
                } else {
                    files_identical(left, left_stat.len, right, right_stat.len)
                };
                match identical {
                    Ok(same) => self.outcome(left, right, same),
                    Err(e) => self.trouble(left, &e),
                }
            }
            FileKind::Symlink => match (fs::read_link(left), fs::read_link(right)) {
                (Ok(a), Ok(b)) => self.outcome(left, right, a == b),
                (Err(e), _) => self.trouble(left, &e),
                (_, Err(e)) => self.trouble(right, &e),
            },
            _ => {
                let same = left_stat.same_file(&right_stat);
                self.outcome(left, right, same)
            }
        }
    }

    /// `present` exists only on `side`; with new-file semantics the other
    /// side counts as empty.
    fn compare_with_absent(
        &mut self,
        comparer: &mut DirComparer,
        node: &ComparisonNode<'_>,
        side: Side,
        present: &Path,
        stat: FileStat,
        absent: &Path,
    ) -> Status {
        let (left, right) = match side {
            Side::Left => (present, absent),
            Side::Right => (absent, present),
        };

        let kind = stat.kind;
        match kind {
            FileKind::Directory if self.options.recursive => {
                let mut sides = [FileSide::with_stat(present, stat), FileSide::nonexistent(absent)];
                if side == Side::Right {
                    sides.swap(0, 1);
                }
                let [left_side, right_side] = sides;
                let mut child = node.child(left_side, right_side);
                self.compare_dirs(comparer, &mut child)
            }
            // The absent side takes the present side's kind, as an empty directory
            FileKind::Directory => {
                self.reporter.report(WalkEvent::CommonSubdirectories {
                    left: left.to_path_buf(),
                    right: right.to_path_buf(),
                });
                Status::Same
            }
            FileKind::Regular => self.outcome(left, right, stat.len == 0),
            _ => self.outcome(left, right, false),
        }
    }

    fn outcome(&mut self, left: &Path, right: &Path, same: bool) -> Status {
        if same {
            if self.options.report_identical {
                self.reporter.report(WalkEvent::Identical {
                    left: left.to_path_buf(),
                    right: right.to_path_buf(),
                });
            }
            Status::Same
        } else {
            self.reporter.report(WalkEvent::Differ {
                left: left.to_path_buf(),
                right: right.to_path_buf(),
            });
            Status::Different
        }
    }

    fn trouble(&mut self, path: &Path, err: &io::Error) -> Status {
        self.trouble_message(path, &err.to_string())
    }

    fn trouble_message(&mut self, path: &Path, message: &str) -> Status {
        self.reporter.report(WalkEvent::Trouble {
            path: path.to_path_buf(),
            message: message.to_string(),
        });
        Status::Trouble
    }
}

/// Byte-for-byte comparison of two regular files of known length.
fn files_identical(left: &Path, left_len: u64, right: &Path, right_len: u64) -> io::Result<bool> {
    if left_len != right_len {
        return Ok(false);
    }

    let mut left_file = File::open(left)?;
    let mut right_file = File::open(right)?;
    let mut left_buf = vec![0u8; BUFFER_SIZE];
    let mut right_buf = vec![0u8; BUFFER_SIZE];

    loop {
        let n = fill(&mut left_file, &mut left_buf)?;
        let m = fill(&mut right_file, &mut right_buf)?;
        if left_buf[..n] != right_buf[..m] {
            return Ok(false);
        }
        if n == 0 {
            return Ok(true);
        }
    }
}

/// Read until `buf` is full or the reader is exhausted.
fn fill(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
