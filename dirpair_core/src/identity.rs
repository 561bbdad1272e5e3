use serde::Serialize;
use std::fmt;
use std::fs::{self, Metadata};
use std::io;
use std::path::{Path, PathBuf};

/// Kind of filesystem object behind a path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Regular,
    Directory,
    Symlink,
    BlockDevice,
    CharDevice,
    Fifo,
    Socket,
    Other,
}

impl FileKind {
    pub fn from_metadata(meta: &Metadata) -> Self {
        let file_type = meta.file_type();
        if file_type.is_dir() {
            return FileKind::Directory;
        }
        if file_type.is_file() {
            return FileKind::Regular;
        }
        if file_type.is_symlink() {
            return FileKind::Symlink;
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::FileTypeExt;
            if file_type.is_block_device() {
                return FileKind::BlockDevice;
            }
            if file_type.is_char_device() {
                return FileKind::CharDevice;
            }
            if file_type.is_fifo() {
                return FileKind::Fifo;
            }
            if file_type.is_socket() {
                return FileKind::Socket;
            }
        }

        FileKind::Other
    }

    pub fn is_dir(self) -> bool {
        self == FileKind::Directory
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FileKind::Regular => "regular file",
            FileKind::Directory => "directory",
            FileKind::Symlink => "symbolic link",
            FileKind::BlockDevice => "block special file",
            FileKind::CharDevice => "character special file",
            FileKind::Fifo => "fifo",
            FileKind::Socket => "socket",
            FileKind::Other => "weird file",
        };
        f.write_str(text)
    }
}

/// What makes two paths the same underlying object
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FileIdentity {
    /// Device and inode numbers, plus the device a block or character
    /// special file refers to
    Inode {
        dev: u64,
        ino: u64,
        special: Option<(FileKind, u64)>,
    },
    /// Canonical path, where inode numbers are not available
    Path(PathBuf),
}

impl FileIdentity {
    /// Same object, or block/character special files naming the same device.
    pub fn same_as(&self, other: &FileIdentity) -> bool {
        match (self, other) {
            (
                FileIdentity::Inode { dev, ino, special },
                FileIdentity::Inode {
                    dev: other_dev,
                    ino: other_ino,
                    special: other_special,
                },
            ) => (dev == other_dev && ino == other_ino) || (special.is_some() && special == other_special),
            (FileIdentity::Path(a), FileIdentity::Path(b)) => a == b,
            _ => false,
        }
    }
}

/// The parts of a `stat` result the comparison needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStat {
    pub identity: FileIdentity,
    pub kind: FileKind,
    pub len: u64,
}

impl FileStat {
    /// Stat `path`, following a final symbolic link when `follow` is set.
    pub fn probe(path: &Path, follow: bool) -> io::Result<Self> {
        let meta = if follow {
            fs::metadata(path)?
        } else {
            fs::symlink_metadata(path)?
        };
        Self::from_metadata(path, &meta)
    }

    pub fn from_metadata(path: &Path, meta: &Metadata) -> io::Result<Self> {
        let kind = FileKind::from_metadata(meta);
        Ok(Self {
            identity: identity_of(path, meta, kind)?,
            kind,
            len: meta.len(),
        })
    }

    pub fn same_file(&self, other: &FileStat) -> bool {
        self.identity.same_as(&other.identity)
    }
}

#[cfg(unix)]
fn identity_of(_path: &Path, meta: &Metadata, kind: FileKind) -> io::Result<FileIdentity> {
    use std::os::unix::fs::MetadataExt;

    let special = match kind {
        FileKind::BlockDevice | FileKind::CharDevice => Some((kind, meta.rdev())),
        _ => None,
    };
    Ok(FileIdentity::Inode {
        dev: meta.dev(),
        ino: meta.ino(),
        special,
    })
}

#[cfg(not(unix))]
fn identity_of(path: &Path, _meta: &Metadata, _kind: FileKind) -> io::Result<FileIdentity> {
    Ok(FileIdentity::Path(fs::canonicalize(path)?))
}
