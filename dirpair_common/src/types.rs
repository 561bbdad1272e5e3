use serde::{Deserialize, Serialize};

/// Outcome of comparing a pair of files or directories.
///
/// Variants are ordered by severity so that the result of a whole run is the
/// maximum over its parts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Status {
    /// Everything compared equal
    #[default]
    Same = 0,
    /// At least one difference was found
    Different = 1,
    /// Something could not be compared
    Trouble = 2,
}

impl Status {
    /// Process exit code for this status (0, 1 or 2).
    pub fn exit_code(self) -> i32 {
        self as i32
    }

    pub fn is_trouble(self) -> bool {
        self == Status::Trouble
    }

    /// Fold another result into this one, keeping the worse of the two.
    pub fn absorb(&mut self, other: Status) {
        if other > *self {
            *self = other;
        }
    }
}

/// Which of the two compared operands a value belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left = 0,
    Right = 1,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn other(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Exclusion patterns matched against bare file names (e.g., "*.o", "target")
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// Do not follow symbolic links when opening directories and files
    #[serde(default)]
    pub no_dereference: bool,

    /// Match file names case-insensitively when pairing directory entries
    #[serde(default)]
    pub ignore_file_name_case: bool,

    /// Recurse into common subdirectories
    #[serde(default)]
    pub recursive: bool,

    /// Treat entries present on only one side as empty on the other
    #[serde(default)]
    pub new_file: bool,

    /// Report pairs of files that compare identical
    #[serde(default)]
    pub report_identical_files: bool,

    /// Enable portable mode (config alongside binary)
    #[serde(default)]
    pub portable_mode: bool,
}
