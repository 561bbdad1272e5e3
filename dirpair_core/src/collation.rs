use std::ffi::OsStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Sort key produced by a [`Collator`].
///
/// Comparing two keys gives the same answer the collation would give for the
/// names they were produced from, so sorting by key is always a total order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CollationKey(Vec<u8>);

impl CollationKey {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollationError {
    #[error("invalid multibyte sequence in file name '{0}'")]
    InvalidEncoding(String),

    #[error("collation unavailable: {0}")]
    Unavailable(String),
}

/// Locale-style ordering of file names.
///
/// `fold_case` asks for the case-insensitive collation. Implementations may
/// fail on names they cannot handle; the caller then drops to byte ordering
/// for the rest of the run.
pub trait Collator: Send + Sync {
    fn collation_key(&self, name: &OsStr, fold_case: bool) -> Result<CollationKey, CollationError>;
}

/// Collation over Unicode scalar values.
///
/// Names that are not valid UTF-8 cannot be collated. Case folding uses full
/// Unicode lowercasing.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnicodeCollator;

impl Collator for UnicodeCollator {
    fn collation_key(&self, name: &OsStr, fold_case: bool) -> Result<CollationKey, CollationError> {
        let text = name
            .to_str()
            .ok_or_else(|| CollationError::InvalidEncoding(name.to_string_lossy().into_owned()))?;

        let key = if fold_case {
            text.to_lowercase().into_bytes()
        } else {
            text.as_bytes().to_vec()
        };
        Ok(CollationKey(key))
    }
}

/// Collation under a C library locale, ordering names the way `strcoll`
/// does. Keys come from `strxfrm`.
///
/// Case-insensitive keys are built from the Unicode lowercase form of the
/// name, so a name that is not valid UTF-8 cannot be folded.
#[cfg(unix)]
#[derive(Debug)]
pub struct LocaleCollator {
    locale: libc::locale_t,
    name: String,
}

// SAFETY: the locale object is never modified after `newlocale` returns and is
// only installed for the calling thread, for the duration of one key.
#[cfg(unix)]
unsafe impl Send for LocaleCollator {}
#[cfg(unix)]
unsafe impl Sync for LocaleCollator {}

#[cfg(unix)]
impl LocaleCollator {
    /// Load the collation rules of locale `name` (e.g. "en_US.UTF-8"). The
    /// empty name selects the locale of the environment.
    pub fn new(name: &str) -> Result<Self, CollationError> {
        let c_name = std::ffi::CString::new(name)
            .map_err(|_| CollationError::Unavailable(format!("invalid locale name '{}'", name)))?;
        // SAFETY: `c_name` is NUL-terminated and a null base asks for a new object.
        let locale = unsafe { libc::newlocale(libc::LC_COLLATE_MASK, c_name.as_ptr(), std::ptr::null_mut()) };
        if locale.is_null() {
            return Err(CollationError::Unavailable(format!("cannot load locale '{}'", name)));
        }
        Ok(Self {
            locale,
            name: name.to_string(),
        })
    }

    /// Collator for `LC_ALL` / `LC_COLLATE` / `LANG`, or the C locale when
    /// the environment names a locale that is not installed.
    pub fn from_env() -> Result<Self, CollationError> {
        Self::new("").or_else(|err| {
            debug!("Falling back to the C locale: {}", err);
            Self::new("C")
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn transform(&self, text: &std::ffi::CStr) -> Result<Vec<u8>, CollationError> {
        // SAFETY: `self.locale` stays alive for the whole call and the
        // previous thread locale is put back before returning.
        unsafe {
            let previous = libc::uselocale(self.locale);
            let needed = libc::strxfrm(std::ptr::null_mut(), text.as_ptr(), 0);
            let mut key = vec![0u8; needed + 1];
            let written = libc::strxfrm(key.as_mut_ptr().cast(), text.as_ptr(), key.len());
            libc::uselocale(previous);

            if written >= key.len() {
                return Err(CollationError::Unavailable(format!(
                    "collation key of '{}' changed size",
                    text.to_string_lossy()
                )));
            }
            key.truncate(written);
            Ok(key)
        }
    }
}

#[cfg(unix)]
impl Drop for LocaleCollator {
    fn drop(&mut self) {
        // SAFETY: created by `newlocale` and freed exactly once.
        unsafe { libc::freelocale(self.locale) };
    }
}

#[cfg(unix)]
impl Collator for LocaleCollator {
    fn collation_key(&self, name: &OsStr, fold_case: bool) -> Result<CollationKey, CollationError> {
        use std::os::unix::ffi::OsStrExt;

        let invalid = || CollationError::InvalidEncoding(name.to_string_lossy().into_owned());
        let bytes = if fold_case {
            name.to_str().ok_or_else(invalid)?.to_lowercase().into_bytes()
        } else {
            name.as_bytes().to_vec()
        };
        let text = std::ffi::CString::new(bytes).map_err(|_| invalid())?;
        self.transform(&text).map(CollationKey)
    }
}

/// Collator used unless one is configured: the environment's locale where
/// the C library provides one, Unicode code point order otherwise.
pub fn default_collator() -> Arc<dyn Collator> {
    #[cfg(unix)]
    {
        match LocaleCollator::from_env() {
            Ok(collator) => return Arc::new(collator),
            Err(err) => debug!("Using Unicode collation: {}", err),
        }
    }
    Arc::new(UnicodeCollator)
}
