//! Key mapping
//!
//! Translates logical keys to filesystem-safe file names and back, and joins
//! them with the storage root.
//!
//! The default mapping swaps `:` for `-` on the way to disk and `-` for `:`
//! on the way back. Keys that already contain `-` do not survive the round
//! trip; choosing compatible custom mappings is the caller's job.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Character reserved by the default mapping in logical keys
pub const KEY_SEPARATOR: char = ':';

/// Character the separator is replaced with on disk
pub const FILE_SEPARATOR: char = '-';

/// A cloneable, thread-safe string mapping
#[derive(Clone)]
pub struct NameMapping(Arc<dyn Fn(&str) -> String + Send + Sync>);

impl NameMapping {
    /// Wrap an arbitrary mapping function
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Replace every occurrence of `from` with `to`
    pub fn substitute(from: char, to: char) -> Self {
        Self::new(move |name| name.replace(from, &to.to_string()))
    }

    /// Leave names untouched
    pub fn identity() -> Self {
        Self::new(str::to_owned)
    }

    /// Default key → file name mapping (`:` becomes `-`)
    pub fn default_to_file_name() -> Self {
        Self::substitute(KEY_SEPARATOR, FILE_SEPARATOR)
    }

    /// Default file name → key mapping (`-` becomes `:`)
    pub fn default_from_file_name() -> Self {
        Self::substitute(FILE_SEPARATOR, KEY_SEPARATOR)
    }

    /// Apply the mapping
    pub fn apply(&self, name: &str) -> String {
        (self.0)(name)
    }
}

impl fmt::Debug for NameMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NameMapping(..)")
    }
}

/// Build the on-disk path for `key`
///
/// This is plain concatenation of `storage_path`, `/` and the mapped name.
/// Nothing is validated: an empty root yields `/name`, and a mapped name
/// containing `/` points into a subdirectory.
pub fn path_for_key(storage_path: &Path, to_file_name: &NameMapping, key: &str) -> PathBuf {
    let mut path = OsString::from(storage_path.as_os_str());
    path.push("/");
    path.push(to_file_name.apply(key));
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_mapping_replaces_separator() {
        let to = NameMapping::default_to_file_name();
        assert_eq!(to.apply("persist:root"), "persist-root");
        assert_eq!(to.apply("a:b:c"), "a-b-c");
        assert_eq!(to.apply("plain"), "plain");
    }

    #[test]
    fn test_default_mapping_round_trip() {
        let to = NameMapping::default_to_file_name();
        let from = NameMapping::default_from_file_name();

        for key in ["persist:root", "a:b:c", "", ":", "::leading", "üñí:cødé", "spaces are ok"] {
            assert_eq!(from.apply(&to.apply(key)), key);
        }
    }

    #[test]
    fn test_key_with_replacement_char_does_not_round_trip() {
        let to = NameMapping::default_to_file_name();
        let from = NameMapping::default_from_file_name();

        assert_eq!(from.apply(&to.apply("already-dashed")), "already:dashed");
    }

    #[test]
    fn test_custom_mapping() {
        let to = NameMapping::new(|key| format!("{}.json", key));
        assert_eq!(to.apply("settings"), "settings.json");

        let identity = NameMapping::identity();
        assert_eq!(identity.apply("a:b"), "a:b");
    }

    #[test]
    fn test_path_for_key() {
        let to = NameMapping::default_to_file_name();
        let path = path_for_key(Path::new("/data/persistStore"), &to, "persist:root");
        assert_eq!(path, PathBuf::from("/data/persistStore/persist-root"));
    }

    #[test]
    fn test_path_for_key_is_plain_concatenation() {
        let to = NameMapping::identity();

        assert_eq!(path_for_key(Path::new(""), &to, "key"), PathBuf::from("/key"));
        assert_eq!(
            path_for_key(Path::new("/root/"), &to, "key"),
            PathBuf::from("/root//key")
        );
    }
}
