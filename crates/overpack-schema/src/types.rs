//! Newtype wrappers for string identifiers used across the package model.
//!
//! All newtypes serialize/deserialize as plain strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

macro_rules! string_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }
    };
}

string_newtype!(
    /// Slash-separated path of an entry inside a package archive.
    EntryPath
);

string_newtype!(
    /// Lowercase hex blake3 digest of an entry payload.
    Checksum
);

impl EntryPath {
    /// Whether the path is relative, non-empty, and free of `.`/`..` segments.
    pub fn is_well_formed(&self) -> bool {
        !self.0.is_empty()
            && !self.0.starts_with('/')
            && !self.0.contains('\\')
            && self
                .0
                .split('/')
                .all(|seg| !seg.is_empty() && seg != "." && seg != "..")
    }
}

impl Checksum {
    pub fn of(data: &[u8]) -> Self {
        Self(blake3::hash(data).to_hex().to_string())
    }

    /// Truncated 12-character prefix, for log lines.
    pub fn short(&self) -> &str {
        self.0.get(..12).unwrap_or(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_path_display_and_as_ref() {
        let p = EntryPath::new("components/00010/00010.mdl");
        assert_eq!(p.to_string(), "components/00010/00010.mdl");
        assert_eq!(AsRef::<str>::as_ref(&p), "components/00010/00010.mdl");
        assert_eq!(p, "components/00010/00010.mdl");
    }

    #[test]
    fn entry_path_serde_is_transparent() {
        let p = EntryPath::new("code/Foo.java");
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, "\"code/Foo.java\"");
        let back: EntryPath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn well_formed_paths() {
        assert!(EntryPath::from("components/00010/00010.mdl").is_well_formed());
        assert!(!EntryPath::from("").is_well_formed());
        assert!(!EntryPath::from("/abs").is_well_formed());
        assert!(!EntryPath::from("a/../b").is_well_formed());
        assert!(!EntryPath::from("a//b").is_well_formed());
        assert!(!EntryPath::from("a\\b").is_well_formed());
    }

    #[test]
    fn checksum_is_deterministic_blake3() {
        let a = Checksum::of(b"payload");
        let b = Checksum::of(b"payload");
        let c = Checksum::of(b"other");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
        assert_eq!(a.short().len(), 12);
        assert!(a.starts_with(a.short()));
    }
}
