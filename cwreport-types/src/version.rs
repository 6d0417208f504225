//! Version of the snapshot file layout.

use crate::SCHEMA_VERSION;

/// Layout version stamped on every snapshot.
///
/// Readers accept any snapshot with the same major version. Snapshot files
/// written by hand may give only the major; the minor then reads as 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SchemaVersion {
    pub major: u32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub minor: u32,
}

impl SchemaVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// The version this crate writes.
    pub const fn current() -> Self {
        Self::new(SCHEMA_VERSION, 0)
    }

    /// Whether a snapshot with this version can be reported.
    pub fn is_compatible(&self) -> bool {
        self.major == SCHEMA_VERSION
    }
}

impl Default for SchemaVersion {
    fn default() -> Self {
        Self::current()
    }
}

impl core::fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newer_minor_is_still_reportable() {
        assert!(SchemaVersion::new(SCHEMA_VERSION, 7).is_compatible());
        assert!(SchemaVersion::new(SCHEMA_VERSION, 7) > SchemaVersion::current());
    }

    #[test]
    fn other_major_is_not_reportable() {
        assert!(!SchemaVersion::new(SCHEMA_VERSION + 1, 0).is_compatible());
        assert!(!SchemaVersion::new(0, 9).is_compatible());
        assert_eq!(SchemaVersion::new(2, 1).to_string(), "2.1");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn minor_may_be_omitted_in_files() {
        let version: SchemaVersion = serde_json::from_str(r#"{"major": 1}"#).unwrap();
        assert_eq!(version, SchemaVersion::new(1, 0));
        assert!(version.is_compatible());
    }
}
