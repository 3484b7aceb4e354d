//! Encoded ancestry paths.
//!
//! A path is the concatenation of `/uid` for every ancestor from the root
//! down to the unit itself, e.g. `/ImspTQPwCqd/O6uvpzGd5pu`. Because UIDs
//! have a fixed width, the UID for hierarchy level `k` always starts at the
//! 1-based character position `(k - 1) * 12 + 2`. Ancestor tests are plain
//! slice comparisons at that offset; nothing walks parent pointers.

use std::fmt;

use rungs_shared::types::Uid;
use serde::{Deserialize, Serialize};

use super::error::HierarchyError;

/// Separator preceding every UID in a path.
pub const PATH_SEPARATOR: char = '/';

/// Width of one level in a path: the separator plus one UID.
pub const SLOT_WIDTH: usize = Uid::LENGTH + 1;

/// Returns the 1-based character position at which the UID for
/// `level` starts.
pub fn path_position_at_level(level: u32) -> Result<usize, HierarchyError> {
    if level == 0 {
        return Err(HierarchyError::InvalidLevel(level));
    }
    Ok((level as usize - 1) * SLOT_WIDTH + 2)
}

/// Ancestry path of an organisation unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrgUnitPath(String);

impl OrgUnitPath {
    /// Path of a root unit.
    #[must_use]
    pub fn root(uid: &Uid) -> Self {
        Self(format!("{PATH_SEPARATOR}{uid}"))
    }

    /// Path of a direct child of the unit owning this path.
    #[must_use]
    pub fn child(&self, uid: &Uid) -> Self {
        Self(format!("{}{PATH_SEPARATOR}{uid}", self.0))
    }

    /// Parses a path, validating every slot.
    pub fn parse(s: &str) -> Result<Self, HierarchyError> {
        if s.is_empty() || s.len() % SLOT_WIDTH != 0 {
            return Err(HierarchyError::InvalidPath(s.to_string()));
        }

        for slot in s.as_bytes().chunks(SLOT_WIDTH) {
            let (sep, uid) = slot.split_at(1);
            let uid = std::str::from_utf8(uid).ok();
            if sep[0] != PATH_SEPARATOR as u8 || uid.is_none_or(|u| Uid::parse(u).is_err()) {
                return Err(HierarchyError::InvalidPath(s.to_string()));
            }
        }

        Ok(Self(s.to_string()))
    }

    /// Number of levels in the path; a root unit has depth 1.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn depth(&self) -> u32 {
        (self.0.len() / SLOT_WIDTH) as u32
    }

    /// Returns the UID occupying the slot for `level`, or `None` when the
    /// path is shallower than `level` or `level` is zero.
    #[must_use]
    pub fn uid_at_level(&self, level: u32) -> Option<&str> {
        let start = path_position_at_level(level).ok()? - 1;
        self.0.get(start..start + Uid::LENGTH)
    }

    /// True if `uid` occupies the slot for `level`.
    #[must_use]
    pub fn has_at_level(&self, uid: &Uid, level: u32) -> bool {
        self.uid_at_level(level) == Some(uid.as_str())
    }

    /// UIDs from the root down to (and including) the owning unit.
    pub fn uids(&self) -> impl Iterator<Item = &str> {
        self.0
            .as_bytes()
            .chunks(SLOT_WIDTH)
            .filter_map(|slot| std::str::from_utf8(&slot[1..]).ok())
    }

    /// UID of the owning unit.
    #[must_use]
    pub fn leaf_uid(&self) -> &str {
        &self.0[self.0.len() - Uid::LENGTH..]
    }

    /// Path of the parent, or `None` for a root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        (self.depth() > 1).then(|| Self(self.0[..self.0.len() - SLOT_WIDTH].to_string()))
    }

    /// Returns the path as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrgUnitPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for OrgUnitPath {
    type Error = HierarchyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<OrgUnitPath> for String {
    fn from(path: OrgUnitPath) -> Self {
        path.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn uid(s: &str) -> Uid {
        Uid::parse(s).unwrap()
    }

    #[rstest]
    #[case(1, 2)]
    #[case(2, 14)]
    #[case(3, 26)]
    #[case(4, 38)]
    fn test_path_position_at_level(#[case] level: u32, #[case] expected: usize) {
        assert_eq!(path_position_at_level(level).unwrap(), expected);
    }

    #[test]
    fn test_level_zero_is_invalid() {
        assert_eq!(
            path_position_at_level(0),
            Err(HierarchyError::InvalidLevel(0))
        );
        let path = OrgUnitPath::root(&uid("ImspTQPwCqd"));
        assert_eq!(path.uid_at_level(0), None);
    }

    #[test]
    fn test_child_path_appends_slot() {
        let root = OrgUnitPath::root(&uid("ImspTQPwCqd"));
        let child = root.child(&uid("O6uvpzGd5pu"));

        assert_eq!(child.as_str(), "/ImspTQPwCqd/O6uvpzGd5pu");
        assert_eq!(child.depth(), 2);
        assert_eq!(child.parent(), Some(root.clone()));
        assert_eq!(root.parent(), None);
        assert_eq!(child.leaf_uid(), "O6uvpzGd5pu");
    }

    #[test]
    fn test_uid_at_level() {
        let path = OrgUnitPath::parse("/ImspTQPwCqd/O6uvpzGd5pu/YuQRtpLP10I").unwrap();

        assert_eq!(path.uid_at_level(1), Some("ImspTQPwCqd"));
        assert_eq!(path.uid_at_level(2), Some("O6uvpzGd5pu"));
        assert_eq!(path.uid_at_level(3), Some("YuQRtpLP10I"));
        assert_eq!(path.uid_at_level(4), None);
        assert!(path.has_at_level(&uid("O6uvpzGd5pu"), 2));
        assert!(!path.has_at_level(&uid("O6uvpzGd5pu"), 1));
    }

    #[test]
    fn test_uids_iterates_root_first() {
        let path = OrgUnitPath::parse("/ImspTQPwCqd/O6uvpzGd5pu").unwrap();
        let uids: Vec<_> = path.uids().collect();
        assert_eq!(uids, vec!["ImspTQPwCqd", "O6uvpzGd5pu"]);
    }

    #[rstest]
    #[case("")]
    #[case("ImspTQPwCqd")]
    #[case("/ImspTQPwCqd/")]
    #[case("|ImspTQPwCqd")]
    #[case("/1mspTQPwCqd")]
    fn test_parse_rejects_malformed(#[case] input: &str) {
        assert!(matches!(
            OrgUnitPath::parse(input),
            Err(HierarchyError::InvalidPath(_))
        ));
    }
}
