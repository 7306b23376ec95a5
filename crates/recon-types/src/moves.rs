//! Correlation between the two records of a cross-file move.
//!
//! A move is recorded as two MOVE records, one in the file the node left
//! and one in the file it arrived in. Both carry the same correlation key in
//! their `section_id` as `move:<key>:<role>`.

use std::fmt;

use crate::path::LocationPath;

const SECTION_PREFIX: &str = "move:";
const KEY_LEN: usize = 12;

/// Which half of a move a record describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MoveRole {
    /// The node is removed from this file.
    Source,
    /// The node is inserted into this file.
    Target,
}

impl MoveRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MoveRole::Source => "source",
            MoveRole::Target => "target",
        }
    }
}

impl fmt::Display for MoveRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MoveLink {
    pub key: String,
    pub role: MoveRole,
}

impl MoveLink {
    /// Derive the correlation key for a move and return its source half.
    ///
    /// The key depends only on the two endpoints, so the same move always
    /// gets the same key across runs.
    pub fn correlate(
        source_file: &str,
        source_path: &LocationPath,
        target_file: &str,
        target_path: &LocationPath,
    ) -> Self {
        let mut hasher = blake3::Hasher::new();
        for part in [source_file, source_path.as_str(), target_file, target_path.as_str()] {
            hasher.update(part.as_bytes());
            hasher.update(&[0]);
        }
        let digest = hex::encode(hasher.finalize().as_bytes());
        Self {
            key: digest[..KEY_LEN].to_string(),
            role: MoveRole::Source,
        }
    }

    /// The same link with the target role.
    pub fn target(&self) -> Self {
        Self {
            key: self.key.clone(),
            role: MoveRole::Target,
        }
    }

    /// The same link with the source role.
    pub fn source(&self) -> Self {
        Self {
            key: self.key.clone(),
            role: MoveRole::Source,
        }
    }

    pub fn to_section_id(&self) -> String {
        format!("{SECTION_PREFIX}{}:{}", self.key, self.role)
    }

    pub fn from_section_id(section_id: &str) -> Option<Self> {
        let rest = section_id.trim().strip_prefix(SECTION_PREFIX)?;
        let (key, role) = rest.rsplit_once(':')?;
        let role = match role {
            "source" => MoveRole::Source,
            "target" => MoveRole::Target,
            _ => return None,
        };
        if key.is_empty() {
            return None;
        }
        Some(Self {
            key: key.to_string(),
            role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correlation_is_deterministic() {
        let path = LocationPath::new("/tools/tool[@name='Julia']");
        let a = MoveLink::correlate("a", &path, "b", &path);
        let b = MoveLink::correlate("a", &path, "b", &path);
        assert_eq!(a, b);
        assert_eq!(a.key.len(), KEY_LEN);

        let reversed = MoveLink::correlate("b", &path, "a", &path);
        assert_ne!(a.key, reversed.key);
    }

    #[test]
    fn section_id_round_trip() {
        let link = MoveLink::correlate("a", &LocationPath::root(), "b", &LocationPath::root());
        let section = link.target().to_section_id();
        assert!(section.starts_with("move:"));
        assert!(section.ends_with(":target"));
        assert_eq!(MoveLink::from_section_id(&section), Some(link.target()));
    }

    #[test]
    fn ordinary_sections_are_not_moves() {
        assert_eq!(MoveLink::from_section_id("catalog"), None);
        assert_eq!(MoveLink::from_section_id("move::source"), None);
        assert_eq!(MoveLink::from_section_id("move:abc:sideways"), None);
    }
}
