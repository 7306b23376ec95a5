//! Change records: the unit of review and replay.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::moves::MoveLink;
use crate::path::LocationPath;

/// Kind of structural change a record describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeType {
    Add,
    Modify,
    Delete,
    Move,
}

impl ChangeType {
    pub const ALL: [ChangeType; 4] = [
        ChangeType::Add,
        ChangeType::Modify,
        ChangeType::Delete,
        ChangeType::Move,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Add => "ADD",
            ChangeType::Modify => "MODIFY",
            ChangeType::Delete => "DELETE",
            ChangeType::Move => "MOVE",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ChangeType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| TypeError::InvalidChangeType(s.to_string()))
    }
}

/// Reviewer decision on a record.
///
/// Records start `Pending`; only a human review moves them to `Approved` or
/// `Rejected`. Only approved records are ever applied.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Approval {
    Approved,
    Rejected,
    #[default]
    Pending,
}

impl Approval {
    /// Value written into the approval column of fresh records, listing the
    /// choices a reviewer may enter.
    pub const PLACEHOLDER: &'static str = "approved,rejected,pending";

    /// Interpret a reviewer-entered value. Anything unrecognised, including
    /// the placeholder itself, counts as pending.
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "approved" => Approval::Approved,
            "rejected" => Approval::Rejected,
            _ => Approval::Pending,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Approval::Approved => "approved",
            Approval::Rejected => "rejected",
            Approval::Pending => "pending",
        }
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, Approval::Approved)
    }
}

impl fmt::Display for Approval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reviewable unit of difference between two versions of a document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Source document identifier (relative path without extension).
    pub file_id: String,
    pub change_type: ChangeType,
    /// Logical grouping; the file id unless the record is half of a move.
    pub section_id: String,
    pub xml_path: LocationPath,
    pub old_content: String,
    pub new_content: String,
    /// Short word-level description of the change, possibly empty.
    pub focused_summary: String,
    pub approval: Approval,
}

impl ChangeRecord {
    fn new(
        file_id: impl Into<String>,
        change_type: ChangeType,
        xml_path: LocationPath,
        old_content: String,
        new_content: String,
    ) -> Self {
        let file_id = file_id.into();
        Self {
            section_id: file_id.clone(),
            file_id,
            change_type,
            xml_path,
            old_content,
            new_content,
            focused_summary: String::new(),
            approval: Approval::Pending,
        }
    }

    /// A node that exists only in the revised document.
    pub fn add(file_id: impl Into<String>, xml_path: LocationPath, new_content: impl Into<String>) -> Self {
        Self::new(file_id, ChangeType::Add, xml_path, String::new(), new_content.into())
    }

    /// A node that exists only in the original document.
    pub fn delete(file_id: impl Into<String>, xml_path: LocationPath, old_content: impl Into<String>) -> Self {
        Self::new(file_id, ChangeType::Delete, xml_path, old_content.into(), String::new())
    }

    /// A matched node whose text or attribute value changed.
    pub fn modify(
        file_id: impl Into<String>,
        xml_path: LocationPath,
        old_content: impl Into<String>,
        new_content: impl Into<String>,
    ) -> Self {
        Self::new(file_id, ChangeType::Modify, xml_path, old_content.into(), new_content.into())
    }

    /// One half of a cross-file move.
    pub fn moved(
        file_id: impl Into<String>,
        xml_path: LocationPath,
        old_content: impl Into<String>,
        new_content: impl Into<String>,
        link: &MoveLink,
    ) -> Self {
        let mut record = Self::new(file_id, ChangeType::Move, xml_path, old_content.into(), new_content.into());
        record.section_id = link.to_section_id();
        record
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.focused_summary = summary.into();
        self
    }

    pub fn with_approval(mut self, approval: Approval) -> Self {
        self.approval = approval;
        self
    }

    /// The move correlation carried by a MOVE record.
    pub fn move_link(&self) -> Option<MoveLink> {
        if self.change_type != ChangeType::Move {
            return None;
        }
        MoveLink::from_section_id(&self.section_id)
    }

    /// Returns `true` if this record adds or deletes the whole document.
    pub fn is_whole_file(&self) -> bool {
        self.xml_path.is_root() && matches!(self.change_type, ChangeType::Add | ChangeType::Delete)
    }

    /// Deduplication key over (file, type, path, old, new).
    pub fn key(&self) -> RecordKey {
        let mut hasher = blake3::Hasher::new();
        for field in [
            self.file_id.as_str(),
            self.change_type.as_str(),
            self.xml_path.as_str(),
            self.old_content.as_str(),
            self.new_content.as_str(),
        ] {
            hasher.update(&(field.len() as u64).to_le_bytes());
            hasher.update(field.as_bytes());
        }
        RecordKey(*hasher.finalize().as_bytes())
    }
}

/// Digest identifying records that describe the same change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey([u8; 32]);

impl RecordKey {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}
