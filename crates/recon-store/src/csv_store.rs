//! CSV review files.
//!
//! One row per record, columns in fixed order:
//!
//! ```text
//! file_id,change_type,section_id,xml_path,old_content,new_content,focused_summary,approval
//! ```
//!
//! Fresh records carry the placeholder `approved,rejected,pending` in the
//! approval column for the reviewer to replace. Files written by older
//! tooling name the summary column `focused_changes` and the approval
//! column `approved` or `status`; those are read when the current column is
//! absent.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use recon_types::{Approval, ChangeRecord, ChangeType, LocationPath};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::{ChangeStore, LoadedRecords, MalformedRow};

/// Column names in output order.
pub const COLUMNS: [&str; 8] = [
    "file_id",
    "change_type",
    "section_id",
    "xml_path",
    "old_content",
    "new_content",
    "focused_summary",
    "approval",
];

const REQUIRED: [&str; 3] = ["file_id", "change_type", "xml_path"];

/// Older column spellings and the column each stands in for. A legacy
/// column is only read when the current one is absent.
const LEGACY: [(&str, &str); 3] = [
    ("focused_changes", "focused_summary"),
    ("approved", "approval"),
    ("status", "approval"),
];

#[derive(Serialize)]
struct RowOut<'a> {
    file_id: &'a str,
    change_type: &'a str,
    section_id: &'a str,
    xml_path: &'a str,
    old_content: &'a str,
    new_content: &'a str,
    focused_summary: &'a str,
    approval: &'a str,
}

impl<'a> RowOut<'a> {
    fn from_record(record: &'a ChangeRecord) -> Self {
        let approval = match record.approval {
            Approval::Pending => Approval::PLACEHOLDER,
            decided => decided.as_str(),
        };
        Self {
            file_id: &record.file_id,
            change_type: record.change_type.as_str(),
            section_id: &record.section_id,
            xml_path: record.xml_path.as_str(),
            old_content: &record.old_content,
            new_content: &record.new_content,
            focused_summary: &record.focused_summary,
            approval,
        }
    }
}

#[derive(Deserialize)]
struct RowIn {
    file_id: String,
    change_type: String,
    #[serde(default)]
    section_id: String,
    xml_path: String,
    #[serde(default)]
    old_content: String,
    #[serde(default)]
    new_content: String,
    #[serde(default)]
    focused_summary: String,
    #[serde(default)]
    approval: String,
}

impl RowIn {
    fn into_record(self) -> Result<ChangeRecord, String> {
        let change_type: ChangeType = self.change_type.parse().map_err(|e| format!("{e}"))?;
        let file_id = self.file_id.trim().to_string();
        if file_id.is_empty() {
            return Err("empty file_id".into());
        }
        let section_id = if self.section_id.trim().is_empty() {
            file_id.clone()
        } else {
            self.section_id
        };
        Ok(ChangeRecord {
            file_id,
            change_type,
            section_id,
            xml_path: LocationPath::new(self.xml_path.trim()),
            old_content: self.old_content,
            new_content: self.new_content,
            focused_summary: self.focused_summary,
            approval: Approval::parse_lenient(&self.approval),
        })
    }
}

/// Write records as CSV.
pub fn write_records<W: Write>(writer: W, records: &[ChangeRecord]) -> StoreResult<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    if records.is_empty() {
        wtr.write_record(COLUMNS)?;
    }
    for record in records {
        wtr.serialize(RowOut::from_record(record))?;
    }
    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Read records from CSV, collecting undecodable rows separately.
pub fn read_records<R: Read>(reader: R) -> StoreResult<LoadedRecords> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

    let headers = rdr.headers()?.clone();
    let names = canonical_headers(&headers);
    for column in REQUIRED {
        if !names.iter().any(|n| n == column) {
            return Err(StoreError::MissingColumn(column.to_string()));
        }
    }
    let cleaned = csv::StringRecord::from(names);
    rdr.set_headers(cleaned.clone());

    let mut loaded = LoadedRecords::default();
    for row in rdr.records() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                let line = e.position().map(|p| p.line()).unwrap_or(0);
                loaded.malformed.push(MalformedRow {
                    line,
                    reason: e.to_string(),
                });
                continue;
            }
        };
        let line = row.position().map(|p| p.line()).unwrap_or(0);
        let decoded = row
            .deserialize::<RowIn>(Some(&cleaned))
            .map_err(|e| e.to_string())
            .and_then(RowIn::into_record);
        match decoded {
            Ok(record) => loaded.records.push(record),
            Err(reason) => loaded.malformed.push(MalformedRow { line, reason }),
        }
    }
    Ok(loaded)
}

fn canonical_headers(headers: &csv::StringRecord) -> Vec<String> {
    let mut names: Vec<String> = headers
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();
    for (legacy, column) in LEGACY {
        if names.iter().any(|n| n == column) {
            continue;
        }
        if let Some(name) = names.iter_mut().find(|n| n.as_str() == legacy) {
            *name = column.to_string();
        }
    }
    names
}

/// A CSV review file on disk.
#[derive(Clone, Debug)]
pub struct CsvChangeStore {
    path: PathBuf,
}

impl CsvChangeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl ChangeStore for CsvChangeStore {
    fn save(&self, records: &[ChangeRecord]) -> StoreResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let file = File::create(&self.path).map_err(|e| self.io_error(e))?;
        write_records(file, records)?;
        debug!(path = %self.path.display(), records = records.len(), "wrote change file");
        Ok(())
    }

    fn load(&self) -> StoreResult<LoadedRecords> {
        let file = File::open(&self.path).map_err(|e| self.io_error(e))?;
        let loaded = read_records(file)?;
        debug!(
            path = %self.path.display(),
            records = loaded.records.len(),
            malformed = loaded.malformed.len(),
            "read change file"
        );
        Ok(loaded)
    }
}
