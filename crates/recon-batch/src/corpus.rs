//! Document sets on disk and the pairing between them.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::error::{BatchError, BatchResult};

/// One document of a corpus.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CorpusFile {
    /// Path relative to the corpus root, without extension, `/`-separated.
    pub file_id: String,
    /// Path relative to the corpus root.
    pub relative: PathBuf,
    /// Full path on disk.
    pub path: PathBuf,
}

/// All `.xml` documents below a root directory, keyed by file id.
#[derive(Clone, Debug)]
pub struct Corpus {
    root: PathBuf,
    files: BTreeMap<String, CorpusFile>,
}

impl Corpus {
    /// Scan `root` recursively for `.xml` files.
    pub fn scan(root: &Path) -> BatchResult<Self> {
        if !root.is_dir() {
            return Err(BatchError::NotADirectory(root.to_path_buf()));
        }

        let mut files = BTreeMap::new();
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() || !is_xml(entry.path()) {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(root) else {
                continue;
            };
            let file_id = file_id_for(relative);
            files.insert(
                file_id.clone(),
                CorpusFile {
                    file_id,
                    relative: relative.to_path_buf(),
                    path: entry.path().to_path_buf(),
                },
            );
        }

        debug!(root = %root.display(), files = files.len(), "scanned corpus");
        Ok(Self {
            root: root.to_path_buf(),
            files,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn get(&self, file_id: &str) -> Option<&CorpusFile> {
        self.files.get(file_id)
    }

    /// Files in file id order.
    pub fn iter(&self) -> impl Iterator<Item = &CorpusFile> {
        self.files.values()
    }
}

/// A unit of analysis: one file id and the sides it exists on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilePair<'a> {
    Both {
        original: &'a CorpusFile,
        revised: &'a CorpusFile,
    },
    OriginalOnly(&'a CorpusFile),
    RevisedOnly(&'a CorpusFile),
}

impl<'a> FilePair<'a> {
    pub fn file_id(&self) -> &'a str {
        match *self {
            FilePair::Both { original, .. } => &original.file_id,
            FilePair::OriginalOnly(file) | FilePair::RevisedOnly(file) => &file.file_id,
        }
    }
}

/// Match the files of two corpora by file id, in file id order.
pub fn pair<'a>(original: &'a Corpus, revised: &'a Corpus) -> Vec<FilePair<'a>> {
    let ids: BTreeSet<&str> = original
        .files
        .keys()
        .chain(revised.files.keys())
        .map(String::as_str)
        .collect();

    ids.into_iter()
        .filter_map(|id| match (original.get(id), revised.get(id)) {
            (Some(original), Some(revised)) => Some(FilePair::Both { original, revised }),
            (Some(original), None) => Some(FilePair::OriginalOnly(original)),
            (None, Some(revised)) => Some(FilePair::RevisedOnly(revised)),
            (None, None) => None,
        })
        .collect()
}

/// File id of a corpus-relative path: extension dropped, `/` separators.
pub fn file_id_for(relative: &Path) -> String {
    let stem = relative.with_extension("");
    stem.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Where the document for `file_id` goes below `root`.
pub fn output_path(root: &Path, file_id: &str) -> PathBuf {
    let parts: Vec<&str> = file_id
        .split('/')
        .filter(|p| !p.is_empty() && *p != "." && *p != "..")
        .collect();
    let mut path = root.to_path_buf();
    if let Some((name, dirs)) = parts.split_last() {
        path.extend(dirs);
        path.push(format!("{name}.xml"));
    }
    path
}

fn is_xml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("xml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "<a/>").unwrap();
    }

    #[test]
    fn scan_finds_nested_xml_files() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "tools.xml");
        touch(dir.path(), "langs/julia.XML");
        touch(dir.path(), "notes.txt");

        let corpus = Corpus::scan(dir.path()).unwrap();
        let ids: Vec<&str> = corpus.iter().map(|f| f.file_id.as_str()).collect();
        assert_eq!(ids, vec!["langs/julia", "tools"]);
        assert_eq!(corpus.get("langs/julia").unwrap().relative, Path::new("langs/julia.XML"));
    }

    #[test]
    fn scan_rejects_missing_roots() {
        let dir = tempfile::tempdir().unwrap();
        let err = Corpus::scan(&dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, BatchError::NotADirectory(_)));
    }

    #[test]
    fn pairs_cover_both_sides_in_order() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        touch(a.path(), "common.xml");
        touch(a.path(), "gone.xml");
        touch(b.path(), "common.xml");
        touch(b.path(), "fresh.xml");

        let (a, b) = (Corpus::scan(a.path()).unwrap(), Corpus::scan(b.path()).unwrap());
        let pairs = pair(&a, &b);
        let ids: Vec<&str> = pairs.iter().map(|p| p.file_id()).collect();
        assert_eq!(ids, vec!["common", "fresh", "gone"]);
        assert!(matches!(pairs[0], FilePair::Both { .. }));
        assert!(matches!(pairs[1], FilePair::RevisedOnly(_)));
        assert!(matches!(pairs[2], FilePair::OriginalOnly(_)));
    }

    #[test]
    fn output_paths_stay_below_the_root() {
        let root = Path::new("out");
        assert_eq!(output_path(root, "langs/julia"), Path::new("out/langs/julia.xml"));
        assert_eq!(output_path(root, "../escape"), Path::new("out/escape.xml"));
        assert_eq!(output_path(root, "archive.v2"), Path::new("out/archive.v2.xml"));
        assert_eq!(file_id_for(Path::new("langs/julia.xml")), "langs/julia");
    }
}
