//! Analyze two corpora, review the CSV, apply it, and check the output.

use std::fs;
use std::path::Path;

use recon_batch::{Analyzer, Applier};
use recon_diff::DiffConfig;
use recon_doc::Document;
use recon_store::CsvChangeStore;
use recon_types::{Approval, ChangeRecord, ChangeType, LocationPath};
use tempfile::TempDir;

const ORIGINAL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<catalog>
  <version>1.0</version>
  <tool name="Julia" kind="lang">
    <desc>fast dynamic numerical computing</desc>
  </tool>
  <tool name="Go" kind="lang"/>
</catalog>
"#;

fn write_corpus(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, body) in files {
        let path = dir.path().join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }
    dir
}

fn read(root: &Path, name: &str) -> String {
    fs::read_to_string(root.join(name)).unwrap()
}

/// Replace every approval placeholder in the CSV with `decision`.
fn review(store: &CsvChangeStore, decision: &str) {
    let text = fs::read_to_string(store.path()).unwrap();
    fs::write(store.path(), text.replace("\"approved,rejected,pending\"", decision)).unwrap();
}

fn analyzer() -> Analyzer {
    Analyzer::new(DiffConfig::default()).unwrap()
}

#[test]
fn version_bump_is_one_modify_and_applies_cleanly() {
    let revised = ORIGINAL.replace("<version>1.0</version>", "<version>1.1</version>");
    let a = write_corpus(&[("catalog.xml", ORIGINAL)]);
    let b = write_corpus(&[("catalog.xml", &revised)]);
    let work = tempfile::tempdir().unwrap();
    let store = CsvChangeStore::new(work.path().join("output/xml_changes.csv"));

    let analysis = analyzer().analyze_into(a.path(), b.path(), &store).unwrap();
    assert_eq!(analysis.records.len(), 1);
    let record = &analysis.records[0];
    assert_eq!(record.change_type, ChangeType::Modify);
    assert_eq!(record.xml_path.as_str(), "/version");
    assert_eq!(record.old_content, "1.0");
    assert_eq!(record.new_content, "1.1");
    assert_eq!(record.focused_summary, "CHANGED: '[1.0]' → '[1.1]'");
    assert_eq!(record.approval, Approval::Pending);

    review(&store, "approved");
    let out = work.path().join("updated");
    let summary = Applier::new().apply_from(a.path(), &store, &out).unwrap();

    assert_eq!(read(&out, "catalog.xml"), revised);
    assert_eq!(summary.records.applied, 1);
    assert_eq!(summary.files.modified, 1);
    assert!(summary.is_clean());
}

#[test]
fn approving_every_modification_reproduces_the_revision() {
    let revised = ORIGINAL
        .replace("<version>1.0</version>", "<version>2.0</version>")
        .replace("name=\"Julia\" kind=\"lang\"", "name=\"Julia\" kind=\"language\"")
        .replace("fast dynamic", "fast and dynamic");
    let a = write_corpus(&[("catalog.xml", ORIGINAL)]);
    let b = write_corpus(&[("catalog.xml", &revised)]);

    let analysis = analyzer().analyze_dirs(a.path(), b.path()).unwrap();
    assert_eq!(analysis.records.len(), 3);
    assert!(analysis.records.iter().all(|r| r.change_type == ChangeType::Modify));
    let paths: Vec<&str> = analysis.records.iter().map(|r| r.xml_path.as_str()).collect();
    assert!(paths.contains(&"/tool[@name='Julia']/@kind"));
    assert!(paths.contains(&"/tool[@name='Julia']/desc"));

    let approved: Vec<ChangeRecord> = analysis
        .records
        .into_iter()
        .map(|r| r.with_approval(Approval::Approved))
        .collect();
    let out = tempfile::tempdir().unwrap();
    Applier::new().apply_dir(a.path(), &approved, out.path()).unwrap();
    assert_eq!(read(out.path(), "catalog.xml"), revised);
}

#[test]
fn only_approved_records_reach_the_output() {
    let a = write_corpus(&[("catalog.xml", ORIGINAL)]);
    let records = vec![
        ChangeRecord::modify("catalog", LocationPath::new("/version"), "1.0", "1.1")
            .with_approval(Approval::Approved),
        ChangeRecord::add("catalog", LocationPath::new("/tool[@name='Rust']"), "<tool name=\"Rust\"/>")
            .with_approval(Approval::Rejected),
        ChangeRecord::delete("catalog", LocationPath::new("/tool[@name='Go']"), "<tool name=\"Go\" kind=\"lang\"/>"),
    ];
    let out = tempfile::tempdir().unwrap();
    let summary = Applier::new().apply_dir(a.path(), &records, out.path()).unwrap();

    let expected = ORIGINAL.replace("<version>1.0</version>", "<version>1.1</version>");
    assert_eq!(read(out.path(), "catalog.xml"), expected);
    assert_eq!(summary.records.applied, 1);
    assert_eq!(summary.records.not_approved, 2);
    assert_eq!(summary.approvals.pending, 1);
    assert_eq!(summary.approvals.rejected, 1);
}

#[test]
fn moved_element_is_one_pair_and_relocates_on_apply() {
    let without_julia = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<catalog>\n  <version>1.0</version>\n  <tool name=\"Go\" kind=\"lang\"/>\n</catalog>\n";
    let other = "<catalog>\n  <tool name=\"Rust\" kind=\"lang\"/>\n</catalog>\n";
    let other_with_julia = "<catalog>\n  <tool name=\"Rust\" kind=\"lang\"/>\n  <tool name=\"Julia\" kind=\"lang\">\n    <desc>fast dynamic numerical computing</desc>\n  </tool>\n</catalog>\n";

    let a = write_corpus(&[("catalog.xml", ORIGINAL), ("langs/other.xml", other)]);
    let b = write_corpus(&[("catalog.xml", without_julia), ("langs/other.xml", other_with_julia)]);
    let work = tempfile::tempdir().unwrap();
    let store = CsvChangeStore::new(work.path().join("changes.csv"));

    let analysis = analyzer().analyze_into(a.path(), b.path(), &store).unwrap();
    assert_eq!(analysis.records.len(), 2);
    assert!(analysis.records.iter().all(|r| r.change_type == ChangeType::Move));
    let links: Vec<_> = analysis.records.iter().map(|r| r.move_link().unwrap()).collect();
    assert_eq!(links[0].key, links[1].key);
    assert_ne!(links[0].role, links[1].role);

    review(&store, "approved");
    let out = work.path().join("updated");
    let summary = Applier::new().apply_from(a.path(), &store, &out).unwrap();
    assert!(summary.is_clean());
    assert_eq!(summary.records.applied, 2);

    let catalog = read(&out, "catalog.xml");
    assert_eq!(catalog, without_julia);
    let moved_into = Document::parse(&read(&out, "langs/other.xml")).unwrap();
    let names: Vec<&str> = moved_into.root.elements().filter_map(|e| e.attribute("name")).collect();
    assert_eq!(names, vec!["Rust", "Julia"]);
}

#[test]
fn applying_twice_gives_identical_bytes() {
    let revised = ORIGINAL
        .replace("<version>1.0</version>", "<version>1.1</version>")
        .replace("  <tool name=\"Go\" kind=\"lang\"/>\n", "  <tool name=\"Go\" kind=\"lang\"/>\n  <tool name=\"Zig\" kind=\"lang\"/>\n");
    let a = write_corpus(&[("catalog.xml", ORIGINAL)]);
    let b = write_corpus(&[("catalog.xml", &revised)]);

    let approved: Vec<ChangeRecord> = analyzer()
        .analyze_dirs(a.path(), b.path())
        .unwrap()
        .records
        .into_iter()
        .map(|r| r.with_approval(Approval::Approved))
        .collect();

    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    Applier::new().apply_dir(a.path(), &approved, first.path()).unwrap();
    Applier::new().apply_dir(a.path(), &approved, second.path()).unwrap();
    let output = read(first.path(), "catalog.xml");
    assert_eq!(output, read(second.path(), "catalog.xml"));
    assert!(output.contains("<tool name=\"Zig\" kind=\"lang\"/>"));
}

#[test]
fn identical_corpora_yield_no_records_and_copy_through() {
    let quirky = "\u{feff}<?xml version='1.0'?>\r\n<catalog  >\r\n\t<version>1.0</version>\r\n</catalog>";
    let a = write_corpus(&[("catalog.xml", ORIGINAL), ("quirky.xml", quirky)]);
    let b = write_corpus(&[("catalog.xml", ORIGINAL), ("quirky.xml", quirky)]);

    let analysis = analyzer().analyze_dirs(a.path(), b.path()).unwrap();
    assert!(analysis.records.is_empty());
    assert_eq!(analysis.summary.files.unchanged, 2);

    let out = tempfile::tempdir().unwrap();
    let summary = Applier::new().apply_dir(a.path(), &analysis.records, out.path()).unwrap();
    assert_eq!(summary.files.unchanged, 2);
    assert_eq!(fs::read(out.path().join("quirky.xml")).unwrap(), quirky.as_bytes());
}

#[test]
fn replaced_documents_are_whole_file_records() {
    let a = write_corpus(&[("catalog.xml", ORIGINAL)]);
    let b = write_corpus(&[("catalog.xml", "<inventory><item id=\"1\"/></inventory>")]);

    let records = analyzer().analyze_dirs(a.path(), b.path()).unwrap().records;
    let kinds: Vec<ChangeType> = records.iter().map(|r| r.change_type).collect();
    assert_eq!(kinds, vec![ChangeType::Delete, ChangeType::Add]);
    assert!(records.iter().all(|r| r.xml_path.is_root()));
    assert_eq!(records[0].old_content, ORIGINAL);
}

const ROSTER: &str = "<roster>\n  <team name=\"legacy\"/>\n  <team>\n    <member name=\"ann\"/>\n  </team>\n  <team>\n    <member name=\"bo\"/>\n  </team>\n</roster>\n";

#[test]
fn additions_under_positional_parents_survive_sibling_removal() {
    let roster = ROSTER.replace("<member name=\"ann\"/>", "<member name=\"ann\"/>\n    <member>cy</member>");
    let revised = roster.replace("  <team name=\"legacy\"/>\n", "");
    let a = write_corpus(&[("roster.xml", ROSTER)]);
    let b = write_corpus(&[("roster.xml", &revised)]);
    let work = tempfile::tempdir().unwrap();
    let store = CsvChangeStore::new(work.path().join("changes.csv"));

    let analysis = analyzer().analyze_into(a.path(), b.path(), &store).unwrap();
    let mut found: Vec<(ChangeType, &str)> = analysis
        .records
        .iter()
        .map(|r| (r.change_type, r.xml_path.as_str()))
        .collect();
    found.sort();
    assert_eq!(
        found,
        vec![(ChangeType::Add, "/team[2]/member[2]"), (ChangeType::Delete, "/team[@name='legacy']")]
    );

    review(&store, "approved");
    let out = work.path().join("updated");
    let summary = Applier::new().apply_from(a.path(), &store, &out).unwrap();
    assert!(summary.is_clean(), "{:?}", summary.warnings);
    assert_eq!(summary.records.applied, 2);
    assert_eq!(read(&out, "roster.xml"), revised);
}

#[test]
fn moves_into_positional_parents_survive_sibling_removal() {
    let archive = "<archive>\n  <member name=\"cy\" role=\"lead\"/>\n  <member name=\"dan\"/>\n</archive>\n";
    let archive_after = "<archive>\n  <member name=\"dan\"/>\n</archive>\n";
    let revised = ROSTER
        .replace("  <team name=\"legacy\"/>\n", "")
        .replace("<member name=\"ann\"/>", "<member name=\"ann\"/>\n    <member name=\"cy\" role=\"lead\"/>");
    let a = write_corpus(&[("roster.xml", ROSTER), ("archive.xml", archive)]);
    let b = write_corpus(&[("roster.xml", &revised), ("archive.xml", archive_after)]);
    let work = tempfile::tempdir().unwrap();
    let store = CsvChangeStore::new(work.path().join("changes.csv"));

    let analysis = analyzer().analyze_into(a.path(), b.path(), &store).unwrap();
    assert_eq!(analysis.summary.changes.moved, 2);
    let target = analysis
        .records
        .iter()
        .find(|r| r.change_type == ChangeType::Move && r.file_id == "roster")
        .unwrap();
    assert_eq!(target.xml_path.as_str(), "/team[2]/member[@name='cy']");

    review(&store, "approved");
    let out = work.path().join("updated");
    let summary = Applier::new().apply_from(a.path(), &store, &out).unwrap();
    assert!(summary.is_clean(), "{:?}", summary.warnings);
    assert_eq!(read(&out, "roster.xml"), revised);
    assert_eq!(read(&out, "archive.xml"), archive_after);
}

#[test]
fn mixed_content_text_changes_keep_their_place() {
    let original = "<notes>\n  <p>Hello <b>big</b> world</p>\n  <p>Plain text</p>\n</notes>\n";
    let revised = "<notes>\n  <p>Hello <b>big</b> there</p>\n  <p>Plain words</p>\n</notes>\n";
    let a = write_corpus(&[("notes.xml", original)]);
    let b = write_corpus(&[("notes.xml", revised)]);
    let work = tempfile::tempdir().unwrap();
    let store = CsvChangeStore::new(work.path().join("changes.csv"));

    let analysis = analyzer().analyze_into(a.path(), b.path(), &store).unwrap();
    assert_eq!(analysis.records.len(), 2);
    assert_eq!(analysis.records[0].old_content, "Hello world");

    review(&store, "approved");
    let out = work.path().join("updated");
    Applier::new().apply_from(a.path(), &store, &out).unwrap();
    assert_eq!(read(&out, "notes.xml"), revised);
}
