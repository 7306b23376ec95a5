use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use recon_batch::{Analysis, Analyzer, Applier, RunSummary};
use recon_store::{ApprovalCounts, ChangeStore, CsvChangeStore};
use recon_types::{ChangeRecord, ChangeType};
use serde::Serialize;

use crate::cli::*;
use crate::config::{timestamp, Config};

const PREVIEW_RECORDS: usize = 3;
const PREVIEW_CHARS: usize = 100;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load_or_default(cli.config.as_deref())?;
    match cli.command {
        Command::Analyze(args) => cmd_analyze(args, config, cli.format),
        Command::Apply(args) => cmd_apply(args, config, cli.format),
    }
}

#[derive(Serialize)]
struct AnalyzeOutput<'a> {
    set_a: &'a Path,
    set_b: &'a Path,
    output: &'a Path,
    summary: &'a RunSummary,
    preview: &'a [ChangeRecord],
}

#[derive(Serialize)]
struct ApplyOutput<'a> {
    source: &'a Path,
    csv: &'a Path,
    output: Option<&'a Path>,
    approvals: ApprovalCounts,
    summary: Option<&'a RunSummary>,
}

fn cmd_analyze(args: AnalyzeArgs, config: Config, format: OutputFormat) -> anyhow::Result<()> {
    let Config { paths, mut diff } = config;
    if args.no_moves {
        diff.detect_moves = false;
    }
    let set_a = args.set_a.unwrap_or_else(|| paths.set_a.clone());
    let set_b = args.set_b.unwrap_or_else(|| paths.set_b.clone());
    anyhow::ensure!(set_a.is_dir(), "set_a directory not found: {}", set_a.display());
    anyhow::ensure!(set_b.is_dir(), "set_b directory not found: {}", set_b.display());
    let output = args
        .output
        .unwrap_or_else(|| paths.changes_csv(&timestamp(&chrono::Local::now())));

    let store = CsvChangeStore::new(&output);
    let analysis = Analyzer::new(diff)?
        .analyze_into(&set_a, &set_b, &store)
        .with_context(|| format!("analysis of {} against {} failed", set_a.display(), set_b.display()))?;

    match format {
        OutputFormat::Json => {
            let preview_len = analysis.records.len().min(PREVIEW_RECORDS);
            let out = AnalyzeOutput {
                set_a: &set_a,
                set_b: &set_b,
                output: &output,
                summary: &analysis.summary,
                preview: &analysis.records[..preview_len],
            };
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Text => print_analysis(&analysis, &set_a, &set_b, &output),
    }
    Ok(())
}

fn print_analysis(analysis: &Analysis, set_a: &Path, set_b: &Path, output: &Path) {
    let summary = &analysis.summary;
    println!("{} Analysis complete", "✓".green().bold());
    println!("  Set A: {}", set_a.display());
    println!("  Set B: {}", set_b.display());
    println!(
        "  Files: {} processed ({} unchanged, {} modified, {} new, {} removed)",
        summary.files.processed.to_string().bold(),
        summary.files.unchanged,
        summary.files.modified,
        summary.files.created,
        summary.files.removed,
    );
    print_errors(summary);

    println!("\nTotal changes found: {}", analysis.records.len().to_string().bold());
    if summary.changes.total() > 0 {
        println!("Change breakdown:");
        for change_type in ChangeType::ALL {
            let count = summary.changes.get(change_type);
            if count > 0 {
                println!("  {:10}: {:4} changes", change_type.as_str().cyan(), count);
            }
        }
    }
    println!("\nResults saved to: {}", output.display().to_string().yellow());

    if !analysis.records.is_empty() {
        println!("\nFirst {} changes preview:", analysis.records.len().min(PREVIEW_RECORDS));
        for (i, record) in analysis.records.iter().take(PREVIEW_RECORDS).enumerate() {
            println!("  {}. [{}] {} - {}", i + 1, record.change_type.as_str().cyan(), record.file_id, record.xml_path);
            println!("     Old: {}", preview(&record.old_content).dimmed());
            println!("     New: {}", preview(&record.new_content));
        }
    }
}

fn cmd_apply(args: ApplyArgs, config: Config, format: OutputFormat) -> anyhow::Result<()> {
    let paths = config.paths;
    let source = args.source.unwrap_or_else(|| paths.source().to_path_buf());
    let csv = args.csv.unwrap_or_else(|| paths.input_csv.clone());
    anyhow::ensure!(source.is_dir(), "source directory not found: {}", source.display());
    if !csv.is_file() {
        anyhow::bail!(
            "change file not found: {}\nPlace the reviewed CSV there (copy it from {} after review)",
            csv.display(),
            paths.output_dir.display()
        );
    }

    let loaded = CsvChangeStore::new(&csv)
        .load()
        .with_context(|| format!("cannot load {}", csv.display()))?;
    let approvals = loaded.approval_counts();

    if !loaded.has_approved() {
        match format {
            OutputFormat::Json => {
                let out = ApplyOutput { source: &source, csv: &csv, output: None, approvals, summary: None };
                println!("{}", serde_json::to_string_pretty(&out)?);
            }
            OutputFormat::Text => {
                print_approvals(approvals, loaded.malformed.len());
                println!(
                    "{} No approved changes found. Set the approval column to {} for the changes to apply.",
                    "!".yellow().bold(),
                    "approved".green()
                );
            }
        }
        return Ok(());
    }

    let output = args
        .output
        .unwrap_or_else(|| paths.updated_dir(&timestamp(&chrono::Local::now())));
    let mut summary = Applier::new()
        .apply_dir(&source, &loaded.records, &output)
        .with_context(|| format!("applying {} to {} failed", csv.display(), source.display()))?;
    summary.malformed_rows = loaded.malformed.len();

    match format {
        OutputFormat::Json => {
            let out = ApplyOutput {
                source: &source,
                csv: &csv,
                output: Some(&output),
                approvals,
                summary: Some(&summary),
            };
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Text => {
            print_approvals(approvals, summary.malformed_rows);
            print_application(&summary, &output);
        }
    }
    Ok(())
}

fn print_approvals(approvals: ApprovalCounts, malformed: usize) {
    println!("Loaded changes from CSV:");
    println!("  Approved changes: {}", approvals.approved.to_string().green());
    println!("  Rejected changes: {}", approvals.rejected.to_string().red());
    println!("  Pending changes: {}", approvals.pending.to_string().yellow());
    if malformed > 0 {
        println!("  Unreadable rows: {}", malformed.to_string().red());
    }
}

fn print_application(summary: &RunSummary, output: &Path) {
    let files = &summary.files;
    let records = &summary.records;
    println!("\n{} Applied {} of {} approved changes", "✓".green().bold(), records.applied, summary.approvals.approved);
    println!(
        "  Files: {} written ({} updated, {} copied, {} new), {} removed",
        files.modified + files.unchanged + files.created,
        files.modified,
        files.unchanged,
        files.created,
        files.removed,
    );
    if records.skipped > 0 {
        println!("  {} {} changes skipped:", "!".yellow().bold(), records.skipped);
        for warning in &summary.warnings {
            println!("    {} {}", warning.file_id.bold(), warning.warning);
        }
    }
    print_errors(summary);
    println!("Updated XML files saved to: {}", output.display().to_string().yellow());
}

fn print_errors(summary: &RunSummary) {
    for error in &summary.errors {
        println!("  {} {}", "✗".red().bold(), error);
    }
    if summary.cancelled {
        println!("  {} run cancelled, {} files not processed", "✗".red().bold(), summary.files.cancelled);
    }
}

fn preview(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::fs;

    fn run(args: &[&str]) -> anyhow::Result<()> {
        run_command(Cli::try_parse_from(args)?)
    }

    #[test]
    fn preview_truncates_long_content() {
        assert_eq!(preview("short"), "short");
        let long = "é".repeat(150);
        let cut = preview(&long);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.chars().count(), PREVIEW_CHARS + 3);
    }

    #[test]
    fn analyze_then_apply_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let (a, b) = (dir.path().join("a"), dir.path().join("b"));
        fs::create_dir_all(&a).unwrap();
        fs::create_dir_all(&b).unwrap();
        fs::write(a.join("doc.xml"), "<r>\n  <version>1.0</version>\n</r>\n").unwrap();
        fs::write(b.join("doc.xml"), "<r>\n  <version>1.1</version>\n</r>\n").unwrap();
        let csv = dir.path().join("changes.csv");
        let out = dir.path().join("updated");
        let config = dir.path().join("none.toml");
        let s = |p: &Path| p.to_str().unwrap().to_string();

        run(&["xmlrecon", "-c", &s(&config), "analyze", &s(&a), &s(&b), "-o", &s(&csv)]).unwrap();
        let text = fs::read_to_string(&csv).unwrap();
        assert!(text.contains("/version"));

        // Nothing approved yet: no output directory.
        run(&["xmlrecon", "-c", &s(&config), "apply", &s(&a), &s(&csv), "-o", &s(&out)]).unwrap();
        assert!(!out.exists());

        fs::write(&csv, text.replace("\"approved,rejected,pending\"", "approved")).unwrap();
        run(&["xmlrecon", "-c", &s(&config), "--format", "json", "apply", &s(&a), &s(&csv), "-o", &s(&out)])
            .unwrap();
        assert_eq!(fs::read_to_string(out.join("doc.xml")).unwrap(), "<r>\n  <version>1.1</version>\n</r>\n");
    }

    #[test]
    fn missing_inputs_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let absent = dir.path().join("absent");
        let config = dir.path().join("none.toml");
        let err = run(&[
            "xmlrecon",
            "-c",
            config.to_str().unwrap(),
            "analyze",
            absent.to_str().unwrap(),
            absent.to_str().unwrap(),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("set_a directory not found"));

        let err = run(&["xmlrecon", "-c", config.to_str().unwrap(), "apply", dir.path().to_str().unwrap(), absent.to_str().unwrap()])
            .unwrap_err();
        assert!(err.to_string().contains("change file not found"));
    }
}
