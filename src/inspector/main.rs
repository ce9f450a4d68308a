//! Offline check of a lookup spreadsheet.
//!
//! Parses a file exactly the way an admin upload is parsed and reports
//! what the bot would load, so a sheet can be checked before sending it.

use std::collections::HashMap;
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;

use gated_lookup_bot::dataset::{Dataset, DatasetRecord, parse_dataset};

/// Lookup spreadsheet inspector.
#[derive(Parser, Debug)]
#[command(name = "inspect_dataset")]
#[command(about = "Checks a spreadsheet the way the lookup bot would load it")]
#[command(version)]
struct Args {
    /// Path to the spreadsheet to inspect.
    #[arg(short, long)]
    file: String,

    /// Show the records matching this ID.
    #[arg(short, long)]
    id: Option<String>,

    /// Accepted upload extension.
    #[arg(long, default_value = ".xlsx")]
    extension: String,

    /// List every column and duplicate ID.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    inspect(&args)
}

fn inspect(args: &Args) -> ExitCode {
    println!("Inspecting: {}", args.file);

    let path = Path::new(&args.file);
    let file_name = path
        .file_name()
        .map_or_else(|| args.file.clone(), |n| n.to_string_lossy().into_owned());

    if !file_name.to_lowercase().ends_with(&args.extension.to_lowercase()) {
        eprintln!("✗ Rejected: only {} files are accepted", args.extension);
        return ExitCode::FAILURE;
    }

    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("✗ Failed to read file: {e}");
            return ExitCode::FAILURE;
        }
    };

    let dataset = match parse_dataset(&bytes, &file_name, None) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("✗ Rejected: {e}");
            return ExitCode::FAILURE;
        }
    };

    report(&dataset, args.verbose);

    if let Some(id) = &args.id {
        show_matches(&dataset, id);
    }

    ExitCode::SUCCESS
}

fn report(dataset: &Dataset, verbose: bool) {
    let blank_ids = dataset.records.iter().filter(|r| r.id.is_empty()).count();

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for record in dataset.records.iter().filter(|r| !r.id.is_empty()) {
        *counts.entry(record.id.as_str()).or_default() += 1;
    }
    let mut duplicates: Vec<(&str, usize)> = counts.into_iter().filter(|(_, n)| *n > 1).collect();
    duplicates.sort_unstable();

    println!("✓ Accepted: {} records, {} columns", dataset.len(), dataset.columns.len());

    if verbose {
        println!("\nColumns:");
        for (i, column) in dataset.columns.iter().enumerate() {
            println!("  {:>3}. {column}", i + 1);
        }
    }

    if blank_ids > 0 {
        println!("  ⚠ {blank_ids} row(s) have an empty ID and can never be found");
    }

    if !duplicates.is_empty() {
        println!("  ⚠ {} ID(s) appear more than once", duplicates.len());
        if verbose {
            for (id, n) in &duplicates {
                println!("    {id}: {n} rows");
            }
        }
    }
}

fn show_matches(dataset: &Dataset, id: &str) {
    let matches = dataset.find(id);
    println!();

    if matches.is_empty() {
        println!("No records for ID {}", id.trim());
        return;
    }

    println!("{} record(s) for ID {}:", matches.len(), id.trim());
    for (i, record) in matches.iter().enumerate() {
        println!("\n[{}]", i + 1);
        print_record(record);
    }
}

fn print_record(record: &DatasetRecord) {
    let width = record.columns().map(|c| c.chars().count()).max().unwrap_or(0);
    for (column, value) in &record.fields {
        println!("  {column:<width$} : {value}");
    }
}
