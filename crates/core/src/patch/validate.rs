//! Manifest validation and the plain-text report.
//!
//! Errors are fatal at the loading boundary. Warnings are logged and the
//! records are still used.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;

use super::record::PatchRecord;

static DATE_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][a-z]+ \d{1,2}, \d{4}$").expect("valid date pattern"));

/// Outcome of validating a record set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub total_patches: usize,
    pub unique_patches: usize,
}

/// Validate records against the manifest rules.
///
/// `today` decides which dates count as "in the future".
pub fn validate_records(records: &[PatchRecord], today: NaiveDate) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let mut seen = HashSet::new();

    for (index, record) in records.iter().enumerate() {
        let context = format!("Patch at index {index}");

        if record.patch.is_empty() {
            errors.push(format!("{context}: Missing \"patch\" number"));
        } else if !seen.insert(record.patch.as_str()) {
            errors.push(format!("{context}: Duplicate patch number \"{}\"", record.patch));
        }

        if record.link.is_empty() {
            errors.push(format!("{context}: Missing \"link\" field"));
        } else {
            if !record.link.starts_with("pages/") {
                warnings.push(format!("{context}: Link doesn't start with \"pages/\" - \"{}\"", record.link));
            }
            if !record.link.ends_with(".html") {
                warnings.push(format!("{context}: Link doesn't end with \".html\" - \"{}\"", record.link));
            }
        }

        if !DATE_SHAPE.is_match(&record.date) {
            errors.push(format!(
                "{context}: Invalid date format \"{}\". Expected \"Month DD, YYYY\"",
                record.date
            ));
        } else {
            match NaiveDate::parse_from_str(&record.date, "%B %d, %Y") {
                Ok(date) if date > today => {
                    warnings.push(format!("{context}: Future date detected \"{}\"", record.date));
                }
                Ok(_) => {}
                Err(_) => errors.push(format!("{context}: Invalid date \"{}\"", record.date)),
            }
        }

        if !record.extra.is_empty() {
            let names: Vec<&str> = record.extra.keys().map(String::as_str).collect();
            warnings.push(format!("{context}: Extra fields detected - {}", names.join(", ")));
        }
    }

    let numbers: Vec<u64> = records.iter().filter_map(|r| r.patch.parse().ok()).collect();
    if let Some(pair) = numbers.windows(2).find(|w| w[0] < w[1]) {
        warnings.push(format!(
            "Patches may not be sorted correctly: {} comes before {}",
            pair[0], pair[1]
        ));
    }

    ValidationReport {
        valid: errors.is_empty(),
        errors,
        warnings,
        total_patches: records.len(),
        unique_patches: seen.len(),
    }
}

/// Validate against the current UTC date.
pub fn validate_current(records: &[PatchRecord]) -> ValidationReport {
    validate_records(records, chrono::Utc::now().date_naive())
}

/// Render a report the way the validation command prints it.
pub fn generate_report(report: &ValidationReport) -> String {
    let mut out = String::from("=== Patches.json Validation Report ===\n\n");
    let _ = writeln!(out, "Status: {}", if report.valid { "PASSED" } else { "FAILED" });
    let _ = writeln!(out, "Total Patches: {}", report.total_patches);
    let _ = writeln!(out, "Unique Patches: {}", report.unique_patches);
    let _ = writeln!(out, "Errors: {}", report.errors.len());
    let _ = writeln!(out, "Warnings: {}\n", report.warnings.len());

    if !report.errors.is_empty() {
        out.push_str("--- Errors ---\n");
        for (i, error) in report.errors.iter().enumerate() {
            let _ = writeln!(out, "{}. {error}", i + 1);
        }
        out.push('\n');
    }

    if !report.warnings.is_empty() {
        out.push_str("--- Warnings ---\n");
        for (i, warning) in report.warnings.iter().enumerate() {
            let _ = writeln!(out, "{}. {warning}", i + 1);
        }
        out.push('\n');
    }

    out.push_str("=======================================");
    out
}
