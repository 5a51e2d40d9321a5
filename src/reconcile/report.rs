//! Plain-text rendering of reconciliation results for the terminal.

use std::fmt::Write;

use super::{CollectionReport, DocumentOutcome, ReconciliationResult};

/// Per-field report for one document in one collection.
pub fn render_document(collection: &str, outcome: &DocumentOutcome) -> String {
    let mut out = String::new();
    match outcome {
        DocumentOutcome::NoFindings { document_id } => {
            let _ = writeln!(
                out,
                "[{collection}] {document_id}: no storage URLs or empty references found"
            );
        }
        DocumentOutcome::Reconciled(result) => write_result(&mut out, collection, result),
    }
    out
}

/// Summary of a whole-collection run, followed by every document that changed
/// or had skipped fields.
pub fn render_collection(report: &CollectionReport) -> String {
    let mut out = String::new();
    let collection = &report.collection;

    for outcome in &report.outcomes {
        if let DocumentOutcome::Reconciled(result) = outcome {
            if !result.changes.is_empty() || !result.skipped.is_empty() {
                write_result(&mut out, collection, result);
            }
        }
    }
    for (id, error) in &report.failures {
        let _ = writeln!(out, "[{collection}] {id}: FAILED: {error}");
    }

    let scanned = report.outcomes.len() + report.failures.len();
    let _ = writeln!(out, "[{collection}] Summary");
    let _ = writeln!(out, "  Documents: {scanned}");
    let _ = writeln!(out, "  Updated:   {}", report.updated_documents());
    let _ = writeln!(out, "  Failed:    {}", report.failures.len());
    out
}

fn write_result(out: &mut String, collection: &str, result: &ReconciliationResult) {
    let id = &result.document_id;
    let _ = writeln!(out, "[{collection}] {id}");

    for change in &result.changes {
        let _ = writeln!(out, "  {}: {}", change.path, change.kind);
        if let Some(old) = &change.old_url {
            let _ = writeln!(out, "    old: {old}");
        }
        if let Some(new) = &change.new_url {
            let _ = writeln!(out, "    new: {new}");
        }
    }
    for skipped in &result.skipped {
        let _ = writeln!(out, "  {}: skipped, {}", skipped.path, skipped.reason);
    }

    let status = if result.changes.is_empty() {
        "all URLs already current".to_string()
    } else if result.persisted {
        format!("{} URL(s) updated", result.updated_count())
    } else {
        format!("{} URL(s) would be updated (not written)", result.updated_count())
    };
    let _ = writeln!(out, "  => {status}");
}
