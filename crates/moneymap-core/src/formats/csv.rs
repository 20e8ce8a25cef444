//! CSV export of ledger rows.

use crate::ledger::Entry;
use chrono::SecondsFormat;

/// Column order of every export.
pub const CSV_COLUMNS: [&str; 4] = ["type", "id", "amount", "created_at"];

const LINE_END: &str = "\r\n";

/// Render entries as CSV: one header row, then one row per entry.
#[must_use]
pub fn rows_to_csv(entries: &[Entry]) -> String {
    let mut out = String::with_capacity(32 * (entries.len() + 1));
    push_record(&mut out, CSV_COLUMNS);
    for entry in entries {
        let id = entry.id.to_string();
        let amount = entry.amount.to_string();
        let created_at = entry.created_at.to_rfc3339_opts(SecondsFormat::Secs, true);
        push_record(
            &mut out,
            [entry.kind.as_str(), id.as_str(), amount.as_str(), created_at.as_str()],
        );
    }
    out
}

fn push_record<'a>(out: &mut String, fields: impl IntoIterator<Item = &'a str>) {
    for (i, field) in fields.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        push_field(out, field);
    }
    out.push_str(LINE_END);
}

/// Quote a field when it holds a delimiter, quote or line break.
fn push_field(out: &mut String, field: &str) {
    if field.contains([',', '"', '\r', '\n']) {
        out.push('"');
        out.push_str(&field.replace('"', "\"\""));
        out.push('"');
    } else {
        out.push_str(field);
    }
}

// =============================================================================
// TESTS
// =============================================================================
