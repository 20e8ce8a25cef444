//! # PDF Summary
//!
//! A single-page PDF 1.4 financial summary, written by hand.
//!
//! ```text
//! 1 Catalog ─► 2 Pages ─► 3 Page ─┬─► 4 Helvetica
//!                                 ├─► 5 Helvetica-Bold
//!                                 └─► 6 Content stream
//! 7 Info
//! ```
//!
//! Only the two standard Type 1 fonts are referenced, so nothing is
//! embedded. Text is restricted to printable ASCII.

use crate::ledger::{DateWindow, Summary};
use chrono::{DateTime, Utc};

/// Document title, also written to the Info dictionary.
pub const SUMMARY_TITLE: &str = "MoneyMap Financial Summary";

const NOTES: &str = "Amounts are summed from your incomes, expenses, and savings records in \
the selected period. Times are treated as stored (no timezone conversion).";

// US Letter, in points.
const PAGE_WIDTH: i64 = 612;
const PAGE_HEIGHT: i64 = 792;
const MARGIN: i64 = 48;

// Table geometry.
const COL_METRIC: i64 = MARGIN;
const COL_AMOUNT_RIGHT: i64 = 340;
const COL_COUNT_RIGHT: i64 = 420;
const TABLE_RIGHT: i64 = 432;
const ROW_HEIGHT: i64 = 20;
const TABLE_FONT_SIZE: i64 = 10;
const NOTES_WRAP: usize = 95;

/// Render a summary page.
#[must_use]
pub fn summary_pdf(summary: &Summary, window: &DateWindow, generated_at: DateTime<Utc>) -> Vec<u8> {
    let content = page_content(summary, window, generated_at);
    let info = format!(
        "<< /Title ({}) /Producer (MoneyMap) /CreationDate (D:{}Z) >>",
        escape(SUMMARY_TITLE),
        generated_at.format("%Y%m%d%H%M%S")
    );

    let objects = [
        String::from("<< /Type /Catalog /Pages 2 0 R >>"),
        String::from("<< /Type /Pages /Kids [3 0 R] /Count 1 >>"),
        format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {PAGE_WIDTH} {PAGE_HEIGHT}] \
             /Resources << /Font << /F1 4 0 R /F2 5 0 R >> >> /Contents 6 0 R >>"
        ),
        font("Helvetica"),
        font("Helvetica-Bold"),
        format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            content.len(),
            content
        ),
        info,
    ];

    let mut out: Vec<u8> = Vec::with_capacity(4096);
    out.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");

    let mut offsets = Vec::with_capacity(objects.len());
    for (index, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", index + 1, body).as_bytes());
    }

    let xref_at = out.len();
    let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in &offsets {
        xref.push_str(&format!("{offset:010} 00000 n \n"));
    }
    xref.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R /Info 7 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        xref_at
    ));
    out.extend_from_slice(xref.as_bytes());
    out
}

fn font(base: &str) -> String {
    format!("<< /Type /Font /Subtype /Type1 /BaseFont /{base} /Encoding /WinAnsiEncoding >>")
}

// =============================================================================
// PAGE CONTENT
// =============================================================================

fn page_content(summary: &Summary, window: &DateWindow, generated_at: DateTime<Utc>) -> String {
    let mut ops = String::new();
    let mut y = PAGE_HEIGHT - 72;

    text(&mut ops, "F2", 18, MARGIN, y, SUMMARY_TITLE);
    y -= 24;
    text(&mut ops, "F1", 10, MARGIN, y, &format!("Period: {}", window.label()));
    y -= 14;
    text(
        &mut ops,
        "F1",
        10,
        MARGIN,
        y,
        &format!("Generated: {}", generated_at.format("%Y-%m-%d %H:%M:%SZ")),
    );
    y -= 32;

    let rows = [
        (
            "Total Income",
            summary.total_income.to_string(),
            summary.count_income.to_string(),
        ),
        (
            "Total Expenses",
            summary.total_expense.to_string(),
            summary.count_expense.to_string(),
        ),
        (
            "Total Savings",
            summary.total_saving.to_string(),
            summary.count_saving.to_string(),
        ),
        ("Net (Income - Expenses)", summary.net.to_string(), String::new()),
    ];

    // Header band and grid.
    let table_top = y + ROW_HEIGHT - 6;
    let row_count = i64::try_from(rows.len()).unwrap_or(0) + 1;
    let table_bottom = table_top - row_count * ROW_HEIGHT;
    ops.push_str(&format!(
        "0.83 g\n{} {} {} {} re f\n0 g\n",
        MARGIN - 4,
        table_top - ROW_HEIGHT,
        TABLE_RIGHT - MARGIN + 4,
        ROW_HEIGHT
    ));
    ops.push_str("0.5 G\n0.25 w\n");
    for line in 0..=row_count {
        let ly = table_top - line * ROW_HEIGHT;
        ops.push_str(&format!("{} {ly} m {TABLE_RIGHT} {ly} l S\n", MARGIN - 4));
    }
    for x in [MARGIN - 4, COL_AMOUNT_RIGHT - 96, COL_COUNT_RIGHT - 56, TABLE_RIGHT] {
        ops.push_str(&format!("{x} {table_top} m {x} {table_bottom} l S\n"));
    }

    text(&mut ops, "F2", TABLE_FONT_SIZE, COL_METRIC, y, "Metric");
    text_right(&mut ops, "F2", TABLE_FONT_SIZE, COL_AMOUNT_RIGHT, y, "Amount");
    text_right(&mut ops, "F2", TABLE_FONT_SIZE, COL_COUNT_RIGHT, y, "Count");
    for (label, amount, count) in &rows {
        y -= ROW_HEIGHT;
        text(&mut ops, "F1", TABLE_FONT_SIZE, COL_METRIC, y, label);
        text_right(&mut ops, "F1", TABLE_FONT_SIZE, COL_AMOUNT_RIGHT, y, amount);
        if !count.is_empty() {
            text_right(&mut ops, "F1", TABLE_FONT_SIZE, COL_COUNT_RIGHT, y, count);
        }
    }

    y -= 44;
    text(&mut ops, "F2", 12, MARGIN, y, "Notes:");
    for line in wrap(NOTES, NOTES_WRAP) {
        y -= 14;
        text(&mut ops, "F1", 10, MARGIN, y, &line);
    }

    ops
}

fn text(ops: &mut String, font: &str, size: i64, x: i64, y: i64, s: &str) {
    ops.push_str(&format!(
        "BT /{font} {size} Tf {x} {y} Td ({}) Tj ET\n",
        escape(s)
    ));
}

fn text_right(ops: &mut String, font: &str, size: i64, right: i64, y: i64, s: &str) {
    let width = text_width(s, size);
    text(ops, font, size, right - width, y, s);
}

/// Approximate rendered width in whole points, using Helvetica metrics.
fn text_width(s: &str, size: i64) -> i64 {
    let units: i64 = s
        .chars()
        .map(|c| match c {
            '0'..='9' => 556,
            '.' | ',' | ' ' => 278,
            '-' => 333,
            'i' | 'l' | 'j' => 222,
            't' | 'f' => 278,
            'm' | 'M' => 833,
            'w' | 'W' => 722,
            'A'..='Z' => 667,
            _ => 556,
        })
        .sum();
    (units * size + 500) / 1000
}

/// Escape a PDF literal string, replacing anything outside printable ASCII.
fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' | '(' | ')' => {
                out.push('\\');
                out.push(c);
            }
            ' '..='~' => out.push(c),
            _ => out.push('?'),
        }
    }
    out
}

/// Greedy word wrap to at most `width` characters per line.
fn wrap(s: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in s.split_whitespace() {
        if !current.is_empty() && current.len() + 1 + word.len() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::parse_date;
    use crate::money::Money;

    fn sample() -> Vec<u8> {
        let summary = Summary {
            total_income: Money::from_cents(525_000),
            total_expense: Money::from_cents(120_050),
            total_saving: Money::from_cents(10_000),
            net: Money::from_cents(404_950),
            count_income: 2,
            count_expense: 1,
            count_saving: 1,
        };
        let window = DateWindow::new(parse_date("2025-01-01"), None);
        summary_pdf(&summary, &window, parse_date("2025-06-30").unwrap())
    }

    fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        haystack.windows(needle.len()).position(|w| w == needle)
    }

    #[test]
    fn framing() {
        let pdf = sample();
        assert!(pdf.starts_with(b"%PDF-1.4\n"));
        assert!(pdf.ends_with(b"%%EOF\n"));
    }

    #[test]
    fn xref_offsets_point_at_objects() {
        let pdf = sample();

        let start = find(&pdf, b"startxref\n").unwrap() + "startxref\n".len();
        let tail = std::str::from_utf8(&pdf[start..]).unwrap();
        let xref_at: usize = tail.lines().next().unwrap().parse().unwrap();
        assert!(pdf[xref_at..].starts_with(b"xref\n0 8\n"));

        let xref = std::str::from_utf8(&pdf[xref_at..]).unwrap();
        let entries: Vec<&str> = xref.lines().skip(3).take(7).collect();
        for (index, entry) in entries.iter().enumerate() {
            assert_eq!(entry.len(), 19, "{entry}");
            let offset: usize = entry[..10].parse().unwrap();
            let expected = format!("{} 0 obj\n", index + 1);
            assert!(pdf[offset..].starts_with(expected.as_bytes()), "object {}", index + 1);
        }
    }

    #[test]
    fn stream_length_matches() {
        let pdf = sample();
        let text = String::from_utf8_lossy(&pdf).into_owned();
        let length_at = text.find("/Length ").unwrap() + "/Length ".len();
        let length: usize = text[length_at..]
            .split(|c: char| !c.is_ascii_digit())
            .next()
            .unwrap()
            .parse()
            .unwrap();
        let body_at = text.find("stream\n").unwrap() + "stream\n".len();
        assert_eq!(&text[body_at + length..body_at + length + 10], "\nendstream");
    }

    #[test]
    fn content_carries_the_summary() {
        let text = String::from_utf8_lossy(&sample()).into_owned();
        for needle in [
            "(MoneyMap Financial Summary) Tj",
            "(Period: 2025-01-01 to ...) Tj",
            "(Generated: 2025-06-30 00:00:00Z) Tj",
            "(Metric) Tj",
            "(Total Income) Tj",
            "(5250.00) Tj",
            "(Net \\(Income - Expenses\\)) Tj",
            "(4049.50) Tj",
            "(Notes:) Tj",
        ] {
            assert!(text.contains(needle), "missing {needle}");
        }
    }

    #[test]
    fn amounts_are_right_aligned() {
        // Same right edge, different widths.
        let narrow = COL_AMOUNT_RIGHT - text_width("1.00", TABLE_FONT_SIZE);
        let wide = COL_AMOUNT_RIGHT - text_width("1000.00", TABLE_FONT_SIZE);
        assert!(wide < narrow);
        assert_eq!(text_width("0", 10), 6);
    }

    #[test]
    fn escaping_and_wrapping() {
        assert_eq!(escape("a(b)c\\"), "a\\(b\\)c\\\\");
        assert_eq!(escape("caf\u{e9}"), "caf?");
        let lines = wrap("one two three four", 9);
        assert_eq!(lines, ["one two", "three", "four"]);
    }
}
