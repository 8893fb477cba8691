// Shared text helpers for the roadmap parsers

use chrono::NaiveDate;
use pulldown_cmark::{Event, Parser};
use regex::Regex;
use std::sync::LazyLock;

static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})-(\d{1,2})-(\d{1,2})\b").unwrap());

static FIRST_INTEGER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

static AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:[$€£]\s*(\d[\d,]*(?:\.\d+)?)\s*(k\b)?|(\d[\d,]*(?:\.\d+)?)\s*(k\b)?\s*(?:usd|eur|gbp|dollars))")
        .unwrap()
});

static LIST_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[-*•+▪◦✓✔☐]\s+|\d+[.)]\s+|#{1,6}\s+)").unwrap()
});

/// Render inline markdown to plain text, looking past bold/italic markers,
/// links and inline code. Unbalanced markers left at the edges are trimmed.
pub fn plain_text(text: &str) -> String {
    let mut out = String::new();
    for event in Parser::new(text) {
        match event {
            Event::Text(t) | Event::Code(t) => out.push_str(&t),
            Event::SoftBreak | Event::HardBreak => out.push(' '),
            _ => {}
        }
    }
    let plain = if out.trim().is_empty() { text } else { out.as_str() };
    plain
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches(|c: char| c == '*' || c == '_' || c.is_whitespace())
        .to_string()
}

/// Drop one leading bullet, number or heading marker
pub fn strip_list_marker(line: &str) -> &str {
    match LIST_MARKER.find(line) {
        Some(m) => &line[m.end()..],
        None => line.trim_start(),
    }
}

/// Whether a line starts with a bullet, number or heading marker
pub fn has_list_marker(line: &str) -> bool {
    LIST_MARKER.is_match(line)
}

/// All ISO-8601 calendar dates in the text, in order of appearance
pub fn find_iso_dates(text: &str) -> Vec<NaiveDate> {
    ISO_DATE
        .captures_iter(text)
        .filter_map(|cap| {
            let year = cap.get(1)?.as_str().parse().ok()?;
            let month = cap.get(2)?.as_str().parse().ok()?;
            let day = cap.get(3)?.as_str().parse().ok()?;
            NaiveDate::from_ymd_opt(year, month, day)
        })
        .collect()
}

pub fn parse_iso_date(text: &str) -> Option<NaiveDate> {
    find_iso_dates(text).into_iter().next()
}

pub fn first_integer(text: &str) -> Option<u32> {
    FIRST_INTEGER
        .find(text)
        .and_then(|m| m.as_str().parse::<u32>().ok())
}

/// First currency amount in the text ("$1,200", "€3.5k", "500 USD")
pub fn parse_amount(text: &str) -> Option<f64> {
    let cap = AMOUNT.captures(text)?;
    let (number, thousands) = match cap.get(1) {
        Some(m) => (m.as_str(), cap.get(2).is_some()),
        None => (cap.get(3)?.as_str(), cap.get(4).is_some()),
    };
    let value: f64 = number.replace(',', "").parse().ok()?;
    Some(if thousands { value * 1000.0 } else { value })
}

/// Split "Title: description", "**Title** - description" or
/// "Title – description" into its two halves
pub fn split_title_description(text: &str) -> (String, String) {
    let trimmed = text.trim();

    if let Some(rest) = trimmed.strip_prefix("**") {
        if let Some(end) = rest.find("**") {
            let title = plain_text(&rest[..end]);
            let description = rest[end + 2..]
                .trim_start_matches(|c: char| c == ':' || c == '-' || c == '–' || c == '—')
                .trim();
            if !title.is_empty() {
                return (
                    title.trim_end_matches(':').trim().to_string(),
                    plain_text(description),
                );
            }
        }
    }

    for separator in [": ", " - ", " – ", " — "] {
        if let Some(idx) = trimmed.find(separator) {
            let title = plain_text(&trimmed[..idx]);
            let description = plain_text(&trimmed[idx + separator.len()..]);
            if !title.is_empty() && !description.is_empty() {
                return (title, description);
            }
        }
    }

    (plain_text(trimmed.trim_end_matches(':')), String::new())
}

/// Append a continuation line to a description
pub fn append_sentence(description: &mut String, line: &str) {
    let line = plain_text(strip_list_marker(line));
    if line.is_empty() {
        return;
    }
    if !description.is_empty() {
        description.push(' ');
    }
    description.push_str(&line);
}
