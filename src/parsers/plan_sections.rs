// Extractors for the non-milestone parts of a roadmap: budget, weekly
// calendar, risks and tips

use super::text::{has_list_marker, parse_amount, plain_text, split_title_description, strip_list_marker};
use crate::models::{BudgetItem, CalendarWeek, Risk, Tip};
use regex::Regex;
use std::sync::LazyLock;

static TOTAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:estimated\s+|grand\s+)?total\b").unwrap());

static PLAIN_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d[\d,]*(?:\.\d+)?)\s*$").unwrap());

static LEADING_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+").unwrap());

static PARENTHESIZED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(([^)]*)\)").unwrap());

static WEEK_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[^\p{L}\p{N}]*week\s+(\d+)(?:\s*[-–]\s*\d+)?\s*\**\s*[:.)\-–—]?\s*\**\s*(.*)$")
        .unwrap()
});

static RISK_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:potential\s+)?risk\s*\d*\s*\**\s*:\s*\**\s*(.*)$").unwrap());

static MITIGATION_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:mitigation|solution|response)(?:\s+strategy)?\s*\**\s*:\s*\**\s*(.*)$").unwrap()
});

static TABLE_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\|?(?:\s*:?-{2,}:?\s*\|?)+$").unwrap());

const HEADER_CELLS: &[&str] = &[
    "item", "items", "category", "expense", "cost", "amount", "estimated cost", "notes",
    "week", "weeks", "focus", "risk", "risks", "mitigation", "description",
];

/// Budget lines and the explicit total, if any
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BudgetExtraction {
    pub items: Vec<BudgetItem>,
    pub total: Option<f64>,
}

fn table_cells(line: &str) -> Vec<String> {
    line.trim()
        .trim_start_matches('|')
        .trim_end_matches('|')
        .split('|')
        .map(|cell| plain_text(cell.trim()))
        .collect()
}

/// Header and separator rows carry no data
fn is_table_chrome(line: &str, cells: &[String]) -> bool {
    TABLE_SEPARATOR.is_match(line.trim())
        || cells
            .iter()
            .all(|cell| HEADER_CELLS.contains(&cell.to_lowercase().as_str()) || cell.is_empty())
}

fn cell_amount(cell: &str) -> Option<f64> {
    parse_amount(cell).or_else(|| {
        PLAIN_NUMBER
            .captures(cell)
            .and_then(|cap| cap.get(1))
            .and_then(|m| m.as_str().replace(',', "").parse().ok())
    })
}

fn budget_row(line: &str) -> Option<(String, f64, String)> {
    let cells = table_cells(line);
    if is_table_chrome(line, &cells) {
        return None;
    }
    let name = cells.first()?.clone();
    let (amount_idx, amount) = cells
        .iter()
        .enumerate()
        .skip(1)
        .find_map(|(i, cell)| cell_amount(cell).map(|a| (i, a)))?;
    let notes = cells
        .iter()
        .enumerate()
        .skip(1)
        .filter(|(i, cell)| *i != amount_idx && !cell.is_empty())
        .map(|(_, cell)| cell.as_str())
        .collect::<Vec<_>>()
        .join("; ");
    Some((name, amount, notes))
}

fn budget_line(line: &str) -> Option<(String, f64, String)> {
    let text = plain_text(strip_list_marker(line));
    let amount = parse_amount(&text)?;

    let (name, rest) = match text.find(':') {
        Some(idx) => (text[..idx].trim().to_string(), text[idx + 1..].trim().to_string()),
        None => {
            let (title, description) = split_title_description(&text);
            (title, description)
        }
    };
    if name.is_empty() || parse_amount(&name).is_some() {
        return None;
    }

    let notes = PARENTHESIZED
        .captures(&rest)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default();
    Some((name, amount, notes))
}

/// Budget items from `Name: $1,200 (notes)` lines or `| Name | $1,200 | notes |`
/// rows. A `Total` line sets the plan budget instead of adding an item.
pub fn extract_budget(body: &str) -> BudgetExtraction {
    body.lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            if line.trim_start().starts_with('|') {
                budget_row(line)
            } else {
                budget_line(line)
            }
        })
        .fold(BudgetExtraction::default(), |mut acc, (name, amount, notes)| {
            if TOTAL.is_match(&name) {
                acc.total = acc.total.or(Some(amount));
            } else {
                acc.items.push(BudgetItem {
                    name,
                    suggested_cost: amount,
                    actual_cost: None,
                    notes,
                });
            }
            acc
        })
}

#[derive(Debug, Default)]
struct CalendarAccumulator {
    weeks: Vec<CalendarWeek>,
}

impl CalendarAccumulator {
    fn last_number(&self) -> u32 {
        self.weeks.last().map_or(0, |w| w.week_number)
    }

    /// Number for an unnumbered entry; None once the week count is exhausted
    fn next_number(&self) -> Option<u32> {
        self.last_number().checked_add(1)
    }

    fn push_week(mut self, number: u32, summary: String) -> Self {
        if number <= self.last_number() {
            log::debug!(
                "Dropping calendar week {} (previous was {})",
                number,
                self.last_number()
            );
            return self;
        }
        self.weeks.push(CalendarWeek {
            week_number: number,
            summary,
        });
        self
    }

    fn push_line(self, line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return self;
        }

        if trimmed.starts_with('|') {
            let cells = table_cells(trimmed);
            if is_table_chrome(trimmed, &cells) {
                return self;
            }
            let first = cells.first().map(String::as_str).unwrap_or_default();
            let number = WEEK_LINE
                .captures(first)
                .and_then(|cap| cap.get(1))
                .or_else(|| LEADING_NUMBER.find(first))
                .and_then(|m| m.as_str().parse().ok());
            let summary = cells[1.min(cells.len())..]
                .iter()
                .filter(|c| !c.is_empty())
                .cloned()
                .collect::<Vec<_>>()
                .join("; ");
            return match number.or_else(|| self.next_number()) {
                Some(number) => self.push_week(number, summary),
                None => self,
            };
        }

        if let Some(cap) = WEEK_LINE.captures(trimmed) {
            let number = cap.get(1).and_then(|m| m.as_str().parse().ok());
            let summary = cap.get(2).map(|m| plain_text(m.as_str())).unwrap_or_default();
            if let Some(number) = number {
                return self.push_week(number, summary);
            }
        }

        if has_list_marker(trimmed) {
            let Some(next) = self.next_number() else {
                log::debug!("Dropping calendar entry after week {}", self.last_number());
                return self;
            };
            let summary = plain_text(strip_list_marker(trimmed));
            return self.push_week(next, summary);
        }

        // Prose under a week line continues its summary
        let mut acc = self;
        if let Some(week) = acc.weeks.last_mut() {
            let text = plain_text(trimmed);
            if week.summary.is_empty() {
                week.summary = text;
            } else {
                week.summary.push(' ');
                week.summary.push_str(&text);
            }
        }
        acc
    }
}

/// Weekly calendar entries with strictly increasing week numbers
pub fn extract_calendar(body: &str) -> Vec<CalendarWeek> {
    body.lines()
        .fold(CalendarAccumulator::default(), CalendarAccumulator::push_line)
        .weeks
}

fn push_risk_line(mut risks: Vec<Risk>, line: &str) -> Vec<Risk> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return risks;
    }

    if trimmed.starts_with('|') {
        let cells = table_cells(trimmed);
        if !is_table_chrome(trimmed, &cells) {
            if let Some(risk) = cells.first().filter(|c| !c.is_empty()) {
                risks.push(Risk {
                    risk: risk.clone(),
                    mitigation: cells.get(1).cloned().unwrap_or_default(),
                });
            }
        }
        return risks;
    }

    let text = plain_text(strip_list_marker(trimmed));

    if let Some(cap) = MITIGATION_LABEL.captures(&text) {
        let mitigation = cap.get(1).map_or("", |m| m.as_str()).trim().to_string();
        match risks.last_mut() {
            Some(last) if last.mitigation.is_empty() => last.mitigation = mitigation,
            _ => log::debug!("Mitigation without a preceding risk: {}", mitigation),
        }
        return risks;
    }

    if let Some(cap) = RISK_LABEL.captures(&text) {
        let risk = cap.get(1).map_or("", |m| m.as_str()).trim().to_string();
        if !risk.is_empty() {
            risks.push(Risk {
                risk,
                mitigation: String::new(),
            });
        }
        return risks;
    }

    let (risk, mitigation) = split_title_description(&text);
    if !risk.is_empty() {
        risks.push(Risk { risk, mitigation });
    }
    risks
}

/// Risk/mitigation pairs from `Risk: Mitigation` lines or labeled line pairs
pub fn extract_risks(body: &str) -> Vec<Risk> {
    body.lines().fold(Vec::new(), push_risk_line)
}

/// One tip per non-empty line
pub fn extract_tips(body: &str) -> Vec<Tip> {
    body.lines()
        .map(|line| plain_text(strip_list_marker(line)))
        .filter(|content| !content.is_empty())
        .map(|content| Tip { content })
        .collect()
}
