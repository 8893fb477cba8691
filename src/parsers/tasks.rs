// Structural task parser for milestone-shaped blocks
//
// Candidate patterns are tried in a fixed order and the first one that
// matches anything wins. Matches are never merged across patterns.

use super::fields::{
    clean_task_title, inline_dates, inline_duration, inline_priority, inline_task_status,
};
use super::text::{append_sentence, find_iso_dates, split_title_description};
use crate::models::status::normalize_task_status;
use crate::models::{Priority, TaskDraft, TaskPattern};
use crate::scheduler::add_days_saturating;
use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

/// Tasks pulled from one block, with the pattern that produced them
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTasks {
    pub pattern: Option<TaskPattern>,
    pub tasks: Vec<TaskDraft>,
}

type TaskStrategy = fn(&str) -> Option<Vec<TaskDraft>>;

const TASK_STRATEGIES: &[(TaskPattern, TaskStrategy)] = &[
    (TaskPattern::TaskLabels, task_labels),
    (TaskPattern::BoldNumbered, bold_numbered),
    (TaskPattern::Numbered, numbered_items),
    (TaskPattern::Bullets, bullet_items),
    (TaskPattern::Table, table_rows),
];

static TASK_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\s*)[-*•+#>\s]*\**\s*task\s*#?\s*\d+\s*\**\s*[:.)\-–—]\s*\**\s*(.*)$")
        .unwrap()
});

static BOLD_NUMBERED_OUTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\s*)(?:[-*•+]\s*)?\*\*\s*\d+[.)]\s*(.+?)\*\*(.*)$").unwrap()
});

static BOLD_NUMBERED_INNER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*)\d+[.)]\s*\*\*(.+?)\*\*(.*)$").unwrap());

static NUMBERED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\s*)\d+[.)]\s+(.+)$").unwrap());

static BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*)[-*•+▪◦✓✔☐]\s+(.+)$").unwrap());

static TABLE_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\|?(?:\s*:?-{2,}:?\s*\|)+\s*:?-*:?\s*\|?$").unwrap());

const TABLE_HEADER_WORDS: &[&str] = &["task", "title", "name", "description", "milestone", "#"];

/// One matched list line
#[derive(Debug, Clone)]
struct LineMatch {
    indent: usize,
    title: String,
    description: String,
}

type LineMatcher = fn(&str) -> Option<LineMatch>;

/// Whether non-matching lines may extend the open item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Continuation {
    /// Any non-blank line until the next match
    Paragraph,
    /// Only indented lines, a blank line closes the item
    Indented,
}

#[derive(Debug)]
struct Item {
    title: String,
    description: String,
    raw: String,
}

#[derive(Debug)]
struct ItemAccumulator {
    items: Vec<Item>,
    base_indent: Option<usize>,
    open: bool,
}

impl ItemAccumulator {
    fn new() -> Self {
        Self {
            items: Vec::new(),
            base_indent: None,
            open: false,
        }
    }

    fn push_line(mut self, line: &str, matcher: LineMatcher, continuation: Continuation) -> Self {
        if line.trim().is_empty() {
            if continuation == Continuation::Indented {
                self.open = false;
            }
            return self;
        }

        if let Some(m) = matcher(line) {
            let base = *self.base_indent.get_or_insert(m.indent);
            // Nested items belong to the item above them
            if m.indent <= base || self.items.is_empty() {
                self.items.push(Item {
                    title: m.title,
                    description: m.description,
                    raw: line.to_string(),
                });
                self.open = true;
                return self;
            }
        }

        let indented = line.starts_with(' ') || line.starts_with('\t');
        let accepts = match continuation {
            Continuation::Paragraph => self.open,
            Continuation::Indented => self.open && indented,
        };
        if accepts {
            if let Some(item) = self.items.last_mut() {
                if item.title.is_empty() {
                    item.title = clean_task_title(line.trim());
                } else {
                    append_sentence(&mut item.description, line);
                }
                item.raw.push('\n');
                item.raw.push_str(line);
            }
        } else if continuation == Continuation::Indented {
            self.open = false;
        }
        self
    }
}

fn collect_items(
    block: &str,
    matcher: LineMatcher,
    continuation: Continuation,
) -> Option<Vec<TaskDraft>> {
    let acc = block
        .lines()
        .fold(ItemAccumulator::new(), |acc, line| {
            acc.push_line(line, matcher, continuation)
        });

    let tasks: Vec<TaskDraft> = acc
        .items
        .into_iter()
        .filter(|item| !item.title.is_empty())
        .map(|item| draft_from_item(&item))
        .collect();

    if tasks.is_empty() {
        None
    } else {
        Some(tasks)
    }
}

fn draft_from_item(item: &Item) -> TaskDraft {
    let (start, due) = inline_dates(&item.raw);
    TaskDraft {
        name: item.title.clone(),
        description: item.description.clone(),
        status: inline_task_status(&item.raw),
        priority: inline_priority(&item.raw),
        start,
        due,
        estimated_duration: inline_duration(&item.raw),
    }
}

fn indent_of(cap: &regex::Captures<'_>) -> usize {
    cap.get(1).map_or(0, |m| m.as_str().len())
}

fn task_label_line(line: &str) -> Option<LineMatch> {
    let cap = TASK_LABEL.captures(line)?;
    let rest = cap.get(2).map_or("", |m| m.as_str());
    let (title, description) = split_title_description(rest);
    Some(LineMatch {
        indent: indent_of(&cap),
        title: clean_task_title(&title),
        description,
    })
}

fn bold_numbered_line(line: &str) -> Option<LineMatch> {
    let cap = BOLD_NUMBERED_OUTER
        .captures(line)
        .or_else(|| BOLD_NUMBERED_INNER.captures(line))?;
    let title = cap.get(2).map_or("", |m| m.as_str());
    let rest = cap.get(3).map_or("", |m| m.as_str());
    let description = rest
        .trim()
        .trim_start_matches(|c: char| c == ':' || c == '-' || c == '–' || c == '—')
        .trim();
    Some(LineMatch {
        indent: indent_of(&cap),
        title: clean_task_title(title),
        description: super::text::plain_text(description),
    })
}

fn list_line(re: &Regex, line: &str) -> Option<LineMatch> {
    let cap = re.captures(line)?;
    let text = cap.get(2).map_or("", |m| m.as_str());
    let (title, description) = split_title_description(text);
    Some(LineMatch {
        indent: indent_of(&cap),
        title: clean_task_title(&title),
        description,
    })
}

fn numbered_line(line: &str) -> Option<LineMatch> {
    list_line(&NUMBERED, line)
}

fn bullet_line(line: &str) -> Option<LineMatch> {
    list_line(&BULLET, line)
}

/// (a) explicit "Task N:" labels
fn task_labels(block: &str) -> Option<Vec<TaskDraft>> {
    collect_items(block, task_label_line, Continuation::Paragraph)
}

/// (b) "**1. Title**" or "1. **Title**"
fn bold_numbered(block: &str) -> Option<Vec<TaskDraft>> {
    collect_items(block, bold_numbered_line, Continuation::Paragraph)
}

/// (c) plain numbered items
fn numbered_items(block: &str) -> Option<Vec<TaskDraft>> {
    collect_items(block, numbered_line, Continuation::Indented)
}

/// (d) bullet items
fn bullet_items(block: &str) -> Option<Vec<TaskDraft>> {
    collect_items(block, bullet_line, Continuation::Indented)
}

fn table_cells(line: &str) -> Vec<String> {
    line.trim()
        .trim_start_matches('|')
        .trim_end_matches('|')
        .split('|')
        .map(|cell| super::text::plain_text(cell.trim()))
        .collect()
}

fn is_header_row(cells: &[String]) -> bool {
    cells.iter().any(|cell| {
        let lower = cell.to_lowercase();
        TABLE_HEADER_WORDS.contains(&lower.as_str())
    })
}

/// (e) markdown table rows: column 1 title, column 2 description, dates and
/// a priority keyword scanned from the row
fn table_rows(block: &str) -> Option<Vec<TaskDraft>> {
    let rows: Vec<&str> = block
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with('|'))
        .collect();
    if rows.is_empty() {
        return None;
    }

    let mut tasks = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        if TABLE_SEPARATOR.is_match(row) {
            continue;
        }
        let followed_by_separator = rows
            .get(i + 1)
            .map(|next| TABLE_SEPARATOR.is_match(next))
            .unwrap_or(false);
        let mut cells = table_cells(row);
        if followed_by_separator || is_header_row(&cells) {
            continue;
        }

        // Leading "#" column of row numbers
        if cells.len() > 2 && cells[0].chars().all(|c| c.is_ascii_digit()) && !cells[0].is_empty() {
            cells.remove(0);
        }

        let title = clean_task_title(cells.first().map_or("", String::as_str));
        if title.is_empty() {
            continue;
        }
        let description = cells
            .get(1)
            .filter(|cell| find_iso_dates(cell).is_empty())
            .cloned()
            .unwrap_or_default();

        let dates = find_iso_dates(row);
        let priority = cells
            .iter()
            .skip(1)
            .find_map(|cell| Priority::parse_loose(cell))
            .or_else(|| inline_priority(row));
        let status = cells.iter().skip(1).find_map(|cell| normalize_task_status(cell));

        tasks.push(TaskDraft {
            name: title,
            description,
            status,
            priority,
            start: dates.first().copied(),
            due: dates.get(1).copied(),
            estimated_duration: cells.iter().skip(1).find_map(|cell| inline_duration(cell)),
        });
    }

    if tasks.is_empty() {
        None
    } else {
        Some(tasks)
    }
}

/// Run the pattern ladder over a block (field lines already removed)
pub fn parse_tasks(block: &str) -> ParsedTasks {
    for (pattern, strategy) in TASK_STRATEGIES {
        if let Some(tasks) = strategy(block) {
            log::debug!("Extracted {} tasks using {}", tasks.len(), pattern.as_str());
            return ParsedTasks {
                pattern: Some(*pattern),
                tasks,
            };
        }
    }

    ParsedTasks {
        pattern: None,
        tasks: Vec::new(),
    }
}

/// The single task a milestone gets when nothing could be extracted
pub fn default_task(milestone_name: &str) -> TaskDraft {
    TaskDraft {
        name: format!("Implement {}", milestone_name),
        description: format!("Complete the work planned for {}", milestone_name),
        priority: Some(Priority::Medium),
        ..Default::default()
    }
}

/// Raw candidate dates for a milestone's tasks. Task `i` starts `i * offset`
/// days after the milestone start and is due `duration` days later, clipped
/// to the milestone due date. Explicit dates are kept as given, and ranges
/// are not repaired here.
pub fn candidate_dates(
    tasks: &[TaskDraft],
    milestone_start: NaiveDate,
    milestone_due: NaiveDate,
    offset_days: i64,
    duration_days: i64,
) -> Vec<(NaiveDate, NaiveDate)> {
    tasks
        .iter()
        .enumerate()
        .map(|(i, task)| {
            let start = task
                .start
                .unwrap_or_else(|| {
                    let offset = (i as i64).saturating_mul(offset_days);
                    add_days_saturating(milestone_start, offset)
                });
            let due = task.due.unwrap_or_else(|| {
                let due = add_days_saturating(start, duration_days);
                if due > milestone_due {
                    milestone_due
                } else {
                    due
                }
            });
            (start, due)
        })
        .collect()
}
