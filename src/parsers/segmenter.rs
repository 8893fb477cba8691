// Section segmentation of model-generated roadmap text
//
// Headers are recognized per line by an ordered list of strategies. Scanning
// is a fold over lines with an explicit accumulator.

use super::text::plain_text;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// What a section holds, decided from its header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Milestone,
    Budget,
    Calendar,
    Risks,
    Tips,
    Overview,
    /// Document title (level-1 markdown header)
    Title,
    /// Grouping header such as "## Milestones" with no content of its own
    Group,
    /// Whole text when no header matched anywhere
    Unlabeled,
}

/// Header convention that opened a section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderStyle {
    /// `PHASE N: Title`, `Milestone N: Title`
    Marker,
    /// `**Budget:**`, `## Risks`, `Tips:`
    Labeled,
    /// `**1. Title**`
    BoldNumbered,
    /// `## Title`
    Markdown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub label: String,
    pub kind: SectionKind,
    pub style: Option<HeaderStyle>,
    pub ordinal: Option<u32>,
    pub body: String,
}

impl Section {
    fn preamble() -> Self {
        Self {
            label: "overview".to_string(),
            kind: SectionKind::Overview,
            style: None,
            ordinal: None,
            body: String::new(),
        }
    }

    fn from_header(header: Header) -> Self {
        Self {
            label: header.label,
            kind: header.kind,
            style: Some(header.style),
            ordinal: header.ordinal,
            body: String::new(),
        }
    }

    fn has_content(&self) -> bool {
        !self.body.trim().is_empty()
    }
}

/// Ordered sections of one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segmentation {
    pub sections: Vec<Section>,
}

impl Segmentation {
    /// True when at least one header strategy matched
    pub fn is_structured(&self) -> bool {
        !self
            .sections
            .iter()
            .any(|s| s.kind == SectionKind::Unlabeled)
    }

    pub fn of_kind(&self, kind: SectionKind) -> impl Iterator<Item = &Section> {
        self.sections.iter().filter(move |s| s.kind == kind)
    }

    pub fn milestones(&self) -> impl Iterator<Item = &Section> {
        self.of_kind(SectionKind::Milestone)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Header {
    label: String,
    kind: SectionKind,
    style: HeaderStyle,
    ordinal: Option<u32>,
}

type HeaderStrategy = fn(&str) -> Option<Header>;

/// Tried in order on every line; first match wins
const HEADER_STRATEGIES: &[(HeaderStyle, HeaderStrategy)] = &[
    (HeaderStyle::Marker, marker_header),
    (HeaderStyle::Labeled, labeled_header),
    (HeaderStyle::BoldNumbered, bold_numbered_header),
    (HeaderStyle::Markdown, markdown_header),
];

static MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[\s#*_>]*(phase|milestone|stage)\s+(\d+)\s*(?:[:.)\-–—]+\s*(.*))?$").unwrap()
});

static BOLD_NUMBERED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:#{1,6}\s*)?\*\*\s*(\d+)[.)]\s*(.+?)\s*\*\*\s*:?\s*$").unwrap()
});

static MARKDOWN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(#{1,6})\s+(.+?)\s*#*\s*$").unwrap());

static LABEL_DECORATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:#{1,6}\s*|>\s*)?(?:\d+[.)]\s*)?").unwrap());

static LABELS: LazyLock<Vec<(SectionKind, Regex)>> = LazyLock::new(|| {
    vec![
        (
            SectionKind::Budget,
            Regex::new(r"^(?:estimated\s+|suggested\s+|startup\s+)?(?:budget|costs?|expenses|financials?|funding)\b").unwrap(),
        ),
        (
            SectionKind::Calendar,
            Regex::new(r"^(?:weekly\s+(?:calendar|schedule|plan|breakdown)|calendar|schedule|week[- ]by[- ]week)\b").unwrap(),
        ),
        (
            SectionKind::Risks,
            Regex::new(r"^(?:potential\s+|key\s+|main\s+)?(?:risks?|challenges)\b").unwrap(),
        ),
        (
            SectionKind::Tips,
            Regex::new(r"^(?:[a-z]+\s+)?(?:tips|recommendations|advice|best practices)\b").unwrap(),
        ),
        (
            SectionKind::Overview,
            Regex::new(r"^(?:executive\s+)?(?:summary|overview|introduction)\b").unwrap(),
        ),
    ]
});

static GROUP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[\w'&-]+\s+){0,3}(?:roadmap|action plan|milestones|phases|timeline)$").unwrap()
});

/// Longest heading text accepted as a section label
const MAX_LABEL_LEN: usize = 60;

fn classify_label(text: &str) -> Option<SectionKind> {
    let lower = text.to_lowercase();
    LABELS
        .iter()
        .find(|(_, re)| re.is_match(&lower))
        .map(|(kind, _)| *kind)
}

/// "PHASE" -> "Phase", splitting on chars rather than bytes
fn capitalize(word: &str) -> String {
    let lower = word.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn marker_header(line: &str) -> Option<Header> {
    let cap = MARKER.captures(line)?;
    let keyword = cap.get(1)?.as_str();
    let ordinal: u32 = cap.get(2)?.as_str().parse().ok()?;
    let title = cap
        .get(3)
        .map(|m| plain_text(m.as_str()))
        .unwrap_or_default();

    let label = if title.is_empty() {
        format!("{} {}", capitalize(keyword), ordinal)
    } else {
        title
    };

    Some(Header {
        label,
        kind: SectionKind::Milestone,
        style: HeaderStyle::Marker,
        ordinal: Some(ordinal),
    })
}

fn labeled_header(line: &str) -> Option<Header> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    let decorated = trimmed.starts_with('#')
        || trimmed.starts_with("**")
        || trimmed.starts_with("__")
        || trimmed.ends_with(':')
        || trimmed.ends_with(":**");

    let undecorated = LABEL_DECORATION.replace(trimmed, "");
    let plain = plain_text(&undecorated);
    let text = LABEL_DECORATION.replace(&plain, "");
    let text = text.trim_end_matches(':').trim();

    // "Budget: $5,000" is a field, not a header
    if !decorated || text.is_empty() || text.contains(':') || text.len() > MAX_LABEL_LEN {
        return None;
    }

    let kind = classify_label(text)?;
    Some(Header {
        label: text.to_string(),
        kind,
        style: HeaderStyle::Labeled,
        ordinal: None,
    })
}

fn bold_numbered_header(line: &str) -> Option<Header> {
    let cap = BOLD_NUMBERED.captures(line)?;
    let ordinal = cap.get(1)?.as_str().parse().ok();
    let label = plain_text(cap.get(2)?.as_str())
        .trim_end_matches(':')
        .trim()
        .to_string();
    if label.is_empty() {
        return None;
    }

    let kind = classify_label(&label).unwrap_or(SectionKind::Milestone);
    Some(Header {
        label,
        kind,
        style: HeaderStyle::BoldNumbered,
        ordinal,
    })
}

fn markdown_header(line: &str) -> Option<Header> {
    let cap = MARKDOWN.captures(line)?;
    let level = cap.get(1)?.as_str().len();
    let label = plain_text(cap.get(2)?.as_str())
        .trim_end_matches(':')
        .trim()
        .to_string();
    if label.is_empty() {
        return None;
    }

    let kind = if level == 1 {
        SectionKind::Title
    } else if let Some(kind) = classify_label(&label) {
        kind
    } else if GROUP.is_match(&label.to_lowercase()) {
        SectionKind::Group
    } else {
        SectionKind::Milestone
    };

    Some(Header {
        label,
        kind,
        style: HeaderStyle::Markdown,
        ordinal: None,
    })
}

/// Inside a marker-opened milestone, bold-numbered lines and sub-headers are
/// task structure rather than new sections
fn detect_header(line: &str, in_marker_section: bool) -> Option<Header> {
    HEADER_STRATEGIES
        .iter()
        .filter(|(style, _)| {
            !(in_marker_section
                && matches!(style, HeaderStyle::BoldNumbered | HeaderStyle::Markdown))
        })
        .find_map(|(_, strategy)| strategy(line))
}

#[derive(Debug)]
struct Accumulator {
    closed: Vec<Section>,
    current: Section,
    saw_header: bool,
}

impl Accumulator {
    fn new() -> Self {
        Self {
            closed: Vec::new(),
            current: Section::preamble(),
            saw_header: false,
        }
    }

    fn in_marker_section(&self) -> bool {
        self.current.style == Some(HeaderStyle::Marker)
    }

    fn push_line(mut self, line: &str) -> Self {
        match detect_header(line, self.in_marker_section()) {
            Some(header) => {
                let previous = std::mem::replace(&mut self.current, Section::from_header(header));
                self.closed.push(previous);
                self.saw_header = true;
            }
            None => {
                self.current.body.push_str(line);
                self.current.body.push('\n');
            }
        }
        self
    }

    fn finish(mut self, text: &str) -> Segmentation {
        if !self.saw_header {
            return Segmentation {
                sections: vec![Section {
                    label: "unlabeled".to_string(),
                    kind: SectionKind::Unlabeled,
                    style: None,
                    ordinal: None,
                    body: text.trim().to_string(),
                }],
            };
        }

        self.closed.push(self.current);
        let sections = self
            .closed
            .into_iter()
            .filter(|s| s.style.is_some() || s.has_content())
            .map(|mut s| {
                s.body = s.body.trim_end().to_string();
                s
            })
            .collect();

        Segmentation { sections }
    }
}

/// Split raw text into ordered, labeled sections
pub fn segment(text: &str) -> Segmentation {
    let segmentation = text
        .lines()
        .fold(Accumulator::new(), |acc, line| acc.push_line(line))
        .finish(text);

    log::debug!(
        "Segmented text into {} sections ({} milestones)",
        segmentation.sections.len(),
        segmentation.milestones().count()
    );

    segmentation
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_markers() {
        let text = "PHASE 1: Discovery\n⏳ Duration: 2-3 weeks\n• Interview users\n\nPHASE 2: Build\n• Implement core";
        let seg = segment(text);

        let milestones: Vec<_> = seg.milestones().collect();
        assert_eq!(milestones.len(), 2);
        assert_eq!(milestones[0].label, "Discovery");
        assert_eq!(milestones[0].ordinal, Some(1));
        assert!(milestones[0].body.contains("Interview users"));
        assert_eq!(milestones[1].label, "Build");
        assert_eq!(milestones[1].body, "• Implement core");
    }

    #[test]
    fn test_markers_look_past_emphasis() {
        let text = "**Milestone 1: _Validate the idea_**\n- Survey\n### **PHASE 2 - Launch**\n- Ship";
        let seg = segment(text);
        let labels: Vec<_> = seg.milestones().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["Validate the idea", "Launch"]);
    }

    #[test]
    fn test_bold_numbered_and_phase_mixed() {
        let text = "**1. Market Research**\n- Study competitors\n\nPHASE 2: Product\n**1. Build MVP**\n- Code it\n\n**Budget:**\n- Hosting: $50";
        let seg = segment(text);

        let kinds: Vec<_> = seg.sections.iter().map(|s| (s.kind, s.label.as_str())).collect();
        assert_eq!(
            kinds,
            vec![
                (SectionKind::Milestone, "Market Research"),
                (SectionKind::Milestone, "Product"),
                (SectionKind::Budget, "Budget"),
            ]
        );
        // Bold-numbered line inside a phase stays in the phase body
        assert!(seg.sections[1].body.contains("**1. Build MVP**"));
    }

    #[test]
    fn test_markdown_headers() {
        let text = "# Coffee Cart Roadmap\nIntro text\n## Milestones\n### Permits\n- Apply for license\n### Launch\n- Open\n## Risks & Mitigation\n- Rain: bring a tent";
        let seg = segment(text);

        assert_eq!(seg.sections[0].kind, SectionKind::Title);
        assert_eq!(seg.sections[0].label, "Coffee Cart Roadmap");
        assert_eq!(seg.sections[1].kind, SectionKind::Group);
        assert_eq!(seg.milestones().count(), 2);
        assert_eq!(seg.of_kind(SectionKind::Risks).count(), 1);
        let labels: Vec<_> = seg.milestones().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["Permits", "Launch"]);
    }

    #[test]
    fn test_labeled_header_requires_decoration() {
        assert!(labeled_header("Tips:").is_some());
        assert!(labeled_header("## Weekly Calendar").is_some());
        assert!(labeled_header("**5. Budget Breakdown**").is_some());
        assert!(labeled_header("Budget: $5,000").is_none());
        assert!(labeled_header("Risks are everywhere in business").is_none());
    }

    #[test]
    fn test_preamble_kept_as_overview() {
        let seg = segment("Here is your plan.\n\nPhase 1: Start\n- Go");
        assert_eq!(seg.sections[0].kind, SectionKind::Overview);
        assert_eq!(seg.sections[0].body, "Here is your plan.");
    }

    #[test]
    fn test_no_headers_is_single_unlabeled_section() {
        let seg = segment("Just do good marketing and build a website.");
        assert!(!seg.is_structured());
        assert_eq!(seg.sections.len(), 1);
        assert_eq!(seg.sections[0].kind, SectionKind::Unlabeled);
        assert_eq!(seg.sections[0].body, "Just do good marketing and build a website.");
    }

    #[test]
    fn test_empty_text() {
        let seg = segment("");
        assert_eq!(seg.sections.len(), 1);
        assert_eq!(seg.sections[0].kind, SectionKind::Unlabeled);
    }

    #[test]
    fn test_marker_without_title_uses_keyword() {
        let seg = segment("PHASE 2\n- Ship");
        assert_eq!(seg.milestones().next().map(|s| s.label.as_str()), Some("Phase 2"));

        // Long s folds to "s" under case-insensitive matching
        let seg = segment("\u{17F}tage 1");
        let labels: Vec<_> = seg.milestones().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["Stage 1"]);
        assert_eq!(capitalize("\u{17F}tage"), "Stage");
    }
}
