// Parsers turning model output into roadmap drafts

pub mod embedded_json;
pub mod fields;
pub mod json_roadmap;
pub mod plan_sections;
pub mod roadmap;
pub mod segmenter;
pub mod suggestions;
pub mod tasks;
pub mod text;

pub use embedded_json::{extract_json_value, try_extract_json_value};
pub use roadmap::{parse_milestone_text, parse_roadmap_text};
pub use segmenter::{segment, Section, SectionKind, Segmentation};
pub use suggestions::{
    parse_action_recommendations, parse_milestone_suggestions, parse_task_suggestions,
    ActionRecommendation, KnownProgress, MilestoneSuggestion, ProgressLookup, TaskSuggestion,
};
pub use tasks::{parse_tasks, ParsedTasks};
