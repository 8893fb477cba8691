// Ingestion pipeline: model text -> drafts -> scheduled graph -> store
//
// Parsing and building are pure. Only the commit touches the store, and the
// model call always finishes before any transaction begins.

pub mod builder;

pub use builder::{build_milestone, build_plan, summarize, PlanRequest, DEFAULT_PLAN_TITLE};

use crate::ai::{roadmap_prompt, LanguageModel};
use crate::config::SchedulingConfig;
use crate::database::PlanStore;
use crate::error::IngestError;
use crate::models::{Milestone, RoadmapPlan, TaskPattern};
use crate::parsers::suggestions::{
    parse_action_recommendations, parse_milestone_suggestions, parse_task_suggestions,
    ActionRecommendation, KnownProgress, MilestoneSuggestion, TaskSuggestion,
};
use crate::parsers::{parse_milestone_text, parse_roadmap_text};
use crate::scheduler::{DateScheduler, DeclaredDates};
use chrono::NaiveDate;
use serde::Serialize;

/// Resolved plan plus the run summary
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestOutcome {
    pub plan: RoadmapPlan,
    pub summary: String,
}

/// Parse and resolve roadmap text without touching storage. Never fails and
/// never returns an empty graph.
pub fn resolve_roadmap(text: &str, request: &PlanRequest, scheduler: &DateScheduler) -> IngestOutcome {
    let draft = parse_roadmap_text(text);
    let shape = draft.shape;
    let patterns: Vec<Option<TaskPattern>> =
        draft.milestones.iter().map(|m| m.task_pattern).collect();

    let plan = build_plan(draft, request, scheduler);
    let summary = summarize(&plan, shape, &patterns);
    log::info!("{}", summary);

    IngestOutcome { plan, summary }
}

/// Parse and resolve a single milestone response
pub fn resolve_milestone(text: &str, fallback_name: &str, scheduler: &DateScheduler) -> Milestone {
    let draft = parse_milestone_text(text, fallback_name);
    let span = scheduler.next_span(
        None,
        DeclaredDates {
            start: draft.start,
            due: draft.due,
            duration: draft.duration.as_deref(),
        },
    );
    build_milestone(draft, span, scheduler)
}

/// Runs ingestion against a store
pub struct RoadmapIngestor<S: PlanStore> {
    store: S,
    scheduling: SchedulingConfig,
}

impl<S: PlanStore> RoadmapIngestor<S> {
    pub fn new(store: S, scheduling: SchedulingConfig) -> Self {
        Self { store, scheduling }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn known_progress(&self, project_id: &str) -> Result<KnownProgress, IngestError> {
        let known = self.store.known_progress(project_id)?;
        if known.is_empty() {
            log::debug!("No stored progress for project {}; keeping model statuses", project_id);
        }
        Ok(known)
    }

    fn scheduler(&self, today: NaiveDate) -> DateScheduler {
        DateScheduler::with_rules(today, &self.scheduling)
    }

    /// Parse, resolve and commit a roadmap response
    pub fn ingest(
        &mut self,
        text: &str,
        request: &PlanRequest,
        today: NaiveDate,
    ) -> Result<IngestOutcome, IngestError> {
        let outcome = resolve_roadmap(text, request, &self.scheduler(today));
        self.store.commit_roadmap(&outcome.plan)?;
        Ok(outcome)
    }

    /// Ask the model for a roadmap, then ingest its answer
    pub async fn generate<M: LanguageModel>(
        &mut self,
        model: &M,
        idea: &str,
        request: &PlanRequest,
        today: NaiveDate,
    ) -> Result<IngestOutcome, IngestError> {
        let text = model.complete(&roadmap_prompt(idea)).await?;
        log::debug!("Model returned {} bytes of roadmap text", text.len());
        self.ingest(&text, request, today)
    }

    /// Commit one AI-suggested milestone with its tasks under an existing plan
    pub fn ingest_milestone(
        &mut self,
        text: &str,
        plan_id: &str,
        project_id: &str,
        fallback_name: &str,
        today: NaiveDate,
    ) -> Result<Milestone, IngestError> {
        let milestone = resolve_milestone(text, fallback_name, &self.scheduler(today));
        self.store.commit_milestone(plan_id, project_id, &milestone)?;
        Ok(milestone)
    }

    /// Milestone suggestions with statuses overridden by stored progress
    pub fn milestone_suggestions(
        &self,
        text: &str,
        project_id: &str,
    ) -> Result<Vec<MilestoneSuggestion>, IngestError> {
        let known = self.known_progress(project_id)?;
        parse_milestone_suggestions(text, &known)
    }

    pub fn task_suggestions(
        &self,
        text: &str,
        project_id: &str,
    ) -> Result<Vec<TaskSuggestion>, IngestError> {
        let known = self.known_progress(project_id)?;
        parse_task_suggestions(text, &known)
    }

    pub fn action_recommendations(&self, text: &str) -> Result<Vec<ActionRecommendation>, IngestError> {
        parse_action_recommendations(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Store that records commits in memory
    #[derive(Default)]
    struct RecordingStore {
        plans: Vec<RoadmapPlan>,
        milestones: Vec<(String, Milestone)>,
        known: KnownProgress,
        fail: bool,
    }

    impl PlanStore for RecordingStore {
        fn commit_roadmap(&mut self, plan: &RoadmapPlan) -> Result<(), IngestError> {
            if self.fail {
                return Err(IngestError::Persistence(rusqlite::Error::QueryReturnedNoRows));
            }
            self.plans.push(plan.clone());
            Ok(())
        }

        fn commit_milestone(
            &mut self,
            plan_id: &str,
            _project_id: &str,
            milestone: &Milestone,
        ) -> Result<(), IngestError> {
            self.milestones.push((plan_id.to_string(), milestone.clone()));
            Ok(())
        }

        fn known_progress(&self, _project_id: &str) -> Result<KnownProgress, IngestError> {
            Ok(self.known.clone())
        }
    }

    #[test]
    fn test_ingest_commits_resolved_plan() {
        let mut ingestor = RoadmapIngestor::new(RecordingStore::default(), SchedulingConfig::default());
        let text = "## Phase 1: Research (2 weeks)\n1. Survey customers\n2. Price check";

        let outcome = ingestor
            .ingest(text, &PlanRequest::new("u", "p"), date(2025, 1, 1))
            .unwrap();
        assert_eq!(outcome.plan.milestones[0].tasks.len(), 2);
        assert_eq!(ingestor.store().plans.len(), 1);
        assert_eq!(ingestor.store().plans[0].id, outcome.plan.id);
    }

    #[test]
    fn test_persistence_failure_surfaces_kind() {
        let store = RecordingStore {
            fail: true,
            ..Default::default()
        };
        let mut ingestor = RoadmapIngestor::new(store, SchedulingConfig::default());
        let err = ingestor
            .ingest("anything", &PlanRequest::new("u", "p"), date(2025, 1, 1))
            .unwrap_err();
        assert_eq!(err.kind(), "persistence");
        assert!(err.is_retryable());
    }

    #[test]
    fn test_ingest_milestone_uses_fallback_name() {
        let mut ingestor = RoadmapIngestor::new(RecordingStore::default(), SchedulingConfig::default());
        let milestone = ingestor
            .ingest_milestone(
                "- Print flyers\n- Post on social media",
                "plan-1",
                "p",
                "Marketing Push",
                date(2025, 2, 1),
            )
            .unwrap();

        assert_eq!(milestone.name, "Marketing Push");
        assert_eq!(milestone.tasks.len(), 2);
        assert_eq!(milestone.start_date, date(2025, 2, 1));
        assert_eq!(ingestor.store().milestones[0].0, "plan-1");
    }

    #[test]
    fn test_task_suggestions_use_stored_progress() {
        let store = RecordingStore {
            known: KnownProgress::new().with_task("Print flyers", 40),
            ..Default::default()
        };
        let ingestor = RoadmapIngestor::new(store, SchedulingConfig::default());
        let suggestions = ingestor
            .task_suggestions(r#"[{"title":"Print flyers","status":"to do"}]"#, "p")
            .unwrap();
        assert_eq!(suggestions[0].status, crate::models::TaskStatus::InProgress);
    }

    #[test]
    fn test_suggestions_without_stored_progress_keep_claims() {
        let ingestor = RoadmapIngestor::new(RecordingStore::default(), SchedulingConfig::default());
        let suggestions = ingestor
            .milestone_suggestions(r#"[{"title":"Launch","status":"in progress"}]"#, "p")
            .unwrap();
        assert_eq!(suggestions[0].status, crate::models::MilestoneStatus::InProgress);
    }

    #[test]
    fn test_action_recommendations_require_json() {
        let ingestor = RoadmapIngestor::new(RecordingStore::default(), SchedulingConfig::default());
        let err = ingestor.action_recommendations("just talk").unwrap_err();
        assert_eq!(err.kind(), "parse");
    }
}
