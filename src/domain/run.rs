//! Run state derivation
//!
//! A pipeline run records one task run per executed pipeline task under
//! `status.taskRuns`, keyed by the generated task run name. Each record names
//! its logical pipeline task in `pipelineTaskName`, which is what declared
//! tasks are matched against.

use chrono::{DateTime, Duration};
use serde::{Deserialize, Serialize};

use super::document::{Document, DocumentError, DocumentKind, StatusCondition};
use super::pipeline::DeclaredTask;

/// Condition reasons that mark a run or task run as cancelled
pub const CANCELLATION_REASONS: &[&str] = &[
    "TaskRunCancelled",
    "PipelineRunCancelled",
    "Cancelled",
    "CancelledRunFinally",
];

/// Condition types that carry the overall outcome
const OUTCOME_CONDITION_TYPES: &[&str] = &["Succeeded", "Ready"];

/// Lifecycle state of a run or one of its tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RunState {
    Started,
    Finished,
    Failed,
    Cancelled,
    #[default]
    Unknown,
}

impl RunState {
    /// Derives the state from a condition list
    ///
    /// The `Succeeded`/`Ready` condition wins; otherwise the first condition is
    /// used. No condition at all means the run has started but not reported.
    pub fn from_conditions(conditions: &[StatusCondition]) -> Self {
        let outcome = conditions
            .iter()
            .find(|c| {
                c.condition_type
                    .as_deref()
                    .is_some_and(|t| OUTCOME_CONDITION_TYPES.contains(&t))
            })
            .or_else(|| conditions.first());

        let Some(condition) = outcome else {
            return RunState::Started;
        };

        match condition.status.as_deref() {
            Some("True") => RunState::Finished,
            Some("False") if is_cancellation(condition.reason.as_deref()) => RunState::Cancelled,
            Some("False") => RunState::Failed,
            Some("Unknown") => RunState::Started,
            _ => RunState::Unknown,
        }
    }

    /// Returns true once the run can no longer change
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Finished | RunState::Failed | RunState::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Started => "Started",
            RunState::Finished => "Finished",
            RunState::Failed => "Failed",
            RunState::Cancelled => "Cancelled",
            RunState::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

fn is_cancellation(reason: Option<&str>) -> bool {
    reason.is_some_and(|r| CANCELLATION_REASONS.contains(&r))
}

/// A declared task merged with its record from a pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunTaskStatus {
    #[serde(flatten)]
    pub task: DeclaredTask,

    /// Key of the matched entry in `status.taskRuns`
    pub task_run: String,

    pub state: RunState,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_time: Option<String>,
}

impl RunTaskStatus {
    /// Returns the pipeline task name
    pub fn name(&self) -> &str {
        &self.task.name
    }

    /// Elapsed time between start and completion, when both are valid RFC 3339
    pub fn duration(&self) -> Option<Duration> {
        let start = DateTime::parse_from_rfc3339(self.start_time.as_deref()?).ok()?;
        let end = DateTime::parse_from_rfc3339(self.completion_time.as_deref()?).ok()?;
        Some(end.signed_duration_since(start))
    }
}

/// Merges declared tasks with the task run records of a pipeline run
///
/// Output follows the order of `declared_tasks`. Tasks without a record are
/// left out, so the result may be shorter than the input.
pub fn merge_run_status(
    run: &Document,
    declared_tasks: &[DeclaredTask],
) -> Result<Vec<RunTaskStatus>, DocumentError> {
    let task_runs = match run.as_pipeline_run()?.status.as_ref().and_then(|s| s.task_runs.as_ref()) {
        Some(task_runs) => task_runs,
        None => return Ok(Vec::new()),
    };

    Ok(declared_tasks
        .iter()
        .filter_map(|task| {
            let (key, record) = task_runs
                .iter()
                .find(|(_, record)| record.pipeline_task_name.as_deref() == Some(task.name.as_str()))?;
            let status = record.status.as_ref();

            Some(RunTaskStatus {
                task: task.clone(),
                task_run: key.clone(),
                state: RunState::from_conditions(
                    status.and_then(|s| s.conditions.as_deref()).unwrap_or_default(),
                ),
                start_time: status.and_then(|s| s.start_time.clone()),
                completion_time: status.and_then(|s| s.completion_time.clone()),
            })
        })
        .collect())
}

/// Returns the run's `metadata.name`
pub fn run_name(run: &Document) -> Result<&str, DocumentError> {
    match run.kind() {
        DocumentKind::PipelineRun | DocumentKind::TaskRun => run.name(),
        other => Err(DocumentError::missing(other, "status")),
    }
}

/// Returns the overall state of a pipeline run or task run
pub fn run_status(run: &Document) -> Result<RunState, DocumentError> {
    let conditions = match run {
        Document::PipelineRun(o) => o.status.as_ref().and_then(|s| s.conditions.as_deref()),
        Document::TaskRun(o) => o.status.as_ref().and_then(|s| s.conditions.as_deref()),
        other => return Err(DocumentError::missing(other.kind(), "status")),
    };

    Ok(RunState::from_conditions(conditions.unwrap_or_default()))
}

/// Returns the name of the pipeline a run executes, from `spec.pipelineRef`
pub fn run_pipeline_name(run: &Document) -> Option<&str> {
    run.as_pipeline_run()
        .ok()?
        .spec
        .as_ref()?
        .pipeline_ref
        .as_ref()?
        .name
        .as_deref()
}
