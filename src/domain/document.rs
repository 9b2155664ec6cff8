//! Tekton document model
//!
//! Every recognized document is a variant of [`Document`], tagged by its
//! `kind` field. Payloads are typed per kind but every field is optional, so a
//! recognized-but-broken document still classifies and is reported later
//! through [`DocumentError::MissingField`] by the accessor that needed it.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tracing::debug;

/// API group of the core pipeline resources
pub const PIPELINE_GROUP: &str = "tekton.dev";

/// API group of the trigger resources
pub const TRIGGERS_GROUP: &str = "triggers.tekton.dev";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DocumentError {
    #[error("{source_id}: document #{index} could not be parsed: {message}")]
    Parse {
        source_id: String,
        index: usize,
        message: String,
    },

    #[error("{kind} document is missing required field `{field}`")]
    MissingField { kind: DocumentKind, field: &'static str },
}

impl DocumentError {
    pub(crate) fn missing(kind: DocumentKind, field: &'static str) -> Self {
        DocumentError::MissingField { kind, field }
    }
}

/// The closed set of document kinds this crate understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DocumentKind {
    Pipeline,
    Task,
    ClusterTask,
    PipelineRun,
    TaskRun,
    EventListener,
    TriggerBinding,
    TriggerTemplate,
    Condition,
    PipelineResource,
}

const ALL_KINDS: [DocumentKind; 10] = [
    DocumentKind::Pipeline,
    DocumentKind::Task,
    DocumentKind::ClusterTask,
    DocumentKind::PipelineRun,
    DocumentKind::TaskRun,
    DocumentKind::EventListener,
    DocumentKind::TriggerBinding,
    DocumentKind::TriggerTemplate,
    DocumentKind::Condition,
    DocumentKind::PipelineResource,
];

impl DocumentKind {
    /// All recognized kinds, in declaration order
    pub fn all() -> impl Iterator<Item = DocumentKind> {
        ALL_KINDS.into_iter()
    }

    /// Looks up a kind by its literal `kind` field value
    pub fn from_kind(kind: &str) -> Option<Self> {
        Self::all().find(|candidate| candidate.as_str() == kind)
    }

    /// Returns the literal `kind` value
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Pipeline => "Pipeline",
            DocumentKind::Task => "Task",
            DocumentKind::ClusterTask => "ClusterTask",
            DocumentKind::PipelineRun => "PipelineRun",
            DocumentKind::TaskRun => "TaskRun",
            DocumentKind::EventListener => "EventListener",
            DocumentKind::TriggerBinding => "TriggerBinding",
            DocumentKind::TriggerTemplate => "TriggerTemplate",
            DocumentKind::Condition => "Condition",
            DocumentKind::PipelineResource => "PipelineResource",
        }
    }

    /// Returns the API groups accepted for this kind
    pub fn api_groups(&self) -> &'static [&'static str] {
        match self {
            // Triggers lived under tekton.dev before moving to their own group.
            DocumentKind::EventListener
            | DocumentKind::TriggerBinding
            | DocumentKind::TriggerTemplate => &[TRIGGERS_GROUP, PIPELINE_GROUP],
            DocumentKind::Pipeline
            | DocumentKind::Task
            | DocumentKind::ClusterTask
            | DocumentKind::PipelineRun
            | DocumentKind::TaskRun
            | DocumentKind::Condition
            | DocumentKind::PipelineResource => &[PIPELINE_GROUP],
        }
    }

    /// Returns true if `api_version` (`group/version`) belongs to this kind's family
    pub fn accepts_api_version(&self, api_version: &str) -> bool {
        match api_version.split_once('/') {
            Some((group, version)) if !version.is_empty() => self.api_groups().contains(&group),
            _ => false,
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for DocumentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_kind(s)
            .or_else(|| Self::all().find(|kind| kind.as_str().eq_ignore_ascii_case(s)))
            .ok_or_else(|| format!("unknown document kind: {}", s))
    }
}

/// Shared `metadata` block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    #[serde(default, deserialize_with = "scalar_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub generate_name: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub namespace: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub uid: Option<String>,
    #[serde(default, deserialize_with = "integer")]
    pub generation: Option<i64>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub resource_version: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub creation_timestamp: Option<String>,
}

/// A Kubernetes-style object with a typed `spec` and `status`
///
/// A `metadata`, `spec` or `status` block that does not fit its type reads as
/// absent instead of rejecting the whole document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(bound(deserialize = "S: DeserializeOwned, T: DeserializeOwned"))]
pub struct Object<S, T = serde_yaml::Value> {
    pub api_version: String,
    #[serde(default, deserialize_with = "lenient")]
    pub metadata: Option<ObjectMeta>,
    #[serde(default, deserialize_with = "lenient")]
    pub spec: Option<S>,
    #[serde(default, deserialize_with = "lenient")]
    pub status: Option<T>,
}

/// A recognized document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Document {
    Pipeline(Object<PipelineSpec>),
    Task(Object<TaskSpec>),
    ClusterTask(Object<TaskSpec>),
    PipelineRun(Object<PipelineRunSpec, RunStatus>),
    TaskRun(Object<TaskRunSpec, TaskRunStatus>),
    EventListener(Object<serde_yaml::Value>),
    TriggerBinding(Object<TriggerBindingSpec>),
    TriggerTemplate(Object<TriggerTemplateSpec>),
    Condition(Object<ConditionSpec>),
    PipelineResource(Object<PipelineResourceSpec>),
}

impl Document {
    /// Returns the kind tag
    pub fn kind(&self) -> DocumentKind {
        match self {
            Document::Pipeline(_) => DocumentKind::Pipeline,
            Document::Task(_) => DocumentKind::Task,
            Document::ClusterTask(_) => DocumentKind::ClusterTask,
            Document::PipelineRun(_) => DocumentKind::PipelineRun,
            Document::TaskRun(_) => DocumentKind::TaskRun,
            Document::EventListener(_) => DocumentKind::EventListener,
            Document::TriggerBinding(_) => DocumentKind::TriggerBinding,
            Document::TriggerTemplate(_) => DocumentKind::TriggerTemplate,
            Document::Condition(_) => DocumentKind::Condition,
            Document::PipelineResource(_) => DocumentKind::PipelineResource,
        }
    }

    fn header(&self) -> (&str, Option<&ObjectMeta>) {
        match self {
            Document::Pipeline(o) => (&o.api_version, o.metadata.as_ref()),
            Document::Task(o) | Document::ClusterTask(o) => (&o.api_version, o.metadata.as_ref()),
            Document::PipelineRun(o) => (&o.api_version, o.metadata.as_ref()),
            Document::TaskRun(o) => (&o.api_version, o.metadata.as_ref()),
            Document::EventListener(o) => (&o.api_version, o.metadata.as_ref()),
            Document::TriggerBinding(o) => (&o.api_version, o.metadata.as_ref()),
            Document::TriggerTemplate(o) => (&o.api_version, o.metadata.as_ref()),
            Document::Condition(o) => (&o.api_version, o.metadata.as_ref()),
            Document::PipelineResource(o) => (&o.api_version, o.metadata.as_ref()),
        }
    }

    /// Returns the `apiVersion` value
    pub fn api_version(&self) -> &str {
        self.header().0
    }

    /// Returns the `metadata` block
    pub fn metadata(&self) -> Result<&ObjectMeta, DocumentError> {
        self.header()
            .1
            .ok_or_else(|| DocumentError::missing(self.kind(), "metadata"))
    }

    /// Returns `metadata.name`
    pub fn name(&self) -> Result<&str, DocumentError> {
        self.metadata()?
            .name
            .as_deref()
            .ok_or_else(|| DocumentError::missing(self.kind(), "metadata.name"))
    }

    /// Returns `metadata.namespace` if set
    pub fn namespace(&self) -> Option<&str> {
        self.header().1.and_then(|meta| meta.namespace.as_deref())
    }

    /// Returns the pipeline payload, or `MissingField` for any other kind
    pub fn as_pipeline(&self) -> Result<&Object<PipelineSpec>, DocumentError> {
        match self {
            Document::Pipeline(pipeline) => Ok(pipeline),
            other => Err(DocumentError::missing(other.kind(), "spec.tasks")),
        }
    }

    /// Returns the pipeline run payload, or `MissingField` for any other kind
    pub fn as_pipeline_run(&self) -> Result<&Object<PipelineRunSpec, RunStatus>, DocumentError> {
        match self {
            Document::PipelineRun(run) => Ok(run),
            other => Err(DocumentError::missing(other.kind(), "status.taskRuns")),
        }
    }
}

// =============================================================================
// Pipeline
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSpec {
    #[serde(default, deserialize_with = "lenient_list")]
    pub resources: Option<Vec<PipelineDeclaredResource>>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub params: Option<Vec<ParamSpec>>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub tasks: Option<Vec<PipelineTask>>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub finally: Option<Vec<PipelineTask>>,
}

/// Entry of a pipeline's top-level `resources` block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineDeclaredResource {
    #[serde(default, deserialize_with = "scalar_string")]
    pub name: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "scalar_string")]
    pub resource_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub param_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub default: Option<serde_yaml::Value>,
}

/// Entry of a pipeline's `tasks` or `finally` list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineTask {
    #[serde(default, deserialize_with = "scalar_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub task_ref: Option<TaskRef>,
    #[serde(default)]
    pub task_spec: Option<serde_yaml::Value>,
    #[serde(default, deserialize_with = "string_list")]
    pub run_after: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient")]
    pub resources: Option<PipelineTaskResources>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub conditions: Option<Vec<PipelineTaskCondition>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskRef {
    #[serde(default, deserialize_with = "scalar_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineTaskResources {
    #[serde(default, deserialize_with = "lenient_list")]
    pub inputs: Option<Vec<ResourceBinding>>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub outputs: Option<Vec<ResourceBinding>>,
}

/// Binds a task (or condition) resource slot to a pipeline resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceBinding {
    #[serde(default, deserialize_with = "scalar_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub resource: Option<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub from: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineTaskCondition {
    #[serde(default, deserialize_with = "scalar_string")]
    pub condition_ref: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub resources: Option<Vec<ResourceBinding>>,
}

// =============================================================================
// Task, ClusterTask, Condition, PipelineResource, triggers
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    #[serde(default)]
    pub inputs: Option<TaskInputs>,
    #[serde(default)]
    pub outputs: Option<TaskOutputs>,
    #[serde(default)]
    pub params: Option<Vec<ParamSpec>>,
    #[serde(default)]
    pub steps: Option<Vec<serde_yaml::Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskInputs {
    #[serde(default)]
    pub resources: Option<Vec<TaskResource>>,
    #[serde(default)]
    pub params: Option<Vec<ParamSpec>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskOutputs {
    #[serde(default)]
    pub resources: Option<Vec<TaskResource>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResource {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub target_path: Option<String>,
    #[serde(default)]
    pub optional: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConditionSpec {
    #[serde(default)]
    pub params: Option<Vec<ParamSpec>>,
    #[serde(default)]
    pub resources: Option<Vec<TaskResource>>,
    #[serde(default)]
    pub check: Option<serde_yaml::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineResourceSpec {
    #[serde(rename = "type", default)]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub params: Option<Vec<serde_yaml::Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggerBindingSpec {
    #[serde(default)]
    pub params: Option<Vec<serde_yaml::Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerTemplateSpec {
    #[serde(default)]
    pub params: Option<Vec<ParamSpec>>,
    #[serde(default)]
    pub resourcetemplates: Option<Vec<serde_yaml::Value>>,
}

// =============================================================================
// PipelineRun, TaskRun
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRunSpec {
    #[serde(default, deserialize_with = "lenient")]
    pub pipeline_ref: Option<NamedRef>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub service_account_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamedRef {
    #[serde(default, deserialize_with = "scalar_string")]
    pub name: Option<String>,
}

/// `status` block of a pipeline run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStatus {
    #[serde(default, deserialize_with = "lenient_list")]
    pub conditions: Option<Vec<StatusCondition>>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub start_time: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub completion_time: Option<String>,
    /// Keyed by task run name, in document order
    #[serde(default, deserialize_with = "lenient_map")]
    pub task_runs: Option<IndexMap<String, PipelineRunTaskRun>>,
}

/// One entry of `status.taskRuns`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRunTaskRun {
    #[serde(default, deserialize_with = "scalar_string")]
    pub pipeline_task_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub status: Option<TaskRunStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRunSpec {
    #[serde(default)]
    pub task_ref: Option<TaskRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRunStatus {
    #[serde(default, deserialize_with = "lenient_list")]
    pub conditions: Option<Vec<StatusCondition>>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub start_time: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub completion_time: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub pod_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub steps: Option<Vec<serde_yaml::Value>>,
}

/// Kubernetes-style condition entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCondition {
    #[serde(rename = "type", default, deserialize_with = "scalar_string")]
    pub condition_type: Option<String>,
    #[serde(default, deserialize_with = "condition_status")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub reason: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub last_transition_time: Option<String>,
}

/// Reads a condition status, accepting unquoted YAML booleans
///
/// `status: True` resolves to a boolean under YAML 1.2; it is normalized to
/// the `"True"`/`"False"` literals Kubernetes writes. Non-scalar values read
/// as absent.
fn condition_status<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_yaml::Value>::deserialize(deserializer)? {
        Some(serde_yaml::Value::String(s)) => Some(s),
        Some(serde_yaml::Value::Bool(true)) => Some("True".to_string()),
        Some(serde_yaml::Value::Bool(false)) => Some("False".to_string()),
        _ => None,
    })
}

/// Reads a scalar as a string; `resourceVersion: 1234` is a number in YAML
fn scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<serde_yaml::Value>::deserialize(deserializer)?.and_then(scalar_text))
}

fn scalar_text(value: serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Reads an integer, accepting a quoted number such as `generation: "3"`
fn integer<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_yaml::Value>::deserialize(deserializer)? {
        Some(serde_yaml::Value::Number(n)) => n.as_i64(),
        Some(serde_yaml::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Reads a list of names; a single scalar is a one-element list
fn string_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_yaml::Value>::deserialize(deserializer)? {
        Some(serde_yaml::Value::Sequence(items)) => {
            Some(items.into_iter().filter_map(scalar_text).collect())
        }
        Some(other) => scalar_text(other).map(|name| vec![name]),
        None => None,
    })
}

/// Reads a value of type `T`, treating a mismatched shape as absent
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(Option::<serde_yaml::Value>::deserialize(deserializer)?.and_then(fit))
}

/// Reads a list, dropping the entries that do not fit `T`
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Option::<serde_yaml::Value>::deserialize(deserializer)? {
        Some(serde_yaml::Value::Sequence(items)) => Some(items.into_iter().filter_map(fit).collect()),
        Some(other) => {
            debug!(?other, "ignoring non-list value where a list was expected");
            None
        }
        None => None,
    })
}

/// Reads a string-keyed map, dropping the entries that do not fit `T`
fn lenient_map<'de, D, T>(deserializer: D) -> Result<Option<IndexMap<String, T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Option::<serde_yaml::Value>::deserialize(deserializer)? {
        Some(serde_yaml::Value::Mapping(entries)) => Some(
            entries
                .into_iter()
                .filter_map(|(key, value)| Some((scalar_text(key)?, fit(value)?)))
                .collect(),
        ),
        Some(other) => {
            debug!(?other, "ignoring non-mapping value where a mapping was expected");
            None
        }
        None => None,
    })
}

fn fit<T: DeserializeOwned>(value: serde_yaml::Value) -> Option<T> {
    match serde_yaml::from_value(value) {
        Ok(fitted) => Some(fitted),
        Err(e) => {
            debug!(error = %e, "ignoring value of unexpected shape");
            None
        }
    }
}
