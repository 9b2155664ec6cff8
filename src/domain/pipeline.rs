//! Pipeline task and resource extraction
//!
//! Tasks are read in declaration order. Ordering constraints come from three
//! places: the explicit `runAfter` list, input resource bindings that consume
//! another task's output, and the resource bindings of attached conditions.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::classifier::classify;
use super::document::{Document, DocumentError, DocumentKind, PipelineTask, ResourceBinding};

/// Default `kind` of a task reference
pub const DEFAULT_TASK_KIND: &str = "Task";

/// A task declared by a pipeline, with its resolved predecessors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclaredTask {
    /// Unique within the pipeline, never empty
    pub name: String,

    /// Kind of the referenced task (`Task` or `ClusterTask`)
    pub kind: String,

    /// Name of the referenced task definition, empty for inline specs
    pub task_ref: String,

    /// Predecessors: explicit first, then resource-inferred, then condition-inferred
    #[serde(default)]
    pub run_after: Vec<String>,

    /// Names of the conditions gating this task
    #[serde(default)]
    pub conditions: Vec<String>,
}

impl DeclaredTask {
    /// Creates a task with no predecessors or conditions
    pub fn new(name: impl Into<String>, task_ref: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: DEFAULT_TASK_KIND.to_string(),
            task_ref: task_ref.into(),
            run_after: Vec::new(),
            conditions: Vec::new(),
        }
    }

    /// Adds a predecessor unless it is already present
    pub fn add_predecessor(&mut self, name: &str) -> bool {
        if self.run_after.iter().any(|existing| existing == name) {
            false
        } else {
            self.run_after.push(name.to_string());
            true
        }
    }
}

/// A resource declared at the top of a pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredResource {
    pub name: String,
    #[serde(rename = "type")]
    pub resource_type: String,
}

/// Extracts the pipeline's `tasks` in declaration order
pub fn extract_tasks(document: &Document) -> Result<Vec<DeclaredTask>, DocumentError> {
    let spec = document.as_pipeline()?.spec.as_ref();
    let tasks = spec.and_then(|s| s.tasks.as_deref()).unwrap_or_default();
    let producers = ProducerIndex::build(tasks.iter());

    Ok(declare_all(tasks, &producers))
}

/// Extracts the pipeline's `finally` tasks
///
/// Producers are looked up across both `tasks` and `finally`.
pub fn extract_finally_tasks(document: &Document) -> Result<Vec<DeclaredTask>, DocumentError> {
    let spec = document.as_pipeline()?.spec.as_ref();
    let tasks = spec.and_then(|s| s.tasks.as_deref()).unwrap_or_default();
    let finally = spec.and_then(|s| s.finally.as_deref()).unwrap_or_default();
    let producers = ProducerIndex::build(tasks.iter().chain(finally));

    Ok(declare_all(finally, &producers))
}

/// Extracts the pipeline's top-level declared resources
pub fn extract_resources(document: &Document) -> Result<Vec<DeclaredResource>, DocumentError> {
    let spec = document.as_pipeline()?.spec.as_ref();
    let resources = spec.and_then(|s| s.resources.as_deref()).unwrap_or_default();

    Ok(resources
        .iter()
        .filter_map(|resource| {
            Some(DeclaredResource {
                name: resource.name.clone()?,
                resource_type: resource.resource_type.clone().unwrap_or_default(),
            })
        })
        .collect())
}

/// Names of all tasks of all pipelines in `text`
pub fn pipeline_task_names(text: &str, source: &str) -> Vec<String> {
    pipeline_tasks_in(text, source)
        .into_iter()
        .map(|task| task.name)
        .collect()
}

/// Referenced task definition names of all pipelines in `text`
pub fn pipeline_task_ref_names(text: &str, source: &str) -> Vec<String> {
    pipeline_tasks_in(text, source)
        .into_iter()
        .map(|task| task.task_ref)
        .filter(|task_ref| !task_ref.is_empty())
        .collect()
}

/// Declared resources of all pipelines in `text`
pub fn declared_resources(text: &str, source: &str) -> Vec<DeclaredResource> {
    classify(text, source, DocumentKind::Pipeline)
        .iter()
        .filter_map(|doc| extract_resources(doc).ok())
        .flatten()
        .collect()
}

fn pipeline_tasks_in(text: &str, source: &str) -> Vec<DeclaredTask> {
    classify(text, source, DocumentKind::Pipeline)
        .iter()
        .filter_map(|doc| extract_tasks(doc).ok())
        .flatten()
        .collect()
}

/// Maps pipeline resource names to the tasks that output them
struct ProducerIndex {
    producers: HashMap<String, Vec<String>>,
}

impl ProducerIndex {
    fn build<'a>(tasks: impl Iterator<Item = &'a PipelineTask>) -> Self {
        let mut producers: HashMap<String, Vec<String>> = HashMap::new();

        for task in tasks {
            let Some(name) = task.name.as_deref() else {
                continue;
            };
            let outputs = task
                .resources
                .as_ref()
                .and_then(|r| r.outputs.as_deref())
                .unwrap_or_default();

            for resource in outputs.iter().filter_map(|b| b.resource.as_deref()) {
                let entry = producers.entry(resource.to_string()).or_default();
                if !entry.iter().any(|existing| existing == name) {
                    entry.push(name.to_string());
                }
            }
        }

        Self { producers }
    }

    /// Producers of `binding` other than `consumer`
    ///
    /// Explicit `from` names come first, then tasks outputting the same resource.
    fn producers_of<'b>(
        &'b self,
        binding: &'b ResourceBinding,
        consumer: &'b str,
    ) -> impl Iterator<Item = &'b str> + 'b {
        let from = binding.from.iter().flatten().map(String::as_str);
        let by_resource = binding
            .resource
            .as_deref()
            .and_then(|resource| self.producers.get(resource))
            .into_iter()
            .flatten()
            .map(String::as_str);

        from.chain(by_resource).filter(move |producer| *producer != consumer)
    }
}

fn declare_all(tasks: &[PipelineTask], producers: &ProducerIndex) -> Vec<DeclaredTask> {
    tasks
        .iter()
        .filter_map(|task| {
            let declared = declare(task, producers);
            if declared.is_none() {
                debug!("skipping pipeline task without a name");
            }
            declared
        })
        .collect()
}

fn declare(task: &PipelineTask, producers: &ProducerIndex) -> Option<DeclaredTask> {
    let name = task.name.as_deref().filter(|name| !name.is_empty())?;
    let task_ref = task.task_ref.as_ref();

    let mut declared = DeclaredTask {
        name: name.to_string(),
        kind: task_ref
            .and_then(|r| r.kind.clone())
            .unwrap_or_else(|| DEFAULT_TASK_KIND.to_string()),
        task_ref: task_ref.and_then(|r| r.name.clone()).unwrap_or_default(),
        run_after: Vec::new(),
        conditions: Vec::new(),
    };

    for predecessor in task.run_after.iter().flatten() {
        declared.add_predecessor(predecessor);
    }

    let inputs = task
        .resources
        .as_ref()
        .and_then(|r| r.inputs.as_deref())
        .unwrap_or_default();
    for binding in inputs {
        for producer in producers.producers_of(binding, name) {
            if declared.add_predecessor(producer) {
                trace!(task = name, producer, "inferred predecessor from input resource");
            }
        }
    }

    for condition in task.conditions.iter().flatten() {
        if let Some(condition_ref) = &condition.condition_ref {
            declared.conditions.push(condition_ref.clone());
        }
        for binding in condition.resources.iter().flatten() {
            for producer in producers.producers_of(binding, name) {
                if declared.add_predecessor(producer) {
                    trace!(task = name, producer, "inferred predecessor from condition resource");
                }
            }
        }
    }

    Some(declared)
}
