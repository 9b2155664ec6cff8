//! Domain models for tkn-graph
//!
//! Contains the document model, classification, extraction and run-state
//! logic without any I/O concerns. Every operation is a pure function over
//! borrowed input.

mod classifier;
mod document;
mod graph;
mod pipeline;
mod run;

pub use classifier::{classify, detect_kind, parse_documents, segments};
pub use document::{
    Document, DocumentError, DocumentKind, Object, ObjectMeta, PipelineTask, ResourceBinding,
    StatusCondition, PIPELINE_GROUP, TRIGGERS_GROUP,
};
pub use graph::{DependencyGraph, GraphError};
pub use pipeline::{
    declared_resources, extract_finally_tasks, extract_resources, extract_tasks,
    pipeline_task_names, pipeline_task_ref_names, DeclaredResource, DeclaredTask,
    DEFAULT_TASK_KIND,
};
pub use run::{
    merge_run_status, run_name, run_pipeline_name, run_status, RunState, RunTaskStatus,
    CANCELLATION_REASONS,
};
