//! tkn-graph - task graphs and run states from Tekton pipeline documents
//!
//! Classifies multi-document YAML, extracts pipeline tasks with their explicit
//! and inferred ordering, and merges pipeline runs into per-task lifecycle
//! states. The `cli` module is a thin front end over the pure `domain` core.

pub mod domain;
pub mod storage;
pub mod cli;

pub use domain::{
    classify, detect_kind, extract_resources, extract_tasks, merge_run_status, run_name,
    run_status, DeclaredResource, DeclaredTask, DependencyGraph, Document, DocumentError,
    DocumentKind, RunState, RunTaskStatus,
};
