//! Run command

use anyhow::{bail, Result};
use chrono::Duration;
use serde_json::json;
use tracing::{debug, warn};

use super::output::{Output, UNNAMED};
use crate::domain::{
    classify, extract_finally_tasks, extract_tasks, merge_run_status, run_name,
    run_pipeline_name, run_status, DeclaredTask, Document, DocumentKind,
};
use crate::storage::SourceText;

/// Show each pipeline run's state per task
pub fn run(output: &Output, file: &str, pipeline_file: Option<&str>) -> Result<()> {
    let source = SourceText::read(file)?;
    let runs = classify(&source.text, &source.source, DocumentKind::PipelineRun);
    if runs.is_empty() {
        bail!("No PipelineRun documents found in {}", source.source);
    }

    let mut pipelines = classify(&source.text, &source.source, DocumentKind::Pipeline);
    if let Some(path) = pipeline_file {
        let extra = SourceText::read(path)?;
        pipelines.extend(classify(&extra.text, &extra.source, DocumentKind::Pipeline));
    }
    debug!(runs = runs.len(), pipelines = pipelines.len(), "loaded run documents");

    let mut items = Vec::new();
    for doc in &runs {
        let name = run_name(doc).unwrap_or(UNNAMED);
        let state = run_status(doc)?;
        let pipeline_name = run_pipeline_name(doc);
        let declared = declared_tasks(&pipelines, name, pipeline_name)?;
        let tasks = merge_run_status(doc, &declared)?;

        if output.is_json() {
            items.push(json!({
                "name": name,
                "pipeline": pipeline_name,
                "state": state,
                "tasks": tasks,
            }));
            continue;
        }

        println!("PipelineRun: {}", name);
        println!("Pipeline:    {}", pipeline_name.unwrap_or("-"));
        println!("State:       {}", state);
        if tasks.is_empty() {
            println!("  (no task runs recorded)");
        } else {
            println!();
            println!("{:<24} {:<10} {:<22} DURATION", "TASK", "STATE", "STARTED");
            println!("{}", "-".repeat(68));
            for task in &tasks {
                println!(
                    "{:<24} {:<10} {:<22} {}",
                    task.name(),
                    task.state,
                    task.start_time.as_deref().unwrap_or("-"),
                    task.duration().map(format_duration).unwrap_or_else(|| "-".to_string())
                );
            }
        }
        output.blank();
    }

    if output.is_json() {
        output.data(&items)?;
    }

    Ok(())
}

/// Declared tasks (including finally) of the pipeline a run executes
fn declared_tasks(
    pipelines: &[Document],
    run: &str,
    pipeline_name: Option<&str>,
) -> Result<Vec<DeclaredTask>> {
    let Some(pipeline_name) = pipeline_name else {
        warn!(run, "run has no spec.pipelineRef; no tasks to report");
        return Ok(Vec::new());
    };

    let Some(pipeline) = pipelines.iter().find(|p| p.name().ok() == Some(pipeline_name)) else {
        warn!(run, pipeline = pipeline_name, "pipeline definition not found; pass --pipeline-file");
        return Ok(Vec::new());
    };

    let mut tasks = extract_tasks(pipeline)?;
    tasks.extend(extract_finally_tasks(pipeline)?);
    Ok(tasks)
}

/// Formats a duration as `2m08s`
fn format_duration(duration: Duration) -> String {
    let secs = duration.num_seconds();
    if secs < 0 {
        return "-".to_string();
    }
    match (secs / 3600, (secs % 3600) / 60, secs % 60) {
        (0, 0, s) => format!("{}s", s),
        (0, m, s) => format!("{}m{:02}s", m, s),
        (h, m, s) => format!("{}h{:02}m{:02}s", h, m, s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_durations() {
        assert_eq!(format_duration(Duration::seconds(42)), "42s");
        assert_eq!(format_duration(Duration::seconds(128)), "2m08s");
        assert_eq!(format_duration(Duration::seconds(3725)), "1h02m05s");
        assert_eq!(format_duration(Duration::seconds(-1)), "-");
    }

    #[test]
    fn missing_pipeline_yields_no_tasks() {
        let tasks = declared_tasks(&[], "run-1", Some("absent")).unwrap();
        assert!(tasks.is_empty());
        assert!(declared_tasks(&[], "run-1", None).unwrap().is_empty());
    }
}
