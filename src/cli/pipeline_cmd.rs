//! Pipeline commands (kinds, tasks, resources, graph)

use anyhow::{bail, Result};
use serde_json::json;
use tracing::debug;

use super::output::{list_cell, Output, UNNAMED};
use crate::domain::{
    classify, extract_finally_tasks, extract_resources, extract_tasks, parse_documents,
    DependencyGraph, Document, DocumentKind,
};
use crate::storage::SourceText;

/// List recognized documents
pub fn kinds(output: &Output, file: &str, kind: Option<DocumentKind>) -> Result<()> {
    let source = SourceText::read(file)?;
    let documents: Vec<_> = parse_documents(&source.text, &source.source)
        .into_iter()
        .filter(|doc| kind.map_or(true, |k| doc.kind() == k))
        .collect();
    debug!(source = %source.source, count = documents.len(), "classified documents");

    if output.is_json() {
        let items: Vec<_> = documents
            .iter()
            .map(|doc| {
                json!({
                    "kind": doc.kind(),
                    "apiVersion": doc.api_version(),
                    "name": doc.name().ok(),
                    "namespace": doc.namespace(),
                })
            })
            .collect();
        output.data(&items)?;
    } else if documents.is_empty() {
        println!("No Tekton documents found in {}", source.source);
    } else {
        println!("{:<18} {:<28} NAME", "KIND", "API VERSION");
        println!("{}", "-".repeat(70));
        for doc in &documents {
            println!(
                "{:<18} {:<28} {}",
                doc.kind(),
                doc.api_version(),
                doc.name().unwrap_or(UNNAMED)
            );
        }
    }

    Ok(())
}

/// Selects the pipelines to report on
pub(crate) fn select_pipelines(source: &SourceText, name: Option<&str>) -> Result<Vec<Document>> {
    let pipelines: Vec<_> = classify(&source.text, &source.source, DocumentKind::Pipeline)
        .into_iter()
        .filter(|doc| name.map_or(true, |n| doc.name().ok() == Some(n)))
        .collect();

    if pipelines.is_empty() {
        match name {
            Some(name) => bail!("Pipeline '{}' not found in {}", name, source.source),
            None => bail!("No Pipeline documents found in {}", source.source),
        }
    }

    Ok(pipelines)
}

/// Show declared tasks per pipeline
pub fn tasks(output: &Output, file: &str, pipeline: Option<&str>) -> Result<()> {
    let source = SourceText::read(file)?;
    let pipelines = select_pipelines(&source, pipeline)?;

    let mut reports = Vec::new();
    for doc in &pipelines {
        reports.push((
            doc.name().unwrap_or(UNNAMED),
            extract_tasks(doc)?,
            extract_finally_tasks(doc)?,
        ));
    }

    if output.is_json() {
        let items: Vec<_> = reports
            .iter()
            .map(|(name, tasks, finally)| {
                json!({
                    "pipeline": name,
                    "tasks": tasks,
                    "finally": finally,
                })
            })
            .collect();
        output.data(&items)?;
        return Ok(());
    }

    for (name, tasks, finally) in &reports {
        println!("Pipeline: {}", name);
        if tasks.is_empty() && finally.is_empty() {
            println!("  (no tasks)");
            output.blank();
            continue;
        }

        println!("{:<24} {:<24} {:<32} CONDITIONS", "NAME", "TASK REF", "RUN AFTER");
        println!("{}", "-".repeat(96));
        for task in tasks.iter().chain(finally.iter()) {
            let task_ref = if task.task_ref.is_empty() {
                "(inline)".to_string()
            } else {
                format!("{}/{}", task.kind, task.task_ref)
            };
            println!(
                "{:<24} {:<24} {:<32} {}",
                task.name,
                task_ref,
                list_cell(&task.run_after),
                list_cell(&task.conditions)
            );
        }
        if !finally.is_empty() {
            println!("finally: {}", finally.iter().map(|t| t.name.as_str()).collect::<Vec<_>>().join(", "));
        }
        output.blank();
    }

    Ok(())
}

/// Show declared resources per pipeline
pub fn resources(output: &Output, file: &str, pipeline: Option<&str>) -> Result<()> {
    let source = SourceText::read(file)?;
    let pipelines = select_pipelines(&source, pipeline)?;

    let mut reports = Vec::new();
    for doc in &pipelines {
        reports.push((doc.name().unwrap_or(UNNAMED), extract_resources(doc)?));
    }

    if output.is_json() {
        let items: Vec<_> = reports
            .iter()
            .map(|(name, resources)| json!({ "pipeline": name, "resources": resources }))
            .collect();
        output.data(&items)?;
        return Ok(());
    }

    for (name, resources) in &reports {
        println!("Pipeline: {}", name);
        if resources.is_empty() {
            println!("  (no declared resources)");
        }
        for resource in resources {
            output.row(&["  ", &resource.name, &resource.resource_type]);
        }
        output.blank();
    }

    Ok(())
}

/// Show the dependency graph per pipeline
pub fn graph(output: &Output, file: &str, pipeline: Option<&str>, dot: bool) -> Result<()> {
    let source = SourceText::read(file)?;
    let pipelines = select_pipelines(&source, pipeline)?;

    let mut items = Vec::new();
    for doc in &pipelines {
        let name = doc.name().unwrap_or(UNNAMED);
        let tasks = extract_tasks(doc)?;
        let graph = DependencyGraph::from_tasks(&tasks);

        if dot {
            println!("{}", graph.to_dot());
            continue;
        }

        let order = graph.topological_order();
        if output.is_json() {
            items.push(json!({
                "pipeline": name,
                "order": order.as_ref().ok(),
                "cycle": order.as_ref().err().map(|e| e.to_string()),
                "roots": graph.roots(),
                "dangling": graph.dangling(),
                "edges": graph.edges(),
            }));
            continue;
        }

        println!("Pipeline: {} ({} tasks)", name, tasks.len());
        match &order {
            Ok(order) => {
                for (position, task) in order.iter().enumerate() {
                    let after = graph.dependencies(task).unwrap_or_default();
                    println!("{:>3}. {:<24} after: {}", position + 1, task, list_cell(&after));
                }
            }
            Err(e) => {
                println!("Warning: {}", e);
                for (from, to) in graph.edges() {
                    println!("  {} -> {}", from, to);
                }
            }
        }

        let dangling = graph.dangling();
        if !dangling.is_empty() {
            println!("Undeclared predecessors: {}", dangling.join(", "));
        }
        output.blank();
    }

    if output.is_json() && !dot {
        output.data(&items)?;
    }

    Ok(())
}
