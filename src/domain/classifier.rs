//! Document classification
//!
//! Splits multi-document YAML text on `---` boundary lines and keeps the
//! segments that are recognized Tekton documents. Foreign or malformed
//! segments are dropped without failing their siblings.

use serde_yaml::Value;
use tracing::debug;

use super::document::{Document, DocumentError, DocumentKind};

/// Returns the documents of `kind` found in `text`, in original order
pub fn classify(text: &str, source: &str, kind: DocumentKind) -> Vec<Document> {
    parse_documents(text, source)
        .into_iter()
        .filter(|doc| doc.kind() == kind)
        .collect()
}

/// Returns every recognized document found in `text`, in original order
pub fn parse_documents(text: &str, source: &str) -> Vec<Document> {
    segments(text)
        .enumerate()
        .filter_map(|(index, segment)| match parse_segment(source, index, segment) {
            Ok(doc) => doc,
            Err(e) => {
                debug!(error = %e, "skipping unparseable document");
                None
            }
        })
        .collect()
}

/// Returns the kind of the first recognized document, if any
pub fn detect_kind(text: &str, source: &str) -> Option<DocumentKind> {
    segments(text)
        .enumerate()
        .find_map(|(index, segment)| parse_segment(source, index, segment).ok().flatten())
        .map(|doc| doc.kind())
}

/// Splits text into segments separated by `---` lines
///
/// Only a `---` at the start of a line is a boundary; it may be followed by
/// whitespace or a comment. An indented `---` belongs to its block, such as a
/// script holding several manifests. The boundary line itself belongs to no
/// segment. Leading and trailing boundaries produce empty segments, which
/// parse to nothing.
pub fn segments(text: &str) -> impl Iterator<Item = &str> {
    let mut rest = Some(text);
    std::iter::from_fn(move || {
        let current = rest?;
        let mut offset = 0;
        for line in current.split_inclusive('\n') {
            if is_boundary(line) {
                rest = Some(&current[offset + line.len()..]);
                return Some(&current[..offset]);
            }
            offset += line.len();
        }
        rest = None;
        Some(current)
    })
}

fn is_boundary(line: &str) -> bool {
    match line.strip_prefix("---") {
        Some(tail) => {
            let tail = tail.trim();
            tail.is_empty() || tail.starts_with('#')
        }
        None => false,
    }
}

/// Parses one segment
///
/// `Ok(None)` is a classification miss: empty text, a non-mapping, or a
/// mapping whose `kind`/`apiVersion` are not a recognized pair. `Err` means
/// the segment is not valid YAML. Payload fields of an unexpected shape read
/// as absent, so a recognized document always classifies.
fn parse_segment(source: &str, index: usize, segment: &str) -> Result<Option<Document>, DocumentError> {
    let parse_error = |e: serde_yaml::Error| DocumentError::Parse {
        source_id: source.to_string(),
        index,
        message: e.to_string(),
    };

    if segment.trim().is_empty() {
        return Ok(None);
    }

    let value: Value = serde_yaml::from_str(segment).map_err(parse_error)?;
    if !value.is_mapping() {
        return Ok(None);
    }

    let kind = match value.get("kind").and_then(Value::as_str).and_then(DocumentKind::from_kind) {
        Some(kind) => kind,
        None => return Ok(None),
    };

    let api_version = value.get("apiVersion").and_then(Value::as_str).unwrap_or_default();
    if !kind.accepts_api_version(api_version) {
        debug!(source, index, %kind, api_version, "kind outside its api group");
        return Ok(None);
    }

    serde_yaml::from_value(value).map(Some).map_err(parse_error)
}
