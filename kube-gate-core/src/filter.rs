// kube-gate-core/src/filter.rs
// ============================================================================
// Module: Structural Filter Pipeline
// Description: Ordered structural query expressions over YAML output.
// Purpose: Project and reshape serialized responses before they cross the
//          tool boundary.
// Dependencies: jsonpath_lib, serde_json, serde_yaml
// ============================================================================

//! ## Overview
//! The filter pipeline applies an ordered list of JSONPath expressions to a
//! serialized YAML document. Each stage consumes the previous stage's output:
//! the text is parsed as a stream of YAML documents, the expression is
//! evaluated against each document, and the collected matches are
//! re-serialized to YAML. An empty expression list is the identity. The
//! pipeline is pure and stateless; a failing expression aborts with an error
//! naming the expression and produces no partial output.

use serde::Deserialize as _;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by the filter pipeline.
#[derive(Debug, Error)]
pub enum FilterError {
    /// An expression failed to parse or evaluate.
    #[error("failed to evaluate expression {expression:?}: {message}")]
    Expression {
        /// The offending expression.
        expression: String,
        /// Failure detail.
        message: String,
    },
}

// ============================================================================
// SECTION: Pipeline
// ============================================================================

/// Applies filter expressions in cascade to the input document.
///
/// # Errors
///
/// Returns [`FilterError`] when any expression fails; the input is never
/// partially transformed.
pub fn apply(input: &str, expressions: &[String]) -> Result<String, FilterError> {
    if expressions.is_empty() {
        return Ok(input.to_string());
    }
    let mut current = input.to_string();
    for expression in expressions {
        current = apply_single(&current, expression)?;
    }
    Ok(current.trim().to_string())
}

/// Applies a single expression to the input text.
fn apply_single(input: &str, expression: &str) -> Result<String, FilterError> {
    let documents = parse_documents(input, expression)?;
    if documents.is_empty() {
        return Ok(String::new());
    }

    let mut matches: Vec<Value> = Vec::new();
    for document in &documents {
        let selected = jsonpath_lib::select(document, expression).map_err(|_| {
            FilterError::Expression {
                expression: expression.to_string(),
                message: "invalid filter expression".to_string(),
            }
        })?;
        matches.extend(selected.into_iter().cloned());
    }

    let result = match matches.len() {
        0 => return Ok(String::new()),
        1 => matches.remove(0),
        _ => Value::Array(matches),
    };
    serde_yaml::to_string(&result).map_err(|err| FilterError::Expression {
        expression: expression.to_string(),
        message: format!("failed to encode result: {err}"),
    })
}

/// Parses the input as a stream of YAML documents.
fn parse_documents(input: &str, expression: &str) -> Result<Vec<Value>, FilterError> {
    let mut documents = Vec::new();
    for document in serde_yaml::Deserializer::from_str(input) {
        let value = Value::deserialize(document).map_err(|err| FilterError::Expression {
            expression: expression.to_string(),
            message: format!("failed to parse input: {err}"),
        })?;
        documents.push(value);
    }
    Ok(documents)
}
