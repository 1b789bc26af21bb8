/// Structural workflow validation
///
/// Checks tags against the allow-lists and, for multi-step workflows, that inputs, outputs and
/// steps are present. Beyond that it also rejects unresolved source references, duplicate
/// step ids and cycles in the step graph.
/// Validation never fails loudly: `validate` returns a boolean for callers to check.

use crate::workflow::types::WorkflowDocument;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

pub const SUPPORTED_VERSIONS: [&str; 3] = ["v1.0", "v1.1", "v1.2"];
pub const SUPPORTED_CLASSES: [&str; 3] = ["Workflow", "CommandLineTool", "ExpressionTool"];

/// True when the document is structurally well-formed
pub fn validate(doc: &WorkflowDocument) -> bool {
    validation_issues(doc).is_empty()
}

/// Every structural problem found in the document, empty when valid
pub fn validation_issues(doc: &WorkflowDocument) -> Vec<String> {
    let mut issues = Vec::new();

    if doc.version.is_empty() {
        issues.push("missing cwlVersion tag".to_string());
    } else if !SUPPORTED_VERSIONS.contains(&doc.version.as_str()) {
        issues.push(format!("unsupported cwlVersion `{}`", doc.version));
    }

    if doc.class.is_empty() {
        issues.push("missing class tag".to_string());
    } else if !SUPPORTED_CLASSES.contains(&doc.class.as_str()) {
        issues.push(format!("unsupported class `{}`", doc.class));
    }

    if doc.class == "Workflow" {
        if doc.inputs.is_empty() {
            issues.push("workflow declares no inputs".to_string());
        }
        if doc.outputs.is_empty() {
            issues.push("workflow declares no outputs".to_string());
        }
        if doc.steps.is_empty() {
            issues.push("workflow declares no steps".to_string());
        }
        if issues.is_empty() {
            check_pipeline(doc, &mut issues);
        }
    }

    issues
}

/// Resolve every source reference and reject cyclic step graphs
fn check_pipeline(doc: &WorkflowDocument, issues: &mut Vec<String>) {
    let mut graph: DiGraph<&str, ()> = DiGraph::new();
    let mut step_index: HashMap<&str, NodeIndex> = HashMap::new();

    for step in &doc.steps {
        if step_index.contains_key(step.id.as_str()) {
            issues.push(format!("duplicate step id `{}`", step.id));
            continue;
        }
        step_index.insert(step.id.as_str(), graph.add_node(step.id.as_str()));
    }

    for step in &doc.steps {
        for binding in &step.inputs {
            match binding.source.split_once('/') {
                Some((source_step, source_out)) => {
                    if !declares_output(doc, source_step, source_out) {
                        issues.push(format!(
                            "step `{}` input `{}` references unknown output `{}`",
                            step.id, binding.id, binding.source
                        ));
                        continue;
                    }
                    if let (Some(&from), Some(&to)) =
                        (step_index.get(source_step), step_index.get(step.id.as_str()))
                    {
                        graph.add_edge(from, to, ());
                    }
                }
                None => {
                    if doc.input(&binding.source).is_none() {
                        issues.push(format!(
                            "step `{}` input `{}` references undeclared input `{}`",
                            step.id, binding.id, binding.source
                        ));
                    }
                }
            }
        }
    }

    for output in &doc.outputs {
        let resolves = output
            .output_source
            .split_once('/')
            .map(|(step, out)| declares_output(doc, step, out))
            .unwrap_or(false);
        if !resolves {
            issues.push(format!(
                "output `{}` has unresolved source `{}`",
                output.id, output.output_source
            ));
        }
    }

    if toposort(&graph, None).is_err() {
        issues.push("step pipeline contains a cycle".to_string());
    }
}

fn declares_output(doc: &WorkflowDocument, step_id: &str, output: &str) -> bool {
    doc.step(step_id)
        .map(|step| step.out.iter().any(|out| out == output))
        .unwrap_or(false)
}
