/// Canonical active-learning workflow template
///
/// Builds the `preprocessing → active_learning` pipeline from an `AlConfig`, with an extra
/// `federated_coordination` step for federated projects.

use crate::workflow::types::{
    AlConfig, StepInput, WorkflowDocument, WorkflowInput, WorkflowOutput, WorkflowStep,
};
use serde_json::{json, Value};

pub const DOCUMENT_VERSION: &str = "v1.2";
pub const WORKFLOW_CLASS: &str = "Workflow";

pub const PREPROCESSING_STEP: &str = "preprocessing";
pub const ACTIVE_LEARNING_STEP: &str = "active_learning";
pub const FEDERATED_STEP: &str = "federated_coordination";

const QUERY_STRATEGY: &str = "query_strategy";
const MODEL_CONFIG: &str = "model_config";
const LABELING_BUDGET: &str = "labeling_budget";
const MAX_ITERATIONS: &str = "max_iterations";
const CONTRIBUTORS: &str = "contributors";

/// Build the workflow document for a project
pub fn build_template(project_id: &str, title: &str, config: &AlConfig) -> WorkflowDocument {
    let mut doc = WorkflowDocument {
        version: DOCUMENT_VERSION.to_string(),
        class: WORKFLOW_CLASS.to_string(),
        id: Some(format!("al-workflow-{}", project_id)),
        label: Some(title.to_string()),
        inputs: vec![
            input("dataset", "File", None, "Raw dataset to split into train and validation data"),
            input(QUERY_STRATEGY, "string", Some(json!(config.query_strategy)), "Query strategy"),
            input(MODEL_CONFIG, "string", Some(model_config_text(config)), "Serialized model configuration"),
            input(LABELING_BUDGET, "int", Some(json!(config.labeling_budget)), "Samples queried per round"),
            input(MAX_ITERATIONS, "int", Some(json!(config.max_iterations)), "Number of AL rounds"),
            input("validation_split", "float", Some(json!(config.validation_split)), "Held-out fraction"),
        ],
        outputs: vec![
            output("model_out", "File", "active_learning/model_out"),
            output("query_indices", "File", "active_learning/query_indices"),
            output("metrics", "File", "active_learning/metrics"),
        ],
        steps: vec![
            WorkflowStep {
                id: PREPROCESSING_STEP.to_string(),
                run: "preprocess.cwl".to_string(),
                inputs: vec![
                    StepInput::new("dataset", "dataset"),
                    StepInput::new("validation_split", "validation_split"),
                ],
                out: vec!["train_data".to_string(), "validation_data".to_string()],
            },
            WorkflowStep {
                id: ACTIVE_LEARNING_STEP.to_string(),
                run: "al_iteration.cwl".to_string(),
                inputs: vec![
                    StepInput::new("train_data", "preprocessing/train_data"),
                    StepInput::new("validation_data", "preprocessing/validation_data"),
                    StepInput::new(QUERY_STRATEGY, QUERY_STRATEGY),
                    StepInput::new(MODEL_CONFIG, MODEL_CONFIG),
                    StepInput::new(LABELING_BUDGET, LABELING_BUDGET),
                    StepInput::new(MAX_ITERATIONS, MAX_ITERATIONS),
                ],
                out: vec![
                    "model_out".to_string(),
                    "query_indices".to_string(),
                    "metrics".to_string(),
                ],
            },
        ],
    };

    if config.is_federated {
        add_federated_coordination(&mut doc, config);
    }

    doc
}

/// Rewrite the core input defaults from `config`, leaving the pipeline untouched
///
/// The only topology change is the federated step, added when `config` asks for it and the
/// document does not have it yet.
pub fn apply_config(doc: &WorkflowDocument, config: &AlConfig) -> WorkflowDocument {
    let mut updated = doc.clone();

    set_default(&mut updated, QUERY_STRATEGY, "string", json!(config.query_strategy));
    set_default(&mut updated, MODEL_CONFIG, "string", model_config_text(config));
    set_default(&mut updated, LABELING_BUDGET, "int", json!(config.labeling_budget));
    set_default(&mut updated, MAX_ITERATIONS, "int", json!(config.max_iterations));

    if config.is_federated {
        if updated.step(FEDERATED_STEP).is_none() {
            add_federated_coordination(&mut updated, config);
        } else {
            set_default(&mut updated, CONTRIBUTORS, "string[]", json!(config.contributors));
        }
    }

    updated
}

fn add_federated_coordination(doc: &mut WorkflowDocument, config: &AlConfig) {
    set_default(doc, CONTRIBUTORS, "string[]", json!(config.contributors));

    doc.steps.push(WorkflowStep {
        id: FEDERATED_STEP.to_string(),
        run: "federated_coordination.cwl".to_string(),
        inputs: vec![
            StepInput::new("model", "active_learning/model_out"),
            StepInput::new(CONTRIBUTORS, CONTRIBUTORS),
        ],
        out: vec!["aggregated_model".to_string()],
    });
    doc.outputs.push(output(
        "aggregated_model",
        "File",
        "federated_coordination/aggregated_model",
    ));
}

fn set_default(doc: &mut WorkflowDocument, id: &str, kind: &str, value: Value) {
    match doc.inputs.iter_mut().find(|input| input.id == id) {
        Some(existing) => existing.default = Some(value),
        None => doc.inputs.push(WorkflowInput {
            id: id.to_string(),
            kind: kind.to_string(),
            default: Some(value),
            doc: None,
        }),
    }
}

fn model_config_text(config: &AlConfig) -> Value {
    Value::String(config.model_config.to_string())
}

fn input(id: &str, kind: &str, default: Option<Value>, doc: &str) -> WorkflowInput {
    WorkflowInput {
        id: id.to_string(),
        kind: kind.to_string(),
        default,
        doc: Some(doc.to_string()),
    }
}

fn output(id: &str, kind: &str, source: &str) -> WorkflowOutput {
    WorkflowOutput {
        id: id.to_string(),
        kind: kind.to_string(),
        output_source: source.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::validator::validate;

    fn step_ids(doc: &WorkflowDocument) -> Vec<&str> {
        doc.steps.iter().map(|step| step.id.as_str()).collect()
    }

    #[test]
    fn default_template_has_two_step_pipeline() {
        let doc = build_template("p1", "Iris labeling", &AlConfig::default());

        assert_eq!(step_ids(&doc), vec![PREPROCESSING_STEP, ACTIVE_LEARNING_STEP]);
        assert_eq!(doc.id.as_deref(), Some("al-workflow-p1"));
        assert_eq!(doc.label.as_deref(), Some("Iris labeling"));
        assert!(doc.input(CONTRIBUTORS).is_none());
        assert_eq!(
            doc.input(MODEL_CONFIG).unwrap().default,
            Some(json!(r#"{"model_type":"RandomForestClassifier"}"#))
        );
    }

    #[test]
    fn federated_template_adds_coordination_step_and_contributors() {
        let config = AlConfig {
            is_federated: true,
            contributors: vec!["0xbob".into(), "0xcarol".into()],
            ..AlConfig::default()
        };
        let doc = build_template("p1", "Federated", &config);

        assert_eq!(
            step_ids(&doc),
            vec![PREPROCESSING_STEP, ACTIVE_LEARNING_STEP, FEDERATED_STEP]
        );
        assert_eq!(
            doc.input(CONTRIBUTORS).unwrap().default,
            Some(json!(["0xbob", "0xcarol"]))
        );
        assert!(validate(&doc));
    }

    #[test]
    fn built_templates_always_validate() {
        let configs = [
            AlConfig::default(),
            AlConfig {
                query_strategy: "entropy_sampling".into(),
                labeling_budget: 1,
                max_iterations: 1,
                validation_split: 0.0,
                model_config: json!({ "model_type": "SVC", "kernel": "rbf" }),
                ..AlConfig::default()
            },
            AlConfig {
                is_federated: true,
                ..AlConfig::default()
            },
        ];

        for config in &configs {
            assert!(validate(&build_template("project", "title", config)));
        }
    }

    #[test]
    fn apply_config_rewrites_core_defaults_only() {
        let original = build_template("p1", "Title", &AlConfig::default());
        let config = AlConfig {
            query_strategy: "margin_sampling".into(),
            labeling_budget: 25,
            max_iterations: 4,
            validation_split: 0.5,
            ..AlConfig::default()
        };

        let updated = apply_config(&original, &config);

        assert_eq!(updated.input(QUERY_STRATEGY).unwrap().default, Some(json!("margin_sampling")));
        assert_eq!(updated.input(LABELING_BUDGET).unwrap().default, Some(json!(25)));
        assert_eq!(updated.input(MAX_ITERATIONS).unwrap().default, Some(json!(4)));
        // validation split is not one of the rewritten inputs
        assert_eq!(updated.input("validation_split").unwrap().default, Some(json!(0.2)));
        assert_eq!(updated.steps, original.steps);
        // source document is untouched
        assert_eq!(original.input(LABELING_BUDGET).unwrap().default, Some(json!(10)));
    }

    #[test]
    fn apply_config_adds_federation_once() {
        let original = build_template("p1", "Title", &AlConfig::default());
        let federated = AlConfig {
            is_federated: true,
            contributors: vec!["0xbob".into()],
            ..AlConfig::default()
        };

        let once = apply_config(&original, &federated);
        let twice = apply_config(&once, &federated);

        assert_eq!(step_ids(&twice), vec![PREPROCESSING_STEP, ACTIVE_LEARNING_STEP, FEDERATED_STEP]);
        assert_eq!(twice.outputs.len(), once.outputs.len());
        assert!(validate(&twice));
    }
}
