use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::debug;

use intake_spec::{
    AnswerKey, AnswerStore, FieldInput, FileRef, FormSchema, SchemaError, SubmissionPayload,
    Wizard, WizardError, build_render_payload, render_json_ui as intake_render_json_ui,
    render_text as intake_render_text,
};

const DEFAULT_SCHEMA: &str = include_str!("../../intake-spec/tests/fixtures/client_intake.json");

#[derive(Debug, Error)]
enum ComponentError {
    #[error("failed to parse config: {0}")]
    ConfigParse(#[source] serde_json::Error),
    #[error("form '{0}' is not available")]
    FormUnavailable(String),
    #[error("invalid form schema: {0}")]
    Schema(#[from] SchemaError),
    #[error("failed to parse form state: {0}")]
    StateParse(#[source] serde_json::Error),
    #[error("failed to parse answer value: {0}")]
    ValueParse(#[source] serde_json::Error),
    #[error("unsupported answer value {0}")]
    UnsupportedValue(Value),
    #[error("json encode error: {0}")]
    JsonEncode(#[source] serde_json::Error),
    #[error("answer rejected: {0}")]
    Answer(#[from] WizardError),
}

#[derive(Debug, Deserialize, Serialize, Default)]
struct ComponentConfig {
    #[serde(default)]
    form_schema_json: Option<String>,
}

fn load_form_schema(config_json: &str) -> Result<FormSchema, ComponentError> {
    let config = if config_json.trim().is_empty() {
        ComponentConfig::default()
    } else {
        serde_json::from_str(config_json).map_err(ComponentError::ConfigParse)?
    };

    let schema_json = config
        .form_schema_json
        .as_deref()
        .unwrap_or(DEFAULT_SCHEMA);

    serde_json::from_str(schema_json).map_err(ComponentError::ConfigParse)
}

fn ensure_form(form_id: &str, config_json: &str) -> Result<FormSchema, ComponentError> {
    let schema = load_form_schema(config_json)?;
    if schema.id != form_id {
        Err(ComponentError::FormUnavailable(form_id.to_string()))
    } else {
        Ok(schema)
    }
}

/// Rebuilds a wizard from a draft-shaped state document; an empty state
/// starts a fresh form.
fn load_wizard(form_id: &str, config_json: &str, state_json: &str) -> Result<Wizard, ComponentError> {
    let schema = ensure_form(form_id, config_json)?;
    if state_json.trim().is_empty() {
        return Ok(Wizard::new(schema, AnswerStore::new())?);
    }
    let state: SubmissionPayload =
        serde_json::from_str(state_json).map_err(ComponentError::StateParse)?;
    Ok(Wizard::resume(schema, state)?)
}

fn state_of(wizard: &Wizard) -> Result<Value, ComponentError> {
    let mut state = wizard.payload();
    state.current_section = wizard.current_section_number();
    serde_json::to_value(state).map_err(ComponentError::JsonEncode)
}

fn respond(result: Result<Value, ComponentError>) -> String {
    match result {
        Ok(value) => serde_json::to_string(&value).unwrap_or_else(|error| {
            json!({"error": format!("json encode: {}", error)}).to_string()
        }),
        Err(err) => json!({ "error": err.to_string() }).to_string(),
    }
}

fn respond_string(result: Result<String, ComponentError>) -> String {
    match result {
        Ok(value) => value,
        Err(err) => json!({ "error": err.to_string() }).to_string(),
    }
}

pub fn describe(form_id: &str, config_json: &str) -> String {
    respond(ensure_form(form_id, config_json).and_then(|schema| {
        schema.check()?;
        serde_json::to_value(schema).map_err(ComponentError::JsonEncode)
    }))
}

pub fn list_sections(form_id: &str, config_json: &str, state_json: &str) -> String {
    respond(load_wizard(form_id, config_json, state_json).map(|wizard| {
        let visible = wizard.visible_sections();
        let sections = wizard
            .sections()
            .iter()
            .map(|section| {
                json!({
                    "number": section.number,
                    "title": section.display_title(),
                    "visible": visible.contains(&section.number),
                    "repeat_group": section.repeat_group(),
                    "questions": section.questions.len(),
                })
            })
            .collect::<Vec<_>>();
        json!({
            "sections": sections,
            "visible": visible,
            "current_section": wizard.current_section_number(),
        })
    }))
}

fn validation_response(valid: bool, wizard: &Wizard) -> Result<Value, ComponentError> {
    let errors = serde_json::to_value(wizard.errors()).map_err(ComponentError::JsonEncode)?;
    Ok(json!({ "valid": valid, "errors": errors }))
}

pub fn validate_section(form_id: &str, config_json: &str, state_json: &str, section: u32) -> String {
    respond(load_wizard(form_id, config_json, state_json).and_then(|mut wizard| {
        let valid = wizard.validate_section(section);
        validation_response(valid, &wizard)
    }))
}

pub fn validate_form(form_id: &str, config_json: &str, state_json: &str) -> String {
    respond(load_wizard(form_id, config_json, state_json).and_then(|mut wizard| {
        let valid = wizard.validate_all();
        validation_response(valid, &wizard)
    }))
}

pub fn render_text(form_id: &str, config_json: &str, state_json: &str) -> String {
    respond_string(
        load_wizard(form_id, config_json, state_json)
            .map(|wizard| intake_render_text(&build_render_payload(&wizard))),
    )
}

pub fn render_json_ui(form_id: &str, config_json: &str, state_json: &str) -> String {
    respond(
        load_wizard(form_id, config_json, state_json)
            .map(|wizard| intake_render_json_ui(&build_render_payload(&wizard))),
    )
}

fn input_from_json(value: Value) -> Result<FieldInput, ComponentError> {
    match value {
        Value::Null => Ok(FieldInput::Clear),
        Value::String(text) => Ok(FieldInput::Text(text)),
        Value::Number(number) => Ok(FieldInput::Text(number.to_string())),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(text) => Ok(text),
                other => Err(ComponentError::UnsupportedValue(other)),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(FieldInput::Choices),
        Value::Object(_) => serde_json::from_value::<FileRef>(value)
            .map(FieldInput::File)
            .map_err(ComponentError::ValueParse),
        other => Err(ComponentError::UnsupportedValue(other)),
    }
}

/// Applies one answer and returns the updated state plus the recomputed
/// visible sections.
pub fn submit_patch(
    form_id: &str,
    config_json: &str,
    state_json: &str,
    question_id: &str,
    instance: Option<u32>,
    value_json: &str,
) -> String {
    respond(load_wizard(form_id, config_json, state_json).and_then(|mut wizard| {
        let value: Value = serde_json::from_str(value_json).map_err(ComponentError::ValueParse)?;
        let key = AnswerKey {
            question: question_id.to_string(),
            instance,
        };
        match input_from_json(value)? {
            FieldInput::Text(text) => wizard.set_answer(&key, text)?,
            input => {
                wizard.apply_input(&key, input)?;
            }
        }
        debug!(form = form_id, key = %key, "patched answer");
        Ok(json!({
            "status": "need_input",
            "visible_sections": wizard.visible_sections(),
            "state": state_of(&wizard)?,
        }))
    }))
}

/// Validates every visible section and returns the submission payload when
/// they all pass.
pub fn submit_all(form_id: &str, config_json: &str, state_json: &str) -> String {
    respond(load_wizard(form_id, config_json, state_json).and_then(|mut wizard| {
        if !wizard.validate_all() {
            let validation =
                serde_json::to_value(wizard.errors()).map_err(ComponentError::JsonEncode)?;
            return Ok(json!({
                "status": "error",
                "validation": validation,
                "state": state_of(&wizard)?,
            }));
        }
        let payload =
            serde_json::to_value(wizard.payload()).map_err(ComponentError::JsonEncode)?;
        Ok(json!({
            "status": "complete",
            "payload": payload,
        }))
    }))
}
