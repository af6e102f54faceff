use serde_json::{Map, Value, json};

use crate::{
    answers::{AnswerKey, AnswerValue, InstanceId},
    field::FieldWidget,
    spec::question::{QuestionSpec, QuestionType},
    wizard::{Wizard, WizardStatus},
};

/// Status labels returned by the renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    /// The current section still takes input.
    NeedInput,
    /// The form was submitted.
    Complete,
    /// The current section has validation errors.
    Error,
}

impl RenderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderStatus::NeedInput => "need_input",
            RenderStatus::Complete => "complete",
            RenderStatus::Error => "error",
        }
    }
}

/// Position within the visible sections.
#[derive(Debug, Clone)]
pub struct RenderProgress {
    pub current: usize,
    pub total: usize,
}

/// One bound input.
#[derive(Debug, Clone)]
pub struct RenderField {
    pub key: AnswerKey,
    pub text: String,
    pub description: Option<String>,
    pub placeholder: Option<String>,
    pub kind: QuestionType,
    pub widget: &'static str,
    pub required: bool,
    pub header: bool,
    pub options: Vec<String>,
    pub current_value: Option<AnswerValue>,
    pub error: Option<String>,
}

/// One card of a repeatable section.
#[derive(Debug, Clone)]
pub struct RenderInstance {
    pub id: InstanceId,
    pub position: usize,
    pub collapsed: bool,
    pub fields: Vec<RenderField>,
}

#[derive(Debug, Clone)]
pub struct RenderRepeat {
    pub group: String,
    pub min: u32,
    pub max: u32,
    pub can_add: bool,
    pub can_remove: bool,
    pub instances: Vec<RenderInstance>,
}

/// Everything a renderer needs to draw the current section.
#[derive(Debug, Clone)]
pub struct RenderPayload {
    pub form_id: String,
    pub form_title: String,
    pub form_version: String,
    pub status: RenderStatus,
    pub progress: RenderProgress,
    pub help: Option<String>,
    pub section_number: Option<u32>,
    pub section_title: Option<String>,
    pub section_description: Option<String>,
    pub is_last: bool,
    pub fields: Vec<RenderField>,
    pub repeat: Option<RenderRepeat>,
}

fn render_field(wizard: &Wizard, question: &QuestionSpec, key: AnswerKey) -> RenderField {
    let widget = FieldWidget::for_question(question);
    RenderField {
        text: question.text.clone(),
        description: question.description.clone(),
        placeholder: question.placeholder.clone(),
        kind: question.kind,
        widget: widget.label(),
        required: question.is_required,
        header: question.is_header,
        options: widget.options().to_vec(),
        current_value: widget.read(wizard.store(), &key).cloned(),
        error: wizard.errors().get(&key).map(String::from),
        key,
    }
}

/// Build the renderer payload for the wizard's current section.
pub fn build_render_payload(wizard: &Wizard) -> RenderPayload {
    let schema = wizard.schema();
    let section = wizard.current_section();

    let mut fields = Vec::new();
    let mut repeat = None;
    if let Some(section) = section {
        for question in section.questions.iter().filter(|q| q.repeat_group().is_none()) {
            fields.push(render_field(wizard, question, AnswerKey::plain(question.id.as_str())));
        }
        if let Some(group_name) = section.repeat_group()
            && let Some(group) = wizard.groups().get(group_name)
        {
            let instances = group
                .instances
                .iter()
                .enumerate()
                .map(|(index, instance)| RenderInstance {
                    id: *instance,
                    position: index + 1,
                    collapsed: wizard.groups().is_collapsed(group_name, *instance),
                    fields: section
                        .questions
                        .iter()
                        .filter(|q| q.repeat_group() == Some(group_name))
                        .map(|q| {
                            render_field(wizard, q, AnswerKey::instanced(q.id.as_str(), *instance))
                        })
                        .collect(),
                })
                .collect();
            repeat = Some(RenderRepeat {
                group: group_name.to_string(),
                min: group.min,
                max: group.max,
                can_add: group.can_add(),
                can_remove: group.can_remove(),
                instances,
            });
        }
    }

    let has_errors = fields.iter().any(|field| field.error.is_some())
        || repeat.as_ref().is_some_and(|repeat| {
            repeat
                .instances
                .iter()
                .flat_map(|instance| instance.fields.iter())
                .any(|field| field.error.is_some())
        });
    let status = if wizard.status() == WizardStatus::Submitted {
        RenderStatus::Complete
    } else if has_errors {
        RenderStatus::Error
    } else {
        RenderStatus::NeedInput
    };

    RenderPayload {
        form_id: schema.id.clone(),
        form_title: schema.title.clone(),
        form_version: schema.version.clone(),
        status,
        progress: RenderProgress {
            current: wizard.current_index(),
            total: wizard.total_visible(),
        },
        help: schema.description.clone(),
        section_number: section.map(|section| section.number),
        section_title: section.map(|section| section.display_title()),
        section_description: section.and_then(|section| section.description.clone()),
        is_last: wizard.is_last(),
        fields,
        repeat,
    }
}

fn field_json(field: &RenderField) -> Value {
    let mut map = Map::new();
    map.insert("question".into(), Value::String(field.key.question.clone()));
    if let Some(instance) = field.key.instance {
        map.insert("instance".into(), json!(instance));
    }
    map.insert("text".into(), Value::String(field.text.clone()));
    map.insert(
        "description".into(),
        field
            .description
            .clone()
            .map(Value::String)
            .unwrap_or(Value::Null),
    );
    map.insert("type".into(), Value::String(field.kind.as_str().to_string()));
    map.insert("widget".into(), Value::String(field.widget.to_string()));
    map.insert("required".into(), Value::Bool(field.required));
    if field.header {
        map.insert("header".into(), Value::Bool(true));
    }
    if let Some(placeholder) = &field.placeholder {
        map.insert("placeholder".into(), Value::String(placeholder.clone()));
    }
    if !field.options.is_empty() {
        map.insert(
            "options".into(),
            Value::Array(
                field
                    .options
                    .iter()
                    .map(|option| Value::String(option.clone()))
                    .collect(),
            ),
        );
    }
    if let Some(value) = &field.current_value {
        map.insert("current_value".into(), json!(value));
    }
    if let Some(error) = &field.error {
        map.insert("error".into(), Value::String(error.clone()));
    }
    Value::Object(map)
}

/// Render the payload as a structured JSON-friendly value.
pub fn render_json_ui(payload: &RenderPayload) -> Value {
    let fields = payload.fields.iter().map(field_json).collect::<Vec<_>>();
    let repeat = payload.repeat.as_ref().map(|repeat| {
        let instances = repeat
            .instances
            .iter()
            .map(|instance| {
                let fields = instance.fields.iter().map(field_json).collect::<Vec<_>>();
                json!({
                    "id": instance.id,
                    "position": instance.position,
                    "collapsed": instance.collapsed,
                    "fields": fields,
                })
            })
            .collect::<Vec<_>>();
        json!({
            "group": repeat.group,
            "min": repeat.min,
            "max": repeat.max,
            "can_add": repeat.can_add,
            "can_remove": repeat.can_remove,
            "instances": instances,
        })
    });

    json!({
        "form_id": payload.form_id,
        "form_title": payload.form_title,
        "form_version": payload.form_version,
        "status": payload.status.as_str(),
        "progress": {
            "current": payload.progress.current,
            "total": payload.progress.total,
        },
        "help": payload.help,
        "section": {
            "number": payload.section_number,
            "title": payload.section_title,
            "description": payload.section_description,
            "is_last": payload.is_last,
        },
        "fields": fields,
        "repeat": repeat,
    })
}

fn field_line(field: &RenderField) -> String {
    if field.header {
        return format!("  == {} ==", field.text);
    }
    let mut entry = format!("  - {} [{}]", field.text, field.widget);
    if field.required {
        entry.push_str(" *");
    }
    if !field.options.is_empty() {
        entry.push_str(&format!(" ({})", field.options.join("/")));
    }
    if let Some(value) = &field.current_value {
        entry.push_str(&format!(" = {}", value.display()));
    }
    if let Some(error) = &field.error {
        entry.push_str(&format!("  ! {}", error));
    }
    entry
}

/// Render the payload as human-friendly text.
pub fn render_text(payload: &RenderPayload) -> String {
    let mut lines = Vec::new();
    lines.push(format!("Form: {} ({})", payload.form_title, payload.form_id));
    lines.push(format!(
        "Status: {} (section {}/{})",
        payload.status.as_str(),
        payload.progress.current,
        payload.progress.total
    ));
    if let Some(help) = &payload.help {
        lines.push(format!("Help: {}", help));
    }

    match &payload.section_title {
        Some(title) => lines.push(format!("Section: {}", title)),
        None => lines.push("No visible sections.".to_string()),
    }
    if let Some(description) = &payload.section_description {
        lines.push(format!("  {}", description));
    }
    for field in &payload.fields {
        lines.push(field_line(field));
    }

    if let Some(repeat) = &payload.repeat {
        lines.push(format!(
            "Repeatable '{}' ({} of {}..{})",
            repeat.group,
            repeat.instances.len(),
            repeat.min,
            repeat.max
        ));
        for instance in &repeat.instances {
            if instance.collapsed {
                lines.push(format!(" #{} (entry {}) [collapsed]", instance.position, instance.id));
                continue;
            }
            lines.push(format!(" #{} (entry {})", instance.position, instance.id));
            for field in &instance.fields {
                lines.push(format!("  {}", field_line(field)));
            }
        }
    }

    lines.join("\n")
}
