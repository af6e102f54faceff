use handlebars::Handlebars;
use serde_json::json;

use crate::answers::{AnswerKey, AnswerStore, IssueKind, ValidationErrors};
use crate::field::FieldWidget;
use crate::repeat::RepeatGroups;
use crate::sections::{Section, SectionMap};
use crate::spec::form::FormSettings;
use crate::spec::question::QuestionSpec;
use crate::visibility::is_section_visible;

/// Read-only view of the form state needed to validate it.
#[derive(Clone, Copy)]
pub struct ValidationContext<'a> {
    pub sections: &'a SectionMap,
    pub store: &'a AnswerStore,
    pub groups: &'a RepeatGroups,
    pub settings: &'a FormSettings,
}

/// Keys a question answers under: one per instance for repeatable
/// questions, the bare id otherwise.
pub fn answer_keys(question: &QuestionSpec, groups: &RepeatGroups) -> Vec<AnswerKey> {
    match question.repeat_group() {
        Some(group) => groups
            .instances(group)
            .iter()
            .map(|instance| AnswerKey::instanced(question.id.as_str(), *instance))
            .collect(),
        None => vec![AnswerKey::plain(question.id.as_str())],
    }
}

/// Checks one section. Hidden or unknown sections pass trivially.
pub fn validate_section(ctx: ValidationContext<'_>, number: u32) -> ValidationErrors {
    let mut errors = ValidationErrors::default();
    let Some(section) = ctx.sections.get(number) else {
        return errors;
    };
    if !is_section_visible(section, ctx.sections, ctx.store) {
        return errors;
    }
    let messages = MessageRenderer::new(ctx.settings);
    check_section(ctx, section, &messages, &mut errors);
    errors
}

/// Checks every visible section at once.
pub fn validate_visible(ctx: ValidationContext<'_>) -> ValidationErrors {
    let mut errors = ValidationErrors::default();
    let messages = MessageRenderer::new(ctx.settings);
    for section in ctx.sections.iter() {
        if is_section_visible(section, ctx.sections, ctx.store) {
            check_section(ctx, section, &messages, &mut errors);
        }
    }
    errors
}

fn check_section(
    ctx: ValidationContext<'_>,
    section: &Section,
    messages: &MessageRenderer<'_>,
    errors: &mut ValidationErrors,
) {
    for question in section.questions.iter().filter(|question| !question.is_header) {
        let widget = FieldWidget::for_question(question);
        for key in answer_keys(question, ctx.groups) {
            let value = widget.read(ctx.store, &key);
            if !widget.is_filled(value) {
                if question.is_required {
                    let message = messages.required(question, &key);
                    errors.insert(key, IssueKind::MissingRequired, message);
                }
                continue;
            }
            if ctx.settings.strict_formats
                && let Some(value) = value
                && !widget.check_format(value)
            {
                let message = format!("{} must be a valid {}", question.text, question.kind.as_str());
                errors.insert(key, IssueKind::InvalidFormat, message);
            }
        }
    }
}

struct MessageRenderer<'a> {
    registry: Handlebars<'static>,
    template: &'a str,
}

impl<'a> MessageRenderer<'a> {
    fn new(settings: &'a FormSettings) -> Self {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);
        Self {
            registry,
            template: &settings.required_message,
        }
    }

    fn required(&self, question: &QuestionSpec, key: &AnswerKey) -> String {
        let data = json!({
            "id": question.id,
            "text": question.text,
            "instance": key.instance,
        });
        self.registry
            .render_template(self.template, &data)
            .unwrap_or_else(|_| format!("{} is required", question.text))
    }
}
