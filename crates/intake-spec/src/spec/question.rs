use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Input kinds a question can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    #[default]
    Text,
    Email,
    Phone,
    Number,
    Textarea,
    Date,
    Select,
    Radio,
    Checkbox,
    Multiselect,
    File,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Text => "text",
            QuestionType::Email => "email",
            QuestionType::Phone => "phone",
            QuestionType::Number => "number",
            QuestionType::Textarea => "textarea",
            QuestionType::Date => "date",
            QuestionType::Select => "select",
            QuestionType::Radio => "radio",
            QuestionType::Checkbox => "checkbox",
            QuestionType::Multiselect => "multiselect",
            QuestionType::File => "file",
        }
    }

    /// Types whose answer is picked from `options`.
    pub fn is_choice(&self) -> bool {
        matches!(
            self,
            QuestionType::Select
                | QuestionType::Radio
                | QuestionType::Checkbox
                | QuestionType::Multiselect
        )
    }

    /// Types whose answer is a list of selected options.
    pub fn is_multi(&self) -> bool {
        matches!(self, QuestionType::Checkbox | QuestionType::Multiselect)
    }
}

/// Section-level visibility rule: the section shows only when the question
/// whose display text is `question_text` was answered with `value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionalRule {
    pub question_text: String,
    pub value: String,
}

/// A single schema question as delivered by the forms backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QuestionSpec {
    pub id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: QuestionType,
    #[serde(default = "default_section_number")]
    pub section_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_description: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub section_group: String,
    #[serde(default)]
    pub is_section_repeatable: bool,
    #[serde(default = "default_min_repeats")]
    pub min_repeats: u32,
    #[serde(default = "default_max_repeats")]
    pub max_repeats: u32,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    /// Non-interactive header row; never validated.
    #[serde(default)]
    pub is_header: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditional_question_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditional_value: Option<String>,
}

fn default_section_number() -> u32 {
    1
}

fn default_min_repeats() -> u32 {
    1
}

fn default_max_repeats() -> u32 {
    10
}

impl QuestionSpec {
    /// Builds a plain question in section 1 with schema defaults.
    pub fn new(id: impl Into<String>, text: impl Into<String>, kind: QuestionType) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            description: None,
            placeholder: None,
            kind,
            section_number: default_section_number(),
            section_title: None,
            section_description: None,
            section_group: String::new(),
            is_section_repeatable: false,
            min_repeats: default_min_repeats(),
            max_repeats: default_max_repeats(),
            is_required: false,
            options: Vec::new(),
            is_header: false,
            conditional_question_text: None,
            conditional_value: None,
        }
    }

    pub fn in_section(mut self, number: u32) -> Self {
        self.section_number = number;
        self
    }

    pub fn required(mut self) -> Self {
        self.is_required = true;
        self
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    pub fn repeatable(mut self, group: impl Into<String>, min: u32, max: u32) -> Self {
        self.is_section_repeatable = true;
        self.section_group = group.into();
        self.min_repeats = min;
        self.max_repeats = max;
        self
    }

    pub fn shown_when(mut self, question_text: impl Into<String>, value: impl Into<String>) -> Self {
        self.conditional_question_text = Some(question_text.into());
        self.conditional_value = Some(value.into());
        self
    }

    /// The conditional rule, if both halves are present and non-empty.
    pub fn conditional_rule(&self) -> Option<ConditionalRule> {
        match (&self.conditional_question_text, &self.conditional_value) {
            (Some(text), Some(value)) if !text.trim().is_empty() => Some(ConditionalRule {
                question_text: text.clone(),
                value: value.clone(),
            }),
            _ => None,
        }
    }

    /// Group name for repeatable questions.
    pub fn repeat_group(&self) -> Option<&str> {
        if self.is_section_repeatable && !self.section_group.is_empty() {
            Some(self.section_group.as_str())
        } else {
            None
        }
    }
}
