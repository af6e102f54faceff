use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::answers::{AnswerKey, AnswerStore, AnswerValue, FileAttachments, FileRef};
use crate::spec::question::{QuestionSpec, QuestionType};

/// Flavours of the single-line text input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextInput {
    Plain,
    Email,
    Phone,
    Number,
    Date,
}

// Compiled once per process.
static EMAIL: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok());
static PHONE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9][0-9 ().\-]{5,19}$").ok());
static NUMBER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^-?[0-9]+(\.[0-9]+)?$").ok());
static DATE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").ok());

impl TextInput {
    fn regex(&self) -> Option<&'static Regex> {
        match self {
            TextInput::Plain => None,
            TextInput::Email => EMAIL.as_ref(),
            TextInput::Phone => PHONE.as_ref(),
            TextInput::Number => NUMBER.as_ref(),
            TextInput::Date => DATE.as_ref(),
        }
    }
}

/// Input widget chosen from a question's declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldWidget {
    Text(TextInput),
    TextArea,
    Select { options: Vec<String> },
    Radio { options: Vec<String> },
    Checkbox { options: Vec<String> },
    MultiSelect { options: Vec<String> },
    File,
}

/// An edit coming from the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldInput {
    Text(String),
    /// Pick a single option.
    Choose(String),
    /// Flip one option in a multi-choice list.
    Toggle(String),
    /// Replace the whole multi-choice selection.
    Choices(Vec<String>),
    File(FileRef),
    Clear,
}

impl FieldInput {
    fn label(&self) -> &'static str {
        match self {
            FieldInput::Text(_) => "text",
            FieldInput::Choose(_) => "choose",
            FieldInput::Toggle(_) => "toggle",
            FieldInput::Choices(_) => "choices",
            FieldInput::File(_) => "file",
            FieldInput::Clear => "clear",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FieldError {
    #[error("'{option}' is not an option of this {widget}")]
    UnknownOption { widget: &'static str, option: String },
    #[error("{widget} fields do not accept {input} input")]
    Unsupported {
        widget: &'static str,
        input: &'static str,
    },
}

impl FieldWidget {
    pub fn for_question(question: &QuestionSpec) -> Self {
        let options = question.options.clone();
        match question.kind {
            QuestionType::Text => FieldWidget::Text(TextInput::Plain),
            QuestionType::Email => FieldWidget::Text(TextInput::Email),
            QuestionType::Phone => FieldWidget::Text(TextInput::Phone),
            QuestionType::Number => FieldWidget::Text(TextInput::Number),
            QuestionType::Date => FieldWidget::Text(TextInput::Date),
            QuestionType::Textarea => FieldWidget::TextArea,
            QuestionType::Select => FieldWidget::Select { options },
            QuestionType::Radio => FieldWidget::Radio { options },
            QuestionType::Checkbox => FieldWidget::Checkbox { options },
            QuestionType::Multiselect => FieldWidget::MultiSelect { options },
            QuestionType::File => FieldWidget::File,
        }
    }

    /// Widget name used by renderers.
    pub fn label(&self) -> &'static str {
        match self {
            FieldWidget::Text(_) => "text_input",
            FieldWidget::TextArea => "text_area",
            FieldWidget::Select { .. } => "select",
            FieldWidget::Radio { .. } => "radio_group",
            FieldWidget::Checkbox { .. } => "checkbox_group",
            FieldWidget::MultiSelect { .. } => "multi_select",
            FieldWidget::File => "file_picker",
        }
    }

    pub fn options(&self) -> &[String] {
        match self {
            FieldWidget::Select { options }
            | FieldWidget::Radio { options }
            | FieldWidget::Checkbox { options }
            | FieldWidget::MultiSelect { options } => options,
            _ => &[],
        }
    }

    pub fn is_multi(&self) -> bool {
        matches!(
            self,
            FieldWidget::Checkbox { .. } | FieldWidget::MultiSelect { .. }
        )
    }

    pub fn read<'a>(&self, store: &'a AnswerStore, key: &AnswerKey) -> Option<&'a AnswerValue> {
        store.get(key)
    }

    /// Multi-choice widgets need at least one selection; everything else a
    /// non-empty string.
    pub fn is_filled(&self, value: Option<&AnswerValue>) -> bool {
        match value {
            None => false,
            Some(AnswerValue::List(items)) => !items.is_empty(),
            Some(AnswerValue::Text(text)) => !self.is_multi() && !text.is_empty(),
        }
    }

    /// Whether a filled value has the shape the widget expects.
    pub fn check_format(&self, value: &AnswerValue) -> bool {
        match (self, value) {
            (FieldWidget::Text(input), AnswerValue::Text(text)) => input
                .regex()
                .is_none_or(|regex| regex.is_match(text.trim())),
            (FieldWidget::Select { options } | FieldWidget::Radio { options }, AnswerValue::Text(text)) => {
                options.contains(text)
            }
            (
                FieldWidget::Checkbox { options } | FieldWidget::MultiSelect { options },
                AnswerValue::List(items),
            ) => items.iter().all(|item| options.contains(item)),
            (FieldWidget::TextArea | FieldWidget::File, AnswerValue::Text(_)) => true,
            _ => false,
        }
    }

    /// Applies an edit to the store. File edits return the handle the
    /// upload collaborator must receive.
    pub fn write(
        &self,
        store: &mut AnswerStore,
        files: &mut FileAttachments,
        key: &AnswerKey,
        input: FieldInput,
    ) -> Result<Option<FileRef>, FieldError> {
        match (self, input) {
            (_, FieldInput::Clear) => {
                store.remove(key);
                files.remove(key);
                Ok(None)
            }
            (FieldWidget::Text(_) | FieldWidget::TextArea, FieldInput::Text(text)) => {
                store.set(key.clone(), text);
                Ok(None)
            }
            (
                FieldWidget::Select { options } | FieldWidget::Radio { options },
                FieldInput::Choose(option) | FieldInput::Text(option),
            ) => {
                self.ensure_option(options, &option)?;
                store.set(key.clone(), option);
                Ok(None)
            }
            (
                FieldWidget::Checkbox { options } | FieldWidget::MultiSelect { options },
                FieldInput::Toggle(option),
            ) => {
                self.ensure_option(options, &option)?;
                let mut selected = store
                    .get(key)
                    .and_then(AnswerValue::as_list)
                    .map(<[String]>::to_vec)
                    .unwrap_or_default();
                if selected.contains(&option) {
                    selected.retain(|item| *item != option);
                } else {
                    selected.push(option);
                }
                store.set(key.clone(), in_option_order(options, &selected));
                Ok(None)
            }
            (
                FieldWidget::Checkbox { options } | FieldWidget::MultiSelect { options },
                FieldInput::Choices(choices),
            ) => {
                for choice in &choices {
                    self.ensure_option(options, choice)?;
                }
                store.set(key.clone(), in_option_order(options, &choices));
                Ok(None)
            }
            (FieldWidget::File, FieldInput::File(file)) => {
                store.set(key.clone(), file.name.clone());
                files.insert(key.clone(), file.clone());
                Ok(Some(file))
            }
            (widget, input) => Err(FieldError::Unsupported {
                widget: widget.label(),
                input: input.label(),
            }),
        }
    }

    fn ensure_option(&self, options: &[String], option: &str) -> Result<(), FieldError> {
        if options.iter().any(|candidate| candidate == option) {
            Ok(())
        } else {
            Err(FieldError::UnknownOption {
                widget: self.label(),
                option: option.to_string(),
            })
        }
    }
}

fn in_option_order(options: &[String], selected: &[String]) -> Vec<String> {
    options
        .iter()
        .filter(|option| selected.contains(option))
        .cloned()
        .collect()
}
