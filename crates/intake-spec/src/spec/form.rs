use std::collections::{BTreeMap, BTreeSet};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::spec::question::QuestionSpec;

/// Per-form behaviour switches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FormSettings {
    /// Reject malformed email/phone/number/date answers during validation.
    #[serde(default)]
    pub strict_formats: bool,
    /// Handlebars template for missing required answers. `text` and `id` are in scope.
    #[serde(default = "default_required_message")]
    pub required_message: String,
}

fn default_required_message() -> String {
    "{{text}} is required".to_string()
}

impl Default for FormSettings {
    fn default() -> Self {
        Self {
            strict_formats: false,
            required_message: default_required_message(),
        }
    }
}

/// Top-level intake form definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FormSchema {
    pub id: String,
    pub title: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub settings: FormSettings,
    pub questions: Vec<QuestionSpec>,
}

fn default_version() -> String {
    "1".to_string()
}

/// Malformed schemas are rejected when a form is loaded.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("question at position {0} has an empty id")]
    EmptyId(usize),
    #[error("question id '{0}' is declared more than once")]
    DuplicateId(String),
    #[error("question '{0}' uses section number 0; sections start at 1")]
    ZeroSection(String),
    #[error("question '{0}' is repeatable but names no section group")]
    MissingGroup(String),
    #[error("question '{id}' allows at most {max} repeats but requires {min}")]
    InvertedBounds { id: String, min: u32, max: u32 },
    #[error("question '{0}' allows zero repeats")]
    ZeroMaxRepeats(String),
    #[error("group '{group}' declares bounds {first:?} and {second:?}")]
    ConflictingBounds {
        group: String,
        first: (u32, u32),
        second: (u32, u32),
    },
    #[error("section {section} mixes repeatable groups '{first}' and '{second}'")]
    MixedGroups {
        section: u32,
        first: String,
        second: String,
    },
    #[error("choice question '{0}' has no options")]
    MissingOptions(String),
}

impl FormSchema {
    /// Checks the invariants the engine relies on.
    pub fn check(&self) -> Result<(), SchemaError> {
        let mut seen = BTreeSet::new();
        let mut bounds: BTreeMap<&str, (u32, u32)> = BTreeMap::new();
        let mut section_groups: BTreeMap<u32, &str> = BTreeMap::new();

        for (position, question) in self.questions.iter().enumerate() {
            if question.id.trim().is_empty() {
                return Err(SchemaError::EmptyId(position));
            }
            if !seen.insert(question.id.as_str()) {
                return Err(SchemaError::DuplicateId(question.id.clone()));
            }
            if question.section_number == 0 {
                return Err(SchemaError::ZeroSection(question.id.clone()));
            }
            if question.kind.is_choice() && question.options.is_empty() && !question.is_header {
                return Err(SchemaError::MissingOptions(question.id.clone()));
            }
            if !question.is_section_repeatable {
                continue;
            }
            let Some(group) = question.repeat_group() else {
                return Err(SchemaError::MissingGroup(question.id.clone()));
            };
            if question.max_repeats == 0 {
                return Err(SchemaError::ZeroMaxRepeats(question.id.clone()));
            }
            if question.min_repeats > question.max_repeats {
                return Err(SchemaError::InvertedBounds {
                    id: question.id.clone(),
                    min: question.min_repeats,
                    max: question.max_repeats,
                });
            }
            match section_groups.get(&question.section_number) {
                Some(first) if *first != group => {
                    return Err(SchemaError::MixedGroups {
                        section: question.section_number,
                        first: first.to_string(),
                        second: group.to_string(),
                    });
                }
                Some(_) => {}
                None => {
                    section_groups.insert(question.section_number, group);
                }
            }
            let declared = (question.min_repeats, question.max_repeats);
            match bounds.get(group) {
                Some(first) if *first != declared => {
                    return Err(SchemaError::ConflictingBounds {
                        group: group.to_string(),
                        first: *first,
                        second: declared,
                    });
                }
                Some(_) => {}
                None => {
                    bounds.insert(group, declared);
                }
            }
        }

        Ok(())
    }

    pub fn question(&self, id: &str) -> Option<&QuestionSpec> {
        self.questions.iter().find(|question| question.id == id)
    }
}
