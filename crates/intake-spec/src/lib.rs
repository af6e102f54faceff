#![allow(missing_docs)]

pub mod answers;
pub mod field;
pub mod render;
pub mod repeat;
pub mod sections;
pub mod spec;
pub mod submission;
pub mod validate;
pub mod visibility;
pub mod wizard;

pub use answers::{
    AnswerEntry, AnswerKey, AnswerStore, AnswerValue, FileAttachments, FileRef, InstanceId,
    IssueKind, ValidationError, ValidationErrors,
};
pub use field::{FieldError, FieldInput, FieldWidget, TextInput};
pub use render::{
    RenderField, RenderInstance, RenderPayload, RenderProgress, RenderRepeat, RenderStatus,
    build_render_payload, render_json_ui, render_text,
};
pub use repeat::{RepeatGroups, RepeatableGroup};
pub use sections::{Section, SectionMap, group_sections};
pub use spec::{ConditionalRule, FormSchema, FormSettings, QuestionSpec, QuestionType, SchemaError};
pub use submission::{FormCallbacks, SubmissionPayload};
pub use validate::{ValidationContext, validate_section, validate_visible};
pub use visibility::{
    VisibilityMap, evaluate_condition, find_condition_source, resolve_visibility,
    visible_sections,
};
pub use wizard::{Step, Wizard, WizardError, WizardStatus};
