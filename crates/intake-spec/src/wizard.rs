use std::collections::BTreeSet;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::answers::{
    AnswerKey, AnswerStore, AnswerValue, FileAttachments, FileRef, InstanceId, ValidationErrors,
};
use crate::field::{FieldError, FieldInput, FieldWidget};
use crate::repeat::RepeatGroups;
use crate::sections::{Section, SectionMap, group_sections};
use crate::spec::form::{FormSchema, SchemaError};
use crate::spec::question::QuestionSpec;
use crate::submission::{FormCallbacks, SubmissionPayload};
use crate::validate::{self, ValidationContext};
use crate::visibility::visible_sections;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStatus {
    Editing,
    /// The submit callback fired; the form accepts no further transitions.
    Submitted,
}

/// Outcome of a navigation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Now positioned on this section number.
    Moved(u32),
    /// The section failed validation; `errors` entries were recorded.
    Blocked { errors: usize },
    /// The submit callback received the payload.
    Submitted,
    /// Ignored because the form was already submitted.
    Finished,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WizardError {
    #[error("no question with id '{0}'")]
    UnknownQuestion(String),
    #[error("answer key '{0}' does not match the question's repeat group")]
    InstanceMismatch(AnswerKey),
    #[error(transparent)]
    Field(#[from] FieldError),
}

/// Section-by-section controller owning all mutable form state.
#[derive(Debug, Clone)]
pub struct Wizard {
    schema: FormSchema,
    sections: SectionMap,
    store: AnswerStore,
    files: FileAttachments,
    groups: RepeatGroups,
    errors: ValidationErrors,
    visible: Vec<u32>,
    /// 1-based position in `visible`; 0 only when nothing is visible.
    current: usize,
    status: WizardStatus,
}

impl Wizard {
    /// Loads a schema and pre-populates answers. Instances referenced by
    /// instanced keys in `initial` are recreated.
    pub fn new(schema: FormSchema, initial: AnswerStore) -> Result<Self, SchemaError> {
        schema.check()?;
        let sections = group_sections(&schema.questions);
        let mut groups = RepeatGroups::default();
        for question in &schema.questions {
            groups.initialize(question);
        }

        let mut wizard = Self {
            schema,
            sections,
            store: initial,
            files: FileAttachments::default(),
            groups,
            errors: ValidationErrors::default(),
            visible: Vec::new(),
            current: 1,
            status: WizardStatus::Editing,
        };
        wizard.restore_instances(0);
        wizard.adopt_plain_answers();
        wizard.refresh();
        debug!(
            form = %wizard.schema.id,
            sections = wizard.sections.len(),
            visible = wizard.visible.len(),
            "wizard loaded"
        );
        Ok(wizard)
    }

    /// Rebuilds a wizard from a saved draft, including instance lists,
    /// attachments and the section the user was on.
    pub fn resume(schema: FormSchema, draft: SubmissionPayload) -> Result<Self, SchemaError> {
        let mut wizard = Self::new(schema, draft.form_data)?;
        for (group, saved) in &draft.repeatable_sections {
            let ids: BTreeSet<InstanceId> = saved.instances.iter().copied().collect();
            wizard.groups.restore(group, &ids, saved.next_instance);
        }
        wizard.files = draft.files;
        wizard.drop_orphaned_answers();
        wizard.refresh();
        if let Some(number) = draft.current_section
            && let Some(position) = wizard.visible.iter().position(|n| *n == number)
        {
            wizard.current = position + 1;
        }
        Ok(wizard)
    }

    fn restore_instances(&mut self, next_floor: InstanceId) {
        let names: Vec<String> = self.groups.groups().keys().cloned().collect();
        for group in names {
            let Some(members) = self.groups.members(&group) else {
                continue;
            };
            let observed: BTreeSet<InstanceId> = self
                .store
                .keys()
                .filter(|key| members.contains(&key.question))
                .filter_map(|key| key.instance)
                .collect();
            if !observed.is_empty() {
                self.groups.restore(&group, &observed, next_floor);
            }
        }
        self.drop_orphaned_answers();
    }

    /// Moves plain-key answers of repeatable questions (flat prefill) onto
    /// the group's first instance. An existing instanced answer wins.
    fn adopt_plain_answers(&mut self) {
        let groups = &self.groups;
        let moves: Vec<(AnswerKey, Option<AnswerKey>)> = self
            .store
            .keys()
            .chain(self.files.iter().map(|(key, _)| key))
            .filter(|key| key.instance.is_none())
            .filter_map(|key| {
                let group = groups.group_of(&key.question)?;
                let target = groups
                    .instances(group)
                    .first()
                    .map(|instance| AnswerKey::instanced(key.question.as_str(), *instance));
                Some((key.clone(), target))
            })
            .collect();

        for (plain, target) in moves {
            let value = self.store.remove(&plain);
            let file = self.files.remove(&plain);
            let Some(target) = target else {
                continue;
            };
            if let Some(value) = value
                && !self.store.contains(&target)
            {
                self.store.set(target.clone(), value);
            }
            if let Some(file) = file
                && self.files.get(&target).is_none()
            {
                self.files.insert(target.clone(), file);
            }
            debug!(from = %plain, to = %target, "moved plain answer onto first instance");
        }
    }

    /// Removes instanced answers whose instance is no longer tracked, and
    /// instanced answers of questions that do not repeat.
    fn drop_orphaned_answers(&mut self) {
        let groups = &self.groups;
        let orphaned = |key: &AnswerKey| match (key.instance, groups.group_of(&key.question)) {
            (Some(instance), Some(group)) => !groups.instances(group).contains(&instance),
            (Some(_), None) => true,
            (None, _) => false,
        };
        self.store.purge(orphaned);
        self.files.purge(orphaned);
    }

    /// Re-resolves visibility and pulls the position back into range.
    fn refresh(&mut self) {
        self.visible = visible_sections(&self.sections, &self.store);
        let total = self.visible.len();
        let clamped = if total == 0 { 0 } else { self.current.clamp(1, total) };
        if clamped != self.current {
            debug!(from = self.current, to = clamped, total, "re-clamped section index");
        }
        self.current = clamped;
    }

    fn editable(&self, action: &str) -> bool {
        if self.status == WizardStatus::Submitted {
            warn!(action, form = %self.schema.id, "form already submitted; ignoring");
            return false;
        }
        true
    }

    fn context(&self) -> ValidationContext<'_> {
        ValidationContext {
            sections: &self.sections,
            store: &self.store,
            groups: &self.groups,
            settings: &self.schema.settings,
        }
    }

    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    pub fn sections(&self) -> &SectionMap {
        &self.sections
    }

    pub fn store(&self) -> &AnswerStore {
        &self.store
    }

    pub fn files(&self) -> &FileAttachments {
        &self.files
    }

    pub fn groups(&self) -> &RepeatGroups {
        &self.groups
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    pub fn status(&self) -> WizardStatus {
        self.status
    }

    /// Section numbers currently shown, ascending.
    pub fn visible_sections(&self) -> &[u32] {
        &self.visible
    }

    /// 1-based index into the visible list.
    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn total_visible(&self) -> usize {
        self.visible.len()
    }

    pub fn current_section_number(&self) -> Option<u32> {
        self.current
            .checked_sub(1)
            .and_then(|index| self.visible.get(index))
            .copied()
    }

    pub fn current_section(&self) -> Option<&Section> {
        self.current_section_number()
            .and_then(|number| self.sections.get(number))
    }

    pub fn is_last(&self) -> bool {
        self.current >= self.visible.len()
    }

    pub fn answer(&self, key: &AnswerKey) -> Option<&AnswerValue> {
        self.store.get(key)
    }

    fn question_for(&self, key: &AnswerKey) -> Result<&QuestionSpec, WizardError> {
        let question = self
            .schema
            .question(&key.question)
            .ok_or_else(|| WizardError::UnknownQuestion(key.question.clone()))?;
        let matches = match (question.repeat_group(), key.instance) {
            (Some(group), Some(instance)) => self.groups.instances(group).contains(&instance),
            (None, None) => true,
            _ => false,
        };
        if matches {
            Ok(question)
        } else {
            Err(WizardError::InstanceMismatch(key.clone()))
        }
    }

    /// Routes an edit through the question's widget. File edits return
    /// the handle for the upload collaborator.
    pub fn apply_input(
        &mut self,
        key: &AnswerKey,
        input: FieldInput,
    ) -> Result<Option<FileRef>, WizardError> {
        if !self.editable("apply_input") {
            return Ok(None);
        }
        let widget = FieldWidget::for_question(self.question_for(key)?);
        let handed = widget.write(&mut self.store, &mut self.files, key, input)?;
        self.refresh();
        Ok(handed)
    }

    /// Shorthand for typed text or a single choice.
    pub fn set_answer(&mut self, key: &AnswerKey, text: impl Into<String>) -> Result<(), WizardError> {
        let text = text.into();
        let input = if self.question_for(key)?.kind.is_choice() {
            FieldInput::Choose(text)
        } else {
            FieldInput::Text(text)
        };
        self.apply_input(key, input).map(|_| ())
    }

    pub fn clear_answer(&mut self, key: &AnswerKey) -> Result<(), WizardError> {
        self.apply_input(key, FieldInput::Clear).map(|_| ())
    }

    /// Stores the file's display name and hands its handle to the upload
    /// collaborator.
    pub fn attach_file<C>(
        &mut self,
        key: &AnswerKey,
        file: FileRef,
        callbacks: &mut C,
    ) -> Result<(), WizardError>
    where
        C: FormCallbacks + ?Sized,
    {
        if let Some(handed) = self.apply_input(key, FieldInput::File(file))? {
            callbacks.on_file_selected(key, &handed);
        }
        Ok(())
    }

    pub fn add_instance(&mut self, group: &str) -> bool {
        if !self.editable("add_instance") {
            return false;
        }
        let added = self.groups.add(group);
        self.refresh();
        added
    }

    pub fn remove_instance(&mut self, group: &str, instance: InstanceId) -> bool {
        if !self.editable("remove_instance") {
            return false;
        }
        let removed = self
            .groups
            .remove(group, instance, &mut self.store, &mut self.files);
        self.refresh();
        removed
    }

    pub fn toggle_collapsed(&mut self, group: &str, instance: InstanceId) -> bool {
        if !self.editable("toggle_collapsed") {
            return false;
        }
        self.groups.toggle_collapsed(group, instance)
    }

    /// Validates one section and replaces the error set with the result.
    pub fn validate_section(&mut self, number: u32) -> bool {
        self.errors = validate::validate_section(self.context(), number);
        self.errors.is_empty()
    }

    /// Validates every visible section and replaces the error set.
    pub fn validate_all(&mut self) -> bool {
        self.errors = validate::validate_visible(self.context());
        self.errors.is_empty()
    }

    /// Validates the current section and moves forward; on the last
    /// visible section this submits instead.
    pub fn next<C>(&mut self, callbacks: &mut C) -> Step
    where
        C: FormCallbacks + ?Sized,
    {
        if !self.editable("next") {
            return Step::Finished;
        }
        self.refresh();
        if self.is_last() {
            return self.submit(callbacks);
        }
        let Some(number) = self.current_section_number() else {
            return self.submit(callbacks);
        };
        if !self.validate_section(number) {
            debug!(section = number, errors = self.errors.len(), "next blocked");
            return Step::Blocked {
                errors: self.errors.len(),
            };
        }
        self.current = (self.current + 1).min(self.visible.len());
        let moved_to = self.current_section_number().unwrap_or(number);
        debug!(from = number, to = moved_to, "advanced");
        Step::Moved(moved_to)
    }

    /// Moves back one section without validating.
    pub fn back(&mut self) -> Step {
        if !self.editable("back") {
            return Step::Finished;
        }
        self.refresh();
        if self.current > 1 {
            self.current -= 1;
        }
        match self.current_section_number() {
            Some(number) => {
                debug!(to = number, "went back");
                Step::Moved(number)
            }
            None => Step::Moved(0),
        }
    }

    /// Validates the final visible section and, on success, emits the
    /// payload once. The wizard is terminal afterwards.
    pub fn submit<C>(&mut self, callbacks: &mut C) -> Step
    where
        C: FormCallbacks + ?Sized,
    {
        if !self.editable("submit") {
            return Step::Finished;
        }
        self.refresh();
        if let Some(last) = self.visible.last().copied()
            && !self.validate_section(last)
        {
            debug!(section = last, errors = self.errors.len(), "submit blocked");
            return Step::Blocked {
                errors: self.errors.len(),
            };
        }
        self.errors = ValidationErrors::default();
        self.status = WizardStatus::Submitted;
        let payload = self.payload();
        info!(
            form = %self.schema.id,
            answers = payload.form_data.len(),
            files = payload.files.len(),
            "form submitted"
        );
        callbacks.on_submit(payload);
        Step::Submitted
    }

    /// Emits the current state without validating. Allowed in any state.
    pub fn save_draft<C>(&self, callbacks: &mut C)
    where
        C: FormCallbacks + ?Sized,
    {
        let mut payload = self.payload();
        payload.current_section = self.current_section_number();
        debug!(form = %self.schema.id, section = ?payload.current_section, "draft saved");
        callbacks.on_save_draft(payload);
    }

    pub fn payload(&self) -> SubmissionPayload {
        SubmissionPayload {
            form_id: self.schema.id.clone(),
            form_data: self.store.clone(),
            files: self.files.clone(),
            repeatable_sections: self.groups.groups().clone(),
            current_section: None,
        }
    }
}
