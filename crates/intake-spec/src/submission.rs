use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::answers::{AnswerKey, AnswerStore, FileAttachments, FileRef};
use crate::repeat::RepeatableGroup;

/// Snapshot handed to the submit and draft collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionPayload {
    pub form_id: String,
    pub form_data: AnswerStore,
    #[serde(default)]
    pub files: FileAttachments,
    #[serde(default)]
    pub repeatable_sections: BTreeMap<String, RepeatableGroup>,
    /// Section number the user was on; drafts only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_section: Option<u32>,
}

impl SubmissionPayload {
    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_cbor(&self) -> Result<Vec<u8>, serde_cbor::Error> {
        serde_cbor::to_vec(self)
    }

    pub fn from_cbor(bytes: &[u8]) -> Result<Self, serde_cbor::Error> {
        serde_cbor::from_slice(bytes)
    }
}

/// Collaborator receiving the form's terminal and intermediate snapshots.
pub trait FormCallbacks {
    /// Called at most once per successful final-section validation.
    fn on_submit(&mut self, payload: SubmissionPayload);

    fn on_save_draft(&mut self, _payload: SubmissionPayload) {}

    /// Receives the raw handle of a picked file, keyed like its answer.
    fn on_file_selected(&mut self, _key: &AnswerKey, _file: &FileRef) {}
}
