use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Identifier of one repetition inside a repeatable group.
pub type InstanceId = u32;

/// Composite identity of an answer: the question plus, for repeatable
/// sections, the instance it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AnswerKey {
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<InstanceId>,
}

impl AnswerKey {
    pub fn plain(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            instance: None,
        }
    }

    pub fn instanced(question: impl Into<String>, instance: InstanceId) -> Self {
        Self {
            question: question.into(),
            instance: Some(instance),
        }
    }
}

impl fmt::Display for AnswerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.instance {
            Some(instance) => write!(f, "{}#{}", self.question, instance),
            None => f.write_str(&self.question),
        }
    }
}

/// A stored answer. File questions keep only their display name here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Text(String),
    List(Vec<String>),
}

impl AnswerValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AnswerValue::Text(text) => Some(text),
            AnswerValue::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            AnswerValue::List(items) => Some(items),
            AnswerValue::Text(_) => None,
        }
    }

    /// Lists need one element, text needs a non-empty string.
    pub fn is_filled(&self) -> bool {
        match self {
            AnswerValue::Text(text) => !text.is_empty(),
            AnswerValue::List(items) => !items.is_empty(),
        }
    }

    pub fn display(&self) -> String {
        match self {
            AnswerValue::Text(text) => text.clone(),
            AnswerValue::List(items) => items.join(", "),
        }
    }
}

impl From<&str> for AnswerValue {
    fn from(value: &str) -> Self {
        AnswerValue::Text(value.to_string())
    }
}

impl From<String> for AnswerValue {
    fn from(value: String) -> Self {
        AnswerValue::Text(value)
    }
}

impl From<Vec<String>> for AnswerValue {
    fn from(value: Vec<String>) -> Self {
        AnswerValue::List(value)
    }
}

/// One serialized store row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerEntry {
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<InstanceId>,
    pub value: AnswerValue,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoreRepr {
    Entries(Vec<AnswerEntry>),
    Flat(BTreeMap<String, AnswerValue>),
}

/// All collected answers, keyed by [`AnswerKey`].
///
/// Serializes as a list of `{question, instance?, value}` rows. Prefill data
/// may also arrive as a flat `{question_id: value}` object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(into = "Vec<AnswerEntry>")]
pub struct AnswerStore {
    values: BTreeMap<AnswerKey, AnswerValue>,
}

impl<'de> Deserialize<'de> for AnswerStore {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let mut store = AnswerStore::default();
        match StoreRepr::deserialize(deserializer)? {
            StoreRepr::Entries(entries) => {
                for entry in entries {
                    store.values.insert(
                        AnswerKey {
                            question: entry.question,
                            instance: entry.instance,
                        },
                        entry.value,
                    );
                }
            }
            StoreRepr::Flat(map) => {
                for (question, value) in map {
                    store.values.insert(AnswerKey::plain(question), value);
                }
            }
        }
        Ok(store)
    }
}

impl From<AnswerStore> for Vec<AnswerEntry> {
    fn from(store: AnswerStore) -> Self {
        store
            .values
            .into_iter()
            .map(|(key, value)| AnswerEntry {
                question: key.question,
                instance: key.instance,
                value,
            })
            .collect()
    }
}

impl AnswerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &AnswerKey) -> Option<&AnswerValue> {
        self.values.get(key)
    }

    pub fn set(&mut self, key: AnswerKey, value: impl Into<AnswerValue>) {
        self.values.insert(key, value.into());
    }

    pub fn remove(&mut self, key: &AnswerKey) -> Option<AnswerValue> {
        self.values.remove(key)
    }

    pub fn contains(&self, key: &AnswerKey) -> bool {
        self.values.contains_key(key)
    }

    pub fn is_filled(&self, key: &AnswerKey) -> bool {
        self.get(key).is_some_and(AnswerValue::is_filled)
    }

    /// Drops every entry for which `remove` returns true.
    pub fn purge<F>(&mut self, mut remove: F) -> usize
    where
        F: FnMut(&AnswerKey) -> bool,
    {
        let before = self.values.len();
        self.values.retain(|key, _| !remove(key));
        before - self.values.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &AnswerKey> {
        self.values.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AnswerKey, &AnswerValue)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Handle to a file picked for a `file` question. The engine never reads
/// the file; `handle` is whatever the upload collaborator needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    pub name: String,
    pub handle: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl FileRef {
    pub fn new(name: impl Into<String>, handle: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handle: handle.into(),
            content_type: None,
            size: None,
        }
    }
}

/// One serialized attachment row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<InstanceId>,
    pub file: FileRef,
}

/// File handles keyed like the answer store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<FileEntry>", into = "Vec<FileEntry>")]
pub struct FileAttachments {
    files: BTreeMap<AnswerKey, FileRef>,
}

impl From<Vec<FileEntry>> for FileAttachments {
    fn from(entries: Vec<FileEntry>) -> Self {
        let files = entries
            .into_iter()
            .map(|entry| {
                (
                    AnswerKey {
                        question: entry.question,
                        instance: entry.instance,
                    },
                    entry.file,
                )
            })
            .collect();
        Self { files }
    }
}

impl From<FileAttachments> for Vec<FileEntry> {
    fn from(attachments: FileAttachments) -> Self {
        attachments
            .files
            .into_iter()
            .map(|(key, file)| FileEntry {
                question: key.question,
                instance: key.instance,
                file,
            })
            .collect()
    }
}

impl FileAttachments {
    pub fn get(&self, key: &AnswerKey) -> Option<&FileRef> {
        self.files.get(key)
    }

    pub fn insert(&mut self, key: AnswerKey, file: FileRef) {
        self.files.insert(key, file);
    }

    pub fn remove(&mut self, key: &AnswerKey) -> Option<FileRef> {
        self.files.remove(key)
    }

    pub fn purge<F>(&mut self, mut remove: F)
    where
        F: FnMut(&AnswerKey) -> bool,
    {
        self.files.retain(|key, _| !remove(key));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AnswerKey, &FileRef)> {
        self.files.iter()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Why an answer failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    MissingRequired,
    InvalidFormat,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Issue {
    kind: IssueKind,
    message: String,
}

/// Messages for failed answers, replaced wholesale on every validation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(into = "Vec<ValidationError>")]
pub struct ValidationErrors {
    errors: BTreeMap<AnswerKey, Issue>,
}

/// Flattened view of one failure, used in JSON output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<InstanceId>,
    pub message: String,
    pub code: IssueKind,
}

impl From<ValidationErrors> for Vec<ValidationError> {
    fn from(errors: ValidationErrors) -> Self {
        errors
            .errors
            .into_iter()
            .map(|(key, issue)| ValidationError {
                question: key.question,
                instance: key.instance,
                message: issue.message,
                code: issue.kind,
            })
            .collect()
    }
}

impl ValidationErrors {
    pub fn insert(&mut self, key: AnswerKey, kind: IssueKind, message: impl Into<String>) {
        self.errors.insert(
            key,
            Issue {
                kind,
                message: message.into(),
            },
        );
    }

    pub fn get(&self, key: &AnswerKey) -> Option<&str> {
        self.errors.get(key).map(|issue| issue.message.as_str())
    }

    pub fn kind(&self, key: &AnswerKey) -> Option<IssueKind> {
        self.errors.get(key).map(|issue| issue.kind)
    }

    pub fn extend(&mut self, other: ValidationErrors) {
        self.errors.extend(other.errors);
    }

    pub fn keys(&self) -> impl Iterator<Item = &AnswerKey> {
        self.errors.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AnswerKey, &str)> {
        self.errors
            .iter()
            .map(|(key, issue)| (key, issue.message.as_str()))
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}
