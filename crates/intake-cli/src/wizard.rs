use std::fs;
use std::path::Path;

use intake_spec::{FieldInput, FileRef, RenderField, RenderPayload, RenderStatus, SubmissionPayload};

/// Controls which bits of state the wizard prints.
#[derive(Copy, Clone, Eq, PartialEq)]
pub enum Verbosity {
    /// Clean output: section headings and prompts only.
    Clean,
    /// Verbose output: status, progress, help text and widget details.
    Verbose,
}

impl Verbosity {
    pub fn from_verbose(verbose: bool) -> Self {
        if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Clean
        }
    }

    pub fn is_verbose(&self) -> bool {
        matches!(self, Verbosity::Verbose)
    }
}

/// Prints sections, prompts and results for the terminal wizard.
pub struct WizardPresenter {
    verbosity: Verbosity,
    header_printed: bool,
    show_payload_json: bool,
}

impl WizardPresenter {
    pub fn new(verbosity: Verbosity, show_payload_json: bool) -> Self {
        Self {
            verbosity,
            header_printed: false,
            show_payload_json,
        }
    }

    pub fn show_header(&mut self, payload: &RenderPayload) {
        if self.header_printed {
            return;
        }
        println!("Form: {}", payload.form_title);
        if self.verbosity.is_verbose()
            && let Some(help) = &payload.help
        {
            println!("Help: {}", help);
        }
        self.header_printed = true;
    }

    pub fn show_section(&self, payload: &RenderPayload) {
        if self.verbosity.is_verbose() {
            println!("Status: {}", payload.status.as_str());
        }
        match &payload.section_title {
            Some(title) => println!(
                "== Section {}/{}: {} ==",
                payload.progress.current, payload.progress.total, title
            ),
            None => println!("No visible sections are available; check the conditional rules."),
        }
        if let Some(description) = &payload.section_description {
            println!("{}", description);
        }
        if let Some(repeat) = &payload.repeat {
            println!(
                "{} entries ({} to {} allowed)",
                repeat.instances.len(),
                repeat.min,
                repeat.max
            );
            for instance in repeat.instances.iter().filter(|instance| instance.collapsed) {
                println!(" entry {} is collapsed", instance.id);
            }
        }
    }

    pub fn show_field_header(&self, field: &RenderField) {
        println!("-- {} --", field.text);
        if let Some(description) = &field.description {
            println!("{}", description);
        }
    }

    pub fn show_instance(&self, id: u32, position: usize) {
        println!("Entry #{} (id {})", position, id);
    }

    pub fn show_prompt(&self, prompt: &PromptContext) {
        let mut line = prompt.label.clone();
        if prompt.required {
            line.push_str(" *");
        }
        if let Some(hint) = &prompt.hint {
            line.push(' ');
            line.push_str(hint);
        }
        if let Some(current) = &prompt.current {
            line.push_str(&format!(" [{}]", current));
        }
        println!("{}", line);
        if let Some(description) = &prompt.description {
            println!("{}", description);
        }
        if self.verbosity.is_verbose() {
            println!("Widget: {}", prompt.widget);
        }
    }

    pub fn show_parse_error(&self, error: &AnswerParseError) {
        eprintln!("Invalid answer: {}", error.user_message);
        if let Some(debug) = &error.debug_message {
            eprintln!("  Expected: {}", debug);
        }
    }

    /// Lists every field error of the section the wizard stands on.
    pub fn show_validation(&self, payload: &RenderPayload) {
        if payload.status != RenderStatus::Error {
            return;
        }
        eprintln!("Validation errors:");
        let instanced = payload
            .repeat
            .iter()
            .flat_map(|repeat| repeat.instances.iter())
            .flat_map(|instance| instance.fields.iter());
        for field in payload.fields.iter().chain(instanced) {
            if let Some(error) = &field.error {
                eprintln!("  {}: {}", field.key, error);
            }
        }
    }

    pub fn show_actions(&self, payload: &RenderPayload) {
        let mut actions = vec!["[n]ext", "[b]ack", "[e]dit", "[d]raft", "[q]uit"];
        if payload.is_last {
            actions[0] = "[n]ext (submit)";
        }
        if let Some(repeat) = &payload.repeat {
            if repeat.can_add {
                actions.push("[a]dd");
            }
            if repeat.can_remove {
                actions.push("[r]emove <id>");
            }
            actions.push("[c]ollapse <id>");
        }
        println!("Actions: {}", actions.join(", "));
    }

    pub fn show_completion(&self, payload: &SubmissionPayload) {
        println!("Done ✅");
        match payload.to_cbor() {
            Ok(bytes) => println!("Submission (CBOR hex): {}", encode_hex(&bytes)),
            Err(err) => eprintln!("Failed to serialize submission to CBOR: {}", err),
        }
        if self.show_payload_json {
            match payload.to_json_pretty() {
                Ok(pretty) => println!("{}", pretty),
                Err(err) => eprintln!("Failed to serialize submission to JSON: {}", err),
            }
        }
    }
}

/// Context used to format a single prompt.
pub struct PromptContext {
    pub label: String,
    pub description: Option<String>,
    pub required: bool,
    pub widget: &'static str,
    pub hint: Option<String>,
    pub current: Option<String>,
}

impl PromptContext {
    pub fn new(field: &RenderField) -> Self {
        let hint = match field.widget {
            "select" | "radio_group" => Some(format!("({})", field.options.join("/"))),
            "checkbox_group" | "multi_select" => {
                Some(format!("(comma-separated: {})", field.options.join("/")))
            }
            "file_picker" => Some("(path to file)".to_string()),
            _ => field
                .placeholder
                .as_ref()
                .map(|placeholder| format!("(e.g. {})", placeholder)),
        };
        Self {
            label: field.text.clone(),
            description: field.description.clone(),
            required: field.required,
            widget: field.widget,
            hint,
            current: field.current_value.as_ref().map(|value| value.display()),
        }
    }
}

/// Error produced when parsing answers from the user.
#[derive(Debug)]
pub struct AnswerParseError {
    pub user_message: String,
    pub debug_message: Option<String>,
}

impl AnswerParseError {
    pub fn new(user_message: impl Into<String>, debug_message: Option<String>) -> Self {
        Self {
            user_message: user_message.into(),
            debug_message,
        }
    }
}

/// Turns one typed line into an edit. Blank keeps the current value and
/// `-` clears it.
pub fn parse_input(field: &RenderField, raw: &str) -> Result<Option<FieldInput>, AnswerParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed == "-" {
        return Ok(Some(FieldInput::Clear));
    }
    match field.widget {
        "select" | "radio_group" => match_option(field, trimmed).map(|option| Some(FieldInput::Choose(option))),
        "checkbox_group" | "multi_select" => trimmed
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| match_option(field, part))
            .collect::<Result<Vec<_>, _>>()
            .map(|choices| Some(FieldInput::Choices(choices))),
        "file_picker" => pick_file(Path::new(trimmed)).map(|file| Some(FieldInput::File(file))),
        _ => Ok(Some(FieldInput::Text(trimmed.to_string()))),
    }
}

fn match_option(field: &RenderField, raw: &str) -> Result<String, AnswerParseError> {
    field
        .options
        .iter()
        .find(|option| option.eq_ignore_ascii_case(raw))
        .cloned()
        .ok_or_else(|| {
            AnswerParseError::new(
                format!("'{}' is not one of the options.", raw),
                Some(field.options.join(", ")),
            )
        })
}

fn pick_file(path: &Path) -> Result<FileRef, AnswerParseError> {
    let metadata = fs::metadata(path).map_err(|err| {
        AnswerParseError::new(
            format!("cannot read '{}'.", path.display()),
            Some(err.to_string()),
        )
    })?;
    if !metadata.is_file() {
        return Err(AnswerParseError::new(
            format!("'{}' is not a file.", path.display()),
            None,
        ));
    }
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let mut file = FileRef::new(name, path.display().to_string());
    file.size = Some(metadata.len());
    Ok(file)
}

fn encode_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{:02x}", byte)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use intake_spec::{AnswerKey, QuestionType};

    fn field(widget: &'static str, options: &[&str]) -> RenderField {
        RenderField {
            key: AnswerKey::plain("q"),
            text: "Question".into(),
            description: None,
            placeholder: None,
            kind: QuestionType::Text,
            widget,
            required: true,
            header: false,
            options: options.iter().map(|option| option.to_string()).collect(),
            current_value: None,
            error: None,
        }
    }

    #[test]
    fn blank_keeps_and_dash_clears() {
        let text = field("text_input", &[]);
        assert_eq!(parse_input(&text, "  ").unwrap(), None);
        assert_eq!(parse_input(&text, "-").unwrap(), Some(FieldInput::Clear));
    }

    #[test]
    fn single_choice_matches_option_case_insensitively() {
        let radio = field("radio_group", &["Yes", "No"]);
        assert_eq!(
            parse_input(&radio, "yes").unwrap(),
            Some(FieldInput::Choose("Yes".into()))
        );
        assert!(parse_input(&radio, "maybe").is_err());
    }

    #[test]
    fn multi_choice_splits_on_commas() {
        let checkbox = field("checkbox_group", &["Payroll", "Bookkeeping"]);
        assert_eq!(
            parse_input(&checkbox, "payroll, Bookkeeping").unwrap(),
            Some(FieldInput::Choices(vec!["Payroll".into(), "Bookkeeping".into()]))
        );
    }

    #[test]
    fn file_picker_requires_existing_file() {
        let picker = field("file_picker", &[]);
        assert!(parse_input(&picker, "/definitely/not/here.pdf").is_err());

        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("passport.pdf");
        fs::write(&path, b"pdf").expect("write file");
        let parsed = parse_input(&picker, &path.display().to_string()).unwrap();
        match parsed {
            Some(FieldInput::File(file)) => {
                assert_eq!(file.name, "passport.pdf");
                assert_eq!(file.size, Some(3));
            }
            other => panic!("unexpected input {:?}", other),
        }
    }

    #[test]
    fn hex_encoding_is_lowercase() {
        assert_eq!(encode_hex(&[0x0a, 0xff]), "0aff");
    }
}
