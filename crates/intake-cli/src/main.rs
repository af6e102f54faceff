mod wizard;

use clap::{Parser, Subcommand, ValueEnum};
use component_intake::{list_sections, validate_form};
use intake_spec::{
    AnswerKey, AnswerStore, FieldInput, FileRef, FormCallbacks, FormSchema, RenderField,
    RenderPayload, Step, SubmissionPayload, Wizard, build_render_payload, render_json_ui,
};
use serde_json::{Value, json};
use std::env;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use wizard::{PromptContext, Verbosity, WizardPresenter, parse_input};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

const DRAFT_DIR_ENV: &str = "INTAKE_WIZARD_DRAFT_DIR";
const LOG_ENV: &str = "INTAKE_LOG";

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Text-based client intake wizard",
    long_about = "Walks multi-section intake forms section by section, lists conditional sections and validates saved answers"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum RenderMode {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Fill in a form section by section in the terminal.
    Wizard {
        /// Path to the form schema JSON.
        #[arg(long, value_name = "SCHEMA")]
        schema: PathBuf,
        /// Optional JSON file with initial answers or a saved draft.
        #[arg(long, value_name = "ANSWERS")]
        answers: Option<PathBuf>,
        /// Show verbose output (status, help text, widget kinds).
        #[arg(long, alias = "debug")]
        verbose: bool,
        /// Also print the submission as JSON when the form completes.
        #[arg(long)]
        answers_json: bool,
        /// Extra render output printed with every section.
        #[arg(long, value_enum, default_value_t = RenderMode::Text)]
        format: RenderMode,
    },
    /// List sections and whether the current answers show them.
    Sections {
        /// Path to the form schema JSON.
        #[arg(long, value_name = "SCHEMA")]
        schema: PathBuf,
        /// Optional JSON file with answers or a saved draft.
        #[arg(long, value_name = "ANSWERS")]
        answers: Option<PathBuf>,
    },
    /// Validate every visible section of a saved answer set.
    Validate {
        /// Path to the form schema JSON.
        #[arg(long, value_name = "SCHEMA")]
        schema: PathBuf,
        /// Path to the answers or draft JSON file.
        #[arg(long, value_name = "ANSWERS")]
        answers: PathBuf,
    },
    /// Print the JSON Schema describing form schema documents.
    Schema,
}

fn main() -> CliResult<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Command::Wizard {
            schema,
            answers,
            verbose,
            answers_json,
            format,
        } => run_wizard(schema, answers, verbose, answers_json, format),
        Command::Sections { schema, answers } => run_sections(schema, answers),
        Command::Validate { schema, answers } => run_validate(schema, answers),
        Command::Schema => run_schema(),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn read_schema(path: &Path) -> CliResult<(FormSchema, String)> {
    let contents = fs::read_to_string(path)?;
    let schema: FormSchema = serde_json::from_str(&contents)?;
    Ok((schema, contents))
}

/// Accepts either a saved draft (with `form_data`) or a bare answer store
/// and returns it in draft shape.
fn read_state(path: &Path, form_id: &str) -> CliResult<Value> {
    let contents = fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&contents)?;
    if value.get("form_data").is_some() {
        if let Some(found) = value.get("form_id").and_then(Value::as_str)
            && found != form_id
        {
            return Err(format!(
                "answers were saved for form '{}', not '{}'",
                found, form_id
            )
            .into());
        }
        Ok(value)
    } else {
        Ok(json!({ "form_id": form_id, "form_data": value }))
    }
}

fn parse_component_result(response: &str) -> CliResult<Value> {
    let value: Value = serde_json::from_str(response)?;
    if let Some(error) = value.get("error").and_then(Value::as_str) {
        Err(error.into())
    } else {
        Ok(value)
    }
}

fn run_sections(schema_path: PathBuf, answers_path: Option<PathBuf>) -> CliResult<()> {
    let (schema, schema_json) = read_schema(&schema_path)?;
    let config_json = json!({ "form_schema_json": schema_json }).to_string();
    let state_json = match answers_path {
        Some(path) => read_state(&path, &schema.id)?.to_string(),
        None => String::new(),
    };
    let listing = parse_component_result(&list_sections(&schema.id, &config_json, &state_json))?;
    println!("Form: {} ({})", schema.title, schema.id);
    for section in listing["sections"].as_array().into_iter().flatten() {
        let mut line = format!(
            "  {}. {}",
            section["number"],
            section["title"].as_str().unwrap_or_default()
        );
        if let Some(group) = section["repeat_group"].as_str() {
            line.push_str(&format!(" (repeatable: {})", group));
        }
        if section["visible"] != Value::Bool(true) {
            line.push_str(" [hidden]");
        }
        println!("{}", line);
    }
    Ok(())
}

fn run_validate(schema_path: PathBuf, answers_path: PathBuf) -> CliResult<()> {
    let (schema, schema_json) = read_schema(&schema_path)?;
    let config_json = json!({ "form_schema_json": schema_json }).to_string();
    let state_json = read_state(&answers_path, &schema.id)?.to_string();
    let result = parse_component_result(&validate_form(&schema.id, &config_json, &state_json))?;
    let valid = result["valid"].as_bool().unwrap_or(false);
    println!(
        "Validation result: {}",
        if valid { "valid" } else { "invalid" }
    );
    if let Some(errors) = result["errors"].as_array()
        && !errors.is_empty()
    {
        println!("Errors:");
        for error in errors {
            let question = error["question"].as_str().unwrap_or("<unknown>");
            let message = error["message"].as_str().unwrap_or("validation failed");
            match error["instance"].as_u64() {
                Some(instance) => println!("  {}#{} - {}", question, instance, message),
                None => println!("  {} - {}", question, message),
            }
        }
    }

    if valid {
        Ok(())
    } else {
        Err("validation failed".into())
    }
}

fn run_schema() -> CliResult<()> {
    let schema = schemars::schema_for!(FormSchema);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

/// Receives submissions, drafts and picked files from the wizard.
struct CliCallbacks {
    draft_dir: PathBuf,
    submitted: Option<SubmissionPayload>,
    last_draft: Option<PathBuf>,
}

impl CliCallbacks {
    fn new(draft_dir: PathBuf) -> Self {
        Self {
            draft_dir,
            submitted: None,
            last_draft: None,
        }
    }

    fn write_draft(&self, payload: &SubmissionPayload) -> CliResult<PathBuf> {
        fs::create_dir_all(&self.draft_dir)?;
        let path = self.draft_dir.join(format!("{}.draft.json", payload.form_id));
        fs::write(&path, payload.to_json_pretty()?)?;
        Ok(path)
    }
}

impl FormCallbacks for CliCallbacks {
    fn on_submit(&mut self, payload: SubmissionPayload) {
        self.submitted = Some(payload);
    }

    fn on_save_draft(&mut self, payload: SubmissionPayload) {
        match self.write_draft(&payload) {
            Ok(path) => self.last_draft = Some(path),
            Err(err) => {
                warn!(error = %err, "failed to write draft");
                self.last_draft = None;
            }
        }
    }

    fn on_file_selected(&mut self, key: &AnswerKey, file: &FileRef) {
        println!("Queued upload of {} for {} ({})", file.name, key, file.handle);
    }
}

fn resolve_draft_dir() -> PathBuf {
    env::var_os(DRAFT_DIR_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from("."))
}

fn load_wizard(schema: FormSchema, answers_path: Option<PathBuf>) -> CliResult<Wizard> {
    let Some(path) = answers_path else {
        return Ok(Wizard::new(schema, AnswerStore::new())?);
    };
    let state = read_state(&path, &schema.id)?;
    if state.get("repeatable_sections").is_some() || state.get("current_section").is_some() {
        let draft: SubmissionPayload = serde_json::from_value(state)?;
        Ok(Wizard::resume(schema, draft)?)
    } else {
        let store: AnswerStore = serde_json::from_value(state["form_data"].clone())?;
        Ok(Wizard::new(schema, store)?)
    }
}

/// What the user picked at the end of a section.
enum Action {
    Next,
    Back,
    Edit,
    Add,
    Remove(u32),
    Collapse(u32),
    Draft,
    Quit,
}

fn parse_action(raw: &str) -> Option<Action> {
    let mut parts = raw.split_whitespace();
    let verb = parts.next().unwrap_or("next").to_lowercase();
    let argument = parts.next().and_then(|value| value.parse::<u32>().ok());
    match (verb.as_str(), argument) {
        ("n" | "next" | "submit", _) => Some(Action::Next),
        ("b" | "back", _) => Some(Action::Back),
        ("e" | "edit", _) => Some(Action::Edit),
        ("a" | "add", _) => Some(Action::Add),
        ("r" | "remove", Some(id)) => Some(Action::Remove(id)),
        ("c" | "collapse", Some(id)) => Some(Action::Collapse(id)),
        ("d" | "draft", _) => Some(Action::Draft),
        ("q" | "quit" | "exit", _) => Some(Action::Quit),
        _ => None,
    }
}

fn read_line(input: &mut impl BufRead) -> CliResult<String> {
    print!("> ");
    io::stdout().flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err("input closed before the form was submitted".into());
    }
    Ok(line.trim().to_string())
}

fn run_wizard(
    schema_path: PathBuf,
    answers_path: Option<PathBuf>,
    verbose: bool,
    answers_json: bool,
    format: RenderMode,
) -> CliResult<()> {
    let (schema, _) = read_schema(&schema_path)?;
    let mut wizard = load_wizard(schema, answers_path)?;
    let mut presenter = WizardPresenter::new(Verbosity::from_verbose(verbose), answers_json);
    let mut callbacks = CliCallbacks::new(resolve_draft_dir());
    let stdin = io::stdin();
    let mut input = stdin.lock();

    let mut prompt_fields = true;
    loop {
        let payload = build_render_payload(&wizard);
        presenter.show_header(&payload);
        presenter.show_section(&payload);
        if payload.section_number.is_none() {
            return Err("no visible sections to fill in".into());
        }
        if let RenderMode::Json = format {
            println!(
                "JSON UI:\n{}",
                serde_json::to_string_pretty(&render_json_ui(&payload))?
            );
        }
        if prompt_fields {
            fill_section(&mut wizard, &payload, &presenter, &mut callbacks, &mut input)?;
        }

        let payload = build_render_payload(&wizard);
        presenter.show_actions(&payload);
        let raw = read_line(&mut input)?;
        let Some(action) = parse_action(&raw) else {
            eprintln!("Unknown action '{}'.", raw);
            prompt_fields = false;
            continue;
        };

        prompt_fields = false;
        match action {
            Action::Next => match wizard.next(&mut callbacks) {
                Step::Moved(number) => {
                    debug!(section = number, "moved to section");
                    prompt_fields = true;
                }
                Step::Blocked { .. } => {
                    presenter.show_validation(&build_render_payload(&wizard));
                    prompt_fields = true;
                }
                Step::Submitted | Step::Finished => {
                    let submitted = callbacks
                        .submitted
                        .take()
                        .ok_or("form finished without a submission")?;
                    presenter.show_completion(&submitted);
                    return Ok(());
                }
            },
            Action::Back => {
                wizard.back();
                prompt_fields = true;
            }
            Action::Edit => prompt_fields = true,
            Action::Add => match payload.repeat.as_ref() {
                Some(repeat) if wizard.add_instance(&repeat.group) => prompt_fields = true,
                Some(repeat) => println!("At most {} entries are allowed.", repeat.max),
                None => println!("This section cannot repeat."),
            },
            Action::Remove(id) => match payload.repeat.as_ref() {
                Some(repeat) if wizard.remove_instance(&repeat.group, id) => {
                    println!("Removed entry {}.", id)
                }
                Some(repeat) => println!(
                    "Entry {} cannot be removed (at least {} required).",
                    id, repeat.min
                ),
                None => println!("This section cannot repeat."),
            },
            Action::Collapse(id) => match payload.repeat.as_ref() {
                Some(repeat) if repeat.instances.iter().any(|instance| instance.id == id) => {
                    wizard.toggle_collapsed(&repeat.group, id);
                }
                _ => println!("No entry {} in this section.", id),
            },
            Action::Draft => {
                wizard.save_draft(&mut callbacks);
                match &callbacks.last_draft {
                    Some(path) => println!("Draft saved to {}", path.display()),
                    None => eprintln!("Draft could not be saved."),
                }
            }
            Action::Quit => return Err("wizard aborted by user".into()),
        }
    }
}

/// Prompts every input of the current section, skipping headers and
/// collapsed entries.
fn fill_section(
    wizard: &mut Wizard,
    payload: &RenderPayload,
    presenter: &WizardPresenter,
    callbacks: &mut CliCallbacks,
    input: &mut impl BufRead,
) -> CliResult<()> {
    for field in &payload.fields {
        if field.header {
            presenter.show_field_header(field);
            continue;
        }
        prompt_field(wizard, field, presenter, callbacks, input)?;
    }
    if let Some(repeat) = &payload.repeat {
        for instance in repeat.instances.iter().filter(|instance| !instance.collapsed) {
            presenter.show_instance(instance.id, instance.position);
            for field in &instance.fields {
                if field.header {
                    presenter.show_field_header(field);
                    continue;
                }
                prompt_field(wizard, field, presenter, callbacks, input)?;
            }
        }
    }
    Ok(())
}

fn prompt_field(
    wizard: &mut Wizard,
    field: &RenderField,
    presenter: &WizardPresenter,
    callbacks: &mut CliCallbacks,
    input: &mut impl BufRead,
) -> CliResult<()> {
    let prompt = PromptContext::new(field);
    loop {
        presenter.show_prompt(&prompt);
        let raw = read_line(input)?;
        let parsed = match parse_input(field, &raw) {
            Ok(parsed) => parsed,
            Err(err) => {
                presenter.show_parse_error(&err);
                continue;
            }
        };
        let Some(edit) = parsed else {
            return Ok(());
        };
        let applied = match edit {
            FieldInput::File(file) => wizard.attach_file(&field.key, file, callbacks),
            other => wizard.apply_input(&field.key, other).map(|_| ()),
        };
        match applied {
            Ok(()) => return Ok(()),
            Err(err) => eprintln!("Invalid answer: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_cmd::Command;
    use assert_fs::prelude::*;

    const FIXTURE: &str = concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../intake-spec/tests/fixtures/client_intake.json"
    );

    #[test]
    fn parse_action_reads_verbs_and_ids() {
        assert!(matches!(parse_action(""), Some(Action::Next)));
        assert!(matches!(parse_action("back"), Some(Action::Back)));
        assert!(matches!(parse_action("r 2"), Some(Action::Remove(2))));
        assert!(matches!(parse_action("collapse 1"), Some(Action::Collapse(1))));
        assert!(parse_action("remove").is_none());
        assert!(parse_action("dance").is_none());
    }

    #[test]
    fn read_state_wraps_bare_answer_store() {
        let dir = assert_fs::TempDir::new().unwrap();
        let file = dir.child("answers.json");
        file.write_str(r#"{"full_name": "Ada"}"#).unwrap();
        let state = read_state(file.path(), "client-intake").unwrap();
        assert_eq!(state["form_id"], "client-intake");
        assert_eq!(state["form_data"]["full_name"], "Ada");
    }

    #[test]
    fn read_state_rejects_draft_of_other_form() {
        let dir = assert_fs::TempDir::new().unwrap();
        let file = dir.child("draft.json");
        file.write_str(r#"{"form_id": "other", "form_data": []}"#).unwrap();
        assert!(read_state(file.path(), "client-intake").is_err());
    }

    #[test]
    fn sections_command_marks_hidden_sections() -> Result<(), Box<dyn std::error::Error>> {
        let dir = assert_fs::TempDir::new()?;
        let answers = dir.child("answers.json");
        answers.write_str(r#"{"has_entity": "No"}"#)?;

        let output = Command::cargo_bin("intake-wizard")?
            .arg("sections")
            .arg("--schema")
            .arg(FIXTURE)
            .arg("--answers")
            .arg(answers.path())
            .output()?;
        assert!(output.status.success());
        let stdout = String::from_utf8(output.stdout)?;
        assert!(stdout.contains("2. Company details [hidden]"));
        assert!(stdout.contains("3. Directors (repeatable: directors)"));
        Ok(())
    }

    #[test]
    fn validate_command_reports_missing_answers() -> Result<(), Box<dyn std::error::Error>> {
        let dir = assert_fs::TempDir::new()?;
        let answers = dir.child("answers.json");
        answers.write_str(r#"{"full_name": "Ada", "has_entity": "Yes"}"#)?;

        let output = Command::cargo_bin("intake-wizard")?
            .arg("validate")
            .arg("--schema")
            .arg(FIXTURE)
            .arg("--answers")
            .arg(answers.path())
            .output()?;
        assert!(!output.status.success());
        let stdout = String::from_utf8(output.stdout)?;
        assert!(stdout.contains("Validation result: invalid"));
        assert!(stdout.contains("company_name - Registered company name is required"));
        assert!(stdout.contains("director_name#1 - Director full name is required"));
        Ok(())
    }

    #[test]
    fn schema_command_prints_json_schema() -> Result<(), Box<dyn std::error::Error>> {
        let output = Command::cargo_bin("intake-wizard")?.arg("schema").output()?;
        assert!(output.status.success());
        let schema: Value = serde_json::from_slice(&output.stdout)?;
        assert_eq!(schema["title"], "FormSchema");
        Ok(())
    }

    #[test]
    fn wizard_walks_form_to_submission() -> Result<(), Box<dyn std::error::Error>> {
        let drafts = assert_fs::TempDir::new()?;
        let script = [
            "Ada Lovelace",
            "ada@example.com",
            "",
            "No",
            "next",
            "Ada Lovelace",
            "",
            "",
            "next",
            "payroll, bookkeeping",
            "",
            "draft",
            "next",
        ];
        let output = Command::cargo_bin("intake-wizard")?
            .env(DRAFT_DIR_ENV, drafts.path())
            .arg("wizard")
            .arg("--schema")
            .arg(FIXTURE)
            .arg("--answers-json")
            .write_stdin(format!("{}\n", script.join("\n")))
            .output()?;
        let stdout = String::from_utf8(output.stdout)?;
        assert!(output.status.success(), "wizard failed: {stdout}");
        assert!(stdout.contains("== Section 2/3: Directors =="));
        assert!(stdout.contains("Submission (CBOR hex):"));
        assert!(stdout.contains("\"Bookkeeping\""));
        let draft = fs::read_to_string(drafts.child("client-intake.draft.json").path())?;
        assert!(draft.contains("\"current_section\": 4"));
        Ok(())
    }

    #[test]
    fn wizard_blocks_on_missing_required_answers() -> Result<(), Box<dyn std::error::Error>> {
        let output = Command::cargo_bin("intake-wizard")?
            .arg("wizard")
            .arg("--schema")
            .arg(FIXTURE)
            .write_stdin("\n\n\n\nnext\n")
            .output()?;
        assert!(!output.status.success());
        let stderr = String::from_utf8(output.stderr)?;
        assert!(stderr.contains("Validation errors:"));
        assert!(stderr.contains("full_name: Full name is required"));
        Ok(())
    }
}
