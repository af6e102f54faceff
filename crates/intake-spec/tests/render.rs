use intake_spec::{
    AnswerKey, AnswerStore, FormSchema, RenderStatus, Wizard, build_render_payload,
    render_json_ui, render_text,
};

fn fixture() -> FormSchema {
    serde_json::from_str(include_str!("fixtures/client_intake.json")).expect("deserialize")
}

struct Sink;

impl intake_spec::FormCallbacks for Sink {
    fn on_submit(&mut self, _payload: intake_spec::SubmissionPayload) {}
}

#[test]
fn render_text_describes_the_current_section() {
    let wizard = Wizard::new(fixture(), AnswerStore::new()).expect("wizard");
    let payload = build_render_payload(&wizard);

    assert_eq!(payload.status, RenderStatus::NeedInput);
    assert_eq!(payload.section_number, Some(1));

    let text = render_text(&payload);
    assert!(text.contains("Section: Client details"));
    assert!(text.contains("Full name [text_input] *"));
    assert!(text.contains("(Yes/No)"));
}

#[test]
fn render_json_ui_exposes_errors_after_a_blocked_step() {
    let mut wizard = Wizard::new(fixture(), AnswerStore::new()).expect("wizard");
    wizard.next(&mut Sink);
    let payload = build_render_payload(&wizard);
    assert_eq!(payload.status, RenderStatus::Error);

    let ui = render_json_ui(&payload);
    assert_eq!(ui["form_id"], "client-intake");
    assert_eq!(ui["status"], "error");
    assert_eq!(ui["progress"]["total"], 4);
    let fields = ui["fields"].as_array().expect("fields");
    let name = fields
        .iter()
        .find(|field| field["question"] == "full_name")
        .expect("full_name field");
    assert_eq!(name["error"], "Full name is required");
    let entity = fields
        .iter()
        .find(|field| field["question"] == "has_entity")
        .expect("has_entity field");
    assert_eq!(entity["widget"], "radio_group");
    assert_eq!(entity["options"][1], "No");
}

#[test]
fn repeatable_section_renders_instance_cards() {
    let initial: AnswerStore =
        serde_json::from_str(r#"{ "full_name": "Ada", "email": "ada@example.com", "has_entity": "No" }"#)
            .expect("prefill");
    let mut wizard = Wizard::new(fixture(), initial).expect("wizard");
    assert_eq!(wizard.next(&mut Sink), intake_spec::Step::Moved(3));
    wizard.add_instance("directors");
    wizard
        .set_answer(&AnswerKey::instanced("director_name", 2), "Charles Babbage")
        .expect("answer");
    wizard.toggle_collapsed("directors", 1);

    let payload = build_render_payload(&wizard);
    assert!(payload.fields.is_empty());
    let repeat = payload.repeat.as_ref().expect("repeat block");
    assert_eq!(repeat.group, "directors");
    assert!(repeat.can_add);
    assert!(repeat.can_remove);
    assert_eq!(repeat.instances.len(), 2);
    assert!(repeat.instances[0].collapsed);
    assert_eq!(repeat.instances[1].fields[2].widget, "file_picker");

    let ui = render_json_ui(&payload);
    assert_eq!(
        ui["repeat"]["instances"][1]["fields"][0]["current_value"],
        "Charles Babbage"
    );
    assert_eq!(ui["repeat"]["instances"][1]["fields"][0]["instance"], 2);

    let text = render_text(&payload);
    assert!(text.contains("[collapsed]"));
    assert!(text.contains("= Charles Babbage"));
}
