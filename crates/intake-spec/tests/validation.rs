use intake_spec::{
    AnswerKey, AnswerStore, AnswerValue, FormSchema, FormSettings, IssueKind, QuestionSpec,
    QuestionType, RepeatGroups, SchemaError, ValidationContext, group_sections, validate_section,
    validate_visible,
};

struct Form {
    questions: Vec<QuestionSpec>,
    groups: RepeatGroups,
    settings: FormSettings,
}

impl Form {
    fn new(questions: Vec<QuestionSpec>) -> Self {
        let mut groups = RepeatGroups::default();
        for question in &questions {
            groups.initialize(question);
        }
        Self {
            questions,
            groups,
            settings: FormSettings::default(),
        }
    }

    fn validate(&self, store: &AnswerStore, number: u32) -> intake_spec::ValidationErrors {
        let sections = group_sections(&self.questions);
        validate_section(
            ValidationContext {
                sections: &sections,
                store,
                groups: &self.groups,
                settings: &self.settings,
            },
            number,
        )
    }
}

#[test]
fn required_text_gates_the_section() {
    let form = Form::new(vec![
        QuestionSpec::new("full_name", "Full name", QuestionType::Text).required(),
    ]);
    let mut store = AnswerStore::new();

    let errors = form.validate(&store, 1);
    assert_eq!(errors.len(), 1);
    let key = AnswerKey::plain("full_name");
    assert_eq!(errors.get(&key), Some("Full name is required"));
    assert_eq!(errors.kind(&key), Some(IssueKind::MissingRequired));

    store.set(key, "x");
    assert!(form.validate(&store, 1).is_empty());
}

#[test]
fn any_non_empty_text_satisfies_required() {
    let form = Form::new(vec![
        QuestionSpec::new("name", "Name", QuestionType::Text).required(),
    ]);
    let mut store = AnswerStore::new();

    store.set(AnswerKey::plain("name"), "");
    assert_eq!(form.validate(&store, 1).len(), 1);

    store.set(AnswerKey::plain("name"), " ");
    assert!(form.validate(&store, 1).is_empty());
}

#[test]
fn validation_is_idempotent() {
    let form = Form::new(vec![
        QuestionSpec::new("a", "A", QuestionType::Text).required(),
        QuestionSpec::new("b", "B", QuestionType::Email).required(),
    ]);
    let store = AnswerStore::new();
    assert_eq!(form.validate(&store, 1), form.validate(&store, 1));
}

#[test]
fn hidden_section_passes() {
    let form = Form::new(vec![
        QuestionSpec::new("gate", "Gate", QuestionType::Radio).with_options(["Yes", "No"]),
        QuestionSpec::new("detail", "Detail", QuestionType::Text)
            .in_section(2)
            .required()
            .shown_when("Gate", "Yes"),
    ]);
    let mut store = AnswerStore::new();
    store.set(AnswerKey::plain("gate"), "No");
    assert!(form.validate(&store, 2).is_empty());

    store.set(AnswerKey::plain("gate"), "Yes");
    assert_eq!(form.validate(&store, 2).len(), 1);
}

#[test]
fn repeatable_questions_expand_across_instances() {
    let mut form = Form::new(vec![
        QuestionSpec::new("director_name", "Director name", QuestionType::Text)
            .repeatable("directors", 1, 3)
            .required(),
    ]);
    form.groups.add("directors");
    let mut store = AnswerStore::new();
    store.set(AnswerKey::instanced("director_name", 1), "Ada");

    let errors = form.validate(&store, 1);
    assert_eq!(errors.len(), 1);
    assert!(errors.get(&AnswerKey::instanced("director_name", 2)).is_some());
    assert!(errors.get(&AnswerKey::plain("director_name")).is_none());
}

#[test]
fn empty_selection_fails_required_checkbox() {
    let form = Form::new(vec![
        QuestionSpec::new("services", "Services", QuestionType::Checkbox)
            .with_options(["Payroll", "VAT"])
            .required(),
    ]);
    let mut store = AnswerStore::new();
    store.set(AnswerKey::plain("services"), AnswerValue::List(vec![]));
    assert_eq!(form.validate(&store, 1).len(), 1);

    store.set(
        AnswerKey::plain("services"),
        AnswerValue::List(vec!["VAT".into()]),
    );
    assert!(form.validate(&store, 1).is_empty());
}

#[test]
fn headers_are_skipped() {
    let mut header = QuestionSpec::new("intro", "About you", QuestionType::Text).required();
    header.is_header = true;
    let form = Form::new(vec![header]);
    assert!(form.validate(&AnswerStore::new(), 1).is_empty());
}

#[test]
fn strict_formats_only_when_enabled() {
    let mut form = Form::new(vec![QuestionSpec::new("email", "Email", QuestionType::Email)]);
    let mut store = AnswerStore::new();
    store.set(AnswerKey::plain("email"), "not-an-address");
    assert!(form.validate(&store, 1).is_empty());

    form.settings.strict_formats = true;
    let errors = form.validate(&store, 1);
    assert_eq!(errors.kind(&AnswerKey::plain("email")), Some(IssueKind::InvalidFormat));

    store.set(AnswerKey::plain("email"), "books@firm.example");
    assert!(form.validate(&store, 1).is_empty());
}

#[test]
fn required_message_uses_the_template() {
    let mut form = Form::new(vec![
        QuestionSpec::new("director_name", "Director's name", QuestionType::Text)
            .repeatable("directors", 1, 2)
            .required(),
    ]);
    form.settings.required_message = "Please fill in {{text}} (entry {{instance}})".into();
    let errors = form.validate(&AnswerStore::new(), 1);
    assert_eq!(
        errors.get(&AnswerKey::instanced("director_name", 1)),
        Some("Please fill in Director's name (entry 1)")
    );
}

#[test]
fn validate_visible_covers_every_visible_section() {
    let schema: FormSchema =
        serde_json::from_str(include_str!("fixtures/client_intake.json")).expect("deserialize");
    let form = Form::new(schema.questions);
    let mut store = AnswerStore::new();
    store.set(AnswerKey::plain("has_entity"), "No");

    let sections = group_sections(&form.questions);
    let errors = validate_visible(ValidationContext {
        sections: &sections,
        store: &store,
        groups: &form.groups,
        settings: &form.settings,
    });
    let mut failing: Vec<String> = errors.keys().map(ToString::to_string).collect();
    failing.sort();
    assert_eq!(
        failing,
        vec!["director_name#1", "email", "full_name", "services"]
    );
}

#[test]
fn malformed_schemas_fail_fast() {
    let schema = |questions: Vec<QuestionSpec>| FormSchema {
        id: "broken".into(),
        title: "Broken".into(),
        version: "1".into(),
        description: None,
        settings: FormSettings::default(),
        questions,
    };

    let duplicate = schema(vec![
        QuestionSpec::new("a", "A", QuestionType::Text),
        QuestionSpec::new("a", "Again", QuestionType::Text),
    ]);
    assert_eq!(duplicate.check(), Err(SchemaError::DuplicateId("a".into())));

    let mut orphan = QuestionSpec::new("d", "D", QuestionType::Text);
    orphan.is_section_repeatable = true;
    assert_eq!(
        schema(vec![orphan]).check(),
        Err(SchemaError::MissingGroup("d".into()))
    );

    let inverted = QuestionSpec::new("d", "D", QuestionType::Text).repeatable("g", 4, 2);
    assert!(matches!(
        schema(vec![inverted]).check(),
        Err(SchemaError::InvertedBounds { .. })
    ));

    let conflicting = schema(vec![
        QuestionSpec::new("x", "X", QuestionType::Text).repeatable("g", 1, 3),
        QuestionSpec::new("y", "Y", QuestionType::Text).repeatable("g", 1, 5),
    ]);
    assert!(matches!(
        conflicting.check(),
        Err(SchemaError::ConflictingBounds { .. })
    ));

    let mixed = schema(vec![
        QuestionSpec::new("a", "A", QuestionType::Text).repeatable("g1", 1, 3).required(),
        QuestionSpec::new("b", "B", QuestionType::Text).repeatable("g2", 1, 3).required(),
    ]);
    assert_eq!(
        mixed.check(),
        Err(SchemaError::MixedGroups {
            section: 1,
            first: "g1".into(),
            second: "g2".into(),
        })
    );

    let no_options = schema(vec![QuestionSpec::new("s", "S", QuestionType::Select)]);
    assert_eq!(no_options.check(), Err(SchemaError::MissingOptions("s".into())));

    assert!(schema(vec![QuestionSpec::new("z", "Z", QuestionType::Text).in_section(0)])
        .check()
        .is_err());
}
