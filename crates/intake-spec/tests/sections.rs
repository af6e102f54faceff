use intake_spec::{FormSchema, QuestionSpec, QuestionType, group_sections};

fn fixture() -> FormSchema {
    serde_json::from_str(include_str!("fixtures/client_intake.json")).expect("deserialize")
}

#[test]
fn keys_are_the_distinct_section_numbers() {
    let schema = fixture();
    let sections = group_sections(&schema.questions);
    assert_eq!(sections.numbers(), vec![1, 2, 3, 4]);
}

#[test]
fn questions_keep_their_relative_order() {
    let questions = vec![
        QuestionSpec::new("c", "C", QuestionType::Text).in_section(3),
        QuestionSpec::new("a", "A", QuestionType::Text).in_section(1),
        QuestionSpec::new("d", "D", QuestionType::Text).in_section(3),
        QuestionSpec::new("b", "B", QuestionType::Text).in_section(1),
        QuestionSpec::new("e", "E", QuestionType::Text).in_section(3),
    ];
    let sections = group_sections(&questions);

    assert_eq!(sections.numbers(), vec![1, 3]);
    let ids = |number: u32| {
        sections
            .get(number)
            .unwrap()
            .questions
            .iter()
            .map(|question| question.id.clone())
            .collect::<Vec<_>>()
    };
    assert_eq!(ids(1), vec!["a", "b"]);
    assert_eq!(ids(3), vec!["c", "d", "e"]);
}

#[test]
fn missing_section_number_defaults_to_one() {
    let question: QuestionSpec =
        serde_json::from_str(r#"{ "id": "q", "text": "Question" }"#).expect("deserialize");
    assert_eq!(question.section_number, 1);
    assert_eq!(question.kind, QuestionType::Text);
    assert_eq!((question.min_repeats, question.max_repeats), (1, 10));

    let sections = group_sections(&[question]);
    assert_eq!(sections.numbers(), vec![1]);
}

#[test]
fn section_metadata_comes_from_the_first_question() {
    let schema = fixture();
    let sections = group_sections(&schema.questions);

    let company = sections.get(2).unwrap();
    assert_eq!(company.title.as_deref(), Some("Company details"));
    let rule = company.condition().expect("conditional rule");
    assert_eq!(rule.question_text, "Do you operate through a company?");
    assert_eq!(rule.value, "Yes");

    assert_eq!(sections.get(3).unwrap().repeat_group(), Some("directors"));
    assert_eq!(sections.get(1).unwrap().repeat_group(), None);
}

#[test]
fn empty_schema_has_no_sections() {
    assert!(group_sections(&[]).is_empty());
}
