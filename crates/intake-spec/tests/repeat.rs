use std::collections::BTreeSet;

use intake_spec::{
    AnswerKey, AnswerStore, FileAttachments, FileRef, QuestionSpec, QuestionType, RepeatGroups,
};

fn directors(min: u32, max: u32) -> RepeatGroups {
    let mut groups = RepeatGroups::default();
    groups.initialize(
        &QuestionSpec::new("director_name", "Director full name", QuestionType::Text)
            .repeatable("directors", min, max),
    );
    groups.initialize(
        &QuestionSpec::new("director_email", "Director email", QuestionType::Email)
            .repeatable("directors", min, max),
    );
    groups
}

#[test]
fn first_question_seeds_instance_one() {
    let groups = directors(1, 3);
    assert_eq!(groups.instances("directors"), &[1]);
    assert_eq!(groups.group_of("director_email"), Some("directors"));
    assert_eq!(groups.group_of("full_name"), None);
}

#[test]
fn add_stops_at_max() {
    let mut groups = directors(1, 3);
    assert!(groups.add("directors"));
    assert!(groups.add("directors"));
    assert_eq!(groups.instances("directors"), &[1, 2, 3]);

    assert!(!groups.add("directors"));
    assert_eq!(groups.instances("directors"), &[1, 2, 3]);
}

#[test]
fn remove_never_drops_below_min() {
    let mut groups = directors(1, 3);
    let mut store = AnswerStore::new();
    let mut files = FileAttachments::default();

    assert!(!groups.remove("directors", 1, &mut store, &mut files));
    assert_eq!(groups.instances("directors"), &[1]);

    groups.add("directors");
    assert!(groups.remove("directors", 1, &mut store, &mut files));
    assert_eq!(groups.instances("directors"), &[2]);
    assert!(!groups.remove("directors", 2, &mut store, &mut files));
}

#[test]
fn remove_cascades_only_to_that_instance() {
    let mut groups = directors(1, 3);
    groups.add("directors");
    groups.add("directors");

    let mut store = AnswerStore::new();
    let mut files = FileAttachments::default();
    for instance in 1..=3 {
        store.set(AnswerKey::instanced("director_name", instance), format!("Director {instance}"));
        store.set(
            AnswerKey::instanced("director_email", instance),
            format!("d{instance}@example.com"),
        );
    }
    store.set(AnswerKey::plain("full_name"), "Ada Lovelace");
    files.insert(
        AnswerKey::instanced("director_name", 2),
        FileRef::new("id.pdf", "upload-2"),
    );
    groups.toggle_collapsed("directors", 2);

    assert!(groups.remove("directors", 2, &mut store, &mut files));

    assert!(store.keys().all(|key| key.instance != Some(2)));
    assert_eq!(store.len(), 5);
    assert!(store.contains(&AnswerKey::instanced("director_name", 1)));
    assert!(store.contains(&AnswerKey::instanced("director_email", 3)));
    assert!(store.contains(&AnswerKey::plain("full_name")));
    assert!(files.is_empty());
    assert!(!groups.is_collapsed("directors", 2));
}

#[test]
fn ids_are_never_reused() {
    let mut groups = directors(1, 3);
    let mut store = AnswerStore::new();
    let mut files = FileAttachments::default();
    groups.add("directors");
    groups.add("directors");
    assert!(groups.remove("directors", 3, &mut store, &mut files));

    assert!(groups.add("directors"));
    assert_eq!(groups.instances("directors"), &[1, 2, 4]);
}

#[test]
fn unknown_group_is_ignored() {
    let mut groups = directors(1, 3);
    assert!(!groups.add("shareholders"));
    assert!(groups.instances("shareholders").is_empty());
}

#[test]
fn min_above_one_seeds_enough_instances() {
    let groups = directors(2, 4);
    assert_eq!(groups.instances("directors"), &[1, 2]);
}

#[test]
fn restore_respects_bounds_and_floor() {
    let mut groups = directors(1, 2);
    let observed: BTreeSet<u32> = [2, 5, 9].into_iter().collect();
    groups.restore("directors", &observed, 12);
    assert_eq!(groups.instances("directors"), &[2, 5]);

    let mut store = AnswerStore::new();
    let mut files = FileAttachments::default();
    groups.remove("directors", 5, &mut store, &mut files);
    groups.add("directors");
    assert_eq!(groups.instances("directors"), &[2, 12]);
}

#[test]
fn toggle_collapsed_flips_state() {
    let mut groups = directors(1, 3);
    assert!(groups.toggle_collapsed("directors", 1));
    assert!(groups.is_collapsed("directors", 1));
    assert!(!groups.toggle_collapsed("directors", 1));
    assert!(!groups.is_collapsed("directors", 1));
    assert!(!groups.toggle_collapsed("directors", 7));
}
