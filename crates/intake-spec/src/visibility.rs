use tracing::trace;

use crate::answers::{AnswerKey, AnswerStore, AnswerValue};
use crate::sections::{Section, SectionMap};
use crate::spec::question::{ConditionalRule, QuestionSpec};

pub type VisibilityMap = std::collections::BTreeMap<u32, bool>;

/// Finds the question a rule points at.
///
/// Rules reference the question's display text rather than its id, so a
/// renamed question silently disconnects every rule that pointed at it.
/// All rule lookups go through here; the first question in schema order
/// with matching text wins.
pub fn find_condition_source<'a>(
    sections: &'a SectionMap,
    rule: &ConditionalRule,
) -> Option<&'a QuestionSpec> {
    sections
        .questions()
        .find(|question| question.text == rule.question_text)
}

/// Evaluates a rule against the answers. `None` means the rule cannot be
/// decided yet (source missing or unanswered).
pub fn evaluate_condition(
    rule: &ConditionalRule,
    sections: &SectionMap,
    store: &AnswerStore,
) -> Option<bool> {
    let source = find_condition_source(sections, rule)?;
    let answer = store
        .get(&AnswerKey::plain(source.id.as_str()))
        .filter(|value| value.is_filled())?;
    Some(matches!(answer, AnswerValue::Text(text) if *text == rule.value))
}

/// Undecidable rules leave the section visible.
pub fn is_section_visible(section: &Section, sections: &SectionMap, store: &AnswerStore) -> bool {
    match section.condition() {
        None => true,
        Some(rule) => evaluate_condition(&rule, sections, store).unwrap_or(true),
    }
}

pub fn resolve_visibility(sections: &SectionMap, store: &AnswerStore) -> VisibilityMap {
    let mut map = VisibilityMap::new();
    for section in sections.iter() {
        let visible = is_section_visible(section, sections, store);
        trace!(section = section.number, visible, "resolved section visibility");
        map.insert(section.number, visible);
    }
    map
}

/// Section numbers currently eligible for display, ascending.
pub fn visible_sections(sections: &SectionMap, store: &AnswerStore) -> Vec<u32> {
    resolve_visibility(sections, store)
        .into_iter()
        .filter_map(|(number, visible)| visible.then_some(number))
        .collect()
}
