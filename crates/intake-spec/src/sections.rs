use std::collections::BTreeMap;

use crate::spec::question::{ConditionalRule, QuestionSpec};

/// Questions sharing one section number, rendered as one wizard step.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub number: u32,
    pub title: Option<String>,
    pub description: Option<String>,
    pub questions: Vec<QuestionSpec>,
}

impl Section {
    fn first(&self) -> Option<&QuestionSpec> {
        self.questions.first()
    }

    /// Visibility rule carried by the first question.
    pub fn condition(&self) -> Option<ConditionalRule> {
        self.first().and_then(QuestionSpec::conditional_rule)
    }

    /// Repeatable group backing this section, if any question is repeatable.
    pub fn repeat_group(&self) -> Option<&str> {
        self.questions.iter().find_map(QuestionSpec::repeat_group)
    }

    pub fn display_title(&self) -> String {
        self.title
            .clone()
            .unwrap_or_else(|| format!("Section {}", self.number))
    }
}

/// Sections keyed and ordered by section number.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SectionMap {
    sections: BTreeMap<u32, Section>,
    /// (section number, index within section) per question, in schema order.
    order: Vec<(u32, usize)>,
}

impl SectionMap {
    pub fn get(&self, number: u32) -> Option<&Section> {
        self.sections.get(&number)
    }

    /// Distinct section numbers, ascending.
    pub fn numbers(&self) -> Vec<u32> {
        self.sections.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Section> {
        self.sections.values()
    }

    /// Every question in schema declaration order.
    pub fn questions(&self) -> impl Iterator<Item = &QuestionSpec> {
        self.order.iter().filter_map(|(number, index)| {
            self.sections
                .get(number)
                .and_then(|section| section.questions.get(*index))
        })
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

/// Partitions `questions` by `section_number`, keeping their relative order.
pub fn group_sections(questions: &[QuestionSpec]) -> SectionMap {
    let mut sections: BTreeMap<u32, Section> = BTreeMap::new();
    let mut order = Vec::with_capacity(questions.len());
    for question in questions {
        let section = sections
            .entry(question.section_number)
            .or_insert_with(|| Section {
                number: question.section_number,
                title: question.section_title.clone(),
                description: question.section_description.clone(),
                questions: Vec::new(),
            });
        order.push((question.section_number, section.questions.len()));
        section.questions.push(question.clone());
    }
    SectionMap { sections, order }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::question::QuestionType;

    #[test]
    fn title_comes_from_first_question_only() {
        let mut first = QuestionSpec::new("a", "A", QuestionType::Text).in_section(2);
        first.section_title = Some("Entity".into());
        let mut second = QuestionSpec::new("b", "B", QuestionType::Text).in_section(2);
        second.section_title = Some("Ignored".into());

        let map = group_sections(&[first, second]);
        let section = map.get(2).expect("section 2");
        assert_eq!(section.title.as_deref(), Some("Entity"));
        assert_eq!(map.get(1), None);
    }

    #[test]
    fn untitled_section_falls_back_to_number() {
        let map = group_sections(&[QuestionSpec::new("a", "A", QuestionType::Text).in_section(4)]);
        assert_eq!(map.get(4).unwrap().display_title(), "Section 4");
    }

    #[test]
    fn questions_keep_declaration_order() {
        let map = group_sections(&[
            QuestionSpec::new("late", "Late", QuestionType::Text).in_section(3),
            QuestionSpec::new("early", "Early", QuestionType::Text),
            QuestionSpec::new("later", "Later", QuestionType::Text).in_section(3),
        ]);
        let ids: Vec<&str> = map.questions().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, vec!["late", "early", "later"]);
        assert_eq!(map.numbers(), vec![1, 3]);
    }
}
