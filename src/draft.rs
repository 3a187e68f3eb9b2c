use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};

use crate::models::{AccessType, SurveyType};
use crate::question::{Question, QuestionKind};

/// The single in-progress authored survey, exclusively owned by one active
/// wizard instance. Every mutation rewrites the draft atomically through
/// `&mut self`; no partial states are observable between wizard steps.
#[derive(Debug, Clone)]
pub struct DraftStore {
    pub name: String,
    pub introduction: Option<String>,
    pub survey_type: Option<SurveyType>,
    pub access_type: AccessType,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub target_respondents: Option<u32>,
    pub budget: Option<BigDecimal>,
    pub reward_amount: Option<BigDecimal>,
    questions: Vec<Question>,
    next_local_id: i64,
}

impl Default for DraftStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DraftStore {
    pub fn new() -> Self {
        Self {
            name: String::new(),
            introduction: None,
            survey_type: None,
            access_type: AccessType::Public,
            start_date: None,
            end_date: None,
            target_respondents: None,
            budget: None,
            reward_amount: None,
            questions: Vec::new(),
            next_local_id: 1,
        }
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Appends a new question with a fresh draft-local id.
    pub fn add_question(&mut self, text: String, required: bool, kind: QuestionKind) -> i64 {
        let id = self.fresh_id();
        let position = self.questions.len() as u32;
        self.questions.push(Question {
            id,
            text,
            required,
            kind,
            position,
        });
        id
    }

    /// Removes a question by id; remaining questions keep their ids and are
    /// re-positioned to stay contiguous.
    pub fn remove_question(&mut self, question_id: i64) -> bool {
        let before = self.questions.len();
        self.questions.retain(|q| q.id != question_id);
        let removed = self.questions.len() != before;
        if removed {
            self.reposition();
        }
        removed
    }

    /// Applies an edit to a question in place. Returns false when the id is
    /// unknown.
    pub fn update_question<F>(&mut self, question_id: i64, edit: F) -> bool
    where
        F: FnOnce(&mut Question),
    {
        match self.questions.iter_mut().find(|q| q.id == question_id) {
            Some(question) => {
                edit(question);
                true
            }
            None => false,
        }
    }

    /// Replaces the whole question list, assigning fresh local ids. Used by
    /// the template and AI sub-flows, which fully replace existing content.
    pub fn replace_questions(&mut self, incoming: Vec<Question>) {
        self.questions = incoming
            .into_iter()
            .enumerate()
            .map(|(position, mut question)| {
                question.id = self.next_local_id;
                question.position = position as u32;
                self.next_local_id += 1;
                question
            })
            .collect();
    }

    /// Sets the target-respondent count, clearing any budget. Exactly one of
    /// the two cost-driving fields is user-driven at any time.
    pub fn set_target_respondents(&mut self, target: u32) {
        self.target_respondents = Some(target);
        self.budget = None;
    }

    /// Sets the budget, clearing any target-respondent count.
    pub fn set_budget(&mut self, budget: BigDecimal) {
        self.budget = Some(budget);
        self.target_respondents = None;
    }

    /// Discards all authored content. Called on wizard teardown.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    fn fresh_id(&mut self) -> i64 {
        let id = self.next_local_id;
        self.next_local_id += 1;
        id
    }

    fn reposition(&mut self) {
        for (position, question) in self.questions.iter_mut().enumerate() {
            question.position = position as u32;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_three_remove_second_keeps_first_and_third_ids() {
        let mut draft = DraftStore::new();
        let first = draft.add_question("One".into(), true, QuestionKind::FreeText);
        let second = draft.add_question("Two".into(), true, QuestionKind::FreeText);
        let third = draft.add_question("Three".into(), true, QuestionKind::FreeText);

        assert!(draft.remove_question(second));

        let ids: Vec<i64> = draft.questions().iter().map(|q| q.id).collect();
        assert_eq!(ids, vec![first, third]);
        assert_ne!(first, third);

        let positions: Vec<u32> = draft.questions().iter().map(|q| q.position).collect();
        assert_eq!(positions, vec![0, 1]);
    }

    #[test]
    fn cost_driving_fields_are_mutually_exclusive() {
        let mut draft = DraftStore::new();
        draft.set_target_respondents(100);
        assert_eq!(draft.target_respondents, Some(100));
        assert!(draft.budget.is_none());

        draft.set_budget(BigDecimal::from(500));
        assert!(draft.target_respondents.is_none());
        assert_eq!(draft.budget, Some(BigDecimal::from(500)));
    }

    #[test]
    fn replace_assigns_fresh_ids() {
        let mut draft = DraftStore::new();
        let original = draft.add_question("Keep?".into(), true, QuestionKind::FreeText);

        draft.replace_questions(vec![Question {
            id: original,
            text: "Generated".into(),
            required: true,
            kind: QuestionKind::NpsScale,
            position: 9,
        }]);

        assert_eq!(draft.questions().len(), 1);
        assert_ne!(draft.questions()[0].id, original);
        assert_eq!(draft.questions()[0].position, 0);
    }

    #[test]
    fn update_unknown_id_is_a_noop() {
        let mut draft = DraftStore::new();
        draft.add_question("One".into(), true, QuestionKind::FreeText);
        assert!(!draft.update_question(999, |q| q.text = "changed".into()));
        assert_eq!(draft.questions()[0].text, "One");
    }
}
