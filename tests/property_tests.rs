use std::collections::HashSet;

use proptest::prelude::*;
use survey_flow::draft::DraftStore;
use survey_flow::question::{AnswerValue, Question, QuestionKind, ValidationReason};
use survey_flow::services::PaymentService;

proptest! {
    #[test]
    fn idempotency_keys_never_collide(count in 2usize..64) {
        let keys: HashSet<String> = (0..count)
            .map(|_| PaymentService::fresh_idempotency_key())
            .collect();
        prop_assert_eq!(keys.len(), count);
    }

    #[test]
    fn nps_validation_matches_its_range(value in -100i64..100) {
        let question = Question {
            id: 1,
            text: "How likely?".to_string(),
            required: true,
            kind: QuestionKind::NpsScale,
            position: 0,
        };
        let outcome = question.validate(Some(&AnswerValue::Integer(value)));
        if (0..=10).contains(&value) {
            prop_assert!(outcome.is_ok());
        } else {
            prop_assert_eq!(outcome, Err(ValidationReason::OutOfRange { min: 0, max: 10 }));
        }
    }

    #[test]
    fn multi_answers_serialize_to_parseable_json(selected in proptest::collection::vec("[a-zA-Z ]{1,20}", 0..8)) {
        let answer = AnswerValue::Multi(selected.clone());
        let wire = answer.to_submission_string();
        let parsed: Vec<String> = serde_json::from_str(&wire).unwrap();
        prop_assert_eq!(parsed, selected);
    }

    #[test]
    fn rating_text_answers_parse_like_integers(value in -20i64..20) {
        let question = Question {
            id: 1,
            text: "Stars?".to_string(),
            required: true,
            kind: QuestionKind::RatingStar,
            position: 0,
        };
        let as_int = question.validate(Some(&AnswerValue::Integer(value)));
        let as_text = question.validate(Some(&AnswerValue::Text(value.to_string())));
        prop_assert_eq!(as_int, as_text);
    }

    // Any interleaving of adds and removes leaves the draft with unique
    // question ids and contiguous positions.
    #[test]
    fn draft_ids_stay_unique_and_positions_contiguous(ops in proptest::collection::vec(proptest::option::of(0usize..16), 1..40)) {
        let mut draft = DraftStore::new();
        for op in ops {
            match op {
                None => {
                    draft.add_question("Q".to_string(), true, QuestionKind::FreeText);
                }
                Some(index) => {
                    if !draft.questions().is_empty() {
                        let id = draft.questions()[index % draft.questions().len()].id;
                        draft.remove_question(id);
                    }
                }
            }
        }

        let ids: HashSet<i64> = draft.questions().iter().map(|q| q.id).collect();
        prop_assert_eq!(ids.len(), draft.questions().len());

        for (expected, question) in draft.questions().iter().enumerate() {
            prop_assert_eq!(question.position as usize, expected);
        }
    }

    #[test]
    fn single_choice_accepts_only_listed_options(choice in "[a-z]{1,10}") {
        let options = vec!["alpha".to_string(), "beta".to_string()];
        let question = Question {
            id: 1,
            text: "Pick".to_string(),
            required: true,
            kind: QuestionKind::MultipleChoiceSingle { options: options.clone() },
            position: 0,
        };
        let outcome = question.validate(Some(&AnswerValue::Text(choice.clone())));
        prop_assert_eq!(outcome.is_ok(), options.contains(&choice));
    }
}
