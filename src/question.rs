use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The closed set of question variants. Options live only on the choice
/// variants; everything the wire reports that we do not recognize lands in
/// `Other` and renders as a plain text input with no domain validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionKind {
    FreeText,
    MultipleChoiceSingle { options: Vec<String> },
    MultipleChoiceMulti { options: Vec<String> },
    /// Integer rating in [1, 10].
    RatingLinear,
    /// Integer rating in [1, 5].
    RatingStar,
    /// Integer rating in [0, 10].
    NpsScale,
    /// Unrecognized wire type; explicit escape hatch, not an error.
    Other(String),
}

impl QuestionKind {
    pub fn wire_name(&self) -> &str {
        match self {
            QuestionKind::FreeText => "FREE_TEXT",
            QuestionKind::MultipleChoiceSingle { .. } => "MULTIPLE_CHOICE_SINGLE",
            QuestionKind::MultipleChoiceMulti { .. } => "MULTIPLE_CHOICE_MULTI",
            QuestionKind::RatingLinear => "RATING_LINEAR",
            QuestionKind::RatingStar => "RATING_STAR",
            QuestionKind::NpsScale => "NPS_SCALE",
            QuestionKind::Other(name) => name,
        }
    }

    fn from_wire(name: &str, options: Vec<String>) -> Self {
        match name {
            "FREE_TEXT" => QuestionKind::FreeText,
            "MULTIPLE_CHOICE_SINGLE" => QuestionKind::MultipleChoiceSingle { options },
            "MULTIPLE_CHOICE_MULTI" => QuestionKind::MultipleChoiceMulti { options },
            "RATING_LINEAR" => QuestionKind::RatingLinear,
            "RATING_STAR" => QuestionKind::RatingStar,
            "NPS_SCALE" => QuestionKind::NpsScale,
            other => QuestionKind::Other(other.to_string()),
        }
    }

    fn options(&self) -> Option<&[String]> {
        match self {
            QuestionKind::MultipleChoiceSingle { options }
            | QuestionKind::MultipleChoiceMulti { options } => Some(options),
            _ => None,
        }
    }
}

/// A recorded answer. Submission always serializes down to the string form
/// the backend stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Integer(i64),
    Text(String),
    Multi(Vec<String>),
}

impl AnswerValue {
    pub fn is_empty(&self) -> bool {
        match self {
            AnswerValue::Integer(_) => false,
            AnswerValue::Text(text) => text.trim().is_empty(),
            AnswerValue::Multi(selected) => selected.is_empty(),
        }
    }

    pub fn to_submission_string(&self) -> String {
        match self {
            AnswerValue::Integer(n) => n.to_string(),
            AnswerValue::Text(text) => text.clone(),
            AnswerValue::Multi(selected) => {
                serde_json::to_string(selected).unwrap_or_default()
            }
        }
    }
}

/// A survey question. Identity is stable once any response references it;
/// draft-local ids are replaced by the API on create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "QuestionWire", into = "QuestionWire")]
pub struct Question {
    pub id: i64,
    pub text: String,
    pub required: bool,
    pub kind: QuestionKind,
    pub position: u32,
}

impl Question {
    /// Validates a recorded answer against this question's contract.
    ///
    /// An absent answer is only an error for required questions; choice
    /// answers must be drawn from the decoded options; ratings must fall in
    /// their variant's integer range.
    pub fn validate(&self, answer: Option<&AnswerValue>) -> Result<(), ValidationReason> {
        let answer = match answer {
            Some(value) if !value.is_empty() => value,
            _ => {
                return if self.required {
                    Err(ValidationReason::Required)
                } else {
                    Ok(())
                };
            }
        };

        match &self.kind {
            QuestionKind::FreeText | QuestionKind::Other(_) => Ok(()),
            QuestionKind::MultipleChoiceSingle { options } => match answer {
                AnswerValue::Text(choice) if options.contains(choice) => Ok(()),
                _ => Err(ValidationReason::NotAnOption),
            },
            QuestionKind::MultipleChoiceMulti { options } => match answer {
                AnswerValue::Multi(selected)
                    if selected.iter().all(|choice| options.contains(choice)) =>
                {
                    Ok(())
                }
                AnswerValue::Text(choice) if options.contains(choice) => Ok(()),
                _ => Err(ValidationReason::NotAnOption),
            },
            QuestionKind::RatingLinear => rating_in_range(answer, 1, 10),
            QuestionKind::RatingStar => rating_in_range(answer, 1, 5),
            QuestionKind::NpsScale => rating_in_range(answer, 0, 10),
        }
    }
}

fn rating_in_range(answer: &AnswerValue, min: i64, max: i64) -> Result<(), ValidationReason> {
    match answer {
        AnswerValue::Integer(n) if (min..=max).contains(n) => Ok(()),
        // Respondents typing into a fallback input still count if parseable
        AnswerValue::Text(text) => match text.trim().parse::<i64>() {
            Ok(n) if (min..=max).contains(&n) => Ok(()),
            _ => Err(ValidationReason::OutOfRange { min, max }),
        },
        _ => Err(ValidationReason::OutOfRange { min, max }),
    }
}

/// Why an answer was rejected. Field-level; recovered inline, never aborts
/// the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationReason {
    Required,
    NotAnOption,
    OutOfRange { min: i64, max: i64 },
}

impl std::fmt::Display for ValidationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationReason::Required => write!(f, "An answer is required"),
            ValidationReason::NotAnOption => write!(f, "Answer must be one of the listed options"),
            ValidationReason::OutOfRange { min, max } => {
                write!(f, "Answer must be a whole number between {} and {}", min, max)
            }
        }
    }
}

// ============ Wire format ============

/// On the wire a question is a type tag plus a separate options field; the
/// options may arrive either as a JSON array or as a serialized JSON-array
/// string (the AI generation endpoint produces the latter).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuestionWire {
    #[serde(default)]
    id: i64,
    text: String,
    #[serde(rename = "type")]
    question_type: String,
    #[serde(default = "default_required")]
    required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    options: Option<Value>,
    #[serde(default)]
    position: u32,
}

fn default_required() -> bool {
    true
}

/// Decodes the wire `options` field into an ordered list.
pub fn decode_options(raw: Option<&Value>) -> Vec<String> {
    match raw {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_owned))
            .collect(),
        Some(Value::String(serialized)) => {
            serde_json::from_str::<Vec<String>>(serialized).unwrap_or_default()
        }
        _ => Vec::new(),
    }
}

impl From<QuestionWire> for Question {
    fn from(wire: QuestionWire) -> Self {
        let options = decode_options(wire.options.as_ref());
        Question {
            id: wire.id,
            text: wire.text,
            required: wire.required,
            kind: QuestionKind::from_wire(&wire.question_type, options),
            position: wire.position,
        }
    }
}

impl From<Question> for QuestionWire {
    fn from(question: Question) -> Self {
        let options = question
            .kind
            .options()
            .map(|options| Value::Array(options.iter().cloned().map(Value::String).collect()));
        QuestionWire {
            id: question.id,
            text: question.text,
            question_type: question.kind.wire_name().to_string(),
            required: question.required,
            options,
            position: question.position,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(kind: QuestionKind, required: bool) -> Question {
        Question {
            id: 1,
            text: "How likely are you to recommend us?".to_string(),
            required,
            kind,
            position: 0,
        }
    }

    #[test]
    fn required_free_text_rejects_empty() {
        let q = question(QuestionKind::FreeText, true);
        assert_eq!(q.validate(None), Err(ValidationReason::Required));
        assert_eq!(
            q.validate(Some(&AnswerValue::Text("   ".into()))),
            Err(ValidationReason::Required)
        );
        assert_eq!(q.validate(Some(&AnswerValue::Text("great".into()))), Ok(()));
    }

    #[test]
    fn optional_free_text_allows_empty() {
        let q = question(QuestionKind::FreeText, false);
        assert_eq!(q.validate(None), Ok(()));
        assert_eq!(q.validate(Some(&AnswerValue::Text(String::new()))), Ok(()));
    }

    #[test]
    fn single_choice_must_be_listed() {
        let q = question(
            QuestionKind::MultipleChoiceSingle {
                options: vec!["Yes".into(), "No".into()],
            },
            true,
        );
        assert_eq!(q.validate(Some(&AnswerValue::Text("Yes".into()))), Ok(()));
        assert_eq!(
            q.validate(Some(&AnswerValue::Text("Maybe".into()))),
            Err(ValidationReason::NotAnOption)
        );
    }

    #[test]
    fn nps_scale_bounds() {
        let q = question(QuestionKind::NpsScale, true);
        assert_eq!(q.validate(Some(&AnswerValue::Integer(0))), Ok(()));
        assert_eq!(q.validate(Some(&AnswerValue::Integer(10))), Ok(()));
        assert_eq!(
            q.validate(Some(&AnswerValue::Integer(11))),
            Err(ValidationReason::OutOfRange { min: 0, max: 10 })
        );
    }

    #[test]
    fn star_rating_bounds() {
        let q = question(QuestionKind::RatingStar, true);
        assert_eq!(q.validate(Some(&AnswerValue::Integer(5))), Ok(()));
        assert_eq!(
            q.validate(Some(&AnswerValue::Integer(6))),
            Err(ValidationReason::OutOfRange { min: 1, max: 5 })
        );
    }

    #[test]
    fn unknown_type_accepts_anything() {
        let q = question(QuestionKind::Other("RANKING".into()), true);
        assert_eq!(q.validate(Some(&AnswerValue::Text("whatever".into()))), Ok(()));
    }

    #[test]
    fn options_decode_from_array_and_string() {
        let from_array = decode_options(Some(&serde_json::json!(["A", "B"])));
        assert_eq!(from_array, vec!["A".to_string(), "B".to_string()]);

        let from_string = decode_options(Some(&Value::String(r#"["A","B"]"#.into())));
        assert_eq!(from_string, vec!["A".to_string(), "B".to_string()]);

        assert!(decode_options(None).is_empty());
    }

    #[test]
    fn unknown_wire_type_round_trips() {
        let parsed: Question = serde_json::from_value(serde_json::json!({
            "id": 7,
            "text": "Rank these",
            "type": "RANKING",
            "required": false
        }))
        .unwrap();
        assert_eq!(parsed.kind, QuestionKind::Other("RANKING".into()));

        let wire = serde_json::to_value(&parsed).unwrap();
        assert_eq!(wire["type"], "RANKING");
    }
}
