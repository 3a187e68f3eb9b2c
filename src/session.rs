use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;

use crate::errors::AppError;
use crate::models::{AnswerSubmission, ParticipantDetails, ResponseSubmission, Survey, SurveyStatus};
use crate::participant::validate_claim;
use crate::question::{AnswerValue, Question, ValidationReason};
use crate::services::{ParticipantService, ResponseService};

/// Where a respondent is in the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Answering the question at this index.
    Answering(usize),
    /// Past the last question of a rewarded survey; collecting contact
    /// details (or skipping them).
    RewardClaim,
    /// All questions validated; the bundle can be submitted.
    ReadyToSubmit,
    /// Submission accepted. The session is immutable from here.
    Completed,
}

/// One respondent's traversal of an active survey.
///
/// Movement forward is validation-gated per question; movement backward
/// keeps every recorded answer. The whole answer bundle is submitted exactly
/// once, at the end; a failed submit returns the respondent to the last
/// question with nothing lost.
pub struct SessionRunner {
    responses: Arc<ResponseService>,
    participants: Arc<ParticipantService>,
    phone_region: String,
    survey: Survey,
    answers: HashMap<i64, AnswerValue>,
    state: SessionState,
    participant_id: Option<i64>,
}

impl SessionRunner {
    /// Starts a session. Only ACTIVE surveys accept respondents.
    pub fn start(
        responses: Arc<ResponseService>,
        participants: Arc<ParticipantService>,
        phone_region: String,
        mut survey: Survey,
    ) -> Result<Self, AppError> {
        if survey.status != SurveyStatus::Active {
            return Err(AppError::Validation(format!(
                "Survey {} is not accepting responses ({:?})",
                survey.id, survey.status
            )));
        }
        if survey.questions.is_empty() {
            return Err(AppError::Validation(format!(
                "Survey {} has no questions",
                survey.id
            )));
        }
        survey.questions.sort_by_key(|q| q.position);

        Ok(Self {
            responses,
            participants,
            phone_region,
            survey,
            answers: HashMap::new(),
            state: SessionState::Answering(0),
            participant_id: None,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn survey(&self) -> &Survey {
        &self.survey
    }

    pub fn answers(&self) -> &HashMap<i64, AnswerValue> {
        &self.answers
    }

    pub fn current_question(&self) -> Option<&Question> {
        match self.state {
            SessionState::Answering(index) => self.survey.questions.get(index),
            _ => None,
        }
    }

    /// Records (or overwrites) the answer to a question. Recording is free
    /// of validation; validation happens on `next`.
    pub fn record_answer(&mut self, question_id: i64, answer: AnswerValue) -> Result<(), AppError> {
        match self.state {
            SessionState::Answering(_) => {
                self.answers.insert(question_id, answer);
                Ok(())
            }
            SessionState::Completed => Err(AppError::Validation(
                "Session already completed".to_string(),
            )),
            _ => Err(AppError::Validation(
                "Answers can only change while answering".to_string(),
            )),
        }
    }

    /// Advances past the current question if its answer validates.
    pub fn next(&mut self) -> Result<SessionState, ValidationReason> {
        let index = match self.state {
            SessionState::Answering(index) => index,
            _ => return Ok(self.state),
        };

        let question = &self.survey.questions[index];
        question.validate(self.answers.get(&question.id))?;

        self.state = if index + 1 < self.survey.questions.len() {
            SessionState::Answering(index + 1)
        } else if self.survey.has_reward() {
            SessionState::RewardClaim
        } else {
            SessionState::ReadyToSubmit
        };
        Ok(self.state)
    }

    /// Steps back one question without validation; recorded answers stay
    /// put. Back navigation exists only while answering; the claim and
    /// submit stages do not re-open the questionnaire.
    pub fn previous(&mut self) -> SessionState {
        if let SessionState::Answering(index) = self.state {
            self.state = SessionState::Answering(index.saturating_sub(1));
        }
        self.state
    }

    /// Registers the respondent's contact details for the reward payout.
    pub async fn claim_reward(&mut self, details: ParticipantDetails) -> Result<(), AppError> {
        if self.state != SessionState::RewardClaim {
            return Err(AppError::Validation(
                "No reward claim is open".to_string(),
            ));
        }
        validate_claim(&details, &self.phone_region)?;
        let participant = self.participants.register(&details).await?;
        self.participant_id = Some(participant.id);
        self.state = SessionState::ReadyToSubmit;
        Ok(())
    }

    /// Declines the reward. The response is still submitted anonymously.
    pub fn skip_claim(&mut self) -> Result<(), AppError> {
        if self.state != SessionState::RewardClaim {
            return Err(AppError::Validation(
                "No reward claim is open".to_string(),
            ));
        }
        self.state = SessionState::ReadyToSubmit;
        Ok(())
    }

    /// Submits the full answer bundle. On failure the session drops back to
    /// the last question with every answer intact, ready to retry.
    pub async fn submit(&mut self) -> Result<(), AppError> {
        if self.state != SessionState::ReadyToSubmit {
            return Err(AppError::Validation(
                "Session is not ready to submit".to_string(),
            ));
        }

        let submission = self.build_submission();
        match self.responses.submit(&submission).await {
            Ok(()) => {
                self.state = SessionState::Completed;
                Ok(())
            }
            Err(err) => {
                tracing::warn!("Submission failed for survey {}: {}", self.survey.id, err);
                self.state = SessionState::Answering(self.survey.questions.len() - 1);
                Err(err)
            }
        }
    }

    fn build_submission(&self) -> ResponseSubmission {
        let answers = self
            .survey
            .questions
            .iter()
            .filter_map(|question| {
                self.answers.get(&question.id).map(|answer| AnswerSubmission {
                    question_id: question.id,
                    answer: answer.to_submission_string(),
                })
            })
            .collect();
        ResponseSubmission {
            survey_id: self.survey.id,
            participant_id: self.participant_id,
            answers,
            submitted_at: Utc::now(),
        }
    }
}
