use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::question::Question;

// ============ Survey ============

/// Survey archetype determining default question semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurveyType {
    /// Net Promoter Score.
    NPS,
    /// Customer Effort Score.
    CES,
    /// Customer Satisfaction.
    CSAT,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessType {
    Public,
    Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SurveyStatus {
    Draft,
    Active,
    Paused,
    Closed,
    Completed,
    Expired,
}

impl SurveyStatus {
    /// Closed and expired surveys are retired; no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SurveyStatus::Closed | SurveyStatus::Expired)
    }
}

/// A survey as persisted by the survey-engine API.
///
/// Created in DRAFT by the builder wizard; only the activation gate mutates
/// its status afterwards. Exactly one of `target_respondents` and `budget`
/// is the user-driven field at any time (the estimator derives the other).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Survey {
    pub id: i64,
    pub name: String,
    /// Optional introduction shown to respondents before the first question.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub introduction: Option<String>,
    #[serde(rename = "type")]
    pub survey_type: SurveyType,
    pub status: SurveyStatus,
    pub access_type: AccessType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_respondents: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<BigDecimal>,
    /// Reward paid per completed response; `None` or zero means no reward.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward_amount: Option<BigDecimal>,
    /// Externally managed contact list; collaborator concern, id only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distribution_list_id: Option<i64>,
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl Survey {
    pub fn has_reward(&self) -> bool {
        self.reward_amount
            .as_ref()
            .map(|amount| amount > &BigDecimal::from(0))
            .unwrap_or(false)
    }
}

// ============ Templates ============

/// A reusable question set offered on the wizard's content step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub questions: Vec<Question>,
}

// ============ Cost estimation ============

/// Outcome of one cost calculation. Transient; recomputed on demand and
/// never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostEstimate {
    pub target_respondents: u32,
    pub cost_per_respondent: BigDecimal,
    pub estimated_cost: BigDecimal,
    pub current_wallet_balance: BigDecimal,
    pub is_sufficient_funds: bool,
    /// `estimated_cost - current_wallet_balance`, floored at zero.
    pub required_top_up_amount: BigDecimal,
}

impl CostEstimate {
    pub fn is_free(&self) -> bool {
        self.estimated_cost == BigDecimal::from(0)
    }
}

// ============ Payments ============

/// What a payment pays for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentSubject {
    Survey(i64),
    WalletTopUp,
}

impl PaymentSubject {
    pub fn as_wire(&self) -> String {
        match self {
            PaymentSubject::Survey(id) => id.to_string(),
            PaymentSubject::WalletTopUp => "WALLET_TOPUP".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
    Abandoned,
}

/// A payment attempt handed off to the provider's redirect page.
///
/// Each intent carries a freshly generated idempotency key; keys are never
/// reused across attempts, including retries of a failed submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntent {
    pub amount: BigDecimal,
    pub currency: String,
    pub subject: String,
    pub idempotency_key: String,
    pub authorization_url: String,
    /// Server-generated reference used to verify the outcome after redirect.
    pub reference: String,
    pub status: PaymentStatus,
}

// ============ Participants & responses ============

/// Contact details collected for a reward claim, before registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantDetails {
    pub full_name: String,
    pub phone_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// A registered reward-claim participant, linked 1:1 to the response it
/// accompanies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: i64,
    pub full_name: String,
    pub phone_number: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// One answered question inside a submission payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerSubmission {
    pub question_id: i64,
    pub answer: String,
}

/// The bundle submitted exactly once per completed session traversal.
/// Immutable after submission succeeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseSubmission {
    pub survey_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_id: Option<i64>,
    pub answers: Vec<AnswerSubmission>,
    pub submitted_at: DateTime<Utc>,
}

// ============ Billing ============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionPlan {
    pub plan_name: String,
    #[serde(default)]
    pub max_active_surveys: Option<u32>,
    #[serde(default)]
    pub max_respondents_per_survey: Option<u32>,
}
