use std::sync::Arc;

use bigdecimal::BigDecimal;

use crate::cost::CostInput;
use crate::errors::AppError;
use crate::models::{PaymentIntent, PaymentStatus, PaymentSubject, Survey, SurveyStatus};
use crate::services::{BillingService, CostService, PaymentService, SurveyService};

/// What happened when activation was attempted.
#[derive(Debug, Clone)]
pub enum ActivationOutcome {
    Activated(Survey),
    /// Funds were short; a top-up payment was initiated and the caller must
    /// complete it at `intent.authorization_url`, then resume with the
    /// intent's reference.
    AwaitingFunds {
        intent: PaymentIntent,
        shortfall: BigDecimal,
    },
}

/// The only path from DRAFT to ACTIVE.
///
/// Every attempt re-quotes the cost against the live wallet balance; no
/// cached estimate is ever trusted here. A survey whose cost exceeds the
/// balance is never activated.
pub struct ActivationGate {
    surveys: Arc<SurveyService>,
    costs: Arc<CostService>,
    billing: Arc<BillingService>,
    payments: Arc<PaymentService>,
    currency: String,
}

impl ActivationGate {
    pub fn new(
        surveys: Arc<SurveyService>,
        costs: Arc<CostService>,
        billing: Arc<BillingService>,
        payments: Arc<PaymentService>,
        currency: String,
    ) -> Self {
        Self {
            surveys,
            costs,
            billing,
            payments,
            currency,
        }
    }

    /// Attempts to activate `survey_id`, initiating a wallet top-up when the
    /// fresh quote exceeds the balance.
    pub async fn attempt_activate(&self, survey_id: i64) -> Result<ActivationOutcome, AppError> {
        // Always a fresh fetch; the definition cache serves sessions only
        let survey = self.surveys.get(survey_id).await?;
        self.check_activatable(&survey)?;

        let input = match cost_input_for(&survey) {
            Some(input) => input,
            None => {
                // No cost-driving field means a free survey
                tracing::info!("Survey {} has no funded target, activating directly", survey_id);
                let activated = self.surveys.activate(survey_id).await?;
                return Ok(ActivationOutcome::Activated(activated));
            }
        };

        let estimate = self.costs.calculate(&input).await?;
        if estimate.is_free() || estimate.is_sufficient_funds {
            let activated = self.surveys.activate(survey_id).await?;
            return Ok(ActivationOutcome::Activated(activated));
        }

        let shortfall = estimate.required_top_up_amount.clone();
        tracing::info!(
            "Survey {} needs a top-up of {} {} before activation",
            survey_id,
            shortfall,
            self.currency
        );

        let intent = self
            .payments
            .initiate(
                shortfall.clone(),
                &self.currency,
                &PaymentSubject::WalletTopUp,
                PaymentService::fresh_idempotency_key(),
            )
            .await?;

        Ok(ActivationOutcome::AwaitingFunds { intent, shortfall })
    }

    /// Resumes activation after the author returns from the payment page.
    ///
    /// The payment is verified by reference, never trusted from the redirect.
    /// Activation is retried exactly once; if funds are still short after a
    /// verified successful top-up, the caller gets a terminal error rather
    /// than another payment loop.
    pub async fn resume_after_topup(
        &self,
        survey_id: i64,
        reference: &str,
    ) -> Result<Survey, AppError> {
        let status = self.payments.verify(reference).await?;
        if status != PaymentStatus::Success {
            return Err(AppError::PaymentProvider(format!(
                "Top-up {} did not complete (status {:?})",
                reference, status
            )));
        }

        let survey = self.surveys.get(survey_id).await?;
        self.check_activatable(&survey)?;

        if let Some(input) = cost_input_for(&survey) {
            let estimate = self.costs.calculate(&input).await?;
            if !estimate.is_free() && !estimate.is_sufficient_funds {
                let balance = self.billing.wallet_balance().await.unwrap_or_else(|_| {
                    estimate.current_wallet_balance.clone()
                });
                tracing::error!(
                    "Wallet still short after verified top-up {}: balance {}, needs {} more",
                    reference,
                    balance,
                    estimate.required_top_up_amount
                );
                return Err(AppError::TopupInsufficientAfterPayment {
                    shortfall: estimate.required_top_up_amount,
                });
            }
        }

        self.surveys.activate(survey_id).await
    }

    fn check_activatable(&self, survey: &Survey) -> Result<(), AppError> {
        match survey.status {
            SurveyStatus::Draft | SurveyStatus::Paused => Ok(()),
            SurveyStatus::Active => Err(AppError::Validation(format!(
                "Survey {} is already active",
                survey.id
            ))),
            status => Err(AppError::Validation(format!(
                "Survey {} cannot be activated from {:?}",
                survey.id, status
            ))),
        }
    }
}

/// Picks the user-driven cost field. `None` means the survey carries no
/// funded target at all.
fn cost_input_for(survey: &Survey) -> Option<CostInput> {
    if let Some(target) = survey.target_respondents {
        return Some(CostInput::TargetRespondents(target));
    }
    survey.budget.clone().map(CostInput::Budget)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccessType, SurveyType};

    fn survey(status: SurveyStatus) -> Survey {
        Survey {
            id: 1,
            name: "Test".to_string(),
            introduction: None,
            survey_type: SurveyType::NPS,
            status,
            access_type: AccessType::Public,
            start_date: None,
            end_date: None,
            target_respondents: None,
            budget: None,
            reward_amount: None,
            distribution_list_id: None,
            questions: Vec::new(),
        }
    }

    #[test]
    fn target_wins_over_budget() {
        let mut s = survey(SurveyStatus::Draft);
        s.target_respondents = Some(50);
        s.budget = Some(BigDecimal::from(100));
        assert_eq!(cost_input_for(&s), Some(CostInput::TargetRespondents(50)));
    }

    #[test]
    fn budget_only_selects_budget() {
        let mut s = survey(SurveyStatus::Draft);
        s.budget = Some(BigDecimal::from(100));
        assert_eq!(
            cost_input_for(&s),
            Some(CostInput::Budget(BigDecimal::from(100)))
        );
    }

    #[test]
    fn unfunded_survey_has_no_cost_input() {
        assert_eq!(cost_input_for(&survey(SurveyStatus::Draft)), None);
    }
}
