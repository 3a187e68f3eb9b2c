use crate::config::Config;
use crate::cost::CostInput;
use crate::errors::AppError;
use crate::models::*;
use crate::question::{decode_options, Question, QuestionKind};
use bigdecimal::BigDecimal;
use moka::future::Cache;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use uuid::Uuid;

fn build_client(config: &Config) -> Client {
    Client::builder()
        .timeout(config.request_timeout())
        // Session continuity is cookie-based; no token is retained client-side
        .cookie_store(true)
        .build()
        .unwrap_or_default()
}

/// Drains a non-success response into the matching `AppError` variant.
async fn classify_failure(response: reqwest::Response) -> AppError {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    tracing::warn!("API returned error {}: {}", status, body);
    AppError::from_response(status, &body)
}

// ============ Survey API ============

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyCreateRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub introduction: Option<String>,
    #[serde(rename = "type")]
    pub survey_type: SurveyType,
    pub access_type: AccessType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_respondents: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<BigDecimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward_amount: Option<BigDecimal>,
    pub questions: Vec<Question>,
}

pub struct SurveyService {
    client: Client,
    base_url: String,
    definition_cache: Cache<i64, Survey>,
}

impl SurveyService {
    pub fn new(config: &Config) -> Self {
        // Definition cache serves respondent sessions; activation decisions
        // always bypass it and re-fetch
        let definition_cache = Cache::builder()
            .time_to_live(Duration::from_secs(config.survey_cache_ttl_secs))
            .max_capacity(1_000)
            .build();
        Self {
            client: build_client(config),
            base_url: config.api_base_url.clone(),
            definition_cache,
        }
    }

    pub async fn create(&self, request: &SurveyCreateRequest) -> Result<Survey, AppError> {
        let url = format!("{}/surveys", self.base_url);
        tracing::info!("Creating survey '{}'", request.name);

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| AppError::ExternalApi(format!("Survey create failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(classify_failure(response).await);
        }

        let survey: Survey = response.json().await.map_err(|e| {
            AppError::ExternalApi(format!("Failed to parse survey response: {}", e))
        })?;
        tracing::info!("Created survey {} in DRAFT", survey.id);
        Ok(survey)
    }

    /// Fetches a survey definition, bypassing the cache.
    pub async fn get(&self, survey_id: i64) -> Result<Survey, AppError> {
        let url = format!("{}/surveys/{}", self.base_url, survey_id);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::ExternalApi(format!("Survey fetch failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(classify_failure(response).await);
        }

        response.json().await.map_err(|e| {
            AppError::ExternalApi(format!("Failed to parse survey response: {}", e))
        })
    }

    /// Cached definition lookup for respondent sessions.
    pub async fn get_cached(&self, survey_id: i64) -> Result<Survey, AppError> {
        if let Some(cached) = self.definition_cache.get(&survey_id).await {
            tracing::debug!("Survey {} served from definition cache", survey_id);
            return Ok(cached);
        }
        let survey = self.get(survey_id).await?;
        self.definition_cache.insert(survey_id, survey.clone()).await;
        Ok(survey)
    }

    pub async fn update(&self, survey_id: i64, request: &SurveyCreateRequest) -> Result<Survey, AppError> {
        let url = format!("{}/surveys/{}", self.base_url, survey_id);
        tracing::info!("Updating survey {}", survey_id);

        let response = self
            .client
            .put(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| AppError::ExternalApi(format!("Survey update failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(classify_failure(response).await);
        }

        // Edits invalidate any cached definition
        self.definition_cache.invalidate(&survey_id).await;

        response.json().await.map_err(|e| {
            AppError::ExternalApi(format!("Failed to parse survey response: {}", e))
        })
    }

    pub async fn activate(&self, survey_id: i64) -> Result<Survey, AppError> {
        let url = format!("{}/surveys/{}/activate", self.base_url, survey_id);
        tracing::info!("Requesting activation of survey {}", survey_id);

        let response = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(|e| AppError::ExternalApi(format!("Survey activation failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(classify_failure(response).await);
        }

        self.definition_cache.invalidate(&survey_id).await;

        let survey: Survey = response.json().await.map_err(|e| {
            AppError::ExternalApi(format!("Failed to parse activation response: {}", e))
        })?;
        tracing::info!("Survey {} is now {:?}", survey.id, survey.status);
        Ok(survey)
    }

    pub async fn list_mine(&self) -> Result<Vec<Survey>, AppError> {
        let url = format!("{}/surveys/my-surveys", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::ExternalApi(format!("Survey list failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(classify_failure(response).await);
        }

        response.json().await.map_err(|e| {
            AppError::ExternalApi(format!("Failed to parse survey list: {}", e))
        })
    }
}

// ============ Templates ============

pub struct TemplateService {
    client: Client,
    base_url: String,
}

impl TemplateService {
    pub fn new(config: &Config) -> Self {
        Self {
            client: build_client(config),
            base_url: config.api_base_url.clone(),
        }
    }

    pub async fn templates_by_type(&self, survey_type: SurveyType) -> Result<Vec<Template>, AppError> {
        let url = reqwest::Url::parse_with_params(
            &format!("{}/templates/filter/type", self.base_url),
            &[("type", format!("{:?}", survey_type))],
        )
        .map_err(|e| AppError::ExternalApi(format!("Failed to build URL: {}", e)))?;

        tracing::info!("Fetching templates for {:?}", survey_type);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::ExternalApi(format!("Template fetch failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(classify_failure(response).await);
        }

        response.json().await.map_err(|e| {
            AppError::ExternalApi(format!("Failed to parse template list: {}", e))
        })
    }
}

// ============ Cost calculation ============

pub struct CostService {
    client: Client,
    base_url: String,
}

impl CostService {
    pub fn new(config: &Config) -> Self {
        Self {
            client: build_client(config),
            base_url: config.api_base_url.clone(),
        }
    }

    /// Quotes the funding requirement for one cost-driving input. Read-only:
    /// the wallet is never mutated from here.
    pub async fn calculate(&self, input: &CostInput) -> Result<CostEstimate, AppError> {
        let url = format!("{}/surveys/cost/calculate", self.base_url);
        let body = match input {
            CostInput::TargetRespondents(target) => json!({ "targetRespondents": target }),
            CostInput::Budget(budget) => json!({ "budget": budget }),
        };

        tracing::debug!("Requesting cost calculation for {:?}", input);

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ExternalApi(format!("Cost calculation failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(classify_failure(response).await);
        }

        response.json().await.map_err(|e| {
            AppError::ExternalApi(format!("Failed to parse cost estimate: {}", e))
        })
    }
}

// ============ Responses & participants ============

pub struct ResponseService {
    client: Client,
    base_url: String,
}

impl ResponseService {
    pub fn new(config: &Config) -> Self {
        Self {
            client: build_client(config),
            base_url: config.api_base_url.clone(),
        }
    }

    pub async fn submit(&self, submission: &ResponseSubmission) -> Result<(), AppError> {
        let url = format!("{}/surveys/{}/responses", self.base_url, submission.survey_id);
        tracing::info!(
            "Submitting response with {} answers for survey {}",
            submission.answers.len(),
            submission.survey_id
        );

        let response = self
            .client
            .post(&url)
            .json(submission)
            .send()
            .await
            .map_err(|e| AppError::SubmissionFailure(format!("Response submit failed: {}", e)))?;

        if !response.status().is_success() {
            let err = classify_failure(response).await;
            // Auth failures keep their own recovery path; everything else is
            // a retryable submission failure
            return match err {
                AppError::Unauthorized(_) => Err(err),
                other => Err(AppError::SubmissionFailure(other.to_string())),
            };
        }

        tracing::info!("Response submitted for survey {}", submission.survey_id);
        Ok(())
    }
}

pub struct ParticipantService {
    client: Client,
    base_url: String,
}

impl ParticipantService {
    pub fn new(config: &Config) -> Self {
        Self {
            client: build_client(config),
            base_url: config.api_base_url.clone(),
        }
    }

    pub async fn register(&self, details: &ParticipantDetails) -> Result<Participant, AppError> {
        let url = format!("{}/participants", self.base_url);
        tracing::info!("Registering reward-claim participant");

        let response = self
            .client
            .post(&url)
            .json(details)
            .send()
            .await
            .map_err(|e| AppError::ExternalApi(format!("Participant register failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(classify_failure(response).await);
        }

        response.json().await.map_err(|e| {
            AppError::ExternalApi(format!("Failed to parse participant response: {}", e))
        })
    }
}

// ============ Billing ============

pub struct BillingService {
    client: Client,
    base_url: String,
}

impl BillingService {
    pub fn new(config: &Config) -> Self {
        Self {
            client: build_client(config),
            base_url: config.api_base_url.clone(),
        }
    }

    pub async fn wallet_balance(&self) -> Result<BigDecimal, AppError> {
        let url = format!("{}/billing/wallet/balance", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::ExternalApi(format!("Wallet balance fetch failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(classify_failure(response).await);
        }

        response.json().await.map_err(|e| {
            AppError::ExternalApi(format!("Failed to parse wallet balance: {}", e))
        })
    }

    pub async fn current_plan(&self) -> Result<SubscriptionPlan, AppError> {
        let url = format!("{}/subscriptions/current", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::ExternalApi(format!("Plan fetch failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(classify_failure(response).await);
        }

        response.json().await.map_err(|e| {
            AppError::ExternalApi(format!("Failed to parse subscription plan: {}", e))
        })
    }
}

// ============ Payments ============

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct PaymentInitiateRequest {
    amount: BigDecimal,
    currency: String,
    subject: String,
    idempotency_key: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaymentVerifyResponse {
    status: PaymentStatus,
}

pub struct PaymentService {
    client: Client,
    base_url: String,
}

impl PaymentService {
    pub fn new(config: &Config) -> Self {
        Self {
            client: build_client(config),
            base_url: config.api_base_url.clone(),
        }
    }

    /// One fresh key per payment attempt; never reused across retries.
    pub fn fresh_idempotency_key() -> String {
        format!("pay_{}", Uuid::new_v4())
    }

    pub async fn initiate(
        &self,
        amount: BigDecimal,
        currency: &str,
        subject: &PaymentSubject,
        idempotency_key: String,
    ) -> Result<PaymentIntent, AppError> {
        let url = format!("{}/payments", self.base_url);
        let request = PaymentInitiateRequest {
            amount,
            currency: currency.to_string(),
            subject: subject.as_wire(),
            idempotency_key,
        };

        tracing::info!(
            "Initiating payment of {} {} for {}",
            request.amount,
            request.currency,
            request.subject
        );

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::PaymentProvider(format!("Payment initiation failed: {}", e)))?;

        if !response.status().is_success() {
            let err = classify_failure(response).await;
            return match err {
                AppError::Unauthorized(_) => Err(err),
                other => Err(AppError::PaymentProvider(other.to_string())),
            };
        }

        let intent: PaymentIntent = response.json().await.map_err(|e| {
            AppError::PaymentProvider(format!("Failed to parse payment intent: {}", e))
        })?;
        tracing::info!("Payment intent created, reference {}", intent.reference);
        Ok(intent)
    }

    /// Verify-by-reference after the provider redirect. The redirect outcome
    /// itself is untrusted; only this call decides.
    pub async fn verify(&self, reference: &str) -> Result<PaymentStatus, AppError> {
        let url = format!("{}/payments/verify/{}", self.base_url, reference);
        tracing::info!("Verifying payment {}", reference);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::PaymentProvider(format!("Payment verify failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(classify_failure(response).await);
        }

        let verification: PaymentVerifyResponse = response.json().await.map_err(|e| {
            AppError::PaymentProvider(format!("Failed to parse verification: {}", e))
        })?;
        Ok(verification.status)
    }
}

// ============ AI question generation ============

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub topic: String,
    #[serde(rename = "type")]
    pub survey_type: SurveyType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_count: Option<u32>,
}

/// The generation endpoint's question shape: different field names from the
/// survey API, and options arrive as a serialized JSON-array string.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeneratedQuestionWire {
    question_text: String,
    question_type: String,
    #[serde(default)]
    options: Option<String>,
    #[serde(default)]
    position: u32,
}

pub struct AiService {
    client: Client,
    base_url: String,
}

impl AiService {
    pub fn new(config: &Config) -> Self {
        Self {
            client: build_client(config),
            base_url: config.api_base_url.clone(),
        }
    }

    pub async fn generate_questions(
        &self,
        request: &GenerationRequest,
    ) -> Result<Vec<Question>, AppError> {
        let url = format!("{}/ai/questions/generate", self.base_url);
        tracing::info!("Requesting AI question generation for '{}'", request.topic);

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| AppError::GenerationFailure(format!("Generation call failed: {}", e)))?;

        if !response.status().is_success() {
            let err = classify_failure(response).await;
            return match err {
                AppError::Unauthorized(_) => Err(err),
                other => Err(AppError::GenerationFailure(other.to_string())),
            };
        }

        let generated: Vec<GeneratedQuestionWire> = response.json().await.map_err(|e| {
            AppError::GenerationFailure(format!("Failed to parse generated questions: {}", e))
        })?;

        tracing::info!("Received {} generated questions", generated.len());

        Ok(generated
            .into_iter()
            .map(|wire| {
                let options = wire
                    .options
                    .as_deref()
                    .map(|raw| decode_options(Some(&serde_json::Value::String(raw.to_string()))))
                    .unwrap_or_default();
                let kind = match wire.question_type.as_str() {
                    "FREE_TEXT" => QuestionKind::FreeText,
                    "MULTIPLE_CHOICE_SINGLE" => QuestionKind::MultipleChoiceSingle { options },
                    "MULTIPLE_CHOICE_MULTI" => QuestionKind::MultipleChoiceMulti { options },
                    "RATING_LINEAR" => QuestionKind::RatingLinear,
                    "RATING_STAR" => QuestionKind::RatingStar,
                    "NPS_SCALE" => QuestionKind::NpsScale,
                    other => QuestionKind::Other(other.to_string()),
                };
                Question {
                    id: 0,
                    text: wire.question_text,
                    required: true,
                    kind,
                    position: wire.position,
                }
            })
            .collect())
    }
}
