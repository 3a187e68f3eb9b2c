use bigdecimal::BigDecimal;
use std::fmt;

/// Application-specific error types.
///
/// The variants mirror the failure taxonomy of the survey workflow: most of
/// them are recoverable at the point of failure and never discard
/// user-entered data.
#[derive(Debug, Clone)]
pub enum AppError {
    /// Auth failure from any call; forces an immediate logout transition.
    Unauthorized(String),
    /// Field-level validation error, recovered locally.
    Validation(String),
    /// Wallet balance does not cover the quoted cost; routes to funding.
    InsufficientFunds {
        /// Exact shortfall, floored at zero.
        required_top_up: BigDecimal,
    },
    /// Plan-tier limit exceeded (e.g. respondent cap); routes to upgrade.
    PlanLimitExceeded(String),
    /// AI question generation failed; retryable without losing the topic.
    GenerationFailure(String),
    /// Response submission failed; the session keeps its answers.
    SubmissionFailure(String),
    /// Analytics push channel failed; degrades to the cached aggregate.
    ChannelFailure(String),
    /// Payment provider rejected or failed the transaction.
    PaymentProvider(String),
    /// Balance still insufficient after a completed top-up; not retried.
    TopupInsufficientAfterPayment {
        /// Remaining shortfall after the verified payment.
        shortfall: BigDecimal,
    },
    /// Error interacting with the survey-engine API.
    ExternalApi(String),
    /// Internal error.
    Internal(String),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::Validation(msg) => write!(f, "Validation error: {}", msg),
            AppError::InsufficientFunds { required_top_up } => {
                write!(f, "Insufficient funds: top up of {} required", required_top_up)
            }
            AppError::PlanLimitExceeded(msg) => write!(f, "Plan limit exceeded: {}", msg),
            AppError::GenerationFailure(msg) => write!(f, "Question generation failed: {}", msg),
            AppError::SubmissionFailure(msg) => write!(f, "Response submission failed: {}", msg),
            AppError::ChannelFailure(msg) => write!(f, "Analytics channel failure: {}", msg),
            AppError::PaymentProvider(msg) => write!(f, "Payment provider error: {}", msg),
            AppError::TopupInsufficientAfterPayment { shortfall } => {
                write!(f, "Balance still short by {} after completed top-up", shortfall)
            }
            AppError::ExternalApi(msg) => write!(f, "External API error: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for AppError {}

impl AppError {
    /// Whether the error is recoverable at the point of failure, i.e. the
    /// caller surfaces a dismissible message and keeps its state.
    pub fn is_recoverable(&self) -> bool {
        match self {
            AppError::Validation(_)
            | AppError::InsufficientFunds { .. }
            | AppError::PlanLimitExceeded(_)
            | AppError::GenerationFailure(_)
            | AppError::SubmissionFailure(_)
            | AppError::ChannelFailure(_) => true,
            AppError::WithContext { source, .. } => source.is_recoverable(),
            _ => false,
        }
    }

    /// Classifies a non-success HTTP response from the survey-engine API.
    ///
    /// The API signals domain failures through status codes plus an optional
    /// `code` field in the JSON body; everything unrecognized collapses to
    /// `ExternalApi`.
    pub fn from_response(status: reqwest::StatusCode, body: &str) -> Self {
        let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
        let code = parsed
            .as_ref()
            .and_then(|v| v.get("code").and_then(|c| c.as_str()).map(str::to_owned));
        let message = parsed
            .as_ref()
            .and_then(|v| {
                v.get("message")
                    .or_else(|| v.get("error"))
                    .and_then(|m| m.as_str())
                    .map(str::to_owned)
            })
            .unwrap_or_else(|| body.to_string());

        match (status.as_u16(), code.as_deref()) {
            (401, _) => AppError::Unauthorized(message),
            (402, _) | (_, Some("INSUFFICIENT_FUNDS")) => {
                tracing::warn!("Insufficient funds reported by API: {}", message);
                AppError::InsufficientFunds {
                    required_top_up: parsed
                        .as_ref()
                        .and_then(|v| v.get("requiredTopUpAmount"))
                        .and_then(decimal_field)
                        .unwrap_or_else(|| BigDecimal::from(0)),
                }
            }
            (403, Some("PLAN_LIMIT")) | (_, Some("PLAN_LIMIT_EXCEEDED")) => {
                AppError::PlanLimitExceeded(message)
            }
            (400, _) | (409, _) | (422, _) => AppError::Validation(message),
            _ => AppError::ExternalApi(format!("API returned status {}: {}", status, message)),
        }
    }
}

/// Decimal amounts arrive as JSON strings or numbers depending on endpoint.
fn decimal_field(value: &serde_json::Value) -> Option<BigDecimal> {
    match value {
        serde_json::Value::String(s) => s.parse().ok(),
        serde_json::Value::Number(n) => n.to_string().parse().ok(),
        _ => None,
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::ExternalApi(err.to_string())
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `AppError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;

    /// Add context lazily (only evaluated on error).
    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T, AppError> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: f(),
        })
    }
}
