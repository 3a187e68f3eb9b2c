use std::sync::Arc;
use std::time::Duration;

use bigdecimal::BigDecimal;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::errors::AppError;
use crate::models::CostEstimate;
use crate::services::CostService;

/// The one user-driven cost field. The variants are mutually exclusive by
/// construction; the backend derives the counterpart value.
#[derive(Debug, Clone, PartialEq)]
pub enum CostInput {
    TargetRespondents(u32),
    Budget(BigDecimal),
}

/// Debounced cost quoting for the wizard's settings step.
///
/// Rapid input edits collapse to a single calculation: each `schedule` call
/// cancels the previous pending one and restarts the quiet-period timer, so
/// exactly one request fires once the input settles. Results arrive on the
/// channel handed out at construction, always reflecting the latest input.
pub struct CostEstimator {
    service: Arc<CostService>,
    debounce: Duration,
    results: mpsc::UnboundedSender<Result<CostEstimate, AppError>>,
    pending: Option<JoinHandle<()>>,
}

impl CostEstimator {
    pub fn new(
        service: Arc<CostService>,
        debounce: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<Result<CostEstimate, AppError>>) {
        let (results, receiver) = mpsc::unbounded_channel();
        (
            Self {
                service,
                debounce,
                results,
                pending: None,
            },
            receiver,
        )
    }

    /// Schedules a calculation for `input` after the quiet period, replacing
    /// any calculation still pending.
    pub fn schedule(&mut self, input: CostInput) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }

        let service = Arc::clone(&self.service);
        let results = self.results.clone();
        let debounce = self.debounce;

        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            tracing::debug!("Debounce window elapsed, calculating cost for {:?}", input);
            let outcome = service.calculate(&input).await;
            // Receiver gone means the wizard was torn down; nothing to do
            let _ = results.send(outcome);
        }));
    }

    /// Immediate calculation, skipping the debounce. Used when a step
    /// transition needs a settled estimate right now.
    pub async fn estimate_now(&mut self, input: CostInput) -> Result<CostEstimate, AppError> {
        self.cancel();
        self.service.calculate(&input).await
    }

    /// Drops any pending calculation without firing it.
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for CostEstimator {
    fn drop(&mut self) {
        self.cancel();
    }
}
