use std::sync::{Arc, Mutex};
use std::time::Duration;

use failsafe::CircuitBreaker;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::circuit_breaker::{create_channel_circuit_breaker, ChannelCircuitBreaker};
use crate::config::Config;
use crate::errors::AppError;

const RECONNECT_INITIAL: Duration = Duration::from_secs(1);
const RECONNECT_MAX: Duration = Duration::from_secs(30);

/// Events surfaced to the dashboard from the push channel.
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    /// Full aggregate re-fetched on every (re)connect; replaces local state.
    Snapshot(Value),
    /// Partial update pushed over the channel, already merged.
    Update(Value),
    /// The channel dropped; reconnection is in progress behind the scenes.
    Down(String),
}

/// Live results for one survey's dashboard.
///
/// The aggregate starts from a REST snapshot and is kept current by a
/// single push channel; partial updates overwrite matching top-level fields
/// and never touch the rest. At most one channel exists per instance:
/// subscribing again tears the previous one down first. Reconnects always
/// re-fetch the snapshot, so updates missed while disconnected can never
/// leave stale fields behind.
pub struct AnalyticsLiveMerge {
    client: Client,
    base_url: String,
    aggregate: Arc<Mutex<Map<String, Value>>>,
    subscription: Option<Subscription>,
}

/// Handle to the running channel task. Closing (or dropping) it stops the
/// reader and all reconnection attempts.
pub struct Subscription {
    handle: JoinHandle<()>,
}

impl Subscription {
    pub fn close(&self) {
        self.handle.abort();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl AnalyticsLiveMerge {
    pub fn new(config: &Config) -> Self {
        let client = Client::builder()
            .cookie_store(true)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: config.api_base_url.clone(),
            aggregate: Arc::new(Mutex::new(Map::new())),
            subscription: None,
        }
    }

    /// Current merged aggregate.
    pub fn aggregate(&self) -> Value {
        Value::Object(self.aggregate.lock().map(|a| a.clone()).unwrap_or_default())
    }

    /// One-shot REST fetch of the full aggregate, replacing local state.
    /// Also the degraded mode when the channel is down.
    pub async fn fetch_snapshot(&self, survey_id: i64) -> Result<Value, AppError> {
        let snapshot = fetch_results(&self.client, &self.base_url, survey_id).await?;
        replace_aggregate(&self.aggregate, &snapshot);
        Ok(snapshot)
    }

    /// Opens the push channel for `survey_id`, replacing any existing one.
    pub fn subscribe(&mut self, survey_id: i64) -> mpsc::UnboundedReceiver<ChannelEvent> {
        self.close();

        let (events, receiver) = mpsc::unbounded_channel();
        let client = self.client.clone();
        let base_url = self.base_url.clone();
        let aggregate = Arc::clone(&self.aggregate);

        let handle = tokio::spawn(async move {
            run_channel(client, base_url, survey_id, aggregate, events).await;
        });
        self.subscription = Some(Subscription { handle });
        receiver
    }

    /// Tears down the push channel, if any. The merged aggregate stays.
    pub fn close(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.close();
        }
    }
}

impl Drop for AnalyticsLiveMerge {
    fn drop(&mut self) {
        self.close();
    }
}

async fn fetch_results(
    client: &Client,
    base_url: &str,
    survey_id: i64,
) -> Result<Value, AppError> {
    let url = format!("{}/surveys/{}/results", base_url, survey_id);
    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|e| AppError::ChannelFailure(format!("Results fetch failed: {}", e)))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::from_response(status, &body));
    }

    response
        .json()
        .await
        .map_err(|e| AppError::ChannelFailure(format!("Failed to parse results: {}", e)))
}

/// Reader loop: connect, re-fetch the snapshot, stream updates, reconnect
/// with backoff on drop. The circuit breaker stops reconnection hammering
/// when the channel endpoint is persistently down.
async fn run_channel(
    client: Client,
    base_url: String,
    survey_id: i64,
    aggregate: Arc<Mutex<Map<String, Value>>>,
    events: mpsc::UnboundedSender<ChannelEvent>,
) {
    let breaker: ChannelCircuitBreaker = create_channel_circuit_breaker();
    let mut delay = RECONNECT_INITIAL;

    loop {
        if !breaker.is_call_permitted() {
            tracing::debug!("Channel breaker open for survey {}, waiting", survey_id);
            tokio::time::sleep(delay).await;
            continue;
        }

        let outcome = stream_once(&client, &base_url, survey_id, &aggregate, &events).await;
        let _ = breaker.call(|| match &outcome {
            Ok(()) => Ok(()),
            Err(err) => Err(err.to_string()),
        });

        match outcome {
            Ok(()) => {
                // Clean end of stream; reconnect promptly
                delay = RECONNECT_INITIAL;
            }
            Err(err) => {
                tracing::warn!("Live channel for survey {} dropped: {}", survey_id, err);
                if events.send(ChannelEvent::Down(err.to_string())).is_err() {
                    return;
                }
                delay = (delay * 2).min(RECONNECT_MAX);
            }
        }

        tokio::time::sleep(delay).await;
    }
}

async fn stream_once(
    client: &Client,
    base_url: &str,
    survey_id: i64,
    aggregate: &Arc<Mutex<Map<String, Value>>>,
    events: &mpsc::UnboundedSender<ChannelEvent>,
) -> Result<(), AppError> {
    // Every (re)connect starts from a fresh snapshot
    let snapshot = fetch_results(client, base_url, survey_id).await?;
    replace_aggregate(aggregate, &snapshot);
    if events.send(ChannelEvent::Snapshot(snapshot)).is_err() {
        return Ok(());
    }

    let url = format!("{}/surveys/{}/responses/stream", base_url, survey_id);
    let mut response = client
        .get(&url)
        .header(ACCEPT, "text/event-stream")
        .send()
        .await
        .map_err(|e| AppError::ChannelFailure(format!("Channel connect failed: {}", e)))?;

    if !response.status().is_success() {
        return Err(AppError::ChannelFailure(format!(
            "Channel refused with status {}",
            response.status()
        )));
    }

    tracing::info!("Live channel open for survey {}", survey_id);

    let mut buffer = String::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| AppError::ChannelFailure(format!("Channel read failed: {}", e)))?
    {
        buffer.push_str(&String::from_utf8_lossy(&chunk));
        for payload in drain_events(&mut buffer) {
            merge_partial(aggregate, &payload);
            if events.send(ChannelEvent::Update(payload)).is_err() {
                return Ok(());
            }
        }
    }

    tracing::debug!("Live channel for survey {} ended", survey_id);
    Ok(())
}

/// Pulls complete `data:` events out of the line buffer, leaving any
/// trailing partial line in place for the next chunk.
fn drain_events(buffer: &mut String) -> Vec<Value> {
    let mut payloads = Vec::new();
    while let Some(newline) = buffer.find('\n') {
        let line: String = buffer.drain(..=newline).collect();
        let line = line.trim_end_matches(['\n', '\r']);
        if let Some(data) = line.strip_prefix("data:") {
            let data = data.trim();
            if !data.is_empty() {
                match serde_json::from_str(data) {
                    Ok(value) => payloads.push(value),
                    Err(e) => tracing::warn!("Discarding malformed channel payload: {}", e),
                }
            }
        }
        // event:, id:, retry: and comment lines carry nothing we use
    }
    payloads
}

fn replace_aggregate(aggregate: &Arc<Mutex<Map<String, Value>>>, snapshot: &Value) {
    if let (Ok(mut state), Some(fields)) = (aggregate.lock(), snapshot.as_object()) {
        *state = fields.clone();
    }
}

/// Overwrites matching top-level fields; untouched fields keep their last
/// known value.
fn merge_partial(aggregate: &Arc<Mutex<Map<String, Value>>>, partial: &Value) {
    if let (Ok(mut state), Some(fields)) = (aggregate.lock(), partial.as_object()) {
        for (key, value) in fields {
            state.insert(key.clone(), value.clone());
        }
    }
}
