use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch, Mutex, RwLock};

use chatlens_context::ContextStrategy;
use chatlens_llm::{ChatClient, ChatOptions, ChatRequest, LlmError};
use chatlens_persist::RoomStore;
use chatlens_stats::{SnapshotCache, StatisticsEngine};
use chatlens_types::{AnalysisRequest, AnalysisStatus, AnalysisType, FailureReason, Room};

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};

type InFlightKey = (String, AnalysisType);

struct InFlight {
    request_id: String,
    cancel: oneshot::Sender<()>,
}

/// Every request ever submitted, in submit order per room.
#[derive(Default)]
struct History {
    records: HashMap<String, watch::Sender<AnalysisRequest>>,
    by_room: HashMap<String, Vec<String>>,
}

/// Why a dispatch produced no result.
#[derive(Debug)]
struct Failure {
    reason: FailureReason,
    detail: String,
}

impl Failure {
    fn new(reason: FailureReason, detail: impl Into<String>) -> Self {
        Self {
            reason,
            detail: detail.into(),
        }
    }
}

impl From<LlmError> for Failure {
    fn from(e: LlmError) -> Self {
        let reason = match &e {
            LlmError::Auth(_) => FailureReason::Auth,
            LlmError::Network(_) => FailureReason::Network,
            LlmError::Timeout(_) => FailureReason::Timeout,
            LlmError::ProviderRejected(_) => FailureReason::ProviderRejected,
            LlmError::InvalidInput(_) => FailureReason::InvalidInput,
        };
        Failure::new(reason, e.to_string())
    }
}

/// Everything a background analysis task needs to produce a result.
struct Dispatcher {
    client: Arc<dyn ChatClient>,
    context: Arc<dyn ContextStrategy>,
    engine: Arc<StatisticsEngine>,
    cache: Arc<SnapshotCache>,
    config: AnalysisConfig,
}

impl Dispatcher {
    async fn run(&self, room: &Room, analysis_type: AnalysisType) -> std::result::Result<String, Failure> {
        if room.messages.is_empty() {
            return Err(Failure::new(FailureReason::InvalidInput, "room has no messages"));
        }

        let snapshot = self.cache.get_or_compute(&self.engine, room).await;
        let window = self
            .context
            .build(room, &snapshot, analysis_type)
            .map_err(|e| Failure::new(FailureReason::InvalidInput, e.to_string()))?;

        tracing::debug!(
            room_id = %room.id,
            analysis_type = %analysis_type,
            prompt_tokens = window.prompt_tokens,
            omitted = window.omitted_messages,
            "Dispatching analysis"
        );

        let options = ChatOptions::new()
            .temperature(self.config.temperature)
            .max_tokens(self.config.max_output_tokens);
        let request = ChatRequest::new(self.config.model.clone(), window.into_messages()).with_options(options);
        let response = self.client.chat(request).await?;

        if let Some(usage) = response.usage {
            tracing::info!(
                room_id = %room.id,
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                "Provider usage"
            );
        }

        response
            .content
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| Failure::new(FailureReason::ProviderRejected, "provider returned an empty answer"))
    }
}

/// Runs analysis requests against the external provider.
///
/// At most one request per `(room, type)` is in flight; a second submit for
/// the same pair fails with [`AnalysisError::Conflict`]. Requests are never
/// retried and the history is append-only. Progress is observable through
/// [`get`](Self::get) and [`wait`](Self::wait).
pub struct AnalysisCoordinator {
    store: Arc<dyn RoomStore>,
    dispatcher: Arc<Dispatcher>,
    in_flight: Arc<Mutex<HashMap<InFlightKey, InFlight>>>,
    history: Arc<RwLock<History>>,
}

impl AnalysisCoordinator {
    pub fn new(
        store: Arc<dyn RoomStore>,
        client: Arc<dyn ChatClient>,
        context: Arc<dyn ContextStrategy>,
        engine: Arc<StatisticsEngine>,
        cache: Arc<SnapshotCache>,
        config: AnalysisConfig,
    ) -> Self {
        Self {
            store,
            dispatcher: Arc::new(Dispatcher {
                client,
                context,
                engine,
                cache,
                config,
            }),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            history: Arc::new(RwLock::new(History::default())),
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.dispatcher.config
    }

    /// Create a request and start it in the background.
    ///
    /// The returned record is already `Running` and carries the room
    /// watermark the analysis works against.
    pub async fn submit(&self, room_id: &str, analysis_type: AnalysisType) -> Result<AnalysisRequest> {
        let room = self.store.get(room_id).await?;
        let key: InFlightKey = (room.id.clone(), analysis_type);
        let mut request = AnalysisRequest::new(room.id.clone(), analysis_type);
        let (cancel_tx, cancel_rx) = oneshot::channel();

        {
            let mut in_flight = self.in_flight.lock().await;
            // A finished request may still hold its slot for a moment.
            let busy = match in_flight.get(&key) {
                Some(entry) => !self.is_finished(&entry.request_id).await,
                None => false,
            };
            if let Some(running) = in_flight.get(&key).filter(|_| busy) {
                tracing::warn!(
                    room_id = %room.id,
                    analysis_type = %analysis_type,
                    request_id = %running.request_id,
                    "Analysis already in flight"
                );
                return Err(AnalysisError::Conflict {
                    room_id: room.id.clone(),
                    analysis_type,
                    request_id: running.request_id.clone(),
                });
            }
            in_flight.insert(
                key.clone(),
                InFlight {
                    request_id: request.id.clone(),
                    cancel: cancel_tx,
                },
            );
        }

        request.start(room.watermark());
        let (tx, _rx) = watch::channel(request.clone());
        {
            let mut history = self.history.write().await;
            history
                .by_room
                .entry(room.id.clone())
                .or_default()
                .push(request.id.clone());
            history.records.insert(request.id.clone(), tx);
        }

        // The room may have been deleted since it was read. Once registered,
        // a later delete reaches this request through `cancel_room`.
        if let Err(e) = self.store.watermark(&room.id).await {
            self.forget(&key, &request.id).await;
            tracing::info!(room_id = %room.id, request_id = %request.id, "Room gone before analysis started");
            return Err(e.into());
        }

        tracing::info!(
            request_id = %request.id,
            room_id = %room.id,
            analysis_type = %analysis_type,
            messages = room.message_count(),
            "Analysis submitted"
        );

        let dispatcher = Arc::clone(&self.dispatcher);
        let in_flight = Arc::clone(&self.in_flight);
        let history = Arc::clone(&self.history);
        let request_id = request.id.clone();

        tokio::spawn(async move {
            let timeout = dispatcher.config.timeout;
            let outcome = tokio::select! {
                _ = cancel_rx => None,
                result = tokio::time::timeout(timeout, dispatcher.run(&room, analysis_type)) => Some(result),
            };

            match outcome {
                Some(Ok(Ok(text))) => {
                    if update(&history, &request_id, |r| r.succeed(text)).await {
                        tracing::info!(request_id = %request_id, "Analysis succeeded");
                    }
                }
                Some(Ok(Err(failure))) => {
                    tracing::warn!(
                        request_id = %request_id,
                        reason = %failure.reason,
                        detail = %failure.detail,
                        "Analysis failed"
                    );
                    update(&history, &request_id, |r| r.fail(failure.reason, failure.detail)).await;
                }
                Some(Err(_)) => {
                    tracing::warn!(request_id = %request_id, timeout_ms = timeout.as_millis() as u64, "Analysis timed out");
                    let detail = format!("no answer within {} ms", timeout.as_millis());
                    update(&history, &request_id, |r| r.fail(FailureReason::Timeout, detail)).await;
                }
                None => {
                    tracing::debug!(request_id = %request_id, "Analysis task stopped after cancellation");
                }
            }

            release(&in_flight, &key, &request_id).await;
        });

        Ok(request)
    }

    /// Drop a request that never started.
    async fn forget(&self, key: &InFlightKey, request_id: &str) {
        release(&self.in_flight, key, request_id).await;
        let mut history = self.history.write().await;
        history.records.remove(request_id);
        if let Some(ids) = history.by_room.get_mut(&key.0) {
            ids.retain(|id| id != request_id);
        }
    }

    async fn is_finished(&self, request_id: &str) -> bool {
        self.history
            .read()
            .await
            .records
            .get(request_id)
            .is_some_and(|tx| tx.borrow().is_terminal())
    }

    /// Current state of a request
    pub async fn get(&self, request_id: &str) -> Result<AnalysisRequest> {
        let history = self.history.read().await;
        history
            .records
            .get(request_id)
            .map(|tx| tx.borrow().clone())
            .ok_or_else(|| AnalysisError::RequestNotFound(request_id.to_string()))
    }

    /// Wait until the request reaches `Succeeded` or `Failed`.
    pub async fn wait(&self, request_id: &str) -> Result<AnalysisRequest> {
        let mut rx = {
            let history = self.history.read().await;
            history
                .records
                .get(request_id)
                .map(watch::Sender::subscribe)
                .ok_or_else(|| AnalysisError::RequestNotFound(request_id.to_string()))?
        };

        let terminal = rx.wait_for(AnalysisRequest::is_terminal).await.map(|r| r.clone());
        terminal.map_err(|_| AnalysisError::RequestNotFound(request_id.to_string()))
    }

    /// Like [`wait`](Self::wait), but returns the record as it stands once
    /// `limit` has passed.
    pub async fn wait_timeout(&self, request_id: &str, limit: Duration) -> Result<AnalysisRequest> {
        match tokio::time::timeout(limit, self.wait(request_id)).await {
            Ok(result) => result,
            Err(_) => self.get(request_id).await,
        }
    }

    /// All requests for a room, newest first
    pub async fn history(&self, room_id: &str) -> Vec<AnalysisRequest> {
        let history = self.history.read().await;
        history
            .by_room
            .get(room_id)
            .map(|ids| {
                ids.iter()
                    .rev()
                    .filter_map(|id| history.records.get(id))
                    .map(|tx| tx.borrow().clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Most recent successful analysis of the given type
    pub async fn latest_result(&self, room_id: &str, analysis_type: AnalysisType) -> Option<AnalysisRequest> {
        self.history(room_id)
            .await
            .into_iter()
            .find(|r| r.analysis_type == analysis_type && r.status == AnalysisStatus::Succeeded)
    }

    /// Cancel a request that has not finished yet.
    ///
    /// The request moves to `Failed` with reason `cancelled` and its
    /// `(room, type)` slot is freed right away. A request that already
    /// finished is returned unchanged.
    pub async fn cancel(&self, request_id: &str) -> Result<AnalysisRequest> {
        let (cancelled, record) = {
            let history = self.history.read().await;
            let tx = history
                .records
                .get(request_id)
                .ok_or_else(|| AnalysisError::RequestNotFound(request_id.to_string()))?;
            let cancelled = tx.send_if_modified(|r| r.fail(FailureReason::Cancelled, "cancelled by caller"));
            let record = tx.borrow().clone();
            (cancelled, record)
        };

        if cancelled {
            let key: InFlightKey = (record.room_id.clone(), record.analysis_type);
            if let Some(entry) = release(&self.in_flight, &key, request_id).await {
                let _ = entry.cancel.send(());
            }
            tracing::info!(request_id = %request_id, room_id = %record.room_id, "Analysis cancelled");
        }
        Ok(record)
    }

    /// Cancel every in-flight request of a room. Returns how many were stopped.
    pub async fn cancel_room(&self, room_id: &str) -> usize {
        let ids: Vec<String> = self
            .in_flight
            .lock()
            .await
            .iter()
            .filter(|((room, _), _)| room == room_id)
            .map(|(_, entry)| entry.request_id.clone())
            .collect();

        let mut stopped = 0;
        for id in ids {
            if let Ok(record) = self.cancel(&id).await {
                if record.error_reason == Some(FailureReason::Cancelled) {
                    stopped += 1;
                }
            }
        }
        stopped
    }

    /// Number of requests currently in flight
    pub async fn in_flight(&self) -> usize {
        self.in_flight.lock().await.len()
    }
}

/// Apply a transition and notify waiters if it was allowed.
async fn update<F>(history: &RwLock<History>, request_id: &str, transition: F) -> bool
where
    F: FnOnce(&mut AnalysisRequest) -> bool,
{
    let history = history.read().await;
    match history.records.get(request_id) {
        Some(tx) => tx.send_if_modified(transition),
        None => false,
    }
}

/// Free the `(room, type)` slot if it still belongs to `request_id`.
async fn release(
    in_flight: &Mutex<HashMap<InFlightKey, InFlight>>,
    key: &InFlightKey,
    request_id: &str,
) -> Option<InFlight> {
    let mut in_flight = in_flight.lock().await;
    if in_flight.get(key).is_some_and(|e| e.request_id == request_id) {
        in_flight.remove(key)
    } else {
        None
    }
}
