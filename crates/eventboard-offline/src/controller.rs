//! The offline cache controller.
//!
//! Sits between the client and the network and decides, per request, where
//! the response comes from:
//!
//! - **API routes** (under `api_prefix`): network first. Successful GETs are
//!   copied into the runtime bucket. When the network fails, reads fall back
//!   to the cached copy, then to the offline document for navigations, then
//!   to a synthesized `503`; writes are queued for background sync.
//! - **Other same-origin routes**: cache first across the current buckets,
//!   then the network. `200` responses are copied into the runtime bucket.
//! - **Cross-origin requests**: passed to the network untouched.
//!
//! Lifecycle: [`OfflineController::install`] precaches the manifest into the
//! version's precache bucket in one transaction, and
//! [`OfflineController::activate`] drops every bucket from other versions
//! and claims the clients.

use http::{HeaderValue, Method, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::config::OfflineConfig;
use crate::error::{InstallError, OfflineError};
use crate::network::{Network, ReqwestNetwork};
use crate::push::{Notification, PushPayload};
use crate::queue::{ActionStore, NewAction, SqliteActionStore};
use crate::request::{FetchRequest, FetchResponse, cache_key};
use crate::storage::{CacheStorage, SqliteCacheStorage};
use crate::store::open_store;
use crate::sync::{BackgroundSync, ReplayReport, spawn_connectivity_watcher};

/// Carries the queue identifier on the `503` returned for a queued write.
pub const OFFLINE_QUEUED_HEADER: &str = "x-offline-queued";

const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RouteClass {
    Api,
    Asset,
    CrossOrigin,
}

/// Steps a request goes through, recorded in [`FetchOutcome::trace`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FetchState {
    Dispatched,
    NetworkAttempted,
    Fulfilled,
    Failed,
    ServedFromCache,
    ServedOffline,
    ErrorReturned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ResponseSource {
    Network,
    Cache,
    OfflineDocument,
    /// A `503` standing in for an unreachable network.
    Synthesized,
    /// A `503` for a write that was queued for replay.
    Queued,
}

#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub response: FetchResponse,
    pub class: RouteClass,
    pub source: ResponseSource,
    pub trace: Vec<FetchState>,
}

impl FetchOutcome {
    pub fn final_state(&self) -> Option<FetchState> {
        self.trace.last().copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LifecycleState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    /// Install failed; the previous version stays in charge.
    Redundant,
}

/// Messages posted by clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    /// Activate an installed version without waiting.
    SkipWaiting,
    /// Drop the runtime bucket.
    ClearCache,
}

impl ClientMessage {
    pub fn parse(message: &str) -> Option<Self> {
        serde_json::from_str(message).ok()
    }
}

/// Notifications published to [`OfflineController::subscribe`] receivers.
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    StateChanged(LifecycleState),
    Installed { precached: usize },
    InstallFailed { reason: String },
    BucketsDeleted { buckets: Vec<String> },
    ClientsClaimed,
    SkipWaiting,
    CacheCleared { bucket: String },
    ActionQueued { id: i64, method: String, url: String },
    SyncCompleted(ReplayReport),
    NotificationShown(Notification),
}

pub struct OfflineController {
    config: OfflineConfig,
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    sync: Arc<BackgroundSync>,
    state: watch::Sender<LifecycleState>,
    waiting_skipped: AtomicBool,
    clients_claimed: AtomicBool,
    events: broadcast::Sender<ControllerEvent>,
}

impl OfflineController {
    pub fn new(
        config: OfflineConfig,
        storage: Arc<dyn CacheStorage>,
        network: Arc<dyn Network>,
        actions: Arc<dyn ActionStore>,
    ) -> Self {
        let sync = Arc::new(BackgroundSync::new(
            actions,
            network.clone(),
            config.origin.clone(),
        ));
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            config,
            storage,
            network,
            sync,
            state: watch::Sender::new(LifecycleState::Parsed),
            waiting_skipped: AtomicBool::new(false),
            clients_claimed: AtomicBool::new(false),
            events,
        }
    }

    /// Builds a controller over the SQLite store at `config.store_url` and
    /// the HTTP network.
    pub async fn open(config: OfflineConfig) -> Result<Self, OfflineError> {
        let pool = open_store(&config.store_url).await?;
        let storage = Arc::new(SqliteCacheStorage::new(pool.clone()));
        let actions = Arc::new(SqliteActionStore::new(pool));
        let network = Arc::new(ReqwestNetwork::new()?);
        Ok(Self::new(config, storage, network, actions))
    }

    pub fn config(&self) -> &OfflineConfig {
        &self.config
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    pub fn clients_claimed(&self) -> bool {
        self.clients_claimed.load(Ordering::SeqCst)
    }

    pub fn waiting_skipped(&self) -> bool {
        self.waiting_skipped.load(Ordering::SeqCst)
    }

    pub fn background_sync(&self) -> &Arc<BackgroundSync> {
        &self.sync
    }

    pub fn classify(&self, url: &Url) -> RouteClass {
        if url.origin() != self.config.origin.origin() {
            return RouteClass::CrossOrigin;
        }

        let prefix = self.config.api_prefix.as_str();
        let path = url.path();
        if path.starts_with(prefix) || path == prefix.trim_end_matches('/') {
            RouteClass::Api
        } else {
            RouteClass::Asset
        }
    }

    // Lifecycle

    /// Fetches the precache manifest and commits it in one step. On failure
    /// nothing is stored and the controller becomes redundant.
    #[instrument(skip(self), fields(version = %self.config.version))]
    pub async fn install(&self) -> Result<usize, InstallError> {
        self.set_state(LifecycleState::Installing);

        match self.precache().await {
            Ok(precached) => {
                info!(precached, bucket = %self.config.precache_bucket(), "Install complete");
                self.set_state(LifecycleState::Installed);
                self.publish(ControllerEvent::Installed { precached });
                Ok(precached)
            }
            Err(err) => {
                warn!(error = %err, "Install aborted");
                self.set_state(LifecycleState::Redundant);
                self.publish(ControllerEvent::InstallFailed {
                    reason: err.to_string(),
                });
                Err(err)
            }
        }
    }

    async fn precache(&self) -> Result<usize, InstallError> {
        let mut entries = Vec::with_capacity(self.config.precache_manifest.len());

        for path in &self.config.precache_manifest {
            let url = self
                .config
                .origin
                .join(path)
                .map_err(|source| InstallError::InvalidPath {
                    path: path.clone(),
                    source,
                })?;

            let response = self
                .network
                .fetch(FetchRequest::get(url.clone()))
                .await
                .map_err(|source| InstallError::Fetch {
                    path: path.clone(),
                    source,
                })?;
            if !response.is_success() {
                return Err(InstallError::BadStatus {
                    path: path.clone(),
                    status: response.status,
                });
            }

            entries.push((cache_key(&url), response));
        }

        self.storage
            .put_all(&self.config.precache_bucket(), &entries)
            .await?;
        Ok(entries.len())
    }

    /// Deletes every bucket that does not belong to this version, then
    /// claims all clients. Returns the deleted bucket names.
    #[instrument(skip(self), fields(version = %self.config.version))]
    pub async fn activate(&self) -> Result<Vec<String>, OfflineError> {
        let state = self.state();
        if !matches!(state, LifecycleState::Installed | LifecycleState::Activated) {
            return Err(OfflineError::NotInstalled(state));
        }

        self.set_state(LifecycleState::Activating);
        let deleted = match self.delete_stale_buckets().await {
            Ok(deleted) => deleted,
            Err(err) => {
                self.set_state(state);
                return Err(err);
            }
        };

        self.clients_claimed.store(true, Ordering::SeqCst);
        self.set_state(LifecycleState::Activated);

        info!(deleted = ?deleted, "Activated");
        self.publish(ControllerEvent::BucketsDeleted {
            buckets: deleted.clone(),
        });
        self.publish(ControllerEvent::ClientsClaimed);
        Ok(deleted)
    }

    async fn delete_stale_buckets(&self) -> Result<Vec<String>, OfflineError> {
        let current = self.config.current_buckets();
        let mut deleted = Vec::new();

        for name in self.storage.bucket_names().await? {
            if current.contains(&name) {
                continue;
            }
            self.storage.delete_bucket(&name).await?;
            debug!(bucket = %name, "Deleted stale bucket");
            deleted.push(name);
        }

        Ok(deleted)
    }

    // Fetch handling

    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    pub async fn handle_fetch(&self, request: FetchRequest) -> Result<FetchOutcome, OfflineError> {
        let class = self.classify(&request.url);
        let trace = vec![FetchState::Dispatched];

        let state = self.state();
        if state != LifecycleState::Activated {
            debug!(state = ?state, "Not activated, bypassing buckets");
            return self.network_only(request, class, trace).await;
        }

        match class {
            RouteClass::Api => Ok(self.network_first(request, trace).await),
            RouteClass::Asset => self.cache_first(request, trace).await,
            RouteClass::CrossOrigin => self.pass_through(request, trace).await,
        }
    }

    async fn network_first(&self, request: FetchRequest, mut trace: Vec<FetchState>) -> FetchOutcome {
        let key = request.cache_key();
        trace.push(FetchState::NetworkAttempted);

        match self.network.fetch(request.clone()).await {
            Ok(response) => {
                trace.push(FetchState::Fulfilled);
                if request.method == Method::GET && response.is_success() {
                    self.store_runtime(&key, &response).await;
                }
                FetchOutcome {
                    response,
                    class: RouteClass::Api,
                    source: ResponseSource::Network,
                    trace,
                }
            }
            Err(err) => {
                debug!(error = %err, "Network failed for API request");
                trace.push(FetchState::Failed);
                self.api_fallback(request, &key, trace).await
            }
        }
    }

    async fn api_fallback(
        &self,
        request: FetchRequest,
        key: &str,
        mut trace: Vec<FetchState>,
    ) -> FetchOutcome {
        let outcome = |response, source, trace| FetchOutcome {
            response,
            class: RouteClass::Api,
            source,
            trace,
        };

        if is_mutating(&request.method) {
            trace.push(FetchState::ErrorReturned);
            return match self.enqueue(&request).await {
                Some(id) => outcome(queued_response(id), ResponseSource::Queued, trace),
                None => outcome(
                    FetchResponse::service_unavailable(),
                    ResponseSource::Synthesized,
                    trace,
                ),
            };
        }

        if request.method == Method::GET {
            let [precache, runtime] = self.config.current_buckets();
            if let Some(cached) = self.lookup_in(&[runtime, precache], key).await {
                trace.push(FetchState::ServedFromCache);
                return outcome(cached, ResponseSource::Cache, trace);
            }
        }

        if request.is_navigation() {
            if let Some(document) = self.offline_document().await {
                trace.push(FetchState::ServedOffline);
                return outcome(document, ResponseSource::OfflineDocument, trace);
            }
        }

        trace.push(FetchState::ErrorReturned);
        outcome(
            FetchResponse::service_unavailable(),
            ResponseSource::Synthesized,
            trace,
        )
    }

    async fn cache_first(
        &self,
        request: FetchRequest,
        mut trace: Vec<FetchState>,
    ) -> Result<FetchOutcome, OfflineError> {
        let key = request.cache_key();
        let cacheable = request.method == Method::GET;

        if cacheable {
            if let Some(cached) = self.lookup_in(&self.config.current_buckets(), &key).await {
                trace.push(FetchState::ServedFromCache);
                return Ok(FetchOutcome {
                    response: cached,
                    class: RouteClass::Asset,
                    source: ResponseSource::Cache,
                    trace,
                });
            }
        }

        trace.push(FetchState::NetworkAttempted);
        let response = self.network.fetch(request).await?;
        trace.push(FetchState::Fulfilled);

        if cacheable && response.status == StatusCode::OK {
            self.store_runtime(&key, &response).await;
        }

        Ok(FetchOutcome {
            response,
            class: RouteClass::Asset,
            source: ResponseSource::Network,
            trace,
        })
    }

    async fn pass_through(
        &self,
        request: FetchRequest,
        trace: Vec<FetchState>,
    ) -> Result<FetchOutcome, OfflineError> {
        self.network_only(request, RouteClass::CrossOrigin, trace).await
    }

    /// Plain network fetch with no bucket reads or writes.
    async fn network_only(
        &self,
        request: FetchRequest,
        class: RouteClass,
        mut trace: Vec<FetchState>,
    ) -> Result<FetchOutcome, OfflineError> {
        trace.push(FetchState::NetworkAttempted);
        let response = match self.network.fetch(request).await {
            Ok(response) => response,
            Err(err) => {
                trace.push(FetchState::Failed);
                return Err(err.into());
            }
        };
        trace.push(FetchState::Fulfilled);

        Ok(FetchOutcome {
            response,
            class,
            source: ResponseSource::Network,
            trace,
        })
    }

    async fn lookup_in(&self, buckets: &[String], key: &str) -> Option<FetchResponse> {
        for bucket in buckets {
            match self.storage.lookup(bucket, key).await {
                Ok(Some(response)) => return Some(response),
                Ok(None) => {}
                Err(err) => warn!(bucket = %bucket, key, error = %err, "Bucket lookup failed"),
            }
        }
        None
    }

    async fn offline_document(&self) -> Option<FetchResponse> {
        let url = self.config.origin.join(&self.config.offline_document).ok()?;
        self.lookup_in(&self.config.current_buckets(), &cache_key(&url))
            .await
    }

    async fn store_runtime(&self, key: &str, response: &FetchResponse) {
        let bucket = self.config.runtime_bucket();
        if let Err(err) = self.storage.put(&bucket, key, response).await {
            warn!(bucket = %bucket, key, error = %err, "Failed to store runtime copy");
        }
    }

    async fn enqueue(&self, request: &FetchRequest) -> Option<i64> {
        let action = NewAction::from_request(request);
        match self.sync.actions().enqueue(action).await {
            Ok(queued) => {
                info!(action.id = queued.id, "Write queued for background sync");
                self.publish(ControllerEvent::ActionQueued {
                    id: queued.id,
                    method: queued.method,
                    url: queued.url,
                });
                Some(queued.id)
            }
            Err(err) => {
                warn!(error = %err, "Failed to queue offline write");
                None
            }
        }
    }

    // Messages, sync and push

    pub async fn handle_message(&self, message: ClientMessage) -> Result<(), OfflineError> {
        match message {
            ClientMessage::SkipWaiting => {
                self.waiting_skipped.store(true, Ordering::SeqCst);
                self.publish(ControllerEvent::SkipWaiting);
                if self.state() == LifecycleState::Installed {
                    self.activate().await?;
                }
            }
            ClientMessage::ClearCache => {
                let bucket = self.config.runtime_bucket();
                self.storage.delete_bucket(&bucket).await?;
                info!(bucket = %bucket, "Runtime cache cleared");
                self.publish(ControllerEvent::CacheCleared { bucket });
            }
        }
        Ok(())
    }

    /// Replays the queue when `tag` is the configured sync tag.
    pub async fn handle_sync(&self, tag: &str) -> Result<Option<ReplayReport>, OfflineError> {
        if tag != self.config.sync_tag {
            debug!(tag, "Ignoring unknown sync tag");
            return Ok(None);
        }

        let report = self.sync.replay_all().await?;
        self.publish(ControllerEvent::SyncCompleted(report.clone()));
        Ok(Some(report))
    }

    pub fn handle_push(&self, data: Option<&[u8]>) -> Notification {
        let notification = Notification::from(PushPayload::parse(data));
        self.publish(ControllerEvent::NotificationShown(notification.clone()));
        notification
    }

    pub fn handle_notification_click(&self, notification: &Notification) -> Url {
        notification.click_target(&self.config.origin)
    }

    /// Replays the queue on every offline-to-online transition of `online`.
    pub fn watch_connectivity(&self, online: watch::Receiver<bool>) -> JoinHandle<()> {
        spawn_connectivity_watcher(self.sync.clone(), online)
    }

    fn set_state(&self, state: LifecycleState) {
        self.state.send_replace(state);
        self.publish(ControllerEvent::StateChanged(state));
    }

    fn publish(&self, event: ControllerEvent) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }
}

fn is_mutating(method: &Method) -> bool {
    [Method::POST, Method::PUT, Method::PATCH, Method::DELETE].contains(method)
}

fn queued_response(id: i64) -> FetchResponse {
    let response = FetchResponse::json(
        StatusCode::SERVICE_UNAVAILABLE,
        &serde_json::json!({ "error": "offline", "queued": id }),
    );
    match HeaderValue::from_str(&id.to_string()) {
        Ok(value) => response.with_header(
            http::HeaderName::from_static(OFFLINE_QUEUED_HEADER),
            value,
        ),
        Err(_) => response,
    }
}
