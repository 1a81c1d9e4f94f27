//! DummySite watch loop.
//!
//! Keeps one watch on DummySite resources open for the life of the process
//! and hands every ADDED event to the reconciler. The loop is an explicit
//! state machine:
//!
//! ```text
//! Connecting --open ok--> Watching --error/close--> Disconnected --delay--> Connecting
//! Connecting --open err--> StartupFailed --delay--> Connecting
//! ```
//!
//! There is no terminal state and only one watch is open at a time. Events
//! are handled one after another, each to completion.

use crate::backoff::{ReconnectBackoff, Sleeper};
use crate::error::ControllerError;
use crate::reconciler::SiteReconciler;
use crds::DummySite;
use futures::StreamExt;
use futures::stream::BoxStream;
use kube::Api;
use kube::api::{WatchEvent, WatchParams};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Resource version asking the API server to replay existing objects as ADDED
pub const REPLAY_RESOURCE_VERSION: &str = "0";

/// Server-side lifetime of one watch request.
///
/// The API server ends the stream after this many seconds and the loop
/// reconnects from the last seen resource version.
pub const WATCH_TIMEOUT_SECS: u32 = 290;

/// HTTP status the API server uses when a resume point has been compacted away
const GONE: u16 = 410;

/// A DummySite change delivered by the watch
#[derive(Debug, Clone)]
pub enum SiteEvent {
    Added(DummySite),
    Modified(DummySite),
    Deleted(DummySite),
    /// Progress marker carrying only a resource version
    Bookmark(String),
}

/// Lazy, non-restartable sequence of watch events. An `Err` item ends the watch.
pub type SiteEventStream = BoxStream<'static, Result<SiteEvent, ControllerError>>;

/// Opens watches on DummySite resources.
#[async_trait::async_trait]
pub trait SiteEventSource: Send + Sync {
    /// Open a watch starting after `resource_version`
    async fn open(&self, resource_version: &str) -> Result<SiteEventStream, ControllerError>;
}

/// `SiteEventSource` backed by the Kubernetes watch API
#[derive(Clone)]
pub struct KubeSiteEventSource {
    api: Api<DummySite>,
    params: WatchParams,
}

impl KubeSiteEventSource {
    /// Creates a source watching every DummySite visible through `api`.
    pub fn new(api: Api<DummySite>) -> Self {
        Self {
            api,
            params: watch_params(),
        }
    }
}

fn watch_params() -> WatchParams {
    WatchParams::default().timeout(WATCH_TIMEOUT_SECS)
}

#[async_trait::async_trait]
impl SiteEventSource for KubeSiteEventSource {
    async fn open(&self, resource_version: &str) -> Result<SiteEventStream, ControllerError> {
        let stream = self.api.watch(&self.params, resource_version).await?;

        Ok(stream
            .map(|item| match item {
                Ok(WatchEvent::Added(site)) => Ok(SiteEvent::Added(site)),
                Ok(WatchEvent::Modified(site)) => Ok(SiteEvent::Modified(site)),
                Ok(WatchEvent::Deleted(site)) => Ok(SiteEvent::Deleted(site)),
                Ok(WatchEvent::Bookmark(bookmark)) => {
                    Ok(SiteEvent::Bookmark(bookmark.metadata.resource_version))
                }
                Ok(WatchEvent::Error(status)) if status.code == GONE => {
                    Err(ControllerError::WatchExpired(status.message.clone()))
                }
                Ok(WatchEvent::Error(status)) => Err(ControllerError::Watch(format!(
                    "API server sent watch error: {} ({})",
                    status.message, status.code
                ))),
                Err(e) => Err(ControllerError::Kube(e)),
            })
            .boxed())
    }
}

/// Where the watch loop currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    /// About to open a watch
    Connecting,
    /// A watch is open and events are being handled
    Watching,
    /// An open watch failed or was closed by the server
    Disconnected,
    /// The watch could not be opened
    StartupFailed,
}

/// Long-lived DummySite subscription with unbounded reconnects.
pub struct WatchLoop {
    source: Box<dyn SiteEventSource>,
    reconciler: Arc<SiteReconciler>,
    backoff: Box<dyn ReconnectBackoff>,
    sleeper: Arc<dyn Sleeper>,
    state: WatchState,
    stream: Option<SiteEventStream>,
    resource_version: String,
}

impl WatchLoop {
    /// Creates a watch loop in the `Connecting` state.
    pub fn new(
        source: Box<dyn SiteEventSource>,
        reconciler: Arc<SiteReconciler>,
        backoff: Box<dyn ReconnectBackoff>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            source,
            reconciler,
            backoff,
            sleeper,
            state: WatchState::Connecting,
            stream: None,
            resource_version: REPLAY_RESOURCE_VERSION.to_string(),
        }
    }

    /// Current state
    pub fn state(&self) -> WatchState {
        self.state
    }

    /// Resource version the next watch resumes from
    pub fn resource_version(&self) -> &str {
        &self.resource_version
    }

    /// Runs until the process exits.
    pub async fn run(&mut self) {
        loop {
            self.step().await;
        }
    }

    /// Runs until `shutdown` completes.
    pub async fn run_until<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            () = self.run() => {}
            () = shutdown => {}
        }
        info!("Shutdown requested, stopped DummySite watch in state {:?}", self.state());
    }

    /// Performs one transition and returns the new state.
    ///
    /// In `Watching` a single event is read and handled per step.
    pub async fn step(&mut self) -> WatchState {
        self.state = match self.state {
            WatchState::Connecting => self.connect().await,
            WatchState::Watching => self.next_event().await,
            WatchState::Disconnected | WatchState::StartupFailed => {
                let delay = self.backoff.next_delay();
                info!("Reconnecting DummySite watch in {:?}", delay);
                self.sleeper.sleep(delay).await;
                WatchState::Connecting
            }
        };
        self.state
    }

    async fn connect(&mut self) -> WatchState {
        // Drop any previous stream first: never two watches at once.
        self.stream = None;

        match self.source.open(&self.resource_version).await {
            Ok(stream) => {
                info!("Watching DummySite resources from version {}", self.resource_version());
                self.stream = Some(stream);
                self.backoff.reset();
                WatchState::Watching
            }
            Err(e) => {
                error!("Failed to start DummySite watch: {}", e);
                WatchState::StartupFailed
            }
        }
    }

    async fn next_event(&mut self) -> WatchState {
        let Some(stream) = self.stream.as_mut() else {
            return WatchState::Connecting;
        };
        let item = stream.next().await;

        match item {
            Some(Ok(event)) => {
                self.dispatch(event).await;
                WatchState::Watching
            }
            Some(Err(ControllerError::WatchExpired(reason))) => {
                warn!("Watch resume point expired ({}), replaying from scratch", reason);
                self.resource_version = REPLAY_RESOURCE_VERSION.to_string();
                self.stream = None;
                WatchState::Disconnected
            }
            Some(Err(e)) => {
                error!("DummySite watch error: {}", e);
                self.stream = None;
                WatchState::Disconnected
            }
            None => {
                info!(
                    "DummySite watch ended by the API server, resuming from version {}",
                    self.resource_version
                );
                self.stream = None;
                WatchState::Disconnected
            }
        }
    }

    async fn dispatch(&mut self, event: SiteEvent) {
        match event {
            SiteEvent::Added(site) => {
                self.track(&site);
                debug!("DummySite added: {}", site.site_name().unwrap_or("<unknown>"));
                self.reconciler.handle_added(&site).await;
            }
            SiteEvent::Modified(site) => {
                self.track(&site);
                debug!("Ignoring modified DummySite {}", site.site_name().unwrap_or("<unknown>"));
            }
            SiteEvent::Deleted(site) => {
                self.track(&site);
                debug!("Ignoring deleted DummySite {}", site.site_name().unwrap_or("<unknown>"));
            }
            SiteEvent::Bookmark(version) => {
                self.resource_version = version;
            }
        }
    }

    fn track(&mut self, site: &DummySite) {
        if let Some(version) = site.metadata.resource_version.as_ref() {
            self.resource_version.clone_from(version);
        }
    }
}

#[cfg(test)]
#[path = "watcher_test.rs"]
mod watcher_test;
