//! Test utilities for unit testing the controller
//!
//! This module provides in-memory stand-ins for the cluster and helpers for
//! creating test data.

use crate::backoff::Sleeper;
use crate::error::ControllerError;
use crate::store::{Applied, ObjectKind, ObjectStore, StoreError};
use crate::watcher::{SiteEvent, SiteEventSource, SiteEventStream};
use crds::{DummySite, DummySiteSpec};
use futures::StreamExt;
use futures::stream;
use k8s_openapi::api::core::v1::{ConfigMap, Pod, Service};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Helper to create test DummySite CRD
pub fn create_test_dummy_site(name: &str, url: &str) -> DummySite {
    let mut site = DummySite::new(
        name,
        DummySiteSpec {
            website_url: url.to_string(),
        },
    );
    site.metadata.namespace = Some("default".to_string());
    site
}

/// Helper to create test DummySite CRD carrying a resource version
pub fn create_versioned_dummy_site(name: &str, url: &str, resource_version: &str) -> DummySite {
    let mut site = create_test_dummy_site(name, url);
    site.metadata.resource_version = Some(resource_version.to_string());
    site
}

/// One recorded object store call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    CreateConfigMap(String),
    ReplaceConfigMap(String),
    CreatePod(String),
    CreateService(String),
}

/// In-memory ObjectStore recording every call in order
#[derive(Clone, Default)]
pub struct MockObjectStore {
    config_maps: Arc<Mutex<BTreeMap<String, ConfigMap>>>,
    pods: Arc<Mutex<BTreeMap<String, Pod>>>,
    services: Arc<Mutex<BTreeMap<String, Service>>>,
    calls: Arc<Mutex<Vec<StoreCall>>>,
    failures: Arc<Mutex<HashMap<ObjectKind, (u16, String)>>>,
}

impl MockObjectStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call for `kind` fail with the given API status
    pub fn fail_on(&self, kind: ObjectKind, code: u16, reason: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert(kind, (code, reason.to_string()));
    }

    /// Pre-populate a Pod (for test setup)
    pub fn insert_pod(&self, pod: Pod) {
        let name = pod.metadata.name.clone().unwrap();
        self.pods.lock().unwrap().insert(name, pod);
    }

    /// Pre-populate a Service (for test setup)
    pub fn insert_service(&self, service: Service) {
        let name = service.metadata.name.clone().unwrap();
        self.services.lock().unwrap().insert(name, service);
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn config_map(&self, name: &str) -> Option<ConfigMap> {
        self.config_maps.lock().unwrap().get(name).cloned()
    }

    pub fn pod(&self, name: &str) -> Option<Pod> {
        self.pods.lock().unwrap().get(name).cloned()
    }

    pub fn service(&self, name: &str) -> Option<Service> {
        self.services.lock().unwrap().get(name).cloned()
    }

    fn record(&self, call: StoreCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn injected_failure(&self, kind: ObjectKind) -> Result<(), StoreError> {
        match self.failures.lock().unwrap().get(&kind) {
            Some((code, reason)) => Err(StoreError::Api {
                code: *code,
                reason: reason.clone(),
                message: format!("injected {} failure", kind),
            }),
            None => Ok(()),
        }
    }
}

fn create_in<T: Clone>(objects: &Mutex<BTreeMap<String, T>>, name: &str, object: &T) -> Applied<T> {
    let mut objects = objects.lock().unwrap();
    if objects.contains_key(name) {
        Applied::AlreadyExists
    } else {
        objects.insert(name.to_string(), object.clone());
        Applied::Created(object.clone())
    }
}

#[async_trait::async_trait]
impl ObjectStore for MockObjectStore {
    fn namespace(&self) -> &str {
        "default"
    }

    async fn create_config_map(&self, config_map: &ConfigMap) -> Result<Applied<ConfigMap>, StoreError> {
        let name = config_map.metadata.name.clone().unwrap_or_default();
        self.record(StoreCall::CreateConfigMap(name.clone()));
        self.injected_failure(ObjectKind::ConfigMap)?;
        Ok(create_in(&self.config_maps, &name, config_map))
    }

    async fn replace_config_map(&self, name: &str, config_map: &ConfigMap) -> Result<ConfigMap, StoreError> {
        self.record(StoreCall::ReplaceConfigMap(name.to_string()));
        self.injected_failure(ObjectKind::ConfigMap)?;
        let mut config_maps = self.config_maps.lock().unwrap();
        if !config_maps.contains_key(name) {
            return Err(StoreError::Api {
                code: 404,
                reason: "NotFound".to_string(),
                message: format!("configmaps \"{}\" not found", name),
            });
        }
        config_maps.insert(name.to_string(), config_map.clone());
        Ok(config_map.clone())
    }

    async fn create_pod(&self, pod: &Pod) -> Result<Applied<Pod>, StoreError> {
        let name = pod.metadata.name.clone().unwrap_or_default();
        self.record(StoreCall::CreatePod(name.clone()));
        self.injected_failure(ObjectKind::Pod)?;
        Ok(create_in(&self.pods, &name, pod))
    }

    async fn create_service(&self, service: &Service) -> Result<Applied<Service>, StoreError> {
        let name = service.metadata.name.clone().unwrap_or_default();
        self.record(StoreCall::CreateService(name.clone()));
        self.injected_failure(ObjectKind::Service)?;
        Ok(create_in(&self.services, &name, service))
    }
}

type Session = Result<Vec<Result<SiteEvent, ControllerError>>, ControllerError>;

/// SiteEventSource replaying scripted watch sessions.
///
/// Each `open` consumes the next session: either a startup failure or a list
/// of items after which the stream closes. Once the script runs out, `open`
/// returns a stream that never yields.
#[derive(Clone, Default)]
pub struct ScriptedEventSource {
    sessions: Arc<Mutex<VecDeque<Session>>>,
    opened_from: Arc<Mutex<Vec<String>>>,
}

impl ScriptedEventSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a session delivering `items` then closing
    pub fn push_session(&self, items: Vec<Result<SiteEvent, ControllerError>>) {
        self.sessions.lock().unwrap().push_back(Ok(items));
    }

    /// Queue a failed attempt to open the watch
    pub fn push_startup_failure(&self, reason: &str) {
        self.sessions
            .lock()
            .unwrap()
            .push_back(Err(ControllerError::Watch(reason.to_string())));
    }

    /// Resource versions passed to each `open`, in order
    pub fn opened_from(&self) -> Vec<String> {
        self.opened_from.lock().unwrap().clone()
    }

    pub fn open_count(&self) -> usize {
        self.opened_from.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl SiteEventSource for ScriptedEventSource {
    async fn open(&self, resource_version: &str) -> Result<SiteEventStream, ControllerError> {
        self.opened_from
            .lock()
            .unwrap()
            .push(resource_version.to_string());

        let session = self.sessions.lock().unwrap().pop_front();
        match session {
            Some(Ok(items)) => Ok(stream::iter(items).boxed()),
            Some(Err(e)) => Err(e),
            None => Ok(stream::pending::<Result<SiteEvent, ControllerError>>().boxed()),
        }
    }
}

/// Sleeper that records requested delays and returns immediately
#[derive(Clone, Default)]
pub struct RecordingSleeper {
    delays: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, delay: Duration) {
        self.delays.lock().unwrap().push(delay);
        tokio::task::yield_now().await;
    }
}
