//! Controller configuration.
//!
//! Read once at startup from environment variables. Parsing goes through a
//! lookup function so tests never touch the process environment.

use crate::backoff::{FibonacciBackoff, FixedBackoff, ReconnectBackoff};
use crate::error::ControllerError;
use std::env;
use std::time::Duration;

/// Namespace watched when `WATCH_NAMESPACE` is unset
pub const DEFAULT_NAMESPACE: &str = "default";
/// Image serving the site files when `SITE_SERVER_IMAGE` is unset
pub const DEFAULT_SERVER_IMAGE: &str = "nginx:alpine";
/// Delay between watch reconnect attempts
pub const DEFAULT_RECONNECT_DELAY_SECS: u64 = 5;
/// Cap for the Fibonacci reconnect policy
pub const DEFAULT_RECONNECT_MAX_DELAY_SECS: u64 = 60;
/// Whole-request timeout for site fetches
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// How the watch loop spaces reconnect attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffPolicy {
    /// Same delay every time
    Fixed,
    /// Fibonacci growth from the reconnect delay up to the max delay
    Fibonacci,
}

/// Runtime configuration for the DummySite Controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Namespace holding both the DummySites and the derived objects
    pub namespace: String,
    /// Container image of the static file server
    pub server_image: String,
    /// Base reconnect delay
    pub reconnect_delay: Duration,
    /// Upper bound for growing reconnect delays
    pub reconnect_max_delay: Duration,
    /// Reconnect policy
    pub backoff_policy: BackoffPolicy,
    /// Fetch timeout, `None` when disabled
    pub fetch_timeout: Option<Duration>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            server_image: DEFAULT_SERVER_IMAGE.to_string(),
            reconnect_delay: Duration::from_secs(DEFAULT_RECONNECT_DELAY_SECS),
            reconnect_max_delay: Duration::from_secs(DEFAULT_RECONNECT_MAX_DELAY_SECS),
            backoff_policy: BackoffPolicy::Fixed,
            fetch_timeout: Some(Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS)),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ControllerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let namespace = non_empty(lookup("WATCH_NAMESPACE")).unwrap_or(defaults.namespace);
        let server_image =
            non_empty(lookup("SITE_SERVER_IMAGE")).unwrap_or(defaults.server_image);

        let reconnect_delay = match non_empty(lookup("RECONNECT_DELAY_SECS")) {
            Some(raw) => Duration::from_secs(parse_secs("RECONNECT_DELAY_SECS", &raw)?),
            None => defaults.reconnect_delay,
        };
        let reconnect_max_delay = match non_empty(lookup("RECONNECT_MAX_DELAY_SECS")) {
            Some(raw) => Duration::from_secs(parse_secs("RECONNECT_MAX_DELAY_SECS", &raw)?),
            None => defaults.reconnect_max_delay.max(reconnect_delay),
        };
        if reconnect_max_delay < reconnect_delay {
            return Err(ControllerError::InvalidConfig(format!(
                "RECONNECT_MAX_DELAY_SECS ({}) must not be lower than RECONNECT_DELAY_SECS ({})",
                reconnect_max_delay.as_secs(),
                reconnect_delay.as_secs()
            )));
        }

        let backoff_policy = match non_empty(lookup("RECONNECT_BACKOFF")).as_deref() {
            None | Some("fixed") => BackoffPolicy::Fixed,
            Some("fibonacci") => BackoffPolicy::Fibonacci,
            Some(other) => {
                return Err(ControllerError::InvalidConfig(format!(
                    "RECONNECT_BACKOFF must be 'fixed' or 'fibonacci', got '{}'",
                    other
                )));
            }
        };
        // A Fibonacci sequence seeded with zero never grows.
        if backoff_policy == BackoffPolicy::Fibonacci && reconnect_delay.is_zero() {
            return Err(ControllerError::InvalidConfig(
                "RECONNECT_DELAY_SECS must be at least 1 with the fibonacci policy".to_string(),
            ));
        }

        let fetch_timeout = match non_empty(lookup("FETCH_TIMEOUT_SECS")) {
            Some(raw) => match parse_secs("FETCH_TIMEOUT_SECS", &raw)? {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
            None => defaults.fetch_timeout,
        };

        Ok(Self {
            namespace,
            server_image,
            reconnect_delay,
            reconnect_max_delay,
            backoff_policy,
            fetch_timeout,
        })
    }

    /// Build the reconnect policy this configuration selects.
    pub fn reconnect_backoff(&self) -> Box<dyn ReconnectBackoff> {
        match self.backoff_policy {
            BackoffPolicy::Fixed => Box::new(FixedBackoff::new(self.reconnect_delay)),
            BackoffPolicy::Fibonacci => Box::new(FibonacciBackoff::new(
                self.reconnect_delay.as_secs(),
                self.reconnect_max_delay.as_secs(),
            )),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_secs(key: &str, raw: &str) -> Result<u64, ControllerError> {
    raw.parse::<u64>().map_err(|_| {
        ControllerError::InvalidConfig(format!(
            "{} must be a non-negative integer number of seconds, got '{}'",
            key, raw
        ))
    })
}
