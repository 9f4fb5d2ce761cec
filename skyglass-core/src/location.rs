//! One-shot "where am I" resolution on top of an opaque device location backend.
//!
//! The backend reports permission state and performs a single low-accuracy fix.
//! [`LocationProvider`] turns that into a [`LocationOutcome`] and applies one
//! [`LocationPolicy`] for the lifetime of the provider.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{
    fmt::Debug,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{error::LocationError, model::Coordinate};

/// Permission state as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationStatus {
    NotDetermined,
    Restricted,
    Denied,
    Authorized,
    /// A state the platform added that this crate does not know about.
    Unknown,
}

/// Parameters of the single fix request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixRequest {
    pub desired_accuracy_m: f64,
    pub distance_filter_m: f64,
}

impl FixRequest {
    /// Kilometer accuracy, 1000 m distance filter.
    pub const LOW_POWER: FixRequest =
        FixRequest { desired_accuracy_m: 1000.0, distance_filter_m: 1000.0 };
}

/// Device geolocation as seen by this crate.
#[async_trait]
pub trait LocationBackend: Send + Sync + Debug {
    fn authorization_status(&self) -> AuthorizationStatus;

    /// Show the OS permission prompt and resolve with the resulting status.
    async fn request_authorization(&self) -> AuthorizationStatus;

    /// One fix; `Ok(None)` when the platform finished without a position.
    async fn request_fix(&self, request: FixRequest) -> anyhow::Result<Option<Coordinate>>;
}

/// What the caller receives for a location request.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationOutcome {
    CoordinateAvailable(Coordinate),
    PermissionDenied,
    PermissionRestricted,
    PermissionUndetermined,
    Failed(String),
}

impl LocationOutcome {
    pub fn coordinate(&self) -> Option<Coordinate> {
        match self {
            LocationOutcome::CoordinateAvailable(c) => Some(*c),
            _ => None,
        }
    }

    pub fn into_result(self) -> Result<Coordinate, LocationError> {
        match self {
            LocationOutcome::CoordinateAvailable(c) => Ok(c),
            LocationOutcome::PermissionDenied => Err(LocationError::PermissionDenied),
            LocationOutcome::PermissionRestricted => Err(LocationError::PermissionRestricted),
            LocationOutcome::PermissionUndetermined => Err(LocationError::PermissionUndetermined),
            LocationOutcome::Failed(reason) => Err(LocationError::Unknown(reason)),
        }
    }
}

/// Handling of every non-success outcome. One provider applies exactly one policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationPolicy {
    /// Each failure reaches the caller as its own outcome.
    Strict,
    /// Every failure becomes the configured default coordinate.
    #[default]
    Fallback,
}

impl TryFrom<&str> for LocationPolicy {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "strict" => Ok(LocationPolicy::Strict),
            "fallback" => Ok(LocationPolicy::Fallback),
            _ => Err(anyhow::anyhow!(
                "Unknown location policy '{value}'. Supported: strict, fallback."
            )),
        }
    }
}

#[derive(Debug)]
pub struct LocationProvider {
    backend: Arc<dyn LocationBackend>,
    policy: LocationPolicy,
    default_coordinate: Coordinate,
    prompted: AtomicBool,
    observer: Mutex<Option<mpsc::UnboundedSender<LocationOutcome>>>,
}

impl LocationProvider {
    pub fn new(
        backend: Arc<dyn LocationBackend>,
        policy: LocationPolicy,
        default_coordinate: Coordinate,
    ) -> Self {
        Self {
            backend,
            policy,
            default_coordinate,
            prompted: AtomicBool::new(false),
            observer: Mutex::new(None),
        }
    }

    pub fn policy(&self) -> LocationPolicy {
        self.policy
    }

    /// Register the observer for future outcomes. Any previous observer is dropped and
    /// its receiver closes.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<LocationOutcome> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.observer.lock().unwrap_or_else(PoisonError::into_inner) = Some(tx);
        rx
    }

    pub fn unsubscribe(&self) {
        self.observer.lock().unwrap_or_else(PoisonError::into_inner).take();
    }

    /// Resolve "here" once, deliver the outcome to the observer, and return it.
    pub async fn request_location(&self) -> LocationOutcome {
        let raw = self.resolve().await;
        let outcome = self.apply_policy(raw);
        self.notify(&outcome);
        outcome
    }

    async fn resolve(&self) -> LocationOutcome {
        let mut status = self.backend.authorization_status();

        // The prompt is shown at most once per provider instance.
        if status == AuthorizationStatus::NotDetermined
            && !self.prompted.swap(true, Ordering::SeqCst)
        {
            debug!("Requesting location authorization");
            status = self.backend.request_authorization().await;
        }

        match status {
            AuthorizationStatus::Authorized => self.fix().await,
            AuthorizationStatus::Denied => LocationOutcome::PermissionDenied,
            AuthorizationStatus::Restricted => LocationOutcome::PermissionRestricted,
            AuthorizationStatus::NotDetermined => LocationOutcome::PermissionUndetermined,
            AuthorizationStatus::Unknown => {
                LocationOutcome::Failed("unrecognized authorization status".to_string())
            }
        }
    }

    async fn fix(&self) -> LocationOutcome {
        match self.backend.request_fix(FixRequest::LOW_POWER).await {
            Ok(Some(coordinate)) => LocationOutcome::CoordinateAvailable(coordinate),
            Ok(None) => LocationOutcome::Failed("no location fix".to_string()),
            Err(e) => {
                warn!(error = %e, "Location fix failed");
                LocationOutcome::Failed(e.to_string())
            }
        }
    }

    fn apply_policy(&self, outcome: LocationOutcome) -> LocationOutcome {
        match (self.policy, outcome) {
            (_, available @ LocationOutcome::CoordinateAvailable(_)) => available,
            (LocationPolicy::Strict, failure) => {
                info!(?failure, "Location unavailable");
                failure
            }
            (LocationPolicy::Fallback, failure) => {
                info!(?failure, fallback = %self.default_coordinate, "Using default location");
                LocationOutcome::CoordinateAvailable(self.default_coordinate)
            }
        }
    }

    fn notify(&self, outcome: &LocationOutcome) {
        let mut observer = self.observer.lock().unwrap_or_else(PoisonError::into_inner);
        let delivered = match observer.as_ref() {
            Some(tx) => tx.send(outcome.clone()).is_ok(),
            None => return,
        };
        if !delivered {
            debug!("Location observer went away");
            observer.take();
        }
    }
}
