//! Reconciliation cycle orchestration
//!
//! One cycle: query the live system into a fresh snapshot, diff against the
//! desired state, order the change-set along the dependency graph, apply it
//! through the backend, then poll until the system converges. Nothing is
//! shared between cycles; rerunning a cycle against the post-apply system
//! is safe because the diff is computed from live state every time.

use crate::apply::apply;
use crate::backend::{NetworkBackend, ProfileOrigin};
use crate::diff::diff;
use crate::error::{NetstateError, NetstateResult};
use crate::plan::order;
use crate::retry::{Clock, TokioClock};
use crate::schema;
use crate::state::{InterfaceState, SystemState};
use crate::verify::{verify, VerificationResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Engine tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ReconcileSettings {
    /// How long to keep polling for convergence after apply
    pub verify_timeout_secs: u64,
    /// Delay between verification polls
    pub poll_interval_ms: u64,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            verify_timeout_secs: 5,
            poll_interval_ms: 500,
        }
    }
}

impl ReconcileSettings {
    pub fn from_toml_str(s: &str) -> NetstateResult<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn verify_timeout(&self) -> Duration {
        Duration::from_secs(self.verify_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// What a reconciliation cycle did
#[derive(Debug, Clone)]
pub struct ReconcileReport {
    /// Number of operations applied; zero means the system already matched
    pub operations: usize,
    pub verification: VerificationResult,
}

/// Desired-state reconciliation engine
///
/// Holds the long-lived backend context. A reconciler instance must not be
/// driven from two cycles concurrently; the backend supports one in-flight
/// apply batch at a time.
pub struct Reconciler {
    backend: Arc<dyn NetworkBackend>,
    clock: Arc<dyn Clock>,
    settings: ReconcileSettings,
}

impl Reconciler {
    pub fn new(backend: Arc<dyn NetworkBackend>) -> Self {
        Self {
            backend,
            clock: Arc::new(TokioClock),
            settings: ReconcileSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: ReconcileSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Replace the clock driving verification polls. Tests inject a manual
    /// clock here.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Query the backend into a fresh current-state snapshot
    pub async fn query_current(&self) -> NetstateResult<SystemState> {
        self.backend.refresh_cache().await?;
        let devices = self.backend.list_devices().await?;

        let mut interfaces = Vec::with_capacity(devices.len());
        for device in devices {
            let config = self.backend.query_info(&device).await?;
            let profile = self.backend.get_profile(&device.name).await?;
            let base_iface = config
                .get(schema::VLAN_BASE_IFACE)
                .and_then(|v| v.as_str())
                .map(String::from);
            interfaces.push(InterfaceState {
                name: device.name.clone(),
                iface_type: device.iface_type,
                admin_state: device.state.admin_state(),
                base_iface,
                config,
                owned: profile.map(|p| p.origin == ProfileOrigin::Managed).unwrap_or(false),
            });
        }

        debug!("queried current state: {} interface(s)", interfaces.len());
        Ok(SystemState::new(interfaces))
    }

    /// Run one full diff/plan/apply/verify cycle
    pub async fn reconcile(&self, desired: &SystemState) -> NetstateResult<ReconcileReport> {
        let current = self.query_current().await?;
        let changeset = diff(desired, &current)?;

        if changeset.is_empty() {
            info!("system already matches desired state, nothing to apply");
            return Ok(ReconcileReport {
                operations: 0,
                verification: VerificationResult { matched: true, ..Default::default() },
            });
        }

        let plan = order(&changeset)?;
        apply(&plan, self.backend.as_ref()).await?;

        let verification = verify(
            desired,
            self.backend.as_ref(),
            self.settings.verify_timeout(),
            self.settings.poll_interval(),
            self.clock.as_ref(),
        )
        .await?;

        if !verification.matched {
            return Err(NetstateError::VerificationTimeout {
                elapsed: self.settings.verify_timeout(),
                mismatches: verification.summary(),
            });
        }

        Ok(ReconcileReport {
            operations: plan.len(),
            verification,
        })
    }
}
