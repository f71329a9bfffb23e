//! Convergence verifier
//!
//! After apply, the desired state is checked against what the system
//! actually reports. Network changes complete asynchronously and can fail
//! silently, so a single query proves nothing; the verifier re-queries at a
//! fixed interval until the state matches or a timeout elapses, and keeps
//! the last observation so the caller can report exactly which fields never
//! converged.

use crate::backend::NetworkBackend;
use crate::diff::{config_diff, FieldDiff};
use crate::error::NetstateResult;
use crate::retry::{retry_till_converged, Attempt, Clock, PollOutcome};
use crate::state::{AdminState, InterfaceState, SystemState};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info};

/// Outcome of one verification pass (or of the whole retried verification)
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VerificationResult {
    pub matched: bool,
    /// Per-interface field-level mismatches, empty when matched
    pub mismatches: BTreeMap<String, Vec<FieldDiff>>,
}

impl VerificationResult {
    fn matched() -> Self {
        Self { matched: true, mismatches: BTreeMap::new() }
    }

    /// One line per mismatching interface, for error reporting
    pub fn summary(&self) -> Vec<String> {
        self.mismatches
            .iter()
            .map(|(name, diffs)| {
                let fields: Vec<String> = diffs.iter().map(|d| d.to_string()).collect();
                format!("{}: {}", name, fields.join(", "))
            })
            .collect()
    }
}

/// Pseudo-field used for existence and admin-state mismatches
const STATE_FIELD: &str = "state";

/// Query the backend once and diff every desired interface against it
async fn check_once(
    desired: &SystemState,
    backend: &dyn NetworkBackend,
) -> NetstateResult<VerificationResult> {
    backend.refresh_cache().await?;

    let mut mismatches: BTreeMap<String, Vec<FieldDiff>> = BTreeMap::new();

    for want in &desired.interfaces {
        let device = backend.get_device(&want.name).await?;
        match (device, want.admin_state) {
            // Desired absent and no device: converged for this interface
            (None, AdminState::Absent) => {}
            (None, _) => {
                mismatches.insert(want.name.clone(), vec![FieldDiff {
                    field: STATE_FIELD.to_string(),
                    desired: serde_json::json!(want.admin_state.to_string()),
                    actual: serde_json::json!("absent"),
                }]);
            }
            (Some(device), AdminState::Absent) => {
                mismatches.insert(want.name.clone(), vec![FieldDiff {
                    field: STATE_FIELD.to_string(),
                    desired: serde_json::json!("absent"),
                    actual: serde_json::json!(device.state.admin_state().to_string()),
                }]);
            }
            (Some(device), admin) => {
                let mut diffs = Vec::new();
                let actual_admin = device.state.admin_state();
                if actual_admin != admin {
                    diffs.push(FieldDiff {
                        field: STATE_FIELD.to_string(),
                        desired: serde_json::json!(admin.to_string()),
                        actual: serde_json::json!(actual_admin.to_string()),
                    });
                }
                let info = backend.query_info(&device).await?;
                diffs.extend(config_diff(&want.config, &info));
                if !diffs.is_empty() {
                    mismatches.insert(want.name.clone(), diffs);
                }
            }
        }
    }

    if mismatches.is_empty() {
        Ok(VerificationResult::matched())
    } else {
        Ok(VerificationResult { matched: false, mismatches })
    }
}

/// Verify that the system converges to `desired`, polling at `interval`
/// until it matches or `timeout` elapses
///
/// Returns the last [`VerificationResult`] either way; on timeout it
/// carries the mismatches that never cleared. In-flight backend work is not
/// aborted by the timeout.
pub async fn verify(
    desired: &SystemState,
    backend: &dyn NetworkBackend,
    timeout: Duration,
    interval: Duration,
    clock: &dyn Clock,
) -> NetstateResult<VerificationResult> {
    let outcome = retry_till_converged(clock, timeout, interval, || async move {
        let result = check_once(desired, backend).await?;
        if result.matched {
            Ok::<_, crate::error::NetstateError>(Attempt::Converged(result))
        } else {
            debug!("verification mismatch: {:?}", result.summary());
            Ok(Attempt::Mismatch(result))
        }
    })
    .await?;

    match outcome {
        PollOutcome::Converged(result) => {
            info!("desired state verified for {} interface(s)", desired.interfaces.len());
            Ok(result)
        }
        PollOutcome::TimedOut(result) => {
            info!(
                "verification timed out with {} interface(s) unconverged",
                result.mismatches.len()
            );
            Ok(result)
        }
    }
}

/// Whether a device has disappeared from the system
///
/// Device teardown is asynchronous, so absence is polled under the same
/// timeout as any other verification.
pub async fn device_absent(
    name: &str,
    backend: &dyn NetworkBackend,
    timeout: Duration,
    interval: Duration,
    clock: &dyn Clock,
) -> NetstateResult<bool> {
    let desired = SystemState::new(vec![InterfaceState::absent(name)]);
    let result = verify(&desired, backend, timeout, interval, clock).await?;
    Ok(result.matched)
}
