//! Apply executor
//!
//! Drives the backend through an ordered change-set. Each operation runs
//! inside its own batched transactional context, drained before the next
//! operation starts, so the backend's change queue is empty between
//! operations even though its work completes asynchronously.
//!
//! There is no automatic rollback: on a mid-changeset failure the
//! already-applied prefix stays on the system and the error names the
//! failed operation and the unexecuted remainder. Re-diffing against live
//! state and retrying is the recovery path.

use crate::backend::NetworkBackend;
use crate::batch::BatchContext;
use crate::diff::{ChangeSet, Operation, OperationKind};
use crate::error::{NetstateError, NetstateResult};
use tracing::{debug, info, warn};

/// Execute an ordered change-set against the backend
///
/// Mutates live system network configuration; never simulated. The backend
/// context supports one in-flight apply at a time, so concurrent cycles
/// must be serialized by the caller.
pub async fn apply(changeset: &ChangeSet, backend: &dyn NetworkBackend) -> NetstateResult<()> {
    for (index, op) in changeset.ops.iter().enumerate() {
        debug!("applying operation {}: {}", index, op.describe());
        if let Err(err) = apply_one(op, backend).await {
            let remaining = changeset.ops[index + 1..]
                .iter()
                .map(|op| op.describe())
                .collect();
            return Err(NetstateError::ApplyFailure {
                index,
                operation: op.describe(),
                reason: err.to_string(),
                remaining,
            });
        }
    }
    info!("applied {} operation(s)", changeset.len());
    Ok(())
}

async fn apply_one(op: &Operation, backend: &dyn NetworkBackend) -> NetstateResult<()> {
    match op.kind {
        OperationKind::Create => create(op, backend).await,
        OperationKind::Modify => modify(op, backend).await,
        OperationKind::Delete => delete(op, backend).await,
        OperationKind::Activate => activate(op, backend).await,
        OperationKind::Deactivate => deactivate(op, backend).await,
    }
}

/// Build the profile (empty IP settings unless specified), add it, wait for
/// the queue to drain, then activate
async fn create(op: &Operation, backend: &dyn NetworkBackend) -> NetstateResult<()> {
    let profile = backend.build_profile(&op.iface)?;
    let mut batch = BatchContext::new(op.describe());
    batch.queue(backend.add_profile(&profile));
    batch.drain().await?;
    batch.queue(backend.activate(&op.iface.name));
    batch.drain().await?;
    info!("created and activated '{}'", op.iface.name);
    Ok(())
}

/// Update the stored profile, then reactivate so the device picks up the
/// new settings
async fn modify(op: &Operation, backend: &dyn NetworkBackend) -> NetstateResult<()> {
    let profile = backend.build_profile(&op.iface)?;
    let mut batch = BatchContext::new(op.describe());
    batch.queue(backend.update_profile(&profile));
    batch.drain().await?;
    batch.queue(backend.activate(&op.iface.name));
    batch.drain().await?;
    info!("modified and reactivated '{}'", op.iface.name);
    Ok(())
}

/// Deactivate, wait for the queue to drain, then delete
async fn delete(op: &Operation, backend: &dyn NetworkBackend) -> NetstateResult<()> {
    let Some(device) = backend.get_device(&op.iface.name).await? else {
        // Already gone; deletion is idempotent
        debug!("device '{}' already absent, nothing to delete", op.iface.name);
        return Ok(());
    };
    let mut batch = BatchContext::new(op.describe());
    batch.queue(backend.deactivate(&device));
    batch.drain().await?;
    batch.queue(backend.delete_device(&device));
    batch.drain().await?;
    info!("deleted '{}'", op.iface.name);
    Ok(())
}

async fn activate(op: &Operation, backend: &dyn NetworkBackend) -> NetstateResult<()> {
    let mut batch = BatchContext::new(op.describe());
    batch.queue(backend.activate(&op.iface.name));
    batch.drain().await?;
    info!("activated '{}'", op.iface.name);
    Ok(())
}

async fn deactivate(op: &Operation, backend: &dyn NetworkBackend) -> NetstateResult<()> {
    let Some(device) = backend.get_device(&op.iface.name).await? else {
        warn!("device '{}' not found for deactivation", op.iface.name);
        return Ok(());
    };
    let mut batch = BatchContext::new(op.describe());
    batch.queue(backend.deactivate(&device));
    batch.drain().await?;
    info!("deactivated '{}'", op.iface.name);
    Ok(())
}
