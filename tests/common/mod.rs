//! In-memory fake backend
//!
//! Simulates a network-management daemon whose operations complete
//! asynchronously: activation, deactivation and deletion requests are
//! acknowledged immediately but only manifest after a configurable number
//! of cache refreshes, which is what the convergence verifier has to poll
//! through. Individual calls can be made to fail for partial-apply tests.

use async_trait::async_trait;
use libnetstate::backend::{
    backend_error, DeviceHandle, DeviceState, NetworkBackend, Profile, ProfileOrigin,
};
use libnetstate::state::InterfaceType;
use libnetstate::NetstateResult;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct FakeDevice {
    iface_type: InterfaceType,
    state: DeviceState,
    config: HashMap<String, serde_json::Value>,
}

#[derive(Debug)]
enum PendingAction {
    Activate(String),
    Deactivate(String),
    Delete(String),
}

#[derive(Debug)]
struct PendingOp {
    countdown: u32,
    action: PendingAction,
}

#[derive(Default)]
struct Inner {
    profiles: HashMap<String, Profile>,
    devices: HashMap<String, FakeDevice>,
    pending: Vec<PendingOp>,
    /// call key (e.g. "activate:eth1.101") -> failure reason
    fail: HashMap<String, String>,
    /// every backend call, in order
    calls: Vec<String>,
}

pub struct FakeBackend {
    inner: Arc<RwLock<Inner>>,
    /// refreshes before a queued async action manifests
    settle_polls: u32,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::with_settle_polls(1)
    }

    pub fn with_settle_polls(settle_polls: u32) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner::default())),
            settle_polls,
        }
    }

    /// Seed a pre-existing device not managed by the tool (e.g. a physical
    /// NIC)
    pub async fn seed_external_device(&self, name: &str, iface_type: InterfaceType) {
        let mut inner = self.inner.write().await;
        inner.devices.insert(name.to_string(), FakeDevice {
            iface_type,
            state: DeviceState::Activated,
            config: HashMap::new(),
        });
    }

    /// Seed a device together with a managed profile, as if a previous
    /// cycle of this tool had created it
    pub async fn seed_managed_device(
        &self,
        name: &str,
        iface_type: InterfaceType,
        config: HashMap<String, serde_json::Value>,
    ) {
        let mut inner = self.inner.write().await;
        inner.profiles.insert(name.to_string(), Profile {
            uuid: format!("seeded-{}", name),
            name: name.to_string(),
            iface_type,
            settings: config.clone(),
            ipv4: Default::default(),
            ipv6: Default::default(),
            origin: ProfileOrigin::Managed,
        });
        inner.devices.insert(name.to_string(), FakeDevice {
            iface_type,
            state: DeviceState::Activated,
            config,
        });
    }

    /// Make one backend call fail; key is `"{method}:{name}"`
    pub async fn fail_on(&self, key: &str, reason: &str) {
        self.inner.write().await.fail.insert(key.to_string(), reason.to_string());
    }

    pub async fn calls(&self) -> Vec<String> {
        self.inner.read().await.calls.clone()
    }

    pub async fn has_device(&self, name: &str) -> bool {
        self.inner.read().await.devices.contains_key(name)
    }
}

impl Inner {
    fn record(&mut self, call: String) {
        self.calls.push(call);
    }

    fn check_fail(&self, method: &str, name: &str) -> NetstateResult<()> {
        let key = format!("{}:{}", method, name);
        if let Some(reason) = self.fail.get(&key) {
            return Err(backend_error(method, reason.clone()));
        }
        Ok(())
    }

    /// Advance pending async work by one refresh; settle what reaches zero
    fn advance(&mut self) {
        for op in &mut self.pending {
            op.countdown = op.countdown.saturating_sub(1);
        }
        let (ready, waiting): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.pending).into_iter().partition(|op| op.countdown == 0);
        self.pending = waiting;
        for op in ready {
            match op.action {
                PendingAction::Activate(name) => {
                    if let Some(profile) = self.profiles.get(&name) {
                        self.devices.insert(name.clone(), FakeDevice {
                            iface_type: profile.iface_type,
                            state: DeviceState::Activated,
                            config: profile.settings.clone(),
                        });
                    }
                }
                PendingAction::Deactivate(name) => {
                    if let Some(device) = self.devices.get_mut(&name) {
                        device.state = DeviceState::Deactivated;
                    }
                }
                PendingAction::Delete(name) => {
                    self.devices.remove(&name);
                }
            }
        }
    }
}

#[async_trait]
impl NetworkBackend for FakeBackend {
    async fn refresh_cache(&self) -> NetstateResult<()> {
        let mut inner = self.inner.write().await;
        inner.record("refresh_cache".to_string());
        inner.advance();
        Ok(())
    }

    async fn list_devices(&self) -> NetstateResult<Vec<DeviceHandle>> {
        let inner = self.inner.read().await;
        let mut devices: Vec<DeviceHandle> = inner
            .devices
            .iter()
            .map(|(name, dev)| DeviceHandle {
                name: name.clone(),
                iface_type: dev.iface_type,
                state: dev.state,
            })
            .collect();
        devices.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(devices)
    }

    async fn get_device(&self, name: &str) -> NetstateResult<Option<DeviceHandle>> {
        let inner = self.inner.read().await;
        Ok(inner.devices.get(name).map(|dev| DeviceHandle {
            name: name.to_string(),
            iface_type: dev.iface_type,
            state: dev.state,
        }))
    }

    async fn get_profile(&self, name: &str) -> NetstateResult<Option<Profile>> {
        Ok(self.inner.read().await.profiles.get(name).cloned())
    }

    async fn add_profile(&self, profile: &Profile) -> NetstateResult<()> {
        let mut inner = self.inner.write().await;
        inner.record(format!("add_profile:{}", profile.name));
        inner.check_fail("add_profile", &profile.name)?;
        inner.profiles.insert(profile.name.clone(), profile.clone());
        Ok(())
    }

    async fn update_profile(&self, profile: &Profile) -> NetstateResult<()> {
        let mut inner = self.inner.write().await;
        inner.record(format!("update_profile:{}", profile.name));
        inner.check_fail("update_profile", &profile.name)?;
        if !inner.profiles.contains_key(&profile.name) {
            return Err(backend_error("update_profile", format!("no profile '{}'", profile.name)));
        }
        inner.profiles.insert(profile.name.clone(), profile.clone());
        Ok(())
    }

    async fn activate(&self, name: &str) -> NetstateResult<()> {
        let mut inner = self.inner.write().await;
        inner.record(format!("activate:{}", name));
        inner.check_fail("activate", name)?;
        if !inner.profiles.contains_key(name) {
            return Err(backend_error("activate", format!("no profile '{}'", name)));
        }
        let countdown = self.settle_polls;
        inner.pending.push(PendingOp {
            countdown,
            action: PendingAction::Activate(name.to_string()),
        });
        Ok(())
    }

    async fn deactivate(&self, device: &DeviceHandle) -> NetstateResult<()> {
        let mut inner = self.inner.write().await;
        inner.record(format!("deactivate:{}", device.name));
        inner.check_fail("deactivate", &device.name)?;
        let countdown = self.settle_polls;
        inner.pending.push(PendingOp {
            countdown,
            action: PendingAction::Deactivate(device.name.clone()),
        });
        Ok(())
    }

    async fn delete_device(&self, device: &DeviceHandle) -> NetstateResult<()> {
        let mut inner = self.inner.write().await;
        inner.record(format!("delete_device:{}", device.name));
        inner.check_fail("delete_device", &device.name)?;
        inner.profiles.remove(&device.name);
        let countdown = self.settle_polls;
        inner.pending.push(PendingOp {
            countdown,
            action: PendingAction::Delete(device.name.clone()),
        });
        Ok(())
    }

    async fn query_info(&self, device: &DeviceHandle) -> NetstateResult<HashMap<String, serde_json::Value>> {
        let inner = self.inner.read().await;
        let dev = inner
            .devices
            .get(&device.name)
            .ok_or_else(|| backend_error("query_info", format!("no device '{}'", device.name)))?;
        Ok(dev.config.clone())
    }
}
