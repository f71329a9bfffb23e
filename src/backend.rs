//! Backend trait definitions
//!
//! The engine never talks to a network-management daemon directly; it
//! drives an implementation of [`NetworkBackend`]. Backend operations are
//! asynchronous requests whose completion the executor awaits through the
//! batch context, because the underlying subsystem (device activation,
//! kernel netlink work) finishes on its own schedule.

use crate::error::{NetstateError, NetstateResult};
use crate::state::{AdminState, InterfaceState, InterfaceType};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Device state as reported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceState {
    /// Device is up and carrying its configuration
    Activated,
    /// Activation has been requested but not finished
    Activating,
    /// Device exists but is not activated
    Deactivated,
    /// Device exists but cannot be used
    Unavailable,
}

impl DeviceState {
    /// Map to the administrative state the differ and verifier compare on
    pub fn admin_state(&self) -> AdminState {
        match self {
            DeviceState::Activated | DeviceState::Activating => AdminState::Up,
            DeviceState::Deactivated | DeviceState::Unavailable => AdminState::Down,
        }
    }
}

/// Handle to a live device known to the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceHandle {
    pub name: String,
    pub iface_type: InterfaceType,
    pub state: DeviceState,
}

/// Where a profile came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProfileOrigin {
    /// Created by this tool; eligible for removal when dropped from the
    /// desired state
    Managed,
    /// Pre-existing or created by another agent; never removed implicitly
    External,
}

/// IP configuration method for one address family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpMethod {
    /// No addresses for this family
    #[default]
    Disabled,
    /// Addresses from DHCP / autoconf
    Auto,
    /// Statically assigned addresses
    Manual,
}

/// Per-family IP settings carried by a profile
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IpSettings {
    pub method: IpMethod,
    #[serde(default)]
    pub addresses: Vec<String>,
}

impl IpSettings {
    /// The empty settings a freshly created interface profile gets when
    /// the desired state says nothing about IP
    pub fn disabled() -> Self {
        Self::default()
    }
}

/// Interface profile as the backend stores it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub uuid: String,
    pub name: String,
    pub iface_type: InterfaceType,
    /// Type-specific settings subtree
    pub settings: HashMap<String, serde_json::Value>,
    pub ipv4: IpSettings,
    pub ipv6: IpSettings,
    pub origin: ProfileOrigin,
}

impl Profile {
    /// Build a managed profile from a desired interface state. IPv4 and
    /// IPv6 settings default to disabled when the state does not carry any.
    pub fn from_state(iface: &InterfaceState) -> Self {
        Self {
            uuid: Uuid::new_v4().to_string(),
            name: iface.name.clone(),
            iface_type: iface.iface_type,
            settings: iface.config.clone(),
            ipv4: IpSettings::disabled(),
            ipv6: IpSettings::disabled(),
            origin: ProfileOrigin::Managed,
        }
    }
}

/// Abstract capability set of the network-management subsystem
///
/// One live context supports exactly one in-flight apply batch at a time;
/// concurrent reconciliation cycles against the same backend must be
/// serialized by the caller.
#[async_trait]
pub trait NetworkBackend: Send + Sync {
    /// Invalidate and reload the backend's cached view of system state
    async fn refresh_cache(&self) -> NetstateResult<()>;

    /// List all devices currently known to the backend
    async fn list_devices(&self) -> NetstateResult<Vec<DeviceHandle>>;

    /// Look up a device by name
    async fn get_device(&self, name: &str) -> NetstateResult<Option<DeviceHandle>>;

    /// Look up the stored profile for an interface name
    async fn get_profile(&self, name: &str) -> NetstateResult<Option<Profile>>;

    /// Build an interface profile from desired state, with empty IP
    /// settings when unspecified
    fn build_profile(&self, iface: &InterfaceState) -> NetstateResult<Profile> {
        iface.validate()?;
        Ok(Profile::from_state(iface))
    }

    /// Store a new profile
    async fn add_profile(&self, profile: &Profile) -> NetstateResult<()>;

    /// Replace an existing profile's settings
    async fn update_profile(&self, profile: &Profile) -> NetstateResult<()>;

    /// Activate the profile with the given interface name
    async fn activate(&self, name: &str) -> NetstateResult<()>;

    /// Deactivate a device
    async fn deactivate(&self, device: &DeviceHandle) -> NetstateResult<()>;

    /// Delete a device and its profile
    async fn delete_device(&self, device: &DeviceHandle) -> NetstateResult<()>;

    /// Query the type-specific config subtree of a live device
    async fn query_info(&self, device: &DeviceHandle) -> NetstateResult<HashMap<String, serde_json::Value>>;
}

/// Convenience constructor for backend call failures
pub fn backend_error(operation: &str, reason: impl Into<String>) -> NetstateError {
    NetstateError::Backend {
        operation: operation.to_string(),
        reason: reason.into(),
    }
}
