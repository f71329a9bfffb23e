//! Interface state model
//!
//! Typed value objects describing desired or current interface
//! configuration. A `SystemState` snapshot is rebuilt fresh every
//! reconciliation cycle, both from user input and from a live query, and is
//! never mutated afterwards.

use crate::error::{NetstateError, NetstateResult};
use crate::schema;
use crate::validation;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Interface type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterfaceType {
    Ethernet,
    Vlan,
    Bond,
    Bridge,
    Dummy,
    Unknown,
}

impl fmt::Display for InterfaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InterfaceType::Ethernet => "ethernet",
            InterfaceType::Vlan => "vlan",
            InterfaceType::Bond => "bond",
            InterfaceType::Bridge => "bridge",
            InterfaceType::Dummy => "dummy",
            InterfaceType::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// Administrative state of an interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminState {
    /// Interface should exist and be activated
    Up,
    /// Interface should exist but stay deactivated
    Down,
    /// Interface should not exist
    Absent,
}

impl fmt::Display for AdminState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AdminState::Up => "up",
            AdminState::Down => "down",
            AdminState::Absent => "absent",
        };
        write!(f, "{}", s)
    }
}

/// Desired or queried configuration of a single interface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceState {
    /// Interface name, unique within a snapshot
    pub name: String,
    /// Interface type
    #[serde(rename = "type")]
    pub iface_type: InterfaceType,
    /// Administrative state
    #[serde(default = "default_admin_state")]
    pub admin_state: AdminState,
    /// Name of the interface this one is layered on (e.g. a VLAN's base
    /// device). A naming relation, not ownership.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_iface: Option<String>,
    /// Type-specific settings subtree
    #[serde(default)]
    pub config: HashMap<String, serde_json::Value>,
    /// Whether this tool created the interface profile. Set by the live
    /// query, never by user input.
    #[serde(default, skip_serializing)]
    pub owned: bool,
}

fn default_admin_state() -> AdminState {
    AdminState::Up
}

impl InterfaceState {
    /// Create an interface state with an empty config subtree
    pub fn new(name: impl Into<String>, iface_type: InterfaceType, admin_state: AdminState) -> Self {
        Self {
            name: name.into(),
            iface_type,
            admin_state,
            base_iface: None,
            config: HashMap::new(),
            owned: false,
        }
    }

    /// Create a VLAN interface state named `{base}.{id}` by convention
    pub fn vlan(base_iface: &str, vlan_id: u16) -> Self {
        let mut config = HashMap::new();
        config.insert(schema::VLAN_ID.to_string(), serde_json::json!(vlan_id));
        config.insert(schema::VLAN_BASE_IFACE.to_string(), serde_json::json!(base_iface));
        Self {
            name: schema::vlan_ifname(base_iface, vlan_id),
            iface_type: InterfaceType::Vlan,
            admin_state: AdminState::Up,
            base_iface: Some(base_iface.to_string()),
            config,
            owned: false,
        }
    }

    /// An absent marker state for an interface name (desired deletion)
    pub fn absent(name: impl Into<String>) -> Self {
        Self::new(name, InterfaceType::Unknown, AdminState::Absent)
    }

    /// Set a key in the type-specific config subtree
    pub fn with_config(mut self, key: &str, value: serde_json::Value) -> Self {
        self.config.insert(key.to_string(), value);
        self
    }

    /// Validate name and type-specific settings
    pub fn validate(&self) -> NetstateResult<()> {
        validation::validate_interface_name(&self.name)?;
        if let Some(base) = &self.base_iface {
            validation::validate_interface_name(base)?;
        }
        if self.iface_type == InterfaceType::Vlan && self.admin_state != AdminState::Absent {
            let id = self.config.get(schema::VLAN_ID)
                .and_then(|v| v.as_u64())
                .ok_or_else(|| NetstateError::InvalidConfig(
                    format!("vlan interface '{}' is missing an integer '{}'", self.name, schema::VLAN_ID)
                ))?;
            validation::validate_vlan_id(id)?;
            if self.base_iface.is_none() {
                return Err(NetstateError::InvalidConfig(
                    format!("vlan interface '{}' has no base-iface", self.name)
                ));
            }
        }
        if let Some(mtu) = self.config.get(schema::MTU) {
            let mtu = mtu.as_u64().ok_or_else(|| NetstateError::InvalidConfig(
                format!("interface '{}' has a non-integer mtu", self.name)
            ))?;
            validation::validate_mtu(mtu)?;
        }
        Ok(())
    }
}

/// Full-system snapshot of interface states
///
/// Order of interfaces is not significant; lookups are by name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemState {
    pub interfaces: Vec<InterfaceState>,
}

impl SystemState {
    pub fn new(interfaces: Vec<InterfaceState>) -> Self {
        Self { interfaces }
    }

    pub fn is_empty(&self) -> bool {
        self.interfaces.is_empty()
    }

    /// Look up an interface by name
    pub fn get(&self, name: &str) -> Option<&InterfaceState> {
        self.interfaces.iter().find(|i| i.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Check name uniqueness only. This is the bar a live-queried snapshot
    /// has to clear; the system is authoritative about its own state.
    pub fn validate_names(&self) -> NetstateResult<()> {
        let mut seen: HashSet<&str> = HashSet::new();
        for iface in &self.interfaces {
            if !seen.insert(iface.name.as_str()) {
                return Err(NetstateError::InvalidConfig(
                    format!("Duplicate interface name '{}'", iface.name)
                ));
            }
        }
        Ok(())
    }

    /// Validate the snapshot in isolation: unique names, per-interface
    /// settings, base references resolving within the snapshot
    pub fn validate(&self) -> NetstateResult<()> {
        self.validate_against(None)
    }

    /// Validate the snapshot, allowing base references to resolve against a
    /// live `current` snapshot as well
    pub fn validate_against(&self, current: Option<&SystemState>) -> NetstateResult<()> {
        self.validate_names()?;
        for iface in &self.interfaces {
            iface.validate()?;
        }
        for iface in &self.interfaces {
            if iface.admin_state == AdminState::Absent {
                continue;
            }
            if let Some(base) = &iface.base_iface {
                let in_self = self.get(base).map(|b| b.admin_state != AdminState::Absent);
                let in_current = current.map(|c| c.contains(base)).unwrap_or(false);
                match in_self {
                    Some(true) => {}
                    Some(false) => {
                        return Err(NetstateError::InvalidConfig(
                            format!("Interface '{}' references base-iface '{}' which is marked absent", iface.name, base)
                        ));
                    }
                    None if in_current => {}
                    None => {
                        return Err(NetstateError::InvalidConfig(
                            format!("Interface '{}' references unknown base-iface '{}'", iface.name, base)
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}
