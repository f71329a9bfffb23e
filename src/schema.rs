//! Key constants for type-specific config subtrees
//!
//! Desired and current interface state carry their type-specific settings as
//! a string-keyed subtree. These are the fixed keys the differ and verifier
//! compare on, shared with any backend that builds profiles from them.

/// VLAN id (integer, 0-4094)
pub const VLAN_ID: &str = "id";
/// VLAN base interface name
pub const VLAN_BASE_IFACE: &str = "base-iface";

/// Bond mode (e.g. "balance-rr", "active-backup")
pub const BOND_MODE: &str = "mode";
/// Bond port interface names
pub const BOND_PORTS: &str = "ports";

/// Bridge port interface names
pub const BRIDGE_PORTS: &str = "ports";
/// Bridge STP enabled
pub const BRIDGE_STP: &str = "stp";

/// MTU (integer), valid for every interface type
pub const MTU: &str = "mtu";

/// Conventional VLAN interface name: `{base-iface}.{id}`
pub fn vlan_ifname(base_iface: &str, vlan_id: u16) -> String {
    format!("{}.{}", base_iface, vlan_id)
}
