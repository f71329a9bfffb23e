//! Input validation
//!
//! Checks interface names and type-specific settings before they reach the
//! differ or the backend, so malformed desired state is rejected up front.

use crate::error::{NetstateError, NetstateResult};

/// Maximum length for interface names (Linux kernel limit is 15)
const MAX_INTERFACE_NAME_LEN: usize = 15;

/// Maximum 802.1Q VLAN id
const MAX_VLAN_ID: u64 = 4094;

/// Validate interface name
///
/// Interface names must be alphanumeric with optional dashes, underscores
/// and dots (VLAN names are `{base}.{id}`), and no longer than 15
/// characters (Linux kernel limit)
pub fn validate_interface_name(name: &str) -> NetstateResult<()> {
    if name.is_empty() {
        return Err(NetstateError::InvalidConfig(
            "Interface name cannot be empty".to_string()
        ));
    }

    if name.len() > MAX_INTERFACE_NAME_LEN {
        return Err(NetstateError::InvalidConfig(
            format!("Interface name '{}' too long (max {} characters)", name, MAX_INTERFACE_NAME_LEN)
        ));
    }

    for c in name.chars() {
        if !c.is_ascii_alphanumeric() && c != '-' && c != '_' && c != '.' {
            return Err(NetstateError::InvalidConfig(
                format!("Invalid interface name '{}': contains invalid character '{}'", name, c)
            ));
        }
    }

    // Don't allow names starting with dash (could be interpreted as option)
    // or dot
    if name.starts_with('-') || name.starts_with('.') {
        return Err(NetstateError::InvalidConfig(
            format!("Interface name '{}' cannot start with '{}'", name, &name[..1])
        ));
    }

    Ok(())
}

/// Validate VLAN id (802.1Q allows 0-4094)
pub fn validate_vlan_id(vlan_id: u64) -> NetstateResult<u16> {
    if vlan_id > MAX_VLAN_ID {
        return Err(NetstateError::InvalidConfig(
            format!("vlan id {} must be between 0 and {}", vlan_id, MAX_VLAN_ID)
        ));
    }
    Ok(vlan_id as u16)
}

/// Validate MTU value
pub fn validate_mtu(mtu: u64) -> NetstateResult<()> {
    // Ethernet minimum is 68, maximum is typically 9000 (jumbo frames)
    if mtu < 68 {
        return Err(NetstateError::InvalidConfig(
            "MTU must be at least 68 bytes".to_string()
        ));
    }
    if mtu > 9000 {
        return Err(NetstateError::InvalidConfig(
            "MTU cannot exceed 9000 bytes".to_string()
        ));
    }
    Ok(())
}
