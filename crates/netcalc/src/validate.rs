//! Admissibility policy applied before any allocation starts.
//!
//! Checks run in a fixed order and short-circuit on the first failure so
//! callers always see the most specific rejection message.

use serde::{Deserialize, Serialize};

use crate::cidr::{NetworkSpec, parse_network};
use crate::{AllocError, Result};

/// Highest assignable VLAN identifier (802.1Q).
pub const MAX_VLAN_ID: u16 = 4094;

/// Most segments a single request may ask for.
pub const MAX_SEGMENTS: u32 = 64;

/// Most usable hosts a capacity request may ask for.
pub const MAX_HOSTS: u32 = 4094;

/// Largest admissible network: a /8 (2^24 addresses).
const MAX_NETWORK_ADDRESSES: u64 = 1 << 24;

/// One VLAN tag to pair with one allocated segment, in caller order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VlanEntry {
    pub vlan_id: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vlan_name: Option<String>,
}

/// Full admissibility check for a candidate network, in policy order:
/// syntax, prefix range, octet range, strict network address, size
/// bounds, then the private-network category policy.
pub fn validate_network(text: &str) -> Result<NetworkSpec> {
    let spec = parse_network(text)?;

    if spec.addresses() < 2 {
        return Err(AllocError::Policy("Network is too small".to_string()));
    }
    if spec.addresses() > MAX_NETWORK_ADDRESSES {
        return Err(AllocError::Policy("Network is too large".to_string()));
    }

    let addr = spec.address();
    if addr.is_loopback() {
        return Err(AllocError::Policy(
            "Loopback addresses are not allowed".to_string(),
        ));
    }
    if addr.is_link_local() {
        return Err(AllocError::Policy(
            "Link-local addresses are not allowed".to_string(),
        ));
    }
    if addr.is_multicast() {
        return Err(AllocError::Policy(
            "Multicast addresses are not allowed".to_string(),
        ));
    }
    if addr.octets()[0] >= 240 {
        return Err(AllocError::Policy(
            "Reserved addresses are not allowed".to_string(),
        ));
    }
    if addr.is_unspecified() {
        return Err(AllocError::Policy(
            "Unspecified addresses are not allowed".to_string(),
        ));
    }
    if !addr.is_private() {
        return Err(AllocError::Policy(
            "Only private network addresses are allowed".to_string(),
        ));
    }

    Ok(spec)
}

/// Expand the `segments` + `vlan_start` shorthand into an ordered VLAN
/// list, enforcing the segment-count bound and that no assigned id runs
/// past [`MAX_VLAN_ID`].
pub fn vlan_plan(segment_count: u32, vlan_start: u16) -> Result<Vec<VlanEntry>> {
    if !(1..=MAX_SEGMENTS).contains(&segment_count) {
        return Err(AllocError::Range(
            "Number of segments must be between 1 and 64".to_string(),
        ));
    }
    if !(1..=MAX_VLAN_ID).contains(&vlan_start) {
        return Err(AllocError::Range(
            "VLAN ID must be between 1 and 4094".to_string(),
        ));
    }
    if u32::from(vlan_start) + segment_count - 1 > u32::from(MAX_VLAN_ID) {
        return Err(AllocError::Range(
            "VLAN ID would exceed maximum value of 4094".to_string(),
        ));
    }
    Ok((0..segment_count)
        .map(|i| VlanEntry {
            vlan_id: vlan_start + i as u16,
            vlan_name: None,
        })
        .collect())
}

/// Check an explicitly supplied VLAN list: one entry per segment, each
/// id within range. Duplicate ids are the caller's contract to avoid
/// and are not rejected here.
pub fn validate_vlan_entries(entries: &[VlanEntry]) -> Result<()> {
    let count = entries.len() as u32;
    if !(1..=MAX_SEGMENTS).contains(&count) {
        return Err(AllocError::Range(
            "Number of segments must be between 1 and 64".to_string(),
        ));
    }
    for entry in entries {
        if !(1..=MAX_VLAN_ID).contains(&entry.vlan_id) {
            return Err(AllocError::Range(
                "VLAN ID must be between 1 and 4094".to_string(),
            ));
        }
    }
    Ok(())
}

pub fn validate_host_count(hosts: u32) -> Result<()> {
    if !(1..=MAX_HOSTS).contains(&hosts) {
        return Err(AllocError::Range(
            "Number of hosts must be between 1 and 4094".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_private_networks() {
        for ok in ["10.0.0.0/24", "172.16.0.0/12", "192.168.1.0/24", "10.0.0.0/8"] {
            assert!(validate_network(ok).is_ok(), "{ok}");
        }
    }

    #[test]
    fn rejects_public_networks() {
        assert_eq!(
            validate_network("8.8.8.0/24").unwrap_err(),
            AllocError::Policy("Only private network addresses are allowed".to_string())
        );
    }

    #[test]
    fn rejects_special_categories_with_distinct_messages() {
        let cases = [
            ("127.0.0.0/24", "Loopback addresses are not allowed"),
            ("169.254.0.0/16", "Link-local addresses are not allowed"),
            ("224.0.0.0/24", "Multicast addresses are not allowed"),
            ("240.0.0.0/24", "Reserved addresses are not allowed"),
            ("0.0.0.0/8", "Unspecified addresses are not allowed"),
        ];
        for (input, msg) in cases {
            assert_eq!(
                validate_network(input).unwrap_err(),
                AllocError::Policy(msg.to_string()),
                "{input}"
            );
        }
    }

    #[test]
    fn rejects_size_bounds() {
        // /32 has a single address
        assert_eq!(
            validate_network("10.0.0.0/32").unwrap_err(),
            AllocError::Policy("Network is too small".to_string())
        );
        // /7 is past the /8 ceiling; 10.0.0.0/7 is also not private,
        // but size is checked first
        assert_eq!(
            validate_network("10.0.0.0/7").unwrap_err(),
            AllocError::Policy("Network is too large".to_string())
        );
        // the bounds themselves are admissible
        assert!(validate_network("10.0.0.0/31").is_ok());
        assert!(validate_network("10.0.0.0/8").is_ok());
    }

    #[test]
    fn format_failures_surface_before_policy() {
        assert!(matches!(
            validate_network("8.8.8.1/24"),
            Err(AllocError::Format(_))
        ));
    }

    #[test]
    fn vlan_plan_expands_in_order() {
        let plan = vlan_plan(4, 100).unwrap();
        let ids: Vec<u16> = plan.iter().map(|v| v.vlan_id).collect();
        assert_eq!(ids, vec![100, 101, 102, 103]);
        assert!(plan.iter().all(|v| v.vlan_name.is_none()));
    }

    #[test]
    fn vlan_plan_bounds() {
        assert_eq!(
            vlan_plan(0, 1).unwrap_err(),
            AllocError::Range("Number of segments must be between 1 and 64".to_string())
        );
        assert_eq!(
            vlan_plan(65, 1).unwrap_err(),
            AllocError::Range("Number of segments must be between 1 and 64".to_string())
        );
        assert_eq!(
            vlan_plan(1, 0).unwrap_err(),
            AllocError::Range("VLAN ID must be between 1 and 4094".to_string())
        );
        assert_eq!(
            vlan_plan(1, 4095).unwrap_err(),
            AllocError::Range("VLAN ID must be between 1 and 4094".to_string())
        );
        assert_eq!(
            vlan_plan(2, 4094).unwrap_err(),
            AllocError::Range("VLAN ID would exceed maximum value of 4094".to_string())
        );
        // exactly reaching the ceiling is fine
        assert_eq!(vlan_plan(2, 4093).unwrap().last().unwrap().vlan_id, 4094);
    }

    #[test]
    fn explicit_vlan_entries_checked_per_entry() {
        let entries = vec![
            VlanEntry { vlan_id: 10, vlan_name: Some("mgmt".to_string()) },
            VlanEntry { vlan_id: 20, vlan_name: None },
        ];
        assert!(validate_vlan_entries(&entries).is_ok());

        let bad = vec![VlanEntry { vlan_id: 4095, vlan_name: None }];
        assert!(matches!(
            validate_vlan_entries(&bad),
            Err(AllocError::Range(_))
        ));
    }

    #[test]
    fn host_count_bounds() {
        assert!(validate_host_count(1).is_ok());
        assert!(validate_host_count(4094).is_ok());
        assert!(matches!(validate_host_count(0), Err(AllocError::Range(_))));
        assert!(matches!(
            validate_host_count(4095),
            Err(AllocError::Range(_))
        ));
    }
}
