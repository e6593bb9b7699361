//! Wire shapes for the allocation API.

use serde::{Deserialize, Serialize};

use netcalc::{
    AllocError, AllocationRequest, Result as AllocResult, VlanEntry, validate_host_count,
    validate_network, validate_vlan_entries, vlan_plan,
};

/// A submission, tagged by allocation mode.
///
/// Segment mode takes either an explicit ordered `vlans` list or the
/// `segments` + `vlan_start` shorthand, which expands to consecutive
/// VLAN ids starting at `vlan_start` (default 1).
#[derive(Debug, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SubmitRequest {
    Segments {
        network: String,
        #[serde(default)]
        vlans: Option<Vec<VlanEntry>>,
        #[serde(default)]
        segments: Option<u32>,
        #[serde(default)]
        vlan_start: Option<u16>,
    },
    Hosts {
        network: String,
        hosts: u32,
    },
}

impl SubmitRequest {
    /// Run every pre-flight check and produce the engine request.
    /// Any failure here blocks task creation entirely.
    pub fn into_allocation(self) -> AllocResult<AllocationRequest> {
        match self {
            SubmitRequest::Segments {
                network,
                vlans,
                segments,
                vlan_start,
            } => {
                let spec = validate_network(&network)?;
                let vlans = match vlans {
                    Some(entries) => {
                        validate_vlan_entries(&entries)?;
                        entries
                    }
                    None => {
                        let count = segments.ok_or_else(|| {
                            AllocError::Range(
                                "Number of segments must be between 1 and 64".to_string(),
                            )
                        })?;
                        vlan_plan(count, vlan_start.unwrap_or(1))?
                    }
                };
                Ok(AllocationRequest::Segments { spec, vlans })
            }
            SubmitRequest::Hosts { network, hosts } => {
                let spec = validate_network(&network)?;
                validate_host_count(hosts)?;
                Ok(AllocationRequest::HostCapacity { spec, hosts })
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub status: &'static str,
    pub task_id: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: &'static str,
    pub message: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            message: message.into(),
        }
    }
}
