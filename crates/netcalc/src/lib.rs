//! IPv4 subnet planning engine
//!
//! Pure CIDR arithmetic, admissibility validation and the two allocation
//! algorithms (fixed segment count with VLAN tagging, minimum host
//! capacity). No I/O and no async; callers stream incremental results
//! through a sink closure.

mod alloc;
mod cidr;
mod validate;

pub use alloc::{AllocStep, AllocationRequest, allocate};
pub use cidr::{NetworkSpec, SubnetResult, Subnets, parse_network, required_prefix};
pub use validate::{
    MAX_HOSTS, MAX_SEGMENTS, MAX_VLAN_ID, VlanEntry, validate_host_count, validate_network,
    validate_vlan_entries, vlan_plan,
};

use thiserror::Error;

/// Why a request was rejected or an allocation stopped.
///
/// `Format`, `Range` and `Policy` are pre-flight failures raised before
/// any work starts. `Capacity` is raised while allocating, once the
/// address space turns out to be too small for what was asked.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocError {
    #[error("{0}")]
    Format(String),

    #[error("{0}")]
    Range(String),

    #[error("{0}")]
    Policy(String),

    #[error("{0}")]
    Capacity(String),
}

pub type Result<T> = std::result::Result<T, AllocError>;
