//! The two allocation algorithms.
//!
//! Both run to completion synchronously and push every allocated subnet
//! through the caller's sink together with the progress percentage, so
//! the service layer can publish incremental state without the engine
//! knowing anything about tasks.

use crate::cidr::{MAX_PREFIX, NetworkSpec, SubnetResult, required_prefix};
use crate::validate::VlanEntry;
use crate::{AllocError, Result};

/// A fully validated allocation request, one variant per algorithm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllocationRequest {
    /// Split the network into one equal-size subnet per VLAN entry,
    /// paired in caller order.
    Segments {
        spec: NetworkSpec,
        vlans: Vec<VlanEntry>,
    },
    /// Find the smallest subnet of the network with at least `hosts`
    /// usable addresses.
    HostCapacity { spec: NetworkSpec, hosts: u32 },
}

/// One incremental allocation step: the subnet just produced and the
/// overall progress percentage after it.
#[derive(Debug, Clone)]
pub struct AllocStep {
    pub result: SubnetResult,
    pub progress: u8,
}

/// Run an allocation, emitting one [`AllocStep`] per produced subnet.
///
/// Steps arrive in strictly ascending network-address order with
/// non-decreasing progress. An `Err` return means the address space
/// could not satisfy the request; steps already emitted stay valid as
/// partial output.
pub fn allocate<F>(request: &AllocationRequest, emit: F) -> Result<()>
where
    F: FnMut(AllocStep),
{
    match request {
        AllocationRequest::Segments { spec, vlans } => allocate_segments(spec, vlans, emit),
        AllocationRequest::HostCapacity { spec, hosts } => allocate_by_hosts(spec, *hosts, emit),
    }
}

fn allocate_segments<F>(spec: &NetworkSpec, vlans: &[VlanEntry], mut emit: F) -> Result<()>
where
    F: FnMut(AllocStep),
{
    let count = vlans.len() as u32;
    let new_prefix = required_prefix(spec.prefix(), count);
    if new_prefix > MAX_PREFIX {
        return Err(AllocError::Capacity(
            "Too many segments requested for the given network".to_string(),
        ));
    }

    let ceiling = 1u64 << (new_prefix - spec.prefix());
    if ceiling < u64::from(count) {
        return Err(AllocError::Capacity(format!(
            "Network only supports {ceiling} segments"
        )));
    }

    let mut produced: u32 = 0;
    for (subnet, vlan) in spec.subnets(new_prefix)?.zip(vlans) {
        let mut result = SubnetResult::describe(&subnet);
        result.vlan_id = Some(vlan.vlan_id);
        result.vlan_name = vlan.vlan_name.clone();

        produced += 1;
        emit(AllocStep {
            result,
            progress: percent(produced, count),
        });
    }

    // the ceiling pre-check makes exhaustion unreachable, but a short
    // generator must not silently drop trailing VLAN entries
    if produced < count {
        return Err(AllocError::Capacity(format!(
            "Network exhausted after {produced} segments"
        )));
    }
    Ok(())
}

fn allocate_by_hosts<F>(spec: &NetworkSpec, hosts: u32, mut emit: F) -> Result<()>
where
    F: FnMut(AllocStep),
{
    // network + broadcast come out of every subnet's address budget
    let needed = u64::from(hosts) + 2;

    let block_bits = needed.next_power_of_two().trailing_zeros() as u8;
    if block_bits > MAX_PREFIX - spec.prefix() {
        return Err(AllocError::Capacity(
            "Network cannot satisfy the requested host count".to_string(),
        ));
    }
    // smallest block size 2^k >= needed, i.e. the finest prefix that
    // still fits the requirement
    let chosen = MAX_PREFIX - block_bits;

    for subnet in spec.subnets(chosen)? {
        if subnet.usable_hosts() >= u64::from(hosts) {
            emit(AllocStep {
                result: SubnetResult::describe(&subnet),
                progress: 100,
            });
            return Ok(());
        }
    }
    // unreachable for any in-range request; kept so a boundary case
    // fails loudly instead of completing empty
    Err(AllocError::Capacity(
        "No subnet with enough usable hosts".to_string(),
    ))
}

fn percent(done: u32, total: u32) -> u8 {
    ((f64::from(done) / f64::from(total)) * 100.0).round() as u8
}
