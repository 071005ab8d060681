// SPDX-FileCopyrightText: Copyright (c) 2024-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Intra-node constraint checks: pairwise bandwidth, card type and NUMA
//! locality.
//!
//! The bandwidth/type checks are hard constraints that decide whether a
//! candidate assignment is feasible at all. NUMA locality is a soft
//! constraint: [`numa_violations`] only scores an already-feasible
//! assignment, except that a dangling device reference makes the whole
//! candidate infeasible.

use crate::protocols::{NodeResource, PodAllocation, PodCardRequest};

/// Hard feasibility check for one pod's device set on one node.
///
/// Passes iff every index is a free device on the node, every device
/// matches the pod's card type (when one is requested), and every
/// unordered pair of assigned devices meets the pod's minimum pairwise
/// topology score. A topology index outside the matrix fails the
/// candidate. With `topology_enable` off the matrix is not consulted.
pub fn check_assignment(
    node: &NodeResource,
    device_ids: &[usize],
    request: &PodCardRequest,
    topology_enable: bool,
) -> bool {
    for &id in device_ids {
        let Some(device) = node.unused_devices.get(&id) else {
            return false;
        };
        if let Some(wanted) = request.card_type.as_deref() {
            if device.device_type != wanted {
                return false;
            }
        }
    }
    if topology_enable && !pairwise_bandwidth_ok(&node.topology, device_ids, request.intra_bandwidth)
    {
        return false;
    }
    true
}

/// Every unordered pair `(a, b)` of distinct indices must satisfy
/// `topology[a][b] >= min_bandwidth`. A single device trivially passes.
fn pairwise_bandwidth_ok(topology: &[Vec<u32>], device_ids: &[usize], min_bandwidth: u32) -> bool {
    for (pos, &row) in device_ids.iter().enumerate() {
        for &col in &device_ids[pos + 1..] {
            let Some(score) = topology.get(row).and_then(|r| r.get(col)) else {
                return false;
            };
            if *score < min_bandwidth {
                return false;
            }
        }
    }
    true
}

/// Count pods whose assigned devices span two or more NUMA domains.
///
/// Returns `None` when an allocation references a device missing from the
/// node's free set, which makes the candidate infeasible rather than
/// merely penalized.
pub fn numa_violations(node: &NodeResource, allocations: &[PodAllocation]) -> Option<usize> {
    let mut invalid_pods = 0;
    for allocation in allocations {
        let mut pod_numa: Option<i32> = None;
        for &id in &allocation.device_ids {
            let device = node.unused_devices.get(&id)?;
            match pod_numa {
                Some(numa) if numa != device.numa => {
                    invalid_pods += 1;
                    break;
                }
                _ => pod_numa = Some(device.numa),
            }
        }
    }
    Some(invalid_pods)
}
