// SPDX-FileCopyrightText: Copyright (c) 2024-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Intra-node assignment enumeration.
//!
//! Devices are assigned to pods by labeling each free device slot with a
//! pod index or the sentinel "unused" label. Enumerating *distinct*
//! permutations of the canonical label vector visits every way to
//! partition the node's free devices among the pods exactly once: two
//! labelings that differ only by permuting identical labels collapse into
//! one candidate.

use std::ops::ControlFlow;

use crate::config::AllocatorConfig;
use crate::protocols::{NodeResource, PodAllocation, PodCardRequest};
use crate::topology::{check_assignment, numa_violations};

/// Outcome of the per-node assignment search: one allocation per pod plus
/// the NUMA-violation score of the chosen labeling.
#[derive(Debug, Clone)]
pub struct NodeAssignment {
    pub allocations: Vec<PodAllocation>,
    pub invalid_pods: usize,
}

/// Find the best feasible device assignment for `pods` on `node`.
///
/// With NUMA scoring disabled the first labeling passing the hard checks
/// wins. With it enabled the search tracks the labeling with the fewest
/// NUMA-violating pods and stops early on a violation-free one. Returns
/// `None` when no labeling passes.
///
/// Enumeration order is deterministic: slots are the node's free device
/// indices ascending, labelings follow multiset-permutation order over
/// the canonical label vector.
pub fn assign_devices(
    node: &NodeResource,
    pods: &[&PodCardRequest],
    config: &AllocatorConfig,
) -> Option<NodeAssignment> {
    let free_ids = node.free_device_ids();
    let wanted: usize = pods.iter().map(|p| p.num_cards).sum();
    if wanted > free_ids.len() {
        return None;
    }

    let labels = label_vector(free_ids.len(), pods);
    let mut best: Option<NodeAssignment> = None;

    let _ = for_each_labeling(&labels, &mut |labeling| {
        let per_pod = device_ids_per_pod(labeling, &free_ids, pods.len());
        let Some(allocations) = build_allocations(node, pods, per_pod, config.topology_enable)
        else {
            return ControlFlow::Continue(());
        };

        if !config.numa_enable {
            best = Some(NodeAssignment {
                allocations,
                invalid_pods: 0,
            });
            return ControlFlow::Break(());
        }

        let Some(invalid_pods) = numa_violations(node, &allocations) else {
            return ControlFlow::Continue(());
        };
        if best
            .as_ref()
            .is_none_or(|current| invalid_pods < current.invalid_pods)
        {
            best = Some(NodeAssignment {
                allocations,
                invalid_pods,
            });
        }
        if invalid_pods == 0 {
            return ControlFlow::Break(());
        }
        ControlFlow::Continue(())
    });

    if best.is_none() {
        tracing::debug!(
            node = %node.node_name,
            pods = pods.len(),
            "no feasible device labeling on node"
        );
    }
    best
}

/// Canonical label vector: pod index `i` repeated `num_cards[i]` times,
/// padded with the sentinel label (`pods.len()`) for unassigned slots.
/// Already sorted, which the duplicate-skip rule below relies on.
fn label_vector(slot_count: usize, pods: &[&PodCardRequest]) -> Vec<usize> {
    let mut labels = Vec::with_capacity(slot_count);
    for (pod_idx, pod) in pods.iter().enumerate() {
        labels.extend(std::iter::repeat_n(pod_idx, pod.num_cards));
    }
    labels.resize(slot_count, pods.len());
    labels
}

/// Visit every distinct permutation of `labels` in multiset-permutation
/// order. The visitor can short-circuit the enumeration.
fn for_each_labeling(
    labels: &[usize],
    visit: &mut impl FnMut(&[usize]) -> ControlFlow<()>,
) -> ControlFlow<()> {
    let mut visited = vec![false; labels.len()];
    let mut current = Vec::with_capacity(labels.len());
    permute_distinct(labels, &mut visited, &mut current, visit)
}

fn permute_distinct(
    labels: &[usize],
    visited: &mut [bool],
    current: &mut Vec<usize>,
    visit: &mut impl FnMut(&[usize]) -> ControlFlow<()>,
) -> ControlFlow<()> {
    if current.len() == labels.len() {
        return visit(current);
    }
    for i in 0..labels.len() {
        if visited[i] {
            continue;
        }
        // Among equal labels only the leftmost unvisited one may be
        // chosen, which prunes permutations of identical labels.
        if i > 0 && labels[i] == labels[i - 1] && !visited[i - 1] {
            continue;
        }
        visited[i] = true;
        current.push(labels[i]);
        let flow = permute_distinct(labels, visited, current, visit);
        current.pop();
        visited[i] = false;
        flow?;
    }
    ControlFlow::Continue(())
}

/// Group slot positions by pod label and map them back to device indices.
fn device_ids_per_pod(labeling: &[usize], free_ids: &[usize], pod_count: usize) -> Vec<Vec<usize>> {
    let mut per_pod = vec![Vec::new(); pod_count];
    for (slot, &label) in labeling.iter().enumerate() {
        if label < pod_count {
            per_pod[label].push(free_ids[slot]);
        }
    }
    per_pod
}

fn build_allocations(
    node: &NodeResource,
    pods: &[&PodCardRequest],
    per_pod: Vec<Vec<usize>>,
    topology_enable: bool,
) -> Option<Vec<PodAllocation>> {
    pods.iter()
        .zip(per_pod)
        .map(|(&request, device_ids)| {
            check_assignment(node, &device_ids, request, topology_enable).then(|| PodAllocation {
                task_id: request.task_id.clone(),
                node_name: node.node_name.clone(),
                device_ids,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocols::XpuDevice;

    fn device(index: usize, numa: i32) -> XpuDevice {
        XpuDevice {
            index,
            id: format!("dev-{index}"),
            device_type: "A100".to_string(),
            count: 1,
            memory: 32768,
            healthy: true,
            numa,
        }
    }

    fn node(devices: Vec<XpuDevice>, topology: Vec<Vec<u32>>) -> NodeResource {
        NodeResource {
            node_name: "n1".to_string(),
            topology,
            unused_devices: devices.into_iter().map(|d| (d.index, d)).collect(),
            card_types: vec![],
        }
    }

    fn request(task_id: &str, num_cards: usize, intra_bandwidth: u32) -> PodCardRequest {
        PodCardRequest {
            task_id: task_id.to_string(),
            task_name: task_id.to_string(),
            num_cards,
            intra_bandwidth,
            card_type: None,
        }
    }

    fn refs(pods: &[PodCardRequest]) -> Vec<&PodCardRequest> {
        pods.iter().collect()
    }

    fn collect_labelings(labels: &[usize]) -> Vec<Vec<usize>> {
        let mut out = Vec::new();
        let _ = for_each_labeling(labels, &mut |labeling| {
            out.push(labeling.to_vec());
            ControlFlow::Continue(())
        });
        out
    }

    #[test]
    fn test_label_vector() {
        let pods = vec![request("a", 2, 0), request("b", 1, 0)];
        assert_eq!(label_vector(4, &refs(&pods)), vec![0, 0, 1, 2]);
        assert_eq!(label_vector(3, &refs(&pods)), vec![0, 0, 1]);
    }

    #[test]
    fn test_distinct_permutations_no_duplicates() {
        let labelings = collect_labelings(&[0, 0, 1]);
        // 3!/2! = 3 distinct arrangements.
        assert_eq!(
            labelings,
            vec![vec![0, 0, 1], vec![0, 1, 0], vec![1, 0, 0]]
        );
    }

    #[test]
    fn test_permutation_early_exit() {
        let mut seen = 0;
        let _ = for_each_labeling(&[0, 1, 2], &mut |_| {
            seen += 1;
            if seen == 2 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        assert_eq!(seen, 2);
    }

    #[test]
    fn test_first_feasible_without_numa() {
        let n = node(
            vec![device(0, 0), device(1, 0), device(2, 0), device(3, 0)],
            vec![vec![10; 4]; 4],
        );
        let pods = vec![request("a", 2, 5)];
        let config = AllocatorConfig {
            topology_enable: true,
            ..Default::default()
        };
        let assignment = assign_devices(&n, &refs(&pods), &config).unwrap();
        // Canonical enumeration picks the lowest-index devices first.
        assert_eq!(assignment.allocations[0].device_ids, vec![0, 1]);
        assert_eq!(assignment.invalid_pods, 0);
    }

    #[test]
    fn test_topology_excludes_weak_pair() {
        // Link 0<->1 is too weak; the search must route around it.
        let topology = vec![
            vec![0, 2, 10],
            vec![2, 0, 10],
            vec![10, 10, 0],
        ];
        let n = node(vec![device(0, 0), device(1, 0), device(2, 0)], topology);
        let pods = vec![request("a", 2, 5)];
        let config = AllocatorConfig {
            topology_enable: true,
            ..Default::default()
        };
        let assignment = assign_devices(&n, &refs(&pods), &config).unwrap();
        assert_eq!(assignment.allocations[0].device_ids, vec![0, 2]);
    }

    #[test]
    fn test_numa_preference() {
        let n = node(
            vec![device(0, 0), device(1, 0), device(2, 1), device(3, 1)],
            vec![vec![10; 4]; 4],
        );
        let pods = vec![request("a", 2, 0)];
        let config = AllocatorConfig {
            numa_enable: true,
            ..Default::default()
        };
        let assignment = assign_devices(&n, &refs(&pods), &config).unwrap();
        let ids = &assignment.allocations[0].device_ids;
        let numas: Vec<i32> = ids.iter().map(|id| n.unused_devices[id].numa).collect();
        assert_eq!(numas[0], numas[1], "devices must share a NUMA domain");
        assert_eq!(assignment.invalid_pods, 0);
    }

    #[test]
    fn test_unavoidable_numa_split_is_scored() {
        // Two devices per domain, one pod wants three: a split is forced.
        let n = node(
            vec![device(0, 0), device(1, 0), device(2, 1), device(3, 1)],
            vec![vec![10; 4]; 4],
        );
        let pods = vec![request("a", 3, 0)];
        let config = AllocatorConfig {
            numa_enable: true,
            ..Default::default()
        };
        let assignment = assign_devices(&n, &refs(&pods), &config).unwrap();
        assert_eq!(assignment.invalid_pods, 1);
        assert_eq!(assignment.allocations[0].device_ids.len(), 3);
    }

    #[test]
    fn test_insufficient_capacity() {
        let n = node(vec![device(0, 0)], vec![vec![0]]);
        let pods = vec![request("a", 2, 0)];
        assert!(assign_devices(&n, &refs(&pods), &AllocatorConfig::default()).is_none());
    }

    #[test]
    fn test_sparse_free_set_uses_real_indices() {
        // Free devices 1 and 3 of a 4-wide topology; slot order must map
        // back to the absolute indices.
        let topology = vec![vec![10; 4]; 4];
        let n = node(vec![device(1, 0), device(3, 0)], topology);
        let pods = vec![request("a", 2, 5)];
        let config = AllocatorConfig {
            topology_enable: true,
            ..Default::default()
        };
        let assignment = assign_devices(&n, &refs(&pods), &config).unwrap();
        assert_eq!(assignment.allocations[0].device_ids, vec![1, 3]);
    }

    #[test]
    fn test_short_topology_row_is_infeasible() {
        // Topology only covers index 0 but devices 0 and 1 are free; any
        // pairing that consults the missing row must be rejected.
        let n = node(vec![device(0, 0), device(1, 0)], vec![vec![0]]);
        let pods = vec![request("a", 2, 0)];
        let config = AllocatorConfig {
            topology_enable: true,
            ..Default::default()
        };
        assert!(assign_devices(&n, &refs(&pods), &config).is_none());
    }
}
