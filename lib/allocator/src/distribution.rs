// SPDX-FileCopyrightText: Copyright (c) 2024-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Pod-to-node distribution enumeration and cross-node bandwidth checks.
//!
//! A distribution maps every pod to one node slot; with `M` nodes and `N`
//! pods there are `M^N` candidates, visited in lexicographic order on pod
//! index. The capacity prefilter and the inter-node bandwidth validator
//! discard a distribution before the (much more expensive) intra-node
//! assignment search runs.

use std::ops::ControlFlow;

use crate::config::InterNodeBandwidth;
use crate::protocols::{InterTaskBandwidth, NodeResource, PodCardRequest};

/// Pods routed to one node by a candidate distribution. Empty node slots
/// are dropped during grouping.
pub struct NodeGroup<'a> {
    pub node: &'a NodeResource,
    pub pods: Vec<&'a PodCardRequest>,
}

/// Visit every function `pod index -> node slot`, lexicographic on pod
/// index. Each distribution is a `node_count`-length list of pod-index
/// lists. The visitor can short-circuit the enumeration.
pub fn for_each_distribution(
    node_count: usize,
    pod_count: usize,
    visit: &mut impl FnMut(&[Vec<usize>]) -> ControlFlow<()>,
) -> ControlFlow<()> {
    let mut slots: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    assign_pod(0, pod_count, &mut slots, visit)
}

fn assign_pod(
    pod_idx: usize,
    pod_count: usize,
    slots: &mut Vec<Vec<usize>>,
    visit: &mut impl FnMut(&[Vec<usize>]) -> ControlFlow<()>,
) -> ControlFlow<()> {
    if pod_idx == pod_count {
        return visit(slots);
    }
    for node_idx in 0..slots.len() {
        slots[node_idx].push(pod_idx);
        let flow = assign_pod(pod_idx + 1, pod_count, slots, visit);
        slots[node_idx].pop();
        flow?;
    }
    ControlFlow::Continue(())
}

/// Resolve a distribution into per-node groups, applying the capacity
/// prefilter: the cards requested on a node must fit its free devices.
/// Returns `None` when any used node slot is over capacity.
pub fn group_distribution<'a>(
    slots: &[Vec<usize>],
    nodes: &'a [NodeResource],
    pods: &'a [PodCardRequest],
) -> Option<Vec<NodeGroup<'a>>> {
    let mut groups = Vec::new();
    for (node_idx, pod_idxs) in slots.iter().enumerate() {
        if pod_idxs.is_empty() {
            continue;
        }
        let node = &nodes[node_idx];
        let requested: usize = pod_idxs.iter().map(|&i| pods[i].num_cards).sum();
        if requested > node.unused_devices.len() {
            return None;
        }
        groups.push(NodeGroup {
            node,
            pods: pod_idxs.iter().map(|&i| &pods[i]).collect(),
        });
    }
    Some(groups)
}

/// Validate cross-node bandwidth for every pair of groups split across
/// nodes.
///
/// For group order `i < j` and tasks `a` in group `i`, `b` in group `j`,
/// an inter-task requirement `req[a][b]` must be covered by the bandwidth
/// between the two nodes. Only that direction is consulted; a node absent
/// from the bandwidth mapping contributes 0.
pub fn inter_bandwidth_ok(
    groups: &[NodeGroup<'_>],
    inter_task_bw: &InterTaskBandwidth,
    inter_node_bw: &InterNodeBandwidth,
) -> bool {
    for (i, left) in groups.iter().enumerate() {
        for right in &groups[i + 1..] {
            let available = inter_node_bw.between(&left.node.node_name, &right.node.node_name);
            for pod_a in &left.pods {
                let Some(required) = inter_task_bw.get(&pod_a.task_name) else {
                    continue;
                };
                for pod_b in &right.pods {
                    if let Some(&needed) = required.get(&pod_b.task_name) {
                        if needed > available {
                            tracing::debug!(
                                left = %left.node.node_name,
                                right = %right.node.node_name,
                                task_a = %pod_a.task_name,
                                task_b = %pod_b.task_name,
                                needed,
                                available,
                                "inter-node bandwidth requirement not met"
                            );
                            return false;
                        }
                    }
                }
            }
        }
    }
    true
}
