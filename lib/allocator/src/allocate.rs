// SPDX-FileCopyrightText: Copyright (c) 2024-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Top-level allocation search.
//!
//! The driver walks every pod-to-node distribution, prunes by capacity
//! and cross-node bandwidth, solves the per-node device assignment for
//! the survivors, and keeps the placement with the fewest NUMA-violating
//! pods. The first violation-free placement in enumeration order is
//! returned immediately; otherwise the first-reached minimum wins. Both
//! enumeration orders are deterministic, so identical inputs and
//! configuration always produce identical output.

use std::ops::ControlFlow;

use crate::config::AllocatorConfig;
use crate::distribution::{for_each_distribution, group_distribution, inter_bandwidth_ok};
use crate::labeling::assign_devices;
use crate::protocols::{InterTaskBandwidth, NodeResource, PodAllocation, PodCardRequest};

#[derive(Debug, thiserror::Error)]
pub enum AllocationError {
    /// No distribution yields a feasible per-node assignment under the
    /// current inputs and configuration.
    #[error("cannot allocate")]
    CannotAllocate,
}

/// Topology-aware placement solver for a batch of pod requests.
///
/// Pure given its inputs and the configuration snapshot taken at
/// construction; holds no state between [`allocate`](Self::allocate)
/// calls and never mutates its inputs.
#[derive(Debug, Clone, Default)]
pub struct TopologyAllocator {
    config: AllocatorConfig,
}

impl TopologyAllocator {
    pub fn new(config: AllocatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AllocatorConfig {
        &self.config
    }

    /// Place every pod of the batch onto the given nodes and pick the
    /// device indices bound to each.
    ///
    /// `inter_task_bw` declares minimum cross-node bandwidth between task
    /// pairs that end up on different nodes; an empty map skips the
    /// cross-node validation entirely, while a non-empty map combined
    /// with an empty configured bandwidth matrix rejects every
    /// distribution.
    pub fn allocate(
        &self,
        nodes: &[NodeResource],
        pods: &[PodCardRequest],
        inter_task_bw: &InterTaskBandwidth,
    ) -> Result<Vec<PodAllocation>, AllocationError> {
        let mut best: Option<Vec<PodAllocation>> = None;
        let mut min_invalid_pods = pods.len() + 1;

        let _ = for_each_distribution(nodes.len(), pods.len(), &mut |slots| {
            let Some(groups) = group_distribution(slots, nodes, pods) else {
                return ControlFlow::Continue(());
            };
            if !inter_task_bw.is_empty() {
                let inter_node_bw = &self.config.inter_node_bandwidth;
                if inter_node_bw.is_empty()
                    || !inter_bandwidth_ok(&groups, inter_task_bw, inter_node_bw)
                {
                    return ControlFlow::Continue(());
                }
            }

            let mut placements = Vec::with_capacity(pods.len());
            let mut invalid_pods = 0;
            for group in &groups {
                let Some(assignment) = assign_devices(group.node, &group.pods, &self.config)
                else {
                    return ControlFlow::Continue(());
                };
                invalid_pods += assignment.invalid_pods;
                placements.extend(assignment.allocations);
            }

            if invalid_pods == 0 {
                best = Some(placements);
                return ControlFlow::Break(());
            }
            if invalid_pods < min_invalid_pods {
                min_invalid_pods = invalid_pods;
                best = Some(placements);
            }
            ControlFlow::Continue(())
        });

        best.ok_or_else(|| {
            tracing::debug!(
                nodes = nodes.len(),
                pods = pods.len(),
                "no feasible placement for batch"
            );
            AllocationError::CannotAllocate
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::protocols::XpuDevice;

    fn device(index: usize, device_type: &str, numa: i32) -> XpuDevice {
        XpuDevice {
            index,
            id: format!("dev-{index}"),
            device_type: device_type.to_string(),
            count: 1,
            memory: 32768,
            healthy: true,
            numa,
        }
    }

    fn node(name: &str, devices: Vec<XpuDevice>, topology: Vec<Vec<u32>>) -> NodeResource {
        NodeResource {
            node_name: name.to_string(),
            topology,
            unused_devices: devices.into_iter().map(|d| (d.index, d)).collect(),
            card_types: vec![],
        }
    }

    fn request(task_name: &str, num_cards: usize) -> PodCardRequest {
        PodCardRequest {
            task_id: format!("id-{task_name}"),
            task_name: task_name.to_string(),
            num_cards,
            intra_bandwidth: 0,
            card_type: None,
        }
    }

    #[test]
    fn test_empty_batch_is_empty_placement() {
        let allocator = TopologyAllocator::default();
        let nodes = vec![node("n1", vec![device(0, "A100", 0)], vec![vec![0]])];
        let placements = allocator.allocate(&nodes, &[], &HashMap::new()).unwrap();
        assert!(placements.is_empty());
    }

    #[test]
    fn test_no_nodes_cannot_allocate() {
        let allocator = TopologyAllocator::default();
        let err = allocator
            .allocate(&[], &[request("t1", 1)], &HashMap::new())
            .unwrap_err();
        assert!(matches!(err, AllocationError::CannotAllocate));
    }

    #[test]
    fn test_two_pods_forced_split() {
        let allocator = TopologyAllocator::default();
        let nodes = vec![
            node("n1", vec![device(0, "A100", 0)], vec![vec![0]]),
            node("n2", vec![device(0, "A100", 0)], vec![vec![0]]),
        ];
        let pods = vec![request("t1", 1), request("t2", 1)];
        let placements = allocator.allocate(&nodes, &pods, &HashMap::new()).unwrap();
        assert_eq!(placements.len(), 2);
        let node_names: Vec<&str> = placements.iter().map(|p| p.node_name.as_str()).collect();
        assert_ne!(node_names[0], node_names[1], "each pod lands on its own node");
    }

    #[test]
    fn test_numa_score_summed_across_nodes() {
        // Each node has one pair per NUMA domain, so every two-card pod
        // can stay NUMA-clean; the chosen placement must score 0 overall.
        let make_node = |name: &str| {
            node(
                name,
                vec![
                    device(0, "A100", 0),
                    device(1, "A100", 0),
                    device(2, "A100", 1),
                    device(3, "A100", 1),
                ],
                vec![vec![10; 4]; 4],
            )
        };
        let allocator = TopologyAllocator::new(AllocatorConfig {
            numa_enable: true,
            ..Default::default()
        });
        let nodes = vec![make_node("n1"), make_node("n2")];
        let pods = vec![request("t1", 2), request("t2", 2)];
        let placements = allocator.allocate(&nodes, &pods, &HashMap::new()).unwrap();
        for placement in &placements {
            let inventory = &nodes
                .iter()
                .find(|n| n.node_name == placement.node_name)
                .unwrap()
                .unused_devices;
            let numas: Vec<i32> = placement
                .device_ids
                .iter()
                .map(|id| inventory[id].numa)
                .collect();
            assert!(
                numas.windows(2).all(|w| w[0] == w[1]),
                "placement {placement:?} spans NUMA domains"
            );
        }
    }
}
