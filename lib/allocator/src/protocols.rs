// SPDX-FileCopyrightText: Copyright (c) 2024-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Protocol types exchanged between the scheduler host and the allocator.
//!
//! All types are ephemeral within one `allocate` call: the host supplies a
//! fresh inventory snapshot per scheduling cycle and the allocator never
//! mutates its inputs.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Opaque task identifier, echoed back in the placement verdict.
pub type TaskId = String;

/// Stable node identifier.
pub type NodeName = String;

/// Minimum cross-node bandwidth demanded between two tasks, keyed as
/// `task_name -> task_name -> bandwidth`. Missing entries mean no
/// requirement. Only the `[a][b]` direction given by group enumeration
/// order is consulted.
pub type InterTaskBandwidth = HashMap<String, HashMap<String, u32>>;

/// One accelerator card in a node's inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XpuDevice {
    /// Absolute device index on the node; also the row/column used in the
    /// node's topology matrix.
    pub index: usize,
    /// Vendor device id (UUID or serial).
    pub id: String,
    /// Card type string, matched against `PodCardRequest::card_type`.
    pub device_type: String,
    /// Shareable-replica count advertised by the device plugin.
    pub count: u32,
    /// Device memory in MiB.
    pub memory: u64,
    /// Whether the device passed its last health check.
    pub healthy: bool,
    /// NUMA domain tag; devices sharing a tag are co-located.
    pub numa: i32,
}

/// Inventory of one node at scheduling time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeResource {
    pub node_name: NodeName,
    /// Symmetric square matrix of intra-node bandwidth scores; entry
    /// `[i][j]` scores the link between device indices `i` and `j`.
    /// Higher is better. The diagonal is not consulted. Rows cover every
    /// index appearing in `unused_devices`, and may exceed the free set
    /// when some devices are already allocated.
    pub topology: Vec<Vec<u32>>,
    /// Free devices keyed by absolute device index. Only keys of this map
    /// are candidates for allocation; indices are not assumed contiguous.
    pub unused_devices: HashMap<usize, XpuDevice>,
    /// Card types this node advertises. Informational.
    #[serde(default)]
    pub card_types: Vec<String>,
}

impl NodeResource {
    /// Free device indices in ascending order. This ordering is part of
    /// the determinism contract: assignment enumeration walks slots in
    /// exactly this order.
    pub fn free_device_ids(&self) -> Vec<usize> {
        let mut ids: Vec<usize> = self.unused_devices.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

/// One pod's ask for accelerator cards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodCardRequest {
    pub task_id: TaskId,
    /// Logical name keying inter-task bandwidth requirements.
    pub task_name: String,
    /// How many devices this pod needs. Positive.
    pub num_cards: usize,
    /// Minimum pairwise topology score between every pair of devices
    /// assigned to this pod. Zero means no requirement.
    pub intra_bandwidth: u32,
    /// When set, every device assigned to this pod must have a matching
    /// `device_type`.
    pub card_type: Option<String>,
}

/// Placement verdict for one pod.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodAllocation {
    pub task_id: TaskId,
    pub node_name: NodeName,
    /// Device indices from the placement node's inventory, in slot order.
    pub device_ids: Vec<usize>,
}
