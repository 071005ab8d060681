// SPDX-FileCopyrightText: Copyright (c) 2024-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Plugin-argument parsing.
//!
//! The scheduler framework hands plugins a flat string map of arguments.
//! This module resolves it into a [`PluginConfig`] once per session; the
//! allocator then works from an immutable snapshot. A malformed bandwidth
//! matrix clears the inter-node mapping to empty (and logs why), so later
//! allocations behave as if no inter-node topology were configured.

use std::collections::HashMap;

use anyhow::Context;
use xpu_allocator::{AllocatorConfig, InterNodeBandwidth};

/// Argument key enabling consultation of the intra-node topology matrix.
pub const TOPOLOGY_ENABLE: &str = "TopologyEnable";
/// Argument key enabling NUMA-locality soft scoring.
pub const NUMA_ENABLE: &str = "NumaEnable";
/// Argument key selecting the synthetic inventory instead of live
/// device discovery.
pub const TEST_ENABLE: &str = "TestEnable";
/// Argument key holding the ordered, comma-separated node-name list.
pub const XPU_TOPOLOGY_NODE_LIST: &str = "XPUTopologyNodeList";
/// Argument key holding the inter-node bandwidth matrix: semicolon-separated
/// rows of comma-separated integers, row/column order matching the node list.
pub const XPU_TOPOLOGY_NODE_BANDWIDTH: &str = "XPUTopologyNodeBandwidth";

/// Session-wide plugin configuration resolved from framework arguments.
#[derive(Debug, Clone, Default)]
pub struct PluginConfig {
    pub topology_enable: bool,
    pub numa_enable: bool,
    pub test_enable: bool,
    pub inter_node_bandwidth: InterNodeBandwidth,
}

impl PluginConfig {
    /// Resolve plugin arguments. Absent booleans stay false; a bandwidth
    /// matrix that fails to parse leaves the mapping empty.
    pub fn from_arguments(args: &HashMap<String, String>) -> Self {
        let mut config = Self {
            topology_enable: get_bool(args, TOPOLOGY_ENABLE),
            numa_enable: get_bool(args, NUMA_ENABLE),
            test_enable: get_bool(args, TEST_ENABLE),
            inter_node_bandwidth: InterNodeBandwidth::default(),
        };
        match parse_node_bandwidth(args) {
            Ok(Some(bandwidth)) => {
                tracing::info!(?bandwidth, "inter-node bandwidth configured");
                config.inter_node_bandwidth = bandwidth;
            }
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    "failed to parse inter-node bandwidth, clearing mapping"
                );
            }
        }
        config
    }

    /// The allocator-facing subset of this configuration.
    pub fn allocator_config(&self) -> AllocatorConfig {
        AllocatorConfig {
            topology_enable: self.topology_enable,
            numa_enable: self.numa_enable,
            inter_node_bandwidth: self.inter_node_bandwidth.clone(),
        }
    }
}

fn get_bool(args: &HashMap<String, String>, key: &str) -> bool {
    args.get(key)
        .and_then(|value| value.parse().ok())
        .unwrap_or(false)
}

/// Parse the node list + bandwidth matrix pair. `Ok(None)` when no node
/// list is configured at all; `Err` when the pair is present but malformed
/// (missing matrix, shape mismatch, non-integer cell).
fn parse_node_bandwidth(
    args: &HashMap<String, String>,
) -> anyhow::Result<Option<InterNodeBandwidth>> {
    let Some(node_list) = args.get(XPU_TOPOLOGY_NODE_LIST) else {
        return Ok(None);
    };
    let node_names: Vec<String> = node_list.split(',').map(str::to_string).collect();

    let raw_matrix = args
        .get(XPU_TOPOLOGY_NODE_BANDWIDTH)
        .with_context(|| format!("{XPU_TOPOLOGY_NODE_BANDWIDTH} not set"))?;

    let mut matrix: Vec<Vec<u32>> = Vec::with_capacity(node_names.len());
    for (row_idx, row) in raw_matrix.split(';').enumerate() {
        let cells = row
            .split(',')
            .map(|cell| cell.trim().parse::<u32>())
            .collect::<Result<Vec<u32>, _>>()
            .with_context(|| format!("bandwidth matrix row {row_idx} has a non-integer cell"))?;
        matrix.push(cells);
    }

    let bandwidth = InterNodeBandwidth::from_matrix(&node_names, &matrix)?;
    Ok(Some(bandwidth))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|&(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_booleans_default_false() {
        let config = PluginConfig::from_arguments(&HashMap::new());
        assert!(!config.topology_enable);
        assert!(!config.numa_enable);
        assert!(!config.test_enable);
        assert!(config.inter_node_bandwidth.is_empty());
    }

    #[test]
    fn test_booleans_parsed() {
        let config = PluginConfig::from_arguments(&args(&[
            (TOPOLOGY_ENABLE, "true"),
            (NUMA_ENABLE, "true"),
            (TEST_ENABLE, "false"),
        ]));
        assert!(config.topology_enable);
        assert!(config.numa_enable);
        assert!(!config.test_enable);
    }

    #[test]
    fn test_bandwidth_matrix_parsed() {
        let config = PluginConfig::from_arguments(&args(&[
            (XPU_TOPOLOGY_NODE_LIST, "n1,n2"),
            (XPU_TOPOLOGY_NODE_BANDWIDTH, "100,25;25,100"),
        ]));
        assert_eq!(config.inter_node_bandwidth.between("n1", "n2"), 25);
        assert_eq!(config.inter_node_bandwidth.between("n2", "n2"), 100);
    }

    #[test]
    fn test_row_count_mismatch_clears_mapping() {
        let config = PluginConfig::from_arguments(&args(&[
            (XPU_TOPOLOGY_NODE_LIST, "n1,n2"),
            (XPU_TOPOLOGY_NODE_BANDWIDTH, "100,25"),
        ]));
        assert!(config.inter_node_bandwidth.is_empty());
    }

    #[test]
    fn test_non_integer_cell_clears_mapping() {
        let config = PluginConfig::from_arguments(&args(&[
            (XPU_TOPOLOGY_NODE_LIST, "n1,n2"),
            (XPU_TOPOLOGY_NODE_BANDWIDTH, "100,x;25,100"),
        ]));
        assert!(config.inter_node_bandwidth.is_empty());
    }

    #[test]
    fn test_missing_matrix_clears_mapping() {
        let config =
            PluginConfig::from_arguments(&args(&[(XPU_TOPOLOGY_NODE_LIST, "n1,n2")]));
        assert!(config.inter_node_bandwidth.is_empty());
    }

    #[test]
    fn test_allocator_config_projection() {
        let config = PluginConfig::from_arguments(&args(&[
            (TOPOLOGY_ENABLE, "true"),
            (XPU_TOPOLOGY_NODE_LIST, "n1"),
            (XPU_TOPOLOGY_NODE_BANDWIDTH, "100"),
        ]));
        let allocator_config = config.allocator_config();
        assert!(allocator_config.topology_enable);
        assert!(!allocator_config.numa_enable);
        assert_eq!(allocator_config.inter_node_bandwidth.between("n1", "n1"), 100);
    }
}
