// SPDX-FileCopyrightText: Copyright (c) 2024-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Allocator configuration.
//!
//! The scheduler host resolves its plugin arguments once per session and
//! hands the allocator an immutable [`AllocatorConfig`]. Nothing here is
//! process-global: tests construct a fresh configuration per case.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::protocols::NodeName;

/// Cross-node bandwidth matrix, keyed `node_name -> node_name -> bandwidth`.
///
/// Lookups are one-directional: the allocator consults `[a][b]` for the
/// node pair order produced by distribution enumeration and never the
/// reverse entry. Operators wanting symmetric enforcement must provide a
/// symmetric matrix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterNodeBandwidth(HashMap<NodeName, HashMap<NodeName, u32>>);

#[derive(Debug, thiserror::Error)]
pub enum BandwidthMatrixError {
    #[error("bandwidth matrix has {rows} rows for {nodes} nodes")]
    RowCountMismatch { rows: usize, nodes: usize },

    #[error("bandwidth matrix row {row} has {cells} cells for {nodes} nodes")]
    RowLengthMismatch {
        row: usize,
        cells: usize,
        nodes: usize,
    },
}

impl InterNodeBandwidth {
    /// Build the nested mapping from an ordered node list and a square
    /// matrix whose row/column order matches it.
    pub fn from_matrix(
        node_names: &[String],
        matrix: &[Vec<u32>],
    ) -> Result<Self, BandwidthMatrixError> {
        if matrix.len() != node_names.len() {
            return Err(BandwidthMatrixError::RowCountMismatch {
                rows: matrix.len(),
                nodes: node_names.len(),
            });
        }
        let mut map: HashMap<NodeName, HashMap<NodeName, u32>> = HashMap::new();
        for (row_idx, row) in matrix.iter().enumerate() {
            if row.len() != node_names.len() {
                return Err(BandwidthMatrixError::RowLengthMismatch {
                    row: row_idx,
                    cells: row.len(),
                    nodes: node_names.len(),
                });
            }
            let entry = map.entry(node_names[row_idx].clone()).or_default();
            for (col_idx, &bandwidth) in row.iter().enumerate() {
                entry.insert(node_names[col_idx].clone(), bandwidth);
            }
        }
        Ok(Self(map))
    }

    /// Available bandwidth between `a` and `b`, or 0 when either node is
    /// absent from the mapping.
    pub fn between(&self, a: &str, b: &str) -> u32 {
        self.0
            .get(a)
            .and_then(|row| row.get(b))
            .copied()
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Immutable configuration for one allocator instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AllocatorConfig {
    /// When false, intra-node bandwidth checks degenerate to "always
    /// pass"; device membership and card-type checks still apply.
    #[serde(default)]
    pub topology_enable: bool,
    /// Enables NUMA-locality soft scoring. When disabled the first
    /// feasible per-node assignment wins.
    #[serde(default)]
    pub numa_enable: bool,
    /// Cross-node bandwidth snapshot, consulted only when a batch carries
    /// inter-task bandwidth requirements.
    #[serde(default)]
    pub inter_node_bandwidth: InterNodeBandwidth,
}
