// SPDX-FileCopyrightText: Copyright (c) 2024-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Per-job scheduling bookkeeping and the node-predicate proxy.
//!
//! The framework invokes the predicate concurrently for many (task, node)
//! pairs; failures are folded into a per-job rejection map so the job's
//! eventual `Unschedulable` status can name every node and why it was
//! rejected. The map is keyed by reason text and guarded per job.

use std::collections::HashMap;
use std::sync::Mutex;

use dashmap::DashMap;
use xpu_allocator::{NodeResource, PodCardRequest, TopologyAllocator};

pub type JobId = String;

/// Why a node rejected a task during predicate filtering.
#[derive(Debug, thiserror::Error)]
pub enum PredicateError {
    #[error("node has {free} free devices, task needs {needed}")]
    InsufficientDevices { free: usize, needed: usize },

    #[error("no feasible device set on node")]
    NoFeasibleDevices,
}

#[derive(Debug, Default)]
struct JobEntry {
    /// reason text -> nodes that failed with that reason.
    reasons: Mutex<HashMap<String, Vec<String>>>,
}

/// Thread-safe accumulator of unschedulable reasons, keyed by job.
#[derive(Debug, Default)]
pub struct JobTracker {
    jobs: DashMap<JobId, JobEntry>,
}

impl JobTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one node's rejection of a job's task.
    pub fn record_failure(&self, job_id: &str, reason: &str, node_name: &str) {
        let entry = self.jobs.entry(job_id.to_string()).or_default();
        let mut reasons = entry.reasons.lock().expect("job reason lock poisoned");
        reasons
            .entry(reason.to_string())
            .or_default()
            .push(node_name.to_string());
    }

    /// Snapshot of a job's accumulated rejection reasons.
    pub fn reasons(&self, job_id: &str) -> HashMap<String, Vec<String>> {
        self.jobs
            .get(job_id)
            .map(|entry| {
                entry
                    .reasons
                    .lock()
                    .expect("job reason lock poisoned")
                    .clone()
            })
            .unwrap_or_default()
    }

    /// Drop a job's bookkeeping once the session is done with it.
    pub fn forget(&self, job_id: &str) {
        self.jobs.remove(job_id);
    }

    /// Predicate proxy: probe one (task, node) pair and record the reason
    /// on failure. Errors propagate so the framework can mark the node
    /// unschedulable for this task.
    pub fn predicate(
        &self,
        job_id: &str,
        allocator: &TopologyAllocator,
        request: &PodCardRequest,
        node: &NodeResource,
    ) -> Result<(), PredicateError> {
        let result = node_predicate(allocator, request, node);
        if let Err(err) = &result {
            self.record_failure(job_id, &err.to_string(), &node.node_name);
        }
        result
    }
}

/// Preliminary single-pod feasibility probe against one node: capacity
/// first, then a full assignment search restricted to this pair. Cheap
/// compared with the batch search and lets the framework prune nodes
/// before the allocation cycle.
pub fn node_predicate(
    allocator: &TopologyAllocator,
    request: &PodCardRequest,
    node: &NodeResource,
) -> Result<(), PredicateError> {
    let free = node.unused_devices.len();
    if free < request.num_cards {
        return Err(PredicateError::InsufficientDevices {
            free,
            needed: request.num_cards,
        });
    }
    allocator
        .allocate(
            std::slice::from_ref(node),
            std::slice::from_ref(request),
            &HashMap::new(),
        )
        .map(|_| ())
        .map_err(|_| PredicateError::NoFeasibleDevices)
}
