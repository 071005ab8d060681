// SPDX-FileCopyrightText: Copyright (c) 2024-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Scheduler-plugin surface for the XPU allocator.
//!
//! Everything the framework host touches lives here: plugin-argument
//! resolution, the device-annotation codecs, vendor device-family
//! profiles, and per-job predicate bookkeeping. The placement search
//! itself is in the `xpu-allocator` crate.

pub mod annotations;
pub mod arguments;
pub mod jobs;
pub mod vendor;

/// Name the plugin registers under with the scheduler framework.
pub const PLUGIN_NAME: &str = "xpu-topology";

pub use annotations::{
    ContainerDevice, decode_container_devices, decode_node_devices, encode_container_devices,
    encode_node_devices,
};
pub use arguments::PluginConfig;
pub use jobs::{JobTracker, PredicateError, node_predicate};
pub use vendor::{GPU_PROFILE, NPU_PROFILE, VendorProfile, profile_for};
