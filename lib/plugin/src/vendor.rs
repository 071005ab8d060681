// SPDX-FileCopyrightText: Copyright (c) 2024-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Vendor device-family profiles.
//!
//! GPU and NPU devices share one scheduling path but differ in resource
//! names and in the annotation keys their device plugins publish. A
//! [`VendorProfile`] bundles those strings so the rest of the plugin is
//! family-agnostic.

/// Device-family marker for NVIDIA GPUs.
pub const NVIDIA_GPU_DEVICE: &str = "NVIDIA-GPU";
/// Device-family marker for Ascend NPUs.
pub const ASCEND_NPU_DEVICE: &str = "Ascend-NPU";

/// Resource and annotation vocabulary for one device family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VendorProfile {
    pub plugin_name: &'static str,
    /// Virtual-device resource name requested in pod specs.
    pub vxpu_name: &'static str,
    pub vxpu_type: &'static str,
    pub vxpu_core: &'static str,
    pub vxpu_memory: &'static str,
    /// Node annotation carrying the encoded device inventory.
    pub register_annotation: &'static str,
    /// Node annotation carrying the encoded topology matrix.
    pub topology_annotation: &'static str,
    /// Node annotation used for the device-plugin heartbeat handshake.
    pub handshake_annotation: &'static str,
    /// Pod annotation holding devices picked by the scheduler, pending bind.
    pub assigned_to_allocate_annotation: &'static str,
    pub assigned_to_node_annotation: &'static str,
    pub assigned_to_pod_annotation: &'static str,
}

pub const GPU_PROFILE: VendorProfile = VendorProfile {
    plugin_name: "xpu-gpu",
    vxpu_name: "xpu.scheduler/vgpu-number",
    vxpu_type: "xpu.scheduler/vgpu-type",
    vxpu_core: "xpu.scheduler/vgpu-cores",
    vxpu_memory: "xpu.scheduler/vgpu-memory",
    register_annotation: "xpu.scheduler/node-gpu-register",
    topology_annotation: "xpu.scheduler/node-gpu-topology",
    handshake_annotation: "xpu.scheduler/node-gpu-handshake",
    assigned_to_allocate_annotation: "xpu.scheduler/gpus-to-allocate",
    assigned_to_node_annotation: "xpu.scheduler/gpus-on-node",
    assigned_to_pod_annotation: "xpu.scheduler/gpus-on-pod",
};

pub const NPU_PROFILE: VendorProfile = VendorProfile {
    plugin_name: "xpu-npu",
    vxpu_name: "xpu.scheduler/vnpu-number",
    vxpu_type: "xpu.scheduler/vnpu-type",
    vxpu_core: "xpu.scheduler/vnpu-cores",
    vxpu_memory: "xpu.scheduler/vnpu-memory",
    register_annotation: "xpu.scheduler/node-npu-register",
    topology_annotation: "xpu.scheduler/node-npu-topology",
    handshake_annotation: "xpu.scheduler/node-npu-handshake",
    assigned_to_allocate_annotation: "xpu.scheduler/npus-to-allocate",
    assigned_to_node_annotation: "xpu.scheduler/npus-on-node",
    assigned_to_pod_annotation: "xpu.scheduler/npus-on-pod",
};

/// Resolve the profile for a device-type string, matching on the vendor
/// family marker it carries.
pub fn profile_for(device_type: &str) -> Option<&'static VendorProfile> {
    if device_type.contains(NVIDIA_GPU_DEVICE) {
        Some(&GPU_PROFILE)
    } else if device_type.contains(ASCEND_NPU_DEVICE) {
        Some(&NPU_PROFILE)
    } else {
        None
    }
}
