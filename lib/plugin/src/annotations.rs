// SPDX-FileCopyrightText: Copyright (c) 2024-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Device-annotation payload codecs.
//!
//! Node inventory and per-container assignments travel through node/pod
//! annotations as positional text records: fields joined by `,`, records
//! joined by `:`. Decoders are strict: any malformed record makes the
//! whole payload decode to empty, so a half-written annotation is treated
//! as "no devices" rather than a partial inventory.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use xpu_allocator::XpuDevice;

use crate::vendor::{ASCEND_NPU_DEVICE, NVIDIA_GPU_DEVICE};

const RECORD_SEPARATOR: char = ':';
const FIELD_SEPARATOR: char = ',';

/// Node-device records carry `index,id,count,memory,type,health,numa`;
/// the trailing numa field is optional in older payloads.
const NODE_DEVICE_FIELDS: usize = 7;

/// One device slice assigned to a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerDevice {
    pub index: usize,
    pub id: String,
    pub device_type: String,
    pub used_memory: u64,
    pub used_cores: u32,
    pub vid: u32,
}

/// Encode a node's device inventory for its register annotation.
pub fn encode_node_devices(devices: &[XpuDevice]) -> String {
    let mut encoded = String::new();
    for device in devices {
        encoded.push_str(&device.index.to_string());
        encoded.push(FIELD_SEPARATOR);
        encoded.push_str(&device.id);
        encoded.push(FIELD_SEPARATOR);
        encoded.push_str(&device.count.to_string());
        encoded.push(FIELD_SEPARATOR);
        encoded.push_str(&device.memory.to_string());
        encoded.push(FIELD_SEPARATOR);
        encoded.push_str(&device.device_type);
        encoded.push(FIELD_SEPARATOR);
        encoded.push_str(&device.healthy.to_string());
        encoded.push(FIELD_SEPARATOR);
        encoded.push_str(&device.numa.to_string());
        encoded.push(RECORD_SEPARATOR);
    }
    encoded
}

/// Decode a node register annotation into the free-device map consumed by
/// the allocator. Any malformed record yields an empty map.
pub fn decode_node_devices(payload: &str) -> HashMap<usize, XpuDevice> {
    let mut devices = HashMap::new();
    if !payload.contains(RECORD_SEPARATOR) {
        return devices;
    }
    for record in payload.split(RECORD_SEPARATOR) {
        if !record.contains(FIELD_SEPARATOR) {
            continue;
        }
        let Some(device) = decode_node_device(record) else {
            return HashMap::new();
        };
        devices.insert(device.index, device);
    }
    devices
}

fn decode_node_device(record: &str) -> Option<XpuDevice> {
    let fields: Vec<&str> = record.split(FIELD_SEPARATOR).collect();
    if fields.len() != NODE_DEVICE_FIELDS && fields.len() != NODE_DEVICE_FIELDS - 1 {
        return None;
    }
    let numa = match fields.get(6) {
        Some(field) => field.parse().ok()?,
        None => 0,
    };
    Some(XpuDevice {
        index: fields[0].parse().ok()?,
        id: fields[1].to_string(),
        count: fields[2].parse().ok()?,
        memory: fields[3].parse().ok()?,
        device_type: fields[4].to_string(),
        healthy: fields[5].parse().ok()?,
        numa,
    })
}

/// Encode container-device assignments for the pod annotation. Vendor-
/// qualified type strings are normalized to their device family.
pub fn encode_container_devices(devices: &[ContainerDevice]) -> String {
    let mut encoded = String::new();
    for device in devices {
        encoded.push_str(&device.index.to_string());
        encoded.push(FIELD_SEPARATOR);
        encoded.push_str(&device.id);
        encoded.push(FIELD_SEPARATOR);
        encoded.push_str(normalize_device_type(&device.device_type));
        encoded.push(FIELD_SEPARATOR);
        encoded.push_str(&device.used_memory.to_string());
        encoded.push(FIELD_SEPARATOR);
        encoded.push_str(&device.used_cores.to_string());
        encoded.push(FIELD_SEPARATOR);
        encoded.push_str(&device.vid.to_string());
        encoded.push(RECORD_SEPARATOR);
    }
    encoded
}

/// Decode container-device assignments. Any malformed record yields an
/// empty list.
pub fn decode_container_devices(payload: &str) -> Vec<ContainerDevice> {
    let mut devices = Vec::new();
    if !payload.contains(RECORD_SEPARATOR) {
        return devices;
    }
    for record in payload.split(RECORD_SEPARATOR) {
        if !record.contains(FIELD_SEPARATOR) {
            continue;
        }
        let Some(device) = decode_container_device(record) else {
            return Vec::new();
        };
        devices.push(device);
    }
    devices
}

fn decode_container_device(record: &str) -> Option<ContainerDevice> {
    let fields: Vec<&str> = record.split(FIELD_SEPARATOR).collect();
    if fields.len() != 6 {
        return None;
    }
    Some(ContainerDevice {
        index: fields[0].parse().ok()?,
        id: fields[1].to_string(),
        device_type: fields[2].to_string(),
        used_memory: fields[3].parse().ok()?,
        used_cores: fields[4].parse().ok()?,
        vid: fields[5].parse().ok()?,
    })
}

fn normalize_device_type(device_type: &str) -> &str {
    if device_type.contains(NVIDIA_GPU_DEVICE) {
        NVIDIA_GPU_DEVICE
    } else if device_type.contains(ASCEND_NPU_DEVICE) {
        ASCEND_NPU_DEVICE
    } else {
        device_type
    }
}
