// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Deterministic, reverse-order release of owned GPU handles.

use crate::compute::api::{BufferId, ComputePipelineId, SamplerId, ShaderModuleId, TextureId, UniformSetId};
use crate::compute::error::ResourceError;
use crate::compute::traits::ComputeDevice;
use std::sync::Arc;

/// A handle owned by a [`ResourceRegistry`], tagged with its resource type
/// so the registry can route it to the right destroy call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackedResource {
    /// A compiled shader module.
    ShaderModule(ShaderModuleId),
    /// A compute pipeline.
    ComputePipeline(ComputePipelineId),
    /// A realized uniform set.
    UniformSet(UniformSetId),
    /// A GPU buffer.
    Buffer(BufferId),
    /// A GPU texture.
    Texture(TextureId),
    /// A sampler.
    Sampler(SamplerId),
}

/// Tracks every handle created through the lifecycle layer so it can be
/// released deterministically, in reverse-creation order (dependents before
/// dependencies: uniform sets and pipeline before the shader they
/// reference).
///
/// Handles are tracked immediately upon creation, not after full setup
/// completes, so partial-initialization failures still tear down cleanly.
/// Entries are drained as they are freed and `Drop` delegates to the same
/// drain, which makes the at-most-once-release guarantee structural: a
/// second [`ResourceRegistry::release_all`], or scope exit after one, frees
/// nothing twice.
#[derive(Debug)]
pub struct ResourceRegistry {
    device: Arc<dyn ComputeDevice>,
    entries: Vec<TrackedResource>,
}

impl ResourceRegistry {
    /// Creates an empty registry bound to the device that owns the handles.
    pub fn new(device: Arc<dyn ComputeDevice>) -> Self {
        Self {
            device,
            entries: Vec::new(),
        }
    }

    /// Records an owned handle. Call this immediately after the device
    /// returns it.
    pub fn track(&mut self, resource: TrackedResource) {
        self.entries.push(resource);
    }

    /// Releases a single tracked handle ahead of teardown and removes its
    /// entry, so a later [`ResourceRegistry::release_all`] cannot touch it
    /// again. Returns `false` if the handle was not tracked here.
    ///
    /// This is the path the uniform-set invalidation cycle uses to discard
    /// realized sets without disturbing the pipeline or its siblings.
    pub fn release(&mut self, resource: &TrackedResource) -> bool {
        match self.entries.iter().rposition(|e| e == resource) {
            Some(index) => {
                let entry = self.entries.remove(index);
                Self::destroy_on_device(&*self.device, &entry);
                true
            }
            None => false,
        }
    }

    /// Releases every tracked handle in strict reverse-creation order.
    pub fn release_all(&mut self) {
        while let Some(entry) = self.entries.pop() {
            Self::destroy_on_device(&*self.device, &entry);
        }
    }

    /// The number of handles currently tracked.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no handles are tracked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn destroy_on_device(device: &dyn ComputeDevice, resource: &TrackedResource) {
        let result: Result<(), ResourceError> = match resource {
            TrackedResource::ShaderModule(id) => device.destroy_shader_module(*id),
            TrackedResource::ComputePipeline(id) => device.destroy_compute_pipeline(*id),
            TrackedResource::UniformSet(id) => device.destroy_uniform_set(*id),
            TrackedResource::Buffer(id) => device.destroy_buffer(*id),
            TrackedResource::Texture(id) => device.destroy_texture(*id),
            TrackedResource::Sampler(id) => device.destroy_sampler(*id),
        };
        if let Err(e) = result {
            log::warn!("ResourceRegistry: failed to release {resource:?}: {e}");
        }
    }
}

impl Drop for ResourceRegistry {
    fn drop(&mut self) {
        self.release_all();
    }
}
