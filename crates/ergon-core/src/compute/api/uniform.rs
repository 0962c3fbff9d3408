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

//! Defines data structures for uniform sets.
//!
//! A uniform set is a device-side grouping of resource bindings
//! (buffers, textures, samplers) visible to a compute shader at a given
//! set index. It is the abstraction over the different binding models of
//! the underlying graphics APIs (descriptor sets in Vulkan, bind groups
//! in WebGPU).

use crate::compute::api::buffer::BufferId;
use crate::compute::api::texture::{SamplerId, TextureId};

/// The role a bound resource plays inside the shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformKind {
    /// A storage buffer with read/write access from the shader.
    StorageBuffer,
    /// A uniform buffer (read-only, small, fast-path).
    UniformBuffer,
    /// A storage image written (and possibly read) by the shader.
    Image,
    /// A texture bound for sampled reads.
    SampledTexture,
    /// A sampler object.
    Sampler,
}

/// The resource handle carried by a [`UniformBinding`].
///
/// Handles referenced here are *borrowed* from the consumer: the compute
/// layer never owns or frees them, because resources such as a host
/// viewport surface outlive (and are swapped independently of) any
/// uniform set that references them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformResource {
    /// A buffer resource.
    Buffer(BufferId),
    /// A texture resource.
    Texture(TextureId),
    /// A sampler resource.
    Sampler(SamplerId),
}

/// A single resource binding inside a uniform set.
///
/// Bindings accumulate in insertion order; uniqueness of `binding` within
/// a set is the caller's responsibility and is not checked on write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformBinding {
    /// The bound resource.
    pub resource: UniformResource,
    /// The binding index (e.g. `@binding(0)` in WGSL).
    pub binding: u32,
    /// The role of the resource in the shader.
    pub kind: UniformKind,
}

impl UniformBinding {
    /// Helper to bind a buffer as a read/write storage buffer.
    pub const fn storage_buffer(buffer: BufferId, binding: u32) -> Self {
        Self {
            resource: UniformResource::Buffer(buffer),
            binding,
            kind: UniformKind::StorageBuffer,
        }
    }

    /// Helper to bind a buffer as a uniform buffer.
    pub const fn uniform_buffer(buffer: BufferId, binding: u32) -> Self {
        Self {
            resource: UniformResource::Buffer(buffer),
            binding,
            kind: UniformKind::UniformBuffer,
        }
    }

    /// Helper to bind a texture as a storage image.
    pub const fn image(texture: TextureId, binding: u32) -> Self {
        Self {
            resource: UniformResource::Texture(texture),
            binding,
            kind: UniformKind::Image,
        }
    }

    /// Helper to bind a texture for sampled reads.
    pub const fn sampled_texture(texture: TextureId, binding: u32) -> Self {
        Self {
            resource: UniformResource::Texture(texture),
            binding,
            kind: UniformKind::SampledTexture,
        }
    }

    /// Helper to bind a sampler.
    pub const fn sampler(sampler: SamplerId, binding: u32) -> Self {
        Self {
            resource: UniformResource::Sampler(sampler),
            binding,
            kind: UniformKind::Sampler,
        }
    }
}

/// An opaque handle to a realized, device-side uniform set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformSetId(pub usize);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binding_helpers_record_kind_and_slot() {
        let b = UniformBinding::storage_buffer(BufferId(7), 2);
        assert_eq!(b.kind, UniformKind::StorageBuffer);
        assert_eq!(b.binding, 2);
        assert_eq!(b.resource, UniformResource::Buffer(BufferId(7)));

        let i = UniformBinding::image(TextureId(3), 0);
        assert_eq!(i.kind, UniformKind::Image);
        assert_eq!(i.resource, UniformResource::Texture(TextureId(3)));
    }
}
