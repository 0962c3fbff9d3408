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

//! Shared dimension types and device classification.

/// The dimensions of a texture or copy region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Extent3D {
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// Depth for 3D textures, or the number of array layers.
    pub depth_or_array_layers: u32,
}

impl Extent3D {
    /// A single-layer 2D extent.
    pub const fn new_2d(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            depth_or_array_layers: 1,
        }
    }
}

/// An offset into a texture, in texels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Origin3D {
    /// X offset.
    pub x: u32,
    /// Y offset.
    pub y: u32,
    /// Z offset (or array layer).
    pub z: u32,
}

/// Classifies a [`ComputeDevice`](crate::compute::traits::ComputeDevice)
/// by its relationship to the host rendering loop.
///
/// A `Local` device is an isolated context: nothing else submits work to it,
/// so a consumer may submit and block for completion at any time (required
/// for immediate CPU-side readback). A `Shared` device belongs to a host
/// frame loop that owns submission timing; blocking synchronization must not
/// be forced on it, and dispatched work is implicitly synchronized with the
/// host's frame presentation instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    /// An isolated device context usable for synchronous, blocking work.
    Local,
    /// A device owned by a host frame loop; submission is frame-synchronized.
    Shared,
}

/// Basic identification of the adapter backing a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Human-readable adapter name.
    pub name: String,
    /// The graphics backend in use (e.g. "Vulkan", "Metal").
    pub backend: String,
    /// The kind of physical device (e.g. "DiscreteGpu").
    pub device_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extent_2d_has_one_layer() {
        let e = Extent3D::new_2d(640, 480);
        assert_eq!(e.width, 640);
        assert_eq!(e.height, 480);
        assert_eq!(e.depth_or_array_layers, 1);
    }
}
