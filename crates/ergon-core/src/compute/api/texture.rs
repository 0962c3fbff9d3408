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

//! Defines data structures related to GPU texture and sampler resources.

use crate::compute::api::common::Extent3D;
use std::borrow::Cow;
use std::ops::{BitOr, BitOrAssign};

/// The dimensionality of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureDimension {
    /// A one-dimensional texture.
    D1,
    /// A two-dimensional texture.
    D2,
    /// A three-dimensional (volumetric) texture.
    D3,
}

/// The format of the texels in a texture.
///
/// Restricted to the formats a compute workload actually binds as storage
/// images or samples from; render-target-only formats are out of scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// 8-bit per channel RGBA, unsigned normalized.
    Rgba8Unorm,
    /// 32-bit single-channel float.
    R32Float,
    /// 32-bit single-channel unsigned integer.
    R32Uint,
    /// 16-bit per channel RGBA float.
    Rgba16Float,
    /// 32-bit per channel RGBA float.
    Rgba32Float,
}

impl TextureFormat {
    /// The size of one texel in bytes.
    pub const fn bytes_per_pixel(&self) -> u32 {
        match self {
            TextureFormat::Rgba8Unorm => 4,
            TextureFormat::R32Float => 4,
            TextureFormat::R32Uint => 4,
            TextureFormat::Rgba16Float => 8,
            TextureFormat::Rgba32Float => 16,
        }
    }
}

/// Defines how texture coordinates are handled when sampling outside the `[0, 1]` range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressMode {
    /// Coordinates wrap around. `1.1` becomes `0.1`.
    Repeat,
    /// Coordinates are clamped to the edge. `1.1` becomes `1.0`.
    ClampToEdge,
    /// Coordinates wrap around, mirroring at each integer boundary.
    MirrorRepeat,
}

/// Defines the filtering mode for texture sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterMode {
    /// Point sampling. Returns the value of the nearest texel.
    Nearest,
    /// Linear interpolation. Returns a weighted average of the four nearest texels.
    Linear,
}

/// A set of flags describing the allowed usages of a [`TextureId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureUsage {
    bits: u32,
}

impl TextureUsage {
    /// The texture can be used as the source of a copy operation.
    pub const COPY_SRC: Self = Self { bits: 1 << 0 };
    /// The texture can be used as the destination of a copy operation.
    pub const COPY_DST: Self = Self { bits: 1 << 1 };
    /// The texture can be bound in a shader for sampling (reading).
    pub const TEXTURE_BINDING: Self = Self { bits: 1 << 2 };
    /// The texture can be used as a storage texture (read/write access from shaders).
    pub const STORAGE_BINDING: Self = Self { bits: 1 << 3 };

    /// Usage bits for a texture written by compute and consumed by the host
    /// renderer: sampled, bound as storage, and updatable from the CPU.
    pub const SHARED_DEFAULT: Self = Self {
        bits: Self::TEXTURE_BINDING.bits | Self::STORAGE_BINDING.bits | Self::COPY_DST.bits,
    };

    /// Usage bits for a compute-only working texture: bound as storage and
    /// copyable in both directions.
    pub const COMPUTE_DEFAULT: Self = Self {
        bits: Self::STORAGE_BINDING.bits | Self::COPY_DST.bits | Self::COPY_SRC.bits,
    };

    /// Creates a new set of texture usage flags from raw bits.
    pub const fn from_bits(bits: u32) -> Self {
        Self { bits }
    }

    /// Returns the raw bits.
    pub const fn bits(&self) -> u32 {
        self.bits
    }

    /// Returns `true` if every flag in `other` is also set in `self`.
    pub const fn contains(&self, other: Self) -> bool {
        (self.bits & other.bits) == other.bits
    }
}

impl BitOr for TextureUsage {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self {
            bits: self.bits | rhs.bits,
        }
    }
}

impl BitOrAssign for TextureUsage {
    fn bitor_assign(&mut self, rhs: Self) {
        self.bits |= rhs.bits;
    }
}

/// A descriptor used to create a [`TextureId`].
#[derive(Debug, Clone)]
pub struct TextureDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<Cow<'a, str>>,
    /// The dimensions (width, height, depth/layers) of the texture.
    pub size: Extent3D,
    /// The number of mipmap levels for the texture.
    pub mip_level_count: u32,
    /// The number of samples per pixel. Storage textures are single-sampled.
    pub sample_count: u32,
    /// The dimensionality of the texture.
    pub dimension: TextureDimension,
    /// The format of the texels in the texture.
    pub format: TextureFormat,
    /// A bitmask of [`TextureUsage`] flags describing how the texture will be used.
    pub usage: TextureUsage,
}

/// A descriptor used to create a [`SamplerId`].
#[derive(Debug, Clone)]
pub struct SamplerDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<&'a str>,
    /// How coordinates outside `[0, 1]` are resolved, applied to all axes.
    pub address_mode: AddressMode,
    /// Filtering when the texture is magnified.
    pub mag_filter: FilterMode,
    /// Filtering when the texture is minified.
    pub min_filter: FilterMode,
}

/// An opaque handle to a GPU texture resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub usize);

/// An opaque handle to a GPU sampler resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerId(pub usize);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn texel_sizes_match_formats() {
        assert_eq!(TextureFormat::Rgba8Unorm.bytes_per_pixel(), 4);
        assert_eq!(TextureFormat::Rgba32Float.bytes_per_pixel(), 16);
    }

    #[test]
    fn usage_presets_cover_their_roles() {
        assert!(TextureUsage::SHARED_DEFAULT.contains(TextureUsage::TEXTURE_BINDING));
        assert!(TextureUsage::SHARED_DEFAULT.contains(TextureUsage::STORAGE_BINDING));
        assert!(TextureUsage::COMPUTE_DEFAULT.contains(TextureUsage::COPY_SRC));
        assert!(!TextureUsage::COMPUTE_DEFAULT.contains(TextureUsage::TEXTURE_BINDING));
    }
}
