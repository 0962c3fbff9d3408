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

//! Defines data structures related to GPU buffer resources.

use std::borrow::Cow;
use std::ops::{BitOr, BitOrAssign};

/// A set of flags describing the allowed usages of a [`BufferId`].
///
/// These flags are crucial for performance and validation. The graphics driver uses them
/// to place the buffer in the most optimal memory type (e.g., GPU-only vs. CPU-visible)
/// and to validate that the buffer is used correctly at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferUsage {
    bits: u32,
}

impl BufferUsage {
    /// The buffer can be mapped for reading on the CPU.
    pub const MAP_READ: Self = Self { bits: 1 << 0 };
    /// The buffer can be mapped for writing on the CPU.
    pub const MAP_WRITE: Self = Self { bits: 1 << 1 };
    /// The buffer can be used as the source of a copy operation.
    pub const COPY_SRC: Self = Self { bits: 1 << 2 };
    /// The buffer can be used as the destination of a copy operation.
    pub const COPY_DST: Self = Self { bits: 1 << 3 };
    /// The buffer can be bound as a uniform buffer.
    pub const UNIFORM: Self = Self { bits: 1 << 4 };
    /// The buffer can be bound as a storage buffer (read/write access from shaders).
    pub const STORAGE: Self = Self { bits: 1 << 5 };
    /// The buffer can be used for indirect dispatch commands.
    pub const INDIRECT: Self = Self { bits: 1 << 6 };

    /// The default usage for a storage buffer that is uploaded from and read
    /// back to the CPU through copy operations.
    pub const STORAGE_RW: Self = Self {
        bits: Self::STORAGE.bits | Self::COPY_SRC.bits | Self::COPY_DST.bits,
    };

    /// Creates a new set of buffer usage flags from raw bits.
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

impl BitOr for BufferUsage {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self {
            bits: self.bits | rhs.bits,
        }
    }
}

impl BitOrAssign for BufferUsage {
    fn bitor_assign(&mut self, rhs: Self) {
        self.bits |= rhs.bits;
    }
}

/// A descriptor used to create a [`BufferId`].
#[derive(Debug, Clone)]
pub struct BufferDescriptor<'a> {
    /// An optional debug label for the buffer.
    pub label: Option<Cow<'a, str>>,
    /// The total size of the buffer in bytes.
    pub size: u64,
    /// A bitmask of [`BufferUsage`] flags describing how the buffer will be used.
    pub usage: BufferUsage,
    /// If `true`, the buffer will be created in a mapped state, ready for immediate
    /// CPU access. This is useful for staging buffers that will be written to from the CPU.
    pub mapped_at_creation: bool,
}

/// An opaque handle to a GPU buffer resource.
///
/// This ID is returned by [`ComputeDevice::create_buffer`] and is used to reference
/// the buffer in all subsequent operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub usize);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_usage_flag_composition() {
        let usage = BufferUsage::STORAGE | BufferUsage::COPY_DST;
        assert!(usage.contains(BufferUsage::STORAGE));
        assert!(usage.contains(BufferUsage::COPY_DST));
        assert!(!usage.contains(BufferUsage::MAP_READ));
    }

    #[test]
    fn storage_rw_includes_both_copy_directions() {
        assert!(BufferUsage::STORAGE_RW.contains(BufferUsage::STORAGE));
        assert!(BufferUsage::STORAGE_RW.contains(BufferUsage::COPY_SRC));
        assert!(BufferUsage::STORAGE_RW.contains(BufferUsage::COPY_DST));
    }
}
