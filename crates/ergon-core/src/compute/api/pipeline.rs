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

//! Defines data structures for compute pipelines.
//!
//! Compute pipelines are used for general-purpose GPU computing tasks,
//! such as cellular automata, particle simulations, and other parallel
//! workloads.

use crate::compute::api::shader::ShaderModuleId;
use std::borrow::Cow;

/// An opaque handle to a compiled compute pipeline state object.
///
/// This ID is returned by [`ComputeDevice::create_compute_pipeline`] and is used
/// to reference the pipeline when recording compute dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComputePipelineId(pub u64);

/// A descriptor used to create a [`ComputePipelineId`].
///
/// This struct provides all the necessary information for the `ComputeDevice` to
/// create a compute pipeline from a compiled shader module.
#[derive(Debug, Clone)]
pub struct ComputePipelineDescriptor<'a> {
    /// An optional debug label for the compute pipeline.
    pub label: Option<Cow<'a, str>>,
    /// The compiled compute shader module.
    pub shader_module: ShaderModuleId,
    /// The name of the entry point function in the compute shader.
    pub entry_point: Cow<'a, str>,
    /// The size in bytes of the push-constant range the pipeline declares,
    /// or 0 when no push constants are used. Must match the blob uploaded
    /// at dispatch time.
    pub push_constant_size: u32,
}

/// The fixed number of shader invocations per workgroup along each axis,
/// as declared by the shader's `@workgroup_size`.
///
/// The dispatcher uses this to convert *invocation* counts into *group*
/// counts. Conversion is ceiling division: the invocation domain is always
/// fully covered, and the shader is expected to bounds-check the trailing
/// partial group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkgroupSize {
    /// Invocations per group along X.
    pub x: u32,
    /// Invocations per group along Y.
    pub y: u32,
    /// Invocations per group along Z.
    pub z: u32,
}

impl WorkgroupSize {
    /// Creates a workgroup size. All axes must be non-zero.
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        assert!(x > 0 && y > 0 && z > 0, "workgroup axes must be non-zero");
        Self { x, y, z }
    }

    /// A one-dimensional workgroup of `x` invocations.
    pub const fn linear(x: u32) -> Self {
        Self::new(x, 1, 1)
    }

    /// Converts a 3D invocation count into the group counts to dispatch,
    /// rounding up on every axis so the invocation domain is fully covered.
    pub const fn group_counts(&self, x: u32, y: u32, z: u32) -> [u32; 3] {
        [x.div_ceil(self.x), y.div_ceil(self.y), z.div_ceil(self.z)]
    }
}

impl Default for WorkgroupSize {
    fn default() -> Self {
        Self::new(1, 1, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compute_pipeline_id_creation_and_equality() {
        let id1 = ComputePipelineId(1);
        let id2 = ComputePipelineId(2);
        let id1_again = ComputePipelineId(1);

        assert_eq!(id1, id1_again);
        assert_ne!(id1, id2);
        assert!(id1 < id2);
    }

    #[test]
    fn exact_multiple_dispatches_exactly_enough_groups() {
        let wg = WorkgroupSize::linear(4);
        assert_eq!(wg.group_counts(4, 1, 1), [1, 1, 1]);
        assert_eq!(wg.group_counts(8, 1, 1), [2, 1, 1]);
    }

    #[test]
    fn partial_group_rounds_up() {
        let wg = WorkgroupSize::new(8, 8, 1);
        // A 10x10 domain needs 2x2 groups of 8x8, not 1x1.
        assert_eq!(wg.group_counts(10, 10, 1), [2, 2, 1]);
    }

    #[test]
    fn group_count_covers_domain_without_a_full_spare_group() {
        // ceil(n/w) must satisfy groups*w >= n and (groups-1)*w < n.
        for w in 1u32..=16 {
            let wg = WorkgroupSize::linear(w);
            for n in 1u32..=257 {
                let groups = wg.group_counts(n, 1, 1)[0];
                assert!(groups * w >= n, "under-dispatch for n={n}, w={w}");
                assert!((groups - 1) * w < n, "over-dispatch for n={n}, w={w}");
            }
        }
    }
}
