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

use crate::compute::api::command::{CommandBufferId, ComputePassDescriptor};
use crate::compute::api::common::Extent3D;
use crate::compute::api::{BufferId, ComputePipelineId, TextureId, UniformSetId};
use std::any::Any;

/// A trait representing an active compute pass, used for recording dispatch
/// commands.
///
/// A `ComputePass` object is obtained from a [`CommandEncoder`]. Within one
/// pass the binding order is fixed: pipeline, then uniform sets in ascending
/// set index, then push constants, then the dispatch itself.
///
/// The `'pass` lifetime ensures that the pass object cannot outlive the
/// [`CommandEncoder`] that created it, and that any handles bound to it also
/// live long enough.
pub trait ComputePass<'pass> {
    /// Sets the active compute pipeline for the subsequent dispatch.
    fn set_pipeline(&mut self, pipeline: &'pass ComputePipelineId);

    /// Binds a realized uniform set at the given set index.
    fn set_uniform_set(&mut self, index: u32, set: &'pass UniformSetId);

    /// Uploads the push-constant blob for the subsequent dispatch.
    fn set_push_constants(&mut self, data: &[u8]);

    /// Records a dispatch of the given number of workgroups per axis.
    fn dispatch_workgroups(&mut self, x: u32, y: u32, z: u32);
}

/// A trait for an object that records a sequence of GPU commands.
///
/// A `CommandEncoder` is the main tool for building a [`CommandBufferId`].
/// It creates compute passes, and can also record commands that happen
/// outside of a pass, such as buffer and texture copies.
///
/// The encoder is a stateful object; its lifetime (`'encoder`) is tied to the
/// passes it creates.
pub trait CommandEncoder {
    /// Begins a new compute pass, returning a mutable `ComputePass` object.
    ///
    /// The returned pass borrows the encoder mutably, so only one pass can be
    /// active at a time. When the `ComputePass` object is dropped, the pass
    /// is ended.
    fn begin_compute_pass<'encoder>(
        &'encoder mut self,
        descriptor: &ComputePassDescriptor,
    ) -> Box<dyn ComputePass<'encoder> + 'encoder>;

    /// Records a command to copy data from one buffer to another on the GPU.
    fn copy_buffer_to_buffer(
        &mut self,
        source: &BufferId,
        source_offset: u64,
        destination: &BufferId,
        destination_offset: u64,
        size: u64,
    );

    /// Records a command to copy texel data between two textures of
    /// compatible formats. Used to publish a compute working texture into an
    /// externally-owned surface texture.
    fn copy_texture_to_texture(&mut self, source: &TextureId, destination: &TextureId, size: Extent3D);

    /// Finalizes the command recording and returns a handle to the resulting
    /// command buffer.
    ///
    /// This method consumes the encoder. The returned [`CommandBufferId`] can
    /// then be submitted to the device's command queue.
    fn finish(self: Box<Self>) -> CommandBufferId;

    /// Returns a mutable reference to the underlying trait object as `Any`.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
