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

use crate::compute::api::*;
use crate::compute::error::ResourceError;
use crate::compute::traits::CommandEncoder;
use std::fmt::Debug;

/// The host graphics device, treated as an opaque external collaborator.
///
/// Everything the compute lifecycle layer does funnels through this trait:
/// resource creation/destruction, validity queries, command recording and
/// submission. Implementations live in backend crates (`ergon-infra`
/// provides a WGPU one); tests substitute mocks. The device is always an
/// explicit constructor dependency of the components that use it, never
/// ambient state.
pub trait ComputeDevice: Send + Sync + Debug + 'static {
    /// Classifies this device as an isolated local context or a shared,
    /// frame-synchronized one. Only local devices support blocking
    /// submit-and-wait (see [`ComputeDevice::wait_idle`]).
    fn kind(&self) -> DeviceKind;

    /// Creates a compute shader module from the provided descriptor.
    /// ## Errors
    /// * `ResourceError::Shader` - If compilation fails; the error carries the
    ///   compiler's diagnostics and is not retried.
    fn create_shader_module(
        &self,
        descriptor: &ShaderModuleDescriptor,
    ) -> Result<ShaderModuleId, ResourceError>;

    /// Destroys the shader module associated with the given ID.
    fn destroy_shader_module(&self, id: ShaderModuleId) -> Result<(), ResourceError>;

    /// Creates a compute pipeline from the provided descriptor.
    ///
    /// Every uniform set the pipeline will be dispatched with must have been
    /// created (for this shader, at ascending set indices) before this call,
    /// so the backend can derive the full pipeline layout.
    fn create_compute_pipeline(
        &self,
        descriptor: &ComputePipelineDescriptor,
    ) -> Result<ComputePipelineId, ResourceError>;

    /// Destroys the compute pipeline associated with the given ID.
    fn destroy_compute_pipeline(&self, id: ComputePipelineId) -> Result<(), ResourceError>;

    /// Returns `true` while the pipeline handle refers to a live pipeline.
    fn is_compute_pipeline_valid(&self, id: ComputePipelineId) -> bool;

    /// Creates a new GPU buffer.
    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError>;

    /// Creates a new GPU buffer and initializes it with the provided data.
    /// This is often more efficient for creating static buffers.
    fn create_buffer_with_data(
        &self,
        descriptor: &BufferDescriptor,
        data: &[u8],
    ) -> Result<BufferId, ResourceError>;

    /// Destroys a GPU buffer.
    ///
    /// Any realized uniform set referencing the buffer becomes *stale*: its
    /// validity query starts returning `false`, and the consumer is expected
    /// to run the invalidate/rebuild cycle.
    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError>;

    /// Writes data to a GPU buffer at the given byte offset.
    fn write_buffer(&self, id: BufferId, offset: u64, data: &[u8]) -> Result<(), ResourceError>;

    /// Reads raw bytes back from a GPU buffer.
    ///
    /// Reads `size` bytes starting at `offset`, or the remainder of the
    /// buffer when `size` is `None`. On backends where readback requires a
    /// staging copy this call blocks until the GPU has produced the data;
    /// callers are expected to have synchronized preceding compute work
    /// (e.g. via a dispatch-and-sync on a local device).
    fn read_buffer(
        &self,
        id: BufferId,
        offset: u64,
        size: Option<u64>,
    ) -> Result<Vec<u8>, ResourceError>;

    /// Creates a new GPU texture.
    fn create_texture(&self, descriptor: &TextureDescriptor) -> Result<TextureId, ResourceError>;

    /// Destroys a GPU texture.
    ///
    /// As with [`ComputeDevice::destroy_buffer`], dependent uniform sets
    /// become stale. This is the mechanism by which an externally-owned
    /// surface being resized/recreated propagates into the compute layer.
    fn destroy_texture(&self, id: TextureId) -> Result<(), ResourceError>;

    /// Writes texel data to a GPU texture.
    /// ## Arguments
    /// * `bytes_per_row` - The stride between rows in `data`; `None` for
    ///   tightly packed rows.
    fn write_texture(
        &self,
        texture_id: TextureId,
        data: &[u8],
        bytes_per_row: Option<u32>,
        offset: Origin3D,
        size: Extent3D,
    ) -> Result<(), ResourceError>;

    /// Creates a new sampler.
    fn create_sampler(&self, descriptor: &SamplerDescriptor) -> Result<SamplerId, ResourceError>;

    /// Destroys a sampler.
    fn destroy_sampler(&self, id: SamplerId) -> Result<(), ResourceError>;

    /// Materializes an ordered collection of bindings into one device-side
    /// uniform set, scoped to the given `(shader, set index)` pair.
    fn create_uniform_set(
        &self,
        shader: ShaderModuleId,
        set: u32,
        bindings: &[UniformBinding],
    ) -> Result<UniformSetId, ResourceError>;

    /// Destroys a uniform set. Destroying an already-stale set is allowed.
    fn destroy_uniform_set(&self, id: UniformSetId) -> Result<(), ResourceError>;

    /// Returns `true` while the uniform set exists and none of the resources
    /// it references have been destroyed underneath it.
    fn is_uniform_set_valid(&self, id: UniformSetId) -> bool;

    /// Creates a new command encoder to record GPU commands.
    fn create_command_encoder(&self, label: Option<&str>) -> Box<dyn CommandEncoder>;

    /// Submits a previously recorded command buffer to the GPU for execution.
    fn submit_command_buffer(&self, command_buffer: CommandBufferId);

    /// Blocks the calling thread until all submitted GPU work has completed.
    ///
    /// Only meaningful on a [`DeviceKind::Local`] device; the dispatcher
    /// never calls it on a shared device.
    fn wait_idle(&self) -> Result<(), ResourceError>;

    /// Get the adapter information of the device.
    fn get_device_info(&self) -> DeviceInfo;

    /// Indicate if a specific feature is supported (e.g. `"push_constants"`).
    fn supports_feature(&self, feature_name: &str) -> bool;
}
