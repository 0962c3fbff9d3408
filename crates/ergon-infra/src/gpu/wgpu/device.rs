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

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use wgpu;
use wgpu::util::DeviceExt;

use ergon_core::compute::traits::CommandEncoder;
use ergon_core::compute::{
    BufferDescriptor, BufferId, CommandBufferId, ComputeDevice, ComputePipelineDescriptor,
    ComputePipelineId, DeviceInfo, DeviceKind, Extent3D, Origin3D, PipelineError, ResourceError,
    SamplerDescriptor, SamplerId, ShaderError, ShaderModuleDescriptor, ShaderModuleId,
    ShaderSourceData, TextureDescriptor, TextureFormat, TextureId, UniformBinding,
    UniformResource, UniformSetId,
};

use crate::gpu::wgpu::command::WgpuCommandEncoder;
use crate::gpu::wgpu::conversions::{storage_access_for, IntoWgpu};

use super::context::WgpuComputeContext;

#[derive(Debug)]
struct WgpuShaderModuleEntry {
    wgpu_module: Arc<wgpu::ShaderModule>,
}

#[derive(Debug)]
pub(crate) struct WgpuComputePipelineEntry {
    pub(crate) wgpu_pipeline: Arc<wgpu::ComputePipeline>,
}

#[derive(Debug)]
pub(crate) struct WgpuBufferEntry {
    pub(crate) wgpu_buffer: Arc<wgpu::Buffer>,
    pub(crate) size: u64, // To track VRAM accurately on destruction
}

#[derive(Debug)]
pub(crate) struct WgpuTextureEntry {
    pub(crate) wgpu_texture: Arc<wgpu::Texture>,
    pub(crate) format: TextureFormat,
    pub(crate) size: u64, // To track VRAM accurately on destruction
}

#[derive(Debug)]
struct WgpuSamplerEntry {
    wgpu_sampler: Arc<wgpu::Sampler>,
}

/// A realized uniform set: the bind group plus the consumer-owned handles
/// it references. Destroying any referenced resource flips `valid`, which
/// is what the staleness query reports.
#[derive(Debug)]
struct WgpuUniformSetEntry {
    bind_group: Arc<wgpu::BindGroup>,
    valid: bool,
    buffers: Vec<BufferId>,
    textures: Vec<TextureId>,
}

/// The internal, non-clonable state of the WgpuComputeDevice.
/// This struct holds all the GPU resources and state, protected by an Arc.
#[derive(Debug)]
pub struct WgpuComputeDeviceInternal {
    context: WgpuComputeContext,
    shader_modules: Mutex<HashMap<ShaderModuleId, WgpuShaderModuleEntry>>,
    pipelines: Mutex<HashMap<ComputePipelineId, WgpuComputePipelineEntry>>,
    buffers: Mutex<HashMap<BufferId, WgpuBufferEntry>>,
    textures: Mutex<HashMap<TextureId, WgpuTextureEntry>>,
    samplers: Mutex<HashMap<SamplerId, WgpuSamplerEntry>>,
    uniform_sets: Mutex<HashMap<UniformSetId, WgpuUniformSetEntry>>,
    // Bind group layouts derived from binding kinds, cached per (shader, set)
    // so a rebuilt set stays compatible with the pipeline layout.
    set_layouts: Mutex<HashMap<(ShaderModuleId, u32), Arc<wgpu::BindGroupLayout>>>,

    next_shader_id: AtomicUsize,
    next_pipeline_id: AtomicU64,
    next_buffer_id: AtomicUsize,
    next_texture_id: AtomicUsize,
    next_sampler_id: AtomicUsize,
    next_uniform_set_id: AtomicUsize,

    // VRAM Tracking
    vram_allocated_bytes: AtomicU64,
    vram_peak_bytes: AtomicU64,

    /// Command buffers that have been finished but not yet submitted.
    pending_command_buffers: Mutex<HashMap<CommandBufferId, wgpu::CommandBuffer>>,
    /// A thread-safe counter to generate unique command buffer IDs.
    command_buffer_id_counter: AtomicU64,
}

/// A clonable, thread-safe handle to the WGPU compute device.
/// It wraps the actual device state (`WgpuComputeDeviceInternal`) in an Arc,
/// allowing it to be shared across threads and with command encoders.
#[derive(Clone, Debug)]
pub struct WgpuComputeDevice {
    internal: Arc<WgpuComputeDeviceInternal>,
}

impl WgpuComputeDevice {
    /// Wraps an initialized context into a device implementing
    /// [`ComputeDevice`].
    pub fn new(context: WgpuComputeContext) -> Self {
        Self {
            internal: Arc::new(WgpuComputeDeviceInternal {
                context,
                shader_modules: Mutex::new(HashMap::new()),
                pipelines: Mutex::new(HashMap::new()),
                buffers: Mutex::new(HashMap::new()),
                textures: Mutex::new(HashMap::new()),
                samplers: Mutex::new(HashMap::new()),
                uniform_sets: Mutex::new(HashMap::new()),
                set_layouts: Mutex::new(HashMap::new()),
                next_shader_id: AtomicUsize::new(0),
                next_pipeline_id: AtomicU64::new(0),
                next_buffer_id: AtomicUsize::new(0),
                next_texture_id: AtomicUsize::new(0),
                next_sampler_id: AtomicUsize::new(0),
                next_uniform_set_id: AtomicUsize::new(0),
                vram_allocated_bytes: AtomicU64::new(0),
                vram_peak_bytes: AtomicU64::new(0),
                pending_command_buffers: Mutex::new(HashMap::new()),
                command_buffer_id_counter: AtomicU64::new(0),
            }),
        }
    }

    // --- ID Generation Helpers ---

    fn generate_shader_id(&self) -> ShaderModuleId {
        ShaderModuleId(self.internal.next_shader_id.fetch_add(1, Ordering::Relaxed))
    }

    fn generate_pipeline_id(&self) -> ComputePipelineId {
        ComputePipelineId(
            self.internal
                .next_pipeline_id
                .fetch_add(1, Ordering::Relaxed),
        )
    }

    fn generate_buffer_id(&self) -> BufferId {
        BufferId(self.internal.next_buffer_id.fetch_add(1, Ordering::Relaxed))
    }

    fn generate_texture_id(&self) -> TextureId {
        TextureId(
            self.internal
                .next_texture_id
                .fetch_add(1, Ordering::Relaxed),
        )
    }

    fn generate_sampler_id(&self) -> SamplerId {
        SamplerId(
            self.internal
                .next_sampler_id
                .fetch_add(1, Ordering::Relaxed),
        )
    }

    fn generate_uniform_set_id(&self) -> UniformSetId {
        UniformSetId(
            self.internal
                .next_uniform_set_id
                .fetch_add(1, Ordering::Relaxed),
        )
    }

    fn wgpu_device(&self) -> &wgpu::Device {
        &self.internal.context.device
    }

    fn wgpu_queue(&self) -> &wgpu::Queue {
        &self.internal.context.queue
    }

    fn track_vram_alloc(&self, bytes: u64) {
        let total = self
            .internal
            .vram_allocated_bytes
            .fetch_add(bytes, Ordering::Relaxed)
            + bytes;
        self.internal
            .vram_peak_bytes
            .fetch_max(total, Ordering::Relaxed);
    }

    fn track_vram_free(&self, bytes: u64) {
        self.internal
            .vram_allocated_bytes
            .fetch_sub(bytes, Ordering::Relaxed);
    }

    /// The number of bytes currently allocated in buffers and textures
    /// through this device.
    pub fn vram_allocated_bytes(&self) -> u64 {
        self.internal.vram_allocated_bytes.load(Ordering::Relaxed)
    }

    /// The high-water mark of [`WgpuComputeDevice::vram_allocated_bytes`].
    pub fn vram_peak_bytes(&self) -> u64 {
        self.internal.vram_peak_bytes.load(Ordering::Relaxed)
    }

    /// Retrieves a reference-counted pointer to the internal WGPU compute pipeline.
    /// Returns `None` if the ID is invalid.
    pub fn get_wgpu_compute_pipeline(
        &self,
        id: ComputePipelineId,
    ) -> Option<Arc<wgpu::ComputePipeline>> {
        let pipelines = self.internal.pipelines.lock().unwrap();
        pipelines
            .get(&id)
            .map(|entry| Arc::clone(&entry.wgpu_pipeline))
    }

    /// Retrieves a reference-counted pointer to the internal WGPU buffer.
    /// Returns `None` if the ID is invalid.
    pub fn get_wgpu_buffer(&self, id: BufferId) -> Option<Arc<wgpu::Buffer>> {
        let buffers = self.internal.buffers.lock().unwrap();
        buffers.get(&id).map(|entry| Arc::clone(&entry.wgpu_buffer))
    }

    /// Retrieves a reference-counted pointer to the internal WGPU texture.
    /// Returns `None` if the ID is invalid.
    pub fn get_wgpu_texture(&self, id: TextureId) -> Option<Arc<wgpu::Texture>> {
        let textures = self.internal.textures.lock().unwrap();
        textures
            .get(&id)
            .map(|entry| Arc::clone(&entry.wgpu_texture))
    }

    /// Retrieves a reference-counted pointer to the bind group realized for
    /// a uniform set. Returns `None` if the ID is invalid.
    pub fn get_wgpu_bind_group(&self, id: UniformSetId) -> Option<Arc<wgpu::BindGroup>> {
        let sets = self.internal.uniform_sets.lock().unwrap();
        sets.get(&id).map(|entry| Arc::clone(&entry.bind_group))
    }

    /// (crate-internal) Registers a finished wgpu::CommandBuffer, storing it
    /// in a map and returning an abstract ID for it.
    pub(crate) fn register_command_buffer(&self, buffer: wgpu::CommandBuffer) -> CommandBufferId {
        let new_id_raw = self
            .internal
            .command_buffer_id_counter
            .fetch_add(1, Ordering::SeqCst);
        let new_id = CommandBufferId(new_id_raw);

        let mut guard = self.internal.pending_command_buffers.lock().unwrap();
        guard.insert(new_id, buffer);

        new_id
    }

    fn texture_format(&self, id: TextureId) -> Option<TextureFormat> {
        let textures = self.internal.textures.lock().unwrap();
        textures.get(&id).map(|entry| entry.format)
    }

    /// Maps a binding kind onto the layout entry the shader expects for it.
    fn bind_group_layout_entry(
        &self,
        binding: &UniformBinding,
    ) -> Result<wgpu::BindGroupLayoutEntry, ResourceError> {
        use ergon_core::compute::UniformKind;

        let ty = match binding.kind {
            UniformKind::StorageBuffer => wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only: false },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            UniformKind::UniformBuffer => wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            UniformKind::Image => {
                let format = match binding.resource {
                    UniformResource::Texture(id) => {
                        self.texture_format(id).ok_or(ResourceError::NotFound)?
                    }
                    _ => return Err(ResourceError::InvalidHandle),
                };
                wgpu::BindingType::StorageTexture {
                    access: storage_access_for(format),
                    format: format.into_wgpu(),
                    view_dimension: wgpu::TextureViewDimension::D2,
                }
            }
            UniformKind::SampledTexture => wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            UniformKind::Sampler => wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        };

        Ok(wgpu::BindGroupLayoutEntry {
            binding: binding.binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty,
            count: None,
        })
    }
}

enum ResolvedBinding {
    Buffer(Arc<wgpu::Buffer>),
    View(wgpu::TextureView),
    Sampler(Arc<wgpu::Sampler>),
}

impl ComputeDevice for WgpuComputeDevice {
    fn kind(&self) -> DeviceKind {
        self.internal.context.kind
    }

    // --- Shader Module Operations ---

    fn create_shader_module(
        &self,
        descriptor: &ShaderModuleDescriptor,
    ) -> Result<ShaderModuleId, ResourceError> {
        let wgpu_source = match &descriptor.source {
            ShaderSourceData::Wgsl(cow_str) => wgpu::ShaderSource::Wgsl(cow_str.clone()),
        };

        let label = descriptor.label;
        log::debug!("WgpuComputeDevice: Creating wgpu::ShaderModule with label: {label:?}");

        // Compilation failures surface through a validation error scope;
        // wgpu's create call itself never fails synchronously.
        let device = self.wgpu_device();
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let wgpu_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label,
            source: wgpu_source,
        });
        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(ShaderError::CompilationError {
                label: label.unwrap_or("unnamed").to_string(),
                details: error.to_string(),
            }
            .into());
        }

        let id = self.generate_shader_id();
        let mut modules_guard = self.internal.shader_modules.lock().map_err(|e| {
            ResourceError::BackendError(format!("Mutex poisoned (shader_modules): {e}"))
        })?;
        modules_guard.insert(
            id,
            WgpuShaderModuleEntry {
                wgpu_module: Arc::new(wgpu_module),
            },
        );

        log::info!(
            "WgpuComputeDevice: Successfully created shader module '{}' with ID: {id:?}",
            label.unwrap_or_default()
        );
        Ok(id)
    }

    fn destroy_shader_module(&self, id: ShaderModuleId) -> Result<(), ResourceError> {
        let mut modules_guard = self.internal.shader_modules.lock().map_err(|e| {
            ResourceError::BackendError(format!("Mutex poisoned (shader_modules): {e}"))
        })?;

        if modules_guard.remove(&id).is_some() {
            // Cached set layouts are keyed by shader; they die with it.
            drop(modules_guard);
            self.internal
                .set_layouts
                .lock()
                .unwrap()
                .retain(|(shader, _), _| *shader != id);
            log::debug!("WgpuComputeDevice: Destroyed shader module with ID: {id:?}");
            Ok(())
        } else {
            Err(ShaderError::NotFound { id }.into())
        }
    }

    // --- Compute Pipeline Operations ---

    fn create_compute_pipeline(
        &self,
        descriptor: &ComputePipelineDescriptor,
    ) -> Result<ComputePipelineId, ResourceError> {
        log::debug!(
            "WgpuComputeDevice: Creating compute pipeline with label: {:?}",
            descriptor.label
        );

        let wgpu_module = {
            let modules_guard = self.internal.shader_modules.lock().map_err(|e| {
                ResourceError::BackendError(format!("Mutex poisoned (shader_modules): {e}"))
            })?;
            let entry = modules_guard.get(&descriptor.shader_module).ok_or_else(|| {
                ResourceError::Pipeline(PipelineError::InvalidShaderModuleForPipeline {
                    id: descriptor.shader_module,
                    pipeline_label: descriptor.label.as_deref().map(String::from),
                })
            })?;
            Arc::clone(&entry.wgpu_module)
        };

        // Compose the pipeline layout from the set layouts realized for this
        // shader, in ascending set order. Uniform sets are finalized before
        // pipeline creation, so every set the pipeline needs is cached.
        let group_layouts: Vec<Arc<wgpu::BindGroupLayout>> = {
            let layouts_guard = self.internal.set_layouts.lock().unwrap();
            let mut collected = Vec::new();
            let mut set = 0u32;
            while let Some(layout) = layouts_guard.get(&(descriptor.shader_module, set)) {
                collected.push(Arc::clone(layout));
                set += 1;
            }
            collected
        };

        let mut push_constant_ranges = Vec::new();
        if descriptor.push_constant_size > 0 {
            if !self
                .internal
                .context
                .active_device_features
                .contains(wgpu::Features::PUSH_CONSTANTS)
            {
                return Err(PipelineError::FeatureNotSupported(
                    "push_constants".to_string(),
                )
                .into());
            }
            push_constant_ranges.push(wgpu::PushConstantRange {
                stages: wgpu::ShaderStages::COMPUTE,
                range: 0..descriptor.push_constant_size,
            });
        }

        let device = self.wgpu_device();
        let layout_refs: Vec<&wgpu::BindGroupLayout> =
            group_layouts.iter().map(|l| l.as_ref()).collect();
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: descriptor.label.as_deref(),
            bind_group_layouts: &layout_refs,
            push_constant_ranges: &push_constant_ranges,
        });

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let wgpu_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: descriptor.label.as_deref(),
            layout: Some(&pipeline_layout),
            module: &wgpu_module,
            entry_point: Some(descriptor.entry_point.as_ref()),
            compilation_options: Default::default(),
            cache: None,
        });
        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(PipelineError::CompilationFailed {
                label: descriptor.label.as_deref().map(String::from),
                details: error.to_string(),
            }
            .into());
        }

        let id = self.generate_pipeline_id();
        self.internal.pipelines.lock().unwrap().insert(
            id,
            WgpuComputePipelineEntry {
                wgpu_pipeline: Arc::new(wgpu_pipeline),
            },
        );

        log::info!(
            "WgpuComputeDevice: Successfully created compute pipeline '{:?}' with ID: {id:?}",
            descriptor.label
        );
        Ok(id)
    }

    fn destroy_compute_pipeline(&self, id: ComputePipelineId) -> Result<(), ResourceError> {
        let mut pipelines_guard = self.internal.pipelines.lock().unwrap();
        if pipelines_guard.remove(&id).is_some() {
            log::debug!("WgpuComputeDevice: Destroyed compute pipeline with ID: {id:?}");
            Ok(())
        } else {
            Err(PipelineError::InvalidComputePipeline { id }.into())
        }
    }

    fn is_compute_pipeline_valid(&self, id: ComputePipelineId) -> bool {
        self.internal.pipelines.lock().unwrap().contains_key(&id)
    }

    // --- Buffer Operations ---

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError> {
        let wgpu_buffer = self.wgpu_device().create_buffer(&wgpu::BufferDescriptor {
            label: descriptor.label.as_deref(),
            size: descriptor.size,
            usage: descriptor.usage.into_wgpu(),
            mapped_at_creation: descriptor.mapped_at_creation,
        });

        let id = self.generate_buffer_id();
        self.internal.buffers.lock().unwrap().insert(
            id,
            WgpuBufferEntry {
                wgpu_buffer: Arc::new(wgpu_buffer),
                size: descriptor.size,
            },
        );
        self.track_vram_alloc(descriptor.size);

        log::debug!(
            "WgpuComputeDevice: Created buffer {id:?} ({} bytes)",
            descriptor.size
        );
        Ok(id)
    }

    fn create_buffer_with_data(
        &self,
        descriptor: &BufferDescriptor,
        data: &[u8],
    ) -> Result<BufferId, ResourceError> {
        let wgpu_buffer = self
            .wgpu_device()
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: descriptor.label.as_deref(),
                contents: data,
                usage: descriptor.usage.into_wgpu(),
            });

        let id = self.generate_buffer_id();
        self.internal.buffers.lock().unwrap().insert(
            id,
            WgpuBufferEntry {
                wgpu_buffer: Arc::new(wgpu_buffer),
                size: data.len() as u64,
            },
        );
        self.track_vram_alloc(data.len() as u64);
        Ok(id)
    }

    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError> {
        let entry = self
            .internal
            .buffers
            .lock()
            .unwrap()
            .remove(&id)
            .ok_or(ResourceError::NotFound)?;
        self.track_vram_free(entry.size);

        // Any realized uniform set referencing this buffer is now stale.
        let mut sets_guard = self.internal.uniform_sets.lock().unwrap();
        for set in sets_guard.values_mut() {
            if set.buffers.contains(&id) {
                set.valid = false;
            }
        }

        log::debug!("WgpuComputeDevice: Destroyed buffer {id:?}");
        Ok(())
    }

    fn write_buffer(&self, id: BufferId, offset: u64, data: &[u8]) -> Result<(), ResourceError> {
        let (buffer, size) = {
            let buffers_guard = self.internal.buffers.lock().unwrap();
            let entry = buffers_guard.get(&id).ok_or(ResourceError::NotFound)?;
            (Arc::clone(&entry.wgpu_buffer), entry.size)
        };

        if offset + data.len() as u64 > size {
            return Err(ResourceError::OutOfBounds);
        }

        self.wgpu_queue().write_buffer(&buffer, offset, data);
        Ok(())
    }

    fn read_buffer(
        &self,
        id: BufferId,
        offset: u64,
        size: Option<u64>,
    ) -> Result<Vec<u8>, ResourceError> {
        let (buffer, buffer_size) = {
            let buffers_guard = self.internal.buffers.lock().unwrap();
            let entry = buffers_guard.get(&id).ok_or(ResourceError::NotFound)?;
            (Arc::clone(&entry.wgpu_buffer), entry.size)
        };

        let read_size = size.unwrap_or(buffer_size.saturating_sub(offset));
        if offset + read_size > buffer_size {
            return Err(ResourceError::OutOfBounds);
        }

        let device = self.wgpu_device();
        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("ergon-readback-staging"),
            size: read_size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("ergon-readback"),
        });
        encoder.copy_buffer_to_buffer(&buffer, offset, &staging, 0, read_size);
        self.wgpu_queue().submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });

        device
            .poll(wgpu::PollType::Wait)
            .map_err(|e| ResourceError::BackendError(format!("Device poll failed: {e:?}")))?;
        receiver
            .recv()
            .map_err(|e| ResourceError::BackendError(format!("Map callback lost: {e}")))?
            .map_err(|e| ResourceError::BackendError(format!("Buffer mapping failed: {e:?}")))?;

        let data = slice.get_mapped_range().to_vec();
        staging.unmap();
        Ok(data)
    }

    // --- Texture Operations ---

    fn create_texture(&self, descriptor: &TextureDescriptor) -> Result<TextureId, ResourceError> {
        let wgpu_texture = self.wgpu_device().create_texture(&wgpu::TextureDescriptor {
            label: descriptor.label.as_deref(),
            size: descriptor.size.into_wgpu(),
            mip_level_count: descriptor.mip_level_count,
            sample_count: descriptor.sample_count,
            dimension: descriptor.dimension.into_wgpu(),
            format: descriptor.format.into_wgpu(),
            usage: descriptor.usage.into_wgpu(),
            view_formats: &[],
        });

        let byte_size = descriptor.size.width as u64
            * descriptor.size.height as u64
            * descriptor.size.depth_or_array_layers as u64
            * descriptor.format.bytes_per_pixel() as u64;

        let id = self.generate_texture_id();
        self.internal.textures.lock().unwrap().insert(
            id,
            WgpuTextureEntry {
                wgpu_texture: Arc::new(wgpu_texture),
                format: descriptor.format,
                size: byte_size,
            },
        );
        self.track_vram_alloc(byte_size);

        log::debug!(
            "WgpuComputeDevice: Created texture {id:?} ({}x{}, {:?})",
            descriptor.size.width,
            descriptor.size.height,
            descriptor.format
        );
        Ok(id)
    }

    fn destroy_texture(&self, id: TextureId) -> Result<(), ResourceError> {
        let entry = self
            .internal
            .textures
            .lock()
            .unwrap()
            .remove(&id)
            .ok_or(ResourceError::NotFound)?;
        self.track_vram_free(entry.size);

        // This is how an externally-owned surface being recreated reaches
        // the compute layer: sets referencing the old texture go stale.
        let mut sets_guard = self.internal.uniform_sets.lock().unwrap();
        for set in sets_guard.values_mut() {
            if set.textures.contains(&id) {
                set.valid = false;
            }
        }

        log::debug!("WgpuComputeDevice: Destroyed texture {id:?}");
        Ok(())
    }

    fn write_texture(
        &self,
        texture_id: TextureId,
        data: &[u8],
        bytes_per_row: Option<u32>,
        offset: Origin3D,
        size: Extent3D,
    ) -> Result<(), ResourceError> {
        let (texture, format) = {
            let textures_guard = self.internal.textures.lock().unwrap();
            let entry = textures_guard
                .get(&texture_id)
                .ok_or(ResourceError::NotFound)?;
            (Arc::clone(&entry.wgpu_texture), entry.format)
        };

        let row_stride = bytes_per_row.unwrap_or(size.width * format.bytes_per_pixel());
        self.wgpu_queue().write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: offset.into_wgpu(),
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(row_stride),
                rows_per_image: None,
            },
            size.into_wgpu(),
        );
        Ok(())
    }

    // --- Sampler Operations ---

    fn create_sampler(&self, descriptor: &SamplerDescriptor) -> Result<SamplerId, ResourceError> {
        let wgpu_sampler = self.wgpu_device().create_sampler(&wgpu::SamplerDescriptor {
            label: descriptor.label,
            address_mode_u: descriptor.address_mode.into_wgpu(),
            address_mode_v: descriptor.address_mode.into_wgpu(),
            address_mode_w: descriptor.address_mode.into_wgpu(),
            mag_filter: descriptor.mag_filter.into_wgpu(),
            min_filter: descriptor.min_filter.into_wgpu(),
            ..Default::default()
        });

        let id = self.generate_sampler_id();
        self.internal.samplers.lock().unwrap().insert(
            id,
            WgpuSamplerEntry {
                wgpu_sampler: Arc::new(wgpu_sampler),
            },
        );
        Ok(id)
    }

    fn destroy_sampler(&self, id: SamplerId) -> Result<(), ResourceError> {
        if self
            .internal
            .samplers
            .lock()
            .unwrap()
            .remove(&id)
            .is_some()
        {
            Ok(())
        } else {
            Err(ResourceError::NotFound)
        }
    }

    // --- Uniform Set Operations ---

    fn create_uniform_set(
        &self,
        shader: ShaderModuleId,
        set: u32,
        bindings: &[UniformBinding],
    ) -> Result<UniformSetId, ResourceError> {
        if !self
            .internal
            .shader_modules
            .lock()
            .unwrap()
            .contains_key(&shader)
        {
            return Err(ShaderError::NotFound { id: shader }.into());
        }

        // Reuse the cached layout when the set is being rebuilt, so the new
        // bind group stays compatible with the pipeline layout composed at
        // pipeline creation.
        let layout = {
            let mut layouts_guard = self.internal.set_layouts.lock().unwrap();
            match layouts_guard.get(&(shader, set)) {
                Some(layout) => Arc::clone(layout),
                None => {
                    let entries: Vec<wgpu::BindGroupLayoutEntry> = bindings
                        .iter()
                        .map(|b| self.bind_group_layout_entry(b))
                        .collect::<Result<_, _>>()?;
                    let layout = Arc::new(self.wgpu_device().create_bind_group_layout(
                        &wgpu::BindGroupLayoutDescriptor {
                            label: Some("ergon-uniform-set-layout"),
                            entries: &entries,
                        },
                    ));
                    layouts_guard.insert((shader, set), Arc::clone(&layout));
                    layout
                }
            }
        };

        let mut referenced_buffers = Vec::new();
        let mut referenced_textures = Vec::new();
        let mut resolved = Vec::with_capacity(bindings.len());
        for binding in bindings {
            match binding.resource {
                UniformResource::Buffer(id) => {
                    let buffer = self.get_wgpu_buffer(id).ok_or(ResourceError::NotFound)?;
                    referenced_buffers.push(id);
                    resolved.push(ResolvedBinding::Buffer(buffer));
                }
                UniformResource::Texture(id) => {
                    let texture = self.get_wgpu_texture(id).ok_or(ResourceError::NotFound)?;
                    referenced_textures.push(id);
                    resolved.push(ResolvedBinding::View(
                        texture.create_view(&wgpu::TextureViewDescriptor::default()),
                    ));
                }
                UniformResource::Sampler(id) => {
                    let samplers_guard = self.internal.samplers.lock().unwrap();
                    let entry = samplers_guard.get(&id).ok_or(ResourceError::NotFound)?;
                    resolved.push(ResolvedBinding::Sampler(Arc::clone(&entry.wgpu_sampler)));
                }
            }
        }

        let entries: Vec<wgpu::BindGroupEntry> = bindings
            .iter()
            .zip(resolved.iter())
            .map(|(binding, res)| wgpu::BindGroupEntry {
                binding: binding.binding,
                resource: match res {
                    ResolvedBinding::Buffer(buffer) => buffer.as_entire_binding(),
                    ResolvedBinding::View(view) => wgpu::BindingResource::TextureView(view),
                    ResolvedBinding::Sampler(sampler) => wgpu::BindingResource::Sampler(sampler),
                },
            })
            .collect();

        let bind_group = self
            .wgpu_device()
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("ergon-uniform-set"),
                layout: &layout,
                entries: &entries,
            });

        let id = self.generate_uniform_set_id();
        self.internal.uniform_sets.lock().unwrap().insert(
            id,
            WgpuUniformSetEntry {
                bind_group: Arc::new(bind_group),
                valid: true,
                buffers: referenced_buffers,
                textures: referenced_textures,
            },
        );

        log::debug!("WgpuComputeDevice: Realized uniform set {id:?} (shader {shader:?}, set {set})");
        Ok(id)
    }

    fn destroy_uniform_set(&self, id: UniformSetId) -> Result<(), ResourceError> {
        // Destroying an already-stale set is a normal part of the rebuild
        // cycle, so validity is not checked here.
        if self
            .internal
            .uniform_sets
            .lock()
            .unwrap()
            .remove(&id)
            .is_some()
        {
            Ok(())
        } else {
            Err(ResourceError::NotFound)
        }
    }

    fn is_uniform_set_valid(&self, id: UniformSetId) -> bool {
        self.internal
            .uniform_sets
            .lock()
            .unwrap()
            .get(&id)
            .map(|entry| entry.valid)
            .unwrap_or(false)
    }

    // --- Command Operations ---

    fn create_command_encoder(&self, label: Option<&str>) -> Box<dyn CommandEncoder> {
        let encoder = self
            .wgpu_device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label });
        Box::new(WgpuCommandEncoder {
            encoder: Some(encoder),
            device: self.clone(),
        })
    }

    fn submit_command_buffer(&self, command_buffer: CommandBufferId) {
        let buffer = self
            .internal
            .pending_command_buffers
            .lock()
            .unwrap()
            .remove(&command_buffer);
        match buffer {
            Some(buffer) => {
                self.wgpu_queue().submit(std::iter::once(buffer));
            }
            None => {
                log::warn!(
                    "WgpuComputeDevice: submit of unknown command buffer {command_buffer:?}"
                );
            }
        }
    }

    fn wait_idle(&self) -> Result<(), ResourceError> {
        self.wgpu_device()
            .poll(wgpu::PollType::Wait)
            .map_err(|e| ResourceError::BackendError(format!("Device poll failed: {e:?}")))?;
        Ok(())
    }

    fn get_device_info(&self) -> DeviceInfo {
        DeviceInfo {
            name: self.internal.context.adapter_name.clone(),
            backend: format!("{:?}", self.internal.context.adapter_backend),
            device_type: format!("{:?}", self.internal.context.adapter_device_type),
        }
    }

    fn supports_feature(&self, feature_name: &str) -> bool {
        match feature_name {
            "push_constants" => self
                .internal
                .context
                .active_device_features
                .contains(wgpu::Features::PUSH_CONSTANTS),
            "timestamp_query" => self
                .internal
                .context
                .active_device_features
                .contains(wgpu::Features::TIMESTAMP_QUERY),
            _ => false,
        }
    }
}
