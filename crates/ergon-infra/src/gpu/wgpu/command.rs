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

use ergon_core::compute::traits::{CommandEncoder, ComputePass};
use ergon_core::compute::{
    BufferId, CommandBufferId, ComputePassDescriptor, ComputePipelineId, Extent3D, TextureId,
    UniformSetId,
};
use std::any::Any;

use super::conversions::IntoWgpu;
use super::device::WgpuComputeDevice;

// --- Concrete implementations ---

pub struct WgpuComputePass<'a> {
    pub(crate) pass: wgpu::ComputePass<'a>,
    pub(crate) device: &'a WgpuComputeDevice,
}

impl<'pass> ComputePass<'pass> for WgpuComputePass<'pass> {
    fn set_pipeline(&mut self, pipeline_id: &'pass ComputePipelineId) {
        if let Some(pipeline) = self.device.get_wgpu_compute_pipeline(*pipeline_id) {
            self.pass.set_pipeline(&pipeline);
        } else {
            log::warn!(
                "WgpuComputePass: ComputePipelineId {:?} not found.",
                pipeline_id
            );
        }
    }

    fn set_uniform_set(&mut self, index: u32, set_id: &'pass UniformSetId) {
        if let Some(bind_group) = self.device.get_wgpu_bind_group(*set_id) {
            self.pass.set_bind_group(index, bind_group.as_ref(), &[]);
        } else {
            log::warn!("WgpuComputePass: UniformSetId {:?} not found.", set_id);
        }
    }

    fn set_push_constants(&mut self, data: &[u8]) {
        self.pass.set_push_constants(0, data);
    }

    fn dispatch_workgroups(&mut self, x: u32, y: u32, z: u32) {
        self.pass.dispatch_workgroups(x, y, z);
    }
}

pub struct WgpuCommandEncoder {
    pub(crate) encoder: Option<wgpu::CommandEncoder>,
    pub(crate) device: WgpuComputeDevice,
}

impl WgpuCommandEncoder {
    /// Provides mutable access to the underlying `wgpu::CommandEncoder`.
    /// This is an "escape hatch" for backend-specific operations that are
    /// not fully abstracted yet.
    /// Returns `None` if the encoder has already been consumed by `finish()`.
    pub fn wgpu_encoder_mut(&mut self) -> Option<&mut wgpu::CommandEncoder> {
        self.encoder.as_mut()
    }
}

impl CommandEncoder for WgpuCommandEncoder {
    fn begin_compute_pass<'encoder>(
        &'encoder mut self,
        descriptor: &ComputePassDescriptor,
    ) -> Box<dyn ComputePass<'encoder> + 'encoder> {
        let pass = self
            .encoder
            .as_mut()
            .unwrap()
            .begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: descriptor.label,
                timestamp_writes: None,
            });

        Box::new(WgpuComputePass {
            pass,
            device: &self.device,
        })
    }

    fn copy_buffer_to_buffer(
        &mut self,
        source: &BufferId,
        source_offset: u64,
        destination: &BufferId,
        destination_offset: u64,
        size: u64,
    ) {
        if let (Some(source_buffer), Some(destination_buffer)) = (
            self.device.get_wgpu_buffer(*source),
            self.device.get_wgpu_buffer(*destination),
        ) {
            self.encoder.as_mut().unwrap().copy_buffer_to_buffer(
                &source_buffer,
                source_offset,
                &destination_buffer,
                destination_offset,
                size,
            );
        }
    }

    fn copy_texture_to_texture(
        &mut self,
        source: &TextureId,
        destination: &TextureId,
        size: Extent3D,
    ) {
        if let (Some(source_texture), Some(destination_texture)) = (
            self.device.get_wgpu_texture(*source),
            self.device.get_wgpu_texture(*destination),
        ) {
            self.encoder.as_mut().unwrap().copy_texture_to_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &source_texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                wgpu::TexelCopyTextureInfo {
                    texture: &destination_texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                size.into_wgpu(),
            );
        }
    }

    fn finish(mut self: Box<Self>) -> CommandBufferId {
        let finished_encoder = self.encoder.take().unwrap();
        self.device
            .register_command_buffer(finished_encoder.finish())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
