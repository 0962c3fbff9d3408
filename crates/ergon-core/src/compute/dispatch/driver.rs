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

//! The compute dispatcher: owns a compiled shader, its pipeline, a
//! workgroup size and a push-constant blob, and drives sized compute
//! passes.

use crate::compute::api::{
    ComputePassDescriptor, ComputePipelineDescriptor, DeviceKind, ShaderModuleDescriptor,
    UniformBinding, WorkgroupSize,
};
use crate::compute::dispatch::marshal;
use crate::compute::dispatch::registry::{ResourceRegistry, TrackedResource};
use crate::compute::dispatch::uniform::UniformSetBuilder;
use crate::compute::error::{ComputeError, MarshalError};
use crate::compute::traits::ComputeDevice;
use bytemuck::Pod;
use std::borrow::Cow;
use std::sync::Arc;

/// Where a [`ComputeDispatcher`] currently is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    /// No shader has been loaded yet.
    Uninitialized,
    /// A shader module is compiled; bindings can be registered.
    ShaderLoaded,
    /// The pipeline exists and the dispatcher can record dispatches.
    PipelineCreated,
}

/// Owns one compute shader, the pipeline compiled from it, the uniform sets
/// realized against it, a workgroup size, and an optional push-constant
/// blob; issues compute passes sized in *invocations*.
///
/// The lifecycle is `load_shader` → register bindings → `create_pipeline` →
/// `dispatch` each frame, with the invalidate/rebuild cycle (see
/// [`UniformSetBuilder`]) as the only recovery path when an
/// externally-owned resource is recreated underneath a realized set.
///
/// Teardown is scoped: the dispatcher releases everything it created —
/// uniform sets first, then the pipeline, then the shader — on
/// [`ComputeDispatcher::dispose`] or on drop, whichever comes first, and
/// never twice. Buffers and textures referenced by bindings are borrowed
/// from the consumer and are not released here.
#[derive(Debug)]
pub struct ComputeDispatcher {
    device: Arc<dyn ComputeDevice>,
    registry: ResourceRegistry,
    uniforms: Option<UniformSetBuilder>,
    shader: Option<crate::compute::api::ShaderModuleId>,
    pipeline: Option<crate::compute::api::ComputePipelineId>,
    workgroup: WorkgroupSize,
    push_constant: Option<Vec<u8>>,
    push_constant_size: u32,
    entry_point: String,
    label: String,
}

impl ComputeDispatcher {
    /// Creates a dispatcher bound to the device all its resources will live
    /// on.
    pub fn new(device: Arc<dyn ComputeDevice>) -> Self {
        let registry = ResourceRegistry::new(device.clone());
        Self {
            device,
            registry,
            uniforms: None,
            shader: None,
            pipeline: None,
            workgroup: WorkgroupSize::default(),
            push_constant: None,
            push_constant_size: 0,
            entry_point: String::from("main"),
            label: String::from("ergon-compute"),
        }
    }

    /// The dispatcher's current lifecycle state.
    pub fn state(&self) -> DispatcherState {
        if self.pipeline.is_some() {
            DispatcherState::PipelineCreated
        } else if self.shader.is_some() {
            DispatcherState::ShaderLoaded
        } else {
            DispatcherState::Uninitialized
        }
    }

    /// The device this dispatcher records against.
    pub fn device(&self) -> &Arc<dyn ComputeDevice> {
        &self.device
    }

    /// The workgroup size recorded at shader load.
    pub fn workgroup_size(&self) -> WorkgroupSize {
        self.workgroup
    }

    /// Compiles the compute shader module and records the workgroup size
    /// used to convert invocation counts into dispatch group counts.
    ///
    /// `workgroup` must match the shader's `@workgroup_size` declaration.
    /// Compilation failure is fatal and surfaces immediately; a dispatcher
    /// compiles exactly one shader in its lifetime.
    pub fn load_shader(
        &mut self,
        descriptor: &ShaderModuleDescriptor,
        workgroup: WorkgroupSize,
    ) -> Result<(), ComputeError> {
        if self.shader.is_some() {
            return Err(ComputeError::ShaderAlreadyLoaded);
        }

        let id = self.device.create_shader_module(descriptor)?;
        self.registry.track(TrackedResource::ShaderModule(id));

        if let Some(label) = descriptor.label {
            self.label = label.to_string();
        }
        self.entry_point = descriptor.entry_point.to_string();
        self.workgroup = workgroup;
        self.shader = Some(id);
        self.uniforms = Some(UniformSetBuilder::new(self.device.clone(), id));

        log::info!(
            "ComputeDispatcher('{}'): loaded shader {id:?}, workgroup {workgroup:?}",
            self.label
        );
        Ok(())
    }

    /// Appends a binding to the uniform set at index `set`.
    ///
    /// See [`UniformSetBuilder::put_binding`] for the ascending-order rule.
    pub fn put_binding(&mut self, binding: UniformBinding, set: u32) -> Result<(), ComputeError> {
        self.uniforms
            .as_mut()
            .ok_or(ComputeError::ShaderNotLoaded)?
            .put_binding(binding, set)
    }

    /// Re-derives the push-constant blob from a fixed-layout value.
    ///
    /// The size must be a non-zero multiple of 16 bytes, and once the
    /// pipeline has declared its range the size can no longer change.
    pub fn set_push_constant<T: Pod>(&mut self, value: &T) -> Result<(), ComputeError> {
        let bytes = marshal::push_constant_bytes(value)?;
        if self.pipeline.is_some() && bytes.len() as u32 != self.push_constant_size {
            return Err(MarshalError::PushConstantSizeChanged {
                declared: self.push_constant_size,
                actual: bytes.len() as u32,
            }
            .into());
        }
        self.push_constant = Some(bytes);
        Ok(())
    }

    /// Finalizes every pending uniform set against the shader, then creates
    /// the compute pipeline.
    ///
    /// Requires a loaded shader. The push-constant range the pipeline
    /// declares is the size of the blob currently held (0 when none), so
    /// set the initial push constant before this call.
    pub fn create_pipeline(&mut self) -> Result<(), ComputeError> {
        let shader = self.shader.ok_or(ComputeError::ShaderNotLoaded)?;
        if self.pipeline.is_some() {
            return Err(ComputeError::PipelineAlreadyCreated);
        }

        let uniforms = self.uniforms.as_mut().ok_or(ComputeError::ShaderNotLoaded)?;
        uniforms.finalize_all(&mut self.registry)?;

        self.push_constant_size = self.push_constant.as_ref().map_or(0, |b| b.len() as u32);

        let id = self.device.create_compute_pipeline(&ComputePipelineDescriptor {
            label: Some(Cow::Borrowed(self.label.as_str())),
            shader_module: shader,
            entry_point: Cow::Borrowed(self.entry_point.as_str()),
            push_constant_size: self.push_constant_size,
        })?;
        self.registry.track(TrackedResource::ComputePipeline(id));
        self.pipeline = Some(id);

        log::info!("ComputeDispatcher('{}'): created pipeline {id:?}", self.label);
        Ok(())
    }

    /// Delegates to the device's staleness flag for the realized set at
    /// `set`. Poll this once per frame before dispatching; a `false` means
    /// the consumer must run invalidate → re-register → finalize before
    /// proceeding.
    pub fn is_set_valid(&self, set: u32) -> bool {
        self.uniforms
            .as_ref()
            .map(|u| u.is_valid(set))
            .unwrap_or(false)
    }

    /// Releases all realized uniform sets and clears their bindings,
    /// returning them to pending. The pipeline is untouched; re-register
    /// bindings with fresh handles and finalize to recover.
    pub fn invalidate_uniform_sets(&mut self) -> Result<(), ComputeError> {
        let uniforms = self.uniforms.as_mut().ok_or(ComputeError::ShaderNotLoaded)?;
        uniforms.invalidate(&mut self.registry);
        Ok(())
    }

    /// Realizes a single pending set; the targeted half of the rebuild
    /// cycle.
    pub fn finalize_set(&mut self, set: u32) -> Result<(), ComputeError> {
        let uniforms = self.uniforms.as_mut().ok_or(ComputeError::ShaderNotLoaded)?;
        uniforms.finalize_one(set, &mut self.registry)
    }

    /// Realizes every pending set.
    pub fn finalize_all_sets(&mut self) -> Result<(), ComputeError> {
        let uniforms = self.uniforms.as_mut().ok_or(ComputeError::ShaderNotLoaded)?;
        uniforms.finalize_all(&mut self.registry)
    }

    /// Read access to the uniform set builder, for queries.
    pub fn uniform_sets(&self) -> Option<&UniformSetBuilder> {
        self.uniforms.as_ref()
    }

    /// Records and submits one compute pass covering the given *invocation*
    /// counts.
    ///
    /// Group counts are `ceil(invocations / workgroup_size)` per axis, so
    /// the invocation domain is always fully covered even when it does not
    /// divide evenly; the shader is expected to bounds-check the trailing
    /// partial group. Fails if the pipeline or any realized uniform set is
    /// no longer valid — the caller is expected to have already performed
    /// the invalidate/rebuild cycle this frame.
    ///
    /// Within the pass the binding order is fixed: pipeline, uniform sets
    /// ascending by set index, push constants, dispatch. Returns as soon as
    /// the commands are submitted; GPU execution is asynchronous.
    pub fn dispatch(&mut self, x: u32, y: u32, z: u32) -> Result<(), ComputeError> {
        let pipeline = self.pipeline.ok_or(ComputeError::PipelineNotCreated)?;
        if !self.device.is_compute_pipeline_valid(pipeline) {
            return Err(ComputeError::StalePipeline(pipeline));
        }

        let uniforms = self.uniforms.as_ref().ok_or(ComputeError::ShaderNotLoaded)?;
        let sets = uniforms.realized_sets()?;
        for (index, id) in sets.iter().enumerate() {
            if !self.device.is_uniform_set_valid(*id) {
                return Err(ComputeError::StaleUniformSet {
                    set: index as u32,
                    id: *id,
                });
            }
        }

        let groups = self.workgroup.group_counts(x, y, z);

        let mut encoder = self.device.create_command_encoder(Some(self.label.as_str()));
        {
            let mut pass = encoder.begin_compute_pass(&ComputePassDescriptor {
                label: Some(self.label.as_str()),
            });
            pass.set_pipeline(&pipeline);
            for (index, id) in sets.iter().enumerate() {
                pass.set_uniform_set(index as u32, id);
            }
            if let Some(push_constant) = &self.push_constant {
                pass.set_push_constants(push_constant);
            }
            pass.dispatch_workgroups(groups[0], groups[1], groups[2]);
        }
        let command_buffer = encoder.finish();
        self.device.submit_command_buffer(command_buffer);
        Ok(())
    }

    /// Like [`ComputeDispatcher::dispatch`], then blocks until the GPU has
    /// finished — but only when the device is an isolated local context.
    ///
    /// Required when an immediate CPU-side readback follows. Use sparingly:
    /// it serializes CPU and GPU work, eliminating pipeline parallelism. On
    /// a shared device the blocking step is skipped; the host frame loop
    /// owns synchronization there.
    pub fn dispatch_and_sync(&mut self, x: u32, y: u32, z: u32) -> Result<(), ComputeError> {
        self.dispatch(x, y, z)?;
        if self.device.kind() == DeviceKind::Local {
            self.device.wait_idle()?;
        }
        Ok(())
    }

    /// Releases every handle this dispatcher owns: uniform sets first, then
    /// the pipeline, then the shader. Safe to call more than once; the
    /// dispatcher must not be dispatched afterwards.
    pub fn dispose(&mut self) {
        if let Some(mut uniforms) = self.uniforms.take() {
            uniforms.invalidate(&mut self.registry);
        }
        self.registry.release_all();
        self.pipeline = None;
        self.shader = None;
        self.push_constant = None;
        self.push_constant_size = 0;
    }
}

impl Drop for ComputeDispatcher {
    fn drop(&mut self) {
        self.dispose();
    }
}
