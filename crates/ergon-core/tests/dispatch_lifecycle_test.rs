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

use ergon_core::compute::dispatch::buffer_io;
use ergon_core::compute::{
    BufferDescriptor, BufferId, CommandBufferId, ComputeDevice, ComputeDispatcher,
    ComputeError, ComputePassDescriptor, ComputePipelineDescriptor, ComputePipelineId,
    DeviceInfo, DeviceKind, DispatcherState, Extent3D, MarshalError, Origin3D, ResourceError,
    ResourceRegistry, SamplerDescriptor, SamplerId, ShaderModuleDescriptor, ShaderModuleId,
    ShaderSourceData, TextureDescriptor, TextureId, TrackedResource, UniformBinding,
    UniformResource, UniformSetId, WorkgroupSize,
};
use ergon_core::compute::traits::{CommandEncoder, ComputePass};
use std::any::Any;
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

// --- MOCK DEVICE FOR THESE TESTS ---
//
// Records every create/destroy/dispatch so the tests can assert on release
// counts, release order, staleness propagation and recorded group counts.

#[derive(Debug, Default)]
struct MockState {
    next_id: usize,
    alive_shaders: HashSet<usize>,
    alive_pipelines: HashSet<u64>,
    alive_samplers: HashSet<usize>,
    buffers: HashMap<usize, Vec<u8>>,
    textures: HashSet<usize>,
    // uniform set id -> (valid flag, referenced buffers, referenced textures)
    uniform_sets: HashMap<usize, (bool, Vec<usize>, Vec<usize>)>,
    destroy_log: Vec<String>,
    dispatches: Vec<[u32; 3]>,
    bound_sets: Vec<Vec<(u32, usize)>>,
    push_constants: Vec<Vec<u8>>,
    submits: u32,
    wait_idles: u32,
}

impl MockState {
    fn fresh_id(&mut self) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn destroy_count(&self, entry: &str) -> usize {
        self.destroy_log.iter().filter(|e| e.as_str() == entry).count()
    }
}

#[derive(Debug, Clone)]
struct MockDevice {
    state: Arc<Mutex<MockState>>,
    kind: DeviceKind,
}

impl MockDevice {
    fn local() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
            kind: DeviceKind::Local,
        }
    }

    fn snapshot<R>(&self, f: impl FnOnce(&MockState) -> R) -> R {
        f(&self.state.lock().unwrap())
    }
}

struct MockPass {
    state: Arc<Mutex<MockState>>,
    sets: Vec<(u32, usize)>,
}

impl Drop for MockPass {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap();
        let sets = std::mem::take(&mut self.sets);
        state.bound_sets.push(sets);
    }
}

impl<'pass> ComputePass<'pass> for MockPass {
    fn set_pipeline(&mut self, _pipeline: &'pass ComputePipelineId) {}

    fn set_uniform_set(&mut self, index: u32, set: &'pass UniformSetId) {
        self.sets.push((index, set.0));
    }

    fn set_push_constants(&mut self, data: &[u8]) {
        self.state.lock().unwrap().push_constants.push(data.to_vec());
    }

    fn dispatch_workgroups(&mut self, x: u32, y: u32, z: u32) {
        self.state.lock().unwrap().dispatches.push([x, y, z]);
    }
}

struct MockEncoder {
    state: Arc<Mutex<MockState>>,
}

impl CommandEncoder for MockEncoder {
    fn begin_compute_pass<'encoder>(
        &'encoder mut self,
        _descriptor: &ComputePassDescriptor,
    ) -> Box<dyn ComputePass<'encoder> + 'encoder> {
        Box::new(MockPass {
            state: self.state.clone(),
            sets: Vec::new(),
        })
    }

    fn copy_buffer_to_buffer(
        &mut self,
        _source: &BufferId,
        _source_offset: u64,
        _destination: &BufferId,
        _destination_offset: u64,
        _size: u64,
    ) {
    }

    fn copy_texture_to_texture(
        &mut self,
        _source: &TextureId,
        _destination: &TextureId,
        _size: Extent3D,
    ) {
    }

    fn finish(self: Box<Self>) -> CommandBufferId {
        CommandBufferId(0)
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl ComputeDevice for MockDevice {
    fn kind(&self) -> DeviceKind {
        self.kind
    }

    fn create_shader_module(
        &self,
        descriptor: &ShaderModuleDescriptor,
    ) -> Result<ShaderModuleId, ResourceError> {
        let ShaderSourceData::Wgsl(source) = &descriptor.source;
        if source.contains("error") {
            return Err(ergon_core::compute::ShaderError::CompilationError {
                label: descriptor.label.unwrap_or("unknown").to_string(),
                details: "mock compile failure".to_string(),
            }
            .into());
        }
        let mut state = self.state.lock().unwrap();
        let id = state.fresh_id();
        state.alive_shaders.insert(id);
        Ok(ShaderModuleId(id))
    }

    fn destroy_shader_module(&self, id: ShaderModuleId) -> Result<(), ResourceError> {
        let mut state = self.state.lock().unwrap();
        state.destroy_log.push(format!("shader:{}", id.0));
        if state.alive_shaders.remove(&id.0) {
            Ok(())
        } else {
            Err(ResourceError::NotFound)
        }
    }

    fn create_compute_pipeline(
        &self,
        descriptor: &ComputePipelineDescriptor,
    ) -> Result<ComputePipelineId, ResourceError> {
        let mut state = self.state.lock().unwrap();
        if !state.alive_shaders.contains(&descriptor.shader_module.0) {
            return Err(ergon_core::compute::PipelineError::InvalidShaderModuleForPipeline {
                id: descriptor.shader_module,
                pipeline_label: descriptor.label.as_deref().map(String::from),
            }
            .into());
        }
        let id = state.fresh_id() as u64;
        state.alive_pipelines.insert(id);
        Ok(ComputePipelineId(id))
    }

    fn destroy_compute_pipeline(&self, id: ComputePipelineId) -> Result<(), ResourceError> {
        let mut state = self.state.lock().unwrap();
        state.destroy_log.push(format!("pipeline:{}", id.0));
        if state.alive_pipelines.remove(&id.0) {
            Ok(())
        } else {
            Err(ResourceError::NotFound)
        }
    }

    fn is_compute_pipeline_valid(&self, id: ComputePipelineId) -> bool {
        self.state.lock().unwrap().alive_pipelines.contains(&id.0)
    }

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError> {
        let mut state = self.state.lock().unwrap();
        let id = state.fresh_id();
        state.buffers.insert(id, vec![0u8; descriptor.size as usize]);
        Ok(BufferId(id))
    }

    fn create_buffer_with_data(
        &self,
        descriptor: &BufferDescriptor,
        data: &[u8],
    ) -> Result<BufferId, ResourceError> {
        let mut state = self.state.lock().unwrap();
        let id = state.fresh_id();
        let mut contents = vec![0u8; descriptor.size as usize];
        contents[..data.len()].copy_from_slice(data);
        state.buffers.insert(id, contents);
        Ok(BufferId(id))
    }

    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError> {
        let mut state = self.state.lock().unwrap();
        state.destroy_log.push(format!("buffer:{}", id.0));
        if state.buffers.remove(&id.0).is_none() {
            return Err(ResourceError::NotFound);
        }
        for set in state.uniform_sets.values_mut() {
            if set.1.contains(&id.0) {
                set.0 = false;
            }
        }
        Ok(())
    }

    fn write_buffer(&self, id: BufferId, offset: u64, data: &[u8]) -> Result<(), ResourceError> {
        let mut state = self.state.lock().unwrap();
        let buffer = state.buffers.get_mut(&id.0).ok_or(ResourceError::NotFound)?;
        let start = offset as usize;
        if start + data.len() > buffer.len() {
            return Err(ResourceError::OutOfBounds);
        }
        buffer[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn read_buffer(
        &self,
        id: BufferId,
        offset: u64,
        size: Option<u64>,
    ) -> Result<Vec<u8>, ResourceError> {
        let state = self.state.lock().unwrap();
        let buffer = state.buffers.get(&id.0).ok_or(ResourceError::NotFound)?;
        let start = offset as usize;
        let end = size.map(|s| start + s as usize).unwrap_or(buffer.len());
        if end > buffer.len() {
            return Err(ResourceError::OutOfBounds);
        }
        Ok(buffer[start..end].to_vec())
    }

    fn create_texture(&self, _descriptor: &TextureDescriptor) -> Result<TextureId, ResourceError> {
        let mut state = self.state.lock().unwrap();
        let id = state.fresh_id();
        state.textures.insert(id);
        Ok(TextureId(id))
    }

    fn destroy_texture(&self, id: TextureId) -> Result<(), ResourceError> {
        let mut state = self.state.lock().unwrap();
        state.destroy_log.push(format!("texture:{}", id.0));
        if !state.textures.remove(&id.0) {
            return Err(ResourceError::NotFound);
        }
        for set in state.uniform_sets.values_mut() {
            if set.2.contains(&id.0) {
                set.0 = false;
            }
        }
        Ok(())
    }

    fn write_texture(
        &self,
        texture_id: TextureId,
        _data: &[u8],
        _bytes_per_row: Option<u32>,
        _offset: Origin3D,
        _size: Extent3D,
    ) -> Result<(), ResourceError> {
        let state = self.state.lock().unwrap();
        if state.textures.contains(&texture_id.0) {
            Ok(())
        } else {
            Err(ResourceError::NotFound)
        }
    }

    fn create_sampler(&self, _descriptor: &SamplerDescriptor) -> Result<SamplerId, ResourceError> {
        let mut state = self.state.lock().unwrap();
        let id = state.fresh_id();
        state.alive_samplers.insert(id);
        Ok(SamplerId(id))
    }

    fn destroy_sampler(&self, id: SamplerId) -> Result<(), ResourceError> {
        let mut state = self.state.lock().unwrap();
        state.destroy_log.push(format!("sampler:{}", id.0));
        if state.alive_samplers.remove(&id.0) {
            Ok(())
        } else {
            Err(ResourceError::NotFound)
        }
    }

    fn create_uniform_set(
        &self,
        shader: ShaderModuleId,
        _set: u32,
        bindings: &[UniformBinding],
    ) -> Result<UniformSetId, ResourceError> {
        let mut state = self.state.lock().unwrap();
        if !state.alive_shaders.contains(&shader.0) {
            return Err(ResourceError::InvalidHandle);
        }
        let mut buffers = Vec::new();
        let mut textures = Vec::new();
        for binding in bindings {
            match binding.resource {
                UniformResource::Buffer(id) => {
                    if !state.buffers.contains_key(&id.0) {
                        return Err(ResourceError::InvalidHandle);
                    }
                    buffers.push(id.0);
                }
                UniformResource::Texture(id) => {
                    if !state.textures.contains(&id.0) {
                        return Err(ResourceError::InvalidHandle);
                    }
                    textures.push(id.0);
                }
                UniformResource::Sampler(id) => {
                    if !state.alive_samplers.contains(&id.0) {
                        return Err(ResourceError::InvalidHandle);
                    }
                }
            }
        }
        let id = state.fresh_id();
        state.uniform_sets.insert(id, (true, buffers, textures));
        Ok(UniformSetId(id))
    }

    fn destroy_uniform_set(&self, id: UniformSetId) -> Result<(), ResourceError> {
        let mut state = self.state.lock().unwrap();
        state.destroy_log.push(format!("uniform_set:{}", id.0));
        if state.uniform_sets.remove(&id.0).is_some() {
            Ok(())
        } else {
            Err(ResourceError::NotFound)
        }
    }

    fn is_uniform_set_valid(&self, id: UniformSetId) -> bool {
        self.state
            .lock()
            .unwrap()
            .uniform_sets
            .get(&id.0)
            .map(|set| set.0)
            .unwrap_or(false)
    }

    fn create_command_encoder(&self, _label: Option<&str>) -> Box<dyn CommandEncoder> {
        Box::new(MockEncoder {
            state: self.state.clone(),
        })
    }

    fn submit_command_buffer(&self, _command_buffer: CommandBufferId) {
        self.state.lock().unwrap().submits += 1;
    }

    fn wait_idle(&self) -> Result<(), ResourceError> {
        self.state.lock().unwrap().wait_idles += 1;
        Ok(())
    }

    fn get_device_info(&self) -> DeviceInfo {
        DeviceInfo {
            name: "MockDevice".to_string(),
            backend: "Mock".to_string(),
            device_type: "Cpu".to_string(),
        }
    }

    fn supports_feature(&self, feature_name: &str) -> bool {
        feature_name == "push_constants"
    }
}

fn wgsl(source: &str) -> ShaderModuleDescriptor<'_> {
    ShaderModuleDescriptor {
        label: Some("test_kernel"),
        source: ShaderSourceData::Wgsl(Cow::Borrowed(source)),
        entry_point: "main",
    }
}

const KERNEL: &str = "@compute @workgroup_size(4) fn main() {}";

#[test]
fn full_lifecycle_dispatches_one_group_per_full_workgroup() {
    let device = MockDevice::local();
    let shared: Arc<dyn ComputeDevice> = Arc::new(device.clone());

    let mut dispatcher = ComputeDispatcher::new(shared.clone());
    dispatcher
        .load_shader(&wgsl(KERNEL), WorkgroupSize::linear(4))
        .unwrap();

    let input = [1.0f32, 2.0, 3.0, 4.0];
    let buffer = buffer_io::create_storage_buffer(&*shared, Some("input"), &input).unwrap();

    dispatcher
        .put_binding(UniformBinding::storage_buffer(buffer, 0), 0)
        .unwrap();
    dispatcher.create_pipeline().unwrap();
    assert_eq!(dispatcher.state(), DispatcherState::PipelineCreated);

    dispatcher.dispatch_and_sync(4, 1, 1).unwrap();

    device.snapshot(|state| {
        assert_eq!(state.dispatches, vec![[1, 1, 1]]);
        assert_eq!(state.bound_sets.len(), 1);
        assert_eq!(state.bound_sets[0].len(), 1);
        assert_eq!(state.bound_sets[0][0].0, 0);
        assert_eq!(state.submits, 1);
        assert_eq!(state.wait_idles, 1);
    });

    // The readback path goes through the same device the data lives on.
    let back: Vec<f32> = buffer_io::read_storage_buffer(&*shared, buffer, 4).unwrap();
    assert_eq!(back, input);
}

#[test]
fn partial_workgroups_round_up_never_down() {
    let device = MockDevice::local();
    let shared: Arc<dyn ComputeDevice> = Arc::new(device.clone());

    let mut dispatcher = ComputeDispatcher::new(shared.clone());
    dispatcher
        .load_shader(&wgsl("@compute @workgroup_size(8, 8, 1) fn main() {}"), WorkgroupSize::new(8, 8, 1))
        .unwrap();
    dispatcher.create_pipeline().unwrap();

    // A 10x10 domain over 8x8 groups needs 2x2 groups.
    dispatcher.dispatch(10, 10, 1).unwrap();
    device.snapshot(|state| assert_eq!(state.dispatches, vec![[2, 2, 1]]));
}

#[test]
fn set_indices_must_ascend_from_zero() {
    let device = MockDevice::local();
    let shared: Arc<dyn ComputeDevice> = Arc::new(device.clone());

    let mut dispatcher = ComputeDispatcher::new(shared.clone());
    dispatcher
        .load_shader(&wgsl(KERNEL), WorkgroupSize::linear(4))
        .unwrap();

    let buffer = buffer_io::create_storage_buffer(&*shared, None, &[0.0f32; 4]).unwrap();

    // Starting from empty state, set 2 cannot be created before sets 0 and 1.
    let err = dispatcher
        .put_binding(UniformBinding::storage_buffer(buffer, 0), 2)
        .unwrap_err();
    match err {
        ComputeError::SetIndexOutOfOrder { set, expected } => {
            assert_eq!(set, 2);
            assert_eq!(expected, 0);
        }
        other => panic!("expected SetIndexOutOfOrder, got {other:?}"),
    }

    dispatcher
        .put_binding(UniformBinding::storage_buffer(buffer, 0), 0)
        .unwrap();
    let err = dispatcher
        .put_binding(UniformBinding::storage_buffer(buffer, 1), 2)
        .unwrap_err();
    match err {
        ComputeError::SetIndexOutOfOrder { set, expected } => {
            assert_eq!(set, 2);
            assert_eq!(expected, 1);
        }
        other => panic!("expected SetIndexOutOfOrder, got {other:?}"),
    }
}

#[test]
fn external_resource_swap_invalidates_then_rebuild_recovers() {
    let device = MockDevice::local();
    let shared: Arc<dyn ComputeDevice> = Arc::new(device.clone());

    let mut dispatcher = ComputeDispatcher::new(shared.clone());
    dispatcher
        .load_shader(&wgsl(KERNEL), WorkgroupSize::linear(4))
        .unwrap();

    let texture_a = buffer_io::create_compute_texture(
        &*shared,
        Some("surface"),
        64,
        64,
        ergon_core::compute::TextureFormat::Rgba8Unorm,
        ergon_core::compute::TextureUsage::COMPUTE_DEFAULT,
        false,
    )
    .unwrap();

    dispatcher
        .put_binding(UniformBinding::image(texture_a, 0), 0)
        .unwrap();
    dispatcher.create_pipeline().unwrap();
    assert!(dispatcher.is_set_valid(0));
    let original = dispatcher.uniform_sets().unwrap().realized(0).unwrap();

    // Simulate the host recreating the surface: destroying the texture the
    // set references flips the device's staleness flag.
    shared.destroy_texture(texture_a).unwrap();
    assert!(!dispatcher.is_set_valid(0));

    let err = dispatcher.dispatch(4, 1, 1).unwrap_err();
    assert!(matches!(err, ComputeError::StaleUniformSet { set: 0, .. }));

    // The rebuild cycle: invalidate, re-register with the fresh handle,
    // finalize the one affected set. The pipeline is not rebuilt.
    let texture_b = buffer_io::create_compute_texture(
        &*shared,
        Some("surface"),
        128,
        128,
        ergon_core::compute::TextureFormat::Rgba8Unorm,
        ergon_core::compute::TextureUsage::COMPUTE_DEFAULT,
        false,
    )
    .unwrap();

    dispatcher.invalidate_uniform_sets().unwrap();
    assert!(!dispatcher.is_set_valid(0));
    dispatcher
        .put_binding(UniformBinding::image(texture_b, 0), 0)
        .unwrap();
    dispatcher.finalize_set(0).unwrap();

    let rebuilt = dispatcher.uniform_sets().unwrap().realized(0).unwrap();
    assert_ne!(rebuilt, original);
    assert!(dispatcher.is_set_valid(0));

    dispatcher.dispatch(4, 1, 1).unwrap();
    device.snapshot(|state| assert_eq!(state.dispatches, vec![[1, 1, 1]]));
}

#[test]
fn dispose_releases_each_owned_handle_exactly_once() {
    let device = MockDevice::local();
    let shared: Arc<dyn ComputeDevice> = Arc::new(device.clone());

    let mut dispatcher = ComputeDispatcher::new(shared.clone());
    dispatcher
        .load_shader(&wgsl(KERNEL), WorkgroupSize::linear(4))
        .unwrap();
    let buffer = buffer_io::create_storage_buffer(&*shared, None, &[0.0f32; 4]).unwrap();
    dispatcher
        .put_binding(UniformBinding::storage_buffer(buffer, 0), 0)
        .unwrap();
    dispatcher.create_pipeline().unwrap();

    let shader = format!("shader:{}", 0);
    let set_id = dispatcher.uniform_sets().unwrap().realized(0).unwrap();

    dispatcher.dispose();
    device.snapshot(|state| {
        assert_eq!(state.destroy_count(&shader), 1);
        assert_eq!(state.destroy_count(&format!("uniform_set:{}", set_id.0)), 1);
        // Owned handles only: the borrowed storage buffer is untouched.
        assert_eq!(state.destroy_count(&format!("buffer:{}", buffer.0)), 0);
        // Dependents are released before the shader they reference.
        let shader_pos = state.destroy_log.iter().position(|e| *e == shader).unwrap();
        for (i, entry) in state.destroy_log.iter().enumerate() {
            if entry.starts_with("uniform_set:") || entry.starts_with("pipeline:") {
                assert!(i < shader_pos, "{entry} released after the shader");
            }
        }
    });

    // A second dispose must not double-free anything.
    dispatcher.dispose();
    device.snapshot(|state| {
        assert_eq!(state.destroy_count(&shader), 1);
        assert_eq!(state.destroy_count(&format!("uniform_set:{}", set_id.0)), 1);
    });

    let err = dispatcher.dispatch(4, 1, 1).unwrap_err();
    assert!(matches!(err, ComputeError::PipelineNotCreated));
}

#[test]
fn drop_tears_down_like_dispose() {
    let device = MockDevice::local();
    let shared: Arc<dyn ComputeDevice> = Arc::new(device.clone());

    {
        let mut dispatcher = ComputeDispatcher::new(shared.clone());
        dispatcher
            .load_shader(&wgsl(KERNEL), WorkgroupSize::linear(4))
            .unwrap();
        dispatcher.create_pipeline().unwrap();
    }

    device.snapshot(|state| {
        assert!(state.alive_shaders.is_empty());
        assert!(state.alive_pipelines.is_empty());
        assert_eq!(state.destroy_count("shader:0"), 1);
    });
}

#[test]
fn dispatch_requires_a_created_pipeline() {
    let device = MockDevice::local();
    let shared: Arc<dyn ComputeDevice> = Arc::new(device.clone());

    let mut dispatcher = ComputeDispatcher::new(shared.clone());
    assert_eq!(dispatcher.state(), DispatcherState::Uninitialized);
    assert!(matches!(
        dispatcher.dispatch(1, 1, 1),
        Err(ComputeError::PipelineNotCreated)
    ));

    dispatcher
        .load_shader(&wgsl(KERNEL), WorkgroupSize::linear(4))
        .unwrap();
    assert_eq!(dispatcher.state(), DispatcherState::ShaderLoaded);
    assert!(matches!(
        dispatcher.dispatch(1, 1, 1),
        Err(ComputeError::PipelineNotCreated)
    ));

    assert!(matches!(
        dispatcher.load_shader(&wgsl(KERNEL), WorkgroupSize::linear(4)),
        Err(ComputeError::ShaderAlreadyLoaded)
    ));

    dispatcher.create_pipeline().unwrap();
    assert!(matches!(
        dispatcher.create_pipeline(),
        Err(ComputeError::PipelineAlreadyCreated)
    ));
}

#[test]
fn shader_compile_failure_surfaces_immediately() {
    let device = MockDevice::local();
    let shared: Arc<dyn ComputeDevice> = Arc::new(device.clone());

    let mut dispatcher = ComputeDispatcher::new(shared);
    let err = dispatcher
        .load_shader(&wgsl("error"), WorkgroupSize::linear(1))
        .unwrap_err();
    assert!(matches!(
        err,
        ComputeError::Resource(ResourceError::Shader(_))
    ));
    assert_eq!(dispatcher.state(), DispatcherState::Uninitialized);
}

#[test]
fn push_constants_are_checked_and_uploaded() {
    let device = MockDevice::local();
    let shared: Arc<dyn ComputeDevice> = Arc::new(device.clone());

    let mut dispatcher = ComputeDispatcher::new(shared.clone());
    dispatcher
        .load_shader(&wgsl(KERNEL), WorkgroupSize::linear(4))
        .unwrap();

    // 12 bytes is not a push-constant granule.
    let err = dispatcher.set_push_constant(&[1.0f32, 2.0, 3.0]).unwrap_err();
    assert!(matches!(
        err,
        ComputeError::Marshal(MarshalError::PushConstantAlignment { size: 12 })
    ));

    dispatcher.set_push_constant(&[1u32, 2, 3, 4]).unwrap();
    dispatcher.create_pipeline().unwrap();
    dispatcher.dispatch(4, 1, 1).unwrap();

    device.snapshot(|state| {
        assert_eq!(state.push_constants.len(), 1);
        assert_eq!(state.push_constants[0].len(), 16);
    });

    // The declared range is fixed once the pipeline exists.
    let err = dispatcher
        .set_push_constant(&[1u32, 2, 3, 4, 5, 6, 7, 8])
        .unwrap_err();
    assert!(matches!(
        err,
        ComputeError::Marshal(MarshalError::PushConstantSizeChanged {
            declared: 16,
            actual: 32
        })
    ));
}

#[test]
fn registry_releases_in_reverse_creation_order() {
    let device = MockDevice::local();
    let shared: Arc<dyn ComputeDevice> = Arc::new(device.clone());

    let buffer = shared
        .create_buffer(&BufferDescriptor {
            label: None,
            size: 16,
            usage: ergon_core::compute::BufferUsage::STORAGE_RW,
            mapped_at_creation: false,
        })
        .unwrap();
    let sampler = shared
        .create_sampler(&SamplerDescriptor {
            label: None,
            address_mode: ergon_core::compute::AddressMode::ClampToEdge,
            mag_filter: ergon_core::compute::FilterMode::Nearest,
            min_filter: ergon_core::compute::FilterMode::Nearest,
        })
        .unwrap();

    let mut registry = ResourceRegistry::new(shared.clone());
    registry.track(TrackedResource::Buffer(buffer));
    registry.track(TrackedResource::Sampler(sampler));
    assert_eq!(registry.len(), 2);

    registry.release_all();
    assert!(registry.is_empty());

    device.snapshot(|state| {
        assert_eq!(
            state.destroy_log,
            vec![format!("sampler:{}", sampler.0), format!("buffer:{}", buffer.0)]
        );
    });
}

#[test]
fn struct_array_round_trip_through_the_device() {
    use bytemuck::{Pod, Zeroable};

    #[repr(C)]
    #[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
    struct Body {
        position: [f32; 4],
        velocity: [f32; 4],
    }

    let device = MockDevice::local();
    let shared: Arc<dyn ComputeDevice> = Arc::new(device);

    let bodies = [
        Body {
            position: [1.0, 2.0, 3.0, 0.0],
            velocity: [0.5, 0.5, 0.5, 0.0],
        },
        Body {
            position: [9.0, 8.0, 7.0, 0.0],
            velocity: [0.0, -1.0, 0.0, 0.0],
        },
    ];

    let buffer = buffer_io::create_struct_array_buffer(
        &*shared,
        Some("bodies"),
        &bodies,
        std::mem::size_of::<Body>(),
    )
    .unwrap();

    let back: Vec<Body> = buffer_io::read_struct_array_buffer(&*shared, buffer).unwrap();
    assert_eq!(back, bodies);

    // An undersized declared stride is rejected before any device call.
    let err = buffer_io::create_struct_array_buffer(&*shared, None, &bodies, 16).unwrap_err();
    assert!(matches!(
        err,
        ComputeError::Marshal(MarshalError::StrideMismatch { declared: 16, .. })
    ));
}
