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

// Ergon Sandbox
// Main binary for testing and demos: drives the compute lifecycle layer
// end to end on an isolated local device.

use std::borrow::Cow;
use std::sync::Arc;

use anyhow::{Context, Result};
use ergon_core::compute::dispatch::buffer_io;
use ergon_core::compute::{
    BufferDescriptor, BufferUsage, ComputeDevice, ComputeDispatcher, ShaderModuleDescriptor,
    ShaderSourceData, UniformBinding, WorkgroupSize,
};
use ergon_core::Stopwatch;
use ergon_infra::{WgpuComputeContext, WgpuComputeDevice};

const DOUBLE_KERNEL: &str = r#"
@group(0) @binding(0) var<storage, read_write> data: array<f32>;

@compute @workgroup_size(4)
fn main(@builtin(global_invocation_id) gid: vec3<u32>) {
    let i = gid.x;
    if (i < arrayLength(&data)) {
        data[i] = data[i] * 2.0;
    }
}
"#;

const INTEGRATE_KERNEL: &str = r#"
struct Particle {
    position: vec4<f32>,
    velocity: vec4<f32>,
}

struct SimParams {
    dt: f32,
    count: u32,
    _pad0: u32,
    _pad1: u32,
}

@group(0) @binding(0) var<storage, read_write> particles: array<Particle>;
@group(0) @binding(1) var<uniform> params: SimParams;

@compute @workgroup_size(64)
fn main(@builtin(global_invocation_id) gid: vec3<u32>) {
    if (gid.x >= params.count) {
        return;
    }
    var p = particles[gid.x];
    p.position = p.position + p.velocity * params.dt;
    particles[gid.x] = p;
}
"#;

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Particle {
    position: [f32; 4],
    velocity: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct SimParams {
    dt: f32,
    count: u32,
    _pad: [u32; 2],
}

fn main() -> Result<()> {
    env_logger::init();

    let context = WgpuComputeContext::new_local()
        .context("the sandbox needs a usable GPU adapter for its local device")?;
    let device = WgpuComputeDevice::new(context);
    let shared: Arc<dyn ComputeDevice> = Arc::new(device);

    let info = shared.get_device_info();
    println!("Running on {} ({})", info.name, info.backend);

    run_double_values(&shared)?;
    run_particle_integration(&shared)?;

    Ok(())
}

/// The smallest possible round trip: one storage buffer, one dispatch, one
/// readback.
fn run_double_values(device: &Arc<dyn ComputeDevice>) -> Result<()> {
    let mut dispatcher = ComputeDispatcher::new(device.clone());
    dispatcher.load_shader(
        &ShaderModuleDescriptor {
            label: Some("double_values"),
            source: ShaderSourceData::Wgsl(Cow::Borrowed(DOUBLE_KERNEL)),
            entry_point: "main",
        },
        WorkgroupSize::linear(4),
    )?;

    let input = [1.0f32, 2.0, 3.0, 4.0];
    let buffer = buffer_io::create_storage_buffer(&**device, Some("values"), &input)?;

    dispatcher.put_binding(UniformBinding::storage_buffer(buffer, 0), 0)?;
    dispatcher.create_pipeline()?;

    let watch = Stopwatch::new();
    dispatcher.dispatch_and_sync(input.len() as u32, 1, 1)?;
    let output: Vec<f32> = buffer_io::read_storage_buffer(&**device, buffer, input.len())?;
    println!(
        "double_values: {input:?} -> {output:?} ({:.3} ms)",
        watch.elapsed_ms()
    );

    dispatcher.dispose();
    device.destroy_buffer(buffer)?;
    Ok(())
}

/// A struct-array workload in the shape of the bigger demos: a particle
/// buffer integrated over several steps, with per-step parameters in a
/// uniform buffer.
fn run_particle_integration(device: &Arc<dyn ComputeDevice>) -> Result<()> {
    const COUNT: usize = 256;
    const STEPS: u32 = 10;
    const DT: f32 = 1.0 / 60.0;

    let particles: Vec<Particle> = (0..COUNT)
        .map(|i| {
            let f = i as f32;
            Particle {
                position: [f, f * 0.5, -f, 1.0],
                velocity: [1.0, 2.0, 3.0, 0.0],
            }
        })
        .collect();

    let mut dispatcher = ComputeDispatcher::new(device.clone());
    dispatcher.load_shader(
        &ShaderModuleDescriptor {
            label: Some("integrate_particles"),
            source: ShaderSourceData::Wgsl(Cow::Borrowed(INTEGRATE_KERNEL)),
            entry_point: "main",
        },
        WorkgroupSize::linear(64),
    )?;

    let particle_buffer = buffer_io::create_struct_array_buffer(
        &**device,
        Some("particles"),
        &particles,
        std::mem::size_of::<Particle>(),
    )?;

    let params = SimParams {
        dt: DT,
        count: COUNT as u32,
        _pad: [0; 2],
    };
    let params_buffer = device.create_buffer_with_data(
        &BufferDescriptor {
            label: Some(Cow::Borrowed("sim_params")),
            size: std::mem::size_of::<SimParams>() as u64,
            usage: BufferUsage::UNIFORM | BufferUsage::COPY_DST,
            mapped_at_creation: false,
        },
        bytemuck::bytes_of(&params),
    )?;

    dispatcher.put_binding(UniformBinding::storage_buffer(particle_buffer, 0), 0)?;
    dispatcher.put_binding(UniformBinding::uniform_buffer(params_buffer, 1), 0)?;
    dispatcher.create_pipeline()?;

    let watch = Stopwatch::new();
    for _ in 0..STEPS {
        dispatcher.dispatch_and_sync(COUNT as u32, 1, 1)?;
    }
    let integrated: Vec<Particle> =
        buffer_io::read_struct_array_buffer(&**device, particle_buffer)?;
    println!(
        "integrate_particles: {STEPS} steps over {COUNT} particles ({:.3} ms)",
        watch.elapsed_ms()
    );
    for (i, particle) in integrated.iter().take(3).enumerate() {
        println!("  particle[{i}]: {:?}", particle.position);
    }

    let expected_x = 0.0 + 1.0 * DT * STEPS as f32;
    log::debug!(
        "expected particle[0].x after {STEPS} steps: {expected_x} (got {})",
        integrated[0].position[0]
    );

    dispatcher.dispose();
    device.destroy_buffer(particle_buffer)?;
    device.destroy_buffer(params_buffer)?;
    Ok(())
}
