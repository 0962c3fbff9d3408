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

use anyhow::anyhow;
use anyhow::Result;
use ergon_core::compute::DeviceKind;
use wgpu::{Adapter, Features, Instance};

/// Holds the core WGPU state objects required for compute work.
///
/// A context created with [`WgpuComputeContext::new_local`] is headless and
/// isolated: no surface, no presentation, nothing else submitting to its
/// queue. That is what makes synchronous submit-and-wait readback safe on
/// it. A context wrapping a device owned by a host frame loop should be
/// constructed with [`DeviceKind::Shared`] instead, which disables the
/// blocking paths.
#[derive(Debug)]
pub struct WgpuComputeContext {
    #[allow(dead_code)]
    pub(crate) adapter: wgpu::Adapter,
    pub(crate) device: wgpu::Device,
    pub(crate) queue: wgpu::Queue,
    pub(crate) kind: DeviceKind,

    // Store info for easy access
    pub(crate) adapter_name: String,
    pub(crate) adapter_backend: wgpu::Backend,
    pub(crate) adapter_device_type: wgpu::DeviceType,
    pub(crate) active_device_features: wgpu::Features,
    #[allow(dead_code)]
    pub(crate) device_limits: wgpu::Limits,
}

impl WgpuComputeContext {
    /// Asynchronously initializes a compute context on a pre-selected
    /// adapter.
    ///
    /// ## Arguments
    /// * `adapter` - The pre-selected `wgpu::Adapter` to use.
    /// * `kind` - How the resulting device relates to the host frame loop.
    ///
    /// ## Returns
    /// * `Result<Self>` - The initialized context or an error.
    pub async fn new(adapter: Adapter, kind: DeviceKind) -> Result<Self> {
        let adapter_info = adapter.get_info();
        log::info!(
            "Using graphics adapter: \"{}\" (Backend: {:?})",
            adapter_info.name,
            adapter_info.backend
        );

        // Push constants are optional hardware; enable them (and a usable
        // range) only when the adapter offers the feature.
        let wanted_features: Features = Features::PUSH_CONSTANTS;
        let features_to_enable: Features = adapter.features() & wanted_features;

        let mut required_limits = wgpu::Limits::default();
        if features_to_enable.contains(Features::PUSH_CONSTANTS) {
            required_limits.max_push_constant_size =
                adapter.limits().max_push_constant_size.min(128);
        }

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Ergon Compute Device"),
                required_features: features_to_enable,
                required_limits,
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::default(),
            })
            .await
            .map_err(|e| anyhow!("Failed to create logical device: {}", e))?;
        log::info!("Logical device and command queue created.");

        device.on_uncaptured_error(Box::new(|e| {
            log::error!("WGPU Uncaptured Error: {e:?}");
        }));

        let active_device_features = device.features();
        let device_limits = device.limits();
        log::debug!("Active device features: {active_device_features:?}");

        Ok(Self {
            adapter_name: adapter_info.name.clone(),
            adapter_backend: adapter_info.backend,
            adapter_device_type: adapter_info.device_type,
            adapter,
            device,
            queue,
            kind,
            active_device_features,
            device_limits,
        })
    }

    /// Creates an isolated, headless local context: its own instance,
    /// adapter and device, suitable for synchronous compute with immediate
    /// readback. Blocks on the async WGPU initialization.
    ///
    /// ## Errors
    /// Fails when no suitable adapter exists on the machine.
    pub fn new_local() -> Result<Self> {
        let instance = Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| anyhow!("Failed to find a suitable compute adapter: {}", e))?;

        pollster::block_on(Self::new(adapter, DeviceKind::Local))
    }

    /// The classification this context was created with.
    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    /// Whether the logical device was created with push-constant support.
    pub fn supports_push_constants(&self) -> bool {
        self.active_device_features
            .contains(Features::PUSH_CONSTANTS)
    }
}
