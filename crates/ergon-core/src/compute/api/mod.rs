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

//! Backend-agnostic compute API.
//!
//! Organized into several logical sub-modules:
//!
//! - **[`common`]**: Shared dimension and device-kind types.
//! - **[`buffer`]** / **[`texture`]**: GPU handles and their descriptors.
//! - **[`shader`]** / **[`pipeline`]**: Shader modules and compute pipelines.
//! - **[`uniform`]**: Resource bindings and uniform-set handles.
//! - **[`command`]**: Command buffer handles and pass descriptors.

pub mod buffer;
pub mod command;
pub mod common;
pub mod pipeline;
pub mod shader;
pub mod texture;
pub mod uniform;

pub use buffer::{BufferDescriptor, BufferId, BufferUsage};
pub use command::{CommandBufferId, ComputePassDescriptor};
pub use common::{DeviceInfo, DeviceKind, Extent3D, Origin3D};
pub use pipeline::{ComputePipelineDescriptor, ComputePipelineId, WorkgroupSize};
pub use shader::{ShaderModuleDescriptor, ShaderModuleId, ShaderSourceData};
pub use texture::{
    AddressMode, FilterMode, SamplerDescriptor, SamplerId, TextureDescriptor, TextureDimension,
    TextureFormat, TextureId, TextureUsage,
};
pub use uniform::{UniformBinding, UniformKind, UniformResource, UniformSetId};
