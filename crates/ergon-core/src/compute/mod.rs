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

//! Provides the public, backend-agnostic compute contracts for Ergon.
//!
//! This module defines the "common language" for all compute-dispatch
//! operations. It contains the abstract `traits` (like [`ComputeDevice`]),
//! data structures (like [`BufferDescriptor`]), the error hierarchy, and the
//! resource lifecycle layer built on top of them (`dispatch`).
//!
//! The module defines the 'what' of compute dispatch, while the 'how' is
//! handled by a concrete backend implementation in the `ergon-infra` crate
//! (e.g., a WGPU backend) which implements these traits. Consumers drive
//! their compute work through [`dispatch::ComputeDispatcher`] without needing
//! to know the specifics of the underlying graphics API.

pub mod api;
pub mod dispatch;
pub mod error;
pub mod traits;

// Re-export the most important traits and types for easier use.
pub use self::api::*;
pub use self::dispatch::{
    ComputeDispatcher, DispatcherState, ResourceRegistry, TrackedResource, UniformSetBuilder,
};
pub use self::error::{ComputeError, MarshalError, PipelineError, ResourceError, ShaderError};
pub use self::traits::{CommandEncoder, ComputeDevice, ComputePass};
