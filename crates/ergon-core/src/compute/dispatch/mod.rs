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

//! The compute resource lifecycle layer.
//!
//! This is the part of the library with real lifecycle and correctness
//! concerns: it owns GPU resource handles, manages their creation,
//! invalidation and recreation across frames, and drives compute dispatch
//! with push constants. It is organized leaves-first:
//!
//! - **[`marshal`]**: fixed-layout values and arrays to/from raw bytes.
//! - **[`registry`]**: tracks every owned handle for deterministic,
//!   reverse-order release.
//! - **[`uniform`]**: accumulates bindings per set index and materializes
//!   them into device-side uniform sets.
//! - **[`driver`]**: the dispatcher owning shader, pipeline, workgroup size
//!   and push constants, issuing sized compute passes.
//! - **[`buffer_io`]**: storage-buffer and storage-texture helpers for
//!   structured host arrays.

pub mod buffer_io;
pub mod driver;
pub mod marshal;
pub mod registry;
pub mod uniform;

pub use driver::{ComputeDispatcher, DispatcherState};
pub use registry::{ResourceRegistry, TrackedResource};
pub use uniform::UniformSetBuilder;
