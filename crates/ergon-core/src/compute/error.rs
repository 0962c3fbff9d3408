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

//! Defines the hierarchy of error types for the compute subsystem.

use crate::compute::api::pipeline::ComputePipelineId;
use crate::compute::api::shader::ShaderModuleId;
use crate::compute::api::uniform::UniformSetId;
use std::fmt;

/// An error related to the creation, loading, or compilation of a shader module.
#[derive(Debug)]
pub enum ShaderError {
    /// The shader source failed to compile into a backend-specific module.
    CompilationError {
        /// A descriptive label for the shader, if available.
        label: String,
        /// Detailed error messages from the shader compiler.
        details: String,
    },
    /// The requested shader module could not be found.
    NotFound {
        /// The ID of the shader module that was not found.
        id: ShaderModuleId,
    },
    /// The specified entry point is not valid for the shader module.
    InvalidEntryPoint {
        /// The ID of the shader module.
        id: ShaderModuleId,
        /// The entry point name that was not found.
        entry_point: String,
    },
}

impl fmt::Display for ShaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderError::CompilationError { label, details } => {
                write!(f, "Shader compilation failed for '{label}': {details}")
            }
            ShaderError::NotFound { id } => {
                write!(f, "Shader module not found for ID: {id:?}")
            }
            ShaderError::InvalidEntryPoint { id, entry_point } => {
                write!(
                    f,
                    "Invalid entry point '{entry_point}' for shader module {id:?}"
                )
            }
        }
    }
}

impl std::error::Error for ShaderError {}

/// An error related to the creation or management of a compute pipeline.
#[derive(Debug)]
pub enum PipelineError {
    /// The graphics backend failed to compile the pipeline state object.
    CompilationFailed {
        /// A descriptive label for the pipeline, if available.
        label: Option<String>,
        /// Detailed error messages from the backend.
        details: String,
    },
    /// A shader module provided for the pipeline was invalid or missing.
    InvalidShaderModuleForPipeline {
        /// The ID of the invalid shader module.
        id: ShaderModuleId,
        /// The label of the pipeline being created.
        pipeline_label: Option<String>,
    },
    /// The specified compute pipeline ID is not valid.
    InvalidComputePipeline {
        /// The ID of the invalid compute pipeline.
        id: ComputePipelineId,
    },
    /// A required device feature is not supported.
    FeatureNotSupported(String),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::CompilationFailed { label, details } => {
                write!(
                    f,
                    "Pipeline compilation failed for '{}': {}",
                    label.as_deref().unwrap_or("Unknown"),
                    details
                )
            }
            PipelineError::InvalidShaderModuleForPipeline { id, pipeline_label } => {
                write!(
                    f,
                    "Invalid shader module {:?} for pipeline '{}'",
                    id,
                    pipeline_label.as_deref().unwrap_or("Unknown")
                )
            }
            PipelineError::InvalidComputePipeline { id } => {
                write!(f, "Invalid compute pipeline ID: {id:?}")
            }
            PipelineError::FeatureNotSupported(msg) => {
                write!(f, "Feature not supported: {msg}")
            }
        }
    }
}

impl std::error::Error for PipelineError {}

/// An error produced when converting structured values to or from raw bytes.
///
/// The original byte-level plumbing this layer models silently truncated or
/// misaligned on mismatched layouts; here every mismatch is a checked,
/// reported error.
#[derive(Debug, PartialEq, Eq)]
pub enum MarshalError {
    /// The caller-declared element stride is smaller than the element's
    /// actual in-memory size, which would truncate on write.
    StrideMismatch {
        /// The declared per-element stride in bytes.
        declared: usize,
        /// The element's actual size in bytes.
        actual: usize,
    },
    /// A raw buffer's length is not an exact multiple of the element size.
    LengthNotMultiple {
        /// The buffer length in bytes.
        len: usize,
        /// The element size in bytes.
        element_size: usize,
    },
    /// A push-constant blob is empty or not a multiple of 16 bytes, the
    /// hardware alignment granularity for push-constant uploads.
    PushConstantAlignment {
        /// The offending blob size in bytes.
        size: usize,
    },
    /// The push-constant blob size changed after the pipeline declared its
    /// push-constant range.
    PushConstantSizeChanged {
        /// The size declared at pipeline creation.
        declared: u32,
        /// The size of the newly supplied blob.
        actual: u32,
    },
}

impl fmt::Display for MarshalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarshalError::StrideMismatch { declared, actual } => {
                write!(
                    f,
                    "Declared element stride {declared} is smaller than the element size {actual}"
                )
            }
            MarshalError::LengthNotMultiple { len, element_size } => {
                write!(
                    f,
                    "Buffer length {len} is not a multiple of the element size {element_size}"
                )
            }
            MarshalError::PushConstantAlignment { size } => {
                write!(
                    f,
                    "Push constant size {size} is not a non-zero multiple of 16 bytes"
                )
            }
            MarshalError::PushConstantSizeChanged { declared, actual } => {
                write!(
                    f,
                    "Push constant size changed from the declared {declared} bytes to {actual} bytes"
                )
            }
        }
    }
}

impl std::error::Error for MarshalError {}

/// An error related to the creation or use of a GPU resource (buffers, textures, etc.).
#[derive(Debug)]
pub enum ResourceError {
    /// A shader-specific error occurred.
    Shader(ShaderError),
    /// A pipeline-specific error occurred.
    Pipeline(PipelineError),
    /// A generic resource could not be found.
    NotFound,
    /// The handle or ID used to reference a resource is invalid.
    InvalidHandle,
    /// An error originating from the specific graphics backend implementation.
    BackendError(String),
    /// An attempt was made to access a resource out of its bounds (e.g., in a buffer).
    OutOfBounds,
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::Shader(err) => write!(f, "Shader resource error: {err}"),
            ResourceError::Pipeline(err) => write!(f, "Pipeline resource error: {err}"),
            ResourceError::NotFound => write!(f, "Resource not found with ID."),
            ResourceError::InvalidHandle => write!(f, "Invalid resource handle or ID."),
            ResourceError::BackendError(msg) => {
                write!(f, "Backend-specific resource error: {msg}")
            }
            ResourceError::OutOfBounds => {
                write!(f, "Resource access out of bounds.")
            }
        }
    }
}

impl std::error::Error for ResourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResourceError::Shader(err) => Some(err),
            ResourceError::Pipeline(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ShaderError> for ResourceError {
    fn from(err: ShaderError) -> Self {
        ResourceError::Shader(err)
    }
}

impl From<PipelineError> for ResourceError {
    fn from(err: PipelineError) -> Self {
        ResourceError::Pipeline(err)
    }
}

/// A high-level error that can occur while driving a compute dispatcher.
#[derive(Debug)]
pub enum ComputeError {
    /// An operation required a loaded shader module, but none was loaded.
    ShaderNotLoaded,
    /// A shader module was already loaded; a dispatcher compiles exactly one.
    ShaderAlreadyLoaded,
    /// An operation required a created pipeline, but `create_pipeline` was
    /// never called (or teardown already ran).
    PipelineNotCreated,
    /// `create_pipeline` was called twice on the same dispatcher.
    PipelineAlreadyCreated,
    /// The pipeline handle was no longer valid at dispatch time.
    StalePipeline(ComputePipelineId),
    /// A uniform set was no longer valid at dispatch time. The consumer is
    /// expected to run the invalidate/rebuild cycle before dispatching again.
    StaleUniformSet {
        /// The set index that failed the validity check.
        set: u32,
        /// The stale handle.
        id: UniformSetId,
    },
    /// A uniform set was still pending (never finalized) at dispatch time.
    UniformSetNotRealized {
        /// The pending set index.
        set: u32,
    },
    /// A binding was registered for a set index out of ascending order.
    SetIndexOutOfOrder {
        /// The requested set index.
        set: u32,
        /// The only index currently allowed for a new set.
        expected: u32,
    },
    /// An error occurred while managing a GPU resource.
    Resource(ResourceError),
    /// A byte-marshalling error occurred.
    Marshal(MarshalError),
}

impl fmt::Display for ComputeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComputeError::ShaderNotLoaded => {
                write!(f, "No shader module has been loaded.")
            }
            ComputeError::ShaderAlreadyLoaded => {
                write!(f, "A shader module has already been loaded.")
            }
            ComputeError::PipelineNotCreated => {
                write!(f, "The compute pipeline has not been created.")
            }
            ComputeError::PipelineAlreadyCreated => {
                write!(f, "The compute pipeline has already been created.")
            }
            ComputeError::StalePipeline(id) => {
                write!(f, "Compute pipeline {id:?} is no longer valid.")
            }
            ComputeError::StaleUniformSet { set, id } => {
                write!(
                    f,
                    "Uniform set {set} ({id:?}) is stale; rebuild it before dispatching."
                )
            }
            ComputeError::UniformSetNotRealized { set } => {
                write!(f, "Uniform set {set} has not been finalized.")
            }
            ComputeError::SetIndexOutOfOrder { set, expected } => {
                write!(
                    f,
                    "Uniform set {set} registered out of order; the next new set must be {expected}."
                )
            }
            ComputeError::Resource(err) => {
                write!(f, "Compute resource operation failed: {err}")
            }
            ComputeError::Marshal(err) => {
                write!(f, "Byte marshalling failed: {err}")
            }
        }
    }
}

impl std::error::Error for ComputeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ComputeError::Resource(err) => Some(err),
            ComputeError::Marshal(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ResourceError> for ComputeError {
    fn from(err: ResourceError) -> Self {
        ComputeError::Resource(err)
    }
}

impl From<MarshalError> for ComputeError {
    fn from(err: MarshalError) -> Self {
        ComputeError::Marshal(err)
    }
}

impl From<ShaderError> for ComputeError {
    fn from(err: ShaderError) -> Self {
        ComputeError::Resource(ResourceError::Shader(err))
    }
}

impl From<PipelineError> for ComputeError {
    fn from(err: PipelineError) -> Self {
        ComputeError::Resource(ResourceError::Pipeline(err))
    }
}
