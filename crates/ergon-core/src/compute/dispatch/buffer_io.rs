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

//! Helpers that create, update and read back GPU-visible storage buffers
//! (and storage textures) mirroring structured host arrays.
//!
//! Resources created here are *consumer-owned*: they are meant to be
//! referenced by uniform bindings, and the dispatcher never frees handles
//! it merely borrows. Track them in your own [`ResourceRegistry`] or
//! destroy them directly on the device.

use crate::compute::api::{
    BufferDescriptor, BufferId, BufferUsage, Extent3D, Origin3D, TextureDescriptor,
    TextureDimension, TextureFormat, TextureId, TextureUsage,
};
use crate::compute::dispatch::marshal;
use crate::compute::error::{ComputeError, ResourceError};
use crate::compute::traits::ComputeDevice;
use bytemuck::Pod;
use std::borrow::Cow;

/// Creates a storage buffer initialized from a tightly packed slice.
pub fn create_storage_buffer<T: Pod>(
    device: &dyn ComputeDevice,
    label: Option<&str>,
    data: &[T],
) -> Result<BufferId, ResourceError> {
    let bytes = bytemuck::cast_slice(data);
    device.create_buffer_with_data(
        &BufferDescriptor {
            label: label.map(Cow::Borrowed),
            size: bytes.len() as u64,
            usage: BufferUsage::STORAGE_RW,
            mapped_at_creation: false,
        },
        bytes,
    )
}

/// Creates a storage buffer from a slice of fixed-layout elements written
/// at the caller-declared stride (see [`marshal::array_to_bytes`] for the
/// stride rules).
pub fn create_struct_array_buffer<T: Pod>(
    device: &dyn ComputeDevice,
    label: Option<&str>,
    data: &[T],
    element_size: usize,
) -> Result<BufferId, ComputeError> {
    let bytes = marshal::array_to_bytes(data, element_size)?;
    let id = device.create_buffer_with_data(
        &BufferDescriptor {
            label: label.map(Cow::Borrowed),
            size: bytes.len() as u64,
            usage: BufferUsage::STORAGE_RW,
            mapped_at_creation: false,
        },
        &bytes,
    )?;
    Ok(id)
}

/// Overwrites the first `data.len()` strided slots of an existing storage
/// buffer in place.
pub fn update_struct_array_buffer<T: Pod>(
    device: &dyn ComputeDevice,
    buffer: BufferId,
    data: &[T],
    element_size: usize,
) -> Result<(), ComputeError> {
    let bytes = marshal::array_to_bytes(data, element_size)?;
    device.write_buffer(buffer, 0, &bytes)?;
    Ok(())
}

/// Reads `count` tightly packed elements back from a storage buffer.
///
/// The read blocks until the GPU has produced the data; synchronize
/// preceding compute work first (e.g. `dispatch_and_sync` on a local
/// device).
pub fn read_storage_buffer<T: Pod>(
    device: &dyn ComputeDevice,
    buffer: BufferId,
    count: usize,
) -> Result<Vec<T>, ComputeError> {
    let byte_len = (count * std::mem::size_of::<T>()) as u64;
    let bytes = device.read_buffer(buffer, 0, Some(byte_len))?;
    let values = marshal::bytes_to_vec(&bytes)?;
    Ok(values)
}

/// Reads the entire contents of a storage buffer back as fixed-layout
/// elements. The buffer size must be an exact multiple of the element
/// size.
pub fn read_struct_array_buffer<T: Pod>(
    device: &dyn ComputeDevice,
    buffer: BufferId,
) -> Result<Vec<T>, ComputeError> {
    let bytes = device.read_buffer(buffer, 0, None)?;
    let values = marshal::bytes_to_vec(&bytes)?;
    Ok(values)
}

/// Creates a 2D texture ready to be bound as a storage image by a compute
/// shader, optionally cleared to zero before first use.
///
/// Pick the usage preset by where the texture's contents end up:
/// [`TextureUsage::SHARED_DEFAULT`] when the host renderer samples it,
/// [`TextureUsage::COMPUTE_DEFAULT`] for a compute-only working texture.
pub fn create_compute_texture(
    device: &dyn ComputeDevice,
    label: Option<&str>,
    width: u32,
    height: u32,
    format: TextureFormat,
    usage: TextureUsage,
    clear: bool,
) -> Result<TextureId, ResourceError> {
    let size = Extent3D::new_2d(width, height);
    let id = device.create_texture(&TextureDescriptor {
        label: label.map(Cow::Borrowed),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D2,
        format,
        usage,
    })?;

    if clear {
        let zeroes =
            vec![0u8; (width as usize) * (height as usize) * format.bytes_per_pixel() as usize];
        device.write_texture(id, &zeroes, None, Origin3D::default(), size)?;
    }

    Ok(id)
}
