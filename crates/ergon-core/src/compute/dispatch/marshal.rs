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

//! Converts fixed-layout values and arrays thereof to and from raw byte
//! buffers for GPU upload and readback.
//!
//! All functions are pure transforms over [`bytemuck::Pod`] types, which is
//! what makes a layout "fixed": `#[repr(C)]`, no padding the shader does not
//! also see, no pointers. Every size or stride mismatch is a checked
//! [`MarshalError`]; nothing here truncates or misaligns silently.

use crate::compute::error::MarshalError;
use bytemuck::Pod;

/// The hardware alignment granularity for push-constant uploads, in bytes.
pub const PUSH_CONSTANT_ALIGNMENT: usize = 16;

/// Borrows the exact in-memory byte representation of a fixed-layout value.
pub fn bytes_of<T: Pod>(value: &T) -> &[u8] {
    bytemuck::bytes_of(value)
}

/// Serializes a slice of fixed-layout elements into `element_size`-strided
/// slots.
///
/// `element_size` is the stride the *shader* expects. It may exceed
/// `size_of::<T>()`, in which case the trailing bytes of each slot are
/// zeroed (std140-style padding); a stride smaller than the element is a
/// [`MarshalError::StrideMismatch`], never a truncated write.
pub fn array_to_bytes<T: Pod>(values: &[T], element_size: usize) -> Result<Vec<u8>, MarshalError> {
    let actual = std::mem::size_of::<T>();
    if element_size < actual {
        return Err(MarshalError::StrideMismatch {
            declared: element_size,
            actual,
        });
    }

    let mut bytes = vec![0u8; values.len() * element_size];
    for (i, value) in values.iter().enumerate() {
        let slot = &mut bytes[i * element_size..i * element_size + actual];
        slot.copy_from_slice(bytemuck::bytes_of(value));
    }
    Ok(bytes)
}

/// Reinterprets a raw byte buffer as a vector of fixed-layout elements.
///
/// The buffer length must be an exact multiple of `size_of::<T>()`;
/// anything else is a [`MarshalError::LengthNotMultiple`].
pub fn bytes_to_vec<T: Pod>(bytes: &[u8]) -> Result<Vec<T>, MarshalError> {
    let element_size = std::mem::size_of::<T>();
    if element_size == 0 || bytes.len() % element_size != 0 {
        return Err(MarshalError::LengthNotMultiple {
            len: bytes.len(),
            element_size,
        });
    }

    // try_cast_slice also rejects misaligned input, which can happen for
    // readback buffers handed to us by a backend; fall back to a copy
    // through an aligned allocation in that case.
    match bytemuck::try_cast_slice::<u8, T>(bytes) {
        Ok(slice) => Ok(slice.to_vec()),
        Err(_) => {
            let mut out = vec![T::zeroed(); bytes.len() / element_size];
            bytemuck::cast_slice_mut::<T, u8>(&mut out).copy_from_slice(bytes);
            Ok(out)
        }
    }
}

/// Derives a push-constant blob from a fixed-layout value.
///
/// Push constants are uploaded in 16-byte granules; a value whose size is
/// zero or not a multiple of [`PUSH_CONSTANT_ALIGNMENT`] would be undefined
/// behavior at the device level, so it is rejected here instead.
pub fn push_constant_bytes<T: Pod>(value: &T) -> Result<Vec<u8>, MarshalError> {
    let size = std::mem::size_of::<T>();
    if size == 0 || size % PUSH_CONSTANT_ALIGNMENT != 0 {
        return Err(MarshalError::PushConstantAlignment { size });
    }
    Ok(bytemuck::bytes_of(value).to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytemuck::{Pod, Zeroable};

    #[repr(C)]
    #[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
    struct Body {
        position: [f32; 4],
        velocity: [f32; 4],
    }

    #[test]
    fn round_trip_preserves_elements_in_order() {
        let bodies = [
            Body {
                position: [1.0, 2.0, 3.0, 0.0],
                velocity: [0.1, 0.2, 0.3, 0.0],
            },
            Body {
                position: [-4.0, 5.0, -6.0, 0.0],
                velocity: [0.0, 0.0, 0.0, 1.0],
            },
        ];

        let bytes = array_to_bytes(&bodies, std::mem::size_of::<Body>()).unwrap();
        assert_eq!(bytes.len(), 2 * std::mem::size_of::<Body>());

        let back: Vec<Body> = bytes_to_vec(&bytes).unwrap();
        assert_eq!(back, bodies);
    }

    #[test]
    fn array_to_bytes_produces_exactly_count_times_stride() {
        let values = [1.0f32, 2.0, 3.0, 4.0, 5.0];
        let bytes = array_to_bytes(&values, 4).unwrap();
        assert_eq!(bytes.len(), 5 * 4);
    }

    #[test]
    fn padded_stride_zeroes_the_tail_of_each_slot() {
        let values = [0xAABBCCDDu32];
        let bytes = array_to_bytes(&values, 16).unwrap();
        assert_eq!(bytes.len(), 16);
        assert_eq!(&bytes[0..4], &0xAABBCCDDu32.to_ne_bytes());
        assert!(bytes[4..].iter().all(|b| *b == 0));
    }

    #[test]
    fn undersized_stride_is_rejected() {
        let values = [1.0f64];
        let err = array_to_bytes(&values, 4).unwrap_err();
        assert_eq!(
            err,
            MarshalError::StrideMismatch {
                declared: 4,
                actual: 8
            }
        );
    }

    #[test]
    fn non_multiple_buffer_length_is_rejected() {
        let bytes = [0u8; 10];
        let err = bytes_to_vec::<f32>(&bytes).unwrap_err();
        assert_eq!(
            err,
            MarshalError::LengthNotMultiple {
                len: 10,
                element_size: 4
            }
        );
    }

    #[test]
    fn push_constant_must_be_a_16_byte_multiple() {
        #[repr(C)]
        #[derive(Debug, Copy, Clone, Pod, Zeroable)]
        struct Params {
            width: u32,
            height: u32,
            cursor_x: u32,
            cursor_y: u32,
        }

        let ok = push_constant_bytes(&Params {
            width: 64,
            height: 64,
            cursor_x: 0,
            cursor_y: 0,
        })
        .unwrap();
        assert_eq!(ok.len(), 16);

        let err = push_constant_bytes(&[1.0f32, 2.0, 3.0]).unwrap_err();
        assert_eq!(err, MarshalError::PushConstantAlignment { size: 12 });
    }
}
