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

//! Accumulates uniform bindings per set index and materializes them into
//! device-side uniform sets against one shader.

use crate::compute::api::{ShaderModuleId, UniformBinding, UniformSetId};
use crate::compute::dispatch::registry::{ResourceRegistry, TrackedResource};
use crate::compute::error::ComputeError;
use crate::compute::traits::ComputeDevice;
use std::sync::Arc;

/// One set's worth of accumulated bindings, plus the realized handle once
/// the set has been materialized on the device.
#[derive(Debug)]
struct SetSlot {
    bindings: Vec<UniformBinding>,
    realized: Option<UniformSetId>,
}

/// Accumulates uniform bindings keyed by `(set index, binding index)` and
/// materializes them into immutable device-side uniform sets scoped to one
/// shader.
///
/// Each set moves through *pending* (bindings added) → *realized*
/// (finalized against the shader) → possibly *stale* (a referenced,
/// externally-owned resource was recreated underneath it). Staleness is not
/// an error: the consumer polls [`UniformSetBuilder::is_valid`] once per
/// frame and, when it reports `false`, runs the only recovery path in the
/// system — [`UniformSetBuilder::invalidate`], re-register the bindings with
/// fresh resource handles, finalize again.
///
/// The builder owns the realized set handles (through the registry passed
/// into the finalize/invalidate calls); it never owns the buffers and
/// textures the bindings reference.
#[derive(Debug)]
pub struct UniformSetBuilder {
    device: Arc<dyn ComputeDevice>,
    shader: ShaderModuleId,
    sets: Vec<SetSlot>,
}

impl UniformSetBuilder {
    /// Creates a builder scoped to the shader its sets will be realized
    /// against.
    pub fn new(device: Arc<dyn ComputeDevice>, shader: ShaderModuleId) -> Self {
        Self {
            device,
            shader,
            sets: Vec::new(),
        }
    }

    /// Appends a binding to the (lazily created) set at index `set`.
    ///
    /// Sets must be created in ascending index order starting at 0: the set
    /// list grows by exactly one when `set` equals the current count, and
    /// any larger index is a [`ComputeError::SetIndexOutOfOrder`] — gaps are
    /// not supported. Binding-index collisions within a set are not checked
    /// here; that responsibility stays with the caller.
    pub fn put_binding(&mut self, binding: UniformBinding, set: u32) -> Result<(), ComputeError> {
        let count = self.sets.len() as u32;
        if set == count {
            self.sets.push(SetSlot {
                bindings: Vec::new(),
                realized: None,
            });
        } else if set > count {
            return Err(ComputeError::SetIndexOutOfOrder {
                set,
                expected: count,
            });
        }

        self.sets[set as usize].bindings.push(binding);
        Ok(())
    }

    /// Realizes every pending set against the owning shader.
    ///
    /// Already-realized sets are left untouched, so this is safe to call
    /// after a partial rebuild. Each new handle is tracked in `registry`
    /// the moment the device returns it.
    pub fn finalize_all(&mut self, registry: &mut ResourceRegistry) -> Result<(), ComputeError> {
        for set in 0..self.sets.len() as u32 {
            if self.sets[set as usize].realized.is_none() {
                self.finalize_one(set, registry)?;
            }
        }
        Ok(())
    }

    /// Realizes a single set; used for a targeted rebuild after
    /// invalidation.
    pub fn finalize_one(
        &mut self,
        set: u32,
        registry: &mut ResourceRegistry,
    ) -> Result<(), ComputeError> {
        let slot = self
            .sets
            .get_mut(set as usize)
            .ok_or(ComputeError::UniformSetNotRealized { set })?;

        if let Some(old) = slot.realized.take() {
            registry.release(&TrackedResource::UniformSet(old));
        }

        let id = self
            .device
            .create_uniform_set(self.shader, set, &slot.bindings)?;
        registry.track(TrackedResource::UniformSet(id));
        slot.realized = Some(id);

        log::debug!(
            "UniformSetBuilder: realized set {set} as {id:?} against shader {:?}",
            self.shader
        );
        Ok(())
    }

    /// Releases all realized set handles and clears the accumulated
    /// bindings, returning every set to pending. Referenced buffer and
    /// texture resources are not released — they are not owned here.
    pub fn invalidate(&mut self, registry: &mut ResourceRegistry) {
        for slot in self.sets.drain(..) {
            if let Some(id) = slot.realized {
                registry.release(&TrackedResource::UniformSet(id));
            }
        }
    }

    /// Delegates to the device's staleness flag for the realized handle at
    /// `set`. Pending or out-of-range sets report `false`.
    pub fn is_valid(&self, set: u32) -> bool {
        self.sets
            .get(set as usize)
            .and_then(|slot| slot.realized)
            .map(|id| self.device.is_uniform_set_valid(id))
            .unwrap_or(false)
    }

    /// The realized handle for `set`, if it has been finalized.
    pub fn realized(&self, set: u32) -> Option<UniformSetId> {
        self.sets.get(set as usize).and_then(|slot| slot.realized)
    }

    /// The number of sets (pending or realized) accumulated so far.
    pub fn set_count(&self) -> usize {
        self.sets.len()
    }

    /// Collects the realized handles of every set in ascending set-index
    /// order, or reports the first pending one: binding at dispatch time
    /// requires all sets to be realized.
    pub fn realized_sets(&self) -> Result<Vec<UniformSetId>, ComputeError> {
        self.sets
            .iter()
            .enumerate()
            .map(|(i, slot)| {
                slot.realized
                    .ok_or(ComputeError::UniformSetNotRealized { set: i as u32 })
            })
            .collect()
    }
}
