use std::collections::{HashMap, hash_map::Entry};

use crate::{Error, LayerId, Matrix, Result};

/// Cached forward-pass activations, one `units × samples` matrix per layer.
pub type ActivationCache = HashMap<LayerId, Matrix>;

/// Stored weight updates of the previous step, one buffer per target layer.
///
/// A buffer is created zeroed the first time a layer is updated and reused by every later update
/// of that layer, so the momentum term sees the deltas of the previous invocation.
#[derive(Debug, Default)]
pub struct MomentumStore {
    buffers: HashMap<LayerId, Box<[f32]>>,
}

impl MomentumStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The buffer of `layer`, created zeroed with `len` elements if it does not exist yet.
    ///
    /// Fails if a buffer exists with a different length, meaning the layer's weights were
    /// reshaped without discarding its stored updates.
    pub fn get_or_create(&mut self, layer: LayerId, len: usize) -> Result<&mut [f32]> {
        match self.buffers.entry(layer) {
            Entry::Occupied(entry) => {
                let buffer = entry.into_mut();
                if buffer.len() != len {
                    return Err(Error::MomentumLengthMismatch {
                        layer,
                        expected: len,
                        found: buffer.len(),
                    });
                }
                Ok(&mut buffer[..])
            }
            Entry::Vacant(entry) => {
                log::debug!("creating weight update buffer of {len} for {layer}");
                Ok(&mut entry.insert(bytemuck::zeroed_slice_box(len))[..])
            }
        }
    }

    pub fn get(&self, layer: LayerId) -> Option<&[f32]> {
        self.buffers.get(&layer).map(|buffer| &buffer[..])
    }

    pub fn contains(&self, layer: LayerId) -> bool {
        self.buffers.contains_key(&layer)
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Discards all stored updates.
    pub fn clear(&mut self) {
        self.buffers.clear();
    }
}
