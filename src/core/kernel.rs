use std::iter;

use rayon::prelude::*;

use crate::{
    Dispatch, Hyperparameters, SlicePtr,
    core::{Addressing, DerivativeHooks},
    utils::assume,
};

/// Base pointers of one connection's inputs and weights.
///
/// For merged staging these point into the flat buffers at the connection's start offsets, for
/// in-place staging into the connection's own storage.
#[derive(Clone, Copy)]
pub(crate) struct Segment {
    pub(crate) input: SlicePtr<f32>,
    pub(crate) weights: SlicePtr<f32>,
}

/// The fused weighted-sum, weight update and derivative pass over every unit of a layer.
pub(crate) struct Kernel<'a, H: DerivativeHooks> {
    pub(crate) addressing: &'a Addressing,
    pub(crate) segments: &'a [Segment],
    /// Flat weight update buffer, indexed like the flat weight buffer.
    pub(crate) momentum: SlicePtr<f32>,
    pub(crate) activations: &'a [f32],
    pub(crate) hyperparameters: Hyperparameters,
    pub(crate) hooks: &'a H,
}

impl<H: DerivativeHooks> Kernel<'_, H> {
    /// Runs the kernel for every unit, writing one row of `output` per unit.
    ///
    /// # Safety
    ///
    /// - `segments` must match `addressing.connections()` one to one, each `input` must span at
    ///   least `input_len` elements and each `weights` at least `weight_len`
    /// - `momentum` must span `addressing.weight_len()` elements
    /// - `activations` and `output` must have `units * samples` elements
    /// - `weights` and `momentum` must come from `&mut` borrows that stay live and unused for the
    ///   duration of the call, and must not overlap with each other or with the inputs
    pub(crate) unsafe fn run(&self, output: &mut [f32], dispatch: Dispatch) {
        let units = self.addressing.units();
        let samples = self.addressing.samples();
        unsafe { assume!(self.segments.len() == self.addressing.series()) };
        unsafe { assume!(self.activations.len() == units * samples) };
        unsafe { assume!(output.len() == units * samples) };
        if samples == 0 {
            return;
        }
        log::trace!(
            "updating {} with {units} units, {samples} samples, {} connections ({dispatch:?})",
            self.addressing.target(),
            self.addressing.series(),
        );
        match dispatch {
            Dispatch::Sequential => {
                for (unit, output_row) in output.chunks_mut(samples).enumerate() {
                    // Safety: function's safety contract.
                    unsafe { self.update_unit(unit, output_row) };
                }
            }
            Dispatch::Parallel => {
                output
                    .par_chunks_mut(samples)
                    .enumerate()
                    // Safety: function's safety contract, and every weight index is owned by
                    // exactly one unit so the units never write to the same index.
                    .for_each(|(unit, output_row)| unsafe { self.update_unit(unit, output_row) });
            }
        }
    }

    /// Raw weighted sum of `unit` for sample `column`.
    ///
    /// # Safety
    ///
    /// Same as `run`, and `unit < units`, `column < samples`.
    #[inline(always)]
    unsafe fn weighted_sum(&self, unit: usize, column: usize) -> f32 {
        let samples = self.addressing.samples();
        let mut sum = 0.0f32;
        for (table, segment) in iter::zip(self.addressing.connections(), self.segments) {
            for j in 0..table.dimension {
                let x = unsafe { segment.input.read(j * samples + column) };
                let w = unsafe { segment.weights.read(table.weight_index(unit, j)) };
                sum += x * w;
            }
        }
        sum
    }

    /// # Safety
    ///
    /// Same as `run`, `unit < units`, and no other thread is updating `unit`.
    #[inline(always)]
    unsafe fn update_unit(&self, unit: usize, output_row: &mut [f32]) {
        let samples = self.addressing.samples();
        unsafe { assume!(output_row.len() == samples) };
        let Hyperparameters {
            learning_rate: lr,
            momentum: mm,
            weight_decay: wd,
            ..
        } = self.hyperparameters;
        for (column, output) in output_row.iter_mut().enumerate() {
            let output_index = unit * samples + column;
            let value = unsafe { self.weighted_sum(unit, column) };
            let activation = self.activations[output_index];
            let term = self.hooks.before_update(activation, value, output_index);
            for (table, segment) in iter::zip(self.addressing.connections(), self.segments) {
                for j in 0..table.dimension {
                    let local_index = table.weight_index(unit, j);
                    let weight_index = table.weight_start + local_index;
                    unsafe {
                        let x = segment.input.read(j * samples + column);
                        let w = segment.weights.read(local_index);
                        let previous = self.momentum.read(weight_index);
                        let update = lr * (x * term - wd * w) + mm * previous;
                        segment.weights.write(local_index, w + update);
                        self.momentum.write(weight_index, update);
                    }
                }
            }
            *output = self.hooks.after_update(activation, value, output_index);
        }
    }
}
