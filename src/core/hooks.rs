use std::{
    fmt::{self, Debug},
    marker::PhantomData,
};

use crate::ActivationFunction;

/// The two points where variants of the update kernel differ.
///
/// Both hooks see only values, never the weight or momentum buffers, so an override can only
/// change the error term fed into the update formula and what ends up in the output matrix.
pub trait DerivativeHooks: Sync {
    /// Called before the weights of a unit are updated for one sample.
    ///
    /// Returns the error term multiplied with each input in the update formula.
    #[inline(always)]
    fn before_update(&self, activation: f32, _value: f32, _output_index: usize) -> f32 {
        activation
    }

    /// Called after the weights of a unit are updated for one sample.
    ///
    /// Returns the value stored at `output_index` of the output matrix.
    #[inline(always)]
    fn after_update(&self, _activation: f32, value: f32, _output_index: usize) -> f32 {
        value
    }
}

/// Uses the cached activation as the error term and outputs the raw weighted sum.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RawSum;

impl DerivativeHooks for RawSum {}

/// Outputs the propagated error multiplied by `φ'`, taken at the cached activation.
///
/// This is the error signal of a hidden layer with activation function `Φ`.
pub struct ActivationDerivative<Phi: ActivationFunction> {
    _marker: PhantomData<fn() -> Phi>,
}

impl<Phi: ActivationFunction> ActivationDerivative<Phi> {
    pub const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<Phi: ActivationFunction> Default for ActivationDerivative<Phi> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Phi: ActivationFunction> Clone for ActivationDerivative<Phi> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Phi: ActivationFunction> Copy for ActivationDerivative<Phi> {}

impl<Phi: ActivationFunction> Debug for ActivationDerivative<Phi> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ActivationDerivative({})", Phi::NAME)
    }
}

impl<Phi: ActivationFunction> DerivativeHooks for ActivationDerivative<Phi> {
    #[inline(always)]
    fn after_update(&self, activation: f32, value: f32, _output_index: usize) -> f32 {
        value * Phi::deriv_from_output(activation)
    }
}
