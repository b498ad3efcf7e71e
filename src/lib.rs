pub use faer;

mod activation;
mod backprop;
mod config;
mod error;
mod matrix;
mod nn;
mod ptr;

pub mod core;

pub use activation::*;
pub use backprop::*;
pub use config::*;
pub use error::*;
pub use matrix::*;
pub use nn::*;
pub use ptr::*;

pub use crate::core::{
    ActivationCache, ActivationDerivative, Addressing, DerivativeHooks, MomentumStore, RawSum,
    Staging,
};

pub(crate) mod utils;
