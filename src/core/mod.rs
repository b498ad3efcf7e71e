//! Core parts of the algorithm: addressing, stored updates, hooks and the update kernel.

pub mod addressing;
pub mod hooks;
pub mod momentum;

mod kernel;

pub use addressing::{Addressing, ConnectionAddressing, Staging};
pub use hooks::{ActivationDerivative, DerivativeHooks, RawSum};
pub use momentum::{ActivationCache, MomentumStore};

pub(crate) use kernel::{Kernel, Segment};
