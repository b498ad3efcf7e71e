use thiserror::Error;

use crate::{ConnectionId, LayerId};

/// Setup errors of a backpropagation invocation.
///
/// All of them are caller contract violations: they are reported before any buffer is written
/// and the invocation is aborted.
#[derive(Debug, Error)]
pub enum Error {
    #[error("no cached activations for {0}, the forward pass must be run before backpropagation")]
    MissingActivations(LayerId),
    #[error("activations of {layer} have shape {found:?}, expected {expected:?}")]
    ActivationShape {
        layer: LayerId,
        expected: (usize, usize),
        found: (usize, usize),
    },
    #[error("output matrix has shape {found:?}, expected {expected:?}")]
    OutputShape {
        expected: (usize, usize),
        found: (usize, usize),
    },
    #[error("input matrix of {connection} has shape {found:?}, expected {expected:?}")]
    InputShape {
        connection: ConnectionId,
        expected: (usize, usize),
        found: (usize, usize),
    },
    #[error("{connection} feeds {found} units, other connections feed {expected}")]
    UnitCountMismatch {
        connection: ConnectionId,
        expected: usize,
        found: usize,
    },
    #[error("{connection} is not connected to {target}")]
    UnrelatedConnection {
        connection: ConnectionId,
        target: LayerId,
    },
    #[error("invocation has no input connections")]
    NoConnections,
    #[error("stored weight updates of {layer} have length {found}, expected {expected}")]
    MomentumLengthMismatch {
        layer: LayerId,
        expected: usize,
        found: usize,
    },
    #[error("invalid hyperparameter config: {0}")]
    Config(#[from] toml::de::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
