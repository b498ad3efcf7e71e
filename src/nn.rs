use derive_more::{Display, From, Into};
use rand::{Rng, distr::uniform::SampleRange, rngs::ThreadRng};

use crate::Matrix;

/// Handle of a layer in the network's layer arena.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, From, Into)]
#[display("layer#{_0}")]
pub struct LayerId(pub usize);

/// Handle of a connection. Invocation inputs are ordered by it.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, From, Into)]
#[display("connection#{_0}")]
pub struct ConnectionId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionKind {
    Weighted,
    /// Single source unit with constant input `1`.
    Bias,
}

/// Fully connected edge `source → target`.
///
/// Weights are stored as an `n_outputs × n_inputs` row-major matrix, so the weight from source
/// unit `g` to target unit `k` is at `k * n_inputs + g`.
#[derive(Debug, Clone)]
pub struct Connection {
    id: ConnectionId,
    kind: ConnectionKind,
    source: LayerId,
    target: LayerId,
    weights: Matrix,
}

impl Connection {
    pub fn new(
        id: ConnectionId,
        source: LayerId,
        target: LayerId,
        n_inputs: usize,
        n_outputs: usize,
    ) -> Self {
        Self {
            id,
            kind: ConnectionKind::Weighted,
            source,
            target,
            weights: Matrix::zeroed(n_outputs, n_inputs),
        }
    }

    /// A bias edge from the single-unit layer `source` into `target`.
    pub fn bias(id: ConnectionId, source: LayerId, target: LayerId, n_outputs: usize) -> Self {
        Self {
            kind: ConnectionKind::Bias,
            ..Self::new(id, source, target, 1, n_outputs)
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn is_bias(&self) -> bool {
        self.kind == ConnectionKind::Bias
    }

    pub fn source(&self) -> LayerId {
        self.source
    }

    pub fn target(&self) -> LayerId {
        self.target
    }

    /// Number of units in the source layer.
    pub fn n_inputs(&self) -> usize {
        self.weights.ncols()
    }

    /// Number of units in the target layer.
    pub fn n_outputs(&self) -> usize {
        self.weights.nrows()
    }

    pub fn weights(&self) -> &Matrix {
        &self.weights
    }

    pub fn weights_as_slice(&self) -> &[f32] {
        self.weights.elements()
    }

    pub fn weights_as_mut_slice(&mut self) -> &mut [f32] {
        self.weights.elements_mut()
    }

    pub fn randomize_weights(&mut self, range: impl SampleRange<f32> + Clone) {
        let mut rng = ThreadRng::default();
        for w in self.weights_as_mut_slice() {
            *w = rng.random_range(range.clone());
        }
    }
}
