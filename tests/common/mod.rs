#![allow(dead_code)]

use std::iter;

use fc_backprop::{
    BackpropagationFullyConnected, Connection, ConnectionId, ConnectionInputs, DerivativeHooks,
    Hyperparameters, LayerId, Matrix, Result, Staging, insert_connection,
};

/// Runs one invocation over `connections`, each paired with the input matrix at the same index.
pub fn calculate<H: DerivativeHooks>(
    backprop: &mut BackpropagationFullyConnected<H>,
    connections: &mut [Connection],
    inputs: &mut [Matrix],
    output: &mut Matrix,
    target: LayerId,
) -> Result<Staging> {
    let mut map = ConnectionInputs::new();
    for (connection, input) in iter::zip(connections.iter_mut(), inputs.iter_mut()) {
        insert_connection(&mut map, connection, input);
    }
    backprop.calculate(&mut map, output, target)
}

/// `source → target` with the given row-major weights.
pub fn connection(
    id: usize,
    source: usize,
    target: usize,
    n_inputs: usize,
    n_outputs: usize,
    weights: &[f32],
) -> Connection {
    let mut c = Connection::new(
        ConnectionId(id),
        LayerId(source),
        LayerId(target),
        n_inputs,
        n_outputs,
    );
    c.weights_as_mut_slice().copy_from_slice(weights);
    c
}

pub fn hyperparameters(learning_rate: f32, momentum: f32, weight_decay: f32) -> Hyperparameters {
    Hyperparameters::new(learning_rate, momentum, weight_decay)
}
