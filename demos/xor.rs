//! Trains a 2-2-1 sigmoid network on XOR with the fused backpropagation kernel.
//!
//! ```sh
//! RUST_LOG=debug cargo run --example xor -- --epochs 20000 --momentum 0.9
//! ```

use std::{error::Error, fs, path::PathBuf};

use clap::Parser;
use fc_backprop::{
    ActivationDerivative, ActivationFunction, BackpropagationFullyConnected, Connection,
    ConnectionId, ConnectionInputs, Hyperparameters, LayerId, Matrix, RawSum,
    activation_functions::Sigmoid,
    faer::{Accum, Par, linalg::matmul::matmul},
    insert_connection,
};

const INPUT: LayerId = LayerId(0);
const BIAS: LayerId = LayerId(1);
const HIDDEN: LayerId = LayerId(2);
const OUTPUT: LayerId = LayerId(3);

#[derive(Parser, Debug)]
#[command(about = "Train an XOR network with fused backpropagation")]
struct Args {
    #[arg(long, default_value_t = 10_000)]
    epochs: usize,
    /// TOML file with `learning_rate`, `momentum`, `weight_decay` and `dispatch`.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    learning_rate: Option<f32>,
    #[arg(long)]
    momentum: Option<f32>,
    #[arg(long)]
    weight_decay: Option<f32>,
}

impl Args {
    fn hyperparameters(&self) -> Result<Hyperparameters, Box<dyn Error>> {
        let mut h = match &self.config {
            Some(path) => Hyperparameters::from_toml_str(&fs::read_to_string(path)?)?,
            None => Hyperparameters {
                learning_rate: 0.5,
                momentum: 0.5,
                ..Hyperparameters::default()
            },
        };
        h.learning_rate = self.learning_rate.unwrap_or(h.learning_rate);
        h.momentum = self.momentum.unwrap_or(h.momentum);
        h.weight_decay = self.weight_decay.unwrap_or(h.weight_decay);
        Ok(h)
    }
}

/// `φ(W a_prev + b)`, one column per sample.
fn forward_layer(w: &Connection, b: &Connection, a_prev: &Matrix) -> Matrix {
    let mut a = Matrix::zeroed(w.n_outputs(), a_prev.ncols());
    // z = W * a_prev
    matmul(
        a.as_mat_mut(),
        Accum::Replace,
        w.weights().as_mat_ref(),
        a_prev.as_mat_ref(),
        1.0,
        Par::Seq,
    );
    let ncols = a.ncols();
    for (i, z) in a.elements_mut().iter_mut().enumerate() {
        *z = Sigmoid::apply(*z + b.weights_as_slice()[i / ncols]);
    }
    a
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let hyperparameters = args.hyperparameters()?;
    log::info!("training with {hyperparameters:?}");

    // One sample per column.
    let x = Matrix::from_row_major(2, 4, vec![0., 0., 1., 1., 0., 1., 0., 1.]);
    let y = [0., 1., 1., 0.];

    let mut w_hidden = Connection::new(ConnectionId(0), INPUT, HIDDEN, 2, 2);
    let mut b_hidden = Connection::bias(ConnectionId(1), BIAS, HIDDEN, 2);
    let mut w_output = Connection::new(ConnectionId(2), HIDDEN, OUTPUT, 2, 1);
    let mut b_output = Connection::bias(ConnectionId(3), BIAS, OUTPUT, 1);
    for c in [&mut w_hidden, &mut b_hidden, &mut w_output, &mut b_output] {
        c.randomize_weights(-1.0..1.0);
    }

    // Propagates the output error into the hidden layer while updating hidden → output.
    let mut hidden = BackpropagationFullyConnected::new(
        hyperparameters,
        ActivationDerivative::<Sigmoid>::new(),
    );
    // Updates input → hidden and both biases, whose activations never change.
    let mut rest = BackpropagationFullyConnected::new(hyperparameters, RawSum);
    rest.activations_mut().insert(INPUT, x.clone());
    rest.activations_mut().insert(BIAS, Matrix::filled(1, 4, 1.0));

    for epoch in 0..args.epochs {
        let a_hidden = forward_layer(&w_hidden, &b_hidden, &x);
        let a_output = forward_layer(&w_output, &b_output, &a_hidden);

        let mut loss = 0.0f32;
        let mut delta_output = Matrix::zeroed(1, 4);
        for (i, (d, &a)) in delta_output
            .elements_mut()
            .iter_mut()
            .zip(a_output.elements())
            .enumerate()
        {
            let e = y[i] - a;
            loss += e * e;
            *d = e * Sigmoid::deriv_from_output(a);
        }
        if epoch % (args.epochs / 10).max(1) == 0 || epoch + 1 == args.epochs {
            log::info!("[epoch {epoch}] L = {:.6}", loss / 4.0);
        }

        hidden.activations_mut().insert(HIDDEN, a_hidden);
        let mut delta_hidden = Matrix::zeroed(2, 4);
        {
            let mut input = delta_output.clone();
            let mut inputs = ConnectionInputs::new();
            insert_connection(&mut inputs, &mut w_output, &mut input);
            hidden.calculate(&mut inputs, &mut delta_hidden, HIDDEN)?;
        }
        {
            let mut delta_hidden_input = delta_hidden.clone();
            let mut delta_output_input = delta_output.clone();
            let mut inputs = ConnectionInputs::new();
            insert_connection(&mut inputs, &mut b_hidden, &mut delta_hidden_input);
            insert_connection(&mut inputs, &mut b_output, &mut delta_output_input);
            rest.calculate(&mut inputs, &mut Matrix::zeroed(1, 4), BIAS)?;
        }
        {
            let mut inputs = ConnectionInputs::new();
            insert_connection(&mut inputs, &mut w_hidden, &mut delta_hidden);
            rest.calculate(&mut inputs, &mut Matrix::zeroed(2, 4), INPUT)?;
        }
    }

    let a_output = forward_layer(&w_output, &b_output, &forward_layer(&w_hidden, &b_hidden, &x));
    for sample in 0..4 {
        println!(
            "{} xor {} = {:.4}",
            x.get(0, sample).unwrap_or_default(),
            x.get(1, sample).unwrap_or_default(),
            a_output.get(0, sample).unwrap_or_default(),
        );
    }
    Ok(())
}
