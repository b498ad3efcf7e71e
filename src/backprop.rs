use std::{collections::BTreeMap, iter};

use crate::{
    Connection, ConnectionId, Dispatch, Error, Hyperparameters, LayerId, Matrix, Result,
    SlicePtr,
    core::{
        ActivationCache, Addressing, DerivativeHooks, Kernel, MomentumStore, RawSum, Segment,
        Staging,
    },
};

/// A connection feeding the layer being updated, together with its input matrix.
///
/// The input matrix has one row per weight of a unit (see [`Addressing`]) and one column per
/// sample.
#[derive(Debug)]
pub struct ConnectionInput<'a> {
    pub connection: &'a mut Connection,
    pub input: &'a mut Matrix,
}

impl<'a> ConnectionInput<'a> {
    pub fn new(connection: &'a mut Connection, input: &'a mut Matrix) -> Self {
        Self { connection, input }
    }
}

/// Inputs of one invocation, ordered by connection.
pub type ConnectionInputs<'a> = BTreeMap<ConnectionId, ConnectionInput<'a>>;

/// Inserts `connection` with its `input`, keyed by the connection's id.
pub fn insert_connection<'a>(
    inputs: &mut ConnectionInputs<'a>,
    connection: &'a mut Connection,
    input: &'a mut Matrix,
) {
    inputs.insert(connection.id(), ConnectionInput::new(connection, input));
}

/// Per-invocation state bound to the target layer by [`BackpropagationFullyConnected::init`].
#[derive(Debug)]
pub struct LayerState<'s> {
    /// Stored weight updates of the target layer, indexed like the flat weight buffer.
    pub weight_updates: &'s mut [f32],
    /// Flat view of the target layer's cached activations.
    pub activations: &'s [f32],
}

impl<'s> LayerState<'s> {
    fn bind(
        stored_weight_updates: &'s mut MomentumStore,
        activations: &'s ActivationCache,
        addressing: &Addressing,
    ) -> Result<Self> {
        let target = addressing.target();
        let matrix = activations
            .get(&target)
            .ok_or(Error::MissingActivations(target))?;
        let expected = (addressing.units(), addressing.samples());
        if matrix.shape() != expected {
            return Err(Error::ActivationShape {
                layer: target,
                expected,
                found: matrix.shape(),
            });
        }
        let weight_updates = stored_weight_updates.get_or_create(target, addressing.weight_len())?;
        Ok(Self {
            weight_updates,
            activations: matrix.elements(),
        })
    }
}

/// Inputs and weights of all connections copied into one flat buffer each.
struct FlatBuffers {
    input: Box<[f32]>,
    weights: Box<[f32]>,
}

impl FlatBuffers {
    fn stage(addressing: &Addressing, inputs: &ConnectionInputs) -> Self {
        let mut input: Box<[f32]> = bytemuck::zeroed_slice_box(addressing.input_len());
        let mut weights: Box<[f32]> = bytemuck::zeroed_slice_box(addressing.weight_len());
        for (table, connection_input) in iter::zip(addressing.connections(), inputs.values()) {
            input[table.input_start..][..table.input_len]
                .copy_from_slice(connection_input.input.elements());
            weights[table.weight_start..][..table.weight_len]
                .copy_from_slice(connection_input.connection.weights_as_slice());
        }
        Self { input, weights }
    }

    /// Copies every connection's segment back into the connection's own storage.
    fn restage(&self, addressing: &Addressing, inputs: &mut ConnectionInputs) {
        for (table, connection_input) in iter::zip(addressing.connections(), inputs.values_mut()) {
            connection_input
                .input
                .elements_mut()
                .copy_from_slice(&self.input[table.input_start..][..table.input_len]);
            connection_input
                .connection
                .weights_as_mut_slice()
                .copy_from_slice(&self.weights[table.weight_start..][..table.weight_len]);
            log::debug!(
                "restaged {}: {} inputs, {} weights",
                connection_input.connection.id(),
                table.input_len,
                table.weight_len,
            );
        }
    }
}

/// Backpropagation over fully connected layers, with learning rate, momentum and weight decay.
///
/// Owns the hyperparameters, the derivative hooks `H`, the stored weight updates of every layer
/// it has updated, and the cached forward activations it reads from.
#[derive(Debug, Default)]
pub struct BackpropagationFullyConnected<H: DerivativeHooks = RawSum> {
    hyperparameters: Hyperparameters,
    hooks: H,
    stored_weight_updates: MomentumStore,
    activations: ActivationCache,
}

impl<H: DerivativeHooks> BackpropagationFullyConnected<H> {
    pub fn new(hyperparameters: Hyperparameters, hooks: H) -> Self {
        Self {
            hyperparameters,
            hooks,
            stored_weight_updates: MomentumStore::new(),
            activations: ActivationCache::new(),
        }
    }

    /// Updates the weights of all `inputs` connections feeding `target` and writes the hooks'
    /// output into `output` (`units × samples`).
    ///
    /// Every connection must be incident to `target`. Activations of `target` must have been
    /// cached with [`Self::set_activations`] beforehand. If any setup check fails, nothing is
    /// written.
    ///
    /// Returns how the connections were staged.
    pub fn calculate(
        &mut self,
        inputs: &mut ConnectionInputs<'_>,
        output: &mut Matrix,
        target: LayerId,
    ) -> Result<Staging> {
        debug_assert!(inputs.iter().all(|(id, i)| *id == i.connection.id()));
        let addressing = Addressing::build(
            inputs.values().map(|i| (&*i.connection, &*i.input)),
            target,
        )?;
        let expected = (addressing.units(), addressing.samples());
        if output.shape() != expected {
            return Err(Error::OutputShape {
                expected,
                found: output.shape(),
            });
        }
        let Self {
            hyperparameters,
            hooks,
            stored_weight_updates,
            activations,
        } = self;
        let state = LayerState::bind(stored_weight_updates, activations, &addressing)?;
        let staging = addressing.staging();
        match staging {
            Staging::InPlace => {
                let segments: Vec<Segment> = inputs
                    .values_mut()
                    .map(|i| Segment {
                        input: SlicePtr::from_ref(i.input.elements()),
                        weights: SlicePtr::from_mut(i.connection.weights_as_mut_slice()),
                    })
                    .collect();
                // Safety: segments are the connections' own buffers, which the tables were built
                // from, and `inputs` is not touched until the kernel returns.
                unsafe {
                    run_kernel(&addressing, &segments, state, output, *hyperparameters, &*hooks)
                };
            }
            Staging::Merged => {
                let mut flat = FlatBuffers::stage(&addressing, inputs);
                let input = SlicePtr::from_ref(&flat.input[..]);
                let weights = SlicePtr::from_mut(&mut flat.weights[..]);
                let segments: Vec<Segment> = addressing
                    .connections()
                    .iter()
                    // Safety: the start offsets never exceed the flat buffer lengths.
                    .map(|table| unsafe {
                        Segment {
                            input: input.offset(table.input_start),
                            weights: weights.offset(table.weight_start),
                        }
                    })
                    .collect();
                // Safety: flat buffers are sized from the tables, and are not touched until the
                // kernel returns.
                unsafe {
                    run_kernel(&addressing, &segments, state, output, *hyperparameters, &*hooks)
                };
                flat.restage(&addressing, inputs);
            }
        }
        Ok(staging)
    }

    /// Binds the stored weight updates (created on first use) and the cached activations of the
    /// target layer of `addressing`.
    pub fn init(&mut self, addressing: &Addressing) -> Result<LayerState<'_>> {
        LayerState::bind(
            &mut self.stored_weight_updates,
            &self.activations,
            addressing,
        )
    }

    pub fn hyperparameters(&self) -> Hyperparameters {
        self.hyperparameters
    }

    pub fn set_hyperparameters(&mut self, hyperparameters: Hyperparameters) {
        self.hyperparameters = hyperparameters;
    }

    pub fn learning_rate(&self) -> f32 {
        self.hyperparameters.learning_rate
    }

    pub fn set_learning_rate(&mut self, learning_rate: f32) {
        self.hyperparameters.learning_rate = learning_rate;
    }

    pub fn momentum(&self) -> f32 {
        self.hyperparameters.momentum
    }

    pub fn set_momentum(&mut self, momentum: f32) {
        self.hyperparameters.momentum = momentum;
    }

    pub fn weight_decay(&self) -> f32 {
        self.hyperparameters.weight_decay
    }

    pub fn set_weight_decay(&mut self, weight_decay: f32) {
        self.hyperparameters.weight_decay = weight_decay;
    }

    pub fn dispatch(&self) -> Dispatch {
        self.hyperparameters.dispatch
    }

    pub fn set_dispatch(&mut self, dispatch: Dispatch) {
        self.hyperparameters.dispatch = dispatch;
    }

    pub fn activations(&self) -> &ActivationCache {
        &self.activations
    }

    pub fn activations_mut(&mut self) -> &mut ActivationCache {
        &mut self.activations
    }

    /// Replaces the whole activation cache.
    pub fn set_activations(&mut self, activations: ActivationCache) {
        self.activations = activations;
    }

    pub fn stored_weight_updates(&self) -> &MomentumStore {
        &self.stored_weight_updates
    }

    /// Discards the stored weight updates of every layer.
    pub fn reset_weight_updates(&mut self) {
        self.stored_weight_updates.clear();
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut H {
        &mut self.hooks
    }
}

/// # Safety
///
/// See [`Kernel::run`].
unsafe fn run_kernel<H: DerivativeHooks>(
    addressing: &Addressing,
    segments: &[Segment],
    state: LayerState,
    output: &mut Matrix,
    hyperparameters: Hyperparameters,
    hooks: &H,
) {
    let kernel = Kernel {
        addressing,
        segments,
        momentum: SlicePtr::from_mut(state.weight_updates),
        activations: state.activations,
        hyperparameters,
        hooks,
    };
    unsafe { kernel.run(output.elements_mut(), hyperparameters.dispatch) };
}
