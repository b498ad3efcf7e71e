//! Per-connection offset and stride tables into the flat input and weight buffers.

use crate::{Connection, Error, LayerId, Matrix, Result};

/// Where one connection's inputs and weights live in the flat buffers, and how one unit walks
/// its weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionAddressing {
    /// Offset of this connection's inputs in the flat input buffer.
    pub input_start: usize,
    /// Number of input elements, `dimension * samples`.
    pub input_len: usize,
    /// Offset of this connection's weights in the flat weight buffer.
    pub weight_start: usize,
    /// Number of weights of this connection.
    pub weight_len: usize,
    /// Distance between the first weights of two neighbouring units.
    pub initial_step: usize,
    /// Distance between two weights of the same unit.
    pub step: usize,
    /// Number of weights (and inputs per sample) one unit owns.
    pub dimension: usize,
    pub is_bias: bool,
}

impl ConnectionAddressing {
    /// Addressing of `connection` when `target` is the layer being updated, together with the
    /// number of units it feeds.
    ///
    /// If `target` is the connection's target the weights of a unit are a row of the weight
    /// matrix; if it is the connection's source (the backward direction) they are a column.
    fn oriented(connection: &Connection, target: LayerId) -> Result<(usize, Self)> {
        let n_inputs = connection.n_inputs();
        let n_outputs = connection.n_outputs();
        let (units, dimension, initial_step, step) = if connection.target() == target {
            (n_outputs, n_inputs, n_inputs, 1)
        } else if connection.source() == target {
            (n_inputs, n_outputs, 1, n_inputs)
        } else {
            return Err(Error::UnrelatedConnection {
                connection: connection.id(),
                target,
            });
        };
        let addressing = Self {
            input_start: 0,
            input_len: 0,
            weight_start: 0,
            weight_len: n_inputs * n_outputs,
            initial_step,
            step,
            dimension,
            is_bias: connection.is_bias(),
        };
        Ok((units, addressing))
    }

    /// Index of weight `j` of unit `unit`, relative to `weight_start`.
    #[inline(always)]
    pub fn weight_index(&self, unit: usize, j: usize) -> usize {
        self.initial_step * unit + j * self.step
    }
}

/// Whether a layer's connections are staged into merged flat buffers or addressed in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Staging {
    /// A single connection, or exactly one connection plus a bias. Each connection's own storage
    /// is addressed directly and nothing is copied.
    InPlace,
    /// Inputs and weights are copied into one flat buffer each before the kernel runs, and
    /// restaged into every connection afterwards.
    Merged,
}

impl Staging {
    pub fn for_connections(n_connections: usize, has_bias: bool) -> Self {
        if n_connections > 2 || (n_connections > 1 && !has_bias) {
            Self::Merged
        } else {
            Self::InPlace
        }
    }
}

/// Addressing tables of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Addressing {
    target: LayerId,
    units: usize,
    samples: usize,
    input_len: usize,
    weight_len: usize,
    connections: Box<[ConnectionAddressing]>,
}

impl Addressing {
    /// Builds the tables for `connections` (in invocation order) with their input matrices.
    ///
    /// Every connection must feed the same number of units, and every input matrix must have one
    /// row per weight of a unit and the same number of sample columns.
    pub fn build<'a>(
        connections: impl IntoIterator<Item = (&'a Connection, &'a Matrix)>,
        target: LayerId,
    ) -> Result<Self> {
        let mut units: Option<usize> = None;
        let mut samples: Option<usize> = None;
        let mut input_len = 0usize;
        let mut weight_len = 0usize;
        let mut tables = Vec::new();
        for (connection, input) in connections {
            let (connection_units, mut addressing) =
                ConnectionAddressing::oriented(connection, target)?;
            let expected_units = *units.get_or_insert(connection_units);
            if connection_units != expected_units {
                return Err(Error::UnitCountMismatch {
                    connection: connection.id(),
                    expected: expected_units,
                    found: connection_units,
                });
            }
            let n_samples = *samples.get_or_insert(input.ncols());
            if input.shape() != (addressing.dimension, n_samples) {
                return Err(Error::InputShape {
                    connection: connection.id(),
                    expected: (addressing.dimension, n_samples),
                    found: input.shape(),
                });
            }
            addressing.input_start = input_len;
            addressing.input_len = addressing.dimension * n_samples;
            addressing.weight_start = weight_len;
            input_len += addressing.input_len;
            weight_len += addressing.weight_len;
            debug_assert!(
                connection_units == 0
                    || addressing.dimension == 0
                    || addressing.weight_index(connection_units - 1, addressing.dimension - 1)
                        < addressing.weight_len
            );
            tables.push(addressing);
        }
        let (Some(units), Some(samples)) = (units, samples) else {
            return Err(Error::NoConnections);
        };
        Ok(Self {
            target,
            units,
            samples,
            input_len,
            weight_len,
            connections: tables.into_boxed_slice(),
        })
    }

    pub fn target(&self) -> LayerId {
        self.target
    }

    /// Number of units of the target layer, i.e. parallel kernel rows.
    pub fn units(&self) -> usize {
        self.units
    }

    /// Number of samples per invocation, i.e. columns of the input, activation and output
    /// matrices.
    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Number of connections feeding the target layer.
    pub fn series(&self) -> usize {
        self.connections.len()
    }

    /// Total length of the flat input buffer.
    pub fn input_len(&self) -> usize {
        self.input_len
    }

    /// Total length of the flat weight buffer.
    pub fn weight_len(&self) -> usize {
        self.weight_len
    }

    pub fn connections(&self) -> &[ConnectionAddressing] {
        &self.connections
    }

    pub fn has_bias(&self) -> bool {
        self.connections.iter().any(|c| c.is_bias)
    }

    pub fn staging(&self) -> Staging {
        Staging::for_connections(self.series(), self.has_bias())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConnectionId;

    #[test]
    fn forward_orientation_walks_rows() {
        let c = Connection::new(ConnectionId(0), LayerId(0), LayerId(1), 3, 2);
        let input = Matrix::zeroed(3, 4);
        let a = Addressing::build([(&c, &input)], LayerId(1)).unwrap();
        assert_eq!(a.units(), 2);
        assert_eq!(a.samples(), 4);
        let t = a.connections()[0];
        assert_eq!((t.dimension, t.initial_step, t.step), (3, 3, 1));
        assert_eq!(t.weight_index(1, 2), 5);
    }

    #[test]
    fn backward_orientation_walks_columns() {
        let c = Connection::new(ConnectionId(0), LayerId(0), LayerId(1), 3, 2);
        let input = Matrix::zeroed(2, 1);
        let a = Addressing::build([(&c, &input)], LayerId(0)).unwrap();
        assert_eq!(a.units(), 3);
        let t = a.connections()[0];
        assert_eq!((t.dimension, t.initial_step, t.step), (2, 1, 3));
        // Weight from source unit 2 to target unit 1.
        assert_eq!(t.weight_index(2, 1), 5);
    }

    #[test]
    fn offsets_are_cumulative() {
        let c0 = Connection::new(ConnectionId(0), LayerId(0), LayerId(3), 2, 4);
        let c1 = Connection::new(ConnectionId(1), LayerId(1), LayerId(3), 3, 4);
        let c2 = Connection::bias(ConnectionId(2), LayerId(2), LayerId(3), 4);
        let (i0, i1, i2) = (Matrix::zeroed(2, 5), Matrix::zeroed(3, 5), Matrix::filled(1, 5, 1.));
        let a = Addressing::build([(&c0, &i0), (&c1, &i1), (&c2, &i2)], LayerId(3)).unwrap();
        let starts: Vec<_> = a
            .connections()
            .iter()
            .map(|t| (t.input_start, t.weight_start))
            .collect();
        assert_eq!(starts, [(0, 0), (10, 8), (25, 20)]);
        assert_eq!(a.input_len(), 30);
        assert_eq!(a.weight_len(), 24);
        assert!(a.has_bias());
        assert_eq!(a.staging(), Staging::Merged);
    }

    #[test]
    fn staging_decision() {
        assert_eq!(Staging::for_connections(1, false), Staging::InPlace);
        assert_eq!(Staging::for_connections(2, true), Staging::InPlace);
        assert_eq!(Staging::for_connections(2, false), Staging::Merged);
        assert_eq!(Staging::for_connections(3, true), Staging::Merged);
    }

    #[test]
    fn rejects_bad_setups() {
        let c0 = Connection::new(ConnectionId(0), LayerId(0), LayerId(2), 2, 4);
        let c1 = Connection::new(ConnectionId(1), LayerId(1), LayerId(2), 2, 3);
        let input = Matrix::zeroed(2, 1);
        assert!(matches!(
            Addressing::build([(&c0, &input), (&c1, &input)], LayerId(2)),
            Err(Error::UnitCountMismatch { .. })
        ));
        assert!(matches!(
            Addressing::build([(&c0, &input)], LayerId(9)),
            Err(Error::UnrelatedConnection { .. })
        ));
        assert!(matches!(
            Addressing::build([(&c0, &Matrix::zeroed(3, 1))], LayerId(2)),
            Err(Error::InputShape { .. })
        ));
        assert!(matches!(
            Addressing::build(Vec::<(&Connection, &Matrix)>::new(), LayerId(2)),
            Err(Error::NoConnections)
        ));
    }
}
